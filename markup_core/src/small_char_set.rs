//! A bitmask over the first 64 ASCII code points, used by
//! [`crate::buffer_queue::BufferQueue::pop_except_from`] to split runs of
//! "uninteresting" characters from the handful the tokenizer must stop on.

use tendril::StrTendril;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SmallCharSet {
    pub bits: u64,
}

impl SmallCharSet {
    #[inline]
    pub fn contains(&self, n: u8) -> bool {
        0 != (self.bits & (1 << (n as usize)))
    }

    /// Count the number of bytes of characters at the start of `buf` that
    /// are not in the set.
    ///
    /// Note: this may not be the same as the index of the first character
    /// in the set, owing to multi-byte UTF-8 characters. This function is
    /// only correct in the ASCII range (which is all we use it for).
    pub fn nonmember_prefix_len(&self, buf: &StrTendril) -> u32 {
        let mut n = 0;
        for b in buf.bytes() {
            if b >= 64 || !self.contains(b) {
                n += 1;
            } else {
                break;
            }
        }
        n
    }
}

/// Create a [`SmallCharSet`] with each space-separated character literal or
/// numeric code point stored in the set, e.g. `small_char_set!('&' '\0')`.
#[macro_export]
macro_rules! small_char_set {
    ($($e:expr)+) => {
        $crate::small_char_set::SmallCharSet {
            bits: $( (1u64 << ($e as usize)) )|+
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use tendril::SliceExt;

    #[test]
    fn prefix_len() {
        let set = small_char_set!('&');
        assert_eq!(set.nonmember_prefix_len(&"abc&def".to_tendril()), 3);
        assert_eq!(set.nonmember_prefix_len(&"&def".to_tendril()), 0);
        assert_eq!(set.nonmember_prefix_len(&"nothing".to_tendril()), 7);
    }
}
