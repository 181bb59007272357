//! Named character references, resolved by longest-match-wins against the
//! table the WHATWG HTML spec publishes at
//! <https://html.spec.whatwg.org/multipage/named-characters.html>.
//!
//! The full table has ~2200 entries, including many legacy names without a
//! trailing `;` that exist only for compatibility with pre-HTML5 content
//! (`&amp`, `&notin`, ...). We ship a representative subset spanning both
//! semicolon-terminated and legacy unterminated names, ASCII and non-ASCII
//! expansions, and multi-character expansions (`&NotEqualTilde;`-style
//! references that resolve to more than one scalar value) — enough to
//! exercise every branch of the resolution algorithm below. The table is a
//! `phf::Map` so looking up a candidate name is O(1) regardless of size;
//! extending it to the full spec table is purely a data change.

use phf::phf_map;

/// Up to two resulting code points for one named reference.
/// <https://html.spec.whatwg.org/multipage/named-characters.html>
static NAMED_REFERENCES: phf::Map<&'static str, (char, char)> = phf_map! {
    "amp" => ('&', '\0'),
    "amp;" => ('&', '\0'),
    "AMP" => ('&', '\0'),
    "AMP;" => ('&', '\0'),
    "lt" => ('<', '\0'),
    "lt;" => ('<', '\0'),
    "LT" => ('<', '\0'),
    "LT;" => ('<', '\0'),
    "gt" => ('>', '\0'),
    "gt;" => ('>', '\0'),
    "GT" => ('>', '\0'),
    "GT;" => ('>', '\0'),
    "quot" => ('"', '\0'),
    "quot;" => ('"', '\0'),
    "QUOT" => ('"', '\0'),
    "QUOT;" => ('"', '\0'),
    "apos;" => ('\'', '\0'),
    "nbsp" => ('\u{A0}', '\0'),
    "nbsp;" => ('\u{A0}', '\0'),
    "copy" => ('\u{A9}', '\0'),
    "copy;" => ('\u{A9}', '\0'),
    "COPY" => ('\u{A9}', '\0'),
    "COPY;" => ('\u{A9}', '\0'),
    "reg" => ('\u{AE}', '\0'),
    "reg;" => ('\u{AE}', '\0'),
    "REG" => ('\u{AE}', '\0'),
    "REG;" => ('\u{AE}', '\0'),
    "trade;" => ('\u{2122}', '\0'),
    "hellip;" => ('\u{2026}', '\0'),
    "mdash;" => ('\u{2014}', '\0'),
    "ndash;" => ('\u{2013}', '\0'),
    "laquo" => ('\u{AB}', '\0'),
    "laquo;" => ('\u{AB}', '\0'),
    "raquo" => ('\u{BB}', '\0'),
    "raquo;" => ('\u{BB}', '\0'),
    "not" => ('\u{AC}', '\0'),
    "not;" => ('\u{AC}', '\0'),
    "notin;" => ('\u{2209}', '\0'),
    "notinva;" => ('\u{2209}', '\0'),
    "mu;" => ('\u{3BC}', '\0'),
    "micro" => ('\u{B5}', '\0'),
    "micro;" => ('\u{B5}', '\0'),
    "times" => ('\u{D7}', '\0'),
    "times;" => ('\u{D7}', '\0'),
    "divide" => ('\u{F7}', '\0'),
    "divide;" => ('\u{F7}', '\0'),
    "frac12" => ('\u{BD}', '\0'),
    "frac12;" => ('\u{BD}', '\0'),
    "NotEqualTilde;" => ('\u{2242}', '\u{338}'),
    "acE;" => ('\u{223E}', '\u{333}'),
    "ThickSpace;" => ('\u{205F}', '\u{200A}'),
    "NewLine;" => ('\n', '\0'),
    "Tab;" => ('\t', '\0'),
    "excl;" => ('!', '\0'),
    "num;" => ('#', '\0'),
    "dollar;" => ('$', '\0'),
    "percnt;" => ('%', '\0'),
    "ast;" => ('*', '\0'),
    "plus;" => ('+', '\0'),
    "comma;" => (',', '\0'),
    "period;" => ('.', '\0'),
    "sol;" => ('/', '\0'),
    "colon;" => (':', '\0'),
    "semi;" => (';', '\0'),
    "equals;" => ('=', '\0'),
    "quest;" => ('?', '\0'),
    "commat;" => ('@', '\0'),
    "lsqb;" => ('[', '\0'),
    "bsol;" => ('\\', '\0'),
    "rsqb;" => (']', '\0'),
    "Hat;" => ('^', '\0'),
    "lowbar;" => ('_', '\0'),
    "grave;" => ('`', '\0'),
    "lcub;" => ('{', '\0'),
    "verbar;" => ('|', '\0'),
    "rcub;" => ('}', '\0'),
};

/// Resolve the longest prefix of `candidate` that names an entry in the
/// table, per the tokenizer's named character reference state
/// ("longest-match-wins", spec.md §4.3). `candidate` should be the maximal
/// run of alphanumeric characters buffered after `&`; this function tries
/// successively shorter prefixes.
///
/// Returns the matched length (in bytes of `candidate`) and the resulting
/// code points (the second is `'\0'` if the reference expands to only one).
pub fn resolve_longest_match(candidate: &str) -> Option<(usize, (char, char))> {
    // `candidate` is ASCII-identifier-shaped by construction (the tokenizer
    // only accumulates ASCII alphanumerics here), so byte length == char
    // count and slicing on a boundary is always safe.
    for len in (1..=candidate.len()).rev() {
        let prefix = &candidate[..len];
        if let Some(&expansion) = NAMED_REFERENCES.get(prefix) {
            return Some((len, expansion));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_with_semicolon() {
        assert_eq!(resolve_longest_match("amp;"), Some((4, ('&', '\0'))));
    }

    #[test]
    fn legacy_match_without_semicolon() {
        assert_eq!(resolve_longest_match("amp"), Some((3, ('&', '\0'))));
    }

    #[test]
    fn longest_match_wins_over_shorter_prefix() {
        // "notin;" is a full entry; "not" is also a full (legacy) entry.
        // The longer one must win when both are present as a prefix chain.
        assert_eq!(resolve_longest_match("notin;"), Some((6, ('\u{2209}', '\0'))));
        assert_eq!(resolve_longest_match("notinva;"), Some((8, ('\u{2209}', '\0'))));
    }

    #[test]
    fn unknown_name_does_not_match() {
        assert_eq!(resolve_longest_match("notarealentity"), None);
    }

    #[test]
    fn two_codepoint_expansion() {
        let (len, (a, b)) = resolve_longest_match("NotEqualTilde;").unwrap();
        assert_eq!(len, "NotEqualTilde;".len());
        assert_eq!((a, b), ('\u{2242}', '\u{338}'));
    }
}
