use std::cell::RefCell;

use html_engine::token::{CharacterTokens, CommentToken, DoctypeToken, Tag, TagToken, Token, TokenSink, TokenSinkResult};
use html_engine::tokenizer::{Tokenizer, TokenizerOpts};
use markup_core::InputStream;

#[derive(Default)]
struct CollectingSink {
    tokens: RefCell<Vec<Token>>,
}

impl TokenSink for CollectingSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        self.tokens.borrow_mut().push(token);
        TokenSinkResult::Continue
    }
}

fn tokenize(input: &str) -> Vec<Token> {
    let tok = Tokenizer::new(CollectingSink::default(), TokenizerOpts::default());
    let stream = InputStream::new(encoding_rs::UTF_8);
    stream.append(input);
    tok.feed(stream.code_points());
    tok.end();
    tok.into_sink().tokens.into_inner()
}

fn tags<'a>(tokens: &'a [Token]) -> Vec<&'a Tag> {
    tokens
        .iter()
        .filter_map(|t| match t {
            TagToken(tag) => Some(tag),
            _ => None,
        })
        .collect()
}

#[test]
fn tokenizes_simple_element() {
    let tokens = tokenize("<p>hello</p>");
    let names: Vec<&str> = tags(&tokens).iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["p", "p"]);
    assert!(tokens.iter().any(|t| matches!(t, CharacterTokens(s) if &**s == "hello")));
}

#[test]
fn tokenizes_attributes() {
    let tokens = tokenize(r#"<a href="https://example.invalid" class='x'>link</a>"#);
    let a = tags(&tokens).into_iter().find(|t| t.name.as_str() == "a").unwrap();
    assert_eq!(a.attrs.iter().find(|attr| attr.name.local.as_str() == "href").unwrap().value.as_ref(), "https://example.invalid");
    assert_eq!(a.attrs.iter().find(|attr| attr.name.local.as_str() == "class").unwrap().value.as_ref(), "x");
}

#[test]
fn tokenizes_comment() {
    let tokens = tokenize("<!-- a comment -->");
    assert!(tokens.iter().any(|t| matches!(t, CommentToken(c) if &**c == " a comment ")));
}

#[test]
fn tokenizes_doctype() {
    let tokens = tokenize("<!DOCTYPE html>");
    let DoctypeToken(dt) = tokens.iter().find(|t| matches!(t, DoctypeToken(_))).unwrap() else {
        unreachable!()
    };
    assert_eq!(dt.name.as_deref(), Some("html"));
    assert!(!dt.force_quirks);
}

#[test]
fn self_closing_void_tag_is_marked() {
    let tokens = tokenize("<br/>");
    let TagToken(tag) = &tokens[0] else { unreachable!() };
    assert!(tag.self_closing);
}

#[test]
fn rawtext_state_consumes_script_body_verbatim() {
    let tokens = tokenize("<script>if (a < b) { }</script>");
    assert!(tokens.iter().any(|t| matches!(t, CharacterTokens(s) if s.contains("a < b"))));
}
