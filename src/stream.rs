//! GPX-aware reading primitives on top of a [`TokenSource`].

use std::num::ParseFloatError;

use chrono::{DateTime, NaiveDateTime, ParseError, Utc};

use crate::error::{DecodeError, Result};
use crate::token::{StartTag, Token, TokenBuffer, TokenSource};

/// What a child handler did with the start tag it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The handler consumed the child, including its end tag.
    Handled,
    /// The stream skips the rest of the child subtree. Unrecognized children are skipped whole;
    /// attribute-only children are skipped once their start tag has been read.
    Skip,
}

pub struct TokenStream<S> {
    source: S,
}

impl<S: TokenSource> TokenStream<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// The next token, or `None` at end of input.
    pub fn try_next_token(&mut self) -> Result<Option<Token>> {
        self.source.next_token()
    }

    /// The next token. Running out of input here means an element was left open.
    pub fn next_token(&mut self) -> Result<Token> {
        self.source
            .next_token()?
            .ok_or(DecodeError::UnexpectedEof)
    }

    /// Reads the text content of the leaf element `element`, whose start tag was just consumed,
    /// up to and including its end tag.
    pub fn consume_text(&mut self, element: &str) -> Result<String> {
        let mut s = String::new();
        loop {
            match self.next_token()? {
                Token::Text(text) => s.push_str(&text),
                Token::End(_) => return Ok(s),
                Token::Start(tag) => {
                    return Err(DecodeError::MalformedLeaf {
                        element: element.to_owned(),
                        found: tag.name.local,
                    });
                }
            }
        }
    }

    /// Reads a leaf element as a float. The outer error is structural; the inner one is the
    /// value failing to parse, and is left to the caller's policy along with the raw text.
    pub fn consume_float(
        &mut self,
        element: &str,
    ) -> Result<(String, std::result::Result<f64, ParseFloatError>)> {
        let text = self.consume_text(element)?;
        let parsed = text.trim().parse::<f64>();
        Ok((text, parsed))
    }

    /// Reads a leaf element as an RFC 3339 timestamp. See [`consume_float`](Self::consume_float).
    pub fn consume_time(
        &mut self,
        element: &str,
    ) -> Result<(String, std::result::Result<DateTime<Utc>, ParseError>)> {
        let text = self.consume_text(element)?;
        let parsed = parse_time(text.trim());
        Ok((text, parsed))
    }

    /// Discards the rest of the current element, whose start tag was just consumed, through its
    /// matching end tag.
    pub fn skip_subtree(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next_token()? {
                Token::Start(_) => depth += 1,
                Token::End(name) => {
                    if depth == 0 {
                        tracing::trace!("skipped <{}>", name);
                        return Ok(());
                    }
                    depth -= 1;
                }
                Token::Text(_) => (),
            }
        }
    }

    /// Copies the rest of the current element into a buffer, leaving out its end tag.
    pub fn capture_subtree(&mut self) -> Result<TokenBuffer> {
        let mut depth = 0usize;
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            match &token {
                Token::Start(_) => depth += 1,
                Token::End(_) => {
                    if depth == 0 {
                        return Ok(TokenBuffer::new(tokens));
                    }
                    depth -= 1;
                }
                Token::Text(_) => (),
            }
            tokens.push(token);
        }
    }

    /// Walks the children of the current element until its end tag, handing each child's start
    /// tag to `handler`. Children the handler doesn't recognize are skipped whole; text between
    /// children is ignored.
    pub fn consume_children<F>(&mut self, mut handler: F) -> Result<()>
    where
        F: FnMut(&mut Self, &StartTag) -> Result<Dispatch>,
    {
        loop {
            match self.next_token()? {
                Token::Start(tag) => {
                    if handler(self, &tag)? == Dispatch::Skip {
                        self.skip_subtree()?;
                    }
                }
                Token::End(_) => return Ok(()),
                Token::Text(_) => (),
            }
        }
    }
}

/// Parses an RFC 3339 timestamp. A timestamp with no UTC offset, which some devices write, is
/// taken to be UTC.
pub fn parse_time(s: &str) -> std::result::Result<DateTime<Utc>, ParseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|e| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
                .map_err(|_| e) // report the RFC 3339 failure
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::XmlSource;
    use chrono::TimeZone;

    fn stream(xml: &str) -> TokenStream<XmlSource<&[u8]>> {
        let mut ts = TokenStream::new(XmlSource::new(xml.as_bytes()));
        // Step inside the root element.
        assert!(matches!(ts.next_token().unwrap(), Token::Start(_)));
        ts
    }

    #[test]
    fn text_until_close() {
        let mut ts = stream("<name>Morning<![CDATA[ run]]></name>");
        assert_eq!(ts.consume_text("name").unwrap(), "Morning run");
        assert!(ts.try_next_token().unwrap().is_none());
    }

    #[test]
    fn nested_element_in_leaf() {
        let mut ts = stream("<ele><b>1</b></ele>");
        match ts.consume_text("ele") {
            Err(DecodeError::MalformedLeaf { element, found }) => {
                assert_eq!(element, "ele");
                assert_eq!(found, "b");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn scalars_leave_parse_errors_to_caller() {
        let mut ts = stream("<p><ele> 12.5 </ele><ele>high</ele><time>2015-12-13T18:35:18Z</time></p>");
        assert!(matches!(ts.next_token().unwrap(), Token::Start(_)));
        assert_eq!(ts.consume_float("ele").unwrap().1, Ok(12.5));
        assert!(matches!(ts.next_token().unwrap(), Token::Start(_)));
        let (text, parsed) = ts.consume_float("ele").unwrap();
        assert_eq!(text, "high");
        assert!(parsed.is_err());
        assert!(matches!(ts.next_token().unwrap(), Token::Start(_)));
        let (_, parsed) = ts.consume_time("time").unwrap();
        assert_eq!(parsed, Ok(Utc.with_ymd_and_hms(2015, 12, 13, 18, 35, 18).unwrap()));
    }

    #[test]
    fn skip_balanced() {
        let mut ts = stream("<a><x><x>1</x><y/></x><b>2</b></a>");
        assert!(matches!(ts.next_token().unwrap(), Token::Start(_)));
        ts.skip_subtree().unwrap();
        match ts.next_token().unwrap() {
            Token::Start(tag) => assert_eq!(tag.name.local, "b"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn skip_hits_eof() {
        let buffer = TokenBuffer::default();
        let mut ts = TokenStream::new(buffer.source());
        assert!(matches!(ts.skip_subtree(), Err(DecodeError::UnexpectedEof)));
    }

    #[test]
    fn capture_excludes_wrapper() {
        let mut ts = stream("<extensions><a>1<b/></a>text</extensions>");
        let buffer = ts.capture_subtree().unwrap();
        // <a>, "1", <b>, </b>, </a>, "text"
        assert_eq!(buffer.len(), 6);
        assert!(ts.try_next_token().unwrap().is_none());
    }

    #[test]
    fn capture_keeps_text_verbatim() {
        let mut ts = stream("<extensions>\n  <n xmlns=\"urn:x\">  two  spaces  <b/> tail </n>\n</extensions>");
        let buffer = ts.capture_subtree().unwrap();
        let mut replay = TokenStream::new(buffer.source());
        let mut texts = vec![];
        while let Some(token) = replay.try_next_token().unwrap() {
            if let Token::Text(text) = token {
                texts.push(text);
            }
        }
        assert_eq!(texts, vec!["  two  spaces  ", " tail "]);
        // <n>, text, <b>, </b>, text, </n>; indentation produces nothing.
        assert_eq!(buffer.len(), 6);
    }

    #[test]
    fn children_dispatch() {
        let mut ts = stream("<a><x>skip<x/></x><b>1</b>loose<b>2</b></a>");
        let mut seen = vec![];
        ts.consume_children(|ts, tag| {
            if tag.name.local == "b" {
                seen.push(ts.consume_text("b")?);
                Ok(Dispatch::Handled)
            } else {
                Ok(Dispatch::Skip)
            }
        })
        .unwrap();
        assert_eq!(seen, vec!["1", "2"]);
        assert!(ts.try_next_token().unwrap().is_none());
    }

    #[test]
    fn time_without_offset_is_utc() {
        assert_eq!(
            parse_time("2015-12-13T18:35:18.500"),
            Ok(Utc.with_ymd_and_hms(2015, 12, 13, 18, 35, 18).unwrap()
                + chrono::Duration::milliseconds(500))
        );
        assert!(parse_time("yesterday").is_err());
    }
}
