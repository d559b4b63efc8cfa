//! Structural XML tokens and the sources that produce them.
//!
//! The decoder never sees the tokenizer directly; it pulls [`Token`]s from a [`TokenSource`].
//! [`XmlSource`] tokenizes live input, and [`BufferSource`] replays a captured [`TokenBuffer`].

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::error::Result;

/// A namespace-resolved element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub namespace: Option<String>,
    pub local: String,
}

impl Name {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_owned),
            local: local.to_owned(),
        }
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local == local
    }

    /// The local name, if this name is in the given namespace.
    pub fn local_in(&self, namespace: &str) -> Option<&str> {
        if self.namespace.as_deref() == Some(namespace) {
            Some(&self.local)
        } else {
            None
        }
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: Name,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    pub name: Name,
    pub attributes: Vec<Attribute>,
}

impl StartTag {
    /// Looks up an attribute with no namespace, which is how GPX attributes are written.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Start(StartTag),
    End(Name),
    Text(String),
}

/// Anything that yields structural tokens in document order. `Ok(None)` is end of input.
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Option<Token>>;
}

/// Tokenizes live XML input.
///
/// Empty elements come out as a start/end pair. Text is unescaped but otherwise kept exactly as
/// written; whitespace-only text (indentation) yields nothing. CDATA is text, and comments,
/// declarations, processing instructions and doctypes are dropped.
pub struct XmlSource<R> {
    reader: NsReader<R>,
    buf: Vec<u8>,
}

impl<R: BufRead> XmlSource<R> {
    pub fn new(input: R) -> Self {
        let mut reader = NsReader::from_reader(input);
        let config = reader.config_mut();
        config.expand_empty_elements = true;
        config.trim_text(false);
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> TokenSource for XmlSource<R> {
    fn next_token(&mut self) -> Result<Option<Token>> {
        loop {
            // Tokens are copied out of `buf`, which the reader reuses on every call.
            self.buf.clear();
            let (ns, event) = self.reader.read_resolved_event_into(&mut self.buf)?;
            let namespace = namespace_uri(ns)?;
            match event {
                Event::Start(start) => {
                    let tag = start_tag(&self.reader, namespace, &start)?;
                    return Ok(Some(Token::Start(tag)));
                }
                Event::End(end) => {
                    let local = std::str::from_utf8(end.local_name().as_ref())?.to_owned();
                    return Ok(Some(Token::End(Name { namespace, local })));
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(quick_xml::Error::from)?;
                    if !text.trim().is_empty() {
                        return Ok(Some(Token::Text(text.into_owned())));
                    }
                }
                Event::CData(cdata) => {
                    let text = std::str::from_utf8(&cdata)?;
                    if !text.trim().is_empty() {
                        return Ok(Some(Token::Text(text.to_owned())));
                    }
                }
                Event::Eof => return Ok(None),
                _ => (),
            }
        }
    }
}

fn namespace_uri(ns: ResolveResult<'_>) -> Result<Option<String>> {
    match ns {
        ResolveResult::Bound(ns) => Ok(Some(std::str::from_utf8(ns.as_ref())?.to_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => {
            tracing::trace!(
                "undeclared namespace prefix {:?}",
                String::from_utf8_lossy(&prefix)
            );
            Ok(None)
        }
    }
}

fn start_tag<R>(
    reader: &NsReader<R>,
    namespace: Option<String>,
    start: &BytesStart<'_>,
) -> Result<StartTag> {
    let local = std::str::from_utf8(start.local_name().as_ref())?.to_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (ns, attr_local) = reader.resolve_attribute(attr.key);
        let name = Name {
            namespace: namespace_uri(ns)?,
            local: std::str::from_utf8(attr_local.as_ref())?.to_owned(),
        };
        let value = attr
            .unescape_value()
            .map_err(quick_xml::Error::from)?
            .into_owned();
        attributes.push(Attribute { name, value });
    }
    Ok(StartTag {
        name: Name { namespace, local },
        attributes,
    })
}

/// A verbatim, immutable copy of the tokens inside one element, excluding the element's own
/// start and end tags. Replay it through [`TokenBuffer::source`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenBuffer {
    tokens: Vec<Token>,
}

impl TokenBuffer {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn source(&self) -> BufferSource<'_> {
        BufferSource {
            tokens: self.tokens.iter(),
        }
    }
}

/// Replays a [`TokenBuffer`]. Running off the end is end of input, never an error.
pub struct BufferSource<'a> {
    tokens: std::slice::Iter<'a, Token>,
}

impl TokenSource for BufferSource<'_> {
    fn next_token(&mut self) -> Result<Option<Token>> {
        Ok(self.tokens.next().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(xml: &str) -> Vec<Token> {
        let mut source = XmlSource::new(xml.as_bytes());
        let mut out = vec![];
        while let Some(tok) = source.next_token().unwrap() {
            out.push(tok);
        }
        out
    }

    #[test]
    fn resolves_namespaces() {
        let toks = tokens(r#"<a xmlns="urn:a" xmlns:b="urn:b"><b:c b:x="1" y="2"/></a>"#);
        assert_eq!(toks.len(), 4);
        match &toks[1] {
            Token::Start(tag) => {
                assert!(tag.name.is("urn:b", "c"));
                assert_eq!(tag.attributes.len(), 2);
                assert_eq!(tag.attribute("y"), Some("2"));
                assert_eq!(tag.attribute("x"), None);
                assert!(tag.attributes[0].name.is("urn:b", "x"));
            }
            other => panic!("expected start tag, got {:?}", other),
        }
        assert_eq!(toks[2], Token::End(Name::new(Some("urn:b"), "c")));
        assert_eq!(toks[3], Token::End(Name::new(Some("urn:a"), "a")));
    }

    #[test]
    fn text_is_unescaped_and_kept_verbatim() {
        let toks = tokens("<?xml version=\"1.0\"?>\n<a>\n  <b> x &amp; y </b><!-- note --><c><![CDATA[<raw>]]></c>\n</a>");
        let texts: Vec<&str> = toks
            .iter()
            .filter_map(|t| match t {
                Token::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec![" x & y ", "<raw>"]);
    }

    #[test]
    fn malformed_xml_is_a_transport_error() {
        let mut source = XmlSource::new("<a><b></a>".as_bytes());
        let err = loop {
            match source.next_token() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected an error"),
                Err(e) => break e,
            }
        };
        assert!(matches!(err, crate::DecodeError::Transport(_)));
    }

    #[test]
    fn buffer_replays_in_order() {
        let captured = tokens("<a><b>1</b></a>");
        let buffer = TokenBuffer::new(captured.clone());
        assert_eq!(buffer.len(), 5);
        let mut source = buffer.source();
        for tok in &captured {
            assert_eq!(source.next_token().unwrap().as_ref(), Some(tok));
        }
        assert_eq!(source.next_token().unwrap(), None);
        assert_eq!(source.next_token().unwrap(), None);
    }
}
