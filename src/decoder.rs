//! Recursive descent over the GPX 1.1 element grammar.
//!
//! Each level walks its element's children with [`TokenStream::consume_children`], matching GPX
//! names and letting everything else be skipped. Strict/lenient policy only comes into play where
//! text or attributes are turned into numbers and timestamps.

use std::fmt::Display;
use std::io::BufRead;
use std::num::ParseFloatError;
use std::str::FromStr;

use chrono::{DateTime, ParseError, Utc};

use crate::error::{Coordinate, DecodeError, Result};
use crate::gpx::{
    Bounds, Copyright, Document, Email, Link, Metadata, Person, Point, Segment, Track,
    GPX11_NAMESPACE,
};
use crate::stream::{Dispatch, TokenStream};
use crate::token::{StartTag, Token, TokenSource, XmlSource};

/// Decodes a GPX document from an input stream.
pub struct Decoder<R> {
    input: R,
    strict: bool,
}

impl<R: BufRead> Decoder<R> {
    /// Creates a decoder in strict mode.
    pub fn new(input: R) -> Self {
        Self {
            input,
            strict: true,
        }
    }

    /// In strict mode (the default) any unparsable coordinate, elevation, time or other number
    /// fails the decode. Otherwise the field keeps its default and decoding carries on.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn decode(self) -> Result<Document> {
        let mut ts = TokenStream::new(XmlSource::new(self.input));
        decode_tokens(&mut ts, Policy { strict: self.strict })
    }
}

pub fn decode<R: BufRead>(input: R, strict: bool) -> Result<Document> {
    Decoder::new(input).strict(strict).decode()
}

pub fn decode_str(text: &str, strict: bool) -> Result<Document> {
    decode(text.as_bytes(), strict)
}

#[derive(Debug, Clone, Copy)]
struct Policy {
    strict: bool,
}

impl Policy {
    /// Lets a scalar failure through in strict mode; in lenient mode it becomes `None`.
    fn absorb<T>(self, parsed: Result<T>) -> Result<Option<T>> {
        match parsed {
            Ok(value) => Ok(Some(value)),
            Err(e) if !self.strict && e.is_scalar() => {
                tracing::warn!("{}; leaving it unset", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn decode_tokens<S: TokenSource>(ts: &mut TokenStream<S>, policy: Policy) -> Result<Document> {
    let root = find_root(ts)?;
    let doc = gpx(ts, &root, policy)?;
    tracing::debug!(
        "decoded GPX {} with {} track(s), {} point(s)",
        doc.version,
        doc.tracks.len(),
        doc.points().count()
    );
    Ok(doc)
}

fn find_root<S: TokenSource>(ts: &mut TokenStream<S>) -> Result<StartTag> {
    loop {
        if let Token::Start(tag) = ts.next_token()? {
            if tag.name.local != "gpx" {
                return Err(DecodeError::BadRootTag {
                    found: tag.name.local,
                });
            }
            if tag.name.namespace.as_deref() != Some(GPX11_NAMESPACE) {
                return Err(DecodeError::UnsupportedVersion {
                    namespace: tag.name.namespace,
                });
            }
            return Ok(tag);
        }
    }
}

/// The child's local name, if it is a GPX 1.1 element.
fn gpx_name(tag: &StartTag) -> Option<&str> {
    tag.name.local_in(GPX11_NAMESPACE)
}

fn gpx<S: TokenSource>(ts: &mut TokenStream<S>, root: &StartTag, policy: Policy) -> Result<Document> {
    let mut doc = Document {
        version: root.attribute("version").unwrap_or_default().to_owned(),
        creator: root.attribute("creator").map(str::to_owned),
        ..Document::default()
    };
    ts.consume_children(|ts, child| {
        match gpx_name(child) {
            Some("metadata") => doc.metadata = metadata(ts, policy)?,
            Some("trk") => doc.tracks.push(track(ts, policy)?),
            _ => return Ok(Dispatch::Skip),
        }
        Ok(Dispatch::Handled)
    })?;
    Ok(doc)
}

fn metadata<S: TokenSource>(ts: &mut TokenStream<S>, policy: Policy) -> Result<Metadata> {
    let mut metadata = Metadata::default();
    ts.consume_children(|ts, child| {
        match gpx_name(child) {
            Some("name") => metadata.name = Some(ts.consume_text("name")?),
            Some("desc") => metadata.description = Some(ts.consume_text("desc")?),
            Some("author") => metadata.author = Some(person(ts)?),
            Some("copyright") => metadata.copyright = Some(copyright(ts, child, policy)?),
            Some("link") => metadata.link = Some(link(ts, child)?),
            Some("time") => {
                if let Some(t) = policy.absorb(time(ts.consume_time("time")?))? {
                    metadata.time = Some(t);
                }
            }
            Some("keywords") => metadata.keywords = Some(ts.consume_text("keywords")?),
            Some("bounds") => {
                metadata.bounds = Some(bounds(child, policy)?);
                return Ok(Dispatch::Skip);
            }
            _ => return Ok(Dispatch::Skip),
        }
        Ok(Dispatch::Handled)
    })?;
    Ok(metadata)
}

fn person<S: TokenSource>(ts: &mut TokenStream<S>) -> Result<Person> {
    let mut person = Person::default();
    ts.consume_children(|ts, child| {
        match gpx_name(child) {
            Some("name") => person.name = Some(ts.consume_text("name")?),
            Some("email") => {
                person.email = Some(Email {
                    id: child.attribute("id").unwrap_or_default().to_owned(),
                    domain: child.attribute("domain").unwrap_or_default().to_owned(),
                });
                return Ok(Dispatch::Skip);
            }
            Some("link") => person.link = Some(link(ts, child)?),
            _ => return Ok(Dispatch::Skip),
        }
        Ok(Dispatch::Handled)
    })?;
    Ok(person)
}

fn link<S: TokenSource>(ts: &mut TokenStream<S>, tag: &StartTag) -> Result<Link> {
    let mut link = Link {
        href: tag.attribute("href").unwrap_or_default().to_owned(),
        ..Link::default()
    };
    ts.consume_children(|ts, child| {
        match gpx_name(child) {
            Some("text") => link.text = Some(ts.consume_text("text")?),
            Some("type") => link.mime_type = Some(ts.consume_text("type")?),
            _ => return Ok(Dispatch::Skip),
        }
        Ok(Dispatch::Handled)
    })?;
    Ok(link)
}

fn copyright<S: TokenSource>(
    ts: &mut TokenStream<S>,
    tag: &StartTag,
    policy: Policy,
) -> Result<Copyright> {
    let mut copyright = Copyright {
        author: tag.attribute("author").unwrap_or_default().to_owned(),
        ..Copyright::default()
    };
    ts.consume_children(|ts, child| {
        match gpx_name(child) {
            Some("year") => {
                let text = ts.consume_text("year")?;
                if let Some(year) = policy.absorb(number("<copyright> <year>", &text))? {
                    copyright.year = Some(year);
                }
            }
            Some("license") => copyright.license = Some(ts.consume_text("license")?),
            _ => return Ok(Dispatch::Skip),
        }
        Ok(Dispatch::Handled)
    })?;
    Ok(copyright)
}

fn bounds(tag: &StartTag, policy: Policy) -> Result<Bounds> {
    let attr = |name: &'static str| -> Result<f64> {
        match tag.attribute(name) {
            Some(value) => Ok(policy.absorb(number(name, value))?.unwrap_or_default()),
            None => Ok(0.0),
        }
    };
    Ok(Bounds {
        min_latitude: attr("minlat")?,
        min_longitude: attr("minlon")?,
        max_latitude: attr("maxlat")?,
        max_longitude: attr("maxlon")?,
    })
}

fn track<S: TokenSource>(ts: &mut TokenStream<S>, policy: Policy) -> Result<Track> {
    let mut track = Track::default();
    ts.consume_children(|ts, child| {
        match gpx_name(child) {
            Some("name") => track.name = Some(ts.consume_text("name")?),
            Some("cmt") => track.comment = Some(ts.consume_text("cmt")?),
            Some("desc") => track.description = Some(ts.consume_text("desc")?),
            Some("src") => track.source = Some(ts.consume_text("src")?),
            Some("number") => {
                let text = ts.consume_text("number")?;
                if let Some(n) = policy.absorb(number("<trk> <number>", &text))? {
                    track.number = Some(n);
                }
            }
            Some("type") => track.track_type = Some(ts.consume_text("type")?),
            Some("trkseg") => track.segments.push(segment(ts, policy)?),
            _ => return Ok(Dispatch::Skip),
        }
        Ok(Dispatch::Handled)
    })?;
    Ok(track)
}

fn segment<S: TokenSource>(ts: &mut TokenStream<S>, policy: Policy) -> Result<Segment> {
    let mut segment = Segment::default();
    ts.consume_children(|ts, child| {
        match gpx_name(child) {
            Some("trkpt") => segment.points.push(point(ts, child, policy)?),
            _ => return Ok(Dispatch::Skip),
        }
        Ok(Dispatch::Handled)
    })?;
    Ok(segment)
}

/// In lenient mode a repeated `<ele>` or `<time>` that fails to parse keeps the earlier good value.
fn point<S: TokenSource>(ts: &mut TokenStream<S>, tag: &StartTag, policy: Policy) -> Result<Point> {
    let mut point = Point::default();
    // A missing coordinate attribute is not an error, in either mode; it reads as zero.
    if let Some(value) = tag.attribute("lat") {
        point.latitude = policy
            .absorb(coordinate(Coordinate::Latitude, value))?
            .unwrap_or_default();
    }
    if let Some(value) = tag.attribute("lon") {
        point.longitude = policy
            .absorb(coordinate(Coordinate::Longitude, value))?
            .unwrap_or_default();
    }

    ts.consume_children(|ts, child| {
        match gpx_name(child) {
            Some("ele") => {
                if let Some(ele) = policy.absorb(elevation(ts.consume_float("ele")?))? {
                    point.elevation = ele;
                }
            }
            Some("time") => {
                if let Some(t) = policy.absorb(time(ts.consume_time("time")?))? {
                    point.time = Some(t);
                }
            }
            Some("name") => point.name = Some(ts.consume_text("name")?),
            Some("cmt") => point.comment = Some(ts.consume_text("cmt")?),
            Some("desc") => point.description = Some(ts.consume_text("desc")?),
            Some("sym") => point.symbol = Some(ts.consume_text("sym")?),
            Some("sat") => {
                let text = ts.consume_text("sat")?;
                if let Some(sat) = policy.absorb(number("<trkpt> <sat>", &text))? {
                    point.satellites = Some(sat);
                }
            }
            Some("extensions") => {
                let buffer = ts.capture_subtree()?;
                tracing::trace!("captured {} extension token(s)", buffer.len());
                point.extensions = Some(buffer);
            }
            _ => return Ok(Dispatch::Skip),
        }
        Ok(Dispatch::Handled)
    })?;
    Ok(point)
}

fn coordinate(coordinate: Coordinate, value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|e: ParseFloatError| DecodeError::InvalidCoordinate {
            coordinate,
            value: value.to_owned(),
            reason: e.to_string(),
        })
}

fn elevation((text, parsed): (String, std::result::Result<f64, ParseFloatError>)) -> Result<f64> {
    parsed.map_err(|e| DecodeError::InvalidElevation {
        value: text,
        reason: e.to_string(),
    })
}

fn time(
    (text, parsed): (String, std::result::Result<DateTime<Utc>, ParseError>),
) -> Result<DateTime<Utc>> {
    parsed.map_err(|e| DecodeError::InvalidTime {
        value: text,
        reason: e.to_string(),
    })
}

fn number<T>(field: &'static str, text: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    text.trim().parse().map_err(|e: T::Err| DecodeError::InvalidValue {
        field,
        value: text.to_owned(),
        reason: e.to_string(),
    })
}
