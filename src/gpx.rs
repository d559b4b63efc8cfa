//! The decoded GPX 1.1 document model. Everything is owned; nothing is shared between points.

use chrono::{DateTime, Utc};

use crate::error::{DecodeError, Result};
use crate::extensions::{parse_extension, Extension};
use crate::token::TokenBuffer;

pub const GPX11_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// The root's `version` attribute, verbatim.
    pub version: String,
    pub creator: Option<String>,
    pub metadata: Metadata,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<Person>,
    pub copyright: Option<Copyright>,
    pub link: Option<Link>,
    pub time: Option<DateTime<Utc>>,
    pub keywords: Option<String>,
    pub bounds: Option<Bounds>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub link: Option<Link>,
}

/// An email address split into `id` and `domain`, as GPX writes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Email {
    pub id: String,
    pub domain: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Link {
    pub href: String,
    pub text: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Copyright {
    pub author: String,
    pub year: Option<i32>,
    pub license: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub min_latitude: f64,
    pub min_longitude: f64,
    pub max_latitude: f64,
    pub max_longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub number: Option<u32>,
    pub track_type: Option<String>,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segment {
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point {
    /// Zero when the attribute is missing, or unparsable in lenient mode.
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub time: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub symbol: Option<String>,
    pub satellites: Option<u32>,

    /// The raw tokens inside `<extensions>`, if the point had one. Interpret with
    /// [`Point::extension`].
    pub extensions: Option<TokenBuffer>,
}

impl Point {
    /// Decodes one extension from this point's captured `<extensions>` content.
    pub fn extension<E: Extension>(&self) -> Result<E> {
        match &self.extensions {
            Some(buffer) => parse_extension(buffer),
            None => Err(DecodeError::ExtensionNotPresent {
                envelope: E::ENVELOPE,
            }),
        }
    }
}

impl Document {
    pub fn points(&self) -> impl Iterator<Item = &Point> {
        self.tracks
            .iter()
            .flat_map(|t| t.segments.iter())
            .flat_map(|s| s.points.iter())
    }
}
