use std::fmt::{Display, Formatter, Result as FmtResult};

pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

/// Which attribute of a `<trkpt>` failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinate {
    Latitude,
    Longitude,
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Coordinate::Latitude => "lat",
            Coordinate::Longitude => "lon",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The tokenizer failed: I/O error or XML that is not well-formed.
    #[error("gpx: {0}")]
    Transport(#[from] quick_xml::Error),

    #[error("gpx: name is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("gpx: unexpected end of input")]
    UnexpectedEof,

    #[error("gpx: root element must be <gpx>, found <{found}>")]
    BadRootTag { found: String },

    #[error("gpx: can only parse GPX 1.1 documents (namespace {namespace:?})")]
    UnsupportedVersion { namespace: Option<String> },

    /// A leaf element contained a nested element instead of text. Fatal in every mode.
    #[error("gpx: unexpected element <{found}> while reading <{element}>")]
    MalformedLeaf { element: String, found: String },

    #[error("gpx: invalid <trkpt> {coordinate} {value:?}: {reason}")]
    InvalidCoordinate {
        coordinate: Coordinate,
        value: String,
        reason: String,
    },

    #[error("gpx: invalid <ele> {value:?}: {reason}")]
    InvalidElevation { value: String, reason: String },

    #[error("gpx: invalid <time> {value:?}: {reason}")]
    InvalidTime { value: String, reason: String },

    #[error("gpx: invalid {field} {value:?}: {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// The requested extension envelope is not in the token buffer. This is an expected outcome
    /// for points recorded without that extension.
    #[error("gpx: no such extension <{envelope}>")]
    ExtensionNotPresent { envelope: &'static str },
}

impl DecodeError {
    /// True for the scalar parse failures that lenient mode absorbs.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            DecodeError::InvalidCoordinate { .. }
                | DecodeError::InvalidElevation { .. }
                | DecodeError::InvalidTime { .. }
                | DecodeError::InvalidValue { .. }
        )
    }
}
