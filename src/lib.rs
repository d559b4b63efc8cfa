//! Streaming decoder for GPX 1.1 documents.
//!
//! ```no_run
//! # fn main() -> Result<(), gpx_decode::DecodeError> {
//! use gpx_decode::{Decoder, TrackPointExtension};
//!
//! let file = std::io::BufReader::new(std::fs::File::open("run.gpx").unwrap());
//! let doc = Decoder::new(file).strict(false).decode()?;
//! for point in doc.points() {
//!     if let Ok(ext) = point.extension::<TrackPointExtension>() {
//!         println!("{} bpm", ext.heart_rate.unwrap_or_default());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod decoder;
mod error;
mod extensions;
mod gpx;
pub mod stats;
pub mod stream;
pub mod token;
pub mod units;

pub use crate::decoder::{decode, decode_str, Decoder};
pub use crate::error::{Coordinate, DecodeError, Result};
pub use crate::extensions::{
    parse_extension, parse_trackpoint_extension, Extension, TrackPointExtension,
    GARMIN_TRACKPOINT_V1, GARMIN_TRACKPOINT_V2,
};
pub use crate::gpx::{
    Bounds, Copyright, Document, Email, Link, Metadata, Person, Point, Segment, Track,
    GPX11_NAMESPACE,
};
pub use crate::token::TokenBuffer;
