//! Deferred decoding of `<extensions>` content.
//!
//! The decoder only captures a point's extension tokens. Each extension type re-reads that
//! buffer on its own, looking for its envelope element, so any number of them can be applied to
//! the same point without the decoder knowing about any of them.

use crate::error::{DecodeError, Result};
use crate::stream::{Dispatch, TokenStream};
use crate::token::{Token, TokenBuffer, TokenSource};

/// An extension schema that can be read out of a captured token buffer.
///
/// Field values are best-effort: `set_field` is expected to leave a field at its default when the
/// text doesn't parse, rather than fail.
pub trait Extension: Default {
    /// Namespaces the envelope may be in. Fields are read only from the envelope's namespace.
    const NAMESPACES: &'static [&'static str];
    /// Local name of the envelope element.
    const ENVELOPE: &'static str;

    fn is_field(local: &str) -> bool;
    fn set_field(&mut self, local: &str, text: &str);
}

/// Decodes extension `E` from a point's extension tokens.
pub fn parse_extension<E: Extension>(buffer: &TokenBuffer) -> Result<E> {
    let mut ts = TokenStream::new(buffer.source());
    let namespace = match find_envelope(&mut ts, E::NAMESPACES, E::ENVELOPE)? {
        Some(ns) => ns,
        None => return Err(DecodeError::ExtensionNotPresent { envelope: E::ENVELOPE }),
    };

    let mut ext = E::default();
    ts.consume_children(|ts, child| match child.name.local_in(&namespace) {
        Some(local) if E::is_field(local) => {
            let text = ts.consume_text(local)?;
            ext.set_field(local, text.trim());
            Ok(Dispatch::Handled)
        }
        _ => Ok(Dispatch::Skip),
    })?;
    Ok(ext)
}

/// Scans top-level elements for the envelope, skipping the others whole. Returns the namespace it
/// was found in, leaving the stream just inside it.
fn find_envelope<S: TokenSource>(
    ts: &mut TokenStream<S>,
    namespaces: &[&str],
    local: &str,
) -> Result<Option<String>> {
    while let Some(token) = ts.try_next_token()? {
        if let Token::Start(tag) = token {
            let found = namespaces.iter().find(|ns| tag.name.is(ns, local));
            match found {
                Some(ns) => return Ok(Some((*ns).to_owned())),
                None => ts.skip_subtree()?,
            }
        }
    }
    Ok(None)
}

pub const GARMIN_TRACKPOINT_V1: &str = "http://www.garmin.com/xmlschemas/TrackPointExtension/v1";
pub const GARMIN_TRACKPOINT_V2: &str = "http://www.garmin.com/xmlschemas/TrackPointExtension/v2";

/// Garmin's TrackPoint extension, from
/// <https://www8.garmin.com/xmlschemas/TrackPointExtensionv1.xsd> and its v2 successor. Unset
/// fields were either absent or unparsable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackPointExtension {
    /// Air temperature, Celsius.
    pub air_temperature: Option<f64>,
    /// Water temperature, Celsius.
    pub water_temperature: Option<f64>,
    /// Diving depth, meters.
    pub depth: Option<f64>,
    /// Beats per minute.
    pub heart_rate: Option<u32>,
    /// Revolutions per minute.
    pub cadence: Option<u32>,
    /// Meters per second (v2 only).
    pub speed: Option<f64>,
    /// Degrees true (v2 only).
    pub course: Option<f64>,
}

impl Extension for TrackPointExtension {
    const NAMESPACES: &'static [&'static str] = &[GARMIN_TRACKPOINT_V1, GARMIN_TRACKPOINT_V2];
    const ENVELOPE: &'static str = "TrackPointExtension";

    fn is_field(local: &str) -> bool {
        matches!(
            local,
            "atemp" | "wtemp" | "depth" | "hr" | "cad" | "speed" | "course"
        )
    }

    fn set_field(&mut self, local: &str, text: &str) {
        match local {
            "atemp" => self.air_temperature = text.parse().ok(),
            "wtemp" => self.water_temperature = text.parse().ok(),
            "depth" => self.depth = text.parse().ok(),
            "hr" => self.heart_rate = text.parse().ok(),
            "cad" => self.cadence = text.parse().ok(),
            "speed" => self.speed = text.parse().ok(),
            "course" => self.course = text.parse().ok(),
            _ => (),
        }
    }
}

/// Decodes Garmin's TrackPoint extension from a point's extension tokens.
pub fn parse_trackpoint_extension(buffer: &TokenBuffer) -> Result<TrackPointExtension> {
    parse_extension(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::XmlSource;

    /// Captures the content of a standalone `<extensions>` element.
    fn capture(xml: &str) -> TokenBuffer {
        let mut ts = TokenStream::new(XmlSource::new(xml.as_bytes()));
        assert!(matches!(ts.next_token().unwrap(), Token::Start(_)));
        ts.capture_subtree().unwrap()
    }

    #[test]
    fn garmin_fields() {
        let buffer = capture(
            r#"<extensions xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
                <gpxtpx:TrackPointExtension>
                    <gpxtpx:atemp>21.5</gpxtpx:atemp>
                    <gpxtpx:hr>142</gpxtpx:hr>
                    <gpxtpx:cad>90</gpxtpx:cad>
                    <gpxtpx:unknown><gpxtpx:hr>1</gpxtpx:hr></gpxtpx:unknown>
                </gpxtpx:TrackPointExtension>
            </extensions>"#,
        );
        let ext = parse_trackpoint_extension(&buffer).unwrap();
        assert_eq!(ext.heart_rate, Some(142));
        assert_eq!(ext.cadence, Some(90));
        assert_eq!(ext.air_temperature, Some(21.5));
        assert_eq!(ext.depth, None);
    }

    #[test]
    fn bad_numbers_are_left_unset() {
        let buffer = capture(
            r#"<extensions><TrackPointExtension xmlns="http://www.garmin.com/xmlschemas/TrackPointExtension/v2">
                <hr>fast</hr><cad>-3</cad><speed>2.5</speed>
            </TrackPointExtension></extensions>"#,
        );
        let ext = parse_trackpoint_extension(&buffer).unwrap();
        assert_eq!(ext.heart_rate, None);
        assert_eq!(ext.cadence, None);
        assert_eq!(ext.speed, Some(2.5));
    }

    #[test]
    fn envelope_after_other_extensions() {
        let buffer = capture(
            r#"<extensions xmlns:o="urn:other" xmlns:g="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
                <o:power><o:TrackPointExtension>1</o:TrackPointExtension></o:power>
                <g:TrackPointExtension><g:hr>120</g:hr><o:hr>99</o:hr></g:TrackPointExtension>
            </extensions>"#,
        );
        let ext = parse_trackpoint_extension(&buffer).unwrap();
        assert_eq!(ext.heart_rate, Some(120));
    }

    #[test]
    fn missing_envelope() {
        let buffer = capture(r#"<extensions xmlns:o="urn:other"><o:power>200</o:power></extensions>"#);
        assert!(matches!(
            parse_trackpoint_extension(&buffer),
            Err(DecodeError::ExtensionNotPresent { envelope: "TrackPointExtension" })
        ));
        assert!(matches!(
            parse_trackpoint_extension(&TokenBuffer::default()),
            Err(DecodeError::ExtensionNotPresent { .. })
        ));
    }

    #[test]
    fn custom_extension() {
        #[derive(Default)]
        struct Power {
            watts: Option<u32>,
        }

        impl Extension for Power {
            const NAMESPACES: &'static [&'static str] = &["urn:power"];
            const ENVELOPE: &'static str = "Power";
            fn is_field(local: &str) -> bool {
                local == "watts"
            }
            fn set_field(&mut self, _local: &str, text: &str) {
                self.watts = text.parse().ok();
            }
        }

        let buffer = capture(
            r#"<extensions><Power xmlns="urn:power"><watts>250</watts></Power></extensions>"#,
        );
        let power: Power = parse_extension(&buffer).unwrap();
        assert_eq!(power.watts, Some(250));
        assert!(matches!(
            parse_trackpoint_extension(&buffer),
            Err(DecodeError::ExtensionNotPresent { .. })
        ));
    }
}
