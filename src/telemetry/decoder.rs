//! # Status Document Decoder
//!
//! Decodes the XML status document served by the flight-data source into a
//! [`RawSample`].
//!
//! Only the direct children of the root element are inspected; the root name
//! itself is not checked. The first `<cmd.pos.altitude>` and the first
//! `<est.att.roll>` win, their text content (including nested text) is trimmed
//! and parsed with standard decimal notation.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::protocol::{RawSample, ALTITUDE_TAG, ROLL_TAG};
use crate::error::{RelayError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Altitude,
    Roll,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        if tag == ALTITUDE_TAG.as_bytes() {
            Some(Field::Altitude)
        } else if tag == ROLL_TAG.as_bytes() {
            Some(Field::Roll)
        } else {
            None
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Field::Altitude => ALTITUDE_TAG,
            Field::Roll => ROLL_TAG,
        }
    }
}

/// Decode a status document
///
/// # Arguments
///
/// * `document` - Raw response body fetched from the source endpoint
///
/// # Returns
///
/// * `Result<RawSample>` - Both values, or a parse error with no partial data
///
/// # Errors
///
/// Returns error if:
/// - Document is empty or not well-formed XML
/// - Either field element is missing
/// - Either field is not a finite decimal number
///
/// # Examples
///
/// ```
/// use telemetry_relay::telemetry::decoder::decode_sample;
///
/// let xml = b"<root><cmd.pos.altitude>123.4</cmd.pos.altitude><est.att.roll>-2.1</est.att.roll></root>";
/// let sample = decode_sample(xml).unwrap();
/// assert_eq!(sample.altitude, 123.4);
/// assert_eq!(sample.roll, -2.1);
/// ```
pub fn decode_sample(document: &[u8]) -> Result<RawSample> {
    if document.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(RelayError::Parse("empty document".to_string()));
    }

    let mut reader = Reader::from_reader(document);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut root_seen = false;
    let mut capture: Option<Field> = None;
    let mut text = String::new();
    let mut altitude: Option<String> = None;
    let mut roll: Option<String> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| malformed(&reader, e))?;

        match event {
            Event::Start(e) => {
                if depth == 0 {
                    if root_seen {
                        return Err(RelayError::Parse("multiple root elements".to_string()));
                    }
                    root_seen = true;
                } else if depth == 1 && capture.is_none() {
                    capture = Field::from_tag(e.name().as_ref())
                        .filter(|field| slot(&mut altitude, &mut roll, *field).is_none());
                    text.clear();
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 {
                    if root_seen {
                        return Err(RelayError::Parse("multiple root elements".to_string()));
                    }
                    root_seen = true;
                } else if depth == 1 && capture.is_none() {
                    if let Some(field) = Field::from_tag(e.name().as_ref()) {
                        slot(&mut altitude, &mut roll, field).get_or_insert_with(String::new);
                    }
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 1 {
                    if let Some(field) = capture.take() {
                        *slot(&mut altitude, &mut roll, field) = Some(std::mem::take(&mut text));
                    }
                }
            }
            Event::Text(e) => {
                if depth == 0 {
                    return Err(RelayError::Parse("text outside the root element".to_string()));
                }
                if capture.is_some() {
                    let unescaped = e
                        .unescape()
                        .map_err(|e| RelayError::Parse(format!("malformed document: {}", e)))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(e) => {
                if capture.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    if depth != 0 {
        return Err(RelayError::Parse("unexpected end of document".to_string()));
    }
    if !root_seen {
        return Err(RelayError::Parse("no root element".to_string()));
    }

    let altitude = parse_field(Field::Altitude, altitude)?;
    let roll = parse_field(Field::Roll, roll)?;

    Ok(RawSample { altitude, roll })
}

fn slot<'a>(
    altitude: &'a mut Option<String>,
    roll: &'a mut Option<String>,
    field: Field,
) -> &'a mut Option<String> {
    match field {
        Field::Altitude => altitude,
        Field::Roll => roll,
    }
}

fn malformed(reader: &Reader<&[u8]>, e: quick_xml::Error) -> RelayError {
    RelayError::Parse(format!(
        "malformed document at byte {}: {}",
        reader.buffer_position(),
        e
    ))
}

/// Parse one field's text content
///
/// Comma decimal separators are not accepted.
fn parse_field(field: Field, text: Option<String>) -> Result<f64> {
    let text = text.ok_or_else(|| RelayError::Parse(format!("missing <{}>", field.tag())))?;
    let trimmed = text.trim();

    let value: f64 = trimmed.parse().map_err(|_| {
        RelayError::Parse(format!("<{}> is not a number: '{}'", field.tag(), trimmed))
    })?;

    if !value.is_finite() {
        return Err(RelayError::Parse(format!(
            "<{}> is not finite: '{}'",
            field.tag(),
            trimmed
        )));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(altitude: &str, roll: &str) -> String {
        format!(
            "<root><cmd.pos.altitude>{}</cmd.pos.altitude><est.att.roll>{}</est.att.roll></root>",
            altitude, roll
        )
    }

    #[test]
    fn test_decode_valid_document() {
        let sample = decode_sample(doc("123.4", "-2.1").as_bytes()).unwrap();
        assert_eq!(sample, RawSample { altitude: 123.4, roll: -2.1 });
    }

    #[test]
    fn test_decode_pretty_printed_document() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<mandala>
  <est.att.pitch>1.5</est.att.pitch>
  <cmd.pos.altitude>
     500.25
  </cmd.pos.altitude>
  <est.att.roll>0</est.att.roll>
</mandala>
"#;
        let sample = decode_sample(xml.as_bytes()).unwrap();
        assert_eq!(sample.altitude, 500.25);
        assert_eq!(sample.roll, 0.0);
    }

    #[test]
    fn test_root_name_is_not_checked() {
        let xml = "<anything><est.att.roll>3</est.att.roll><cmd.pos.altitude>7</cmd.pos.altitude></anything>";
        let sample = decode_sample(xml.as_bytes()).unwrap();
        assert_eq!(sample.altitude, 7.0);
        assert_eq!(sample.roll, 3.0);
    }

    #[test]
    fn test_missing_roll_fails() {
        let xml = "<root><cmd.pos.altitude>500</cmd.pos.altitude></root>";
        match decode_sample(xml.as_bytes()) {
            Err(RelayError::Parse(msg)) => assert!(msg.contains(ROLL_TAG), "{}", msg),
            other => panic!("Expected Parse error, got: {:?}", other),
        }
    }

    #[test]
    fn test_missing_altitude_fails() {
        let xml = "<root><est.att.roll>1</est.att.roll></root>";
        match decode_sample(xml.as_bytes()) {
            Err(RelayError::Parse(msg)) => assert!(msg.contains(ALTITUDE_TAG), "{}", msg),
            other => panic!("Expected Parse error, got: {:?}", other),
        }
    }

    #[test]
    fn test_nested_field_is_not_a_direct_child() {
        let xml = "<root><group><cmd.pos.altitude>1</cmd.pos.altitude></group><est.att.roll>1</est.att.roll></root>";
        assert!(decode_sample(xml.as_bytes()).is_err());
    }

    #[test]
    fn test_first_occurrence_wins() {
        let xml = "<root><cmd.pos.altitude>1</cmd.pos.altitude><cmd.pos.altitude>2</cmd.pos.altitude><est.att.roll>3</est.att.roll></root>";
        let sample = decode_sample(xml.as_bytes()).unwrap();
        assert_eq!(sample.altitude, 1.0);
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(decode_sample(b"").is_err());
        assert!(decode_sample(b"  \n ").is_err());
    }

    #[test]
    fn test_unclosed_document_fails() {
        let xml = "<root><cmd.pos.altitude>1</cmd.pos.altitude><est.att.roll>2</est.att.roll>";
        assert!(decode_sample(xml.as_bytes()).is_err());
    }

    #[test]
    fn test_mismatched_tags_fail() {
        let xml = "<root><cmd.pos.altitude>1</est.att.roll></root>";
        assert!(decode_sample(xml.as_bytes()).is_err());
    }

    #[test]
    fn test_plain_text_body_fails() {
        assert!(decode_sample(b"Service Unavailable").is_err());
    }

    #[test]
    fn test_multiple_roots_fail() {
        let xml = format!("{}{}", doc("1", "2"), doc("3", "4"));
        assert!(decode_sample(xml.as_bytes()).is_err());
    }

    #[test]
    fn test_non_numeric_fails() {
        assert!(decode_sample(doc("high", "-2.1").as_bytes()).is_err());
        assert!(decode_sample(doc("123.4", "").as_bytes()).is_err());
    }

    #[test]
    fn test_empty_element_fails() {
        let xml = "<root><cmd.pos.altitude/><est.att.roll>2</est.att.roll></root>";
        match decode_sample(xml.as_bytes()) {
            Err(RelayError::Parse(msg)) => assert!(msg.contains("not a number"), "{}", msg),
            other => panic!("Expected Parse error, got: {:?}", other),
        }
    }

    #[test]
    fn test_comma_decimal_separator_fails() {
        assert!(decode_sample(doc("123,4", "-2.1").as_bytes()).is_err());
    }

    #[test]
    fn test_non_finite_values_fail() {
        assert!(decode_sample(doc("inf", "0").as_bytes()).is_err());
        assert!(decode_sample(doc("0", "NaN").as_bytes()).is_err());
    }

    #[test]
    fn test_exponent_and_sign_notation() {
        let sample = decode_sample(doc("1.5e3", "+0.25").as_bytes()).unwrap();
        assert_eq!(sample.altitude, 1500.0);
        assert_eq!(sample.roll, 0.25);
    }

    #[test]
    fn test_cdata_content() {
        let xml = "<root><cmd.pos.altitude><![CDATA[42.5]]></cmd.pos.altitude><est.att.roll>1</est.att.roll></root>";
        let sample = decode_sample(xml.as_bytes()).unwrap();
        assert_eq!(sample.altitude, 42.5);
    }
}
