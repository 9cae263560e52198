//! Encoding of raw cell values into typed big-endian byte payloads.
//!
//! Missing, blank and unparsable values all become the representation's sentinel:
//! NaN for doubles, 0 for ints, false for booleans, "" for strings and U+0000 for chars.
//! Strings are stored as UTF-8, each preceded by its big-endian u32 byte length; chars as
//! UTF-16 code units.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::domain::PrimitiveType;
use crate::error::ConvertError;

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValues {
    Double(Vec<f64>),
    Int(Vec<i32>),
    Boolean(Vec<bool>),
    String(Vec<String>),
    Char(Vec<char>),
}

impl DecodedValues {
    pub fn len(&self) -> usize {
        match self {
            DecodedValues::Double(values) => values.len(),
            DecodedValues::Int(values) => values.len(),
            DecodedValues::Boolean(values) => values.len(),
            DecodedValues::String(values) => values.len(),
            DecodedValues::Char(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encodes one value per assay position. Returns `Ok(None)` when the input is empty or
/// every value is missing, in which case the caller skips the vector.
pub fn encode<S: AsRef<str>>(
    values: &[Option<S>],
    representation: PrimitiveType,
) -> Result<Option<Vec<u8>>, ConvertError> {
    let mut any_present = false;
    let mut payload = Vec::with_capacity(values.len() * width(representation));

    for value in values {
        let text: Option<&str> = value
            .as_ref()
            .map(|value| value.as_ref())
            .filter(|value| !value.trim().is_empty());
        let present = match representation {
            PrimitiveType::Double => {
                let parsed = text.and_then(|text| text.trim().parse::<f64>().ok());
                write(payload.write_f64::<BigEndian>(parsed.unwrap_or(f64::NAN)))?;
                parsed.is_some()
            }
            PrimitiveType::Int => {
                let parsed = text.and_then(|text| text.trim().parse::<i32>().ok());
                write(payload.write_i32::<BigEndian>(parsed.unwrap_or(0)))?;
                parsed.is_some()
            }
            PrimitiveType::Boolean => {
                let parsed = text.and_then(parse_boolean);
                payload.push(u8::from(parsed.unwrap_or(false)));
                parsed.is_some()
            }
            PrimitiveType::Char => {
                let parsed = text.and_then(single_char);
                write(payload.write_u16::<BigEndian>(parsed.unwrap_or(0)))?;
                parsed.is_some()
            }
            PrimitiveType::String => {
                let bytes = text.map(str::as_bytes).unwrap_or_default();
                let len = u32::try_from(bytes.len()).map_err(|_| {
                    ConvertError::CorruptPayload(format!(
                        "string of {} bytes is too long to store",
                        bytes.len()
                    ))
                })?;
                write(payload.write_u32::<BigEndian>(len))?;
                payload.extend_from_slice(bytes);
                text.is_some()
            }
        };
        any_present |= present;
    }

    if !any_present {
        return Ok(None);
    }

    let decoded = decode(&payload, representation)?;
    if decoded.len() != values.len() {
        return Err(ConvertError::CodecInconsistency {
            expected: values.len(),
            actual: decoded.len(),
        });
    }
    Ok(Some(payload))
}

pub fn decode(payload: &[u8], representation: PrimitiveType) -> Result<DecodedValues, ConvertError> {
    let size = width(representation);
    if size > 0 && payload.len() % size != 0 {
        return Err(ConvertError::CorruptPayload(format!(
            "{} bytes is not a multiple of {size} for {representation}",
            payload.len()
        )));
    }
    let count = if size > 0 { payload.len() / size } else { 0 };
    let mut cursor = Cursor::new(payload);

    let decoded = match representation {
        PrimitiveType::Double => DecodedValues::Double(
            (0..count)
                .map(|_| cursor.read_f64::<BigEndian>().map_err(corrupt))
                .collect::<Result<_, _>>()?,
        ),
        PrimitiveType::Int => DecodedValues::Int(
            (0..count)
                .map(|_| cursor.read_i32::<BigEndian>().map_err(corrupt))
                .collect::<Result<_, _>>()?,
        ),
        PrimitiveType::Boolean => DecodedValues::Boolean(
            payload
                .iter()
                .map(|byte| match byte {
                    0 => Ok(false),
                    1 => Ok(true),
                    other => Err(ConvertError::CorruptPayload(format!(
                        "invalid boolean byte {other}"
                    ))),
                })
                .collect::<Result<_, _>>()?,
        ),
        PrimitiveType::Char => DecodedValues::Char(
            (0..count)
                .map(|_| {
                    let unit = cursor.read_u16::<BigEndian>().map_err(corrupt)?;
                    char::from_u32(u32::from(unit)).ok_or_else(|| {
                        ConvertError::CorruptPayload(format!("invalid char unit {unit:#x}"))
                    })
                })
                .collect::<Result<_, _>>()?,
        ),
        PrimitiveType::String => DecodedValues::String(decode_strings(payload)?),
    };
    Ok(decoded)
}

fn decode_strings(payload: &[u8]) -> Result<Vec<String>, ConvertError> {
    let mut cursor = Cursor::new(payload);
    let mut strings = Vec::new();
    while (cursor.position() as usize) < payload.len() {
        let len = cursor.read_u32::<BigEndian>().map_err(corrupt)? as usize;
        let start = cursor.position() as usize;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= payload.len())
            .ok_or_else(|| {
                ConvertError::CorruptPayload(format!(
                    "string of {len} bytes runs past the end of the payload"
                ))
            })?;
        let text = String::from_utf8(payload[start..end].to_vec())
            .map_err(|err| ConvertError::CorruptPayload(err.to_string()))?;
        strings.push(text);
        cursor.set_position(end as u64);
    }
    Ok(strings)
}

fn width(representation: PrimitiveType) -> usize {
    match representation {
        PrimitiveType::Double => 8,
        PrimitiveType::Int => 4,
        PrimitiveType::Char => 2,
        PrimitiveType::Boolean => 1,
        PrimitiveType::String => 0,
    }
}

fn parse_boolean(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn single_char(text: &str) -> Option<u16> {
    let mut chars = text.chars();
    let ch = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let mut units = [0u16; 2];
    match ch.encode_utf16(&mut units) {
        [unit] => Some(*unit),
        _ => None,
    }
}

fn write(result: std::io::Result<()>) -> Result<(), ConvertError> {
    result.map_err(corrupt)
}

fn corrupt(err: std::io::Error) -> ConvertError {
    ConvertError::CorruptPayload(err.to_string())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn some(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|value| Some(value.to_string())).collect()
    }

    #[test]
    fn empty_input_is_no_data() {
        let values: Vec<Option<String>> = Vec::new();
        assert_eq!(encode(&values, PrimitiveType::Double).unwrap(), None);
    }

    #[rstest]
    #[case(PrimitiveType::Double)]
    #[case(PrimitiveType::Int)]
    #[case(PrimitiveType::Boolean)]
    #[case(PrimitiveType::String)]
    #[case(PrimitiveType::Char)]
    fn all_missing_is_no_data(#[case] representation: PrimitiveType) {
        let values = vec![None, Some("  ".to_string()), None];
        assert_eq!(encode(&values, representation).unwrap(), None);
    }

    #[test]
    fn unparsable_doubles_become_nan() {
        let values = some(&["1.5", "Error", "-2"]);
        let payload = encode(&values, PrimitiveType::Double).unwrap().unwrap();
        let DecodedValues::Double(decoded) = decode(&payload, PrimitiveType::Double).unwrap()
        else {
            panic!("expected doubles");
        };
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0], 1.5);
        assert!(decoded[1].is_nan());
        assert_eq!(decoded[2], -2.0);
    }

    #[test]
    fn only_unparsable_doubles_is_no_data() {
        let values = some(&["Error", "null"]);
        assert_eq!(encode(&values, PrimitiveType::Double).unwrap(), None);
    }

    #[test]
    fn ints_use_zero_sentinel() {
        let values = vec![Some("7".to_string()), None, Some("3.5".to_string())];
        let payload = encode(&values, PrimitiveType::Int).unwrap().unwrap();
        assert_eq!(
            decode(&payload, PrimitiveType::Int).unwrap(),
            DecodedValues::Int(vec![7, 0, 0])
        );
    }

    #[test]
    fn booleans_parse_literals() {
        let values = some(&["TRUE", "false", "maybe"]);
        let payload = encode(&values, PrimitiveType::Boolean).unwrap().unwrap();
        assert_eq!(
            decode(&payload, PrimitiveType::Boolean).unwrap(),
            DecodedValues::Boolean(vec![true, false, false])
        );
    }

    #[test]
    fn strings_keep_positions() {
        let values = vec![Some("P".to_string()), None, Some("A".to_string())];
        let payload = encode(&values, PrimitiveType::String).unwrap().unwrap();
        assert_eq!(
            decode(&payload, PrimitiveType::String).unwrap(),
            DecodedValues::String(vec!["P".to_string(), String::new(), "A".to_string()])
        );
    }

    #[test]
    fn strings_may_contain_nul() {
        let values = some(&["a\0b", "c"]);
        let payload = encode(&values, PrimitiveType::String).unwrap().unwrap();
        assert_eq!(
            decode(&payload, PrimitiveType::String).unwrap(),
            DecodedValues::String(vec!["a\0b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn strings_are_length_prefixed() {
        let values = some(&["ab"]);
        let payload = encode(&values, PrimitiveType::String).unwrap().unwrap();
        assert_eq!(payload, vec![0, 0, 0, 2, b'a', b'b']);
    }

    #[test]
    fn chars_require_single_character() {
        let values = some(&["M", "AB"]);
        let payload = encode(&values, PrimitiveType::Char).unwrap().unwrap();
        assert_eq!(
            decode(&payload, PrimitiveType::Char).unwrap(),
            DecodedValues::Char(vec!['M', '\0'])
        );
    }

    #[test]
    fn doubles_are_big_endian() {
        let values = some(&["1"]);
        let payload = encode(&values, PrimitiveType::Double).unwrap().unwrap();
        assert_eq!(payload, 1.0f64.to_be_bytes().to_vec());
    }

    #[test]
    fn truncated_payload_is_rejected() {
        assert!(decode(&[0, 1, 2], PrimitiveType::Int).is_err());
        assert!(decode(b"abc", PrimitiveType::String).is_err());
        assert!(decode(&[0, 0, 0, 5, b'a'], PrimitiveType::String).is_err());
    }
}
