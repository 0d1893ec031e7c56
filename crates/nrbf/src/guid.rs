//! `System.Guid` specialization.
//!
//! A serialized GUID is an ordinary class record with eleven fields:
//! `_a` (Int32), `_b`/`_c` (Int16), and `_d` through `_k` (Byte). The
//! canonical text form concatenates the little-endian bytes of the
//! first three fields with the eight raw bytes and hex-formats the
//! result in 8-4-4-4-12 groups.

use crate::error::NrbfError;
use crate::record::{ClassRecord, Primitive, Value};

/// Class name .NET uses for serialized GUID instances.
pub const GUID_CLASS_NAME: &str = "System.Guid";

/// Field names of a serialized GUID, in declared order.
pub const GUID_FIELD_NAMES: [&str; 11] = [
    "_a", "_b", "_c", "_d", "_e", "_f", "_g", "_h", "_i", "_j", "_k",
];

/// Whether a class record looks like a serialized `System.Guid`.
pub fn is_guid_class(class: &ClassRecord) -> bool {
    class.info.name == GUID_CLASS_NAME
        && GUID_FIELD_NAMES
            .iter()
            .all(|name| class.member_index(name).is_some())
}

/// Canonical 36-character text of a GUID class record.
///
/// Returns `None` when the record is not a GUID or its fields do not
/// carry the expected inline primitives.
pub fn guid_text(class: &ClassRecord) -> Option<String> {
    if !is_guid_class(class) {
        return None;
    }
    let int32 = |name: &str| match class.member_value(name)? {
        Value::Primitive(Primitive::Int32(v)) => Some(v),
        _ => None,
    };
    let int16 = |name: &str| match class.member_value(name)? {
        Value::Primitive(Primitive::Int16(v)) => Some(v),
        _ => None,
    };
    let byte = |name: &str| match class.member_value(name)? {
        Value::Primitive(Primitive::Byte(v)) => Some(v),
        _ => None,
    };

    let mut bytes = [0u8; 16];
    bytes[0..4].copy_from_slice(&int32("_a")?.to_le_bytes());
    bytes[4..6].copy_from_slice(&int16("_b")?.to_le_bytes());
    bytes[6..8].copy_from_slice(&int16("_c")?.to_le_bytes());
    for (offset, name) in GUID_FIELD_NAMES[3..].iter().enumerate() {
        bytes[8 + offset] = byte(name)?;
    }
    Some(text_from_bytes(&bytes))
}

/// Parse canonical GUID text into its 16 bytes.
///
/// Accepts the 36-character dashed form or 32 bare hex characters,
/// upper or lower case.
pub fn bytes_from_text(text: &str) -> Result<[u8; 16], NrbfError> {
    let compact: String = match text.len() {
        36 => {
            let chars: Vec<char> = text.chars().collect();
            if chars.len() != 36 {
                return Err(NrbfError::InvalidGuidFormat);
            }
            for &pos in &[8usize, 13, 18, 23] {
                if chars[pos] != '-' {
                    return Err(NrbfError::InvalidGuidFormat);
                }
            }
            chars.iter().filter(|&&c| c != '-').collect()
        }
        32 => text.to_string(),
        _ => return Err(NrbfError::InvalidGuidFormat),
    };
    let decoded = hex::decode(&compact).map_err(|_| NrbfError::InvalidGuidFormat)?;
    if decoded.len() != 16 {
        return Err(NrbfError::InvalidGuidFormat);
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&decoded);
    Ok(bytes)
}

/// Format 16 GUID bytes as canonical lowercase text.
pub fn text_from_bytes(bytes: &[u8; 16]) -> String {
    let h = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &h[0..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..32]
    )
}

/// Decompose GUID text into the eleven `(field name, value)` pairs of a
/// serialized GUID class.
pub fn fields_from_text(text: &str) -> Result<[(&'static str, Primitive); 11], NrbfError> {
    let bytes = bytes_from_text(text)?;
    let a = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let b = i16::from_le_bytes([bytes[4], bytes[5]]);
    let c = i16::from_le_bytes([bytes[6], bytes[7]]);
    Ok([
        ("_a", Primitive::Int32(a)),
        ("_b", Primitive::Int16(b)),
        ("_c", Primitive::Int16(c)),
        ("_d", Primitive::Byte(bytes[8])),
        ("_e", Primitive::Byte(bytes[9])),
        ("_f", Primitive::Byte(bytes[10])),
        ("_g", Primitive::Byte(bytes[11])),
        ("_h", Primitive::Byte(bytes[12])),
        ("_i", Primitive::Byte(bytes[13])),
        ("_j", Primitive::Byte(bytes[14])),
        ("_k", Primitive::Byte(bytes[15])),
    ])
}
