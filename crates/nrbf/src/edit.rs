//! Targeted mutation of decoded values.
//!
//! Edits replace leaf values in place and never touch structure: no
//! members appear or disappear, array lengths stay fixed, and class
//! metadata is read-only. Every entry point validates fully before
//! writing, so a failed edit leaves the document untouched.

use crate::document::Document;
use crate::error::NrbfError;
use crate::guid;
use crate::path::{locate, Located, Target};
use crate::record::{NrbfRecord, Primitive, PrimitiveKind, Slot, Value};

impl Document {
    /// Coerce `value` to the declared primitive kind of the slot at
    /// `path` and write it.
    pub fn set_primitive(&mut self, path: &str, value: Primitive) -> Result<(), NrbfError> {
        let located =
            locate(self, path).ok_or_else(|| NrbfError::PathNotFound(path.to_string()))?;
        let kind = self
            .slot_primitive_kind(&located)
            .ok_or_else(|| NrbfError::NotEditable(path.to_string()))?;
        let coerced = coerce(value, kind)?;
        self.write_slot(&located.target, Value::Primitive(coerced), path)
    }

    /// Parse user text against the target slot's kind and write it.
    ///
    /// Numbers, booleans, single characters, and 32-hex decimal
    /// fingerprints are all accepted where the slot's type agrees.
    pub fn set_primitive_str(&mut self, path: &str, text: &str) -> Result<(), NrbfError> {
        self.set_primitive(path, parse_loose(text))
    }

    /// Replace the contents of the string addressed by `path`.
    ///
    /// A `BinaryObjectString` keeps its object id, so every reference
    /// to it observes the new text. Inline string-typed primitives are
    /// replaced in place.
    pub fn set_string(&mut self, path: &str, text: &str) -> Result<(), NrbfError> {
        let located =
            locate(self, path).ok_or_else(|| NrbfError::PathNotFound(path.to_string()))?;
        match self.resolve(&located.value)? {
            Value::Record(rid) => match self.record_mut(rid) {
                NrbfRecord::ObjectString(s) => {
                    s.value = text.to_string();
                    Ok(())
                }
                _ => Err(NrbfError::NotEditable(path.to_string())),
            },
            Value::Primitive(Primitive::String(_)) => self.write_slot(
                &located.target,
                Value::Primitive(Primitive::String(text.to_string())),
                path,
            ),
            _ => Err(NrbfError::NotEditable(path.to_string())),
        }
    }

    /// Recompute the eleven fields of the `System.Guid` record at
    /// `path` from canonical GUID text.
    pub fn set_guid(&mut self, path: &str, text: &str) -> Result<(), NrbfError> {
        let fields = guid::fields_from_text(text)?;
        let located =
            locate(self, path).ok_or_else(|| NrbfError::PathNotFound(path.to_string()))?;
        let rid = match self.resolve(&located.value)? {
            Value::Record(rid) => rid,
            _ => return Err(NrbfError::NotEditable(path.to_string())),
        };

        // Validate every field position before the first write; a GUID
        // update is all or nothing.
        let indices: Vec<usize> = {
            let class = match self.record(rid) {
                NrbfRecord::Class(class) => class,
                _ => return Err(NrbfError::NotEditable(path.to_string())),
            };
            if !guid::is_guid_class(class) {
                return Err(NrbfError::NotEditable(path.to_string()));
            }
            let mut indices = Vec::with_capacity(fields.len());
            for (name, _) in &fields {
                let index = class
                    .member_index(name)
                    .ok_or_else(|| NrbfError::NotEditable(path.to_string()))?;
                match crate::record::slot_at(&class.slots, index) {
                    Some((slot, _)) if matches!(class.slots[slot], Slot::Value(_)) => {}
                    _ => return Err(NrbfError::NotEditable(path.to_string())),
                }
                indices.push(index);
            }
            indices
        };

        let class = match self.record_mut(rid) {
            NrbfRecord::Class(class) => class,
            _ => return Err(NrbfError::NotEditable(path.to_string())),
        };
        for ((_, value), index) in fields.into_iter().zip(indices) {
            class.set_member_value(index, Value::Primitive(value));
        }
        Ok(())
    }

    /// Declared primitive kind of the slot a path landed on, falling
    /// back to the kind of the value already stored there.
    fn slot_primitive_kind(&self, located: &Located) -> Option<PrimitiveKind> {
        let declared = match located.target {
            Target::ClassMember { rid, member } => match self.record(rid) {
                NrbfRecord::Class(class) => class.member_primitive_kind(member),
                _ => None,
            },
            Target::ArrayElement { rid, .. } => match self.record(rid) {
                NrbfRecord::PrimitiveArray(array) => Some(array.element_kind),
                NrbfRecord::BinaryArray(array) => match (&array.element_type, &array.element_info)
                {
                    (
                        crate::record::BinaryTypeTag::Primitive,
                        crate::record::AdditionalTypeInfo::Primitive(kind),
                    ) => Some(*kind),
                    _ => None,
                },
                _ => None,
            },
        };
        declared.or(match &located.value {
            Value::Primitive(p) => Some(p.kind()),
            _ => None,
        })
    }

    fn write_slot(
        &mut self,
        target: &Target,
        value: Value,
        path: &str,
    ) -> Result<(), NrbfError> {
        match *target {
            Target::ClassMember { rid, member } => match self.record_mut(rid) {
                NrbfRecord::Class(class) => {
                    if class.set_member_value(member, value) {
                        Ok(())
                    } else {
                        Err(NrbfError::NotEditable(path.to_string()))
                    }
                }
                _ => Err(NrbfError::NotEditable(path.to_string())),
            },
            Target::ArrayElement { rid, index } => {
                let record = self.record_mut(rid);
                if let NrbfRecord::PrimitiveArray(array) = record {
                    let slot = array
                        .values
                        .get_mut(index)
                        .ok_or_else(|| NrbfError::PathNotFound(path.to_string()))?;
                    return match value {
                        Value::Primitive(p) => {
                            *slot = p;
                            Ok(())
                        }
                        _ => Err(NrbfError::NotEditable(path.to_string())),
                    };
                }
                let slots = match record {
                    NrbfRecord::ObjectArray(array) => &mut array.slots,
                    NrbfRecord::StringArray(array) => &mut array.slots,
                    NrbfRecord::BinaryArray(array) => &mut array.slots,
                    _ => return Err(NrbfError::NotEditable(path.to_string())),
                };
                match crate::record::slot_at(slots, index) {
                    Some((slot, _)) => match &mut slots[slot] {
                        Slot::Value(stored) => {
                            *stored = value;
                            Ok(())
                        }
                        _ => Err(NrbfError::NotEditable(path.to_string())),
                    },
                    None => Err(NrbfError::PathNotFound(path.to_string())),
                }
            }
        }
    }
}

/// Parse user text into the loosest primitive that fits; [`coerce`]
/// narrows it to the slot's declared kind afterwards.
fn parse_loose(text: &str) -> Primitive {
    if let Ok(v) = text.parse::<i64>() {
        return Primitive::Int64(v);
    }
    if let Ok(v) = text.parse::<u64>() {
        return Primitive::UInt64(v);
    }
    if let Ok(v) = text.parse::<f64>() {
        return Primitive::Double(v);
    }
    if text.eq_ignore_ascii_case("true") {
        return Primitive::Boolean(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Primitive::Boolean(false);
    }
    Primitive::String(text.to_string())
}

fn as_i128(p: &Primitive) -> Option<i128> {
    Some(match p {
        Primitive::Byte(v) => i128::from(*v),
        Primitive::SByte(v) => i128::from(*v),
        Primitive::Int16(v) => i128::from(*v),
        Primitive::Int32(v) => i128::from(*v),
        Primitive::Int64(v) => i128::from(*v),
        Primitive::UInt16(v) => i128::from(*v),
        Primitive::UInt32(v) => i128::from(*v),
        Primitive::UInt64(v) => i128::from(*v),
        _ => return None,
    })
}

fn as_f64(p: &Primitive) -> Option<f64> {
    match p {
        Primitive::Single(v) => Some(f64::from(*v)),
        Primitive::Double(v) => Some(*v),
        _ => as_i128(p).map(|v| v as f64),
    }
}

fn mismatch(expected: PrimitiveKind, actual: &Primitive) -> NrbfError {
    NrbfError::TypeMismatch {
        expected: expected.name().to_string(),
        actual: actual.kind().name().to_string(),
    }
}

/// Convert an incoming value to the declared kind of a slot, or refuse.
fn coerce(value: Primitive, kind: PrimitiveKind) -> Result<Primitive, NrbfError> {
    if value.kind() == kind {
        return Ok(value);
    }
    let int = |v: &Primitive| as_i128(v).ok_or_else(|| mismatch(kind, v));
    Ok(match kind {
        PrimitiveKind::Boolean => return Err(mismatch(kind, &value)),
        PrimitiveKind::Byte => Primitive::Byte(
            u8::try_from(int(&value)?).map_err(|_| mismatch(kind, &value))?,
        ),
        PrimitiveKind::SByte => Primitive::SByte(
            i8::try_from(int(&value)?).map_err(|_| mismatch(kind, &value))?,
        ),
        PrimitiveKind::Int16 => Primitive::Int16(
            i16::try_from(int(&value)?).map_err(|_| mismatch(kind, &value))?,
        ),
        PrimitiveKind::Int32 => Primitive::Int32(
            i32::try_from(int(&value)?).map_err(|_| mismatch(kind, &value))?,
        ),
        PrimitiveKind::Int64 => Primitive::Int64(
            i64::try_from(int(&value)?).map_err(|_| mismatch(kind, &value))?,
        ),
        PrimitiveKind::UInt16 => Primitive::UInt16(
            u16::try_from(int(&value)?).map_err(|_| mismatch(kind, &value))?,
        ),
        PrimitiveKind::UInt32 => Primitive::UInt32(
            u32::try_from(int(&value)?).map_err(|_| mismatch(kind, &value))?,
        ),
        PrimitiveKind::UInt64 => Primitive::UInt64(
            u64::try_from(int(&value)?).map_err(|_| mismatch(kind, &value))?,
        ),
        PrimitiveKind::Single => {
            Primitive::Single(as_f64(&value).ok_or_else(|| mismatch(kind, &value))? as f32)
        }
        PrimitiveKind::Double => {
            Primitive::Double(as_f64(&value).ok_or_else(|| mismatch(kind, &value))?)
        }
        PrimitiveKind::Char => match &value {
            Primitive::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if (c as u32) <= u32::from(u16::MAX) => {
                        Primitive::Char(c as u16)
                    }
                    _ => return Err(mismatch(kind, &value)),
                }
            }
            other => {
                let v = int(other)?;
                Primitive::Char(u16::try_from(v).map_err(|_| mismatch(kind, other))?)
            }
        },
        PrimitiveKind::String => return Err(mismatch(kind, &value)),
        PrimitiveKind::Decimal => match &value {
            Primitive::String(s) if s.len() == 32 => {
                let decoded = hex::decode(s).map_err(|_| mismatch(kind, &value))?;
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(&decoded);
                Primitive::Decimal(bytes)
            }
            other => return Err(mismatch(kind, other)),
        },
        PrimitiveKind::DateTime => Primitive::DateTime(
            u64::try_from(int(&value)?).map_err(|_| mismatch(kind, &value))?,
        ),
        PrimitiveKind::TimeSpan => Primitive::TimeSpan(
            i64::try_from(int(&value)?).map_err(|_| mismatch(kind, &value))?,
        ),
        PrimitiveKind::Null => return Err(mismatch(kind, &value)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::load;
    use crate::fixtures;

    fn byte_diff(a: &[u8], b: &[u8]) -> Vec<usize> {
        assert_eq!(a.len(), b.len(), "streams changed length");
        (0..a.len()).filter(|&i| a[i] != b[i]).collect()
    }

    #[test]
    fn test_set_primitive_changes_only_value_bytes() {
        let original = fixtures::single_int_class(42);
        let mut doc = load(&original).unwrap();
        doc.set_primitive("X", Primitive::Int64(43)).unwrap();
        let edited = doc.save().unwrap();

        // Identical to a stream that always held 43.
        assert_eq!(edited, fixtures::single_int_class(43));
        // And at most the four bytes of the Int32 payload moved.
        let changed = byte_diff(&original, &edited);
        assert!(!changed.is_empty());
        assert!(changed.len() <= 4);
    }

    #[test]
    fn test_set_primitive_str_parses_to_slot_kind() {
        let mut doc = load(&fixtures::single_int_class(1)).unwrap();
        doc.set_primitive_str("X", "77").unwrap();
        assert_eq!(
            doc.get("X"),
            Some(Value::Primitive(Primitive::Int32(77)))
        );
    }

    #[test]
    fn test_edit_one_of_many_class_with_id_instances() {
        let original = fixtures::vec3_array();
        let mut doc = load(&original).unwrap();
        doc.set_primitive_str("[3].y", "-2.5").unwrap();
        let edited = doc.save().unwrap();

        assert_eq!(edited, fixtures::vec3_array_with(-2.5));
        let changed = byte_diff(&original, &edited);
        assert!(!changed.is_empty());
        assert!(changed.len() <= 4, "changed bytes: {changed:?}");

        // The edit landed on object 13 and nowhere else.
        let redecoded = load(&edited).unwrap();
        assert_eq!(
            redecoded.get("[3].y"),
            Some(Value::Primitive(Primitive::Single(-2.5)))
        );
        assert_eq!(
            redecoded.get("[2].y"),
            Some(Value::Primitive(Primitive::Single(1.0)))
        );
    }

    #[test]
    fn test_set_primitive_array_element() {
        let mut doc = load(&fixtures::int_primitive_array(&[3, 1, 4])).unwrap();
        doc.set_primitive_str("[1]", "99").unwrap();
        assert_eq!(
            doc.get("[1]"),
            Some(Value::Primitive(Primitive::Int32(99)))
        );
    }

    #[test]
    fn test_set_string_keeps_object_id() {
        let mut doc = load(&fixtures::string_reference()).unwrap();
        doc.set_string("B", "rebound").unwrap();
        let saved = doc.save().unwrap();

        let redecoded = load(&saved).unwrap();
        let resolved = redecoded.get("B").unwrap();
        assert_eq!(redecoded.value_text(&resolved), "rebound");
        // Still reachable under the original id.
        assert!(redecoded.lookup(7).is_some());
    }

    #[test]
    fn test_set_guid_roundtrip() {
        let mut doc =
            load(&fixtures::guid_class("12345678-1234-5678-1234-567812345678")).unwrap();
        doc.set_guid("", "aabbccdd-eeff-0011-2233-445566778899")
            .unwrap_err();

        // The GUID record is the root; address it through a path from a
        // wrapper fixture instead.
        let mut doc = load(&fixtures::guid_holder("12345678-1234-5678-1234-567812345678"))
            .unwrap();
        doc.set_guid("Id", "aabbccdd-eeff-0011-2233-445566778899")
            .unwrap();
        let saved = doc.save().unwrap();

        let redecoded = load(&saved).unwrap();
        let value = redecoded.get("Id").unwrap();
        assert_eq!(
            redecoded.value_text(&value),
            "aabbccdd-eeff-0011-2233-445566778899"
        );
    }

    #[test]
    fn test_set_guid_rejects_bad_text() {
        let mut doc =
            load(&fixtures::guid_holder("12345678-1234-5678-1234-567812345678")).unwrap();
        assert!(matches!(
            doc.set_guid("Id", "not-a-guid"),
            Err(NrbfError::InvalidGuidFormat)
        ));
        // Nothing changed.
        let value = doc.get("Id").unwrap();
        assert_eq!(
            doc.value_text(&value),
            "12345678-1234-5678-1234-567812345678"
        );
    }

    #[test]
    fn test_set_guid_rejects_non_guid_class() {
        let mut doc = load(&fixtures::nested_player(1)).unwrap();
        assert!(matches!(
            doc.set_guid("Player", "aabbccdd-eeff-0011-2233-445566778899"),
            Err(NrbfError::NotEditable(_))
        ));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut doc = load(&fixtures::single_int_class(1)).unwrap();
        assert!(matches!(
            doc.set_primitive_str("X", "not a number"),
            Err(NrbfError::TypeMismatch { .. })
        ));
        assert!(matches!(
            doc.set_primitive("X", Primitive::Boolean(true)),
            Err(NrbfError::TypeMismatch { .. })
        ));
        // Out of range for Int32.
        assert!(matches!(
            doc.set_primitive("X", Primitive::Int64(i64::MAX)),
            Err(NrbfError::TypeMismatch { .. })
        ));
        // Untouched after all the failures.
        assert_eq!(doc.get("X"), Some(Value::Primitive(Primitive::Int32(1))));
    }

    #[test]
    fn test_path_not_found_rejected() {
        let mut doc = load(&fixtures::single_int_class(1)).unwrap();
        assert!(matches!(
            doc.set_primitive_str("Y", "2"),
            Err(NrbfError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_not_editable_on_record_slot() {
        let mut doc = load(&fixtures::nested_player(1)).unwrap();
        assert!(matches!(
            doc.set_primitive_str("Player", "5"),
            Err(NrbfError::NotEditable(_))
        ));
    }

    #[test]
    fn test_edit_idempotence() {
        let mut doc = load(&fixtures::single_int_class(42)).unwrap();
        doc.set_primitive_str("X", "43").unwrap();
        let first = doc.save().unwrap();
        doc.set_primitive_str("X", "43").unwrap();
        let second = doc.save().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_coerce_numeric_narrowing() {
        assert_eq!(
            coerce(Primitive::Int64(200), PrimitiveKind::Byte).unwrap(),
            Primitive::Byte(200)
        );
        assert!(coerce(Primitive::Int64(300), PrimitiveKind::Byte).is_err());
        assert_eq!(
            coerce(Primitive::Int64(5), PrimitiveKind::Double).unwrap(),
            Primitive::Double(5.0)
        );
        assert_eq!(
            coerce(Primitive::String("A".into()), PrimitiveKind::Char).unwrap(),
            Primitive::Char(65)
        );
        assert_eq!(
            coerce(Primitive::Int64(12345), PrimitiveKind::DateTime).unwrap(),
            Primitive::DateTime(12345)
        );
    }

    #[test]
    fn test_parse_loose_forms() {
        assert_eq!(parse_loose("-7"), Primitive::Int64(-7));
        assert_eq!(parse_loose("2.5"), Primitive::Double(2.5));
        assert_eq!(parse_loose("TRUE"), Primitive::Boolean(true));
        assert_eq!(parse_loose("hello"), Primitive::String("hello".into()));
    }
}
