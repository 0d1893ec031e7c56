//! Stream decoder: a fully-resident byte buffer in, a [`Document`] out.
//!
//! The decoder is strict and fails fast: any structural error aborts the
//! whole decode and no partial document is returned. References are
//! stored exactly as they appear on the wire; nothing is dereferenced at
//! decode time.

use std::collections::HashMap;

use crate::document::{Document, StreamHeader};
use crate::error::NrbfError;
use crate::record::{
    AdditionalTypeInfo, ArrayShape, BinaryArrayRecord, BinaryTypeTag, ClassInfo, ClassRecord,
    ClassWireKind, LibraryRecord, MemberType, MemberTypeInfo, NrbfRecord, ObjectArrayRecord,
    ObjectStringRecord, Primitive, PrimitiveArrayRecord, PrimitiveKind, RecordId, RecordTag, Slot,
    StringArrayRecord, Value,
};
use crate::wire::Reader;

/// Ceiling on the number of records a single stream may contain.
///
/// Game saves top out in the low thousands; the budget exists to bound
/// pathological inputs, not to constrain real files.
pub const DEFAULT_RECORD_BUDGET: usize = 100_000;

/// Knobs for a decode pass.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Maximum record count before the decoder gives up.
    pub max_records: usize,
    /// Read `Char` as a two-byte UTF-16 code unit instead of one byte.
    ///
    /// Single-byte chars match the behavior observed in the wild; wide
    /// mode exists for streams that disagree. The chosen width sticks to
    /// the document so re-encoding uses the same layout.
    pub wide_char: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_RECORD_BUDGET,
            wide_char: false,
        }
    }
}

/// Quick magic check: does this buffer plausibly hold an NRBF stream?
///
/// Verifies the header tag and the standard major=1/minor=0 version
/// words without decoding anything.
pub fn is_nrbf(bytes: &[u8]) -> bool {
    bytes.len() >= 17 && bytes[0] == 0 && bytes[9..17] == [1, 0, 0, 0, 0, 0, 0, 0]
}

/// Decode a byte buffer into a [`Document`] with default options.
pub fn load(bytes: &[u8]) -> Result<Document, NrbfError> {
    load_with(bytes, DecodeOptions::default())
}

/// Decode a byte buffer into a [`Document`].
pub fn load_with(bytes: &[u8], options: DecodeOptions) -> Result<Document, NrbfError> {
    Decoder::new(bytes, options).run()
}

/// Outcome of reading one nested record in a member or element position.
enum Nested {
    Value(Value),
    NullRun { count: i32, compact: bool },
    Library(RecordId),
}

struct Decoder<'a> {
    r: Reader<'a>,
    options: DecodeOptions,
    records: Vec<NrbfRecord>,
    order: Vec<RecordId>,
    identity: HashMap<i32, RecordId>,
    metadata: HashMap<i32, RecordId>,
    libraries: HashMap<i32, String>,
    record_count: usize,
}

impl<'a> Decoder<'a> {
    fn new(bytes: &'a [u8], options: DecodeOptions) -> Self {
        Self {
            r: Reader::new(bytes),
            options,
            records: Vec::new(),
            order: Vec::new(),
            identity: HashMap::new(),
            metadata: HashMap::new(),
            libraries: HashMap::new(),
            record_count: 0,
        }
    }

    fn run(mut self) -> Result<Document, NrbfError> {
        let header = self.read_header()?;

        loop {
            let tag = RecordTag::from_byte(self.r.u8()?)?;
            if tag == RecordTag::MessageEnd {
                break;
            }
            let rid = self.read_record(tag)?;
            self.order.push(rid);
        }

        let root = self
            .identity
            .get(&header.root_id)
            .copied()
            .ok_or(NrbfError::RootNotFound(header.root_id))?;

        Ok(Document {
            header,
            records: self.records,
            order: self.order,
            identity: self.identity,
            metadata: self.metadata,
            libraries: self.libraries,
            root,
            wide_char: self.options.wide_char,
            log_sink: None,
        })
    }

    fn read_header(&mut self) -> Result<StreamHeader, NrbfError> {
        let tag = self.r.u8().map_err(|_| NrbfError::BadHeader)?;
        if tag != RecordTag::SerializedStreamHeader as u8 {
            return Err(NrbfError::BadHeader);
        }
        let root_id = self.r.i32().map_err(|_| NrbfError::BadHeader)?;
        let header_id = self.r.i32().map_err(|_| NrbfError::BadHeader)?;
        let major_version = self.r.i32().map_err(|_| NrbfError::BadHeader)?;
        let minor_version = self.r.i32().map_err(|_| NrbfError::BadHeader)?;
        Ok(StreamHeader {
            root_id,
            header_id,
            major_version,
            minor_version,
        })
    }

    fn bump(&mut self) -> Result<(), NrbfError> {
        self.record_count += 1;
        if self.record_count > self.options.max_records {
            return Err(NrbfError::RecordBudgetExceeded);
        }
        Ok(())
    }

    /// Read one full record (tag byte already consumed) and insert it
    /// into the arena, registering its identity.
    fn read_record(&mut self, tag: RecordTag) -> Result<RecordId, NrbfError> {
        self.bump()?;
        let record = match tag {
            RecordTag::ClassWithId => self.read_class_with_id()?,
            RecordTag::SystemClassWithMembers
            | RecordTag::ClassWithMembers
            | RecordTag::SystemClassWithMembersAndTypes
            | RecordTag::ClassWithMembersAndTypes => self.read_class(tag)?,
            RecordTag::BinaryObjectString => NrbfRecord::ObjectString(ObjectStringRecord {
                object_id: self.r.i32()?,
                value: self.r.varstring()?,
            }),
            RecordTag::BinaryArray => self.read_binary_array()?,
            RecordTag::MemberPrimitiveTyped => {
                let kind = PrimitiveKind::from_byte(self.r.u8()?)?;
                NrbfRecord::PrimitiveTyped(self.read_primitive(kind)?)
            }
            RecordTag::MemberReference => NrbfRecord::Reference(self.r.i32()?),
            RecordTag::ObjectNull => NrbfRecord::Null,
            RecordTag::BinaryLibrary => NrbfRecord::Library(LibraryRecord {
                library_id: self.r.i32()?,
                name: self.r.varstring()?,
            }),
            RecordTag::ObjectNullMultiple256 => NrbfRecord::NullMultiple256(self.r.u8()?),
            RecordTag::ObjectNullMultiple => {
                let count = self.r.i32()?;
                if count < 0 {
                    return Err(NrbfError::InconsistentArrayLength);
                }
                NrbfRecord::NullMultiple(count)
            }
            RecordTag::ArraySinglePrimitive => self.read_primitive_array()?,
            RecordTag::ArraySingleObject => {
                let object_id = self.r.i32()?;
                let length = self.read_length()?;
                let slots = self.read_slots(length as usize)?;
                NrbfRecord::ObjectArray(ObjectArrayRecord {
                    object_id,
                    length,
                    slots,
                })
            }
            RecordTag::ArraySingleString => {
                let object_id = self.r.i32()?;
                let length = self.read_length()?;
                let slots = self.read_slots(length as usize)?;
                NrbfRecord::StringArray(StringArrayRecord {
                    object_id,
                    length,
                    slots,
                })
            }
            // A header or terminator in record position is malformed.
            RecordTag::SerializedStreamHeader | RecordTag::MessageEnd => {
                return Err(NrbfError::UnknownRecordTag(tag as u8))
            }
        };
        self.insert(record)
    }

    fn insert(&mut self, record: NrbfRecord) -> Result<RecordId, NrbfError> {
        let rid = RecordId(self.records.len());
        match &record {
            // Library ids live in their own map, not the object identity map.
            NrbfRecord::Library(lib) => {
                self.libraries.insert(lib.library_id, lib.name.clone());
            }
            _ => {
                if let Some(id) = record.object_id() {
                    if self.identity.insert(id, rid).is_some() {
                        return Err(NrbfError::DuplicateObjectId(id));
                    }
                }
            }
        }
        if let NrbfRecord::Class(class) = &record {
            if class.wire_kind != ClassWireKind::WithId {
                self.metadata.insert(class.info.object_id, rid);
            }
        }
        self.records.push(record);
        Ok(rid)
    }

    fn read_class(&mut self, tag: RecordTag) -> Result<NrbfRecord, NrbfError> {
        let wire_kind = match tag {
            RecordTag::SystemClassWithMembers => ClassWireKind::SystemWithMembers,
            RecordTag::ClassWithMembers => ClassWireKind::WithMembers,
            RecordTag::SystemClassWithMembersAndTypes => ClassWireKind::SystemWithMembersAndTypes,
            _ => ClassWireKind::WithMembersAndTypes,
        };
        let has_types = matches!(
            wire_kind,
            ClassWireKind::SystemWithMembersAndTypes | ClassWireKind::WithMembersAndTypes
        );
        let has_library = matches!(
            wire_kind,
            ClassWireKind::WithMembers | ClassWireKind::WithMembersAndTypes
        );

        let info = self.read_class_info()?;
        let member_types = if has_types {
            Some(self.read_member_type_info(info.member_names.len())?)
        } else {
            None
        };
        let library_id = if has_library {
            Some(self.r.i32()?)
        } else {
            None
        };

        let slots = match &member_types {
            Some(types) => self.read_typed_values(&info, types)?,
            None => self.read_slots(info.member_names.len())?,
        };

        Ok(NrbfRecord::Class(ClassRecord {
            info,
            member_types,
            library_id,
            wire_kind,
            metadata_id: None,
            slots,
        }))
    }

    /// `ClassWithId` inherits the shape of an earlier typed class record
    /// and contributes only a fresh object id plus member values.
    fn read_class_with_id(&mut self) -> Result<NrbfRecord, NrbfError> {
        let object_id = self.r.i32()?;
        let metadata_id = self.r.i32()?;

        let meta_rid = self
            .metadata
            .get(&metadata_id)
            .copied()
            .ok_or(NrbfError::UnknownMetadataId(metadata_id))?;
        let (mut info, member_types, library_id) = match &self.records[meta_rid.0] {
            NrbfRecord::Class(class) => (
                class.info.clone(),
                class.member_types.clone(),
                class.library_id,
            ),
            _ => return Err(NrbfError::UnknownMetadataId(metadata_id)),
        };
        info.object_id = object_id;

        let slots = match &member_types {
            Some(types) => self.read_typed_values(&info, types)?,
            None => self.read_slots(info.member_names.len())?,
        };

        Ok(NrbfRecord::Class(ClassRecord {
            info,
            member_types,
            library_id,
            wire_kind: ClassWireKind::WithId,
            metadata_id: Some(metadata_id),
            slots,
        }))
    }

    fn read_class_info(&mut self) -> Result<ClassInfo, NrbfError> {
        let object_id = self.r.i32()?;
        let name = self.r.varstring()?;
        let member_count = self.r.i32()?;
        if member_count < 0 {
            return Err(NrbfError::InconsistentArrayLength);
        }
        let mut member_names = Vec::new();
        for _ in 0..member_count {
            member_names.push(self.r.varstring()?);
        }
        Ok(ClassInfo {
            object_id,
            name,
            member_names,
        })
    }

    fn read_member_type_info(&mut self, count: usize) -> Result<MemberTypeInfo, NrbfError> {
        // All the binary type tags come first, then each tag's payload.
        let mut tags = Vec::with_capacity(count);
        for _ in 0..count {
            tags.push(BinaryTypeTag::from_byte(self.r.u8()?)?);
        }
        let mut types = Vec::with_capacity(count);
        for binary_type in tags {
            let extra = self.read_additional_type_info(binary_type)?;
            types.push(MemberType { binary_type, extra });
        }
        Ok(MemberTypeInfo { types })
    }

    fn read_additional_type_info(
        &mut self,
        tag: BinaryTypeTag,
    ) -> Result<AdditionalTypeInfo, NrbfError> {
        Ok(match tag {
            BinaryTypeTag::Primitive | BinaryTypeTag::PrimitiveArray => {
                AdditionalTypeInfo::Primitive(PrimitiveKind::from_byte(self.r.u8()?)?)
            }
            BinaryTypeTag::SystemClass => AdditionalTypeInfo::SystemClass(self.r.varstring()?),
            BinaryTypeTag::Class => AdditionalTypeInfo::Class {
                name: self.r.varstring()?,
                library_id: self.r.i32()?,
            },
            _ => AdditionalTypeInfo::None,
        })
    }

    /// Member values for a class with per-member type info. Primitive
    /// members are bare values in place; everything else is a nested
    /// record.
    fn read_typed_values(
        &mut self,
        info: &ClassInfo,
        types: &MemberTypeInfo,
    ) -> Result<Vec<Slot>, NrbfError> {
        let total = types.types.len();
        let mut slots = Vec::with_capacity(total);
        let mut filled = 0usize;
        while filled < total {
            let member = &types.types[filled];
            if member.binary_type == BinaryTypeTag::Primitive {
                let kind = match &member.extra {
                    AdditionalTypeInfo::Primitive(kind) => *kind,
                    _ => {
                        let name = info
                            .member_names
                            .get(filled)
                            .cloned()
                            .unwrap_or_default();
                        return Err(NrbfError::MissingTypeInfo(name));
                    }
                };
                slots.push(Slot::Value(Value::Primitive(self.read_primitive(kind)?)));
                filled += 1;
            } else {
                self.read_one_nested(&mut slots, &mut filled, total)?;
            }
        }
        Ok(slots)
    }

    /// Fill exactly `total` positions from nested records, expanding
    /// nothing: null runs stay as single slots covering several
    /// positions, interleaved library records cover none.
    fn read_slots(&mut self, total: usize) -> Result<Vec<Slot>, NrbfError> {
        let mut slots = Vec::with_capacity(total.min(1024));
        let mut filled = 0usize;
        while filled < total {
            self.read_one_nested(&mut slots, &mut filled, total)?;
        }
        Ok(slots)
    }

    fn read_one_nested(
        &mut self,
        slots: &mut Vec<Slot>,
        filled: &mut usize,
        total: usize,
    ) -> Result<(), NrbfError> {
        match self.read_nested()? {
            Nested::Value(value) => {
                slots.push(Slot::Value(value));
                *filled += 1;
            }
            Nested::NullRun { count, compact } => {
                let width = count as usize;
                if width == 0 || *filled + width > total {
                    return Err(NrbfError::InconsistentArrayLength);
                }
                slots.push(Slot::NullRun { count, compact });
                *filled += width;
            }
            Nested::Library(rid) => slots.push(Slot::Library(rid)),
        }
        Ok(())
    }

    fn read_nested(&mut self) -> Result<Nested, NrbfError> {
        let tag = RecordTag::from_byte(self.r.u8()?)?;
        match tag {
            RecordTag::MemberPrimitiveTyped => {
                self.bump()?;
                let kind = PrimitiveKind::from_byte(self.r.u8()?)?;
                Ok(Nested::Value(Value::Primitive(self.read_primitive(kind)?)))
            }
            RecordTag::MemberReference => {
                self.bump()?;
                Ok(Nested::Value(Value::Reference(self.r.i32()?)))
            }
            RecordTag::ObjectNull => {
                self.bump()?;
                Ok(Nested::Value(Value::Null))
            }
            RecordTag::ObjectNullMultiple256 => {
                self.bump()?;
                Ok(Nested::NullRun {
                    count: i32::from(self.r.u8()?),
                    compact: true,
                })
            }
            RecordTag::ObjectNullMultiple => {
                self.bump()?;
                let count = self.r.i32()?;
                if count < 0 {
                    return Err(NrbfError::InconsistentArrayLength);
                }
                Ok(Nested::NullRun {
                    count,
                    compact: false,
                })
            }
            RecordTag::BinaryLibrary => Ok(Nested::Library(self.read_record(tag)?)),
            RecordTag::SerializedStreamHeader | RecordTag::MessageEnd => {
                Err(NrbfError::UnknownRecordTag(tag as u8))
            }
            _ => Ok(Nested::Value(Value::Record(self.read_record(tag)?))),
        }
    }

    fn read_binary_array(&mut self) -> Result<NrbfRecord, NrbfError> {
        let object_id = self.r.i32()?;
        let shape = ArrayShape::from_byte(self.r.u8()?)?;
        let rank = self.r.i32()?;
        if rank < 0 {
            return Err(NrbfError::InconsistentArrayLength);
        }
        let mut lengths = Vec::with_capacity(rank.min(64) as usize);
        for _ in 0..rank {
            lengths.push(self.read_length()?);
        }
        let lower_bounds = if shape.has_lower_bounds() {
            let mut bounds = Vec::with_capacity(rank.min(64) as usize);
            for _ in 0..rank {
                bounds.push(self.r.i32()?);
            }
            Some(bounds)
        } else {
            None
        };
        let element_type = BinaryTypeTag::from_byte(self.r.u8()?)?;
        let element_info = self.read_additional_type_info(element_type)?;

        let total = lengths
            .iter()
            .try_fold(1usize, |acc, &l| acc.checked_mul(l as usize))
            .ok_or(NrbfError::InconsistentArrayLength)?;

        let slots = if element_type == BinaryTypeTag::Primitive {
            let kind = match &element_info {
                AdditionalTypeInfo::Primitive(kind) => *kind,
                _ => return Err(NrbfError::MissingTypeInfo(String::new())),
            };
            let mut slots = Vec::with_capacity(total.min(1024));
            for _ in 0..total {
                slots.push(Slot::Value(Value::Primitive(self.read_primitive(kind)?)));
            }
            slots
        } else {
            self.read_slots(total)?
        };

        Ok(NrbfRecord::BinaryArray(BinaryArrayRecord {
            object_id,
            shape,
            rank,
            lengths,
            lower_bounds,
            element_type,
            element_info,
            slots,
        }))
    }

    fn read_primitive_array(&mut self) -> Result<NrbfRecord, NrbfError> {
        let object_id = self.r.i32()?;
        let length = self.read_length()?;
        let element_kind = PrimitiveKind::from_byte(self.r.u8()?)?;
        let mut values = Vec::with_capacity((length as usize).min(1024));
        for _ in 0..length {
            values.push(self.read_primitive(element_kind)?);
        }
        Ok(NrbfRecord::PrimitiveArray(PrimitiveArrayRecord {
            object_id,
            length,
            element_kind,
            values,
        }))
    }

    fn read_length(&mut self) -> Result<i32, NrbfError> {
        let length = self.r.i32()?;
        if length < 0 {
            return Err(NrbfError::InconsistentArrayLength);
        }
        Ok(length)
    }

    fn read_primitive(&mut self, kind: PrimitiveKind) -> Result<Primitive, NrbfError> {
        Ok(match kind {
            PrimitiveKind::Boolean => Primitive::Boolean(self.r.bool()?),
            PrimitiveKind::Byte => Primitive::Byte(self.r.u8()?),
            PrimitiveKind::Char => {
                if self.options.wide_char {
                    Primitive::Char(self.r.u16()?)
                } else {
                    Primitive::Char(u16::from(self.r.u8()?))
                }
            }
            PrimitiveKind::Decimal => Primitive::Decimal(self.r.bytes_16()?),
            PrimitiveKind::Double => Primitive::Double(self.r.f64()?),
            PrimitiveKind::Int16 => Primitive::Int16(self.r.i16()?),
            PrimitiveKind::Int32 => Primitive::Int32(self.r.i32()?),
            PrimitiveKind::Int64 => Primitive::Int64(self.r.i64()?),
            PrimitiveKind::SByte => Primitive::SByte(self.r.i8()?),
            PrimitiveKind::Single => Primitive::Single(self.r.f32()?),
            PrimitiveKind::TimeSpan => Primitive::TimeSpan(self.r.i64()?),
            PrimitiveKind::DateTime => Primitive::DateTime(self.r.u64()?),
            PrimitiveKind::UInt16 => Primitive::UInt16(self.r.u16()?),
            PrimitiveKind::UInt32 => Primitive::UInt32(self.r.u32()?),
            PrimitiveKind::UInt64 => Primitive::UInt64(self.r.u64()?),
            PrimitiveKind::Null => Primitive::Null,
            PrimitiveKind::String => Primitive::String(self.r.varstring()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::record::NrbfRecord;

    #[test]
    fn test_magic_check() {
        let stream = fixtures::single_int_class(42);
        assert!(is_nrbf(&stream));
        assert!(!is_nrbf(&[]));
        assert!(!is_nrbf(&stream[..16]));

        let mut wrong_tag = stream.clone();
        wrong_tag[0] = 1;
        assert!(!is_nrbf(&wrong_tag));

        let mut wrong_version = stream;
        wrong_version[9] = 2;
        assert!(!is_nrbf(&wrong_version));
    }

    #[test]
    fn test_decode_single_class() {
        let doc = load(&fixtures::single_int_class(42)).unwrap();
        assert_eq!(doc.header().root_id, 1);
        assert_eq!(doc.header().major_version, 1);
        assert_eq!(doc.header().minor_version, 0);

        let root = doc.root_record();
        let class = match root {
            NrbfRecord::Class(c) => c,
            other => panic!("expected class root, got {other:?}"),
        };
        assert_eq!(class.info.name, "Sys.Int");
        assert_eq!(class.info.member_names, vec!["X"]);
        assert_eq!(
            class.member_value("X"),
            Some(Value::Primitive(Primitive::Int32(42)))
        );
    }

    #[test]
    fn test_decode_preserves_references() {
        let doc = load(&fixtures::string_reference()).unwrap();
        let class = match doc.root_record() {
            NrbfRecord::Class(c) => c,
            other => panic!("expected class root, got {other:?}"),
        };
        // The member must still be a reference, not the referent.
        assert_eq!(class.member_value("B"), Some(Value::Reference(7)));

        let resolved = doc.resolve(&Value::Reference(7)).unwrap();
        match resolved {
            Value::Record(rid) => match doc.record(rid) {
                NrbfRecord::ObjectString(s) => assert_eq!(s.value, "hi"),
                other => panic!("expected string, got {other:?}"),
            },
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_class_with_id_reuse() {
        let doc = load(&fixtures::vec3_array()).unwrap();
        for id in 10..=14 {
            let rid = doc.lookup(id).unwrap();
            let class = match doc.record(rid) {
                NrbfRecord::Class(c) => c,
                other => panic!("expected class, got {other:?}"),
            };
            assert_eq!(class.info.name, "Vec3");
            assert_eq!(class.info.member_names, vec!["x", "y", "z"]);
            assert_eq!(class.slots.len(), 3);
            if id > 10 {
                assert_eq!(class.metadata_id, Some(10));
            }
        }
    }

    #[test]
    fn test_decode_null_run_expansion() {
        let doc = load(&fixtures::null_run_array()).unwrap();
        let array = match doc.root_record() {
            NrbfRecord::ObjectArray(a) => a,
            other => panic!("expected object array, got {other:?}"),
        };
        let elements: Vec<Value> = doc.array_elements(doc.root_record()).unwrap();
        assert_eq!(elements.len(), 10);
        for element in &elements[..5] {
            assert_eq!(*element, Value::Null);
        }
        for element in &elements[5..] {
            assert!(matches!(element, Value::Record(_)));
        }
        // The run is stored as one slot, not five expanded nulls.
        assert_eq!(array.slots.len(), 6);
        assert!(matches!(
            array.slots[0],
            Slot::NullRun {
                count: 5,
                compact: false
            }
        ));
    }

    #[test]
    fn test_decode_primitive_array() {
        let doc = load(&fixtures::int_primitive_array(&[3, 1, 4, 1, 5])).unwrap();
        let array = match doc.root_record() {
            NrbfRecord::PrimitiveArray(a) => a,
            other => panic!("expected primitive array, got {other:?}"),
        };
        assert_eq!(array.element_kind, PrimitiveKind::Int32);
        assert_eq!(
            array.values,
            vec![
                Primitive::Int32(3),
                Primitive::Int32(1),
                Primitive::Int32(4),
                Primitive::Int32(1),
                Primitive::Int32(5)
            ]
        );
    }

    #[test]
    fn test_reject_bad_header() {
        assert!(matches!(load(&[]), Err(NrbfError::BadHeader)));
        assert!(matches!(load(&[6, 0, 0]), Err(NrbfError::BadHeader)));
        // Header tag fine but the fixed fields are truncated.
        assert!(matches!(
            load(&[0, 1, 0, 0, 0]),
            Err(NrbfError::BadHeader)
        ));
    }

    #[test]
    fn test_reject_unknown_record_tag() {
        let mut stream = fixtures::single_int_class(42);
        let end = stream.len() - 1;
        stream[end] = 0x63; // clobber MessageEnd
        assert!(matches!(
            load(&stream),
            Err(NrbfError::UnknownRecordTag(0x63))
        ));
    }

    #[test]
    fn test_reject_missing_terminator() {
        let mut stream = fixtures::single_int_class(42);
        stream.pop();
        assert!(matches!(load(&stream), Err(NrbfError::UnexpectedEof)));
    }

    #[test]
    fn test_reject_duplicate_object_id() {
        let stream = fixtures::duplicate_string_ids();
        assert!(matches!(
            load(&stream),
            Err(NrbfError::DuplicateObjectId(7))
        ));
    }

    #[test]
    fn test_reject_unknown_metadata_id() {
        let stream = fixtures::class_with_unknown_metadata();
        assert!(matches!(
            load(&stream),
            Err(NrbfError::UnknownMetadataId(404))
        ));
    }

    #[test]
    fn test_reject_missing_root() {
        let stream = fixtures::header_only(99);
        assert!(matches!(load(&stream), Err(NrbfError::RootNotFound(99))));
    }

    #[test]
    fn test_record_budget() {
        let stream = fixtures::vec3_array();
        let options = DecodeOptions {
            max_records: 3,
            ..DecodeOptions::default()
        };
        assert!(matches!(
            load_with(&stream, options),
            Err(NrbfError::RecordBudgetExceeded)
        ));
    }

    #[test]
    fn test_null_run_overflowing_array_rejected() {
        let stream = fixtures::null_run_overflow();
        assert!(matches!(
            load(&stream),
            Err(NrbfError::InconsistentArrayLength)
        ));
    }

    #[test]
    fn test_wide_char_mode() {
        let narrow = load(&fixtures::char_class(b'Z')).unwrap();
        let class = match narrow.root_record() {
            NrbfRecord::Class(c) => c,
            other => panic!("expected class, got {other:?}"),
        };
        assert_eq!(
            class.member_value("C"),
            Some(Value::Primitive(Primitive::Char(u16::from(b'Z'))))
        );

        let wide_stream = fixtures::wide_char_class('π');
        let wide = load_with(
            &wide_stream,
            DecodeOptions {
                wide_char: true,
                ..DecodeOptions::default()
            },
        )
        .unwrap();
        let class = match wide.root_record() {
            NrbfRecord::Class(c) => c,
            other => panic!("expected class, got {other:?}"),
        };
        assert_eq!(
            class.member_value("C"),
            Some(Value::Primitive(Primitive::Char('π' as u16)))
        );
    }
}
