//! Stream encoder: a [`Document`] in, wire bytes out.
//!
//! For a document that still has its wire ordering, encoding walks
//! `records_in_order()` and reproduces the original layout exactly:
//! same class record kinds, same library positions, same null-run
//! records. An unedited document encodes back to the identical bytes.
//!
//! Synthetic documents have no wire ordering; those fall back to a
//! structural walk that emits each record once, in depth-first
//! discovery order, turning repeat visits into references. The fallback
//! promises a stream that decodes to the same graph, not identical
//! bytes.

use std::collections::HashSet;

use crate::document::Document;
use crate::error::NrbfError;
use crate::record::{
    AdditionalTypeInfo, BinaryArrayRecord, BinaryTypeTag, ClassRecord, ClassWireKind, MemberType,
    MemberTypeInfo, NrbfRecord, Primitive, RecordId, RecordTag, Slot, Value,
};
use crate::wire::Writer;

impl Document {
    /// Encode back to bytes with the header's own root id.
    pub fn save(&self) -> Result<Vec<u8>, NrbfError> {
        self.save_with_root(self.header.root_id)
    }

    /// Encode back to bytes, overriding the root id in the emitted
    /// header. The record layout is unaffected.
    pub fn save_with_root(&self, root_id: i32) -> Result<Vec<u8>, NrbfError> {
        Encoder::new(self).run(root_id)
    }
}

struct Encoder<'a> {
    doc: &'a Document,
    w: Writer,
    structural: bool,
    emitted: HashSet<i32>,
    emitted_libraries: HashSet<i32>,
    pending: Vec<RecordId>,
}

impl<'a> Encoder<'a> {
    fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            w: Writer::new(),
            structural: false,
            emitted: HashSet::new(),
            emitted_libraries: HashSet::new(),
            pending: Vec::new(),
        }
    }

    fn run(mut self, root_id: i32) -> Result<Vec<u8>, NrbfError> {
        self.w.u8(RecordTag::SerializedStreamHeader as u8);
        self.w.i32(root_id);
        self.w.i32(self.doc.header.header_id);
        self.w.i32(self.doc.header.major_version);
        self.w.i32(self.doc.header.minor_version);

        if self.doc.order.is_empty() {
            self.structural = true;
            self.emit_structural()?;
        } else {
            let order = self.doc.order.clone();
            for rid in order {
                self.emit_record(self.doc.record(rid))?;
            }
        }

        self.w.u8(RecordTag::MessageEnd as u8);
        Ok(self.w.finish())
    }

    /// Depth-first emission from the root. Records reachable only
    /// through references are appended as additional top-level trees so
    /// every cited id ends up in the stream.
    fn emit_structural(&mut self) -> Result<(), NrbfError> {
        self.emit_record(self.doc.record(self.doc.root))?;
        while let Some(rid) = self.pending.pop() {
            let already = self
                .doc
                .record(rid)
                .object_id()
                .is_some_and(|id| self.emitted.contains(&id));
            if !already {
                self.emit_record(self.doc.record(rid))?;
            }
        }
        Ok(())
    }

    fn emit_record(&mut self, record: &NrbfRecord) -> Result<(), NrbfError> {
        if self.structural {
            if let Some(id) = record.object_id() {
                if !matches!(record, NrbfRecord::Library(_)) {
                    self.emitted.insert(id);
                }
            }
        }
        match record {
            NrbfRecord::Class(class) => self.emit_class(class),
            NrbfRecord::ObjectString(s) => {
                self.w.u8(RecordTag::BinaryObjectString as u8);
                self.w.i32(s.object_id);
                self.w.varstring(&s.value)
            }
            NrbfRecord::BinaryArray(array) => self.emit_binary_array(array),
            NrbfRecord::PrimitiveTyped(p) => {
                self.w.u8(RecordTag::MemberPrimitiveTyped as u8);
                self.w.u8(p.kind() as u8);
                self.write_primitive(p)
            }
            NrbfRecord::Reference(id) => {
                self.w.u8(RecordTag::MemberReference as u8);
                self.w.i32(*id);
                Ok(())
            }
            NrbfRecord::Null => {
                self.w.u8(RecordTag::ObjectNull as u8);
                Ok(())
            }
            NrbfRecord::NullMultiple256(count) => {
                self.w.u8(RecordTag::ObjectNullMultiple256 as u8);
                self.w.u8(*count);
                Ok(())
            }
            NrbfRecord::NullMultiple(count) => {
                self.w.u8(RecordTag::ObjectNullMultiple as u8);
                self.w.i32(*count);
                Ok(())
            }
            NrbfRecord::Library(lib) => {
                self.w.u8(RecordTag::BinaryLibrary as u8);
                self.w.i32(lib.library_id);
                self.emitted_libraries.insert(lib.library_id);
                self.w.varstring(&lib.name)
            }
            NrbfRecord::PrimitiveArray(array) => {
                if array.values.len() != array.length as usize {
                    return Err(NrbfError::InconsistentArrayLength);
                }
                self.w.u8(RecordTag::ArraySinglePrimitive as u8);
                self.w.i32(array.object_id);
                self.w.i32(array.length);
                self.w.u8(array.element_kind as u8);
                for value in &array.values {
                    if value.kind() != array.element_kind {
                        return Err(NrbfError::TypeMismatch {
                            expected: array.element_kind.name().to_string(),
                            actual: value.kind().name().to_string(),
                        });
                    }
                    self.write_primitive(value)?;
                }
                Ok(())
            }
            NrbfRecord::ObjectArray(array) => {
                self.w.u8(RecordTag::ArraySingleObject as u8);
                self.w.i32(array.object_id);
                self.w.i32(array.length);
                self.emit_slots(&array.slots, None, array.length as usize, "")
            }
            NrbfRecord::StringArray(array) => {
                self.w.u8(RecordTag::ArraySingleString as u8);
                self.w.i32(array.object_id);
                self.w.i32(array.length);
                self.emit_slots(&array.slots, None, array.length as usize, "")
            }
        }
    }

    fn emit_class(&mut self, class: &ClassRecord) -> Result<(), NrbfError> {
        let wire_kind = if self.structural {
            // Without wire ordering there is no earlier metadata record
            // to point at, so instance records spell out their shape.
            match (class.member_types.is_some(), class.library_id.is_some()) {
                (true, true) => ClassWireKind::WithMembersAndTypes,
                (true, false) => ClassWireKind::SystemWithMembersAndTypes,
                (false, true) => ClassWireKind::WithMembers,
                (false, false) => ClassWireKind::SystemWithMembers,
            }
        } else {
            class.wire_kind
        };

        if self.structural {
            self.ensure_library(class.library_id)?;
            if let Some(types) = &class.member_types {
                for member in &types.types {
                    if let AdditionalTypeInfo::Class { library_id, .. } = &member.extra {
                        self.ensure_library(Some(*library_id))?;
                    }
                }
            }
        }

        self.w.u8(wire_kind.tag() as u8);
        match wire_kind {
            ClassWireKind::WithId => {
                let metadata_id = class
                    .metadata_id
                    .ok_or_else(|| NrbfError::MissingTypeInfo(class.info.name.clone()))?;
                self.w.i32(class.info.object_id);
                self.w.i32(metadata_id);
            }
            ClassWireKind::SystemWithMembers => self.write_class_info(class)?,
            ClassWireKind::WithMembers => {
                self.write_class_info(class)?;
                self.write_library_id(class)?;
            }
            ClassWireKind::SystemWithMembersAndTypes => {
                self.write_class_info(class)?;
                self.write_member_type_info(class)?;
            }
            ClassWireKind::WithMembersAndTypes => {
                self.write_class_info(class)?;
                self.write_member_type_info(class)?;
                self.write_library_id(class)?;
            }
        }

        self.emit_slots(
            &class.slots,
            class.member_types.as_ref(),
            class.info.member_names.len(),
            &class.info.name,
        )
    }

    fn write_class_info(&mut self, class: &ClassRecord) -> Result<(), NrbfError> {
        self.w.i32(class.info.object_id);
        self.w.varstring(&class.info.name)?;
        let count = i32::try_from(class.info.member_names.len())
            .map_err(|_| NrbfError::EncodeIntegerOutOfRange)?;
        self.w.i32(count);
        for name in &class.info.member_names {
            self.w.varstring(name)?;
        }
        Ok(())
    }

    fn write_library_id(&mut self, class: &ClassRecord) -> Result<(), NrbfError> {
        let library_id = class
            .library_id
            .ok_or_else(|| NrbfError::MissingTypeInfo(class.info.name.clone()))?;
        self.w.i32(library_id);
        Ok(())
    }

    fn write_member_type_info(&mut self, class: &ClassRecord) -> Result<(), NrbfError> {
        let types = class
            .member_types
            .as_ref()
            .ok_or_else(|| NrbfError::MissingTypeInfo(class.info.name.clone()))?;
        if types.types.len() != class.info.member_names.len() {
            let missing = class
                .info
                .member_names
                .get(types.types.len())
                .cloned()
                .unwrap_or_else(|| class.info.name.clone());
            return Err(NrbfError::MissingTypeInfo(missing));
        }
        for member in &types.types {
            self.w.u8(member.binary_type as u8);
        }
        for member in &types.types {
            self.write_additional_type_info(member)?;
        }
        Ok(())
    }

    fn write_additional_type_info(&mut self, member: &MemberType) -> Result<(), NrbfError> {
        match member.binary_type {
            BinaryTypeTag::Primitive | BinaryTypeTag::PrimitiveArray => match &member.extra {
                AdditionalTypeInfo::Primitive(kind) => {
                    self.w.u8(*kind as u8);
                    Ok(())
                }
                _ => Err(NrbfError::MissingTypeInfo(String::new())),
            },
            BinaryTypeTag::SystemClass => match &member.extra {
                AdditionalTypeInfo::SystemClass(name) => self.w.varstring(name),
                _ => Err(NrbfError::MissingTypeInfo(String::new())),
            },
            BinaryTypeTag::Class => match &member.extra {
                AdditionalTypeInfo::Class { name, library_id } => {
                    self.w.varstring(name)?;
                    self.w.i32(*library_id);
                    Ok(())
                }
                _ => Err(NrbfError::MissingTypeInfo(String::new())),
            },
            _ => Ok(()),
        }
    }

    /// Emit a slot sequence filling exactly `total` positions.
    ///
    /// With member type info present, each position consults its
    /// declared type: primitive members write bare values in place,
    /// everything else writes a nested record. Null runs and
    /// interleaved libraries re-emit verbatim.
    fn emit_slots(
        &mut self,
        slots: &[Slot],
        types: Option<&MemberTypeInfo>,
        total: usize,
        context: &str,
    ) -> Result<(), NrbfError> {
        let mut filled = 0usize;
        for slot in slots {
            match slot {
                Slot::Library(rid) => self.emit_record(self.doc.record(*rid))?,
                Slot::NullRun { count, compact } => {
                    if *compact {
                        let count = u8::try_from(*count)
                            .map_err(|_| NrbfError::EncodeIntegerOutOfRange)?;
                        self.w.u8(RecordTag::ObjectNullMultiple256 as u8);
                        self.w.u8(count);
                    } else {
                        self.w.u8(RecordTag::ObjectNullMultiple as u8);
                        self.w.i32(*count);
                    }
                    filled += (*count).max(0) as usize;
                }
                Slot::Value(value) => {
                    let declared = types.and_then(|t| t.types.get(filled));
                    self.emit_value(value, declared, context)?;
                    filled += 1;
                }
            }
        }
        if filled != total {
            return Err(NrbfError::InconsistentArrayLength);
        }
        Ok(())
    }

    fn emit_value(
        &mut self,
        value: &Value,
        declared: Option<&MemberType>,
        context: &str,
    ) -> Result<(), NrbfError> {
        match value {
            Value::Primitive(p) => {
                let inline = matches!(
                    declared,
                    Some(MemberType {
                        binary_type: BinaryTypeTag::Primitive,
                        ..
                    })
                );
                if inline {
                    let kind = match declared.map(|d| &d.extra) {
                        Some(AdditionalTypeInfo::Primitive(kind)) => *kind,
                        _ => return Err(NrbfError::MissingTypeInfo(context.to_string())),
                    };
                    if p.kind() != kind {
                        return Err(NrbfError::TypeMismatch {
                            expected: kind.name().to_string(),
                            actual: p.kind().name().to_string(),
                        });
                    }
                    self.write_primitive(p)
                } else {
                    self.w.u8(RecordTag::MemberPrimitiveTyped as u8);
                    self.w.u8(p.kind() as u8);
                    self.write_primitive(p)
                }
            }
            Value::Null => {
                self.w.u8(RecordTag::ObjectNull as u8);
                Ok(())
            }
            Value::Reference(id) => self.emit_reference(*id),
            Value::Record(rid) => {
                if self.structural {
                    if let Some(id) = self.doc.record(*rid).object_id() {
                        if self.emitted.contains(&id) {
                            return self.emit_reference(id);
                        }
                    }
                }
                self.emit_record(self.doc.record(*rid))
            }
        }
    }

    /// A reference emits tag 9 and never recurses into the referent.
    fn emit_reference(&mut self, id: i32) -> Result<(), NrbfError> {
        if self.structural {
            let rid = self
                .doc
                .lookup(id)
                .ok_or(NrbfError::UnresolvableReference(id))?;
            if !self.emitted.contains(&id) {
                self.pending.push(rid);
            }
        }
        self.w.u8(RecordTag::MemberReference as u8);
        self.w.i32(id);
        Ok(())
    }

    fn emit_binary_array(&mut self, array: &BinaryArrayRecord) -> Result<(), NrbfError> {
        if array.lengths.len() != array.rank as usize {
            return Err(NrbfError::InconsistentArrayLength);
        }
        if self.structural {
            if let AdditionalTypeInfo::Class { library_id, .. } = &array.element_info {
                self.ensure_library(Some(*library_id))?;
            }
        }
        self.w.u8(RecordTag::BinaryArray as u8);
        self.w.i32(array.object_id);
        self.w.u8(array.shape as u8);
        self.w.i32(array.rank);
        for &length in &array.lengths {
            self.w.i32(length);
        }
        if array.shape.has_lower_bounds() {
            let bounds = array
                .lower_bounds
                .as_ref()
                .ok_or(NrbfError::InconsistentArrayLength)?;
            if bounds.len() != array.rank as usize {
                return Err(NrbfError::InconsistentArrayLength);
            }
            for &bound in bounds {
                self.w.i32(bound);
            }
        }
        self.w.u8(array.element_type as u8);
        self.write_additional_type_info(&MemberType {
            binary_type: array.element_type,
            extra: array.element_info.clone(),
        })?;

        let total = array.total_len();
        if array.element_type == BinaryTypeTag::Primitive {
            let kind = match &array.element_info {
                AdditionalTypeInfo::Primitive(kind) => *kind,
                _ => return Err(NrbfError::MissingTypeInfo(String::new())),
            };
            let mut count = 0usize;
            for slot in &array.slots {
                match slot {
                    Slot::Value(Value::Primitive(p)) if p.kind() == kind => {
                        self.write_primitive(p)?;
                        count += 1;
                    }
                    _ => {
                        return Err(NrbfError::TypeMismatch {
                            expected: kind.name().to_string(),
                            actual: "non-primitive element".to_string(),
                        })
                    }
                }
            }
            if count != total {
                return Err(NrbfError::InconsistentArrayLength);
            }
            Ok(())
        } else {
            self.emit_slots(&array.slots, None, total, "")
        }
    }

    /// Structural mode only: make sure a library declaration precedes
    /// the first record that cites it.
    fn ensure_library(&mut self, library_id: Option<i32>) -> Result<(), NrbfError> {
        let Some(id) = library_id else {
            return Ok(());
        };
        if self.emitted_libraries.contains(&id) {
            return Ok(());
        }
        let name = self
            .doc
            .libraries
            .get(&id)
            .ok_or(NrbfError::UnresolvableReference(id))?
            .clone();
        self.w.u8(RecordTag::BinaryLibrary as u8);
        self.w.i32(id);
        self.w.varstring(&name)?;
        self.emitted_libraries.insert(id);
        Ok(())
    }

    fn write_primitive(&mut self, p: &Primitive) -> Result<(), NrbfError> {
        match p {
            Primitive::Boolean(v) => self.w.bool(*v),
            Primitive::Byte(v) => self.w.u8(*v),
            Primitive::Char(v) => {
                if self.doc.wide_char {
                    self.w.u16(*v);
                } else {
                    let narrow =
                        u8::try_from(*v).map_err(|_| NrbfError::EncodeIntegerOutOfRange)?;
                    self.w.u8(narrow);
                }
            }
            Primitive::Decimal(bytes) => self.w.bytes(bytes),
            Primitive::Double(v) => self.w.f64(*v),
            Primitive::Int16(v) => self.w.i16(*v),
            Primitive::Int32(v) => self.w.i32(*v),
            Primitive::Int64(v) => self.w.i64(*v),
            Primitive::SByte(v) => self.w.i8(*v),
            Primitive::Single(v) => self.w.f32(*v),
            Primitive::TimeSpan(v) => self.w.i64(*v),
            Primitive::DateTime(v) => self.w.u64(*v),
            Primitive::UInt16(v) => self.w.u16(*v),
            Primitive::UInt32(v) => self.w.u32(*v),
            Primitive::UInt64(v) => self.w.u64(*v),
            Primitive::Null => {}
            Primitive::String(s) => self.w.varstring(s)?,
        }
        Ok(())
    }
}
