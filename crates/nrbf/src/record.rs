//! Record taxonomy and the in-memory value model.
//!
//! Every framed unit on the wire starts with a one-byte [`RecordTag`].
//! Decoded records live in an arena owned by the document and are linked
//! by [`RecordId`] handles, so graphs with reference cycles stay
//! representable and safe to traverse.

use std::fmt;

use crate::error::NrbfError;

/// Wire tag of each record kind, the first byte of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordTag {
    SerializedStreamHeader = 0,
    ClassWithId = 1,
    SystemClassWithMembers = 2,
    ClassWithMembers = 3,
    SystemClassWithMembersAndTypes = 4,
    ClassWithMembersAndTypes = 5,
    BinaryObjectString = 6,
    BinaryArray = 7,
    MemberPrimitiveTyped = 8,
    MemberReference = 9,
    ObjectNull = 10,
    MessageEnd = 11,
    BinaryLibrary = 12,
    ObjectNullMultiple256 = 13,
    ObjectNullMultiple = 14,
    ArraySinglePrimitive = 15,
    ArraySingleObject = 16,
    ArraySingleString = 17,
}

impl RecordTag {
    pub fn from_byte(b: u8) -> Result<Self, NrbfError> {
        Ok(match b {
            0 => Self::SerializedStreamHeader,
            1 => Self::ClassWithId,
            2 => Self::SystemClassWithMembers,
            3 => Self::ClassWithMembers,
            4 => Self::SystemClassWithMembersAndTypes,
            5 => Self::ClassWithMembersAndTypes,
            6 => Self::BinaryObjectString,
            7 => Self::BinaryArray,
            8 => Self::MemberPrimitiveTyped,
            9 => Self::MemberReference,
            10 => Self::ObjectNull,
            11 => Self::MessageEnd,
            12 => Self::BinaryLibrary,
            13 => Self::ObjectNullMultiple256,
            14 => Self::ObjectNullMultiple,
            15 => Self::ArraySinglePrimitive,
            16 => Self::ArraySingleObject,
            17 => Self::ArraySingleString,
            other => return Err(NrbfError::UnknownRecordTag(other)),
        })
    }
}

/// Primitive type tags as they appear on the wire (1 through 18, 4 unused).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PrimitiveKind {
    Boolean = 1,
    Byte = 2,
    Char = 3,
    Decimal = 5,
    Double = 6,
    Int16 = 7,
    Int32 = 8,
    Int64 = 9,
    SByte = 10,
    Single = 11,
    TimeSpan = 12,
    DateTime = 13,
    UInt16 = 14,
    UInt32 = 15,
    UInt64 = 16,
    Null = 17,
    String = 18,
}

impl PrimitiveKind {
    pub fn from_byte(b: u8) -> Result<Self, NrbfError> {
        Ok(match b {
            1 => Self::Boolean,
            2 => Self::Byte,
            3 => Self::Char,
            5 => Self::Decimal,
            6 => Self::Double,
            7 => Self::Int16,
            8 => Self::Int32,
            9 => Self::Int64,
            10 => Self::SByte,
            11 => Self::Single,
            12 => Self::TimeSpan,
            13 => Self::DateTime,
            14 => Self::UInt16,
            15 => Self::UInt32,
            16 => Self::UInt64,
            17 => Self::Null,
            18 => Self::String,
            other => return Err(NrbfError::UnknownPrimitiveTag(other)),
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Byte => "Byte",
            Self::Char => "Char",
            Self::Decimal => "Decimal",
            Self::Double => "Double",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::SByte => "SByte",
            Self::Single => "Single",
            Self::TimeSpan => "TimeSpan",
            Self::DateTime => "DateTime",
            Self::UInt16 => "UInt16",
            Self::UInt32 => "UInt32",
            Self::UInt64 => "UInt64",
            Self::Null => "Null",
            Self::String => "String",
        }
    }
}

/// How a class member's type is described in `MemberTypeInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BinaryTypeTag {
    Primitive = 0,
    String = 1,
    Object = 2,
    SystemClass = 3,
    Class = 4,
    ObjectArray = 5,
    StringArray = 6,
    PrimitiveArray = 7,
}

impl BinaryTypeTag {
    pub fn from_byte(b: u8) -> Result<Self, NrbfError> {
        Ok(match b {
            0 => Self::Primitive,
            1 => Self::String,
            2 => Self::Object,
            3 => Self::SystemClass,
            4 => Self::Class,
            5 => Self::ObjectArray,
            6 => Self::StringArray,
            7 => Self::PrimitiveArray,
            other => return Err(NrbfError::UnknownBinaryTypeTag(other)),
        })
    }
}

/// Shape of a `BinaryArray` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArrayShape {
    Single = 0,
    Jagged = 1,
    Rectangular = 2,
    SingleOffset = 3,
    JaggedOffset = 4,
    RectangularOffset = 5,
}

impl ArrayShape {
    pub fn from_byte(b: u8) -> Result<Self, NrbfError> {
        Ok(match b {
            0 => Self::Single,
            1 => Self::Jagged,
            2 => Self::Rectangular,
            3 => Self::SingleOffset,
            4 => Self::JaggedOffset,
            5 => Self::RectangularOffset,
            other => return Err(NrbfError::UnknownArrayShapeTag(other)),
        })
    }

    /// Offset shapes carry one lower bound per rank after the lengths.
    pub fn has_lower_bounds(self) -> bool {
        matches!(
            self,
            Self::SingleOffset | Self::JaggedOffset | Self::RectangularOffset
        )
    }
}

/// One typed primitive value.
///
/// `Decimal` is 16 opaque bytes, `DateTime` and `TimeSpan` raw ticks.
/// `Char` holds a code unit; narrow-mode files only ever produce values
/// up to 255.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Boolean(bool),
    Byte(u8),
    Char(u16),
    Decimal([u8; 16]),
    Double(f64),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    SByte(i8),
    Single(f32),
    TimeSpan(i64),
    DateTime(u64),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Null,
    String(String),
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Boolean(_) => PrimitiveKind::Boolean,
            Self::Byte(_) => PrimitiveKind::Byte,
            Self::Char(_) => PrimitiveKind::Char,
            Self::Decimal(_) => PrimitiveKind::Decimal,
            Self::Double(_) => PrimitiveKind::Double,
            Self::Int16(_) => PrimitiveKind::Int16,
            Self::Int32(_) => PrimitiveKind::Int32,
            Self::Int64(_) => PrimitiveKind::Int64,
            Self::SByte(_) => PrimitiveKind::SByte,
            Self::Single(_) => PrimitiveKind::Single,
            Self::TimeSpan(_) => PrimitiveKind::TimeSpan,
            Self::DateTime(_) => PrimitiveKind::DateTime,
            Self::UInt16(_) => PrimitiveKind::UInt16,
            Self::UInt32(_) => PrimitiveKind::UInt32,
            Self::UInt64(_) => PrimitiveKind::UInt64,
            Self::Null => PrimitiveKind::Null,
            Self::String(_) => PrimitiveKind::String,
        }
    }
}

/// Canonical textual form, used by the diff engine and display layers.
impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "{c}"),
                None => write!(f, "{v}"),
            },
            Self::Decimal(v) => write!(f, "{}", hex::encode(v)),
            Self::Double(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::SByte(v) => write!(f, "{v}"),
            Self::Single(v) => write!(f, "{v}"),
            Self::TimeSpan(v) => write!(f, "{v}"),
            Self::DateTime(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Null => write!(f, "null"),
            Self::String(v) => write!(f, "{v}"),
        }
    }
}

/// Handle to a record in the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(pub(crate) usize);

/// One member or element value.
///
/// References are preserved exactly as decoded; nothing dereferences
/// them implicitly. Consumers resolve through the document on demand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Primitive(Primitive),
    Null,
    Record(RecordId),
    Reference(i32),
}

/// One decoded slot in a member-value or array-element sequence.
///
/// Null runs are kept un-expanded so re-encoding reproduces the original
/// `ObjectNullMultiple`/`ObjectNullMultiple256` records byte for byte.
/// Library declarations interleaved with values occupy no position.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Value(Value),
    NullRun { count: i32, compact: bool },
    Library(RecordId),
}

impl Slot {
    /// Number of member or element positions this slot fills.
    pub fn width(&self) -> usize {
        match self {
            Self::Value(_) => 1,
            Self::NullRun { count, .. } => (*count).max(0) as usize,
            Self::Library(_) => 0,
        }
    }
}

/// Expand a slot sequence into one [`Value`] per position.
pub(crate) fn expand_slots(slots: &[Slot]) -> impl Iterator<Item = Value> + '_ {
    slots.iter().flat_map(|slot| -> Box<dyn Iterator<Item = Value>> {
        match slot {
            Slot::Value(v) => Box::new(std::iter::once(v.clone())),
            Slot::NullRun { count, .. } => {
                Box::new(std::iter::repeat(Value::Null).take((*count).max(0) as usize))
            }
            Slot::Library(_) => Box::new(std::iter::empty()),
        }
    })
}

/// Locate the slot covering element position `index`.
///
/// Returns the slot's index in the sequence and the offset inside it
/// (always 0 for single-value slots).
pub(crate) fn slot_at(slots: &[Slot], index: usize) -> Option<(usize, usize)> {
    let mut pos = 0usize;
    for (i, slot) in slots.iter().enumerate() {
        let width = slot.width();
        if index < pos + width {
            return Some((i, index - pos));
        }
        pos += width;
    }
    None
}

/// Object id, class name, and ordered member names of a class record.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    pub object_id: i32,
    pub name: String,
    pub member_names: Vec<String>,
}

/// Companion payload for a member's [`BinaryTypeTag`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalTypeInfo {
    None,
    Primitive(PrimitiveKind),
    SystemClass(String),
    Class { name: String, library_id: i32 },
}

/// Declared type of a single member.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberType {
    pub binary_type: BinaryTypeTag,
    pub extra: AdditionalTypeInfo,
}

/// Per-member type descriptions, absent for the type-less class kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberTypeInfo {
    pub types: Vec<MemberType>,
}

/// Which of the five class record kinds a class was decoded as.
///
/// The encoder reproduces this exactly, so the original choice between
/// emitting metadata inline and referring to earlier metadata survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassWireKind {
    WithId,
    SystemWithMembers,
    WithMembers,
    SystemWithMembersAndTypes,
    WithMembersAndTypes,
}

impl ClassWireKind {
    pub fn tag(self) -> RecordTag {
        match self {
            Self::WithId => RecordTag::ClassWithId,
            Self::SystemWithMembers => RecordTag::SystemClassWithMembers,
            Self::WithMembers => RecordTag::ClassWithMembers,
            Self::SystemWithMembersAndTypes => RecordTag::SystemClassWithMembersAndTypes,
            Self::WithMembersAndTypes => RecordTag::ClassWithMembersAndTypes,
        }
    }
}

/// A decoded class instance.
///
/// `ClassWithId` records carry copies of the metadata record's shape in
/// `info`, `member_types`, and `library_id`; `metadata_id` remembers the
/// record they borrowed it from.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRecord {
    pub info: ClassInfo,
    pub member_types: Option<MemberTypeInfo>,
    pub library_id: Option<i32>,
    pub wire_kind: ClassWireKind,
    pub metadata_id: Option<i32>,
    pub slots: Vec<Slot>,
}

impl ClassRecord {
    /// Position of a member in the declared member order.
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.info.member_names.iter().position(|n| n == name)
    }

    /// Value bound to a member name. Positions inside a null run read as
    /// [`Value::Null`].
    pub fn member_value(&self, name: &str) -> Option<Value> {
        let index = self.member_index(name)?;
        let (slot, _) = slot_at(&self.slots, index)?;
        Some(match &self.slots[slot] {
            Slot::Value(v) => v.clone(),
            Slot::NullRun { .. } => Value::Null,
            Slot::Library(_) => unreachable!("library slots have zero width"),
        })
    }

    /// Iterate `(member name, value)` pairs in declared order.
    pub fn members(&self) -> impl Iterator<Item = (&str, Value)> + '_ {
        self.info
            .member_names
            .iter()
            .map(String::as_str)
            .zip(expand_slots(&self.slots))
    }

    /// Declared primitive kind of a member, when type info says so.
    pub fn member_primitive_kind(&self, index: usize) -> Option<PrimitiveKind> {
        let types = self.member_types.as_ref()?;
        match types.types.get(index)? {
            MemberType {
                binary_type: BinaryTypeTag::Primitive,
                extra: AdditionalTypeInfo::Primitive(kind),
            } => Some(*kind),
            _ => None,
        }
    }

    /// Replace the value at a member position. Fails when the position is
    /// covered by a null run, which cannot hold a single value.
    pub(crate) fn set_member_value(&mut self, index: usize, value: Value) -> bool {
        match slot_at(&self.slots, index) {
            Some((slot, _)) => match &mut self.slots[slot] {
                Slot::Value(v) => {
                    *v = value;
                    true
                }
                _ => false,
            },
            None => false,
        }
    }
}

/// `BinaryObjectString`: an identified UTF-8 string.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStringRecord {
    pub object_id: i32,
    pub value: String,
}

/// `BinaryLibrary`: an assembly-qualified origin declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryRecord {
    pub library_id: i32,
    pub name: String,
}

/// `ArraySinglePrimitive`: rank-1 array of bare primitive values.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveArrayRecord {
    pub object_id: i32,
    pub length: i32,
    pub element_kind: PrimitiveKind,
    pub values: Vec<Primitive>,
}

impl PrimitiveArrayRecord {
    pub fn elements(&self) -> impl Iterator<Item = Value> + '_ {
        self.values.iter().cloned().map(Value::Primitive)
    }
}

/// `ArraySingleObject`: rank-1 array of arbitrary values.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectArrayRecord {
    pub object_id: i32,
    pub length: i32,
    pub slots: Vec<Slot>,
}

impl ObjectArrayRecord {
    /// Element values with null runs expanded to one value per position.
    pub fn elements(&self) -> impl Iterator<Item = Value> + '_ {
        expand_slots(&self.slots)
    }
}

/// `ArraySingleString`: rank-1 array of string values.
#[derive(Debug, Clone, PartialEq)]
pub struct StringArrayRecord {
    pub object_id: i32,
    pub length: i32,
    pub slots: Vec<Slot>,
}

impl StringArrayRecord {
    pub fn elements(&self) -> impl Iterator<Item = Value> + '_ {
        expand_slots(&self.slots)
    }
}

/// `BinaryArray`: the general array form with shape, rank, and an
/// element-type descriptor. Elements are stored flattened in row-major
/// order; the position count is the product of the declared lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryArrayRecord {
    pub object_id: i32,
    pub shape: ArrayShape,
    pub rank: i32,
    pub lengths: Vec<i32>,
    pub lower_bounds: Option<Vec<i32>>,
    pub element_type: BinaryTypeTag,
    pub element_info: AdditionalTypeInfo,
    pub slots: Vec<Slot>,
}

impl BinaryArrayRecord {
    /// Total number of element positions across all dimensions.
    pub fn total_len(&self) -> usize {
        self.lengths
            .iter()
            .map(|&l| l.max(0) as usize)
            .product()
    }

    pub fn elements(&self) -> impl Iterator<Item = Value> + '_ {
        expand_slots(&self.slots)
    }
}

/// A decoded record, the unit of the document arena.
///
/// The framing header and terminator never appear here; the document
/// carries the header fields separately.
#[derive(Debug, Clone, PartialEq)]
pub enum NrbfRecord {
    Class(ClassRecord),
    ObjectString(ObjectStringRecord),
    BinaryArray(BinaryArrayRecord),
    PrimitiveTyped(Primitive),
    Reference(i32),
    Null,
    NullMultiple256(u8),
    NullMultiple(i32),
    Library(LibraryRecord),
    PrimitiveArray(PrimitiveArrayRecord),
    ObjectArray(ObjectArrayRecord),
    StringArray(StringArrayRecord),
}

impl NrbfRecord {
    /// Object identity, for records that have one. Library records answer
    /// with their library id, which shares the stream's id space.
    pub fn object_id(&self) -> Option<i32> {
        match self {
            Self::Class(c) => Some(c.info.object_id),
            Self::ObjectString(s) => Some(s.object_id),
            Self::BinaryArray(a) => Some(a.object_id),
            Self::PrimitiveArray(a) => Some(a.object_id),
            Self::ObjectArray(a) => Some(a.object_id),
            Self::StringArray(a) => Some(a.object_id),
            Self::Library(l) => Some(l.library_id),
            _ => None,
        }
    }

    /// The wire tag this record encodes as.
    pub fn tag(&self) -> RecordTag {
        match self {
            Self::Class(c) => c.wire_kind.tag(),
            Self::ObjectString(_) => RecordTag::BinaryObjectString,
            Self::BinaryArray(_) => RecordTag::BinaryArray,
            Self::PrimitiveTyped(_) => RecordTag::MemberPrimitiveTyped,
            Self::Reference(_) => RecordTag::MemberReference,
            Self::Null => RecordTag::ObjectNull,
            Self::NullMultiple256(_) => RecordTag::ObjectNullMultiple256,
            Self::NullMultiple(_) => RecordTag::ObjectNullMultiple,
            Self::Library(_) => RecordTag::BinaryLibrary,
            Self::PrimitiveArray(_) => RecordTag::ArraySinglePrimitive,
            Self::ObjectArray(_) => RecordTag::ArraySingleObject,
            Self::StringArray(_) => RecordTag::ArraySingleString,
        }
    }
}
