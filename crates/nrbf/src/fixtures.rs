//! Hand-built NRBF byte streams backing the test suite.
//!
//! Each fixture is a complete stream: header, records, terminator.
//! Keeping them as builders rather than hex blobs makes the expected
//! wire layout legible next to the tests that consume it.

use crate::guid;
use crate::record::{BinaryTypeTag, PrimitiveKind, RecordTag};
use crate::wire::Writer;

struct Stream {
    w: Writer,
}

impl Stream {
    fn new(root_id: i32) -> Self {
        let mut w = Writer::new();
        w.u8(RecordTag::SerializedStreamHeader as u8);
        w.i32(root_id);
        w.i32(-1);
        w.i32(1);
        w.i32(0);
        Self { w }
    }

    fn tag(&mut self, tag: RecordTag) -> &mut Self {
        self.w.u8(tag as u8);
        self
    }

    fn string(&mut self, s: &str) -> &mut Self {
        self.w.varstring(s).unwrap();
        self
    }

    fn class_info(&mut self, object_id: i32, name: &str, members: &[&str]) -> &mut Self {
        self.w.i32(object_id);
        self.string(name);
        self.w.i32(members.len() as i32);
        for member in members {
            self.string(member);
        }
        self
    }

    fn object_string(&mut self, object_id: i32, value: &str) -> &mut Self {
        self.tag(RecordTag::BinaryObjectString);
        self.w.i32(object_id);
        self.string(value)
    }

    fn reference(&mut self, id: i32) -> &mut Self {
        self.tag(RecordTag::MemberReference);
        self.w.i32(id);
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.w.u8(RecordTag::MessageEnd as u8);
        self.w.finish()
    }
}

/// System class with one Int32 member `X`.
pub(crate) fn named_int_class(name: &str, x: i32) -> Vec<u8> {
    let mut s = Stream::new(1);
    s.tag(RecordTag::SystemClassWithMembersAndTypes)
        .class_info(1, name, &["X"]);
    s.w.u8(BinaryTypeTag::Primitive as u8);
    s.w.u8(PrimitiveKind::Int32 as u8);
    s.w.i32(x);
    s.finish()
}

pub(crate) fn single_int_class(x: i32) -> Vec<u8> {
    named_int_class("Sys.Int", x)
}

/// System class with one narrow Char member `C`.
pub(crate) fn char_class(c: u8) -> Vec<u8> {
    let mut s = Stream::new(1);
    s.tag(RecordTag::SystemClassWithMembersAndTypes)
        .class_info(1, "CharBox", &["C"]);
    s.w.u8(BinaryTypeTag::Primitive as u8);
    s.w.u8(PrimitiveKind::Char as u8);
    s.w.u8(c);
    s.finish()
}

/// Same shape as [`char_class`] but with a two-byte char payload.
pub(crate) fn wide_char_class(c: char) -> Vec<u8> {
    let mut s = Stream::new(1);
    s.tag(RecordTag::SystemClassWithMembersAndTypes)
        .class_info(1, "CharBox", &["C"]);
    s.w.u8(BinaryTypeTag::Primitive as u8);
    s.w.u8(PrimitiveKind::Char as u8);
    s.w.u16(c as u16);
    s.finish()
}

/// A string record with id 7 followed by a class whose member `B`
/// references it.
pub(crate) fn string_reference() -> Vec<u8> {
    let mut s = Stream::new(1);
    s.object_string(7, "hi");
    s.tag(RecordTag::SystemClassWithMembersAndTypes)
        .class_info(1, "A", &["B"]);
    s.w.u8(BinaryTypeTag::String as u8);
    s.reference(7);
    s.finish()
}

/// Library, then an array of five `Vec3` instances: one full class
/// record at id 10 and four `ClassWithId` records at ids 11 through 14.
/// The `y` of object 13 is parameterized.
pub(crate) fn vec3_array_with(y13: f32) -> Vec<u8> {
    let mut s = Stream::new(99);
    s.tag(RecordTag::BinaryLibrary);
    s.w.i32(50);
    s.string("GameLib");

    s.tag(RecordTag::ArraySingleObject);
    s.w.i32(99);
    s.w.i32(5);

    s.tag(RecordTag::ClassWithMembersAndTypes)
        .class_info(10, "Vec3", &["x", "y", "z"]);
    for _ in 0..3 {
        s.w.u8(BinaryTypeTag::Primitive as u8);
    }
    for _ in 0..3 {
        s.w.u8(PrimitiveKind::Single as u8);
    }
    s.w.i32(50);
    for _ in 0..3 {
        s.w.f32(1.0);
    }

    for (id, y) in [(11, 1.0), (12, 1.0), (13, y13), (14, 1.0)] {
        s.tag(RecordTag::ClassWithId);
        s.w.i32(id);
        s.w.i32(10);
        s.w.f32(1.0);
        s.w.f32(y);
        s.w.f32(1.0);
    }
    s.finish()
}

pub(crate) fn vec3_array() -> Vec<u8> {
    vec3_array_with(1.0)
}

/// Length-10 object array: a five-wide null run, then five strings.
pub(crate) fn null_run_array() -> Vec<u8> {
    let mut s = Stream::new(30);
    s.tag(RecordTag::ArraySingleObject);
    s.w.i32(30);
    s.w.i32(10);
    s.tag(RecordTag::ObjectNullMultiple);
    s.w.i32(5);
    for id in 31..=35 {
        s.object_string(id, &format!("s{id}"));
    }
    s.finish()
}

/// Length-4 object array using the one-byte null-run record.
pub(crate) fn compact_null_run_array() -> Vec<u8> {
    let mut s = Stream::new(40);
    s.tag(RecordTag::ArraySingleObject);
    s.w.i32(40);
    s.w.i32(4);
    s.tag(RecordTag::ObjectNullMultiple256);
    s.w.u8(3);
    s.object_string(41, "x");
    s.finish()
}

/// Null run wider than the declared array length; must not decode.
pub(crate) fn null_run_overflow() -> Vec<u8> {
    let mut s = Stream::new(60);
    s.tag(RecordTag::ArraySingleObject);
    s.w.i32(60);
    s.w.i32(3);
    s.tag(RecordTag::ObjectNullMultiple);
    s.w.i32(5);
    s.finish()
}

/// Rank-1 primitive array of Int32 values.
pub(crate) fn int_primitive_array(values: &[i32]) -> Vec<u8> {
    let mut s = Stream::new(20);
    s.tag(RecordTag::ArraySinglePrimitive);
    s.w.i32(20);
    s.w.i32(values.len() as i32);
    s.w.u8(PrimitiveKind::Int32 as u8);
    for &value in values {
        s.w.i32(value);
    }
    s.finish()
}

/// 2x3 rectangular Int32 `BinaryArray`.
pub(crate) fn rectangular_int_array() -> Vec<u8> {
    let mut s = Stream::new(70);
    s.tag(RecordTag::BinaryArray);
    s.w.i32(70);
    s.w.u8(2); // rectangular
    s.w.i32(2);
    s.w.i32(2);
    s.w.i32(3);
    s.w.u8(BinaryTypeTag::Primitive as u8);
    s.w.u8(PrimitiveKind::Int32 as u8);
    for value in 10..16 {
        s.w.i32(value);
    }
    s.finish()
}

/// Single-dimension `BinaryArray` of strings with a lower bound.
pub(crate) fn offset_string_array() -> Vec<u8> {
    let mut s = Stream::new(71);
    s.tag(RecordTag::BinaryArray);
    s.w.i32(71);
    s.w.u8(3); // single with offset
    s.w.i32(1);
    s.w.i32(2);
    s.w.i32(5); // lower bound
    s.w.u8(BinaryTypeTag::String as u8);
    s.object_string(72, "a");
    s.object_string(73, "b");
    s.finish()
}

fn write_guid_record(s: &mut Stream, object_id: i32, text: &str) {
    s.tag(RecordTag::SystemClassWithMembersAndTypes).class_info(
        object_id,
        guid::GUID_CLASS_NAME,
        &guid::GUID_FIELD_NAMES,
    );
    for _ in 0..11 {
        s.w.u8(BinaryTypeTag::Primitive as u8);
    }
    s.w.u8(PrimitiveKind::Int32 as u8);
    s.w.u8(PrimitiveKind::Int16 as u8);
    s.w.u8(PrimitiveKind::Int16 as u8);
    for _ in 0..8 {
        s.w.u8(PrimitiveKind::Byte as u8);
    }
    // Field payloads in declared order are exactly the 16 GUID bytes.
    s.w.bytes(&guid::bytes_from_text(text).unwrap());
}

/// A `System.Guid` record as the root.
pub(crate) fn guid_class(text: &str) -> Vec<u8> {
    let mut s = Stream::new(1);
    write_guid_record(&mut s, 1, text);
    s.finish()
}

/// A wrapper class whose `Id` member is a nested `System.Guid`.
pub(crate) fn guid_holder(text: &str) -> Vec<u8> {
    let mut s = Stream::new(1);
    s.tag(RecordTag::SystemClassWithMembersAndTypes)
        .class_info(1, "SaveHeader", &["Id"]);
    s.w.u8(BinaryTypeTag::SystemClass as u8);
    s.string(guid::GUID_CLASS_NAME);
    write_guid_record(&mut s, 2, text);
    s.finish()
}

/// Three nested classes: SaveGame.Player.Stats.XP.
pub(crate) fn nested_player(xp: i32) -> Vec<u8> {
    let mut s = Stream::new(1);
    s.tag(RecordTag::SystemClassWithMembersAndTypes)
        .class_info(1, "SaveGame", &["Player"]);
    s.w.u8(BinaryTypeTag::SystemClass as u8);
    s.string("PlayerData");

    s.tag(RecordTag::SystemClassWithMembersAndTypes)
        .class_info(2, "PlayerData", &["Stats"]);
    s.w.u8(BinaryTypeTag::SystemClass as u8);
    s.string("StatsData");

    s.tag(RecordTag::SystemClassWithMembersAndTypes)
        .class_info(3, "StatsData", &["XP"]);
    s.w.u8(BinaryTypeTag::Primitive as u8);
    s.w.u8(PrimitiveKind::Int32 as u8);
    s.w.i32(xp);
    s.finish()
}

/// A class whose only member references the class itself.
pub(crate) fn self_cycle() -> Vec<u8> {
    let mut s = Stream::new(1);
    s.tag(RecordTag::SystemClassWithMembersAndTypes)
        .class_info(1, "Node", &["Me"]);
    s.w.u8(BinaryTypeTag::SystemClass as u8);
    s.string("Node");
    s.reference(1);
    s.finish()
}

/// A class whose member references an id that is nowhere in the stream.
pub(crate) fn dangling_reference() -> Vec<u8> {
    let mut s = Stream::new(1);
    s.tag(RecordTag::SystemClassWithMembersAndTypes)
        .class_info(1, "D", &["R"]);
    s.w.u8(BinaryTypeTag::Object as u8);
    s.reference(404);
    s.finish()
}

/// Type-less class: member values arrive as tagged nested records.
pub(crate) fn untyped_class() -> Vec<u8> {
    let mut s = Stream::new(80);
    s.tag(RecordTag::SystemClassWithMembers)
        .class_info(80, "Legacy", &["a", "b"]);
    s.tag(RecordTag::MemberPrimitiveTyped);
    s.w.u8(PrimitiveKind::Int32 as u8);
    s.w.i32(5);
    s.tag(RecordTag::ObjectNull);
    s.finish()
}

/// Two string records claiming the same object id.
pub(crate) fn duplicate_string_ids() -> Vec<u8> {
    let mut s = Stream::new(7);
    s.object_string(7, "a");
    s.object_string(7, "b");
    s.finish()
}

/// A `ClassWithId` citing metadata that was never defined.
pub(crate) fn class_with_unknown_metadata() -> Vec<u8> {
    let mut s = Stream::new(5);
    s.tag(RecordTag::ClassWithId);
    s.w.i32(5);
    s.w.i32(404);
    s.finish()
}

/// Header and terminator only; whatever root id is asked for is absent.
pub(crate) fn header_only(root_id: i32) -> Vec<u8> {
    Stream::new(root_id).finish()
}
