//! # nrbf
//!
//! Reader, editor, and writer for .NET BinaryFormatter (NRBF) streams,
//! the record-oriented binary serialization behind many game save
//! files.
//!
//! This library provides functionality to:
//! - Decode an NRBF byte buffer into a typed record graph
//! - Query values by `A.B[i].C`-style paths, following references
//! - Edit primitives, strings, and GUIDs in place
//! - Re-encode an unedited document to byte-identical output
//! - Diff two decoded documents field by field
//!
//! ## Example
//!
//! ```no_run
//! use std::fs;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = fs::read("player.sav")?;
//! let mut doc = nrbf::load(&bytes)?;
//!
//! if let Some(value) = doc.get("Player.Stats.XP") {
//!     println!("XP: {}", doc.value_text(&value));
//! }
//!
//! doc.set_primitive_str("Player.Stats.XP", "9999")?;
//! fs::write("player.sav", doc.save()?)?;
//! # Ok(())
//! # }
//! ```

pub mod decode;
pub mod diff;
pub mod document;
pub mod edit;
pub mod encode;
pub mod error;
pub mod guid;
pub mod path;
pub mod record;
mod wire;

#[cfg(test)]
mod fixtures;

// Re-export commonly used items
pub use decode::{is_nrbf, load, load_with, DecodeOptions, DEFAULT_RECORD_BUDGET};
pub use diff::{diff, ChangeKind, FieldChange};
pub use document::{Document, DocumentStats, LogSink, PathIter, StreamHeader};
pub use error::NrbfError;
pub use record::{
    AdditionalTypeInfo, ArrayShape, BinaryArrayRecord, BinaryTypeTag, ClassInfo, ClassRecord,
    ClassWireKind, LibraryRecord, MemberType, MemberTypeInfo, NrbfRecord, ObjectArrayRecord,
    ObjectStringRecord, Primitive, PrimitiveArrayRecord, PrimitiveKind, RecordId, RecordTag, Slot,
    StringArrayRecord, Value,
};
