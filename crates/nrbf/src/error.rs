//! Error taxonomy shared by the decoder, encoder, edit API, and path lookup.

use thiserror::Error;

/// Errors that can occur while decoding, encoding, or editing an NRBF stream.
#[derive(Debug, Error)]
pub enum NrbfError {
    #[error("stream does not start with a serialization header")]
    BadHeader,

    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("unknown record tag {0:#04x}")]
    UnknownRecordTag(u8),

    #[error("unknown primitive type tag {0}")]
    UnknownPrimitiveTag(u8),

    #[error("unknown binary type tag {0}")]
    UnknownBinaryTypeTag(u8),

    #[error("unknown array shape tag {0}")]
    UnknownArrayShapeTag(u8),

    #[error("variable-length integer does not fit in 31 bits")]
    VarIntOverflow,

    #[error("string payload is not valid UTF-8")]
    MalformedString,

    #[error("duplicate object id {0}")]
    DuplicateObjectId(i32),

    #[error("metadata id {0} does not refer to an earlier class record")]
    UnknownMetadataId(i32),

    #[error("record count exceeds the decode budget")]
    RecordBudgetExceeded,

    #[error("root object id {0} is not present in the stream")]
    RootNotFound(i32),

    #[error("reference to object id {0} cannot be emitted")]
    UnresolvableReference(i32),

    #[error("no type information for member {0}")]
    MissingTypeInfo(String),

    #[error("integer value does not fit the declared wire width")]
    EncodeIntegerOutOfRange,

    #[error("array element count does not match the declared length")]
    InconsistentArrayLength,

    #[error("cannot coerce {actual} into {expected}")]
    TypeMismatch { expected: String, actual: String },

    #[error("reference to unknown object id {0}")]
    DanglingReference(i32),

    #[error("not a valid GUID string")]
    InvalidGuidFormat,

    #[error("value at {0} cannot be edited")]
    NotEditable(String),

    #[error("path {0} does not resolve to a value")]
    PathNotFound(String),
}
