use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WireError {
    #[error("Unexpected end of buffer at offset {offset}, {needed} more bytes needed")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
    },

    #[error("Invalid UTF-8 in string at offset {0}")]
    InvalidUtf8(usize),

    #[error("Invalid presence marker {0}")]
    InvalidPresenceMarker(u8),

    #[error("Invalid continuation marker {0}")]
    InvalidContinuationMarker(u8),

    #[error("Message \"{0}\" has no base message but a continuation follows")]
    UnexpectedContinuation(String),

    #[error("Length {0} does not fit in 32 bits")]
    LengthOverflow(usize),

    #[error("Missing required field \"{0}\"")]
    MissingField(String),

    #[error("Type mismatch for \"{name}\", expected {expected}")]
    TypeMismatch {
        name:     String,
        expected: String,
    },

    #[error("Unknown type \"{0}\"")]
    UnknownType(String),

    #[error("Messages are nested more than {0} levels deep")]
    NestingTooDeep(usize),

    #[error("Invalid value for enum \"{0}\"")]
    InvalidEnumValue(String),

    #[error("Invalid JSON: {0}")]
    Json(String),
}
