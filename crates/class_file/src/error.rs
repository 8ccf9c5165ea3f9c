use thiserror::Error;

use crate::tag::{ClassVersion, Tag};

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Expected {0:?}, found {1:?}")]
    UnexpectedConstantPoolEntry(Tag, Option<Tag>),
    #[error("Invalid cp info tag: {0}")]
    InvalidCpInfoTag(u8),
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("Truncated class file: {needed} bytes needed at offset {offset}, only {len} available")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },
    #[error("Utf8 ({preview}) too long: {length} bytes")]
    Utf8TooLong { preview: String, length: usize },
    #[error("Constant pool too large: {0} slots, at most 65535 allowed")]
    ConstantPoolOverflow(usize),
    #[error("Too many {what}: {count}, at most 65535 allowed")]
    CountOverflow { what: &'static str, count: u32 },
    #[error("{0} constants changed index while copying the constant pool")]
    PoolIndexesMoved(usize),
    #[error("{feature} require ClassFile V{required}, found {found}")]
    VersionGated {
        feature: &'static str,
        required: u16,
        found: ClassVersion,
    },
    #[error("{0}")]
    Validation(String),
    #[error("Malformed modified UTF-8 at byte {offset}")]
    MalformedUtf8 { offset: usize },
    #[error("Modified UTF-8 encodes an unpaired surrogate")]
    UnpairedSurrogate,
}

/// Shortens a long string to its first and last 8 characters for error messages.
pub(crate) fn preview(value: &str) -> String {
    let chars = value.chars().count();
    if chars <= 16 {
        return value.to_owned();
    }

    let head: String = value.chars().take(8).collect();
    let tail: String = value.chars().skip(chars - 8).collect();
    format!("{head}...{tail}")
}
