//! Error taxonomy for the reader and the writer.
//!
//! Errors are a closed set of kinds carrying structured data; the formatted
//! message is a presentation concern handled by the `Display` impls. The
//! reader additionally distinguishes *warnings*: recoverable schema
//! mismatches ([`Error::WrongType`], [`Error::UnexpectedKey`],
//! [`Error::TrailingGarbage`]) that are forwarded to the diagnostic printer
//! and only become hard errors in strict mode.

use thiserror::Error;

use crate::val::Type;

/// A reader-side parse error or schema warning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Unexpected end")]
    UnexpectedEnd,
    #[error("Expected '{0}'")]
    Expected(char),
    #[error("Expected '{0}'")]
    ExpectedWord(&'static str),
    #[error("Expected object, array, number or string")]
    ExpectedValue,
    #[error("JSON can start only with array or object")]
    BadStart,
    #[error("Expected ID string")]
    ExpectedId,
    #[error("Expected ':' after ID string")]
    ExpectedColon,
    #[error("Unterminated string")]
    UntermString,
    #[error("Unterminated ID string")]
    UntermId,
    #[error("Invalid string character 0x{0:02x}")]
    BadStringChar(u8),
    #[error("Invalid escape \\{0}")]
    BadEscape(char),
    #[error("Expected four hexadecimal digits")]
    BadUnicodeEscape,
    #[error("Escape is not a unicode scalar value \\u{0:04x}")]
    BadCodePoint(u32),
    #[error("Invalid UTF-8 in string")]
    BadUtf8,
    #[error("Expected digit(s)")]
    ExpectedDigits,
    #[error("Leading zero in number!")]
    LeadingZero,
    #[error("Invalid number")]
    BadNumber,
    #[error("Integer overflow")]
    IntOverflow,
    #[error("Recursion too deep")]
    RecursionTooDeep,
    #[error("String buffer too short!")]
    StrBufTooShort,
    #[error("ID string too long")]
    IdTooLong,
    /// A filtered attribute parsed with a type other than the declared one.
    #[error("Wrong '{key}' type expected {expected}")]
    WrongType { key: String, expected: Type },
    /// A key that is in neither the attribute list nor the ignore list.
    #[error("Unexpected key '{0}'")]
    UnexpectedKey(String),
    #[error("Garbage after JSON string!")]
    TrailingGarbage,
}

/// A writer-side protocol violation or sink failure.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Recursion too deep")]
    RecursionTooDeep,
    /// A value was added before any object or array was started.
    #[error("Value without object or array")]
    NoContainer,
    #[error("Top level value can't have id")]
    TopLevelId,
    #[error("Object value must have id")]
    MissingId,
    #[error("Array value can't have id")]
    UnexpectedId,
    #[error("Not inside an object")]
    NotInObj,
    #[error("Not inside an array")]
    NotInArr,
    /// `finish` was called with an object or array still open.
    #[error("Unfinished object or array")]
    Unfinished,
    /// JSON has no representation for NaN or the infinities.
    #[error("Non-finite number")]
    NonFiniteNumber,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
