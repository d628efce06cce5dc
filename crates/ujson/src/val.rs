//! The value type tag and the reusable result slot filled by the reader.

use core::fmt;

/// Default ceiling for a value's string buffer, in bytes.
pub const VAL_BUF_DEFAULT: usize = 4096;

/// Ceiling for an object key, in bytes.
pub const ID_MAX: usize = 64;

/// Type of a parsed JSON value.
///
/// [`Type::Void`] means "no value": the end of a collection, or an error
/// that has already been recorded on the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Type {
    #[default]
    Void,
    Null,
    Bool,
    Int,
    Float,
    Str,
    Arr,
    Obj,
}

impl Type {
    /// Human readable type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Type::Void => "void",
            Type::Null => "null",
            Type::Bool => "boolean",
            Type::Int => "integer",
            Type::Float => "float",
            Type::Str => "string",
            Type::Arr => "array",
            Type::Obj => "object",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed key/value pair.
///
/// The slot is caller-allocated and reused across every element of an
/// array/object traversal; each parse call overwrites it in place, so a
/// whole document can be walked without per-element allocation. String
/// payloads are copied into the internal buffer, which grows on demand up
/// to the configured byte ceiling; exceeding the ceiling is the hard parse
/// error [`Error::StrBufTooShort`], never silent truncation.
///
/// [`Error::StrBufTooShort`]: crate::Error::StrBufTooShort
#[derive(Debug, Clone)]
pub struct Val {
    pub(crate) ty: Type,
    pub(crate) idx: Option<usize>,
    pub(crate) val_bool: bool,
    pub(crate) val_int: i64,
    pub(crate) val_float: f64,
    pub(crate) buf: String,
    pub(crate) buf_limit: usize,
    /// Cleared for the throwaway slots used while skipping, where string
    /// payloads are validated but not stored.
    pub(crate) store: bool,
    pub(crate) id: String,
}

impl Val {
    /// A fresh slot with the default string ceiling of
    /// [`VAL_BUF_DEFAULT`] bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(VAL_BUF_DEFAULT)
    }

    /// A fresh slot whose string values may occupy at most `limit` bytes.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            ty: Type::Void,
            idx: None,
            val_bool: false,
            val_int: 0,
            val_float: 0.0,
            buf: String::new(),
            buf_limit: limit,
            store: true,
            id: String::new(),
        }
    }

    /// A slot that discards string payloads, for skip traversals.
    pub(crate) fn sink() -> Self {
        Self {
            store: false,
            ..Self::with_limit(0)
        }
    }

    /// Type of the last parsed value.
    #[must_use]
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Whether the slot holds a value, i.e. the last parse call produced
    /// one. This is the loop condition for object/array traversal:
    ///
    /// ```
    /// use ujson::{Reader, Val};
    ///
    /// let mut reader = Reader::new(b"{\"a\": 1}");
    /// let mut val = Val::new();
    ///
    /// reader.obj_first(&mut val);
    /// while val.is_valid() {
    ///     println!("{} = {}", val.id(), val.ty());
    ///     reader.obj_next(&mut val);
    /// }
    /// ```
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.ty != Type::Void
    }

    /// The object key of the value, empty for array elements and the
    /// top-level value.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Index into the attribute list of the last matched key.
    ///
    /// Set by [`Reader::obj_first_filter`] and [`Reader::obj_next_filter`].
    ///
    /// [`Reader::obj_first_filter`]: crate::Reader::obj_first_filter
    /// [`Reader::obj_next_filter`]: crate::Reader::obj_next_filter
    #[must_use]
    pub fn idx(&self) -> Option<usize> {
        self.idx
    }

    /// Boolean payload, meaningful when [`Val::ty`] is [`Type::Bool`].
    #[must_use]
    pub fn as_bool(&self) -> bool {
        self.val_bool
    }

    /// Integer payload, meaningful when [`Val::ty`] is [`Type::Int`].
    #[must_use]
    pub fn as_int(&self) -> i64 {
        self.val_int
    }

    /// Floating point payload.
    ///
    /// Integer values are a subset of floating point values, so this is
    /// set for both [`Type::Float`] and [`Type::Int`].
    #[must_use]
    pub fn as_float(&self) -> f64 {
        self.val_float
    }

    /// String payload, meaningful when [`Val::ty`] is [`Type::Str`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buf
    }
}

impl Default for Val {
    fn default() -> Self {
        Self::new()
    }
}
