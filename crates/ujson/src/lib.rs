//! A recursive descent pull-model JSON reader and a streaming JSON writer.
//!
//! The two halves are independent and share only the UTF-8 codec in
//! [`utf`] and a common diagnostics convention:
//!
//! - [`Reader`] parses a document in place over a byte buffer, one value at
//!   a time, with the caller descending into nested objects and arrays
//!   explicitly. Working memory beyond the input buffer is O(depth).
//! - [`Writer`] serializes a sequence of start/value/finish calls into
//!   indented JSON streamed through any [`std::io::Write`] sink.
//!
//! Both are sticky on error: the first failure is recorded, every later
//! call becomes a no-op, and the error is checked once at the end of the
//! whole sequence.
//!
//! ```
//! use ujson::{Reader, Type, Val, Writer};
//!
//! let mut writer = Writer::new(Vec::new());
//!
//! writer.obj_start(None);
//! writer.int_add(Some("a"), 1);
//! writer.arr_start(Some("b"));
//! writer.bool_add(None, true);
//! writer.arr_finish();
//! writer.obj_finish();
//!
//! let json = writer.finish().unwrap();
//!
//! let mut reader = Reader::new(&json);
//! let mut val = Val::new();
//!
//! reader.obj_first(&mut val);
//! while val.is_valid() {
//!     match val.ty() {
//!         Type::Int => println!("{} = {}", val.id(), val.as_int()),
//!         Type::Arr => assert!(reader.arr_skip()),
//!         _ => unreachable!(),
//!     }
//!     reader.obj_next(&mut val);
//! }
//!
//! reader.finish().unwrap();
//! ```

pub mod utf;

mod attr;
mod error;
mod reader;
mod val;
mod writer;

pub use attr::{EMPTY, ObjAttr, ObjDesc, lookup};
pub use error::{Error, WriterError};
pub use reader::{Reader, ReaderState};
pub use val::{ID_MAX, Type, VAL_BUF_DEFAULT, Val};
pub use writer::{FileSink, Writer};

/// Default ceiling on array/object nesting depth for both the reader and
/// the writer.
pub const RECURSION_MAX: u32 = 128;
