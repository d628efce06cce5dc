//! A streaming JSON serializer.
//!
//! The writer emits indented JSON through any [`io::Write`] sink as the
//! caller brackets each nesting level with explicit start/finish calls.
//! Structural legality — matching start/finish pairs, the id rules per
//! container kind, the recursion ceiling — is enforced as a side effect of
//! every call rather than by a separate validation pass, with the same
//! sticky single-error convention as the reader: after the first failure
//! every call is a no-op and [`Writer::finish`] reports the error.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use crate::RECURSION_MAX;
use crate::error::WriterError;
use crate::reader::DiagFn;
use crate::utf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Arr,
    Obj,
}

/// Per nesting level record: the container kind and whether its first
/// entry is still pending (decides the leading comma).
#[derive(Debug, Clone, Copy)]
struct Level {
    kind: Kind,
    first: bool,
}

enum WState {
    Writing,
    Errored(WriterError),
}

/// The streaming JSON writer.
///
/// ```
/// use ujson::Writer;
///
/// let mut writer = Writer::new(Vec::new());
///
/// writer.obj_start(None);
/// writer.int_add(Some("answer"), 42);
/// writer.obj_finish();
///
/// let out = writer.finish().unwrap();
/// assert_eq!(out, b"{\n \"answer\": 42\n}\n");
/// ```
pub struct Writer<W: Write> {
    sink: W,
    levels: Vec<Level>,
    max_depth: u32,
    state: WState,
    diag: Option<DiagFn>,
}

impl<W: Write> Writer<W> {
    /// A writer over an arbitrary byte sink.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            levels: Vec::new(),
            max_depth: RECURSION_MAX,
            state: WState::Writing,
            diag: Some(Box::new(|line| eprintln!("{line}"))),
        }
    }

    /// Ceiling on array/object nesting, [`RECURSION_MAX`] by default.
    #[must_use]
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Replaces the diagnostic printer. The default prints to stderr.
    #[must_use]
    pub fn diag(mut self, diag: impl FnMut(&str) + 'static) -> Self {
        self.diag = Some(Box::new(diag));
        self
    }

    /// Discards diagnostics instead of printing them.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.diag = None;
        self
    }

    /// The error recorded by the first failing call, if any.
    #[must_use]
    pub fn err(&self) -> Option<&WriterError> {
        match &self.state {
            WState::Writing => None,
            WState::Errored(err) => Some(err),
        }
    }

    /// Current nesting depth.
    #[must_use]
    pub fn depth(&self) -> u32 {
        u32::try_from(self.levels.len()).unwrap_or(u32::MAX)
    }

    fn has_err(&self) -> bool {
        matches!(self.state, WState::Errored(_))
    }

    fn set_err(&mut self, err: WriterError) {
        if let WState::Writing = self.state {
            self.state = WState::Errored(err);
        }
    }

    /// Pushes raw bytes to the sink, recording a sink failure as the
    /// sticky error.
    fn out(&mut self, bytes: &[u8]) -> bool {
        match self.sink.write_all(bytes) {
            Ok(()) => true,
            Err(err) => {
                self.set_err(err.into());
                false
            }
        }
    }

    fn newline_indent(&mut self) -> bool {
        let mut line = String::with_capacity(self.levels.len() + 1);

        line.push('\n');

        for _ in 0..self.levels.len() {
            line.push(' ');
        }

        self.out(line.as_bytes())
    }

    /// Common prologue of every entry: sticky-error and container checks,
    /// the id rule for the current container kind, the separating comma,
    /// indentation, and the escaped id.
    fn entry_prologue(&mut self, id: Option<&str>) -> bool {
        if self.has_err() {
            return false;
        }

        let Some(level) = self.levels.last() else {
            self.set_err(WriterError::NoContainer);
            return false;
        };

        match (level.kind, id) {
            (Kind::Obj, None) => {
                self.set_err(WriterError::MissingId);
                return false;
            }
            (Kind::Arr, Some(_)) => {
                self.set_err(WriterError::UnexpectedId);
                return false;
            }
            _ => {}
        }

        // Check-and-consume of the first-entry bit; entries after the
        // first get a separating comma.
        let first = {
            let Some(level) = self.levels.last_mut() else {
                return false;
            };
            let first = level.first;
            level.first = false;
            first
        };

        if !first && !self.out(b",") {
            return false;
        }

        if !self.newline_indent() {
            return false;
        }

        if let Some(id) = id {
            if !self.str_raw(id) {
                return false;
            }

            return self.out(b": ");
        }

        true
    }

    /// Emits `s` quoted and escaped. Runs of plain bytes are copied in
    /// one batch; multi-byte sequences are stepped over with the codec
    /// and passed through verbatim, the output being UTF-8 already.
    fn str_raw(&mut self, s: &str) -> bool {
        if !self.out(b"\"") {
            return false;
        }

        let bytes = s.as_bytes();
        let mut run = 0;
        let mut i = 0;

        while i < bytes.len() {
            let esc: Option<&[u8]> = match bytes[i] {
                b'"' => Some(b"\\\""),
                b'\\' => Some(b"\\\\"),
                0x08 => Some(b"\\b"),
                0x0c => Some(b"\\f"),
                b'\n' => Some(b"\\n"),
                b'\r' => Some(b"\\r"),
                b'\t' => Some(b"\\t"),
                _ => None,
            };

            if let Some(esc) = esc {
                if run < i && !self.out(&bytes[run..i]) {
                    return false;
                }

                if !self.out(esc) {
                    return false;
                }

                i += 1;
                run = i;
            } else {
                i += utf::next_seq_len(bytes, i).unwrap_or(1).max(1);
            }
        }

        if run < bytes.len() && !self.out(&bytes[run..]) {
            return false;
        }

        self.out(b"\"")
    }

    fn container_start(&mut self, id: Option<&str>, kind: Kind) {
        if self.has_err() {
            return;
        }

        if self.depth() >= self.max_depth {
            self.set_err(WriterError::RecursionTooDeep);
            return;
        }

        if self.levels.is_empty() {
            // The root value is anonymous.
            if id.is_some() {
                self.set_err(WriterError::TopLevelId);
                return;
            }
        } else if !self.entry_prologue(id) {
            return;
        }

        let open: &[u8] = match kind {
            Kind::Obj => b"{",
            Kind::Arr => b"[",
        };

        if self.out(open) {
            self.levels.push(Level { kind, first: true });
        }
    }

    fn container_finish(&mut self, kind: Kind) {
        if self.has_err() {
            return;
        }

        let matches = self.levels.last().is_some_and(|level| level.kind == kind);

        if !matches {
            self.set_err(match kind {
                Kind::Obj => WriterError::NotInObj,
                Kind::Arr => WriterError::NotInArr,
            });
            return;
        }

        let Some(level) = self.levels.pop() else {
            return;
        };

        // Empty containers close right next to their opener.
        if !level.first && !self.newline_indent() {
            return;
        }

        let close: &[u8] = match kind {
            Kind::Obj => b"}",
            Kind::Arr => b"]",
        };

        self.out(close);
    }

    fn scalar(&mut self, id: Option<&str>, text: &str) {
        if self.entry_prologue(id) {
            self.out(text.as_bytes());
        }
    }

    /// Starts an object. The id must be given inside an object and must
    /// be absent inside an array or at the top level.
    pub fn obj_start(&mut self, id: Option<&str>) {
        self.container_start(id, Kind::Obj);
    }

    /// Closes the innermost container, which must be an object.
    pub fn obj_finish(&mut self) {
        self.container_finish(Kind::Obj);
    }

    /// Starts an array, same id rules as [`Writer::obj_start`].
    pub fn arr_start(&mut self, id: Option<&str>) {
        self.container_start(id, Kind::Arr);
    }

    /// Closes the innermost container, which must be an array.
    pub fn arr_finish(&mut self) {
        self.container_finish(Kind::Arr);
    }

    /// Adds a `null`.
    pub fn null_add(&mut self, id: Option<&str>) {
        self.scalar(id, "null");
    }

    /// Adds a boolean.
    pub fn bool_add(&mut self, id: Option<&str>, val: bool) {
        self.scalar(id, if val { "true" } else { "false" });
    }

    /// Adds an integer.
    pub fn int_add(&mut self, id: Option<&str>, val: i64) {
        self.scalar(id, &val.to_string());
    }

    /// Adds a floating point number.
    ///
    /// Exactly integral values within `f64`'s exact integer range print
    /// in integer form, everything else in exponent form; both
    /// re-materialize to the same value when parsed back. Non-finite
    /// values are an error, JSON cannot express them.
    pub fn float_add(&mut self, id: Option<&str>, val: f64) {
        if !val.is_finite() {
            if !self.has_err() {
                self.set_err(WriterError::NonFiniteNumber);
            }
            return;
        }

        #[allow(clippy::cast_possible_truncation)]
        let text = if val == val.trunc() && val.abs() < 9_007_199_254_740_992.0 {
            format!("{}", val as i64)
        } else {
            format!("{val:e}")
        };

        self.scalar(id, &text);
    }

    /// Adds a string, escaped as needed.
    pub fn str_add(&mut self, id: Option<&str>, val: &str) {
        if self.entry_prologue(id) {
            self.str_raw(val);
        }
    }

    /// Terminal call: validates that every container was finished, appends
    /// the trailing newline and hands the sink back.
    ///
    /// # Errors
    ///
    /// The sticky error recorded by the first failing call, or
    /// [`WriterError::Unfinished`] when a container is still open. The
    /// error is also handed to the diagnostic printer as raw text.
    pub fn finish(self) -> Result<W, WriterError> {
        let Writer {
            mut sink,
            levels,
            state,
            mut diag,
            ..
        } = self;

        let mut fail = |err: WriterError, diag: &mut Option<DiagFn>| {
            if let Some(diag) = diag.as_mut() {
                diag(&err.to_string());
            }
            Err(err)
        };

        match state {
            WState::Errored(err) => return fail(err, &mut diag),
            WState::Writing if !levels.is_empty() => {
                return fail(WriterError::Unfinished, &mut diag);
            }
            WState::Writing => {}
        }

        match sink.write_all(b"\n") {
            Ok(()) => Ok(sink),
            Err(err) => fail(err.into(), &mut diag),
        }
    }
}

impl Writer<FileSink> {
    /// Opens a writer that creates or truncates the file at `path`.
    ///
    /// # Errors
    ///
    /// Any I/O failure while creating the file.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Writer::new(FileSink::create(path)?))
    }
}

/// Size of the [`FileSink`] staging buffer.
const FILE_BUF_SIZE: usize = 1024;

/// A buffered file sink.
///
/// Small writes are staged in a fixed-size buffer; writes of a quarter of
/// the buffer or more flush the staged bytes and go straight to the file.
pub struct FileSink {
    file: File,
    buf: Vec<u8>,
}

impl FileSink {
    /// Creates or truncates the file at `path`, mode `0664`.
    ///
    /// # Errors
    ///
    /// Any I/O failure while creating the file.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o664)
            .open(path)?;

        Ok(Self {
            file,
            buf: Vec::with_capacity(FILE_BUF_SIZE),
        })
    }

    fn flush_buf(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.file.write_all(&self.buf)?;
            self.buf.clear();
        }

        Ok(())
    }

    /// Flushes staged bytes and closes the file, reporting the first
    /// failure encountered.
    ///
    /// # Errors
    ///
    /// The first I/O failure among flush and close.
    pub fn close(mut self) -> io::Result<()> {
        self.flush_buf()?;
        self.file.sync_all()
    }
}

impl Write for FileSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.len() >= FILE_BUF_SIZE / 4 {
            self.flush_buf()?;
            self.file.write_all(data)?;
        } else {
            if self.buf.len() + data.len() > FILE_BUF_SIZE {
                self.flush_buf()?;
            }

            self.buf.extend_from_slice(data);
        }

        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buf()?;
        self.file.flush()
    }
}
