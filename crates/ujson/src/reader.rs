//! A recursive descent pull parser over an in-memory buffer.
//!
//! The reader exposes a cursor-based "parse next value" API instead of
//! building a tree: the caller descends into nested objects and arrays
//! explicitly, so arbitrarily deep and large documents are processed with
//! working memory proportional to the nesting depth only.
//!
//! All parsing calls are sticky on error. Once a call records an error,
//! every subsequent call returns immediately with the result slot forced to
//! [`Type::Void`] and the cursor untouched. This is designed so that a long
//! sequence of values can be parsed without checking each call and the
//! error checked once at the end of the sequence, via [`Reader::err`] or
//! [`Reader::finish`].

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

use bstr::ByteSlice;

use crate::RECURSION_MAX;
use crate::attr::ObjDesc;
use crate::error::Error;
use crate::utf;
use crate::val::{ID_MAX, Type, Val};

/// Lines of context shown by the diagnostic snippet.
const ERR_LINES: usize = 10;

/// A line-oriented sink for error and warning diagnostics.
pub(crate) type DiagFn = Box<dyn FnMut(&str)>;

enum State {
    Parsing,
    Errored(Error),
}

/// A snapshot of the parse position at the start of the most recently
/// entered object or array, as returned by [`Reader::state_save`].
#[derive(Debug, Clone, Copy)]
pub struct ReaderState {
    off: usize,
    depth: u32,
}

/// The JSON pull parser.
///
/// Construct it over a caller-owned buffer with [`Reader::new`] or over the
/// contents of a file with [`Reader::load`]. A reader mutates only itself;
/// parsing from several threads means one reader per thread.
pub struct Reader<'a> {
    json: Cow<'a, [u8]>,
    off: usize,
    sub_off: usize,
    depth: u32,
    max_depth: u32,
    strict: bool,
    state: State,
    diag: Option<DiagFn>,
}

impl<'a> Reader<'a> {
    /// A reader over a caller-owned byte buffer.
    #[must_use]
    pub fn new(json: &'a [u8]) -> Self {
        Self::from_cow(Cow::Borrowed(json))
    }

    fn from_cow(json: Cow<'a, [u8]>) -> Reader<'a> {
        Reader {
            json,
            off: 0,
            sub_off: 0,
            depth: 0,
            max_depth: RECURSION_MAX,
            strict: false,
            state: State::Parsing,
            diag: Some(Box::new(|line| eprintln!("{line}"))),
        }
    }

    /// Loads a whole file into a fresh reader.
    ///
    /// # Errors
    ///
    /// Any I/O failure while opening or reading the file.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Reader<'static>> {
        Ok(Reader::from_cow(Cow::Owned(fs::read(path)?)))
    }

    /// Treat schema warnings as hard errors.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
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

    /// The error recorded by the first failing parse call, if any.
    #[must_use]
    pub fn err(&self) -> Option<&Error> {
        match &self.state {
            State::Parsing => None,
            State::Errored(err) => Some(err),
        }
    }

    /// Current byte offset of the cursor.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.off
    }

    /// Current nesting depth.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Whether the whole buffer has been consumed.
    #[must_use]
    pub fn consumed(&self) -> bool {
        self.off >= self.json.len()
    }

    /// Rewinds the reader to the start of the buffer, clearing any error.
    pub fn reset(&mut self) {
        self.off = 0;
        self.sub_off = 0;
        self.depth = 0;
        self.state = State::Parsing;
    }

    /// State at the start of the currently parsed object or array, for
    /// re-parsing a sub-tree with [`Reader::state_load`] (e.g. one pass to
    /// find keys, a second to extract values).
    #[must_use]
    pub fn state_save(&self) -> ReaderState {
        ReaderState {
            off: self.sub_off,
            depth: self.depth,
        }
    }

    /// Returns the reader to a saved state. A no-op once an error has been
    /// recorded.
    pub fn state_load(&mut self, state: ReaderState) {
        if self.has_err() {
            return;
        }

        self.off = state.off;
        self.sub_off = state.off;
        self.depth = state.depth;
    }

    fn has_err(&self) -> bool {
        matches!(self.state, State::Errored(_))
    }

    /// Records `err` unless an earlier error is already pending.
    fn set_err(&mut self, err: Error) {
        if let State::Parsing = self.state {
            self.state = State::Errored(err);
        }
    }

    /// Reports a schema warning: escalated to the sticky error in strict
    /// mode, otherwise printed with source context and parsing continues.
    fn warn(&mut self, warning: Error) {
        if self.strict {
            self.set_err(warning);
            return;
        }

        if self.diag.is_some() {
            self.print_snippet("Warning");
            self.diag_lines(&[warning.to_string()]);
        }
    }

    fn diag_lines(&mut self, lines: &[String]) {
        if let Some(diag) = self.diag.as_mut() {
            for line in lines {
                diag(line);
            }
        }
    }

    // --- low level cursor primitives ---

    fn buf_empty(&self) -> bool {
        self.off >= self.json.len()
    }

    /// Skips insignificant whitespace, returns true on end of buffer.
    fn eatws(&mut self) -> bool {
        while let Some(&b) = self.json.get(self.off) {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => self.off += 1,
                _ => break,
            }
        }

        self.buf_empty()
    }

    fn getb(&mut self) -> u8 {
        match self.json.get(self.off) {
            Some(&b) => {
                self.off += 1;
                b
            }
            None => 0,
        }
    }

    fn peekb(&self) -> u8 {
        self.peekb_off(0)
    }

    fn peekb_off(&self, off: usize) -> u8 {
        self.json.get(self.off + off).copied().unwrap_or(0)
    }

    fn eatb(&mut self, ch: u8) -> bool {
        if self.peekb() != ch {
            return false;
        }

        self.getb();
        true
    }

    fn eatb2(&mut self, ch1: u8, ch2: u8) -> bool {
        if self.peekb() != ch1 && self.peekb() != ch2 {
            return false;
        }

        self.getb();
        true
    }

    fn eatstr(&mut self, word: &'static str) -> bool {
        for &b in word.as_bytes() {
            if !self.eatb(b) {
                return false;
            }
        }

        true
    }

    // --- scalar parsing ---

    /// Four hex digits of a `\uXXXX` escape.
    fn parse_ucode_cp(&mut self) -> Option<u32> {
        let mut cp = 0;

        for _ in 0..4 {
            let Some(v) = (self.getb() as char).to_digit(16) else {
                self.set_err(Error::BadUnicodeEscape);
                return None;
            };

            cp = cp * 16 + v;
        }

        Some(cp)
    }

    fn parse_ucode_esc(&mut self, out: Option<&mut String>, limit: usize) -> bool {
        let Some(cp) = self.parse_ucode_cp() else {
            return false;
        };

        let Some(out) = out else {
            return true;
        };

        if out.len() + utf::encoded_len(cp) > limit {
            self.set_err(Error::StrBufTooShort);
            return false;
        }

        // The output is a `String`, so the escape must denote a scalar
        // value; lone surrogate halves are rejected here.
        let Some(ch) = char::from_u32(cp) else {
            self.set_err(Error::BadCodePoint(cp));
            return false;
        };

        out.push(ch);
        true
    }

    /// Copies a string value into `out` while resolving escapes. Passing
    /// `None` parses and validates the string without storing it (used when
    /// skipping), in which case no buffer limit applies.
    fn copy_str(&mut self, mut out: Option<&mut String>, limit: usize) -> bool {
        if let Some(out) = out.as_mut() {
            out.clear();
        }

        self.eatb(b'"');

        let mut esc = false;

        loop {
            if self.buf_empty() {
                self.set_err(Error::UntermString);
                return false;
            }

            if !esc && self.eatb(b'"') {
                return true;
            }

            let b = self.getb();

            if b < 0x20 {
                if b == 0 {
                    self.set_err(Error::UntermString);
                } else {
                    self.set_err(Error::BadStringChar(b));
                }
                return false;
            }

            if !esc && b == b'\\' {
                esc = true;
                continue;
            }

            if esc {
                esc = false;

                let unescaped = match b {
                    b'"' | b'\\' | b'/' => b,
                    b'b' => 0x08,
                    b'f' => 0x0c,
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    b'u' => {
                        let dst = out.as_mut().map(|s| &mut **s);
                        if !self.parse_ucode_esc(dst, limit) {
                            return false;
                        }
                        continue;
                    }
                    _ => {
                        self.set_err(Error::BadEscape(b as char));
                        return false;
                    }
                };

                if let Some(out) = out.as_mut() {
                    if out.len() + 1 > limit {
                        self.set_err(Error::StrBufTooShort);
                        return false;
                    }
                    out.push(unescaped as char);
                }

                continue;
            }

            if b < 0x80 {
                if let Some(out) = out.as_mut() {
                    if out.len() + 1 > limit {
                        self.set_err(Error::StrBufTooShort);
                        return false;
                    }
                    out.push(b as char);
                }
                continue;
            }

            // Raw multi-byte sequence: step over it whole and, when
            // storing, insist on valid UTF-8.
            let start = self.off - 1;

            let len = match utf::lead_len(b) {
                Some(len) if start + len <= self.json.len() => len,
                _ => {
                    self.set_err(Error::BadUtf8);
                    return false;
                }
            };

            let mut seq = [0u8; 4];
            seq[..len].copy_from_slice(&self.json[start..start + len]);
            self.off = start + len;

            if let Some(out) = out.as_mut() {
                let Ok(s) = core::str::from_utf8(&seq[..len]) else {
                    self.set_err(Error::BadUtf8);
                    return false;
                };

                if out.len() + len > limit {
                    self.set_err(Error::StrBufTooShort);
                    return false;
                }

                out.push_str(s);
            }
        }
    }

    /// Parses the `"key":` prefix of an object member into `id`.
    fn copy_id_str(&mut self, id: &mut String) -> bool {
        id.clear();

        if self.eatws() || !self.eatb(b'"') {
            self.set_err(Error::ExpectedId);
            return false;
        }

        let start = self.off;

        loop {
            if self.buf_empty() {
                self.set_err(Error::UntermId);
                return false;
            }

            if self.eatb(b'"') {
                break;
            }

            if self.off - start >= ID_MAX - 1 {
                self.set_err(Error::IdTooLong);
                return false;
            }

            self.off += 1;
        }

        let ok = match core::str::from_utf8(&self.json[start..self.off - 1]) {
            Ok(s) => {
                id.push_str(s);
                true
            }
            Err(_) => false,
        };

        if !ok {
            self.set_err(Error::BadUtf8);
            return false;
        }

        if self.eatws() || !self.eatb(b':') {
            self.set_err(Error::ExpectedColon);
            return false;
        }

        true
    }

    fn get_int(&mut self, res: &mut Val) -> bool {
        let mut val: i64 = 0;
        let mut neg = false;

        if self.eatb(b'-') {
            neg = true;

            if !self.peekb().is_ascii_digit() {
                self.set_err(Error::ExpectedDigits);
                return false;
            }
        }

        if self.peekb() == b'0' && self.peekb_off(1).is_ascii_digit() {
            self.set_err(Error::LeadingZero);
            return false;
        }

        while self.peekb().is_ascii_digit() {
            let digit = i64::from(self.getb() - b'0');

            match val.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                Some(v) => val = v,
                None => {
                    self.set_err(Error::IntOverflow);
                    return false;
                }
            }
        }

        if neg {
            val = -val;
        }

        res.val_int = val;
        #[allow(clippy::cast_precision_loss)]
        {
            res.val_float = val as f64;
        }

        true
    }

    fn eat_digits(&mut self) -> bool {
        if !self.peekb().is_ascii_digit() {
            self.set_err(Error::ExpectedDigits);
            return false;
        }

        while self.peekb().is_ascii_digit() {
            self.off += 1;
        }

        true
    }

    fn get_float(&mut self, res: &mut Val) -> bool {
        let start = self.off;

        self.eatb(b'-');

        if self.peekb() == b'0' && self.peekb_off(1).is_ascii_digit() {
            self.set_err(Error::LeadingZero);
            return false;
        }

        if !self.eat_digits() {
            return false;
        }

        let mut exponent = false;

        match self.getb() {
            b'.' => {
                if !self.eat_digits() {
                    return false;
                }
                exponent = self.eatb2(b'e', b'E');
            }
            b'e' | b'E' => exponent = true,
            _ => {}
        }

        if exponent {
            self.eatb2(b'+', b'-');

            if !self.eat_digits() {
                return false;
            }
        }

        // Re-materialize from the exact consumed substring so that
        // rounding and exponent semantics are the platform parser's.
        let parsed = core::str::from_utf8(&self.json[start..self.off])
            .ok()
            .and_then(|s| s.parse::<f64>().ok());

        match parsed {
            Some(v) => {
                res.val_float = v;
                true
            }
            None => {
                self.set_err(Error::BadNumber);
                false
            }
        }
    }

    fn get_bool(&mut self, res: &mut Val) -> bool {
        let word = if self.peekb() == b'f' { "false" } else { "true" };

        if !self.eatstr(word) {
            self.set_err(Error::ExpectedWord(word));
            return false;
        }

        res.val_bool = word == "true";
        true
    }

    fn get_null(&mut self) -> bool {
        if !self.eatstr("null") {
            self.set_err(Error::ExpectedWord("null"));
            return false;
        }

        true
    }

    /// Look-ahead classification of a number: an integer-looking run is
    /// `Int` when the next boundary (end of buffer or comma) comes before
    /// any `.`, `e` or `E`.
    fn next_num_type(&self) -> Type {
        let mut off = 0;

        loop {
            match self.peekb_off(off) {
                0 | b',' => return Type::Int,
                b'.' | b'e' | b'E' => return Type::Float,
                _ => {}
            }

            off += 1;
        }
    }

    /// Type of the next value in the buffer.
    pub fn next_type(&mut self) -> Type {
        if self.eatws() {
            self.set_err(Error::UnexpectedEnd);
            return Type::Void;
        }

        match self.peekb() {
            b'{' => Type::Obj,
            b'[' => Type::Arr,
            b'"' => Type::Str,
            b'-' | b'0'..=b'9' => self.next_num_type(),
            b'f' | b't' => Type::Bool,
            b'n' => Type::Null,
            _ => {
                self.set_err(Error::ExpectedValue);
                Type::Void
            }
        }
    }

    /// Classifies the top-level value, which must be an object or array.
    ///
    /// Returns [`Type::Obj`] or [`Type::Arr`] on success, [`Type::Void`]
    /// on failure.
    pub fn start(&mut self) -> Type {
        let ty = self.next_type();

        match ty {
            Type::Arr | Type::Obj | Type::Void => ty,
            _ => {
                self.set_err(Error::BadStart);
                Type::Void
            }
        }
    }

    /// Parses one value into `res`. Returns false at the end of input or
    /// on error with `res` forced to void; objects and arrays are *not*
    /// descended into, only their start is recorded.
    fn get_value(&mut self, res: &mut Val) -> bool {
        res.ty = self.next_type();

        let ok = match res.ty {
            Type::Str => {
                let limit = res.buf_limit;
                let out = if res.store { Some(&mut res.buf) } else { None };

                if self.copy_str(out, limit) {
                    return true;
                }
                false
            }
            Type::Int => self.get_int(res),
            Type::Float => self.get_float(res),
            Type::Bool => self.get_bool(res),
            Type::Null => self.get_null(),
            Type::Void => false,
            Type::Arr | Type::Obj => {
                self.sub_off = self.off;
                return true;
            }
        };

        if !ok {
            res.ty = Type::Void;
            return false;
        }

        true
    }

    /// Mandatory `,` between collection elements.
    fn pre_next(&mut self, res: &mut Val) -> bool {
        if !self.eatb(b',') {
            self.set_err(Error::Expected(','));
            res.ty = Type::Void;
            return true;
        }

        if self.eatws() {
            self.set_err(Error::UnexpectedEnd);
            res.ty = Type::Void;
            return true;
        }

        false
    }

    /// Detects the closing bracket of a collection. On a close, trailing
    /// whitespace and one NUL terminator are consumed so that buffers with
    /// a C-style terminator still count as fully consumed.
    fn check_end(&mut self, res: &mut Val, end: u8) -> bool {
        if self.eatws() {
            self.set_err(Error::UnexpectedEnd);
            res.ty = Type::Void;
            return true;
        }

        if self.eatb(end) {
            res.ty = Type::Void;
            self.eatws();
            self.eatb(0);
            self.depth = self.depth.saturating_sub(1);
            return true;
        }

        false
    }

    /// Consumes the opening bracket of a collection and accounts for the
    /// nesting level.
    fn any_first(&mut self, open: u8) -> bool {
        if self.eatws() {
            self.set_err(Error::UnexpectedEnd);
            return true;
        }

        if !self.eatb(open) {
            self.set_err(Error::Expected(open as char));
            return true;
        }

        self.depth += 1;

        if self.depth > self.max_depth {
            self.set_err(Error::RecursionTooDeep);
            return true;
        }

        false
    }

    fn check_err(&mut self, res: &mut Val) -> bool {
        if self.has_err() {
            res.ty = Type::Void;
            return true;
        }

        false
    }

    fn obj_pre_next(&mut self, res: &mut Val) -> bool {
        if self.check_err(res) {
            return true;
        }

        if self.check_end(res, b'}') {
            return true;
        }

        self.pre_next(res)
    }

    fn obj_next_inner(&mut self, res: &mut Val) -> bool {
        if !self.copy_id_str(&mut res.id) {
            return false;
        }

        self.get_value(res)
    }

    /// Recurses into a nested collection while skipping.
    fn skip_nested(&mut self, ty: Type) -> bool {
        match ty {
            Type::Obj => self.obj_skip(),
            Type::Arr => self.arr_skip(),
            _ => true,
        }
    }

    /// Parses and discards one object member value, descending into nested
    /// collections.
    fn skip_obj_val(&mut self) -> bool {
        let mut dummy = Val::sink();

        if !self.get_value(&mut dummy) {
            return false;
        }

        self.skip_nested(dummy.ty)
    }

    /// Starts parsing an object, producing its first member in `res`.
    ///
    /// Returns true while a value was produced; false at the end of the
    /// object (or on error, distinguished by [`Reader::err`]).
    pub fn obj_first(&mut self, res: &mut Val) -> bool {
        if self.check_err(res) {
            return false;
        }

        res.ty = Type::Void;

        if self.any_first(b'{') {
            return false;
        }

        if self.check_end(res, b'}') {
            return false;
        }

        self.obj_next_inner(res)
    }

    /// Parses the next object member into `res`.
    ///
    /// When the previous member was an object or array it has to be parsed
    /// or skipped before this is called again.
    pub fn obj_next(&mut self, res: &mut Val) -> bool {
        if self.check_err(res) {
            return false;
        }

        if self.obj_pre_next(res) {
            return false;
        }

        self.obj_next_inner(res)
    }

    fn obj_next_filtered(
        &mut self,
        res: &mut Val,
        desc: &ObjDesc<'_>,
        ignore: Option<&ObjDesc<'_>>,
    ) -> bool {
        loop {
            if !self.copy_id_str(&mut res.id) {
                return false;
            }

            res.idx = desc.lookup(&res.id);

            if let Some(idx) = res.idx {
                if !self.get_value(res) {
                    return false;
                }

                let attr = desc.attrs[idx];

                if attr.ty == Type::Void || attr.ty == res.ty {
                    return true;
                }

                // Integers are a subset of floats.
                if attr.ty == Type::Float && res.ty == Type::Int {
                    return true;
                }

                self.warn(Error::WrongType {
                    key: attr.key.to_string(),
                    expected: attr.ty,
                });
            } else {
                if !self.skip_obj_val() {
                    return false;
                }

                if let Some(ignore) = ignore {
                    if ignore.lookup(&res.id).is_none() {
                        let key = res.id.clone();
                        self.warn(Error::UnexpectedKey(key));
                    }
                }
            }

            if self.obj_pre_next(res) {
                return false;
            }
        }
    }

    /// Starts parsing an object against an attribute list.
    ///
    /// Members whose key is found in `desc` are produced with
    /// [`Val::idx`] set to the matching attribute; their parsed type must
    /// agree with the declared one or a warning is issued and the member
    /// dropped. Unknown keys are skipped: silently when `ignore` is
    /// `None`, with a warning when absent from the `ignore` list too
    /// (pass [`EMPTY`] to warn about every unknown key).
    ///
    /// [`EMPTY`]: crate::EMPTY
    pub fn obj_first_filter(
        &mut self,
        res: &mut Val,
        desc: &ObjDesc<'_>,
        ignore: Option<&ObjDesc<'_>>,
    ) -> bool {
        if self.check_err(res) {
            return false;
        }

        res.ty = Type::Void;

        if self.any_first(b'{') {
            return false;
        }

        if self.check_end(res, b'}') {
            return false;
        }

        self.obj_next_filtered(res, desc, ignore)
    }

    /// Parses the next object member against an attribute list, see
    /// [`Reader::obj_first_filter`].
    pub fn obj_next_filter(
        &mut self,
        res: &mut Val,
        desc: &ObjDesc<'_>,
        ignore: Option<&ObjDesc<'_>>,
    ) -> bool {
        if self.check_err(res) {
            return false;
        }

        if self.obj_pre_next(res) {
            return false;
        }

        self.obj_next_filtered(res, desc, ignore)
    }

    /// Starts parsing an array, producing its first element in `res`.
    pub fn arr_first(&mut self, res: &mut Val) -> bool {
        if self.check_err(res) {
            return false;
        }

        res.ty = Type::Void;

        if self.any_first(b'[') {
            return false;
        }

        if self.check_end(res, b']') {
            return false;
        }

        self.get_value(res)
    }

    /// Parses the next array element into `res`.
    pub fn arr_next(&mut self, res: &mut Val) -> bool {
        if self.check_err(res) {
            return false;
        }

        if self.check_end(res, b']') {
            return false;
        }

        if self.pre_next(res) {
            return false;
        }

        self.get_value(res)
    }

    /// Walks over a whole object without producing values, advancing the
    /// cursor past its closing bracket.
    pub fn obj_skip(&mut self) -> bool {
        let mut res = Val::sink();

        self.obj_first(&mut res);

        while res.is_valid() {
            if !self.skip_nested(res.ty) {
                return false;
            }

            self.obj_next(&mut res);
        }

        !self.has_err()
    }

    /// Walks over a whole array without producing values, advancing the
    /// cursor past its closing bracket.
    pub fn arr_skip(&mut self) -> bool {
        let mut res = Val::sink();

        self.arr_first(&mut res);

        while res.is_valid() {
            if !self.skip_nested(res.ty) {
                return false;
            }

            self.arr_next(&mut res);
        }

        !self.has_err()
    }

    // --- diagnostics ---

    /// Prints the pending error through the diagnostic printer, with a
    /// multi-line source snippet ending at the current offset and a caret
    /// pointing at the exact column.
    pub fn err_print(&mut self) {
        if self.diag.is_none() {
            return;
        }

        let Some(err) = self.err().cloned() else {
            return;
        };

        self.print_snippet("Parse error");
        self.diag_lines(&[err.to_string()]);
    }

    fn print_snippet(&mut self, kind: &str) {
        let mut starts = [0usize; ERR_LINES];
        let mut cur_line = 0usize;
        let mut cur_off = 0usize;
        let mut last_off = self.off;

        loop {
            starts[cur_line % ERR_LINES] = cur_off;
            cur_line += 1;

            while cur_off < self.json.len() && self.json[cur_off] != b'\n' {
                cur_off += 1;
            }

            if cur_off >= self.off {
                break;
            }

            cur_off += 1;
            last_off = self.off - cur_off;
        }

        let mut out = Vec::with_capacity(ERR_LINES + 3);

        out.push(format!("{kind} at line {cur_line:03}"));
        out.push(String::new());

        let shown = ERR_LINES.min(cur_line);
        let mut caret_line = 0;

        for i in (1..=shown).rev() {
            let idx = (cur_line - i) % ERR_LINES;
            let start = starts[idx];
            let end = self.json[start..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(self.json.len(), |n| start + n);

            out.push(format!(
                "{:03}: {}",
                cur_line - i + 1,
                self.json[start..end].as_bstr()
            ));

            caret_line = idx;
        }

        // Caret under the failing column; tabs are preserved so the
        // caret stays aligned with tab-indented input.
        let start = starts[caret_line];
        let mut caret = String::with_capacity(last_off + 6);
        caret.push_str("     ");

        for i in 0..last_off {
            let b = self.json.get(start + i).copied().unwrap_or(b' ');
            caret.push(if b == b'\t' { '\t' } else { ' ' });
        }

        caret.push('^');
        out.push(caret);

        self.diag_lines(&out);
    }

    /// Ends a parse: prints a pending error, or warns when non-whitespace
    /// input remains after the document.
    ///
    /// # Errors
    ///
    /// The pending parse error, including a strict-mode trailing-garbage
    /// warning escalated to an error.
    pub fn finish(&mut self) -> Result<(), Error> {
        if self.has_err() {
            self.err_print();
        } else if !self.consumed() {
            self.warn(Error::TrailingGarbage);

            if self.has_err() {
                self.err_print();
            }
        }

        match &self.state {
            State::Parsing => Ok(()),
            State::Errored(err) => Err(err.clone()),
        }
    }
}
