//! UTF-8 sequence codec shared by the reader and the writer.
//!
//! The functions here operate on raw byte buffers and raw `u32` code points
//! rather than on `char`. This is deliberate: the escape machinery needs to
//! measure and step over sequences without interpreting them, and the codec
//! itself does not police surrogate halves or values above `0x10FFFF` — that
//! is the caller's responsibility. The reader layers its own scalar-value
//! checks on top where it produces `String` output.

/// Number of bytes the UTF-8 encoding of `cp` occupies.
#[must_use]
pub const fn encoded_len(cp: u32) -> usize {
    if cp < 0x80 {
        1
    } else if cp < 0x800 {
        2
    } else if cp < 0x10000 {
        3
    } else {
        4
    }
}

/// Byte length of the sequence introduced by the lead byte `b`, or `None`
/// if `b` cannot start a sequence (it is a continuation byte or an invalid
/// lead pattern).
#[must_use]
pub const fn lead_len(b: u8) -> Option<usize> {
    if b & 0x80 == 0 {
        Some(1)
    } else if b & 0xe0 == 0xc0 {
        Some(2)
    } else if b & 0xf0 == 0xe0 {
        Some(3)
    } else if b & 0xf8 == 0xf0 {
        Some(4)
    } else {
        None
    }
}

/// Length of the sequence starting at `off`.
///
/// Returns `Some(0)` at the end of the buffer, `Some(1..=4)` for a valid
/// lead byte and `None` for a malformed one.
#[must_use]
pub fn next_seq_len(buf: &[u8], off: usize) -> Option<usize> {
    match buf.get(off) {
        None => Some(0),
        Some(&b) => lead_len(b),
    }
}

/// Length of the sequence ending right before `off`.
///
/// Walks backwards over continuation bytes to the lead byte and checks that
/// the lead agrees with the distance walked. Returns `Some(0)` at the start
/// of the buffer and `None` on a malformed sequence.
#[must_use]
pub fn prev_seq_len(buf: &[u8], off: usize) -> Option<usize> {
    let off = off.min(buf.len());

    if off == 0 {
        return Some(0);
    }

    let mut len = 1;

    while len <= 4 && len <= off {
        let b = buf[off - len];

        if b & 0xc0 != 0x80 {
            return match lead_len(b) {
                Some(l) if l == len => Some(len),
                _ => None,
            };
        }

        len += 1;
    }

    None
}

/// Decodes the sequence starting at `*off`, advancing `*off` past the
/// consumed bytes on success.
///
/// Returns `None` without advancing when the sequence is malformed or the
/// buffer ends mid-sequence.
#[must_use]
pub fn decode(buf: &[u8], off: &mut usize) -> Option<u32> {
    let b0 = *buf.get(*off)?;
    let len = lead_len(b0)?;

    let mut cp = match len {
        1 => u32::from(b0),
        2 => u32::from(b0 & 0x1f),
        3 => u32::from(b0 & 0x0f),
        _ => u32::from(b0 & 0x07),
    };

    for i in 1..len {
        let b = *buf.get(*off + i)?;

        if b & 0xc0 != 0x80 {
            return None;
        }

        cp = (cp << 6) | u32::from(b & 0x3f);
    }

    *off += len;

    Some(cp)
}

/// Encodes `cp` into `out`, returning the number of bytes written.
#[allow(clippy::cast_possible_truncation)]
pub fn encode(cp: u32, out: &mut [u8; 4]) -> usize {
    match encoded_len(cp) {
        1 => {
            out[0] = cp as u8;
            1
        }
        2 => {
            out[0] = 0xc0 | (cp >> 6) as u8;
            out[1] = 0x80 | (cp & 0x3f) as u8;
            2
        }
        3 => {
            out[0] = 0xe0 | (cp >> 12) as u8;
            out[1] = 0x80 | ((cp >> 6) & 0x3f) as u8;
            out[2] = 0x80 | (cp & 0x3f) as u8;
            3
        }
        _ => {
            out[0] = 0xf0 | (cp >> 18) as u8;
            out[1] = 0x80 | ((cp >> 12) & 0x3f) as u8;
            out[2] = 0x80 | ((cp >> 6) & 0x3f) as u8;
            out[3] = 0x80 | (cp & 0x3f) as u8;
            4
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(cp: u32) {
        let mut buf = [0u8; 4];
        let n = encode(cp, &mut buf);

        assert_eq!(n, encoded_len(cp));

        let mut off = 0;
        assert_eq!(decode(&buf[..n], &mut off), Some(cp));
        assert_eq!(off, n);
    }

    #[test]
    fn boundary_code_points() {
        for cp in [0, 0x7f, 0x80, 0x7ff, 0x800, 0xffff, 0x10000, 0x0010_ffff] {
            roundtrip(cp);
        }
    }

    #[test]
    fn surrogates_pass_through() {
        // Not rejected here; scalar-value policing is the caller's job.
        roundtrip(0xd800);
        roundtrip(0xdfff);
    }

    #[test]
    fn decode_str() {
        let s = "a\u{df}\u{6c34}\u{1f600}".as_bytes();
        let mut off = 0;

        assert_eq!(decode(s, &mut off), Some(0x61));
        assert_eq!(decode(s, &mut off), Some(0xdf));
        assert_eq!(decode(s, &mut off), Some(0x6c34));
        assert_eq!(decode(s, &mut off), Some(0x1f600));
        assert_eq!(off, s.len());
        assert_eq!(decode(s, &mut off), None);
    }

    #[test]
    fn decode_malformed() {
        // Bare continuation byte.
        let mut off = 0;
        assert_eq!(decode(&[0x80, b'a'], &mut off), None);
        assert_eq!(off, 0);

        // Lead byte with a non-continuation follower.
        let mut off = 0;
        assert_eq!(decode(&[0xc3, b'a'], &mut off), None);
        assert_eq!(off, 0);

        // Truncated sequence.
        let mut off = 0;
        assert_eq!(decode(&[0xe6, 0xb0], &mut off), None);
    }

    #[test]
    fn seq_lens() {
        let s = "a\u{df}\u{6c34}\u{1f600}".as_bytes();

        assert_eq!(next_seq_len(s, 0), Some(1));
        assert_eq!(next_seq_len(s, 1), Some(2));
        assert_eq!(next_seq_len(s, 3), Some(3));
        assert_eq!(next_seq_len(s, 6), Some(4));
        assert_eq!(next_seq_len(s, s.len()), Some(0));
        assert_eq!(next_seq_len(s, 2), None);

        assert_eq!(prev_seq_len(s, 0), Some(0));
        assert_eq!(prev_seq_len(s, 1), Some(1));
        assert_eq!(prev_seq_len(s, 3), Some(2));
        assert_eq!(prev_seq_len(s, 6), Some(3));
        assert_eq!(prev_seq_len(s, s.len()), Some(4));
        assert_eq!(prev_seq_len(&[b'a', 0x80], 2), None);
    }
}
