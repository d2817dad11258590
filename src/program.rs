//! Deserializes the on-disk tokenized-bytecode image into the `Vec<Line>`
//! records `Interpreter` operates on.
//!
//! This is not a tokenizer — turning BASIC source text into this byte
//! image is out of scope here. This module only pulls the image back
//! apart into per-line records, the same way a loader reads an
//! already-assembled object file; it never inspects or interprets keyword
//! bytes itself, leaving that to `dispatcher.rs`.

use crate::error::{BasicError, Result};
use crate::reader::Line;

/// Split a program image into line records. Each record is
/// `<u16 next-line-addr><u16 line-number><statement bytes><0x00>`; the
/// image ends at a record whose `next-line-addr` is zero. `next-line-addr`
/// itself is only a detokenizer/LIST convenience in the reference and is
/// not needed to walk the image sequentially, so it is read and discarded.
pub fn load_image(bytes: &[u8]) -> Result<Vec<Line>> {
    let mut lines = Vec::new();
    let mut pos = 0usize;
    while pos + 4 <= bytes.len() {
        let next_addr = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
        if next_addr == 0 {
            break;
        }
        let number = u16::from_le_bytes([bytes[pos + 2], bytes[pos + 3]]);
        pos += 4;
        let body_start = pos;
        while pos < bytes.len() && bytes[pos] != 0x00 {
            pos += 1;
        }
        if pos >= bytes.len() {
            return Err(BasicError::Stx);
        }
        lines.push(Line { number, body: bytes[body_start..pos].to_vec() });
        pos += 1; // consume the end-of-line 0x00
    }
    lines.sort_by_key(|l| l.number);
    Ok(lines)
}

/// Serialize line records back into the on-disk image shape, for SAVE/LIST
/// collaborators that want to round-trip a program. `next-line-addr` is
/// computed relative to `base` (the address the image will be loaded at),
/// matching the reference's own habit of baking absolute addresses into
/// the stored image.
pub fn save_image(lines: &[Line], base: u16) -> Vec<u8> {
    let mut out = Vec::new();
    let mut addr = base as u32;
    for line in lines {
        let record_len = 4 + line.body.len() + 1;
        addr += record_len as u32;
        out.extend_from_slice(&(addr as u16).to_le_bytes());
        out.extend_from_slice(&line.number.to_le_bytes());
        out.extend_from_slice(&line.body);
        out.push(0x00);
    }
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_save_and_load() {
        let lines = vec![
            Line { number: 10, body: b"A=1".to_vec() },
            Line { number: 20, body: b"PRINT A".to_vec() },
        ];
        let image = save_image(&lines, 0x1000);
        let back = load_image(&image).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].number, 10);
        assert_eq!(back[0].body, b"A=1");
        assert_eq!(back[1].number, 20);
        assert_eq!(back[1].body, b"PRINT A");
    }

    #[test]
    fn empty_image_yields_no_lines() {
        assert!(load_image(&[0, 0]).unwrap().is_empty());
    }

    #[test]
    fn truncated_line_is_a_syntax_error() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&10u16.to_le_bytes());
        bytes.extend_from_slice(&10u16.to_le_bytes());
        bytes.extend_from_slice(b"PRINT 1"); // no terminating 0x00
        assert_eq!(load_image(&bytes), Err(BasicError::Stx));
    }
}
