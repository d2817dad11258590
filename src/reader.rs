//! Cursor over one line's tokenized bytecode.
//!
//! A bitfield-reading style familiar from fixed-width instruction decoders
//! (peek a fixed unit, decide whether to consume it, require specific bit
//! patterns or raise), reworked here for variable-length token/line
//! streams instead of fixed-width instruction words.

use crate::error::{BasicError, Result};
use crate::tokens;

/// A line record: its declared line number and the statement bytes that
/// follow the `<next-line-addr><line-number>` header.
#[derive(Clone, Debug)]
pub struct Line {
    pub number: u16,
    pub body: Vec<u8>,
}

/// Cursor over a single line's body. `Reader` never crosses a line
/// boundary on its own; the dispatcher advances to the next `Line` once
/// this one is exhausted.
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Current byte without consuming it; `END_OF_LINE` past the end.
    pub fn peek(&self) -> u8 {
        self.bytes.get(self.pos).copied().unwrap_or(tokens::END_OF_LINE)
    }

    pub fn peek_at(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(tokens::END_OF_LINE)
    }

    /// Skip whitespace (ASCII space) only; tokenized BASIC keeps spaces as
    /// literal bytes between tokens for LIST round-tripping.
    pub fn skip_blank(&mut self) -> u8 {
        while self.bytes.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
        self.peek()
    }

    pub fn advance(&mut self) -> u8 {
        let b = self.peek();
        if self.pos < self.bytes.len() {
            self.pos += 1;
        }
        b
    }

    pub fn skip_blank_read(&mut self) -> u8 {
        self.skip_blank();
        self.advance()
    }

    /// Consume `byte` if next (after skipping blanks); returns whether it did.
    pub fn skip_blank_read_if(&mut self, byte: u8) -> bool {
        self.skip_blank();
        if self.peek() == byte {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Require `byte` next (after skipping blanks) or raise a syntax error.
    pub fn require(&mut self, byte: u8) -> Result<()> {
        self.skip_blank();
        if self.advance() == byte {
            Ok(())
        } else {
            Err(BasicError::Stx)
        }
    }

    pub fn require_one_of(&mut self, bytes: &[u8]) -> Result<u8> {
        self.skip_blank();
        let b = self.advance();
        if bytes.contains(&b) {
            Ok(b)
        } else {
            Err(BasicError::Stx)
        }
    }

    /// True if the reader, after skipping blanks, sits at a statement
    /// terminator (end-of-line or `:`).
    pub fn at_statement_end(&mut self) -> bool {
        self.skip_blank();
        tokens::END_STATEMENT.contains(&self.peek())
    }

    /// Require the statement to end here; used by parsers whose trailing
    /// syntax errors fire *after* their side effect.
    pub fn require_end(&mut self) -> Result<()> {
        if self.at_statement_end() {
            Ok(())
        } else {
            Err(BasicError::Stx)
        }
    }

    /// Skip past the rest of the current line (REM, ELSE-skip, DATA).
    pub fn skip_to_end_of_line(&mut self) {
        self.pos = self.bytes.len();
    }

    /// Skip to (not past) the next statement terminator.
    pub fn skip_to_end_of_statement(&mut self) {
        while !tokens::END_STATEMENT.contains(&self.peek()) && !self.at_end() {
            self.pos += 1;
        }
    }

    /// Read a little-endian `u16` jump-address/line-number pointer token
    /// (the byte after `LINE_POINTER`, or a raw literal line number).
    pub fn read_u16(&mut self) -> u16 {
        let lo = self.advance();
        let hi = self.advance();
        u16::from_le_bytes([lo, hi])
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.pos.min(self.bytes.len())..]
    }

    /// Raw bytes between two cursor positions in this line, for DEF FN's
    /// body capture (it stores source text, not a parsed expression tree).
    pub fn bytes_slice(&self, from: usize, to: usize) -> &'a [u8] {
        &self.bytes[from.min(self.bytes.len())..to.min(self.bytes.len())]
    }

    /// Case-insensitive whole-word match against in-statement keywords
    /// (THEN, TO, STEP, GOTO, GOSUB, AND, OR, ...). Statement-opening
    /// keywords go through the tokenized `tokens::*` byte constants
    /// instead; this covers the secondary keyword vocabulary that is read
    /// here as plain ASCII rather than a dedicated token byte, to keep the
    /// reader simple. Consumes the word and returns true on match;
    /// otherwise leaves the cursor untouched.
    pub fn match_keyword(&mut self, word: &str) -> bool {
        self.skip_blank();
        let start = self.pos;
        for (i, want) in word.bytes().enumerate() {
            if self.peek_at(i).to_ascii_uppercase() != want.to_ascii_uppercase() {
                return false;
            }
        }
        let after = self.peek_at(word.len());
        if after.is_ascii_alphanumeric() {
            return false;
        }
        self.pos = start + word.len();
        true
    }

    pub fn require_keyword(&mut self, word: &str) -> Result<()> {
        if self.match_keyword(word) {
            Ok(())
        } else {
            Err(BasicError::Stx)
        }
    }
}
