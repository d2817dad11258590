//! Single/two-byte keyword token codes and the structural byte markers of
//! tokenized bytecode.
//!
//! Grouped by role (structural bytes, numeric-literal tags, statement
//! keywords, operator/separator keywords) rather than by decode priority,
//! since token bytes don't nest the way instruction-word opcode fields do.
//! The actual numeric assignments are nominal — this crate never
//! round-trips against a real detokenizer table — but are kept dense and
//! collision-free so `dispatcher.rs`'s match arms read as a faithful
//! transliteration of the full opcode table.

// Structural bytes
pub const END_OF_LINE: u8 = 0x00;
pub const STATEMENT_SEP: u8 = b':';
pub const LINE_POINTER: u8 = 0x0e;
/// Introduces a two-byte extension token: a statement or operator keyword
/// that doesn't fit the single-byte 0x81..0xFE range (THEN/TO/STEP/...,
/// MID$, and the PCjr/Tandy-only statements).
pub const EXTENSION_INTRODUCER: u8 = 0xfe;

// Numeric literal tags (0x11..0x1F for small/byte/int/MBF-single/MBF-double)
pub const T_CONSTANT_ZERO: u8 = 0x11;
pub const T_CONSTANT_1: u8 = 0x12;
pub const T_BYTE: u8 = 0x0f;
pub const T_UINT: u8 = 0x1c;
pub const T_INT: u8 = 0x1d;
pub const T_SINGLE: u8 = 0x1e;
pub const T_DOUBLE: u8 = 0x1f;

/// Statement keyword tokens, single byte 0x81..0xFE, assigned in the same
/// order the real tokenizer's opcode table lists them.
macro_rules! keyword_tokens {
    ($first:ident = $start:expr, $($rest:ident),+ $(,)?) => {
        pub const $first: u8 = $start;
        keyword_tokens!(@seq $start; $($rest),+);
    };
    (@seq $prev:expr; $name:ident, $($rest:ident),+) => {
        pub const $name: u8 = $prev + 1;
        keyword_tokens!(@seq ($prev + 1); $($rest),+);
    };
    (@seq $prev:expr; $name:ident) => {
        pub const $name: u8 = $prev + 1;
    };
}

keyword_tokens! {
    END = 0x81, FOR, NEXT, DATA, INPUT, DIM, READ, LET, GOTO, RUN, IF,
    RESTORE, GOSUB, RETURN, REM, STOP, PRINT, CLEAR, LIST, NEW, ON, WAIT,
    DEF, POKE, CONT, OUT, LPRINT, LLIST, WIDTH, ELSE, TRON, TROFF, SWAP,
    ERASE, EDIT, ERROR, RESUME, DELETE, AUTO, RENUM, DEFSTR, DEFINT,
    DEFSNG, DEFDBL, LINE, WHILE, WEND, CALL, CALLS, WRITE, OPTION,
    RANDOMIZE, OPEN, CLOSE, LOAD, MERGE, SAVE, COLOR, CLS, MOTOR, BSAVE,
    BLOAD, SOUND, BEEP, PSET, PRESET, SCREEN, KEY, LOCATE, FILES, FIELD,
    SYSTEM, NAME, LSET, RSET, KILL, PUT, GET, RESET, COMMON, CHAIN,
    DATE_S, TIME_S, PAINT, COM, CIRCLE, DRAW, PLAY, TIMER, IOCTL, CHDIR,
    MKDIR, RMDIR, SHELL, ENVIRON, VIEW, WINDOW, PALETTE, LCOPY, PCOPY,
    LOCK, UNLOCK, PEN, STRIG,
}

// PCjr/Tandy-only statements and the extension-word grammar (operator
// keywords + MID$ as an assignment target), packed into the two-byte
// EXTENSION_INTRODUCER space.
keyword_tokens! {
    TERM = 0x01, NOISE, MID_S, THEN, TO, STEP, USING, FN, USR, SEG,
    SHARED, ACCESS, LOCK_KW, LEN, ALL, BASE, KYBD, EXT_DEBUG,
}

/// True if `byte` opens a known single-byte statement.
pub fn is_statement_token(byte: u8) -> bool {
    (END..=STRIG).contains(&byte) && byte != 0
}

/// End-of-statement markers the dispatcher's terminator check accepts.
pub const END_STATEMENT: [u8; 2] = [END_OF_LINE, STATEMENT_SEP];
