//! The single fault kind propagated by every parser and collaborator call.
//!
//! GW-BASIC errors are numbered, catchable, and resumable (ON ERROR GOTO /
//! RESUME) rather than fatal, so they are modelled as ordinary `Result`
//! values rather than panics.

use thiserror::Error;

/// A GW-BASIC runtime or syntax fault.
///
/// Carries its canonical numeric code (1..73) and, once it has crossed a
/// statement boundary, the line number it occurred on. The line is filled in
/// by the interpreter main loop, not by the raising site, so that a single
/// `BasicError` can be constructed deep inside a parser without threading
/// the current line through every call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BasicError {
    #[error("NEXT without FOR")]
    NextWithoutFor,
    #[error("Syntax error")]
    Stx,
    #[error("Return without GOSUB")]
    ReturnWithoutGosub,
    #[error("Out of DATA")]
    OutOfData,
    #[error("Illegal function call")]
    IllegalFunctionCall,
    #[error("Overflow")]
    Overflow,
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Undefined line number")]
    UndefinedLineNumber,
    #[error("Subscript out of range")]
    SubscriptOutOfRange,
    #[error("Duplicate definition")]
    DuplicateDefinition,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Illegal direct")]
    IllegalDirect,
    #[error("Type mismatch")]
    TypeMismatch,
    #[error("Out of string space")]
    OutOfStringSpace,
    #[error("String too long")]
    StringTooLong,
    #[error("String formula too complex")]
    StringFormulaTooComplex,
    #[error("Can't continue")]
    CantContinue,
    #[error("Undefined user function")]
    UndefinedUserFunction,
    #[error("Missing operand")]
    MissingOperand,
    #[error("Line buffer overflow")]
    LineBufferOverflow,
    #[error("Bad file mode")]
    BadFileMode,
    #[error("File not found")]
    FileNotFound,
    #[error("File already open")]
    FileAlreadyOpen,
    /// Every other numbered GW-BASIC error code without a bespoke variant
    /// above, carried verbatim so the dispatcher can still format
    /// `<Message> in <line>` with the canonical wording supplied by the
    /// raiser (screen/sound/file collaborators own most of these: "Device
    /// I/O error", "Disk full", "Field overflow", and so on).
    #[error("{message}")]
    Numbered { code: u8, message: &'static str },
}

impl BasicError {
    /// The canonical GW-BASIC numeric code for this fault.
    pub fn code(&self) -> u8 {
        match self {
            BasicError::NextWithoutFor => 1,
            BasicError::Stx => 2,
            BasicError::ReturnWithoutGosub => 3,
            BasicError::OutOfData => 4,
            BasicError::IllegalFunctionCall => 5,
            BasicError::Overflow => 6,
            BasicError::OutOfMemory => 7,
            BasicError::UndefinedLineNumber => 8,
            BasicError::SubscriptOutOfRange => 9,
            BasicError::DuplicateDefinition => 10,
            BasicError::DivisionByZero => 11,
            BasicError::IllegalDirect => 12,
            BasicError::TypeMismatch => 13,
            BasicError::OutOfStringSpace => 14,
            BasicError::StringTooLong => 15,
            BasicError::StringFormulaTooComplex => 16,
            BasicError::CantContinue => 17,
            BasicError::UndefinedUserFunction => 18,
            BasicError::MissingOperand => 22,
            BasicError::LineBufferOverflow => 23,
            BasicError::BadFileMode => 54,
            BasicError::FileNotFound => 53,
            BasicError::FileAlreadyOpen => 55,
            BasicError::Numbered { code, .. } => *code,
        }
    }
}

/// An error observed while the interpreter is running a stored program,
/// paired with the line it surfaced on (if any — direct-mode statements
/// have none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaisedError {
    pub error: BasicError,
    pub line: Option<u16>,
}

impl std::fmt::Display for RaisedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} in {}", self.error, line),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Range-check helper used by array dimensioning, ON jumps, and STRIG/KEY
/// event numbers.
pub fn range_check(lo: i32, hi: i32, value: i32) -> Result<(), BasicError> {
    if value < lo || value > hi {
        Err(BasicError::IllegalFunctionCall)
    } else {
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, BasicError>;
