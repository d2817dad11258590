//! `gwbasic`: a byte-exact interpreter core for the GW-BASIC dialect.
//!
//! The hard engineering lives in [`dispatcher`]/[`statements`] (the
//! statement parser/executor), [`memory`] (the variable/array/string-heap
//! model and its PEEK/VARPTR byte layout), and [`keyboard`] (the ring
//! buffer/macro-expansion machine). Everything this crate calls but does
//! not implement — screen,
//! sound, file devices, the clock, event plumbing, the session host that
//! owns LOAD/SAVE/RUN-a-named-file — is a narrow trait in [`interfaces`];
//! callers supply their own backend (or use [`interfaces::NullHost`] for a
//! trivial stand-in) and drive the core with [`dispatcher::run`].

pub mod dispatcher;
pub mod error;
pub mod expr;
pub mod interfaces;
pub mod keyboard;
pub mod memory;
pub mod program;
pub mod reader;
pub mod session;
pub mod statements;
pub mod tokens;
pub mod values;

pub use error::{BasicError, RaisedError, Result};
pub use interfaces::Collaborators;
pub use reader::Line;
pub use session::Interpreter;

/// Load a tokenized-bytecode program image and run it to completion
/// against the given collaborator backend, starting from line one.
/// Convenience wrapper around [`program::load_image`] +
/// [`Interpreter::load_program`] + [`dispatcher::run`] for callers (like
/// `gwbasic-run`) that just want "load a file, run it".
pub fn run_program(image: &[u8], collab: &mut dyn Collaborators) -> Result<()> {
    let lines = program::load_image(image)?;
    let mut interp = Interpreter::new();
    interp.load_program(lines);
    dispatcher::run(&mut interp, collab)
}
