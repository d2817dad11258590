//! Statement dispatch table: token byte -> parser-executor, plus the
//! terminator-check-ordering asymmetry between statements.
//!
//! A decode-dispatch-execute loop (fetch a fixed unit, look up the
//! handler, execute, advance), reworked here from a fixed-width
//! instruction word to a variable-length token/line stream. The
//! opcode-to-handler mapping is a plain match on the token byte rather
//! than a runtime table, since Rust's match compiles to the same dense
//! jump table without the indirection of storing function pointers.

use crate::error::{BasicError, Result};
use crate::interfaces::Collaborators;
use crate::reader::Reader;
use crate::session::Interpreter;
use crate::statements;
use crate::tokens;

/// Whether a statement's own parser checks `require_end()` before invoking
/// its collaborator side effect, or after. Carried back from each
/// per-statement parser so the dispatcher can apply a uniform check; the
/// handful of statements documented as `After` (TRON, TROFF, CONT, RESET)
/// return it explicitly instead of checking internally.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TerminationOrder {
    Before,
    After,
}

/// Run the loaded program from `interpreter.current` until END/STOP, the
/// program falls off its last line, or an uncaught error (which, with no
/// active ON ERROR GOTO handler, propagates to the caller).
pub fn run(interpreter: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<()> {
    interpreter.running = true;
    while interpreter.running && !interpreter.at_end() {
        if interpreter.break_flag {
            interpreter.break_flag = false;
            interpreter.running = false;
            break;
        }
        if let Err(e) = step(interpreter, collab) {
            let at = interpreter.current;
            if interpreter.has_error_handler() {
                interpreter.trap_error(e, at)?;
            } else {
                interpreter.running = false;
                return Err(e);
            }
        }
    }
    interpreter.running = false;
    Ok(())
}

/// Execute exactly one statement at `interpreter.current`: REM/ELSE skip
/// to end-of-line, an empty statement slot (`:` or end-of-line) is a
/// no-op, a recognized opcode byte dispatches to its parser, an ASCII
/// letter falls through to implicit LET, anything else is a syntax error.
pub fn step(interpreter: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<()> {
    let start = interpreter.current;
    let body = interpreter.line_body_at(start);
    let mut r = Reader::new(&body);
    r.seek(start.pos);
    r.skip_blank();

    if r.at_end() {
        interpreter.advance_past_line();
        return Ok(());
    }
    if r.peek() == tokens::STATEMENT_SEP {
        r.advance();
        interpreter.current.pos = r.pos();
        return Ok(());
    }

    let byte = r.advance();
    let order = if byte == tokens::EXTENSION_INTRODUCER {
        let ext = r.advance();
        if ext == tokens::EXT_DEBUG {
            statements::debug_(&mut r, interpreter, collab)?
        } else if ext == tokens::MID_S {
            statements::mid_s_(&mut r, interpreter)?
        } else if ext == tokens::TERM {
            statements::term_(&mut r, interpreter, collab)?
        } else if ext == tokens::NOISE {
            statements::noise_(&mut r, interpreter, collab)?
        } else {
            return Err(BasicError::Stx);
        }
    } else if tokens::is_statement_token(byte) {
        dispatch_opcode(byte, &mut r, interpreter, collab)?
    } else if byte.is_ascii_alphabetic() {
        r.seek(r.pos() - 1);
        statements::let_(&mut r, interpreter)?;
        TerminationOrder::After
    } else {
        return Err(BasicError::Stx);
    };

    if order == TerminationOrder::After {
        r.skip_blank();
        if !r.at_statement_end() {
            return Err(BasicError::Stx);
        }
    }

    // A statement that performed a jump (GOTO, GOSUB, RETURN, a looping
    // NEXT/WEND, RESUME, RUN, CHAIN, ON ... GOTO/GOSUB, ...) has already
    // pointed `interpreter.current` at its target; only the reader's own
    // position is stale in that case, so leave `current` untouched. Detect
    // this by comparing against the position we started from rather than
    // by line alone, since a loop can jump backward within the same line.
    if interpreter.current == start {
        interpreter.current.pos = r.pos();
    }
    Ok(())
}

pub(crate) fn dispatch_opcode(
    byte: u8,
    r: &mut Reader,
    interp: &mut Interpreter,
    collab: &mut dyn Collaborators,
) -> Result<TerminationOrder> {
    use tokens::*;
    match byte {
        END => statements::end_(r, interp),
        FOR => statements::for_(r, interp),
        NEXT => statements::next_(r, interp),
        DATA => statements::data_(r),
        INPUT => statements::input_(r, interp, collab),
        DIM => statements::dim_(r, interp),
        READ => statements::read_(r, interp),
        LET => statements::let_explicit(r, interp),
        GOTO => statements::goto_(r, interp),
        RUN => statements::run_(r, interp, collab),
        IF => statements::if_(r, interp, collab),
        RESTORE => statements::restore_(r, interp),
        GOSUB => statements::gosub_(r, interp),
        RETURN => statements::return_(r, interp),
        REM => statements::rem_(r),
        STOP => statements::stop_(r, interp),
        PRINT => statements::print_(r, interp, collab),
        CLEAR => statements::clear_(r, interp),
        LIST => statements::list_(r, interp, collab),
        NEW => statements::new_(r, interp),
        ON => statements::on_(r, interp, collab),
        WAIT => statements::wait_(r, interp),
        DEF => statements::def_(r, interp, collab),
        POKE => statements::poke_(r, interp, collab),
        CONT => statements::cont_(r, interp),
        OUT => statements::out_(r, interp),
        LPRINT => statements::lprint_(r, interp, collab),
        LLIST => statements::llist_(r, interp, collab),
        WIDTH => statements::width_(r, interp, collab),
        ELSE => statements::else_(r),
        TRON => statements::tron_(r, interp),
        TROFF => statements::troff_(r, interp),
        SWAP => statements::swap_(r, interp),
        ERASE => statements::erase_(r, interp),
        EDIT => statements::edit_(r, interp, collab),
        ERROR => statements::error_(r, interp),
        RESUME => statements::resume_(r, interp),
        DELETE => statements::delete_(r, interp, collab),
        AUTO => statements::auto_(r, collab),
        RENUM => statements::renum_(r, collab),
        DEFSTR => statements::deftype_(r, interp, '$'),
        DEFINT => statements::deftype_(r, interp, '%'),
        DEFSNG => statements::deftype_(r, interp, '!'),
        DEFDBL => statements::deftype_(r, interp, '#'),
        LINE => statements::line_(r, interp, collab),
        WHILE => statements::while_(r, interp),
        WEND => statements::wend_(r, interp),
        CALL => statements::call_(r, interp, collab),
        CALLS => statements::call_(r, interp, collab),
        WRITE => statements::write_(r, interp, collab),
        OPTION => statements::option_base_(r, interp),
        RANDOMIZE => statements::randomize_(r, interp),
        OPEN => statements::open_(r, interp, collab),
        CLOSE => statements::close_(r, interp, collab),
        LOAD => statements::load_(r, collab),
        MERGE => statements::merge_(r, collab),
        SAVE => statements::save_(r, collab),
        COLOR => statements::color_(r, interp, collab),
        CLS => statements::cls_(r, collab),
        MOTOR => statements::motor_(r, interp, collab),
        BSAVE => statements::bsave_(r, interp, collab),
        BLOAD => statements::bload_(r, interp, collab),
        SOUND => statements::sound_(r, interp, collab),
        BEEP => statements::beep_(r, collab),
        PSET => statements::pset_(r, interp, collab),
        PRESET => statements::preset_(r, interp, collab),
        SCREEN => statements::screen_(r, interp, collab),
        KEY => statements::key_(r, interp, collab),
        LOCATE => statements::locate_(r, interp, collab),
        FILES => statements::files_(r, interp, collab),
        FIELD => statements::field_(r, interp, collab),
        SYSTEM => statements::system_(r, interp, collab),
        NAME => statements::name_(r, interp, collab),
        LSET => statements::lset_(r, interp),
        RSET => statements::rset_(r, interp),
        KILL => statements::kill_(r, interp, collab),
        PUT => statements::put_(r, interp, collab),
        GET => statements::get_(r, interp, collab),
        RESET => statements::reset_(r, interp),
        COMMON => statements::common_(r, interp),
        CHAIN => statements::chain_(r, interp, collab),
        DATE_S => statements::date_(r, interp, collab),
        TIME_S => statements::time_(r, interp, collab),
        PAINT => statements::paint_(r, interp, collab),
        COM => statements::com_(r, interp, collab),
        CIRCLE => statements::circle_(r, interp, collab),
        DRAW => statements::draw_(r, interp, collab),
        PLAY => statements::play_(r, interp, collab),
        TIMER => statements::timer_(r, interp, collab),
        IOCTL => statements::ioctl_(r, interp, collab),
        CHDIR => statements::chdir_(r, interp, collab),
        MKDIR => statements::mkdir_(r, interp, collab),
        RMDIR => statements::rmdir_(r, interp, collab),
        SHELL => statements::shell_(r, interp, collab),
        ENVIRON => statements::environ_(r, interp),
        VIEW => statements::view_(r, interp, collab),
        WINDOW => statements::window_(r, interp, collab),
        PALETTE => statements::palette_(r, interp, collab),
        LCOPY => statements::lcopy_(r, interp, collab),
        PCOPY => statements::pcopy_(r, interp, collab),
        LOCK => statements::lock_(r, interp, collab),
        UNLOCK => statements::unlock_(r, interp, collab),
        PEN => statements::pen_(r, interp, collab),
        STRIG => statements::strig_(r, interp, collab),
        _ => Err(BasicError::Stx),
    }
}
