//! Per-statement parser-executors: one function per token in
//! `dispatcher.rs`'s match table, each reading its own argument grammar off
//! a `Reader` and, once that grammar is fully validated, invoking the
//! collaborator call that is the statement's actual effect.
//!
//! Each parser collects and validates its whole argument list first, then
//! makes exactly one call into the collaborator bundle, rather than
//! interleaving argument reads with side effects. Every function returns
//! the `TerminationOrder` the dispatcher needs to decide whether it has
//! already checked for trailing garbage.

use crate::dispatcher::{self, TerminationOrder};
use crate::error::{BasicError, Result};
use crate::expr;
use crate::interfaces::{Collaborators, EventCommand, EventKind};
use crate::reader::Reader;
use crate::session::{Interpreter, Position, ResumeKind};
use crate::tokens;
use crate::values::{self, BasicString, Value};

// ---------------------------------------------------------------------
// shared helpers

/// A line-number operand: either a tokenized pointer (`LINE_POINTER` +
/// little-endian u16) or, for fixtures built without a full tokenizer, a
/// bare ASCII decimal run.
fn read_jumpnum(r: &mut Reader) -> Result<u16> {
    r.skip_blank();
    if r.peek() == tokens::LINE_POINTER {
        r.advance();
        return Ok(r.read_u16());
    }
    if r.peek().is_ascii_digit() {
        let mut n: u32 = 0;
        while r.peek().is_ascii_digit() {
            n = n * 10 + (r.advance() - b'0') as u32;
        }
        return Ok(n as u16);
    }
    Err(BasicError::Stx)
}

fn opt_literal_u16(r: &mut Reader) -> Option<u16> {
    r.skip_blank();
    if r.peek().is_ascii_digit() {
        let mut n: u32 = 0;
        while r.peek().is_ascii_digit() {
            n = n * 10 + (r.advance() - b'0') as u32;
        }
        Some(n as u16)
    } else {
        None
    }
}

fn expect_str(v: Value) -> Result<String> {
    match v {
        Value::Str(s) => Ok(s.as_bytes().iter().map(|&b| b as char).collect()),
        _ => Err(BasicError::TypeMismatch),
    }
}

fn eval_string(r: &mut Reader, interp: &mut Interpreter) -> Result<String> {
    expect_str(expr::parse_expression(r, interp)?)
}

fn eval_int(r: &mut Reader, interp: &mut Interpreter) -> Result<i32> {
    expr::eval_int(r, interp)
}

/// A bare `"..."` literal read directly off the reader, for the handful of
/// grammars (INPUT's prompt, LOAD/SAVE/MERGE's filename) that take a
/// literal string token rather than a general expression.
fn string_literal(r: &mut Reader) -> Result<String> {
    r.skip_blank();
    r.require(b'"')?;
    let mut s = String::new();
    while r.peek() != b'"' && !r.at_end() {
        s.push(r.advance() as char);
    }
    if r.peek() == b'"' {
        r.advance();
    }
    Ok(s)
}

fn parse_point(r: &mut Reader, interp: &mut Interpreter) -> Result<(i32, i32)> {
    r.require(b'(')?;
    let x = eval_int(r, interp)?;
    r.require(b',')?;
    let y = eval_int(r, interp)?;
    r.require(b')')?;
    Ok((x, y))
}

fn parse_line_range(r: &mut Reader) -> Result<(Option<u16>, Option<u16>)> {
    r.skip_blank();
    if r.at_statement_end() {
        return Ok((None, None));
    }
    if r.peek() == b'-' {
        r.advance();
        let to = read_jumpnum(r)?;
        return Ok((None, Some(to)));
    }
    let from = read_jumpnum(r)?;
    r.skip_blank();
    if r.peek() == b'-' {
        r.advance();
        r.skip_blank();
        if r.at_statement_end() {
            return Ok((Some(from), None));
        }
        let to = read_jumpnum(r)?;
        Ok((Some(from), Some(to)))
    } else {
        Ok((Some(from), Some(from)))
    }
}

fn parse_optional_range(r: &mut Reader, interp: &mut Interpreter) -> Result<Option<(u32, u32)>> {
    if r.skip_blank_read_if(b',') {
        let a = eval_int(r, interp)? as u32;
        let b = if r.match_keyword("TO") { eval_int(r, interp)? as u32 } else { a };
        Ok(Some((a, b)))
    } else {
        Ok(None)
    }
}

/// PRINT/LPRINT value formatting.
fn format_value(v: &Value) -> Result<String> {
    Ok(match v {
        Value::Str(s) => s.as_bytes().iter().map(|&b| b as char).collect(),
        Value::Integer(n) => {
            if *n < 0 {
                format!("{n} ")
            } else {
                format!(" {n} ")
            }
        }
        Value::Single(_) => format_float(values::to_f64(v)?, 7),
        Value::Double(_) => format_float(values::to_f64(v)?, 16),
    })
}

/// Render a single/double value the way PRINT does: a leading sign column
/// (blank for non-negative, `-` for negative), a plain decimal carrying
/// `sig_digits` significant digits (7 for single, 16 for double, matching
/// GW-BASIC's own precision split) with no trailing zeros and no leading
/// `0` before the point for a fraction (`.25`, not `0.25`), and a trailing
/// space matching the integer formatting above. Does not reproduce
/// GW-BASIC's scientific-notation fallback for extreme magnitudes.
fn format_float(n: f64, sig_digits: usize) -> String {
    let sign = if n.is_sign_negative() && n != 0.0 { "-" } else { " " };
    if n == 0.0 {
        return format!("{sign}0 ");
    }
    let sci = format!("{:.*e}", sig_digits - 1, n.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap();
    let exp: i32 = exp.parse().unwrap();
    let digits: String = mantissa.chars().filter(|&c| c != '.').collect();
    // `exp + 1` is how many of `digits` land left of the decimal point;
    // zero or negative means the value is a pure fraction (leading zeros
    // after the point), at or past `digits.len()` means trailing zeros.
    let point = exp + 1;
    let mut out = String::new();
    if point <= 0 {
        out.push_str("0.");
        out.push_str(&"0".repeat((-point) as usize));
        out.push_str(&digits);
    } else if (point as usize) >= digits.len() {
        out.push_str(&digits);
        out.push_str(&"0".repeat(point as usize - digits.len()));
    } else {
        out.push_str(&digits[..point as usize]);
        out.push('.');
        out.push_str(&digits[point as usize..]);
    }
    if out.contains('.') {
        while out.ends_with('0') {
            out.pop();
        }
        if out.ends_with('.') {
            out.pop();
        }
    }
    if let Some(rest) = out.strip_prefix("0.") {
        out = format!(".{rest}");
    }
    format!("{sign}{out} ")
}

fn write_format(v: &Value) -> String {
    match v {
        Value::Str(s) => format!("\"{}\"", s.as_bytes().iter().map(|&b| b as char).collect::<String>()),
        other => format_value(other).unwrap_or_default().trim().to_string(),
    }
}

/// Build the full PRINT argument text: `,` pads to the next 14-column
/// print zone, `;` joins with no separator, anything else is a formatted
/// expression. Returns the built text and whether the last separator
/// suppresses the trailing newline.
fn build_print_list(r: &mut Reader, interp: &mut Interpreter) -> Result<(String, bool)> {
    let mut out = String::new();
    let mut suppress = false;
    loop {
        r.skip_blank();
        if r.at_statement_end() {
            break;
        }
        if r.peek() == b',' {
            r.advance();
            let col = out.rsplit('\n').next().unwrap_or(&out).len();
            let pad = 14 - (col % 14);
            out.push_str(&" ".repeat(pad));
            suppress = true;
            continue;
        }
        if r.peek() == b';' {
            r.advance();
            suppress = true;
            continue;
        }
        if r.match_keyword("TAB") {
            r.require(b'(')?;
            let col = eval_int(r, interp)?;
            r.require(b')')?;
            let current = out.rsplit('\n').next().unwrap_or(&out).len() as i32;
            if col > current {
                out.push_str(&" ".repeat((col - current) as usize));
            }
            suppress = false;
            continue;
        }
        if r.match_keyword("SPC") {
            r.require(b'(')?;
            let n = eval_int(r, interp)?;
            r.require(b')')?;
            out.push_str(&" ".repeat(n.max(0) as usize));
            suppress = false;
            continue;
        }
        let value = expr::parse_expression(r, interp)?;
        out.push_str(&format_value(&value)?);
        suppress = false;
    }
    Ok((out, suppress))
}

fn assign_lvalue(interp: &mut Interpreter, name: &str, indices: Option<Vec<i32>>, value: Value) -> Result<()> {
    match indices {
        Some(idx) => interp.memory.set_array(name, &idx, value),
        None => interp.memory.set_var(name, value),
    }
}

fn parse_data_value(text: &str, sigil: char) -> Result<Value> {
    if sigil == '$' {
        return Value::Str(BasicString::from(text)).to_type(sigil);
    }
    let trimmed = text.trim();
    if let Ok(n) = trimmed.parse::<i32>() {
        if let Ok(small) = i16::try_from(n) {
            return Value::Integer(small).to_type(sigil);
        }
        return Value::Single(values::Single::from_int(n)).to_type(sigil);
    }
    let f: f64 = trimmed.parse().map_err(|_| BasicError::TypeMismatch)?;
    Value::Single(values::Single::from_int(f.round() as i32)).to_type(sigil)
}

fn code_to_error(code: u8) -> BasicError {
    match code {
        1 => BasicError::NextWithoutFor,
        2 => BasicError::Stx,
        3 => BasicError::ReturnWithoutGosub,
        4 => BasicError::OutOfData,
        5 => BasicError::IllegalFunctionCall,
        6 => BasicError::Overflow,
        7 => BasicError::OutOfMemory,
        8 => BasicError::UndefinedLineNumber,
        9 => BasicError::SubscriptOutOfRange,
        10 => BasicError::DuplicateDefinition,
        11 => BasicError::DivisionByZero,
        12 => BasicError::IllegalDirect,
        13 => BasicError::TypeMismatch,
        14 => BasicError::OutOfStringSpace,
        15 => BasicError::StringTooLong,
        16 => BasicError::StringFormulaTooComplex,
        17 => BasicError::CantContinue,
        18 => BasicError::UndefinedUserFunction,
        22 => BasicError::MissingOperand,
        23 => BasicError::LineBufferOverflow,
        53 => BasicError::FileNotFound,
        54 => BasicError::BadFileMode,
        55 => BasicError::FileAlreadyOpen,
        other => BasicError::Numbered { code: other, message: "Unprintable error" },
    }
}

/// Scan forward from `interp.current` (past the WHILE token just read),
/// counting WHILE/WEND nesting, to the position just past the matching
/// WEND. Single-pass over the tokenized program, not the source text.
fn skip_to_matching_wend(interp: &mut Interpreter) -> Result<()> {
    let mut pos = interp.current;
    pos.pos += 1;
    let mut depth = 0i32;
    loop {
        if pos.line >= interp.program_len() {
            return Err(BasicError::Stx);
        }
        let body = interp.line_body_at(pos);
        if pos.pos >= body.len() {
            pos = Position { line: pos.line + 1, pos: 0 };
            continue;
        }
        let byte = body[pos.pos];
        pos.pos += 1;
        if byte == tokens::WHILE {
            depth += 1;
        } else if byte == tokens::WEND {
            if depth == 0 {
                interp.current = pos;
                return Ok(());
            }
            depth -= 1;
        }
    }
}

/// Scan the rest of the current line (single-line IF/THEN/ELSE only, as
/// in real tokenized BASIC) for the `ELSE` matching this `IF`'s nesting
/// depth; leaves the reader positioned just past it. Strings are skipped
/// whole so a literal colon or keyword byte inside one can't confuse the
/// depth count.
fn skip_to_else(r: &mut Reader) -> bool {
    let mut depth = 0i32;
    loop {
        if r.at_end() || r.peek() == tokens::END_OF_LINE {
            return false;
        }
        let b = r.peek();
        if b == tokens::IF {
            depth += 1;
            r.advance();
        } else if b == tokens::ELSE {
            r.advance();
            if depth == 0 {
                return true;
            }
            depth -= 1;
        } else if b == b'"' {
            r.advance();
            while r.peek() != b'"' && !r.at_end() {
                r.advance();
            }
            if r.peek() == b'"' {
                r.advance();
            }
        } else {
            r.advance();
        }
    }
}

fn execute_then_branch(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<()> {
    r.skip_blank();
    if r.peek().is_ascii_digit() || r.peek() == tokens::LINE_POINTER {
        let n = read_jumpnum(r)?;
        interp.jump(n)?;
        return Ok(());
    }
    let line_before = interp.current.line;
    loop {
        r.skip_blank();
        if r.peek() == tokens::ELSE || r.at_statement_end() {
            break;
        }
        let byte = r.advance();
        if tokens::is_statement_token(byte) {
            let order = dispatcher::dispatch_opcode(byte, r, interp, collab)?;
            if order == TerminationOrder::After {
                r.skip_blank();
                if r.peek() != tokens::ELSE && !r.at_statement_end() {
                    return Err(BasicError::Stx);
                }
            }
        } else if byte.is_ascii_alphabetic() {
            r.seek(r.pos() - 1);
            let_(r, interp)?;
        } else {
            return Err(BasicError::Stx);
        }
        if interp.current.line != line_before {
            return Ok(());
        }
        if !r.skip_blank_read_if(b':') {
            break;
        }
    }
    Ok(())
}

/// Matches and consumes the event-keyword naming an ON .. GOSUB trap. Read
/// as plain ASCII like every other in-statement keyword (`Reader::
/// match_keyword`'s convention) rather than via the statement-opening
/// token byte, since here the word follows `ON`, not a statement boundary.
fn try_event_keyword(r: &mut Reader) -> Option<EventKind> {
    if r.match_keyword("KEY") {
        Some(EventKind::Key)
    } else if r.match_keyword("PEN") {
        Some(EventKind::Pen)
    } else if r.match_keyword("TIMER") {
        Some(EventKind::Timer)
    } else if r.match_keyword("PLAY") {
        Some(EventKind::Play)
    } else if r.match_keyword("COM") {
        Some(EventKind::Com)
    } else if r.match_keyword("STRIG") {
        Some(EventKind::Strig)
    } else {
        None
    }
}

// ---------------------------------------------------------------------
// control flow

pub fn end_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    r.require_end()?;
    interp.running = false;
    Ok(TerminationOrder::Before)
}

pub fn stop_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    r.require_end()?;
    interp.stop_();
    Ok(TerminationOrder::Before)
}

pub fn system_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    r.require_end()?;
    interp.running = false;
    collab.session().system();
    Ok(TerminationOrder::Before)
}

pub fn new_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    r.require_end()?;
    interp.new_();
    Ok(TerminationOrder::Before)
}

/// PCjr/Tandy `TERM`: drops into the terminal emulator cartridge. No
/// arguments; checked before the side effect like the other process-exit
/// statements (END/STOP/SYSTEM/NEW).
pub fn term_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    r.require_end()?;
    interp.running = false;
    collab.session().term();
    Ok(TerminationOrder::Before)
}

pub fn cont_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let _ = r;
    interp.cont_()?;
    Ok(TerminationOrder::After)
}

pub fn tron_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let _ = r;
    interp.trace_on = true;
    Ok(TerminationOrder::After)
}

pub fn troff_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let _ = r;
    interp.trace_on = false;
    Ok(TerminationOrder::After)
}

pub fn reset_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let _ = (r, interp);
    Ok(TerminationOrder::After)
}

pub fn data_(r: &mut Reader) -> Result<TerminationOrder> {
    r.skip_to_end_of_statement();
    Ok(TerminationOrder::Before)
}

pub fn rem_(r: &mut Reader) -> Result<TerminationOrder> {
    r.skip_to_end_of_line();
    Ok(TerminationOrder::Before)
}

pub fn else_(r: &mut Reader) -> Result<TerminationOrder> {
    r.skip_to_end_of_line();
    Ok(TerminationOrder::Before)
}

pub fn goto_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let n = read_jumpnum(r)?;
    r.require_end()?;
    interp.jump(n)?;
    Ok(TerminationOrder::Before)
}

pub fn gosub_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let n = read_jumpnum(r)?;
    r.require_end()?;
    let return_to = Position { line: interp.current.line, pos: r.pos() };
    interp.jump_sub(n, return_to)?;
    Ok(TerminationOrder::Before)
}

pub fn return_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    r.skip_blank();
    let line = if r.at_statement_end() { None } else { Some(read_jumpnum(r)?) };
    r.require_end()?;
    interp.return_(line)?;
    Ok(TerminationOrder::Before)
}

pub fn restore_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    r.skip_blank();
    let line = if r.at_statement_end() { None } else { Some(read_jumpnum(r)?) };
    r.require_end()?;
    interp.restore_(line)?;
    Ok(TerminationOrder::Before)
}

pub fn if_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let cond = expr::parse_expression(r, interp)?.to_type('!')?;
    r.skip_blank_read_if(b',');
    if !r.match_keyword("THEN") {
        r.require_keyword("GOTO")?;
    }
    if !cond.is_zero() {
        execute_then_branch(r, interp, collab)?;
    } else if skip_to_else(r) {
        execute_then_branch(r, interp, collab)?;
    }
    Ok(TerminationOrder::Before)
}

pub fn for_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let name = expr::parse_name(r);
    r.require(b'=')?;
    let completed = interp.memory.complete_name(&name);
    let sigil = completed.chars().last().unwrap();
    let start = expr::parse_expression(r, interp)?.to_type(sigil)?;
    r.require_keyword("TO")?;
    // Only raised once TO has been consumed, matching the upstream
    // `exec_for`'s ordering: checked before the stop expression is even
    // parsed, not after.
    if sigil == '$' || sigil == '#' {
        return Err(BasicError::TypeMismatch);
    }
    let stop_v = expr::parse_expression(r, interp)?;
    let step = if r.match_keyword("STEP") { Some(expr::parse_expression(r, interp)?) } else { None };
    r.require_end()?;
    let body_start = Position { line: interp.current.line, pos: r.pos() };
    interp.for_(&completed, start, stop_v, step, body_start)?;
    Ok(TerminationOrder::Before)
}

pub fn next_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    loop {
        r.skip_blank();
        let name = if r.peek().is_ascii_alphabetic() { Some(expr::parse_name(r)) } else { None };
        let finished = interp.next_(name.as_deref())?;
        if !finished {
            return Ok(TerminationOrder::Before);
        }
        if !r.skip_blank_read_if(b',') {
            break;
        }
    }
    r.require_end()?;
    Ok(TerminationOrder::Before)
}

pub fn while_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let start = interp.current;
    let cond = expr::parse_expression(r, interp)?;
    r.require_end()?;
    if !cond.is_zero() {
        if !interp.while_active(start) {
            interp.while_(start);
        }
    } else {
        if interp.while_active(start) {
            interp.wend_done();
        }
        skip_to_matching_wend(interp)?;
    }
    Ok(TerminationOrder::Before)
}

pub fn wend_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    r.require_end()?;
    interp.wend_()?;
    Ok(TerminationOrder::Before)
}

pub fn on_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    if r.match_keyword("ERROR") {
        r.require_keyword("GOTO")?;
        let n = read_jumpnum(r)?;
        r.require_end()?;
        interp.on_error_goto(n);
        return Ok(TerminationOrder::Before);
    }
    if let Some(kind) = try_event_keyword(r) {
        let num = if r.skip_blank_read_if(b'(') {
            let n = eval_int(r, interp)?;
            r.require(b')')?;
            Some(n)
        } else {
            None
        };
        r.require_keyword("GOSUB")?;
        let target = read_jumpnum(r)?;
        r.require_end()?;
        if target != 0 && !interp.program_has_line(target) {
            return Err(BasicError::UndefinedLineNumber);
        }
        collab.events().on_event_gosub(kind, num, if target == 0 { None } else { Some(target) });
        return Ok(TerminationOrder::Before);
    }
    let n = eval_int(r, interp)?;
    crate::error::range_check(0, 255, n)?;
    let is_gosub = if r.match_keyword("GOSUB") {
        true
    } else {
        r.require_keyword("GOTO")?;
        false
    };
    if n == 0 || n == 255 {
        // Fall through: the whole list still has to be parsed and
        // validated, even though nothing is jumped to.
        loop {
            read_jumpnum(r)?;
            if !r.skip_blank_read_if(b',') {
                break;
            }
        }
        r.require_end()?;
        return Ok(TerminationOrder::Before);
    }
    // Skip the first n-1 jumpnums, consume the n-th, and jump immediately —
    // any targets after it are never parsed or validated.
    for _ in 1..n {
        read_jumpnum(r)?;
        r.require(b',')?;
    }
    let target = read_jumpnum(r)?;
    if is_gosub {
        let return_to = Position { line: interp.current.line, pos: r.pos() };
        interp.jump_sub(target, return_to)?;
    } else {
        interp.jump(target)?;
    }
    Ok(TerminationOrder::Before)
}

pub fn error_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let n = eval_int(r, interp)?;
    r.require_end()?;
    Err(code_to_error(n as u8))
}

pub fn resume_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    r.skip_blank();
    let kind = if r.at_statement_end() {
        ResumeKind::Same
    } else if r.match_keyword("NEXT") {
        ResumeKind::Next
    } else {
        ResumeKind::Line(read_jumpnum(r)?)
    };
    r.require_end()?;
    interp.resume(kind)?;
    Ok(TerminationOrder::Before)
}

// ---------------------------------------------------------------------
// data / variables

pub fn read_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    loop {
        let (name, indices) = expr::parse_lvalue(r, interp)?;
        let text = interp.read_()?;
        let sigil = interp.memory.complete_name(&name).chars().last().unwrap();
        let value = parse_data_value(&text, sigil)?;
        assign_lvalue(interp, &name, indices, value)?;
        if !r.skip_blank_read_if(b',') {
            break;
        }
    }
    r.require_end()?;
    Ok(TerminationOrder::Before)
}

pub fn dim_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    loop {
        let name = expr::parse_name(r);
        let dims = expr::parse_index_list(r, interp)?;
        interp.memory.dim_array(&name, dims)?;
        if !r.skip_blank_read_if(b',') {
            break;
        }
    }
    r.require_end()?;
    Ok(TerminationOrder::Before)
}

pub fn swap_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let a = expr::parse_name(r);
    r.require(b',')?;
    let b = expr::parse_name(r);
    r.require_end()?;
    interp.memory.swap_var(&a, &b)?;
    Ok(TerminationOrder::Before)
}

pub fn erase_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let mut names = Vec::new();
    loop {
        names.push(expr::parse_name(r));
        if !r.skip_blank_read_if(b',') {
            break;
        }
    }
    r.require_end()?;
    for n in names {
        interp.memory.erase_array(&n)?;
    }
    Ok(TerminationOrder::Before)
}

pub fn option_base_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    r.require_keyword("BASE")?;
    r.skip_blank();
    let b = r.advance();
    if b != b'0' && b != b'1' {
        return Err(BasicError::Stx);
    }
    r.require_end()?;
    interp.memory.base_array((b - b'0') as i32)?;
    Ok(TerminationOrder::Before)
}

pub fn randomize_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    if !r.at_statement_end() {
        let _ = expr::parse_expression(r, interp)?;
    }
    r.require_end()?;
    Ok(TerminationOrder::Before)
}

pub fn deftype_(r: &mut Reader, interp: &mut Interpreter, sigil: char) -> Result<TerminationOrder> {
    loop {
        r.skip_blank();
        let first = r.advance().to_ascii_uppercase();
        if !first.is_ascii_alphabetic() {
            return Err(BasicError::Stx);
        }
        let last = if r.skip_blank_read_if(b'-') {
            let c = r.advance().to_ascii_uppercase();
            if !c.is_ascii_alphabetic() {
                return Err(BasicError::Stx);
            }
            c
        } else {
            first
        };
        for letter in first..=last {
            interp.memory.set_default_type(letter, sigil);
        }
        if !r.skip_blank_read_if(b',') {
            break;
        }
    }
    r.require_end()?;
    Ok(TerminationOrder::Before)
}

pub fn common_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let mut names = Vec::new();
    loop {
        let name = expr::parse_name(r);
        if r.skip_blank_read_if(b'(') {
            r.require(b')')?;
        }
        names.push(name);
        if !r.skip_blank_read_if(b',') {
            break;
        }
    }
    r.require_end()?;
    interp.common_(&names);
    Ok(TerminationOrder::Before)
}

pub fn lset_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let name = expr::parse_name(r);
    r.require(b'=')?;
    let value = eval_string(r, interp)?;
    r.require_end()?;
    assign_justified(interp, &name, &value, true)
}

pub fn rset_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let name = expr::parse_name(r);
    r.require(b'=')?;
    let value = eval_string(r, interp)?;
    r.require_end()?;
    assign_justified(interp, &name, &value, false)
}

/// `MID$(stringvar$, start%[, length%]) = stringexpr$`: splices bytes of
/// `stringexpr$` into `stringvar$` in place, starting at the 1-based
/// `start%`, without growing or shrinking the target. `length%` caps how
/// many bytes are copied; it defaults to the replacement's own length.
/// `start%` outside `1..=len` (for a nonempty target) is Illegal Function
/// Call; an empty target accepts no replacement at all since there is
/// nothing to splice into.
pub fn mid_s_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let name = expr::parse_name(r);
    r.require(b'(')?;
    let start = eval_int(r, interp)?;
    let length = if r.skip_blank_read_if(b',') { Some(eval_int(r, interp)?) } else { None };
    r.require(b')')?;
    r.require(b'=')?;
    let replacement = eval_string(r, interp)?;
    r.require_end()?;

    let current = interp.memory.get_var(&name);
    let mut bytes = match current {
        Value::Str(s) => s.as_bytes().to_vec(),
        _ => return Err(BasicError::TypeMismatch),
    };
    if start < 1 || (start as usize) > bytes.len().max(1) {
        return Err(BasicError::IllegalFunctionCall);
    }
    let start = start as usize - 1;
    let max_len = bytes.len().saturating_sub(start);
    let copy_len = length
        .map(|l| l.max(0) as usize)
        .unwrap_or(replacement.len())
        .min(replacement.len())
        .min(max_len);
    bytes[start..start + copy_len].copy_from_slice(&replacement.as_bytes()[..copy_len]);
    interp.memory.set_var(&name, Value::Str(BasicString::new(bytes)))?;
    Ok(TerminationOrder::Before)
}

fn assign_justified(interp: &mut Interpreter, name: &str, value: &str, left: bool) -> Result<TerminationOrder> {
    let current = interp.memory.get_var(name);
    let width = match &current {
        Value::Str(s) if !s.is_empty() => s.len(),
        _ => value.len(),
    };
    let mut bytes = value.as_bytes().to_vec();
    bytes.truncate(width);
    if bytes.len() < width {
        let pad = vec![b' '; width - bytes.len()];
        if left {
            bytes.extend(pad);
        } else {
            let mut padded = pad;
            padded.extend(bytes);
            bytes = padded;
        }
    }
    interp.memory.set_var(name, Value::Str(BasicString::new(bytes)))?;
    Ok(TerminationOrder::Before)
}

pub fn environ_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let _s = eval_string(r, interp)?;
    r.require_end()?;
    Ok(TerminationOrder::Before)
}

// ---------------------------------------------------------------------
// DEF FN / USR / SEG, POKE/OUT/WAIT, CALL

pub fn def_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    if r.match_keyword("FN") {
        if !interp.running {
            return Err(BasicError::IllegalDirect);
        }
        let name = format!("FN{}", expr::parse_name(r));
        let mut params = Vec::new();
        if r.skip_blank_read_if(b'(') {
            loop {
                params.push(expr::parse_name(r));
                if !r.skip_blank_read_if(b',') {
                    break;
                }
            }
            r.require(b')')?;
        }
        r.require(b'=')?;
        let body_start = r.pos();
        r.skip_to_end_of_statement();
        let body = String::from_utf8_lossy(r.bytes_slice(body_start, r.pos())).into_owned();
        r.require_end()?;
        interp.def_fn(name, params, body);
        return Ok(TerminationOrder::Before);
    }
    if r.match_keyword("USR") {
        let slot = if r.peek().is_ascii_digit() { r.advance() - b'0' } else { 0 };
        r.require(b'=')?;
        let addr = eval_int(r, interp)? as u32;
        r.require_end()?;
        collab.all_memory().def_usr(slot, addr);
        return Ok(TerminationOrder::Before);
    }
    r.require_keyword("SEG")?;
    let seg = if r.skip_blank_read_if(b'=') { Some(eval_int(r, interp)? as u32) } else { None };
    r.require_end()?;
    interp.current_segment = seg;
    collab.all_memory().def_seg(seg);
    Ok(TerminationOrder::Before)
}

pub fn poke_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let addr = eval_int(r, interp)? as i64;
    r.require(b',')?;
    let val = eval_int(r, interp)?;
    r.require_end()?;
    collab.all_memory().poke(addr, val as u8)?;
    Ok(TerminationOrder::Before)
}

pub fn out_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let _port = eval_int(r, interp)?;
    r.require(b',')?;
    let _val = eval_int(r, interp)?;
    r.require_end()?;
    Ok(TerminationOrder::Before)
}

pub fn wait_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let _port = eval_int(r, interp)?;
    r.require(b',')?;
    let _mask = eval_int(r, interp)?;
    if r.skip_blank_read_if(b',') {
        let _xor = eval_int(r, interp)?;
    }
    r.require_end()?;
    Ok(TerminationOrder::Before)
}

pub fn call_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let _name = expr::parse_name(r);
    let mut args = Vec::new();
    if r.skip_blank_read_if(b'(') {
        if r.peek() != b')' {
            loop {
                args.push(expr::parse_expression(r, interp)?);
                if !r.skip_blank_read_if(b',') {
                    break;
                }
            }
        }
        r.require(b')')?;
    }
    r.require_end()?;
    collab.all_memory().call(0, &args)?;
    Ok(TerminationOrder::Before)
}

pub fn bsave_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let name = eval_string(r, interp)?;
    r.require(b',')?;
    let offset = eval_int(r, interp)? as u32;
    r.require(b',')?;
    let length = eval_int(r, interp)? as u32;
    r.require_end()?;
    collab.all_memory().bsave(&name, offset, length)?;
    Ok(TerminationOrder::Before)
}

pub fn bload_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let name = eval_string(r, interp)?;
    let offset = if r.skip_blank_read_if(b',') { Some(eval_int(r, interp)? as u32) } else { None };
    r.require_end()?;
    collab.all_memory().bload(&name, offset)?;
    Ok(TerminationOrder::Before)
}

// ---------------------------------------------------------------------
// PRINT / LPRINT / WRITE / INPUT / LINE INPUT

pub fn print_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    if r.skip_blank_read_if(b'#') {
        let n = eval_int(r, interp)? as u8;
        r.require(b',')?;
        let (text, suppress) = build_print_list(r, interp)?;
        r.require_end()?;
        let line = if suppress { text } else { format!("{text}\n") };
        collab.files().print(n, &line)?;
        return Ok(TerminationOrder::Before);
    }
    let (text, suppress) = build_print_list(r, interp)?;
    r.require_end()?;
    let line = if suppress { text } else { format!("{text}\n") };
    collab.screen().print_str(&line);
    Ok(TerminationOrder::Before)
}

pub fn lprint_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let (text, suppress) = build_print_list(r, interp)?;
    r.require_end()?;
    let line = if suppress { text } else { format!("{text}\n") };
    collab.files().lprint(&line);
    Ok(TerminationOrder::Before)
}

pub fn write_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let file_num = if r.skip_blank_read_if(b'#') {
        let n = eval_int(r, interp)? as u8;
        r.require(b',')?;
        Some(n)
    } else {
        None
    };
    let mut fields = Vec::new();
    if !r.at_statement_end() {
        loop {
            let v = expr::parse_expression(r, interp)?;
            fields.push(write_format(&v));
            if !r.skip_blank_read_if(b',') {
                break;
            }
        }
    }
    r.require_end()?;
    match file_num {
        Some(n) => {
            collab.files().write(n, &fields)?;
        }
        None => {
            collab.screen().print_str(&format!("{}\n", fields.join(",")));
        }
    }
    Ok(TerminationOrder::Before)
}

pub fn input_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    if r.skip_blank_read_if(b'#') {
        let _n = eval_int(r, interp)?;
        r.require(b',')?;
        loop {
            let (name, indices) = expr::parse_lvalue(r, interp)?;
            let sigil = interp.memory.complete_name(&name).chars().last().unwrap();
            let line = collab.session().input_line("").unwrap_or_default();
            let value = parse_data_value(&line, sigil)?;
            assign_lvalue(interp, &name, indices, value)?;
            if !r.skip_blank_read_if(b',') {
                break;
            }
        }
        r.require_end()?;
        return Ok(TerminationOrder::Before);
    }
    let mut prompt = String::new();
    let mut keep_qmark = false;
    if r.peek() == b'"' {
        prompt = string_literal(r)?;
        r.skip_blank();
        if r.peek() == b';' {
            r.advance();
            keep_qmark = true;
        } else {
            r.require(b',')?;
        }
    } else {
        keep_qmark = true;
    }
    let full_prompt = if keep_qmark { format!("{prompt}? ") } else { prompt };
    loop {
        let (name, indices) = expr::parse_lvalue(r, interp)?;
        let sigil = interp.memory.complete_name(&name).chars().last().unwrap();
        let line = collab.session().input_line(&full_prompt).unwrap_or_default();
        let value = parse_data_value(&line, sigil)?;
        assign_lvalue(interp, &name, indices, value)?;
        if !r.skip_blank_read_if(b',') {
            break;
        }
    }
    r.require_end()?;
    Ok(TerminationOrder::Before)
}

fn line_input_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    if r.skip_blank_read_if(b'#') {
        let _n = eval_int(r, interp)?;
        r.require(b',')?;
        let (name, indices) = expr::parse_lvalue(r, interp)?;
        let line = collab.session().input_line("").unwrap_or_default();
        assign_lvalue(interp, &name, indices, Value::Str(BasicString::from(line.as_str())))?;
        r.require_end()?;
        return Ok(TerminationOrder::Before);
    }
    let mut prompt = String::new();
    if r.peek() == b'"' {
        prompt = string_literal(r)?;
        r.skip_blank_read_if(b';');
    }
    let (name, indices) = expr::parse_lvalue(r, interp)?;
    let line = collab.session().input_line(&prompt).unwrap_or_default();
    assign_lvalue(interp, &name, indices, Value::Str(BasicString::from(line.as_str())))?;
    r.require_end()?;
    Ok(TerminationOrder::Before)
}

// ---------------------------------------------------------------------
// LINE (graphics / LINE INPUT dual dispatch), VIEW, WINDOW, PALETTE

pub fn line_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    if r.match_keyword("INPUT") {
        return line_input_(r, interp, collab);
    }
    if r.skip_blank_read_if(b'#') {
        let _n = eval_int(r, interp)?;
        r.require(b',')?;
    }
    let _ = r.match_keyword("STEP");
    let (x1, y1) = if r.peek() == b'(' { parse_point(r, interp)? } else { (0, 0) };
    r.require(b'-')?;
    let _ = r.match_keyword("STEP");
    let (x2, y2) = parse_point(r, interp)?;
    let mut color = -1;
    let mut filled = false;
    if r.skip_blank_read_if(b',') {
        if r.peek() != b',' {
            color = eval_int(r, interp)?;
        }
        if r.skip_blank_read_if(b',') {
            r.skip_blank();
            if r.match_keyword("BF") {
                filled = true;
            } else {
                let _ = r.match_keyword("B");
            }
        }
    }
    r.require_end()?;
    collab.screen().line(x1, y1, x2, y2, color, filled);
    Ok(TerminationOrder::Before)
}

pub fn view_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    if r.match_keyword("PRINT") {
        if !r.at_statement_end() {
            let _top = eval_int(r, interp)?;
            r.require_keyword("TO")?;
            let _bottom = eval_int(r, interp)?;
        }
        r.require_end()?;
        log::trace!("VIEW PRINT");
        return Ok(TerminationOrder::Before);
    }
    let _ = r.match_keyword("SCREEN");
    if r.at_statement_end() {
        r.require_end()?;
        collab.screen().view(0, 0, 0, 0);
        return Ok(TerminationOrder::Before);
    }
    let (x1, y1) = parse_point(r, interp)?;
    r.require(b'-')?;
    let (x2, y2) = parse_point(r, interp)?;
    if r.skip_blank_read_if(b',') {
        let _color = eval_int(r, interp)?;
        if r.skip_blank_read_if(b',') {
            let _border = eval_int(r, interp)?;
        }
    }
    r.require_end()?;
    collab.screen().view(x1, y1, x2, y2);
    Ok(TerminationOrder::Before)
}

pub fn window_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let _ = r.match_keyword("SCREEN");
    if r.at_statement_end() {
        r.require_end()?;
        collab.screen().window(0.0, 0.0, 0.0, 0.0);
        return Ok(TerminationOrder::Before);
    }
    r.require(b'(')?;
    let x1 = values::to_f64(&expr::parse_expression(r, interp)?)?;
    r.require(b',')?;
    let y1 = values::to_f64(&expr::parse_expression(r, interp)?)?;
    r.require(b')')?;
    r.require(b'-')?;
    r.require(b'(')?;
    let x2 = values::to_f64(&expr::parse_expression(r, interp)?)?;
    r.require(b',')?;
    let y2 = values::to_f64(&expr::parse_expression(r, interp)?)?;
    r.require(b')')?;
    r.require_end()?;
    collab.screen().window(x1, y1, x2, y2);
    Ok(TerminationOrder::Before)
}

pub fn palette_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    if r.match_keyword("USING") {
        let name = expr::parse_name(r);
        let _indices = expr::parse_index_list(r, interp)?;
        r.require_end()?;
        log::trace!("PALETTE USING {name}");
        return Ok(TerminationOrder::Before);
    }
    if r.at_statement_end() {
        r.require_end()?;
        collab.screen().palette(-1, -1);
        return Ok(TerminationOrder::Before);
    }
    let attr = eval_int(r, interp)?;
    r.require(b',')?;
    let colour = eval_int(r, interp)?;
    r.require_end()?;
    collab.screen().palette(attr, colour);
    Ok(TerminationOrder::Before)
}

// ---------------------------------------------------------------------
// screen / sound / graphics statements

pub fn cls_(r: &mut Reader, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    r.require_end()?;
    collab.screen().cls();
    Ok(TerminationOrder::Before)
}

pub fn beep_(r: &mut Reader, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    r.require_end()?;
    collab.sound().beep();
    Ok(TerminationOrder::Before)
}

pub fn width_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    if r.skip_blank_read_if(b'#') {
        let n = eval_int(r, interp)? as u8;
        r.require(b',')?;
        let cols = eval_int(r, interp)?;
        r.require_end()?;
        collab.files().width_file(n, cols);
        return Ok(TerminationOrder::Before);
    }
    if r.match_keyword("LPRINT") {
        let cols = eval_int(r, interp)?;
        r.require_end()?;
        collab.files().width_file(0, cols);
        return Ok(TerminationOrder::Before);
    }
    if r.peek() == b'"' {
        let _device = string_literal(r)?;
        r.require(b',')?;
        let cols = eval_int(r, interp)?;
        r.require_end()?;
        collab.screen().width(cols, 0);
        return Ok(TerminationOrder::Before);
    }
    let cols = eval_int(r, interp)?;
    let rows = if r.skip_blank_read_if(b',') { eval_int(r, interp)? } else { 0 };
    r.require_end()?;
    collab.screen().width(cols, rows);
    Ok(TerminationOrder::Before)
}

pub fn color_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let fg = if r.at_statement_end() || r.peek() == b',' { -1 } else { eval_int(r, interp)? };
    let bg = if r.skip_blank_read_if(b',') {
        if r.at_statement_end() || r.peek() == b',' { -1 } else { eval_int(r, interp)? }
    } else {
        -1
    };
    let border = if r.skip_blank_read_if(b',') { eval_int(r, interp)? } else { -1 };
    r.require_end()?;
    collab.screen().color(fg, bg, border);
    Ok(TerminationOrder::Before)
}

pub fn locate_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let row = if r.at_statement_end() || r.peek() == b',' { -1 } else { eval_int(r, interp)? };
    let col = if r.skip_blank_read_if(b',') {
        if r.at_statement_end() || r.peek() == b',' { -1 } else { eval_int(r, interp)? }
    } else {
        -1
    };
    while r.skip_blank_read_if(b',') {
        if !(r.at_statement_end() || r.peek() == b',') {
            let _ = eval_int(r, interp)?;
        }
    }
    r.require_end()?;
    collab.screen().locate(row, col);
    Ok(TerminationOrder::Before)
}

pub fn screen_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let mode = if r.at_statement_end() || r.peek() == b',' { 0 } else { eval_int(r, interp)? };
    let mut rest = [0i32; 3];
    for slot in rest.iter_mut() {
        if r.skip_blank_read_if(b',') {
            if !(r.at_statement_end() || r.peek() == b',') {
                *slot = eval_int(r, interp)?;
            }
        } else {
            break;
        }
    }
    r.require_end()?;
    collab.screen().screen_mode(mode, rest[0], rest[1], rest[2]);
    Ok(TerminationOrder::Before)
}

pub fn pset_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let _ = r.match_keyword("STEP");
    let (x, y) = parse_point(r, interp)?;
    let c = if r.skip_blank_read_if(b',') { eval_int(r, interp)? } else { -1 };
    r.require_end()?;
    collab.screen().pset(x, y, c);
    Ok(TerminationOrder::Before)
}

pub fn preset_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let _ = r.match_keyword("STEP");
    let (x, y) = parse_point(r, interp)?;
    let c = if r.skip_blank_read_if(b',') { eval_int(r, interp)? } else { -1 };
    r.require_end()?;
    collab.screen().preset(x, y, c);
    Ok(TerminationOrder::Before)
}

pub fn circle_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let (x, y) = parse_point(r, interp)?;
    r.require(b',')?;
    let rad = eval_int(r, interp)?;
    let color = if r.skip_blank_read_if(b',') { eval_int(r, interp)? } else { -1 };
    while r.skip_blank_read_if(b',') {
        if !(r.at_statement_end() || r.peek() == b',') {
            let _ = expr::parse_expression(r, interp)?;
        }
    }
    r.require_end()?;
    collab.screen().circle(x, y, rad, color);
    Ok(TerminationOrder::Before)
}

pub fn paint_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let (x, y) = parse_point(r, interp)?;
    let color = if r.skip_blank_read_if(b',') { eval_int(r, interp)? } else { -1 };
    if r.skip_blank_read_if(b',') {
        let _border = eval_int(r, interp)?;
    }
    r.require_end()?;
    collab.screen().paint(x, y, color);
    Ok(TerminationOrder::Before)
}

pub fn draw_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let mml = eval_string(r, interp)?;
    r.require_end()?;
    collab.screen().draw(&mml);
    Ok(TerminationOrder::Before)
}

pub fn play_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let mut parts = vec![eval_string(r, interp)?];
    while r.skip_blank_read_if(b',') {
        parts.push(eval_string(r, interp)?);
    }
    r.require_end()?;
    if parts.iter().all(|s| s.is_empty()) {
        return Err(BasicError::MissingOperand);
    }
    collab.sound().play(&parts[0]);
    Ok(TerminationOrder::Before)
}

pub fn sound_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let freq = expr::parse_expression(r, interp)?;
    r.require(b',')?;
    let dur = expr::parse_expression(r, interp)?;
    let volume = if r.skip_blank_read_if(b',') { eval_int(r, interp)? } else { -1 };
    let voice = if r.skip_blank_read_if(b',') { eval_int(r, interp)? } else { 0 };
    r.require_end()?;
    collab.sound().sound(values::to_f64(&freq)?, values::to_f64(&dur)?, volume, voice);
    Ok(TerminationOrder::Before)
}

/// PCjr/Tandy `NOISE source, frequency, duration`: drives the noise
/// channel directly rather than the tone generator SOUND uses. All three
/// arguments are mandatory expressions, comma-separated.
pub fn noise_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let source = eval_int(r, interp)?;
    r.require(b',')?;
    let freq = eval_int(r, interp)?;
    r.require(b',')?;
    let dur = expr::parse_expression(r, interp)?;
    r.require_end()?;
    collab.sound().noise(source, freq, values::to_f64(&dur)?);
    Ok(TerminationOrder::Before)
}

pub fn lcopy_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let range = if r.at_statement_end() {
        None
    } else {
        let a = eval_int(r, interp)?;
        Some((a, a))
    };
    r.require_end()?;
    collab.devices().lcopy(range);
    Ok(TerminationOrder::Before)
}

pub fn pcopy_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let src = eval_int(r, interp)?;
    r.require(b',')?;
    let dst = eval_int(r, interp)?;
    r.require_end()?;
    collab.screen().pcopy(src, dst);
    Ok(TerminationOrder::Before)
}

pub fn motor_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let on = if r.at_statement_end() { true } else { eval_int(r, interp)? != 0 };
    r.require_end()?;
    collab.devices().motor(on);
    Ok(TerminationOrder::Before)
}

// ---------------------------------------------------------------------
// files

pub fn open_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let first = eval_string(r, interp)?;
    r.skip_blank();
    if r.peek() == b',' {
        r.advance();
        let mode = first.chars().next().unwrap_or('I').to_ascii_uppercase();
        r.skip_blank_read_if(b'#');
        let number = eval_int(r, interp)? as u8;
        r.require(b',')?;
        let name = eval_string(r, interp)?;
        let reclen = if r.skip_blank_read_if(b',') { eval_int(r, interp)? as u16 } else { 128 };
        r.require_end()?;
        collab.files().open(&name, mode, 'R', number, reclen)?;
        return Ok(TerminationOrder::Before);
    }
    let name = first;
    let mut mode = 'R';
    if r.match_keyword("FOR") {
        mode = if r.match_keyword("INPUT") {
            'I'
        } else if r.match_keyword("OUTPUT") {
            'O'
        } else if r.match_keyword("APPEND") {
            'A'
        } else if r.match_keyword("RANDOM") {
            'R'
        } else {
            return Err(BasicError::Stx);
        };
    }
    let mut access = 'R';
    if r.match_keyword("ACCESS") {
        access = if r.match_keyword("READ") {
            if r.match_keyword("WRITE") {
                'B'
            } else {
                'R'
            }
        } else if r.match_keyword("WRITE") {
            'W'
        } else {
            return Err(BasicError::Stx);
        };
    }
    if r.match_keyword("LOCK") {
        let _ = r.match_keyword("READ") || r.match_keyword("WRITE") || r.match_keyword("SHARED");
    } else {
        let _ = r.match_keyword("SHARED");
    }
    r.require_keyword("AS")?;
    r.skip_blank_read_if(b'#');
    let number = eval_int(r, interp)? as u8;
    let mut reclen = 128u16;
    if r.skip_blank_read_if(b',') {
        reclen = eval_int(r, interp)? as u16;
    } else if r.match_keyword("LEN") {
        r.skip_blank_read_if(b'=');
        reclen = eval_int(r, interp)? as u16;
    }
    r.require_end()?;
    collab.files().open(&name, mode, access, number, reclen)?;
    Ok(TerminationOrder::Before)
}

pub fn close_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let mut nums = Vec::new();
    if !r.at_statement_end() {
        loop {
            r.skip_blank_read_if(b'#');
            nums.push(eval_int(r, interp)? as u8);
            if !r.skip_blank_read_if(b',') {
                break;
            }
        }
    }
    r.require_end()?;
    if nums.is_empty() {
        collab.files().close(None)?;
    } else {
        for n in nums {
            collab.files().close(Some(n))?;
        }
    }
    Ok(TerminationOrder::Before)
}

pub fn field_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    r.skip_blank_read_if(b'#');
    let n = eval_int(r, interp)? as u8;
    r.require(b',')?;
    let mut layout = Vec::new();
    loop {
        let len = eval_int(r, interp)? as u16;
        r.require_keyword("AS")?;
        let name = expr::parse_name(r);
        layout.push((len, name));
        if !r.skip_blank_read_if(b',') {
            break;
        }
    }
    r.require_end()?;
    collab.files().field(n, &layout)?;
    Ok(TerminationOrder::Before)
}

pub fn lock_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    r.skip_blank_read_if(b'#');
    let n = eval_int(r, interp)? as u8;
    let range = parse_optional_range(r, interp)?;
    r.require_end()?;
    collab.files().lock(n, range)?;
    Ok(TerminationOrder::Before)
}

pub fn unlock_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    r.skip_blank_read_if(b'#');
    let n = eval_int(r, interp)? as u8;
    let range = parse_optional_range(r, interp)?;
    r.require_end()?;
    collab.files().unlock(n, range)?;
    Ok(TerminationOrder::Before)
}

pub fn ioctl_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    r.skip_blank_read_if(b'#');
    let n = eval_int(r, interp)? as u8;
    r.require(b',')?;
    let s = eval_string(r, interp)?;
    r.require_end()?;
    collab.files().ioctl(n, &s)?;
    Ok(TerminationOrder::Before)
}

pub fn get_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    if r.skip_blank_read_if(b'#') {
        let n = eval_int(r, interp)? as u8;
        let record = if r.skip_blank_read_if(b',') { Some(eval_int(r, interp)? as u32) } else { None };
        r.require_end()?;
        collab.files().get_record(n, record)?;
        return Ok(TerminationOrder::Before);
    }
    let (x1, y1) = parse_point(r, interp)?;
    r.require(b'-')?;
    let (x2, y2) = parse_point(r, interp)?;
    r.require(b',')?;
    let name = expr::parse_name(r);
    r.require_end()?;
    collab.screen().get_image(x1, y1, x2, y2, &name);
    Ok(TerminationOrder::Before)
}

pub fn put_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    if r.skip_blank_read_if(b'#') {
        let n = eval_int(r, interp)? as u8;
        let record = if r.skip_blank_read_if(b',') { Some(eval_int(r, interp)? as u32) } else { None };
        r.require_end()?;
        collab.files().put_record(n, record)?;
        return Ok(TerminationOrder::Before);
    }
    let (x, y) = parse_point(r, interp)?;
    r.require(b',')?;
    let name = expr::parse_name(r);
    let mut action = 4;
    if r.skip_blank_read_if(b',') {
        r.skip_blank();
        action = if r.match_keyword("PSET") {
            0
        } else if r.match_keyword("PRESET") {
            1
        } else if r.match_keyword("AND") {
            2
        } else if r.match_keyword("OR") {
            3
        } else {
            let _ = r.match_keyword("XOR");
            4
        };
    }
    r.require_end()?;
    collab.screen().put_image(x, y, &name, action);
    Ok(TerminationOrder::Before)
}

// ---------------------------------------------------------------------
// program management / process control

pub fn run_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    r.skip_blank();
    if r.peek() == b'"' {
        let name = string_literal(r)?;
        let keep = r.skip_blank_read_if(b',') && r.match_keyword("R");
        r.require_end()?;
        collab.session().run(Some(&name), keep);
        return Ok(TerminationOrder::Before);
    }
    let target = if r.at_statement_end() { None } else { Some(read_jumpnum(r)?) };
    r.require_end()?;
    collab.session().run(None, false);
    interp.clear_();
    match target {
        Some(n) => interp.jump(n)?,
        None => interp.current = Position { line: 0, pos: 0 },
    }
    Ok(TerminationOrder::Before)
}

pub fn list_(r: &mut Reader, _interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let (from, to) = parse_line_range(r)?;
    r.require_end()?;
    collab.session().list(from, to);
    Ok(TerminationOrder::Before)
}

pub fn llist_(r: &mut Reader, _interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let (from, to) = parse_line_range(r)?;
    r.require_end()?;
    collab.session().llist(from, to);
    Ok(TerminationOrder::Before)
}

pub fn delete_(r: &mut Reader, _interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let (from, to) = parse_line_range(r)?;
    r.require_end()?;
    collab.session().delete(from, to);
    Ok(TerminationOrder::Before)
}

pub fn edit_(r: &mut Reader, _interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    r.skip_blank();
    let line = if r.at_statement_end() { None } else { Some(read_jumpnum(r)?) };
    r.require_end()?;
    collab.session().edit(line);
    Ok(TerminationOrder::Before)
}

pub fn auto_(r: &mut Reader, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let start = opt_literal_u16(r);
    let incr = if r.skip_blank_read_if(b',') { opt_literal_u16(r) } else { None };
    r.require_end()?;
    collab.session().auto(start, incr);
    Ok(TerminationOrder::Before)
}

pub fn renum_(r: &mut Reader, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let new_start = opt_literal_u16(r);
    let old_start = if r.skip_blank_read_if(b',') { opt_literal_u16(r) } else { None };
    let increment = if r.skip_blank_read_if(b',') { opt_literal_u16(r) } else { None };
    r.require_end()?;
    collab.session().renum(new_start, old_start, increment);
    Ok(TerminationOrder::Before)
}

pub fn load_(r: &mut Reader, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let name = string_literal(r)?;
    let run_after = r.skip_blank_read_if(b',') && r.match_keyword("R");
    r.require_end()?;
    collab.session().load(&name, run_after);
    Ok(TerminationOrder::Before)
}

pub fn merge_(r: &mut Reader, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let name = string_literal(r)?;
    r.require_end()?;
    collab.session().merge(&name);
    Ok(TerminationOrder::Before)
}

pub fn save_(r: &mut Reader, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let name = string_literal(r)?;
    let mode = if r.skip_blank_read_if(b',') {
        r.skip_blank();
        Some(r.advance().to_ascii_uppercase() as char)
    } else {
        None
    };
    r.require_end()?;
    collab.session().save(&name, mode);
    Ok(TerminationOrder::Before)
}

/// CHAIN [MERGE] filename [,[line][,ALL][,DELETE from-to]]. The optional
/// line is parsed as a bare uint16 (not a jumpnum) so it survives RENUM
/// rewriting untouched; an unresolvable DELETE upper bound raises Illegal
/// Function Call rather than silently clamping.
pub fn chain_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let merge = r.match_keyword("MERGE");
    let name = eval_string(r, interp)?;
    let mut all = false;
    let mut delete_range = None;
    if r.skip_blank_read_if(b',') {
        if !(r.at_statement_end() || r.peek() == b',') {
            let _line = eval_int(r, interp)?;
        }
        if r.skip_blank_read_if(b',') {
            if r.match_keyword("ALL") {
                all = true;
            } else if r.match_keyword("DELETE") {
                let from = opt_literal_u16(r).ok_or(BasicError::Stx)?;
                r.require(b'-')?;
                let to = opt_literal_u16(r).ok_or(BasicError::IllegalFunctionCall)?;
                if !interp.program_has_line(to) {
                    return Err(BasicError::IllegalFunctionCall);
                }
                delete_range = Some((from, to));
            }
        }
    }
    r.require_end()?;
    if let Some((from, to)) = delete_range {
        collab.session().delete(Some(from), Some(to));
    }
    collab.session().chain(&name, merge, all);
    Ok(TerminationOrder::Before)
}

pub fn shell_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let cmd = if r.at_statement_end() { None } else { Some(eval_string(r, interp)?) };
    r.require_end()?;
    collab.session().shell(cmd.as_deref());
    Ok(TerminationOrder::Before)
}

pub fn name_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let old = eval_string(r, interp)?;
    r.require_keyword("AS")?;
    let new = eval_string(r, interp)?;
    r.require_end()?;
    collab.devices().name(&old, &new)?;
    Ok(TerminationOrder::Before)
}

pub fn kill_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let name = eval_string(r, interp)?;
    r.require_end()?;
    collab.devices().kill(&name)?;
    Ok(TerminationOrder::Before)
}

pub fn files_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let pattern = if r.at_statement_end() { "*.*".to_string() } else { eval_string(r, interp)? };
    r.require_end()?;
    collab.devices().files(&pattern)?;
    Ok(TerminationOrder::Before)
}

pub fn chdir_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let path = eval_string(r, interp)?;
    r.require_end()?;
    collab.devices().chdir(&path)?;
    Ok(TerminationOrder::Before)
}

pub fn mkdir_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let path = eval_string(r, interp)?;
    r.require_end()?;
    collab.devices().mkdir(&path)?;
    Ok(TerminationOrder::Before)
}

pub fn rmdir_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let path = eval_string(r, interp)?;
    r.require_end()?;
    collab.devices().rmdir(&path)?;
    Ok(TerminationOrder::Before)
}

// ---------------------------------------------------------------------
// events: ON KEY/PEN/TIMER/PLAY/COM/STRIG switches, KEY macros, clock

pub fn key_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    if r.match_keyword("ON") {
        r.require_end()?;
        log::trace!("KEY ON");
        return Ok(TerminationOrder::Before);
    }
    if r.match_keyword("OFF") {
        r.require_end()?;
        log::trace!("KEY OFF");
        return Ok(TerminationOrder::Before);
    }
    if r.match_keyword("LIST") {
        r.require_end()?;
        log::trace!("KEY LIST");
        return Ok(TerminationOrder::Before);
    }
    if r.skip_blank_read_if(b'(') {
        let n = eval_int(r, interp)?;
        r.require(b')')?;
        let cmd = if r.match_keyword("ON") {
            EventCommand::On
        } else if r.match_keyword("OFF") {
            EventCommand::Off
        } else if r.match_keyword("STOP") {
            EventCommand::Stop
        } else {
            return Err(BasicError::Stx);
        };
        r.require_end()?;
        crate::error::range_check(0, 255, n)?;
        collab.events().switch(EventKind::Key, Some(n), cmd);
        return Ok(TerminationOrder::Before);
    }
    let n = eval_int(r, interp)?;
    crate::error::range_check(1, 255, n)?;
    r.require(b',')?;
    let text = eval_string(r, interp)?;
    r.require_end()?;
    let count = collab.events().num_fn_keys();
    if n <= count {
        interp.keyboard.buf.set_macro(n as usize, text.as_bytes());
    } else if text.len() == 2 {
        log::trace!("KEY {n} scancode trap {text:?}");
    } else {
        return Err(BasicError::IllegalFunctionCall);
    }
    Ok(TerminationOrder::Before)
}

pub fn pen_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let _ = interp;
    let cmd = if r.match_keyword("ON") {
        EventCommand::On
    } else if r.match_keyword("OFF") {
        EventCommand::Off
    } else if r.match_keyword("STOP") {
        EventCommand::Stop
    } else {
        return Err(BasicError::Stx);
    };
    r.require_end()?;
    collab.events().switch(EventKind::Pen, None, cmd);
    Ok(TerminationOrder::Before)
}

pub fn com_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    r.require(b'(')?;
    let n = eval_int(r, interp)?;
    r.require(b')')?;
    let cmd = if r.match_keyword("ON") {
        EventCommand::On
    } else if r.match_keyword("OFF") {
        EventCommand::Off
    } else if r.match_keyword("STOP") {
        EventCommand::Stop
    } else {
        return Err(BasicError::Stx);
    };
    r.require_end()?;
    collab.events().switch(EventKind::Com, Some(n), cmd);
    Ok(TerminationOrder::Before)
}

pub fn timer_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let _ = interp;
    let cmd = if r.match_keyword("ON") {
        EventCommand::On
    } else if r.match_keyword("OFF") {
        EventCommand::Off
    } else if r.match_keyword("STOP") {
        EventCommand::Stop
    } else {
        return Err(BasicError::Stx);
    };
    r.require_end()?;
    collab.events().switch(EventKind::Timer, None, cmd);
    Ok(TerminationOrder::Before)
}

pub fn strig_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    if r.skip_blank_read_if(b'(') {
        let n = eval_int(r, interp)?;
        r.require(b')')?;
        let cmd = if r.match_keyword("ON") {
            EventCommand::On
        } else if r.match_keyword("OFF") {
            EventCommand::Off
        } else if r.match_keyword("STOP") {
            EventCommand::Stop
        } else {
            return Err(BasicError::Stx);
        };
        r.require_end()?;
        collab.events().switch(EventKind::Strig, Some(n), cmd);
        return Ok(TerminationOrder::Before);
    }
    let cmd = if r.match_keyword("ON") {
        EventCommand::On
    } else if r.match_keyword("OFF") {
        EventCommand::Off
    } else {
        return Err(BasicError::Stx);
    };
    r.require_end()?;
    collab.stick().strig_statement(0, cmd);
    Ok(TerminationOrder::Before)
}

pub fn date_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    r.require(b'=')?;
    let s = eval_string(r, interp)?;
    r.require_end()?;
    collab.clock().set_date(&s)?;
    Ok(TerminationOrder::Before)
}

pub fn time_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    r.require(b'=')?;
    let s = eval_string(r, interp)?;
    r.require_end()?;
    collab.clock().set_time(&s)?;
    Ok(TerminationOrder::Before)
}

// ---------------------------------------------------------------------
// CLEAR, the extension-introducer `_DEBUG` escape hatch

pub fn clear_(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    if !r.at_statement_end() {
        let _ = expr::parse_expression(r, interp)?;
        if r.skip_blank_read_if(b',') && !r.at_statement_end() {
            let _ = expr::parse_expression(r, interp)?;
            if r.skip_blank_read_if(b',') && !r.at_statement_end() {
                let _ = expr::parse_expression(r, interp)?;
            }
        }
    }
    r.require_end()?;
    interp.clear_();
    Ok(TerminationOrder::Before)
}

/// Reached via `EXTENSION_INTRODUCER`, `EXT_DEBUG` from `dispatcher::step`.
/// No debugger is wired up; this only acknowledges the escape hatch exists
/// so a tokenizer that emits it doesn't hard-fail the whole line.
pub fn debug_(r: &mut Reader, interp: &mut Interpreter, collab: &mut dyn Collaborators) -> Result<TerminationOrder> {
    let _ = (interp, collab);
    r.skip_to_end_of_line();
    Ok(TerminationOrder::Before)
}

// ---------------------------------------------------------------------
// implicit / explicit LET

/// Implicit LET, used directly by `dispatcher::step` for a bare
/// `name = expr` statement; its own trailing-garbage check happens in the
/// dispatcher (implicit LET is always `After`), not here.
pub fn let_(r: &mut Reader, interp: &mut Interpreter) -> std::result::Result<(), BasicError> {
    let (name, indices) = expr::parse_lvalue(r, interp)?;
    r.require(b'=')?;
    let value = expr::parse_expression(r, interp)?;
    assign_lvalue(interp, &name, indices, value)
}

pub fn let_explicit(r: &mut Reader, interp: &mut Interpreter) -> Result<TerminationOrder> {
    let (name, indices) = expr::parse_lvalue(r, interp)?;
    r.require(b'=')?;
    let value = expr::parse_expression(r, interp)?;
    r.require_end()?;
    assign_lvalue(interp, &name, indices, value)?;
    Ok(TerminationOrder::Before)
}
