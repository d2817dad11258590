//! Owned session state and control flow: the `Interpreter` that threads
//! `Memory` explicitly instead of reaching for process-wide globals, plus
//! the FOR/GOSUB/WHILE/ON-ERROR state machines `statements.rs` drives
//! through `interpreter.{goto_,gosub_,...}`.

use std::collections::HashMap;

use crate::error::{BasicError, RaisedError, Result};
use crate::expr::ExprContext;
use crate::interfaces::Collaborators;
use crate::keyboard::Keyboard;
use crate::memory::Memory;
use crate::reader::{Line, Reader};
use crate::values::Value;

/// Where execution currently sits: an index into `program` and a byte
/// offset into that line's body. Kept as indices (not a live `Reader`)
/// so `Interpreter` can be mutated freely between statements without
/// fighting the borrow checker over a cursor that borrows its own field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub pos: usize,
}

struct ForFrame {
    var: String,
    stop: Value,
    step: Value,
    body_start: Position,
}

/// One pending ON ERROR GOTO trap.
#[derive(Default)]
struct ErrorTrap {
    handler_line: Option<u16>,
    active: bool,
    error_position: Option<Position>,
    last_error: Option<BasicError>,
}

pub enum RunOutcome {
    Ended,
    Stopped(Position),
    Uncaught(RaisedError),
}

/// The interpreter's full mutable state for one program: memory, keyboard,
/// the tokenized program, and every control-flow stack. `Interpreter`
/// itself plays the role the reference's module-level globals did; CLEAR
/// resets the parts of it `Memory::clear` covers, NEW resets everything.
pub struct Interpreter {
    pub memory: Memory,
    pub keyboard: Keyboard,
    program: Vec<Line>,
    line_index: HashMap<u16, usize>,
    pub current: Position,
    for_stack: Vec<ForFrame>,
    gosub_stack: Vec<Position>,
    while_stack: Vec<Position>,
    data_items: Vec<(u16, String)>,
    data_cursor: usize,
    error_trap: ErrorTrap,
    pub break_flag: bool,
    pub trace_on: bool,
    pub running: bool,
    /// DEF SEG's current segment; consulted (not enforced) by the
    /// `all_memory` collaborator, since this crate's PEEK/POKE surface is
    /// the variable/array/string model, not a full address space.
    pub current_segment: Option<u32>,
    /// Names retained across CHAIN/RUN by COMMON, applied by `common_`.
    common_names: Vec<String>,
    /// Set by STOP, cleared by CONT; distinguishes "nothing to continue"
    /// (error 17) from a genuine paused position.
    can_continue: bool,
    /// DEF FN definitions: name -> (parameter names, body source text).
    /// Invocation is out of scope (the expression parser that would call
    /// these is an external collaborator); this crate only owns storage so
    /// DEF FN round-trips through DIM-like duplicate-definition checks.
    user_functions: HashMap<String, (Vec<String>, String)>,
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            memory: Memory::new(),
            keyboard: Keyboard::new(),
            program: Vec::new(),
            line_index: HashMap::new(),
            current: Position { line: 0, pos: 0 },
            for_stack: Vec::new(),
            gosub_stack: Vec::new(),
            while_stack: Vec::new(),
            data_items: Vec::new(),
            data_cursor: 0,
            error_trap: ErrorTrap::default(),
            break_flag: false,
            trace_on: false,
            running: false,
            current_segment: None,
            common_names: Vec::new(),
            can_continue: false,
            user_functions: HashMap::new(),
        }
    }

    pub fn program_len(&self) -> usize {
        self.program.len()
    }

    pub fn def_fn(&mut self, name: String, params: Vec<String>, body: String) {
        self.user_functions.insert(name, (params, body));
    }

    pub fn has_user_function(&self, name: &str) -> bool {
        self.user_functions.contains_key(name)
    }

    /// STOP: remember the paused position so CONT can resume from it.
    pub fn stop_(&mut self) {
        self.can_continue = true;
        self.running = false;
    }

    /// CONT: resume after STOP, or raise Can't Continue if nothing paused.
    pub fn cont_(&mut self) -> Result<()> {
        if !self.can_continue {
            return Err(BasicError::CantContinue);
        }
        self.can_continue = false;
        self.running = true;
        Ok(())
    }

    /// Load a freshly tokenized program, replacing any previous one.
    /// Scans DATA statements up front rather than lazily on first
    /// READ/RESTORE, keeping `Interpreter` from needing a second borrow of
    /// `program` while READ is executing.
    pub fn load_program(&mut self, lines: Vec<Line>) {
        self.program = lines;
        self.line_index = self.program.iter().enumerate().map(|(i, l)| (l.number, i)).collect();
        self.data_items = scan_data_items(&self.program);
        self.data_cursor = 0;
        self.current = Position { line: 0, pos: 0 };
        self.for_stack.clear();
        self.gosub_stack.clear();
        self.while_stack.clear();
    }

    pub fn line_number_at(&self, pos: Position) -> Option<u16> {
        self.program.get(pos.line).map(|l| l.number)
    }

    fn line_body(&self, idx: usize) -> &[u8] {
        self.program.get(idx).map(|l| l.body.as_slice()).unwrap_or(&[])
    }

    /// An owned copy of one line's body, so `dispatcher::step` can build a
    /// `Reader` over it while holding `&mut self` for the statement it
    /// dispatches to (avoids a `Reader<'a>` borrowing `self.program` at the
    /// same time the dispatched statement mutates `self`).
    pub fn line_body_at(&self, pos: Position) -> Vec<u8> {
        self.line_body(pos.line).to_vec()
    }

    fn index_of_line(&self, number: u16) -> Result<usize> {
        self.line_index.get(&number).copied().ok_or(BasicError::UndefinedLineNumber)
    }

    pub fn program_has_line(&self, number: u16) -> bool {
        self.line_index.contains_key(&number)
    }

    // -----------------------------------------------------------------
    // control flow primitives (the `interpreter.*` collaborator surface)

    pub fn jump(&mut self, line_number: u16) -> Result<()> {
        let idx = self.index_of_line(line_number)?;
        self.current = Position { line: idx, pos: 0 };
        Ok(())
    }

    pub fn jump_sub(&mut self, line_number: u16, return_to: Position) -> Result<()> {
        self.gosub_stack.push(return_to);
        self.jump(line_number)
    }

    pub fn return_(&mut self, explicit_line: Option<u16>) -> Result<()> {
        let ret = self.gosub_stack.pop().ok_or(BasicError::ReturnWithoutGosub)?;
        match explicit_line {
            Some(n) => self.jump(n),
            None => {
                self.current = ret;
                Ok(())
            }
        }
    }

    pub fn for_(&mut self, var: &str, start: Value, stop: Value, step: Option<Value>, body_start: Position) -> Result<()> {
        self.memory.set_var(var, start)?;
        let step = step.unwrap_or(Value::Integer(1).to_type(var.chars().last().unwrap())?);
        self.for_stack.push(ForFrame { var: var.to_string(), stop, step, body_start });
        Ok(())
    }

    /// Advance the innermost (or named) loop; returns `true` if the loop
    /// is now finished (control should fall through to the statement
    /// after NEXT) and `false` if it jumped back to the loop body.
    pub fn next_(&mut self, varname: Option<&str>) -> Result<bool> {
        let idx = match varname {
            None => self.for_stack.len().checked_sub(1),
            Some(name) => {
                let completed = self.memory.complete_name(name);
                self.for_stack.iter().rposition(|f| f.var == completed)
            }
        }
        .ok_or(BasicError::NextWithoutFor)?;
        // NEXT with a name closes every loop nested inside the named one too.
        self.for_stack.truncate(idx + 1);
        let frame = self.for_stack.last().unwrap();
        let current = self.memory.get_var(&frame.var);
        let stepped = crate::values::value_add(current, frame.step.clone())?;
        self.memory.set_var(&frame.var, stepped.clone())?;
        let finished = loop_finished(&stepped, &frame.stop, &frame.step)?;
        if finished {
            self.for_stack.pop();
            Ok(true)
        } else {
            self.current = frame.body_start;
            Ok(false)
        }
    }

    pub fn while_(&mut self, condition_start: Position) {
        self.while_stack.push(condition_start);
    }

    /// Whether `pos` is already the innermost active loop's condition
    /// position — guards `while_` against pushing a fresh frame every time
    /// a loop body re-executes its own WHILE statement.
    pub fn while_active(&self, pos: Position) -> bool {
        self.while_stack.last() == Some(&pos)
    }

    /// WEND: jump back to re-evaluate the matching WHILE's condition.
    pub fn wend_(&mut self) -> Result<()> {
        let pos = *self.while_stack.last().ok_or(BasicError::Stx)?;
        self.current = pos;
        Ok(())
    }

    pub fn wend_done(&mut self) {
        self.while_stack.pop();
    }

    pub fn on_error_goto(&mut self, line_number: u16) {
        self.error_trap.handler_line = if line_number == 0 { None } else { Some(line_number) };
    }

    pub fn has_error_handler(&self) -> bool {
        self.error_trap.handler_line.is_some()
    }

    /// Trap an error: record where it happened and transfer to the
    /// handler line, unless a trap is already in progress (in which case
    /// it re-raises uncaught rather than entering the handler reentrantly).
    pub fn trap_error(&mut self, error: BasicError, at: Position) -> Result<()> {
        if self.error_trap.active {
            return Err(error);
        }
        let handler = self.error_trap.handler_line.ok_or(error.clone())?;
        self.error_trap.active = true;
        self.error_trap.error_position = Some(at);
        self.error_trap.last_error = Some(error);
        self.jump(handler)
    }

    pub fn resume(&mut self, kind: ResumeKind) -> Result<()> {
        let at = self.error_trap.error_position.take().ok_or(BasicError::CantContinue)?;
        self.error_trap.active = false;
        match kind {
            ResumeKind::Same => {
                self.current = at;
                Ok(())
            }
            ResumeKind::Next => {
                self.current = Position { line: at.line, pos: self.line_body(at.line).len() };
                Ok(())
            }
            ResumeKind::Line(n) => self.jump(n),
        }
    }

    // -----------------------------------------------------------------
    // DATA / READ / RESTORE

    pub fn read_(&mut self) -> Result<String> {
        let item = self.data_items.get(self.data_cursor).cloned().ok_or(BasicError::OutOfData)?;
        self.data_cursor += 1;
        Ok(item.1)
    }

    pub fn restore_(&mut self, line_number: Option<u16>) -> Result<()> {
        match line_number {
            None => {
                self.data_cursor = 0;
                Ok(())
            }
            Some(n) => {
                if !self.program_has_line(n) {
                    return Err(BasicError::UndefinedLineNumber);
                }
                self.data_cursor = self.data_items.iter().position(|(ln, _)| *ln >= n).unwrap_or(self.data_items.len());
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------
    // COMMON / CHAIN / CLEAR / NEW

    pub fn common_(&mut self, names: &[String]) {
        self.common_names.extend_from_slice(names);
    }

    /// CLEAR: reset the memory model, as `Memory::clear` does, without
    /// touching the stored program or control-flow cursor.
    pub fn clear_(&mut self) {
        self.memory.clear();
        self.for_stack.clear();
        self.gosub_stack.clear();
        self.while_stack.clear();
        self.error_trap = ErrorTrap::default();
        self.can_continue = false;
        self.user_functions.clear();
    }

    /// NEW: clear everything, including the stored program.
    pub fn new_(&mut self) {
        self.clear_();
        self.program.clear();
        self.line_index.clear();
        self.data_items.clear();
        self.data_cursor = 0;
        self.common_names.clear();
        self.current = Position { line: 0, pos: 0 };
    }

    /// Run from the current position until END/STOP/falling off the end
    /// of the program, or an uncaught error. The statement loop itself —
    /// fetch one line's body, build a `Reader` over it, dispatch one
    /// statement, write the cursor back — lives in `dispatcher.rs`
    /// (`dispatcher::run`), since it needs the full `Collaborators`
    /// bundle this module doesn't otherwise depend on.
    pub fn at_end(&self) -> bool {
        self.current.line >= self.program.len()
    }

    pub fn advance_past_line(&mut self) {
        self.current = Position { line: self.current.line + 1, pos: 0 };
    }

    pub fn reader_at(&self, pos: Position) -> Reader<'_> {
        let mut r = Reader::new(self.line_body(pos.line));
        r.seek(pos.pos);
        r
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ResumeKind {
    Same,
    Next,
    Line(u16),
}

fn loop_finished(current: &Value, stop: &Value, step: &Value) -> Result<bool> {
    let ascending = !is_negative(step)?;
    let cmp = crate::values::compare_values(current, stop)?;
    Ok(if ascending { cmp == std::cmp::Ordering::Greater } else { cmp == std::cmp::Ordering::Less })
}

fn is_negative(v: &Value) -> Result<bool> {
    Ok(match v {
        Value::Integer(n) => *n < 0,
        Value::Single(s) => {
            let as_int = s.to_int();
            match as_int {
                Ok(n) => n < 0,
                Err(_) => false,
            }
        }
        Value::Double(d) => {
            let as_int = d.to_int();
            match as_int {
                Ok(n) => n < 0,
                Err(_) => false,
            }
        }
        Value::Str(_) => return Err(BasicError::TypeMismatch),
    })
}

impl ExprContext for Interpreter {
    fn get_var(&mut self, name: &str) -> Value {
        self.memory.get_var(name)
    }
    fn get_array(&mut self, name: &str, indices: &[i32]) -> Result<Value> {
        self.memory.get_array(name, indices)
    }
    fn peek(&mut self, address: i64) -> u8 {
        self.memory.peek(address)
    }
    fn var_ptr(&mut self, name: &str, indices: &[i32]) -> i64 {
        self.memory.var_ptr(name, indices)
    }
    fn inkey(&mut self) -> Value {
        let b = self.keyboard.inkey();
        let bytes = if b == 0 { Vec::new() } else { vec![b] };
        Value::Str(crate::values::BasicString::new(bytes))
    }
    fn fre(&mut self) -> i64 {
        self.memory.free_bytes()
    }
}

/// Pull every DATA statement's comma-separated literal text out of the
/// loaded program, tagged with the line it came from, in program order.
/// `statements.rs::parse_data` never executes at runtime (DATA is a
/// dispatch no-op that just skips to the end of its statement); READ
/// instead walks this flattened list.
fn scan_data_items(program: &[Line]) -> Vec<(u16, String)> {
    let mut items = Vec::new();
    for line in program {
        let mut r = Reader::new(&line.body);
        loop {
            r.skip_blank();
            if r.peek() == crate::tokens::DATA {
                r.advance();
                loop {
                    r.skip_blank();
                    let mut text = String::new();
                    let quoted = r.peek() == b'"';
                    if quoted {
                        r.advance();
                        while r.peek() != b'"' && !r.at_end() {
                            text.push(r.advance() as char);
                        }
                        if r.peek() == b'"' {
                            r.advance();
                        }
                    } else {
                        while !matches!(r.peek(), b',' | 0x00 | b':') {
                            text.push(r.advance() as char);
                        }
                        text = text.trim().to_string();
                    }
                    items.push((line.number, text));
                    if !r.skip_blank_read_if(b',') {
                        break;
                    }
                }
            }
            if r.at_statement_end() {
                if r.peek() == b':' {
                    r.advance();
                    continue;
                }
                break;
            }
            r.advance();
        }
    }
    items
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
