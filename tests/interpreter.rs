//! End-to-end scenarios driving the dispatcher over hand-assembled line
//! records, the same way `statements.rs`'s own unit tests exercise one
//! parser at a time but across a whole tiny program. No tokenizer exists in
//! this crate (that boundary is out of scope), so each test builds its
//! `Line` bytes directly: statement keywords as their `tokens::*` byte,
//! everything else (variable names, numeric/string literals, in-statement
//! keywords like THEN/TO/STEP) as plain ASCII, exactly as `Reader` expects
//! to read it back.

use gwbasic::interfaces::{Collaborators, NullHost};
use gwbasic::{dispatcher, tokens, Interpreter, Line};

fn stmt(token: u8, rest: &[u8]) -> Vec<u8> {
    let mut body = vec![token];
    body.extend_from_slice(rest);
    body
}

fn run(lines: Vec<Line>) -> (Interpreter, NullHost) {
    let mut interp = Interpreter::new();
    interp.load_program(lines);
    let mut host = NullHost::new();
    dispatcher::run(&mut interp, &mut host).unwrap();
    (interp, host)
}

fn try_run(lines: Vec<Line>) -> (Interpreter, NullHost, gwbasic::Result<()>) {
    let mut interp = Interpreter::new();
    interp.load_program(lines);
    let mut host = NullHost::new();
    let result = dispatcher::run(&mut interp, &mut host);
    (interp, host, result)
}

#[test]
fn adds_two_variables_and_prints_the_sum() {
    let mut body = b"A=2:B=3:".to_vec();
    body.extend(stmt(tokens::PRINT, b"A+B"));
    let (_interp, host) = run(vec![Line { number: 10, body }]);
    assert_eq!(host.printed.concat(), " 5 \n");
}

#[test]
fn two_dimensional_array_element_round_trips_through_print() {
    let mut body = stmt(tokens::DIM, b"A(2,3):");
    body.extend(b"A(2,3)=7:");
    body.extend(stmt(tokens::PRINT, b"A(2,3),A(0,0)"));
    let (_interp, host) = run(vec![Line { number: 10, body }]);
    let pad = " ".repeat(14 - (" 7 ".len() % 14));
    assert_eq!(host.printed.concat(), format!(" 7 {pad} 0 \n"));
}

#[test]
fn on_goto_dispatches_to_the_nth_target_line() {
    let line10 = Line { number: 10, body: stmt(tokens::ON, b"2 GOTO 100,200,300") };
    let mut end100 = stmt(tokens::PRINT, b"\"ONE\"");
    end100.push(b':');
    end100.push(tokens::END);
    let mut end200 = stmt(tokens::PRINT, b"\"TWO\"");
    end200.push(b':');
    end200.push(tokens::END);
    let mut end300 = stmt(tokens::PRINT, b"\"THREE\"");
    end300.push(b':');
    end300.push(tokens::END);
    let (_interp, host) = run(vec![
        line10,
        Line { number: 100, body: end100 },
        Line { number: 200, body: end200 },
        Line { number: 300, body: end300 },
    ]);
    assert_eq!(host.printed.concat(), "TWO\n");
}

#[test]
fn single_line_if_then_else_takes_the_false_branch() {
    let mut body = stmt(tokens::IF, b"0 THEN ");
    body.push(tokens::PRINT);
    body.extend(b"\"X\"");
    body.push(tokens::ELSE);
    body.push(tokens::PRINT);
    body.extend(b"\"Y\"");
    let (_interp, host) = run(vec![Line { number: 10, body }]);
    assert_eq!(host.printed.concat(), "Y\n");
}

#[test]
fn key_macro_expands_on_the_function_key_that_defines_it() {
    let body = stmt(tokens::KEY, b"1,\"PRINT 1\"");
    let (mut interp, _host) = run(vec![Line { number: 10, body }]);

    // F1's eascii code (0x3b) arrives as an ordinary keydown; the ring
    // buffer expands it against the macro KEY 1 just installed.
    interp.keyboard.key_down(0x3b, Some(0x3b), &[], true);
    let mut expanded = Vec::new();
    loop {
        let c = interp.keyboard.inkey();
        if c == 0 {
            break;
        }
        expanded.push(c);
    }
    assert_eq!(expanded, b"PRINT 1");
}

#[test]
fn peek_of_a_string_varptr_recovers_its_length_byte() {
    let mut body = b"A$=\"HELLO\":".to_vec();
    body.extend(stmt(tokens::PRINT, b"PEEK(VARPTR(A$))"));
    let (_interp, host) = run(vec![Line { number: 10, body }]);
    assert_eq!(host.printed.concat(), " 5 \n");
}

#[test]
fn on_error_goto_traps_a_division_by_zero_and_resumes_next() {
    let line10 = Line { number: 10, body: stmt(tokens::ON, b"ERROR GOTO 100") };
    let line20 = Line { number: 20, body: b"X=1/0".to_vec() };
    let mut line100 = stmt(tokens::PRINT, b"\"TRAPPED\"");
    line100.push(b':');
    line100.extend(stmt(tokens::RESUME, b"NEXT"));
    let line30 = Line { number: 30, body: stmt(tokens::PRINT, b"\"AFTER\"") };
    let (_interp, host) = run(vec![line10, line20, Line { number: 100, body: line100 }, line30]);
    assert_eq!(host.printed.concat(), "TRAPPED\nAFTER\n");
}

#[test]
fn for_next_loop_sums_one_through_five() {
    let mut body = stmt(tokens::FOR, b"I=1 TO 5:");
    body.extend(b"S=S+I:");
    body.push(tokens::NEXT);
    body.push(b':');
    body.extend(stmt(tokens::PRINT, b"S"));
    let (_interp, host) = run(vec![Line { number: 10, body }]);
    assert_eq!(host.printed.concat(), " 15 \n");
}

#[test]
fn division_prints_the_fractional_result_instead_of_rounding_to_zero() {
    let body = stmt(tokens::PRINT, b"1/4");
    let (_interp, host) = run(vec![Line { number: 10, body }]);
    assert_eq!(host.printed.concat(), " .25 \n");
}

#[test]
fn decimal_literal_prints_its_fractional_digits() {
    let body = stmt(tokens::PRINT, b"3.14");
    let (_interp, host) = run(vec![Line { number: 10, body }]);
    assert_eq!(host.printed.concat(), " 3.14 \n");
}

#[test]
fn power_operator_prints_a_fractional_result() {
    let body = stmt(tokens::PRINT, b"2^0.5");
    let (_interp, host) = run(vec![Line { number: 10, body }]);
    assert_eq!(host.printed.concat(), " 1.414213562373095 \n");
}

#[test]
fn for_loop_rejects_a_double_sigil_variable() {
    let body = stmt(tokens::FOR, b"I#=1 TO 5");
    let line10 = Line { number: 10, body };
    let (_interp, _host, result) = try_run(vec![line10]);
    assert_eq!(result, Err(gwbasic::BasicError::TypeMismatch));
}

#[test]
fn uncaught_error_without_a_handler_propagates_to_the_caller() {
    let line10 = Line { number: 10, body: b"X=1/0".to_vec() };
    let (interp, _host, result) = try_run(vec![line10]);
    assert_eq!(result, Err(gwbasic::BasicError::DivisionByZero));
    assert_eq!(interp.line_number_at(interp.current), Some(10));
}

fn ext_stmt(ext: u8, rest: &[u8]) -> Vec<u8> {
    let mut body = vec![tokens::EXTENSION_INTRODUCER, ext];
    body.extend_from_slice(rest);
    body
}

#[test]
fn mid_statement_splices_a_replacement_without_changing_the_target_length() {
    let mut body = b"A$=\"HELLO WORLD\":".to_vec();
    body.extend(ext_stmt(tokens::MID_S, b"(A$,7,5)=\"THERE\":"));
    body.extend(stmt(tokens::PRINT, b"A$"));
    let (_interp, host) = run(vec![Line { number: 10, body }]);
    assert_eq!(host.printed.concat(), "HELLO THERE\n");
}

#[test]
fn mid_statement_caps_replacement_to_the_remaining_length() {
    let mut body = b"A$=\"ABCDE\":".to_vec();
    body.extend(ext_stmt(tokens::MID_S, b"(A$,4)=\"XYZ\":"));
    body.extend(stmt(tokens::PRINT, b"A$"));
    let (_interp, host) = run(vec![Line { number: 10, body }]);
    assert_eq!(host.printed.concat(), "ABCXY\n");
}

#[test]
fn tron_inside_a_then_clause_still_rejects_trailing_garbage() {
    let mut body = stmt(tokens::IF, b"1 THEN ");
    body.push(tokens::TRON);
    body.extend(b" 5");
    let line10 = Line { number: 10, body };
    let (_interp, _host, result) = try_run(vec![line10]);
    assert_eq!(result, Err(gwbasic::BasicError::Stx));
}

#[test]
fn mid_statement_rejects_a_start_past_the_end_of_the_target() {
    let mut body = b"A$=\"AB\":".to_vec();
    body.extend(ext_stmt(tokens::MID_S, b"(A$,9)=\"Z\""));
    let line10 = Line { number: 10, body };
    let (_interp, _host, result) = try_run(vec![line10]);
    assert_eq!(result, Err(gwbasic::BasicError::IllegalFunctionCall));
}
