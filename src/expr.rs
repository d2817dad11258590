//! Minimal expression evaluator.
//!
//! The full tokenizer/expression-parser boundary belongs to a sibling
//! component this crate only consumes; this module is the narrow stand-in
//! that makes the statement parsers testable in isolation: a small
//! recursive-descent evaluator producing a typed `Value`, decoding a fixed
//! unit and recursing on what follows it, the same shape as a decode step
//! that peeks a unit and branches on its bits — reworked here from
//! operand-addressing dispatch to operator-precedence dispatch.

use crate::error::{BasicError, Result};
use crate::reader::Reader;
use crate::tokens;
use crate::values::{self, BasicString, Double, Single, Value};

/// Everything an expression may read from or call into: variable storage
/// and the handful of builtins (PEEK, VARPTR, INKEY$, FRE) that reach
/// outside the value itself. Implemented by `Interpreter`.
pub trait ExprContext {
    fn get_var(&mut self, name: &str) -> Value;
    fn get_array(&mut self, name: &str, indices: &[i32]) -> Result<Value>;
    fn peek(&mut self, address: i64) -> u8;
    fn var_ptr(&mut self, name: &str, indices: &[i32]) -> i64;
    fn inkey(&mut self) -> Value;
    fn fre(&mut self) -> i64;
}

fn as_int(v: &Value) -> Result<i32> {
    match v {
        Value::Integer(n) => Ok(*n as i32),
        _ => Ok(values::to_f64(v)?.round() as i32),
    }
}

/// Parse and evaluate one expression starting at the reader's current
/// position, at the lowest (OR) precedence level.
pub fn parse_expression(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<Value> {
    parse_or(r, ctx)
}

fn parse_or(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<Value> {
    let mut lhs = parse_and(r, ctx)?;
    loop {
        if matches_word(r, b"OR") {
            let rhs = parse_and(r, ctx)?;
            lhs = Value::Integer(bool_to_int(as_int(&lhs)? != 0 || as_int(&rhs)? != 0));
        } else if matches_word(r, b"XOR") {
            let rhs = parse_and(r, ctx)?;
            lhs = Value::Integer(bool_to_int((as_int(&lhs)? != 0) != (as_int(&rhs)? != 0)));
        } else {
            break;
        }
    }
    Ok(lhs)
}

fn parse_and(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<Value> {
    let mut lhs = parse_not(r, ctx)?;
    while matches_word(r, b"AND") {
        let rhs = parse_not(r, ctx)?;
        lhs = Value::Integer(bool_to_int(as_int(&lhs)? != 0 && as_int(&rhs)? != 0));
    }
    Ok(lhs)
}

fn parse_not(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<Value> {
    if matches_word(r, b"NOT") {
        let v = parse_not(r, ctx)?;
        Ok(Value::Integer(!(as_int(&v)? as i16)))
    } else {
        parse_comparison(r, ctx)
    }
}

fn bool_to_int(b: bool) -> i16 {
    if b {
        -1
    } else {
        0
    }
}

fn parse_comparison(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<Value> {
    let lhs = parse_additive(r, ctx)?;
    r.skip_blank();
    let op = peek_comparison_op(r);
    if let Some(op) = op {
        consume_comparison_op(r, op);
        let rhs = parse_additive(r, ctx)?;
        let ord = values::compare_values(&lhs, &rhs)?;
        use std::cmp::Ordering::*;
        let result = match op {
            CmpOp::Eq => ord == Equal,
            CmpOp::Ne => ord != Equal,
            CmpOp::Lt => ord == Less,
            CmpOp::Le => ord != Greater,
            CmpOp::Gt => ord == Greater,
            CmpOp::Ge => ord != Less,
        };
        return Ok(Value::Integer(bool_to_int(result)));
    }
    Ok(lhs)
}

#[derive(Clone, Copy)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn peek_comparison_op(r: &Reader) -> Option<CmpOp> {
    match r.peek() {
        b'=' => Some(CmpOp::Eq),
        b'<' => {
            if r.peek_at(1) == b'>' {
                Some(CmpOp::Ne)
            } else if r.peek_at(1) == b'=' {
                Some(CmpOp::Le)
            } else {
                Some(CmpOp::Lt)
            }
        }
        b'>' => {
            if r.peek_at(1) == b'=' {
                Some(CmpOp::Ge)
            } else {
                Some(CmpOp::Gt)
            }
        }
        _ => None,
    }
}

fn consume_comparison_op(r: &mut Reader, op: CmpOp) {
    r.advance();
    match op {
        CmpOp::Ne | CmpOp::Le | CmpOp::Ge => {
            r.advance();
        }
        _ => {}
    }
}

fn parse_additive(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<Value> {
    let mut lhs = parse_multiplicative(r, ctx)?;
    loop {
        r.skip_blank();
        match r.peek() {
            b'+' => {
                r.advance();
                let rhs = parse_multiplicative(r, ctx)?;
                lhs = values::value_add(lhs, rhs)?;
            }
            b'-' => {
                r.advance();
                let rhs = parse_multiplicative(r, ctx)?;
                lhs = values::value_sub(lhs, rhs)?;
            }
            _ => break,
        }
    }
    Ok(lhs)
}

fn parse_multiplicative(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<Value> {
    let mut lhs = parse_unary(r, ctx)?;
    loop {
        r.skip_blank();
        match r.peek() {
            b'*' => {
                r.advance();
                let rhs = parse_unary(r, ctx)?;
                lhs = values::value_mul(lhs, rhs)?;
            }
            b'/' => {
                r.advance();
                let rhs = parse_unary(r, ctx)?;
                lhs = values::value_div(lhs, rhs)?;
            }
            b'\\' => {
                r.advance();
                let rhs = parse_unary(r, ctx)?;
                let x = as_int(&lhs)?;
                let y = as_int(&rhs)?;
                if y == 0 {
                    return Err(BasicError::DivisionByZero);
                }
                lhs = Value::Integer((x / y) as i16);
            }
            _ => {
                if matches_word(r, b"MOD") {
                    let rhs = parse_unary(r, ctx)?;
                    let x = as_int(&lhs)?;
                    let y = as_int(&rhs)?;
                    if y == 0 {
                        return Err(BasicError::DivisionByZero);
                    }
                    lhs = Value::Integer((x % y) as i16);
                } else {
                    break;
                }
            }
        }
    }
    Ok(lhs)
}

fn parse_unary(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<Value> {
    r.skip_blank();
    if r.peek() == b'-' {
        r.advance();
        let v = parse_unary(r, ctx)?;
        return Ok(match v {
            Value::Integer(n) => Value::Integer(n.checked_neg().ok_or(BasicError::Overflow)?),
            Value::Single(s) => Value::Single(s.negate()),
            Value::Double(d) => Value::Double(d.negate()),
            Value::Str(_) => return Err(BasicError::TypeMismatch),
        });
    }
    if r.peek() == b'+' {
        r.advance();
        return parse_unary(r, ctx);
    }
    parse_power(r, ctx)
}

fn parse_power(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<Value> {
    let base = parse_primary(r, ctx)?;
    r.skip_blank();
    if r.peek() == b'^' {
        r.advance();
        let exp = parse_unary(r, ctx)?;
        let b = values::to_f64(&base)?;
        let e = values::to_f64(&exp)?;
        return Ok(Value::Double(Double::from_f64(b.powf(e))?));
    }
    Ok(base)
}

fn matches_word(r: &mut Reader, word: &[u8]) -> bool {
    r.match_keyword(std::str::from_utf8(word).unwrap())
}

pub fn parse_name(r: &mut Reader) -> String {
    r.skip_blank();
    let mut name = String::new();
    while r.peek().is_ascii_alphanumeric() {
        name.push(r.advance() as char);
    }
    if matches!(r.peek(), b'$' | b'%' | b'!' | b'#') {
        name.push(r.advance() as char);
    }
    name
}

pub fn parse_index_list(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<Vec<i32>> {
    let mut out = Vec::new();
    r.require(b'(')?;
    loop {
        let v = parse_expression(r, ctx)?;
        out.push(as_int(&v)?);
        if !r.skip_blank_read_if(b',') {
            break;
        }
    }
    r.require(b')')?;
    Ok(out)
}

/// Parse an assignment target: a bare name, optionally followed by an
/// index list if the name names an array element. Used by LET (explicit
/// or implicit), READ, and INPUT, which all assign into either a scalar
/// or an array cell.
pub fn parse_lvalue(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<(String, Option<Vec<i32>>)> {
    let name = parse_name(r);
    r.skip_blank();
    if r.peek() == b'(' {
        let indices = parse_index_list(r, ctx)?;
        Ok((name, Some(indices)))
    } else {
        Ok((name, None))
    }
}

/// Coerce a `Value` to a plain `i32`, the common case for index/argument
/// expressions outside of full arithmetic (OPTION BASE literal digits use
/// `Reader` directly instead, since they must reject even a literal `1.0`
/// expression).
pub fn eval_int(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<i32> {
    let v = parse_expression(r, ctx)?;
    as_int(&v)
}

fn parse_primary(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<Value> {
    r.skip_blank();
    match r.peek() {
        b'(' => {
            r.advance();
            let v = parse_expression(r, ctx)?;
            r.require(b')')?;
            Ok(v)
        }
        b'"' => parse_string_literal(r),
        tokens::T_CONSTANT_ZERO => {
            r.advance();
            Ok(Value::Integer(0))
        }
        tokens::T_CONSTANT_1 => {
            r.advance();
            Ok(Value::Integer(1))
        }
        tokens::T_BYTE => {
            r.advance();
            Ok(Value::Integer(r.advance() as i16))
        }
        tokens::T_UINT => {
            r.advance();
            Ok(Value::Integer(r.read_u16() as i16))
        }
        tokens::T_INT => {
            r.advance();
            Ok(Value::Integer(r.read_u16() as i16))
        }
        tokens::T_SINGLE => {
            r.advance();
            let bytes = [r.advance(), r.advance(), r.advance(), r.advance()];
            Ok(Value::Single(Single::from_bytes(bytes)))
        }
        tokens::T_DOUBLE => {
            r.advance();
            let mut bytes = [0u8; 8];
            for b in bytes.iter_mut() {
                *b = r.advance();
            }
            Ok(Value::Double(Double::from_bytes(bytes)))
        }
        c if c.is_ascii_digit() => parse_decimal_literal(r),
        c if c.is_ascii_alphabetic() => parse_identifier(r, ctx),
        _ => Err(BasicError::Stx),
    }
}

fn parse_string_literal(r: &mut Reader) -> Result<Value> {
    r.advance();
    let mut bytes = Vec::new();
    while r.peek() != b'"' && !r.at_end() {
        bytes.push(r.advance());
    }
    if r.peek() == b'"' {
        r.advance();
    }
    Ok(Value::Str(BasicString::new(bytes)))
}

fn parse_decimal_literal(r: &mut Reader) -> Result<Value> {
    let mut text = String::new();
    while r.peek().is_ascii_digit() {
        text.push(r.advance() as char);
    }
    let mut is_float = false;
    if r.peek() == b'.' {
        is_float = true;
        text.push(r.advance() as char);
        while r.peek().is_ascii_digit() {
            text.push(r.advance() as char);
        }
    }
    let is_double = r.peek() == b'#';
    if matches!(r.peek(), b'!' | b'#') {
        is_float = true;
        r.advance();
    }
    if is_float {
        let f: f64 = text.parse().map_err(|_| BasicError::Stx)?;
        if is_double {
            Ok(Value::Double(Double::from_f64(f)?))
        } else {
            Ok(Value::Single(Single::from_f64(f)?))
        }
    } else {
        text.parse::<i32>().map_err(|_| BasicError::Stx).and_then(|n| {
            i16::try_from(n).map(Value::Integer).or_else(|_| Ok(Value::Single(Single::from_int(n))))
        })
    }
}

fn parse_identifier(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<Value> {
    let start = r.pos();
    let upper: String = {
        let mut s = String::new();
        let mut i = 0usize;
        while r.peek_at(i).is_ascii_alphabetic() {
            s.push(r.peek_at(i).to_ascii_uppercase() as char);
            i += 1;
        }
        s
    };
    match upper.as_str() {
        "INKEY" => {
            r.seek(start + 5);
            if r.peek() == b'$' {
                r.advance();
            }
            return Ok(ctx.inkey());
        }
        "FRE" => {
            r.seek(start + 3);
            if r.peek() == b'(' {
                let _ = parse_index_list_bare(r, ctx);
            }
            return Ok(Value::Integer(ctx.fre() as i16));
        }
        "PEEK" => {
            r.seek(start + 4);
            r.require(b'(')?;
            let addr = parse_expression(r, ctx)?;
            r.require(b')')?;
            return Ok(Value::Integer(ctx.peek(as_int(&addr)? as i64) as i16));
        }
        "VARPTR" => {
            r.seek(start + 6);
            r.require(b'(')?;
            let name = parse_name(r);
            let indices = if r.peek() == b'(' { parse_index_list(r, ctx)? } else { Vec::new() };
            r.require(b')')?;
            return Ok(Value::Integer(ctx.var_ptr(&name, &indices) as i16));
        }
        "ABS" => {
            r.seek(start + 3);
            r.require(b'(')?;
            let v = parse_expression(r, ctx)?;
            r.require(b')')?;
            return Ok(match v {
                Value::Integer(n) => Value::Integer(n.unsigned_abs() as i16),
                other => other,
            });
        }
        "INT" => {
            r.seek(start + 3);
            r.require(b'(')?;
            let v = parse_expression(r, ctx)?;
            r.require(b')')?;
            return Ok(Value::Integer(as_int(&v)? as i16));
        }
        _ => {}
    }
    let name = parse_name(r);
    if r.peek() == b'(' {
        let indices = parse_index_list(r, ctx)?;
        ctx.get_array(&name, &indices)
    } else {
        Ok(ctx.get_var(&name))
    }
}

fn parse_index_list_bare(r: &mut Reader, ctx: &mut dyn ExprContext) -> Result<Vec<i32>> {
    parse_index_list(r, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    struct TestCtx {
        mem: Memory,
    }

    impl ExprContext for TestCtx {
        fn get_var(&mut self, name: &str) -> Value {
            self.mem.get_var(name)
        }
        fn get_array(&mut self, name: &str, indices: &[i32]) -> Result<Value> {
            self.mem.get_array(name, indices)
        }
        fn peek(&mut self, address: i64) -> u8 {
            self.mem.peek(address)
        }
        fn var_ptr(&mut self, name: &str, indices: &[i32]) -> i64 {
            self.mem.var_ptr(name, indices)
        }
        fn inkey(&mut self) -> Value {
            Value::Str(BasicString::default())
        }
        fn fre(&mut self) -> i64 {
            self.mem.free_bytes()
        }
    }

    fn eval(src: &str, mem: &mut Memory) -> Result<Value> {
        let bytes = src.as_bytes().to_vec();
        let mut r = Reader::new(&bytes);
        let mut ctx = TestCtx { mem: std::mem::take(mem) };
        let result = parse_expression(&mut r, &mut ctx);
        *mem = ctx.mem;
        result
    }

    #[test]
    fn adds_two_integers() {
        let mut mem = Memory::new();
        let v = eval("2+3", &mut mem).unwrap();
        assert_eq!(v, Value::Integer(5));
    }

    #[test]
    fn respects_precedence() {
        let mut mem = Memory::new();
        let v = eval("2+3*4", &mut mem).unwrap();
        assert_eq!(v, Value::Integer(14));
    }

    #[test]
    fn reads_variable_via_context() {
        let mut mem = Memory::new();
        mem.set_var("A%", Value::Integer(7)).unwrap();
        let v = eval("A%+1", &mut mem).unwrap();
        assert_eq!(v, Value::Integer(8));
    }

    #[test]
    fn string_concatenation() {
        let mut mem = Memory::new();
        let v = eval("\"AB\"+\"CD\"", &mut mem).unwrap();
        match v {
            Value::Str(s) => assert_eq!(s.as_bytes(), b"ABCD"),
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn comparison_yields_basic_boolean() {
        let mut mem = Memory::new();
        assert_eq!(eval("1<2", &mut mem).unwrap(), Value::Integer(-1));
        assert_eq!(eval("1>2", &mut mem).unwrap(), Value::Integer(0));
    }
}
