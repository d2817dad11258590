//! Typed values and Microsoft Binary Format (MBF) arithmetic.
//!
//! GW-BASIC has four value types, one per sigil: 16-bit signed integer
//! (`%`), MBF single (`!`, 4 bytes), MBF double (`#`, 8 bytes), and string
//! (`$`). MBF is deliberately *not* IEEE 754 — every arithmetic op here
//! manipulates mantissa and exponent as plain integers, per the
//! byte-exact-MBF design note, so that programs which PEEK a variable's
//! raw bytes see exactly what GW-BASIC would have stored.

use crate::error::{BasicError, Result};

/// Maximum length of a GW-BASIC string (not counting any heap-pointer
/// overhead tracked by the memory model).
pub const MAX_STRING_LEN: usize = 255;

/// A GW-BASIC string value. Length is enforced at construction; the memory
/// model (not this type) owns where its bytes live in the simulated heap.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BasicString(Vec<u8>);

impl BasicString {
    pub fn new(mut bytes: Vec<u8>) -> Self {
        bytes.truncate(MAX_STRING_LEN);
        BasicString(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for BasicString {
    fn from(s: &str) -> Self {
        BasicString::new(s.as_bytes().to_vec())
    }
}

/// A typed GW-BASIC runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Integer(i16),
    Single(Single),
    Double(Double),
    Str(BasicString),
}

impl Value {
    /// The sigil a name with this value's type would carry.
    pub fn sigil(&self) -> char {
        match self {
            Value::Integer(_) => '%',
            Value::Single(_) => '!',
            Value::Double(_) => '#',
            Value::Str(_) => '$',
        }
    }

    /// The zero/empty value for a given sigil, returned for a scalar that
    /// has never been assigned.
    pub fn zero_for(sigil: char) -> Value {
        match sigil {
            '%' => Value::Integer(0),
            '!' => Value::Single(Single::ZERO),
            '#' => Value::Double(Double::ZERO),
            '$' => Value::Str(BasicString::default()),
            _ => Value::Single(Single::ZERO),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Integer(n) => *n == 0,
            Value::Single(s) => s.is_zero(),
            Value::Double(d) => d.is_zero(),
            Value::Str(s) => s.is_empty(),
        }
    }

    /// Coerce this value to the type named by `sigil`: integer -> single ->
    /// double is always exact; narrowing a float to integer rounds and may
    /// raise Overflow; any numeric <-> string conversion is a Type
    /// Mismatch.
    pub fn to_type(&self, sigil: char) -> Result<Value> {
        match (self, sigil) {
            (Value::Str(_), '$') => Ok(self.clone()),
            (Value::Str(_), _) | (_, '$') => Err(BasicError::TypeMismatch),
            (Value::Integer(n), '%') => Ok(Value::Integer(*n)),
            (Value::Integer(n), '!') => Ok(Value::Single(Single::from_int(*n as i32))),
            (Value::Integer(n), '#') => Ok(Value::Double(Double::from_int(*n as i32))),
            (Value::Single(s), '!') => Ok(Value::Single(*s)),
            (Value::Single(s), '%') => Ok(Value::Integer(s.to_int()?)),
            (Value::Single(s), '#') => Ok(Value::Double(s.widen())),
            (Value::Double(d), '#') => Ok(Value::Double(*d)),
            (Value::Double(d), '%') => Ok(Value::Integer(d.to_int()?)),
            (Value::Double(d), '!') => Ok(Value::Single(d.narrow()?)),
            _ => Err(BasicError::TypeMismatch),
        }
    }
}

/// Approximate a value as `f64`, for comparisons and the stand-in
/// expression evaluator's `/`/`^` only — never for anything that gets
/// stored back as an MBF result, which must stay bit-exact. Decomposes
/// the MBF bytes directly (sign/exponent/mantissa) rather than
/// round-tripping through `to_int()`, so fractional values survive.
pub fn to_f64(v: &Value) -> Result<f64> {
    Ok(match v {
        Value::Integer(n) => *n as f64,
        Value::Single(s) => s.to_f64(),
        Value::Double(d) => d.to_f64(),
        Value::Str(_) => return Err(BasicError::TypeMismatch),
    })
}

/// Widen both operands to the wider of the two numeric types (or leave
/// two strings as-is); never narrows. Matches GW-BASIC's usual-arithmetic
/// conversions for binary operators.
pub fn promote(a: Value, b: Value) -> Result<(Value, Value)> {
    use Value::*;
    match (&a, &b) {
        (Str(_), Str(_)) => Ok((a, b)),
        (Str(_), _) | (_, Str(_)) => Err(BasicError::TypeMismatch),
        (Double(_), _) => Ok((a.clone(), b.to_type('#')?)),
        (_, Double(_)) => Ok((a.to_type('#')?, b)),
        (Single(_), _) => Ok((a.clone(), b.to_type('!')?)),
        (_, Single(_)) => Ok((a.to_type('!')?, b)),
        (Integer(_), Integer(_)) => Ok((a, b)),
    }
}

/// `+`: numeric addition or string concatenation, after promotion.
pub fn value_add(a: Value, b: Value) -> Result<Value> {
    let (a, b) = promote(a, b)?;
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => {
            let mut bytes = x.as_bytes().to_vec();
            bytes.extend_from_slice(y.as_bytes());
            if bytes.len() > MAX_STRING_LEN {
                return Err(BasicError::StringTooLong);
            }
            Ok(Value::Str(BasicString::new(bytes)))
        }
        (Value::Integer(x), Value::Integer(y)) => {
            x.checked_add(y).map(Value::Integer).ok_or(BasicError::Overflow)
        }
        (Value::Single(x), Value::Single(y)) => Ok(Value::Single(x.iadd(y)?)),
        (Value::Double(x), Value::Double(y)) => Ok(Value::Double(x.iadd(y)?)),
        _ => Err(BasicError::TypeMismatch),
    }
}

/// `-`: numeric subtraction (strings have no `-` operator).
pub fn value_sub(a: Value, b: Value) -> Result<Value> {
    let (a, b) = promote(a, b)?;
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => {
            x.checked_sub(y).map(Value::Integer).ok_or(BasicError::Overflow)
        }
        (Value::Single(x), Value::Single(y)) => Ok(Value::Single(x.isub(y)?)),
        (Value::Double(x), Value::Double(y)) => Ok(Value::Double(x.isub(y)?)),
        _ => Err(BasicError::TypeMismatch),
    }
}

/// `*`: numeric multiplication.
pub fn value_mul(a: Value, b: Value) -> Result<Value> {
    let (a, b) = promote(a, b)?;
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => (x as i32)
            .checked_mul(y as i32)
            .and_then(|p| i16::try_from(p).ok())
            .map(Value::Integer)
            .ok_or(BasicError::Overflow),
        (Value::Single(x), Value::Single(y)) => Ok(Value::Single(x.imul(y)?)),
        (Value::Double(x), Value::Double(y)) => Ok(Value::Double(x.imul(y)?)),
        _ => Err(BasicError::TypeMismatch),
    }
}

/// `/`: always floating division, even for two integers. No MBF divide
/// primitive exists here (only add/sub/mul need to stay bit-exact), so
/// this goes through `f64` and re-encodes.
pub fn value_div(a: Value, b: Value) -> Result<Value> {
    let is_double = matches!(a, Value::Double(_)) || matches!(b, Value::Double(_));
    let fa = to_f64(&a)?;
    let fb = to_f64(&b)?;
    if fb == 0.0 {
        return Err(BasicError::DivisionByZero);
    }
    let result = fa / fb;
    if is_double {
        Ok(Value::Double(Double::from_f64(result)?))
    } else {
        Ok(Value::Single(Single::from_f64(result)?))
    }
}

/// Comparison for `=`/`<>`/`</>`/`<=`/`>=`: lexicographic for strings,
/// numeric (via `f64`) otherwise.
pub fn compare_values(a: &Value, b: &Value) -> Result<std::cmp::Ordering> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x.as_bytes().cmp(y.as_bytes())),
        (Value::Str(_), _) | (_, Value::Str(_)) => Err(BasicError::TypeMismatch),
        _ => {
            let fa = to_f64(a)?;
            let fb = to_f64(b)?;
            fa.partial_cmp(&fb).ok_or(BasicError::IllegalFunctionCall)
        }
    }
}

/// Round a magnitude to an integer using round-to-nearest-even on the
/// single bit being dropped at `shift`, with everything below it folded
/// into a sticky bit. Used uniformly by exponent alignment, carry-out
/// renormalization, and multiplication, per the "round to even on the
/// guard bit; sticky bits ... truncate" design note.
fn shift_round_u128(mantissa: u128, shift: u32) -> u128 {
    if shift == 0 {
        return mantissa;
    }
    if shift >= 128 {
        return 0;
    }
    let guard_pos = shift - 1;
    let guard = (mantissa >> guard_pos) & 1;
    let sticky_mask = (1u128 << guard_pos) - 1;
    let sticky = (mantissa & sticky_mask) != 0;
    let mut result = mantissa >> shift;
    if guard == 1 && (sticky || (result & 1) == 1) {
        result += 1;
    }
    result
}

/// An MBF significand/exponent pair, decomposed from its packed byte form.
/// `mantissa` is left-justified so that a nonzero value always has its top
/// bit (`1 << (bits - 1)`) set; `mantissa == 0` is the zero sentinel and
/// `exponent` is meaningless in that case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Decomposed {
    sign: bool,
    exponent: i32,
    mantissa: u128,
}

const EXCESS: i32 = 128;

impl Decomposed {
    fn zero() -> Self {
        Decomposed { sign: false, exponent: 0, mantissa: 0 }
    }

    fn negate(self) -> Self {
        if self.mantissa == 0 {
            self
        } else {
            Decomposed { sign: !self.sign, ..self }
        }
    }

    /// Bring `mantissa` back within `[2^(bits-1), 2^bits)`, rounding away
    /// any carry-out bit and shifting left (decrementing the exponent) for
    /// any cancellation down to zero significant bits.
    fn normalize(mut self, bits: u32) -> Self {
        if self.mantissa == 0 {
            return Decomposed::zero();
        }
        let top = 1u128 << bits;
        let hidden = 1u128 << (bits - 1);
        while self.mantissa >= top {
            self.mantissa = shift_round_u128(self.mantissa, 1);
            self.exponent += 1;
        }
        while self.mantissa != 0 && self.mantissa < hidden {
            self.mantissa <<= 1;
            self.exponent -= 1;
        }
        if self.mantissa == 0 {
            return Decomposed::zero();
        }
        self
    }

    fn signed_mantissa(self) -> i128 {
        if self.sign {
            -(self.mantissa as i128)
        } else {
            self.mantissa as i128
        }
    }

    fn add(self, other: Decomposed, bits: u32) -> Result<Decomposed> {
        if self.mantissa == 0 {
            return Ok(other);
        }
        if other.mantissa == 0 {
            return Ok(self);
        }
        let (hi, lo) = if self.exponent >= other.exponent { (self, other) } else { (other, self) };
        let shift = (hi.exponent - lo.exponent) as u32;
        let lo_mantissa = shift_round_u128(lo.mantissa, shift.min(bits + 2));
        let lo = Decomposed { mantissa: lo_mantissa, ..lo };
        let sum = hi.signed_mantissa() + lo.signed_mantissa();
        let sign = sum < 0;
        let magnitude = sum.unsigned_abs();
        let result = Decomposed { sign, exponent: hi.exponent, mantissa: magnitude }.normalize(bits);
        check_exponent(result, bits)?;
        Ok(result)
    }

    fn mul(self, other: Decomposed, bits: u32) -> Result<Decomposed> {
        if self.mantissa == 0 || other.mantissa == 0 {
            return Ok(Decomposed::zero());
        }
        let sign = self.sign != other.sign;
        let product = self.mantissa * other.mantissa;
        let exponent = self.exponent + other.exponent;
        let mut result = Decomposed { sign, exponent, mantissa: shift_round_u128(product, bits) };
        if result.mantissa < (1u128 << (bits - 1)) {
            result = Decomposed { mantissa: shift_round_u128(product, bits - 1), exponent: exponent - 1, ..result };
        }
        let result = result.normalize(bits);
        check_exponent(result, bits)?;
        Ok(result)
    }
}

fn check_exponent(d: Decomposed, _bits: u32) -> Result<()> {
    if d.mantissa != 0 && d.exponent + EXCESS > 255 {
        return Err(BasicError::Overflow);
    }
    Ok(())
}

/// Exponent below which a value underflows to zero (MBF has no subnormals).
fn underflowed(exponent: i32) -> bool {
    exponent + EXCESS < 1
}

impl Decomposed {
    /// Decompose an `f64` directly into a sign/exponent/mantissa triple
    /// normalized to `target_bits`, without ever rounding the real value to
    /// an integer first. `exponent` here is the plain frexp-style binary
    /// exponent (`value == frac * 2^exponent` with `frac` in `[0.5, 1)`),
    /// the same convention `decompose`/`compose` use, so the result can be
    /// handed straight to `normalize`/`compose` the way `from_int` does.
    fn from_f64(value: f64, target_bits: u32) -> Decomposed {
        if value == 0.0 {
            return Decomposed::zero();
        }
        let sign = value.is_sign_negative();
        let bits = value.abs().to_bits();
        let raw_exponent = ((bits >> 52) & 0x7ff) as i64;
        if raw_exponent == 0 {
            // Subnormal (or zero, already handled above): far below MBF's
            // smallest representable magnitude, so it underflows to zero.
            return Decomposed::zero();
        }
        let raw_fraction = bits & 0x000f_ffff_ffff_ffff;
        // IEEE-754 double: value = 1.fraction * 2^(raw_exponent - 1023), a
        // 53-bit mantissa (hidden bit + 52 stored bits) in [2^52, 2^53).
        let mantissa53 = (1u128 << 52) | raw_fraction as u128;
        let exponent = (raw_exponent - 1023 + 1) as i32;
        let mantissa = if target_bits >= 53 {
            mantissa53 << (target_bits - 53)
        } else {
            shift_round_u128(mantissa53, 53 - target_bits)
        };
        Decomposed { sign, exponent, mantissa }.normalize(target_bits)
    }

    /// The real value this decomposition represents, as an `f64`
    /// approximation (`mantissa` interpreted in its current normalized
    /// frame, i.e. `value == frac * 2^exponent` with `frac = mantissa /
    /// 2^frame_bits`). Lossy whenever `frame_bits` exceeds `f64`'s 53-bit
    /// significand (true for `Double`'s 56-bit mantissa), which is fine
    /// for the approximate-comparison/division uses this feeds.
    fn to_f64(self, frame_bits: u32) -> f64 {
        if self.mantissa == 0 {
            return 0.0;
        }
        let magnitude = self.mantissa as f64 * 2f64.powi(self.exponent - frame_bits as i32);
        if self.sign {
            -magnitude
        } else {
            magnitude
        }
    }
}

macro_rules! mbf_type {
    ($name:ident, $bytes:expr, $bits:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq)]
        pub struct $name([u8; $bytes]);

        impl $name {
            pub const ZERO: $name = $name([0u8; $bytes]);
            const BITS: u32 = $bits;

            pub fn from_bytes(bytes: [u8; $bytes]) -> Self {
                $name(bytes)
            }

            pub fn to_bytes(self) -> [u8; $bytes] {
                self.0
            }

            pub fn is_zero(self) -> bool {
                self.0 == [0u8; $bytes]
            }

            fn decompose(self) -> Decomposed {
                let exp_byte = self.0[$bytes - 1];
                if exp_byte == 0 {
                    return Decomposed::zero();
                }
                let sign = self.0[$bytes - 2] & 0x80 != 0;
                let mut mantissa: u128 = (self.0[$bytes - 2] & 0x7f) as u128;
                for i in (0..$bytes - 2).rev() {
                    mantissa = (mantissa << 8) | self.0[i] as u128;
                }
                // hidden bit: the stored mantissa omits the implicit leading 1.
                mantissa |= 1u128 << (Self::BITS - 1);
                Decomposed { sign, exponent: exp_byte as i32 - EXCESS, mantissa }
            }

            fn compose(d: Decomposed) -> Self {
                if d.mantissa == 0 {
                    return $name::ZERO;
                }
                let biased = d.exponent + EXCESS;
                // Overflow/underflow should have been rejected by the caller
                // already; defensively clamp rather than panic.
                let exp_byte = biased.clamp(1, 255) as u8;
                // drop the hidden bit before packing.
                let stored = d.mantissa & !(1u128 << (Self::BITS - 1));
                let mut bytes = [0u8; $bytes];
                let mut rest = stored;
                for i in 0..$bytes - 2 {
                    bytes[i] = (rest & 0xff) as u8;
                    rest >>= 8;
                }
                bytes[$bytes - 2] = (rest & 0x7f) as u8 | if d.sign { 0x80 } else { 0 };
                bytes[$bytes - 1] = exp_byte;
                $name(bytes)
            }

            pub fn from_int(n: i32) -> Self {
                if n == 0 {
                    return $name::ZERO;
                }
                let sign = n < 0;
                let magnitude = (n as i64).unsigned_abs() as u128;
                let top_bit = 127 - magnitude.leading_zeros() as i32;
                let exponent = top_bit + 1;
                let shift = Self::BITS as i32 - exponent;
                let mantissa = if shift >= 0 {
                    magnitude << shift
                } else {
                    shift_round_u128(magnitude, (-shift) as u32)
                };
                $name::compose(Decomposed { sign, exponent, mantissa }.normalize(Self::BITS))
            }

            /// Build a value directly from a fractional `f64` (the result
            /// of `/`, `^`, or a decimal literal like `3.14`), rounding to
            /// `Self::BITS` of mantissa precision instead of truncating to
            /// an integer first. Overflow/underflow follow the same rule
            /// as `iadd`/`imul`: exponent too large raises Overflow,
            /// exponent too small underflows silently to zero.
            pub fn from_f64(value: f64) -> Result<Self> {
                if !value.is_finite() {
                    return Err(BasicError::Overflow);
                }
                let d = Decomposed::from_f64(value, Self::BITS);
                if underflowed(d.exponent) {
                    return Ok($name::ZERO);
                }
                check_exponent(d, Self::BITS)?;
                Ok($name::compose(d))
            }

            /// Lossy `f64` approximation of this value, for comparisons
            /// and the divide/power operators that have no bit-exact MBF
            /// primitive of their own. Never route a value that must stay
            /// bit-exact (PEEK/VARPTR-visible state) through this.
            pub fn to_f64(self) -> f64 {
                self.decompose().to_f64(Self::BITS)
            }

            pub fn to_int(self) -> Result<i16> {
                let d = self.decompose();
                if d.mantissa == 0 {
                    return Ok(0);
                }
                // value = mantissa/2^BITS * 2^exponent, with mantissa's top
                // bit at position BITS-1.
                let shift = Self::BITS as i32 - 1 - d.exponent;
                let rounded = if shift <= 0 {
                    // exponent too large to represent as a 16-bit int; shifting
                    // left would lose no precision but may overflow.
                    let widened = d.mantissa << (-shift);
                    widened
                } else if shift >= 128 {
                    0
                } else {
                    shift_round_u128(d.mantissa, shift as u32)
                };
                if rounded > i16::MAX as u128 + if d.sign { 1 } else { 0 } {
                    return Err(BasicError::Overflow);
                }
                let magnitude = rounded as i32;
                Ok(if d.sign { -magnitude } else { magnitude } as i16)
            }

            pub fn negate(self) -> Self {
                Self::compose(self.decompose().negate())
            }

            pub fn iadd(self, rhs: Self) -> Result<Self> {
                Ok(Self::compose(self.decompose().add(rhs.decompose(), Self::BITS)?))
            }

            pub fn isub(self, rhs: Self) -> Result<Self> {
                self.iadd(rhs.negate())
            }

            pub fn imul(self, rhs: Self) -> Result<Self> {
                Ok(Self::compose(self.decompose().mul(rhs.decompose(), Self::BITS)?))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({:02x?})", stringify!($name), self.0)
            }
        }
    };
}

mbf_type!(Single, 4, 24);
mbf_type!(Double, 8, 56);

impl Single {
    /// Exact single -> double widening (never loses precision: 24 bits of
    /// significand fit inside 56).
    pub fn widen(self) -> Double {
        let d = self.decompose();
        Double::compose(Decomposed { mantissa: d.mantissa << (56 - 24), ..d })
    }
}

impl Double {
    /// Narrow a double to a single, rounding to even; raises Overflow if
    /// the exponent no longer fits after rounding.
    pub fn narrow(self) -> Result<Single> {
        let d = self.decompose();
        if d.mantissa == 0 {
            return Ok(Single::ZERO);
        }
        let shift = 56 - 24;
        let mantissa = shift_round_u128(d.mantissa, shift);
        let result = Decomposed { mantissa, ..d }.normalize(24);
        if underflowed(result.exponent) {
            return Ok(Single::ZERO);
        }
        check_exponent(result, 24)?;
        Ok(Single::compose(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_all_zero_bytes() {
        assert_eq!(Single::ZERO.to_bytes(), [0, 0, 0, 0]);
        assert_eq!(Double::ZERO.to_bytes(), [0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn round_trips_through_bytes() {
        let s = Single::from_int(12345);
        let back = Single::from_bytes(s.to_bytes());
        assert_eq!(s.to_bytes(), back.to_bytes());
    }

    #[test]
    fn small_integers_add_exactly() {
        let a = Single::from_int(2);
        let b = Single::from_int(3);
        let sum = a.iadd(b).unwrap();
        assert_eq!(sum.to_int().unwrap(), 5);
    }

    #[test]
    fn subtraction_is_inverse_of_addition() {
        let a = Single::from_int(1000);
        let b = Single::from_int(37);
        let sum = a.iadd(b).unwrap();
        let back = sum.isub(b).unwrap();
        assert_eq!(back.to_int().unwrap(), 1000);
    }

    #[test]
    fn multiplication_of_small_integers() {
        let a = Single::from_int(6);
        let b = Single::from_int(7);
        assert_eq!(a.imul(b).unwrap().to_int().unwrap(), 42);
    }

    #[test]
    fn single_widens_to_double_exactly() {
        let s = Single::from_int(-4096);
        let d = s.widen();
        assert_eq!(d.to_int().unwrap(), -4096);
    }

    #[test]
    fn value_zero_for_each_sigil() {
        assert_eq!(Value::zero_for('%'), Value::Integer(0));
        assert!(Value::zero_for('$').is_zero());
    }

    #[test]
    fn string_to_numeric_is_type_mismatch() {
        let v = Value::Str(BasicString::from("abc"));
        assert_eq!(v.to_type('%'), Err(BasicError::TypeMismatch));
    }

    #[test]
    fn widening_integer_to_single_is_exact() {
        let v = Value::Integer(42);
        match v.to_type('!').unwrap() {
            Value::Single(s) => assert_eq!(s.to_int().unwrap(), 42),
            _ => panic!("expected Single"),
        }
    }

    #[test]
    fn single_from_f64_round_trips_a_quarter_exactly() {
        let s = Single::from_f64(0.25).unwrap();
        assert_eq!(s.to_f64(), 0.25);
    }

    #[test]
    fn double_from_f64_keeps_fractional_precision() {
        let d = Double::from_f64(3.14).unwrap();
        assert!((d.to_f64() - 3.14).abs() < 1e-12);
    }

    #[test]
    fn free_to_f64_no_longer_rounds_through_to_int() {
        let v = Value::Single(Single::from_f64(0.25).unwrap());
        assert_eq!(to_f64(&v).unwrap(), 0.25);
    }

    /// The nine reference/accepted byte pairs from
    /// `original_source/test/numbers/values-test.py`'s `test_bytes` and
    /// `test_bigbytes` `accepted` tables (see SPEC_FULL.md §4.5). The
    /// fixture inputs that produced these sums (`input/BYTES.DAT`,
    /// `input/BIGBYTES.DAT`) aren't part of the retrieved corpus, so this
    /// can't replay the actual additions — what it asserts is the
    /// documented shape of the drift itself: each "accepted" value is the
    /// reference value with its low mantissa byte incremented by exactly
    /// one (a one-ULP rounding difference, not a divergent magnitude), and
    /// both byte patterns parse and round-trip as well-formed singles.
    #[test]
    fn documented_one_ulp_exceptions_are_exactly_one_ulp() {
        let pairs: [(u32, u32); 9] = [
            (0x920a03ce, 0x930a03ce),
            (0x52810dbe, 0x53810dbe),
            (0x922ed14b, 0x932ed14b),
            (0x80c02477, 0x81c02477),
            (0xfe4b89df, 0xff4b89df),
            (0xa9b37594, 0xa8b37594),
            (0xbc3e8549, 0xbd3e8549),
            (0xb2337a91, 0xb3337a91),
            (0x2ef4007a, 0x2ff4007a),
        ];
        for (reference, accepted) in pairs {
            let r = reference.to_be_bytes();
            let a = accepted.to_be_bytes();
            // Low mantissa byte differs by one; exponent and the rest of
            // the mantissa are untouched.
            let diff = (a[0] as i32 - r[0] as i32).unsigned_abs();
            assert_eq!(diff, 1, "{reference:08x} -> {accepted:08x} is not a one-byte drift");
            assert_eq!(&a[1..], &r[1..]);

            // Both patterns are well-formed singles that round-trip
            // through bytes exactly.
            assert_eq!(Single::from_bytes(r).to_bytes(), r);
            assert_eq!(Single::from_bytes(a).to_bytes(), a);
        }
    }
}
