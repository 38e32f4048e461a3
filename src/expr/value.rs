//! Canonical location for width-aware scalar arithmetic.
//! Rule: every constant fold in the simplifier goes through this file so that
//! wraparound and IEEE-754 semantics match the solver bit-for-bit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed two's-complement integer widths supported by the expression model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }

    /// Largest representable signed value at this width.
    pub fn max_value(self) -> i64 {
        match self {
            IntWidth::W8 => i8::MAX as i64,
            IntWidth::W16 => i16::MAX as i64,
            IntWidth::W32 => i32::MAX as i64,
            IntWidth::W64 => i64::MAX,
        }
    }

    /// Smallest representable signed value at this width.
    pub fn min_value(self) -> i64 {
        match self {
            IntWidth::W8 => i8::MIN as i64,
            IntWidth::W16 => i16::MIN as i64,
            IntWidth::W32 => i32::MIN as i64,
            IntWidth::W64 => i64::MIN,
        }
    }
}

/// IEEE-754 binary float widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatWidth {
    F32,
    F64,
}

/// A signed integer constant canonicalized to its declared width.
///
/// The value is stored sign-extended into an `i64`; `canon` truncates to the
/// low `width` bits and re-extends, so `IntValue { W8, 0x80 }` reads as -128.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntValue {
    width: IntWidth,
    value: i64,
}

impl IntValue {
    pub fn new(width: IntWidth, raw: i64) -> Self {
        Self {
            width,
            value: canon(width, raw),
        }
    }

    pub fn width(self) -> IntWidth {
        self.width
    }

    pub fn value(self) -> i64 {
        self.value
    }

    pub fn is_zero(self) -> bool {
        self.value == 0
    }

    pub fn is_one(self) -> bool {
        self.value == 1
    }

    pub fn is_minus_one(self) -> bool {
        self.value == -1
    }

    pub fn is_min(self) -> bool {
        self.value == self.width.min_value()
    }

    pub fn is_max(self) -> bool {
        self.value == self.width.max_value()
    }

    pub fn wrapping_add(self, rhs: IntValue) -> IntValue {
        debug_assert_eq!(self.width, rhs.width);
        IntValue::new(self.width, self.value.wrapping_add(rhs.value))
    }

    pub fn wrapping_sub(self, rhs: IntValue) -> IntValue {
        debug_assert_eq!(self.width, rhs.width);
        IntValue::new(self.width, self.value.wrapping_sub(rhs.value))
    }

    pub fn wrapping_mul(self, rhs: IntValue) -> IntValue {
        debug_assert_eq!(self.width, rhs.width);
        IntValue::new(self.width, self.value.wrapping_mul(rhs.value))
    }

    pub fn wrapping_neg(self) -> IntValue {
        IntValue::new(self.width, self.value.wrapping_neg())
    }

    /// Signed division at the declared width. `None` for a zero divisor
    /// (the fold bails and the fact stays opaque for the solver).
    pub fn checked_div(self, rhs: IntValue) -> Option<IntValue> {
        debug_assert_eq!(self.width, rhs.width);
        if rhs.value == 0 {
            return None;
        }
        // MIN / -1 wraps back to MIN at every width.
        Some(IntValue::new(self.width, self.value.wrapping_div(rhs.value)))
    }

    /// Signed remainder at the declared width. `None` for a zero divisor.
    pub fn checked_rem(self, rhs: IntValue) -> Option<IntValue> {
        debug_assert_eq!(self.width, rhs.width);
        if rhs.value == 0 {
            return None;
        }
        Some(IntValue::new(self.width, self.value.wrapping_rem(rhs.value)))
    }

    pub fn bit_and(self, rhs: IntValue) -> IntValue {
        debug_assert_eq!(self.width, rhs.width);
        IntValue::new(self.width, self.value & rhs.value)
    }

    pub fn bit_or(self, rhs: IntValue) -> IntValue {
        debug_assert_eq!(self.width, rhs.width);
        IntValue::new(self.width, self.value | rhs.value)
    }

    pub fn bit_xor(self, rhs: IntValue) -> IntValue {
        debug_assert_eq!(self.width, rhs.width);
        IntValue::new(self.width, self.value ^ rhs.value)
    }

    /// Reduce a shift amount modulo the operand width (a 32-bit shift by 37
    /// behaves as a shift by 5).
    pub fn shift_amount(self, width: IntWidth) -> u32 {
        (self.value as u64 % width.bits() as u64) as u32
    }

    pub fn shl(self, amount: IntValue) -> IntValue {
        let n = amount.shift_amount(self.width);
        IntValue::new(self.width, self.value.wrapping_shl(n))
    }

    /// Arithmetic (sign-propagating) right shift.
    pub fn shr(self, amount: IntValue) -> IntValue {
        let n = amount.shift_amount(self.width);
        IntValue::new(self.width, self.value.wrapping_shr(n))
    }

    /// Logical right shift on the low `width` bits.
    pub fn ushr(self, amount: IntValue) -> IntValue {
        let n = amount.shift_amount(self.width);
        let bits = self.width.bits();
        let mask = if bits == 64 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        };
        let unsigned = (self.value as u64) & mask;
        IntValue::new(self.width, (unsigned >> n) as i64)
    }

    /// Three-way signed comparison (`lcmp` semantics): -1, 0, or 1 as a W32.
    pub fn cmp_value(self, rhs: IntValue) -> IntValue {
        debug_assert_eq!(self.width, rhs.width);
        let ord = match self.value.cmp(&rhs.value) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        };
        IntValue::new(IntWidth::W32, ord)
    }

    /// Truncate or sign-extend into `target`.
    pub fn cast(self, target: IntWidth) -> IntValue {
        IntValue::new(target, self.value)
    }
}

impl fmt::Display for IntValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}i{}", self.value, self.width.bits())
    }
}

fn canon(width: IntWidth, raw: i64) -> i64 {
    match width {
        IntWidth::W8 => raw as i8 as i64,
        IntWidth::W16 => raw as i16 as i64,
        IntWidth::W32 => raw as i32 as i64,
        IntWidth::W64 => raw,
    }
}

/// An IEEE-754 float constant stored by bit pattern for its declared width.
///
/// Structural equality and hashing are bit-pattern based, so two NaN literals
/// with the same payload are the same node while `==` folding below still
/// follows IEEE semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FloatValue {
    width: FloatWidth,
    bits: u64,
}

impl FloatValue {
    pub fn from_f32(v: f32) -> Self {
        Self {
            width: FloatWidth::F32,
            bits: v.to_bits() as u64,
        }
    }

    pub fn from_f64(v: f64) -> Self {
        Self {
            width: FloatWidth::F64,
            bits: v.to_bits(),
        }
    }

    pub fn width(self) -> FloatWidth {
        self.width
    }

    pub fn as_f64(self) -> f64 {
        match self.width {
            FloatWidth::F32 => f32::from_bits(self.bits as u32) as f64,
            FloatWidth::F64 => f64::from_bits(self.bits),
        }
    }

    pub fn is_nan(self) -> bool {
        self.as_f64().is_nan()
    }

    fn rebuild(width: FloatWidth, v: f64) -> Self {
        match width {
            FloatWidth::F32 => Self::from_f32(v as f32),
            FloatWidth::F64 => Self::from_f64(v),
        }
    }

    pub fn add(self, rhs: FloatValue) -> FloatValue {
        debug_assert_eq!(self.width, rhs.width);
        Self::rebuild(self.width, self.as_f64() + rhs.as_f64())
    }

    pub fn sub(self, rhs: FloatValue) -> FloatValue {
        debug_assert_eq!(self.width, rhs.width);
        Self::rebuild(self.width, self.as_f64() - rhs.as_f64())
    }

    pub fn mul(self, rhs: FloatValue) -> FloatValue {
        debug_assert_eq!(self.width, rhs.width);
        Self::rebuild(self.width, self.as_f64() * rhs.as_f64())
    }

    pub fn div(self, rhs: FloatValue) -> FloatValue {
        debug_assert_eq!(self.width, rhs.width);
        Self::rebuild(self.width, self.as_f64() / rhs.as_f64())
    }

    pub fn rem(self, rhs: FloatValue) -> FloatValue {
        debug_assert_eq!(self.width, rhs.width);
        Self::rebuild(self.width, self.as_f64() % rhs.as_f64())
    }

    pub fn neg(self) -> FloatValue {
        // Negation flips the sign bit, including on NaN.
        let sign = match self.width {
            FloatWidth::F32 => 1u64 << 31,
            FloatWidth::F64 => 1u64 << 63,
        };
        Self {
            width: self.width,
            bits: self.bits ^ sign,
        }
    }

    /// `fcmpg`/`dcmpg` semantics: NaN compares as 1.
    pub fn cmpg(self, rhs: FloatValue) -> IntValue {
        self.cmp_with_nan(rhs, 1)
    }

    /// `fcmpl`/`dcmpl` semantics: NaN compares as -1.
    pub fn cmpl(self, rhs: FloatValue) -> IntValue {
        self.cmp_with_nan(rhs, -1)
    }

    fn cmp_with_nan(self, rhs: FloatValue, nan: i64) -> IntValue {
        let (a, b) = (self.as_f64(), rhs.as_f64());
        let ord = if a.is_nan() || b.is_nan() {
            nan
        } else if a < b {
            -1
        } else if a > b {
            1
        } else {
            0
        };
        IntValue::new(IntWidth::W32, ord)
    }
}

/// A concrete value produced by constant folding or model evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarValue {
    Bool(bool),
    Int(IntValue),
    Float(FloatValue),
}

impl ScalarValue {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            ScalarValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(self) -> Option<IntValue> {
        match self {
            ScalarValue::Int(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i8_overflow_wraps_mod_256() {
        // 127 + (-128) = -1 at 8 bits.
        let a = IntValue::new(IntWidth::W8, 127);
        let b = IntValue::new(IntWidth::W8, -128);
        assert_eq!(a.wrapping_add(b).value(), -1);

        // 127 + 1 = -128 at 8 bits.
        let one = IntValue::new(IntWidth::W8, 1);
        assert_eq!(a.wrapping_add(one).value(), -128);
    }

    #[test]
    fn test_shift_amount_reduces_mod_width() {
        let x = IntValue::new(IntWidth::W32, 10);
        let by_37 = IntValue::new(IntWidth::W32, 37);
        let by_5 = IntValue::new(IntWidth::W32, 5);
        assert_eq!(x.shl(by_37), x.shl(by_5));
        assert_eq!(x.shl(by_37).value(), 10 << 5);
    }

    #[test]
    fn test_ushr_is_logical_at_declared_width() {
        let x = IntValue::new(IntWidth::W8, -1);
        let by_1 = IntValue::new(IntWidth::W8, 1);
        // 0xff >>> 1 = 0x7f at 8 bits.
        assert_eq!(x.ushr(by_1).value(), 0x7f);
        // Arithmetic shift keeps the sign.
        assert_eq!(x.shr(by_1).value(), -1);
    }

    #[test]
    fn test_min_div_minus_one_wraps() {
        let min = IntValue::new(IntWidth::W32, i32::MIN as i64);
        let m1 = IntValue::new(IntWidth::W32, -1);
        assert_eq!(min.checked_div(m1), Some(min));
        assert_eq!(min.checked_div(IntValue::new(IntWidth::W32, 0)), None);
    }

    #[test]
    fn test_float_cmpg_cmpl_nan_direction() {
        let nan = FloatValue::from_f32(f32::NAN);
        let one = FloatValue::from_f32(1.0);
        assert_eq!(nan.cmpg(one).value(), 1);
        assert_eq!(nan.cmpl(one).value(), -1);
        assert_eq!(one.cmpg(one).value(), 0);
    }

    #[test]
    fn test_cast_truncates_then_sign_extends() {
        let v = IntValue::new(IntWidth::W32, 0x1_80);
        assert_eq!(v.cast(IntWidth::W8).value(), -128);
        assert_eq!(v.cast(IntWidth::W8).cast(IntWidth::W32).value(), -128);
    }
}
