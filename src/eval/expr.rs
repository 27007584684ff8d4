// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Typed expression evaluation with S840D numeric semantics.
//!
//! Arithmetic promotes CHAR+CHAR to CHAR (wrapping), integer-coercible pairs
//! to INT and everything else to REAL.  Overflow of INT and REAL arithmetic
//! raises alarm 14051; comparisons on REAL are epsilon tolerant.

use crate::alarm::{Alarm, Error};
use crate::ast::{BinOp, Expr, Func1, Func2, LValue, UnOp};
use crate::value::{assign_cast, assign_cast_int, Value};
use crate::vars::{AccessError, Variables};

/// Relative tolerance of REAL comparisons.
pub const EPSILON: f64 = 4e-12;

/// Evaluate an expression against the variable store.
pub fn eval(expr: &Expr, vars: &Variables) -> Result<Value, Error> {
    match expr {
        Expr::Lit(value) => Ok(value.clone()),
        Expr::Var(name) => match vars.get_value(name) {
            Ok(value) => Ok(value),
            Err(AccessError::NotDefined) => Err(Alarm::NameNotDefined.into()),
            Err(err) => Err(Error::bug(format!("variable read failed: {:?}", err))),
        },
        Expr::Index(name, indices) => {
            let indices = eval_indices(indices, vars)?;
            match vars.get_array_value(name, &indices) {
                Ok(value) => Ok(value),
                Err(AccessError::NotDefined) => Err(Alarm::NameNotDefined.into()),
                Err(AccessError::IndexOutOfBounds) => Err(Alarm::ArrayIndexOutOfRange.into()),
                Err(err) => Err(Error::bug(format!("array read failed: {:?}", err))),
            }
        }
        Expr::Unary(op, arg) => {
            let value = eval(arg, vars)?;
            match op {
                UnOp::Minus => negate(&value),
                UnOp::Not => Ok(Value::Bool(!to_bool(&value)?)),
                UnOp::BitNot => bitwise_not(&value),
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let v1 = eval(lhs, vars)?;
            let v2 = eval(rhs, vars)?;
            binary_op(*op, &v1, &v2)
        }
        Expr::Func1(func, arg) => {
            let value = to_real(&eval(arg, vars)?)?;
            Ok(Value::Real(match func {
                Func1::Sin => value.to_radians().sin(),
                Func1::Cos => value.to_radians().cos(),
                Func1::Tan => value.to_radians().tan(),
                Func1::Asin => value.asin().to_degrees(),
                Func1::Acos => value.acos().to_degrees(),
                Func1::Sqrt => value.sqrt(),
                Func1::Abs => value.abs(),
                Func1::Pot => value * value,
                Func1::Trunc => value.trunc(),
                Func1::Round => value.round(),
                Func1::Ln => value.ln(),
                Func1::Exp => value.exp(),
            }))
        }
        Expr::Func2(func, arg1, arg2) => {
            let v1 = to_real(&eval(arg1, vars)?)?;
            let v2 = to_real(&eval(arg2, vars)?)?;
            Ok(Value::Real(match func {
                Func2::Atan2 => v1.atan2(v2).to_degrees(),
                Func2::Minval => v1.min(v2),
                Func2::Maxval => v1.max(v2),
            }))
        }
    }
}

/// Read the current value of an assignment target.
pub fn read_lvalue(lvalue: &LValue, vars: &Variables) -> Result<Value, Error> {
    match lvalue {
        LValue::Var(name) => eval(&Expr::Var(name.clone()), vars),
        LValue::Array(name, indices) => {
            let indices = eval_indices(indices, vars)?;
            match vars.get_array_value(name, &indices) {
                Ok(value) => Ok(value),
                Err(AccessError::NotDefined) => Err(Alarm::NameNotDefined.into()),
                Err(AccessError::IndexOutOfBounds) => Err(Alarm::ArrayIndexOutOfRange.into()),
                Err(err) => Err(Error::bug(format!("array read failed: {:?}", err))),
            }
        }
    }
}

/// Assign a value to a variable or array element.  The value is cast to the
/// target's element type.
pub fn write_lvalue(lvalue: &LValue, value: Value, vars: &mut Variables) -> Result<(), Error> {
    match lvalue {
        LValue::Var(name) => {
            let old = vars.get_value(name).map_err(|_| Alarm::NameNotDefined)?;
            let cast = assign_cast(&value, old.tag())?;
            vars.set_value(name, cast)
                .map_err(|err| Error::bug(format!("variable write failed: {:?}", err)))
        }
        LValue::Array(name, indices) => {
            let indices = eval_indices(indices, vars)?;
            let old = match vars.get_array_value(name, &indices) {
                Ok(value) => value,
                Err(AccessError::NotDefined) => return Err(Alarm::NameNotDefined.into()),
                Err(AccessError::IndexOutOfBounds) => {
                    return Err(Alarm::ArrayIndexOutOfRange.into())
                }
                Err(err) => return Err(Error::bug(format!("array write failed: {:?}", err))),
            };
            let cast = assign_cast(&value, old.tag())?;
            vars.set_array_value(name, cast, &indices)
                .map_err(|err| Error::bug(format!("array write failed: {:?}", err)))
        }
    }
}

/// Evaluate array index expressions.  Any alarm here is reported as an
/// incorrect index type.
fn eval_indices(indices: &[Expr], vars: &Variables) -> Result<Vec<i32>, Error> {
    indices
        .iter()
        .map(|index| match eval(index, vars) {
            Ok(value) => assign_cast_int(&value).map_err(|_| Alarm::BadIndexType.into()),
            Err(Error::Alarm(_)) => Err(Alarm::BadIndexType.into()),
            Err(bug) => Err(bug),
        })
        .collect()
}

/// Apply a binary operator to two evaluated values.
pub fn binary_op(op: BinOp, v1: &Value, v2: &Value) -> Result<Value, Error> {
    match op {
        // Arithmetic
        BinOp::Add => binary_arith(v1, v2, u8::wrapping_add, i32::checked_add, |x, y| x + y),
        BinOp::Sub => binary_arith(v1, v2, u8::wrapping_sub, i32::checked_sub, |x, y| x - y),
        BinOp::Mul => binary_arith(v1, v2, u8::wrapping_mul, i32::checked_mul, |x, y| x * y),
        BinOp::Div => binary_div(v1, v2, |x, y| x / y),
        BinOp::IntDiv => match binary_div(v1, v2, |x, y| x / y)? {
            Value::Real(r) => Ok(Value::Real(r.trunc())),
            value => Ok(value),
        },
        BinOp::Mod => binary_div(v1, v2, |x, y| x % y),

        // Logic
        BinOp::And => binary_logic(v1, v2, |x, y| x && y),
        BinOp::Or => binary_logic(v1, v2, |x, y| x || y),
        BinOp::Xor => binary_logic(v1, v2, |x, y| x ^ y),

        // Comparison
        BinOp::Eq => Ok(Value::Bool(compare(v1, v2, Relation::Equal)?)),
        BinOp::Ne => Ok(Value::Bool(!compare(v1, v2, Relation::Equal)?)),
        BinOp::Gt => Ok(Value::Bool(compare(v1, v2, Relation::Greater)?)),
        BinOp::Lt => Ok(Value::Bool(compare(v1, v2, Relation::Less)?)),
        BinOp::Ge => Ok(Value::Bool(!compare(v1, v2, Relation::Less)?)),
        BinOp::Le => Ok(Value::Bool(!compare(v1, v2, Relation::Greater)?)),

        // Bitwise
        BinOp::BitAnd => binary_bitwise(v1, v2, |x, y| x & y, |x, y| x & y),
        BinOp::BitOr => binary_bitwise(v1, v2, |x, y| x | y, |x, y| x | y),
        BinOp::BitXor => binary_bitwise(v1, v2, |x, y| x ^ y, |x, y| x ^ y),
    }
}

/// Convert to REAL for arithmetic; strings do not take part.
pub fn to_real(value: &Value) -> Result<f64, Error> {
    match value {
        Value::Int(i) => Ok(*i as f64),
        Value::Real(r) => Ok(*r),
        Value::Bool(b) => Ok(*b as u8 as f64),
        Value::Char(c) => Ok(*c as f64),
        Value::Str(_) => Err(Alarm::IncompatibleType.into()),
    }
}

/// Convert to BOOL for logic operators; strings do not take part.
pub fn to_bool(value: &Value) -> Result<bool, Error> {
    match value {
        Value::Int(i) => Ok(*i != 0),
        Value::Real(r) => Ok(r.abs() != 0.0),
        Value::Bool(b) => Ok(*b),
        Value::Char(c) => Ok(*c != 0),
        Value::Str(_) => Err(Alarm::IncompatibleType.into()),
    }
}

/// INT view for arithmetic promotion: only CHAR widens implicitly.
fn arith_int(value: &Value) -> Option<i32> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Char(c) => Some(*c as i32),
        _ => None,
    }
}

fn binary_arith(
    v1: &Value,
    v2: &Value,
    char_op: fn(u8, u8) -> u8,
    int_op: fn(i32, i32) -> Option<i32>,
    real_op: fn(f64, f64) -> f64,
) -> Result<Value, Error> {
    if let (Value::Char(c1), Value::Char(c2)) = (v1, v2) {
        // No overflow check for CHAR.
        return Ok(Value::Char(char_op(*c1, *c2)));
    }
    if let Some(i1) = arith_int(v1) {
        if let Some(i2) = arith_int(v2) {
            return int_op(i1, i2).map(Value::Int).ok_or(Alarm::ArithmeticFault.into());
        }
        if let Value::Real(r2) = v2 {
            return checked_real(real_op(i1 as f64, *r2));
        }
        return Err(Alarm::IncompatibleType.into());
    }
    if let Value::Real(r1) = v1 {
        let r2 = match v2 {
            Value::Int(i2) => *i2 as f64,
            Value::Real(r2) => *r2,
            _ => return Err(Alarm::IncompatibleType.into()),
        };
        return checked_real(real_op(*r1, r2));
    }
    Err(Alarm::IncompatibleType.into())
}

/// Division family: all numeric inputs produce a REAL result; division by an
/// integral zero and non-finite results raise 14051.
fn binary_div(v1: &Value, v2: &Value, real_op: fn(f64, f64) -> f64) -> Result<Value, Error> {
    let promote = |v: &Value| -> Result<(f64, bool), Error> {
        match v {
            Value::Char(c) => Ok((*c as f64, true)),
            Value::Int(i) => Ok((*i as f64, true)),
            Value::Real(r) => Ok((*r, false)),
            _ => Err(Alarm::IncompatibleType.into()),
        }
    };
    let (x, _) = promote(v1)?;
    let (y, y_integral) = promote(v2)?;
    if y_integral && y == 0.0 {
        return Err(Alarm::ArithmeticFault.into());
    }
    checked_real(real_op(x, y))
}

fn checked_real(result: f64) -> Result<Value, Error> {
    if result.is_infinite() || result.is_nan() {
        Err(Alarm::ArithmeticFault.into())
    } else {
        Ok(Value::Real(result))
    }
}

fn binary_logic(v1: &Value, v2: &Value, op: fn(bool, bool) -> bool) -> Result<Value, Error> {
    Ok(Value::Bool(op(to_bool(v1)?, to_bool(v2)?)))
}

fn binary_bitwise(
    v1: &Value,
    v2: &Value,
    char_op: fn(u8, u8) -> u8,
    int_op: fn(i32, i32) -> i32,
) -> Result<Value, Error> {
    match (v1, v2) {
        (Value::Char(c1), Value::Char(c2)) => Ok(Value::Char(char_op(*c1, *c2))),
        (Value::Char(c1), Value::Int(i2)) => Ok(Value::Int(int_op(*c1 as i32, *i2))),
        (Value::Int(i1), Value::Char(c2)) => Ok(Value::Int(int_op(*i1, *c2 as i32))),
        (Value::Int(i1), Value::Int(i2)) => Ok(Value::Int(int_op(*i1, *i2))),
        _ => Err(Alarm::IncompatibleType.into()),
    }
}

enum Relation {
    Equal,
    Less,
    Greater,
}

impl Relation {
    fn compare_eps(&self, x: f64, y: f64) -> bool {
        let eps = x.abs().max(y.abs()) * EPSILON;
        match self {
            Relation::Equal => (x - y).abs() <= eps,
            Relation::Less => x < y - eps,
            Relation::Greater => x > y + eps,
        }
    }

    fn compare_ord<T: PartialOrd>(&self, x: T, y: T) -> bool {
        match self {
            Relation::Equal => x == y,
            Relation::Less => x < y,
            Relation::Greater => x > y,
        }
    }
}

/// INT view for comparisons: BOOL also coerces here.
fn compare_int(value: &Value) -> Option<i32> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(*b as i32),
        Value::Char(c) => Some(*c as i32),
        _ => None,
    }
}

fn compare(v1: &Value, v2: &Value, rel: Relation) -> Result<bool, Error> {
    if let Value::Real(r1) = v1 {
        let r2 = to_real(v2).map_err(|_| Alarm::IncompatibleType)?;
        return Ok(rel.compare_eps(*r1, r2));
    }
    if let Value::Real(r2) = v2 {
        let r1 = to_real(v1).map_err(|_| Alarm::IncompatibleType)?;
        return Ok(rel.compare_eps(r1, *r2));
    }
    if let (Some(i1), Some(i2)) = (compare_int(v1), compare_int(v2)) {
        return Ok(rel.compare_ord(i1, i2));
    }
    if let (Value::Str(s1), Value::Str(s2)) = (v1, v2) {
        return Ok(rel.compare_ord(s1, s2));
    }
    Err(Alarm::IncompatibleType.into())
}

fn negate(value: &Value) -> Result<Value, Error> {
    match value {
        // S840D does not range check the negation of INT_MIN.
        Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
        Value::Real(r) => Ok(Value::Real(-r)),
        _ => Err(Alarm::IncompatibleType.into()),
    }
}

fn bitwise_not(value: &Value) -> Result<Value, Error> {
    match value {
        Value::Char(c) => Ok(Value::Char(!c)),
        Value::Int(i) => Ok(Value::Int(!i)),
        _ => Err(Alarm::IncompatibleType.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i32) -> Value {
        Value::Int(i)
    }

    fn real(r: f64) -> Value {
        Value::Real(r)
    }

    #[test]
    fn promotion() {
        assert_eq!(binary_op(BinOp::Add, &int(2), &int(3)), Ok(int(5)));
        assert_eq!(binary_op(BinOp::Add, &int(2), &real(0.5)), Ok(real(2.5)));
        assert_eq!(
            binary_op(BinOp::Add, &Value::Char(200), &Value::Char(100)),
            Ok(Value::Char(44))
        );
        assert_eq!(binary_op(BinOp::Add, &Value::Char(1), &int(2)), Ok(int(3)));
        assert_eq!(
            binary_op(BinOp::Add, &int(1), &Value::Str("x".into())),
            Err(Alarm::IncompatibleType.into())
        );
    }

    #[test]
    fn overflow_is_an_alarm() {
        assert_eq!(
            binary_op(BinOp::Add, &int(i32::MAX), &int(1)),
            Err(Alarm::ArithmeticFault.into())
        );
        assert_eq!(
            binary_op(BinOp::Mul, &real(1e308), &real(1e308)),
            Err(Alarm::ArithmeticFault.into())
        );
        assert_eq!(
            binary_op(BinOp::Div, &int(1), &int(0)),
            Err(Alarm::ArithmeticFault.into())
        );
        assert_eq!(
            binary_op(BinOp::Div, &real(1.0), &real(0.0)),
            Err(Alarm::ArithmeticFault.into())
        );
    }

    #[test]
    fn division_family() {
        assert_eq!(binary_op(BinOp::Div, &int(7), &int(2)), Ok(real(3.5)));
        assert_eq!(binary_op(BinOp::IntDiv, &int(7), &int(2)), Ok(real(3.0)));
        assert_eq!(binary_op(BinOp::IntDiv, &int(-7), &int(2)), Ok(real(-3.0)));
        assert_eq!(binary_op(BinOp::Mod, &real(7.5), &real(2.0)), Ok(real(1.5)));
    }

    #[test]
    fn epsilon_comparison() {
        let x = 123.456;
        assert_eq!(
            binary_op(BinOp::Eq, &real(x), &real(x * (1.0 + EPSILON / 2.0))),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            binary_op(BinOp::Eq, &real(x), &real(x * (1.0 + EPSILON * 3.0))),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            binary_op(BinOp::Lt, &real(x), &real(x * (1.0 + EPSILON / 2.0))),
            Ok(Value::Bool(false))
        );
        assert_eq!(binary_op(BinOp::Le, &real(1.0), &real(1.0)), Ok(Value::Bool(true)));
    }

    #[test]
    fn trigonometry_in_degrees() {
        let vars = Variables::new();
        let sin90 = eval(
            &Expr::Func1(Func1::Sin, Box::new(Expr::Lit(real(90.0)))),
            &vars,
        )
        .unwrap();
        match sin90 {
            Value::Real(r) => assert!((r - 1.0).abs() < 1e-15),
            _ => panic!("SIN must yield REAL"),
        }
        let atan = eval(
            &Expr::Func2(
                Func2::Atan2,
                Box::new(Expr::Lit(real(1.0))),
                Box::new(Expr::Lit(real(1.0))),
            ),
            &vars,
        )
        .unwrap();
        match atan {
            Value::Real(r) => assert!((r - 45.0).abs() < 1e-12),
            _ => panic!("ATAN2 must yield REAL"),
        }
    }

    #[test]
    fn undefined_name_alarm() {
        let vars = Variables::new();
        assert_eq!(
            eval(&Expr::Var("NIX".into()), &vars),
            Err(Alarm::NameNotDefined.into())
        );
    }
}
