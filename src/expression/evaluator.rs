// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{
    error::PreprocessError,
    expression::ast::{BinaryOperator, Expression, UnaryOperator, Value},
    location::Location,
};

/// Evaluates with the usual arithmetic conversions of `intmax_t`/`uintmax_t`:
/// if either operand is unsigned, the operation is unsigned.
///
/// `&&`, `||` and `?:` only evaluate the operands they need,
/// so `0 && 1 / 0` is not an error.
pub fn evaluate_expression(expression: &Expression) -> Result<Value, PreprocessError> {
    match expression {
        Expression::Number(value, _) => Ok(*value),
        Expression::Binary(BinaryOperator::And, _, left_exp, right_exp) => {
            if !evaluate_expression(left_exp)?.is_true() {
                return Ok(Value::from_bool(false));
            }
            Ok(Value::from_bool(evaluate_expression(right_exp)?.is_true()))
        }
        Expression::Binary(BinaryOperator::Or, _, left_exp, right_exp) => {
            if evaluate_expression(left_exp)?.is_true() {
                return Ok(Value::from_bool(true));
            }
            Ok(Value::from_bool(evaluate_expression(right_exp)?.is_true()))
        }
        Expression::Binary(operator, operator_location, left_exp, right_exp) => {
            let left = evaluate_expression(left_exp)?;
            let right = evaluate_expression(right_exp)?;
            evaluate_binary_expression(*operator, operator_location, left, right)
        }
        Expression::Unary(operator, _, exp) => {
            let value = evaluate_expression(exp)?;
            Ok(evaluate_unary_expression(*operator, value))
        }
        Expression::Conditional(condition, then_exp, else_exp) => {
            let (taken, other) = if evaluate_expression(condition)?.is_true() {
                (then_exp, else_exp)
            } else {
                (else_exp, then_exp)
            };

            // the result type is unsigned if either branch is unsigned
            let value = evaluate_expression(taken)?;
            Ok(Value {
                value: value.value,
                unsigned: value.unsigned || contains_unsigned(other),
            })
        }
    }
}

// Whether the type of a branch that was not evaluated is unsigned.
fn contains_unsigned(expression: &Expression) -> bool {
    match expression {
        Expression::Number(value, _) => value.unsigned,
        Expression::Binary(
            BinaryOperator::And
            | BinaryOperator::Or
            | BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::LessThan
            | BinaryOperator::LessThanOrEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanOrEqual,
            ..,
        ) => false,
        Expression::Binary(
            BinaryOperator::ShiftLeft | BinaryOperator::ShiftRight,
            _,
            left,
            _,
        ) => contains_unsigned(left),
        Expression::Binary(BinaryOperator::Comma, _, _, right) => contains_unsigned(right),
        Expression::Binary(_, _, left, right) => {
            contains_unsigned(left) || contains_unsigned(right)
        }
        Expression::Unary(UnaryOperator::LogicalNot, _, _) => false,
        Expression::Unary(_, _, operand) => contains_unsigned(operand),
        Expression::Conditional(_, then_exp, else_exp) => {
            contains_unsigned(then_exp) || contains_unsigned(else_exp)
        }
    }
}

fn evaluate_binary_expression(
    operator: BinaryOperator,
    operator_location: &Location,
    left: Value,
    right: Value,
) -> Result<Value, PreprocessError> {
    let unsigned = left.unsigned || right.unsigned;
    let (l, r) = (left.value, right.value);

    let arithmetic = |signed_value: i64, unsigned_value: u64| {
        if unsigned {
            Value::unsigned(unsigned_value)
        } else {
            Value::signed(signed_value)
        }
    };

    let result = match operator {
        // Arithmetic operators
        BinaryOperator::Add => arithmetic(l.wrapping_add(r), (l as u64).wrapping_add(r as u64)),
        BinaryOperator::Subtract => {
            arithmetic(l.wrapping_sub(r), (l as u64).wrapping_sub(r as u64))
        }
        BinaryOperator::Multiply => {
            arithmetic(l.wrapping_mul(r), (l as u64).wrapping_mul(r as u64))
        }
        BinaryOperator::Divide | BinaryOperator::Modulo => {
            if r == 0 {
                return Err(PreprocessError::message(
                    if operator == BinaryOperator::Divide {
                        "division by zero in preprocessor expression"
                    } else {
                        "remainder by zero in preprocessor expression"
                    },
                    *operator_location,
                ));
            }

            if operator == BinaryOperator::Divide {
                arithmetic(l.wrapping_div(r), (l as u64) / (r as u64))
            } else {
                arithmetic(l.wrapping_rem(r), (l as u64) % (r as u64))
            }
        }
        // Relational operators
        BinaryOperator::Equal => Value::from_bool(l == r),
        BinaryOperator::NotEqual => Value::from_bool(l != r),
        BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => {
            let ordering = if unsigned {
                (l as u64).cmp(&(r as u64))
            } else {
                l.cmp(&r)
            };

            Value::from_bool(match operator {
                BinaryOperator::LessThan => ordering.is_lt(),
                BinaryOperator::LessThanOrEqual => ordering.is_le(),
                BinaryOperator::GreaterThan => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
        // Logical operators, evaluated lazily by the caller
        BinaryOperator::And => Value::from_bool(l != 0 && r != 0),
        BinaryOperator::Or => Value::from_bool(l != 0 || r != 0),
        // Bitwise operators
        BinaryOperator::BitwiseAnd => arithmetic(l & r, (l & r) as u64),
        BinaryOperator::BitwiseOr => arithmetic(l | r, (l | r) as u64),
        BinaryOperator::BitwiseXor => arithmetic(l ^ r, (l ^ r) as u64),
        BinaryOperator::ShiftLeft | BinaryOperator::ShiftRight => {
            // the type of a shift is the type of its left operand
            let amount = (r as u64).min(63) as u32;
            if operator == BinaryOperator::ShiftLeft {
                if left.unsigned {
                    Value::unsigned((l as u64) << amount)
                } else {
                    Value::signed(l.wrapping_shl(amount))
                }
            } else if left.unsigned {
                Value::unsigned((l as u64) >> amount)
            } else {
                Value::signed(l >> amount)
            }
        }
        BinaryOperator::Comma => right,
    };

    Ok(result)
}

fn evaluate_unary_expression(operator: UnaryOperator, value: Value) -> Value {
    match operator {
        UnaryOperator::Plus => value,
        UnaryOperator::Minus => Value {
            value: value.value.wrapping_neg(),
            unsigned: value.unsigned,
        },
        UnaryOperator::LogicalNot => Value::from_bool(!value.is_true()),
        UnaryOperator::BitwiseNot => Value {
            value: !value.value,
            unsigned: value.unsigned,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::{
        expression::{ast::Value, evaluator::evaluate_expression, parser::parse_from_tokens},
        lexer::lex_source,
        location::Location,
        source_buffer::SourceBuffer,
        token::Token,
    };

    fn try_eval(s: &str) -> Result<Value, String> {
        let (mut tokens, _) = lex_source(Arc::new(SourceBuffer::new("t.c", s)));
        tokens.retain(|t| t.token != Token::EndOfInput);
        let expression =
            parse_from_tokens(tokens, Location::default()).map_err(|e| e.to_string())?;
        evaluate_expression(&expression).map_err(|e| e.to_string())
    }

    fn eval(s: &str) -> i64 {
        try_eval(s).unwrap().value
    }

    #[test]
    fn test_evaluate_expression_number() {
        assert_eq!(eval("42"), 42);
        assert_eq!(eval("-42"), -42);
        assert_eq!(eval("0x2a"), 42);
        assert_eq!(eval("0b101010"), 42);
        assert_eq!(eval("052"), 42);
        assert_eq!(eval("'a'"), 97);
        assert_eq!(eval("FOO"), 0);
    }

    #[test]
    fn test_evaluate_expression_binary() {
        // Arithmetic operations
        assert_eq!(eval("8 + 4"), 12);
        assert_eq!(eval("8 - 4"), 4);
        assert_eq!(eval("8 * 4"), 32);
        assert_eq!(eval("8 / 4"), 2);
        assert_eq!(eval("8 % 3"), 2);

        // Relational operations
        assert_eq!(eval("8 == 8"), 1);
        assert_eq!(eval("8 != 4"), 1);
        assert_eq!(eval("8 < 10"), 1);
        assert_eq!(eval("8 >= 10"), 0);

        // Logical operations
        assert_eq!(eval("1 && 0"), 0);
        assert_eq!(eval("0 || 2"), 1);

        // Bitwise operations
        assert_eq!(eval("8 & 4"), 0);
        assert_eq!(eval("8 | 4"), 12);
        assert_eq!(eval("8 ^ 4"), 12);
        assert_eq!(eval("8 << 2"), 32);
        assert_eq!(eval("8 >> 2"), 2);

        // Mixed operations with precedence
        assert_eq!(eval("2 + 3 * 4 - 5"), 9);
        assert_eq!(eval("8 == 8 && 8 != 4"), 1);
        assert_eq!(eval("(2 + 3) * 4"), 20);

        // Conditional and comma
        assert_eq!(eval("1 ? 2 : 3"), 2);
        assert_eq!(eval("0 ? 2 : 0 ? 3 : 4"), 4);
        assert_eq!(eval("(1, 5)"), 5);
    }

    #[test]
    fn test_evaluate_expression_unsigned() {
        // -1 converted to unsigned is the largest value
        assert_eq!(eval("-1 > 0u"), 1);
        assert_eq!(eval("-1 > 0"), 0);
        assert_eq!(try_eval("1u + 2").unwrap(), Value::unsigned(3));
        assert_eq!(eval("0xFFFFFFFFFFFFFFFF == -1"), 1);
    }

    #[test]
    fn test_evaluate_expression_unary() {
        assert_eq!(eval("+42"), 42);
        assert_eq!(eval("!0"), 1);
        assert_eq!(eval("!1"), 0);
        assert_eq!(eval("~42"), -43);
        assert_eq!(eval("-8 + 4"), -4);
        assert_eq!(eval("8 - -4"), 12);
    }

    #[test]
    fn test_evaluate_short_circuit() {
        assert_eq!(eval("0 && 1 / 0"), 0);
        assert_eq!(eval("1 || 1 % 0"), 1);
        assert_eq!(eval("1 ? 7 : 1 / 0"), 7);

        assert_eq!(
            try_eval("1 / 0"),
            Err("division by zero in preprocessor expression".to_owned())
        );
        assert_eq!(
            try_eval("1 % (2 - 2)"),
            Err("remainder by zero in preprocessor expression".to_owned())
        );
    }
}
