// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt::Display;

use crate::{location::Location, token::Punctuator};

/// The controlling expression of `#if` and `#elif`, after macro expansion.
///
/// `defined` and `__has_include` are replaced by `0` or `1` before parsing,
/// remaining identifiers are parsed as `0`.
#[derive(Debug, PartialEq)]
pub enum Expression {
    Number(Value, Location),
    Binary(BinaryOperator, Location, Box<Expression>, Box<Expression>),
    Unary(UnaryOperator, Location, Box<Expression>),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
}

/// An integer of the preprocessor arithmetic, i.e. `intmax_t` or `uintmax_t`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Value {
    pub value: i64,
    pub unsigned: bool,
}

impl Value {
    pub fn signed(value: i64) -> Self {
        Self {
            value,
            unsigned: false,
        }
    }

    pub fn unsigned(value: u64) -> Self {
        Self {
            value: value as i64,
            unsigned: true,
        }
    }

    pub fn from_bool(b: bool) -> Self {
        Self::signed(if b { 1 } else { 0 })
    }

    pub fn is_true(&self) -> bool {
        self.value != 0
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.unsigned {
            write!(f, "{}u", self.value as u64)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    // Arithmetic operators
    Add,      // '+'
    Subtract, // '-'
    Multiply, // '*'
    Divide,   // '/'
    Modulo,   // '%'

    // Relational operators
    Equal,              // '=='
    NotEqual,           // '!='
    LessThan,           // '<'
    LessThanOrEqual,    // '<='
    GreaterThan,        // '>'
    GreaterThanOrEqual, // '>='

    // Logical operators
    And, // '&&'
    Or,  // '||'

    // Bitwise operators
    BitwiseAnd, // '&'
    BitwiseOr,  // '|'
    BitwiseXor, // '^'
    ShiftLeft,  // '<<'
    ShiftRight, // '>>'

    Comma, // ','
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Plus,       // '+', does not change the operand's value (included for symmetry with `Minus`)
    Minus,      // '-', negation
    LogicalNot, // '!'
    BitwiseNot, // '~'
}

impl BinaryOperator {
    pub fn from_punctuator(punctuator: Punctuator) -> Option<Self> {
        let operator = match punctuator {
            // Arithmetic operators
            Punctuator::Add => BinaryOperator::Add,
            Punctuator::Subtract => BinaryOperator::Subtract,
            Punctuator::Multiply => BinaryOperator::Multiply,
            Punctuator::Divide => BinaryOperator::Divide,
            Punctuator::Modulo => BinaryOperator::Modulo,
            // Relational operators
            Punctuator::Equal => BinaryOperator::Equal,
            Punctuator::NotEqual => BinaryOperator::NotEqual,
            Punctuator::LessThan => BinaryOperator::LessThan,
            Punctuator::LessThanOrEqual => BinaryOperator::LessThanOrEqual,
            Punctuator::GreaterThan => BinaryOperator::GreaterThan,
            Punctuator::GreaterThanOrEqual => BinaryOperator::GreaterThanOrEqual,
            // Logical operators
            Punctuator::And => BinaryOperator::And,
            Punctuator::Or => BinaryOperator::Or,
            // Bitwise operators
            Punctuator::BitwiseAnd => BinaryOperator::BitwiseAnd,
            Punctuator::BitwiseOr => BinaryOperator::BitwiseOr,
            Punctuator::BitwiseXor => BinaryOperator::BitwiseXor,
            Punctuator::ShiftLeft => BinaryOperator::ShiftLeft,
            Punctuator::ShiftRight => BinaryOperator::ShiftRight,
            Punctuator::Comma => BinaryOperator::Comma,
            _ => return None,
        };
        Some(operator)
    }
}

impl UnaryOperator {
    pub fn from_punctuator(punctuator: Punctuator) -> Option<Self> {
        match punctuator {
            Punctuator::Add => Some(UnaryOperator::Plus),
            Punctuator::Subtract => Some(UnaryOperator::Minus),
            Punctuator::Not => Some(UnaryOperator::LogicalNot),
            Punctuator::BitwiseNot => Some(UnaryOperator::BitwiseNot),
            _ => None,
        }
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            // Arithmetic operators
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            // Relational operators
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            // Logical operators
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            // Bitwise operators
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::Comma => ",",
        };
        write!(f, "{}", symbol)
    }
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::LogicalNot => "!",
            UnaryOperator::BitwiseNot => "~",
        };
        write!(f, "{}", symbol)
    }
}

/// Fully parenthesized form, e.g. `(1 + (2 * 3))`.
impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Number(value, _) => write!(f, "{}", value),
            Expression::Binary(operator, _, left, right) => {
                write!(f, "({} {} {})", left, operator, right)
            }
            Expression::Unary(operator, _, operand) => write!(f, "({}{})", operator, operand),
            Expression::Conditional(condition, then_exp, else_exp) => {
                write!(f, "({} ? {} : {})", condition, then_exp, else_exp)
            }
        }
    }
}
