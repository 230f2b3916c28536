// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{
    error::PreprocessError,
    expression::ast::{BinaryOperator, Expression, UnaryOperator, Value},
    location::Location,
    options::DEFAULT_MAX_NESTING_DEPTH,
    peekable_iter::PeekableIter,
    token::{Keyword, Number, Punctuator, Token, TokenWithLocation},
};

/// Parses the expanded tokens of a `#if` line.
///
/// `end_location` is the location reported when the tokens run out.
pub fn parse_from_tokens(
    token_with_locations: Vec<TokenWithLocation>,
    end_location: Location,
) -> Result<Expression, PreprocessError> {
    let mut parser = ExpressionParser::new(token_with_locations, end_location);
    let expression = parser.parse_expression()?;

    if let Some(token_with_location) = parser.upstream.peek(0) {
        let message = match token_with_location.token {
            Token::Punctuator(Punctuator::ParenthesisClose) => {
                "unexpected ')' in preprocessor expression".to_owned()
            }
            _ => "token is not a valid binary operator in a preprocessor subexpression"
                .to_owned(),
        };
        return Err(PreprocessError::Message(
            message,
            token_with_location.location,
        ));
    }

    Ok(expression)
}

struct ExpressionParser {
    upstream: PeekableIter<std::vec::IntoIter<TokenWithLocation>>,
    end_location: Location,

    // The nesting of parentheses, unary operators and conditionals.
    depth: usize,
}

impl ExpressionParser {
    fn new(token_with_locations: Vec<TokenWithLocation>, end_location: Location) -> Self {
        Self {
            upstream: PeekableIter::new(token_with_locations.into_iter()),
            end_location,
            depth: 0,
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Expression, PreprocessError>,
    ) -> Result<Expression, PreprocessError> {
        if self.depth >= DEFAULT_MAX_NESTING_DEPTH {
            return Err(PreprocessError::Message(
                format!(
                    "bracket nesting level exceeded maximum of {}",
                    DEFAULT_MAX_NESTING_DEPTH
                ),
                self.peek_location(0),
            ));
        }

        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek_token(&mut self, offset: usize) -> Option<&Token> {
        self.upstream.peek(offset).map(|t| &t.token)
    }

    fn peek_location(&mut self, offset: usize) -> Location {
        match self.upstream.peek(offset) {
            Some(token_with_location) => token_with_location.location,
            None => self.end_location,
        }
    }

    fn peek_punctuator(&mut self, offset: usize) -> Option<Punctuator> {
        match self.peek_token(offset) {
            Some(Token::Punctuator(punctuator)) => Some(*punctuator),
            _ => None,
        }
    }

    fn expect_and_consume_punctuator(
        &mut self,
        punctuator: Punctuator,
        message: &str,
    ) -> Result<(), PreprocessError> {
        if self.peek_punctuator(0) == Some(punctuator) {
            self.upstream.next();
            Ok(())
        } else {
            Err(PreprocessError::message(message, self.peek_location(0)))
        }
    }
}

/**
 * C Operator Precedence
 * ---------------------
 *
 * The operators allowed in `#if`, top to bottom in descending precedence.
 *
 * 1: `+ - ! ~` Unary operators
 * 2: `* / %` Multiplication, division, and remainder
 * 3: `+ -` Addition and subtraction
 * 4: `<< >>` Bitwise left shift and right shift
 * 5: `< <= > >=` Relational operators
 * 6: `== !=` Equality operators
 * 7: `&` Bitwise AND
 * 8: `^` Bitwise XOR (exclusive or)
 * 9: `|` Bitwise OR (inclusive or)
 * 10: `&&` Logical AND
 * 11: `||` Logical OR
 * 12: `?:` Ternary conditional (right-to-left)
 * 13: `,` Comma
 *
 * See:
 * https://en.cppreference.com/w/c/language/operator_precedence.html
 */

impl ExpressionParser {
    fn parse_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &[Punctuator::Comma],
            ExpressionParser::parse_conditional_expression,
        )
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, PreprocessError> {
        let condition = self.parse_logic_or_expression()?;

        if self.peek_punctuator(0) != Some(Punctuator::QuestionMark) {
            return Ok(condition);
        }

        self.upstream.next(); // consume '?'

        let then_expression = self.nested(ExpressionParser::parse_expression)?;
        self.expect_and_consume_punctuator(
            Punctuator::Colon,
            "expected ':' in preprocessor expression",
        )?;

        // right-to-left associative
        let else_expression = self.nested(ExpressionParser::parse_conditional_expression)?;

        Ok(Expression::Conditional(
            Box::new(condition),
            Box::new(then_expression),
            Box::new(else_expression),
        ))
    }

    fn parse_logic_or_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &[Punctuator::Or],
            ExpressionParser::parse_logic_and_expression,
        )
    }

    fn parse_logic_and_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &[Punctuator::And],
            ExpressionParser::parse_bitwise_or_expression,
        )
    }

    fn parse_bitwise_or_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &[Punctuator::BitwiseOr],
            ExpressionParser::parse_bitwise_xor_expression,
        )
    }

    fn parse_bitwise_xor_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &[Punctuator::BitwiseXor],
            ExpressionParser::parse_bitwise_and_expression,
        )
    }

    fn parse_bitwise_and_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &[Punctuator::BitwiseAnd],
            ExpressionParser::parse_equality_expression,
        )
    }

    fn parse_equality_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &[Punctuator::Equal, Punctuator::NotEqual],
            ExpressionParser::parse_relational_expression,
        )
    }

    fn parse_relational_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &[
                Punctuator::LessThan,
                Punctuator::LessThanOrEqual,
                Punctuator::GreaterThan,
                Punctuator::GreaterThanOrEqual,
            ],
            ExpressionParser::parse_shift_expression,
        )
    }

    fn parse_shift_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &[Punctuator::ShiftLeft, Punctuator::ShiftRight],
            ExpressionParser::parse_additive_expression,
        )
    }

    fn parse_additive_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &[Punctuator::Add, Punctuator::Subtract],
            ExpressionParser::parse_multiplicative_expression,
        )
    }

    fn parse_multiplicative_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &[Punctuator::Multiply, Punctuator::Divide, Punctuator::Modulo],
            ExpressionParser::parse_unary_expression,
        )
    }

    // Left-to-right associative binary operators of one precedence level.
    fn parse_binary_expression(
        &mut self,
        expected_punctuators: &[Punctuator],
        next_parse_function: fn(&mut Self) -> Result<Expression, PreprocessError>,
    ) -> Result<Expression, PreprocessError> {
        let mut left_expression = next_parse_function(self)?;

        while let Some(punctuator) = self.peek_punctuator(0) {
            if !expected_punctuators.contains(&punctuator) {
                break;
            }

            let Some(operator) = BinaryOperator::from_punctuator(punctuator) else {
                break;
            };

            let location = self.peek_location(0);
            self.upstream.next(); // consume the operator

            let right_expression = next_parse_function(self)?;

            left_expression = Expression::Binary(
                operator,
                location,
                Box::new(left_expression),
                Box::new(right_expression),
            );
        }

        Ok(left_expression)
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, PreprocessError> {
        if let Some(operator) = self
            .peek_punctuator(0)
            .and_then(UnaryOperator::from_punctuator)
        {
            let location = self.peek_location(0);
            self.upstream.next(); // consume the unary operator

            let operand = self.nested(ExpressionParser::parse_unary_expression)?;
            return Ok(Expression::Unary(operator, location, Box::new(operand)));
        }

        self.parse_primary_expression()
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, PreprocessError> {
        let location = self.peek_location(0);

        let Some(token_with_location) = self.upstream.next() else {
            return Err(PreprocessError::message(
                "expected value in expression",
                location,
            ));
        };

        match token_with_location.token {
            Token::Number(Number::Integer(number)) => {
                let Some(value) = number.as_u64() else {
                    return Err(PreprocessError::message(
                        "integer literal is too large to be represented in any integer type",
                        location,
                    ));
                };

                let value = if number.unsigned || value > i64::MAX as u64 {
                    Value::unsigned(value)
                } else {
                    Value::signed(value as i64)
                };

                Ok(Expression::Number(value, location))
            }
            Token::Number(Number::FloatingPoint(_)) => Err(PreprocessError::message(
                "floating point literal in preprocessor expression",
                location,
            )),
            Token::Char(c, _) => Ok(Expression::Number(Value::signed(c as i64), location)),
            // `true` is 1 since C23
            Token::Keyword(Keyword::True) => Ok(Expression::Number(Value::signed(1), location)),
            // identifiers remaining after macro expansion evaluate to 0
            Token::Identifier(_) | Token::Keyword(_) => {
                Ok(Expression::Number(Value::signed(0), location))
            }
            Token::Punctuator(Punctuator::ParenthesisOpen) => {
                let inner_expression = self.nested(ExpressionParser::parse_expression)?;
                self.expect_and_consume_punctuator(
                    Punctuator::ParenthesisClose,
                    "expected ')' in preprocessor expression",
                )?;
                Ok(inner_expression)
            }
            _ => Err(PreprocessError::message(
                "invalid token at start of a preprocessor expression",
                location,
            )),
        }
    }
}
