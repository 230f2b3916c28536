// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{
    ast::{
        AssignmentOperator, BinaryOperator, Expression, GenericAssociation, Literal,
        PostfixOperator, UnaryOperator,
    },
    error::ParseError,
    location::Location,
    token::{Keyword, Number, Punctuator, StringEncoding, Token},
};

use super::{
    Parser,
    declaration::{gnu_alternate_keyword, is_type_keyword},
};

// The binary operators from the lowest to the highest precedence:
//
// | precedence | operators          |
// |------------|--------------------|
// | 1          | `||`               |
// | 2          | `&&`               |
// | 3          | `|`                |
// | 4          | `^`                |
// | 5          | `&`                |
// | 6          | `==` `!=`          |
// | 7          | `<` `>` `<=` `>=`  |
// | 8          | `<<` `>>`          |
// | 9          | `+` `-`            |
// | 10         | `*` `/` `%`        |
//
// All of them are left associative.
//
// see: https://en.cppreference.com/w/c/language/operator_precedence.html
fn binary_operator(token: &Token) -> Option<(BinaryOperator, u8)> {
    let Token::Punctuator(punctuator) = token else {
        return None;
    };

    let operator = match punctuator {
        Punctuator::Or => (BinaryOperator::Or, 1),
        Punctuator::And => (BinaryOperator::And, 2),
        Punctuator::BitwiseOr => (BinaryOperator::BitwiseOr, 3),
        Punctuator::BitwiseXor => (BinaryOperator::BitwiseXor, 4),
        Punctuator::BitwiseAnd => (BinaryOperator::BitwiseAnd, 5),
        Punctuator::Equal => (BinaryOperator::Equal, 6),
        Punctuator::NotEqual => (BinaryOperator::NotEqual, 6),
        Punctuator::LessThan => (BinaryOperator::LessThan, 7),
        Punctuator::GreaterThan => (BinaryOperator::GreaterThan, 7),
        Punctuator::LessThanOrEqual => (BinaryOperator::LessThanOrEqual, 7),
        Punctuator::GreaterThanOrEqual => (BinaryOperator::GreaterThanOrEqual, 7),
        Punctuator::ShiftLeft => (BinaryOperator::ShiftLeft, 8),
        Punctuator::ShiftRight => (BinaryOperator::ShiftRight, 8),
        Punctuator::Add => (BinaryOperator::Add, 9),
        Punctuator::Subtract => (BinaryOperator::Subtract, 9),
        Punctuator::Multiply => (BinaryOperator::Multiply, 10),
        Punctuator::Divide => (BinaryOperator::Divide, 10),
        Punctuator::Modulo => (BinaryOperator::Modulo, 10),
        _ => return None,
    };

    Some(operator)
}

fn assignment_operator(token: &Token) -> Option<AssignmentOperator> {
    let Token::Punctuator(punctuator) = token else {
        return None;
    };

    let operator = match punctuator {
        Punctuator::Assign => AssignmentOperator::Assign,
        Punctuator::AddAssign => AssignmentOperator::Compound(BinaryOperator::Add),
        Punctuator::SubtractAssign => AssignmentOperator::Compound(BinaryOperator::Subtract),
        Punctuator::MultiplyAssign => AssignmentOperator::Compound(BinaryOperator::Multiply),
        Punctuator::DivideAssign => AssignmentOperator::Compound(BinaryOperator::Divide),
        Punctuator::ModulusAssign => AssignmentOperator::Compound(BinaryOperator::Modulo),
        Punctuator::BitwiseAndAssign => AssignmentOperator::Compound(BinaryOperator::BitwiseAnd),
        Punctuator::BitwiseOrAssign => AssignmentOperator::Compound(BinaryOperator::BitwiseOr),
        Punctuator::BitwiseXorAssign => AssignmentOperator::Compound(BinaryOperator::BitwiseXor),
        Punctuator::ShiftLeftAssign => AssignmentOperator::Compound(BinaryOperator::ShiftLeft),
        Punctuator::ShiftRightAssign => AssignmentOperator::Compound(BinaryOperator::ShiftRight),
        _ => return None,
    };

    Some(operator)
}

fn unary_operator(token: &Token) -> Option<UnaryOperator> {
    let Token::Punctuator(punctuator) = token else {
        return None;
    };

    let operator = match punctuator {
        Punctuator::Subtract => UnaryOperator::Negate,
        Punctuator::Add => UnaryOperator::Plus,
        Punctuator::Not => UnaryOperator::Not,
        Punctuator::BitwiseNot => UnaryOperator::BitwiseNot,
        Punctuator::Multiply => UnaryOperator::Dereference,
        Punctuator::BitwiseAnd => UnaryOperator::AddressOf,
        _ => return None,
    };

    Some(operator)
}

impl Parser {
    /// Parses an expression, comma operators included.
    pub(super) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let mut expression = self.parse_assignment_expression()?;

        while self.consume_punctuator_if(Punctuator::Comma) {
            let right = self.parse_assignment_expression()?;
            let location = expression.location();
            expression = Expression::Comma(Box::new(expression), Box::new(right), location);
        }

        Ok(expression)
    }

    /// Assignments are right associative, `a = b = c` is `a = (b = c)`.
    pub(super) fn parse_assignment_expression(&mut self) -> Result<Expression, ParseError> {
        let target = self.parse_conditional_expression()?;

        let Some(operator) = assignment_operator(self.peek_token(0)) else {
            return Ok(target);
        };
        self.next_token();

        let value = self.nested(Self::parse_assignment_expression)?;
        let location = target.location();

        Ok(Expression::Assignment {
            operator,
            target: Box::new(target),
            value: Box::new(value),
            location,
        })
    }

    pub(super) fn parse_conditional_expression(&mut self) -> Result<Expression, ParseError> {
        let condition = self.parse_binary_expression(1)?;

        if !self.consume_punctuator_if(Punctuator::QuestionMark) {
            return Ok(condition);
        }

        let then_value = self.nested(Self::parse_expression)?;
        self.expect_and_consume_punctuator(Punctuator::Colon, None)?;
        let else_value = self.nested(Self::parse_conditional_expression)?;
        let location = condition.location();

        Ok(Expression::Conditional {
            condition: Box::new(condition),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
            location,
        })
    }

    // Precedence climbing, only the operators with a precedence
    // of at least `min_precedence` are taken.
    fn parse_binary_expression(&mut self, min_precedence: u8) -> Result<Expression, ParseError> {
        let mut left = self.parse_cast_expression()?;

        loop {
            let Some((operator, precedence)) = binary_operator(self.peek_token(0)) else {
                break;
            };

            if precedence < min_precedence {
                break;
            }
            self.next_token();

            let right = self.parse_binary_expression(precedence + 1)?;
            let location = left.location();
            left = Expression::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }

        Ok(left)
    }

    // `(type-name) operand` and compound literals `(type-name){ ... }`.
    fn parse_cast_expression(&mut self) -> Result<Expression, ParseError> {
        if !(self.peek_punctuator(0, Punctuator::ParenthesisOpen) && self.is_type_name_start(1)) {
            return self.parse_unary_expression();
        }

        let location = self.next_token().location;
        let target_type = self.parse_type_name()?;
        self.expect_and_consume_punctuator(Punctuator::ParenthesisClose, None)?;

        if self.peek_punctuator(0, Punctuator::BraceOpen) {
            let initializer = self.parse_initializer()?;
            let literal = Expression::CompoundLiteral {
                literal_type: target_type,
                initializer: Box::new(initializer),
                location,
            };
            return self.parse_postfix_suffixes(literal);
        }

        let operand = self.nested(Self::parse_cast_expression)?;
        Ok(Expression::Cast {
            target_type,
            operand: Box::new(operand),
            location,
        })
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, ParseError> {
        let location = self.peek_location(0);
        let token = self.peek_token(0).clone();

        if let Some(operator) = unary_operator(&token) {
            self.next_token();
            let operand = self.nested(Self::parse_cast_expression)?;
            return Ok(Expression::Unary {
                operator,
                operand: Box::new(operand),
                location,
            });
        }

        match token {
            Token::Punctuator(Punctuator::Increase | Punctuator::Decrease) => {
                self.next_token();
                let operator = if token.is_punctuator(Punctuator::Increase) {
                    UnaryOperator::PreIncrease
                } else {
                    UnaryOperator::PreDecrease
                };

                let operand = self.nested(Self::parse_unary_expression)?;
                Ok(Expression::Unary {
                    operator,
                    operand: Box::new(operand),
                    location,
                })
            }
            Token::Keyword(Keyword::Sizeof) => {
                self.next_token();

                if self.peek_punctuator(0, Punctuator::ParenthesisOpen) && self.is_type_name_start(1) {
                    let literal_location = self.next_token().location;
                    let target_type = self.parse_type_name()?;
                    self.expect_and_consume_punctuator(Punctuator::ParenthesisClose, None)?;

                    if !self.peek_punctuator(0, Punctuator::BraceOpen) {
                        return Ok(Expression::SizeofType(target_type, location));
                    }

                    // the size of a compound literal
                    let initializer = self.parse_initializer()?;
                    let literal = self.parse_postfix_suffixes(Expression::CompoundLiteral {
                        literal_type: target_type,
                        initializer: Box::new(initializer),
                        location: literal_location,
                    })?;
                    return Ok(Expression::SizeofExpression(Box::new(literal), location));
                }

                let operand = self.nested(Self::parse_unary_expression)?;
                Ok(Expression::SizeofExpression(Box::new(operand), location))
            }
            Token::Keyword(Keyword::Alignof | Keyword::UnderscoreAlignof) => {
                self.next_token();
                self.expect_and_consume_punctuator(Punctuator::ParenthesisOpen, None)?;
                let target_type = self.parse_type_name()?;
                self.expect_and_consume_punctuator(Punctuator::ParenthesisClose, None)?;
                Ok(Expression::Alignof(target_type, location))
            }
            Token::Identifier(name) if name == "__extension__" => {
                self.next_token();
                self.nested(Self::parse_cast_expression)
            }
            _ => {
                let primary = self.parse_primary_expression()?;
                self.parse_postfix_suffixes(primary)
            }
        }
    }

    fn parse_postfix_suffixes(&mut self, primary: Expression) -> Result<Expression, ParseError> {
        let mut expression = primary;

        loop {
            let location = expression.location();

            expression = match self.peek_token(0) {
                Token::Punctuator(Punctuator::BracketOpen) => {
                    self.next_token();
                    let index = self.nested(Self::parse_expression)?;
                    self.expect_and_consume_punctuator(Punctuator::BracketClose, None)?;
                    Expression::Index {
                        array: Box::new(expression),
                        index: Box::new(index),
                        location,
                    }
                }
                Token::Punctuator(Punctuator::ParenthesisOpen) => {
                    self.next_token();
                    let arguments = self.nested(Self::parse_arguments)?;
                    Expression::Call {
                        callee: Box::new(expression),
                        arguments,
                        location,
                    }
                }
                Token::Punctuator(Punctuator::Dot) => {
                    self.next_token();
                    let (member, _) = self.expect_and_consume_identifier()?;
                    Expression::Member {
                        object: Box::new(expression),
                        member,
                        location,
                    }
                }
                Token::Punctuator(Punctuator::Arrow) => {
                    self.next_token();
                    let (member, _) = self.expect_and_consume_identifier()?;
                    Expression::PointerMember {
                        object: Box::new(expression),
                        member,
                        location,
                    }
                }
                Token::Punctuator(Punctuator::Increase) => {
                    self.next_token();
                    Expression::Postfix {
                        operator: PostfixOperator::Increase,
                        operand: Box::new(expression),
                        location,
                    }
                }
                Token::Punctuator(Punctuator::Decrease) => {
                    self.next_token();
                    Expression::Postfix {
                        operator: PostfixOperator::Decrease,
                        operand: Box::new(expression),
                        location,
                    }
                }
                _ => break,
            };
        }

        Ok(expression)
    }

    // The arguments after `(`, including the closing `)`.
    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut arguments = vec![];

        if self.consume_punctuator_if(Punctuator::ParenthesisClose) {
            return Ok(arguments);
        }

        loop {
            arguments.push(self.parse_assignment_expression()?);
            if !self.consume_punctuator_if(Punctuator::Comma) {
                break;
            }
        }

        self.expect_and_consume_punctuator(Punctuator::ParenthesisClose, None)?;
        Ok(arguments)
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, ParseError> {
        let location = self.peek_location(0);

        let literal = match self.peek_token(0).clone() {
            Token::Identifier(name) => {
                self.next_token();
                return Ok(Expression::Identifier(name, location));
            }
            Token::Punctuator(Punctuator::ParenthesisOpen) => {
                self.next_token();
                let expression = self.nested(Self::parse_expression)?;
                self.expect_and_consume_punctuator(Punctuator::ParenthesisClose, None)?;
                return Ok(expression);
            }
            Token::Number(Number::Integer(integer)) => Literal::Integer {
                value: integer.value,
                unsigned: integer.unsigned,
            },
            Token::Number(Number::FloatingPoint(floating_point)) => {
                Literal::Float(floating_point.value)
            }
            Token::Char(c, encoding) => Literal::Char(c, encoding),
            Token::String(text, encoding) => {
                self.next_token();
                return Ok(self.continue_parse_string_literal(text, encoding, location));
            }
            Token::Keyword(Keyword::UnderscoreGeneric) => {
                self.next_token();
                return self.parse_generic_selection(location);
            }
            Token::Keyword(Keyword::True) => Literal::Bool(true),
            Token::Keyword(Keyword::False) => Literal::Bool(false),
            _ => return Err(self.unexpected_token(&["expression"])),
        };

        self.next_token();
        Ok(Expression::Literal(literal, location))
    }

    // The rest of `_Generic( assignment-expression , generic-association-list )`,
    // each association is `type-name: expression` or `default: expression`.
    fn parse_generic_selection(&mut self, location: Location) -> Result<Expression, ParseError> {
        self.expect_and_consume_punctuator(Punctuator::ParenthesisOpen, None)?;
        let controlling = self.nested(Self::parse_assignment_expression)?;
        self.expect_and_consume_punctuator(Punctuator::Comma, None)?;

        let mut associations: Vec<GenericAssociation> = vec![];

        loop {
            let association_type = if self.peek_keyword(0, Keyword::Default) {
                let default_location = self.next_token().location;
                if associations
                    .iter()
                    .any(|association| association.association_type.is_none())
                {
                    return Err(ParseError::message(
                        "duplicate default generic association",
                        default_location,
                    ));
                }
                None
            } else if self.is_type_name_start(0) {
                Some(self.parse_type_name()?)
            } else {
                return Err(self.unexpected_token(&["type name", "default"]));
            };

            self.expect_and_consume_punctuator(Punctuator::Colon, None)?;
            let value = self.nested(Self::parse_assignment_expression)?;
            associations.push(GenericAssociation {
                association_type,
                value,
            });

            if !self.consume_punctuator_if(Punctuator::Comma) {
                break;
            }
        }

        self.expect_and_consume_punctuator(Punctuator::ParenthesisClose, None)?;

        Ok(Expression::Generic {
            controlling: Box::new(controlling),
            associations,
            location,
        })
    }

    // Adjacent string literals are one literal, e.g. `"Hello, " "world"`.
    // A prefixed literal gives its encoding to the result.
    fn continue_parse_string_literal(
        &mut self,
        first: String,
        encoding: StringEncoding,
        location: Location,
    ) -> Expression {
        let mut text = first;
        let mut encoding = encoding;

        while let Token::String(more, more_encoding) = self.peek_token(0).clone() {
            self.next_token();
            text.push_str(&more);
            if encoding == StringEncoding::Default {
                encoding = more_encoding;
            }
        }

        Expression::Literal(Literal::String(text, encoding), location)
    }

    /// Whether the token at the offset starts a type name,
    /// used to tell a cast `(T)x` from a parenthesized expression `(x)`.
    fn is_type_name_start(&mut self, offset: usize) -> bool {
        match self.peek_token(offset).clone() {
            Token::Keyword(keyword) => is_type_keyword(keyword),
            Token::Identifier(name) => {
                self.is_typedef_name(&name)
                    || gnu_alternate_keyword(&name).is_some_and(|keyword| keyword != Keyword::Inline)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        ast::{
            AssignmentOperator, BinaryOperator, Expression, Initializer, Literal, UnaryOperator,
        },
        parser::tests::{messages, parse, parse_ok},
        token::StringEncoding,
        types::Type,
    };

    // The initializer expression of the last variable declared in `src`.
    fn initializer_of(src: &str, name: &str) -> Expression {
        let unit = parse_ok(src);
        match &unit.find_variable(name).unwrap().initializer {
            Some(Initializer::Expression(expression)) => expression.clone(),
            other => panic!("unexpected initializer {:?}", other),
        }
    }

    // Renders the expression with explicit parentheses to show the tree shape.
    fn shape(expression: &Expression) -> String {
        match expression {
            Expression::Literal(Literal::Integer { value, .. }, _) => value.clone(),
            Expression::Identifier(name, _) => name.clone(),
            Expression::Binary {
                operator,
                left,
                right,
                ..
            } => format!("({} {} {})", shape(left), operator, shape(right)),
            Expression::Unary {
                operator, operand, ..
            } => format!("({:?} {})", operator, shape(operand)),
            Expression::Conditional {
                condition,
                then_value,
                else_value,
                ..
            } => format!(
                "({} ? {} : {})",
                shape(condition),
                shape(then_value),
                shape(else_value)
            ),
            Expression::Assignment { target, value, .. } => {
                format!("({} = {})", shape(target), shape(value))
            }
            Expression::Cast {
                target_type,
                operand,
                ..
            } => format!("(({}) {})", target_type, shape(operand)),
            Expression::Call {
                callee, arguments, ..
            } => format!(
                "{}({})",
                shape(callee),
                arguments.iter().map(shape).collect::<Vec<_>>().join(", ")
            ),
            Expression::Index { array, index, .. } => {
                format!("{}[{}]", shape(array), shape(index))
            }
            Expression::Member { object, member, .. } => format!("{}.{}", shape(object), member),
            Expression::PointerMember { object, member, .. } => {
                format!("{}->{}", shape(object), member)
            }
            other => format!("{:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let src = "int a, b, c, d;\nint x = a + b * c - d << 1 == 0 || a && !b;\n";
        assert_eq!(
            shape(&initializer_of(src, "x")),
            "(((((a + (b * c)) - d) << 1) == 0) || (a && (Not b)))"
        );

        let src = "int a, b, c;\nint x = a < b ? a : b ? c : 0;\n";
        assert_eq!(shape(&initializer_of(src, "x")), "((a < b) ? a : (b ? c : 0))");

        let src = "int a, b, c;\nint x = a & b | c ^ a;\n";
        assert_eq!(shape(&initializer_of(src, "x")), "((a & b) | (c ^ a))");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let src = "void f() { int a, b, c; a = b += c = 1; }\n";
        let unit = parse_ok(src);
        let function = unit.find_function("f").unwrap();
        let crate::ast::Statement::Compound(statements, _) = &function.body else {
            panic!("expected a compound statement");
        };
        let crate::ast::Statement::Expression(expression, _) = &statements[1] else {
            panic!("expected an expression statement");
        };

        assert_eq!(shape(expression), "(a = (b = (c = 1)))");
        let Expression::Assignment { value, .. } = expression else {
            panic!("expected an assignment");
        };
        assert!(matches!(
            value.as_ref(),
            Expression::Assignment {
                operator: AssignmentOperator::Compound(BinaryOperator::Add),
                ..
            }
        ));
    }

    #[test]
    fn test_cast_and_parenthesized_expression() {
        let src = "\
typedef long T;
int a;
long x = (T)a;
long y = (a) + 1;
long z = (unsigned char)-a;
";
        assert_eq!(shape(&initializer_of(src, "x")), "((T) a)");
        assert_eq!(shape(&initializer_of(src, "y")), "(a + 1)");
        assert_eq!(shape(&initializer_of(src, "z")), "((unsigned char) (Negate a))");
    }

    #[test]
    fn test_postfix_and_unary() {
        let src = "\
struct Point { int x; } *points[4];
int f(int, int);
int v = -f(points[1]->x, (*points[0]).x)++;
";
        let Expression::Unary {
            operator, operand, ..
        } = initializer_of(src, "v")
        else {
            panic!("expected a unary expression");
        };
        assert_eq!(operator, UnaryOperator::Negate);
        let Expression::Postfix { operand, .. } = operand.as_ref() else {
            panic!("expected a postfix expression");
        };
        assert_eq!(
            shape(operand),
            "f(points[1]->x, (Dereference points[0]).x)"
        );
    }

    #[test]
    fn test_sizeof_and_literals() {
        let src = "\
unsigned long a = sizeof(int *);
unsigned long b = sizeof a;
const char *s = \"Hello, \" \"world\" u8\"!\";
int c = 'x';
double d = 1.5e3;
_Bool e = true;
";
        assert!(matches!(
            initializer_of(src, "a"),
            Expression::SizeofType(Type::Pointer(_), _)
        ));
        assert!(matches!(
            initializer_of(src, "b"),
            Expression::SizeofExpression(..)
        ));
        assert!(matches!(
            initializer_of(src, "s"),
            Expression::Literal(Literal::String(text, StringEncoding::UTF8), _) if text == "Hello, world!"
        ));
        assert!(matches!(
            initializer_of(src, "c"),
            Expression::Literal(Literal::Char('x', _), _)
        ));
        assert!(matches!(
            initializer_of(src, "d"),
            Expression::Literal(Literal::Float(value), _) if value == "1.5e3"
        ));
        assert!(matches!(
            initializer_of(src, "e"),
            Expression::Literal(Literal::Bool(true), _)
        ));
    }

    #[test]
    fn test_compound_literal() {
        let src = "struct Point { int x, y; };\nstruct Point *p = &(struct Point){ .x = 1, 2 };\n";
        let Expression::Unary { operand, .. } = initializer_of(src, "p") else {
            panic!("expected a unary expression");
        };
        assert!(matches!(
            operand.as_ref(),
            Expression::CompoundLiteral { initializer, .. }
                if matches!(initializer.as_ref(), Initializer::List(items, _) if items.len() == 2)
        ));
    }

    #[test]
    fn test_generic_selection() {
        let src = "int x;\nint v = _Generic(x, int: 1, char *: 2, default: 0);\n";
        let Expression::Generic {
            controlling,
            associations,
            ..
        } = initializer_of(src, "v")
        else {
            panic!("expected a generic selection");
        };

        assert_eq!(shape(&controlling), "x");
        assert_eq!(
            associations
                .iter()
                .map(|association| association
                    .association_type
                    .as_ref()
                    .map(|association_type| association_type.to_string()))
                .collect::<Vec<_>>(),
            vec![Some("int".to_owned()), Some("char *".to_owned()), None]
        );
        assert_eq!(
            associations
                .iter()
                .map(|association| shape(&association.value))
                .collect::<Vec<_>>(),
            vec!["1", "2", "0"]
        );

        parse_ok("int f(int x) { return _Generic(x, default: 0) + 1; }\n");

        let result = parse("int x;\nint v = _Generic(x, default: 1, default: 2);\n");
        assert_eq!(
            messages(&result),
            vec!["duplicate default generic association"]
        );

        let result = parse("int x;\nint v = _Generic(x, 1: 2);\n");
        assert_eq!(
            messages(&result),
            vec!["unexpected token '1', expected one of: 'type name', 'default'"]
        );
    }

    #[test]
    fn test_expected_expression() {
        let result = parse("int x = 1 + ;\n");
        assert_eq!(
            messages(&result),
            vec!["unexpected token ';', expected one of: 'expression'"]
        );
    }
}
