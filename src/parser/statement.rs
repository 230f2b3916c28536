// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{
    ast::{Expression, ForInitializer, Statement},
    error::ParseError,
    location::Location,
    token::{Keyword, Punctuator, Token},
};

use super::{
    Parser,
    declaration::{gnu_alternate_keyword, is_declaration_keyword},
};

impl Parser {
    /// Parses `{ ... }`, the errors inside the block are reported
    /// and do not end the block.
    pub(super) fn parse_compound_statement(&mut self) -> Result<Statement, ParseError> {
        let location = self.expect_and_consume_punctuator(Punctuator::BraceOpen, None)?;
        let mut items = vec![];

        self.enter_scope();

        loop {
            match self.peek_token(0) {
                Token::Punctuator(Punctuator::BraceClose) => {
                    self.next_token();
                    break;
                }
                Token::EndOfInput => {
                    let location = self.peek_location(0);
                    self.report(ParseError::Expected {
                        expected: "}".to_owned(),
                        context: None,
                        location,
                    });
                    break;
                }
                _ => {
                    let consumed = self.consumed;
                    match self.parse_block_item() {
                        Ok(statement) => items.push(statement),
                        Err(error) => {
                            self.report(error);
                            self.synchronize();
                            if self.consumed == consumed {
                                self.next_token();
                            }
                        }
                    }
                }
            }
        }

        self.leave_scope();
        Ok(Statement::Compound(items, location))
    }

    fn parse_block_item(&mut self) -> Result<Statement, ParseError> {
        if self.is_declaration_start() {
            let location = self.peek_location(0);
            let declarations = self.parse_block_declaration()?;
            Ok(Statement::Declaration(declarations, location))
        } else {
            self.parse_statement()
        }
    }

    // Decides between a declaration and an expression at the start of a block item.
    fn is_declaration_start(&mut self) -> bool {
        match self.peek_token(0).clone() {
            Token::Keyword(keyword) => is_declaration_keyword(keyword),
            Token::Identifier(name) => {
                if self.peek_punctuator(1, Punctuator::Colon) {
                    // a label
                    false
                } else {
                    self.is_typedef_name(&name)
                        || gnu_alternate_keyword(&name).is_some()
                        || name == "__extension__"
                        || name == "__attribute__"
                        // an undeclared type name, e.g. `invalid x;`
                        || self.peek_identifier(1).is_some()
                }
            }
            _ => false,
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        self.nested(Self::parse_statement_inner)
    }

    fn parse_statement_inner(&mut self) -> Result<Statement, ParseError> {
        let location = self.peek_location(0);

        match self.peek_token(0).clone() {
            Token::Punctuator(Punctuator::BraceOpen) => self.parse_compound_statement(),
            Token::Punctuator(Punctuator::Semicolon) => {
                self.next_token();
                Ok(Statement::Empty(location))
            }
            Token::Keyword(Keyword::If) => self.parse_if_statement(),
            Token::Keyword(Keyword::While) => self.parse_while_statement(),
            Token::Keyword(Keyword::Do) => self.parse_do_while_statement(),
            Token::Keyword(Keyword::For) => {
                // the declarations of the initializer are only visible in the loop
                self.enter_scope();
                let result = self.parse_for_statement();
                self.leave_scope();
                result
            }
            Token::Keyword(Keyword::Switch) => self.parse_switch_statement(),
            Token::Keyword(Keyword::Case) => {
                self.next_token();
                let value = self.parse_conditional_expression()?;
                self.expect_and_consume_punctuator(Punctuator::Colon, Some("after 'case'"))?;
                let body = self.parse_labeled_body(location)?;
                Ok(Statement::Case {
                    value,
                    body: Box::new(body),
                    location,
                })
            }
            Token::Keyword(Keyword::Default) => {
                self.next_token();
                self.expect_and_consume_punctuator(Punctuator::Colon, Some("after 'default'"))?;
                let body = self.parse_labeled_body(location)?;
                Ok(Statement::Default {
                    body: Box::new(body),
                    location,
                })
            }
            Token::Keyword(Keyword::Break) => {
                self.next_token();
                self.expect_and_consume_punctuator(
                    Punctuator::Semicolon,
                    Some("after break statement"),
                )?;
                Ok(Statement::Break(location))
            }
            Token::Keyword(Keyword::Continue) => {
                self.next_token();
                self.expect_and_consume_punctuator(
                    Punctuator::Semicolon,
                    Some("after continue statement"),
                )?;
                Ok(Statement::Continue(location))
            }
            Token::Keyword(Keyword::Goto) => {
                self.next_token();
                let (label, _) = self.expect_and_consume_identifier()?;
                self.expect_and_consume_punctuator(
                    Punctuator::Semicolon,
                    Some("after goto statement"),
                )?;
                Ok(Statement::Goto(label, location))
            }
            Token::Keyword(Keyword::Return) => {
                self.next_token();
                let value = if self.peek_punctuator(0, Punctuator::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect_and_consume_punctuator(
                    Punctuator::Semicolon,
                    Some("after return statement"),
                )?;
                Ok(Statement::Return(value, location))
            }
            Token::Identifier(name) if self.peek_punctuator(1, Punctuator::Colon) => {
                self.next_token();
                self.next_token();
                let body = self.parse_labeled_body(location)?;
                Ok(Statement::Label {
                    name,
                    body: Box::new(body),
                    location,
                })
            }
            _ => {
                let expression = self.parse_expression()?;
                self.expect_and_consume_punctuator(
                    Punctuator::Semicolon,
                    Some("after expression"),
                )?;
                Ok(Statement::Expression(expression, location))
            }
        }
    }

    // The statement after a label, it may be missing at the end of a block.
    fn parse_labeled_body(&mut self, location: Location) -> Result<Statement, ParseError> {
        if self.peek_punctuator(0, Punctuator::BraceClose) {
            Ok(Statement::Empty(location))
        } else {
            self.parse_block_item()
        }
    }

    // `(expression)` after `if`, `while` and `switch`.
    fn parse_parenthesized_condition(
        &mut self,
        keyword: &str,
    ) -> Result<Expression, ParseError> {
        self.expect_and_consume_punctuator(
            Punctuator::ParenthesisOpen,
            Some(&format!("after '{}'", keyword)),
        )?;
        let condition = self.parse_expression()?;
        self.expect_and_consume_punctuator(Punctuator::ParenthesisClose, None)?;
        Ok(condition)
    }

    fn parse_if_statement(&mut self) -> Result<Statement, ParseError> {
        let location = self.next_token().location;
        let condition = self.parse_parenthesized_condition("if")?;
        let then_branch = self.parse_statement()?;

        let else_branch = if self.peek_keyword(0, Keyword::Else) {
            self.next_token();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch,
            location,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Statement, ParseError> {
        let location = self.next_token().location;
        let condition = self.parse_parenthesized_condition("while")?;
        let body = self.parse_statement()?;

        Ok(Statement::While {
            condition,
            body: Box::new(body),
            location,
        })
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement, ParseError> {
        let location = self.next_token().location;
        let body = self.parse_statement()?;

        if !self.peek_keyword(0, Keyword::While) {
            return Err(ParseError::Expected {
                expected: "while".to_owned(),
                context: Some("in do/while loop".to_owned()),
                location: self.peek_location(0),
            });
        }
        self.next_token();

        let condition = self.parse_parenthesized_condition("while")?;
        self.expect_and_consume_punctuator(
            Punctuator::Semicolon,
            Some("after do/while statement"),
        )?;

        Ok(Statement::DoWhile {
            body: Box::new(body),
            condition,
            location,
        })
    }

    fn parse_for_statement(&mut self) -> Result<Statement, ParseError> {
        const CONTEXT: &str = "in 'for' statement specifier";

        let location = self.next_token().location;
        self.expect_and_consume_punctuator(Punctuator::ParenthesisOpen, Some("after 'for'"))?;

        let initializer = if self.consume_punctuator_if(Punctuator::Semicolon) {
            ForInitializer::Empty
        } else if self.is_declaration_start() {
            // the declaration includes the `;`
            ForInitializer::Declaration(self.parse_block_declaration()?)
        } else {
            let expression = self.parse_expression()?;
            self.expect_and_consume_punctuator(Punctuator::Semicolon, Some(CONTEXT))?;
            ForInitializer::Expression(expression)
        };

        let condition = if self.peek_punctuator(0, Punctuator::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_and_consume_punctuator(Punctuator::Semicolon, Some(CONTEXT))?;

        let step = if self.peek_punctuator(0, Punctuator::ParenthesisClose) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_and_consume_punctuator(Punctuator::ParenthesisClose, None)?;

        let body = self.parse_statement()?;

        Ok(Statement::For {
            initializer,
            condition,
            step,
            body: Box::new(body),
            location,
        })
    }

    fn parse_switch_statement(&mut self) -> Result<Statement, ParseError> {
        let location = self.next_token().location;
        let condition = self.parse_parenthesized_condition("switch")?;
        let body = self.parse_statement()?;

        Ok(Statement::Switch {
            condition,
            body: Box::new(body),
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        ast::{Declaration, ForInitializer, Statement},
        parser::tests::{messages, parse, parse_ok},
    };

    // The statements of the body of the first function.
    fn body_statements(src: &str) -> Vec<Statement> {
        let unit = parse_ok(src);
        let Some(Declaration::FunctionDefinition(function)) = unit.declarations.into_iter().next()
        else {
            panic!("expected a function definition");
        };

        match function.body {
            Statement::Compound(statements, _) => statements,
            _ => panic!("expected a compound statement"),
        }
    }

    #[test]
    fn test_control_flow() {
        let src = "\
int main() {
    int total = 0;
    for (int i = 0; i < 10; i++) {
        if (i % 2 == 0) continue; else total += i;
    }
    while (total > 100) total--;
    do { total++; } while (total < 5);
    switch (total) {
        case 1: total = 2; break;
        case 2:
        default: break;
    }
    goto done;
done:
    ;
    return total;
}
";
        let statements = body_statements(src);
        let kinds = statements
            .iter()
            .map(|statement| match statement {
                Statement::Declaration(..) => "declaration",
                Statement::For { .. } => "for",
                Statement::While { .. } => "while",
                Statement::DoWhile { .. } => "do",
                Statement::Switch { .. } => "switch",
                Statement::Goto(..) => "goto",
                Statement::Label { .. } => "label",
                Statement::Return(..) => "return",
                _ => "other",
            })
            .collect::<Vec<_>>();

        assert_eq!(
            kinds,
            vec!["declaration", "for", "while", "do", "switch", "goto", "label", "return"]
        );

        let Statement::For { initializer, .. } = &statements[1] else {
            panic!("expected a for statement");
        };
        assert!(matches!(initializer, ForInitializer::Declaration(declarations) if declarations.len() == 1));
    }

    #[test]
    fn test_for_variants() {
        let statements = body_statements("void f() { int i; for (;;) break; for (i = 0; ; ) break; }\n");
        let Statement::For {
            initializer,
            condition,
            step,
            ..
        } = &statements[1]
        else {
            panic!("expected a for statement");
        };
        assert_eq!(initializer, &ForInitializer::Empty);
        assert_eq!(condition, &None);
        assert_eq!(step, &None);

        let Statement::For { initializer, .. } = &statements[2] else {
            panic!("expected a for statement");
        };
        assert!(matches!(initializer, ForInitializer::Expression(_)));
    }

    #[test]
    fn test_missing_semicolon() {
        let src = "\
int main() {
    int a = 1
    a = 2;
    return a
}
";
        let result = parse(src);
        assert_eq!(
            messages(&result),
            vec![
                "expected ';' at end of declaration",
                "expected ';' after return statement"
            ]
        );
        assert!(result.translation_unit.find_function("main").is_some());
    }

    #[test]
    fn test_dangling_else() {
        let statements = body_statements("void f(int a, int b) { if (a) if (b) a = 1; else a = 2; }\n");
        let Statement::If {
            then_branch,
            else_branch,
            ..
        } = &statements[0]
        else {
            panic!("expected an if statement");
        };

        assert!(else_branch.is_none());
        assert!(matches!(
            then_branch.as_ref(),
            Statement::If {
                else_branch: Some(_),
                ..
            }
        ));
    }
}
