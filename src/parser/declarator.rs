// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{
    ast::{Declarator, Expression, Parameter, ParameterList},
    error::ParseError,
    token::{Keyword, Punctuator, Token},
    types::{Qualifiers, Type},
};

use super::{Parser, declaration::gnu_alternate_keyword};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(super) enum DeclaratorKind {
    // A declarator of a declaration, the name is required.
    Named,

    // A declarator of a type name, e.g. in a cast or `sizeof`.
    Abstract,

    // A declarator of a parameter, the name is optional.
    Either,
}

// Declarators
//
// ```text
// declarator        = pointer* direct_declarator
// pointer           = "*" qualifier*
// direct_declarator = (identifier | "(" declarator ")") suffix*
// suffix            = "[" size? "]" | "(" parameter_list ")"
// ```
//
// A pointer wraps everything on its right, and a suffix wraps everything
// on its left, e.g. `*a[3]` is `Pointer(Array(a))`, an array of pointers,
// and `(*a)[3]` is `Array(Pointer(a))`, a pointer to an array.
impl Parser {
    pub(super) fn parse_declarator(
        &mut self,
        kind: DeclaratorKind,
    ) -> Result<Declarator, ParseError> {
        let mut pointers = vec![];
        while self.consume_punctuator_if(Punctuator::Multiply) {
            pointers.push(self.parse_qualifiers());
        }

        let mut declarator = self.parse_direct_declarator(kind)?;
        for qualifiers in pointers.into_iter().rev() {
            declarator = Declarator::Pointer(qualifiers, Box::new(declarator));
        }

        Ok(declarator)
    }

    fn parse_direct_declarator(&mut self, kind: DeclaratorKind) -> Result<Declarator, ParseError> {
        let token = self.peek_token(0).clone();

        let mut declarator = match token {
            Token::Identifier(name)
                if kind == DeclaratorKind::Named
                    || (kind == DeclaratorKind::Either && !self.is_typedef_name(&name)) =>
            {
                let location = self.next_token().location;
                Declarator::Identifier(name, location)
            }
            Token::Punctuator(Punctuator::ParenthesisOpen) if self.is_nested_declarator(kind) => {
                self.next_token();
                let inner = self.nested(|parser| parser.parse_declarator(kind))?;
                self.expect_and_consume_punctuator(Punctuator::ParenthesisClose, None)?;
                inner
            }
            _ if kind == DeclaratorKind::Named => {
                return Err(self.unexpected_token(&["identifier", "("]));
            }
            _ => Declarator::Abstract,
        };

        loop {
            if self.peek_punctuator(0, Punctuator::BracketOpen) {
                self.next_token();
                let size = self.parse_array_size()?;
                declarator = Declarator::Array(Box::new(declarator), size.map(Box::new));
            } else if self.peek_punctuator(0, Punctuator::ParenthesisOpen) {
                self.next_token();
                let parameter_list = self.nested(Self::parse_parameter_list)?;
                declarator = Declarator::Function(Box::new(declarator), parameter_list);
            } else {
                break;
            }
        }

        Ok(declarator)
    }

    // Whether the `(` starts a parenthesized declarator rather than
    // the parameter list of an abstract function declarator.
    fn is_nested_declarator(&mut self, kind: DeclaratorKind) -> bool {
        match self.peek_token(1).clone() {
            Token::Punctuator(Punctuator::Multiply)
            | Token::Punctuator(Punctuator::ParenthesisOpen)
            | Token::Punctuator(Punctuator::BracketOpen) => true,
            Token::Identifier(name) => match kind {
                DeclaratorKind::Named => true,
                DeclaratorKind::Either => !self.is_typedef_name(&name),
                DeclaratorKind::Abstract => false,
            },
            _ => false,
        }
    }

    // The part after `[`, e.g. `static const 10]` of a parameter `int a[static const 10]`.
    fn parse_array_size(&mut self) -> Result<Option<Expression>, ParseError> {
        loop {
            if self.peek_keyword(0, Keyword::Static) {
                self.next_token();
            } else if self.is_qualifier_start() {
                self.parse_qualifiers();
            } else {
                break;
            }
        }

        let size = if self.peek_punctuator(0, Punctuator::BracketClose) {
            None
        } else if self.peek_punctuator(0, Punctuator::Multiply)
            && self.peek_punctuator(1, Punctuator::BracketClose)
        {
            // a variable length array of unspecified size
            self.next_token();
            None
        } else {
            Some(self.parse_assignment_expression()?)
        };

        self.expect_and_consume_punctuator(Punctuator::BracketClose, None)?;
        Ok(size)
    }

    fn is_qualifier_start(&mut self) -> bool {
        let keyword = match self.peek_token(0) {
            Token::Keyword(keyword) => Some(*keyword),
            Token::Identifier(name) => gnu_alternate_keyword(name),
            _ => None,
        };

        matches!(
            keyword,
            Some(Keyword::Const | Keyword::Volatile | Keyword::Restrict | Keyword::UnderscoreAtomic)
        )
    }

    /// Consumes the type qualifiers at the current position, if any.
    pub(super) fn parse_qualifiers(&mut self) -> Qualifiers {
        let mut qualifiers = Qualifiers::default();

        loop {
            if self.is_qualifier_start() {
                let keyword = match self.next_token().token {
                    Token::Keyword(keyword) => Some(keyword),
                    Token::Identifier(name) => gnu_alternate_keyword(&name),
                    _ => None,
                };

                match keyword {
                    Some(Keyword::Const) => qualifiers.is_const = true,
                    Some(Keyword::Volatile) => qualifiers.is_volatile = true,
                    Some(Keyword::Restrict) => qualifiers.is_restrict = true,
                    Some(Keyword::UnderscoreAtomic) => qualifiers.is_atomic = true,
                    _ => {}
                }
            } else if self
                .peek_identifier(0)
                .is_some_and(|name| name == "__attribute__" || name == "__attribute")
            {
                self.skip_attributes();
            } else {
                break;
            }
        }

        qualifiers
    }

    /// Parses the parameter list after `(`, including the closing `)`.
    pub(super) fn parse_parameter_list(&mut self) -> Result<ParameterList, ParseError> {
        let mut parameter_list = ParameterList {
            parameters: vec![],
            variadic: false,
            identifier_list: false,
        };

        if self.consume_punctuator_if(Punctuator::ParenthesisClose) {
            return Ok(parameter_list);
        }

        // `(void)`
        if self.peek_keyword(0, Keyword::Void) && self.peek_punctuator(1, Punctuator::ParenthesisClose)
        {
            self.next_token();
            self.next_token();
            return Ok(parameter_list);
        }

        if self.is_identifier_list() {
            parameter_list.identifier_list = true;

            loop {
                let (name, location) = self.expect_and_consume_identifier()?;
                parameter_list.parameters.push(Parameter {
                    name: Some(name),
                    parameter_type: Type::int(),
                    location,
                });

                if !self.consume_punctuator_if(Punctuator::Comma) {
                    break;
                }
            }
        } else {
            loop {
                if self.consume_punctuator_if(Punctuator::Ellipsis) {
                    parameter_list.variadic = true;
                    break;
                }

                let parameter = self.parse_parameter_declaration()?;
                parameter_list.parameters.push(parameter);

                if !self.consume_punctuator_if(Punctuator::Comma) {
                    break;
                }
            }
        }

        self.expect_and_consume_punctuator(Punctuator::ParenthesisClose, None)?;
        Ok(parameter_list)
    }

    // e.g. `(a, b)` of `int add(a, b) int a, b; { ... }`
    fn is_identifier_list(&mut self) -> bool {
        let Token::Identifier(name) = self.peek_token(0).clone() else {
            return false;
        };

        !self.is_typedef_name(&name)
            && gnu_alternate_keyword(&name).is_none()
            && (self.peek_punctuator(1, Punctuator::Comma)
                || self.peek_punctuator(1, Punctuator::ParenthesisClose))
    }

    fn parse_parameter_declaration(&mut self) -> Result<Parameter, ParseError> {
        let location = self.peek_location(0);
        let consumed = self.consumed;

        let mut specifiers = self.parse_declaration_specifiers()?;
        self.check_type_specifier(&mut specifiers, consumed, &["parameter declarator"])?;

        let declarator = self.parse_declarator(DeclaratorKind::Either)?;
        self.skip_attributes();

        let parameter_type =
            Type::from_declarator(specifiers.base_type, &declarator).adjust_parameter();

        let (name, location) = match declarator.identifier() {
            Some((name, location)) => (Some(name.to_owned()), location),
            None => (None, location),
        };

        Ok(Parameter {
            name,
            parameter_type,
            location,
        })
    }

    /// Parses a type name, e.g. the `int *` of `(int *)p` and `sizeof(int *)`.
    pub(super) fn parse_type_name(&mut self) -> Result<Type, ParseError> {
        let specifiers = self.parse_declaration_specifiers()?;
        if !specifiers.has_type_specifier {
            return Err(self.unexpected_token(&["type name"]));
        }

        let declarator = self.parse_declarator(DeclaratorKind::Abstract)?;
        Ok(Type::from_declarator(specifiers.base_type, &declarator))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        ast::{Declaration, Declarator},
        parser::tests::parse_ok,
        types::Type,
    };

    fn declared_types(src: &str) -> Vec<String> {
        parse_ok(src)
            .declarations
            .iter()
            .map(|declaration| match declaration {
                Declaration::Variable(variable) => variable.variable_type.to_string(),
                Declaration::Function(function) => function.function_type.to_string(),
                Declaration::FunctionDefinition(definition) => {
                    definition.function_type.to_string()
                }
                Declaration::Typedef { aliased_type, .. } => aliased_type.to_string(),
                _ => String::new(),
            })
            .collect()
    }

    #[test]
    fn test_pointers_and_arrays() {
        assert_eq!(
            declared_types(
                "char **argv;\nint *a[3];\nint (*b)[3];\nint m[2][4];\nconst char *const name;\n"
            ),
            vec![
                "char **",
                "int *[3]",
                "int (*)[3]",
                "int[2][4]",
                "const char *const"
            ]
        );
    }

    #[test]
    fn test_function_declarators() {
        assert_eq!(
            declared_types(
                "\
int add(int a, int b);
int (*function_pointer)(int, int);
void (*signal(int sig, void (*handler)(int)))(int);
int count(void);
int printf(const char *format, ...);
int sum(int values[], int n);
int apply(int operation(int));
"
            ),
            vec![
                "int (int, int)",
                "int (*)(int, int)",
                "void (*(int, void (*)(int)))(int)",
                "int (void)",
                "int (const char *, ...)",
                "int (int *, int)",
                "int (int (*)(int))"
            ]
        );
    }

    #[test]
    fn test_function_pointer_matches_function() {
        let unit = parse_ok(
            "\
int add(int a, int b) { return a + b; }
int (*function_pointer)(int, int);
",
        );

        let add = unit.find_function("add").unwrap();
        let function_pointer = unit.find_variable("function_pointer").unwrap();

        assert_eq!(function_pointer.variable_type, add.function_type.decay());
        assert_eq!(
            function_pointer.variable_type,
            Type::Function {
                return_type: Box::new(Type::int()),
                parameters: vec![Type::int(), Type::int()],
                variadic: false,
            }
            .pointer_to()
        );
    }

    #[test]
    fn test_parameter_names() {
        let unit = parse_ok("int apply(int (*operation)(int, int), int, int b);\n");
        let Some(Declaration::Function(apply)) = unit.declarations.first() else {
            panic!("expected a function declaration");
        };
        assert_eq!(apply.name, "apply");

        let unit = parse_ok("int apply(int (*operation)(int, int), int, int b) { return b; }\n");
        let apply = unit.find_function("apply").unwrap();
        let names = apply
            .parameters
            .iter()
            .map(|parameter| parameter.name.as_deref())
            .collect::<Vec<_>>();
        assert_eq!(names, vec![Some("operation"), None, Some("b")]);
    }

    #[test]
    fn test_declarator_tree() {
        let unit = parse_ok("typedef int T;\nint f(T);\n");
        let Declaration::Function(f) = &unit.declarations[1] else {
            panic!("expected a function declaration");
        };
        assert_eq!(f.function_type.to_string(), "int (T)");

        let declarator = Declarator::Pointer(
            Default::default(),
            Box::new(Declarator::Identifier("p".to_owned(), Default::default())),
        );
        assert_eq!(declarator.name(), Some("p"));
        assert_eq!(declarator.function_parameters(), None);
    }
}
