// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::collections::HashSet;

use crate::{
    ast::{
        Declaration, Declarator, Designator, EnumDefinition, Enumerator, FunctionDeclaration,
        FunctionDefinition, Initializer, InitializerItem, ParameterList, RecordDefinition,
        RecordMember, StorageClass, VariableDeclaration,
    },
    diagnostic::Diagnostic,
    error::ParseError,
    location::Location,
    token::{Keyword, Punctuator, Token},
    types::{BaseType, Qualifiers, RecordKind, Type},
};

use super::{Parser, declarator::DeclaratorKind};

const IMPLICIT_INT_MESSAGE: &str =
    "type specifier missing, defaults to 'int'; ISO C99 and later do not support implicit int";

// The expected tokens listed when a declaration starts with an unknown name.
const TYPE_SPECIFIER_NAMES: [&str; 14] = [
    "int",
    "char",
    "short",
    "long",
    "float",
    "double",
    "void",
    "signed",
    "unsigned",
    "_Bool",
    "struct",
    "union",
    "enum",
    "typedef name",
];

/// The declaration specifiers of one declaration, combined.
pub(super) struct DeclarationSpecifiers {
    // The qualifiers are already applied.
    pub base_type: Type,
    pub storage_class: Option<StorageClass>,
    pub is_typedef: bool,
    pub is_inline: bool,

    // `false` when no type specifier is present, `base_type` is then `int`.
    pub has_type_specifier: bool,

    // Structs, unions and enums defined by the specifiers, in source order.
    pub tag_declarations: Vec<Declaration>,

    // A tag definition is not followed by `;`, it was already reported.
    pub missing_semicolon: bool,

    pub location: Location,
}

// The number of occurrences of each type specifier keyword, e.g. `unsigned long long`
// has `unsigned: 1, long: 2`.
#[derive(Debug, Default, Clone, Copy)]
struct TypeSpecifierCounts {
    void: usize,
    bool: usize,
    char: usize,
    short: usize,
    int: usize,
    long: usize,
    float: usize,
    double: usize,
    signed: usize,
    unsigned: usize,
}

impl TypeSpecifierCounts {
    fn is_empty(&self) -> bool {
        self.total() == 0
    }

    fn total(&self) -> usize {
        self.void
            + self.bool
            + self.char
            + self.short
            + self.int
            + self.long
            + self.float
            + self.double
            + self.signed
            + self.unsigned
    }

    /// Adds a type specifier keyword, returns `false` if it can not be combined
    /// with the previous ones.
    fn add(&mut self, keyword: Keyword) -> bool {
        let c = *self;
        let (combinable, counter) = match keyword {
            Keyword::Void => (c.is_empty(), &mut self.void),
            Keyword::Bool | Keyword::UnderscoreBool => (c.is_empty(), &mut self.bool),
            Keyword::Char => (
                c.total() == c.signed + c.unsigned,
                &mut self.char,
            ),
            Keyword::Short => (
                c.void + c.bool + c.char + c.short + c.long + c.float + c.double == 0,
                &mut self.short,
            ),
            Keyword::Int => (
                c.void + c.bool + c.char + c.int + c.float + c.double == 0,
                &mut self.int,
            ),
            Keyword::Long => (
                c.void + c.bool + c.char + c.short + c.float == 0
                    && c.long < 2
                    && (c.double == 0 || c.long == 0),
                &mut self.long,
            ),
            Keyword::Float => (c.is_empty(), &mut self.float),
            Keyword::Double => (
                c.total() == c.long && c.long <= 1,
                &mut self.double,
            ),
            Keyword::Signed | Keyword::Unsigned => {
                let combinable =
                    c.void + c.bool + c.float + c.double + c.signed + c.unsigned == 0;
                if keyword == Keyword::Signed {
                    (combinable, &mut self.signed)
                } else {
                    (combinable, &mut self.unsigned)
                }
            }
            _ => return false,
        };

        if combinable {
            *counter += 1;
        }
        combinable
    }

    fn resolve(&self) -> BaseType {
        let unsigned = self.unsigned > 0;

        if self.void > 0 {
            BaseType::Void
        } else if self.bool > 0 {
            BaseType::Bool
        } else if self.char > 0 {
            if self.signed > 0 {
                BaseType::SignedChar
            } else if unsigned {
                BaseType::UnsignedChar
            } else {
                BaseType::Char
            }
        } else if self.float > 0 {
            BaseType::Float
        } else if self.double > 0 {
            if self.long > 0 {
                BaseType::LongDouble
            } else {
                BaseType::Double
            }
        } else if self.short > 0 {
            if unsigned {
                BaseType::UnsignedShort
            } else {
                BaseType::Short
            }
        } else if self.long >= 2 {
            if unsigned {
                BaseType::UnsignedLongLong
            } else {
                BaseType::LongLong
            }
        } else if self.long == 1 {
            if unsigned {
                BaseType::UnsignedLong
            } else {
                BaseType::Long
            }
        } else if unsigned {
            BaseType::UnsignedInt
        } else {
            BaseType::Int
        }
    }
}

/// Maps the GNU alternate spellings, e.g. `__inline__` and `__restrict`, to keywords.
pub(super) fn gnu_alternate_keyword(name: &str) -> Option<Keyword> {
    let keyword = match name {
        "__inline" | "__inline__" => Keyword::Inline,
        "__restrict" | "__restrict__" => Keyword::Restrict,
        "__const" | "__const__" => Keyword::Const,
        "__volatile" | "__volatile__" => Keyword::Volatile,
        "__signed" | "__signed__" => Keyword::Signed,
        _ => return None,
    };
    Some(keyword)
}

/// Keywords that start a type name: type specifiers and type qualifiers.
pub(super) fn is_type_keyword(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Void
            | Keyword::Bool
            | Keyword::UnderscoreBool
            | Keyword::Char
            | Keyword::Short
            | Keyword::Int
            | Keyword::Long
            | Keyword::Float
            | Keyword::Double
            | Keyword::Signed
            | Keyword::Unsigned
            | Keyword::UnderscoreComplex
            | Keyword::UnderscoreImaginary
            | Keyword::Struct
            | Keyword::Union
            | Keyword::Enum
            | Keyword::Const
            | Keyword::Volatile
            | Keyword::Restrict
            | Keyword::UnderscoreAtomic
            | Keyword::Alignas
            | Keyword::UnderscoreAlignas
    )
}

/// Keywords that can only appear in declaration specifiers.
pub(super) fn is_declaration_keyword(keyword: Keyword) -> bool {
    is_type_keyword(keyword)
        || matches!(
            keyword,
            Keyword::Typedef
                | Keyword::Extern
                | Keyword::Static
                | Keyword::Auto
                | Keyword::Register
                | Keyword::ThreadLocal
                | Keyword::UnderscoreThreadLocal
                | Keyword::Constexpr
                | Keyword::Inline
                | Keyword::UnderscoreNoreturn
                | Keyword::StaticAssert
                | Keyword::UnderscoreStaticAssert
        )
}

// Type specifier keywords that can not follow a complete struct, union or enum
// definition in the same declaration.
fn is_type_specifier_keyword(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Void
            | Keyword::Bool
            | Keyword::UnderscoreBool
            | Keyword::Char
            | Keyword::Short
            | Keyword::Int
            | Keyword::Long
            | Keyword::Float
            | Keyword::Double
            | Keyword::Signed
            | Keyword::Unsigned
            | Keyword::Struct
            | Keyword::Union
            | Keyword::Enum
            | Keyword::Typedef
    )
}

impl Parser {
    /// Parses a declaration at file scope, a function definition included.
    pub(super) fn parse_external_declaration(&mut self) -> Result<Vec<Declaration>, ParseError> {
        if self.peek_static_assert() {
            return Ok(vec![self.parse_static_assert()?]);
        }

        let consumed = self.consumed;
        let mut specifiers = self.parse_declaration_specifiers()?;
        self.check_type_specifier(&mut specifiers, consumed, &["identifier", "("])?;
        self.parse_init_declarators(specifiers, true)
    }

    /// Parses a declaration in a block or in the initializer of a `for` loop.
    pub(super) fn parse_block_declaration(&mut self) -> Result<Vec<Declaration>, ParseError> {
        if self.peek_static_assert() {
            return Ok(vec![self.parse_static_assert()?]);
        }

        let consumed = self.consumed;
        let mut specifiers = self.parse_declaration_specifiers()?;
        self.check_type_specifier(&mut specifiers, consumed, &["identifier", "("])?;
        self.parse_init_declarators(specifiers, false)
    }

    pub(super) fn peek_static_assert(&mut self) -> bool {
        self.peek_keyword(0, Keyword::StaticAssert)
            || self.peek_keyword(0, Keyword::UnderscoreStaticAssert)
    }

    // Reports a missing type specifier, the declaration continues as `int`.
    //
    // Returns an error when the declaration is empty,
    // i.e. no specifier was consumed and no declarator follows.
    pub(super) fn check_type_specifier(
        &mut self,
        specifiers: &mut DeclarationSpecifiers,
        consumed: usize,
        expected: &[&str],
    ) -> Result<(), ParseError> {
        if specifiers.has_type_specifier || self.recover_unknown_type_name(specifiers) {
            return Ok(());
        }

        if self.consumed == consumed && !self.can_start_declarator() {
            return Err(self.unexpected_token(expected));
        }

        self.report(
            Diagnostic::error(IMPLICIT_INT_MESSAGE, specifiers.location)
                .with_code("-Wimplicit-int")
                .with_fix_it("int "),
        );
        Ok(())
    }

    // An identifier followed by another identifier at the start of a declaration
    // is taken as an undeclared type name, e.g. `invalid x;`.
    fn recover_unknown_type_name(&mut self, specifiers: &mut DeclarationSpecifiers) -> bool {
        if self.peek_identifier(0).is_none() || self.peek_identifier(1).is_none() {
            return false;
        }

        let error = self.unexpected_token(&TYPE_SPECIFIER_NAMES);
        let token_with_location = self.next_token();
        self.report(Diagnostic::from(error).with_note(
            &format!("unknown type name '{}'", token_with_location.spelling),
            token_with_location.location,
        ));

        specifiers.has_type_specifier = true;
        true
    }

    fn can_start_declarator(&mut self) -> bool {
        matches!(
            self.peek_token(0),
            Token::Identifier(_)
                | Token::Punctuator(Punctuator::Multiply)
                | Token::Punctuator(Punctuator::ParenthesisOpen)
        )
    }

    pub(super) fn parse_declaration_specifiers(
        &mut self,
    ) -> Result<DeclarationSpecifiers, ParseError> {
        let mut specifiers = DeclarationSpecifiers {
            base_type: Type::int(),
            storage_class: None,
            is_typedef: false,
            is_inline: false,
            has_type_specifier: false,
            tag_declarations: vec![],
            missing_semicolon: false,
            location: self.peek_location(0),
        };

        let mut counts = TypeSpecifierCounts::default();
        let mut qualifiers = Qualifiers::default();
        let mut named_type: Option<Type> = None;
        let mut previous_type_specifier: Option<String> = None;

        loop {
            let token = self.peek_token(0).clone();
            let keyword = match &token {
                Token::Keyword(keyword) => Some(*keyword),
                Token::Identifier(name) => gnu_alternate_keyword(name),
                _ => None,
            };

            let Some(keyword) = keyword else {
                match token {
                    Token::Identifier(name) if is_attribute_name(&name) => {
                        self.skip_attributes();
                    }
                    Token::Identifier(name) if name == "__extension__" => {
                        self.next_token();
                    }
                    Token::Identifier(name)
                        if named_type.is_none()
                            && counts.is_empty()
                            && self.is_typedef_name(&name) =>
                    {
                        self.next_token();
                        previous_type_specifier = Some(name.clone());
                        named_type = Some(Type::Typedef(name));
                    }
                    _ => break,
                }
                continue;
            };

            match keyword {
                Keyword::Typedef => {
                    self.next_token();
                    specifiers.is_typedef = true;
                }
                Keyword::Extern
                | Keyword::Static
                | Keyword::Auto
                | Keyword::Register
                | Keyword::ThreadLocal
                | Keyword::UnderscoreThreadLocal => {
                    let token_with_location = self.next_token();
                    let storage_class = match keyword {
                        Keyword::Extern => StorageClass::Extern,
                        Keyword::Static => StorageClass::Static,
                        Keyword::Auto => StorageClass::Auto,
                        Keyword::Register => StorageClass::Register,
                        _ => StorageClass::ThreadLocal,
                    };

                    match specifiers.storage_class {
                        None | Some(StorageClass::ThreadLocal) => {
                            specifiers.storage_class = Some(storage_class)
                        }
                        Some(_) if storage_class == StorageClass::ThreadLocal => {}
                        Some(_) => self.report(ParseError::message(
                            "multiple storage classes in declaration specifiers",
                            token_with_location.location,
                        )),
                    }
                }
                Keyword::Constexpr | Keyword::UnderscoreNoreturn => {
                    self.next_token();
                }
                Keyword::Inline => {
                    self.next_token();
                    specifiers.is_inline = true;
                }
                Keyword::UnderscoreAtomic if self.peek_punctuator(1, Punctuator::ParenthesisOpen) => {
                    // `_Atomic(type-name)`
                    self.next_token();
                    self.next_token();
                    let atomic_type = self.parse_type_name()?;
                    self.expect_and_consume_punctuator(Punctuator::ParenthesisClose, None)?;
                    qualifiers.is_atomic = true;
                    previous_type_specifier = Some("_Atomic".to_owned());
                    named_type = Some(atomic_type);
                }
                Keyword::Const
                | Keyword::Volatile
                | Keyword::Restrict
                | Keyword::UnderscoreAtomic => {
                    qualifiers = qualifiers.merge(&self.parse_qualifiers());
                }
                Keyword::Alignas | Keyword::UnderscoreAlignas => {
                    self.next_token();
                    self.skip_balanced_parentheses()?;
                }
                Keyword::UnderscoreComplex | Keyword::UnderscoreImaginary => {
                    self.next_token();
                }
                Keyword::Void
                | Keyword::Bool
                | Keyword::UnderscoreBool
                | Keyword::Char
                | Keyword::Short
                | Keyword::Int
                | Keyword::Long
                | Keyword::Float
                | Keyword::Double
                | Keyword::Signed
                | Keyword::Unsigned => {
                    let token_with_location = self.next_token();
                    if named_type.is_some() || !counts.add(keyword) {
                        self.report(ParseError::message(
                            &format!(
                                "cannot combine with previous '{}' declaration specifier",
                                previous_type_specifier.as_deref().unwrap_or_default()
                            ),
                            token_with_location.location,
                        ));
                    } else {
                        previous_type_specifier = Some(keyword.as_str().to_owned());
                    }
                }
                Keyword::Struct | Keyword::Union | Keyword::Enum => {
                    let location = self.peek_location(0);
                    let tag_type = if keyword == Keyword::Enum {
                        self.parse_enum_specifier(&mut specifiers)?
                    } else {
                        self.parse_record_specifier(&mut specifiers)?
                    };

                    if named_type.is_some() || !counts.is_empty() {
                        self.report(ParseError::message(
                            &format!(
                                "cannot combine with previous '{}' declaration specifier",
                                previous_type_specifier.as_deref().unwrap_or_default()
                            ),
                            location,
                        ));
                    } else {
                        previous_type_specifier = Some(keyword.as_str().to_owned());
                        named_type = Some(tag_type);
                    }

                    if specifiers.missing_semicolon {
                        break;
                    }
                }
                _ => break,
            }
        }

        let base_type = match named_type {
            Some(named_type) => named_type,
            None if counts.is_empty() => Type::int(),
            None => Type::Base(counts.resolve()),
        };

        specifiers.has_type_specifier = previous_type_specifier.is_some();
        specifiers.base_type = base_type.qualified(qualifiers);
        Ok(specifiers)
    }

    /// Parses the declarators of a declaration up to and including the closing `;`.
    ///
    /// When `allow_function_definition` is set and the first declarator declares a
    /// function followed by its body, the function definition is parsed instead.
    pub(super) fn parse_init_declarators(
        &mut self,
        specifiers: DeclarationSpecifiers,
        allow_function_definition: bool,
    ) -> Result<Vec<Declaration>, ParseError> {
        let DeclarationSpecifiers {
            base_type,
            storage_class,
            is_typedef,
            is_inline,
            tag_declarations,
            missing_semicolon,
            location: specifiers_location,
            ..
        } = specifiers;

        let mut declarations = tag_declarations;

        if missing_semicolon {
            return Ok(declarations);
        }

        if self.consume_punctuator_if(Punctuator::Semicolon) {
            // a forward declaration, e.g. `struct Node;`
            if declarations.is_empty() {
                if let Type::Record(kind, Some(tag)) = base_type.unqualified() {
                    declarations.push(Declaration::Record(RecordDefinition {
                        kind: *kind,
                        tag: Some(tag.clone()),
                        members: None,
                        location: specifiers_location,
                    }));
                }
            }
            return Ok(declarations);
        }

        let mut is_first = true;
        loop {
            let declarator = self.parse_declarator(DeclaratorKind::Named)?;
            self.skip_attributes();

            let (name, location) = match declarator.identifier() {
                Some((name, location)) => (name.to_owned(), location),
                None => return Err(self.unexpected_token(&["identifier"])),
            };

            let declared_type = Type::from_declarator(base_type.clone(), &declarator);

            if is_typedef {
                self.declare_name(&name, true);
                declarations.push(Declaration::Typedef {
                    name,
                    aliased_type: declared_type,
                    location,
                });
            } else if declared_type.is_function() {
                self.declare_name(&name, false);

                let is_identifier_list = declarator
                    .function_parameters()
                    .is_some_and(|parameter_list| parameter_list.identifier_list);
                let has_body = self.peek_punctuator(0, Punctuator::BraceOpen)
                    || (is_identifier_list
                        && !self.peek_punctuator(0, Punctuator::Semicolon)
                        && !self.peek_punctuator(0, Punctuator::Comma));

                if is_first && allow_function_definition && has_body {
                    let definition = self.parse_function_definition(
                        name,
                        &declarator,
                        declared_type,
                        storage_class,
                        is_inline,
                        location,
                    )?;
                    declarations.push(definition);
                    return Ok(declarations);
                }

                declarations.push(Declaration::Function(FunctionDeclaration {
                    name,
                    function_type: declared_type,
                    storage_class,
                    is_inline,
                    location,
                }));
            } else {
                self.declare_name(&name, false);

                let initializer = if self.consume_punctuator_if(Punctuator::Assign) {
                    Some(self.parse_initializer()?)
                } else {
                    None
                };

                declarations.push(Declaration::Variable(VariableDeclaration {
                    name,
                    variable_type: declared_type,
                    storage_class,
                    initializer,
                    location,
                }));
            }

            is_first = false;

            if !self.consume_punctuator_if(Punctuator::Comma) {
                break;
            }
        }

        self.expect_and_consume_punctuator(Punctuator::Semicolon, Some("at end of declaration"))?;
        Ok(declarations)
    }

    fn parse_function_definition(
        &mut self,
        name: String,
        declarator: &Declarator,
        function_type: Type,
        storage_class: Option<StorageClass>,
        is_inline: bool,
        location: Location,
    ) -> Result<Declaration, ParseError> {
        let mut parameter_list = declarator
            .function_parameters()
            .cloned()
            .unwrap_or(ParameterList {
                parameters: vec![],
                variadic: false,
                identifier_list: false,
            });

        let function_type = if parameter_list.identifier_list {
            self.parse_parameter_declarations(&name, &mut parameter_list)?;

            match function_type {
                Type::Function {
                    return_type,
                    variadic,
                    ..
                } => Type::Function {
                    return_type,
                    parameters: parameter_list
                        .parameters
                        .iter()
                        .map(|parameter| parameter.parameter_type.clone())
                        .collect(),
                    variadic,
                },
                other => other,
            }
        } else {
            function_type
        };

        self.enter_scope();
        for parameter in &parameter_list.parameters {
            if let Some(parameter_name) = &parameter.name {
                self.declare_name(parameter_name, false);
            }
        }
        let body = self.parse_compound_statement();
        self.leave_scope();

        Ok(Declaration::FunctionDefinition(FunctionDefinition {
            name,
            function_type,
            storage_class,
            is_inline,
            parameters: parameter_list.parameters,
            body: body?,
            location,
        }))
    }

    // The declaration list of an old style function definition, e.g.
    //
    // ```c
    // int add(a, b)
    //     int a;
    //     int b;
    // { return a + b; }
    // ```
    fn parse_parameter_declarations(
        &mut self,
        function_name: &str,
        parameter_list: &mut ParameterList,
    ) -> Result<(), ParseError> {
        let mut declared = HashSet::new();

        while !self.peek_punctuator(0, Punctuator::BraceOpen)
            && self.peek_token(0) != &Token::EndOfInput
        {
            let specifiers = self.parse_declaration_specifiers()?;
            if !specifiers.has_type_specifier {
                return Err(self.unexpected_token(&["{"]));
            }

            loop {
                let declarator = self.parse_declarator(DeclaratorKind::Named)?;
                let Some((name, location)) = declarator.identifier() else {
                    return Err(self.unexpected_token(&["identifier"]));
                };

                let parameter_type =
                    Type::from_declarator(specifiers.base_type.clone(), &declarator)
                        .adjust_parameter();

                match parameter_list
                    .parameters
                    .iter_mut()
                    .find(|parameter| parameter.name.as_deref() == Some(name))
                {
                    Some(parameter) => {
                        parameter.parameter_type = parameter_type;
                        declared.insert(name.to_owned());
                    }
                    None => self.report(ParseError::message(
                        &format!("parameter named '{}' is missing", name),
                        location,
                    )),
                }

                if !self.consume_punctuator_if(Punctuator::Comma) {
                    break;
                }
            }

            self.expect_and_consume_punctuator(
                Punctuator::Semicolon,
                Some("at end of declaration"),
            )?;
        }

        for parameter in &parameter_list.parameters {
            if let Some(name) = &parameter.name {
                if !declared.contains(name) {
                    self.report(ParseError::message(
                        &format!(
                            "missing type for function parameter '{}' in function '{}'",
                            name, function_name
                        ),
                        parameter.location,
                    ));
                }
            }
        }

        Ok(())
    }

    // Struct, union and enum
    // ----------------------

    fn parse_record_specifier(
        &mut self,
        specifiers: &mut DeclarationSpecifiers,
    ) -> Result<Type, ParseError> {
        let keyword_token = self.next_token();
        let kind = if keyword_token.token.is_keyword(Keyword::Union) {
            RecordKind::Union
        } else {
            RecordKind::Struct
        };

        self.skip_attributes();
        let tag = if self.peek_identifier(0).is_some() {
            Some(self.expect_and_consume_identifier()?.0)
        } else {
            None
        };

        if self.peek_punctuator(0, Punctuator::BraceOpen) {
            let (members, mut nested_declarations) = self.nested(Self::parse_record_members)?;
            specifiers.tag_declarations.append(&mut nested_declarations);
            specifiers
                .tag_declarations
                .push(Declaration::Record(RecordDefinition {
                    kind,
                    tag: tag.clone(),
                    members: Some(members),
                    location: keyword_token.location,
                }));

            self.skip_attributes();
            self.check_semicolon_after_definition(&kind.to_string(), specifiers);
        } else if tag.is_none() {
            return Err(self.unexpected_token(&["identifier", "{"]));
        }

        Ok(Type::Record(kind, tag))
    }

    // Returns the members, and the structs, unions and enums defined by the members.
    fn parse_record_members(
        &mut self,
    ) -> Result<(Vec<RecordMember>, Vec<Declaration>), ParseError> {
        self.expect_and_consume_punctuator(Punctuator::BraceOpen, None)?;

        let mut members = vec![];
        let mut nested_declarations = vec![];

        loop {
            match self.peek_token(0) {
                Token::Punctuator(Punctuator::BraceClose) | Token::EndOfInput => break,
                Token::Punctuator(Punctuator::Semicolon) => {
                    self.next_token();
                }
                _ => {
                    let consumed = self.consumed;
                    if let Err(error) =
                        self.parse_record_member(&mut members, &mut nested_declarations)
                    {
                        self.report(error);
                        self.synchronize();
                        if self.consumed == consumed {
                            self.next_token();
                        }
                    }
                }
            }
        }

        self.expect_and_consume_punctuator(Punctuator::BraceClose, None)?;
        Ok((members, nested_declarations))
    }

    fn parse_record_member(
        &mut self,
        members: &mut Vec<RecordMember>,
        nested_declarations: &mut Vec<Declaration>,
    ) -> Result<(), ParseError> {
        if self.peek_static_assert() {
            nested_declarations.push(self.parse_static_assert()?);
            return Ok(());
        }

        let location = self.peek_location(0);
        let consumed = self.consumed;
        let mut specifiers = self.parse_declaration_specifiers()?;
        if !specifiers.has_type_specifier && !self.recover_unknown_type_name(&mut specifiers) {
            if self.consumed == consumed {
                return Err(self.unexpected_token(&["type name"]));
            }
            self.report(
                Diagnostic::error(IMPLICIT_INT_MESSAGE, location)
                    .with_code("-Wimplicit-int")
                    .with_fix_it("int "),
            );
        }

        nested_declarations.append(&mut specifiers.tag_declarations);
        if specifiers.missing_semicolon {
            return Ok(());
        }

        // an anonymous struct or union member
        if self.consume_punctuator_if(Punctuator::Semicolon) {
            members.push(RecordMember {
                name: None,
                member_type: specifiers.base_type,
                bit_width: None,
                location,
            });
            return Ok(());
        }

        loop {
            let member_location = self.peek_location(0);
            let (name, member_type) = if self.peek_punctuator(0, Punctuator::Colon) {
                (None, specifiers.base_type.clone())
            } else {
                let declarator = self.parse_declarator(DeclaratorKind::Named)?;
                (
                    declarator.name().map(|name| name.to_owned()),
                    Type::from_declarator(specifiers.base_type.clone(), &declarator),
                )
            };

            let bit_width = if self.consume_punctuator_if(Punctuator::Colon) {
                Some(self.parse_conditional_expression()?)
            } else {
                None
            };
            self.skip_attributes();

            members.push(RecordMember {
                name,
                member_type,
                bit_width,
                location: member_location,
            });

            if !self.consume_punctuator_if(Punctuator::Comma) {
                break;
            }
        }

        self.expect_and_consume_punctuator(
            Punctuator::Semicolon,
            Some("at end of declaration list"),
        )?;
        Ok(())
    }

    fn parse_enum_specifier(
        &mut self,
        specifiers: &mut DeclarationSpecifiers,
    ) -> Result<Type, ParseError> {
        let keyword_token = self.next_token();

        self.skip_attributes();
        let tag = if self.peek_identifier(0).is_some() {
            Some(self.expect_and_consume_identifier()?.0)
        } else {
            None
        };

        if self.consume_punctuator_if(Punctuator::BraceOpen) {
            let mut enumerators = vec![];

            while !self.peek_punctuator(0, Punctuator::BraceClose) {
                let (name, location) = self.expect_and_consume_identifier()?;
                let value = if self.consume_punctuator_if(Punctuator::Assign) {
                    Some(self.parse_conditional_expression()?)
                } else {
                    None
                };

                // enumeration constants are ordinary identifiers
                self.declare_name(&name, false);
                enumerators.push(Enumerator {
                    name,
                    value,
                    location,
                });

                if !self.consume_punctuator_if(Punctuator::Comma) {
                    break;
                }
            }

            self.expect_and_consume_punctuator(Punctuator::BraceClose, None)?;
            specifiers.tag_declarations.push(Declaration::Enum(EnumDefinition {
                tag: tag.clone(),
                enumerators,
                location: keyword_token.location,
            }));

            self.skip_attributes();
            self.check_semicolon_after_definition("enum", specifiers);
        } else if tag.is_none() {
            return Err(self.unexpected_token(&["identifier", "{"]));
        }

        Ok(Type::Enum(tag))
    }

    // Reports `expected ';' after struct` when a definition is directly
    // followed by the next declaration.
    fn check_semicolon_after_definition(
        &mut self,
        kind: &str,
        specifiers: &mut DeclarationSpecifiers,
    ) {
        let is_missing = match self.peek_token(0) {
            Token::EndOfInput => true,
            Token::Keyword(keyword) => is_type_specifier_keyword(*keyword),
            _ => false,
        };

        if is_missing {
            let location = self.last_location;
            self.report(ParseError::Expected {
                expected: ";".to_owned(),
                context: Some(format!("after {}", kind)),
                location,
            });
            specifiers.missing_semicolon = true;
        }
    }

    fn parse_static_assert(&mut self) -> Result<Declaration, ParseError> {
        let location = self.next_token().location;

        self.expect_and_consume_punctuator(Punctuator::ParenthesisOpen, None)?;
        let condition = self.parse_conditional_expression()?;

        let message = if self.consume_punctuator_if(Punctuator::Comma) {
            let mut message = String::new();
            while let Token::String(text, _) = self.peek_token(0) {
                message.push_str(text);
                self.next_token();
            }
            Some(message)
        } else {
            None
        };

        self.expect_and_consume_punctuator(Punctuator::ParenthesisClose, None)?;
        self.expect_and_consume_punctuator(Punctuator::Semicolon, Some("after static_assert"))?;

        Ok(Declaration::StaticAssert {
            condition,
            message,
            location,
        })
    }

    // Initializers
    // ------------

    pub(super) fn parse_initializer(&mut self) -> Result<Initializer, ParseError> {
        if !self.peek_punctuator(0, Punctuator::BraceOpen) {
            return Ok(Initializer::Expression(self.parse_assignment_expression()?));
        }

        let location = self.next_token().location;
        let mut items = vec![];

        while !self.peek_punctuator(0, Punctuator::BraceClose) {
            let designators = self.parse_designators()?;
            if !designators.is_empty() {
                self.expect_and_consume_punctuator(Punctuator::Assign, None)?;
            }

            let initializer = self.nested(Self::parse_initializer)?;
            items.push(InitializerItem {
                designators,
                initializer,
            });

            if !self.consume_punctuator_if(Punctuator::Comma) {
                break;
            }
        }

        self.expect_and_consume_punctuator(Punctuator::BraceClose, None)?;
        Ok(Initializer::List(items, location))
    }

    // e.g. `[2]`, `.x` and `[1].y[0]`
    fn parse_designators(&mut self) -> Result<Vec<Designator>, ParseError> {
        let mut designators = vec![];

        loop {
            if self.peek_punctuator(0, Punctuator::BracketOpen) {
                let location = self.next_token().location;
                let index = self.parse_conditional_expression()?;
                self.expect_and_consume_punctuator(Punctuator::BracketClose, None)?;
                designators.push(Designator::Index(index, location));
            } else if self.peek_punctuator(0, Punctuator::Dot) {
                self.next_token();
                let (name, location) = self.expect_and_consume_identifier()?;
                designators.push(Designator::Field(name, location));
            } else {
                break;
            }
        }

        Ok(designators)
    }

    // GNU extensions
    // --------------

    /// Skips `__attribute__((...))` and `__asm__("...")`.
    pub(super) fn skip_attributes(&mut self) {
        while self.peek_identifier(0).is_some_and(is_attribute_name) {
            self.next_token();
            if self.peek_punctuator(0, Punctuator::ParenthesisOpen) {
                // an unbalanced group runs to the end of input, which is reported later
                let _ = self.skip_balanced_parentheses();
            }
        }
    }

    pub(super) fn skip_balanced_parentheses(&mut self) -> Result<(), ParseError> {
        self.expect_and_consume_punctuator(Punctuator::ParenthesisOpen, None)?;

        let mut depth = 1usize;
        while depth > 0 {
            match self.next_token().token {
                Token::Punctuator(Punctuator::ParenthesisOpen) => depth += 1,
                Token::Punctuator(Punctuator::ParenthesisClose) => depth -= 1,
                Token::EndOfInput => {
                    return Err(ParseError::Expected {
                        expected: ")".to_owned(),
                        context: None,
                        location: self.peek_location(0),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn is_attribute_name(name: &str) -> bool {
    matches!(
        name,
        "__attribute__" | "__attribute" | "__asm__" | "__asm" | "__declspec"
    )
}
