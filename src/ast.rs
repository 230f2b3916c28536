// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt::Display;

use crate::{
    location::Location,
    token::{CharEncoding, StringEncoding},
    types::{Qualifiers, RecordKind, Type},
};

/// The top-level declarations of a source file, in source order.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct TranslationUnit {
    pub declarations: Vec<Declaration>,
}

impl TranslationUnit {
    pub fn find_function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.declarations.iter().find_map(|declaration| match declaration {
            Declaration::FunctionDefinition(definition) if definition.name == name => {
                Some(definition)
            }
            _ => None,
        })
    }

    pub fn find_variable(&self, name: &str) -> Option<&VariableDeclaration> {
        self.declarations.iter().find_map(|declaration| match declaration {
            Declaration::Variable(variable) if variable.name == name => Some(variable),
            _ => None,
        })
    }
}

/// A declaration introduces exactly one name (or one tag).
///
/// A declaration with several declarators, e.g. `int a, *b;`, is split into
/// one `Declaration` per declarator. A struct, union or enum defined inside the
/// declaration specifiers is emitted as its own declaration before them.
#[derive(Debug, PartialEq, Clone)]
pub enum Declaration {
    Variable(VariableDeclaration),

    // A function prototype, e.g. `int add(int, int);`.
    Function(FunctionDeclaration),

    FunctionDefinition(FunctionDefinition),

    Typedef {
        name: String,
        aliased_type: Type,
        location: Location,
    },

    Record(RecordDefinition),

    Enum(EnumDefinition),

    StaticAssert {
        condition: Expression,
        message: Option<String>,
        location: Location,
    },
}

impl Declaration {
    pub fn name(&self) -> Option<&str> {
        match self {
            Declaration::Variable(variable) => Some(&variable.name),
            Declaration::Function(function) => Some(&function.name),
            Declaration::FunctionDefinition(definition) => Some(&definition.name),
            Declaration::Typedef { name, .. } => Some(name),
            Declaration::Record(record) => record.tag.as_deref(),
            Declaration::Enum(definition) => definition.tag.as_deref(),
            Declaration::StaticAssert { .. } => None,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            Declaration::Variable(variable) => variable.location,
            Declaration::Function(function) => function.location,
            Declaration::FunctionDefinition(definition) => definition.location,
            Declaration::Typedef { location, .. } => *location,
            Declaration::Record(record) => record.location,
            Declaration::Enum(definition) => definition.location,
            Declaration::StaticAssert { location, .. } => *location,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StorageClass {
    Auto,
    Register,
    Static,
    Extern,
    ThreadLocal,
}

#[derive(Debug, PartialEq, Clone)]
pub struct VariableDeclaration {
    pub name: String,
    pub variable_type: Type,
    pub storage_class: Option<StorageClass>,
    pub initializer: Option<Initializer>,
    pub location: Location,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FunctionDeclaration {
    pub name: String,

    // Always a `Type::Function`.
    pub function_type: Type,
    pub storage_class: Option<StorageClass>,
    pub is_inline: bool,
    pub location: Location,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FunctionDefinition {
    pub name: String,
    pub function_type: Type,
    pub storage_class: Option<StorageClass>,
    pub is_inline: bool,
    pub parameters: Vec<Parameter>,
    pub body: Statement,
    pub location: Location,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Parameter {
    // `None` for an unnamed parameter in a prototype.
    pub name: Option<String>,

    // Already adjusted, e.g. `int a[]` has the type `int *`.
    pub parameter_type: Type,
    pub location: Location,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ParameterList {
    pub parameters: Vec<Parameter>,
    pub variadic: bool,

    // An old style identifier list, e.g. `(a, b)`, the parameter types are
    // given by the declarations before the function body.
    pub identifier_list: bool,
}

#[derive(Debug, PartialEq, Clone)]
pub struct RecordDefinition {
    pub kind: RecordKind,
    pub tag: Option<String>,

    // `None` for a forward declaration, e.g. `struct Node;`.
    pub members: Option<Vec<RecordMember>>,
    pub location: Location,
}

#[derive(Debug, PartialEq, Clone)]
pub struct RecordMember {
    // `None` for an anonymous struct or union member, or an unnamed bit field.
    pub name: Option<String>,
    pub member_type: Type,
    pub bit_width: Option<Expression>,
    pub location: Location,
}

#[derive(Debug, PartialEq, Clone)]
pub struct EnumDefinition {
    pub tag: Option<String>,
    pub enumerators: Vec<Enumerator>,
    pub location: Location,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Enumerator {
    pub name: String,
    pub value: Option<Expression>,
    pub location: Location,
}

/// The syntactic form of a declarator, before it is resolved into a `Type`
/// (see `Type::from_declarator`).
///
/// e.g. `*fp(int)` in `int (*fp)(int)` is
/// `Function(Pointer(empty qualifiers, Identifier("fp")), [int])`.
#[derive(Debug, PartialEq, Clone)]
pub enum Declarator {
    Identifier(String, Location),

    // A declarator without a name, e.g. the `*` in `sizeof(int *)`.
    Abstract,

    Pointer(Qualifiers, Box<Declarator>),

    Array(Box<Declarator>, Option<Box<Expression>>),

    Function(Box<Declarator>, ParameterList),
}

impl Declarator {
    pub fn name(&self) -> Option<&str> {
        self.identifier().map(|(name, _)| name)
    }

    pub fn identifier(&self) -> Option<(&str, Location)> {
        let mut current = self;
        loop {
            match current {
                Declarator::Identifier(name, location) => return Some((name, *location)),
                Declarator::Abstract => return None,
                Declarator::Pointer(_, inner)
                | Declarator::Array(inner, _)
                | Declarator::Function(inner, _) => current = inner,
            }
        }
    }

    /// The parameter list of the function directly named by this declarator,
    /// e.g. `(int a, int b)` of `*add(int a, int b)`, but not the one
    /// of `(*fp)(int)`.
    pub fn function_parameters(&self) -> Option<&ParameterList> {
        let mut current = self;
        let mut found = None;
        loop {
            match current {
                Declarator::Identifier(..) | Declarator::Abstract => return found,
                Declarator::Function(inner, parameter_list) => {
                    found = matches!(inner.as_ref(), Declarator::Identifier(..))
                        .then_some(parameter_list);
                    current = inner;
                }
                Declarator::Pointer(_, inner) | Declarator::Array(inner, _) => {
                    found = None;
                    current = inner;
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Initializer {
    Expression(Expression),
    List(Vec<InitializerItem>, Location),
}

#[derive(Debug, PartialEq, Clone)]
pub struct InitializerItem {
    pub designators: Vec<Designator>,
    pub initializer: Initializer,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Designator {
    Index(Expression, Location),
    Field(String, Location),
}

impl Initializer {
    /// Maps a brace list onto the elements of an array of the given length,
    /// following `[index]` designators. Elements without an initializer are `None`.
    ///
    /// e.g. `{ [2] = 42, [0] = 10, 11 }` with length 4 gives
    /// `[Some(10), Some(11), Some(42), None]`.
    pub fn array_elements(&self, length: usize) -> Vec<Option<&Initializer>> {
        let mut elements = vec![None; length];

        let Initializer::List(items, _) = self else {
            if let Some(first) = elements.first_mut() {
                *first = Some(self);
            }
            return elements;
        };

        let mut index = 0;
        for item in items {
            if let Some(Designator::Index(expression, _)) = item.designators.first() {
                match expression
                    .constant_value()
                    .and_then(|value| usize::try_from(value).ok())
                {
                    Some(value) => index = value,
                    None => continue,
                }
            }

            if let Some(element) = elements.get_mut(index) {
                *element = Some(&item.initializer);
            }
            index += 1;
        }

        elements
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum ForInitializer {
    Declaration(Vec<Declaration>),
    Expression(Expression),
    Empty,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Compound(Vec<Statement>, Location),

    // A block-scope declaration, split the same way as top-level ones.
    Declaration(Vec<Declaration>, Location),

    Expression(Expression, Location),

    // A lone `;`.
    Empty(Location),

    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
        location: Location,
    },

    While {
        condition: Expression,
        body: Box<Statement>,
        location: Location,
    },

    DoWhile {
        body: Box<Statement>,
        condition: Expression,
        location: Location,
    },

    For {
        initializer: ForInitializer,
        condition: Option<Expression>,
        step: Option<Expression>,
        body: Box<Statement>,
        location: Location,
    },

    Switch {
        condition: Expression,
        body: Box<Statement>,
        location: Location,
    },

    Case {
        value: Expression,
        body: Box<Statement>,
        location: Location,
    },

    Default {
        body: Box<Statement>,
        location: Location,
    },

    Label {
        name: String,
        body: Box<Statement>,
        location: Location,
    },

    Goto(String, Location),
    Break(Location),
    Continue(Location),
    Return(Option<Expression>, Location),
}

impl Statement {
    pub fn location(&self) -> Location {
        match self {
            Statement::Compound(_, location)
            | Statement::Declaration(_, location)
            | Statement::Expression(_, location)
            | Statement::Empty(location)
            | Statement::Goto(_, location)
            | Statement::Break(location)
            | Statement::Continue(location)
            | Statement::Return(_, location) => *location,
            Statement::If { location, .. }
            | Statement::While { location, .. }
            | Statement::DoWhile { location, .. }
            | Statement::For { location, .. }
            | Statement::Switch { location, .. }
            | Statement::Case { location, .. }
            | Statement::Default { location, .. }
            | Statement::Label { location, .. } => *location,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    // The value keeps the digits and radix prefix as written, without the suffix.
    Integer {
        value: String,
        unsigned: bool,
    },
    Float(String),
    Char(char, CharEncoding),

    // Adjacent string literals are concatenated.
    String(String, StringEncoding),
    Bool(bool),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Negate,       // '-'
    Plus,         // '+'
    Not,          // '!'
    BitwiseNot,   // '~'
    Dereference,  // '*'
    AddressOf,    // '&'
    PreIncrease,  // '++x'
    PreDecrease,  // '--x'
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PostfixOperator {
    Increase,
    Decrease,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Multiply,
    Divide,
    Modulo,
    Add,
    Subtract,
    ShiftLeft,
    ShiftRight,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    And,
    Or,
}

/// `=` and the compound assignments.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AssignmentOperator {
    Assign,

    // `+=` and friends carry the underlying binary operator.
    Compound(BinaryOperator),
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Literal(Literal, Location),
    Identifier(String, Location),

    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
        location: Location,
    },

    Postfix {
        operator: PostfixOperator,
        operand: Box<Expression>,
        location: Location,
    },

    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        location: Location,
    },

    Assignment {
        operator: AssignmentOperator,
        target: Box<Expression>,
        value: Box<Expression>,
        location: Location,
    },

    Conditional {
        condition: Box<Expression>,
        then_value: Box<Expression>,
        else_value: Box<Expression>,
        location: Location,
    },

    Comma(Box<Expression>, Box<Expression>, Location),

    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        location: Location,
    },

    Index {
        array: Box<Expression>,
        index: Box<Expression>,
        location: Location,
    },

    // `a.b`
    Member {
        object: Box<Expression>,
        member: String,
        location: Location,
    },

    // `a->b`
    PointerMember {
        object: Box<Expression>,
        member: String,
        location: Location,
    },

    Cast {
        target_type: Type,
        operand: Box<Expression>,
        location: Location,
    },

    SizeofType(Type, Location),
    SizeofExpression(Box<Expression>, Location),
    Alignof(Type, Location),

    // `(struct Point){ 1, 2 }`
    CompoundLiteral {
        literal_type: Type,
        initializer: Box<Initializer>,
        location: Location,
    },

    // `_Generic(x, int: 1, default: 0)`
    Generic {
        controlling: Box<Expression>,
        associations: Vec<GenericAssociation>,
        location: Location,
    },
}

/// One `type-name: expression` of a generic selection,
/// the type is `None` for the `default` association.
#[derive(Debug, PartialEq, Clone)]
pub struct GenericAssociation {
    pub association_type: Option<Type>,
    pub value: Expression,
}

impl Expression {
    pub fn location(&self) -> Location {
        match self {
            Expression::Literal(_, location)
            | Expression::Identifier(_, location)
            | Expression::Comma(_, _, location)
            | Expression::SizeofType(_, location)
            | Expression::SizeofExpression(_, location)
            | Expression::Alignof(_, location) => *location,
            Expression::Unary { location, .. }
            | Expression::Postfix { location, .. }
            | Expression::Binary { location, .. }
            | Expression::Assignment { location, .. }
            | Expression::Conditional { location, .. }
            | Expression::Call { location, .. }
            | Expression::Index { location, .. }
            | Expression::Member { location, .. }
            | Expression::PointerMember { location, .. }
            | Expression::Cast { location, .. }
            | Expression::CompoundLiteral { location, .. }
            | Expression::Generic { location, .. } => *location,
        }
    }

    /// Folds an integer constant expression made of literals and arithmetic,
    /// e.g. an array length or an enumerator value.
    ///
    /// Returns `None` for anything else, including division by zero and overflow.
    pub fn constant_value(&self) -> Option<i64> {
        match self {
            Expression::Literal(Literal::Integer { value, .. }, _) => parse_integer(value),
            Expression::Literal(Literal::Char(c, _), _) => Some(*c as i64),
            Expression::Literal(Literal::Bool(b), _) => Some(*b as i64),
            Expression::Unary {
                operator, operand, ..
            } => {
                let value = operand.constant_value()?;
                match operator {
                    UnaryOperator::Negate => value.checked_neg(),
                    UnaryOperator::Plus => Some(value),
                    UnaryOperator::Not => Some((value == 0) as i64),
                    UnaryOperator::BitwiseNot => Some(!value),
                    _ => None,
                }
            }
            Expression::Binary {
                operator,
                left,
                right,
                ..
            } => {
                let left = left.constant_value()?;
                let right = right.constant_value()?;
                match operator {
                    BinaryOperator::Multiply => left.checked_mul(right),
                    BinaryOperator::Divide => left.checked_div(right),
                    BinaryOperator::Modulo => left.checked_rem(right),
                    BinaryOperator::Add => left.checked_add(right),
                    BinaryOperator::Subtract => left.checked_sub(right),
                    BinaryOperator::ShiftLeft => u32::try_from(right)
                        .ok()
                        .and_then(|shift| left.checked_shl(shift)),
                    BinaryOperator::ShiftRight => u32::try_from(right)
                        .ok()
                        .and_then(|shift| left.checked_shr(shift)),
                    BinaryOperator::LessThan => Some((left < right) as i64),
                    BinaryOperator::GreaterThan => Some((left > right) as i64),
                    BinaryOperator::LessThanOrEqual => Some((left <= right) as i64),
                    BinaryOperator::GreaterThanOrEqual => Some((left >= right) as i64),
                    BinaryOperator::Equal => Some((left == right) as i64),
                    BinaryOperator::NotEqual => Some((left != right) as i64),
                    BinaryOperator::BitwiseAnd => Some(left & right),
                    BinaryOperator::BitwiseXor => Some(left ^ right),
                    BinaryOperator::BitwiseOr => Some(left | right),
                    BinaryOperator::And => Some((left != 0 && right != 0) as i64),
                    BinaryOperator::Or => Some((left != 0 || right != 0) as i64),
                }
            }
            Expression::Conditional {
                condition,
                then_value,
                else_value,
                ..
            } => {
                if condition.constant_value()? != 0 {
                    then_value.constant_value()
                } else {
                    else_value.constant_value()
                }
            }
            Expression::Cast { operand, .. } => operand.constant_value(),
            _ => None,
        }
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(binary) = text
        .strip_prefix("0b")
        .or_else(|| text.strip_prefix("0B"))
    {
        (binary, 2)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };

    let digits = digits.replace('\'', "");
    u64::from_str_radix(&digits, radix)
        .ok()
        .and_then(|value| i64::try_from(value).ok())
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        };
        write!(f, "{}", symbol)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::location::Location;

    use super::{BinaryOperator, Designator, Expression, Initializer, InitializerItem, Literal};

    fn integer(value: &str) -> Expression {
        Expression::Literal(
            Literal::Integer {
                value: value.to_owned(),
                unsigned: false,
            },
            Location::default(),
        )
    }

    fn item(index: Option<&str>, value: &str) -> InitializerItem {
        InitializerItem {
            designators: index
                .map(|index| vec![Designator::Index(integer(index), Location::default())])
                .unwrap_or_default(),
            initializer: Initializer::Expression(integer(value)),
        }
    }

    #[test]
    fn test_constant_value() {
        let expression = Expression::Binary {
            operator: BinaryOperator::Add,
            left: Box::new(integer("0x10")),
            right: Box::new(Expression::Binary {
                operator: BinaryOperator::ShiftLeft,
                left: Box::new(integer("010")),
                right: Box::new(integer("1")),
                location: Location::default(),
            }),
            location: Location::default(),
        };
        assert_eq!(expression.constant_value(), Some(32));

        let division_by_zero = Expression::Binary {
            operator: BinaryOperator::Divide,
            left: Box::new(integer("1")),
            right: Box::new(integer("0")),
            location: Location::default(),
        };
        assert_eq!(division_by_zero.constant_value(), None);
        assert_eq!(
            Expression::Identifier("n".to_owned(), Location::default()).constant_value(),
            None
        );
    }

    #[test]
    fn test_array_elements() {
        let list = Initializer::List(
            vec![item(Some("2"), "42"), item(Some("0"), "10"), item(None, "11")],
            Location::default(),
        );

        let values = list
            .array_elements(4)
            .iter()
            .map(|element| match element {
                Some(Initializer::Expression(expression)) => expression.constant_value(),
                _ => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(values, vec![Some(10), Some(11), Some(42), None]);
    }
}
