// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt::Display;

use crate::ast::Declarator;

/// The arithmetic types and `void`, after the type specifiers of a declaration
/// have been combined, e.g. `unsigned long int` is `UnsignedLong`.
///
/// `char`, `signed char` and `unsigned char` are three distinct types.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BaseType {
    Void,
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
}

impl BaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseType::Void => "void",
            BaseType::Bool => "bool",
            BaseType::Char => "char",
            BaseType::SignedChar => "signed char",
            BaseType::UnsignedChar => "unsigned char",
            BaseType::Short => "short",
            BaseType::UnsignedShort => "unsigned short",
            BaseType::Int => "int",
            BaseType::UnsignedInt => "unsigned int",
            BaseType::Long => "long",
            BaseType::UnsignedLong => "unsigned long",
            BaseType::LongLong => "long long",
            BaseType::UnsignedLongLong => "unsigned long long",
            BaseType::Float => "float",
            BaseType::Double => "double",
            BaseType::LongDouble => "long double",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_restrict: bool,
    pub is_atomic: bool,
}

impl Qualifiers {
    pub fn is_empty(&self) -> bool {
        !(self.is_const || self.is_volatile || self.is_restrict || self.is_atomic)
    }

    pub fn merge(&self, other: &Qualifiers) -> Qualifiers {
        Qualifiers {
            is_const: self.is_const || other.is_const,
            is_volatile: self.is_volatile || other.is_volatile,
            is_restrict: self.is_restrict || other.is_restrict,
            is_atomic: self.is_atomic || other.is_atomic,
        }
    }
}

impl Display for Qualifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = [
            (self.is_const, "const"),
            (self.is_volatile, "volatile"),
            (self.is_restrict, "restrict"),
            (self.is_atomic, "_Atomic"),
        ]
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>();

        write!(f, "{}", names.join(" "))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecordKind {
    Struct,
    Union,
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Struct => write!(f, "struct"),
            RecordKind::Union => write!(f, "union"),
        }
    }
}

/// The resolved type of a declared name or an abstract declarator.
///
/// e.g. `int (*fp)(int, int)` is
/// `Pointer(Function { return_type: int, parameters: [int, int], variadic: false })`.
#[derive(Debug, PartialEq, Clone)]
pub enum Type {
    Base(BaseType),

    // `struct Point`, the tag is `None` for an anonymous struct or union.
    Record(RecordKind, Option<String>),

    Enum(Option<String>),

    // A name declared by `typedef`, the aliased type is in the typedef declaration.
    Typedef(String),

    // Only present when the qualifiers are not empty.
    Qualified(Box<Type>, Qualifiers),

    Pointer(Box<Type>),

    // The length is `None` when it is omitted or is not an integer constant.
    Array(Box<Type>, Option<u64>),

    Function {
        return_type: Box<Type>,
        parameters: Vec<Type>,
        variadic: bool,
    },
}

impl Type {
    pub fn int() -> Self {
        Type::Base(BaseType::Int)
    }

    pub fn void() -> Self {
        Type::Base(BaseType::Void)
    }

    pub fn pointer_to(self) -> Self {
        Type::Pointer(Box::new(self))
    }

    /// Adds qualifiers, merging them with the existing ones.
    pub fn qualified(self, qualifiers: Qualifiers) -> Self {
        if qualifiers.is_empty() {
            return self;
        }

        match self {
            Type::Qualified(target, existing) => {
                Type::Qualified(target, existing.merge(&qualifiers))
            }
            other => Type::Qualified(Box::new(other), qualifiers),
        }
    }

    pub fn unqualified(&self) -> &Type {
        match self {
            Type::Qualified(target, _) => target.unqualified(),
            other => other,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.unqualified(), Type::Function { .. })
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.unqualified(), Type::Pointer(_))
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self.unqualified() {
            Type::Pointer(target) => Some(target),
            _ => None,
        }
    }

    /// The type of an expression of this type used as a value:
    /// arrays become pointers to their first element and functions become
    /// pointers to functions.
    pub fn decay(&self) -> Type {
        match self.unqualified() {
            Type::Array(element, _) => element.as_ref().clone().pointer_to(),
            Type::Function { .. } => self.unqualified().clone().pointer_to(),
            _ => self.clone(),
        }
    }

    /// Builds the type of a declarator from the type given by the declaration specifiers.
    ///
    /// The declarator tree is unwrapped from the outside in, each layer wraps the
    /// type built so far, e.g. for `int *a[3]` the pointer layer is applied first
    /// (`int *`) and the array layer last (`int *[3]`).
    pub fn from_declarator(base: Type, declarator: &Declarator) -> Type {
        let mut current_type = base;
        let mut current = declarator;

        loop {
            match current {
                Declarator::Identifier(..) | Declarator::Abstract => return current_type,
                Declarator::Pointer(qualifiers, inner) => {
                    current_type = current_type.pointer_to().qualified(*qualifiers);
                    current = inner;
                }
                Declarator::Array(inner, size) => {
                    let length = size
                        .as_ref()
                        .and_then(|expression| expression.constant_value())
                        .and_then(|value| u64::try_from(value).ok());
                    current_type = Type::Array(Box::new(current_type), length);
                    current = inner;
                }
                Declarator::Function(inner, parameter_list) => {
                    current_type = Type::Function {
                        return_type: Box::new(current_type),
                        parameters: parameter_list
                            .parameters
                            .iter()
                            .map(|parameter| parameter.parameter_type.clone())
                            .collect(),
                        variadic: parameter_list.variadic,
                    };
                    current = inner;
                }
            }
        }
    }

    /// The type of a parameter declared with this type,
    /// arrays and functions are adjusted to pointers.
    pub fn adjust_parameter(self) -> Type {
        match self {
            Type::Array(element, _) => element.pointer_to(),
            Type::Function { .. } => self.pointer_to(),
            other => other,
        }
    }

    // Renders the type around the text of a declarator, e.g. `*` or `(*)(int)`.
    fn render(&self, inner: &str) -> String {
        match self {
            Type::Base(base_type) => join(base_type.as_str(), inner),
            Type::Record(kind, tag) => join(
                &format!("{} {}", kind, tag.as_deref().unwrap_or("(anonymous)")),
                inner,
            ),
            Type::Enum(tag) => join(
                &format!("enum {}", tag.as_deref().unwrap_or("(anonymous)")),
                inner,
            ),
            Type::Typedef(name) => join(name, inner),
            Type::Qualified(target, qualifiers) => match target.as_ref() {
                Type::Pointer(pointee) => render_pointer(pointee, &qualifiers.to_string(), inner),
                _ => join(&format!("{} {}", qualifiers, target.render("")), inner),
            },
            Type::Pointer(pointee) => render_pointer(pointee, "", inner),
            Type::Array(element, length) => {
                let length = length.map(|n| n.to_string()).unwrap_or_default();
                element.render(&format!("{}[{}]", inner, length))
            }
            Type::Function {
                return_type,
                parameters,
                variadic,
            } => {
                let mut parameter_texts = parameters
                    .iter()
                    .map(|parameter| parameter.to_string())
                    .collect::<Vec<_>>();

                if *variadic {
                    parameter_texts.push("...".to_owned());
                } else if parameter_texts.is_empty() {
                    parameter_texts.push("void".to_owned());
                }

                return_type.render(&format!("{}({})", inner, parameter_texts.join(", ")))
            }
        }
    }
}

fn join(specifier: &str, inner: &str) -> String {
    if inner.is_empty() {
        specifier.to_owned()
    } else if inner.starts_with('[') {
        format!("{}{}", specifier, inner)
    } else {
        format!("{} {}", specifier, inner)
    }
}

fn render_pointer(pointee: &Type, qualifiers: &str, inner: &str) -> String {
    let mut declarator = String::from("*");
    declarator.push_str(qualifiers);
    if !qualifiers.is_empty() && !inner.is_empty() {
        declarator.push(' ');
    }
    declarator.push_str(inner);

    match pointee.unqualified() {
        Type::Array(..) | Type::Function { .. } => pointee.render(&format!("({})", declarator)),
        _ => pointee.render(&declarator),
    }
}

/// C spelling of the type, e.g. `int (*)(int, int)` and `const char *`.
impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(""))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{BaseType, Qualifiers, RecordKind, Type};

    fn function(return_type: Type, parameters: Vec<Type>, variadic: bool) -> Type {
        Type::Function {
            return_type: Box::new(return_type),
            parameters,
            variadic,
        }
    }

    #[test]
    fn test_display() {
        let char_type = Type::Base(BaseType::Char);
        let const_char = char_type.clone().qualified(Qualifiers {
            is_const: true,
            ..Qualifiers::default()
        });

        assert_eq!(Type::Base(BaseType::UnsignedLong).to_string(), "unsigned long");
        assert_eq!(const_char.clone().pointer_to().to_string(), "const char *");
        assert_eq!(
            char_type.clone().pointer_to().pointer_to().to_string(),
            "char **"
        );
        assert_eq!(
            char_type
                .pointer_to()
                .qualified(Qualifiers {
                    is_const: true,
                    ..Qualifiers::default()
                })
                .to_string(),
            "char *const"
        );
        assert_eq!(
            function(Type::int(), vec![Type::int(), Type::int()], false)
                .pointer_to()
                .to_string(),
            "int (*)(int, int)"
        );
        assert_eq!(
            Type::Array(Box::new(Type::int().pointer_to()), Some(5)).to_string(),
            "int *[5]"
        );
        assert_eq!(
            Type::Array(Box::new(Type::int()), Some(3))
                .pointer_to()
                .to_string(),
            "int (*)[3]"
        );
        assert_eq!(
            function(Type::int(), vec![const_char.pointer_to()], true).to_string(),
            "int (const char *, ...)"
        );
        assert_eq!(function(Type::void(), vec![], false).to_string(), "void (void)");
        assert_eq!(
            Type::Record(RecordKind::Struct, Some("Point".to_owned()))
                .pointer_to()
                .to_string(),
            "struct Point *"
        );
    }

    #[test]
    fn test_decay_and_adjust() {
        let add = function(Type::int(), vec![Type::int(), Type::int()], false);
        assert_eq!(add.decay(), add.clone().pointer_to());
        assert!(add.decay().is_pointer());
        assert_eq!(add.decay().pointee(), Some(&add));

        let array = Type::Array(Box::new(Type::int()), Some(4));
        assert_eq!(array.decay(), Type::int().pointer_to());
        assert_eq!(array.adjust_parameter(), Type::int().pointer_to());
    }
}
