// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::collections::HashMap;

use crate::{location::Location, token::TokenWithLocation};

/// The parameter list of a function-like macro.
///
/// For a variadic macro the last parameter is the variadic one:
/// `__VA_ARGS__` for `(a, ...)`, or the given name for the GNU form `(a, rest...)`.
#[derive(Debug, PartialEq, Clone)]
pub struct MacroParameters {
    pub names: Vec<String>,
    pub variadic: bool,
}

impl MacroParameters {
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// The number of arguments that must be present, not counting the variadic ones.
    pub fn required_count(&self) -> usize {
        if self.variadic {
            self.names.len() - 1
        } else {
            self.names.len()
        }
    }

    pub fn is_variadic_index(&self, index: usize) -> bool {
        self.variadic && index + 1 == self.names.len()
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct MacroDefinition {
    pub name: String,

    // `None` for object-like macros.
    pub parameters: Option<MacroParameters>,

    pub replacement: Vec<TokenWithLocation>,

    // The location of the macro name in the `#define` line.
    pub location: Location,
}

impl MacroDefinition {
    pub fn is_function_like(&self) -> bool {
        self.parameters.is_some()
    }

    /// Two definitions are the same if they have the same parameters and
    /// the same replacement tokens with the same whitespace separation.
    pub fn is_same_definition(&self, other: &MacroDefinition) -> bool {
        self.parameters == other.parameters
            && self.replacement.len() == other.replacement.len()
            && self
                .replacement
                .iter()
                .zip(&other.replacement)
                .enumerate()
                .all(|(index, (left, right))| {
                    left.token == right.token
                        && (index == 0 || left.leading_space == right.leading_space)
                })
    }

    /// Renders the definition in `#define` form, e.g. `#define FOO(x) x + 1`.
    pub fn to_directive_string(&self) -> String {
        let mut text = format!("#define {}", self.name);

        if let Some(parameters) = &self.parameters {
            let names = parameters
                .names
                .iter()
                .enumerate()
                .map(|(index, name)| {
                    if parameters.is_variadic_index(index) {
                        if name == "__VA_ARGS__" {
                            "...".to_owned()
                        } else {
                            format!("{}...", name)
                        }
                    } else {
                        name.clone()
                    }
                })
                .collect::<Vec<_>>();
            text.push_str(&format!("({})", names.join(", ")));
        }

        for (index, token_with_location) in self.replacement.iter().enumerate() {
            if index == 0 || token_with_location.leading_space {
                text.push(' ');
            }
            text.push_str(&token_with_location.spelling);
        }

        text
    }
}

/// The macro table of one preprocessing run.
///
/// Predefined macros such as `__LINE__` are not stored here,
/// they are synthesized by the preprocessor on demand.
#[derive(Debug, Default)]
pub struct MacroMap {
    macros: HashMap<String, MacroDefinition>,
}

impl MacroMap {
    pub fn new() -> Self {
        Self {
            macros: HashMap::new(),
        }
    }

    /// Adds or replaces a definition, returns the previous one.
    pub fn define(&mut self, definition: MacroDefinition) -> Option<MacroDefinition> {
        self.macros.insert(definition.name.clone(), definition)
    }

    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.macros.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Removes the definition for the given name, returns it if it was present.
    pub fn remove(&mut self, name: &str) -> Option<MacroDefinition> {
        self.macros.remove(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Definition names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names = self.macros.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }
}
