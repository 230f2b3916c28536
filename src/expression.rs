// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

//! The integer constant expressions of `#if` and `#elif`.

mod ast;
mod evaluator;
mod parser;

use crate::{error::PreprocessError, location::Location, token::TokenWithLocation};

pub use ast::Value;

/// Parses and evaluates the macro-expanded tokens of a condition.
pub fn evaluate_tokens(
    token_with_locations: Vec<TokenWithLocation>,
    end_location: Location,
) -> Result<Value, PreprocessError> {
    let expression = parser::parse_from_tokens(token_with_locations, end_location)?;
    evaluator::evaluate_expression(&expression)
}
