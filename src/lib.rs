// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

//! A C front end: lexer, preprocessor and parser.
//!
//! The pipeline is pull based. The [`Parser`] pulls tokens from the
//! [`Preprocessor`], which pulls raw tokens from the lexer of the file
//! on the top of its include stack. Problems are collected as
//! [`Diagnostic`]s instead of aborting, so a single run reports as many
//! of them as possible.
//!
//! ```
//! use std::sync::Arc;
//!
//! use rcc::{PreprocessorOptions, SourceBuffer, parse_source};
//!
//! let source = Arc::new(SourceBuffer::new(
//!     "main.c",
//!     "#define ANSWER 42\nint answer(void) { return ANSWER; }\n",
//! ));
//! let result = parse_source(source, PreprocessorOptions::new());
//!
//! assert!(result.diagnostics.is_empty());
//! assert!(result.translation_unit.find_function("answer").is_some());
//! ```

mod char_with_position;
mod expansion;
mod peekable_iter;

pub mod ast;
pub mod builtin_macros;
pub mod diagnostic;
pub mod diagnostic_printer;
pub mod error;
pub mod expression;
pub mod file_provider;
pub mod lexer;
pub mod location;
pub mod macro_map;
pub mod memory_file_provider;
pub mod native_file_provider;
pub mod options;
pub mod parser;
pub mod position;
pub mod preprocessor;
pub mod range;
pub mod source_buffer;
pub mod text_output;
pub mod token;
pub mod types;

pub use ast::TranslationUnit;
pub use diagnostic::{Diagnostic, DiagnosticSink, Severity};
pub use error::{FileProviderError, ParseError, PreprocessError};
pub use file_provider::FileProvider;
pub use lexer::lex_source;
pub use location::Location;
pub use memory_file_provider::MemoryFileProvider;
pub use native_file_provider::NativeFileProvider;
pub use options::{PreprocessorOptions, StandardVersion};
pub use parser::{ParseResult, Parser, parse_source};
pub use preprocessor::Preprocessor;
pub use source_buffer::{SourceBuffer, SourceMap};
pub use text_output::{PreprocessOutput, preprocess_to_text, strip_comments};
pub use types::Type;
