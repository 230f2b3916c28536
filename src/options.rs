// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use chrono::NaiveDateTime;

use crate::file_provider::FileProvider;

pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 200;
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 256;
pub const DEFAULT_GNUC_VERSION: (u32, u32) = (4, 2);

/// The C standard revision, determines the value of `__STDC_VERSION__`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum StandardVersion {
    C99,
    C11,
    #[default]
    C17,
    C23,
}

impl StandardVersion {
    pub fn stdc_version(&self) -> &'static str {
        match self {
            StandardVersion::C99 => "199901L",
            StandardVersion::C11 => "201112L",
            StandardVersion::C17 => "201710L",
            StandardVersion::C23 => "202311L",
        }
    }
}

/// The per-run configuration of the preprocessor.
///
/// e.g.
///
/// ```rust
/// use rcc::options::{PreprocessorOptions, StandardVersion};
///
/// let options = PreprocessorOptions::new()
///     .with_definition("DEBUG", "1")
///     .with_definition("MAX(a, b)", "((a) > (b) ? (a) : (b))")
///     .with_standard(StandardVersion::C11);
/// ```
pub struct PreprocessorOptions {
    /// Initial macro definitions, in the form of `name -> body text`.
    /// The name may carry a parameter list, e.g. `MAX(a, b)`.
    pub predefinitions: Vec<(String, String)>,

    pub standard: StandardVersion,

    /// Whether `__STDC_HOSTED__` is 1.
    pub hosted: bool,

    /// Defines `__STRICT_ANSI__`.
    pub strict: bool,

    /// The value of `__DATE__` and `__TIME__`, the local time of the run if `None`.
    pub timestamp: Option<NaiveDateTime>,

    /// `__GNUC__` and `__GNUC_MINOR__`.
    pub gnuc_version: (u32, u32),

    pub max_include_depth: usize,

    /// The deepest nesting of brackets, blocks and statements the parser accepts,
    /// also the deepest nesting of macro invocations in macro arguments.
    pub max_nesting_depth: usize,

    /// Resolves and loads `#include` files, every include fails without it.
    pub file_provider: Option<Box<dyn FileProvider>>,
}

impl PreprocessorOptions {
    pub fn new() -> Self {
        Self {
            predefinitions: vec![],
            standard: StandardVersion::default(),
            hosted: true,
            strict: false,
            timestamp: None,
            gnuc_version: DEFAULT_GNUC_VERSION,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            file_provider: None,
        }
    }

    pub fn with_definition(mut self, name: &str, body: &str) -> Self {
        self.predefinitions
            .push((name.to_owned(), body.to_owned()));
        self
    }

    pub fn with_standard(mut self, standard: StandardVersion) -> Self {
        self.standard = standard;
        self
    }

    pub fn with_hosted(mut self, hosted: bool) -> Self {
        self.hosted = hosted;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_gnuc_version(mut self, major: u32, minor: u32) -> Self {
        self.gnuc_version = (major, minor);
        self
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_file_provider(mut self, file_provider: impl FileProvider + 'static) -> Self {
        self.file_provider = Some(Box::new(file_provider));
        self
    }

    /// The `#define` lines of the predefinitions.
    pub(crate) fn predefinition_text(&self) -> String {
        self.predefinitions
            .iter()
            .map(|(name, body)| format!("#define {} {}\n", name, body))
            .collect()
    }
}

impl Default for PreprocessorOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{PreprocessorOptions, StandardVersion};

    #[test]
    fn test_predefinition_text() {
        let options = PreprocessorOptions::new()
            .with_definition("DEBUG", "1")
            .with_definition("SQUARE(x)", "((x) * (x))");

        assert_eq!(
            options.predefinition_text(),
            "#define DEBUG 1\n#define SQUARE(x) ((x) * (x))\n"
        );
        assert_eq!(options.standard.stdc_version(), "201710L");
        assert_eq!(StandardVersion::C23.stdc_version(), "202311L");
    }
}
