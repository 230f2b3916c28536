// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{
    expansion::PendingToken,
    preprocessor::{Preprocessor, number_token},
    token::{StringEncoding, Token, TokenWithLocation, escape_string},
};

/// Macros whose value is computed by the preprocessor.
///
/// see:
/// - https://gcc.gnu.org/onlinedocs/cpp/Standard-Predefined-Macros.html
/// - https://gcc.gnu.org/onlinedocs/cpp/Common-Predefined-Macros.html
pub const BUILTIN_MACRO_NAMES: [&str; 13] = [
    "__FILE__",
    "__LINE__",
    "__DATE__",
    "__TIME__",
    "__STDC__",
    "__STDC_VERSION__",
    "__STDC_HOSTED__",
    "__BASE_FILE__",
    "__INCLUDE_LEVEL__",
    "__COUNTER__",
    "__GNUC__",
    "__GNUC_MINOR__",
    "__STRICT_ANSI__",
];

impl Preprocessor {
    /// Whether the name is a builtin macro that has not been `#undef`ed.
    pub(crate) fn is_builtin_macro(&self, name: &str) -> bool {
        BUILTIN_MACRO_NAMES.contains(&name)
            && !self.undefined_builtins.contains(name)
            && (name != "__STRICT_ANSI__" || self.options.strict)
    }

    /// Replaces a builtin macro name with its value,
    /// the result keeps the location and the leading space of the name.
    pub(crate) fn expand_builtin_macro(&mut self, name: &str, token: PendingToken) -> PendingToken {
        let location = token.location();

        let value = match name {
            "__FILE__" => BuiltinValue::String(self.source_map.file_name(location.file_number).to_owned()),
            "__BASE_FILE__" => BuiltinValue::String(self.base_file_name.clone()),
            "__LINE__" => BuiltinValue::Number((location.start().line + 1).to_string()),
            "__DATE__" => BuiltinValue::String(self.timestamp.format("%b %e %Y").to_string()),
            "__TIME__" => BuiltinValue::String(self.timestamp.format("%H:%M:%S").to_string()),
            "__STDC__" | "__STRICT_ANSI__" => BuiltinValue::Number("1".to_owned()),
            "__STDC_VERSION__" => {
                BuiltinValue::Number(self.options.standard.stdc_version().to_owned())
            }
            "__STDC_HOSTED__" => {
                BuiltinValue::Number(if self.options.hosted { "1" } else { "0" }.to_owned())
            }
            "__INCLUDE_LEVEL__" => {
                BuiltinValue::Number((self.include_level().saturating_sub(1)).to_string())
            }
            "__COUNTER__" => {
                let value = self.counter;
                self.counter += 1;
                BuiltinValue::Number(value.to_string())
            }
            "__GNUC__" => BuiltinValue::Number(self.options.gnuc_version.0.to_string()),
            "__GNUC_MINOR__" => BuiltinValue::Number(self.options.gnuc_version.1.to_string()),
            _ => return token,
        };

        let mut token_with_location = match value {
            BuiltinValue::Number(text) => number_token(&text, location),
            BuiltinValue::String(text) => {
                let spelling = format!("\"{}\"", escape_string(&text));
                TokenWithLocation::new(
                    Token::String(text, StringEncoding::Default),
                    location,
                    &spelling,
                )
            }
        };

        token_with_location.leading_space = token.token_with_location.leading_space;
        token_with_location.expanded = true;

        PendingToken {
            token_with_location,
            hide_set: token.hide_set,
        }
    }
}

enum BuiltinValue {
    Number(String),
    String(String),
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use crate::{
        memory_file_provider::MemoryFileProvider,
        options::{PreprocessorOptions, StandardVersion},
        preprocessor::Preprocessor,
        source_buffer::SourceBuffer,
        token::Token,
    };

    fn expand_with_options(src: &str, options: PreprocessorOptions) -> Vec<String> {
        let mut preprocessor =
            Preprocessor::new(Arc::new(SourceBuffer::new("main.c", src)), options);
        let spellings = preprocessor
            .by_ref()
            .filter(|t| t.token != Token::EndOfInput)
            .map(|t| t.spelling)
            .collect();
        assert!(!preprocessor.diagnostics().has_errors());
        spellings
    }

    fn fixed_time_options() -> PreprocessorOptions {
        let timestamp = NaiveDate::from_ymd_opt(2025, 3, 7)
            .and_then(|date| date.and_hms_opt(9, 5, 2))
            .unwrap();
        PreprocessorOptions::new().with_timestamp(timestamp)
    }

    #[test]
    fn test_file_line_date_time() {
        let src = "__FILE__ __LINE__\n\n__LINE__ __DATE__ __TIME__\n";
        assert_eq!(
            expand_with_options(src, fixed_time_options()),
            vec!["\"main.c\"", "1", "3", "\"Mar  7 2025\"", "\"09:05:02\""]
        );
    }

    #[test]
    fn test_standard_macros() {
        let src = "__STDC__ __STDC_VERSION__ __STDC_HOSTED__ __GNUC__ __GNUC_MINOR__\n";
        assert_eq!(
            expand_with_options(src, PreprocessorOptions::new()),
            vec!["1", "201710L", "1", "4", "2"]
        );

        let options = PreprocessorOptions::new()
            .with_standard(StandardVersion::C99)
            .with_hosted(false)
            .with_gnuc_version(13, 1);
        assert_eq!(
            expand_with_options(src, options),
            vec!["1", "199901L", "0", "13", "1"]
        );
    }

    #[test]
    fn test_strict_ansi() {
        let src = "#ifdef __STRICT_ANSI__\nstrict\n#endif\n";
        assert_eq!(
            expand_with_options(src, PreprocessorOptions::new()),
            Vec::<String>::new()
        );
        assert_eq!(
            expand_with_options(src, PreprocessorOptions::new().with_strict(true)),
            vec!["strict"]
        );
    }

    #[test]
    fn test_counter_and_include_level() {
        let mut provider = MemoryFileProvider::default();
        provider.add_file("/include/level.h", "__INCLUDE_LEVEL__ __FILE__\n");

        let src = "__COUNTER__ __COUNTER__ __INCLUDE_LEVEL__\n#include \"level.h\"\n__COUNTER__\n";
        let options = PreprocessorOptions::new().with_file_provider(provider);
        assert_eq!(
            expand_with_options(src, options),
            vec!["0", "1", "0", "1", "\"/include/level.h\"", "2"]
        );
    }

    #[test]
    fn test_builtin_in_macro_uses_invocation_line() {
        let src = "#define HERE __LINE__\n\nint x = HERE;\n";
        assert_eq!(
            expand_with_options(src, PreprocessorOptions::new()),
            vec!["int", "x", "=", "3", ";"]
        );
    }

    #[test]
    fn test_undef_builtin() {
        let src = "#undef __FILE__\n__FILE__\n#ifdef __LINE__\nline\n#endif\n";
        let mut preprocessor = Preprocessor::new(
            Arc::new(SourceBuffer::new("main.c", src)),
            PreprocessorOptions::new(),
        );
        let spellings = preprocessor
            .by_ref()
            .filter(|t| t.token != Token::EndOfInput)
            .map(|t| t.spelling)
            .collect::<Vec<_>>();
        assert_eq!(spellings, vec!["__FILE__", "line"]);

        let messages = preprocessor
            .diagnostics()
            .iter()
            .map(|d| d.message.clone())
            .collect::<Vec<_>>();
        assert_eq!(messages, vec!["undefining builtin macro"]);
    }
}
