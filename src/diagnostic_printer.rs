// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{
    diagnostic::{Diagnostic, Severity},
    location::Location,
    source_buffer::SourceMap,
};

// Renders in the clang style:
//
// ```diagram
// file.c:3:5: error: message [-Wflag]   <-- title line
//     foo bar baz                       <-- source line
//         ^                             <-- indication line
//         int                           <-- fix-it line, optional
// ```
//
// Lines and columns are 0-based internally and rendered 1-based.
pub fn print_diagnostic(source_map: &SourceMap, diagnostic: &Diagnostic, with_source: bool) -> String {
    let mut output = String::new();

    let title = match &diagnostic.code {
        Some(code) => format!("{} [{}]", diagnostic.message, code),
        None => diagnostic.message.clone(),
    };

    print_paragraph(
        &mut output,
        source_map,
        diagnostic.severity,
        &title,
        &diagnostic.location,
        with_source,
    );

    if let Some(fix_it) = diagnostic.fix_it.as_deref().filter(|_| with_source) {
        print_fix_it(&mut output, source_map, fix_it, &diagnostic.location);
    }

    for note in &diagnostic.notes {
        print_paragraph(
            &mut output,
            source_map,
            Severity::Note,
            &note.message,
            &note.location,
            with_source,
        );
    }

    output
}

fn print_paragraph(
    output: &mut String,
    source_map: &SourceMap,
    severity: Severity,
    message: &str,
    location: &Location,
    with_source: bool,
) {
    let position = location.start();

    output.push_str(&format!(
        "{}:{}:{}: {}: {}\n",
        source_map.file_name(location.file_number),
        position.line + 1,
        position.column + 1,
        severity,
        message
    ));

    if !with_source {
        return;
    }

    let line_text = source_map
        .get(location.file_number)
        .and_then(|buffer| buffer.line_text(position.line));

    if let Some(line_text) = line_text {
        let (snippet, indication) = generate_snippet_and_indication(line_text, position.column);
        output.push_str(&snippet);
        output.push('\n');
        output.push_str(&indication);
        output.push('\n');
    }
}

// The insertion text starts at the caret column.
fn print_fix_it(output: &mut String, source_map: &SourceMap, fix_it: &str, location: &Location) {
    let position = location.start();
    let Some(line_text) = source_map
        .get(location.file_number)
        .and_then(|buffer| buffer.line_text(position.line))
    else {
        return;
    };

    let (_, indication) = generate_snippet_and_indication(line_text, position.column);
    let padding = indication.trim_end_matches('^');
    output.push_str(padding);
    output.push_str(fix_it.trim_end());
    output.push('\n');
}

/// Builds the source line and the caret line.
///
/// Tabs before the column are copied into the caret line so that the caret
/// lines up with the source when both are printed to a terminal.
fn generate_snippet_and_indication(line_text: &str, column: usize) -> (String, String) {
    let mut indication = line_text
        .chars()
        .take(column)
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect::<String>();

    // the column may point past the end of the line, e.g. at the end of input.
    let line_length = line_text.chars().count();
    if column > line_length {
        indication.push_str(&" ".repeat(column - line_length));
    }

    indication.push('^');

    (line_text.to_owned(), indication)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::{
        diagnostic::Diagnostic,
        location::Location,
        position::Position,
        range::Range,
        source_buffer::{SourceBuffer, SourceMap},
    };

    use super::print_diagnostic;

    fn location(line: usize, column: usize, offset: usize) -> Location {
        let position = Position::new(offset, line, column);
        Location::new(0, &Range::from_single_position(&position))
    }

    #[test]
    fn test_print_diagnostic() {
        let mut source_map = SourceMap::new();
        source_map.add(Arc::new(SourceBuffer::new(
            "testdata/parse/b.c",
            "int x;\nmain(int argc, char **argv)\n{\n\tfoo bar;\n}",
        )));

        let implicit_int = Diagnostic::error(
            "type specifier missing, defaults to 'int'; ISO C99 and later do not support implicit int",
            location(1, 0, 7),
        )
        .with_code("-Wimplicit-int")
        .with_fix_it("int ");

        assert_eq!(
            print_diagnostic(&source_map, &implicit_int, true),
            "\
testdata/parse/b.c:2:1: error: type specifier missing, defaults to 'int'; ISO C99 and later do not support implicit int [-Wimplicit-int]
main(int argc, char **argv)
^
int
"
        );

        // the fix-it is part of the source excerpt
        assert_eq!(
            print_diagnostic(&source_map, &implicit_int, false),
            "testdata/parse/b.c:2:1: error: type specifier missing, defaults to 'int'; ISO C99 and later do not support implicit int [-Wimplicit-int]\n"
        );

        let indented = Diagnostic::error("missing type", location(3, 5, 42)).with_fix_it("int ");
        assert_eq!(
            print_diagnostic(&source_map, &indented, true),
            "\
testdata/parse/b.c:4:6: error: missing type
\tfoo bar;
\t    ^
\t    int
"
        );

        let unexpected = Diagnostic::error(
            "unexpected token 'bar', expected one of: ';'",
            location(3, 5, 42),
        );

        assert_eq!(
            print_diagnostic(&source_map, &unexpected, true),
            "\
testdata/parse/b.c:4:6: error: unexpected token 'bar', expected one of: ';'
\tfoo bar;
\t    ^
"
        );

        assert_eq!(
            print_diagnostic(&source_map, &unexpected, false),
            "testdata/parse/b.c:4:6: error: unexpected token 'bar', expected one of: ';'\n"
        );
    }

    #[test]
    fn test_print_diagnostic_with_note() {
        let mut source_map = SourceMap::new();
        source_map.add(Arc::new(SourceBuffer::new(
            "m.c",
            "#define A 1\n#define A 2",
        )));

        let redefined = Diagnostic::warning("'A' macro redefined", location(1, 8, 20))
            .with_code("-Wmacro-redefined")
            .with_note("previous definition is here", location(0, 8, 8));

        assert_eq!(
            print_diagnostic(&source_map, &redefined, true),
            "\
m.c:2:9: warning: 'A' macro redefined [-Wmacro-redefined]
#define A 2
        ^
m.c:1:9: note: previous definition is here
#define A 1
        ^
"
        );
    }
}
