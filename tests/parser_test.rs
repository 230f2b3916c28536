// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::{fs, path::PathBuf, sync::Arc};

use pretty_assertions::assert_eq;
use rcc::{
    MemoryFileProvider, ParseResult, PreprocessorOptions, SourceBuffer, Type,
    ast::{Declaration, Initializer, Statement},
    parse_source,
};

fn resource_path(relative_path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("resources")
        .join(relative_path)
}

fn parse_with_options(name: &str, src: &str, options: PreprocessorOptions) -> ParseResult {
    parse_source(Arc::new(SourceBuffer::new(name, src)), options)
}

fn parse(src: &str) -> ParseResult {
    parse_with_options("main.c", src, PreprocessorOptions::new())
}

fn parse_resource(relative_path: &str, options: PreprocessorOptions) -> ParseResult {
    let src = fs::read_to_string(resource_path(relative_path)).unwrap();
    let result = parse_with_options(relative_path, &src, options);
    assert!(
        result.diagnostics.is_empty(),
        "{}",
        result.diagnostics.render(&result.source_map, false)
    );
    result
}

fn names(result: &ParseResult) -> Vec<String> {
    result
        .translation_unit
        .declarations
        .iter()
        .filter_map(|declaration| declaration.name().map(str::to_owned))
        .collect()
}

fn messages(result: &ParseResult) -> Vec<String> {
    result
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.message.clone())
        .collect()
}

#[test]
fn test_parse_ok_resources() {
    for (relative_path, expected_names) in [
        ("parse/ok/easy/bitwise_operations_and_shifts.c", vec!["main"]),
        (
            "parse/ok/medium/advanced_function_decl.c",
            vec!["function_pointer", "add", "subtract", "main"],
        ),
        (
            "parse/ok/medium/function_pointers.c",
            vec!["add", "subtract", "calculate", "main"],
        ),
        ("parse/ok/medium/pointer_and_struct.c", vec!["Point", "move"]),
        ("parse/ok/medium/recursive.c", vec!["factorial"]),
        (
            "parse/ok/medium/type_alias_and_typedef.c",
            vec!["ArithmeticOperation", "get_operation", "add", "subtract"],
        ),
        (
            "translation_unit.c",
            vec!["factorial", "fibonacci", "Point", "Day", "main"],
        ),
    ] {
        let result = parse_resource(relative_path, PreprocessorOptions::new());
        assert_eq!(names(&result), expected_names, "{}", relative_path);
    }
}

#[test]
fn test_parse_with_system_header() {
    let mut provider = MemoryFileProvider::new(&[], &["/usr/include"]);
    provider.add_system_file(
        "stdio.h",
        "#pragma once\nint printf(const char *restrict format, ...);\n",
    );

    let result = parse_resource(
        "parse/b.c",
        PreprocessorOptions::new().with_file_provider(provider),
    );
    assert_eq!(names(&result), vec!["printf", "main"]);

    let unit = &result.translation_unit;
    let Some(Declaration::Function(printf)) = unit.declarations.first() else {
        panic!("expected the declaration of printf");
    };
    assert_eq!(
        printf.function_type.to_string(),
        "int (const char *restrict, ...)"
    );

    // the expansion of `SWAP(a, b, double)` is a do/while statement
    let main = unit.find_function("main").unwrap();
    let Statement::Compound(statements, _) = &main.body else {
        panic!("expected a compound statement");
    };
    let loops = statements
        .iter()
        .filter(|statement| matches!(statement, Statement::DoWhile { .. }))
        .count();
    assert_eq!(loops, 2);
}

#[test]
fn test_function_pointer_type() {
    let result = parse(
        "\
int add(int a, int b) { return a + b; }
int (*fp)(int, int) = add;
",
    );
    assert!(result.diagnostics.is_empty());

    let unit = &result.translation_unit;
    let add = unit.find_function("add").unwrap();
    let fp = unit.find_variable("fp").unwrap();

    assert_eq!(fp.variable_type, add.function_type.decay());
    assert_eq!(fp.variable_type.to_string(), "int (*)(int, int)");
    assert!(matches!(fp.variable_type, Type::Pointer(_)));
}

#[test]
fn test_designated_initializer() {
    let result = parse("int arr[5] = { [2] = 42, [0] = 10, [4] = 99 };\n");
    assert!(result.diagnostics.is_empty());

    let arr = result.translation_unit.find_variable("arr").unwrap();
    assert_eq!(arr.variable_type.to_string(), "int[5]");

    let Some(initializer @ Initializer::List(..)) = &arr.initializer else {
        panic!("expected an initializer list");
    };
    let values = initializer
        .array_elements(5)
        .into_iter()
        .map(|element| match element {
            Some(Initializer::Expression(expression)) => expression.constant_value(),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(values, vec![Some(10), None, Some(42), None, Some(99)]);
}

#[test]
fn test_recover_from_garbage_in_function_body() {
    let result = parse(
        "\
int foo(int x) {
    return x;
}

int baz(int x) {
    foo bar baz
}

int qux(int x) {
    return x;
}
",
    );

    assert!(result.diagnostics.has_errors());
    assert_eq!(names(&result), vec!["foo", "baz", "qux"]);
}

#[test]
fn test_implicit_int_and_missing_parameter_type() {
    let result = parse(
        "\
main(int argc, char **argv) { return 0; }
int qux(x) { return x; }
",
    );

    assert_eq!(
        messages(&result),
        vec![
            "type specifier missing, defaults to 'int'; ISO C99 and later do not support implicit int",
            "missing type for function parameter 'x' in function 'qux'",
        ]
    );
    assert_eq!(names(&result), vec!["main", "qux"]);
}

#[test]
fn test_macro_expanded_into_declarations() {
    let result = parse(
        "\
#define DECLARE(type, name) type name##_value; type *name##_pointer
DECLARE(long, count);
#define STRINGIFY(x) #x
const char *name = STRINGIFY(count);
",
    );
    assert!(result.diagnostics.is_empty());
    assert_eq!(
        names(&result),
        vec!["count_value", "count_pointer", "name"]
    );

    let pointer = result
        .translation_unit
        .find_variable("count_pointer")
        .unwrap();
    assert_eq!(pointer.variable_type.to_string(), "long *");
}

#[test]
fn test_diagnostics_render() {
    let result = parse("int a = ;\n");
    let rendered = result.diagnostics.render(&result.source_map, false);

    assert!(rendered.contains("main.c:1:9"));
    assert!(rendered.contains("expected one of: 'expression'"));
}

#[test]
fn test_deep_nesting_is_reported() {
    // nesting up to the default limit needs more than the stack of a test thread
    let handle = std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(|| {
            let parentheses = format!("int a = {}1{};\nint b;\n", "(".repeat(300), ")".repeat(300));
            let macros = format!(
                "#define P(x) x\nint c = {}1{};\nint d;\n",
                "P(".repeat(300),
                ")".repeat(300)
            );
            (parse(&parentheses), parse(&macros))
        })
        .unwrap();

    let (parentheses, macros) = handle.join().unwrap();

    assert_eq!(
        messages(&parentheses),
        vec!["bracket nesting level exceeded maximum of 256"]
    );
    assert_eq!(names(&parentheses), vec!["b"]);

    assert_eq!(
        messages(&macros)[0],
        "macro argument nesting level exceeded maximum of 256"
    );
    assert_eq!(names(&macros).last().map(String::as_str), Some("d"));
}
