// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt::Display;

use crate::location::Location;

/// Represents a token of C source text.
///
/// `DirectiveStart`, `DirectiveEnd` and `HeaderName` only appear between the
/// lexer and the preprocessor, they are not present in the preprocessed token stream.
///
/// See:
/// - https://gcc.gnu.org/onlinedocs/cpp/Tokenization.html
/// - https://en.cppreference.com/w/c/language/translation_phases.html#Phase_3
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    // Any sequence of letters (including non-Latin letters), digits and underscores,
    // starting with a letter or underscore, that is not a keyword.
    // Identifiers are normalized to Unicode NFC.
    Identifier(String),

    Keyword(Keyword),

    // Integer and floating-point constants.
    // See: https://en.cppreference.com/w/c/language/floating_constant
    Number(Number),

    // A string literal, the value is the content after escape sequences are processed.
    //
    // See: https://en.cppreference.com/w/c/language/string_literal.html
    String(String, StringEncoding),

    // A character constant, e.g., 'a', '\t', '文', '文'.
    //
    // See:
    // - https://en.wikipedia.org/wiki/Escape_sequences_in_C
    // - https://en.cppreference.com/w/c/language/character_constant.html
    Char(char, CharEncoding),

    Punctuator(Punctuator),

    // The file path of `#include <...>` and `#include "..."`.
    //
    // Although the file path looks like a string, it is not a string literal
    // because it does not support escape sequences.
    HeaderName(String, /* angle_bracket */ bool),

    // A character that can not start any token, e.g. '@', '$' or an emoji.
    // The lexer reports it and the parser skips it.
    Unknown(char),

    // Pound sign (`#`) at the beginning of a line indicates a preprocessing directive.
    DirectiveStart,

    // The line break that ends a directive line.
    // The null directive (`#` followed by a line break) is allowed and has no effect.
    DirectiveEnd,

    EndOfInput,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Punctuator {
    // Arithmetic Operators
    // --------------------
    Add,      // '+'
    Subtract, // '-'
    Multiply, // '*', also is operator `Dereference`
    Divide,   // '/'
    Modulo,   // '%'
    Increase, // '++'
    Decrease, // '--'

    // Relational Operators
    // --------------------
    Equal,              // '=='
    NotEqual,           // '!='
    GreaterThan,        // '>'
    LessThan,           // '<'
    GreaterThanOrEqual, // '>='
    LessThanOrEqual,    // '<='

    // Logical Operators
    // --------------------
    And, // '&&'
    Or,  // '||'
    Not, // '!'

    // Bitwise Operators
    // --------------------
    BitwiseAnd, // '&', also is operator `AddressOf`
    BitwiseOr,  // '|'
    BitwiseXor, // '^'
    BitwiseNot, // '~'
    ShiftLeft,  // '<<'
    ShiftRight, // '>>'

    // Assignment Operators
    // --------------------
    Assign,           // '='
    AddAssign,        // '+='
    SubtractAssign,   // '-='
    MultiplyAssign,   // '*='
    DivideAssign,     // '/='
    ModulusAssign,    // '%='
    BitwiseAndAssign, // '&='
    BitwiseOrAssign,  // '|='
    BitwiseXorAssign, // '^='
    ShiftLeftAssign,  // '<<='
    ShiftRightAssign, // '>>='

    // Conditional Operator
    // --------------------
    QuestionMark, // '?'

    // Miscellaneous Operators
    // --------------------
    Comma, // ','
    Dot,   // '.', member access operator
    Arrow, // '->', pointer member access operator

    // Brackets and Delimiters
    // --------------------
    BraceOpen,        // '{'
    BraceClose,       // '}'
    BracketOpen,      // '['
    BracketClose,     // ']'
    ParenthesisOpen,  // '('
    ParenthesisClose, // ')'
    Semicolon,        // ';'
    Colon,            // ':'
    Ellipsis,         // '...', variadic parameters

    // Preprocessing Operators
    // --------------------
    Pound,      // '#', stringizing
    PoundPound, // '##', token concatenation
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CharEncoding {
    Default, // e.g., 'a', '1', note that the data type is `int` instead of `char`.
    Wide,    // e.g., L'a', data type is `wchar_t`
    UTF16,   // e.g., u'a', data type is `char16_t`
    UTF32,   // e.g., U'a', data type is `char32_t`
    UTF8,    // e.g., u8'a', data type is `char8_t`
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StringEncoding {
    Default, // e.g., "hello", data type is `char[]`
    Wide,    // e.g., L"hello", data type is `wchar_t[]`
    UTF16,   // e.g., u"hello", data type is `char16_t[]`
    UTF32,   // e.g., U"hello", data type is `char32_t[]`
    UTF8,    // e.g., u8"hello", data type is `char8_t[]`
}

#[derive(Debug, PartialEq, Clone)]
pub enum Number {
    Integer(IntegerNumber),
    FloatingPoint(FloatingPointNumber),
}

#[derive(Debug, PartialEq, Clone)]
pub struct IntegerNumber {
    // The digits with the radix prefix (e.g. `0x1A`, `017`, `0b101`, `42`),
    // digit separators and suffix removed.
    pub value: String,

    // Suffix `u` or `U`, e.g., `123u`, `0x1AUL`.
    pub unsigned: bool,

    pub length: IntegerNumberLength,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum IntegerNumberLength {
    Default,  // no suffix, the type is the first type in which the value can fit.
    Long,     // suffix "l", "L"
    LongLong, // suffix "ll", "LL"
    BitInt,   // suffix "wb", "WB"
}

#[derive(Debug, PartialEq, Clone)]
pub struct FloatingPointNumber {
    // The number without suffix, e.g. `1.5e3`, `0x1.8p1`.
    pub value: String,
    pub length: FloatingPointNumberLength,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FloatingPointNumberLength {
    Default,    // no suffix, the type is `double`.
    Float,      // suffix "f", "F"
    LongDouble, // suffix "l", "L"
}

impl IntegerNumber {
    pub fn new(value: String, unsigned: bool, length: IntegerNumberLength) -> Self {
        Self {
            value,
            unsigned,
            length,
        }
    }

    /// Parses the value, returns `None` if it does not fit in 64 bits.
    pub fn as_u64(&self) -> Option<u64> {
        let (src, radix) = if let Some(hex) = self.value.strip_prefix("0x") {
            (hex, 16)
        } else if let Some(binary) = self.value.strip_prefix("0b") {
            (binary, 2)
        } else if self.value.starts_with('0') && self.value.len() > 1 {
            (&self.value[1..], 8)
        } else {
            (&self.value[..], 10)
        };

        u64::from_str_radix(src, radix).ok()
    }
}

impl FloatingPointNumber {
    pub fn new(value: String, length: FloatingPointNumberLength) -> Self {
        Self { value, length }
    }

    /// Best-effort value, hexadecimal floating constants included.
    pub fn as_f64(&self) -> Option<f64> {
        match self.value.strip_prefix("0x") {
            Some(hex) => parse_hex_float(hex),
            None => self.value.parse::<f64>().ok(),
        }
    }
}

// Parses the part after `0x` of a hexadecimal floating constant, e.g. `1.8p1`.
fn parse_hex_float(hex: &str) -> Option<f64> {
    let (mantissa, exponent) = match hex.split_once('p') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().ok()?),
        None => (hex, 0),
    };

    let (integer_part, fraction_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let mut value = 0f64;
    for c in integer_part.chars() {
        value = value * 16.0 + c.to_digit(16)? as f64;
    }

    let mut scale = 1.0 / 16.0;
    for c in fraction_part.chars() {
        value += c.to_digit(16)? as f64 * scale;
        scale /= 16.0;
    }

    Some(value * 2f64.powi(exponent))
}

impl Token {
    /// Returns the name of an identifier or a keyword.
    ///
    /// The preprocessor does not distinguish keywords from identifiers,
    /// e.g. `#if` and `#else` are directive names, and a keyword can be a macro name.
    pub fn name(&self) -> Option<&str> {
        match self {
            Token::Identifier(name) => Some(name),
            Token::Keyword(keyword) => Some(keyword.as_str()),
            _ => None,
        }
    }

    pub fn is_punctuator(&self, punctuator: Punctuator) -> bool {
        matches!(self, Token::Punctuator(p) if *p == punctuator)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, Token::Keyword(k) if *k == keyword)
    }

    pub fn is_identifier(&self, name: &str) -> bool {
        matches!(self, Token::Identifier(id) if id == name)
    }
}

/// A token together with its location and spelling.
///
/// Tokens produced by macro expansion keep the location of the macro invocation
/// and have `expanded` set.
#[derive(Debug, PartialEq, Clone)]
pub struct TokenWithLocation {
    pub token: Token,
    pub location: Location,

    // The text of the token as written in the source (line continuations removed).
    pub spelling: String,

    // Whether whitespace (or a comment) precedes the token on its line.
    pub leading_space: bool,

    pub expanded: bool,
}

impl TokenWithLocation {
    pub fn new(token: Token, location: Location, spelling: &str) -> Self {
        Self {
            token,
            location,
            spelling: spelling.to_owned(),
            leading_space: false,
            expanded: false,
        }
    }

    /// Creates a token whose spelling is the canonical C spelling of `token`.
    pub fn synthesized(token: Token, location: Location) -> Self {
        let spelling = token.to_string();
        Self::new(token, location, &spelling)
    }

    pub fn with_leading_space(mut self, leading_space: bool) -> Self {
        self.leading_space = leading_space;
        self
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Identifier(s) => write!(f, "{}", s),
            Token::Keyword(k) => write!(f, "{}", k),
            Token::Number(n) => write!(f, "{}", n),
            Token::String(s, t) => {
                let quote = match t {
                    StringEncoding::Default => "\"",
                    StringEncoding::Wide => "L\"",
                    StringEncoding::UTF16 => "u\"",
                    StringEncoding::UTF32 => "U\"",
                    StringEncoding::UTF8 => "u8\"",
                };

                write!(f, "{}{}\"", quote, escape_string(s))
            }
            Token::Char(c, t) => {
                let prefix = match t {
                    CharEncoding::Default => "'",
                    CharEncoding::Wide => "L'",
                    CharEncoding::UTF16 => "u'",
                    CharEncoding::UTF32 => "U'",
                    CharEncoding::UTF8 => "u8'",
                };

                write!(f, "{}{}'", prefix, escape_char(*c))
            }
            Token::Punctuator(p) => write!(f, "{}", p),
            Token::HeaderName(path, true) => write!(f, "<{}>", path),
            Token::HeaderName(path, false) => write!(f, "\"{}\"", path),
            Token::Unknown(c) => write!(f, "{}", c),
            Token::DirectiveStart => write!(f, "#"),
            Token::DirectiveEnd => writeln!(f),
            Token::EndOfInput => Ok(()),
        }
    }
}

pub fn escape_char(c: char) -> String {
    match c {
        '\\' => "\\\\".to_string(),
        '"' => "\\\"".to_string(),
        '\'' => "\\'".to_string(),
        '\0' => "\\0".to_string(),
        '\t' => "\\t".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\x00'..='\x1f' | '\x7f' => {
            // control characters use hexadecimal escape
            format!("\\x{:02x}", c as u8)
        }
        _ => c.to_string(),
    }
}

pub fn escape_string(s: &str) -> String {
    s.chars().map(escape_char).collect()
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Integer(n) => write!(f, "{}", n),
            Number::FloatingPoint(n) => write!(f, "{}", n),
        }
    }
}

impl Display for IntegerNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let length_suffix = match self.length {
            IntegerNumberLength::Default => "",
            IntegerNumberLength::Long => "l",
            IntegerNumberLength::LongLong => "ll",
            IntegerNumberLength::BitInt => "wb",
        };
        let unsigned_suffix = if self.unsigned { "u" } else { "" };
        write!(f, "{}{}{}", self.value, unsigned_suffix, length_suffix)
    }
}

impl Display for FloatingPointNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let suffix = match self.length {
            FloatingPointNumberLength::Default => "",
            FloatingPointNumberLength::Float => "f",
            FloatingPointNumberLength::LongDouble => "l",
        };
        write!(f, "{}{}", self.value, suffix)
    }
}

impl Display for Punctuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Punctuator::Add => "+",
            Punctuator::Subtract => "-",
            Punctuator::Multiply => "*",
            Punctuator::Divide => "/",
            Punctuator::Modulo => "%",
            Punctuator::Increase => "++",
            Punctuator::Decrease => "--",

            Punctuator::Equal => "==",
            Punctuator::NotEqual => "!=",
            Punctuator::GreaterThan => ">",
            Punctuator::LessThan => "<",
            Punctuator::GreaterThanOrEqual => ">=",
            Punctuator::LessThanOrEqual => "<=",

            Punctuator::And => "&&",
            Punctuator::Or => "||",
            Punctuator::Not => "!",

            Punctuator::BitwiseAnd => "&",
            Punctuator::BitwiseOr => "|",
            Punctuator::BitwiseXor => "^",
            Punctuator::BitwiseNot => "~",
            Punctuator::ShiftLeft => "<<",
            Punctuator::ShiftRight => ">>",

            Punctuator::Assign => "=",
            Punctuator::AddAssign => "+=",
            Punctuator::SubtractAssign => "-=",
            Punctuator::MultiplyAssign => "*=",
            Punctuator::DivideAssign => "/=",
            Punctuator::ModulusAssign => "%=",
            Punctuator::BitwiseAndAssign => "&=",
            Punctuator::BitwiseOrAssign => "|=",
            Punctuator::BitwiseXorAssign => "^=",
            Punctuator::ShiftLeftAssign => "<<=",
            Punctuator::ShiftRightAssign => ">>=",

            Punctuator::QuestionMark => "?",

            Punctuator::Comma => ",",
            Punctuator::Dot => ".",
            Punctuator::Arrow => "->",

            Punctuator::BraceOpen => "{",
            Punctuator::BraceClose => "}",
            Punctuator::BracketOpen => "[",
            Punctuator::BracketClose => "]",
            Punctuator::ParenthesisOpen => "(",
            Punctuator::ParenthesisClose => ")",
            Punctuator::Semicolon => ";",
            Punctuator::Colon => ":",
            Punctuator::Ellipsis => "...",

            Punctuator::Pound => "#",
            Punctuator::PoundPound => "##",
        };
        write!(f, "{}", symbol)
    }
}

macro_rules! keywords {
    ($($variant:ident => $text:literal,)*) => {
        /// C11 keywords plus the C23 additions.
        ///
        /// Reference: https://en.cppreference.com/w/c/keyword.html
        #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
        pub enum Keyword {
            $($variant,)*
        }

        impl Keyword {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Keyword::$variant => $text,)*
                }
            }

            pub fn from_name(name: &str) -> Option<Keyword> {
                match name {
                    $($text => Some(Keyword::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

keywords! {
    Alignas => "alignas",
    Alignof => "alignof",
    Auto => "auto",
    Bool => "bool",
    Break => "break",
    Case => "case",
    Char => "char",
    Const => "const",
    Constexpr => "constexpr",
    Continue => "continue",
    Default => "default",
    Do => "do",
    Double => "double",
    Else => "else",
    Enum => "enum",
    Extern => "extern",
    False => "false",
    Float => "float",
    For => "for",
    Goto => "goto",
    If => "if",
    Inline => "inline",
    Int => "int",
    Long => "long",
    Nullptr => "nullptr",
    Register => "register",
    Restrict => "restrict",
    Return => "return",
    Short => "short",
    Signed => "signed",
    Sizeof => "sizeof",
    Static => "static",
    StaticAssert => "static_assert",
    Struct => "struct",
    Switch => "switch",
    ThreadLocal => "thread_local",
    True => "true",
    Typedef => "typedef",
    Typeof => "typeof",
    TypeofUnqual => "typeof_unqual",
    Union => "union",
    Unsigned => "unsigned",
    Void => "void",
    Volatile => "volatile",
    While => "while",
    UnderscoreAlignas => "_Alignas",
    UnderscoreAlignof => "_Alignof",
    UnderscoreAtomic => "_Atomic",
    UnderscoreBitInt => "_BitInt",
    UnderscoreBool => "_Bool",
    UnderscoreComplex => "_Complex",
    UnderscoreGeneric => "_Generic",
    UnderscoreImaginary => "_Imaginary",
    UnderscoreNoreturn => "_Noreturn",
    UnderscoreStaticAssert => "_Static_assert",
    UnderscoreThreadLocal => "_Thread_local",
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::token::{
        CharEncoding, FloatingPointNumber, FloatingPointNumberLength, IntegerNumber,
        IntegerNumberLength, Keyword, StringEncoding, Token,
    };

    #[test]
    fn test_char_display() {
        assert_eq!(Token::Char('a', CharEncoding::Default).to_string(), "'a'");
        assert_eq!(Token::Char('文', CharEncoding::Wide).to_string(), "L'文'");
        assert_eq!(Token::Char('文', CharEncoding::UTF8).to_string(), "u8'文'");
        assert_eq!(Token::Char('\t', CharEncoding::Default).to_string(), "'\\t'");
        assert_eq!(Token::Char('\'', CharEncoding::Default).to_string(), "'\\''");
        assert_eq!(Token::Char('\x01', CharEncoding::Default).to_string(), "'\\x01'");
    }

    #[test]
    fn test_string_display() {
        assert_eq!(
            Token::String("hello".to_string(), StringEncoding::Default).to_string(),
            "\"hello\""
        );
        assert_eq!(
            Token::String("文✨".to_string(), StringEncoding::UTF16).to_string(),
            "u\"文✨\""
        );
        assert_eq!(
            Token::String("a\t\n\\\"b".to_string(), StringEncoding::Default).to_string(),
            "\"a\\t\\n\\\\\\\"b\""
        );
    }

    #[test]
    fn test_number_values() {
        let hex = IntegerNumber::new("0x1A".to_owned(), true, IntegerNumberLength::Long);
        assert_eq!(hex.as_u64(), Some(26));
        assert_eq!(hex.to_string(), "0x1Aul");

        assert_eq!(
            IntegerNumber::new("017".to_owned(), false, IntegerNumberLength::Default).as_u64(),
            Some(15)
        );
        assert_eq!(
            IntegerNumber::new("0b101".to_owned(), false, IntegerNumberLength::Default).as_u64(),
            Some(5)
        );
        assert_eq!(
            IntegerNumber::new("0".to_owned(), false, IntegerNumberLength::Default).as_u64(),
            Some(0)
        );

        let float = FloatingPointNumber::new("1.5e2".to_owned(), FloatingPointNumberLength::Float);
        assert_eq!(float.as_f64(), Some(150.0));
        assert_eq!(float.to_string(), "1.5e2f");

        let hex_float =
            FloatingPointNumber::new("0x1.8p1".to_owned(), FloatingPointNumberLength::Default);
        assert_eq!(hex_float.as_f64(), Some(3.0));
    }

    #[test]
    fn test_keyword_names() {
        assert_eq!(Keyword::from_name("while"), Some(Keyword::While));
        assert_eq!(Keyword::from_name("_Bool"), Some(Keyword::UnderscoreBool));
        assert_eq!(Keyword::from_name("main"), None);
        assert_eq!(Token::Keyword(Keyword::Typedef).name(), Some("typedef"));
    }
}
