//! Tokenizer for the supported JavaScript subset.
//!
//! The whole input is tokenized up front. Regular expression literals are told apart from
//! the division operator by looking at the previous significant token, and comments are
//! collected separately so the printer can re-emit them.

use crate::{
    syntax::node::{is_id_continue, is_id_start, Comment, Span},
    Error, Result,
};

/// Punctuators, longest first so greedy matching picks the right one.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "<<", ">>", "**", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".",
];

/// Keywords after which a `/` starts a regular expression.
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else",
];

/// Token payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Word(String),
    /// Numeric literal.
    Number(f64),
    /// String literal with its decoded value and source spelling.
    String {
        /// Decoded value.
        value: String,
        /// Source text including quotes.
        raw: String,
    },
    /// Regular expression literal.
    RegExp {
        /// Body between the slashes.
        pattern: String,
        /// Trailing flags.
        flags: String,
    },
    /// Operator or delimiter.
    Punct(&'static str),
    /// End of input.
    Eof,
}

/// A token with position information.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Payload.
    pub kind: TokenKind,
    /// Byte range in the source.
    pub span: Span,
    /// True if a line terminator precedes the token.
    pub newline_before: bool,
}

/// Output of [`tokenize`].
#[derive(Debug, Default)]
pub struct Tokens {
    /// Tokens ending with [`TokenKind::Eof`].
    pub tokens: Vec<Token>,
    /// Comments in source order.
    pub comments: Vec<Comment>,
}

/// Converts a byte offset into a 1-based line and column.
#[must_use]
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let prefix = &source[..offset.min(source.len())];
    let line = prefix.matches('\n').count() + 1;
    let column = prefix.rfind('\n').map_or(prefix.len(), |nl| prefix.len() - nl - 1) + 1;
    (line, column)
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: Tokens,
    newline_before: bool,
}

/// Tokenizes `source`.
///
/// # Errors
///
/// Returns [`Error::Parse`] for unterminated literals and characters outside the grammar.
pub fn tokenize(source: &str) -> Result<Tokens> {
    let mut lexer = Lexer {
        source,
        bytes: source.as_bytes(),
        pos: 0,
        out: Tokens::default(),
        newline_before: false,
    };
    lexer.run()?;
    Ok(lexer.out)
}

impl Lexer<'_> {
    fn error(&self, offset: usize, message: impl Into<String>) -> Error {
        let (line, column) = line_col(self.source, offset);
        Error::Parse {
            message: message.into(),
            line,
            column,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.source.get(offset..).and_then(|rest| rest.chars().next())
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.out.tokens.push(Token {
            kind,
            span: Span::new(start as u32, self.pos as u32),
            newline_before: self.newline_before,
        });
        self.newline_before = false;
    }

    fn regex_allowed(&self) -> bool {
        match self.out.tokens.last().map(|token| &token.kind) {
            None => true,
            Some(TokenKind::Punct(p)) => !matches!(*p, ")" | "]" | "}"),
            Some(TokenKind::Word(word)) => REGEX_PREFIX_KEYWORDS.contains(&word.as_str()),
            Some(_) => false,
        }
    }

    fn run(&mut self) -> Result<()> {
        while self.pos < self.bytes.len() {
            let start = self.pos;
            let Some(c) = self.peek_char() else {
                break;
            };
            match c {
                '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
                    self.newline_before = true;
                    self.pos += c.len_utf8();
                }
                c if c.is_whitespace() || c == '\u{feff}' => self.pos += c.len_utf8(),
                '/' if self.bytes.get(start + 1) == Some(&b'/') => self.line_comment(),
                '/' if self.bytes.get(start + 1) == Some(&b'*') => self.block_comment()?,
                '/' if self.regex_allowed() => self.regex()?,
                '"' | '\'' => self.string(c)?,
                '0'..='9' => self.number()?,
                '.' if self.bytes.get(start + 1).is_some_and(u8::is_ascii_digit) => {
                    self.number()?;
                }
                c if is_id_start(c) || c == '\\' => self.word()?,
                '`' => return Err(self.error(start, "template literals are not supported")),
                _ => self.punct()?,
            }
        }
        let end = self.pos;
        self.push(TokenKind::Eof, end);
        Ok(())
    }

    fn line_comment(&mut self) {
        let start = self.pos;
        let rest = &self.source[start + 2..];
        let len = rest
            .find(['\n', '\r', '\u{2028}', '\u{2029}'])
            .unwrap_or(rest.len());
        self.pos = start + 2 + len;
        self.out.comments.push(Comment {
            text: rest[..len].to_string(),
            block: false,
            span: Span::new(start as u32, self.pos as u32),
        });
    }

    fn block_comment(&mut self) -> Result<()> {
        let start = self.pos;
        let rest = &self.source[start + 2..];
        let Some(len) = rest.find("*/") else {
            return Err(self.error(start, "unterminated comment"));
        };
        let text = &rest[..len];
        if text.contains(['\n', '\r']) {
            self.newline_before = true;
        }
        self.pos = start + 2 + len + 2;
        self.out.comments.push(Comment {
            text: text.to_string(),
            block: true,
            span: Span::new(start as u32, self.pos as u32),
        });
        Ok(())
    }

    fn regex(&mut self) -> Result<()> {
        let start = self.pos;
        let mut pos = start + 1;
        let mut in_class = false;
        loop {
            let Some(c) = self.char_at(pos) else {
                return Err(self.error(start, "unterminated regular expression"));
            };
            match c {
                '\n' | '\r' => return Err(self.error(start, "unterminated regular expression")),
                '\\' => {
                    pos += 1;
                    match self.char_at(pos) {
                        Some(escaped) => pos += escaped.len_utf8(),
                        None => {
                            return Err(self.error(start, "unterminated regular expression"))
                        }
                    }
                    continue;
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                _ => {}
            }
            pos += c.len_utf8();
        }
        let pattern = self.source[start + 1..pos].to_string();
        pos += 1;
        let flags_start = pos;
        while let Some(c) = self.char_at(pos) {
            if !is_id_continue(c) {
                break;
            }
            pos += c.len_utf8();
        }
        let flags = self.source[flags_start..pos].to_string();
        self.pos = pos;
        self.push(TokenKind::RegExp { pattern, flags }, start);
        Ok(())
    }

    fn string(&mut self, quote: char) -> Result<()> {
        let start = self.pos;
        let mut pos = start + 1;
        let mut units: Vec<u16> = Vec::new();
        loop {
            let Some(c) = self.char_at(pos) else {
                return Err(self.error(start, "unterminated string literal"));
            };
            pos += c.len_utf8();
            match c {
                c if c == quote => break,
                '\n' | '\r' => return Err(self.error(start, "unterminated string literal")),
                '\\' => {
                    let Some(escaped) = self.char_at(pos) else {
                        return Err(self.error(start, "unterminated string literal"));
                    };
                    pos += escaped.len_utf8();
                    match escaped {
                        'n' => units.push(0x0a),
                        't' => units.push(0x09),
                        'r' => units.push(0x0d),
                        'b' => units.push(0x08),
                        'f' => units.push(0x0c),
                        'v' => units.push(0x0b),
                        '\r' => {
                            if self.char_at(pos) == Some('\n') {
                                pos += 1;
                            }
                        }
                        '\n' | '\u{2028}' | '\u{2029}' => {}
                        'x' => {
                            let value = self.hex_digits(pos, 2).ok_or_else(|| {
                                self.error(pos, "invalid hexadecimal escape sequence")
                            })?;
                            units.push(value as u16);
                            pos += 2;
                        }
                        'u' => {
                            let (code, len) = self.unicode_escape(pos)?;
                            push_code_point(&mut units, code);
                            pos += len;
                        }
                        '0'..='7' => {
                            let mut value = escaped as u32 - '0' as u32;
                            let max_len = if escaped <= '3' { 3 } else { 2 };
                            let mut len = 1;
                            while len < max_len {
                                match self.char_at(pos) {
                                    Some(d @ '0'..='7') => {
                                        value = value * 8 + (d as u32 - '0' as u32);
                                        pos += 1;
                                        len += 1;
                                    }
                                    _ => break,
                                }
                            }
                            units.push(value as u16);
                        }
                        other => push_code_point(&mut units, other as u32),
                    }
                }
                other => push_code_point(&mut units, other as u32),
            }
        }
        let value = String::from_utf16(&units).unwrap_or_else(|_| String::from_utf16_lossy(&units));
        let raw = self.source[start..pos].to_string();
        self.pos = pos;
        self.push(TokenKind::String { value, raw }, start);
        Ok(())
    }

    fn hex_digits(&self, pos: usize, count: usize) -> Option<u32> {
        let digits = self.source.get(pos..pos + count)?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(digits, 16).ok()
    }

    /// Decodes the part of a `\u` escape after the `u`; returns code point and length.
    fn unicode_escape(&self, pos: usize) -> Result<(u32, usize)> {
        if self.char_at(pos) == Some('{') {
            let close = self.source[pos..]
                .find('}')
                .ok_or_else(|| self.error(pos, "invalid unicode escape sequence"))?;
            let digits = &self.source[pos + 1..pos + close];
            let code = u32::from_str_radix(digits, 16)
                .ok()
                .filter(|code| *code <= 0x10ffff)
                .ok_or_else(|| self.error(pos, "invalid unicode escape sequence"))?;
            return Ok((code, close + 1));
        }
        let code = self
            .hex_digits(pos, 4)
            .ok_or_else(|| self.error(pos, "invalid unicode escape sequence"))?;
        Ok((code, 4))
    }

    fn number(&mut self) -> Result<()> {
        let start = self.pos;
        let bytes = self.bytes;
        let mut pos = start;
        let radix = if bytes[pos] == b'0' {
            match bytes.get(pos + 1).map(u8::to_ascii_lowercase) {
                Some(b'x') => Some(16),
                Some(b'o') => Some(8),
                Some(b'b') => Some(2),
                _ => None,
            }
        } else {
            None
        };

        let value = if let Some(radix) = radix {
            pos += 2;
            let digits_start = pos;
            while pos < bytes.len() && (bytes[pos] as char).is_digit(radix) {
                pos += 1;
            }
            parse_radix(&self.source[digits_start..pos], radix)
                .ok_or_else(|| self.error(start, "invalid numeric literal"))?
        } else {
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            let integer = &self.source[start..pos];
            if integer.len() > 1
                && integer.starts_with('0')
                && integer.bytes().all(|b| (b'0'..=b'7').contains(&b))
            {
                // Legacy octal literal.
                self.pos = pos;
                let value = parse_radix(&integer[1..], 8)
                    .ok_or_else(|| self.error(start, "invalid numeric literal"))?;
                self.push(TokenKind::Number(value), start);
                return Ok(());
            }
            if bytes.get(pos) == Some(&b'.') {
                pos += 1;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            if matches!(bytes.get(pos), Some(b'e' | b'E')) {
                let mut exp = pos + 1;
                if matches!(bytes.get(exp), Some(b'+' | b'-')) {
                    exp += 1;
                }
                if bytes.get(exp).is_some_and(u8::is_ascii_digit) {
                    pos = exp;
                    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
            }
            self.source[start..pos]
                .parse::<f64>()
                .map_err(|_| self.error(start, "invalid numeric literal"))?
        };

        if self.char_at(pos).is_some_and(is_id_start) {
            return Err(self.error(pos, "identifier directly after number"));
        }
        self.pos = pos;
        self.push(TokenKind::Number(value), start);
        Ok(())
    }

    fn word(&mut self) -> Result<()> {
        let start = self.pos;
        let mut pos = start;
        let mut name = String::new();
        while let Some(c) = self.char_at(pos) {
            if c == '\\' {
                if self.char_at(pos + 1) != Some('u') {
                    return Err(self.error(pos, "invalid escape in identifier"));
                }
                let (code, len) = self.unicode_escape(pos + 2)?;
                let decoded = char::from_u32(code)
                    .ok_or_else(|| self.error(pos, "invalid escape in identifier"))?;
                name.push(decoded);
                pos += 2 + len;
                continue;
            }
            if !is_id_continue(c) {
                break;
            }
            name.push(c);
            pos += c.len_utf8();
        }
        self.pos = pos;
        self.push(TokenKind::Word(name), start);
        Ok(())
    }

    fn punct(&mut self) -> Result<()> {
        let start = self.pos;
        let rest = &self.source[start..];
        let Some(punct) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) else {
            let c = self.peek_char().unwrap_or('\0');
            return Err(self.error(start, format!("unexpected character '{c}'")));
        };
        // `?.5` is a conditional followed by a number, not optional chaining
        let punct = if *punct == "?." && rest.as_bytes().get(2).is_some_and(u8::is_ascii_digit) {
            "?"
        } else {
            punct
        };
        self.pos += punct.len();
        self.push(TokenKind::Punct(punct), start);
        Ok(())
    }
}

fn push_code_point(units: &mut Vec<u16>, code: u32) {
    if let Some(c) = char::from_u32(code) {
        let mut buf = [0u16; 2];
        units.extend_from_slice(c.encode_utf16(&mut buf));
    } else {
        // Lone surrogate from an escape sequence.
        units.push(code as u16);
    }
}

fn parse_radix(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    let mut value = 0f64;
    for c in digits.chars() {
        value = value * f64::from(radix) + f64::from(c.to_digit(radix)?);
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .tokens
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn numbers() {
        assert_eq!(
            kinds("0x1F 017 1e3 .5 0b101"),
            vec![
                TokenKind::Number(31.0),
                TokenKind::Number(15.0),
                TokenKind::Number(1000.0),
                TokenKind::Number(0.5),
                TokenKind::Number(5.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        let tokens = kinds(r#"'\x41B\u{43}\n\'' "\101""#);
        assert_eq!(
            tokens[0],
            TokenKind::String {
                value: "ABC\n'".into(),
                raw: r"'\x41B\u{43}\n\''".into(),
            }
        );
        assert_eq!(
            tokens[1],
            TokenKind::String {
                value: "A".into(),
                raw: r#""\101""#.into(),
            }
        );
    }

    #[test]
    fn regex_versus_division() {
        let tokens = kinds("a / b; x = /ab+c/gi; (1) / 2");
        assert!(tokens.contains(&TokenKind::RegExp {
            pattern: "ab+c".into(),
            flags: "gi".into(),
        }));
        assert_eq!(
            tokens
                .iter()
                .filter(|t| **t == TokenKind::Punct("/"))
                .count(),
            2
        );
    }

    #[test]
    fn comments_and_newlines() {
        let result = tokenize("a // one\n/* two */ b").unwrap();
        assert_eq!(result.comments.len(), 2);
        assert_eq!(result.comments[0].text, " one");
        assert!(result.comments[1].block);
        assert!(result.tokens[1].newline_before);
    }

    #[test]
    fn reports_position() {
        let err = tokenize("a\n  'open").unwrap_err();
        match err {
            Error::Parse { line, column, .. } => assert_eq!((line, column), (2, 3)),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
