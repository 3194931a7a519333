//! Lexical conventions of literals.

use sable_core::{CompilationError, Error, Span};
use sable_syntax::TokenKind;

use crate::ast::ExprKind;

/// Strip the quotes of a string literal and resolve its escapes.
///
/// `\\`, `\"`, `\'`, `\n`, `\t` and `\r` are recognized; any other
/// backslash sequence is kept as written.
pub fn unescape(text: &str) -> String {
    let inner = if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        ""
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Bit assigned to a regex flag character, matching the host's pattern
/// compiler.
pub fn regex_flag_bits(flag: char) -> Option<i32> {
    Some(match flag {
        'c' => 128,
        'i' => 2,
        'l' => 16,
        'm' => 8,
        's' => 32,
        'U' => 256,
        'u' => 64,
        'x' => 4,
        _ => return None,
    })
}

/// Split `/pattern/flags` into the pattern text and the flag bits.
pub(super) fn regex(text: &str, span: Span) -> Result<(String, i32), Error> {
    let close = text.rfind('/').filter(|&i| i > 0).unwrap_or(text.len());
    let body = text.get(1..close).unwrap_or("");
    let flags = text.get(close + 1..).unwrap_or("");

    let mut bits = 0;
    for flag in flags.chars() {
        bits |= regex_flag_bits(flag).ok_or(CompilationError::InvalidRegexFlag { flag, span })?;
    }
    Ok((body.replace("\\/", "/"), bits))
}

/// Split a numeric literal into digits, radix and suffix.
pub(super) fn numeric(kind: TokenKind, text: &str) -> Option<ExprKind> {
    let (digits, radix, decimal) = match kind {
        TokenKind::HexLiteral => (text.get(2..)?, 16, false),
        TokenKind::OctalLiteral => (text.get(1..)?, 8, false),
        TokenKind::IntegerLiteral => (text, 10, false),
        TokenKind::DecimalLiteral => (text, 10, true),
        _ => return None,
    };
    let last = digits.chars().last()?;
    let takes_suffix = if decimal {
        matches!(last, 'f' | 'F' | 'd' | 'D')
    } else {
        matches!(last, 'l' | 'L')
    };
    let (digits, suffix) = if takes_suffix {
        (&digits[..digits.len() - 1], Some(last.to_ascii_lowercase()))
    } else {
        (digits, None)
    };
    if digits.is_empty() {
        return None;
    }
    Some(ExprKind::Numeric {
        digits: digits.to_string(),
        radix,
        suffix,
        decimal,
    })
}
