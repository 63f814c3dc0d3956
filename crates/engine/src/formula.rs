//! Formula reference rewriting.
//!
//! Formulas are never parsed into an AST here. A single left-to-right scan
//! finds A1-style reference tokens and rewrites only their row digits, so
//! everything else in the formula (function names, operators, whitespace,
//! string literals, quoted sheet names) survives byte-for-byte.
//!
//! A reference token is `$?LETTERS$?DIGITS` with one to three column letters
//! no further right than `XFD`. It is not a reference when:
//! - it sits inside `"..."` or `'...'` (doubled quotes escape),
//! - the preceding character is a letter, digit, `_` or `.`,
//! - the following character is `(`, `!`, a letter, `_` or `.`.
//!
//! Tokens that look like references but cannot be rewritten are left as-is
//! and reported through [`ReferenceRewriteWarning`].

use crate::address::{letters_to_col, MAX_ROW};
use crate::error::ReferenceRewriteWarning;

/// Rewritten formula text plus any tokens that were left unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub text: String,
    pub warnings: Vec<ReferenceRewriteWarning>,
}

impl Rewrite {
    fn unchanged(formula: &str) -> Self {
        Self { text: formula.to_string(), warnings: Vec::new() }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Shift every row token at or below `insertion_row` down by `count`.
///
/// ```
/// use auditpaper_engine::formula::rewrite_rows;
/// assert_eq!(rewrite_rows("=A5+B10", 7, 3).text, "=A5+B13");
/// assert_eq!(rewrite_rows("=$A$5", 3, 2).text, "=$A$7");
/// ```
pub fn rewrite_rows(formula: &str, insertion_row: u32, count: u32) -> Rewrite {
    if count == 0 {
        return Rewrite::unchanged(formula);
    }
    transform(formula, |row, _| {
        if row < insertion_row {
            return Action::Keep;
        }
        match row.checked_add(count) {
            Some(new_row) if new_row <= MAX_ROW => Action::Replace { row: new_row, keep_row_abs: true },
            _ => Action::Reject(format!("shifted row {} + {} exceeds sheet limit", row, count)),
        }
    })
}

/// Point row-relative copies of a template row at `target_row`.
///
/// Only tokens whose row equals `source_row` change. The row `$` on such a
/// token is dropped so the copy refers to its own row; column letters and
/// column `$` are untouched.
///
/// ```
/// use auditpaper_engine::formula::retarget_row;
/// assert_eq!(retarget_row("=SUM(A$12:A$12)", 12, 14).text, "=SUM(A14:A14)");
/// ```
pub fn retarget_row(formula: &str, source_row: u32, target_row: u32) -> Rewrite {
    if target_row == 0 || target_row > MAX_ROW {
        let mut rewrite = Rewrite::unchanged(formula);
        rewrite.warnings.push(ReferenceRewriteWarning {
            formula: formula.to_string(),
            token: target_row.to_string(),
            reason: "target row out of range".into(),
        });
        return rewrite;
    }
    transform(formula, |row, _| {
        if row == source_row {
            Action::Replace { row: target_row, keep_row_abs: false }
        } else {
            Action::Keep
        }
    })
}

/// Row numbers of every reference token in the formula, in order.
pub fn referenced_rows(formula: &str) -> Vec<u32> {
    let mut rows = Vec::new();
    transform(formula, |row, _| {
        rows.push(row);
        Action::Keep
    });
    rows
}

enum Action {
    Keep,
    Replace { row: u32, keep_row_abs: bool },
    Reject(String),
}

/// Byte spans of one reference token.
struct Token {
    start: usize,
    /// Index of the row `$` (if any) or the first row digit.
    row_start: usize,
    digits_start: usize,
    end: usize,
}

fn transform(formula: &str, mut on_row: impl FnMut(u32, bool) -> Action) -> Rewrite {
    let bytes = formula.as_bytes();
    let len = bytes.len();
    let mut out = String::with_capacity(len + 8);
    let mut warnings = Vec::new();
    let mut copied = 0;
    let mut i = 0;

    while i < len {
        let b = bytes[i];

        if b == b'"' || b == b'\'' {
            match skip_quoted(bytes, i) {
                Some(end) => i = end,
                None => {
                    warnings.push(ReferenceRewriteWarning {
                        formula: formula.to_string(),
                        token: formula[i..].to_string(),
                        reason: "unterminated quoted literal".into(),
                    });
                    i = len;
                }
            }
            continue;
        }

        if (b == b'$' || b.is_ascii_alphabetic()) && !preceded_by_ident(bytes, i) {
            if let Some(tok) = scan_token(bytes, i) {
                let token_text = &formula[tok.start..tok.end];
                let digits = &formula[tok.digits_start..tok.end];
                let row_abs = tok.row_start != tok.digits_start;
                match digits.parse::<u32>() {
                    Ok(0) => warnings.push(ReferenceRewriteWarning {
                        formula: formula.to_string(),
                        token: token_text.to_string(),
                        reason: "row 0".into(),
                    }),
                    Ok(row) if row > MAX_ROW => warnings.push(ReferenceRewriteWarning {
                        formula: formula.to_string(),
                        token: token_text.to_string(),
                        reason: format!("row {} exceeds sheet limit", row),
                    }),
                    Ok(row) => match on_row(row, row_abs) {
                        Action::Keep => {}
                        Action::Replace { row: new_row, keep_row_abs } => {
                            out.push_str(&formula[copied..tok.row_start]);
                            if row_abs && keep_row_abs {
                                out.push('$');
                            }
                            out.push_str(&new_row.to_string());
                            copied = tok.end;
                        }
                        Action::Reject(reason) => warnings.push(ReferenceRewriteWarning {
                            formula: formula.to_string(),
                            token: token_text.to_string(),
                            reason,
                        }),
                    },
                    Err(_) => warnings.push(ReferenceRewriteWarning {
                        formula: formula.to_string(),
                        token: token_text.to_string(),
                        reason: "row number overflow".into(),
                    }),
                }
                i = tok.end;
                continue;
            }
        }

        i += 1;
    }

    out.push_str(&formula[copied..]);
    Rewrite { text: out, warnings }
}

/// Returns the index just past the closing quote.
fn skip_quoted(bytes: &[u8], open: usize) -> Option<usize> {
    let quote = bytes[open];
    let mut j = open + 1;
    while j < bytes.len() {
        if bytes[j] == quote {
            if bytes.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return Some(j + 1);
        }
        j += 1;
    }
    None
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

fn preceded_by_ident(bytes: &[u8], i: usize) -> bool {
    i > 0 && (is_ident_byte(bytes[i - 1]) || bytes[i - 1] == b'$')
}

fn scan_token(bytes: &[u8], start: usize) -> Option<Token> {
    let len = bytes.len();
    let mut i = start;
    if bytes[i] == b'$' {
        i += 1;
    }
    let letters_start = i;
    while i < len && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    let letters = std::str::from_utf8(&bytes[letters_start..i]).ok()?;
    letters_to_col(letters)?;

    let row_start = i;
    if i < len && bytes[i] == b'$' {
        i += 1;
    }
    let digits_start = i;
    while i < len && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return None;
    }
    if let Some(&next) = bytes.get(i) {
        if next == b'(' || next == b'!' || next.is_ascii_alphabetic() || next == b'_' || next == b'.' {
            return None;
        }
    }
    Some(Token { start, row_start, digits_start, end: i })
}
