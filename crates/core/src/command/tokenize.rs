//! Command-line tokenizer with explicit quoting rules.
//!
//! Rules:
//! - Unquoted whitespace separates tokens.
//! - Unquoted characters must be ASCII alphanumerics or one of
//!   [`UNQUOTED_PUNCTUATION`]; anything else must be quoted.
//! - `"..."` and `'...'` spans may contain any character. Inside a span a
//!   backslash escapes the span's own quote or another backslash; any other
//!   backslash is kept literally.
//! - Quoted and unquoted segments that touch are joined into one token, so
//!   `--message="a b"` yields `--message=a b`.

use crate::errors::TokenizeError;

/// Punctuation accepted outside quotes.
pub const UNQUOTED_PUNCTUATION: &str = "-_:/\\.,@!#$%^&*(){}[];<>=+~";

/// Whether `ch` may appear in an unquoted token.
pub fn is_allowed_unquoted(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || UNQUOTED_PUNCTUATION.contains(ch)
}

/// Split `line` into tokens.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // A token exists even if empty once a quote has been seen (`""`).
    let mut in_token = false;
    let mut chars = line.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            '"' | '\'' => {
                in_token = true;
                let quote = ch;
                let mut closed = false;
                while let Some((_, inner)) = chars.next() {
                    match inner {
                        '\\' => match chars.peek() {
                            Some(&(_, next)) if next == quote || next == '\\' => {
                                current.push(next);
                                chars.next();
                            }
                            _ => current.push('\\'),
                        },
                        c if c == quote => {
                            closed = true;
                            break;
                        }
                        c => current.push(c),
                    }
                }
                if !closed {
                    return Err(TokenizeError::UnterminatedQuote {
                        quote,
                        position: pos,
                    });
                }
            }
            c if is_allowed_unquoted(c) => {
                in_token = true;
                current.push(c);
            }
            c => {
                return Err(TokenizeError::DisallowedCharacter { ch: c, position: pos });
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    if tokens.is_empty() {
        return Err(TokenizeError::Empty);
    }
    Ok(tokens)
}

/// Split `line` into a program name and its arguments.
pub fn split_command(line: &str) -> Result<(String, Vec<String>), TokenizeError> {
    let mut tokens = tokenize(line)?;
    let program = tokens.remove(0);
    Ok((program, tokens))
}

/// Quote `arg` so that [`tokenize`] yields it back unchanged.
///
/// Arguments made only of unquoted-safe characters are returned as-is.
pub fn quote(arg: &str) -> String {
    if !arg.is_empty() && arg.chars().all(is_allowed_unquoted) {
        return arg.to_string();
    }
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for ch in arg.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}
