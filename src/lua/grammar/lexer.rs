// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Tokenizer for Lua snippets.
//!
//! Only the handful of tokens that appear in the GSLB function calls
//! are recognized. Anything else, including Lua string escapes and
//! double-quoted strings, is a mismatch.

use super::MismatchError;

/// A token of a Lua snippet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Token<'a> {
    Ident(&'a str),

    /// A run of decimal digits, not yet checked for range.
    Int(&'a str),

    /// The contents of a single-quoted string literal.
    Str(&'a str),

    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Equals,
}

impl Token<'_> {
    /// Describes the token for error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Ident(_) => "identifier",
            Self::Int(_) => "integer",
            Self::Str(_) => "string",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::Comma => "','",
            Self::Equals => "'='",
        }
    }
}

/// A token together with the byte offset at which it starts.
pub type Spanned<'a> = (usize, Token<'a>);

/// Splits `text` into tokens, skipping whitespace.
pub fn tokenize(text: &str) -> Result<Vec<Spanned>, MismatchError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let start = offset;
        let token = match bytes[offset] {
            b if b.is_ascii_whitespace() => {
                offset += 1;
                continue;
            }
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'{' => Token::LBrace,
            b'}' => Token::RBrace,
            b',' => Token::Comma,
            b'=' => Token::Equals,
            b'\'' => {
                let len = bytes[start + 1..]
                    .iter()
                    .position(|&b| b == b'\'')
                    .ok_or(MismatchError::UnterminatedString { offset: start })?;
                offset += len + 1;
                Token::Str(&text[start + 1..start + 1 + len])
            }
            b if b.is_ascii_digit() => {
                offset += run_len(&bytes[start..], |b| b.is_ascii_digit()) - 1;
                Token::Int(&text[start..offset + 1])
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                offset += run_len(&bytes[start..], |b| b.is_ascii_alphanumeric() || b == b'_') - 1;
                Token::Ident(&text[start..offset + 1])
            }
            _ => {
                // `start` is always on a character boundary.
                let character = text[start..].chars().next().unwrap_or_default();
                return Err(MismatchError::UnexpectedCharacter {
                    offset: start,
                    character,
                });
            }
        };
        tokens.push((start, token));
        offset += 1;
    }

    Ok(tokens)
}

/// Returns the length of the prefix of `bytes` whose octets satisfy
/// `pred`.
fn run_len(bytes: &[u8], pred: impl Fn(u8) -> bool) -> usize {
    bytes.iter().take_while(|&&b| pred(b)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_recognizes_call_shapes() {
        let tokens = tokenize("ifportup(443, {'a b'},{timeout=10})").unwrap();
        let expected = [
            (0, Token::Ident("ifportup")),
            (8, Token::LParen),
            (9, Token::Int("443")),
            (12, Token::Comma),
            (14, Token::LBrace),
            (15, Token::Str("a b")),
            (20, Token::RBrace),
            (21, Token::Comma),
            (22, Token::LBrace),
            (23, Token::Ident("timeout")),
            (30, Token::Equals),
            (31, Token::Int("10")),
            (33, Token::RBrace),
            (34, Token::RParen),
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn tokenize_allows_empty_strings_and_non_ascii_contents() {
        let tokens = tokenize("'' 'é'").unwrap();
        assert_eq!(tokens, [(0, Token::Str("")), (3, Token::Str("é"))]);
    }

    #[test]
    fn tokenize_rejects_unknown_characters() {
        assert_eq!(
            tokenize("pickrandom({\"a\"})"),
            Err(MismatchError::UnexpectedCharacter {
                offset: 12,
                character: '"'
            })
        );
        assert_eq!(
            tokenize("x;"),
            Err(MismatchError::UnexpectedCharacter {
                offset: 1,
                character: ';'
            })
        );
    }

    #[test]
    fn tokenize_rejects_unterminated_strings() {
        assert_eq!(
            tokenize("{'abc}"),
            Err(MismatchError::UnterminatedString { offset: 1 })
        );
    }
}
