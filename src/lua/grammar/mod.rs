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

//! The snippet grammar: canonical Lua text for each [`Policy`].
//!
//! [`encode`] renders a policy as the exact text PowerDNS tooling has
//! historically written for it. [`decode`] parses text back with a
//! small tokenizer and a recursive-descent parser per variant.
//! Whitespace between tokens is insignificant; any other deviation
//! from the canonical shape is a [`MismatchError`].
//!
//! Lua string escapes are not supported. Strings containing an
//! apostrophe, a backslash, or a control character are refused by
//! [`encode`] rather than written in a form [`decode`] could not read
//! back.

use std::fmt;

use super::{Policy, Variant, Weighted};
use crate::rr::Type;

mod lexer;
mod parser;

use parser::Parser;

////////////////////////////////////////////////////////////////////////
// ENCODING                                                           //
////////////////////////////////////////////////////////////////////////

/// Renders `policy` as a Lua snippet. Raw snippets are returned as
/// they are.
pub fn encode(policy: &Policy) -> Result<String, EncodeError> {
    match policy {
        Policy::Raw(snippet) => Ok(snippet.clone()),
        Policy::PickRandom { addresses } => {
            Ok(format!("pickrandom({{{}}})", quoted_list(addresses)?))
        }
        Policy::PickWeightedRandom { weighted } => {
            let items = weighted
                .iter()
                .map(|Weighted { weight, address }| {
                    Ok(format!("{{{weight}, {}}}", quoted(address)?))
                })
                .collect::<Result<Vec<_>, EncodeError>>()?;
            Ok(format!("pickwrandom({{{}}})", items.join(",")))
        }
        Policy::IfPortUp {
            port,
            addresses,
            timeout,
        } => Ok(format!(
            "ifportup({port}, {{{}}},{{timeout={timeout}}})",
            quoted_list(addresses)?
        )),
        Policy::IfUrlUp {
            url,
            primary,
            backup,
            stringmatch,
        } => Ok(format!(
            "ifurlup({}, {{{{{}}}, {{{}}} }},{{stringmatch={}}})",
            quoted(url)?,
            quoted_list(primary)?,
            quoted_list(backup)?,
            quoted(stringmatch)?
        )),
    }
}

/// `'a','b'`
fn quoted_list(items: &[String]) -> Result<String, EncodeError> {
    let quoted = items
        .iter()
        .map(|item| quoted(item))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(quoted.join(","))
}

fn quoted(text: &str) -> Result<String, EncodeError> {
    if let Some(character) = text
        .chars()
        .find(|&c| c == '\'' || c == '\\' || c.is_control())
    {
        Err(EncodeError::UnsupportedCharacter {
            character,
            text: text.to_owned(),
        })
    } else {
        Ok(format!("'{text}'"))
    }
}

////////////////////////////////////////////////////////////////////////
// DECODING                                                           //
////////////////////////////////////////////////////////////////////////

/// Parses `snippet` as a policy of the given variant. For
/// [`Variant::Lua`], any text is accepted as a raw snippet.
pub fn decode(variant: Variant, snippet: &str) -> Result<Policy, MismatchError> {
    match variant {
        Variant::Lua => Ok(Policy::Raw(snippet.to_owned())),
        Variant::PickRandom => Parser::new(snippet)?.pickrandom(),
        Variant::PickWeightedRandom => Parser::new(snippet)?.pickwrandom(),
        Variant::IfPortUp => Parser::new(snippet)?.ifportup(),
        Variant::IfUrlUp => Parser::new(snippet)?.ifurlup(),
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that an entry cannot be written as a `LUA`
/// record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EncodeError {
    /// The answer type is not one a Lua record may produce.
    UnsupportedAnswerType(Type),

    /// A string contains a character the grammar cannot represent.
    UnsupportedCharacter { character: char, text: String },

    /// A record must have at least one entry.
    NoEntries,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnsupportedAnswerType(rr_type) => {
                write!(f, "unsupported answer type {rr_type}")
            }
            Self::UnsupportedCharacter { character, text } => {
                write!(f, "unsupported character {character:?} in {text:?}")
            }
            Self::NoEntries => f.write_str("a record needs at least one entry"),
        }
    }
}

impl std::error::Error for EncodeError {}

/// An error signaling that a snippet does not have the expected shape.
/// Offsets are in bytes from the start of the snippet.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MismatchError {
    UnexpectedCharacter { offset: usize, character: char },
    UnterminatedString { offset: usize },
    Expected { offset: usize, expected: &'static str },
    IntegerOutOfRange { offset: usize },
}

impl fmt::Display for MismatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter { offset, character } => {
                write!(f, "unexpected character {character:?} at offset {offset}")
            }
            Self::UnterminatedString { offset } => {
                write!(f, "unterminated string starting at offset {offset}")
            }
            Self::Expected { offset, expected } => {
                write!(f, "expected {expected} at offset {offset}")
            }
            Self::IntegerOutOfRange { offset } => {
                write!(f, "integer out of range at offset {offset}")
            }
        }
    }
}

impl std::error::Error for MismatchError {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
