// Copyright 2021 Matthew Ingwersen.
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

//! Errors from building a [`Name`](super::Name).

use std::fmt;

/// Why a domain name could not be parsed from presentation format or
/// read from a message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    /// A backslash was not followed by one character or three decimal
    /// digits at most 255.
    InvalidEscape,
    /// A compression pointer did not point strictly backward.
    InvalidPointer,
    LabelTooLong,
    /// Over 255 octets in wire form.
    NameTooLong,
    /// The wire form ran out of labels without a root label.
    NonNullTerminal,
    /// An empty label appeared before the end, as in `a..b`.
    NullNonTerminal,
    StrEmpty,
    StrNotAscii,
    UnexpectedEom,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidEscape => "invalid escape sequence",
            Self::InvalidPointer => "invalid compression pointer",
            Self::LabelTooLong => "label is longer than 63 octets",
            Self::NameTooLong => "name is longer than 255 octets",
            Self::NonNullTerminal => "name does not end with the root label",
            Self::NullNonTerminal => "empty label inside name",
            Self::StrEmpty => "name is empty",
            Self::StrNotAscii => "name contains non-ASCII characters",
            Self::UnexpectedEom => "name runs past the end of the message",
        })
    }
}

impl std::error::Error for Error {}
