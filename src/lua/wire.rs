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

//! The `LUA` RDATA format.
//!
//! PowerDNS stores a Lua record as the two-octet type of the answer it
//! computes, a one-octet snippet length, and the snippet itself:
//!
//! ```text
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                   ANSWER TYPE                 |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |        LENGTH         |                       /
//! +--+--+--+--+--+--+--+--+        SNIPPET        /
//! /                                               /
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```
//!
//! Since `LUA` is a private type, tooling exchanges this RDATA in the
//! generic form of [RFC 3597 § 5] as lower-case hex text. The length
//! octet is informational only: the decoder takes everything after it
//! as the snippet.
//!
//! [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5

use std::fmt;

use log::debug;

use crate::rr::rdata::RdataTooLongError;
use crate::rr::{Rdata, Type};

/// The longest snippet the one-octet length field can describe.
pub const MAX_SNIPPET_LEN: usize = u8::MAX as usize;

/// The number of octets before the snippet.
const PREFIX_LEN: usize = 3;

/// Encodes a snippet and its answer type as hex text, i.e.
/// `%04x` type, `%02x` length, then the hex of the snippet.
pub fn encode(rr_type: Type, snippet: &str) -> Result<String> {
    check_len(snippet)?;
    Ok(format!(
        "{:04x}{:02x}{}",
        u16::from(rr_type),
        snippet.len(),
        hex::encode(snippet)
    ))
}

/// Decodes hex text produced by [`encode`] into the answer type and
/// snippet octets.
pub fn decode(text: &str) -> Result<(Type, Vec<u8>)> {
    let octets = hex::decode(text).map_err(Error::InvalidHex)?;
    decode_octets(&octets)
}

/// Encodes a snippet and its answer type as `LUA` RDATA.
pub fn encode_rdata(rr_type: Type, snippet: &str) -> Result<Box<Rdata>> {
    check_len(snippet)?;
    let mut octets = Vec::with_capacity(PREFIX_LEN + snippet.len());
    octets.extend_from_slice(&u16::from(rr_type).to_be_bytes());
    octets.push(snippet.len() as u8);
    octets.extend_from_slice(snippet.as_bytes());
    octets
        .try_into()
        .map_err(|RdataTooLongError| Error::SnippetTooLong(snippet.len()))
}

/// Decodes `LUA` RDATA into the answer type and snippet text.
pub fn decode_rdata(rdata: &Rdata) -> Result<(Type, String)> {
    let (rr_type, payload) = decode_octets(rdata.octets())?;
    let snippet = String::from_utf8(payload).or(Err(Error::InvalidUtf8))?;
    Ok((rr_type, snippet))
}

fn decode_octets(octets: &[u8]) -> Result<(Type, Vec<u8>)> {
    if octets.len() < PREFIX_LEN {
        return Err(Error::TooShort);
    }
    let rr_type = Type::from(u16::from_be_bytes([octets[0], octets[1]]));
    let declared = octets[2] as usize;
    let payload = &octets[PREFIX_LEN..];
    if declared != payload.len() {
        debug!(
            "LUA RDATA declares a {declared}-octet snippet but carries {} octets",
            payload.len()
        );
    }
    Ok((rr_type, payload.to_vec()))
}

fn check_len(snippet: &str) -> Result<()> {
    if snippet.len() > MAX_SNIPPET_LEN {
        Err(Error::SnippetTooLong(snippet.len()))
    } else {
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that `LUA` RDATA could not be encoded or decoded.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// The RDATA text is not valid hex.
    InvalidHex(hex::FromHexError),

    /// The RDATA is too short to hold the type and length fields.
    TooShort,

    /// The snippet (of the given length) does not fit the one-octet
    /// length field.
    SnippetTooLong(usize),

    /// The snippet is not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidHex(_) => f.write_str("LUA RDATA is not valid hex"),
            Self::TooShort => f.write_str("LUA RDATA is too short"),
            Self::SnippetTooLong(len) => write!(
                f,
                "Lua snippet is {len} octets long (at most {MAX_SNIPPET_LEN} are allowed)"
            ),
            Self::InvalidUtf8 => f.write_str("Lua snippet is not valid UTF-8"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidHex(e) => Some(e),
            _ => None,
        }
    }
}

/// The type returned by fallible codec functions.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
