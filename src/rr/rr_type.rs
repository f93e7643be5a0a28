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

//! The [`Type`] of a resource record.

use std::fmt;
use std::str::FromStr;

use crate::message::Qtype;
use crate::util::parse_generic_mnemonic;

////////////////////////////////////////////////////////////////////////
// RR TYPES                                                           //
////////////////////////////////////////////////////////////////////////

/// An RR type.
///
/// Constants cover the answer types a Lua record may produce,
/// [`Type::LUA`] itself, and the few types the transport recognizes.
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Type(u16);

impl Type {
    pub const A: Type = Type(1);
    pub const NS: Type = Type(2);
    pub const CNAME: Type = Type(5);
    pub const SOA: Type = Type(6);
    pub const PTR: Type = Type(12);
    pub const TXT: Type = Type(16);
    pub const AAAA: Type = Type(28);
    pub const OPT: Type = Type(41);
    pub const TSIG: Type = Type(250);

    /// The PowerDNS private-use type for Lua records.
    pub const LUA: Type = Type(65402);
}

impl From<u16> for Type {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Type> for u16 {
    fn from(rr_type: Type) -> Self {
        rr_type.0
    }
}

impl From<Qtype> for Type {
    fn from(qtype: Qtype) -> Self {
        Self(qtype.into())
    }
}

/// Mnemonics for the types with constants above.
const MNEMONICS: [(Type, &str); 10] = [
    (Type::A, "A"),
    (Type::NS, "NS"),
    (Type::CNAME, "CNAME"),
    (Type::SOA, "SOA"),
    (Type::PTR, "PTR"),
    (Type::TXT, "TXT"),
    (Type::AAAA, "AAAA"),
    (Type::OPT, "OPT"),
    (Type::TSIG, "TSIG"),
    (Type::LUA, "LUA"),
];

/// Parses a mnemonic case-insensitively, or the generic `TYPEnnn` form
/// of [RFC 3597 § 5].
///
/// [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5
impl FromStr for Type {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        MNEMONICS
            .iter()
            .find(|(_, mnemonic)| mnemonic.eq_ignore_ascii_case(text))
            .map(|&(rr_type, _)| Ok(rr_type))
            .or_else(|| parse_generic_mnemonic(text, "TYPE").map(|r| r.map(Self)))
            .unwrap_or(Err("unknown type"))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match MNEMONICS.iter().find(|(rr_type, _)| rr_type == self) {
            Some((_, mnemonic)) => f.write_str(mnemonic),
            None => write!(f, "TYPE{}", self.0),
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_displays_according_to_rfc3597() {
        // TYPE65280 is from the private use range, so it should always
        // be unknown.
        assert_eq!(Type::from(0xff00).to_string(), "TYPE65280");
        assert_eq!(Type::from(65402).to_string(), "LUA");
    }

    #[test]
    fn type_parses_mnemonics_and_generic_forms() {
        assert_eq!("lua".parse::<Type>(), Ok(Type::LUA));
        assert_eq!("TYPE65402".parse::<Type>(), Ok(Type::LUA));
        assert_eq!("Aaaa".parse::<Type>(), Ok(Type::AAAA));
        assert_eq!(u16::from("TYPE65280".parse::<Type>().unwrap()), 65280);
        assert!("MX".parse::<Type>().is_err());
        assert!("TYPE65536".parse::<Type>().is_err());
    }
}
