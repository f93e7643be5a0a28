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

//! The [`Opcode`] type.

use std::fmt;

/// The four-bit opcode of a DNS message header ([RFC 1035 § 4.1.1]).
///
/// The client only sends queries (for AXFR) and dynamic updates
/// ([RFC 2136]); anything else a server might echo back is kept as
/// [`Opcode::Other`].
///
/// [RFC 1035 § 4.1.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1
/// [RFC 2136]: https://datatracker.ietf.org/doc/html/rfc2136
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Opcode {
    Query,
    Update,
    Other(u8),
}

/// Only the low four bits of `value` are used.
impl From<u8> for Opcode {
    fn from(value: u8) -> Self {
        match value & 0x0f {
            0 => Self::Query,
            5 => Self::Update,
            other => Self::Other(other),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Query => 0,
            Opcode::Update => 5,
            Opcode::Other(value) => value & 0x0f,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Query => f.write_str("QUERY"),
            Self::Update => f.write_str("UPDATE"),
            Self::Other(value) => write!(f, "OPCODE{value}"),
        }
    }
}
