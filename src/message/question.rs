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

//! Questions and QTYPEs.

use std::fmt;

use crate::class::Class;
use crate::name::Name;
use crate::rr::Type;

////////////////////////////////////////////////////////////////////////
// QUESTIONS                                                          //
////////////////////////////////////////////////////////////////////////

/// A question ([RFC 1035 § 4.1.2]).
///
/// UPDATE messages reuse the question section as the zone section
/// ([RFC 2136 § 2.3]), holding one entry that names the zone with QTYPE
/// SOA.
///
/// [RFC 1035 § 4.1.2]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.2
/// [RFC 2136 § 2.3]: https://datatracker.ietf.org/doc/html/rfc2136#section-2.3
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Question {
    pub qname: Name,
    pub qtype: Qtype,
    pub qclass: Class,
}

impl Question {
    /// Builds the question of an AXFR request for `zone`.
    pub fn axfr(zone: Name) -> Self {
        Self {
            qname: zone,
            qtype: Qtype::AXFR,
            qclass: Class::IN,
        }
    }

    /// Builds the zone section entry of an UPDATE request for `zone`.
    pub fn update_zone(zone: Name) -> Self {
        Self {
            qname: zone,
            qtype: Type::SOA.into(),
            qclass: Class::IN,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// QTYPES                                                             //
////////////////////////////////////////////////////////////////////////

/// The QTYPE of a [question](Question): an RR [`Type`] or a
/// query-only value such as [`AXFR`](Qtype::AXFR).
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
pub struct Qtype(u16);

impl Qtype {
    pub const AXFR: Self = Self(252);
}

impl From<u16> for Qtype {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Qtype> for u16 {
    fn from(qtype: Qtype) -> Self {
        qtype.0
    }
}

impl From<Type> for Qtype {
    fn from(rr_type: Type) -> Self {
        Self(rr_type.into())
    }
}

impl fmt::Display for Qtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if *self == Self::AXFR {
            f.write_str("AXFR")
        } else {
            Type::from(*self).fmt(f)
        }
    }
}

impl fmt::Debug for Qtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
