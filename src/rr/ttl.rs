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

//! Record TTLs.

use std::fmt;

////////////////////////////////////////////////////////////////////////
// TTLS                                                               //
////////////////////////////////////////////////////////////////////////

/// A record TTL, limited to 0 through 2³¹ - 1 as [RFC 2181 § 8]
/// requires.
///
/// Converting from a `u32` with the top bit set yields zero, which is
/// how such values must be read off the wire. A Lua record with a TTL of
/// zero is still valid; PowerDNS simply never caches the answer.
///
/// [RFC 2181 § 8]: https://datatracker.ietf.org/doc/html/rfc2181#section-8
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Ttl(u32);

impl From<u32> for Ttl {
    fn from(raw: u32) -> Self {
        Self(if raw >> 31 == 0 { raw } else { 0 })
    }
}

impl From<Ttl> for u32 {
    fn from(ttl: Ttl) -> Self {
        ttl.0
    }
}

impl Ttl {
    /// Carried by TSIG RRs and by RRset deletions in dynamic updates.
    pub const ZERO: Ttl = Ttl(0);
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Ttl {
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
    fn in_range_ttls_are_kept() {
        for raw in [0, 300, 86400, i32::MAX as u32] {
            assert_eq!(u32::from(Ttl::from(raw)), raw);
        }
        assert_eq!(Ttl::from(3600).to_string(), "3600");
    }

    #[test]
    fn out_of_range_ttls_read_as_zero() {
        assert_eq!(Ttl::from(i32::MAX as u32 + 1), Ttl::ZERO);
        assert_eq!(Ttl::from(u32::MAX), Ttl::ZERO);
    }
}
