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

//! GSLB policies and their representation as PowerDNS Lua records.
//!
//! A PowerDNS `LUA` record carries the type of the answer it produces
//! and a Lua snippet that computes that answer at query time. This
//! module models the snippets this crate knows how to manage as a
//! [`Policy`], grouped with an answer type and TTL into an [`Entry`].
//!
//! Converting an [`Entry`] to the wire is a two-step process: the
//! [`grammar`] turns the [`Policy`] into snippet text, and [`wire`]
//! packs the answer type and snippet into `LUA` RDATA. Reading reverses
//! both steps, with the [`Variant`] of the record telling the grammar
//! which function shape to expect.

use std::fmt;
use std::str::FromStr;

use crate::rr::{Ttl, Type};

pub mod grammar;
pub mod wire;

pub use grammar::{EncodeError, MismatchError};

/// The health-check timeout (in seconds) of an `ifportup` policy when a
/// record definition does not give one.
pub const DEFAULT_TIMEOUT: u32 = 5;

/// The answer types an [`Entry`] may be written with.
pub const ANSWER_TYPES: [Type; 7] = [
    Type::A,
    Type::AAAA,
    Type::CNAME,
    Type::TXT,
    Type::PTR,
    Type::SOA,
    Type::LUA,
];

////////////////////////////////////////////////////////////////////////
// ENTRIES                                                            //
////////////////////////////////////////////////////////////////////////

/// One `LUA` record: the type of the answer it resolves to, its TTL,
/// and the policy computing the answer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    pub rr_type: Type,
    pub ttl: Ttl,
    pub policy: Policy,
}

impl Entry {
    pub fn new(rr_type: Type, ttl: Ttl, policy: Policy) -> Self {
        Self {
            rr_type,
            ttl,
            policy,
        }
    }

    /// Renders the Lua snippet for this entry. This fails if the answer
    /// type is not one of [`ANSWER_TYPES`] or the policy cannot be
    /// expressed in the snippet grammar.
    pub fn snippet(&self) -> Result<String, EncodeError> {
        if !ANSWER_TYPES.contains(&self.rr_type) {
            return Err(EncodeError::UnsupportedAnswerType(self.rr_type));
        }
        grammar::encode(&self.policy)
    }

    /// Reconstructs an entry from a snippet read back from a zone,
    /// parsing it as `variant`.
    pub fn from_snippet(
        rr_type: Type,
        ttl: Ttl,
        snippet: &str,
        variant: Variant,
    ) -> Result<Self, MismatchError> {
        Ok(Self {
            rr_type,
            ttl,
            policy: grammar::decode(variant, snippet)?,
        })
    }
}

////////////////////////////////////////////////////////////////////////
// POLICIES                                                           //
////////////////////////////////////////////////////////////////////////

/// The GSLB policy of an [`Entry`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Policy {
    /// An opaque Lua snippet, stored and returned unchanged.
    Raw(String),

    /// `pickrandom`: answer with one of the addresses, chosen uniformly
    /// at random.
    PickRandom { addresses: Vec<String> },

    /// `pickwrandom`: answer with one of the addresses, chosen at
    /// random in proportion to its weight.
    PickWeightedRandom { weighted: Vec<Weighted> },

    /// `ifportup`: answer with the addresses accepting TCP connections
    /// on `port` within `timeout` seconds.
    IfPortUp {
        port: u16,
        addresses: Vec<String>,
        timeout: u32,
    },

    /// `ifurlup`: answer with the primary addresses that serve `url`
    /// with a body containing `stringmatch`, falling back to the backup
    /// addresses when none do.
    IfUrlUp {
        url: String,
        primary: Vec<String>,
        backup: Vec<String>,
        stringmatch: String,
    },
}

impl Policy {
    /// Returns the variant of this policy.
    pub fn variant(&self) -> Variant {
        match self {
            Self::Raw(_) => Variant::Lua,
            Self::PickRandom { .. } => Variant::PickRandom,
            Self::PickWeightedRandom { .. } => Variant::PickWeightedRandom,
            Self::IfPortUp { .. } => Variant::IfPortUp,
            Self::IfUrlUp { .. } => Variant::IfUrlUp,
        }
    }
}

/// An address of a `pickwrandom` policy with its weight.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Weighted {
    pub weight: u32,
    pub address: String,
}

impl Weighted {
    pub fn new(weight: u32, address: impl Into<String>) -> Self {
        Self {
            weight,
            address: address.into(),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// VARIANTS                                                           //
////////////////////////////////////////////////////////////////////////

/// The kinds of record this crate manages. Records are read back as a
/// particular variant; snippets of any other shape are skipped.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Variant {
    Lua,
    PickRandom,
    PickWeightedRandom,
    IfPortUp,
    IfUrlUp,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Self::Lua,
        Self::PickRandom,
        Self::PickWeightedRandom,
        Self::IfPortUp,
        Self::IfUrlUp,
    ];

    /// Returns the name of the variant, which is also the name of the
    /// Lua function its snippets call (except for raw snippets).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lua => "lua",
            Self::PickRandom => "pickrandom",
            Self::PickWeightedRandom => "pickwrandom",
            Self::IfPortUp => "ifportup",
            Self::IfUrlUp => "ifurlup",
        }
    }
}

impl FromStr for Variant {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.as_str().eq_ignore_ascii_case(text))
            .ok_or("kind must be one of lua, pickrandom, pickwrandom, ifportup, ifurlup")
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
