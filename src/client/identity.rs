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

//! Owner identities of GSLB records.

use std::fmt;
use std::str::FromStr;

use crate::name::{self, Name, NameBuilder};

/// The fully-qualified owner name of a GSLB record, split into its
/// leftmost label (the record `name`) and the zone holding it.
///
/// ```
/// use pdnsgslb::client::Identity;
///
/// let identity: Identity = "www.gslb.example.".parse().unwrap();
/// assert_eq!(identity.name(), "www");
/// assert_eq!(identity.zone().to_string(), "gslb.example.");
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Identity {
    owner: Name,
    zone: Name,
}

impl Identity {
    /// Builds the identity `name.zone`, where `name` is a single label
    /// and `zone` is fully qualified.
    pub fn from_parts(name: &str, zone: &str) -> Result<Self, IdentityError> {
        let zone: Name = zone.parse().map_err(IdentityError::from)?;
        let mut builder = NameBuilder::new();
        for &octet in name.as_bytes() {
            if octet == b'.' {
                return Err(IdentityError::NotSingleLabel);
            }
            builder.try_push(octet).map_err(IdentityError::Invalid)?;
        }
        let owner = builder
            .finish_with_suffix(&zone)
            .map_err(IdentityError::Invalid)?;
        Self::try_from(owner)
    }

    /// The full owner name.
    pub fn owner(&self) -> &Name {
        &self.owner
    }

    /// The zone of the record: the owner name without its leftmost
    /// label.
    pub fn zone(&self) -> &Name {
        &self.zone
    }

    /// The leftmost label of the owner name, as text.
    pub fn name(&self) -> String {
        self.owner
            .label(0)
            .map(|label| label.to_string())
            .unwrap_or_default()
    }
}

impl TryFrom<Name> for Identity {
    type Error = IdentityError;

    fn try_from(owner: Name) -> Result<Self, Self::Error> {
        match owner.superdomain(1) {
            Some(zone) if !owner.is_root() => Ok(Self { owner, zone }),
            _ => Err(IdentityError::Root),
        }
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let owner: Name = text.parse()?;
        Self::try_from(owner)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.owner, f)
    }
}

/// An error signaling that text does not name a valid record identity.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum IdentityError {
    /// The name is not fully qualified (it lacks the trailing dot).
    NotFullyQualified,

    /// The record name part spans more than one label.
    NotSingleLabel,

    /// The root name has no leftmost label to use as the record name.
    Root,

    /// The text is not a valid domain name.
    Invalid(name::Error),
}

impl From<name::Error> for IdentityError {
    fn from(error: name::Error) -> Self {
        match error {
            name::Error::NonNullTerminal => Self::NotFullyQualified,
            other => Self::Invalid(other),
        }
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotFullyQualified => f.write_str("name is not fully qualified"),
            Self::NotSingleLabel => f.write_str("record name must be a single label"),
            Self::Root => f.write_str("the root name cannot identify a record"),
            Self::Invalid(_) => f.write_str("invalid domain name"),
        }
    }
}

impl std::error::Error for IdentityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_splits_owner() {
        let identity: Identity = "pool.gslb.example.test.".parse().unwrap();
        assert_eq!(identity.name(), "pool");
        assert_eq!(identity.zone(), &"gslb.example.test.".parse::<Name>().unwrap());
        assert_eq!(identity.to_string(), "pool.gslb.example.test.");
    }

    #[test]
    fn identity_from_parts_matches_parsed() {
        let from_parts = Identity::from_parts("pool", "gslb.example.test.").unwrap();
        assert_eq!(from_parts, "pool.gslb.example.test.".parse().unwrap());
        assert_eq!(
            Identity::from_parts("a.b", "example."),
            Err(IdentityError::NotSingleLabel)
        );
        assert_eq!(
            Identity::from_parts("pool", "example"),
            Err(IdentityError::NotFullyQualified)
        );
    }

    #[test]
    fn identity_rejects_non_fqdn() {
        assert_eq!(
            "not-an-fqdn".parse::<Identity>(),
            Err(IdentityError::NotFullyQualified)
        );
        assert_eq!(".".parse::<Identity>(), Err(IdentityError::Root));
        assert_eq!(
            "".parse::<Identity>(),
            Err(IdentityError::Invalid(name::Error::StrEmpty))
        );
    }

    #[test]
    fn top_level_names_have_the_root_zone() {
        let identity: Identity = "test.".parse().unwrap();
        assert!(identity.zone().is_root());
    }
}
