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

//! Implementation of the [`Label`] type.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A borrowed view of a single label of a [`Name`](super::Name).
///
/// In accordance with RFC 1034 § 3.1 (clarified by RFC 4343),
/// comparison and hashing of `Label`s are ASCII-case-insensitive.
#[derive(Clone, Copy)]
pub struct Label<'a> {
    octets: &'a [u8],
}

impl<'a> Label<'a> {
    pub(super) fn new(octets: &'a [u8]) -> Self {
        Self { octets }
    }

    /// Returns whether this is the null label.
    pub fn is_null(&self) -> bool {
        self.octets.is_empty()
    }

    /// Returns the octets of this label (without the length octet).
    pub fn octets(&self) -> &'a [u8] {
        self.octets
    }
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for octet in self.octets {
            if *octet == b'.' {
                f.write_str("\\.")?;
            } else if *octet == b'\\' {
                f.write_str("\\\\")?;
            } else if octet.is_ascii_graphic() {
                write!(f, "{}", *octet as char)?;
            } else {
                write!(f, "\\{:03}", *octet)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

impl PartialEq for Label<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.octets.eq_ignore_ascii_case(other.octets)
    }
}

impl Eq for Label<'_> {}

impl Hash for Label<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.octets.len());
        for octet in self.octets {
            state.write_u8(octet.to_ascii_lowercase());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_ignores_case() {
        assert_eq!(Label::new(b"Example"), Label::new(b"eXAMPLE"));
        assert_ne!(Label::new(b"example"), Label::new(b"examples"));
    }

    #[test]
    fn display_escapes() {
        assert_eq!(Label::new(b"a.b\\c d").to_string(), "a\\.b\\\\c\\032d");
    }
}
