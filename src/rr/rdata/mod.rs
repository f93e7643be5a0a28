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

//! The [`Rdata`] type.

use std::fmt;

use super::Type;
use crate::name;

mod tsig;
pub use tsig::*;

////////////////////////////////////////////////////////////////////////
// RDATA TYPE                                                         //
////////////////////////////////////////////////////////////////////////

/// The largest RDATA that fits the 16-bit RDLENGTH field.
const MAX_RDATA_LEN: usize = u16::MAX as usize;

/// Record RDATA: a `[u8]` known to be at most 65,535 octets long.
///
/// Apart from TSIG, whose fields the transport interprets, RDATA is
/// opaque here and is displayed in the generic form of [RFC 3597]. The
/// private-use `LUA` type has no standard presentation format, so this
/// is also how its RDATA is shown.
///
/// [RFC 3597]: https://datatracker.ietf.org/doc/html/rfc3597
#[repr(transparent)]
pub struct Rdata {
    octets: [u8],
}

impl Rdata {
    /// Reinterprets `octets` without checking its length.
    fn from_unchecked(octets: &[u8]) -> &Self {
        // SAFETY: Rdata is a repr(transparent) wrapper over [u8].
        unsafe { &*(octets as *const [u8] as *const Self) }
    }

    /// Reinterprets boxed `octets` without checking its length.
    fn from_boxed_unchecked(octets: Box<[u8]>) -> Box<Self> {
        // SAFETY: as above.
        unsafe { Box::from_raw(Box::into_raw(octets) as *mut Self) }
    }

    /// RDATA of length zero, as carried by RRset deletions.
    pub fn empty() -> &'static Self {
        Self::from_unchecked(&[])
    }

    /// Reads `rdlength` octets of RDATA of type `rr_type` from `message`
    /// at `cursor`, failing with [`ReadRdataError::UnexpectedEom`] if the
    /// message is too short.
    ///
    /// Only TSIG RDATA is checked for form here, since the transport
    /// parses its fields. Everything else is passed through: `LUA`
    /// RDATA has its own codec and other types are skipped.
    pub fn read(
        rr_type: Type,
        message: &[u8],
        cursor: usize,
        rdlength: u16,
    ) -> Result<&Self, ReadRdataError> {
        let octets = message
            .get(cursor..cursor + rdlength as usize)
            .ok_or(ReadRdataError::UnexpectedEom)?;
        let rdata = Self::from_unchecked(octets);
        if rr_type == Type::TSIG {
            rdata.validate_as_tsig()?;
        }
        Ok(rdata)
    }

    pub fn is_empty(&self) -> bool {
        self.octets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.octets.len()
    }

    pub fn octets(&self) -> &[u8] {
        &self.octets
    }
}

impl<'a> TryFrom<&'a [u8]> for &'a Rdata {
    type Error = RdataTooLongError;

    fn try_from(octets: &'a [u8]) -> Result<Self, Self::Error> {
        if octets.len() <= MAX_RDATA_LEN {
            Ok(Rdata::from_unchecked(octets))
        } else {
            Err(RdataTooLongError)
        }
    }
}

impl<'a, const N: usize> TryFrom<&'a [u8; N]> for &'a Rdata {
    type Error = RdataTooLongError;

    fn try_from(octets: &'a [u8; N]) -> Result<Self, Self::Error> {
        octets.as_slice().try_into()
    }
}

impl TryFrom<Vec<u8>> for Box<Rdata> {
    type Error = RdataTooLongError;

    fn try_from(octets: Vec<u8>) -> Result<Self, Self::Error> {
        if octets.len() <= MAX_RDATA_LEN {
            Ok(Rdata::from_boxed_unchecked(octets.into_boxed_slice()))
        } else {
            Err(RdataTooLongError)
        }
    }
}

impl ToOwned for Rdata {
    type Owned = Box<Self>;

    fn to_owned(&self) -> Self::Owned {
        Self::from_boxed_unchecked(self.octets.into())
    }
}

impl Clone for Box<Rdata> {
    fn clone(&self) -> Self {
        (**self).to_owned()
    }
}

impl PartialEq for Rdata {
    fn eq(&self, other: &Self) -> bool {
        self.octets == other.octets
    }
}

impl Eq for Rdata {}

impl fmt::Display for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\\# {}", self.len())?;
        if !self.is_empty() {
            write!(f, " {}", hex::encode(&self.octets))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// The octets would not fit in an RDATA.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct RdataTooLongError;

impl fmt::Display for RdataTooLongError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("RDATA is too long")
    }
}

impl std::error::Error for RdataTooLongError {}

/// RDATA in a message was truncated or malformed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ReadRdataError {
    InvalidName(name::Error),
    UnexpectedEom,
    Other,
}

impl fmt::Display for ReadRdataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidName(err) => write!(f, "invalid embedded domain name: {}", err),
            Self::UnexpectedEom => f.write_str("unexpected end of message in RDATA"),
            Self::Other => f.write_str("invalid RDATA"),
        }
    }
}

impl std::error::Error for ReadRdataError {}

impl From<name::Error> for ReadRdataError {
    fn from(err: name::Error) -> Self {
        Self::InvalidName(err)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
