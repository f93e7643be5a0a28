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

//! TSIG RDATA construction and validation ([RFC 8945]).
//!
//! [RFC 8945]: https://datatracker.ietf.org/doc/html/rfc8945

use std::fmt;
use std::time::SystemTime;

use super::{Rdata, RdataTooLongError, ReadRdataError};
use crate::message::ExtendedRcode;
use crate::name::Name;

////////////////////////////////////////////////////////////////////////
// RFC 8945 - TSIG PSEUDO-RR                                          //
////////////////////////////////////////////////////////////////////////

/// Octets in a TSIG RDATA besides the algorithm name, MAC, and other
/// data: time signed (6), fudge, MAC size, original ID, error, and
/// other length (2 each).
const FIXED_LEN: usize = 16;

/// Returns the size of a TSIG RDATA with the given variable-length
/// fields, or an error if it would not fit in an RDATA.
fn required_len(algorithm: &Name, mac: &[u8], other: &[u8]) -> Result<usize, RdataTooLongError> {
    [mac.len(), other.len()]
        .into_iter()
        .try_fold(algorithm.wire_repr().len() + FIXED_LEN, usize::checked_add)
        .filter(|&len| len <= u16::MAX as usize)
        .ok_or(RdataTooLongError)
}

/// Reads the big-endian `u16` at `offset`, if there is one.
fn u16_at(octets: &[u8], offset: usize) -> Option<usize> {
    let field = octets.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([field[0], field[1]]) as usize)
}

impl Rdata {
    /// Builds TSIG RDATA from its fields.
    pub fn new_tsig(
        algorithm: &Name,
        time_signed: TimeSigned,
        fudge: u16,
        mac: &[u8],
        original_id: u16,
        error: ExtendedRcode,
        other: &[u8],
    ) -> Result<Box<Self>, RdataTooLongError> {
        let mut buf = Vec::with_capacity(required_len(algorithm, mac, other)?);
        buf.extend_from_slice(algorithm.wire_repr());
        buf.extend_from_slice(time_signed.as_slice());
        buf.extend_from_slice(&fudge.to_be_bytes());
        buf.extend_from_slice(&(mac.len() as u16).to_be_bytes());
        buf.extend_from_slice(mac);
        buf.extend_from_slice(&original_id.to_be_bytes());
        buf.extend_from_slice(&u16::from(error).to_be_bytes());
        buf.extend_from_slice(&(other.len() as u16).to_be_bytes());
        buf.extend_from_slice(other);
        buf.try_into()
    }

    /// Checks that this RDATA has the shape of a TSIG RDATA: a valid
    /// algorithm name followed by fields whose declared lengths add up
    /// to the RDATA length. No cryptography happens here.
    pub fn validate_as_tsig(&self) -> Result<(), ReadRdataError> {
        let octets = &self.octets;
        let algorithm_len = Name::validate_uncompressed(octets)?;
        let mac_size = u16_at(octets, algorithm_len + 8).ok_or(ReadRdataError::Other)?;
        let other_len =
            u16_at(octets, algorithm_len + mac_size + 14).ok_or(ReadRdataError::Other)?;
        if algorithm_len + mac_size + other_len + FIXED_LEN == octets.len() {
            Ok(())
        } else {
            Err(ReadRdataError::Other)
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TSIG TIME-SIGNED FIELD                                             //
////////////////////////////////////////////////////////////////////////

/// The TSIG "time signed" field: Unix time as an unsigned 48-bit
/// big-endian integer, which is also the internal representation.
///
/// Conversion from [`SystemTime`] assumes that the platform clock does
/// not count leap seconds. Even where it does, the standard fudge of 300
/// seconds absorbs the difference.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct TimeSigned([u8; 6]);

impl TimeSigned {
    /// Fails if `seconds` does not fit in 48 bits.
    pub fn try_from_unix_time(seconds: u64) -> Result<Self, UnrepresentableTimeError> {
        match seconds.to_be_bytes() {
            [0, 0, rest @ ..] => Ok(Self(rest)),
            _ => Err(UnrepresentableTimeError),
        }
    }

    pub fn to_unix_time(self) -> u64 {
        let [a, b, c, d, e, f] = self.0;
        u64::from_be_bytes([0, 0, a, b, c, d, e, f])
    }

    /// The field as it appears on the wire.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 6]> for TimeSigned {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl TryFrom<SystemTime> for TimeSigned {
    type Error = UnrepresentableTimeError;

    fn try_from(system_time: SystemTime) -> Result<Self, Self::Error> {
        let since_epoch = system_time
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(|_| UnrepresentableTimeError)?;
        Self::try_from_unix_time(since_epoch.as_secs())
    }
}

impl fmt::Debug for TimeSigned {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_unix_time())
    }
}

/// The current time cannot be expressed as a TSIG "time signed" value.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct UnrepresentableTimeError;

impl fmt::Display for UnrepresentableTimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("time is outside the range of the TSIG time signed field")
    }
}

impl std::error::Error for UnrepresentableTimeError {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_static::lazy_static;

    const TSIG_RDATA: &[u8] = b"\
        \x0b\x68\x6d\x61\x63\x2d\x73\x68\x61\x32\x35\x36\x00\x00\x00\x63\
        \x29\x12\xb4\x01\x2c\x00\x20\xfe\x60\x1b\xa4\xb2\x4a\x33\x48\xd3\
        \x47\xe4\x4e\x8e\x02\xdf\x7b\x83\xf1\xee\x38\xea\x05\x3e\xde\xe8\
        \xb0\x8e\x26\x52\x46\xda\xf4\xab\x97\x00\x00\x00\x0f\x73\x6f\x6d\
        \x65\x20\x6f\x74\x68\x65\x72\x20\x64\x61\x74\x61";

    lazy_static! {
        static ref ALGORITHM: Name = "hmac-sha256.".parse().unwrap();
        static ref TIME_SIGNED: TimeSigned = TimeSigned::try_from_unix_time(0x632912b4).unwrap();
    }
    const FUDGE: u16 = 300;
    const MAC: &[u8] = b"\
        \xfe\x60\x1b\xa4\xb2\x4a\x33\x48\xd3\x47\xe4\x4e\x8e\x02\xdf\x7b\
        \x83\xf1\xee\x38\xea\x05\x3e\xde\xe8\xb0\x8e\x26\x52\x46\xda\xf4";
    const ORIGINAL_ID: u16 = 0xab97;
    const ERROR: ExtendedRcode = ExtendedRcode::NOERROR;
    const OTHER: &[u8] = b"some other data";

    #[test]
    fn serialization_works() {
        let tsig_rdata = Rdata::new_tsig(
            &ALGORITHM,
            *TIME_SIGNED,
            FUDGE,
            MAC,
            ORIGINAL_ID,
            ERROR,
            OTHER,
        )
        .unwrap();
        assert_eq!(tsig_rdata.octets(), TSIG_RDATA);
    }

    #[test]
    fn required_len_works() {
        assert_eq!(
            required_len(&ALGORITHM, MAC, OTHER).unwrap(),
            TSIG_RDATA.len()
        );
    }

    #[test]
    fn new_refuses_to_create_long_rdata() {
        assert_eq!(
            Rdata::new_tsig(
                &ALGORITHM,
                *TIME_SIGNED,
                FUDGE,
                &[0; 65492],
                ORIGINAL_ID,
                ERROR,
                OTHER
            )
            .unwrap_err(),
            RdataTooLongError
        );
    }

    #[test]
    fn validation_works() {
        assert_eq!(
            <&Rdata>::try_from(TSIG_RDATA).unwrap().validate_as_tsig(),
            Ok(()),
        );
    }

    #[test]
    fn validation_rejects_length_mismatch() {
        let truncated = &TSIG_RDATA[..TSIG_RDATA.len() - 1];
        assert_eq!(
            <&Rdata>::try_from(truncated).unwrap().validate_as_tsig(),
            Err(ReadRdataError::Other),
        );
        let mut extended = TSIG_RDATA.to_vec();
        extended.push(0);
        assert_eq!(
            <&Rdata>::try_from(&extended[..]).unwrap().validate_as_tsig(),
            Err(ReadRdataError::Other),
        );
    }

    #[test]
    fn time_signed_conversions_work() {
        assert_eq!(TIME_SIGNED.to_unix_time(), 0x632912b4);
        assert_eq!(TIME_SIGNED.as_slice(), b"\x00\x00\x63\x29\x12\xb4");
        assert!(TimeSigned::try_from_unix_time(1 << 48).is_err());
        let before_epoch = SystemTime::UNIX_EPOCH - std::time::Duration::from_secs(1);
        assert!(TimeSigned::try_from(before_epoch).is_err());
        assert_eq!(
            TimeSigned::from(*b"\x00\x00\x63\x29\x12\xb4"),
            *TIME_SIGNED
        );
    }
}
