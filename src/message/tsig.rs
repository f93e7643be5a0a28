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

//! TSIG message authentication ([RFC 8945]).
//!
//! To verify, convert the last [`ReadRr`] of a message into a
//! [`ReadTsigRr`] and call one of its `verify_*` methods. To sign, hand
//! a [`PreparedTsigRr`] to [`Writer::set_tsig`](super::Writer::set_tsig);
//! the writer calls the matching `sign_*` method when the message is
//! finished.
//!
//! A client signs requests and verifies responses; the opposite
//! direction (verifying requests and signing responses) is provided as
//! well so that both ends of an exchange can be exercised in-process.
//!
//! Multi-message responses such as AXFR follow [RFC 8945 § 5.3.1]: the
//! first message is signed like any other response, and each later
//! signed message covers the prior MAC, any unsigned messages in
//! between, and the TSIG timers only.
//!
//! Supported algorithms are represented by the [`Algorithm`]
//! enumeration: HMAC-MD5, HMAC-SHA1, HMAC-SHA256, and HMAC-SHA512.
//!
//! [RFC 8945]: https://datatracker.ietf.org/doc/html/rfc8945
//! [RFC 8945 § 5.3.1]: https://datatracker.ietf.org/doc/html/rfc8945#section-5.3.1

use std::fmt;
use std::str::FromStr;

use hmac::digest::{MacError, OutputSizeUser};
use hmac::{Hmac, Mac};
use lazy_static::lazy_static;
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::class::Class;
use crate::name::Name;
use crate::rr::rdata::TimeSigned;
use crate::rr::{Rdata, Ttl, Type};

use super::constants::*;
use super::reader::ReadRr;
use super::ExtendedRcode;

/// The fudge value (in seconds) recommended by [RFC 8945 § 10].
///
/// [RFC 8945 § 10]: https://datatracker.ietf.org/doc/html/rfc8945#section-10
pub const DEFAULT_FUDGE: u16 = 300;

/// The maximum number of consecutive unsigned messages allowed in a
/// multi-message response ([RFC 8945 § 5.3.1]).
///
/// [RFC 8945 § 5.3.1]: https://datatracker.ietf.org/doc/html/rfc8945#section-5.3.1
pub const MAX_UNSIGNED_MESSAGES: usize = 99;

////////////////////////////////////////////////////////////////////////
// TSIG ALGORITHMS                                                    //
////////////////////////////////////////////////////////////////////////

lazy_static! {
    static ref HMAC_MD5_NAME: Name = "hmac-md5.sig-alg.reg.int."
        .parse()
        .expect("HMAC-MD5 algorithm name is valid");
    static ref HMAC_SHA1_NAME: Name = "hmac-sha1."
        .parse()
        .expect("HMAC-SHA1 algorithm name is valid");
    static ref HMAC_SHA256_NAME: Name = "hmac-sha256."
        .parse()
        .expect("HMAC-SHA256 algorithm name is valid");
    static ref HMAC_SHA512_NAME: Name = "hmac-sha512."
        .parse()
        .expect("HMAC-SHA512 algorithm name is valid");
}

/// A supported TSIG algorithm.
///
/// Besides the two algorithms required by [RFC 8945 § 6] (HMAC-SHA1
/// and HMAC-SHA256), HMAC-MD5 and HMAC-SHA512 are implemented, since
/// existing PowerDNS and BIND deployments commonly use them.
///
/// [RFC 8945 § 6]: https://datatracker.ietf.org/doc/html/rfc8945#section-6
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Algorithm {
    HmacMd5,
    HmacSha1,
    HmacSha256,
    HmacSha512,
}

impl Algorithm {
    /// Returns the name assigned (by [RFC 8945 § 6]) to identify this
    /// algorithm.
    ///
    /// [RFC 8945 § 6]: https://datatracker.ietf.org/doc/html/rfc8945#section-6
    pub fn name(&self) -> &'static Name {
        match self {
            Self::HmacMd5 => &HMAC_MD5_NAME,
            Self::HmacSha1 => &HMAC_SHA1_NAME,
            Self::HmacSha256 => &HMAC_SHA256_NAME,
            Self::HmacSha512 => &HMAC_SHA512_NAME,
        }
    }

    /// Returns the size of the MAC produced by this algorithm.
    pub fn output_size(&self) -> usize {
        match self {
            Self::HmacMd5 => Hmac::<Md5>::output_size(),
            Self::HmacSha1 => Hmac::<Sha1>::output_size(),
            Self::HmacSha256 => Hmac::<Sha256>::output_size(),
            Self::HmacSha512 => Hmac::<Sha512>::output_size(),
        }
    }

    /// Creates a MAC authenticator to compute a MAC with this algorithm
    /// and the given key.
    fn make_authenticator(&self, key: &[u8]) -> Box<dyn Authenticator> {
        const ANY_KEY_LEN: &str = "HMAC accepts keys of any length";
        match self {
            Self::HmacMd5 => Box::new(Hmac::<Md5>::new_from_slice(key).expect(ANY_KEY_LEN)),
            Self::HmacSha1 => Box::new(Hmac::<Sha1>::new_from_slice(key).expect(ANY_KEY_LEN)),
            Self::HmacSha256 => Box::new(Hmac::<Sha256>::new_from_slice(key).expect(ANY_KEY_LEN)),
            Self::HmacSha512 => Box::new(Hmac::<Sha512>::new_from_slice(key).expect(ANY_KEY_LEN)),
        }
    }
}

/// Parses the configuration names `hmac-md5`, `hmac-sha1`,
/// `hmac-sha256`, and `hmac-sha512` (case-insensitively, with or
/// without a trailing dot), as well as the full RFC 8945 algorithm
/// names.
impl FromStr for Algorithm {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.strip_suffix('.').unwrap_or(text);
        match text.to_ascii_lowercase().as_str() {
            "hmac-md5" | "hmac-md5.sig-alg.reg.int" => Ok(Self::HmacMd5),
            "hmac-sha1" => Ok(Self::HmacSha1),
            "hmac-sha256" => Ok(Self::HmacSha256),
            "hmac-sha512" => Ok(Self::HmacSha512),
            _ => Err("unsupported TSIG algorithm"),
        }
    }
}

/// Displays the short configuration name of the algorithm.
impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::HmacMd5 => f.write_str("hmac-md5"),
            Self::HmacSha1 => f.write_str("hmac-sha1"),
            Self::HmacSha256 => f.write_str("hmac-sha256"),
            Self::HmacSha512 => f.write_str("hmac-sha512"),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TSIG SIGNING AND VERIFICATION HELPERS                              //
////////////////////////////////////////////////////////////////////////

/// An abstraction over different MAC implementations. Basically, this
/// wraps the `digest` crate's [`Mac`] trait to give us an object-safe
/// trait (so that we can use `Box<dyn Authenticator>`).
trait Authenticator {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> Box<[u8]>;
    fn verify_truncated_left(self: Box<Self>, tag: &[u8]) -> Result<(), MacError>;
}

impl<M> Authenticator for M
where
    M: Mac,
{
    fn update(&mut self, data: &[u8]) {
        <Self as Mac>::update(self, data);
    }

    fn finalize(self: Box<Self>) -> Box<[u8]> {
        <Self as Mac>::finalize(*self)
            .into_bytes()
            .to_vec()
            .into_boxed_slice()
    }

    fn verify_truncated_left(self: Box<Self>, tag: &[u8]) -> Result<(), MacError> {
        <Self as Mac>::verify_truncated_left(*self, tag)
    }
}

/// An abstraction over data structures that provide the TSIG variables
/// that, per [RFC 8945 § 4.3.3], must be added to the MAC. This allows
/// us to use the same helper functions for verifying and signing.
///
/// [RFC 8945 § 4.3.3]: https://datatracker.ietf.org/doc/html/rfc8945#section-4.3.3
trait Variables {
    fn key_name(&self) -> &Name;
    fn algorithm(&self) -> &Name;
    fn time_signed(&self) -> TimeSigned;
    fn fudge(&self) -> u16;
    fn original_id(&self) -> u16;
    fn error(&self) -> ExtendedRcode;
    fn other(&self) -> &[u8];
}

/// What precedes the message itself in the MAC input.
#[derive(Clone, Copy)]
enum Prelude<'a> {
    /// A request: nothing.
    None,

    /// A response, or a subsequent message of a multi-message response:
    /// the request MAC or prior MAC, followed by any unsigned messages
    /// received since that MAC.
    PriorMac(&'a [u8], &'a [Box<[u8]>]),
}

/// Which TSIG variables follow the message in the MAC input.
#[derive(Clone, Copy, Eq, PartialEq)]
enum Coverage {
    /// All TSIG variables ([RFC 8945 § 4.3.3]).
    ///
    /// [RFC 8945 § 4.3.3]: https://datatracker.ietf.org/doc/html/rfc8945#section-4.3.3
    AllVariables,

    /// The TSIG timers only ([RFC 8945 § 5.3.1]).
    ///
    /// [RFC 8945 § 5.3.1]: https://datatracker.ietf.org/doc/html/rfc8945#section-5.3.1
    TimersOnly,
}

/// Feeds the full MAC input for `message` (the message up to, but not
/// including, its TSIG RR) into `authenticator`.
fn add_mac_input<V>(
    authenticator: &mut dyn Authenticator,
    prelude: Prelude,
    message: &[u8],
    coverage: Coverage,
    vars: &V,
) where
    V: Variables,
{
    if let Prelude::PriorMac(mac, unsigned_messages) = prelude {
        authenticator.update(&(mac.len() as u16).to_be_bytes());
        authenticator.update(mac);
        for unsigned in unsigned_messages {
            authenticator.update(unsigned);
        }
    }
    add_modified_message(authenticator, message, vars.original_id());
    match coverage {
        Coverage::AllVariables => add_tsig_variables(authenticator, vars),
        Coverage::TimersOnly => add_tsig_timers(authenticator, vars),
    }
}

/// Adds the given message to a MAC, decrementing the ARCOUNT and
/// restoring the original message ID first (in accordance with
/// [RFC 8945 § 4.3.2]).
///
/// [RFC 8945 § 4.3.2]: https://datatracker.ietf.org/doc/html/rfc8945#section-4.3.2
fn add_modified_message(authenticator: &mut dyn Authenticator, message: &[u8], original_id: u16) {
    authenticator.update(&original_id.to_be_bytes());
    authenticator.update(&message[ID_END..ARCOUNT_START]);
    let arcount = u16::from_be_bytes([message[ARCOUNT_START], message[ARCOUNT_START + 1]]);
    authenticator.update(&arcount.saturating_sub(1).to_be_bytes());
    authenticator.update(&message[ARCOUNT_END..]);
}

/// Adds the TSIG variables specified by [RFC 8945 § 4.3.3] to a MAC.
///
/// [RFC 8945 § 4.3.3]: https://datatracker.ietf.org/doc/html/rfc8945#section-4.3.3
fn add_tsig_variables<V>(authenticator: &mut dyn Authenticator, vars: &V)
where
    V: Variables,
{
    authenticator.update(vars.key_name().wire_repr());
    authenticator.update(b"\x00\xff\x00\x00\x00\x00");
    authenticator.update(vars.algorithm().wire_repr());
    add_tsig_timers(authenticator, vars);
    authenticator.update(&u16::from(vars.error()).to_be_bytes());
    let other = vars.other();
    authenticator.update(&(other.len() as u16).to_be_bytes());
    authenticator.update(other);
}

/// Adds the TSIG timers specified by [RFC 8945 § 4.3.3.1] to a MAC.
///
/// [RFC 8945 § 4.3.3.1]: https://datatracker.ietf.org/doc/html/rfc8945#section-4.3.3.1
fn add_tsig_timers<V>(authenticator: &mut dyn Authenticator, vars: &V)
where
    V: Variables,
{
    authenticator.update(vars.time_signed().as_slice());
    authenticator.update(&vars.fudge().to_be_bytes());
}

////////////////////////////////////////////////////////////////////////
// TSIG READING/VERIFICATION                                          //
////////////////////////////////////////////////////////////////////////

/// A TSIG RR that has been read from a message.
///
/// A [`ReadTsigRr`] is produced by converting a [`ReadRr`] obtained
/// from a [`Reader`](super::Reader) with [`ReadTsigRr::try_from`]. It
/// provides methods to access TSIG fields from the underlying [`Rdata`]
/// and additionally implements TSIG verification through its
/// `verify_*` methods.
#[derive(Clone)]
pub struct ReadTsigRr<'a> {
    key_name: Name,
    algorithm: Name,
    mac_size: u16,
    rdata: &'a Rdata,
}

impl<'a> TryFrom<ReadRr<'a>> for ReadTsigRr<'a> {
    type Error = FromReadRrError;

    fn try_from(rr: ReadRr<'a>) -> Result<Self, Self::Error> {
        if rr.rr_type != Type::TSIG {
            return Err(FromReadRrError::NotTsig);
        } else if rr.class != Class::ANY || rr.ttl != Ttl::ZERO {
            return Err(FromReadRrError::FormErr);
        }

        // The Reader has already validated TSIG RDATA, but we don't
        // rely on that to avoid panicking.
        let rdata = rr.rdata.octets();
        let (algorithm, algo_len) =
            Name::try_from_uncompressed(rdata).or(Err(FromReadRrError::FormErr))?;
        let mac_size = match rdata.get(algo_len + 8..algo_len + 10) {
            Some(&[a, b]) => u16::from_be_bytes([a, b]),
            _ => return Err(FromReadRrError::FormErr),
        };
        if rdata.len() < algo_len + mac_size as usize + 16 {
            return Err(FromReadRrError::FormErr);
        }

        Ok(Self {
            key_name: rr.owner,
            algorithm,
            mac_size,
            rdata: rr.rdata,
        })
    }
}

impl ReadTsigRr<'_> {
    /// Reads a 16-bit field at `offset` octets past the algorithm name
    /// and `skip_mac` (if set) the MAC.
    fn u16_field(&self, offset: usize, skip_mac: bool) -> u16 {
        let mut start = self.algorithm.wire_repr().len() + offset;
        if skip_mac {
            start += self.mac_size as usize;
        }
        let octets = self.rdata.octets();
        u16::from_be_bytes([octets[start], octets[start + 1]])
    }

    /// Returns the key name specified by the TSIG RR.
    pub fn key_name(&self) -> &Name {
        &self.key_name
    }

    /// Returns the algorithm name specified by the TSIG RR.
    pub fn algorithm(&self) -> &Name {
        &self.algorithm
    }

    /// Returns the time at which the TSIG RR was signed.
    pub fn time_signed(&self) -> TimeSigned {
        let algo_len = self.algorithm.wire_repr().len();
        let mut array = [0; 6];
        array.copy_from_slice(&self.rdata.octets()[algo_len..algo_len + 6]);
        TimeSigned::from(array)
    }

    /// Returns the fudge field (in seconds) of the TSIG RR.
    pub fn fudge(&self) -> u16 {
        self.u16_field(6, false)
    }

    /// Returns the MAC of the TSIG RR.
    pub fn mac(&self) -> &[u8] {
        let algo_len = self.algorithm.wire_repr().len();
        let mac_size = self.mac_size as usize;
        &self.rdata.octets()[algo_len + 10..algo_len + mac_size + 10]
    }

    /// Returns the original message ID of the TSIG RR.
    pub fn original_id(&self) -> u16 {
        self.u16_field(10, true)
    }

    /// Returns the error field of the TSIG RR.
    pub fn error(&self) -> ExtendedRcode {
        ExtendedRcode::from(self.u16_field(12, true))
    }

    /// Returns the "other data" field of the TSIG RR.
    pub fn other(&self) -> &[u8] {
        let algo_len = self.algorithm.wire_repr().len();
        let mac_size = self.mac_size as usize;
        &self.rdata.octets()[algo_len + mac_size + 16..]
    }

    /// Verifies a request. `message` runs up to the start of the TSIG
    /// RR; the ARCOUNT and ID adjustments of [RFC 8945 § 4.3.2] are
    /// applied here.
    ///
    /// [RFC 8945 § 4.3.2]: https://datatracker.ietf.org/doc/html/rfc8945#section-4.3.2
    pub fn verify_request(
        &self,
        message: &[u8],
        algorithm: Algorithm,
        key: &[u8],
        now: TimeSigned,
    ) -> Result<(), VerificationError> {
        self.verification_core(
            Prelude::None,
            message,
            Coverage::AllVariables,
            algorithm,
            key,
            now,
        )
    }

    /// Verifies a response, or the first message of a multi-message
    /// response, against the MAC of the request.
    pub fn verify_response(
        &self,
        message: &[u8],
        request_mac: &[u8],
        algorithm: Algorithm,
        key: &[u8],
        now: TimeSigned,
    ) -> Result<(), VerificationError> {
        self.verification_core(
            Prelude::PriorMac(request_mac, &[]),
            message,
            Coverage::AllVariables,
            algorithm,
            key,
            now,
        )
    }

    /// Verifies a signed message after the first in a multi-message
    /// response. `prior_mac` is the MAC of the previous signed message,
    /// and `unsigned_messages` holds the complete unsigned messages
    /// received since then, in order.
    pub fn verify_subsequent(
        &self,
        message: &[u8],
        prior_mac: &[u8],
        unsigned_messages: &[Box<[u8]>],
        algorithm: Algorithm,
        key: &[u8],
        now: TimeSigned,
    ) -> Result<(), VerificationError> {
        self.verification_core(
            Prelude::PriorMac(prior_mac, unsigned_messages),
            message,
            Coverage::TimersOnly,
            algorithm,
            key,
            now,
        )
    }

    /// The internal core implementation of TSIG message verification.
    fn verification_core(
        &self,
        prelude: Prelude,
        message: &[u8],
        coverage: Coverage,
        algorithm: Algorithm,
        key: &[u8],
        now: TimeSigned,
    ) -> Result<(), VerificationError> {
        // Ensure that the algorithm the caller expects is actually the
        // algorithm used to sign.
        if self.algorithm() != algorithm.name() {
            return Err(VerificationError::BadKey);
        }

        // Ensure that any MAC truncation applied meets RFC 8945
        // § 5.2.2.1's minimum requirements.
        check_mac_size(algorithm, self.mac_size)?;

        // RFC 8945 § 5.2.2: verify the MAC.
        let mut authenticator = algorithm.make_authenticator(key);
        add_mac_input(authenticator.as_mut(), prelude, message, coverage, self);
        authenticator
            .verify_truncated_left(self.mac())
            .or(Err(VerificationError::BadSig))?;

        // RFC 8945 § 5.2.3: ensure that the time signed is close enough
        // to our time.
        check_time(self.time_signed(), self.fudge(), now)
    }
}

/// Ensures that the MAC size is acceptable, per [RFC 8945 § 5.2.2.1].
///
/// [RFC 8945 § 5.2.2.1]: https://datatracker.ietf.org/doc/html/rfc8945#section-5.2.2.1
fn check_mac_size(algorithm: Algorithm, mac_size: u16) -> Result<(), VerificationError> {
    let mac_size = mac_size as usize;
    let half_output_size = (algorithm.output_size() + 1) / 2;
    if mac_size > algorithm.output_size() || mac_size < 10.max(half_output_size) {
        Err(VerificationError::FormErr)
    } else {
        Ok(())
    }
}

/// Checks that `time_signed` does not deviate more than `fudge` seconds
/// from the "current" time (specified by `now`).
fn check_time(
    time_signed: TimeSigned,
    fudge: u16,
    now: TimeSigned,
) -> Result<(), VerificationError> {
    let time_signed_unix = time_signed.to_unix_time();
    let now_unix = now.to_unix_time();
    let time_window_start = time_signed_unix.saturating_sub(fudge as u64);
    let time_window_end = time_signed_unix.saturating_add(fudge as u64);

    if now_unix >= time_window_start && now_unix <= time_window_end {
        Ok(())
    } else {
        Err(VerificationError::BadTime)
    }
}

impl Variables for ReadTsigRr<'_> {
    fn key_name(&self) -> &Name {
        self.key_name()
    }

    fn algorithm(&self) -> &Name {
        self.algorithm()
    }

    fn time_signed(&self) -> TimeSigned {
        self.time_signed()
    }

    fn fudge(&self) -> u16 {
        self.fudge()
    }

    fn original_id(&self) -> u16 {
        self.original_id()
    }

    fn error(&self) -> ExtendedRcode {
        self.error()
    }

    fn other(&self) -> &[u8] {
        self.other()
    }
}

impl fmt::Debug for ReadTsigRr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ReadTsigRr")
            .field("key_name", &self.key_name())
            .field("algorithm", &self.algorithm())
            .field("time_signed", &self.time_signed())
            .field("fudge", &self.fudge())
            .field("mac", &self.mac())
            .field("original_id", &self.original_id())
            .field("error", &self.error())
            .field("other", &self.other())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////
// TSIG WRITING/SIGNING                                               //
////////////////////////////////////////////////////////////////////////

/// A TSIG RR that has been prepared for serialization.
///
/// This structure specifies TSIG fields other than the signing
/// algorithm and MAC. For a request, the fields are filled in with
/// [`PreparedTsigRr::new`]; for a response, they can be taken from the
/// [`ReadTsigRr`] of the request with [`PreparedTsigRr::new_from_read`].
/// (Note that the [`PreparedTsigRr::server_time`] is ignored unless the
/// error is [`ExtendedRcode::BADTIME`].)
///
/// When a message is complete, a [`PreparedTsigRr`] can be used to sign
/// it through its `sign_*` methods. Given the required digest
/// components, an algorithm, and a key, these compute the MAC and then
/// serialize TSIG [`Rdata`] from the structure's fields and the MAC.
/// For unsigned TSIG records, [`PreparedTsigRr::unsigned`] produces
/// [`Rdata`] from the structure's fields and an empty MAC.
#[derive(Debug, Clone)]
pub struct PreparedTsigRr {
    pub key_name: Name,
    pub time_signed: TimeSigned,
    pub fudge: u16,
    pub original_id: u16,
    pub error: ExtendedRcode,
    pub server_time: TimeSigned,
}

impl PreparedTsigRr {
    /// Creates a `PreparedTsigRr` for a request with message ID `id`.
    pub fn new(key_name: Name, time_signed: TimeSigned, fudge: u16, id: u16) -> Self {
        Self {
            key_name,
            time_signed,
            fudge,
            original_id: id,
            error: ExtendedRcode::NOERROR,
            server_time: time_signed,
        }
    }

    /// Creates a `PreparedTsigRr` for a response by combining fields
    /// from a [`ReadTsigRr`] from the request and the provided
    /// arguments.
    ///
    /// If the error is [`ExtendedRcode::BADTIME`], then per
    /// [RFC 8945 § 5.2.3], the time signed field is taken from the
    /// request and the `time_signed` argument is placed in the
    /// `server_time` field.
    ///
    /// [RFC 8945 § 5.2.3]: https://datatracker.ietf.org/doc/html/rfc8945#section-5.2.3
    pub fn new_from_read(
        read: &ReadTsigRr,
        time_signed: TimeSigned,
        fudge: u16,
        error: ExtendedRcode,
    ) -> Self {
        let (time_signed, server_time) = if error == ExtendedRcode::BADTIME {
            (read.time_signed(), time_signed)
        } else {
            (time_signed, time_signed)
        };
        Self {
            key_name: read.key_name.clone(),
            time_signed,
            fudge,
            original_id: read.original_id(),
            error,
            server_time,
        }
    }

    /// Signs a request, returning the TSIG RDATA and the MAC.
    ///
    /// `message` runs up to the start of the TSIG RR, with its ARCOUNT
    /// already counting the TSIG RR.
    pub fn sign_request(
        &self,
        message: &[u8],
        algorithm: Algorithm,
        key: &[u8],
    ) -> (Box<Rdata>, Box<[u8]>) {
        self.sign(
            Prelude::None,
            message,
            Coverage::AllVariables,
            algorithm,
            key,
        )
    }

    /// Signs the given response message (or the first message of a
    /// multi-message response), covering the request MAC.
    pub fn sign_response(
        &self,
        message: &[u8],
        request_mac: &[u8],
        algorithm: Algorithm,
        key: &[u8],
    ) -> (Box<Rdata>, Box<[u8]>) {
        self.sign(
            Prelude::PriorMac(request_mac, &[]),
            message,
            Coverage::AllVariables,
            algorithm,
            key,
        )
    }

    /// Signs a message after the first in a multi-message response,
    /// covering the prior MAC, the unsigned messages sent since, and
    /// the timers of this RR.
    pub fn sign_subsequent(
        &self,
        message: &[u8],
        prior_mac: &[u8],
        unsigned_messages: &[Box<[u8]>],
        algorithm: Algorithm,
        key: &[u8],
    ) -> (Box<Rdata>, Box<[u8]>) {
        self.sign(
            Prelude::PriorMac(prior_mac, unsigned_messages),
            message,
            Coverage::TimersOnly,
            algorithm,
            key,
        )
    }

    fn sign(
        &self,
        prelude: Prelude,
        message: &[u8],
        coverage: Coverage,
        algorithm: Algorithm,
        key: &[u8],
    ) -> (Box<Rdata>, Box<[u8]>) {
        let mut authenticator = algorithm.make_authenticator(key);
        add_mac_input(
            authenticator.as_mut(),
            prelude,
            message,
            coverage,
            &(algorithm.name(), self),
        );
        let mac = authenticator.finalize();
        (self.serialize_rdata(algorithm.name(), &mac), mac)
    }

    /// Serializes TSIG [`Rdata`] using the provided algorithm name and
    /// leaving the record unsigned (i.e., with a zero-length MAC).
    pub fn unsigned(&self, algorithm: &Name) -> Box<Rdata> {
        self.serialize_rdata(algorithm, &[])
    }

    /// An internal helper to serialize TSIG [`Rdata`].
    fn serialize_rdata(&self, algorithm: &Name, mac: &[u8]) -> Box<Rdata> {
        Rdata::new_tsig(
            algorithm,
            self.time_signed,
            self.fudge,
            mac,
            self.original_id,
            self.error,
            self.other(),
        )
        .expect("TSIG RDATA with a supported algorithm fits in 65,535 octets")
    }

    /// Returns the "other data" field to serialize.
    fn other(&self) -> &[u8] {
        if self.error == ExtendedRcode::BADTIME {
            self.server_time.as_slice()
        } else {
            &[]
        }
    }
}

impl Variables for (&Name, &PreparedTsigRr) {
    fn key_name(&self) -> &Name {
        &self.1.key_name
    }

    fn algorithm(&self) -> &Name {
        self.0
    }

    fn time_signed(&self) -> TimeSigned {
        self.1.time_signed
    }

    fn fudge(&self) -> u16 {
        self.1.fudge
    }

    fn original_id(&self) -> u16 {
        self.1.original_id
    }

    fn error(&self) -> ExtendedRcode {
        self.1.error
    }

    fn other(&self) -> &[u8] {
        self.1.other()
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// Errors that arise when a [`ReadRr`] cannot be converted into a
/// [`ReadTsigRr`].
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum FromReadRrError {
    /// There is a format error in the RR.
    FormErr,

    /// The [`ReadRr`] is not a TSIG record.
    NotTsig,
}

impl fmt::Display for FromReadRrError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::FormErr => f.write_str("malformed TSIG RR"),
            Self::NotTsig => f.write_str("RR type is not TSIG"),
        }
    }
}

impl std::error::Error for FromReadRrError {}

/// Errors that arise during TSIG verification.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum VerificationError {
    /// MAC verification failed.
    BadSig,

    /// The message was signed with a different algorithm than
    /// expected.
    BadKey,

    /// Time check failed.
    BadTime,

    /// There was a format error (due to the MAC not meeting the minimum
    /// requirements of [RFC 8945 § 5.2.2.1]).
    ///
    /// [RFC 8945 § 5.2.2.1]: https://datatracker.ietf.org/doc/html/rfc8945#section-5.2.2.1
    FormErr,
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BadSig => f.write_str("BADSIG"),
            Self::BadKey => f.write_str("BADKEY"),
            Self::BadTime => f.write_str("BADTIME"),
            Self::FormErr => f.write_str("FORMERR"),
        }
    }
}

impl std::error::Error for VerificationError {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
