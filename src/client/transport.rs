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

//! The TSIG-authenticated DNS transport: dynamic updates and the
//! plumbing shared with zone transfers.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::SystemTime;

use log::{debug, warn};

use super::{Credentials, Error, Identity, Operation, Result, FUDGE};
use crate::class::Class;
use crate::io::tcp::Connection;
use crate::io::{self as net, udp, Transport};
use crate::message::reader::{self, ReadRr};
use crate::message::tsig::{FromReadRrError, PreparedTsigRr, ReadTsigRr, VerificationError};
use crate::message::writer::TsigMode;
use crate::message::{ExtendedRcode, Opcode, Question, Rcode, Reader, Writer};
use crate::rr::rdata::{TimeSigned, UnrepresentableTimeError};
use crate::rr::{Rdata, Ttl, Type};
use crate::util::ErrorChain;

/// A `LUA` RR at a record's owner name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LuaRr {
    pub ttl: Ttl,
    pub rdata: Box<Rdata>,
}

////////////////////////////////////////////////////////////////////////
// DNS TRANSPORT                                                      //
////////////////////////////////////////////////////////////////////////

/// Performs the DNS exchanges behind a [`Client`](super::Client).
///
/// Every request is signed with TSIG using a fresh message ID and
/// signing time, and every successful response must carry a valid
/// TSIG RR. Transport failures (network errors, timeouts, and TSIG problems)
/// are retried as configured; error RCODEs from the server are not.
pub struct DnsTransport<'a> {
    credentials: &'a Credentials,
}

impl<'a> DnsTransport<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self { credentials }
    }

    /// Transfers the zone of `identity` and returns the `LUA` RRs owned
    /// by it. Fails with [`Error::NoRecords`] if there are none.
    pub fn transfer(&self, identity: &Identity) -> Result<Vec<LuaRr>> {
        let what = format!("transfer of zone {}", identity.zone());
        let rrs = self.with_retries(&what, || self.try_transfer(identity))?;
        if rrs.is_empty() {
            Err(Error::NoRecords(identity.owner().clone()))
        } else {
            Ok(rrs)
        }
    }

    /// Adds `rrs` to the `LUA` RRset at `identity`.
    pub fn create(&self, identity: &Identity, rrs: &[LuaRr]) -> Result<()> {
        self.send_update(Operation::Create, identity, false, rrs)
    }

    /// Replaces the `LUA` RRset at `identity` with `rrs`, in a single
    /// UPDATE message.
    pub fn update(&self, identity: &Identity, rrs: &[LuaRr]) -> Result<()> {
        self.send_update(Operation::Update, identity, true, rrs)
    }

    /// Deletes the `LUA` RRset at `identity`.
    pub fn delete(&self, identity: &Identity) -> Result<()> {
        self.send_update(Operation::Delete, identity, true, &[])
    }

    /// Runs `attempt` up to `1 + retries` times, for as long as it
    /// fails with a transport error. The last error is returned.
    fn with_retries<T, F>(&self, what: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let attempts = self.credentials.retries.saturating_add(1);
        let mut n = 1;
        loop {
            match attempt() {
                Err(Error::Transport(e)) if n < attempts => {
                    warn!(
                        "attempt {n} of {attempts} at {what} failed: {}; retrying",
                        ErrorChain(&e)
                    );
                    n += 1;
                }
                result => return result,
            }
        }
    }

    fn send_update(
        &self,
        operation: Operation,
        identity: &Identity,
        delete_existing: bool,
        additions: &[LuaRr],
    ) -> Result<()> {
        let what = format!("{} the LUA RRset at {identity}", operation.gerund());
        self.with_retries(&what, || {
            let (request, id, request_mac) =
                self.build_update(identity, delete_existing, additions)?;
            debug!("sending {}-octet UPDATE for {identity}", request.len());
            let response = self.exchange(&request, id)?;
            let rcode = self.check_update_response(&response, id, &request_mac)?;
            if rcode == Rcode::NoError {
                Ok(())
            } else {
                Err(Error::Server { operation, rcode })
            }
        })
    }

    /// Builds a signed UPDATE message ([RFC 2136 § 2]) for the zone of
    /// `identity`: an optional RRset deletion followed by additions.
    ///
    /// [RFC 2136 § 2]: https://datatracker.ietf.org/doc/html/rfc2136#section-2
    fn build_update(
        &self,
        identity: &Identity,
        delete_existing: bool,
        additions: &[LuaRr],
    ) -> Result<(Vec<u8>, u16, Box<[u8]>)> {
        let id = rand::random();
        let owner = identity.owner();
        let mut writer = Writer::new();
        writer.set_id(id);
        writer.set_opcode(Opcode::Update);
        writer.add_question(&Question::update_zone(identity.zone().clone()))?;
        if delete_existing {
            writer.add_authority_rr(owner, Type::LUA, Class::ANY, Ttl::ZERO, Rdata::empty())?;
        }
        for rr in additions {
            writer.add_authority_rr(owner, Type::LUA, Class::IN, rr.ttl, &rr.rdata)?;
        }
        self.sign(&mut writer, id)?;
        let (request, mac) = writer.finish_with_mac()?;
        Ok((request, id, mac.unwrap_or_default()))
    }

    /// Configures `writer` to sign its message as a request.
    pub(super) fn sign(&self, writer: &mut Writer, id: u16) -> Result<()> {
        let mode = TsigMode::Request {
            algorithm: self.credentials.algorithm,
            key: self.credentials.secret.clone(),
        };
        let tsig_rr = PreparedTsigRr::new(self.credentials.key_name.clone(), now()?, FUDGE, id);
        writer.set_tsig(mode, tsig_rr)?;
        Ok(())
    }

    pub(super) fn resolve(&self) -> std::result::Result<Vec<SocketAddr>, TransportError> {
        Ok(net::resolve(&self.credentials.host, self.credentials.port)?)
    }

    pub(super) fn connect(&self) -> std::result::Result<Connection, TransportError> {
        Ok(Connection::connect(&self.resolve()?, self.credentials.timeout)?)
    }

    /// Sends `request` with the configured transport and returns the
    /// response. A truncated UDP response causes the request to be
    /// re-sent over TCP.
    fn exchange(&self, request: &[u8], id: u16) -> std::result::Result<Vec<u8>, TransportError> {
        if self.credentials.transport == Transport::Udp {
            let addrs = self.resolve()?;
            let response = udp::exchange(addrs[0], request, id, self.credentials.timeout)?;
            let truncated = Reader::try_from(response.as_slice())
                .map(|reader| reader.tc())
                .unwrap_or(false);
            if !truncated {
                return Ok(response);
            }
            debug!("UDP response was truncated; retrying over TCP");
        }

        let mut connection = self.connect()?;
        connection.send_message(request)?;
        connection.recv_message()?.ok_or_else(|| {
            TransportError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection without responding",
            ))
        })
    }

    fn check_update_response(
        &self,
        response: &[u8],
        id: u16,
        request_mac: &[u8],
    ) -> std::result::Result<Rcode, TransportError> {
        let parsed = ParsedResponse::parse(response, id, Opcode::Update)?;
        match &parsed.tsig {
            Some(tsig) => self.verify(tsig, parsed.signed_part, Prior::Request(request_mac))?,
            // Servers may refuse an UPDATE without signing the answer.
            None if parsed.rcode != Rcode::NoError => {
                debug!("unsigned UPDATE response with RCODE {}", parsed.rcode)
            }
            None => return Err(TransportError::MissingTsig),
        }
        Ok(parsed.rcode)
    }

    /// Verifies the TSIG RR of a response.
    pub(super) fn verify(
        &self,
        tsig: &ReadTsigRr,
        signed_part: &[u8],
        prior: Prior,
    ) -> std::result::Result<(), TransportError> {
        if tsig.error() != ExtendedRcode::NOERROR {
            return Err(TransportError::TsigRejected(tsig.error()));
        } else if tsig.key_name() != &self.credentials.key_name {
            return Err(TransportError::Tsig(VerificationError::BadKey));
        }
        let (algorithm, key, now) = (
            self.credentials.algorithm,
            &self.credentials.secret,
            now()?,
        );
        match prior {
            Prior::Request(request_mac) => {
                tsig.verify_response(signed_part, request_mac, algorithm, key, now)
            }
            Prior::Signed {
                prior_mac,
                unsigned_messages,
            } => tsig.verify_subsequent(
                signed_part,
                prior_mac,
                unsigned_messages,
                algorithm,
                key,
                now,
            ),
        }
        .map_err(TransportError::Tsig)
    }

    pub(super) fn credentials(&self) -> &Credentials {
        self.credentials
    }
}

/// What the MAC of a response must be chained to.
pub(super) enum Prior<'p> {
    /// The MAC of the request.
    Request(&'p [u8]),

    /// The MAC of the last signed message of a multi-message response
    /// and the unsigned messages received since.
    Signed {
        prior_mac: &'p [u8],
        unsigned_messages: &'p [Box<[u8]>],
    },
}

/// Returns the current time as a TSIG time signed.
fn now() -> std::result::Result<TimeSigned, TransportError> {
    TimeSigned::try_from(SystemTime::now()).map_err(TransportError::Clock)
}

////////////////////////////////////////////////////////////////////////
// RESPONSE PARSING                                                   //
////////////////////////////////////////////////////////////////////////

/// A response message, read up to and including its TSIG RR.
pub(super) struct ParsedResponse<'m> {
    pub rcode: Rcode,
    pub rrs: Vec<ReadRr<'m>>,
    pub signed_part: &'m [u8],
    pub tsig: Option<ReadTsigRr<'m>>,
}

impl<'m> ParsedResponse<'m> {
    /// Reads `message`, checking that it answers request `id` with the
    /// given opcode. A TSIG RR, if present, must be the last RR of the
    /// additional section.
    pub fn parse(
        message: &'m [u8],
        id: u16,
        opcode: Opcode,
    ) -> std::result::Result<Self, TransportError> {
        let mut reader = Reader::try_from(message)?;
        if !reader.qr() {
            return Err(TransportError::Unexpected("message is not a response"));
        } else if reader.id() != id {
            return Err(TransportError::Unexpected("response ID does not match the request"));
        } else if reader.opcode() != opcode {
            return Err(TransportError::Unexpected("response opcode does not match the request"));
        }

        for _ in 0..reader.qdcount() {
            reader.read_question()?;
        }

        let total = reader.rr_count();
        let tsig_allowed = reader.arcount() > 0;
        let mut rrs = Vec::with_capacity(total);
        let mut signed_part = message;
        let mut tsig = None;
        for i in 0..total {
            let last = i + 1 == total;
            let cursor = reader.message_to_cursor();
            let rr = reader.read_rr()?;
            if rr.rr_type == Type::TSIG {
                if !last || !tsig_allowed {
                    return Err(TransportError::Unexpected("TSIG RR is not the last record"));
                }
                signed_part = cursor;
                tsig = Some(ReadTsigRr::try_from(rr)?);
            } else {
                rrs.push(rr);
            }
        }

        Ok(Self {
            rcode: reader.rcode(),
            rrs,
            signed_part,
            tsig,
        })
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a DNS exchange failed in transit. These are
/// the failures a [`DnsTransport`] retries.
#[derive(Debug)]
pub enum TransportError {
    /// Network I/O failed or timed out.
    Io(io::Error),

    /// The response could not be parsed.
    Malformed(reader::Error),

    /// The response's TSIG RR could not be parsed.
    MalformedTsig(FromReadRrError),

    /// The response does not fit the request.
    Unexpected(&'static str),

    /// The response is not signed.
    MissingTsig,

    /// The server rejected the request's TSIG with the given error.
    TsigRejected(ExtendedRcode),

    /// The response's TSIG failed verification.
    Tsig(VerificationError),

    /// A zone transfer sent more unsigned messages in a row than
    /// RFC 8945 permits.
    TooManyUnsigned,

    /// A zone transfer ended with an unsigned message.
    UnsignedFinalMessage,

    /// The system clock cannot be expressed as a TSIG time.
    Clock(UnrepresentableTimeError),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(_) => f.write_str("network I/O failed"),
            Self::Malformed(_) => f.write_str("malformed response"),
            Self::MalformedTsig(_) => f.write_str("malformed TSIG RR in response"),
            Self::Unexpected(what) => f.write_str(what),
            Self::MissingTsig => f.write_str("response is not signed"),
            Self::TsigRejected(error) => {
                write!(f, "server rejected the request signature: {error}")
            }
            Self::Tsig(_) => f.write_str("response signature is invalid"),
            Self::TooManyUnsigned => f.write_str("too many unsigned messages in zone transfer"),
            Self::UnsignedFinalMessage => {
                f.write_str("zone transfer ended with an unsigned message")
            }
            Self::Clock(_) => f.write_str("system clock is out of range"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Malformed(e) => Some(e),
            Self::MalformedTsig(e) => Some(e),
            Self::Tsig(e) => Some(e),
            Self::Clock(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<reader::Error> for TransportError {
    fn from(e: reader::Error) -> Self {
        Self::Malformed(e)
    }
}

impl From<FromReadRrError> for TransportError {
    fn from(e: FromReadRrError) -> Self {
        Self::MalformedTsig(e)
    }
}
