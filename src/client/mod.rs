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

//! Synchronization of GSLB records with a live zone.
//!
//! A [`Client`] pushes [`Entry`] lists to an authoritative server with
//! TSIG-signed dynamic updates ([RFC 2136]) and reads them back with a
//! TSIG-signed zone transfer. Records are keyed by their fully
//! qualified owner name (an [`Identity`]) and stored as an RRset of the
//! private `LUA` type at that name.
//!
//! Updates replace the whole RRset: the UPDATE message deletes the
//! existing `LUA` RRset and adds the new entries. A reader racing with
//! an update may briefly see no records at all.
//!
//! [RFC 2136]: https://datatracker.ietf.org/doc/html/rfc2136

use std::fmt;
use std::time::Duration;

use log::debug;

use crate::io::Transport;
use crate::lua::{wire, EncodeError, Entry, MismatchError, Variant};
use crate::message::tsig::Algorithm;
use crate::message::{writer, Rcode};
use crate::name::Name;

mod axfr;
mod identity;
#[cfg(test)]
mod mock;
mod transport;

pub use identity::{Identity, IdentityError};
pub use transport::{DnsTransport, LuaRr, TransportError};

/// The TSIG fudge (in seconds) used for every signed message.
pub const FUDGE: u16 = crate::message::tsig::DEFAULT_FUDGE;

////////////////////////////////////////////////////////////////////////
// CREDENTIALS                                                        //
////////////////////////////////////////////////////////////////////////

/// Where and how to reach the authoritative server.
#[derive(Clone)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub transport: Transport,
    pub key_name: Name,
    pub algorithm: Algorithm,
    pub secret: Box<[u8]>,

    /// How many times a request is re-issued after a transport failure.
    pub retries: u32,

    /// The network timeout of each attempt.
    pub timeout: Duration,
}

impl Credentials {
    pub const DEFAULT_PORT: u16 = 53;
    pub const DEFAULT_RETRIES: u32 = 2;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates credentials with the default port, transport, retry
    /// count, and timeout.
    pub fn new(
        host: impl Into<String>,
        key_name: Name,
        algorithm: Algorithm,
        secret: impl Into<Box<[u8]>>,
    ) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            transport: Transport::default(),
            key_name,
            algorithm,
            secret: secret.into(),
            retries: Self::DEFAULT_RETRIES,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("transport", &self.transport)
            .field("key_name", &self.key_name)
            .field("algorithm", &self.algorithm)
            .field("secret", &format_args!("<{} octets>", self.secret.len()))
            .field("retries", &self.retries)
            .field("timeout", &self.timeout)
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////
// CLIENT                                                             //
////////////////////////////////////////////////////////////////////////

/// Creates, reads, updates, and deletes GSLB records.
///
/// The client holds nothing but its [`Credentials`]; each operation is
/// a single AXFR or UPDATE exchange (plus retries). Callers must not
/// run overlapping operations on the same identity.
#[derive(Clone, Debug)]
pub struct Client {
    credentials: Credentials,
}

impl Client {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Adds `entries` to the `LUA` RRset at `owner`.
    pub fn create(&self, owner: &str, entries: &[Entry]) -> Result<Identity> {
        let identity: Identity = owner.parse()?;
        let rrs = encode_entries(entries)?;
        self.transport().create(&identity, &rrs)?;
        debug!("created {} LUA RRs at {identity}", rrs.len());
        Ok(identity)
    }

    /// Reads the record at `owner`, decoding its snippets as `variant`.
    /// RRs whose RDATA or snippet does not decode are skipped; if none
    /// remain, this fails with [`Error::NoRecords`].
    pub fn read(&self, owner: &str, variant: Variant) -> Result<Vec<Entry>> {
        let identity: Identity = owner.parse()?;
        let rrs = self.transport().transfer(&identity)?;
        let entries: Vec<Entry> = rrs
            .iter()
            .filter_map(|rr| match decode_entry(rr, variant) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("skipping LUA RR at {identity}: {e}");
                    None
                }
            })
            .collect();
        if entries.is_empty() {
            Err(Error::NoRecords(identity.owner().clone()))
        } else {
            Ok(entries)
        }
    }

    /// Replaces the `LUA` RRset at `owner` with `entries`.
    pub fn update(&self, owner: &str, entries: &[Entry]) -> Result<Identity> {
        let identity: Identity = owner.parse()?;
        let rrs = encode_entries(entries)?;
        self.transport().update(&identity, &rrs)?;
        debug!("replaced the LUA RRset at {identity} with {} RRs", rrs.len());
        Ok(identity)
    }

    /// Deletes the `LUA` RRset at `owner`.
    pub fn delete(&self, owner: &str) -> Result<Identity> {
        let identity: Identity = owner.parse()?;
        self.transport().delete(&identity)?;
        debug!("deleted the LUA RRset at {identity}");
        Ok(identity)
    }

    /// Adopts an existing record: reads it like [`Client::read`] and
    /// returns it along with its parsed identity.
    pub fn import(&self, owner: &str, variant: Variant) -> Result<(Identity, Vec<Entry>)> {
        let identity: Identity = owner.parse()?;
        let entries = self.read(owner, variant)?;
        Ok((identity, entries))
    }

    fn transport(&self) -> DnsTransport {
        DnsTransport::new(&self.credentials)
    }
}

/// Encodes entries as `LUA` RRs, failing before any network traffic if
/// one cannot be encoded.
fn encode_entries(entries: &[Entry]) -> Result<Vec<LuaRr>> {
    if entries.is_empty() {
        return Err(EncodeError::NoEntries.into());
    }
    entries
        .iter()
        .map(|entry| {
            let snippet = entry.snippet()?;
            let rdata = wire::encode_rdata(entry.rr_type, &snippet)?;
            Ok(LuaRr {
                ttl: entry.ttl,
                rdata,
            })
        })
        .collect()
}

fn decode_entry(rr: &LuaRr, variant: Variant) -> Result<Entry> {
    let (rr_type, snippet) = wire::decode_rdata(&rr.rdata)?;
    Ok(Entry::from_snippet(rr_type, rr.ttl, &snippet, variant)?)
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// The operation during which a server returned an error.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    fn gerund(&self) -> &'static str {
        match self {
            Self::Create => "creating",
            Self::Read => "reading",
            Self::Update => "updating",
            Self::Delete => "deleting",
        }
    }
}

/// An error signaling that a [`Client`] operation failed.
#[derive(Debug)]
pub enum Error {
    /// The owner name is not a valid identity. Reported before any
    /// network traffic.
    Identity(IdentityError),

    /// `LUA` RDATA could not be encoded or decoded.
    Codec(wire::Error),

    /// A snippet did not have the expected shape. [`Client::read`]
    /// skips such RRs, so callers only see this from lower-level APIs.
    GrammarMismatch(MismatchError),

    /// An entry cannot be written as a `LUA` record.
    Encode(EncodeError),

    /// The request message could not be built.
    Message(writer::Error),

    /// No usable `LUA` RRs were found at the given owner.
    NoRecords(Name),

    /// The exchange with the server failed (after any retries).
    Transport(TransportError),

    /// The server answered with an error RCODE.
    Server { operation: Operation, rcode: Rcode },
}

impl Error {
    /// Whether re-issuing the request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Identity(_) => f.write_str("invalid record identity"),
            Self::Codec(_) => f.write_str("invalid LUA RDATA"),
            Self::GrammarMismatch(_) => f.write_str("Lua snippet does not have the expected shape"),
            Self::Encode(_) => f.write_str("cannot encode record"),
            Self::Message(_) => f.write_str("cannot build DNS message"),
            Self::NoRecords(owner) => write!(f, "no matching LUA records found at {owner}"),
            Self::Transport(_) => f.write_str("DNS exchange failed"),
            Self::Server { operation, rcode } => {
                write!(f, "error {} DNS LUA record: {rcode}", operation.gerund())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Identity(e) => Some(e),
            Self::Codec(e) => Some(e),
            Self::GrammarMismatch(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Message(e) => Some(e),
            Self::Transport(e) => Some(e),
            Self::NoRecords(_) | Self::Server { .. } => None,
        }
    }
}

impl From<IdentityError> for Error {
    fn from(e: IdentityError) -> Self {
        Self::Identity(e)
    }
}

impl From<wire::Error> for Error {
    fn from(e: wire::Error) -> Self {
        Self::Codec(e)
    }
}

impl From<MismatchError> for Error {
    fn from(e: MismatchError) -> Self {
        Self::GrammarMismatch(e)
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Self::Encode(e)
    }
}

impl From<writer::Error> for Error {
    fn from(e: writer::Error) -> Self {
        Self::Message(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

/// The type returned by fallible [`Client`] methods.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
