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

//! TSIG-verified zone transfers ([RFC 5936]).
//!
//! The `LUA` RRs of a record are read by transferring its whole zone
//! over TCP and keeping the RRs at the record's owner name. Every
//! message of the transfer is checked against the TSIG chaining rules
//! of [RFC 8945 § 5.3.1]: the first and last messages must be signed,
//! and at most 99 unsigned messages may appear in a row.
//!
//! [RFC 5936]: https://datatracker.ietf.org/doc/html/rfc5936
//! [RFC 8945 § 5.3.1]: https://datatracker.ietf.org/doc/html/rfc8945#section-5.3.1

use std::io;

use log::{debug, trace};

use super::transport::{ParsedResponse, Prior};
use super::{DnsTransport, Error, Identity, LuaRr, Operation, Result, TransportError};
use crate::message::tsig::MAX_UNSIGNED_MESSAGES;
use crate::message::{Opcode, Question, Rcode, Writer};
use crate::name::Name;
use crate::rr::Type;

impl DnsTransport<'_> {
    /// Makes a single attempt at transferring the zone of `identity`,
    /// returning the `LUA` RRs at its owner name (possibly none).
    pub(super) fn try_transfer(&self, identity: &Identity) -> Result<Vec<LuaRr>> {
        let id = rand::random();
        let mut writer = Writer::new();
        writer.set_id(id);
        writer.add_question(&Question::axfr(identity.zone().clone()))?;
        self.sign(&mut writer, id)?;
        let (request, request_mac) = writer.finish_with_mac()?;

        let mut connection = self.connect()?;
        debug!(
            "requesting AXFR of {} from {}",
            identity.zone(),
            self.credentials().host
        );
        connection
            .send_message(&request)
            .map_err(TransportError::from)?;

        let mut stream = TransferStream::new(self, identity.owner(), id, request_mac);
        loop {
            let message = connection
                .recv_message()
                .map_err(TransportError::from)?
                .ok_or_else(|| {
                    TransportError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "zone transfer ended before the closing SOA",
                    ))
                })?;
            if stream.process(&message)? {
                break;
            }
        }

        debug!(
            "AXFR of {} complete after {} messages",
            identity.zone(),
            stream.messages
        );
        Ok(stream.rrs)
    }
}

/// The state of an in-progress zone transfer.
struct TransferStream<'t, 'c> {
    transport: &'t DnsTransport<'c>,
    owner: &'t Name,
    id: u16,
    messages: usize,
    prior_mac: Box<[u8]>,
    unsigned_messages: Vec<Box<[u8]>>,
    opened: bool,
    rrs: Vec<LuaRr>,
}

impl<'t, 'c> TransferStream<'t, 'c> {
    fn new(
        transport: &'t DnsTransport<'c>,
        owner: &'t Name,
        id: u16,
        request_mac: Option<Box<[u8]>>,
    ) -> Self {
        Self {
            transport,
            owner,
            id,
            messages: 0,
            prior_mac: request_mac.unwrap_or_default(),
            unsigned_messages: Vec::new(),
            opened: false,
            rrs: Vec::new(),
        }
    }

    /// Processes the next message of the transfer. Returns whether it
    /// was the last.
    fn process(&mut self, message: &[u8]) -> Result<bool> {
        let parsed = ParsedResponse::parse(message, self.id, Opcode::Query)?;
        let first = self.messages == 0;
        self.messages += 1;

        let signed = match &parsed.tsig {
            Some(tsig) => {
                let prior = if first {
                    Prior::Request(&self.prior_mac)
                } else {
                    Prior::Signed {
                        prior_mac: &self.prior_mac,
                        unsigned_messages: &self.unsigned_messages,
                    }
                };
                self.transport.verify(tsig, parsed.signed_part, prior)?;
                self.prior_mac = tsig.mac().into();
                self.unsigned_messages.clear();
                true
            }
            None if first && parsed.rcode == Rcode::NoError => {
                return Err(TransportError::MissingTsig.into());
            }
            None if first => false,
            None if self.unsigned_messages.len() >= MAX_UNSIGNED_MESSAGES => {
                return Err(TransportError::TooManyUnsigned.into());
            }
            None => {
                self.unsigned_messages.push(message.into());
                false
            }
        };

        if parsed.rcode != Rcode::NoError {
            return Err(Error::Server {
                operation: Operation::Read,
                rcode: parsed.rcode,
            });
        }

        let mut done = false;
        for rr in &parsed.rrs {
            if !self.opened {
                if rr.rr_type != Type::SOA {
                    return Err(TransportError::Unexpected(
                        "zone transfer does not begin with SOA",
                    )
                    .into());
                }
                self.opened = true;
            } else if rr.rr_type == Type::SOA {
                done = true;
                break;
            } else if rr.rr_type == Type::LUA && rr.owner == *self.owner {
                trace!("found LUA RR at {} ({} octets)", rr.owner, rr.rdata.len());
                self.rrs.push(LuaRr {
                    ttl: rr.ttl,
                    rdata: rr.rdata.to_owned(),
                });
            }
        }

        if done && !signed {
            Err(TransportError::UnsignedFinalMessage.into())
        } else {
            Ok(done)
        }
    }
}
