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

//! Implementation of the [`Writer`] type to write on-the-wire DNS
//! messages.

use std::fmt;

use super::constants::*;
use super::tsig::{Algorithm, PreparedTsigRr};
use super::{Opcode, Question, Rcode};
use crate::class::Class;
use crate::name::Name;
use crate::rr::{Rdata, Ttl, Type};

/// The largest message that can be carried over TCP, where messages
/// are prefixed with a 16-bit length.
pub const MAX_MESSAGE_SIZE: usize = u16::MAX as usize;

////////////////////////////////////////////////////////////////////////
// WRITER                                                             //
////////////////////////////////////////////////////////////////////////

/// Serializes a DNS message into a growable buffer.
///
/// A `Writer` starts out with a zeroed 12-octet header. Since header
/// information is in a fixed position, it can be written at any time
/// through the appropriate `Writer` methods. For serializing questions
/// and resource records, the following methods are available:
///
/// * [`Writer::add_question`];
/// * [`Writer::add_answer_rr`]; and
/// * [`Writer::add_authority_rr`].
///
/// These must be called in that order. Going back to an earlier section
/// fails with [`Error::OutOfOrder`]. In UPDATE messages ([RFC 2136 § 2])
/// the sections are the zone, prerequisite, and update sections. The
/// additional section holds only the TSIG RR.
///
/// Domain names are always written uncompressed. The messages this
/// crate sends are small, and uncompressed owners keep the MAC input of
/// signed messages easy to reason about.
///
/// For messages with TSIG authentication, use [`Writer::set_tsig`]. The
/// TSIG record will be automatically added as the last RR when the
/// message is finished.
///
/// [RFC 2136 § 2]: https://datatracker.ietf.org/doc/html/rfc2136#section-2
pub struct Writer {
    octets: Vec<u8>,
    section: Section,
    qdcount: u16,
    ancount: u16,
    nscount: u16,
    tsig: Option<Tsig>,
}

/// A type for recording which section of a DNS message a [`Writer`] is
/// currently serializing.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum Section {
    Question,
    Answer,
    Authority,
}

/// A type for recording TSIG information for a message until it is
/// serialized when the message is finished.
#[derive(Clone, Debug)]
struct Tsig {
    mode: TsigMode,
    rr: PreparedTsigRr,
}

/// Specifies if and how to sign a message with a TSIG RR.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TsigMode {
    /// The message should be signed as a request.
    Request {
        algorithm: Algorithm,
        key: Box<[u8]>,
    },

    /// The message should be signed as a response.
    Response {
        algorithm: Algorithm,
        request_mac: Box<[u8]>,
        key: Box<[u8]>,
    },

    /// The message should be signed as a subsequent message in a
    /// multi-message response. `unsigned_messages` holds any complete
    /// messages sent without a TSIG RR since the one that produced
    /// `prior_mac`.
    Subsequent {
        algorithm: Algorithm,
        prior_mac: Box<[u8]>,
        unsigned_messages: Vec<Box<[u8]>>,
        key: Box<[u8]>,
    },

    /// The message should not be signed. The MAC field of the TSIG RR
    /// will be left empty.
    Unsigned { algorithm: Name },
}

impl Writer {
    /// Creates a new `Writer` with a zeroed header.
    pub fn new() -> Self {
        Self {
            octets: vec![0; HEADER_SIZE],
            section: Section::Question,
            qdcount: 0,
            ancount: 0,
            nscount: 0,
            tsig: None,
        }
    }

    /// Returns the current 16-bit ID of the message.
    pub fn id(&self) -> u16 {
        u16::from_be_bytes([self.octets[ID_START], self.octets[ID_START + 1]])
    }

    /// Sets the 16-bit ID of the message.
    pub fn set_id(&mut self, id: u16) {
        self.write_u16(ID_START, id);
    }

    /// Sets or clears the QR (query response) bit.
    pub fn set_qr(&mut self, qr: bool) {
        self.set_flag(QR_BYTE, QR_MASK, qr);
    }

    /// Sets the message's opcode.
    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.octets[OPCODE_BYTE] &= !OPCODE_MASK;
        self.octets[OPCODE_BYTE] |= u8::from(opcode) << OPCODE_SHIFT;
    }

    /// Sets or clears the AA (authoritative answer) bit.
    pub fn set_aa(&mut self, aa: bool) {
        self.set_flag(AA_BYTE, AA_MASK, aa);
    }

    /// Sets or clears the TC (truncation) bit.
    pub fn set_tc(&mut self, tc: bool) {
        self.set_flag(TC_BYTE, TC_MASK, tc);
    }

    /// Sets the message's (non-extended) RCODE.
    pub fn set_rcode(&mut self, rcode: Rcode) {
        self.octets[RCODE_BYTE] &= !RCODE_MASK;
        self.octets[RCODE_BYTE] |= u8::from(rcode);
    }

    /// Adds a question to the message. This must be used before any
    /// resource records are added.
    pub fn add_question(&mut self, question: &Question) -> Result<()> {
        if self.section != Section::Question {
            return Err(Error::OutOfOrder);
        }
        let new_qdcount = self.qdcount.checked_add(1).ok_or(Error::CountOverflow)?;
        let name = question.qname.wire_repr();
        self.ensure_room(name.len() + 4)?;
        self.octets.extend_from_slice(name);
        self.octets.extend_from_slice(&u16::from(question.qtype).to_be_bytes());
        self.octets.extend_from_slice(&u16::from(question.qclass).to_be_bytes());
        self.qdcount = new_qdcount;
        Ok(())
    }

    /// Adds a resource record to the answer (or prerequisite) section
    /// of the message.
    pub fn add_answer_rr(
        &mut self,
        owner: &Name,
        rr_type: Type,
        class: Class,
        ttl: Ttl,
        rdata: &Rdata,
    ) -> Result<()> {
        let new_ancount = self.enter_section(Section::Answer, self.ancount)?;
        self.add_rr(owner, rr_type, class, ttl, rdata)?;
        self.ancount = new_ancount;
        Ok(())
    }

    /// Adds a resource record to the authority (or update) section of
    /// the message.
    pub fn add_authority_rr(
        &mut self,
        owner: &Name,
        rr_type: Type,
        class: Class,
        ttl: Ttl,
        rdata: &Rdata,
    ) -> Result<()> {
        let new_nscount = self.enter_section(Section::Authority, self.nscount)?;
        self.add_rr(owner, rr_type, class, ttl, rdata)?;
        self.nscount = new_nscount;
        Ok(())
    }

    /// Configures the message to carry a TSIG RR, which will be
    /// serialized (and signed, if requested) as the last record of the
    /// message when it is finished.
    pub fn set_tsig(&mut self, mode: TsigMode, rr: PreparedTsigRr) -> Result<()> {
        if self.tsig.is_some() {
            Err(Error::AlreadyTsig)
        } else {
            self.tsig = Some(Tsig { mode, rr });
            Ok(())
        }
    }

    /// Finishes the message, returning its octets.
    pub fn finish(self) -> Result<Vec<u8>> {
        self.finish_with_mac().map(|(octets, _)| octets)
    }

    /// Finishes the message, returning its octets along with the MAC of
    /// its TSIG RR (if it was signed).
    pub fn finish_with_mac(mut self) -> Result<(Vec<u8>, Option<Box<[u8]>>)> {
        let arcount = self.tsig.is_some() as u16;
        self.write_u16(QDCOUNT_START, self.qdcount);
        self.write_u16(ANCOUNT_START, self.ancount);
        self.write_u16(NSCOUNT_START, self.nscount);
        self.write_u16(ARCOUNT_START, arcount);

        // TSIG *must* be the last record in the message, since it
        // carries a signature for everything that preceded it.
        let mac = if let Some(tsig) = self.tsig.take() {
            let message = self.octets.as_slice();
            let (rdata, mac) = match &tsig.mode {
                TsigMode::Request { algorithm, key } => {
                    let (rdata, mac) = tsig.rr.sign_request(message, *algorithm, key);
                    (rdata, Some(mac))
                }
                TsigMode::Response {
                    request_mac,
                    algorithm,
                    key,
                } => {
                    let (rdata, mac) = tsig.rr.sign_response(message, request_mac, *algorithm, key);
                    (rdata, Some(mac))
                }
                TsigMode::Subsequent {
                    prior_mac,
                    unsigned_messages,
                    algorithm,
                    key,
                } => {
                    let (rdata, mac) = tsig.rr.sign_subsequent(
                        message,
                        prior_mac,
                        unsigned_messages,
                        *algorithm,
                        key,
                    );
                    (rdata, Some(mac))
                }
                TsigMode::Unsigned { algorithm } => (tsig.rr.unsigned(algorithm), None),
            };
            self.add_rr(&tsig.rr.key_name, Type::TSIG, Class::ANY, Ttl::ZERO, &rdata)?;
            mac
        } else {
            None
        };

        Ok((self.octets, mac))
    }

    /// Moves the writer into `section` (failing if it has already moved
    /// past it) and returns the incremented section count.
    fn enter_section(&mut self, section: Section, count: u16) -> Result<u16> {
        if self.section > section {
            return Err(Error::OutOfOrder);
        }
        let new_count = count.checked_add(1).ok_or(Error::CountOverflow)?;
        self.section = section;
        Ok(new_count)
    }

    /// Appends a resource record with an uncompressed owner name.
    fn add_rr(
        &mut self,
        owner: &Name,
        rr_type: Type,
        class: Class,
        ttl: Ttl,
        rdata: &Rdata,
    ) -> Result<()> {
        let owner = owner.wire_repr();
        self.ensure_room(owner.len() + 10 + rdata.len())?;
        self.octets.extend_from_slice(owner);
        self.octets.extend_from_slice(&u16::from(rr_type).to_be_bytes());
        self.octets.extend_from_slice(&u16::from(class).to_be_bytes());
        self.octets.extend_from_slice(&u32::from(ttl).to_be_bytes());
        self.octets.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        self.octets.extend_from_slice(rdata.octets());
        Ok(())
    }

    fn ensure_room(&self, additional: usize) -> Result<()> {
        if self.octets.len() + additional > MAX_MESSAGE_SIZE {
            Err(Error::TooLong)
        } else {
            Ok(())
        }
    }

    fn set_flag(&mut self, byte: usize, mask: u8, value: bool) {
        if value {
            self.octets[byte] |= mask;
        } else {
            self.octets[byte] &= !mask;
        }
    }

    fn write_u16(&mut self, index: usize, value: u16) {
        self.octets[index..index + 2].copy_from_slice(&value.to_be_bytes());
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Writer")
            .field("len", &self.octets.len())
            .field("section", &self.section)
            .field("qdcount", &self.qdcount)
            .field("ancount", &self.ancount)
            .field("nscount", &self.nscount)
            .field("tsig", &self.tsig.is_some())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a [`Writer`] operation failed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    /// Adding the question or resource record would overflow the
    /// corresponding 16-bit counter in the DNS header.
    CountOverflow,

    /// The message would exceed 65,535 octets.
    TooLong,

    /// An attempt was made to serialize a question or resource record
    /// in the wrong place in the message (e.g., adding a question after
    /// an answer resource record has already been serialized).
    OutOfOrder,

    /// An attempt was made to set up TSIG, but TSIG is already enabled.
    AlreadyTsig,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::CountOverflow => f.write_str("record count would overflow"),
            Self::TooLong => f.write_str("message would exceed 65,535 octets"),
            Self::OutOfOrder => f.write_str("question or record serialized out of order"),
            Self::AlreadyTsig => f.write_str("already a TSIG message"),
        }
    }
}

impl std::error::Error for Error {}

/// The type returned by fallible [`Writer`] methods.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Reader;
    use crate::rr::rdata::TimeSigned;

    fn zone() -> Name {
        "gslb.example.test.".parse().unwrap()
    }

    #[test]
    fn header_setters_work() {
        let mut writer = Writer::new();
        writer.set_id(0x1234);
        writer.set_qr(true);
        writer.set_aa(true);
        writer.set_opcode(Opcode::Update);
        writer.set_rcode(Rcode::Refused);
        assert_eq!(writer.id(), 0x1234);
        let message = writer.finish().unwrap();
        let reader = Reader::try_from(message.as_slice()).unwrap();
        assert_eq!(reader.id(), 0x1234);
        assert!(reader.qr());
        assert!(reader.aa());
        assert!(!reader.tc());
        assert_eq!(reader.opcode(), Opcode::Update);
        assert_eq!(reader.rcode(), Rcode::Refused);
    }

    #[test]
    fn update_sections_are_counted() {
        let owner: Name = "www.gslb.example.test.".parse().unwrap();
        let rdata = <&Rdata>::try_from(b"\xff\xff".as_slice()).unwrap();
        let mut writer = Writer::new();
        writer.set_opcode(Opcode::Update);
        writer.add_question(&Question::update_zone(zone())).unwrap();
        writer
            .add_authority_rr(&owner, Type::LUA, Class::ANY, Ttl::ZERO, Rdata::empty())
            .unwrap();
        writer
            .add_authority_rr(&owner, Type::LUA, Class::IN, Ttl::from(300), rdata)
            .unwrap();
        let message = writer.finish().unwrap();

        let mut reader = Reader::try_from(message.as_slice()).unwrap();
        assert_eq!(reader.qdcount(), 1);
        assert_eq!(reader.ancount(), 0);
        assert_eq!(reader.nscount(), 2);
        assert_eq!(reader.arcount(), 0);
        assert_eq!(reader.read_question().unwrap().qname, zone());
        let delete = reader.read_rr().unwrap();
        assert_eq!(delete.class, Class::ANY);
        assert!(delete.rdata.is_empty());
        let add = reader.read_rr().unwrap();
        assert_eq!(add.owner, owner);
        assert_eq!(add.ttl, Ttl::from(300));
        assert_eq!(add.rdata, rdata);
        assert!(reader.at_eom());
    }

    #[test]
    fn out_of_order_additions_are_rejected() {
        let mut writer = Writer::new();
        writer
            .add_authority_rr(&zone(), Type::A, Class::IN, Ttl::ZERO, Rdata::empty())
            .unwrap();
        assert_eq!(
            writer.add_question(&Question::axfr(zone())),
            Err(Error::OutOfOrder)
        );
        assert_eq!(
            writer.add_answer_rr(&zone(), Type::A, Class::IN, Ttl::ZERO, Rdata::empty()),
            Err(Error::OutOfOrder)
        );
    }

    #[test]
    fn oversized_messages_are_rejected() {
        let rdata: Box<Rdata> = vec![0; 60000].try_into().unwrap();
        let mut writer = Writer::new();
        writer
            .add_answer_rr(&zone(), Type::TXT, Class::IN, Ttl::ZERO, &rdata)
            .unwrap();
        assert_eq!(
            writer.add_answer_rr(&zone(), Type::TXT, Class::IN, Ttl::ZERO, &rdata),
            Err(Error::TooLong)
        );
    }

    #[test]
    fn tsig_is_appended_last() {
        let key_name: Name = "key.example.".parse().unwrap();
        let time = TimeSigned::try_from_unix_time(1_700_000_000).unwrap();
        let mut writer = Writer::new();
        writer.set_id(7);
        writer.add_question(&Question::axfr(zone())).unwrap();
        writer
            .set_tsig(
                TsigMode::Request {
                    algorithm: Algorithm::HmacSha1,
                    key: b"k".as_slice().into(),
                },
                PreparedTsigRr::new(key_name.clone(), time, 300, 7),
            )
            .unwrap();
        assert_eq!(
            writer.set_tsig(
                TsigMode::Unsigned {
                    algorithm: Algorithm::HmacSha1.name().clone()
                },
                PreparedTsigRr::new(key_name.clone(), time, 300, 7),
            ),
            Err(Error::AlreadyTsig)
        );
        let (message, mac) = writer.finish_with_mac().unwrap();
        assert_eq!(mac.map(|mac| mac.len()), Some(20));

        let mut reader = Reader::try_from(message.as_slice()).unwrap();
        assert_eq!(reader.arcount(), 1);
        reader.read_question().unwrap();
        let tsig = reader.read_rr().unwrap();
        assert_eq!(tsig.owner, key_name);
        assert_eq!(tsig.rr_type, Type::TSIG);
        assert_eq!(tsig.class, Class::ANY);
        assert!(reader.at_eom());
    }
}
