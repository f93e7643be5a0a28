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

//! An in-process authoritative server for exercising the client.
//!
//! The server listens on TCP and UDP on the same loopback port, checks
//! the TSIG signature of every request, applies UPDATE messages to an
//! in-memory zone, and answers AXFR requests with a multi-message
//! stream in which runs of messages are left unsigned.

use std::mem;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use super::{Credentials, LuaRr, FUDGE};
use crate::class::Class;
use crate::io::tcp::Connection;
use crate::lua::wire;
use crate::message::reader::ReadRr;
use crate::message::tsig::{Algorithm, PreparedTsigRr, ReadTsigRr};
use crate::message::writer::TsigMode;
use crate::message::{ExtendedRcode, Opcode, Qtype, Question, Rcode, Reader, Writer};
use crate::name::Name;
use crate::rr::rdata::TimeSigned;
use crate::rr::{Rdata, Ttl, Type};

pub const KEY_NAME: &str = "gslb-key.";
pub const ALGORITHM: Algorithm = Algorithm::HmacSha256;
pub const SECRET: &[u8] = b"mock server secret";

const TIMEOUT: Duration = Duration::from_secs(2);

pub struct MockServer {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
    shutdown: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

struct State {
    zone: Name,
    key_name: Name,
    records: Vec<StoredRr>,
    refuse_updates: bool,
    sign_refusals: bool,
    refuse_transfers: bool,
    drop_connections: usize,
    truncate_udp: bool,
    sign_final_message: bool,
    rrs_per_message: usize,
    unsigned_run: usize,
    tcp_connections: usize,
    udp_queries: usize,
}

#[derive(Clone)]
struct StoredRr {
    owner: Name,
    rr_type: Type,
    ttl: Ttl,
    rdata: Box<Rdata>,
}

impl MockServer {
    /// Starts a server authoritative for `zone`.
    pub fn start(zone: &str) -> Self {
        let (listener, socket) = bind();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(State {
            zone: zone.parse().unwrap(),
            key_name: KEY_NAME.parse().unwrap(),
            records: Vec::new(),
            refuse_updates: false,
            sign_refusals: true,
            refuse_transfers: false,
            drop_connections: 0,
            truncate_udp: false,
            sign_final_message: true,
            rrs_per_message: 2,
            unsigned_run: 1,
            tcp_connections: 0,
            udp_queries: 0,
        }));
        let shutdown = Arc::new(AtomicBool::new(false));

        let tcp_thread = {
            let state = state.clone();
            let shutdown = shutdown.clone();
            thread::spawn(move || serve_tcp(listener, &state, &shutdown))
        };
        let udp_thread = {
            let state = state.clone();
            let shutdown = shutdown.clone();
            thread::spawn(move || serve_udp(socket, &state, &shutdown))
        };

        Self {
            addr,
            state,
            shutdown,
            threads: vec![tcp_thread, udp_thread],
        }
    }

    /// Credentials for this server, with the default retry count.
    pub fn credentials(&self) -> Credentials {
        let mut credentials = Credentials::new(
            self.addr.ip().to_string(),
            KEY_NAME.parse().unwrap(),
            ALGORITHM,
            SECRET,
        );
        credentials.port = self.addr.port();
        credentials.timeout = TIMEOUT;
        credentials
    }

    /// Adds a `LUA` RR to the zone directly.
    pub fn seed_lua(&self, owner: &str, ttl: u32, answer_type: Type, snippet: &str) {
        self.seed(owner, Type::LUA, ttl, wire::encode_rdata(answer_type, snippet).unwrap());
    }

    pub fn seed(&self, owner: &str, rr_type: Type, ttl: u32, rdata: Box<Rdata>) {
        self.state.lock().unwrap().records.push(StoredRr {
            owner: owner.parse().unwrap(),
            rr_type,
            ttl: ttl.into(),
            rdata,
        });
    }

    /// Returns the `LUA` RRs currently stored at `owner`.
    pub fn lua_rrs(&self, owner: &str) -> Vec<LuaRr> {
        let owner: Name = owner.parse().unwrap();
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .filter(|rr| rr.owner == owner && rr.rr_type == Type::LUA)
            .map(|rr| LuaRr {
                ttl: rr.ttl,
                rdata: rr.rdata.clone(),
            })
            .collect()
    }

    pub fn refuse_updates(&self) {
        self.state.lock().unwrap().refuse_updates = true;
    }

    /// Refuses updates with a response that carries no TSIG RR.
    pub fn refuse_updates_unsigned(&self) {
        let mut state = self.state.lock().unwrap();
        state.refuse_updates = true;
        state.sign_refusals = false;
    }

    /// Answers zone transfer requests with a single signed REFUSED
    /// message.
    pub fn refuse_transfers(&self) {
        self.state.lock().unwrap().refuse_transfers = true;
    }

    /// Closes the next `n` TCP connections without reading from them.
    pub fn drop_connections(&self, n: usize) {
        self.state.lock().unwrap().drop_connections = n;
    }

    /// Answers every UDP request with an empty, truncated response.
    pub fn truncate_udp(&self) {
        self.state.lock().unwrap().truncate_udp = true;
    }

    /// Leaves the final message of zone transfers unsigned.
    pub fn leave_final_message_unsigned(&self) {
        self.state.lock().unwrap().sign_final_message = false;
    }

    pub fn set_rrs_per_message(&self, n: usize) {
        self.state.lock().unwrap().rrs_per_message = n;
    }

    /// Sets how many unsigned messages follow each signed message of a
    /// zone transfer. The final message is still signed.
    pub fn set_unsigned_run(&self, n: usize) {
        self.state.lock().unwrap().unsigned_run = n;
    }

    pub fn tcp_connections(&self) -> usize {
        self.state.lock().unwrap().tcp_connections
    }

    pub fn udp_queries(&self) -> usize {
        self.state.lock().unwrap().udp_queries
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Wake up the accept loop.
        let _ = TcpStream::connect(self.addr);
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}

/// Binds a TCP listener and a UDP socket to the same loopback port.
fn bind() -> (TcpListener, UdpSocket) {
    for _ in 0..16 {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        if let Ok(socket) = UdpSocket::bind(addr) {
            return (listener, socket);
        }
    }
    panic!("no loopback port free for both TCP and UDP");
}

fn serve_tcp(listener: TcpListener, state: &Mutex<State>, shutdown: &AtomicBool) {
    for stream in listener.incoming() {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let stream = match stream {
            Ok(stream) => stream,
            Err(_) => continue,
        };

        let drop_it = {
            let mut state = state.lock().unwrap();
            state.tcp_connections += 1;
            if state.drop_connections > 0 {
                state.drop_connections -= 1;
                true
            } else {
                false
            }
        };
        if drop_it {
            continue;
        }

        let mut connection = match Connection::from_stream(stream, TIMEOUT) {
            Ok(connection) => connection,
            Err(_) => continue,
        };
        while let Ok(Some(message)) = connection.recv_message() {
            let responses = state.lock().unwrap().handle(&message);
            if responses
                .iter()
                .any(|response| connection.send_message(response).is_err())
            {
                break;
            }
        }
    }
}

fn serve_udp(socket: UdpSocket, state: &Mutex<State>, shutdown: &AtomicBool) {
    socket.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
    let mut buf = vec![0; 65535];
    while !shutdown.load(Ordering::SeqCst) {
        let (len, src) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(_) => continue,
        };
        let message = &buf[..len];
        let response = {
            let mut state = state.lock().unwrap();
            state.udp_queries += 1;
            if state.truncate_udp {
                Some(truncated(message))
            } else {
                state.handle(message).into_iter().next()
            }
        };
        if let Some(response) = response {
            let _ = socket.send_to(&response, src);
        }
    }
}

/// Builds a header-only response with the TC bit set.
fn truncated(request: &[u8]) -> Vec<u8> {
    let reader = Reader::try_from(request).unwrap();
    let mut writer = Writer::new();
    writer.set_id(reader.id());
    writer.set_qr(true);
    writer.set_opcode(reader.opcode());
    writer.set_tc(true);
    writer.finish().unwrap()
}

impl State {
    fn handle(&mut self, message: &[u8]) -> Vec<Vec<u8>> {
        let mut reader = Reader::try_from(message).unwrap();
        let (id, opcode) = (reader.id(), reader.opcode());
        let question = reader.read_question().unwrap();
        let mut rrs = Vec::new();
        let mut signed_part = message;
        let mut tsig = None;
        for _ in 0..reader.rr_count() {
            let cursor = reader.message_to_cursor();
            let rr = reader.read_rr().unwrap();
            if rr.rr_type == Type::TSIG {
                signed_part = cursor;
                tsig = Some(ReadTsigRr::try_from(rr).unwrap());
            } else {
                rrs.push(rr);
            }
        }
        let tsig = tsig.expect("request is not signed");

        let now = TimeSigned::try_from(SystemTime::now()).unwrap();
        let verified = tsig.key_name() == &self.key_name
            && tsig.verify_request(signed_part, ALGORITHM, SECRET, now).is_ok();
        if !verified {
            let mut writer = response_writer(id, opcode, Some(&question));
            writer.set_rcode(Rcode::NotAuth);
            let prepared =
                PreparedTsigRr::new_from_read(&tsig, now, FUDGE, ExtendedRcode::BADSIG);
            let algorithm = tsig.algorithm().clone();
            writer
                .set_tsig(TsigMode::Unsigned { algorithm }, prepared)
                .unwrap();
            return vec![writer.finish().unwrap()];
        }

        let prepared =
            PreparedTsigRr::new_from_read(&tsig, now, FUDGE, ExtendedRcode::NOERROR);
        let request_mac: Box<[u8]> = tsig.mac().into();
        match opcode {
            Opcode::Update => vec![self.update(id, &question, &rrs, prepared, request_mac)],
            Opcode::Query if question.qtype == Qtype::AXFR => {
                self.axfr(id, &question, prepared, request_mac)
            }
            _ => panic!("unexpected request"),
        }
    }

    fn update(
        &mut self,
        id: u16,
        question: &Question,
        updates: &[ReadRr],
        prepared: PreparedTsigRr,
        request_mac: Box<[u8]>,
    ) -> Vec<u8> {
        let mut writer = response_writer(id, Opcode::Update, Some(question));
        if self.refuse_updates {
            writer.set_rcode(Rcode::Refused);
            if !self.sign_refusals {
                return writer.finish().unwrap();
            }
        } else {
            for rr in updates {
                if rr.class == Class::ANY {
                    self.records.retain(|stored| {
                        !(stored.owner == rr.owner && stored.rr_type == rr.rr_type)
                    });
                } else if !self.records.iter().any(|stored| {
                    stored.owner == rr.owner
                        && stored.rr_type == rr.rr_type
                        && *stored.rdata == *rr.rdata
                }) {
                    self.records.push(StoredRr {
                        owner: rr.owner.clone(),
                        rr_type: rr.rr_type,
                        ttl: rr.ttl,
                        rdata: rr.rdata.to_owned(),
                    });
                }
            }
        }
        let mode = TsigMode::Response {
            algorithm: ALGORITHM,
            request_mac,
            key: SECRET.into(),
        };
        writer.set_tsig(mode, prepared).unwrap();
        writer.finish().unwrap()
    }

    fn axfr(
        &self,
        id: u16,
        question: &Question,
        prepared: PreparedTsigRr,
        request_mac: Box<[u8]>,
    ) -> Vec<Vec<u8>> {
        let response_mode = |request_mac| TsigMode::Response {
            algorithm: ALGORITHM,
            request_mac,
            key: SECRET.into(),
        };
        if self.refuse_transfers {
            let mut writer = response_writer(id, Opcode::Query, Some(question));
            writer.set_rcode(Rcode::Refused);
            writer.set_tsig(response_mode(request_mac), prepared).unwrap();
            return vec![writer.finish().unwrap()];
        }

        let soa = StoredRr {
            owner: self.zone.clone(),
            rr_type: Type::SOA,
            ttl: 3600.into(),
            rdata: self.soa_rdata(),
        };
        let all: Vec<&StoredRr> = [&soa]
            .into_iter()
            .chain(&self.records)
            .chain([&soa])
            .collect();
        let chunks: Vec<&[&StoredRr]> = all.chunks(self.rrs_per_message).collect();

        let mut prior_mac = request_mac;
        let mut unsigned_messages = Vec::new();
        let mut messages = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let last = i + 1 == chunks.len();
            let mut writer = response_writer(id, Opcode::Query, (i == 0).then_some(question));
            for rr in chunk.iter() {
                writer
                    .add_answer_rr(&rr.owner, rr.rr_type, Class::IN, rr.ttl, &rr.rdata)
                    .unwrap();
            }

            let unsigned = if last {
                !self.sign_final_message
            } else {
                i % (self.unsigned_run + 1) != 0
            };
            if unsigned {
                let message = writer.finish().unwrap();
                unsigned_messages.push(message.clone().into_boxed_slice());
                messages.push(message);
                continue;
            }

            let mode = if i == 0 {
                response_mode(prior_mac.clone())
            } else {
                TsigMode::Subsequent {
                    algorithm: ALGORITHM,
                    prior_mac: prior_mac.clone(),
                    unsigned_messages: mem::take(&mut unsigned_messages),
                    key: SECRET.into(),
                }
            };
            writer.set_tsig(mode, prepared.clone()).unwrap();
            let (message, mac) = writer.finish_with_mac().unwrap();
            prior_mac = mac.unwrap();
            messages.push(message);
        }
        messages
    }

    fn soa_rdata(&self) -> Box<Rdata> {
        let mname: Name = format!("ns1.{}", self.zone).parse().unwrap();
        let rname: Name = format!("hostmaster.{}", self.zone).parse().unwrap();
        let mut octets = Vec::new();
        octets.extend_from_slice(mname.wire_repr());
        octets.extend_from_slice(rname.wire_repr());
        for field in [1u32, 3600, 600, 86400, 300] {
            octets.extend_from_slice(&field.to_be_bytes());
        }
        octets.try_into().unwrap()
    }
}

fn response_writer(id: u16, opcode: Opcode, question: Option<&Question>) -> Writer {
    let mut writer = Writer::new();
    writer.set_id(id);
    writer.set_qr(true);
    writer.set_aa(true);
    writer.set_opcode(opcode);
    if let Some(question) = question {
        writer.add_question(question).unwrap();
    }
    writer
}
