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

//! DNS over TCP.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use log::debug;

use super::{retry_if_interrupted, time_left};

/// A TCP connection carrying length-prefixed DNS messages.
///
/// Every read and write is bounded by the connection's timeout: a
/// message that does not arrive completely within the timeout fails
/// with a [`TimedOut`](io::ErrorKind::TimedOut) error.
pub struct Connection {
    stream: TcpStream,
    timeout: Duration,
}

impl Connection {
    /// Connects to the first of `addrs` that accepts a connection
    /// within `timeout`. The error from the last address tried is
    /// returned if none do.
    pub fn connect(addrs: &[SocketAddr], timeout: Duration) -> io::Result<Self> {
        let mut last_error =
            io::Error::new(io::ErrorKind::InvalidInput, "no address to connect to");
        for addr in addrs {
            match TcpStream::connect_timeout(addr, timeout) {
                Ok(stream) => {
                    debug!("connected to {addr} over TCP");
                    return Self::from_stream(stream, timeout);
                }
                Err(e) => {
                    debug!("TCP connection to {addr} failed: {e}");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    /// Wraps an established stream (e.g. one accepted by a listener).
    pub fn from_stream(stream: TcpStream, timeout: Duration) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(Self { stream, timeout })
    }

    /// Sends a single message, prefixed with its two-octet length.
    pub fn send_message(&mut self, message: &[u8]) -> io::Result<()> {
        let len = u16::try_from(message.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "message too long for TCP transport",
            )
        })?;

        // A single write keeps the length and the message in one
        // segment. Note that write_all retries if the write system
        // calls are interrupted.
        let mut framed = Vec::with_capacity(2 + message.len());
        framed.extend_from_slice(&len.to_be_bytes());
        framed.extend_from_slice(message);
        self.stream.write_all(&framed)?;
        self.stream.flush()
    }

    /// Receives the next message. Returns `Ok(None)` if the peer closed
    /// the connection cleanly before the first octet of a message.
    pub fn recv_message(&mut self) -> io::Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + self.timeout;
        let mut len_buf = [0; 2];
        if !self.read_exact_by(&mut len_buf, deadline, true)? {
            return Ok(None);
        }
        let len = u16::from_be_bytes(len_buf) as usize;
        let mut message = vec![0; len];
        self.read_exact_by(&mut message, deadline, false)?;
        Ok(Some(message))
    }

    /// Fills `buf` before `deadline`. If `eof_ok` is set, a connection
    /// closed before any octet was read yields `Ok(false)`; otherwise
    /// a premature close is an [`UnexpectedEof`](io::ErrorKind::UnexpectedEof)
    /// error.
    fn read_exact_by(
        &mut self,
        buf: &mut [u8],
        deadline: Instant,
        eof_ok: bool,
    ) -> io::Result<bool> {
        let mut n_read = 0;
        while n_read < buf.len() {
            self.stream.set_read_timeout(Some(time_left(deadline)?))?;
            let n = match retry_if_interrupted(|| self.stream.read(&mut buf[n_read..])) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, e));
                }
                Err(e) => return Err(e),
            };
            if n == 0 {
                if eof_ok && n_read == 0 {
                    return Ok(false);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed in the middle of a message",
                ));
            }
            n_read += n;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn messages_are_length_prefixed() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let peer = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = [0; 5];
            stream.read_exact(&mut received).unwrap();
            assert_eq!(&received, b"\x00\x03abc");
            // Send two messages in a single write, then close.
            stream.write_all(b"\x00\x02hi\x00\x00").unwrap();
        });

        let mut connection = Connection::connect(&[addr], TIMEOUT).unwrap();
        connection.send_message(b"abc").unwrap();
        assert_eq!(connection.recv_message().unwrap(), Some(b"hi".to_vec()));
        assert_eq!(connection.recv_message().unwrap(), Some(Vec::new()));
        peer.join().unwrap();
        assert_eq!(connection.recv_message().unwrap(), None);
    }

    #[test]
    fn truncated_messages_are_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let peer = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"\x00\x10short").unwrap();
        });

        let mut connection = Connection::connect(&[addr], TIMEOUT).unwrap();
        peer.join().unwrap();
        let err = connection.recv_message().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn slow_peers_time_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let peer = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(500));
            drop(stream);
        });

        let mut connection = Connection::connect(&[addr], Duration::from_millis(100)).unwrap();
        let err = connection.recv_message().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        peer.join().unwrap();
    }
}
