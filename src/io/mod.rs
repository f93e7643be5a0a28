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

//! Blocking network transport for DNS messages.
//!
//! Everything here is synchronous: each call blocks the calling thread
//! until the exchange completes or the configured timeout expires. A
//! timeout surfaces as an [`io::Error`] of kind
//! [`TimedOut`](io::ErrorKind::TimedOut) (or
//! [`WouldBlock`](io::ErrorKind::WouldBlock) on some platforms), which
//! callers treat like any other transport failure.
//!
//! * [`tcp`] carries messages over TCP with the two-octet length
//!   prefix of [RFC 1035 § 4.2.2], and is used for zone transfers and
//!   (by default) dynamic updates;
//! * [`udp`] performs single datagram request/response exchanges.
//!
//! [RFC 1035 § 4.2.2]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.2.2

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;
use std::time::{Duration, Instant};

pub mod tcp;
pub mod udp;

/// The transport protocol over which DNS messages are exchanged.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Transport {
    #[default]
    Tcp,
    Udp,
}

impl FromStr for Transport {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            _ => Err("transport must be tcp or udp"),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
        }
    }
}

/// Resolves `host` and `port` to socket addresses. Fails if the name
/// resolves to nothing.
pub fn resolve(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
    if addrs.is_empty() {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{host} did not resolve to any address"),
        ))
    } else {
        Ok(addrs)
    }
}

/// Computes the time until the deadline. Returns a
/// [`TimedOut`](io::ErrorKind::TimedOut) error if the deadline has
/// passed.
fn time_left(deadline: Instant) -> io::Result<Duration> {
    match deadline.checked_duration_since(Instant::now()) {
        Some(left) if !left.is_zero() => Ok(left),
        _ => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "timed out waiting for the server",
        )),
    }
}

/// Executes `f`, retrying the operation if it is interrupted.
fn retry_if_interrupted<F, R>(mut f: F) -> io::Result<R>
where
    F: FnMut() -> io::Result<R>,
{
    loop {
        match f() {
            Ok(r) => return Ok(r),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_text_forms_work() {
        assert_eq!("TCP".parse(), Ok(Transport::Tcp));
        assert_eq!("udp".parse(), Ok(Transport::Udp));
        assert!("sctp".parse::<Transport>().is_err());
        assert_eq!(Transport::default().to_string(), "tcp");
    }

    #[test]
    fn resolve_handles_literals() {
        let addrs = resolve("127.0.0.1", 53).unwrap();
        assert_eq!(addrs, vec![SocketAddr::from(([127, 0, 0, 1], 53))]);
    }

    #[test]
    fn time_left_expires() {
        assert!(time_left(Instant::now() + Duration::from_secs(60)).is_ok());
        let err = time_left(Instant::now()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
