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

//! DNS over UDP.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use log::debug;

use super::{retry_if_interrupted, time_left};

/// The largest datagram we are prepared to receive.
const RECEIVE_BUFFER_SIZE: usize = u16::MAX as usize;

/// Sends `message` to `addr` and waits up to `timeout` for a datagram
/// from `addr` whose message ID is `id`. Datagrams from other sources
/// or with other IDs are discarded.
pub fn exchange(
    addr: SocketAddr,
    message: &[u8],
    id: u16,
    timeout: Duration,
) -> io::Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let local: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local)?;
    socket.connect(addr)?;
    socket.set_write_timeout(Some(timeout))?;
    retry_if_interrupted(|| socket.send(message))?;

    let mut buf = vec![0; RECEIVE_BUFFER_SIZE];
    loop {
        socket.set_read_timeout(Some(time_left(deadline)?))?;
        let len = match retry_if_interrupted(|| socket.recv(&mut buf)) {
            Ok(len) => len,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                return Err(io::Error::new(io::ErrorKind::TimedOut, e));
            }
            Err(e) => return Err(e),
        };
        if len >= 2 && u16::from_be_bytes([buf[0], buf[1]]) == id {
            buf.truncate(len);
            return Ok(buf);
        }
        debug!("discarding {len}-octet UDP datagram with a mismatched ID");
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn exchange_skips_mismatched_ids() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        let peer = thread::spawn(move || {
            let mut buf = [0; 512];
            let (len, src) = server.recv_from(&mut buf).unwrap();
            assert_eq!(&buf[..len], b"\x12\x34query");
            server.send_to(b"\x99\x99stale", src).unwrap();
            server.send_to(b"\x12\x34answer", src).unwrap();
        });

        let response = exchange(addr, b"\x12\x34query", 0x1234, Duration::from_secs(5)).unwrap();
        assert_eq!(response, b"\x12\x34answer");
        peer.join().unwrap();
    }

    #[test]
    fn exchange_times_out() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        let err = exchange(addr, b"\x00\x01", 1, Duration::from_millis(100)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        drop(server);
    }
}
