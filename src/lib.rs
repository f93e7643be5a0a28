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

//! Management of PowerDNS Lua-record GSLB policies over TSIG-signed
//! dynamic update and zone transfer.
//!
//! PowerDNS can compute the answer to a query at query time by
//! evaluating a short Lua snippet stored in a `LUA` record. This crate
//! maps a handful of global-server-load-balancing policies (random
//! address selection, weighted selection, and port and URL health-check
//! failover) to and from such snippets, and synchronizes them with a
//! live zone:
//!
//! * [`lua`] holds the structured [`Entry`](lua::Entry) and
//!   [`Policy`](lua::Policy) types, the snippet grammar, and the codec
//!   for the private `LUA` RDATA format;
//! * [`client`] implements the TSIG-authenticated DNS transport (AXFR
//!   and UPDATE) and the synchronization [`Client`](client::Client)
//!   built on top of it;
//! * [`message`], [`name`], [`rr`], [`class`], and [`io`] provide the
//!   DNS wire-format and network plumbing they need.

pub mod class;
pub mod client;
pub mod io;
pub mod lua;
pub mod message;
pub mod name;
pub mod rr;
mod util;
