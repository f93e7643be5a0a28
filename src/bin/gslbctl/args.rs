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

//! Implements command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pdnsgslb::io::Transport;
use pdnsgslb::lua::Variant;
use pdnsgslb::message::tsig::Algorithm;

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// Manage PowerDNS Lua-record GSLB policies over TSIG-signed DNS
#[derive(Debug, Parser)]
#[command(author, version)]
pub struct Args {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Where and how to reach the authoritative server. Each option falls
/// back to its environment variable and then to the configuration
/// file.
#[derive(Debug, clap::Args)]
pub struct ConnectionArgs {
    /// Set the configuration file to use
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Set the authoritative server's host name or IP address
    #[arg(long, global = true, env = "PDNSGLSB_DNSUPDATE_SERVER", value_name = "HOST")]
    pub server: Option<String>,

    /// Set the server port
    #[arg(long, global = true, env = "PDNSGLSB_DNSUPDATE_PORT", value_name = "PORT")]
    pub port: Option<u16>,

    /// Set the transport for UPDATE messages (tcp or udp)
    #[arg(long, global = true, env = "PDNSGLSB_DNSUPDATE_TRANSPORT", value_name = "PROTO")]
    pub transport: Option<Transport>,

    /// Set the TSIG key name
    #[arg(long, global = true, env = "PDNSGLSB_DNSUPDATE_KEYNAME", value_name = "NAME")]
    pub key_name: Option<String>,

    /// Set the TSIG algorithm (hmac-md5, hmac-sha1, hmac-sha256, or
    /// hmac-sha512)
    #[arg(long, global = true, env = "PDNSGLSB_DNSUPDATE_KEYALGORITHM", value_name = "ALG")]
    pub key_algorithm: Option<Algorithm>,

    /// Set the base64-encoded TSIG secret
    #[arg(
        long,
        global = true,
        env = "PDNSGLSB_DNSUPDATE_KEYSECRET",
        hide_env_values = true,
        value_name = "BASE64"
    )]
    pub key_secret: Option<String>,

    /// Set how many times to retry after a transport failure
    #[arg(long, global = true, env = "PDNSGLSB_DNSUPDATE_RETRIES", value_name = "N")]
    pub retries: Option<u32>,

    /// Set the network timeout of each attempt, in seconds
    #[arg(long, global = true, env = "PDNSGLSB_DNSUPDATE_TIMEOUT", value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a record from a definition file
    Create {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Replace a record's entries with those of a definition file
    Update {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Delete a record
    Delete {
        #[arg(value_name = "FQDN")]
        id: String,
    },

    /// Print a record as a definition file
    Read(LookupArgs),

    /// Print an existing record as a definition file to adopt it
    Import(LookupArgs),

    /// Print the snippets and RDATA of a definition file without
    /// contacting the server
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Decode hex-encoded LUA RDATA
    Decode {
        #[arg(value_name = "HEX")]
        hex: String,
    },
}

#[derive(Debug, clap::Args)]
pub struct LookupArgs {
    /// The record's fully qualified owner name
    #[arg(value_name = "FQDN")]
    pub id: String,

    /// The kind of record to read (lua, pickrandom, pickwrandom,
    /// ifportup, or ifurlup)
    #[arg(long, value_name = "KIND")]
    pub kind: Variant,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn read_parses_the_kind() {
        let args = Args::try_parse_from([
            "gslbctl",
            "read",
            "www.example.com.",
            "--kind",
            "PickWRandom",
            "--server",
            "192.0.2.53",
        ])
        .unwrap();
        assert_eq!(args.connection.server.as_deref(), Some("192.0.2.53"));
        match args.command {
            Command::Read(lookup) => {
                assert_eq!(lookup.id, "www.example.com.");
                assert_eq!(lookup.kind, Variant::PickWeightedRandom);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn invalid_algorithms_are_rejected() {
        assert!(Args::try_parse_from([
            "gslbctl",
            "--key-algorithm",
            "hmac-sha384",
            "delete",
            "www.example.com.",
        ])
        .is_err());
    }
}
