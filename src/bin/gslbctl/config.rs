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

//! Implements the configuration file and the assembly of client
//! credentials.
//!
//! Settings are taken, in increasing order of precedence, from built-in
//! defaults, the configuration file, environment variables, and
//! command-line flags. (Clap resolves the last two.)

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use log::Level::Debug;
use log::{debug, log_enabled};
use paste::paste;
use serde::{de, Deserialize};

use pdnsgslb::client::Credentials;
use pdnsgslb::io::Transport;
use pdnsgslb::message::tsig::Algorithm;
use pdnsgslb::name::Name;

use crate::args::ConnectionArgs;

////////////////////////////////////////////////////////////////////////
// CREDENTIAL LOADING                                                 //
////////////////////////////////////////////////////////////////////////

/// Builds the client credentials from the parsed command line and the
/// configuration file it names (if any).
pub fn load(args: &ConnectionArgs) -> Result<Credentials> {
    let file = match args.config {
        Some(ref path) => load_from_path(path)?,
        None => Config::default(),
    };
    let credentials = merge(args, file)?;
    log_credentials_summary(&credentials);
    Ok(credentials)
}

/// Loads the configuration file given by `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let raw_config = fs::read(path.as_ref()).context("failed to read the configuration file")?;
    toml::from_slice(&raw_config).context("failed to parse the configuration file")
}

/// Combines command-line (and environment) settings with those from the
/// configuration file, the former taking precedence.
fn merge(args: &ConnectionArgs, file: Config) -> Result<Credentials> {
    let host = args
        .server
        .clone()
        .or(file.server)
        .ok_or_else(|| missing("server", "--server", "PDNSGLSB_DNSUPDATE_SERVER"))?;
    let key_name = args
        .key_name
        .clone()
        .or(file.key_name)
        .ok_or_else(|| missing("key_name", "--key-name", "PDNSGLSB_DNSUPDATE_KEYNAME"))?;
    let algorithm = args
        .key_algorithm
        .or(file.key_algorithm.map(|a| a.0))
        .ok_or_else(|| {
            missing(
                "key_algorithm",
                "--key-algorithm",
                "PDNSGLSB_DNSUPDATE_KEYALGORITHM",
            )
        })?;
    let secret = args
        .key_secret
        .clone()
        .or(file.key_secret)
        .ok_or_else(|| missing("key_secret", "--key-secret", "PDNSGLSB_DNSUPDATE_KEYSECRET"))?;

    let mut credentials = Credentials::new(
        host,
        parse_key_name(&key_name)?,
        algorithm,
        decode_secret(&secret)?,
    );
    if let Some(port) = args.port.or(file.port) {
        credentials.port = port;
    }
    if let Some(transport) = args.transport.or(file.transport.map(|t| t.0)) {
        credentials.transport = transport;
    }
    if let Some(retries) = args.retries.or(file.retries) {
        credentials.retries = retries;
    }
    if let Some(timeout) = args.timeout.or(file.timeout) {
        if timeout == 0 {
            return Err(anyhow!("the timeout must be at least one second"));
        }
        credentials.timeout = Duration::from_secs(timeout);
    }
    Ok(credentials)
}

fn missing(key: &str, flag: &str, var: &str) -> anyhow::Error {
    anyhow!("no {key} configured (use {flag}, {var}, or the configuration file)")
}

/// Parses a TSIG key name, treating it as fully qualified whether or
/// not it ends in a dot.
fn parse_key_name(text: &str) -> Result<Name> {
    let fqdn = if text.ends_with('.') {
        text.to_owned()
    } else {
        format!("{text}.")
    };
    fqdn.parse()
        .map_err(|e| anyhow!("invalid TSIG key name {text:?}: {e}"))
}

fn decode_secret(text: &str) -> Result<Box<[u8]>> {
    let secret = base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .context("the TSIG secret is not valid base64")?;
    if secret.is_empty() {
        Err(anyhow!("the TSIG secret is empty"))
    } else {
        Ok(secret.into())
    }
}

/// Summarizes the credentials in the log, if the debug log level is
/// enabled. The secret is never logged.
fn log_credentials_summary(credentials: &Credentials) {
    if !log_enabled!(Debug) {
        // Don't compute the message if it will never be printed.
        return;
    }

    debug!(
        "Configuration loaded:\n\
         Server:    {}:{} ({})\n\
         TSIG key:  {} ({})\n\
         Retries:   {}\n\
         Timeout:   {}s",
        credentials.host,
        credentials.port,
        credentials.transport,
        credentials.key_name,
        credentials.algorithm,
        credentials.retries,
        credentials.timeout.as_secs(),
    );
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION FILE STRUCTURE                                       //
////////////////////////////////////////////////////////////////////////

/// The complete configuration file. Every setting is optional here;
/// [`load`] reports the required ones that are missing everywhere.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub transport: Option<ConfigTransport>,
    pub key_name: Option<String>,
    pub key_algorithm: Option<ConfigAlgorithm>,
    pub key_secret: Option<String>,
    pub retries: Option<u32>,
    pub timeout: Option<u64>,
}

////////////////////////////////////////////////////////////////////////
// WRAPPERS OVER PDNSGSLB TYPES FOR SERDE                             //
////////////////////////////////////////////////////////////////////////

/// Generates a deserializable `ConfigX` structure wrapping an `X` type
/// from [`pdnsgslb`], using its [`FromStr`](std::str::FromStr)
/// implementation.
macro_rules! make_serde_wrapper {
    ($wrapper:ident, $over:ty, $description:literal) => {
        /// A macro-generated deserializable wrapper over a [`pdnsgslb`]
        /// type.
        #[derive(Clone, Debug)]
        pub struct $wrapper(pub $over);

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str(paste! { [<$wrapper Visitor>] })
            }
        }

        paste! {
            /// A macro-generated [`Visitor`](de::Visitor).
            #[derive(Debug)]
            struct [<$wrapper Visitor>];
        }

        impl<'de> de::Visitor<'de> for paste! { [<$wrapper Visitor>] } {
            type Value = $wrapper;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str($description)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value
                    .parse()
                    .map($wrapper)
                    .map_err(|e| E::custom(format!("invalid {}: {}", $description, e)))
            }
        }
    };
}

make_serde_wrapper!(ConfigAlgorithm, Algorithm, "TSIG algorithm");
make_serde_wrapper!(ConfigTransport, Transport, "transport");

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ConnectionArgs {
        ConnectionArgs {
            config: None,
            server: None,
            port: None,
            transport: None,
            key_name: None,
            key_algorithm: None,
            key_secret: None,
            retries: None,
            timeout: None,
        }
    }

    const FILE: &str = r#"
        server = "ns1.example.com"
        port = 5353
        transport = "udp"
        key_name = "gslb-key"
        key_algorithm = "hmac-sha512"
        key_secret = "dG9wc2VjcmV0"
        retries = 4
    "#;

    #[test]
    fn file_settings_are_applied() {
        let file: Config = toml::from_str(FILE).unwrap();
        let credentials = merge(&args(), file).unwrap();
        assert_eq!(credentials.host, "ns1.example.com");
        assert_eq!(credentials.port, 5353);
        assert_eq!(credentials.transport, Transport::Udp);
        assert_eq!(credentials.key_name, "gslb-key.".parse().unwrap());
        assert_eq!(credentials.algorithm, Algorithm::HmacSha512);
        assert_eq!(&*credentials.secret, b"topsecret");
        assert_eq!(credentials.retries, 4);
        assert_eq!(credentials.timeout, Credentials::DEFAULT_TIMEOUT);
    }

    #[test]
    fn arguments_override_the_file() {
        let file: Config = toml::from_str(FILE).unwrap();
        let mut args = args();
        args.server = Some("192.0.2.53".to_owned());
        args.transport = Some(Transport::Tcp);
        args.retries = Some(0);
        args.timeout = Some(10);
        let credentials = merge(&args, file).unwrap();
        assert_eq!(credentials.host, "192.0.2.53");
        assert_eq!(credentials.port, 5353);
        assert_eq!(credentials.transport, Transport::Tcp);
        assert_eq!(credentials.retries, 0);
        assert_eq!(credentials.timeout, Duration::from_secs(10));
    }

    #[test]
    fn missing_settings_are_reported() {
        let err = merge(&args(), Config::default()).unwrap_err();
        assert!(err.to_string().contains("PDNSGLSB_DNSUPDATE_SERVER"));
    }

    #[test]
    fn unknown_and_invalid_keys_are_rejected() {
        assert!(toml::from_str::<Config>("bind = \"[::1]:53\"").is_err());
        assert!(toml::from_str::<Config>("key_algorithm = \"hmac-sha384\"").is_err());
        assert!(toml::from_str::<Config>("transport = \"sctp\"").is_err());
    }

    #[test]
    fn secrets_must_be_base64() {
        assert!(decode_secret("not base64!").is_err());
        assert!(decode_secret("").is_err());
        assert_eq!(&*decode_secret(" dG9wc2VjcmV0\n").unwrap(), b"topsecret");
    }
}
