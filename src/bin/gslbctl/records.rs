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

//! Implements record-definition files.
//!
//! A definition file describes one GSLB record: its kind, its owner
//! (split into a single-label `name` and a `zone`), and its entries.
//! For example:
//!
//! ```toml
//! kind = "ifportup"
//! zone = "example.com."
//! name = "www"
//!
//! [[record]]
//! rrtype = "A"
//! ttl = 60
//! port = 443
//! timeout = 2
//! addresses = ["192.0.2.1", "192.0.2.2"]
//! ```

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use pdnsgslb::client::Identity;
use pdnsgslb::lua::{self, Entry, Policy, Variant, Weighted};
use pdnsgslb::rr::Type;

/// Loads the definition file at `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RecordFile> {
    let raw = fs::read(path.as_ref()).context("failed to read the record definition")?;
    toml::from_slice(&raw).context("failed to parse the record definition")
}

////////////////////////////////////////////////////////////////////////
// FILE STRUCTURE                                                     //
////////////////////////////////////////////////////////////////////////

/// A complete definition file.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecordFile {
    pub kind: String,
    pub zone: String,
    pub name: String,
    #[serde(default)]
    pub record: Vec<RecordDef>,
}

/// One entry of a definition file. Which fields apply depends on the
/// record's kind.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDef {
    pub rrtype: String,
    #[serde(default)]
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stringmatch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Addresses>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipaddress: Option<Vec<WeightedDef>>,
}

/// The `addresses` field: a plain list for most kinds, or primary and
/// backup lists for `ifurlup`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Addresses {
    List(Vec<String>),
    Split {
        primary: Vec<String>,
        #[serde(default)]
        backup: Vec<String>,
    },
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WeightedDef {
    pub weight: u32,
    pub ip: String,
}

////////////////////////////////////////////////////////////////////////
// CONVERSION                                                         //
////////////////////////////////////////////////////////////////////////

impl RecordFile {
    /// Builds the definition of a record read back from the server.
    pub fn from_entries(variant: Variant, identity: &Identity, entries: &[Entry]) -> Self {
        Self {
            kind: variant.to_string(),
            zone: identity.zone().to_string(),
            name: identity.name(),
            record: entries.iter().map(RecordDef::from_entry).collect(),
        }
    }

    pub fn variant(&self) -> Result<Variant> {
        self.kind
            .parse()
            .map_err(|e| anyhow!("invalid kind {:?}: {}", self.kind, e))
    }

    /// The record's identity. The zone is taken as fully qualified
    /// whether or not it ends in a dot.
    pub fn identity(&self) -> Result<Identity> {
        let zone = if self.zone.ends_with('.') {
            self.zone.clone()
        } else {
            format!("{}.", self.zone)
        };
        Identity::from_parts(&self.name, &zone)
            .with_context(|| format!("invalid record name {:?} in zone {:?}", self.name, self.zone))
    }

    /// Converts the entries of the file to the kind it declares.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        let variant = self.variant()?;
        self.record
            .iter()
            .enumerate()
            .map(|(i, def)| {
                def.to_entry(variant)
                    .with_context(|| format!("invalid record entry #{}", i + 1))
            })
            .collect()
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("failed to serialize the record definition")
    }
}

impl RecordDef {
    fn to_entry(&self, variant: Variant) -> Result<Entry> {
        let rr_type: Type = self
            .rrtype
            .parse()
            .map_err(|e| anyhow!("invalid rrtype {:?}: {}", self.rrtype, e))?;
        let policy = match variant {
            Variant::Lua => Policy::Raw(required(&self.snippet, "snippet")?.clone()),
            Variant::PickRandom => Policy::PickRandom {
                addresses: self.address_list()?,
            },
            Variant::PickWeightedRandom => Policy::PickWeightedRandom {
                weighted: required(&self.ipaddress, "ipaddress")?
                    .iter()
                    .map(|w| Weighted::new(w.weight, w.ip.as_str()))
                    .collect(),
            },
            Variant::IfPortUp => Policy::IfPortUp {
                port: *required(&self.port, "port")?,
                addresses: self.address_list()?,
                timeout: self.timeout.unwrap_or(lua::DEFAULT_TIMEOUT),
            },
            Variant::IfUrlUp => {
                let (primary, backup) = match required(&self.addresses, "addresses")? {
                    Addresses::Split { primary, backup } => (primary.clone(), backup.clone()),
                    Addresses::List(_) => {
                        return Err(anyhow!(
                            "addresses must be a table with primary and backup lists"
                        ));
                    }
                };
                Policy::IfUrlUp {
                    url: required(&self.url, "url")?.clone(),
                    primary,
                    backup,
                    stringmatch: self.stringmatch.clone().unwrap_or_default(),
                }
            }
        };
        Ok(Entry::new(rr_type, self.ttl.into(), policy))
    }

    fn address_list(&self) -> Result<Vec<String>> {
        match required(&self.addresses, "addresses")? {
            Addresses::List(addresses) => Ok(addresses.clone()),
            Addresses::Split { .. } => Err(anyhow!("addresses must be a list")),
        }
    }

    fn from_entry(entry: &Entry) -> Self {
        let mut def = Self {
            rrtype: entry.rr_type.to_string(),
            ttl: entry.ttl.into(),
            ..Default::default()
        };
        match entry.policy {
            Policy::Raw(ref snippet) => def.snippet = Some(snippet.clone()),
            Policy::PickRandom { ref addresses } => {
                def.addresses = Some(Addresses::List(addresses.clone()));
            }
            Policy::PickWeightedRandom { ref weighted } => {
                def.ipaddress = Some(
                    weighted
                        .iter()
                        .map(|w| WeightedDef {
                            weight: w.weight,
                            ip: w.address.clone(),
                        })
                        .collect(),
                );
            }
            Policy::IfPortUp {
                port,
                ref addresses,
                timeout,
            } => {
                def.port = Some(port);
                def.timeout = Some(timeout);
                def.addresses = Some(Addresses::List(addresses.clone()));
            }
            Policy::IfUrlUp {
                ref url,
                ref primary,
                ref backup,
                ref stringmatch,
            } => {
                def.url = Some(url.clone());
                def.stringmatch = Some(stringmatch.clone());
                def.addresses = Some(Addresses::Split {
                    primary: primary.clone(),
                    backup: backup.clone(),
                });
            }
        }
        def
    }
}

fn required<'a, T>(field: &'a Option<T>, name: &str) -> Result<&'a T> {
    field
        .as_ref()
        .ok_or_else(|| anyhow!("missing field {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IFURLUP: &str = r#"
        kind = "ifurlup"
        zone = "example.com"
        name = "www"

        [[record]]
        rrtype = "A"
        ttl = 30
        url = "https://www.example.com/health"
        stringmatch = "OK"
        addresses = { primary = ["192.0.2.1", "192.0.2.2"] }
    "#;

    #[test]
    fn ifurlup_definitions_load() {
        let file: RecordFile = toml::from_str(IFURLUP).unwrap();
        assert_eq!(file.identity().unwrap().to_string(), "www.example.com.");
        let entries = file.entries().unwrap();
        assert_eq!(
            entries,
            vec![Entry::new(
                Type::A,
                30.into(),
                Policy::IfUrlUp {
                    url: "https://www.example.com/health".to_owned(),
                    primary: vec!["192.0.2.1".to_owned(), "192.0.2.2".to_owned()],
                    backup: Vec::new(),
                    stringmatch: "OK".to_owned(),
                }
            )]
        );
    }

    #[test]
    fn ifportup_timeout_defaults() {
        let file: RecordFile = toml::from_str(
            r#"
            kind = "ifportup"
            zone = "example.com."
            name = "www"

            [[record]]
            rrtype = "AAAA"
            port = 443
            addresses = ["2001:db8::1"]
            "#,
        )
        .unwrap();
        match &file.entries().unwrap()[0].policy {
            Policy::IfPortUp { timeout, .. } => assert_eq!(*timeout, lua::DEFAULT_TIMEOUT),
            other => panic!("unexpected policy {other:?}"),
        }
    }

    #[test]
    fn missing_fields_are_reported() {
        let file: RecordFile = toml::from_str(
            r#"
            kind = "pickwrandom"
            zone = "example.com."
            name = "www"

            [[record]]
            rrtype = "A"
            addresses = ["192.0.2.1"]
            "#,
        )
        .unwrap();
        let err = file.entries().unwrap_err();
        assert_eq!(err.root_cause().to_string(), "missing field ipaddress");
    }

    #[test]
    fn multi_label_names_are_rejected() {
        let file: RecordFile = toml::from_str(
            "kind = \"lua\"\nzone = \"example.com.\"\nname = \"a.b\"\n",
        )
        .unwrap();
        assert!(file.identity().is_err());
    }

    #[test]
    fn definitions_survive_serialization() {
        let identity: Identity = "www.example.com.".parse().unwrap();
        let entries = vec![Entry::new(
            Type::A,
            60.into(),
            Policy::PickWeightedRandom {
                weighted: vec![Weighted::new(1, "192.0.2.1"), Weighted::new(3, "192.0.2.2")],
            },
        )];
        let text = RecordFile::from_entries(Variant::PickWeightedRandom, &identity, &entries)
            .to_toml()
            .unwrap();
        let file: RecordFile = toml::from_str(&text).unwrap();
        assert_eq!(file.kind, "pickwrandom");
        assert_eq!(file.name, "www");
        assert_eq!(file.entries().unwrap(), entries);
    }
}
