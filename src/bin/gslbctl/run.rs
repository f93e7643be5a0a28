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

//! Implements command execution.

use std::fmt::Write;
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use env_logger::Env;
use log::{error, info};

use pdnsgslb::client::{Client, Identity};
use pdnsgslb::lua::{wire, Entry};

use crate::args::{Args, Command, LookupArgs};
use crate::config;
use crate::records::{self, RecordFile};

/// Runs the command given on the command line.
pub fn run(args: Args) {
    env_logger::init_from_env(Env::new().default_filter_or("warn"));

    if let Err(e) = try_running(args) {
        let mut message = String::from("Failed:");
        for (i, cause) in e.chain().enumerate() {
            write!(message, "\n[{}] {}", i + 1, cause).unwrap();
        }
        error!("{}", message);
        process::exit(1);
    }
}

fn try_running(args: Args) -> Result<()> {
    let client = || -> Result<Client> {
        let credentials =
            config::load(&args.connection).context("failed to load the configuration")?;
        Ok(Client::new(credentials))
    };

    match args.command {
        Command::Create { ref file } => {
            let (identity, entries) = load_definition(file)?;
            client()?
                .create(&identity.to_string(), &entries)
                .with_context(|| format!("failed to create {identity}"))?;
            info!("Created {} with {} entries.", identity, entries.len());
            println!("{identity}");
        }
        Command::Update { ref file } => {
            let (identity, entries) = load_definition(file)?;
            client()?
                .update(&identity.to_string(), &entries)
                .with_context(|| format!("failed to update {identity}"))?;
            info!("Updated {} with {} entries.", identity, entries.len());
            println!("{identity}");
        }
        Command::Delete { ref id } => {
            let identity = client()?
                .delete(id)
                .with_context(|| format!("failed to delete {id}"))?;
            info!("Deleted {}.", identity);
        }
        Command::Read(ref lookup) => {
            let entries = client()?
                .read(&lookup.id, lookup.kind)
                .with_context(|| format!("failed to read {}", lookup.id))?;
            let identity: Identity = lookup.id.parse()?;
            print!("{}", definition(lookup, &identity, &entries)?);
        }
        Command::Import(ref lookup) => {
            let (identity, entries) = client()?
                .import(&lookup.id, lookup.kind)
                .with_context(|| format!("failed to import {}", lookup.id))?;
            println!(
                "# Imported {} as name {:?} in zone {:?}.",
                identity,
                identity.name(),
                identity.zone().to_string()
            );
            print!("{}", definition(lookup, &identity, &entries)?);
        }
        Command::Render { ref file } => render(file)?,
        Command::Decode { ref hex } => {
            let (rr_type, payload) = wire::decode(hex.trim()).context("failed to decode RDATA")?;
            println!("type:    {rr_type}");
            println!("snippet: {}", String::from_utf8_lossy(&payload));
        }
    }
    Ok(())
}

/// Loads a definition file and converts its entries.
fn load_definition(path: &Path) -> Result<(Identity, Vec<Entry>)> {
    let file = records::load_from_path(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok((file.identity()?, file.entries()?))
}

fn definition(
    lookup: &LookupArgs,
    identity: &Identity,
    entries: &[Entry],
) -> Result<String> {
    RecordFile::from_entries(lookup.kind, identity, entries).to_toml()
}

/// Prints the owner and, for each entry, the snippet and generic RDATA
/// that would be sent to the server.
fn render(path: &Path) -> Result<()> {
    let (identity, entries) = load_definition(path)?;
    for (i, entry) in entries.iter().enumerate() {
        let snippet = entry
            .snippet()
            .with_context(|| format!("failed to render entry #{}", i + 1))?;
        let rdata = wire::encode_rdata(entry.rr_type, &snippet)
            .with_context(|| format!("failed to encode entry #{}", i + 1))?;
        println!("{} {} IN LUA {} \"{}\"", identity, entry.ttl, entry.rr_type, snippet);
        println!("    {rdata}");
    }
    Ok(())
}
