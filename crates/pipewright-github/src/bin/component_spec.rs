// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI tool to print the loaded component definition.
//!
//! Usage:
//!   cargo run -p pipewright-github --bin component-spec > github.json
//!   cargo run -p pipewright-github --bin component-spec -- --spec-only > component_spec.json
//!   cargo run -p pipewright-github --bin component-spec -- --list

use anyhow::Context;
use pipewright_component::registered_components;

// Force linking of pipewright_github to ensure its inventory registration is included
extern crate pipewright_github;

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pipewright_component=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let spec_only = args.iter().any(|a| a == "--spec-only");
    let list = args.iter().any(|a| a == "--list");
    let help = args.iter().any(|a| a == "--help" || a == "-h");

    if help {
        print_help();
        return Ok(());
    }

    if list {
        for registration in registered_components() {
            println!("{}", registration.id);
        }
        return Ok(());
    }

    let definition =
        pipewright_github::definition().context("failed to load the GitHub definition")?;

    let rendered = if spec_only {
        serde_json::to_string_pretty(&definition.spec.component_specification)?
    } else {
        serde_json::to_string_pretty(definition)?
    };
    println!("{rendered}");

    Ok(())
}

fn print_help() {
    println!(
        r#"component-spec: print the GitHub component definition

USAGE:
    component-spec [OPTIONS]

OPTIONS:
    --spec-only    Print only the component specification
    --list         Print the ids of all linked components
    -h, --help     Print this help"#
    );
}
