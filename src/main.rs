//! OpenAPI from routes - Command-line tool for generating OpenAPI documentation.
//!
//! Reads an application's route manifest (routes, middleware aliases, OAuth
//! scopes, handler doc comments and validation rules) and writes an OpenAPI
//! 3.0 document.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-routes --routes <FILE> [OPTIONS]
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-routes --routes routes.yaml -o openapi.yaml
//! ```
//!
//! Generate JSON with a configuration file and doc comments from source:
//! ```bash
//! openapi-from-routes --routes routes.yaml --config swagger.yaml --source ./src -f json
//! ```
//!
//! Only document the `/api` routes, with verbose logging:
//! ```bash
//! openapi-from-routes --routes routes.yaml --filter /api -v
//! ```

mod cli;
mod config;
mod doc_block;
mod document;
mod error;
mod generator;
mod manifest;
mod parameters;
mod parser;
mod route;
mod rules;
mod security;
mod serializer;

use anyhow::Result;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    // Parse once for the verbose flag, then validate after the logger is up
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI from routes starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
