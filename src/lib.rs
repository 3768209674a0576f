//! OpenAPI from routes - OpenAPI 3.0 documents from an application's route table.
//!
//! The generator walks the routes registered by a host application and turns
//! each one into OpenAPI operations. Operation metadata comes from handler doc
//! comments (`@Request`, `@Response`, `@deprecated`), parameters come from the
//! handler's validation rules, and security requirements come from
//! scope-checking middleware.
//!
//! # Architecture
//!
//! 1. [`route`] - Route snapshots and the traits the host application implements
//! 2. [`manifest`] - File-backed implementation of those traits
//! 3. [`config`] - Generator configuration
//! 4. [`rules`] - Validation rule interpretation
//! 5. [`parameters`] - Query, body and path parameter generation
//! 6. [`doc_block`] - Doc comment parsing
//! 7. [`security`] - Security schemes and per-route requirements
//! 8. [`parser`] - Doc comments read from Rust handler sources
//! 9. [`generator`] - Assembles the complete [`document::Document`]
//! 10. [`serializer`] - Serializes the document to YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_routes::{
//!     config::Configuration,
//!     generator::{Collaborators, Generator},
//!     manifest::RouteManifest,
//!     serializer::serialize_yaml,
//! };
//! use std::path::Path;
//!
//! let config = Configuration::load(Path::new("swagger.yaml")).unwrap();
//! let manifest = RouteManifest::load(Path::new("routes.yaml")).unwrap();
//!
//! let document = Generator::new(&config, Collaborators::from_single(&manifest))
//!     .generate()
//!     .unwrap();
//!
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod cli;
pub mod config;
pub mod doc_block;
pub mod document;
pub mod error;
pub mod generator;
pub mod manifest;
pub mod parameters;
pub mod parser;
pub mod route;
pub mod rules;
pub mod security;
pub mod serializer;
