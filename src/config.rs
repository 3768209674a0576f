//! Generator configuration.
//!
//! The configuration is read once per run and handed to the
//! [`Generator`](crate::generator::Generator) explicitly. Every option has a
//! default, so an empty file (or no file at all) is a valid configuration:
//!
//! ```yaml
//! title: Shop API
//! version: 2.1.0
//! host: api.shop.test
//! servers:
//!   - https://api.shop.test
//!   - url: https://staging.shop.test
//!     description: Staging
//! ignored:
//!   methods: [head, options]
//!   routes: [telescope, /health]
//! append:
//!   responses:
//!     "401":
//!       description: Unauthorized
//! parse:
//!   docBlock: true
//!   security: true
//! authentication_flow:
//!   OAuth2: authorizationCode
//! ```

use crate::document::{Response, Tag};
use crate::error::{Error, Result};
use crate::route::HttpMethod;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// All options recognized by the generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub title: String,
    pub description: Option<String>,
    pub version: String,
    /// Host used to build OAuth endpoint URLs
    pub host: Option<String>,
    /// Base URL of the application, used when no servers are configured
    pub app_url: Option<String>,
    /// Application name, used when no servers are configured
    pub app_name: Option<String>,
    /// Use `https://` for OAuth endpoints whose host has no scheme
    pub secure: bool,
    pub servers: Vec<ServerEntry>,
    pub tags: Vec<Tag>,
    pub ignored: Ignored,
    pub append: Append,
    pub parse: ParseOptions,
    /// Security definition name -> authentication flow
    pub authentication_flow: BTreeMap<String, String>,
}

/// A configured server: bare URL or object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerEntry {
    Url(String),
    Detailed {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
}

/// Routes and methods hidden from the documentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ignored {
    pub methods: Vec<String>,
    /// Route names or URIs
    pub routes: Vec<String>,
}

/// Data appended to every operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Append {
    pub responses: BTreeMap<String, Response>,
}

/// Parsing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    #[serde(rename = "docBlock")]
    pub doc_block: bool,
    pub security: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        let mut authentication_flow = BTreeMap::new();
        authentication_flow.insert("OAuth2".to_string(), "authorizationCode".to_string());

        Self {
            title: "Application API Documentation".to_string(),
            description: Some("Documentation for the Application API".to_string()),
            version: "1.0.0".to_string(),
            host: None,
            app_url: None,
            app_name: None,
            secure: false,
            servers: Vec::new(),
            tags: Vec::new(),
            ignored: Ignored::default(),
            append: Append::default(),
            parse: ParseOptions::default(),
            authentication_flow,
        }
    }
}

impl Default for Ignored {
    fn default() -> Self {
        Self {
            methods: vec!["head".to_string()],
            routes: Vec::new(),
        }
    }
}

impl Default for Append {
    fn default() -> Self {
        let mut responses = BTreeMap::new();
        responses.insert(
            "401".to_string(),
            Response::new("(Unauthorized) Invalid or missing Access Token"),
        );
        Self { responses }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            doc_block: true,
            security: true,
        }
    }
}

impl Configuration {
    /// Load configuration from a YAML file, or JSON when the extension is `.json`.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_str_for(path, &content)
    }

    fn from_str_for(path: &Path, content: &str) -> Result<Self> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(content).map_err(|e| e.to_string())
        } else if content.trim().is_empty() {
            Ok(Self::default())
        } else {
            serde_yaml::from_str(content).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| Error::ParseError {
            file: path.to_path_buf(),
            message,
        })
    }

    /// Whether `method` is listed under `ignored.methods` (case-insensitive)
    pub fn ignores_method(&self, method: HttpMethod) -> bool {
        self.ignored
            .methods
            .iter()
            .any(|m| m.trim().eq_ignore_ascii_case(method.as_str()))
    }

    /// Whether a route name or URI is listed under `ignored.routes`
    pub fn ignores_route(&self, name: Option<&str>, uri: &str) -> bool {
        self.ignored
            .routes
            .iter()
            .any(|ignored| Some(ignored.as_str()) == name || ignored == uri)
    }
}
