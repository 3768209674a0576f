//! File-backed description of a host application.
//!
//! A route manifest carries everything the generator would otherwise ask the
//! running application for: its routes, the classes behind middleware
//! aliases, the OAuth scopes and per-handler metadata.
//!
//! ```yaml
//! middleware:
//!   scopes: Laravel\Passport\Http\Middleware\CheckScopes
//! scopes:
//!   - id: users.read
//!     description: Read users
//! routes:
//!   - uri: /users/{id}
//!     methods: [GET, HEAD]
//!     name: users.show
//!     action: UserController@show
//!     middleware: ["auth:api", "scopes:users.read"]
//! handlers:
//!   UserController@show:
//!     doc: |
//!       Show a user
//!     rules:
//!       include: in:profile,posts
//! ```

use crate::error::{Error, Result};
use crate::route::{
    HttpMethod, MetadataResolver, Middleware, MiddlewareResolver, Route, RouteSource, Scope,
    ScopeProvider,
};
use crate::rules::RuleSet;
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Routes, middleware aliases, scopes and handler metadata of one application
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteManifest {
    /// Middleware alias -> class identifier
    #[serde(default)]
    pub middleware: BTreeMap<String, String>,
    #[serde(default)]
    pub scopes: Vec<Scope>,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
    /// Handler reference -> metadata
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerMetadata>,
}

/// One route as written in the manifest
#[derive(Debug, Clone, Deserialize)]
pub struct RouteEntry {
    pub uri: String,
    pub methods: Vec<HttpMethod>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    /// Middleware in `name:param1,param2` notation
    #[serde(default)]
    pub middleware: Vec<String>,
}

/// Documentation and validation rules of a handler
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HandlerMetadata {
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub rules: RuleSet,
}

impl RouteEntry {
    fn to_route(&self) -> Route {
        let mut route = Route::new(&self.uri, self.methods.clone());
        route.name = self.name.clone();
        route.action = self.action.clone();
        route.middleware = self.middleware.iter().map(|m| Middleware::parse(m)).collect();
        route
    }
}

impl RouteManifest {
    /// Load a manifest from YAML, or JSON when the extension is `.json`.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading route manifest from {}", path.display());
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };

        let manifest: Self = parsed.map_err(|message| Error::ParseError {
            file: path.to_path_buf(),
            message,
        })?;
        debug!(
            "Manifest has {} routes and {} handlers",
            manifest.routes.len(),
            manifest.handlers.len()
        );
        Ok(manifest)
    }

    fn handler(&self, route: &Route) -> Option<&HandlerMetadata> {
        route.action.as_ref().and_then(|action| self.handlers.get(action))
    }
}

impl RouteSource for RouteManifest {
    fn routes(&self) -> Vec<Route> {
        self.routes.iter().map(RouteEntry::to_route).collect()
    }
}

impl MetadataResolver for RouteManifest {
    fn doc_comment_for(&self, route: &Route) -> Option<String> {
        self.handler(route).and_then(|handler| handler.doc.clone())
    }

    fn validation_rules_for(&self, route: &Route) -> RuleSet {
        self.handler(route)
            .map(|handler| handler.rules.clone())
            .unwrap_or_default()
    }
}

impl ScopeProvider for RouteManifest {
    fn scopes(&self) -> Vec<Scope> {
        self.scopes.clone()
    }
}

impl MiddlewareResolver for RouteManifest {
    fn resolve(&self, name: &str) -> Option<String> {
        self.middleware.get(name).cloned()
    }
}
