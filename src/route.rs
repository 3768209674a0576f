//! Route data objects and the collaborator interfaces the generator consumes.
//!
//! The generator never talks to a web framework directly. Everything it knows
//! about the host application comes through the traits in this module:
//!
//! - [`RouteSource`] lists the routes
//! - [`MetadataResolver`] provides handler doc comments and validation rules
//! - [`ScopeProvider`] enumerates OAuth scopes
//! - [`MiddlewareResolver`] maps middleware aliases to class identifiers
//!
//! The [`manifest`](crate::manifest) module implements all four from a file.

use crate::rules::RuleSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP methods a route can answer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Head,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Options,
    ];

    /// Lowercase name, as used for OpenAPI path item keys
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Head => "head",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "head" => Ok(HttpMethod::Head),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "patch" => Ok(HttpMethod::Patch),
            "delete" => Ok(HttpMethod::Delete),
            "options" => Ok(HttpMethod::Options),
            other => Err(format!("unknown HTTP method: {}", other)),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.to_string()
    }
}

/// A middleware attached to a route, e.g. `scopes:users.read,users.write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Middleware {
    pub name: String,
    pub parameters: Vec<String>,
}

impl Middleware {
    pub fn new(name: impl Into<String>, parameters: Vec<String>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    /// Parse the `name:param1,param2` notation.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((name, params)) => Self {
                name: name.trim().to_string(),
                parameters: params
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect(),
            },
            None => Self::new(raw.trim(), Vec::new()),
        }
    }
}

/// Snapshot of one application route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Normalized URI: leading `/`, optional markers removed (`/users/{id}`)
    pub uri: String,
    /// URI template as registered (`/users/{id?}`)
    pub original_uri: String,
    pub methods: Vec<HttpMethod>,
    pub name: Option<String>,
    /// Handler reference, e.g. `UserController@show` or `handlers::users::show`
    pub action: Option<String>,
    pub middleware: Vec<Middleware>,
}

impl Route {
    /// Create a route with the given URI template and methods
    pub fn new(uri: &str, methods: Vec<HttpMethod>) -> Self {
        let original_uri = with_leading_slash(uri.trim());
        let uri = original_uri.replace("?}", "}");
        Self {
            uri,
            original_uri,
            methods,
            name: None,
            action: None,
            middleware: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }
}

fn with_leading_slash(uri: &str) -> String {
    if uri.starts_with('/') {
        uri.to_string()
    } else {
        format!("/{}", uri)
    }
}

/// An OAuth scope as exposed by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub id: String,
    #[serde(default)]
    pub description: String,
}

/// Source of the application's routes, in registration order.
pub trait RouteSource {
    fn routes(&self) -> Vec<Route>;
}

/// Resolves per-handler metadata for a route.
///
/// Both lookups are allowed to come up empty; the generator treats a missing
/// handler the same as a handler without documentation or rules.
pub trait MetadataResolver {
    /// Raw doc comment of the route's handler, if it can be resolved
    fn doc_comment_for(&self, route: &Route) -> Option<String>;

    /// Validation rules of the request object the handler accepts
    fn validation_rules_for(&self, route: &Route) -> RuleSet;
}

/// Enumerates the OAuth scopes known to the authentication provider.
pub trait ScopeProvider {
    fn scopes(&self) -> Vec<Scope>;
}

/// Maps a middleware alias to the class identifier it is registered under.
pub trait MiddlewareResolver {
    fn resolve(&self, name: &str) -> Option<String>;
}
