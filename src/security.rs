//! Security scheme and requirement generation.
//!
//! Security schemes come from the `authentication_flow` configuration, which
//! maps a definition name to a flow:
//!
//! | Definition   | Allowed flows                                          |
//! |--------------|--------------------------------------------------------|
//! | `OAuth2`     | `password`, `application`, `implicit`, `authorizationCode` |
//! | `bearerAuth` | `http`                                                 |
//!
//! Per-route requirements are derived from scope-checking middleware: a
//! route guarded by `scopes:orders.read` requires the `orders.read` scope.

use crate::config::Configuration;
use crate::document::{OAuthFlow, SecurityRequirement, SecurityScheme};
use crate::error::{Error, Result};
use crate::route::{Middleware, MiddlewareResolver, Route, ScopeProvider};
use log::debug;
use std::collections::BTreeMap;

pub const OAUTH_TOKEN_PATH: &str = "/oauth/token";
pub const OAUTH_AUTHORIZE_PATH: &str = "/oauth/authorize";

/// Middleware classes that enforce OAuth scopes
pub const CHECK_SCOPES_MIDDLEWARE: &str = "Laravel\\Passport\\Http\\Middleware\\CheckScopes";
pub const CHECK_FOR_ANY_SCOPE_MIDDLEWARE: &str =
    "Laravel\\Passport\\Http\\Middleware\\CheckForAnyScope";

/// Supported security definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityDefinition {
    OAuth2,
    BearerAuth,
}

impl SecurityDefinition {
    pub const ALL: [SecurityDefinition; 2] =
        [SecurityDefinition::OAuth2, SecurityDefinition::BearerAuth];

    pub fn name(&self) -> &'static str {
        match self {
            SecurityDefinition::OAuth2 => "OAuth2",
            SecurityDefinition::BearerAuth => "bearerAuth",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|definition| definition.name() == name)
    }

    pub fn allowed_flows(&self) -> &'static [&'static str] {
        match self {
            SecurityDefinition::OAuth2 => &["password", "application", "implicit", "authorizationCode"],
            SecurityDefinition::BearerAuth => &["http"],
        }
    }

    /// Check that `flow` may be used with this definition
    pub fn validate_flow(&self, flow: &str) -> Result<()> {
        if self.allowed_flows().contains(&flow) {
            return Ok(());
        }
        Err(Error::InvalidAuthenticationFlow {
            definition: self.name().to_string(),
            flow: flow.to_string(),
            allowed: self.allowed_flows().iter().map(|f| f.to_string()).collect(),
        })
    }
}

/// Whether the route table exposes the OAuth token or authorize endpoint
pub fn has_oauth_routes(routes: &[Route]) -> bool {
    routes
        .iter()
        .any(|route| route.uri == OAUTH_TOKEN_PATH || route.uri == OAUTH_AUTHORIZE_PATH)
}

/// Builds security schemes and per-route security requirements.
pub struct SecurityBuilder<'a> {
    config: &'a Configuration,
    scopes: &'a dyn ScopeProvider,
    middleware: &'a dyn MiddlewareResolver,
}

impl<'a> SecurityBuilder<'a> {
    pub fn new(
        config: &'a Configuration,
        scopes: &'a dyn ScopeProvider,
        middleware: &'a dyn MiddlewareResolver,
    ) -> Self {
        Self {
            config,
            scopes,
            middleware,
        }
    }

    /// Validate every configured definition and flow.
    pub fn validate(&self) -> Result<()> {
        for (name, flow) in &self.config.authentication_flow {
            resolve_definition(name)?.validate_flow(flow)?;
        }
        Ok(())
    }

    /// Security schemes keyed by definition name
    pub fn security_schemes(&self) -> Result<BTreeMap<String, SecurityScheme>> {
        let mut schemes = BTreeMap::new();
        for (name, flow) in &self.config.authentication_flow {
            let definition = resolve_definition(name)?;
            definition.validate_flow(flow)?;
            debug!("Adding security scheme {} ({})", name, flow);
            schemes.insert(name.clone(), self.create_scheme(definition, flow));
        }
        Ok(schemes)
    }

    fn create_scheme(&self, definition: SecurityDefinition, flow: &str) -> SecurityScheme {
        match definition {
            SecurityDefinition::OAuth2 => {
                let mut oauth_flow = OAuthFlow {
                    scopes: self.oauth_scopes(),
                    ..OAuthFlow::default()
                };
                if matches!(flow, "implicit" | "authorizationCode") {
                    oauth_flow.authorization_url = Some(self.endpoint(OAUTH_AUTHORIZE_PATH));
                }
                if matches!(flow, "password" | "application" | "authorizationCode") {
                    oauth_flow.token_url = Some(self.endpoint(OAUTH_TOKEN_PATH));
                }
                let mut flows = BTreeMap::new();
                flows.insert(openapi_flow_name(flow).to_string(), oauth_flow);
                SecurityScheme::OAuth2 { flows }
            }
            SecurityDefinition::BearerAuth => SecurityScheme::Http {
                scheme: "bearer".to_string(),
                bearer_format: "JWT".to_string(),
            },
        }
    }

    fn oauth_scopes(&self) -> BTreeMap<String, String> {
        self.scopes
            .scopes()
            .into_iter()
            .map(|scope| (scope.id, scope.description))
            .collect()
    }

    /// Absolute URL of an OAuth endpoint on the configured host
    pub fn endpoint(&self, path: &str) -> String {
        let host = self
            .config
            .host
            .as_deref()
            .or(self.config.app_url.as_deref())
            .unwrap_or("localhost");
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            let scheme = if self.config.secure { "https://" } else { "http://" };
            format!("{}{}", scheme, host)
        };
        format!("{}{}", host.trim_end_matches('/'), path)
    }

    fn is_scope_middleware(&self, middleware: &Middleware) -> bool {
        matches!(
            self.middleware.resolve(&middleware.name).as_deref(),
            Some(CHECK_SCOPES_MIDDLEWARE) | Some(CHECK_FOR_ANY_SCOPE_MIDDLEWARE)
        )
    }

    /// Security requirement for a route guarded by scope-checking middleware.
    ///
    /// `OAuth2` receives the middleware's scopes, every other definition an
    /// empty list. The last matching middleware wins; middleware without
    /// scope arguments contributes nothing.
    pub fn route_security(&self, route: &Route) -> Option<Vec<SecurityRequirement>> {
        let mut security = None;
        for middleware in route.middleware.iter().filter(|m| self.is_scope_middleware(m)) {
            if middleware.parameters.is_empty() {
                continue;
            }
            let requirement: SecurityRequirement = self
                .config
                .authentication_flow
                .keys()
                .map(|name| {
                    let scopes = if name == SecurityDefinition::OAuth2.name() {
                        middleware.parameters.clone()
                    } else {
                        Vec::new()
                    };
                    (name.clone(), scopes)
                })
                .collect();
            security = Some(vec![requirement]);
        }
        security
    }
}

fn resolve_definition(name: &str) -> Result<SecurityDefinition> {
    SecurityDefinition::from_name(name).ok_or_else(|| Error::InvalidDefinition {
        definition: name.to_string(),
        valid: SecurityDefinition::ALL
            .iter()
            .map(|d| d.name().to_string())
            .collect(),
    })
}

/// OpenAPI 3.0 renamed the `application` flow to `clientCredentials`.
fn openapi_flow_name(flow: &str) -> &str {
    match flow {
        "application" => "clientCredentials",
        other => other,
    }
}
