use crate::config::{Configuration, ServerEntry};
use crate::doc_block::{DocBlockInterpreter, ParsedDocBlock};
use crate::document::{
    Components, Document, Info, Operation, Parameter, RequestBody, Response, SecurityRequirement,
    Server, OPENAPI_VERSION,
};
use crate::error::{Error, Result};
use crate::parameters::path::PathParametersGenerator;
use crate::parameters::{GeneratedParameters, ParameterPlacement, ParametersGenerator};
use crate::route::{
    HttpMethod, MetadataResolver, MiddlewareResolver, Route, RouteSource, ScopeProvider,
};
use crate::rules::RuleSet;
use crate::security::{has_oauth_routes, SecurityBuilder};
use log::{debug, info};
use regex::Regex;
use std::collections::BTreeMap;

/// The host application collaborators the generator reads from
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub routes: &'a dyn RouteSource,
    pub metadata: &'a dyn MetadataResolver,
    pub scopes: &'a dyn ScopeProvider,
    pub middleware: &'a dyn MiddlewareResolver,
}

impl<'a> Collaborators<'a> {
    /// Use one value for every collaborator
    pub fn from_single<T>(source: &'a T) -> Self
    where
        T: RouteSource + MetadataResolver + ScopeProvider + MiddlewareResolver,
    {
        Self {
            routes: source,
            metadata: source,
            scopes: source,
            middleware: source,
        }
    }
}

/// OpenAPI document generator.
///
/// Builds a fresh [`Document`] from the route table on every call to
/// [`Generator::generate`]. Routes are processed in route-table order; when
/// two routes produce the same path and method, the later route wins.
pub struct Generator<'a> {
    config: &'a Configuration,
    sources: Collaborators<'a>,
    route_filter: Option<Regex>,
    interpreter: DocBlockInterpreter,
}

/// Everything about a route that does not depend on the HTTP method
struct RouteMetadata {
    documentation: ParsedDocBlock,
    rules: RuleSet,
    path_parameters: Vec<Parameter>,
    security: Option<Vec<SecurityRequirement>>,
}

impl<'a> Generator<'a> {
    pub fn new(config: &'a Configuration, sources: Collaborators<'a>) -> Self {
        debug!("Initializing Generator");
        Self {
            config,
            sources,
            route_filter: None,
            interpreter: DocBlockInterpreter::new(config.parse.doc_block),
        }
    }

    /// Only document routes whose URI starts with `prefix`.
    pub fn with_route_filter(mut self, prefix: &str) -> Result<Self> {
        if prefix.is_empty() {
            self.route_filter = None;
            return Ok(self);
        }
        let pattern = format!("^{}", regex::escape(prefix));
        let regex = Regex::new(&pattern)
            .map_err(|e| Error::InvalidArgument(format!("route filter '{}': {}", prefix, e)))?;
        self.route_filter = Some(regex);
        Ok(self)
    }

    /// Generate the documentation.
    ///
    /// # Errors
    ///
    /// Fails only on configuration errors: an unknown security definition or
    /// an authentication flow the definition does not allow. These are checked
    /// when security parsing is enabled and an OAuth route is registered.
    /// Problems with a single route's metadata never abort generation.
    pub fn generate(&self) -> Result<Document> {
        let routes = self.sources.routes.routes();
        info!("Generating documentation for {} routes", routes.len());

        let mut document = self.base_document();

        let security = SecurityBuilder::new(
            self.config,
            self.sources.scopes,
            self.sources.middleware,
        );
        let mut has_security_definitions = false;
        if self.config.parse.security && has_oauth_routes(&routes) {
            security.validate()?;
            let schemes = security.security_schemes()?;
            has_security_definitions = !schemes.is_empty();
            if has_security_definitions {
                document.components = Some(Components {
                    security_schemes: schemes,
                });
            }
        }

        for route in &routes {
            if self.is_filtered_route(route) {
                debug!("Skipping filtered route {}", route.uri);
                continue;
            }

            let metadata =
                self.route_metadata(route, has_security_definitions.then_some(&security));
            let path_item = document.paths.entry(route.uri.clone()).or_default();

            for method in &route.methods {
                if self.config.ignores_method(*method) {
                    continue;
                }
                debug!("Adding operation: {} {}", method, route.uri);
                let operation = self.build_operation(&metadata, *method);
                if path_item.set(*method, operation).is_some() {
                    debug!("Replacing earlier operation for {} {}", method, route.uri);
                }
            }
        }

        info!("Documented {} paths", document.paths.len());
        Ok(document)
    }

    fn base_document(&self) -> Document {
        Document {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info {
                title: self.config.title.clone(),
                description: self.config.description.clone(),
                version: self.config.version.clone(),
            },
            servers: self.servers(),
            paths: BTreeMap::new(),
            tags: self.config.tags.clone(),
            components: None,
        }
    }

    fn servers(&self) -> Vec<Server> {
        let title = &self.config.title;
        let mut servers = Vec::new();

        for (index, entry) in self.config.servers.iter().enumerate() {
            let (url, description) = match entry {
                ServerEntry::Url(url) => (Some(url.clone()), None),
                ServerEntry::Detailed { url, description } => (url.clone(), description.clone()),
            };
            let Some(url) = url.filter(|url| !url.is_empty()) else {
                continue;
            };
            let description = description
                .filter(|description| !description.is_empty())
                .unwrap_or_else(|| format!("{} Server #{}", title, index + 1));
            servers.push(Server { url, description });
        }

        if servers.is_empty() {
            let url = self
                .config
                .app_url
                .clone()
                .or_else(|| self.config.host.clone())
                .unwrap_or_default();
            let name = self.config.app_name.as_deref().unwrap_or(title);
            servers.push(Server {
                url,
                description: format!("{} Main Server", name),
            });
        }

        servers
    }

    fn is_filtered_route(&self, route: &Route) -> bool {
        if self.config.ignores_route(route.name.as_deref(), &route.uri)
            || self.config.ignores_route(None, &route.original_uri)
        {
            return true;
        }
        match &self.route_filter {
            Some(filter) => !filter.is_match(&route.uri),
            None => false,
        }
    }

    fn route_metadata(&self, route: &Route, security: Option<&SecurityBuilder<'_>>) -> RouteMetadata {
        let doc_comment = self.sources.metadata.doc_comment_for(route);
        if doc_comment.is_none() {
            debug!("No doc comment resolved for {}", route.uri);
        }

        RouteMetadata {
            documentation: self
                .interpreter
                .interpret(doc_comment.as_deref().unwrap_or_default()),
            rules: self.sources.metadata.validation_rules_for(route),
            path_parameters: PathParametersGenerator::new(&route.original_uri).parameters(),
            security: security.and_then(|builder| builder.route_security(route)),
        }
    }

    fn build_operation(&self, metadata: &RouteMetadata, method: HttpMethod) -> Operation {
        let mut documentation = metadata.documentation.clone();
        documentation.extensions.retain(|key, _| {
            let typed = Operation::is_field_name(key);
            if typed {
                debug!("Dropping @Request key '{}', the generated value wins", key);
            }
            !typed
        });
        let mut operation = Operation {
            tags: documentation.tags,
            summary: documentation.summary,
            description: documentation.description,
            operation_id: documentation.operation_id,
            deprecated: documentation.deprecated,
            responses: documentation.responses,
            extensions: documentation.extensions,
            ..Operation::default()
        };

        if operation.responses.is_empty() {
            operation
                .responses
                .insert("200".to_string(), Response::new("OK"));
        }
        for (code, response) in &self.config.append.responses {
            operation
                .responses
                .entry(code.clone())
                .or_insert_with(|| response.clone());
        }

        let (parameters, request_body) = route_parameters(metadata, method);
        if !parameters.is_empty() {
            operation.parameters = Some(parameters);
        }
        operation.request_body = request_body;
        operation.security = metadata.security.clone();
        operation
    }
}

/// Path parameters plus the rule-derived parameters or body for `method`
fn route_parameters(
    metadata: &RouteMetadata,
    method: HttpMethod,
) -> (Vec<Parameter>, Option<RequestBody>) {
    let mut parameters = metadata.path_parameters.clone();
    if metadata.rules.is_empty() {
        return (parameters, None);
    }

    let generator = ParameterPlacement::for_method(method).generator(&metadata.rules);
    debug!("Using {:?} parameters for {}", generator.location(), method);
    match generator.generate() {
        GeneratedParameters::Parameters(generated) => {
            parameters.extend(generated);
            (parameters, None)
        }
        GeneratedParameters::RequestBody(body) => (parameters, Some(body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Append, Ignored};
    use crate::document::{ParameterLocation, Schema, SecurityScheme, Tag};
    use crate::route::{Middleware, Scope};
    use crate::security::CHECK_SCOPES_MIDDLEWARE;
    use crate::serializer::serialize_yaml;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeApp {
        routes: Vec<Route>,
        docs: HashMap<String, String>,
        rules: HashMap<String, RuleSet>,
        middleware: HashMap<String, String>,
        scopes: Vec<Scope>,
    }

    impl FakeApp {
        fn route(mut self, route: Route) -> Self {
            self.routes.push(route);
            self
        }

        fn doc(mut self, action: &str, doc: &str) -> Self {
            self.docs.insert(action.to_string(), doc.to_string());
            self
        }

        fn rules(mut self, action: &str, rules: &[(&str, &str)]) -> Self {
            self.rules
                .insert(action.to_string(), rules.iter().copied().collect());
            self
        }
    }

    impl RouteSource for FakeApp {
        fn routes(&self) -> Vec<Route> {
            self.routes.clone()
        }
    }

    impl MetadataResolver for FakeApp {
        fn doc_comment_for(&self, route: &Route) -> Option<String> {
            self.docs.get(route.action.as_deref()?).cloned()
        }

        fn validation_rules_for(&self, route: &Route) -> RuleSet {
            route
                .action
                .as_deref()
                .and_then(|action| self.rules.get(action))
                .cloned()
                .unwrap_or_default()
        }
    }

    impl ScopeProvider for FakeApp {
        fn scopes(&self) -> Vec<Scope> {
            self.scopes.clone()
        }
    }

    impl MiddlewareResolver for FakeApp {
        fn resolve(&self, name: &str) -> Option<String> {
            self.middleware.get(name).cloned()
        }
    }

    fn plain_config() -> Configuration {
        Configuration {
            append: Append {
                responses: BTreeMap::new(),
            },
            ..Configuration::default()
        }
    }

    fn generate(config: &Configuration, app: &FakeApp) -> Result<Document> {
        Generator::new(config, Collaborators::from_single(app)).generate()
    }

    fn get(uri: &str) -> Route {
        Route::new(uri, vec![HttpMethod::Get, HttpMethod::Head])
    }

    #[test]
    fn test_every_non_ignored_method_is_documented() {
        let config = plain_config();
        let app = FakeApp::default().route(Route::new(
            "/items",
            vec![HttpMethod::Get, HttpMethod::Head, HttpMethod::Post],
        ));
        let document = generate(&config, &app).unwrap();

        let item = &document.paths["/items"];
        assert!(item.get.is_some());
        assert!(item.post.is_some());
        assert!(item.head.is_none());
    }

    #[test]
    fn test_ignored_routes_by_name_and_uri() {
        let config = Configuration {
            ignored: Ignored {
                methods: vec!["head".to_string()],
                routes: vec!["telescope".to_string(), "/health".to_string()],
            },
            ..plain_config()
        };
        let app = FakeApp::default()
            .route(get("/telescope/requests").with_name("telescope"))
            .route(get("/health"))
            .route(get("/users"));
        let document = generate(&config, &app).unwrap();

        assert_eq!(document.paths.keys().collect::<Vec<_>>(), vec!["/users"]);
    }

    #[test]
    fn test_route_prefix_filter() {
        let config = plain_config();
        let app = FakeApp::default()
            .route(get("/v1/items"))
            .route(get("/v2/items"))
            .route(get("/v1.5/items"));
        let document = Generator::new(&config, Collaborators::from_single(&app))
            .with_route_filter("/v1")
            .unwrap()
            .generate()
            .unwrap();

        assert!(document.paths.contains_key("/v1/items"));
        assert!(document.paths.contains_key("/v1.5/items"));
        assert!(!document.paths.contains_key("/v2/items"));

        let literal = Generator::new(&config, Collaborators::from_single(&app))
            .with_route_filter("/v1.")
            .unwrap()
            .generate()
            .unwrap();
        assert_eq!(literal.paths.keys().collect::<Vec<_>>(), vec!["/v1.5/items"]);
    }

    #[test]
    fn test_default_response() {
        let config = plain_config();
        let app = FakeApp::default().route(get("/users"));
        let document = generate(&config, &app).unwrap();

        let operation = document.paths["/users"].get.as_ref().unwrap();
        let mut expected = BTreeMap::new();
        expected.insert("200".to_string(), Response::new("OK"));
        assert_eq!(operation.responses, expected);
    }

    #[test]
    fn test_append_responses_only_fill_gaps() {
        let config = Configuration::default();
        let app = FakeApp::default()
            .route(get("/plain").with_action("plain"))
            .route(get("/custom").with_action("custom"))
            .doc(
                "custom",
                "Custom\n@Response({\n code: 401\n description: Token expired\n})",
            );
        let document = generate(&config, &app).unwrap();

        let plain = document.paths["/plain"].get.as_ref().unwrap();
        assert_eq!(plain.responses.len(), 2);
        assert_eq!(
            plain.responses["401"].description,
            "(Unauthorized) Invalid or missing Access Token"
        );

        let custom = document.paths["/custom"].get.as_ref().unwrap();
        assert_eq!(custom.responses.len(), 1);
        assert_eq!(custom.responses["401"].description, "Token expired");
    }

    #[test]
    fn test_query_parameters_on_get() {
        let config = plain_config();
        let app = FakeApp::default()
            .route(get("/users").with_action("index"))
            .rules("index", &[("status", "required|in:active,inactive"), ("tags.*", "string")]);
        let document = generate(&config, &app).unwrap();

        let operation = document.paths["/users"].get.as_ref().unwrap();
        let parameters = operation.parameters.as_ref().unwrap();
        assert!(operation.request_body.is_none());
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters[0].name, "status");
        assert!(parameters[0].required);
        assert_eq!(parameters[1].name, "tags");
        assert_eq!(parameters[1].schema, Schema::array_of(Schema::of_type("string")));
    }

    #[test]
    fn test_request_body_on_post() {
        let config = plain_config();
        let app = FakeApp::default()
            .route(Route::new("/users", vec![HttpMethod::Post]).with_action("store"))
            .rules("store", &[("tags.*", "string")]);
        let document = generate(&config, &app).unwrap();

        let operation = document.paths["/users"].post.as_ref().unwrap();
        assert!(operation.parameters.is_none());
        assert!(operation.request_body.is_some());
    }

    #[test]
    fn test_path_parameters_with_body() {
        let config = plain_config();
        let app = FakeApp::default()
            .route(Route::new("/users/{user}", vec![HttpMethod::Put]).with_action("update"))
            .rules("update", &[("name", "required|string")]);
        let document = generate(&config, &app).unwrap();

        let operation = document.paths["/users/{user}"].put.as_ref().unwrap();
        let parameters = operation.parameters.as_ref().unwrap();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].location, ParameterLocation::Path);
        assert!(operation.request_body.as_ref().unwrap().required);
    }

    #[test]
    fn test_doc_comment_metadata() {
        let config = plain_config();
        let app = FakeApp::default()
            .route(get("/users").with_action("index"))
            .doc(
                "index",
                "/**\n * List users\n *\n * All of them.\n * @deprecated\n * @Request({\n *   tags: Users\n * })\n */",
            );
        let document = generate(&config, &app).unwrap();

        let operation = document.paths["/users"].get.as_ref().unwrap();
        assert_eq!(operation.summary, "List users");
        assert_eq!(operation.description, "All of them.");
        assert!(operation.deprecated);
        assert_eq!(operation.tags, Some(vec!["Users".to_string()]));
    }

    #[test]
    fn test_doc_block_parsing_can_be_disabled() {
        let mut config = plain_config();
        config.parse.doc_block = false;
        let app = FakeApp::default()
            .route(get("/users").with_action("index"))
            .doc("index", "List users");
        let document = generate(&config, &app).unwrap();

        assert_eq!(document.paths["/users"].get.as_ref().unwrap().summary, "");
    }

    #[test]
    fn test_last_duplicate_route_wins() {
        let config = plain_config();
        let app = FakeApp::default()
            .route(get("/users").with_action("first"))
            .route(get("/users").with_action("second"))
            .doc("first", "First")
            .doc("second", "Second");
        let document = generate(&config, &app).unwrap();

        assert_eq!(document.paths["/users"].get.as_ref().unwrap().summary, "Second");
    }

    #[test]
    fn test_servers() {
        let config = Configuration {
            title: "Shop".to_string(),
            servers: vec![
                ServerEntry::Url("https://a.test".to_string()),
                ServerEntry::Detailed {
                    url: None,
                    description: Some("No url".to_string()),
                },
                ServerEntry::Detailed {
                    url: Some("https://c.test".to_string()),
                    description: None,
                },
                ServerEntry::Detailed {
                    url: Some("https://d.test".to_string()),
                    description: Some("Staging".to_string()),
                },
            ],
            ..plain_config()
        };
        let document = generate(&config, &FakeApp::default()).unwrap();

        assert_eq!(
            document.servers,
            vec![
                Server {
                    url: "https://a.test".to_string(),
                    description: "Shop Server #1".to_string(),
                },
                Server {
                    url: "https://c.test".to_string(),
                    description: "Shop Server #3".to_string(),
                },
                Server {
                    url: "https://d.test".to_string(),
                    description: "Staging".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_fallback_server() {
        let config = Configuration {
            app_url: Some("http://shop.test".to_string()),
            app_name: Some("Shop".to_string()),
            tags: vec![Tag {
                name: "Users".to_string(),
                description: None,
            }],
            ..plain_config()
        };
        let document = generate(&config, &FakeApp::default()).unwrap();

        assert_eq!(
            document.servers,
            vec![Server {
                url: "http://shop.test".to_string(),
                description: "Shop Main Server".to_string(),
            }]
        );
        assert_eq!(document.tags.len(), 1);
    }

    fn oauth_app() -> FakeApp {
        let mut app = FakeApp::default()
            .route(Route::new("/oauth/token", vec![HttpMethod::Post]))
            .route(
                get("/orders")
                    .with_middleware(Middleware::parse("auth:api"))
                    .with_middleware(Middleware::parse("scopes:orders.read")),
            )
            .route(get("/public"));
        app.middleware
            .insert("scopes".to_string(), CHECK_SCOPES_MIDDLEWARE.to_string());
        app.scopes.push(Scope {
            id: "orders.read".to_string(),
            description: "Read orders".to_string(),
        });
        app
    }

    #[test]
    fn test_security_schemes_and_requirements() {
        let config = plain_config();
        let document = generate(&config, &oauth_app()).unwrap();

        let schemes = &document.components.as_ref().unwrap().security_schemes;
        assert!(matches!(schemes["OAuth2"], SecurityScheme::OAuth2 { .. }));

        let orders = document.paths["/orders"].get.as_ref().unwrap();
        let security = orders.security.as_ref().unwrap();
        assert_eq!(security[0]["OAuth2"], vec!["orders.read"]);

        assert!(document.paths["/public"].get.as_ref().unwrap().security.is_none());
    }

    #[test]
    fn test_no_security_without_oauth_routes() {
        let config = plain_config();
        let mut app = oauth_app();
        app.routes.remove(0);
        let document = generate(&config, &app).unwrap();

        assert!(document.components.is_none());
        assert!(document.paths["/orders"].get.as_ref().unwrap().security.is_none());
    }

    #[test]
    fn test_invalid_flow_aborts_before_routes() {
        let mut config = plain_config();
        config
            .authentication_flow
            .insert("OAuth2".to_string(), "clientCredentials".to_string());
        let err = generate(&config, &oauth_app()).unwrap_err();

        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_flows_unchecked_without_oauth_routes() {
        let mut config = plain_config();
        config
            .authentication_flow
            .insert("OAuth2".to_string(), "clientCredentials".to_string());
        let mut app = oauth_app();
        app.routes.remove(0);
        let document = generate(&config, &app).unwrap();

        assert!(document.components.is_none());
        assert!(document.paths["/orders"].get.as_ref().unwrap().security.is_none());
    }

    #[test]
    fn test_security_parsing_can_be_disabled() {
        let mut config = plain_config();
        config.parse.security = false;
        let document = generate(&config, &oauth_app()).unwrap();

        assert!(document.components.is_none());
        let operations: Vec<&Operation> = document
            .paths
            .values()
            .flat_map(|item| HttpMethod::ALL.iter().filter_map(move |method| item.get(*method)))
            .collect();
        assert_eq!(operations.len(), 3);
        assert!(operations.iter().all(|operation| operation.security.is_none()));
    }

    #[test]
    fn test_request_keys_never_shadow_generated_fields() {
        let config = plain_config();
        let app = FakeApp::default()
            .route(Route::new("/users", vec![HttpMethod::Post]).with_action("store"))
            .doc(
                "store",
                "Create a user\n@Request({\n requestBody.description: Payload\n parameters.0: page\n security: none\n responses: none\n x-internal: true\n})",
            )
            .rules("store", &[("name", "required|string")]);
        let document = generate(&config, &app).unwrap();

        let operation = document.paths["/users"].post.as_ref().unwrap();
        assert_eq!(operation.extensions.keys().collect::<Vec<_>>(), vec!["x-internal"]);
        assert!(operation.request_body.as_ref().unwrap().description.is_none());
        assert!(operation.parameters.is_none());
        assert!(operation.security.is_none());

        let json = serde_json::to_string(&document).unwrap();
        assert_eq!(json.matches("\"requestBody\"").count(), 1);

        let yaml = serialize_yaml(&document).unwrap();
        let reparsed: Document = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(reparsed, document);
    }

    #[test]
    fn test_generation_is_idempotent() {
        let config = Configuration::default();
        let app = oauth_app()
            .route(Route::new("/users/{user}", vec![HttpMethod::Patch]).with_action("update"))
            .rules("update", &[("name", "required"), ("roles.*", "in:admin,member")]);

        let first = generate(&config, &app).unwrap();
        let second = generate(&config, &app).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
