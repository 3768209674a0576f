use crate::document::{Parameter, ParameterLocation, Schema};
use regex::Regex;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{([^{}?]+)\??\}").expect("Failed to compile path placeholder regex")
    })
}

/// Path parameters taken from the `{name}` placeholders of a URI template.
///
/// Independent of validation rules. Optional placeholders (`{name?}`) are
/// still emitted as required, since OpenAPI requires every path parameter to be.
pub struct PathParametersGenerator<'a> {
    uri: &'a str,
}

impl<'a> PathParametersGenerator<'a> {
    pub fn new(uri: &'a str) -> Self {
        Self { uri }
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        placeholder_regex()
            .captures_iter(self.uri)
            .map(|captures| Parameter {
                name: captures[1].trim().to_string(),
                location: ParameterLocation::Path,
                description: String::new(),
                required: true,
                schema: Schema::of_type("string"),
            })
            .collect()
    }
}
