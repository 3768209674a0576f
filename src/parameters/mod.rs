//! Parameter generation from validation rules and URI templates.
//!
//! Which generator handles a route's rules depends only on the HTTP method,
//! see [`ParameterPlacement::for_method`]:
//!
//! - [`query::QueryParametersGenerator`] for methods without a body
//! - [`body::BodyParametersGenerator`] for `POST`, `PUT` and `PATCH`
//!
//! [`path::PathParametersGenerator`] runs for every route regardless of method.

pub mod body;
pub mod path;
pub mod query;

use crate::document::{Parameter, RequestBody};
use crate::route::HttpMethod;
use crate::rules::RuleSet;

/// Where rule-derived parameters end up in the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterPlacement {
    Query,
    Body,
}

impl ParameterPlacement {
    /// Fixed method-to-placement table
    pub fn for_method(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => ParameterPlacement::Body,
            HttpMethod::Get
            | HttpMethod::Head
            | HttpMethod::Delete
            | HttpMethod::Options => ParameterPlacement::Query,
        }
    }

    /// Generator for `rules` at this placement
    pub fn generator(self, rules: &RuleSet) -> Box<dyn ParametersGenerator + '_> {
        match self {
            ParameterPlacement::Query => Box::new(query::QueryParametersGenerator::new(rules)),
            ParameterPlacement::Body => Box::new(body::BodyParametersGenerator::new(rules)),
        }
    }
}

/// Output of a rules-based generator.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedParameters {
    Parameters(Vec<Parameter>),
    RequestBody(RequestBody),
}

/// Converts a rule set into OpenAPI parameters or a request body.
pub trait ParametersGenerator {
    fn location(&self) -> ParameterPlacement;

    fn generate(&self) -> GeneratedParameters;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_table() {
        assert_eq!(ParameterPlacement::for_method(HttpMethod::Post), ParameterPlacement::Body);
        assert_eq!(ParameterPlacement::for_method(HttpMethod::Put), ParameterPlacement::Body);
        assert_eq!(ParameterPlacement::for_method(HttpMethod::Patch), ParameterPlacement::Body);
        assert_eq!(ParameterPlacement::for_method(HttpMethod::Get), ParameterPlacement::Query);
        assert_eq!(ParameterPlacement::for_method(HttpMethod::Delete), ParameterPlacement::Query);
        assert_eq!(ParameterPlacement::for_method(HttpMethod::Head), ParameterPlacement::Query);
    }

    #[test]
    fn test_generator_matches_placement() {
        let rules: RuleSet = [("name", "required|string")].into_iter().collect();

        let query = ParameterPlacement::Query.generator(&rules);
        assert_eq!(query.location(), ParameterPlacement::Query);
        assert!(matches!(query.generate(), GeneratedParameters::Parameters(_)));

        let body = ParameterPlacement::Body.generator(&rules);
        assert_eq!(body.location(), ParameterPlacement::Body);
        assert!(matches!(body.generate(), GeneratedParameters::RequestBody(_)));
    }
}
