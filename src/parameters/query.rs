use super::{GeneratedParameters, ParameterPlacement, ParametersGenerator};
use crate::document::{Parameter, ParameterLocation, Schema};
use crate::rules::{FieldKey, Rule, RuleSet};
use log::debug;

/// Query string parameters for methods without a request body.
///
/// Every field becomes one `query` parameter. Fields following the array
/// convention (`tags.*`) are collapsed into a single `array` parameter named
/// after the base key, so `tags` and `tags.*` never yield two entries.
pub struct QueryParametersGenerator<'a> {
    rules: &'a RuleSet,
}

impl<'a> QueryParametersGenerator<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        let mut parameters: Vec<Parameter> = Vec::new();
        // base key -> element schema, in first-seen order
        let mut array_types: Vec<(String, Schema)> = Vec::new();

        for (field, value) in self.rules.iter() {
            let rule = Rule::new(value);
            let key = FieldKey::parse(field);

            if key.is_array_element() {
                let base = key.base();
                let (schema_type, format) = rule.parameter_type();
                let mut element = Schema::of_type(schema_type);
                element.format = format.map(str::to_string);
                match array_types.iter_mut().find(|(name, _)| *name == base) {
                    Some(entry) => entry.1 = element,
                    None => array_types.push((base, element)),
                }
                continue;
            }

            let parameter = Parameter {
                name: field.to_string(),
                location: ParameterLocation::Query,
                description: String::new(),
                required: rule.is_required(),
                schema: rule.schema(),
            };
            match parameters.iter_mut().find(|p| p.name == parameter.name) {
                Some(existing) => *existing = parameter,
                None => parameters.push(parameter),
            }
        }

        for (base, element) in array_types {
            match parameters.iter_mut().find(|p| p.name == base) {
                Some(existing) => {
                    debug!("Upgrading query parameter '{}' to array", base);
                    existing.schema.schema_type = Some("array".to_string());
                    existing.schema.format = None;
                    existing.schema.items = Some(Box::new(element));
                }
                None => parameters.push(Parameter {
                    name: base,
                    location: ParameterLocation::Query,
                    description: String::new(),
                    required: false,
                    schema: Schema::array_of(element),
                }),
            }
        }

        parameters
    }
}

impl ParametersGenerator for QueryParametersGenerator<'_> {
    fn location(&self) -> ParameterPlacement {
        ParameterPlacement::Query
    }

    fn generate(&self) -> GeneratedParameters {
        GeneratedParameters::Parameters(self.parameters())
    }
}
