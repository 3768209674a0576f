use super::{GeneratedParameters, ParameterPlacement, ParametersGenerator};
use crate::document::{MediaType, RequestBody, Schema};
use crate::rules::{FieldKey, Rule, RuleSet};
use std::collections::BTreeMap;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Request body schema for `POST`, `PUT` and `PATCH` routes.
///
/// Dotted field names are nested into object schemas (`user.name`) and `*`
/// segments into array schemas (`items.*.id`). Required fields are listed on
/// the object that directly contains them.
pub struct BodyParametersGenerator<'a> {
    rules: &'a RuleSet,
}

impl<'a> BodyParametersGenerator<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    pub fn schema(&self) -> Schema {
        let mut root = Schema::of_type("object");
        for (field, value) in self.rules.iter() {
            let key = FieldKey::parse(field);
            insert_field(&mut root, &key.segments, &Rule::new(value));
        }
        root
    }

    pub fn request_body(&self) -> RequestBody {
        let schema = self.schema();
        let required = schema.required.as_ref().is_some_and(|r| !r.is_empty());

        let mut content = BTreeMap::new();
        content.insert(JSON_CONTENT_TYPE.to_string(), MediaType { schema });

        RequestBody {
            description: None,
            required,
            content,
        }
    }
}

impl ParametersGenerator for BodyParametersGenerator<'_> {
    fn location(&self) -> ParameterPlacement {
        ParameterPlacement::Body
    }

    fn generate(&self) -> GeneratedParameters {
        GeneratedParameters::RequestBody(self.request_body())
    }
}

fn insert_field(container: &mut Schema, segments: &[String], rule: &Rule) {
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };

    let child = if segment == "*" {
        make_array(container);
        container
            .items
            .get_or_insert_with(|| Box::new(Schema::default()))
            .as_mut()
    } else {
        make_object(container);
        if rest.is_empty() && rule.is_required() {
            let required = container.required.get_or_insert_with(Vec::new);
            if !required.contains(segment) {
                required.push(segment.clone());
            }
        }
        container
            .properties
            .get_or_insert_with(BTreeMap::new)
            .entry(segment.clone())
            .or_default()
    };

    if rest.is_empty() {
        apply_rule(child, rule);
    } else {
        insert_field(child, rest, rule);
    }
}

/// Leaf rules never clobber structure contributed by nested fields.
fn apply_rule(node: &mut Schema, rule: &Rule) {
    if node.properties.is_some() || node.items.is_some() {
        return;
    }
    *node = rule.schema();
}

fn make_object(schema: &mut Schema) {
    if !schema.is_object() {
        schema.schema_type = Some("object".to_string());
        schema.format = None;
        schema.enum_values = None;
        schema.items = None;
    }
}

fn make_array(schema: &mut Schema) {
    if !schema.is_array() {
        schema.schema_type = Some("array".to_string());
        schema.format = None;
        schema.enum_values = None;
        schema.properties = None;
        schema.required = None;
    }
}
