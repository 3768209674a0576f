//! Validation rule tokenizer.
//!
//! A rule set maps request field names to rule expressions such as
//! `required|string|in:draft,published`. This module normalizes rule values
//! into token lists and derives the OpenAPI facts the parameter generators
//! need: whether a field is required, its type and format, its enum values.
//!
//! Field names use the host framework's array convention: `tags.*` (or
//! `tags[]`) describes the elements of `tags`. [`FieldKey`] is the only place
//! that convention is interpreted.

use crate::document::Schema;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A rule as written by the application: delimited string or token list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Text(String),
    List(Vec<String>),
    Empty,
}

impl RuleValue {
    /// Normalize to an ordered token list
    pub fn tokens(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            RuleValue::Text(text) => text.split('|').collect(),
            RuleValue::List(list) => list.iter().map(String::as_str).collect(),
            RuleValue::Empty => Vec::new(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        RuleValue::Text(value.to_string())
    }
}

/// Ordered mapping from field name to rule.
///
/// Order is preserved from the source so generated parameters follow the
/// order in which the application declares its fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleSet(Vec<(String, RuleValue)>);

impl RuleSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a field rule; a repeated field replaces the earlier rule in place.
    pub fn insert(&mut self, field: impl Into<String>, rule: impl Into<RuleValue>) {
        let field = field.into();
        let rule = rule.into();
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = rule,
            None => self.0.push((field, rule)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleValue)> {
        self.0.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<RuleValue>> FromIterator<(K, V)> for RuleSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut rules = RuleSet::new();
        for (field, rule) in iter {
            rules.insert(field, rule);
        }
        rules
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleSetVisitor;

        impl<'de> Visitor<'de> for RuleSetVisitor {
            type Value = RuleSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to validation rules")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RuleSet, A::Error> {
                let mut rules = RuleSet::new();
                while let Some((field, rule)) = map.next_entry::<String, RuleValue>()? {
                    rules.insert(field, rule);
                }
                Ok(rules)
            }

            fn visit_unit<E>(self) -> Result<RuleSet, E> {
                Ok(RuleSet::new())
            }
        }

        deserializer.deserialize_any(RuleSetVisitor)
    }
}

/// One field's rule, tokenized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    tokens: Vec<String>,
}

impl Rule {
    pub fn new(value: &RuleValue) -> Self {
        Self {
            tokens: value.tokens(),
        }
    }

    /// Rule names without their arguments (`in:a,b` -> `in`)
    fn names(&self) -> impl Iterator<Item = &str> {
        self.tokens
            .iter()
            .map(|token| token.split_once(':').map_or(token.as_str(), |(name, _)| name))
    }

    /// Only an explicit `required` token makes a field required.
    pub fn is_required(&self) -> bool {
        self.names().any(|name| name == "required")
    }

    /// Whether the field itself is declared as a list
    pub fn is_array(&self) -> bool {
        self.names().any(|name| name == "array")
    }

    /// OpenAPI type and optional format; unrecognized rules default to `string`.
    pub fn parameter_type(&self) -> (&'static str, Option<&'static str>) {
        let schema_type = self
            .names()
            .find_map(|name| type_for(name).map(|(t, _)| t))
            .unwrap_or("string");
        let format = if schema_type == "string" {
            self.names().find_map(|name| type_for(name).and_then(|(_, f)| f))
        } else {
            None
        };
        (schema_type, format)
    }

    /// Values of an `in:` rule, comma-split and trimmed
    pub fn enum_values(&self) -> Vec<String> {
        self.tokens
            .iter()
            .find_map(|token| token.strip_prefix("in:"))
            .map(|values| {
                values
                    .split(',')
                    .map(|v| v.trim().trim_matches('"').to_string())
                    .filter(|v| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Scalar schema for the field; `array` fields default to string items.
    pub fn schema(&self) -> Schema {
        let (schema_type, format) = self.parameter_type();
        let enum_values = self.enum_values();
        let mut schema = Schema::of_type(schema_type);
        schema.format = format.map(str::to_string);
        if !enum_values.is_empty() {
            schema.enum_values = Some(enum_values);
        }
        if schema.is_array() {
            schema.items = Some(Box::new(Schema::of_type("string")));
        }
        schema
    }
}

fn type_for(rule_name: &str) -> Option<(&'static str, Option<&'static str>)> {
    match rule_name {
        "integer" | "int" => Some(("integer", None)),
        "numeric" => Some(("number", None)),
        "boolean" | "bool" => Some(("boolean", None)),
        "array" => Some(("array", None)),
        "string" => Some(("string", None)),
        "date" => Some(("string", Some("date"))),
        "date_format" => Some(("string", Some("date-time"))),
        "email" => Some(("string", Some("email"))),
        "url" => Some(("string", Some("uri"))),
        "uuid" => Some(("string", Some("uuid"))),
        "file" | "image" => Some(("string", Some("binary"))),
        _ => None,
    }
}

/// A field name split according to the array/nesting convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKey {
    /// Path segments, `*` marking array elements
    pub segments: Vec<String>,
}

impl FieldKey {
    pub fn parse(field: &str) -> Self {
        let normalized = field.replace("[]", ".*").replace('[', ".").replace(']', "");
        let segments = normalized
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    /// Whether the field describes elements of a list
    pub fn is_array_element(&self) -> bool {
        self.segments.iter().any(|segment| segment == "*")
    }

    /// Name of the field before the first array marker (`tags.*` -> `tags`)
    pub fn base(&self) -> String {
        self.segments
            .iter()
            .take_while(|segment| *segment != "*")
            .cloned()
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_from_string_and_list() {
        let text = RuleValue::from("required| string |in:a,b");
        let list = RuleValue::List(vec!["required".into(), "string".into(), "in:a,b".into()]);

        assert_eq!(text.tokens(), vec!["required", "string", "in:a,b"]);
        assert_eq!(text.tokens(), list.tokens());
        assert!(RuleValue::Empty.tokens().is_empty());
        assert!(RuleValue::from("").tokens().is_empty());
    }

    #[test]
    fn test_required_flag() {
        assert!(Rule::new(&"required|string".into()).is_required());
        assert!(!Rule::new(&"sometimes|string".into()).is_required());
        assert!(!Rule::new(&"nullable".into()).is_required());
        assert!(!Rule::new(&"required_if:type,admin".into()).is_required());
    }

    #[test]
    fn test_parameter_types() {
        assert_eq!(Rule::new(&"integer".into()).parameter_type(), ("integer", None));
        assert_eq!(Rule::new(&"numeric|min:0".into()).parameter_type(), ("number", None));
        assert_eq!(Rule::new(&"boolean".into()).parameter_type(), ("boolean", None));
        assert_eq!(Rule::new(&"array".into()).parameter_type(), ("array", None));
        assert_eq!(
            Rule::new(&"required|date".into()).parameter_type(),
            ("string", Some("date"))
        );
        assert_eq!(
            Rule::new(&"string|email|max:255".into()).parameter_type(),
            ("string", Some("email"))
        );
        assert_eq!(Rule::new(&"max:10".into()).parameter_type(), ("string", None));
        assert_eq!(Rule::new(&RuleValue::Empty).parameter_type(), ("string", None));
    }

    #[test]
    fn test_enum_values() {
        let rule = Rule::new(&"required|in: active , inactive".into());
        assert_eq!(rule.enum_values(), vec!["active", "inactive"]);
        assert!(Rule::new(&"string".into()).enum_values().is_empty());
    }

    #[test]
    fn test_array_schema_defaults_to_string_items() {
        let schema = Rule::new(&"array".into()).schema();
        assert!(schema.is_array());
        assert_eq!(schema.items.unwrap().schema_type.as_deref(), Some("string"));
    }

    #[test]
    fn test_field_key_dotted_and_bracket_forms() {
        let dotted = FieldKey::parse("tags.*");
        assert!(dotted.is_array_element());
        assert_eq!(dotted.base(), "tags");

        let bracket = FieldKey::parse("tags[]");
        assert_eq!(bracket, dotted);

        let nested = FieldKey::parse("items.*.id");
        assert_eq!(nested.base(), "items");
        assert_eq!(nested.segments, vec!["items", "*", "id"]);

        let plain = FieldKey::parse("user.name");
        assert!(!plain.is_array_element());
        assert_eq!(plain.base(), "user.name");
    }

    #[test]
    fn test_rule_set_keeps_declaration_order() {
        let yaml = "zeta: string\nalpha: required\nmid: [integer, min:1]\nnone: ~\n";
        let rules: RuleSet = serde_yaml::from_str(yaml).unwrap();
        let fields: Vec<&str> = rules.iter().map(|(name, _)| name).collect();

        assert_eq!(fields, vec!["zeta", "alpha", "mid", "none"]);
        assert_eq!(rules.iter().nth(3).unwrap().1, &RuleValue::Empty);
    }
}
