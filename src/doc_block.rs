//! Doc comment interpretation.
//!
//! Handler doc comments are turned into operation metadata in two steps. A
//! [`DocCommentParser`] splits the raw comment into summary, description and
//! `@tags`; [`DocBlockInterpreter`] then reads the tags this generator
//! understands:
//!
//! ```text
//! /**
//!  * Show a user
//!  *
//!  * Returns the user with the given id.
//!  *
//!  * @deprecated
//!  * @Request({
//!  *     tags: Users, Admin
//!  *     x-rate-limit.per-minute: 60
//!  * })
//!  * @Response({
//!  *     code: 404
//!  *     description: User not found
//!  * })
//!  */
//! ```
//!
//! Interpretation never fails: a comment that cannot be understood yields the
//! same empty result as a missing comment.

use crate::document::Response;
use anyhow::{bail, Result};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A doc comment split into its structural parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDocBlock {
    pub summary: String,
    pub description: String,
    pub tags: Vec<DocTag>,
}

impl RawDocBlock {
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|tag| tag.name == name)
    }

    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DocTag> + 'a {
        self.tags.iter().filter(move |tag| tag.name == name)
    }
}

/// One `@Name body` tag; the body spans until the next tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTag {
    pub name: String,
    pub body: String,
}

/// Splits comment text into a [`RawDocBlock`].
pub trait DocCommentParser {
    fn parse(&self, text: &str) -> Result<RawDocBlock>;
}

/// Parser for `/** ... */` blocks, `///` lines and bare comment text.
///
/// The first non-empty line is the summary, the lines after it up to the
/// first tag are the description.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDocParser;

impl DocCommentParser for StandardDocParser {
    fn parse(&self, text: &str) -> Result<RawDocBlock> {
        let mut block = RawDocBlock::default();
        let mut body_lines: Vec<&str> = Vec::new();

        for line in text.lines().map(clean_comment_line) {
            if let Some(tag) = parse_tag_start(line) {
                block.tags.push(tag);
                continue;
            }
            match block.tags.last_mut() {
                Some(tag) => {
                    tag.body.push('\n');
                    tag.body.push_str(line);
                }
                None => body_lines.push(line),
            }
        }

        let mut lines = body_lines.into_iter().skip_while(|line| line.is_empty());
        block.summary = lines.next().unwrap_or_default().to_string();
        block.description = lines.collect::<Vec<_>>().join("\n").trim().to_string();
        Ok(block)
    }
}

fn clean_comment_line(line: &str) -> &str {
    let mut line = line.trim();
    for prefix in ["/**", "/*", "///", "//!"] {
        if let Some(rest) = line.strip_prefix(prefix) {
            line = rest;
            break;
        }
    }
    line = line.trim_end();
    if let Some(rest) = line.strip_suffix("*/") {
        line = rest;
    }
    line = line.trim_start();
    if let Some(rest) = line.strip_prefix('*') {
        line = rest;
    }
    line.trim()
}

fn parse_tag_start(line: &str) -> Option<DocTag> {
    let rest = line.strip_prefix('@')?;
    let name_len = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-' || c == '\\'))
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    Some(DocTag {
        name: rest[..name_len].to_string(),
        body: rest[name_len..].trim().to_string(),
    })
}

/// Operation metadata extracted from a doc comment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocBlock {
    pub summary: String,
    pub description: String,
    pub deprecated: bool,
    pub responses: BTreeMap<String, Response>,
    pub tags: Option<Vec<String>>,
    pub operation_id: Option<String>,
    /// Other `@Request` keys, nested by their dotted path
    pub extensions: BTreeMap<String, Value>,
}

/// Reads `@deprecated`, `@Request` and `@Response` tags from doc comments.
pub struct DocBlockInterpreter<P = StandardDocParser> {
    parser: P,
    enabled: bool,
}

impl DocBlockInterpreter<StandardDocParser> {
    pub fn new(enabled: bool) -> Self {
        Self::with_parser(StandardDocParser, enabled)
    }
}

impl<P: DocCommentParser> DocBlockInterpreter<P> {
    pub fn with_parser(parser: P, enabled: bool) -> Self {
        Self { parser, enabled }
    }

    /// Interpret `text`; disabled parsing, empty text and malformed tags all
    /// yield [`ParsedDocBlock::default`].
    pub fn interpret(&self, text: &str) -> ParsedDocBlock {
        if !self.enabled || text.trim().is_empty() {
            return ParsedDocBlock::default();
        }
        match self.try_interpret(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Ignoring malformed doc comment: {}", e);
                ParsedDocBlock::default()
            }
        }
    }

    fn try_interpret(&self, text: &str) -> Result<ParsedDocBlock> {
        let raw = self.parser.parse(text)?;
        let mut documentation = ParsedDocBlock {
            summary: raw.summary.clone(),
            description: raw.description.clone(),
            deprecated: raw.has_tag("deprecated"),
            ..ParsedDocBlock::default()
        };

        if let Some(request) = raw.tags_named("Request").next() {
            for line in tag_lines(&request.body) {
                let (key, value) = split_key_value(&line)?;
                apply_request_value(&mut documentation, key, value);
            }
        }

        for response in raw.tags_named("Response") {
            let mut code: Option<String> = None;
            for line in tag_lines(&response.body) {
                let (key, value) = split_key_value(&line)?;
                match key {
                    "code" => {
                        documentation
                            .responses
                            .insert(value.to_string(), Response::new(""));
                        code = Some(value.to_string());
                    }
                    "description" => {
                        let Some(code) = code.as_ref() else {
                            bail!("response description '{}' precedes its code", value);
                        };
                        documentation
                            .responses
                            .entry(code.clone())
                            .or_default()
                            .description = value.to_string();
                    }
                    other => debug!("Skipping unknown response key '{}'", other),
                }
            }
        }

        Ok(documentation)
    }
}

/// Lines of a tag body with the `({ ... })` wrapper and trailing commas removed
fn tag_lines(body: &str) -> Vec<String> {
    body.replace("({", "")
        .replace("})", "")
        .lines()
        .map(|line| line.trim().trim_end_matches(',').trim_end().to_string())
        .filter(|line| line.len() > 1)
        .collect()
}

fn split_key_value(line: &str) -> Result<(&str, &str)> {
    match line.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => bail!("expected 'key: value', found '{}'", line),
    }
}

fn apply_request_value(documentation: &mut ParsedDocBlock, key: &str, value: &str) {
    match key {
        "summary" => documentation.summary = value.to_string(),
        "description" => documentation.description = value.to_string(),
        "deprecated" => {
            documentation.deprecated = matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
        }
        "operationId" => documentation.operation_id = Some(value.to_string()),
        "tags" => {
            documentation.tags = Some(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
        }
        _ => match key.strip_prefix("responses.").and_then(|rest| rest.split_once('.')) {
            Some((code, "description")) => {
                documentation
                    .responses
                    .entry(code.to_string())
                    .or_default()
                    .description = value.to_string();
            }
            Some((code, path)) => {
                let response = documentation.responses.entry(code.to_string()).or_default();
                set_path(&mut response.extra, path, Value::String(value.to_string()));
            }
            None => set_path(
                &mut documentation.extensions,
                key,
                Value::String(value.to_string()),
            ),
        },
    }
}

/// Assign `value` at a dotted path, replacing non-object intermediates.
pub(crate) fn set_path(target: &mut BTreeMap<String, Value>, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let slot = target.entry(first.to_string()).or_insert(Value::Null);
    set_nested(slot, rest, value);
}

fn set_nested(slot: &mut Value, path: &[&str], value: Value) {
    let Some((key, rest)) = path.split_first() else {
        *slot = value;
        return;
    };
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(map) = slot {
        let child = map.entry(key.to_string()).or_insert(Value::Null);
        set_nested(child, rest, value);
    }
}
