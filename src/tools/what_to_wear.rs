//! What-to-wear tool - echoes validated gear suggestions for rendering
//!
//! The assistant composes the suggestions; the tool only enforces their
//! shape so the renderer can trust them.

use super::{parse_args, to_output, Tool, ToolContext, ToolName};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::ops::RangeInclusive;

pub const SUGGESTION_COUNT: RangeInclusive<usize> = 1..=3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Suggestion {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WhatToWearInput {
    pub suggestions: Vec<Suggestion>,
}

fn check(input: &Value) -> Result<WhatToWearInput, Vec<String>> {
    let args: WhatToWearInput = parse_args(input)?;
    let mut violations = Vec::new();

    if !SUGGESTION_COUNT.contains(&args.suggestions.len()) {
        violations.push(format!(
            "suggestions must contain between {} and {} entries, got {}",
            SUGGESTION_COUNT.start(),
            SUGGESTION_COUNT.end(),
            args.suggestions.len()
        ));
    }
    for (i, s) in args.suggestions.iter().enumerate() {
        if s.title.trim().is_empty() {
            violations.push(format!("suggestions[{i}].title must not be empty"));
        }
        if s.description.trim().is_empty() {
            violations.push(format!("suggestions[{i}].description must not be empty"));
        }
    }

    if violations.is_empty() {
        Ok(args)
    } else {
        Err(violations)
    }
}

pub struct WhatToWearTool;

#[async_trait]
impl Tool for WhatToWearTool {
    fn name(&self) -> ToolName {
        ToolName::WhatToWear
    }

    fn description(&self) -> String {
        "Show one to three clothing or gear suggestions to the traveller. Compose the suggestions from known conditions.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["suggestions"],
            "additionalProperties": false,
            "properties": {
                "suggestions": {
                    "type": "array",
                    "minItems": SUGGESTION_COUNT.start(),
                    "maxItems": SUGGESTION_COUNT.end(),
                    "items": {
                        "type": "object",
                        "required": ["title", "description"],
                        "additionalProperties": false,
                        "properties": {
                            "title": {"type": "string", "minLength": 1},
                            "description": {"type": "string", "minLength": 1}
                        }
                    }
                }
            }
        })
    }

    fn validate(&self, input: &Value) -> Result<(), Vec<String>> {
        check(input).map(|_| ())
    }

    async fn run(&self, input: Value, _ctx: ToolContext) -> Result<Value, String> {
        let args = check(&input).map_err(|v| v.join("; "))?;
        to_output(&args)
    }
}
