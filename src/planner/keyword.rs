//! Deterministic expedition-guide planner
//!
//! Reads the user's question, picks the tools whose keywords appear in it,
//! calls each once in registry order and closes with a summary of whatever
//! the tools reported.

use super::{Planner, PlannerError, PlannerView, Step};
use crate::tools::ToolName;
use crate::transcript::{Message, Part, ToolState};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt::Write as _;

pub const DEFAULT_LOCATION: &str = "Titan";

const GREETING: &str = "Greetings, traveller. I can check the weather, scan for hazards, \
find navigation windows, list upcoming celestial events and suggest what to wear. \
Try asking about the weather on Titan.";

/// Keyword stems per tool; a token matches when it starts with a stem
const INTENTS: &[(ToolName, &[&str])] = &[
    (
        ToolName::Weather,
        &["weather", "forecast", "storm", "temperat", "windy", "winds", "rain", "climat"],
    ),
    (
        ToolName::HazardScan,
        &["hazard", "danger", "risk", "safe", "threat"],
    ),
    (
        ToolName::NavigationWindows,
        &["launch", "window", "route", "navigat", "depart", "transfer", "dock"],
    ),
    (
        ToolName::CelestialEvents,
        &["sky", "skies", "eclipse", "meteor", "celestial", "stars", "comet", "aurora", "stargaz"],
    ),
    (
        ToolName::WhatToWear,
        &["wear", "gear", "pack", "suit", "cloth", "dress"],
    ),
];

/// Lowercase words that follow a preposition without naming a place
const NOT_PLACES: &[&str] = &[
    "a", "an", "the", "my", "our", "this", "that", "orbit", "space", "general", "case",
    "advance", "here", "there", "now", "today", "tonight", "tomorrow", "me", "us",
];

pub struct KeywordPlanner {
    /// Capitalised place after a locative preposition
    proper_place: Regex,
    /// Capitalised place after `for` or `from`, which also precede non-places
    loose_place: Regex,
    any_place: Regex,
}

impl KeywordPlanner {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            proper_place: Regex::new(
                r"\b(?i:in|on|at|near|around|over)\s+(?:(?i:the)\s+)?([A-Z][\w'-]*(?:\s+[A-Z][\w'-]*)*)",
            )?,
            loose_place: Regex::new(
                r"\b(?i:for|from)\s+(?:(?i:the)\s+)?([A-Z][\w'-]*(?:\s+[A-Z][\w'-]*)*)",
            )?,
            any_place: Regex::new(r"(?i)\b(?:in|on|at|near|around|over)\s+(?:the\s+)?([a-z][\w'-]*)")?,
        })
    }

    /// Place named in the question, `Titan` when none is found
    pub fn extract_location(&self, query: &str) -> String {
        if let Some(found) = first_proper(&self.proper_place, query)
            .or_else(|| first_proper(&self.loose_place, query))
        {
            return found.to_string();
        }

        self.any_place
            .captures_iter(query)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_lowercase())
            .find(|word| !NOT_PLACES.contains(&word.as_str()))
            .map_or_else(|| DEFAULT_LOCATION.to_string(), |word| capitalize(&word))
    }

    fn arguments(tool: ToolName, location: &str, current: &Message) -> Value {
        match tool {
            ToolName::WhatToWear => json!({ "suggestions": gear_suggestions(current) }),
            _ => json!({ "location": location }),
        }
    }
}

#[async_trait]
impl Planner for KeywordPlanner {
    async fn next_step(&self, view: &PlannerView<'_>) -> Result<Step, PlannerError> {
        let Some(query) = view.last_user_text() else {
            return Ok(Step::Stop);
        };

        // The reply is complete once any text has been said
        if view.current.parts.iter().any(|p| matches!(p, Part::Text { .. })) {
            return Ok(Step::Stop);
        }

        let wanted = intents(&query);
        if wanted.is_empty() {
            return Ok(Step::EmitText(GREETING.to_string()));
        }

        let location = self.extract_location(&query);
        let called: HashSet<ToolName> = view.current.tool_parts().map(|t| t.tool_name).collect();

        // Keep one step in reserve for the summary
        match wanted.into_iter().find(|t| !called.contains(t)) {
            Some(tool) if view.steps_remaining() > 1 => {
                tracing::debug!(tool = %tool, location = %location, "Planning tool call");
                Ok(Step::CallTool {
                    name: tool.as_str().to_string(),
                    args: Self::arguments(tool, &location, view.current),
                })
            }
            _ => Ok(Step::EmitText(summarize(&location, view.current))),
        }
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Tools the question asks for, in registry order
fn intents(query: &str) -> Vec<ToolName> {
    let lowered = query.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    INTENTS
        .iter()
        .filter(|(_, stems)| {
            tokens
                .iter()
                .any(|token| stems.iter().any(|stem| token.starts_with(stem)))
        })
        .map(|(tool, _)| *tool)
        .collect()
}

fn first_proper<'q>(pattern: &Regex, query: &'q str) -> Option<&'q str> {
    pattern
        .captures_iter(query)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .find(|place| !NOT_PLACES.contains(&place.to_lowercase().as_str()))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Output of the first settled call to `tool`
fn output_of(current: &Message, tool: ToolName) -> Option<&Value> {
    current
        .tool_parts()
        .find(|t| t.tool_name == tool && t.state == ToolState::OutputAvailable)
        .and_then(|t| t.output.as_ref())
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// One to three gear suggestions derived from what the tools reported
fn gear_suggestions(current: &Message) -> Vec<Value> {
    let weather = output_of(current, ToolName::Weather);
    let temperature = weather.and_then(|w| w.get("temperature")).and_then(Value::as_i64);

    let mut suggestions = vec![match temperature {
        Some(t) if t < -100 => json!({
            "title": "Heated pressure suit",
            "description": format!("Surface at {t}°C; run the heater loop on full."),
        }),
        Some(t) if t < 0 => json!({
            "title": "Insulated EVA suit",
            "description": format!("Surface at {t}°C; add the thermal liner."),
        }),
        Some(t) => json!({
            "title": "Light EVA suit",
            "description": format!("Surface at {t}°C; vent the cooling layer."),
        }),
        None => json!({
            "title": "Standard pressure suit",
            "description": "No weather reading yet; the all-round suit covers most conditions.",
        }),
    }];

    let risk = output_of(current, ToolName::HazardScan).map(|h| str_field(h, "riskLevel"));
    if matches!(risk, Some("Elevated" | "Critical")) {
        suggestions.push(json!({
            "title": "Reinforced boots and helmet lamp",
            "description": "The hazard scan flagged the area; protect footing and keep sight lines.",
        }));
    }

    let conditions = weather.map(|w| str_field(w, "conditions").to_lowercase());
    if conditions.is_some_and(|c| ["storm", "dust", "fog", "snow"].iter().any(|k| c.contains(k))) {
        suggestions.push(json!({
            "title": "Visor shield",
            "description": "Low visibility expected; fit the polarised outer visor.",
        }));
    }

    suggestions.truncate(3);
    suggestions
}

/// Closing text built from the settled tool parts
fn summarize(location: &str, current: &Message) -> String {
    let mut lines = Vec::new();

    for tool in current.tool_parts() {
        let line = match (tool.state, &tool.output, &tool.error_text) {
            (ToolState::OutputAvailable, Some(output), _) => describe(tool.tool_name, output),
            (ToolState::OutputError, _, Some(error)) => {
                format!("The {} check did not work out: {error}", tool.tool_name)
            }
            _ => continue,
        };
        lines.push(line);
    }

    if lines.is_empty() {
        return format!("I could not gather any readings for {location} this time.");
    }

    let mut text = format!("Here is what I found for {location}.");
    for line in lines {
        let _ = write!(text, "\n- {line}");
    }
    text
}

fn describe(tool: ToolName, output: &Value) -> String {
    match tool {
        ToolName::Weather => format!(
            "Weather: {}°C, {}. {}",
            output.get("temperature").and_then(Value::as_i64).unwrap_or_default(),
            str_field(output, "conditions"),
            str_field(output, "advisory"),
        ),
        ToolName::HazardScan => {
            let count = output
                .get("hazards")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            format!(
                "Hazards: risk is {} with {count} active hazard(s).",
                str_field(output, "riskLevel")
            )
        }
        ToolName::NavigationWindows => first_entry(output, "windows").map_or_else(
            || "Navigation: no windows open.".to_string(),
            |w| {
                format!(
                    "Navigation: next is {} ({}).",
                    str_field(w, "label"),
                    str_field(w, "window")
                )
            },
        ),
        ToolName::CelestialEvents => first_entry(output, "events").map_or_else(
            || "Sky: nothing notable coming up.".to_string(),
            |e| format!("Sky: {} at {}.", str_field(e, "title"), str_field(e, "time")),
        ),
        ToolName::WhatToWear => {
            let titles: Vec<&str> = output
                .get("suggestions")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(|s| str_field(s, "title")).collect())
                .unwrap_or_default();
            format!("Pack: {}.", titles.join(", "))
        }
    }
}

fn first_entry<'a>(output: &'a Value, key: &str) -> Option<&'a Value> {
    output.get(key).and_then(Value::as_array).and_then(|a| a.first())
}
