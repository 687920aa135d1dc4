//! Navigation windows tool - upcoming departure and transfer windows

use super::{location_schema, parse_location, pick, to_output, Tool, ToolContext, ToolName};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_WINDOWS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationWindow {
    pub label: String,
    pub window: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationReport {
    pub windows: Vec<NavigationWindow>,
}

const LABELS: &[&str] = &[
    "Low-orbit rendezvous",
    "Surface ascent",
    "Hohmann transfer",
    "Gravity-assist slingshot",
    "Relay station docking",
];

const WINDOWS: &[&str] = &[
    "T+02:15 to T+03:40",
    "Next sol, 06:00-07:30",
    "In 3 days, 14:10-14:55",
    "Tonight, 22:45-23:20",
    "In 11 days, 09:00-12:00",
];

const NOTES: &[&str] = &[
    "Lowest delta-v of the cycle.",
    "Tight margin; pre-stage propellant.",
    "Relay coverage is patchy during the burn.",
    "Crosswinds may push ascent by 20 minutes.",
    "Backup window opens six hours later.",
];

pub(super) fn sample_report(rng: &mut impl Rng) -> NavigationReport {
    let count = rng.gen_range(1..=MAX_WINDOWS);
    let windows = LABELS
        .choose_multiple(rng, count)
        .map(|label| NavigationWindow {
            label: (*label).to_string(),
            window: pick(WINDOWS, rng).to_string(),
            note: pick(NOTES, rng).to_string(),
        })
        .collect();
    NavigationReport { windows }
}

pub struct NavigationWindowsTool;

#[async_trait]
impl Tool for NavigationWindowsTool {
    fn name(&self) -> ToolName {
        ToolName::NavigationWindows
    }

    fn description(&self) -> String {
        "List up to three upcoming launch, transfer or docking windows departing from a location.".to_string()
    }

    fn input_schema(&self) -> Value {
        location_schema("plan departures from")
    }

    fn validate(&self, input: &Value) -> Result<(), Vec<String>> {
        parse_location(input).map(|_| ())
    }

    async fn run(&self, input: Value, _ctx: ToolContext) -> Result<Value, String> {
        parse_location(&input).map_err(|v| v.join("; "))?;
        let report = sample_report(&mut rand::thread_rng());
        to_output(&report)
    }
}
