//! Celestial events tool - what is visible in the sky from a location

use super::{location_schema, parse_location, pick, to_output, Tool, ToolContext, ToolName};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_EVENTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelestialEvent {
    pub title: String,
    pub time: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelestialReport {
    pub events: Vec<CelestialEvent>,
}

/// (title, detail) pairs
const EVENTS: &[(&str, &str)] = &[
    ("Saturn transit", "The ringed giant crosses the zenith; rings edge-on."),
    ("Meteor shower", "Up to 40 streaks per hour from the debris trail."),
    ("Partial eclipse", "A neighbouring moon clips the sun for 12 minutes."),
    ("Aurora band", "Magnetospheric glow along the northern limb."),
    ("Comet flyby", "Ion tail visible to the naked eye after dusk."),
    ("Conjunction", "Two inner planets within half a degree of each other."),
];

const TIMES: &[&str] = &[
    "Tonight 21:30",
    "Tomorrow 04:10",
    "In 2 days, 19:45",
    "In 5 days, 01:20",
    "Next week, 23:00",
];

pub(super) fn sample_report(rng: &mut impl Rng) -> CelestialReport {
    let count = rng.gen_range(1..=MAX_EVENTS);
    let events = EVENTS
        .choose_multiple(rng, count)
        .map(|(title, detail)| CelestialEvent {
            title: (*title).to_string(),
            time: pick(TIMES, rng).to_string(),
            detail: (*detail).to_string(),
        })
        .collect();
    CelestialReport { events }
}

pub struct CelestialEventsTool;

#[async_trait]
impl Tool for CelestialEventsTool {
    fn name(&self) -> ToolName {
        ToolName::CelestialEvents
    }

    fn description(&self) -> String {
        "Upcoming sky events (transits, eclipses, meteor showers) observable from a location.".to_string()
    }

    fn input_schema(&self) -> Value {
        location_schema("observe from")
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
