//! Weather tool - surface conditions report for a location

use super::{location_schema, parse_location, pick, to_output, Tool, ToolContext, ToolName};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::RangeInclusive;

pub const TEMPERATURE_RANGE: RangeInclusive<i32> = -180..=60;

const CONDITIONS: &[&str] = &[
    "Methane drizzle under an orange haze",
    "Clear and still, thin nitrogen sky",
    "Dust devils sweeping the basin",
    "Sulfur snow flurries",
    "Ice fog settling in the lowlands",
    "Electrical storm on the horizon",
];

const WINDS: &[&str] = &[
    "Calm",
    "Light breeze, 4 m/s from the east",
    "Gusting 18 m/s out of the north",
    "Steady 9 m/s westerly",
    "Violent shear above 200 m",
];

const RADIATION: &[&str] = &[
    "Nominal (0.2 mSv/day)",
    "Elevated (1.1 mSv/day)",
    "High during flare activity (4 mSv/day)",
    "Shielded by atmosphere (<0.1 mSv/day)",
];

const ADVISORIES: &[&str] = &[
    "Good window for surface EVA.",
    "Keep excursions under two hours.",
    "Visor heaters recommended.",
    "Stay within rover range of the habitat.",
    "Postpone non-essential surface work.",
];

/// Weather report for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: String,
    /// Degrees Celsius
    pub temperature: i32,
    pub conditions: String,
    pub wind: String,
    pub radiation: String,
    pub advisory: String,
}

pub(super) fn sample_report(location: &str, rng: &mut impl Rng) -> WeatherReport {
    WeatherReport {
        location: location.to_string(),
        temperature: rng.gen_range(TEMPERATURE_RANGE),
        conditions: pick(CONDITIONS, rng).to_string(),
        wind: pick(WINDS, rng).to_string(),
        radiation: pick(RADIATION, rng).to_string(),
        advisory: pick(ADVISORIES, rng).to_string(),
    }
}

pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> ToolName {
        ToolName::Weather
    }

    fn description(&self) -> String {
        "Current surface weather for a planet, moon or station: temperature, conditions, wind, radiation and an advisory.".to_string()
    }

    fn input_schema(&self) -> Value {
        location_schema("report weather for")
    }

    fn validate(&self, input: &Value) -> Result<(), Vec<String>> {
        parse_location(input).map(|_| ())
    }

    async fn run(&self, input: Value, _ctx: ToolContext) -> Result<Value, String> {
        let args = parse_location(&input).map_err(|v| v.join("; "))?;
        let report = sample_report(&args.location, &mut rand::thread_rng());
        to_output(&report)
    }
}
