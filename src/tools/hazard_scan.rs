//! Hazard scan tool - risk assessment for a landing or excursion site

use super::{location_schema, parse_location, pick, to_output, Tool, ToolContext, ToolName};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_HAZARDS: usize = 3;

/// Overall risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Elevated,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub name: String,
    pub severity: String,
    pub guidance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardReport {
    pub location: String,
    pub risk_level: RiskLevel,
    pub hazards: Vec<Hazard>,
}

/// (name, guidance) pairs
const HAZARDS: &[(&str, &str)] = &[
    ("Cryovolcanic vent", "Keep 500 m clear of active plumes."),
    ("Regolith sinkhole", "Probe the ground before committing rover wheels."),
    ("Solar particle event", "Shelter in the storm cellar until the alert clears."),
    ("Micrometeoroid shower", "Avoid open terrain during the peak hour."),
    ("Static discharge", "Ground tools before touching habitat hulls."),
    ("Hydrocarbon lake shoreline", "Stay on surveyed paths; the crust is thin."),
];

const SEVERITIES: &[&str] = &["minor", "moderate", "serious"];

pub(super) fn sample_report(location: &str, rng: &mut impl Rng) -> HazardReport {
    let count = rng.gen_range(0..=MAX_HAZARDS);
    let hazards: Vec<Hazard> = HAZARDS
        .choose_multiple(rng, count)
        .map(|(name, guidance)| Hazard {
            name: (*name).to_string(),
            severity: pick(SEVERITIES, rng).to_string(),
            guidance: (*guidance).to_string(),
        })
        .collect();

    let risk_level = if hazards.iter().any(|h| h.severity == "serious") {
        RiskLevel::Critical
    } else if hazards.is_empty() {
        RiskLevel::Low
    } else {
        RiskLevel::Elevated
    };

    HazardReport {
        location: location.to_string(),
        risk_level,
        hazards,
    }
}

pub struct HazardScanTool;

#[async_trait]
impl Tool for HazardScanTool {
    fn name(&self) -> ToolName {
        ToolName::HazardScan
    }

    fn description(&self) -> String {
        "Scan a location for environmental hazards. Returns an overall risk level and up to three hazards with guidance.".to_string()
    }

    fn input_schema(&self) -> Value {
        location_schema("scan")
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
