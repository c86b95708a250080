use std::collections::BTreeMap;

use focuswell_core::{DebtCategory, RiskLevel};
use serde::Serialize;

use super::{open_engine, print_json};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DebtReport {
    ledger: BTreeMap<DebtCategory, u32>,
    total: u32,
    risk_level: RiskLevel,
    risk_label: &'static str,
    max_allowed_duration: u32,
    conservative_mode: bool,
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (engine, _) = open_engine()?;
    let risk = engine.risk_level();
    let report = DebtReport {
        ledger: engine.ledger().entries().collect(),
        total: engine.total_debt(),
        risk_level: risk,
        risk_label: risk.label(),
        max_allowed_duration: engine.max_allowed_duration(),
        conservative_mode: engine.conservative_mode(),
    };
    print_json(&report)
}
