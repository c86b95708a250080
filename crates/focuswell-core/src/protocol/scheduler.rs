//! Protocol schedule generation.
//!
//! Two modes:
//!
//! - **Configured**: every enabled category repeats at its interval
//!   (`interval, 2*interval, ...`) strictly inside the block.
//! - **Template**: a fixed event list picked by duration tier, for paths
//!   that have no explicit configuration (quick start).
//!
//! Output is always sorted by trigger minute, ties broken by category
//! priority (eye, hydration, mobility, posture), and ids are assigned from
//! the sorted position.

use serde::{Deserialize, Serialize};

use super::{Protocol, ProtocolConfig};
use crate::debt::DebtCategory;

/// Fixed action attached to a category in configured mode.
struct CategoryAction {
    name: &'static str,
    duration_secs: u32,
}

fn action_for(category: DebtCategory) -> Option<CategoryAction> {
    let action = match category {
        DebtCategory::Eye => CategoryAction {
            name: "Eye rest (20 seconds)",
            duration_secs: 20,
        },
        DebtCategory::Hydration => CategoryAction {
            name: "Hydration break",
            duration_secs: 30,
        },
        DebtCategory::Mobility => CategoryAction {
            name: "Stand & stretch (1 minute)",
            duration_secs: 60,
        },
        DebtCategory::Posture => CategoryAction {
            name: "Posture check",
            duration_secs: 15,
        },
        DebtCategory::TimeDebt => return None,
    };
    Some(action)
}

/// Duration tier selecting a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateTier {
    /// Blocks up to 25 minutes.
    Short,
    /// Blocks up to 50 minutes.
    Standard,
    /// Anything longer.
    Extended,
}

impl TemplateTier {
    pub fn for_duration(duration_min: u32) -> Self {
        if duration_min <= 25 {
            TemplateTier::Short
        } else if duration_min <= 50 {
            TemplateTier::Standard
        } else {
            TemplateTier::Extended
        }
    }

    /// `(trigger_minute, name, category, duration_secs)` for each event.
    fn events(self) -> &'static [(u32, &'static str, DebtCategory, u32)] {
        match self {
            TemplateTier::Short => &[
                (5, "Eye rest (10 seconds)", DebtCategory::Eye, 10),
                (15, "Hydration (100ml)", DebtCategory::Hydration, 30),
            ],
            TemplateTier::Standard => &[
                (10, "Eye rest (20 seconds)", DebtCategory::Eye, 20),
                (20, "Stand & stretch (1 minute)", DebtCategory::Mobility, 60),
                (30, "Hydration (150ml)", DebtCategory::Hydration, 30),
                (40, "Posture check", DebtCategory::Posture, 10),
            ],
            TemplateTier::Extended => &[
                (15, "Eye rest (30 seconds)", DebtCategory::Eye, 30),
                (30, "Stand & stretch (2 minutes)", DebtCategory::Mobility, 120),
                (45, "Hydration (200ml)", DebtCategory::Hydration, 30),
                (60, "Posture check & correction", DebtCategory::Posture, 20),
                (75, "Short walk (2 minutes)", DebtCategory::Mobility, 120),
            ],
        }
    }
}

/// Stateless schedule generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolScheduler;

impl ProtocolScheduler {
    /// Interval-derived schedule. Empty when no category is enabled; callers
    /// decide whether that is acceptable.
    pub fn configured(duration_min: u32, config: &ProtocolConfig) -> Vec<Protocol> {
        let mut protocols = Vec::new();
        for category in DebtCategory::WELLNESS {
            let (Some(schedule), Some(action)) = (config.get(category), action_for(category)) else {
                continue;
            };
            // zero interval would never advance
            if !schedule.enabled || schedule.interval_min == 0 {
                continue;
            }
            let mut minute = schedule.interval_min;
            while minute < duration_min {
                protocols.push(Protocol {
                    id: 0,
                    name: action.name.to_string(),
                    category,
                    duration_secs: action.duration_secs,
                    trigger_minute: minute,
                });
                minute = match minute.checked_add(schedule.interval_min) {
                    Some(next) => next,
                    None => break,
                };
            }
        }
        finish(protocols)
    }

    /// Fixed template for the block's tier. Events that would fire at or
    /// after the end of the block are dropped.
    pub fn template(duration_min: u32) -> Vec<Protocol> {
        let protocols = TemplateTier::for_duration(duration_min)
            .events()
            .iter()
            .filter(|(minute, ..)| *minute < duration_min)
            .map(|(minute, name, category, secs)| Protocol {
                id: 0,
                name: (*name).to_string(),
                category: *category,
                duration_secs: *secs,
                trigger_minute: *minute,
            })
            .collect();
        finish(protocols)
    }
}

fn finish(mut protocols: Vec<Protocol>) -> Vec<Protocol> {
    protocols.sort_by_key(|p| (p.trigger_minute, p.category.priority()));
    for (idx, protocol) in protocols.iter_mut().enumerate() {
        protocol.id = idx as u32;
    }
    protocols
}
