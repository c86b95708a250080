//! Recovery debt: the per-category ledger and the conservative-mode policy
//! that gates session length on the ledger's total.

mod ledger;
mod policy;

pub use ledger::{DebtCategory, DebtLedger};
pub use policy::{ConservativeModePolicy, RiskLevel, Tier};
