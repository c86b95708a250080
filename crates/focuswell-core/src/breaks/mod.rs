//! Break logging and debt clearance.
//!
//! Breaks are the only way debt goes down. Clearance per category is a fixed
//! formula of break length, break type and the activities done during the
//! break, and is always capped at the debt currently owed.

mod clearance;

pub use clearance::{
    ActivityFlags, BreakClearanceCalculator, BreakLog, BreakType, Clearance, ClearancePreview,
};
