//! Persisted record envelope.
//!
//! Every entity is stored under its own key as
//! `{"version": N, "data": ...}`. Loads never fail: a missing, corrupt or
//! newer-than-supported record is logged and treated as absent, and the
//! caller falls back to its default.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::KvStore;
use crate::error::Result;

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u32 = 1;

pub const DEBT_LEDGER: &str = "debt_ledger";
pub const STATS: &str = "stats";
pub const BLOCKS: &str = "blocks";
pub const BREAKS: &str = "breaks";
pub const ACTIVE_BLOCK: &str = "active_block";
pub const TIMER_STATE: &str = "timer_state";

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

/// Read side of the envelope. `version` is checked before `data` is parsed.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Serialize `value` under `key` with the current schema version.
pub fn save<T: Serialize>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    let body = serde_json::to_string(&EnvelopeRef {
        version: SCHEMA_VERSION,
        data: value,
    })?;
    store.set(key, &body)?;
    Ok(())
}

/// Load the record under `key`, or `None` if absent or unusable.
///
/// Unversioned bodies (the bare record) are accepted as version 0.
pub fn load<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read record");
            return None;
        }
    };

    let parsed = serde_json::from_str::<serde_json::Value>(&raw).and_then(|value| {
        match value.get("version").map(serde_json::Value::as_u64) {
            Some(Some(version)) if version > u64::from(SCHEMA_VERSION) => Ok(Err(version)),
            Some(_) => serde_json::from_value::<Envelope<T>>(value).map(|env| Ok(env.data)),
            None => serde_json::from_value::<T>(value).map(Ok),
        }
    });

    match parsed {
        Ok(Ok(data)) => Some(data),
        Ok(Err(version)) => {
            tracing::warn!(
                key,
                version,
                supported = SCHEMA_VERSION,
                "discarding record from a newer schema"
            );
            None
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding corrupt record");
            None
        }
    }
}

pub fn load_or_default<T: DeserializeOwned + Default>(store: &dyn KvStore, key: &str) -> T {
    load(store, key).unwrap_or_default()
}

pub fn remove(store: &dyn KvStore, key: &str) -> Result<()> {
    store.remove(key)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debt::{DebtCategory, DebtLedger};
    use crate::storage::MemoryStore;

    #[test]
    fn saved_record_is_enveloped() {
        let store = MemoryStore::new();
        let mut ledger = DebtLedger::new();
        ledger.apply(DebtCategory::Eye, 2);
        save(&store, DEBT_LEDGER, &ledger).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&store.get(DEBT_LEDGER).unwrap().unwrap()).unwrap();
        assert_eq!(raw["version"], SCHEMA_VERSION);
        assert_eq!(raw["data"]["eye"], 2);

        let back: DebtLedger = load_or_default(&store, DEBT_LEDGER);
        assert_eq!(back, ledger);
    }

    #[test]
    fn bare_record_loads() {
        let store = MemoryStore::new();
        store
            .set(DEBT_LEDGER, r#"{"eye":1,"hydration":0,"mobility":3,"posture":0,"timeDebt":2}"#)
            .unwrap();
        let ledger: DebtLedger = load_or_default(&store, DEBT_LEDGER);
        assert_eq!(ledger.get(DebtCategory::Mobility), 3);
        assert_eq!(ledger.total(), 6);
    }

    #[test]
    fn corrupt_record_falls_back_to_default() {
        let store = MemoryStore::new();
        store.set(DEBT_LEDGER, "{not json").unwrap();
        let ledger: DebtLedger = load_or_default(&store, DEBT_LEDGER);
        assert_eq!(ledger.total(), 0);
    }

    #[test]
    fn envelope_with_corrupt_data_is_not_read_as_bare() {
        let store = MemoryStore::new();
        store
            .set(DEBT_LEDGER, r#"{"version":1,"data":{"eye":"lots"}}"#)
            .unwrap();
        assert!(load::<DebtLedger>(&store, DEBT_LEDGER).is_none());

        store
            .set(STATS, r#"{"version":1,"data":{"blocksCompleted":"many"}}"#)
            .unwrap();
        assert!(load::<crate::stats::Stats>(&store, STATS).is_none());
    }

    #[test]
    fn newer_schema_is_ignored() {
        let store = MemoryStore::new();
        store
            .set(DEBT_LEDGER, r#"{"version":99,"data":{"eye":7}}"#)
            .unwrap();
        assert!(load::<DebtLedger>(&store, DEBT_LEDGER).is_none());
    }

    #[test]
    fn missing_key_is_none() {
        let store = MemoryStore::new();
        assert!(load::<Vec<String>>(&store, BLOCKS).is_none());
    }
}
