// The auditable, pure-JSON scenario contract. Ported from the reference
// runner's `spec.py` `ScenarioSpec` dataclass; `SimulatorParams`/`Ledger`
// are built from these primitives inside the scenario runner, never
// embedded directly (keeps the spec JSON engine-binding-agnostic).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canonical::canonical_json;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub snap_path: String,

    /// 0 => run to EOF.
    pub max_steps: u64,
    pub warmup_steps: u64,
    /// 0 disables demo order placement.
    pub order_every_steps: u64,
    pub log_every_steps: u64,
    pub check_every_steps: u64,

    pub qty_q: i64,
    pub tick_q: i64,

    pub max_orders: u64,
    pub max_events: u64,
    pub alpha_ppm: i64,
    pub maker_fee_ppm: i64,
    pub taker_fee_ppm: i64,
    pub outbound_latency_ns: i64,
    pub observation_latency_ns: i64,
    pub start_ts_ns: i64,

    pub initial_cash_q: i64,
    pub initial_position_qty_q: i64,
    pub initial_locked_cash_q: i64,
    pub initial_locked_position_qty_q: i64,

    /// Bounds integer rounding drift per checkpoint.
    pub cash_residual_tolerance_q: i64,

    pub enable_markout: bool,
    pub markout_horizons_steps: Vec<u64>,
}

impl Default for ScenarioSpec {
    fn default() -> Self {
        ScenarioSpec {
            snap_path: String::new(),
            max_steps: 0,
            warmup_steps: 1000,
            order_every_steps: 5000,
            log_every_steps: 5000,
            check_every_steps: 5000,
            qty_q: 1,
            tick_q: 1,
            max_orders: 200_000,
            max_events: 200_000,
            alpha_ppm: 0,
            maker_fee_ppm: 0,
            taker_fee_ppm: 0,
            outbound_latency_ns: 0,
            observation_latency_ns: 0,
            start_ts_ns: 0,
            initial_cash_q: 1_000_000_000_000_000_000,
            initial_position_qty_q: 1_000_000_000,
            initial_locked_cash_q: 0,
            initial_locked_position_qty_q: 0,
            cash_residual_tolerance_q: 1,
            enable_markout: true,
            markout_horizons_steps: vec![100, 1000, 10000],
        }
    }
}

impl ScenarioSpec {
    pub fn new(snap_path: impl Into<String>) -> Self {
        ScenarioSpec {
            snap_path: snap_path.into(),
            ..Default::default()
        }
    }

    pub fn canonical_json(&self) -> Result<String, SpecError> {
        Ok(canonical_json(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SpecError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, format!("{}\n", self.canonical_json()?))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SpecError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_spec_matches_reference_defaults() {
        let spec = ScenarioSpec::new("book.snap");
        assert_eq!(spec.warmup_steps, 1000);
        assert_eq!(spec.markout_horizons_steps, vec![100, 1000, 10000]);
        assert_eq!(spec.initial_cash_q, 1_000_000_000_000_000_000);
    }

    #[test]
    fn canonical_json_has_sorted_keys_and_no_whitespace() {
        let spec = ScenarioSpec::new("book.snap");
        let text = spec.canonical_json().unwrap();
        assert!(text.starts_with("{\"alpha_ppm\":"));
        assert!(!text.contains(' '));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.json");
        let mut spec = ScenarioSpec::new("book.snap");
        spec.qty_q = 7;
        spec.markout_horizons_steps = vec![1, 2, 3];
        spec.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.matches('\n').count(), 1);

        let loaded = ScenarioSpec::load(&path).unwrap();
        assert_eq!(loaded, spec);
    }
}
