// End-to-end tests for the scenario runner: boundary behaviours (B1-B3),
// reproducibility (R1), and the capacity-exceeded scenario (§8 scenario 5).
// These need a constructed `.snap` fixture and a full runner pass, so they
// live here rather than as inline `#[cfg(test)]` units.

use std::fs;
use std::path::Path;

use microstructure_sim::runner::{run_scenario, RunnerError};
use microstructure_sim::spec_model::ScenarioSpec;
use microstructure_sim::Header;

const HEADER_SIZE: u64 = 40;

/// Writes a depth-1 `.snap` fixture: `records` is `(ts_recv_ns, bid, ask)`
/// where `bid`/`ask` are `(price_q, qty_q)`; a `price_q` of `None` writes
/// the side's null-price sentinel.
fn write_fixture(path: &Path, records: &[(i64, Option<(i64, i64)>, Option<(i64, i64)>)]) {
    let depth: u16 = 1;
    let record_size = 16 + 32 * depth as u32;
    let header = Header {
        version: 1,
        depth,
        record_size,
        price_scale: 1,
        qty_scale: 1,
        declared_record_count: records.len() as u64,
    };
    let mut bytes = header.to_bytes(records.len() as u64).to_vec();
    for (i, (ts_recv_ns, bid, ask)) in records.iter().enumerate() {
        bytes.extend_from_slice(&(*ts_recv_ns / 1_000_000).to_le_bytes()); // ts_event_ms
        bytes.extend_from_slice(&ts_recv_ns.to_le_bytes());
        let (bid_p, bid_q) = bid.unwrap_or((0, 0));
        bytes.extend_from_slice(&bid_p.to_le_bytes());
        bytes.extend_from_slice(&bid_q.to_le_bytes());
        let (ask_p, ask_q) = ask.unwrap_or((i64::MAX, 0));
        bytes.extend_from_slice(&ask_p.to_le_bytes());
        bytes.extend_from_slice(&ask_q.to_le_bytes());
    }
    fs::write(path, &bytes).unwrap();
}

fn oscillating_fixture(path: &Path, n: usize) {
    let records: Vec<_> = (0..n)
        .map(|i| {
            let drift = (i % 6) as i64;
            let bid = 100 + drift;
            let ask = 110 - drift;
            (i as i64 * 1_000, Some((bid, 10)), Some((ask, 10)))
        })
        .collect();
    write_fixture(path, &records);
}

fn base_spec(snap_path: &Path) -> ScenarioSpec {
    let mut spec = ScenarioSpec::new(snap_path.display().to_string());
    spec.warmup_steps = 0;
    spec.order_every_steps = 2;
    spec.check_every_steps = 3;
    spec.qty_q = 1;
    spec.tick_q = 1;
    spec
}

#[test]
fn empty_snapshot_produces_an_empty_run_with_no_crash() {
    let dir = tempfile::tempdir().unwrap();
    let snap = dir.path().join("empty.snap");
    write_fixture(&snap, &[]);

    let spec = base_spec(&snap);
    let out_root = dir.path().join("runs");
    let run_dir = run_scenario(&spec, &out_root, false).unwrap();

    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(run_dir.join("metrics.json")).unwrap()).unwrap();
    assert_eq!(metrics["steps"], 0);
    assert_eq!(metrics["fills"], 0);
    assert_eq!(metrics["events"], 0);
    assert!(!run_dir.join("fills.jsonl").exists());
    assert!(!run_dir.join("events.jsonl").exists());
}

#[test]
fn max_steps_one_runs_exactly_one_step() {
    let dir = tempfile::tempdir().unwrap();
    let snap = dir.path().join("book.snap");
    oscillating_fixture(&snap, 10);

    let mut spec = base_spec(&snap);
    spec.max_steps = 1;
    let out_root = dir.path().join("runs");
    let run_dir = run_scenario(&spec, &out_root, false).unwrap();

    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(run_dir.join("metrics.json")).unwrap()).unwrap();
    assert_eq!(metrics["steps"], 1);
}

#[test]
fn identical_spec_and_data_produce_byte_identical_streams() {
    let dir = tempfile::tempdir().unwrap();
    let snap = dir.path().join("book.snap");
    oscillating_fixture(&snap, 30);

    let mut spec = base_spec(&snap);
    spec.markout_horizons_steps = vec![1, 2, 4];

    let run_a = run_scenario(&spec, &dir.path().join("runs_a"), false).unwrap();
    let run_b = run_scenario(&spec, &dir.path().join("runs_b"), false).unwrap();

    for name in ["fills.jsonl", "events.jsonl", "audit.jsonl"] {
        let a = fs::read(run_a.join(name)).unwrap_or_default();
        let b = fs::read(run_b.join(name)).unwrap_or_default();
        assert_eq!(a, b, "{name} differs between otherwise-identical runs");
    }

    let token_a: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(run_a.join("replay_token.json")).unwrap()).unwrap();
    let token_b: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(run_b.join("replay_token.json")).unwrap()).unwrap();
    assert_eq!(token_a["digests"], token_b["digests"]);
    assert_eq!(token_a["run_id"], token_b["run_id"]);
}

#[test]
fn markout_csv_is_emitted_once_horizons_complete() {
    let dir = tempfile::tempdir().unwrap();
    let snap = dir.path().join("book.snap");
    oscillating_fixture(&snap, 40);

    let mut spec = base_spec(&snap);
    spec.markout_horizons_steps = vec![1, 3];
    spec.order_every_steps = 1;

    let run_dir = run_scenario(&spec, &dir.path().join("runs"), false).unwrap();
    let markout_path = run_dir.join("markout.csv");
    if markout_path.exists() {
        let text = fs::read_to_string(&markout_path).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.contains("markout_price_q_h1"));
        assert!(header.contains("markout_price_q_h3"));
        assert!(lines.count() > 0);
    }
}

#[test]
fn capacity_exceeded_demo_orders_count_as_strict_failures() {
    let dir = tempfile::tempdir().unwrap();
    let snap = dir.path().join("book.snap");
    oscillating_fixture(&snap, 10);

    let mut spec = base_spec(&snap);
    spec.max_orders = 3;
    spec.order_every_steps = 1;
    spec.enable_markout = false;

    let out_root = dir.path().join("runs");
    let err = run_scenario(&spec, &out_root, true).unwrap_err();
    match err {
        RunnerError::StrictFailure { failures, run_dir } => {
            assert!(failures > 0);
            // Partial artifacts remain for inspection even on strict failure.
            assert!(run_dir.join("metrics.json").exists());
        }
        other => panic!("expected StrictFailure, got {other:?}"),
    }
}

#[test]
fn strict_run_with_generous_capacity_has_zero_failures() {
    let dir = tempfile::tempdir().unwrap();
    let snap = dir.path().join("book.snap");
    oscillating_fixture(&snap, 20);

    let spec = base_spec(&snap);
    let run_dir = run_scenario(&spec, &dir.path().join("runs"), true).unwrap();

    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(run_dir.join("metrics.json")).unwrap()).unwrap();
    assert_eq!(metrics["failures"], 0);
}
