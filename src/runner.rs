// The Scenario Runner — the deterministic driver that ties the replay
// kernel, matching engine, invariant checkers and mark-out tracker
// together into one reproducible run directory. Ported from the reference
// runner's `run_scenario`.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use sha2::{Digest as _, Sha256};
use thiserror::Error;

use crate::artifacts::{self, ArtifactError, ArtifactPaths};
use crate::canonical::canonical_json;
use crate::engine::{Event, Fill, MatchingEngine, PlaceLimitRequest, SimulatorParams, Tif};
use crate::fingerprint::{fingerprint_file, file_sha256, DataFingerprint};
use crate::invariants::{AccountingResidual, ContractChecker, FillConservation};
use crate::ledger::Ledger;
use crate::markout::MarkoutTracker;
use crate::snapshot::{CodecError, ReplayKernel};
use crate::spec_model::{ScenarioSpec, SpecError};
use crate::types::Side;

/// Cadence of the ledger-unit conservation check, decoupled from the
/// scenario's own `check_every_steps` (checkpoint cadence) — ported as a
/// fixed constant from the reference runner's hardcoded local variable.
const CONSERVATION_CHECK_EVERY_STEPS: u64 = 5000;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Engine(#[from] crate::engine::EngineError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invariant violated at step {step}: {message}")]
    InvariantViolated { step: u64, message: String },
    #[error("run failed with {failures} invariant/contract violation(s); run_dir={}", run_dir.display())]
    StrictFailure { failures: u64, run_dir: PathBuf },
}

#[derive(Serialize)]
struct Manifest<'a> {
    run_id: &'a str,
    timestamp_utc: &'a str,
    platform: String,
    data_fingerprint: &'a DataFingerprint,
    git_sha: Option<String>,
    git_dirty: Option<bool>,
}

#[derive(Serialize)]
struct ReplayToken<'a> {
    run_id: &'a str,
    spec_sha256: String,
    fingerprint: &'a DataFingerprint,
    #[serde(skip_serializing_if = "Option::is_none")]
    digests: Option<Digests>,
}

#[derive(Serialize, Clone)]
struct Digests {
    fills_jsonl_sha256: Option<String>,
    events_jsonl_sha256: Option<String>,
    audit_jsonl_sha256: Option<String>,
    markout_csv_sha256: Option<String>,
    spec_json_sha256: String,
}

#[derive(Serialize)]
struct AccountingSummary {
    fills_seen: u64,
    expected_fee_cash_q: i64,
    max_cash_residual_q: i64,
    max_cash_residual_bound_q: i64,
    inferred_price_scale: Option<i64>,
    overflow_risk_flag: bool,
}

#[derive(Serialize)]
struct Metrics<'a> {
    run_id: &'a str,
    timestamp_utc: &'a str,
    steps: u64,
    placed_orders: u64,
    fills: u64,
    events: u64,
    failures: u64,
    strict: bool,
    accounting: AccountingSummary,
    digests: Digests,
}

#[derive(Serialize)]
struct FillRow {
    ts_ns: i64,
    order_id: u64,
    liq: &'static str,
    side: String,
    price_q: i64,
    qty_q: i64,
    notional_cash_q: i64,
    fee_cash_q: i64,
}

impl From<&Fill> for FillRow {
    fn from(f: &Fill) -> Self {
        FillRow {
            ts_ns: f.ts_ns,
            order_id: f.order_id,
            liq: f.liq.name(),
            side: f.side.to_string(),
            price_q: f.price_q,
            qty_q: f.qty_q,
            notional_cash_q: f.notional_cash_q,
            fee_cash_q: f.fee_cash_q,
        }
    }
}

#[derive(Serialize)]
struct EventRow {
    ts_ns: i64,
    order_id: u64,
    #[serde(rename = "type")]
    kind: &'static str,
    state: &'static str,
    reject_reason: Option<&'static str>,
}

impl From<&Event> for EventRow {
    fn from(e: &Event) -> Self {
        EventRow {
            ts_ns: e.ts_ns,
            order_id: e.order_id,
            kind: e.kind.name(),
            state: e.state.name(),
            reject_reason: e.reject_reason.map(|r| r.name()),
        }
    }
}

fn platform_string() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

fn utc_stamp() -> String {
    chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Best-effort `git rev-parse HEAD` / `git status --porcelain`; `None` when
/// not inside a repository or `git` is unavailable — reproducibility of the
/// run itself never depends on this succeeding.
fn git_info(repo_root: &Path) -> (Option<String>, Option<bool>) {
    let run = |args: &[&str]| -> Option<String> {
        let output = Command::new(args[0]).args(&args[1..]).current_dir(repo_root).output().ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    };
    let sha = run(&["git", "rev-parse", "HEAD"]);
    let dirty = run(&["git", "status", "--porcelain"]).map(|s| !s.is_empty());
    (sha, dirty)
}

fn digest_if_exists(path: &Path) -> Result<Option<String>, RunnerError> {
    if path.exists() {
        Ok(Some(file_sha256(path)?))
    } else {
        Ok(None)
    }
}

#[allow(clippy::too_many_arguments)]
fn checkpoint(
    step: u64,
    mid_q: Option<i64>,
    engine: &MatchingEngine,
    paths: &ArtifactPaths,
    last_fills_n: &mut usize,
    last_events_n: &mut usize,
    contract: &mut ContractChecker,
    accounting: &mut AccountingResidual,
    mut markout: Option<&mut MarkoutTracker>,
    failures: &mut u64,
) -> Result<(), RunnerError> {
    let fills = engine.fills();
    let events = engine.events();
    let new_fills = &fills[*last_fills_n..];
    let new_events = &events[*last_events_n..];

    let fill_rows: Vec<FillRow> = new_fills.iter().map(FillRow::from).collect();
    let event_rows: Vec<EventRow> = new_events.iter().map(EventRow::from).collect();

    for f in new_fills {
        accounting.observe_fill(f);
        if let (Some(tracker), Some(mid)) = (markout.as_mut(), mid_q) {
            tracker.on_fill(f, step, mid);
        }
    }
    for e in new_events {
        contract.observe_event(e);
    }

    *last_fills_n = fills.len();
    *last_events_n = events.len();

    artifacts::append_jsonl(&paths.fills_jsonl, &fill_rows)?;
    artifacts::append_jsonl(&paths.events_jsonl, &event_rows)?;

    let problems = contract.check(engine.orders());
    for p in &problems {
        *failures += 1;
        tracing::error!(step, problem = %p, "contract violation");
    }

    let ledger = engine.ledger();
    let (row, err) = accounting.check(step, ledger.cash_q, ledger.locked_cash_q, mid_q, ledger.position_qty_q);
    if let Some(msg) = &err {
        *failures += 1;
        tracing::error!(step, error = %msg, "accounting residual violated");
    }
    artifacts::append_jsonl(&paths.audit_jsonl, std::slice::from_ref(&row))?;

    tracing::info!(
        step,
        fills = fills.len(),
        events = events.len(),
        cash_q = ledger.cash_q,
        position_qty_q = ledger.position_qty_q,
        "checkpoint"
    );
    Ok(())
}

/// Drives one full scenario: opens the snapshot, replays it through the
/// matching engine, checkpoints invariants and artifacts, and returns the
/// run directory on success. On a `strict` invariant/contract failure the
/// run directory and every artifact up to `metrics.json`/`replay_token.json`
/// are still written before the error is returned — partial output is
/// intentional, not a bug.
pub fn run_scenario(spec: &ScenarioSpec, out_root: &Path, strict: bool) -> Result<PathBuf, RunnerError> {
    let spec_json = spec.canonical_json()?;
    let spec_value: serde_json::Value = serde_json::from_str(&spec_json)?;

    let fp = fingerprint_file(Path::new(&spec.snap_path))?;
    let fp_value = serde_json::to_value(&fp)?;

    let repo_root = std::env::current_dir()?;
    let (git_sha, git_dirty) = git_info(&repo_root);

    let run_id_material = serde_json::json!({
        "spec": spec_value,
        "data": fp_value,
        "git_sha": git_sha,
    });
    let run_id_text = canonical_json(&run_id_material)?;
    let run_id = sha256_hex(run_id_text.as_bytes())[..16].to_string();
    let spec_sha256 = sha256_hex(spec_json.as_bytes());

    let ts = utc_stamp();
    let paths = artifacts::make_run_dir(out_root, &run_id, &ts)?;

    spec.save(&paths.spec_json)?;
    artifacts::write_json(
        &paths.manifest_json,
        &Manifest {
            run_id: &run_id,
            timestamp_utc: &ts,
            platform: platform_string(),
            data_fingerprint: &fp,
            git_sha: git_sha.clone(),
            git_dirty,
        },
    )?;
    let mut replay_token = ReplayToken {
        run_id: &run_id,
        spec_sha256: spec_sha256.clone(),
        fingerprint: &fp,
        digests: None,
    };
    artifacts::write_json(&paths.replay_token_json, &replay_token)?;

    let mut kernel = ReplayKernel::open(Path::new(&spec.snap_path))?;
    let header = *kernel.header();

    let params = SimulatorParams {
        max_orders: spec.max_orders,
        max_events: spec.max_events,
        alpha_ppm: spec.alpha_ppm,
        maker_fee_ppm: spec.maker_fee_ppm,
        taker_fee_ppm: spec.taker_fee_ppm,
        outbound_latency_ns: spec.outbound_latency_ns,
        observation_latency_ns: spec.observation_latency_ns,
    };
    let mut engine = MatchingEngine::new(params, header.depth as usize, header.price_scale, header.qty_scale);
    let init_ledger = Ledger::new(
        spec.initial_cash_q,
        spec.initial_position_qty_q,
        spec.initial_locked_cash_q,
        spec.initial_locked_position_qty_q,
    );
    engine.reset(spec.start_ts_ns, init_ledger);

    let mut conservation = FillConservation::new(spec.initial_cash_q, spec.initial_position_qty_q);
    let mut contract = ContractChecker::new();
    let mut accounting = AccountingResidual::new(spec.initial_cash_q, spec.cash_residual_tolerance_q);
    let mut markout = spec.enable_markout.then(|| MarkoutTracker::new(spec.markout_horizons_steps.clone()));

    let mut fills_cursor = 0usize;
    let mut last_fills_n = 0usize;
    let mut last_events_n = 0usize;
    let mut placed_orders = 0u64;
    let mut steps = 0u64;
    let mut failures = 0u64;

    let mut step_record = kernel.next()?;
    while let Some(record) = step_record {
        engine.step(&record)?;
        steps += 1;

        let fills = engine.fills();
        while fills_cursor < fills.len() {
            conservation.ingest_fill(&fills[fills_cursor]);
            fills_cursor += 1;
        }

        if strict || steps % CONSERVATION_CHECK_EVERY_STEPS == 0 {
            if let Some(msg) = conservation.check(engine.ledger(), spec.cash_residual_tolerance_q, 0) {
                tracing::error!(step = steps, error = %msg, "conservation check failed");
                if strict {
                    return Err(RunnerError::InvariantViolated { step: steps, message: msg });
                }
            }
        }

        let mid_q = engine.depth().mid_q();
        if let (Some(tracker), Some(mid)) = (markout.as_mut(), mid_q) {
            tracker.update(steps, mid);
        }

        if spec.order_every_steps > 0 && steps >= spec.warmup_steps && steps % spec.order_every_steps == 0 {
            if let Some(mid) = mid_q {
                let bid_id = engine.place_limit(PlaceLimitRequest {
                    side: Side::Buy,
                    price_q: mid - spec.tick_q,
                    qty_q: spec.qty_q,
                    tif: Tif::Gtc,
                });
                let ask_id = engine.place_limit(PlaceLimitRequest {
                    side: Side::Sell,
                    price_q: mid + spec.tick_q,
                    qty_q: spec.qty_q,
                    tif: Tif::Gtc,
                });
                if bid_id == 0 || ask_id == 0 {
                    if strict {
                        failures += 1;
                        tracing::error!(step = steps, bid_id, ask_id, "demo order rejected");
                    } else {
                        tracing::warn!(step = steps, bid_id, ask_id, "demo order rejected");
                    }
                } else {
                    placed_orders += 2;
                    tracing::info!(step = steps, mid_q = mid, bid_id, ask_id, "placed demo orders");
                }
            }
        }

        if spec.check_every_steps > 0 && steps % spec.check_every_steps == 0 {
            checkpoint(
                steps,
                mid_q,
                &engine,
                &paths,
                &mut last_fills_n,
                &mut last_events_n,
                &mut contract,
                &mut accounting,
                markout.as_mut(),
                &mut failures,
            )?;
        }

        if spec.max_steps > 0 && steps >= spec.max_steps {
            break;
        }
        step_record = kernel.next()?;
    }

    let final_mid = engine.depth().mid_q();
    checkpoint(
        steps,
        final_mid,
        &engine,
        &paths,
        &mut last_fills_n,
        &mut last_events_n,
        &mut contract,
        &mut accounting,
        markout.as_mut(),
        &mut failures,
    )?;

    if let Some(tracker) = markout.as_mut() {
        let completed = tracker.completed();
        if !completed.is_empty() {
            let horizons: Vec<u64> = completed[0].markouts.iter().map(|(h, _)| *h).collect();
            let mut header_owned: Vec<String> =
                ["fill_idx", "fill_ts_ns", "order_id", "liq", "side", "qty_q", "fill_price_q", "mid0_q", "step0"]
                    .into_iter()
                    .map(String::from)
                    .collect();
            for h in &horizons {
                header_owned.push(format!("markout_price_q_h{h}"));
            }
            let header_refs: Vec<&str> = header_owned.iter().map(String::as_str).collect();

            let rows: Vec<Vec<String>> = completed
                .iter()
                .map(|c| {
                    let mut row = vec![
                        c.fill_idx.to_string(),
                        c.fill_ts_ns.to_string(),
                        c.order_id.to_string(),
                        c.liq.name().to_string(),
                        c.side.to_string(),
                        c.qty_q.to_string(),
                        c.fill_price_q.to_string(),
                        c.mid0_q.to_string(),
                        c.step0.to_string(),
                    ];
                    for (_, v) in &c.markouts {
                        row.push(v.to_string());
                    }
                    row
                })
                .collect();
            artifacts::write_csv(&paths.markout_csv, &header_refs, &rows)?;
        }
    }

    let digests = Digests {
        fills_jsonl_sha256: digest_if_exists(&paths.fills_jsonl)?,
        events_jsonl_sha256: digest_if_exists(&paths.events_jsonl)?,
        audit_jsonl_sha256: digest_if_exists(&paths.audit_jsonl)?,
        markout_csv_sha256: digest_if_exists(&paths.markout_csv)?,
        spec_json_sha256: spec_sha256,
    };

    let acc_state = *accounting.state();
    artifacts::write_json(
        &paths.metrics_json,
        &Metrics {
            run_id: &run_id,
            timestamp_utc: &ts,
            steps,
            placed_orders,
            fills: last_fills_n as u64,
            events: last_events_n as u64,
            failures,
            strict,
            accounting: AccountingSummary {
                fills_seen: acc_state.fills_seen,
                expected_fee_cash_q: acc_state.expected_fee_cash_q,
                max_cash_residual_q: acc_state.max_cash_residual_q,
                max_cash_residual_bound_q: acc_state.max_cash_bound_q,
                inferred_price_scale: acc_state.inferred_price_scale,
                overflow_risk_flag: acc_state.overflow_risk_flag,
            },
            digests: digests.clone(),
        },
    )?;

    replay_token.digests = Some(digests);
    artifacts::write_json(&paths.replay_token_json, &replay_token)?;

    tracing::info!(run_dir = %paths.run_dir.display(), steps, failures, "scenario run complete");

    if failures > 0 && strict {
        return Err(RunnerError::StrictFailure { failures, run_dir: paths.run_dir });
    }

    Ok(paths.run_dir)
}
