//! Generates (or checks) the exhaustive FSM enumeration artifact.
//!
//! `explore_fsm [out.json]` writes the full state/transition table.
//! `explore_fsm check <out.json>` recomputes the BFS and compares its
//! summary against a previously saved artifact, exiting non-zero on
//! mismatch — a regression check for the control FSM's shape.

use std::env;
use std::fs;
use std::process::ExitCode;

use multiviewer::fsm_explore::{explore_fsm, FsmStateMachine};

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.get(1).map(String::as_str) == Some("check") {
        let Some(path) = args.get(2) else {
            eprintln!("usage: explore_fsm check <artifact.json>");
            return ExitCode::FAILURE;
        };
        return check(path);
    }

    let out_path = args.get(1).map(String::as_str).unwrap_or("mv_screen_fsm.json");
    generate(out_path)
}

fn generate(out_path: &str) -> ExitCode {
    let machine = explore_fsm();
    let summary = machine.summary();
    let json = match serde_json::to_string_pretty(&machine) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("cannot serialize fsm: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = fs::write(out_path, json) {
        eprintln!("cannot write {out_path}: {e}");
        return ExitCode::FAILURE;
    }
    println!(
        "wrote {out_path}: {} states, {} transitions, complete={}, sha256={}",
        summary.states, summary.transitions, summary.complete, summary.sha256
    );
    ExitCode::SUCCESS
}

fn check(path: &str) -> ExitCode {
    let current = explore_fsm().summary();
    let saved_content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("cannot read {path}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let saved: FsmStateMachine = match serde_json::from_str(&saved_content) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("cannot parse {path}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let saved_summary = saved.summary();
    if saved_summary == current {
        println!(
            "fsm matches: {} states, {} transitions, sha256={}",
            current.states, current.transitions, current.sha256
        );
        ExitCode::SUCCESS
    } else {
        eprintln!(
            "fsm mismatch: saved {} states/{} transitions (sha256={}) vs current {} states/{} transitions (sha256={})",
            saved_summary.states,
            saved_summary.transitions,
            saved_summary.sha256,
            current.states,
            current.transitions,
            current.sha256
        );
        ExitCode::FAILURE
    }
}
