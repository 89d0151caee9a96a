//! grievance-runner: headless driver for the grievance portal core.
//!
//! Usage:
//!   grievance-runner --db portal.db --data-dir ./data --seed-reference
//!   grievance-runner --db portal.db --sweep --now 2026-10-18T09:00:00Z
//!   grievance-runner --db portal.db --report constituency:ac-pune-central:assembly
//!   grievance-runner --db portal.db --ipc-mode

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use grievance_core::{
    clock::{Clock, FixedClock, SystemClock},
    complaint::{ComplaintStatus, NewComplaint},
    config::{PortalConfig, ReferenceData},
    engine::GrievanceEngine,
    error::{GrievanceError, GrievanceResult},
    lifecycle::TransitionRequest,
    reference::ConstituencyKind,
    store::GrievanceStore,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    CreateComplaint {
        complaint: NewComplaint,
    },
    Assign {
        complaint_id: String,
        authority_id: String,
    },
    Route {
        complaint_id: String,
    },
    Transition {
        complaint_id: String,
        status: ComplaintStatus,
        #[serde(default)]
        authority_id: Option<String>,
        #[serde(default)]
        notes: Option<String>,
    },
    EvaluateEscalation {
        complaint_id: String,
        #[serde(default)]
        now: Option<DateTime<Utc>>,
    },
    Sweep {
        #[serde(default)]
        now: Option<DateTime<Utc>>,
    },
    Report {
        target: String,
    },
    History {
        complaint_id: String,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = has_flag(&args, "--ipc-mode");
    let seed_reference = has_flag(&args, "--seed-reference");
    let sweep = has_flag(&args, "--sweep");
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");
    let report = arg_value(&args, "--report");
    let now = arg_value(&args, "--now")
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| anyhow!("--now must be RFC 3339: {e}"))
        })
        .transpose()?;

    if !ipc_mode {
        println!("Grievance portal runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        if let Some(now) = now {
            println!("  now:       {now}");
        }
        println!();
    }

    let store = if db == ":memory:" {
        GrievanceStore::in_memory()?
    } else {
        GrievanceStore::open(db)?
    };
    store.migrate()?;

    // A missing portal.json means defaults; a malformed one is an error.
    let config = if Path::new(data_dir).join("portal.json").exists() {
        PortalConfig::load(data_dir)?
    } else {
        log::warn!("no portal.json under {data_dir}, using defaults");
        PortalConfig::default()
    };

    if seed_reference || db == ":memory:" {
        let reference = ReferenceData::load(data_dir)?;
        store.seed_reference(&reference)?;
        log::info!(
            "seeded {} departments, {} authorities, {} rules",
            reference.departments.len(),
            reference.authorities.len(),
            reference.escalation_rules.len()
        );
    }

    let clock: Box<dyn Clock> = match now {
        Some(now) => Box::new(FixedClock::at(now)),
        None => Box::new(SystemClock),
    };
    let mut engine = GrievanceEngine::new(store, config, clock);

    if ipc_mode {
        return run_ipc_loop(&mut engine);
    }

    if sweep {
        let result = engine.evaluate_open_escalations(engine.now())?;
        println!("=== ESCALATION SWEEP ===");
        println!("  evaluated:  {}", result.evaluated);
        println!("  escalated:  {}", result.escalated);
        println!("  not due:    {}", result.not_due);
        println!("  rule gaps:  {}", result.rule_gaps);
        println!("  dormant:    {}", result.dormant);
        println!();
    }

    if let Some(target) = report {
        let value = build_report(&engine, target)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_summary(&engine)?;
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut GrievanceEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string(), "kind": "parse" });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };
        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let reply = match handle_command(engine, cmd) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("command failed: {e}");
                serde_json::json!({ "error": e.to_string(), "kind": e.kind() })
            }
        };
        writeln!(stdout, "{}", reply)?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(
    engine: &mut GrievanceEngine,
    cmd: IpcCommand,
) -> GrievanceResult<serde_json::Value> {
    let value = match cmd {
        IpcCommand::CreateComplaint { complaint } => {
            serde_json::to_value(engine.create_complaint(complaint)?)?
        }
        IpcCommand::Assign {
            complaint_id,
            authority_id,
        } => serde_json::to_value(engine.assign_authority(&complaint_id, &authority_id)?)?,
        IpcCommand::Route { complaint_id } => {
            serde_json::to_value(engine.route_complaint(&complaint_id)?)?
        }
        IpcCommand::Transition {
            complaint_id,
            status,
            authority_id,
            notes,
        } => {
            let mut request = TransitionRequest::new(complaint_id, status);
            if let Some(authority_id) = authority_id {
                request = request.by(authority_id);
            }
            if let Some(notes) = notes {
                request = request.with_notes(notes);
            }
            serde_json::to_value(engine.transition_status(&request)?)?
        }
        IpcCommand::EvaluateEscalation { complaint_id, now } => {
            let now = now.unwrap_or_else(|| engine.now());
            serde_json::to_value(engine.evaluate_escalation(&complaint_id, now)?)?
        }
        IpcCommand::Sweep { now } => {
            let now = now.unwrap_or_else(|| engine.now());
            serde_json::to_value(engine.evaluate_open_escalations(now)?)?
        }
        IpcCommand::Report { target } => build_report(engine, &target)?,
        IpcCommand::History { complaint_id } => {
            serde_json::to_value(engine.status_history(&complaint_id)?)?
        }
        IpcCommand::Quit => serde_json::Value::Null,
    };
    Ok(value)
}

/// `authority:ID`, `constituency:ID:assembly|parliamentary`, `party:ID`, `politician:ID`.
fn build_report(engine: &GrievanceEngine, target: &str) -> GrievanceResult<serde_json::Value> {
    let parts: Vec<&str> = target.split(':').collect();
    let value = match parts.as_slice() {
        ["authority", id] => serde_json::to_value(engine.authority_report(id)?)?,
        ["constituency", id, kind] => {
            let kind: ConstituencyKind = kind
                .parse()
                .map_err(|e| GrievanceError::InvalidInput(format!("{e}")))?;
            serde_json::to_value(engine.constituency_report(id, kind)?)?
        }
        ["party", id] => serde_json::to_value(engine.party_report(id)?)?,
        ["politician", id] => serde_json::to_value(engine.politician_report(id)?)?,
        ["leaderboard", "authorities"] => serde_json::to_value(engine.authority_leaderboard(None)?)?,
        ["leaderboard", "authorities", department_id] => {
            serde_json::to_value(engine.authority_leaderboard(Some(*department_id))?)?
        }
        ["leaderboard", "parties"] => serde_json::to_value(engine.party_leaderboard()?)?,
        _ => {
            return Err(GrievanceError::InvalidInput(format!(
                "unknown report target '{target}'"
            )))
        }
    };
    Ok(value)
}

fn print_summary(engine: &GrievanceEngine) -> Result<()> {
    let store = engine.store();
    println!("=== PORTAL SUMMARY ===");
    println!("  complaints:  {}", store.complaint_count()?);
    println!("  open:        {}", store.open_complaint_ids()?.len());
    println!(
        "  escalations: {}",
        store.status_log_count(ComplaintStatus::Escalated)?
    );

    println!();
    println!("=== PARTY LEADERBOARD ===");
    let board = engine.party_leaderboard()?;
    if board.is_empty() {
        println!("  (No parties on record)");
    } else {
        for entry in &board {
            println!(
                "  #{:<3} {:<32} score {:>3} ({:?}) | {} complaints",
                entry.rank,
                entry.name,
                entry.performance_score,
                entry.performance_level,
                entry.total_complaints
            );
        }
    }
    Ok(())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
