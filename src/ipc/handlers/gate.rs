use chrono::{DateTime, Utc};
use serde_json::json;

use crate::gate::{ReleaseGate, Tick};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

use super::settings;

fn handle_gate_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    // Deterministic ticks in tests inject `now`; production omits it.
    let now = match req.params.get("now").and_then(|v| v.as_str()) {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(d) => d.with_timezone(&Utc),
            Err(_) => {
                return err(
                    &req.id,
                    "bad_params",
                    "now must be an RFC 3339 timestamp",
                    None,
                )
            }
        },
        None => Utc::now(),
    };

    let current = match settings::current_settings(state) {
        Ok(Some(s)) => s,
        Ok(None) => return err(&req.id, "no_workspace", "select a workspace first", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some(release_at) = current.release_date_parsed() else {
        return err(
            &req.id,
            "bad_settings",
            "stored releaseDate is not a valid timestamp",
            None,
        );
    };

    // An admin moving the release date re-derives the machine; an already
    // open gate stays open for this load regardless.
    let rebuild = match &state.gate {
        Some(gate) => gate.release_at() != release_at && !gate.is_open(),
        None => true,
    };
    if rebuild {
        state.gate = Some(ReleaseGate::new(release_at, now));
    }
    let Some(gate) = state.gate.as_mut() else {
        return err(&req.id, "bad_settings", "release gate unavailable", None);
    };

    let result = match gate.tick(now) {
        Tick::Locked(r) => json!({
            "state": "locked",
            "justOpened": false,
            "remaining": {
                "days": r.days,
                "hours": r.hours,
                "minutes": r.minutes,
                "seconds": r.seconds
            }
        }),
        Tick::Opened => {
            log::info!("announcement released; lookup is now open");
            json!({ "state": "open", "justOpened": true })
        }
        Tick::Open => json!({ "state": "open", "justOpened": false }),
    };
    ok(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "gate.status" => Some(handle_gate_status(state, req)),
        _ => None,
    }
}
