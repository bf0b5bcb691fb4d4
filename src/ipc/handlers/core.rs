use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;

use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

use super::settings;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "demo": state.demo
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = path else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match db::open_db(&path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", e.to_string(), None),
    };

    state.workspace = Some(path.clone());
    state.db = Some(conn);
    state.demo = false;
    state.demo_settings = None;
    state.session = None;

    // Prime the settings singleton and derive the gate once per load.
    match settings::current_settings(state) {
        Ok(Some(s)) => settings::rebuild_gate(state, &s, Utc::now()),
        Ok(None) => {}
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    log::info!("workspace opened at {}", path.to_string_lossy());
    ok(
        &req.id,
        json!({ "workspacePath": path.to_string_lossy().to_string() }),
    )
}

fn handle_workspace_demo(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.workspace = None;
    state.db = None;
    state.demo = true;
    state.demo_settings = None;
    state.session = None;

    match settings::current_settings(state) {
        Ok(Some(s)) => settings::rebuild_gate(state, &s, Utc::now()),
        _ => state.gate = None,
    }

    log::info!("demo mode enabled; no backing store");
    ok(&req.id, json!({ "demo": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "workspace.demo" => Some(handle_workspace_demo(state, req)),
        _ => None,
    }
}
