use serde_json::json;

use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

/// Resolves a student-facing query: exact NISN match first, exam number
/// second. Not-found and store failure are distinct outcomes, never
/// conflated.
fn handle_lookup_query(state: &mut AppState, req: &Request) -> serde_json::Value {
    let query = req
        .params
        .get("query")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or("");
    if query.is_empty() {
        // Rejected locally, before any store access.
        return err(
            &req.id,
            "bad_params",
            "enter a NISN or exam number",
            None,
        );
    }

    if state.demo {
        return err(&req.id, "not_found", "no student matches that number", None);
    }
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    match db::student_get(conn, query) {
        Ok(Some(student)) => return ok(&req.id, json!({ "student": student, "matchedBy": "nisn" })),
        Ok(None) => {}
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }
    match db::student_find_by_exam_number(conn, query) {
        Ok(Some(student)) => ok(
            &req.id,
            json!({ "student": student, "matchedBy": "examNumber" }),
        ),
        Ok(None) => err(&req.id, "not_found", "no student matches that number", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "lookup.query" => Some(handle_lookup_query(state, req)),
        _ => None,
    }
}
