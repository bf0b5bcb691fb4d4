use serde_json::json;

use crate::db;
use crate::ingest::{self, GraduationStatus};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, RosterFilter, SortKey};

fn parse_filter(params: &serde_json::Value) -> Result<RosterFilter, String> {
    let mut filter = RosterFilter::default();
    let Some(raw) = params.get("filter") else {
        return Ok(filter);
    };
    if let Some(status) = raw.get("status") {
        if !status.is_null() {
            let parsed: GraduationStatus = serde_json::from_value(status.clone())
                .map_err(|_| "filter.status must be LULUS, TIDAK LULUS or DITUNDA".to_string())?;
            filter.status = Some(parsed);
        }
    }
    if let Some(query) = raw.get("query").and_then(|v| v.as_str()) {
        filter.query = Some(query.to_string());
    }
    Ok(filter)
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = super::auth::require_session(state, req) {
        return resp;
    }

    let filter = match parse_filter(&req.params) {
        Ok(f) => f,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let sort = match req.params.get("sort").and_then(|v| v.as_str()) {
        Some(raw) => match SortKey::parse(raw) {
            Some(k) => k,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "sort must be one of: name, className, nisn",
                    None,
                )
            }
        },
        None => SortKey::Name,
    };

    let records = if state.demo {
        Vec::new()
    } else {
        let Some(conn) = state.db.as_ref() else {
            return err(&req.id, "no_workspace", "select a workspace first", None);
        };
        match db::students_list(conn) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    };

    let projected = roster::project(&records, &filter, sort);
    let tally = roster::tally(&records);
    ok(
        &req.id,
        json!({
            "students": projected,
            "total": records.len(),
            "tally": {
                "passed": tally.passed,
                "failed": tally.failed,
                "deferred": tally.deferred
            }
        }),
    )
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let nisn = req
        .params
        .get("nisn")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or("");
    if nisn.is_empty() {
        return err(&req.id, "bad_params", "missing params.nisn", None);
    }
    if state.demo {
        return err(&req.id, "not_found", "student not found", None);
    }
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match db::student_get(conn, nisn) {
        Ok(Some(student)) => ok(&req.id, json!({ "student": student })),
        Ok(None) => err(&req.id, "not_found", "student not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_students_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = super::auth::require_session(state, req) {
        return resp;
    }
    let Some(obj) = req.params.get("student").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "params.student must be an object", None);
    };

    // Manual edits pass through the same validator as bulk ingestion, so
    // required fields and the score bound hold on every path.
    let student = match ingest::student_from_object(1, obj) {
        Ok(s) => s,
        Err(issues) => {
            return err(
                &req.id,
                "bad_params",
                "student record failed validation",
                Some(json!({ "issues": issues })),
            )
        }
    };

    if state.demo {
        return ok(&req.id, json!({ "student": student, "demo": true }));
    }
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Err(e) = db::students_upsert_batch(conn, std::slice::from_ref(&student)) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "student": student }))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = super::auth::require_session(state, req) {
        return resp;
    }
    let nisn = req
        .params
        .get("nisn")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or("");
    if nisn.is_empty() {
        return err(&req.id, "bad_params", "missing params.nisn", None);
    }
    if state.demo {
        return err(&req.id, "not_found", "student not found", None);
    }
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match db::student_delete(conn, nisn) {
        Ok(true) => ok(&req.id, json!({ "deleted": nisn })),
        Ok(false) => err(&req.id, "not_found", "student not found", None),
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.upsert" => Some(handle_students_upsert(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
