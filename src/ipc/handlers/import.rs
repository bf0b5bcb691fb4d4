use serde_json::json;

use crate::db;
use crate::importer;
use crate::ingest::{self, IngestReport};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

/// Shared tail of both ingestion paths: enforce the all-invalid hard
/// failure, then run the chunked importer against the store (or no-op in
/// demo mode), reporting per-row issues alongside the imported count.
fn run_import(state: &mut AppState, req: &Request, report: IngestReport) -> serde_json::Value {
    let submitted = report.records.len() + report.issues.len();
    if report.records.is_empty() {
        return err(
            &req.id,
            "empty_batch",
            "no valid records in the submitted file",
            Some(json!({ "errors": report.issues })),
        );
    }

    if state.demo {
        log::info!(
            "demo import: {} records accepted, {} rows rejected (nothing persisted)",
            report.records.len(),
            report.issues.len()
        );
        return ok(
            &req.id,
            json!({
                "imported": report.records.len(),
                "total": report.records.len(),
                "percent": 100,
                "errors": report.issues,
                "demo": true
            }),
        );
    }

    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let outcome = importer::import_in_chunks(
        &report.records,
        |chunk| db::students_upsert_batch(conn, chunk),
        |p| log::debug!("import progress: {}/{} ({}%)", p.processed, p.total, p.percent),
    );

    match outcome {
        Ok(imported) => {
            log::info!(
                "imported {} of {} submitted rows in {} chunk(s); {} rejected",
                imported,
                submitted,
                importer::chunk_count(imported),
                report.issues.len()
            );
            ok(
                &req.id,
                json!({
                    "imported": imported,
                    "total": report.records.len(),
                    "percent": 100,
                    "chunks": importer::chunk_count(imported),
                    "errors": report.issues
                }),
            )
        }
        Err(halted) => {
            log::warn!(
                "import halted after {} of {} records: {}",
                halted.processed,
                halted.total,
                halted.source
            );
            err(
                &req.id,
                "db_insert_failed",
                format!("import halted: {}", halted.source),
                Some(json!({
                    "processed": halted.processed,
                    "total": halted.total
                })),
            )
        }
    }
}

fn handle_import_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = super::auth::require_session(state, req) {
        return resp;
    }
    let Some(text) = req.params.get("text").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.text", None);
    };
    let report = match ingest::parse_csv(text) {
        Ok(r) => r,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    run_import(state, req, report)
}

fn handle_import_json(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = super::auth::require_session(state, req) {
        return resp;
    }
    let Some(payload) = req.params.get("payload") else {
        return err(&req.id, "bad_params", "missing params.payload", None);
    };
    let report = match ingest::parse_json(payload) {
        Ok(r) => r,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    run_import(state, req, report)
}

fn handle_import_template(req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "filename": "student-import-template.csv",
            "text": ingest::template_csv()
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "import.csv" => Some(handle_import_csv(state, req)),
        "import.json" => Some(handle_import_json(state, req)),
        "import.template" => Some(handle_import_template(req)),
        _ => None,
    }
}
