use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request, Session};

pub fn password_digest(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().fold(String::new(), |mut acc, b| {
        acc.push_str(&format!("{:02x}", b));
        acc
    })
}

/// Gate for privileged methods: the request must carry the live session
/// token issued by `auth.login`.
pub fn require_session(state: &AppState, req: &Request) -> Result<(), serde_json::Value> {
    let token = req.params.get("token").and_then(|v| v.as_str());
    match (&state.session, token) {
        (Some(session), Some(token)) if session.token == token => Ok(()),
        _ => Err(err(&req.id, "unauthorized", "sign in first", None)),
    }
}

fn handle_provision(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let email = req
        .params
        .get("email")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or("");
    let password = req.params.get("password").and_then(|v| v.as_str()).unwrap_or("");
    if email.is_empty() || !email.contains('@') {
        return err(&req.id, "bad_params", "email must be a valid address", None);
    }
    if password.len() < 8 {
        return err(
            &req.id,
            "bad_params",
            "password must be at least 8 characters",
            None,
        );
    }

    match db::admin_count(conn) {
        Ok(0) => {}
        Ok(_) => {
            return err(
                &req.id,
                "already_provisioned",
                "an admin account already exists",
                None,
            )
        }
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    if let Err(e) = db::admin_insert(conn, email, &password_digest(password)) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    log::info!("admin account provisioned for {}", email);
    ok(&req.id, json!({ "email": email }))
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = req
        .params
        .get("email")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or("")
        .to_string();
    let password = req.params.get("password").and_then(|v| v.as_str()).unwrap_or("");

    // Demo mode grants a local-only session; it is reachable solely through
    // the explicit workspace.demo method, never through a magic credential.
    if state.demo {
        let token = Uuid::new_v4().to_string();
        state.session = Some(Session {
            token: token.clone(),
            email: email.clone(),
        });
        log::info!("local-only demo session opened");
        return ok(&req.id, json!({ "token": token, "email": email, "demo": true }));
    }

    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let stored = match db::admin_password_sha256(conn, &email) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let verified = stored
        .map(|digest| digest == password_digest(password))
        .unwrap_or(false);
    if !verified {
        log::warn!("failed login attempt for {}", email);
        return err(&req.id, "auth_failed", "invalid email or password", None);
    }

    let token = Uuid::new_v4().to_string();
    state.session = Some(Session {
        token: token.clone(),
        email: email.clone(),
    });
    log::info!("admin session opened for {}", email);
    ok(&req.id, json!({ "token": token, "email": email, "demo": false }))
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let token = req.params.get("token").and_then(|v| v.as_str());
    let matches = match (state.session.as_ref(), token) {
        (Some(session), Some(token)) => session.token == token,
        _ => false,
    };
    if matches {
        state.session = None;
    }
    ok(&req.id, json!({ "signedOut": matches }))
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    let token = req.params.get("token").and_then(|v| v.as_str());
    match (&state.session, token) {
        (Some(session), Some(token)) if session.token == token => ok(
            &req.id,
            json!({ "authenticated": true, "email": session.email }),
        ),
        _ => ok(&req.id, json!({ "authenticated": false })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.provision" => Some(handle_provision(state, req)),
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        _ => None,
    }
}
