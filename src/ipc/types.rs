use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use super::handlers::settings::AnnouncementSettings;
use crate::gate::ReleaseGate;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct Session {
    pub token: String,
    pub email: String,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    /// Explicit offline/no-store mode; the only way to run without a
    /// workspace. Never implied by credentials.
    pub demo: bool,
    /// In-memory settings for demo mode only; with a store the settings
    /// document lives in the database.
    pub demo_settings: Option<AnnouncementSettings>,
    pub session: Option<Session>,
    pub gate: Option<ReleaseGate>,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            workspace: None,
            db: None,
            demo: false,
            demo_settings: None,
            session: None,
            gate: None,
        }
    }
}
