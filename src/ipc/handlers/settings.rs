use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db;
use crate::gate::ReleaseGate;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

pub const SETTINGS_KEY: &str = "announcement.settings";

fn default_popup_enabled() -> bool {
    true
}

fn default_popup_text() -> String {
    "Use a valid NISN or exam number to check your graduation status.".to_string()
}

fn default_popup_duration() -> u32 {
    10
}

/// The process-wide singleton announcement configuration. Saved wholesale;
/// last write wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementSettings {
    pub release_date: String,
    pub school_year: String,
    pub headmaster: String,
    pub headmaster_nip: String,
    #[serde(default = "default_popup_enabled")]
    pub popup_enabled: bool,
    #[serde(default = "default_popup_text")]
    pub popup_text: String,
    #[serde(default = "default_popup_duration")]
    pub popup_duration: u32,
}

impl AnnouncementSettings {
    /// First-run defaults: release one hour out, popup on for ten seconds.
    pub fn with_defaults(now: DateTime<Utc>) -> Self {
        AnnouncementSettings {
            release_date: (now + chrono::Duration::hours(1)).to_rfc3339(),
            school_year: "2025/2026".to_string(),
            headmaster: String::new(),
            headmaster_nip: String::new(),
            popup_enabled: default_popup_enabled(),
            popup_text: default_popup_text(),
            popup_duration: default_popup_duration(),
        }
    }

    pub fn release_date_parsed(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.release_date)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }
}

/// Reads the singleton, lazily persisting the defaults on first read so a
/// second read returns the same stored document.
pub fn load_settings(conn: &rusqlite::Connection) -> anyhow::Result<AnnouncementSettings> {
    if let Some(saved) = db::settings_get_json(conn, SETTINGS_KEY)? {
        if let Ok(settings) = serde_json::from_value::<AnnouncementSettings>(saved) {
            return Ok(settings);
        }
        // A malformed historical document is replaced by defaults rather
        // than wedging the portal.
        log::warn!("stored announcement settings were malformed; resetting to defaults");
    }
    let defaults = AnnouncementSettings::with_defaults(Utc::now());
    db::settings_set_json(conn, SETTINGS_KEY, &serde_json::to_value(&defaults)?)?;
    Ok(defaults)
}

/// The settings currently in force, wherever they live.
pub fn current_settings(state: &mut AppState) -> anyhow::Result<Option<AnnouncementSettings>> {
    if state.demo {
        let settings = state
            .demo_settings
            .get_or_insert_with(|| AnnouncementSettings::with_defaults(Utc::now()));
        return Ok(Some(settings.clone()));
    }
    match state.db.as_ref() {
        Some(conn) => Ok(Some(load_settings(conn)?)),
        None => Ok(None),
    }
}

/// Rebuilds the daemon's gate machine from a (possibly new) release date.
pub fn rebuild_gate(state: &mut AppState, settings: &AnnouncementSettings, now: DateTime<Utc>) {
    if let Some(release) = settings.release_date_parsed() {
        state.gate = Some(ReleaseGate::new(release, now));
    } else {
        state.gate = None;
    }
}

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    match current_settings(state) {
        Ok(Some(settings)) => match serde_json::to_value(&settings) {
            Ok(v) => ok(&req.id, json!({ "settings": v })),
            Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
        },
        Ok(None) => err(&req.id, "no_workspace", "select a workspace first", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = super::auth::require_session(state, req) {
        return resp;
    }
    let Some(raw) = req.params.get("settings") else {
        return err(&req.id, "bad_params", "missing params.settings", None);
    };
    let settings: AnnouncementSettings = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                format!("invalid settings object: {}", e),
                None,
            )
        }
    };
    if settings.release_date_parsed().is_none() {
        return err(
            &req.id,
            "bad_params",
            "releaseDate must be an RFC 3339 timestamp",
            None,
        );
    }

    if state.demo {
        state.demo_settings = Some(settings.clone());
    } else {
        let Some(conn) = state.db.as_ref() else {
            return err(&req.id, "no_workspace", "select a workspace first", None);
        };
        let value = match serde_json::to_value(&settings) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_update_failed", e.to_string(), None),
        };
        if let Err(e) = db::settings_set_json(conn, SETTINGS_KEY, &value) {
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
    }

    // A new release date means a fresh countdown derivation.
    rebuild_gate(state, &settings, Utc::now());
    log::info!("announcement settings saved; release at {}", settings.release_date);
    ok(&req.id, json!({ "saved": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        _ => None,
    }
}
