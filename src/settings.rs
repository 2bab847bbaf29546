//! School config (report-card header), daemon settings and manual
//! promotion decisions.

use crate::config::{
    Settings, CONFIG_KEY, DECISIONS_KEY, DEFAULT_SCHOOL_LOGO, SETTINGS_KEY, STUDENTS_KEY,
};
use crate::error::{AppError, Result};
use crate::model::{Decision, Student};
use crate::store::{load_list, load_value, save_list, save_value, RecordStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CONFIG_FIELDS: &[&str] = &[
    "logoUrl",
    "headmasterName",
    "district",
    "sector",
    "cell",
    "phone",
    "motto",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchoolConfig {
    pub logo_url: String,
    pub headmaster_name: String,
    pub district: String,
    pub sector: String,
    pub cell: String,
    pub phone: String,
    pub motto: String,
}

/// Stored config with blanks filled in; the logo falls back to the built-in one.
pub fn get_school_config(store: &dyn RecordStore) -> Result<SchoolConfig> {
    let raw: Map<String, Value> = load_value(store, CONFIG_KEY)?.unwrap_or_default();
    let mut cfg: SchoolConfig = serde_json::from_value(Value::Object(raw))?;
    if cfg.logo_url.trim().is_empty() {
        cfg.logo_url = DEFAULT_SCHOOL_LOGO.to_string();
    }
    Ok(cfg)
}

/// Every key must be a known config field holding a string.
pub fn check_config_fields(fields: &Map<String, Value>) -> std::result::Result<(), String> {
    for (k, v) in fields {
        if !CONFIG_FIELDS.contains(&k.as_str()) {
            return Err(format!("unknown config field {}", k));
        }
        if !v.is_string() {
            return Err(format!("{} must be a string", k));
        }
    }
    Ok(())
}

/// Merges `patch` into the stored config. Only known string fields are
/// accepted; the whole patch is rejected otherwise.
pub fn update_school_config(store: &mut dyn RecordStore, patch: &Map<String, Value>) -> Result<SchoolConfig> {
    check_config_fields(patch).map_err(AppError::Validation)?;
    let mut current: Map<String, Value> = load_value(store, CONFIG_KEY)?.unwrap_or_default();
    for (k, v) in patch {
        current.insert(k.clone(), v.clone());
    }
    save_value(store, CONFIG_KEY, &current)?;
    get_school_config(store)
}

pub fn get_settings(store: &dyn RecordStore) -> Result<Settings> {
    Ok(load_value(store, SETTINGS_KEY)?.unwrap_or_default())
}

pub fn update_settings(store: &mut dyn RecordStore, patch: &Map<String, Value>) -> Result<Settings> {
    let mut merged = serde_json::to_value(get_settings(store)?)?;
    if let Value::Object(obj) = &mut merged {
        for (k, v) in patch {
            obj.insert(k.clone(), v.clone());
        }
    }
    let settings: Settings = serde_json::from_value(merged)
        .map_err(|e| AppError::invalid(format!("invalid settings: {}", e)))?;
    settings.validate().map_err(AppError::Validation)?;
    save_value(store, SETTINGS_KEY, &settings)?;
    tracing::info!(policy = ?settings.promotion_policy, pass_mark = settings.pass_mark, "settings updated");
    Ok(settings)
}

pub fn list_decisions(store: &dyn RecordStore) -> Result<Vec<Decision>> {
    Ok(load_list(store, DECISIONS_KEY)?)
}

pub fn find_decision(decisions: &[Decision], student_id: &str, year: &str) -> Option<String> {
    decisions
        .iter()
        .find(|d| d.student_id == student_id && d.year == year)
        .map(|d| d.decision.clone())
}

/// Records a reviewer's promotion decision. A blank decision removes it.
pub fn set_decision(store: &mut dyn RecordStore, student_id: &str, year: &str, decision: &str) -> Result<Option<Decision>> {
    let students: Vec<Student> = load_list(store, STUDENTS_KEY)?;
    if !students.iter().any(|s| s.id == student_id) {
        return Err(AppError::not_found("student"));
    }
    let year = year.trim();
    if year.is_empty() {
        return Err(AppError::invalid("year must not be empty"));
    }

    let mut decisions: Vec<Decision> = load_list(store, DECISIONS_KEY)?;
    decisions.retain(|d| !(d.student_id == student_id && d.year == year));
    let decision = decision.trim();
    let stored = if decision.is_empty() {
        None
    } else {
        let d = Decision {
            student_id: student_id.to_string(),
            year: year.to_string(),
            decision: decision.to_string(),
        };
        decisions.push(d.clone());
        Some(d)
    };
    if decisions.is_empty() {
        store.delete(DECISIONS_KEY)?;
    } else {
        save_list(store, DECISIONS_KEY, &decisions)?;
    }
    Ok(stored)
}
