use crate::ipc::error::{app_err, err, ok};
use crate::ipc::helpers::{required_object, required_str, store_mut, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::settings;
use serde_json::{json, Map, Value};

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match settings::get_school_config(store) {
        Ok(cfg) => ok(&req.id, json!({ "config": cfg })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_config_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let patch = match required_object(req, "patch") {
        Ok(p) => p.clone(),
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match settings::update_school_config(store, &patch) {
        Ok(cfg) => ok(&req.id, json!({ "config": cfg })),
        Err(e) => app_err(&req.id, e),
    }
}

/// Replaces the report-card logo. An empty value restores the built-in logo.
fn handle_config_set_logo(state: &mut AppState, req: &Request) -> serde_json::Value {
    let logo = match required_str(req, "logoUrl") {
        Ok(v) => v.trim().to_string(),
        Err(e) => return e,
    };
    if !logo.is_empty() && !logo.starts_with("data:image/") {
        return err(
            &req.id,
            "bad_params",
            "logoUrl must be a data:image/... URI",
            None,
        );
    }
    let mut patch = Map::new();
    patch.insert("logoUrl".into(), Value::String(logo));

    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match settings::update_school_config(store, &patch) {
        Ok(cfg) => ok(&req.id, json!({ "logoUrl": cfg.logo_url })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match settings::get_settings(store) {
        Ok(s) => ok(&req.id, json!({ "settings": s })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let patch = match required_object(req, "patch") {
        Ok(p) => p.clone(),
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match settings::update_settings(store, &patch) {
        Ok(s) => ok(&req.id, json!({ "settings": s })),
        Err(e) => app_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "config.get" => Some(handle_config_get(state, req)),
        "config.update" => Some(handle_config_update(state, req)),
        "config.setLogo" => Some(handle_config_set_logo(state, req)),
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        _ => None,
    }
}
