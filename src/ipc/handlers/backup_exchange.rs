use crate::backup;
use crate::ipc::error::{app_err, err, ok};
use crate::ipc::helpers::{required_str, store_mut, store_ref};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn required_path(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

fn handle_backup_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match backup::export_json(store) {
        Ok(text) => ok(&req.id, json!({ "text": text })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_backup_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let text = match required_str(req, "text") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match backup::import_json(store, &text) {
        Ok(summary) => ok(&req.id, json!({ "ok": true, "imported": summary })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_backup_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_path(req, "outPath") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };

    let out = PathBuf::from(&out_path);
    match backup::export_bundle(store, &out) {
        Ok(export) => ok(
            &req.id,
            json!({
                "ok": true,
                "path": out_path,
                "bundleFormat": export.bundle_format,
                "entryCount": export.entry_count,
                "sha256": export.sha256,
            }),
        ),
        Err(e) => err(
            &req.id,
            "io_failed",
            format!("{e:#}"),
            Some(json!({ "path": out_path })),
        ),
    }
}

fn handle_backup_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match required_path(req, "inPath") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match backup::import_bundle(store, &src) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "ok": true,
                "path": in_path,
                "imported": summary,
            }),
        ),
        Err(e) => app_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_backup_export(state, req)),
        "backup.import" => Some(handle_backup_import(state, req)),
        "backup.exportBundle" => Some(handle_backup_export_bundle(state, req)),
        "backup.importBundle" => Some(handle_backup_import_bundle(state, req)),
        _ => None,
    }
}
