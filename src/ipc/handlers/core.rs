use crate::db;
use crate::ipc::error::{app_err, err, ok};
use crate::ipc::helpers::{required_str, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::model::{Term, UserView, SUBJECTS};
use crate::store::{seed_defaults, MemoryStore, RecordStore};
use crate::users;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "storeOpen": state.store.is_some(),
            "summaryConfigured": state.summarizer.is_some(),
            "eventSubscribers": state.events.subscriber_count(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ephemeral = req
        .params
        .get("ephemeral")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let path = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);

    let (mut store, workspace): (Box<dyn RecordStore>, Option<PathBuf>) = match (path, ephemeral) {
        (_, true) => (Box::new(MemoryStore::new()) as Box<dyn RecordStore>, None),
        (Some(p), false) => match db::open_db(&p) {
            Ok(s) => (Box::new(s) as Box<dyn RecordStore>, Some(p)),
            Err(e) => return err(&req.id, "db_open_failed", format!("{e:#}"), None),
        },
        (None, false) => {
            return err(&req.id, "bad_params", "missing params.path", None);
        }
    };

    let seeded = match seed_defaults(store.as_mut()) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "store_failed", format!("{e:#}"), None),
    };
    tracing::info!(
        workspace = ?workspace,
        users_seeded = seeded.users_seeded,
        classes_seeded = seeded.classes_seeded,
        "workspace opened"
    );

    state.store = Some(store);
    state.workspace = workspace.clone();
    ok(
        &req.id,
        json!({
            "workspacePath": workspace.map(|p| p.to_string_lossy().to_string()),
            "ephemeral": ephemeral,
            "seeded": {
                "users": seeded.users_seeded,
                "classes": seeded.classes_seeded,
            }
        }),
    )
}

fn handle_catalog(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let terms: Vec<&str> = Term::ALL.iter().map(|t| t.as_str()).collect();
    ok(&req.id, json!({ "subjects": SUBJECTS, "terms": terms }))
}

fn handle_auth_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match users::authenticate(store, &username, &password) {
        Ok(Some(user)) => ok(&req.id, json!({ "user": UserView::from(&user) })),
        Ok(None) => app_err(&req.id, crate::error::AppError::InvalidCredentials),
        Err(e) => app_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "catalog.get" => Some(handle_catalog(state, req)),
        "auth.login" => Some(handle_auth_login(state, req)),
        _ => None,
    }
}
