use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::model::Term;
use crate::store::RecordStore;
use serde_json::{Map, Value};

pub fn required_str(req: &Request, key: &str) -> Result<String, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

pub fn required_object<'a>(req: &'a Request, key: &str) -> Result<&'a Map<String, Value>, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_object())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {} object", key), None))
}

pub fn required_term(req: &Request) -> Result<Term, Value> {
    let raw = required_str(req, "term")?;
    Term::parse(&raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "term must be one of: Term 1, Term 2, Term 3",
            Some(serde_json::json!({ "term": raw })),
        )
    })
}

pub fn store_ref<'a>(state: &'a AppState, req: &Request) -> Result<&'a dyn RecordStore, Value> {
    state
        .store
        .as_deref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn store_mut<'a>(state: &'a mut AppState, req: &Request) -> Result<&'a mut dyn RecordStore, Value> {
    match state.store.as_deref_mut() {
        Some(s) => Ok(s),
        None => Err(err(&req.id, "no_workspace", "select a workspace first", None)),
    }
}
