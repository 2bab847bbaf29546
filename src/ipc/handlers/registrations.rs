use crate::ipc::error::{app_err, err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::model::RegistrationStatus;
use crate::registration::{self, NewRegistration};
use serde_json::json;

fn no_workspace(req: &Request) -> serde_json::Value {
    err(&req.id, "no_workspace", "select a workspace first", None)
}

fn handle_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let new_reg: NewRegistration = match serde_json::from_value(req.params.clone()) {
        Ok(r) => r,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                format!("invalid registration: {}", e),
                None,
            )
        }
    };
    // Store and event bus are separate fields, so both can be borrowed at once.
    let AppState { store, events, .. } = state;
    let Some(store) = store.as_deref_mut() else {
        return no_workspace(req);
    };
    match registration::submit(store, events, new_reg) {
        Ok(reg) => ok(&req.id, json!({ "registration": reg })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_deref() else {
        return no_workspace(req);
    };
    match registration::current(store) {
        Ok(reg) => ok(&req.id, json!({ "registration": reg })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_deref() else {
        return no_workspace(req);
    };
    match registration::list(store) {
        Ok(regs) => ok(&req.id, json!({ "registrations": regs })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_review(state: &mut AppState, req: &Request, target: RegistrationStatus) -> serde_json::Value {
    let registration_id = match required_str(req, "registrationId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let AppState { store, events, .. } = state;
    let Some(store) = store.as_deref_mut() else {
        return no_workspace(req);
    };
    match registration::set_status(store, events, &registration_id, target) {
        Ok(t) => ok(
            &req.id,
            json!({ "registration": t.registration, "adminCreated": t.admin_created }),
        ),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_deref() else {
        return no_workspace(req);
    };
    match registration::stats(store) {
        Ok(s) => ok(&req.id, json!({ "stats": s })),
        Err(e) => app_err(&req.id, e),
    }
}

/// After this call, registration events are written to stdout as
/// `{"event":"registration","payload":...}` lines following each response.
fn handle_subscribe(state: &mut AppState, req: &Request) -> serde_json::Value {
    let already = state.event_feed.is_some();
    if !already {
        state.event_feed = Some(state.events.subscribe());
    }
    ok(&req.id, json!({ "subscribed": true, "alreadySubscribed": already }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "registrations.submit" => Some(handle_submit(state, req)),
        "registrations.current" => Some(handle_current(state, req)),
        "registrations.list" => Some(handle_list(state, req)),
        "registrations.approve" => Some(handle_review(state, req, RegistrationStatus::Approved)),
        "registrations.reject" => Some(handle_review(state, req, RegistrationStatus::Rejected)),
        "registrations.stats" => Some(handle_stats(state, req)),
        "registrations.subscribe" => Some(handle_subscribe(state, req)),
        _ => None,
    }
}
