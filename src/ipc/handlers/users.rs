use crate::ipc::error::{app_err, err, ok};
use crate::ipc::helpers::{optional_str, required_str, store_mut, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::model::{UserRole, UserView};
use crate::users::{self, NewUser, UserPatch};
use serde_json::json;

fn parse_role(req: &Request) -> Result<UserRole, serde_json::Value> {
    match req.params.get("role") {
        None | Some(serde_json::Value::Null) => Ok(UserRole::Teacher),
        Some(v) => serde_json::from_value(v.clone()).map_err(|_| {
            err(
                &req.id,
                "bad_params",
                "role must be one of: TEACHER, ADMIN, SUPER_ADMIN",
                Some(json!({ "role": v })),
            )
        }),
    }
}

fn handle_users_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match users::list_users(store) {
        Ok(list) => {
            let views: Vec<UserView> = list.iter().map(UserView::from).collect();
            ok(&req.id, json!({ "users": views }))
        }
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_users_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let role = match parse_role(req) {
        Ok(r) => r,
        Err(e) => return e,
    };
    let new_user = NewUser {
        username,
        name: optional_str(req, "name").unwrap_or_default(),
        password,
        role,
        email: optional_str(req, "email"),
        school_id: optional_str(req, "schoolId"),
    };

    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match users::create_user(store, new_user) {
        Ok(user) => ok(&req.id, json!({ "user": UserView::from(&user) })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_users_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch = req.params.get("patch").cloned().unwrap_or_else(|| json!({}));
    let field = |k: &str| patch.get(k).and_then(|v| v.as_str()).map(|s| s.to_string());
    let patch = UserPatch {
        name: field("name"),
        username: field("username"),
        password: field("password"),
    };

    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match users::update_user(store, &username, patch) {
        Ok(out) => ok(
            &req.id,
            json!({
                "user": UserView::from(&out.user),
                "classesUpdated": out.classes_updated,
            }),
        ),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_users_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match users::delete_user(store, &username) {
        Ok(unassigned) => ok(
            &req.id,
            json!({ "ok": true, "classesUnassigned": unassigned }),
        ),
        Err(e) => app_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.list" => Some(handle_users_list(state, req)),
        "users.create" => Some(handle_users_create(state, req)),
        "users.update" => Some(handle_users_update(state, req)),
        "users.delete" => Some(handle_users_delete(state, req)),
        _ => None,
    }
}
