use crate::ipc::error::{app_err, ok};
use crate::ipc::helpers::{optional_str, required_str, store_mut, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::query;
use crate::students::{self, StudentPatch};
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_name = optional_str(req, "className");
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let all = match students::list_students(store) {
        Ok(v) => v,
        Err(e) => return app_err(&req.id, e),
    };

    let mut rows: Vec<_> = match class_name.as_deref() {
        Some(c) => query::students_in_class(&all, c),
        None => all.iter().collect(),
    };
    query::sort_by_name(&mut rows);
    ok(&req.id, json!({ "students": rows }))
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let photo_url = optional_str(req, "photoUrl");

    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match students::create_student(store, &name, &class_id, photo_url) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let raw = req.params.get("patch").cloned().unwrap_or_else(|| json!({}));
    let field = |k: &str| raw.get(k).and_then(|v| v.as_str()).map(|s| s.to_string());
    let patch = StudentPatch {
        name: field("name"),
        class_id: field("classId"),
        photo_url: field("photoUrl"),
    };

    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match students::update_student(store, &student_id, patch) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match students::delete_student(store, &student_id) {
        Ok(removed) => ok(&req.id, json!({ "ok": true, "marksRemoved": removed })),
        Err(e) => app_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
