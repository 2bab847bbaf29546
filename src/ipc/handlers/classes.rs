use crate::classes;
use crate::config::STUDENTS_KEY;
use crate::ipc::error::{app_err, ok};
use crate::ipc::helpers::{optional_str, required_str, store_mut, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::model::Student;
use crate::query;
use crate::store::load_list;
use serde_json::json;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };

    let mut list = match classes::list_classes(store) {
        Ok(v) => v,
        Err(e) => return app_err(&req.id, e),
    };
    let students: Vec<Student> = match load_list(store, STUDENTS_KEY) {
        Ok(v) => v,
        Err(e) => return app_err(&req.id, e.into()),
    };
    list.sort_by(|a, b| a.name.cmp(&b.name));

    // Include student counts so the UI can show a useful dashboard.
    let rows: Vec<serde_json::Value> = list
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "teacherUsername": c.teacher_username,
                "studentCount": query::students_in_class(&students, &c.name).len(),
            })
        })
        .collect();
    ok(&req.id, json!({ "classes": rows }))
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let streams = optional_str(req, "streams").unwrap_or_default();
    let teacher = optional_str(req, "teacherUsername");

    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match classes::create_classes(store, &name, &streams, teacher.as_deref()) {
        Ok(out) => ok(
            &req.id,
            json!({ "created": out.created, "skipped": out.skipped }),
        ),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_classes_rename(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match classes::rename_class(store, &class_id, &name) {
        Ok(moved) => ok(&req.id, json!({ "ok": true, "studentsUpdated": moved })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_classes_assign_teacher(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let teacher = optional_str(req, "teacherUsername");
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match classes::assign_teacher(store, &class_id, teacher.as_deref()) {
        Ok(class) => ok(&req.id, json!({ "class": class })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match classes::delete_class(store, &class_id) {
        Ok(dangling) => {
            let mut result = json!({ "ok": true, "danglingStudents": dangling });
            if dangling > 0 {
                result["warning"] = json!(format!(
                    "{} student(s) still reference the deleted class",
                    dangling
                ));
            }
            ok(&req.id, result)
        }
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_classes_for_teacher(state: &mut AppState, req: &Request) -> serde_json::Value {
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match classes::list_classes(store) {
        Ok(all) => {
            let mine = query::teacher_classes(&all, &username);
            ok(&req.id, json!({ "classes": mine }))
        }
        Err(e) => app_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.rename" => Some(handle_classes_rename(state, req)),
        "classes.assignTeacher" => Some(handle_classes_assign_teacher(state, req)),
        "classes.delete" => Some(handle_classes_delete(state, req)),
        "classes.forTeacher" => Some(handle_classes_for_teacher(state, req)),
        _ => None,
    }
}
