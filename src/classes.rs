use crate::config::{CLASSES_KEY, STUDENTS_KEY, USERS_KEY};
use crate::error::{AppError, Result};
use crate::model::{slugify, ClassRoom, Student, User};
use crate::store::{encode_list, load_list, save_list, RecordStore};

#[derive(Debug, Clone, Default)]
pub struct CreateClassesOutcome {
    pub created: Vec<ClassRoom>,
    /// Names skipped because a class with that name (or id) already exists.
    pub skipped: Vec<String>,
}

pub fn list_classes(store: &dyn RecordStore) -> Result<Vec<ClassRoom>> {
    Ok(load_list(store, CLASSES_KEY)?)
}

/// `streams` is the raw comma list; `"A, B"` on base `"Nursery 1"` creates
/// `"Nursery 1 A"` and `"Nursery 1 B"`. An empty list creates the base class.
pub fn create_classes(
    store: &mut dyn RecordStore,
    base_name: &str,
    streams: &str,
    teacher_username: Option<&str>,
) -> Result<CreateClassesOutcome> {
    let base_name = base_name.trim();
    if base_name.is_empty() {
        return Err(AppError::invalid("name must not be empty"));
    }
    let teacher = teacher_username.map(str::trim).filter(|t| !t.is_empty());
    if let Some(t) = teacher {
        ensure_user_exists(store, t)?;
    }

    let names: Vec<String> = {
        let streams: Vec<&str> = streams
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if streams.is_empty() {
            vec![base_name.to_string()]
        } else {
            streams
                .iter()
                .map(|s| format!("{} {}", base_name, s))
                .collect()
        }
    };

    let mut classes: Vec<ClassRoom> = load_list(store, CLASSES_KEY)?;
    let mut outcome = CreateClassesOutcome::default();
    for name in names {
        let id = slugify(&name);
        if id.is_empty() {
            return Err(AppError::invalid(format!(
                "class name {:?} has no letters or digits",
                name
            )));
        }
        if classes.iter().any(|c| c.name == name || c.id == id) {
            outcome.skipped.push(name);
            continue;
        }
        let class = ClassRoom {
            id,
            name,
            teacher_username: teacher.map(|t| t.to_string()),
        };
        classes.push(class.clone());
        outcome.created.push(class);
    }

    if !outcome.created.is_empty() {
        save_list(store, CLASSES_KEY, &classes)?;
    }
    tracing::info!(
        created = outcome.created.len(),
        skipped = outcome.skipped.len(),
        "classes created"
    );
    Ok(outcome)
}

/// Renames a class and moves every student carrying the old name. Returns the
/// number of students moved.
pub fn rename_class(store: &mut dyn RecordStore, class_id: &str, new_name: &str) -> Result<usize> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(AppError::invalid("name must not be empty"));
    }
    let mut classes: Vec<ClassRoom> = load_list(store, CLASSES_KEY)?;
    if classes.iter().any(|c| c.id != class_id && c.name == new_name) {
        return Err(AppError::Duplicate(format!("class {}", new_name)));
    }
    let class = classes
        .iter_mut()
        .find(|c| c.id == class_id)
        .ok_or_else(|| AppError::not_found("class"))?;
    let old_name = std::mem::replace(&mut class.name, new_name.to_string());
    if old_name == new_name {
        return Ok(0);
    }

    let mut students: Vec<Student> = load_list(store, STUDENTS_KEY)?;
    let mut moved = 0;
    for s in students.iter_mut() {
        if s.class_name == old_name {
            s.class_name = new_name.to_string();
            moved += 1;
        }
    }
    // Class and students move together or not at all.
    store.set_many(&[
        (CLASSES_KEY, encode_list(CLASSES_KEY, &classes)?),
        (STUDENTS_KEY, encode_list(STUDENTS_KEY, &students)?),
    ])?;
    tracing::info!(class_id, from = %old_name, to = new_name, moved, "class renamed");
    Ok(moved)
}

/// `None` (or a blank name) unassigns.
pub fn assign_teacher(store: &mut dyn RecordStore, class_id: &str, teacher_username: Option<&str>) -> Result<ClassRoom> {
    let teacher = teacher_username.map(str::trim).filter(|t| !t.is_empty());
    if let Some(t) = teacher {
        ensure_user_exists(store, t)?;
    }
    let mut classes: Vec<ClassRoom> = load_list(store, CLASSES_KEY)?;
    let class = classes
        .iter_mut()
        .find(|c| c.id == class_id)
        .ok_or_else(|| AppError::not_found("class"))?;
    class.teacher_username = teacher.map(|t| t.to_string());
    let updated = class.clone();
    save_list(store, CLASSES_KEY, &classes)?;
    Ok(updated)
}

/// Deletes the class only. Students keep the now-dangling class name; the
/// count of such students is returned so the caller can warn about them.
pub fn delete_class(store: &mut dyn RecordStore, class_id: &str) -> Result<usize> {
    let mut classes: Vec<ClassRoom> = load_list(store, CLASSES_KEY)?;
    let Some(pos) = classes.iter().position(|c| c.id == class_id) else {
        return Err(AppError::not_found("class"));
    };
    let removed = classes.remove(pos);
    save_list(store, CLASSES_KEY, &classes)?;

    let students: Vec<Student> = load_list(store, STUDENTS_KEY)?;
    let dangling = students
        .iter()
        .filter(|s| s.class_name == removed.name)
        .count();
    if dangling > 0 {
        tracing::warn!(class = %removed.name, dangling, "class deleted with students still in it");
    }
    Ok(dangling)
}

fn ensure_user_exists(store: &dyn RecordStore, username: &str) -> Result<()> {
    let users: Vec<User> = load_list(store, USERS_KEY)?;
    if users.iter().any(|u| u.username == username) {
        Ok(())
    } else {
        Err(AppError::not_found(format!("user {}", username)))
    }
}
