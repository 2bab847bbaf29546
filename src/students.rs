use crate::config::{CLASSES_KEY, MARKS_KEY, STUDENTS_KEY};
use crate::error::{AppError, Result};
use crate::marks;
use crate::model::{ClassRoom, Mark, Student};
use crate::query;
use crate::store::{encode_list, load_list, save_list, RecordStore};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    /// Resolved to the class name at write time.
    pub class_id: Option<String>,
    /// `Some("")` removes the photo.
    pub photo_url: Option<String>,
}

pub fn list_students(store: &dyn RecordStore) -> Result<Vec<Student>> {
    Ok(load_list(store, STUDENTS_KEY)?)
}

pub fn create_student(
    store: &mut dyn RecordStore,
    name: &str,
    class_id: &str,
    photo_url: Option<String>,
) -> Result<Student> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::invalid("name must not be empty"));
    }
    let class_name = resolve_class_name(store, class_id)?;

    let mut students: Vec<Student> = load_list(store, STUDENTS_KEY)?;
    let student = Student {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        class_name,
        photo_url: photo_url.filter(|p| !p.trim().is_empty()),
    };
    students.push(student.clone());
    save_list(store, STUDENTS_KEY, &students)?;
    tracing::info!(student_id = %student.id, class = %student.class_name, "student created");
    Ok(student)
}

pub fn update_student(store: &mut dyn RecordStore, student_id: &str, patch: StudentPatch) -> Result<Student> {
    let class_name = match patch.class_id.as_deref() {
        Some(cid) => Some(resolve_class_name(store, cid)?),
        None => None,
    };
    let new_name = match patch.name.as_deref().map(str::trim) {
        Some("") => return Err(AppError::invalid("name must not be empty")),
        Some(n) => Some(n.to_string()),
        None => None,
    };

    let mut students: Vec<Student> = load_list(store, STUDENTS_KEY)?;
    let student = students
        .iter_mut()
        .find(|s| s.id == student_id)
        .ok_or_else(|| AppError::not_found("student"))?;
    if let Some(n) = new_name {
        student.name = n;
    }
    if let Some(c) = class_name {
        student.class_name = c;
    }
    if let Some(p) = patch.photo_url {
        student.photo_url = if p.trim().is_empty() { None } else { Some(p) };
    }
    let updated = student.clone();
    save_list(store, STUDENTS_KEY, &students)?;
    Ok(updated)
}

/// Deletes the student and all of its marks. Returns the number of marks
/// removed.
pub fn delete_student(store: &mut dyn RecordStore, student_id: &str) -> Result<usize> {
    let mut students: Vec<Student> = load_list(store, STUDENTS_KEY)?;
    let before = students.len();
    students.retain(|s| s.id != student_id);
    if students.len() == before {
        return Err(AppError::not_found("student"));
    }
    let mut all_marks: Vec<Mark> = load_list(store, MARKS_KEY)?;
    let marks_removed = marks::remove_student_marks(&mut all_marks, student_id);
    store.set_many(&[
        (STUDENTS_KEY, encode_list(STUDENTS_KEY, &students)?),
        (MARKS_KEY, encode_list(MARKS_KEY, &all_marks)?),
    ])?;
    tracing::info!(student_id, marks_removed, "student deleted");
    Ok(marks_removed)
}

fn resolve_class_name(store: &dyn RecordStore, class_id: &str) -> Result<String> {
    let classes: Vec<ClassRoom> = load_list(store, CLASSES_KEY)?;
    query::find_class(&classes, class_id)
        .map(|c| c.name.clone())
        .ok_or_else(|| AppError::not_found("class"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::create_classes;
    use crate::model::{MarkEntry, ScoreChange, Term};
    use crate::store::testing::BatchOnlyStore;
    use crate::store::MemoryStore;

    #[test]
    fn create_resolves_class_by_id() {
        let mut store = MemoryStore::new();
        create_classes(&mut store, "Nursery 2", "", None).expect("class");
        let s = create_student(&mut store, " Divine Teta ", "nursery-2", None).expect("create");
        assert_eq!(s.name, "Divine Teta");
        assert_eq!(s.class_name, "Nursery 2");

        let err = create_student(&mut store, "X", "no-such-class", None).expect_err("missing");
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn update_moves_class_and_clears_photo() {
        let mut store = MemoryStore::new();
        create_classes(&mut store, "Nursery", "1, 2", None).expect("class");
        let s = create_student(&mut store, "Eric", "nursery-1", Some("data:x".into())).expect("create");
        let updated = update_student(
            &mut store,
            &s.id,
            StudentPatch {
                class_id: Some("nursery-2".into()),
                photo_url: Some(String::new()),
                ..Default::default()
            },
        )
        .expect("update");
        assert_eq!(updated.name, "Eric");
        assert_eq!(updated.class_name, "Nursery 2");
        assert_eq!(updated.photo_url, None);
    }

    #[test]
    fn delete_cascades_to_own_marks_only() {
        let mut store = MemoryStore::new();
        create_classes(&mut store, "Nursery 3", "", None).expect("class");
        let a = create_student(&mut store, "A", "nursery-3", None).expect("a");
        let b = create_student(&mut store, "B", "nursery-3", None).expect("b");
        let entries: Vec<MarkEntry> = [&a.id, &b.id]
            .iter()
            .flat_map(|sid| {
                ["numeracy", "oral"].into_iter().map(move |subject| MarkEntry {
                    student_id: sid.to_string(),
                    subject_id: subject.into(),
                    year: "2024-2025".into(),
                    term: Term::First,
                    change: ScoreChange::Set(60),
                })
            })
            .collect();
        marks::save_marks_batch(&mut store, &entries).expect("marks");

        assert_eq!(delete_student(&mut store, &a.id).expect("delete"), 2);
        let left: Vec<Mark> = load_list(&store, MARKS_KEY).expect("marks");
        assert_eq!(left.len(), 2);
        assert!(left.iter().all(|m| m.student_id == b.id));
    }

    #[test]
    fn delete_removes_student_and_marks_in_one_batch() {
        let mut store = BatchOnlyStore::default();
        create_classes(&mut store.inner, "Nursery 1", "", None).expect("class");
        let kid = create_student(&mut store.inner, "Keza", "nursery-1", None).expect("student");
        marks::save_marks_batch(
            &mut store.inner,
            &[MarkEntry {
                student_id: kid.id.clone(),
                subject_id: "oral".into(),
                year: "2024-2025".into(),
                term: Term::Second,
                change: ScoreChange::Set(88),
            }],
        )
        .expect("marks");

        assert_eq!(delete_student(&mut store, &kid.id).expect("delete"), 1);
        assert_eq!(store.batches, 1);
        assert!(list_students(&store).expect("students").is_empty());
        let left: Vec<Mark> = load_list(&store, MARKS_KEY).expect("marks");
        assert!(left.is_empty());
    }
}
