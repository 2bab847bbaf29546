//! Lookups over deserialized collections. Absence is always an empty result.

use crate::model::{ClassRoom, Mark, Student, Term};

pub fn students_in_class<'a>(students: &'a [Student], class_name: &str) -> Vec<&'a Student> {
    students.iter().filter(|s| s.class_name == class_name).collect()
}

/// Marks for one student in one term, at most one per subject.
pub fn student_marks<'a>(marks: &'a [Mark], student_id: &str, year: &str, term: Term) -> Vec<&'a Mark> {
    marks
        .iter()
        .filter(|m| m.student_id == student_id && m.year == year && m.term == term)
        .collect()
}

pub fn student_year_marks<'a>(marks: &'a [Mark], student_id: &str, year: &str) -> Vec<&'a Mark> {
    marks
        .iter()
        .filter(|m| m.student_id == student_id && m.year == year)
        .collect()
}

pub fn teacher_classes<'a>(classes: &'a [ClassRoom], username: &str) -> Vec<&'a ClassRoom> {
    classes
        .iter()
        .filter(|c| c.teacher_username.as_deref() == Some(username))
        .collect()
}

pub fn find_student<'a>(students: &'a [Student], id: &str) -> Option<&'a Student> {
    students.iter().find(|s| s.id == id)
}

pub fn find_class<'a>(classes: &'a [ClassRoom], id: &str) -> Option<&'a ClassRoom> {
    classes.iter().find(|c| c.id == id)
}

pub fn sort_by_name(students: &mut [&Student]) {
    students.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
}
