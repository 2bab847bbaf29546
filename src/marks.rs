use crate::config::MARKS_KEY;
use crate::model::{Mark, MarkEntry, ScoreChange};
use crate::store::{load_list, save_list, RecordStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub saved: usize,
    pub cleared: usize,
}

/// Upsert-or-clear each entry against `marks`, keyed by
/// (student, subject, year, term). Scores are range-checked by the caller.
pub fn apply_batch(marks: &mut Vec<Mark>, entries: &[MarkEntry]) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for entry in entries {
        marks.retain(|m| m.key() != entry.key());
        match entry.change {
            ScoreChange::Set(score) => {
                marks.push(Mark {
                    student_id: entry.student_id.clone(),
                    subject_id: entry.subject_id.clone(),
                    year: entry.year.clone(),
                    term: entry.term,
                    score,
                });
                summary.saved += 1;
            }
            ScoreChange::Clear => summary.cleared += 1,
        }
    }
    summary
}

pub fn save_marks_batch(store: &mut dyn RecordStore, entries: &[MarkEntry]) -> anyhow::Result<BatchSummary> {
    let mut marks: Vec<Mark> = load_list(store, MARKS_KEY)?;
    let summary = apply_batch(&mut marks, entries);
    save_list(store, MARKS_KEY, &marks)?;
    Ok(summary)
}

/// Drops every mark of one student. Returns how many were removed.
pub fn remove_student_marks(marks: &mut Vec<Mark>, student_id: &str) -> usize {
    let before = marks.len();
    marks.retain(|m| m.student_id != student_id);
    before - marks.len()
}
