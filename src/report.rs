use crate::config::{PromotionPolicy, Settings, MARKS_KEY, STUDENTS_KEY};
use crate::error::{AppError, Result};
use crate::model::{
    grade_for, is_conduct, subject_name, Decision, Mark, Student, Term, SUBJECTS,
};
use crate::query;
use crate::settings;
use crate::store::{load_list, RecordStore};
use serde::Serialize;

pub const PROMOTED: &str = "Promoted";
pub const REPEAT: &str = "Repeat";

/// Half-up rounding to one decimal: `floor(10x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMark {
    pub subject_id: String,
    pub subject_name: String,
    pub term: Term,
    pub score: i64,
    pub grade: &'static str,
    pub grade_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub subject_id: String,
    pub subject_name: String,
    pub average: f64,
    pub terms_counted: usize,
    pub grade: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualStats {
    pub total_score: i64,
    pub marks_counted: usize,
    /// One decimal place, e.g. `"72.5"`.
    pub average_score: String,
    pub decision: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStudent {
    pub student_id: String,
    pub name: String,
    pub total: i64,
    pub position: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub student: Student,
    pub year: String,
    pub term: Term,
    pub marks: Vec<ReportMark>,
    pub position: usize,
    pub total_students: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_stats: Option<AnnualStats>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subject_averages: Vec<SubjectAverage>,
}

/// Everything a report reads, already loaded from the store.
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    pub students: &'a [Student],
    pub marks: &'a [Mark],
    pub decisions: &'a [Decision],
    pub settings: &'a Settings,
}

fn non_conduct_total<'a, I>(marks: I) -> i64
where
    I: IntoIterator<Item = &'a Mark>,
{
    marks
        .into_iter()
        .filter(|m| !is_conduct(&m.subject_id))
        .map(|m| m.score)
        .sum()
}

/// Ranks every student of `class_name` by descending non-conduct total for
/// the term. Equal totals keep their order in the student collection.
pub fn class_ranking(students: &[Student], marks: &[Mark], class_name: &str, year: &str, term: Term) -> Vec<RankedStudent> {
    let mut totals: Vec<(&Student, i64)> = query::students_in_class(students, class_name)
        .into_iter()
        .map(|s| {
            let total = non_conduct_total(query::student_marks(marks, &s.id, year, term));
            (s, total)
        })
        .collect();
    // sort_by is stable, which is what makes the tie rule hold.
    totals.sort_by(|a, b| b.1.cmp(&a.1));
    totals
        .into_iter()
        .enumerate()
        .map(|(i, (s, total))| RankedStudent {
            student_id: s.id.clone(),
            name: s.name.clone(),
            total,
            position: i + 1,
        })
        .collect()
}

fn subject_order(subject_id: &str) -> usize {
    SUBJECTS
        .iter()
        .position(|s| s.id == subject_id)
        .unwrap_or(SUBJECTS.len())
}

fn annual_stats(year_marks: &[&Mark], student_id: &str, year: &str, inputs: &ReportInputs<'_>) -> AnnualStats {
    let counted: Vec<&Mark> = year_marks
        .iter()
        .copied()
        .filter(|m| !is_conduct(&m.subject_id))
        .collect();
    let total_score: i64 = counted.iter().map(|m| m.score).sum();
    let average = if counted.is_empty() {
        0.0
    } else {
        round_off_1_decimal(total_score as f64 / counted.len() as f64)
    };
    // Compared at the one-decimal precision that is printed.
    let decision = match inputs.settings.promotion_policy {
        PromotionPolicy::Automatic if counted.is_empty() => String::new(),
        PromotionPolicy::Automatic => {
            if average >= inputs.settings.pass_mark {
                PROMOTED.to_string()
            } else {
                REPEAT.to_string()
            }
        }
        PromotionPolicy::Manual => {
            settings::find_decision(inputs.decisions, student_id, year).unwrap_or_default()
        }
    };
    AnnualStats {
        total_score,
        marks_counted: counted.len(),
        average_score: format!("{:.1}", average),
        decision,
    }
}

fn subject_averages(year_marks: &[&Mark]) -> Vec<SubjectAverage> {
    let mut subject_ids: Vec<&str> = Vec::new();
    for m in year_marks {
        if !subject_ids.contains(&m.subject_id.as_str()) {
            subject_ids.push(&m.subject_id);
        }
    }
    subject_ids.sort_by_key(|id| subject_order(id));

    subject_ids
        .into_iter()
        .map(|sid| {
            let scores: Vec<i64> = year_marks
                .iter()
                .filter(|m| m.subject_id == sid)
                .map(|m| m.score)
                .collect();
            let avg = scores.iter().sum::<i64>() as f64 / scores.len() as f64;
            SubjectAverage {
                subject_id: sid.to_string(),
                subject_name: subject_name(sid).to_string(),
                average: round_off_1_decimal(avg),
                terms_counted: scores.len(),
                grade: grade_for(avg).grade,
            }
        })
        .collect()
}

pub fn build_report(inputs: &ReportInputs<'_>, student_id: &str, year: &str, term: Term) -> Result<Report> {
    let student = query::find_student(inputs.students, student_id)
        .ok_or_else(|| AppError::not_found("student"))?;

    let shown: Vec<&Mark> = if term.is_final() {
        Term::ALL
            .iter()
            .flat_map(|t| query::student_marks(inputs.marks, student_id, year, *t))
            .collect()
    } else {
        query::student_marks(inputs.marks, student_id, year, term)
    };

    let mut marks: Vec<ReportMark> = shown
        .iter()
        .map(|m| {
            let band = grade_for(m.score as f64);
            ReportMark {
                subject_id: m.subject_id.clone(),
                subject_name: subject_name(&m.subject_id).to_string(),
                term: m.term,
                score: m.score,
                grade: band.grade,
                grade_label: band.label,
            }
        })
        .collect();
    marks.sort_by_key(|m| (m.term, subject_order(&m.subject_id)));

    let ranking = class_ranking(inputs.students, inputs.marks, &student.class_name, year, term);
    let position = ranking
        .iter()
        .find(|r| r.student_id == student_id)
        .map(|r| r.position)
        .unwrap_or(ranking.len());

    let (annual, averages) = if term.is_final() {
        let year_marks = query::student_year_marks(inputs.marks, student_id, year);
        (
            Some(annual_stats(&year_marks, student_id, year, inputs)),
            subject_averages(&year_marks),
        )
    } else {
        (None, Vec::new())
    };

    Ok(Report {
        student: student.clone(),
        year: year.to_string(),
        term,
        marks,
        position,
        total_students: ranking.len(),
        annual_stats: annual,
        subject_averages: averages,
    })
}

pub fn build_report_from_store(store: &dyn RecordStore, student_id: &str, year: &str, term: Term) -> Result<Report> {
    let students: Vec<Student> = load_list(store, STUDENTS_KEY)?;
    let marks: Vec<Mark> = load_list(store, MARKS_KEY)?;
    let decisions = settings::list_decisions(store)?;
    let settings = settings::get_settings(store)?;
    build_report(
        &ReportInputs {
            students: &students,
            marks: &marks,
            decisions: &decisions,
            settings: &settings,
        },
        student_id,
        year,
        term,
    )
}

pub fn class_ranking_from_store(store: &dyn RecordStore, class_name: &str, year: &str, term: Term) -> Result<Vec<RankedStudent>> {
    let students: Vec<Student> = load_list(store, STUDENTS_KEY)?;
    let marks: Vec<Mark> = load_list(store, MARKS_KEY)?;
    Ok(class_ranking(&students, &marks, class_name, year, term))
}
