use crate::config::{MARKS_BATCH_MAX_ENTRIES, MARKS_KEY, MAX_SCORE, MIN_SCORE};
use crate::ipc::error::{app_err, err, ok};
use crate::ipc::helpers::{required_str, required_term, store_mut, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::marks;
use crate::model::{find_subject, Mark, MarkEntry, ScoreChange, Term};
use crate::query;
use crate::store::load_list;
use serde_json::json;

struct EntryError {
    index: usize,
    message: String,
}

fn parse_change(obj: &serde_json::Map<String, serde_json::Value>) -> Result<ScoreChange, String> {
    if obj.get("clear").and_then(|v| v.as_bool()) == Some(true) {
        return Ok(ScoreChange::Clear);
    }
    match obj.get("score") {
        None => Err("missing score (use null or clear: true to remove)".into()),
        Some(serde_json::Value::Null) => Ok(ScoreChange::Clear),
        Some(v) => match v.as_i64() {
            Some(s) if (MIN_SCORE..=MAX_SCORE).contains(&s) => Ok(ScoreChange::Set(s)),
            Some(s) => Err(format!(
                "score {} out of range {}..={}",
                s, MIN_SCORE, MAX_SCORE
            )),
            None => Err("score must be an integer".into()),
        },
    }
}

fn parse_entry(index: usize, raw: &serde_json::Value) -> Result<MarkEntry, EntryError> {
    let fail = |message: String| EntryError { index, message };
    let Some(obj) = raw.as_object() else {
        return Err(fail("entry must be an object".into()));
    };
    let text = |k: &str| {
        obj.get(k)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let student_id = text("studentId").ok_or_else(|| fail("missing studentId".into()))?;
    let subject_id = text("subjectId").ok_or_else(|| fail("missing subjectId".into()))?;
    if find_subject(&subject_id).is_none() {
        return Err(fail(format!("unknown subjectId {}", subject_id)));
    }
    let year = text("year").ok_or_else(|| fail("missing year".into()))?;
    let term = text("term")
        .and_then(|t| Term::parse(&t))
        .ok_or_else(|| fail("term must be one of: Term 1, Term 2, Term 3".into()))?;
    let change = parse_change(obj).map_err(fail)?;

    Ok(MarkEntry {
        student_id,
        subject_id,
        year,
        term,
        change,
    })
}

fn handle_marks_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let year = match required_str(req, "year") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let term = match required_term(req) {
        Ok(t) => t,
        Err(e) => return e,
    };
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let all: Vec<Mark> = match load_list(store, MARKS_KEY) {
        Ok(v) => v,
        Err(e) => return app_err(&req.id, e.into()),
    };
    let rows = query::student_marks(&all, &student_id, &year, term);
    ok(&req.id, json!({ "marks": rows }))
}

fn handle_marks_save_batch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(entries_arr) = req.params.get("entries").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing entries[]", None);
    };

    if entries_arr.len() > MARKS_BATCH_MAX_ENTRIES {
        return err(
            &req.id,
            "bad_params",
            format!(
                "batch exceeds max entries: {} > {}",
                entries_arr.len(),
                MARKS_BATCH_MAX_ENTRIES
            ),
            Some(json!({ "maxEntries": MARKS_BATCH_MAX_ENTRIES })),
        );
    }

    let mut entries = Vec::with_capacity(entries_arr.len());
    let mut errors: Vec<serde_json::Value> = Vec::new();
    for (i, raw) in entries_arr.iter().enumerate() {
        match parse_entry(i, raw) {
            Ok(e) => entries.push(e),
            Err(e) => errors.push(json!({ "index": e.index, "message": e.message })),
        }
    }
    if !errors.is_empty() {
        // Nothing is written when any entry is invalid.
        return err(
            &req.id,
            "bad_params",
            format!("{} invalid entr(y/ies) in batch", errors.len()),
            Some(json!({ "rejected": errors.len(), "errors": errors })),
        );
    }

    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match marks::save_marks_batch(store, &entries) {
        Ok(summary) => {
            tracing::debug!(saved = summary.saved, cleared = summary.cleared, "marks batch saved");
            ok(
                &req.id,
                json!({ "ok": true, "saved": summary.saved, "cleared": summary.cleared }),
            )
        }
        Err(e) => app_err(&req.id, e.into()),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "marks.get" => Some(handle_marks_get(state, req)),
        "marks.saveBatch" => Some(handle_marks_save_batch(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_score_and_clear_flag_both_mean_clear() {
        let a = json!({ "studentId": "s1", "subjectId": "oral", "year": "2024", "term": "Term 1", "score": null });
        let b = json!({ "studentId": "s1", "subjectId": "oral", "year": "2024", "term": "Term 1", "clear": true, "score": 40 });
        assert_eq!(parse_entry(0, &a).ok().map(|e| e.change), Some(ScoreChange::Clear));
        assert_eq!(parse_entry(0, &b).ok().map(|e| e.change), Some(ScoreChange::Clear));
    }

    #[test]
    fn rejects_out_of_range_fractional_and_unknown_subject() {
        let base = |score: serde_json::Value, subject: &str| {
            json!({ "studentId": "s1", "subjectId": subject, "year": "2024", "term": "Term 2", "score": score })
        };
        assert!(parse_entry(0, &base(json!(101), "oral")).is_err());
        assert!(parse_entry(0, &base(json!(-1), "oral")).is_err());
        assert!(parse_entry(0, &base(json!(55.5), "oral")).is_err());
        assert!(parse_entry(0, &base(json!(55), "astronomy")).is_err());
        let ok_entry = parse_entry(3, &base(json!(100), "numeracy")).ok().expect("valid");
        assert_eq!(ok_entry.change, ScoreChange::Set(100));
        assert_eq!(ok_entry.term, Term::Second);
    }

    #[test]
    fn reports_entry_index_on_failure() {
        let bad = json!({ "studentId": "s1", "subjectId": "oral", "year": "2024", "term": "Term 4", "score": 10 });
        let e = parse_entry(7, &bad).err().expect("bad term");
        assert_eq!(e.index, 7);
        assert!(e.message.contains("term"));
    }
}
