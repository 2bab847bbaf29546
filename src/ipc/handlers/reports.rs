use crate::ipc::error::{app_err, ok};
use crate::ipc::helpers::{optional_str, required_str, required_term, store_mut, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::model::Term;
use crate::report;
use crate::settings;
use crate::summary;
use serde_json::json;

fn report_params(req: &Request) -> Result<(String, String, Term), serde_json::Value> {
    let student_id = required_str(req, "studentId")?;
    let year = required_str(req, "year")?;
    let term = required_term(req)?;
    Ok((student_id, year, term))
}

fn handle_reports_build(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (student_id, year, term) = match report_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match report::build_report_from_store(store, &student_id, &year, term) {
        Ok(r) => ok(&req.id, json!({ "report": r })),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_reports_class_ranking(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_name = match required_str(req, "className") {
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
    match report::class_ranking_from_store(store, &class_name, &year, term) {
        Ok(rows) => ok(
            &req.id,
            json!({ "className": class_name, "year": year, "term": term, "rows": rows }),
        ),
        Err(e) => app_err(&req.id, e),
    }
}

fn handle_reports_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (student_id, year, term) = match report_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let built = match report::build_report_from_store(store, &student_id, &year, term) {
        Ok(r) => r,
        Err(e) => return app_err(&req.id, e),
    };
    // Never fails: an unreachable generator degrades to a fixed sentence.
    let text = summary::summarize_report(state.summarizer.as_deref(), &built);
    ok(&req.id, json!({ "summary": text, "report": built }))
}

fn handle_decisions_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let year = match required_str(req, "year") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let decision = optional_str(req, "decision").unwrap_or_default();
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match settings::set_decision(store, &student_id, &year, &decision) {
        Ok(stored) => ok(&req.id, json!({ "decision": stored })),
        Err(e) => app_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.build" => Some(handle_reports_build(state, req)),
        "reports.classRanking" => Some(handle_reports_class_ranking(state, req)),
        "reports.summary" => Some(handle_reports_summary(state, req)),
        "decisions.set" => Some(handle_decisions_set(state, req)),
        _ => None,
    }
}
