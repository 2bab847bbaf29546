//! Optional report-card summary paragraph from an external text generator.
//!
//! The generator is a black box: any failure becomes a fixed placeholder
//! string, never an error for the caller.

use crate::config::{
    DEFAULT_SUMMARY_TIMEOUT_SECS, SUMMARY_API_KEY_ENV, SUMMARY_EMPTY, SUMMARY_FAILED,
    SUMMARY_TIMEOUT_ENV, SUMMARY_UNAVAILABLE, SUMMARY_URL_ENV,
};
use crate::report::Report;
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub trait SummaryGenerator {
    fn summarize(&self, prompt: &str) -> anyhow::Result<String>;
}

#[derive(Serialize)]
struct SummaryRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

/// POSTs `{"prompt": ...}` to a configured endpoint and reads `text` (or
/// `summary`) from the JSON reply.
pub struct HttpSummaryGenerator {
    client: reqwest::blocking::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpSummaryGenerator {
    pub fn new(url: String, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("nurseryd/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self {
            client,
            url,
            api_key,
        })
    }

    /// `None` when no endpoint is configured.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(SUMMARY_URL_ENV)
            .ok()
            .filter(|u| !u.trim().is_empty())?;
        let api_key = std::env::var(SUMMARY_API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty());
        let timeout = std::env::var(SUMMARY_TIMEOUT_ENV)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SUMMARY_TIMEOUT_SECS);
        match Self::new(url, api_key, Duration::from_secs(timeout)) {
            Ok(g) => Some(g),
            Err(e) => {
                tracing::warn!("summary generator disabled: {:#}", e);
                None
            }
        }
    }
}

impl SummaryGenerator for HttpSummaryGenerator {
    fn summarize(&self, prompt: &str) -> anyhow::Result<String> {
        let mut req = self.client.post(&self.url).json(&SummaryRequest { prompt });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().context("summary request failed")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("summary endpoint returned {}", status));
        }
        let body: SummaryResponse = resp.json().context("summary response is not JSON")?;
        Ok(body.text.or(body.summary).unwrap_or_default())
    }
}

pub fn build_prompt(report: &Report) -> String {
    let performance = report
        .marks
        .iter()
        .map(|m| format!("{} ({}): {}", m.subject_name, m.term, m.score))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Write a short, warm nursery school term summary for {} for {}. Performance: {}. Tone: Encouraging and professional.",
        report.student.name, report.term, performance
    )
}

pub fn summarize_report(generator: Option<&dyn SummaryGenerator>, report: &Report) -> String {
    let Some(generator) = generator else {
        return SUMMARY_UNAVAILABLE.to_string();
    };
    match generator.summarize(&build_prompt(report)) {
        Ok(text) if text.trim().is_empty() => SUMMARY_EMPTY.to_string(),
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            tracing::warn!(student_id = %report.student.id, "summary generation failed: {:#}", e);
            SUMMARY_FAILED.to_string()
        }
    }
}
