use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Teacher,
    Admin,
    SuperAdmin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub name: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
}

/// What the front end gets to see of a user: everything but the password.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub username: String,
    pub name: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            username: u.username.clone(),
            name: u.name.clone(),
            role: u.role,
            email: u.email.clone(),
            school_id: u.school_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRoom {
    pub id: String,
    pub name: String,
    /// Weak reference to `User::username`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    /// Weak reference to `ClassRoom::name` (not the class id).
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    #[serde(rename = "Term 1")]
    First,
    #[serde(rename = "Term 2")]
    Second,
    #[serde(rename = "Term 3")]
    Third,
}

impl Term {
    pub const ALL: [Term; 3] = [Term::First, Term::Second, Term::Third];

    pub fn as_str(self) -> &'static str {
        match self {
            Term::First => "Term 1",
            Term::Second => "Term 2",
            Term::Third => "Term 3",
        }
    }

    pub fn parse(raw: &str) -> Option<Term> {
        Term::ALL.into_iter().find(|t| t.as_str() == raw.trim())
    }

    /// The term where annual aggregation happens.
    pub fn is_final(self) -> bool {
        self == Term::Third
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    pub student_id: String,
    pub subject_id: String,
    pub year: String,
    pub term: Term,
    pub score: i64,
}

impl Mark {
    pub fn key(&self) -> MarkKey<'_> {
        MarkKey {
            student_id: &self.student_id,
            subject_id: &self.subject_id,
            year: &self.year,
            term: self.term,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkKey<'a> {
    pub student_id: &'a str,
    pub subject_id: &'a str,
    pub year: &'a str,
    pub term: Term,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreChange {
    Set(i64),
    Clear,
}

/// One row of a mark-entry batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkEntry {
    pub student_id: String,
    pub subject_id: String,
    pub year: String,
    pub term: Term,
    pub change: ScoreChange,
}

impl MarkEntry {
    pub fn key(&self) -> MarkKey<'_> {
        MarkKey {
            student_id: &self.student_id,
            subject_id: &self.subject_id,
            year: &self.year,
            term: self.term,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub id: &'static str,
    pub name: &'static str,
}

pub const CONDUCT_SUBJECT_ID: &str = "conduct";
pub const UNKNOWN_SUBJECT_NAME: &str = "UNKNOWN SUBJECT";

pub const SUBJECTS: &[Subject] = &[
    Subject { id: "numeracy", name: "NUMERACY" },
    Subject { id: "literacy", name: "LITERACY" },
    Subject { id: "discovery_world", name: "DISCOVERY OF THE WORLD" },
    Subject { id: "creative_arts", name: "CREATIVE ARTS AND CRAFT" },
    Subject { id: "health_pe", name: "HEALTH AND PHYSICAL EDUCATION" },
    Subject { id: "oral", name: "ORAL" },
    Subject { id: "social_emotional", name: "SOCIAL AND EMOTIONALLY DEVELOPMENT" },
    Subject { id: CONDUCT_SUBJECT_ID, name: "CONDUCT" },
];

pub fn find_subject(id: &str) -> Option<&'static Subject> {
    SUBJECTS.iter().find(|s| s.id == id)
}

pub fn subject_name(id: &str) -> &'static str {
    find_subject(id).map(|s| s.name).unwrap_or(UNKNOWN_SUBJECT_NAME)
}

pub fn is_conduct(subject_id: &str) -> bool {
    subject_id == CONDUCT_SUBJECT_ID
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeBand {
    pub grade: &'static str,
    pub label: &'static str,
}

pub fn grade_for(score: f64) -> GradeBand {
    if score >= 90.0 {
        GradeBand { grade: "A", label: "Excellent" }
    } else if score >= 70.0 {
        GradeBand { grade: "B", label: "Very Good" }
    } else if score >= 50.0 {
        GradeBand { grade: "C", label: "Good" }
    } else {
        GradeBand { grade: "D", label: "Fail" }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Term,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolRegistration {
    pub id: String,
    pub school_name: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub admin_name: String,
    pub admin_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    pub plan: Plan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_screenshot: Option<String>,
    pub status: RegistrationStatus,
    /// RFC 3339.
    pub registration_date: String,
}

/// Manually entered promotion decision for one student and year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub student_id: String,
    pub year: String,
    pub decision: String,
}

/// `"Nursery 1 A"` -> `"nursery-1-a"`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}
