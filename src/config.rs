//! Store keys, limits and runtime settings.

use serde::{Deserialize, Serialize};

// ===== Store keys =====

pub const MARKS_KEY: &str = "nursery_app_marks";
pub const USERS_KEY: &str = "nursery_app_users";
pub const CLASSES_KEY: &str = "nursery_app_classes";
pub const STUDENTS_KEY: &str = "nursery_app_students";
pub const CONFIG_KEY: &str = "nursery_app_config";
pub const REGISTRATION_KEY: &str = "nursery_app_registration";
pub const REGISTRATIONS_KEY: &str = "nursery_app_registrations";
pub const DECISIONS_KEY: &str = "nursery_app_decisions";
pub const SETTINGS_KEY: &str = "nursery_app_settings";

/// SQLite file inside a workspace directory.
pub const DB_FILE_NAME: &str = "nursery.sqlite3";

// ===== Marks =====

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

/// Upper bound on entries accepted by one `marks.saveBatch` call.
pub const MARKS_BATCH_MAX_ENTRIES: usize = 5000;

/// Default annual average needed for automatic promotion.
pub const DEFAULT_PASS_MARK: f64 = 50.0;

// ===== Registration =====

/// Plan prices in FRW, used for the reviewer revenue figure.
pub const TERM_PLAN_PRICE: i64 = 30_000;
pub const YEAR_PLAN_PRICE: i64 = 90_000;

// ===== Backup =====

pub const BACKUP_VERSION: &str = "1.0";

// ===== Summary endpoint =====

pub const SUMMARY_URL_ENV: &str = "NURSERYD_SUMMARY_URL";
pub const SUMMARY_API_KEY_ENV: &str = "NURSERYD_SUMMARY_API_KEY";
pub const SUMMARY_TIMEOUT_ENV: &str = "NURSERYD_SUMMARY_TIMEOUT_SECS";
pub const DEFAULT_SUMMARY_TIMEOUT_SECS: u64 = 20;

pub const SUMMARY_UNAVAILABLE: &str = "AI Summary unavailable.";
pub const SUMMARY_FAILED: &str = "Could not generate summary.";
pub const SUMMARY_EMPTY: &str = "No summary generated.";

// ===== Logging =====

pub const LOG_ENV: &str = "NURSERYD_LOG";
pub const DEFAULT_LOG_FILTER: &str = "nurseryd=info";

// ===== Seed data =====

pub const SEED_ADMIN_USERNAME: &str = "ADMIN";
pub const SEED_ADMIN_NAME: &str = "School Admin";
pub const SEED_ADMIN_PASSWORD: &str = "admin";
pub const SEED_CLASSES: &[&str] = &["Nursery 1 A", "Nursery 1 B", "Nursery 2", "Nursery 3"];

/// Shown on report cards until the school uploads its own logo.
pub const DEFAULT_SCHOOL_LOGO: &str = "data:image/svg+xml;charset=utf-8,%3Csvg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 120 120'%3E%3Ccircle cx='60' cy='60' r='56' fill='%230055A4'/%3E%3Cpath d='M30 78 L60 34 L90 78 Z' fill='%23FFD100'/%3E%3Ctext x='60' y='104' font-family='sans-serif' font-weight='bold' font-size='14' text-anchor='middle' fill='white'%3ESCHOOL%3C/text%3E%3C/svg%3E";

/// How the annual promotion decision on a final-term report is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionPolicy {
    /// "Promoted" when the annual average reaches `pass_mark`, else "Repeat".
    Automatic,
    /// Whatever a reviewer recorded with `decisions.set`.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_promotion_policy")]
    pub promotion_policy: PromotionPolicy,
    #[serde(default = "default_pass_mark")]
    pub pass_mark: f64,
}

fn default_promotion_policy() -> PromotionPolicy {
    PromotionPolicy::Automatic
}

fn default_pass_mark() -> f64 {
    DEFAULT_PASS_MARK
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            promotion_policy: default_promotion_policy(),
            pass_mark: default_pass_mark(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        if !self.pass_mark.is_finite()
            || self.pass_mark < MIN_SCORE as f64
            || self.pass_mark > MAX_SCORE as f64
        {
            return Err(format!(
                "passMark must be between {} and {}",
                MIN_SCORE, MAX_SCORE
            ));
        }
        Ok(())
    }
}
