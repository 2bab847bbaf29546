use crate::config::{
    REGISTRATIONS_KEY, REGISTRATION_KEY, TERM_PLAN_PRICE, USERS_KEY, YEAR_PLAN_PRICE,
};
use crate::error::{AppError, Result};
use crate::events::{EventBus, RegistrationEvent};
use crate::model::{Plan, RegistrationStatus, SchoolRegistration, User, UserRole};
use crate::settings;
use crate::store::{load_list, load_value, save_list, save_value, RecordStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRegistration {
    #[serde(default)]
    pub school_name: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub admin_name: String,
    #[serde(default)]
    pub admin_email: String,
    #[serde(default)]
    pub admin_password: String,
    pub password_confirm: Option<String>,
    pub plan: Plan,
    pub payment_screenshot: Option<String>,
}

impl NewRegistration {
    fn validate(&self) -> Result<()> {
        let required = [
            ("schoolName", &self.school_name),
            ("district", &self.district),
            ("phone", &self.phone),
            ("adminName", &self.admin_name),
            ("adminEmail", &self.admin_email),
            ("adminPassword", &self.admin_password),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::invalid(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
        if let Some(confirm) = &self.password_confirm {
            if *confirm != self.admin_password {
                return Err(AppError::invalid("passwords do not match"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub registration: SchoolRegistration,
    pub admin_created: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    /// Sum of plan prices over approved registrations, in FRW.
    pub revenue: i64,
}

pub fn plan_price(plan: Plan) -> i64 {
    match plan {
        Plan::Term => TERM_PLAN_PRICE,
        Plan::Year => YEAR_PLAN_PRICE,
    }
}

fn pending_count(regs: &[SchoolRegistration]) -> usize {
    regs.iter()
        .filter(|r| r.status == RegistrationStatus::Pending)
        .count()
}

pub fn submit(store: &mut dyn RecordStore, events: &mut EventBus, new_reg: NewRegistration) -> Result<SchoolRegistration> {
    new_reg.validate()?;

    let reg = SchoolRegistration {
        id: format!("school-{}", Uuid::new_v4()),
        school_name: new_reg.school_name.trim().to_string(),
        district: new_reg.district.trim().to_string(),
        sector: new_reg.sector.trim().to_string(),
        phone: new_reg.phone.trim().to_string(),
        address: new_reg.address.trim().to_string(),
        admin_name: new_reg.admin_name.trim().to_string(),
        admin_email: new_reg.admin_email.trim().to_string(),
        admin_password: Some(new_reg.admin_password),
        plan: new_reg.plan,
        payment_screenshot: new_reg.payment_screenshot.filter(|s| !s.is_empty()),
        status: RegistrationStatus::Pending,
        registration_date: Utc::now().to_rfc3339(),
    };

    let mut regs: Vec<SchoolRegistration> = load_list(store, REGISTRATIONS_KEY)?;
    regs.push(reg.clone());
    save_list(store, REGISTRATIONS_KEY, &regs)?;
    save_value(store, REGISTRATION_KEY, &reg)?;

    // The report-card header starts out with what the school told us.
    let mut header = Map::new();
    header.insert("headmasterName".into(), Value::String(reg.admin_name.clone()));
    header.insert("district".into(), Value::String(reg.district.clone()));
    header.insert("sector".into(), Value::String(reg.sector.clone()));
    header.insert("phone".into(), Value::String(reg.phone.clone()));
    settings::update_school_config(store, &header)?;

    tracing::info!(registration_id = %reg.id, school = %reg.school_name, "registration submitted");
    events.emit(RegistrationEvent::Submitted {
        registration_id: reg.id.clone(),
        school_name: reg.school_name.clone(),
        pending_count: pending_count(&regs),
    });
    Ok(reg)
}

/// Most recent submission from this install, if any.
pub fn current(store: &dyn RecordStore) -> Result<Option<SchoolRegistration>> {
    Ok(load_value(store, REGISTRATION_KEY)?)
}

fn registration_time(reg: &SchoolRegistration) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&reg.registration_date)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Newest first. Unparseable dates sort last.
pub fn list(store: &dyn RecordStore) -> Result<Vec<SchoolRegistration>> {
    let mut regs: Vec<SchoolRegistration> = load_list(store, REGISTRATIONS_KEY)?;
    regs.sort_by(|a, b| registration_time(b).cmp(&registration_time(a)));
    Ok(regs)
}

pub fn stats(store: &dyn RecordStore) -> Result<RegistrationStats> {
    let regs: Vec<SchoolRegistration> = load_list(store, REGISTRATIONS_KEY)?;
    let mut out = RegistrationStats {
        total: regs.len(),
        ..Default::default()
    };
    for r in &regs {
        match r.status {
            RegistrationStatus::Pending => out.pending += 1,
            RegistrationStatus::Approved => {
                out.approved += 1;
                out.revenue += plan_price(r.plan);
            }
            RegistrationStatus::Rejected => out.rejected += 1,
        }
    }
    Ok(out)
}

/// Moves a pending registration to approved or rejected. Approval creates the
/// school's ADMIN account unless that username is already taken.
pub fn set_status(
    store: &mut dyn RecordStore,
    events: &mut EventBus,
    registration_id: &str,
    target: RegistrationStatus,
) -> Result<Transition> {
    if target == RegistrationStatus::Pending {
        return Err(AppError::invalid("target status must be approved or rejected"));
    }

    let mut regs: Vec<SchoolRegistration> = load_list(store, REGISTRATIONS_KEY)?;
    let reg = regs
        .iter_mut()
        .find(|r| r.id == registration_id)
        .ok_or_else(|| AppError::not_found("registration"))?;
    if reg.status != RegistrationStatus::Pending {
        return Err(AppError::InvalidTransition(reg.status.as_str().to_string()));
    }
    reg.status = target;
    let updated = reg.clone();
    save_list(store, REGISTRATIONS_KEY, &regs)?;

    if let Some(mut cached) = current(store)? {
        if cached.id == updated.id {
            cached.status = target;
            save_value(store, REGISTRATION_KEY, &cached)?;
        }
    }

    let mut admin_created = false;
    if target == RegistrationStatus::Approved {
        let mut users: Vec<User> = load_list(store, USERS_KEY)?;
        if !users.iter().any(|u| u.username == updated.admin_email) {
            users.push(User {
                username: updated.admin_email.clone(),
                name: updated.admin_name.clone(),
                role: UserRole::Admin,
                email: Some(updated.admin_email.clone()),
                password: updated.admin_password.clone(),
                school_id: Some(updated.id.clone()),
            });
            save_list(store, USERS_KEY, &users)?;
            admin_created = true;
        }
    }

    tracing::info!(
        registration_id,
        status = target.as_str(),
        admin_created,
        "registration reviewed"
    );
    events.emit(RegistrationEvent::StatusChanged {
        registration_id: updated.id.clone(),
        status: target,
        pending_count: pending_count(&regs),
    });
    Ok(Transition {
        registration: updated,
        admin_created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn application(email: &str) -> NewRegistration {
        NewRegistration {
            school_name: "Little Stars".into(),
            district: "Gasabo".into(),
            sector: "Remera".into(),
            phone: "0788000000".into(),
            address: "KG 11 Ave".into(),
            admin_name: "Head Teacher".into(),
            admin_email: email.into(),
            admin_password: "secret".into(),
            password_confirm: Some("secret".into()),
            plan: Plan::Year,
            payment_screenshot: Some("data:image/png;base64,AAAA".into()),
        }
    }

    #[test]
    fn submission_requires_fields_and_matching_password() {
        let mut store = MemoryStore::new();
        let mut bus = EventBus::new();
        let mut bad = application("a@school.rw");
        bad.school_name = " ".into();
        bad.phone = String::new();
        let err = submit(&mut store, &mut bus, bad).expect_err("missing");
        assert!(err.to_string().contains("schoolName, phone"));

        let mut mismatch = application("a@school.rw");
        mismatch.password_confirm = Some("other".into());
        assert_eq!(submit(&mut store, &mut bus, mismatch).expect_err("mismatch").code(), "bad_params");
        assert!(list(&store).expect("list").is_empty());
    }

    #[test]
    fn submission_caches_current_and_seeds_header() {
        let mut store = MemoryStore::new();
        let mut bus = EventBus::new();
        let rx = bus.subscribe();
        let reg = submit(&mut store, &mut bus, application("a@school.rw")).expect("submit");
        assert_eq!(reg.status, RegistrationStatus::Pending);
        assert_eq!(current(&store).expect("current").map(|r| r.id), Some(reg.id.clone()));
        let cfg = settings::get_school_config(&store).expect("config");
        assert_eq!(cfg.headmaster_name, "Head Teacher");
        assert_eq!(cfg.district, "Gasabo");
        assert_eq!(cfg.sector, "Remera");
        assert_eq!(cfg.phone, "0788000000");
        assert_eq!(cfg.motto, settings::get_school_config(&MemoryStore::new()).expect("defaults").motto);
        assert!(matches!(rx.try_recv(), Ok(RegistrationEvent::Submitted { pending_count: 1, .. })));
    }

    #[test]
    fn approval_creates_one_admin_and_is_terminal() {
        let mut store = MemoryStore::new();
        let mut bus = EventBus::new();
        let reg = submit(&mut store, &mut bus, application("a@school.rw")).expect("submit");

        let t = set_status(&mut store, &mut bus, &reg.id, RegistrationStatus::Approved).expect("approve");
        assert!(t.admin_created);
        let users: Vec<User> = load_list(&store, USERS_KEY).expect("users");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, UserRole::Admin);
        assert_eq!(users[0].school_id.as_deref(), Some(reg.id.as_str()));
        assert_eq!(
            current(&store).expect("current").map(|r| r.status),
            Some(RegistrationStatus::Approved)
        );

        let err = set_status(&mut store, &mut bus, &reg.id, RegistrationStatus::Rejected).expect_err("terminal");
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn approval_reuses_existing_account() {
        let mut store = MemoryStore::new();
        let mut bus = EventBus::new();
        let first = submit(&mut store, &mut bus, application("same@school.rw")).expect("first");
        let second = submit(&mut store, &mut bus, application("same@school.rw")).expect("second");
        assert!(set_status(&mut store, &mut bus, &first.id, RegistrationStatus::Approved).expect("a").admin_created);
        assert!(!set_status(&mut store, &mut bus, &second.id, RegistrationStatus::Approved).expect("b").admin_created);
        let users: Vec<User> = load_list(&store, USERS_KEY).expect("users");
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn stats_count_revenue_for_approved_only() {
        let mut store = MemoryStore::new();
        let mut bus = EventBus::new();
        let a = submit(&mut store, &mut bus, application("a@x.rw")).expect("a");
        let mut term_app = application("b@x.rw");
        term_app.plan = Plan::Term;
        let b = submit(&mut store, &mut bus, term_app).expect("b");
        submit(&mut store, &mut bus, application("c@x.rw")).expect("c");
        set_status(&mut store, &mut bus, &a.id, RegistrationStatus::Approved).expect("approve");
        set_status(&mut store, &mut bus, &b.id, RegistrationStatus::Rejected).expect("reject");

        let s = stats(&store).expect("stats");
        assert_eq!(
            s,
            RegistrationStats {
                total: 3,
                pending: 1,
                approved: 1,
                rejected: 1,
                revenue: YEAR_PLAN_PRICE,
            }
        );
    }
}
