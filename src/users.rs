use crate::config::{CLASSES_KEY, USERS_KEY};
use crate::error::{AppError, Result};
use crate::model::{ClassRoom, User, UserRole};
use crate::store::{encode_list, load_list, save_list, RecordStore};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub password: String,
    pub role: UserRole,
    pub email: Option<String>,
    pub school_id: Option<String>,
}

/// Blank or missing fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub user: User,
    pub classes_updated: usize,
}

pub fn list_users(store: &dyn RecordStore) -> Result<Vec<User>> {
    Ok(load_list(store, USERS_KEY)?)
}

pub fn create_user(store: &mut dyn RecordStore, new_user: NewUser) -> Result<User> {
    let username = new_user.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::invalid("username must not be empty"));
    }
    if new_user.password.is_empty() {
        return Err(AppError::invalid("password must not be empty"));
    }

    let mut users: Vec<User> = load_list(store, USERS_KEY)?;
    if users.iter().any(|u| u.username == username) {
        return Err(AppError::Duplicate(format!("username {}", username)));
    }

    let name = match new_user.name.trim() {
        "" => username.clone(),
        n => n.to_string(),
    };
    let user = User {
        username,
        name,
        role: new_user.role,
        email: new_user.email.filter(|e| !e.trim().is_empty()),
        password: Some(new_user.password),
        school_id: new_user.school_id,
    };
    users.push(user.clone());
    save_list(store, USERS_KEY, &users)?;
    tracing::info!(username = %user.username, role = ?user.role, "user created");
    Ok(user)
}

pub fn update_user(store: &mut dyn RecordStore, current_username: &str, patch: UserPatch) -> Result<UserUpdate> {
    let mut users: Vec<User> = load_list(store, USERS_KEY)?;
    let idx = users
        .iter()
        .position(|u| u.username == current_username)
        .ok_or_else(|| AppError::not_found("user"))?;

    let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let new_username = non_blank(patch.username);
    if let Some(new_name) = new_username.as_deref() {
        if new_name != current_username && users.iter().any(|u| u.username == new_name) {
            return Err(AppError::Duplicate(format!("username {}", new_name)));
        }
    }

    let renamed_teacher = match new_username.as_deref() {
        Some(n) if n != current_username && users[idx].role == UserRole::Teacher => Some(n.to_string()),
        _ => None,
    };

    let user = &mut users[idx];
    if let Some(name) = non_blank(patch.name) {
        user.name = name;
    }
    if let Some(username) = new_username {
        user.username = username;
    }
    if let Some(password) = patch.password.filter(|p| !p.is_empty()) {
        user.password = Some(password);
    }
    let updated = user.clone();

    let mut classes_updated = 0;
    let mut entries = Vec::with_capacity(2);
    if let Some(new_name) = renamed_teacher {
        let mut classes: Vec<ClassRoom> = load_list(store, CLASSES_KEY)?;
        for c in classes.iter_mut() {
            if c.teacher_username.as_deref() == Some(current_username) {
                c.teacher_username = Some(new_name.clone());
                classes_updated += 1;
            }
        }
        if classes_updated > 0 {
            entries.push((CLASSES_KEY, encode_list(CLASSES_KEY, &classes)?));
        }
    }
    entries.push((USERS_KEY, encode_list(USERS_KEY, &users)?));
    store.set_many(&entries)?;

    tracing::info!(
        from = current_username,
        to = %updated.username,
        classes_updated,
        "user updated"
    );
    Ok(UserUpdate {
        user: updated,
        classes_updated,
    })
}

/// Removes the user and unassigns every class it taught. Returns the number
/// of classes unassigned.
pub fn delete_user(store: &mut dyn RecordStore, username: &str) -> Result<usize> {
    let mut users: Vec<User> = load_list(store, USERS_KEY)?;
    let before = users.len();
    users.retain(|u| u.username != username);
    if users.len() == before {
        return Err(AppError::not_found("user"));
    }
    let mut classes: Vec<ClassRoom> = load_list(store, CLASSES_KEY)?;
    let mut unassigned = 0;
    for c in classes.iter_mut() {
        if c.teacher_username.as_deref() == Some(username) {
            c.teacher_username = None;
            unassigned += 1;
        }
    }
    let mut entries = vec![(USERS_KEY, encode_list(USERS_KEY, &users)?)];
    if unassigned > 0 {
        entries.push((CLASSES_KEY, encode_list(CLASSES_KEY, &classes)?));
    }
    store.set_many(&entries)?;

    tracing::info!(username, unassigned, "user deleted");
    Ok(unassigned)
}

/// Plaintext comparison against stored credentials.
pub fn authenticate(store: &dyn RecordStore, username: &str, password: &str) -> Result<Option<User>> {
    let users: Vec<User> = load_list(store, USERS_KEY)?;
    Ok(users
        .into_iter()
        .find(|u| u.username == username && u.password.as_deref() == Some(password)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::BatchOnlyStore;
    use crate::store::MemoryStore;

    fn teacher(username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            name: format!("Teacher {}", username),
            password: "pw".into(),
            role: UserRole::Teacher,
            email: None,
            school_id: None,
        }
    }

    fn class(id: &str, teacher: Option<&str>) -> ClassRoom {
        ClassRoom {
            id: id.into(),
            name: id.into(),
            teacher_username: teacher.map(|t| t.to_string()),
        }
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let mut store = MemoryStore::new();
        create_user(&mut store, teacher("UMWARI")).expect("first");
        let err = create_user(&mut store, teacher("UMWARI")).expect_err("duplicate");
        assert_eq!(err.code(), "duplicate");
        assert_eq!(list_users(&store).expect("list").len(), 1);
    }

    #[test]
    fn teacher_rename_cascades_to_classes() {
        let mut store = MemoryStore::new();
        create_user(&mut store, teacher("UMWARI")).expect("create");
        save_list(
            &mut store,
            CLASSES_KEY,
            &[class("a", Some("UMWARI")), class("b", Some("OTHER")), class("c", None)],
        )
        .expect("classes");

        let out = update_user(
            &mut store,
            "UMWARI",
            UserPatch {
                username: Some("KEZA".into()),
                name: Some("  ".into()),
                password: None,
            },
        )
        .expect("update");
        assert_eq!(out.classes_updated, 1);
        assert_eq!(out.user.name, "Teacher UMWARI");
        assert_eq!(out.user.password.as_deref(), Some("pw"));

        let classes: Vec<ClassRoom> = load_list(&store, CLASSES_KEY).expect("load");
        assert_eq!(classes[0].teacher_username.as_deref(), Some("KEZA"));
        assert_eq!(classes[1].teacher_username.as_deref(), Some("OTHER"));
        assert!(authenticate(&store, "KEZA", "pw").expect("auth").is_some());
        assert!(authenticate(&store, "UMWARI", "pw").expect("auth").is_none());
    }

    #[test]
    fn rename_into_taken_username_fails_without_writing() {
        let mut store = MemoryStore::new();
        create_user(&mut store, teacher("A")).expect("a");
        create_user(&mut store, teacher("B")).expect("b");
        let err = update_user(
            &mut store,
            "A",
            UserPatch {
                username: Some("B".into()),
                ..Default::default()
            },
        )
        .expect_err("taken");
        assert_eq!(err.code(), "duplicate");
        let names: Vec<String> = list_users(&store)
            .expect("list")
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn delete_unassigns_classes() {
        let mut store = MemoryStore::new();
        create_user(&mut store, teacher("T1")).expect("create");
        save_list(&mut store, CLASSES_KEY, &[class("a", Some("T1")), class("b", Some("T1"))])
            .expect("classes");
        assert_eq!(delete_user(&mut store, "T1").expect("delete"), 2);
        let classes: Vec<ClassRoom> = load_list(&store, CLASSES_KEY).expect("load");
        assert!(classes.iter().all(|c| c.teacher_username.is_none()));
        assert_eq!(delete_user(&mut store, "T1").expect_err("gone").code(), "not_found");
    }

    #[test]
    fn delete_writes_user_and_classes_together() {
        let mut store = BatchOnlyStore::default();
        create_user(&mut store.inner, teacher("T2")).expect("create");
        save_list(&mut store.inner, CLASSES_KEY, &[class("a", Some("T2"))]).expect("classes");
        assert_eq!(delete_user(&mut store, "T2").expect("delete"), 1);
        assert_eq!(store.batches, 1);
        assert!(list_users(&store).expect("users").is_empty());
        let classes: Vec<ClassRoom> = load_list(&store, CLASSES_KEY).expect("load");
        assert_eq!(classes[0].teacher_username, None);
    }
}
