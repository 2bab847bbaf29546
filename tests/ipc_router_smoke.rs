use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_nurseryd");
    let mut child = Command::new(exe)
        .env_remove("NURSERYD_SUMMARY_URL")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn nurseryd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn methods_require_a_workspace_and_unknown_methods_are_reported() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["storeOpen"], json!(false));
    assert_eq!(health["summaryConfigured"], json!(false));

    let resp = request(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert_eq!(error_code(&resp), "no_workspace");
    let resp = request(&mut stdin, &mut reader, "2b", "classes.list", json!({}));
    assert_eq!(error_code(&resp), "no_workspace");

    let resp = request(&mut stdin, &mut reader, "3", "grid.get", json!({}));
    assert_eq!(error_code(&resp), "not_implemented");

    // A malformed line gets a bad_json reply and the loop keeps going.
    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse");
    assert_eq!(error_code(&value), "bad_json");

    let _ = request_ok(&mut stdin, &mut reader, "4", "health", json!({}));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("nurseryd-router-smoke");
    let bundle_out = workspace.join("smoke-backup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["seeded"]["users"], json!(true));
    assert_eq!(selected["seeded"]["classes"], json!(true));
    assert!(workspace.join("nursery.sqlite3").is_file());

    let catalog = request_ok(&mut stdin, &mut reader, "2", "catalog.get", json!({}));
    assert_eq!(catalog["subjects"].as_array().map(|a| a.len()), Some(8));
    assert_eq!(catalog["terms"], json!(["Term 1", "Term 2", "Term 3"]));

    let login = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "auth.login",
        json!({ "username": "ADMIN", "password": "admin" }),
    );
    assert_eq!(login["user"]["role"], json!("ADMIN"));
    assert!(login["user"].get("password").is_none());

    let classes = request_ok(&mut stdin, &mut reader, "4", "classes.list", json!({}));
    let names: Vec<&str> = classes["classes"]
        .as_array()
        .expect("classes")
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Nursery 1 A", "Nursery 1 B", "Nursery 2", "Nursery 3"]);

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.create",
        json!({ "name": "Smoke Kid", "classId": "nursery-2" }),
    );
    let student_id = student["student"]["id"].as_str().expect("student id").to_string();

    let calls: Vec<(&str, serde_json::Value)> = vec![
        ("users.list", json!({})),
        ("classes.forTeacher", json!({ "username": "ADMIN" })),
        ("students.list", json!({ "className": "Nursery 2" })),
        (
            "marks.saveBatch",
            json!({ "entries": [{ "studentId": student_id, "subjectId": "oral", "year": "2024", "term": "Term 1", "score": 80 }] }),
        ),
        ("marks.get", json!({ "studentId": student_id, "year": "2024", "term": "Term 1" })),
        ("reports.build", json!({ "studentId": student_id, "year": "2024", "term": "Term 1" })),
        ("reports.classRanking", json!({ "className": "Nursery 2", "year": "2024", "term": "Term 1" })),
        ("reports.summary", json!({ "studentId": student_id, "year": "2024", "term": "Term 1" })),
        ("decisions.set", json!({ "studentId": student_id, "year": "2024", "decision": "Promoted" })),
        ("config.get", json!({})),
        ("config.update", json!({ "patch": { "motto": "Learn through play" } })),
        ("settings.get", json!({})),
        ("registrations.current", json!({})),
        ("registrations.list", json!({})),
        ("registrations.stats", json!({})),
        ("backup.export", json!({})),
        ("backup.exportBundle", json!({ "outPath": bundle_out.to_string_lossy() })),
    ];
    for (i, (method, params)) in calls.into_iter().enumerate() {
        let id = format!("call-{}", i);
        let _ = request_ok(&mut stdin, &mut reader, &id, method, params);
    }
    assert!(bundle_out.is_file());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn ephemeral_workspace_does_not_touch_disk() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "ephemeral": true }),
    );
    assert_eq!(selected["ephemeral"], json!(true));
    assert!(selected["workspacePath"].is_null());

    let health = request_ok(&mut stdin, &mut reader, "2", "health", json!({}));
    assert_eq!(health["storeOpen"], json!(true));

    let resp = request(&mut stdin, &mut reader, "3", "workspace.select", json!({}));
    assert_eq!(error_code(&resp), "bad_params");

    drop(stdin);
    let _ = child.wait();
}
