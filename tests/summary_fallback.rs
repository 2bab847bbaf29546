use serde_json::json;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;

fn spawn_sidecar_with(envs: &[(&str, String)]) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_nurseryd");
    let mut cmd = Command::new(exe);
    cmd.env_remove("NURSERYD_SUMMARY_URL")
        .env_remove("NURSERYD_SUMMARY_API_KEY")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let mut child = cmd.spawn().expect("spawn nurseryd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
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
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// Opens an ephemeral workspace with one marked student and asks for its
/// summary.
fn summary_for(envs: &[(&str, String)]) -> (serde_json::Value, serde_json::Value) {
    let (mut child, mut stdin, mut reader) = spawn_sidecar_with(envs);
    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "ephemeral": true }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "name": "Grace", "classId": "nursery-1-b" }),
    );
    let sid = created["student"]["id"].as_str().expect("id").to_string();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "marks.saveBatch",
        json!({ "entries": [{ "studentId": sid, "subjectId": "oral", "year": "2025", "term": "Term 1", "score": 88 }] }),
    );
    let res = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "reports.summary",
        json!({ "studentId": sid, "year": "2025", "term": "Term 1" }),
    );
    drop(stdin);
    let _ = child.wait();
    (health, res)
}

/// Answers a single HTTP request with `body` and hands back what was asked.
fn one_shot_server(body: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("read header");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((k, v)) = line.split_once(':') {
                if k.eq_ignore_ascii_case("content-length") {
                    content_length = v.trim().parse().unwrap_or(0);
                }
            }
        }
        let mut req_body = vec![0u8; content_length];
        reader.read_exact(&mut req_body).expect("read body");

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
        .expect("write response");
        stream.flush().expect("flush response");
        String::from_utf8_lossy(&req_body).to_string()
    });
    (format!("http://{}/summarize", addr), handle)
}

#[test]
fn unconfigured_endpoint_yields_unavailable_text() {
    let (health, res) = summary_for(&[]);
    assert_eq!(health["summaryConfigured"], json!(false));
    assert_eq!(res["summary"], json!("AI Summary unavailable."));
    assert_eq!(res["report"]["student"]["name"], json!("Grace"));
}

#[test]
fn unreachable_endpoint_yields_failure_text() {
    let (health, res) = summary_for(&[
        ("NURSERYD_SUMMARY_URL", "http://127.0.0.1:9/summarize".to_string()),
        ("NURSERYD_SUMMARY_TIMEOUT_SECS", "2".to_string()),
    ]);
    assert_eq!(health["summaryConfigured"], json!(true));
    assert_eq!(res["summary"], json!("Could not generate summary."));
}

#[test]
fn configured_endpoint_text_is_returned() {
    let (url, server) = one_shot_server(r#"{"text":"  Grace speaks with confidence.  "}"#);
    let (_, res) = summary_for(&[
        ("NURSERYD_SUMMARY_URL", url),
        ("NURSERYD_SUMMARY_TIMEOUT_SECS", "5".to_string()),
    ]);
    assert_eq!(res["summary"], json!("Grace speaks with confidence."));

    let sent = server.join().expect("server thread");
    let sent: serde_json::Value = serde_json::from_str(&sent).expect("prompt json");
    let prompt = sent["prompt"].as_str().unwrap_or("");
    assert!(prompt.contains("Grace"));
    assert!(prompt.contains("ORAL"));
}

#[test]
fn empty_endpoint_reply_yields_placeholder() {
    let (url, server) = one_shot_server(r#"{"text":""}"#);
    let (_, res) = summary_for(&[("NURSERYD_SUMMARY_URL", url)]);
    assert_eq!(res["summary"], json!("No summary generated."));
    let _ = server.join();
}
