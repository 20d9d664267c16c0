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
    let exe = env!("CARGO_BIN_EXE_trackerd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn trackerd");
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
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("trackerd-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());
    assert!(health.get("workspacePath").map(|v| v.is_null()).unwrap_or(false));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let session = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "session.open",
        json!({ "userId": "smoke-user", "schoolYear": "2024-2025" }),
    );
    assert_eq!(session["schoolYear"].as_str(), Some("2024-2025"));

    let subject = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "subjects.create",
        json!({ "record": { "name": "Storia", "teacher": "Rossi" } }),
    );
    let subject_id = subject["id"].as_str().expect("subject id").to_string();

    let grade = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "grades.create",
        json!({ "record": { "subjectId": subject_id, "value": 7.5, "date": "2024-10-10" } }),
    );
    let grade_id = grade["id"].as_str().expect("grade id").to_string();
    assert_eq!(grade["weight"].as_f64(), Some(1.0));
    assert_eq!(grade["kind"].as_str(), Some("written"));
    assert_eq!(grade["term"].as_u64(), Some(1));

    let event = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "events.create",
        json!({ "record": { "title": "Interrogazione", "date": "2024-10-20", "type": "test" } }),
    );
    let event_id = event["id"].as_str().expect("event id").to_string();

    let cases = [
        ("7", "session.get", json!({})),
        ("8", "subjects.list", json!({})),
        ("9", "subjects.get", json!({ "id": subject_id })),
        ("10", "subjects.update", json!({ "id": subject_id, "patch": { "notes": "aula 3" } })),
        ("11", "grades.list", json!({ "filters": { "term": "ALL" } })),
        ("12", "grades.get", json!({ "id": grade_id })),
        ("13", "grades.update", json!({ "id": grade_id, "patch": { "value": 8 } })),
        ("14", "grades.average", json!({})),
        ("15", "events.list", json!({})),
        ("16", "events.get", json!({ "id": event_id })),
        ("17", "events.update", json!({ "id": event_id, "patch": { "description": "cap. 4" } })),
        ("18", "events.groupByMonth", json!({})),
        ("19", "schedule.setSlot", json!({ "day": "monday", "period": 1, "slot": { "subjectId": subject_id } })),
        ("20", "schedule.day", json!({ "day": "monday" })),
        ("21", "schedule.week", json!({})),
        ("22", "schedule.removeSlot", json!({ "day": "monday", "period": 1 })),
        ("23", "profile.create", json!({ "profile": { "name": "Luca", "surname": "Verdi" } })),
        ("24", "profile.get", json!({})),
        ("25", "profile.update", json!({ "patch": { "class": "3A" } })),
        ("26", "profile.updateSettings", json!({ "settings": { "darkMode": true } })),
        ("27", "dashboard.summary", json!({ "today": "2024-10-14" })),
        ("28", "calendar.entries", json!({})),
        ("29", "events.delete", json!({ "id": event_id })),
        ("30", "grades.delete", json!({ "id": grade_id })),
        ("31", "subjects.delete", json!({ "id": subject_id })),
    ];
    for (id, method, params) in cases {
        let _ = request_ok(&mut stdin, &mut reader, id, method, params);
    }

    let unknown = request(&mut stdin, &mut reader, "32", "grades.export", json!({}));
    assert_eq!(unknown["ok"].as_bool(), Some(false));
    assert_eq!(unknown["error"]["code"].as_str(), Some("not_implemented"));

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush garbage");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json response");
    let bad: serde_json::Value = serde_json::from_str(line.trim()).expect("parse bad_json response");
    assert_eq!(bad["error"]["code"].as_str(), Some("bad_json"));

    // The loop keeps serving after a bad line.
    let _ = request_ok(&mut stdin, &mut reader, "33", "health", json!({}));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
