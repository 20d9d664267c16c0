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

fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded",
        method
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}

#[test]
fn subject_delete_leaves_grades_pointing_at_sentinel() {
    let workspace = temp_dir("trackerd-subject-delete");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.open",
        json!({ "userId": "student-1", "schoolYear": "2024-2025" }),
    );

    let chem = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "subjects.create",
        json!({ "record": { "name": "Chimica" } }),
    );
    let chem_id = chem["id"].as_str().expect("subject id").to_string();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grades.create",
        json!({ "record": { "subjectId": chem_id, "value": 6, "date": "2024-11-04" } }),
    );

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "subjects.delete",
        json!({ "id": chem_id }),
    );
    assert_eq!(deleted["deleted"].as_str(), Some(chem_id.as_str()));

    let grades = request_ok(&mut stdin, &mut reader, "6", "grades.list", json!({}));
    assert_eq!(grades[0]["subjectId"].as_str(), Some(chem_id.as_str()));

    let avg = request_ok(&mut stdin, &mut reader, "7", "grades.average", json!({}));
    assert_eq!(avg["bySubject"][0]["subjectName"].as_str(), Some("N/D"));

    let entries = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "calendar.entries",
        json!({ "date": "2024-11-04" }),
    );
    assert_eq!(entries[0]["title"].as_str(), Some("Voto 6 - N/D"));
    assert_eq!(entries[0]["kind"].as_str(), Some("grade"));

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "dashboard.summary",
        json!({ "today": "2024-11-05" }),
    );
    assert_eq!(summary["recentGrades"][0]["subjectName"].as_str(), Some("N/D"));
    assert_eq!(summary["subjectCount"].as_u64(), Some(0));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "10",
        "subjects.delete",
        json!({ "id": chem_id }),
    );
    assert_eq!(code, "not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn years_and_users_do_not_share_records() {
    let workspace = temp_dir("trackerd-scope-isolation");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.open",
        json!({ "userId": "anna", "schoolYear": "2024-2025" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "subjects.create",
        json!({ "record": { "name": "Latino" } }),
    );

    let other_year = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "subjects.list",
        json!({ "schoolYear": "2025-2026" }),
    );
    assert_eq!(other_year.as_array().map(|a| a.len()), Some(0));
    let same_year = request_ok(&mut stdin, &mut reader, "5", "subjects.list", json!({}));
    assert_eq!(same_year.as_array().map(|a| a.len()), Some(1));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "session.open",
        json!({ "userId": "marco", "schoolYear": "2024-2025" }),
    );
    let marco = request_ok(&mut stdin, &mut reader, "7", "subjects.list", json!({}));
    assert_eq!(marco.as_array().map(|a| a.len()), Some(0));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
