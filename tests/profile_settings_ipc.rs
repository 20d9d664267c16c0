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
fn profile_registration_settings_and_dashboard() {
    let workspace = temp_dir("trackerd-profile");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let session = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.open",
        json!({ "userId": "giulia", "today": "2024-03-10" }),
    );
    // No profile yet: the year starting in today's calendar year.
    assert_eq!(session["schoolYear"].as_str(), Some("2024-2025"));

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "profile.create",
        json!({
            "profile": { "name": " Giulia ", "surname": "Bianchi", "school": "Liceo Volta" },
            "today": "2025-09-20"
        }),
    );
    assert_eq!(created["name"].as_str(), Some("Giulia"));
    assert_eq!(created["currentSchoolYear"].as_str(), Some("2025-2026"));
    assert_eq!(created["settings"]["showGradeAverage"].as_bool(), Some(true));
    assert_eq!(created["settings"]["darkMode"].as_bool(), Some(false));
    assert!(created.get("createdAt").is_some());

    // The session was opened without a year, so it moves with the profile.
    let followed = request_ok(&mut stdin, &mut reader, "3b", "session.get", json!({}));
    assert_eq!(followed["schoolYear"].as_str(), Some("2025-2026"));

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "profile.update",
        json!({ "patch": { "class": "5B" } }),
    );
    assert_eq!(updated["class"].as_str(), Some("5B"));
    assert_eq!(updated["school"].as_str(), Some("Liceo Volta"));
    assert!(updated.get("updatedAt").is_some());

    // Without an explicit year the session follows the profile.
    let reopened = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "session.open",
        json!({ "userId": "giulia", "today": "2024-03-10" }),
    );
    assert_eq!(reopened["schoolYear"].as_str(), Some("2025-2026"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "grades.create",
        json!({ "record": { "subjectId": "s1", "value": 7, "date": "2025-10-01" } }),
    );
    let shown = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "dashboard.summary",
        json!({ "today": "2025-10-06" }),
    );
    assert_eq!(shown["average"].as_f64(), Some(7.0));
    assert_eq!(shown["schoolYear"].as_str(), Some("2025-2026"));

    let settings = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "profile.updateSettings",
        json!({ "settings": { "showGradeAverage": false } }),
    );
    assert_eq!(settings["settings"]["showGradeAverage"].as_bool(), Some(false));
    assert_eq!(settings["settings"]["eventNotifications"].as_bool(), Some(true));

    let hidden = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "dashboard.summary",
        json!({ "today": "2025-10-06" }),
    );
    assert!(hidden["average"].is_null());
    assert_eq!(hidden["gradeCount"].as_u64(), Some(1));

    let fetched = request_ok(&mut stdin, &mut reader, "10", "profile.get", json!({}));
    assert_eq!(fetched["class"].as_str(), Some("5B"));
    assert_eq!(fetched["settings"]["showGradeAverage"].as_bool(), Some(false));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn session_follows_profile_year_unless_opened_with_one() {
    let workspace = temp_dir("trackerd-profile-year");
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
        json!({ "userId": "marco", "today": "2024-03-10" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "profile.create",
        json!({
            "profile": { "name": "Marco", "surname": "Neri", "currentSchoolYear": "2024-2025" }
        }),
    );

    let moved = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "profile.update",
        json!({ "patch": { "currentSchoolYear": "2025-2026" } }),
    );
    assert_eq!(moved["currentSchoolYear"].as_str(), Some("2025-2026"));
    let session = request_ok(&mut stdin, &mut reader, "5", "session.get", json!({}));
    assert_eq!(session["schoolYear"].as_str(), Some("2025-2026"));

    let grade = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "grades.create",
        json!({ "record": { "subjectId": "s1", "value": 8, "date": "2025-10-01" } }),
    );
    let in_new_year = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "grades.list",
        json!({ "schoolYear": "2025-2026" }),
    );
    assert_eq!(in_new_year.as_array().map(|a| a.len()), Some(1));
    assert_eq!(in_new_year[0]["id"], grade["id"]);
    let in_old_year = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "grades.list",
        json!({ "schoolYear": "2024-2025" }),
    );
    assert_eq!(in_old_year.as_array().map(|a| a.len()), Some(0));

    // An explicit year pins the session.
    let pinned = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "session.open",
        json!({ "userId": "marco", "schoolYear": "2024-2025" }),
    );
    assert_eq!(pinned["schoolYear"].as_str(), Some("2024-2025"));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "profile.update",
        json!({ "patch": { "currentSchoolYear": "2026-2027" } }),
    );
    let session = request_ok(&mut stdin, &mut reader, "11", "session.get", json!({}));
    assert_eq!(session["schoolYear"].as_str(), Some("2024-2025"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
