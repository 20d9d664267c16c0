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
fn set_slot_upserts_by_day_and_period() {
    let workspace = temp_dir("trackerd-schedule");
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

    let set = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "schedule.setSlot",
        json!({
            "day": "wednesday",
            "period": 3,
            "slot": { "subjectId": "math", "room": "A1", "startTime": "10:00", "endTime": "11:00" }
        }),
    );
    assert_eq!(set["period"].as_u64(), Some(3));
    assert_eq!(set["room"].as_str(), Some("A1"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "schedule.setSlot",
        json!({ "day": "wednesday", "period": 1, "slot": { "subjectId": "hist" } }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "schedule.setSlot",
        json!({ "day": "wednesday", "period": 3, "slot": { "subjectId": "chem", "room": "LAB" } }),
    );

    let day = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "schedule.day",
        json!({ "day": "wednesday" }),
    );
    assert_eq!(day["label"].as_str(), Some("Mercoledì"));
    let slots = day["slots"].as_array().expect("slots");
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["subjectId"].as_str(), Some("hist"));
    assert_eq!(slots[1]["subjectId"].as_str(), Some("chem"));
    // Replaced wholesale, not merged.
    assert!(slots[1].get("startTime").is_none());

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "schedule.removeSlot",
        json!({ "day": "wednesday", "period": 3 }),
    );
    assert_eq!(removed["removed"].as_bool(), Some(true));
    let again = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "schedule.removeSlot",
        json!({ "day": "wednesday", "period": 3 }),
    );
    assert_eq!(again["removed"].as_bool(), Some(false));

    let week = request_ok(&mut stdin, &mut reader, "9", "schedule.week", json!({}));
    let week = week.as_array().expect("week");
    assert_eq!(week.len(), 6);
    assert_eq!(week[2]["day"].as_str(), Some("wednesday"));
    assert_eq!(week[2]["slots"].as_array().map(|s| s.len()), Some(1));
    assert_eq!(week[0]["slots"].as_array().map(|s| s.len()), Some(0));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "10",
        "schedule.setSlot",
        json!({ "day": "wednesday", "period": 9, "slot": {} }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "11",
        "schedule.day",
        json!({ "day": "sunday" }),
    );
    assert_eq!(code, "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
