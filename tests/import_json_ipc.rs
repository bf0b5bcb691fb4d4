mod test_support;

use serde_json::json;
use test_support::{
    error_code, open_workspace_and_login, request_err, request_ok, spawn_sidecar, temp_dir,
};

#[test]
fn json_payload_imports_with_explicit_grades_and_inference() {
    let workspace = temp_dir("lulusd-import-json");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let payload = json!([
        {
            "nisn": "111",
            "examNumber": "EX-01",
            "name": "Ani",
            "status": "LULUS",
            "grades": [
                { "name": "Matematika", "score": 90 },
                { "name": "Fisika", "score": 82.5 }
            ]
        },
        {
            "nisn": "222",
            "name": "Budi",
            "status": "DITUNDA",
            "Matematika": 70,
            "catatan": "subject inference skips this non-numeric column"
        }
    ]);
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "import.json",
        json!({ "token": token, "payload": payload }),
    );
    assert_eq!(result.get("imported").and_then(|v| v.as_u64()), Some(2));

    let ani = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.get",
        json!({ "nisn": "111" }),
    );
    let grades = ani
        .get("student")
        .and_then(|s| s.get("grades"))
        .and_then(|v| v.as_array())
        .expect("grades");
    assert_eq!(grades.len(), 2);

    let budi = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.get",
        json!({ "nisn": "222" }),
    );
    let student = budi.get("student").expect("student");
    assert_eq!(student.get("status").and_then(|v| v.as_str()), Some("DITUNDA"));
    let grades = student.get("grades").and_then(|v| v.as_array()).expect("grades");
    assert_eq!(grades.len(), 1);
    assert_eq!(grades[0].get("name").and_then(|v| v.as_str()), Some("Matematika"));
}

#[test]
fn malformed_payloads_are_rejected_wholesale() {
    let workspace = temp_dir("lulusd-import-json-bad");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    for (id, payload) in [
        ("1", json!({ "nisn": "111" })),
        ("2", json!([])),
        ("3", json!([{ "name": "first element has no nisn" }])),
    ] {
        let error = request_err(
            &mut stdin,
            &mut reader,
            id,
            "import.json",
            json!({ "token": token, "payload": payload }),
        );
        assert_eq!(error_code(&error), "bad_params");
    }
}

#[test]
fn template_round_trips_through_the_csv_importer() {
    let workspace = temp_dir("lulusd-template");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let template = request_ok(&mut stdin, &mut reader, "1", "import.template", json!({}));
    let text = template.get("text").and_then(|v| v.as_str()).expect("text");
    assert!(text.starts_with("nisn,examNumber,name,className,status,birthPlace,birthDate"));

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "import.csv",
        json!({ "token": token, "text": text }),
    );
    assert_eq!(result.get("imported").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(
        result
            .get("errors")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(0)
    );
}
