mod test_support;

use serde_json::json;
use test_support::{
    error_code, open_workspace_and_login, request_err, request_ok, spawn_sidecar, temp_dir,
};

#[test]
fn csv_import_then_lookup_with_partial_success() {
    let workspace = temp_dir("lulusd-import-lookup");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    // Row 3 is missing its nisn (header counts as row 1).
    let csv = "nisn,examNumber,name,className,status,Matematika\n\
               111,EX-01,Ani,XII IPA 1,LULUS,90\n\
               ,EX-02,Budi,XII IPA 1,LULUS,80\n\
               333,EX-03,Citra,XII IPS 1,DITUNDA,75\n";
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "import.csv",
        json!({ "token": token, "text": csv }),
    );
    assert_eq!(result.get("imported").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(result.get("percent").and_then(|v| v.as_u64()), Some(100));
    let errors = result.get("errors").and_then(|v| v.as_array()).expect("errors");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].get("row").and_then(|v| v.as_u64()), Some(3));
    assert!(errors[0]
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .contains("nisn"));

    // NISN match wins.
    let hit = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "lookup.query",
        json!({ "query": "111" }),
    );
    assert_eq!(hit.get("matchedBy").and_then(|v| v.as_str()), Some("nisn"));
    let student = hit.get("student").expect("student");
    assert_eq!(student.get("name").and_then(|v| v.as_str()), Some("Ani"));
    assert_eq!(student.get("status").and_then(|v| v.as_str()), Some("LULUS"));
    assert_eq!(student.get("id").and_then(|v| v.as_str()), Some("111"));
    let grades = student.get("grades").and_then(|v| v.as_array()).expect("grades");
    assert_eq!(grades.len(), 1);
    assert_eq!(grades[0].get("name").and_then(|v| v.as_str()), Some("Matematika"));
    assert_eq!(grades[0].get("score").and_then(|v| v.as_f64()), Some(90.0));

    // Exam-number match is the fallback.
    let hit = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "lookup.query",
        json!({ "query": "EX-03" }),
    );
    assert_eq!(
        hit.get("matchedBy").and_then(|v| v.as_str()),
        Some("examNumber")
    );
    assert_eq!(
        hit.get("student")
            .and_then(|s| s.get("status"))
            .and_then(|v| v.as_str()),
        Some("DITUNDA")
    );

    // No match is not an error state in the store sense.
    let error = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "lookup.query",
        json!({ "query": "999" }),
    );
    assert_eq!(error_code(&error), "not_found");

    // Blank queries are rejected before any store access.
    let error = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "lookup.query",
        json!({ "query": "   " }),
    );
    assert_eq!(error_code(&error), "bad_params");
}

#[test]
fn nisn_match_wins_over_another_students_exam_number() {
    let workspace = temp_dir("lulusd-lookup-precedence");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    // Student B's exam number collides with student A's nisn.
    let csv = "nisn,examNumber,name,status\n\
               5555,EX-A,Ani,LULUS\n\
               6666,5555,Budi,TIDAK LULUS\n";
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "import.csv",
        json!({ "token": token, "text": csv }),
    );

    let hit = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "lookup.query",
        json!({ "query": "5555" }),
    );
    assert_eq!(hit.get("matchedBy").and_then(|v| v.as_str()), Some("nisn"));
    assert_eq!(
        hit.get("student")
            .and_then(|s| s.get("name"))
            .and_then(|v| v.as_str()),
        Some("Ani")
    );
}

#[test]
fn reimporting_the_same_batch_overwrites_instead_of_duplicating() {
    let workspace = temp_dir("lulusd-idempotent-import");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let csv = "nisn,name,status\n111,Ani,LULUS\n222,Budi,TIDAK LULUS\n";
    for id in ["first", "second"] {
        let result = request_ok(
            &mut stdin,
            &mut reader,
            id,
            "import.csv",
            json!({ "token": token, "text": csv }),
        );
        assert_eq!(result.get("imported").and_then(|v| v.as_u64()), Some(2));
    }

    let listing = request_ok(
        &mut stdin,
        &mut reader,
        "list",
        "students.list",
        json!({ "token": token }),
    );
    assert_eq!(listing.get("total").and_then(|v| v.as_u64()), Some(2));

    // Re-importing with changed data overwrites the stored record.
    let csv = "nisn,name,status\n111,Ani,TIDAK LULUS\n";
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "third",
        "import.csv",
        json!({ "token": token, "text": csv }),
    );
    let record = request_ok(
        &mut stdin,
        &mut reader,
        "get",
        "students.get",
        json!({ "nisn": "111" }),
    );
    assert_eq!(
        record
            .get("student")
            .and_then(|s| s.get("status"))
            .and_then(|v| v.as_str()),
        Some("TIDAK LULUS")
    );
}

#[test]
fn all_invalid_batch_is_a_hard_failure_with_the_issue_list() {
    let workspace = temp_dir("lulusd-empty-batch");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let csv = "nisn,name\n,Ani\n,Budi\n";
    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "import.csv",
        json!({ "token": token, "text": csv }),
    );
    assert_eq!(error_code(&error), "empty_batch");
    let issues = error
        .get("details")
        .and_then(|d| d.get("errors"))
        .and_then(|v| v.as_array())
        .expect("issue list");
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].get("row").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(issues[1].get("row").and_then(|v| v.as_u64()), Some(3));
}
