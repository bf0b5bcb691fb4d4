use std::path::Path;

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};

use crate::ingest::{GraduationStatus, Student, SubjectGrade};

/// Hard ceiling of the store's batched-write primitive. Import chunks must
/// stay under this; see `importer::CHUNK_SIZE`.
pub const MAX_WRITE_BATCH: usize = 500;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("lulusan.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    // Students are stored document-style: one row per NISN, the grade list
    // as a JSON column, wholesale overwrite on every write.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            nisn TEXT PRIMARY KEY,
            exam_number TEXT NOT NULL,
            name TEXT NOT NULL,
            class_name TEXT NOT NULL,
            status TEXT NOT NULL,
            birth_place TEXT NOT NULL,
            birth_date TEXT NOT NULL,
            grades TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_exam_number ON students(exam_number)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS admin_users(
            email TEXT PRIMARY KEY,
            password_sha256 TEXT NOT NULL,
            created_at TEXT
        )",
        [],
    )?;

    Ok(conn)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    match raw {
        Some(text) => {
            let value = serde_json::from_str(&text)
                .with_context(|| format!("stored settings under {} are not valid JSON", key))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    let text = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        (key, &text),
    )?;
    Ok(())
}

fn status_from_label(label: &str) -> GraduationStatus {
    match label {
        "LULUS" => GraduationStatus::Passed,
        "DITUNDA" => GraduationStatus::Deferred,
        _ => GraduationStatus::Failed,
    }
}

fn student_from_row(row: &rusqlite::Row) -> rusqlite::Result<(Student, String)> {
    let nisn: String = row.get(0)?;
    let grades_json: String = row.get(7)?;
    Ok((
        Student {
            id: nisn.clone(),
            nisn,
            exam_number: row.get(1)?,
            name: row.get(2)?,
            class_name: row.get(3)?,
            status: status_from_label(&row.get::<_, String>(4)?),
            birth_place: row.get(5)?,
            birth_date: row.get(6)?,
            grades: Vec::new(),
        },
        grades_json,
    ))
}

fn finish_student((mut student, grades_json): (Student, String)) -> Student {
    // Malformed historical grade blobs degrade to an empty list rather than
    // blocking lookups.
    student.grades = serde_json::from_str::<Vec<SubjectGrade>>(&grades_json).unwrap_or_default();
    student
}

const STUDENT_COLUMNS: &str =
    "nisn, exam_number, name, class_name, status, birth_place, birth_date, grades";

pub fn student_get(conn: &Connection, nisn: &str) -> anyhow::Result<Option<Student>> {
    let found = conn
        .query_row(
            &format!("SELECT {} FROM students WHERE nisn = ?", STUDENT_COLUMNS),
            [nisn],
            student_from_row,
        )
        .optional()?;
    Ok(found.map(finish_student))
}

pub fn student_find_by_exam_number(
    conn: &Connection,
    exam_number: &str,
) -> anyhow::Result<Option<Student>> {
    let found = conn
        .query_row(
            &format!(
                "SELECT {} FROM students WHERE exam_number = ? AND exam_number <> '' LIMIT 1",
                STUDENT_COLUMNS
            ),
            [exam_number],
            student_from_row,
        )
        .optional()?;
    Ok(found.map(finish_student))
}

pub fn students_list(conn: &Connection) -> anyhow::Result<Vec<Student>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM students ORDER BY nisn",
        STUDENT_COLUMNS
    ))?;
    let rows = stmt
        .query_map([], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(finish_student).collect())
}

/// One atomic upsert batch keyed by nisn. The caller chunks; this enforces
/// the store ceiling.
pub fn students_upsert_batch(conn: &Connection, chunk: &[Student]) -> anyhow::Result<()> {
    if chunk.len() > MAX_WRITE_BATCH {
        anyhow::bail!(
            "write batch of {} exceeds the {}-row ceiling",
            chunk.len(),
            MAX_WRITE_BATCH
        );
    }
    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO students(nisn, exam_number, name, class_name, status,
                                  birth_place, birth_date, grades, updated_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(nisn) DO UPDATE SET
                exam_number = excluded.exam_number,
                name = excluded.name,
                class_name = excluded.class_name,
                status = excluded.status,
                birth_place = excluded.birth_place,
                birth_date = excluded.birth_date,
                grades = excluded.grades,
                updated_at = excluded.updated_at",
        )?;
        for s in chunk {
            let grades = serde_json::to_string(&s.grades)?;
            stmt.execute((
                &s.nisn,
                &s.exam_number,
                &s.name,
                &s.class_name,
                s.status.as_str(),
                &s.birth_place,
                &s.birth_date,
                &grades,
                &now,
            ))?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn student_delete(conn: &Connection, nisn: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM students WHERE nisn = ?", [nisn])?;
    Ok(n > 0)
}

pub fn admin_count(conn: &Connection) -> anyhow::Result<i64> {
    let n = conn.query_row("SELECT COUNT(*) FROM admin_users", [], |r| r.get(0))?;
    Ok(n)
}

pub fn admin_insert(conn: &Connection, email: &str, password_sha256: &str) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO admin_users(email, password_sha256, created_at) VALUES(?, ?, ?)",
        (email, password_sha256, &now),
    )?;
    Ok(())
}

pub fn admin_password_sha256(conn: &Connection, email: &str) -> anyhow::Result<Option<String>> {
    let found = conn
        .query_row(
            "SELECT password_sha256 FROM admin_users WHERE email = ?",
            [email],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found)
}
