use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Columns that describe the student rather than a subject. Anything else in
/// an ingested row is treated as a subject column.
pub const BIO_FIELDS: [&str; 8] = [
    "nisn",
    "examNumber",
    "name",
    "className",
    "status",
    "birthPlace",
    "birthDate",
    "id",
];

/// Uniform score bound for every ingestion path (CSV, JSON, manual edit).
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraduationStatus {
    #[serde(rename = "LULUS")]
    Passed,
    #[serde(rename = "TIDAK LULUS")]
    Failed,
    #[serde(rename = "DITUNDA")]
    Deferred,
}

impl GraduationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "LULUS",
            Self::Failed => "TIDAK LULUS",
            Self::Deferred => "DITUNDA",
        }
    }

    /// Fail-closed normalization: only an exact (case-insensitive) match on
    /// the passed/deferred labels counts; everything else is a fail.
    pub fn normalize(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("LULUS") {
            Self::Passed
        } else if raw.eq_ignore_ascii_case("DITUNDA") {
            Self::Deferred
        } else {
            Self::Failed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectGrade {
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub nisn: String,
    pub exam_number: String,
    pub name: String,
    pub class_name: String,
    pub status: GraduationStatus,
    pub birth_place: String,
    pub birth_date: String,
    pub grades: Vec<SubjectGrade>,
}

/// One ingested row: ordered (column, cell) pairs plus its position in the
/// source. For CSV the header counts as row 1, so data starts at row 2; for
/// JSON arrays the position is the 1-based element index.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub number: usize,
    pub cells: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowIssue {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub records: Vec<Student>,
    pub issues: Vec<RowIssue>,
}

fn is_bio_field(name: &str) -> bool {
    BIO_FIELDS.contains(&name)
}

fn cell<'a>(row: &'a RawRow, field: &str) -> Option<&'a str> {
    row.cells
        .iter()
        .find(|(k, _)| k == field)
        .map(|(_, v)| v.trim())
}

fn cell_or_empty(row: &RawRow, field: &str) -> String {
    cell(row, field).unwrap_or("").to_string()
}

/// Subject inference: every non-bio column whose cell parses as a finite
/// number becomes a grade entry, in source column order. Non-numeric cells
/// are dropped without complaint; out-of-bound scores are collected so the
/// caller can reject the row.
pub fn extract_grades(row: &RawRow) -> (Vec<SubjectGrade>, Vec<RowIssue>) {
    let mut grades = Vec::new();
    let mut issues = Vec::new();
    for (column, value) in &row.cells {
        if is_bio_field(column) {
            continue;
        }
        let Ok(score) = value.trim().parse::<f64>() else {
            continue;
        };
        if !score.is_finite() {
            continue;
        }
        if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
            issues.push(RowIssue {
                row: row.number,
                message: format!(
                    "score for {} is out of range 0-100: {}",
                    column, score
                ),
            });
            continue;
        }
        grades.push(SubjectGrade {
            name: column.clone(),
            score,
        });
    }
    (grades, issues)
}

/// Normalizes one raw row into a Student or rejects it with per-row issues.
pub fn validate_row(row: &RawRow) -> Result<Student, Vec<RowIssue>> {
    let mut issues = Vec::new();

    let nisn = cell_or_empty(row, "nisn");
    if nisn.is_empty() {
        issues.push(RowIssue {
            row: row.number,
            message: "nisn is missing".to_string(),
        });
    }
    let name = cell_or_empty(row, "name");
    if name.is_empty() {
        issues.push(RowIssue {
            row: row.number,
            message: "name is missing".to_string(),
        });
    }

    let (grades, mut grade_issues) = extract_grades(row);
    issues.append(&mut grade_issues);

    if !issues.is_empty() {
        return Err(issues);
    }

    Ok(Student {
        id: nisn.clone(),
        nisn,
        exam_number: cell_or_empty(row, "examNumber"),
        name,
        class_name: cell_or_empty(row, "className"),
        status: GraduationStatus::normalize(&cell_or_empty(row, "status")),
        birth_place: cell_or_empty(row, "birthPlace"),
        birth_date: cell_or_empty(row, "birthDate"),
        grades,
    })
}

/// Parses a CSV upload. Header row is required; structurally broken records
/// (quoting, column-count mismatch) become per-row issues and do not block
/// rows that parsed cleanly.
pub fn parse_csv(text: &str) -> anyhow::Result<IngestReport> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| anyhow::anyhow!("unreadable CSV header: {}", e))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        anyhow::bail!("CSV header row is empty");
    }

    let mut report = IngestReport::default();
    let mut saw_data_row = false;

    for (i, record) in rdr.records().enumerate() {
        let row_number = i + 2;
        saw_data_row = true;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                report.issues.push(RowIssue {
                    row: row_number,
                    message: format!("malformed CSV row: {}", e),
                });
                continue;
            }
        };
        let row = RawRow {
            number: row_number,
            cells: headers
                .iter()
                .cloned()
                .zip(record.iter().map(|v| v.to_string()))
                .collect(),
        };
        match validate_row(&row) {
            Ok(student) => report.records.push(student),
            Err(mut issues) => report.issues.append(&mut issues),
        }
    }

    if !saw_data_row {
        anyhow::bail!("CSV contains no data rows");
    }
    Ok(report)
}

fn scalar_to_cell(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Builds a Student from one JSON object. Shared by bulk JSON import and the
/// manual-edit path so the same required-field and score-bound rules apply
/// everywhere. An explicit `grades` array takes precedence over subject
/// inference; entries with a non-numeric score are dropped like non-numeric
/// cells.
pub fn student_from_object(position: usize, obj: &Map<String, Value>) -> Result<Student, Vec<RowIssue>> {
    let explicit_grades = obj.get("grades").and_then(|v| v.as_array());

    let cells: Vec<(String, String)> = obj
        .iter()
        .filter(|(k, _)| explicit_grades.is_none() || is_bio_field(k.as_str()))
        .filter_map(|(k, v)| scalar_to_cell(v).map(|cell| (k.clone(), cell)))
        .collect();
    let row = RawRow {
        number: position,
        cells,
    };

    let mut student = validate_row(&row)?;

    if let Some(entries) = explicit_grades {
        let mut grades = Vec::new();
        let mut issues = Vec::new();
        for entry in entries {
            let Some(name) = entry.get("name").and_then(|v| v.as_str()) else {
                continue;
            };
            let Some(score) = entry.get("score").and_then(|v| v.as_f64()) else {
                continue;
            };
            if !score.is_finite() {
                continue;
            }
            if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
                issues.push(RowIssue {
                    row: position,
                    message: format!("score for {} is out of range 0-100: {}", name, score),
                });
                continue;
            }
            grades.push(SubjectGrade {
                name: name.to_string(),
                score,
            });
        }
        if !issues.is_empty() {
            return Err(issues);
        }
        student.grades = grades;
    }

    Ok(student)
}

/// Parses a pasted JSON payload: a non-empty array of objects whose first
/// element carries `nisn`, else the whole payload is rejected.
pub fn parse_json(payload: &Value) -> anyhow::Result<IngestReport> {
    let Some(items) = payload.as_array() else {
        anyhow::bail!("JSON payload must be an array of student objects");
    };
    if items.is_empty() {
        anyhow::bail!("JSON payload must not be empty");
    }
    let first_has_nisn = items[0]
        .as_object()
        .and_then(|o| o.get("nisn"))
        .map(|v| !v.is_null())
        .unwrap_or(false);
    if !first_has_nisn {
        anyhow::bail!("first element of the JSON payload must carry nisn");
    }

    let mut report = IngestReport::default();
    for (i, item) in items.iter().enumerate() {
        let position = i + 1;
        let Some(obj) = item.as_object() else {
            report.issues.push(RowIssue {
                row: position,
                message: "element is not an object".to_string(),
            });
            continue;
        };
        match student_from_object(position, obj) {
            Ok(student) => report.records.push(student),
            Err(mut issues) => report.issues.append(&mut issues),
        }
    }
    Ok(report)
}

/// The downloadable CSV template: fixed bio columns, a few subject columns,
/// one example row.
pub fn template_csv() -> String {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    let header = [
        "nisn",
        "examNumber",
        "name",
        "className",
        "status",
        "birthPlace",
        "birthDate",
        "Matematika",
        "Bahasa Indonesia",
        "Bahasa Inggris",
    ];
    let example = [
        "0051234567",
        "EX-2025-001",
        "Ani Wijaya",
        "XII IPA 1",
        "LULUS",
        "Bojonegoro",
        "2007-04-12",
        "90",
        "88",
        "85",
    ];
    // Writing fixed string slices to an in-memory buffer cannot fail.
    let _ = wtr.write_record(header);
    let _ = wtr.write_record(example);
    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}
