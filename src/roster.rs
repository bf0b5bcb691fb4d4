use crate::ingest::{GraduationStatus, Student};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    ClassName,
    Nisn,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "className" => Some(Self::ClassName),
            "nisn" => Some(Self::Nisn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RosterFilter {
    pub status: Option<GraduationStatus>,
    /// Case-insensitive substring over name and nisn.
    pub query: Option<String>,
}

/// Pure projection over the raw roster: filter, then order. No caching; the
/// caller recomputes on demand.
pub fn project<'a>(records: &'a [Student], filter: &RosterFilter, sort: SortKey) -> Vec<&'a Student> {
    let needle = filter.query.as_deref().map(|q| q.trim().to_lowercase());
    let mut out: Vec<&Student> = records
        .iter()
        .filter(|s| filter.status.map_or(true, |want| s.status == want))
        .filter(|s| {
            needle.as_deref().map_or(true, |q| {
                q.is_empty() || s.name.to_lowercase().contains(q) || s.nisn.contains(q)
            })
        })
        .collect();
    out.sort_by(|a, b| {
        let ord = match sort {
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::ClassName => a.class_name.cmp(&b.class_name),
            SortKey::Nisn => a.nisn.cmp(&b.nisn),
        };
        ord.then_with(|| a.nisn.cmp(&b.nisn))
    });
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub passed: usize,
    pub failed: usize,
    pub deferred: usize,
}

pub fn tally(records: &[Student]) -> StatusTally {
    let mut t = StatusTally::default();
    for s in records {
        match s.status {
            GraduationStatus::Passed => t.passed += 1,
            GraduationStatus::Failed => t.failed += 1,
            GraduationStatus::Deferred => t.deferred += 1,
        }
    }
    t
}
