//! Typed rows of the university directory store.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub code: String,
    pub name: String,
    pub credits: Option<i64>,
    pub prerequisites: Option<String>,
    pub semester: Option<String>,
    pub lecturer: Option<String>,
    pub department: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub level: String,
    pub amount: i64,
    pub fee_type: Option<String>,
    pub session: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub event_type: String,
    pub event_date: String,
    pub semester: Option<String>,
    pub session: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hostel {
    pub name: String,
    pub gender: Option<String>,
    pub capacity: Option<i64>,
    pub status: Option<String>,
    pub facilities: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryService {
    pub category: String,
    pub name: String,
    pub details: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministrativeService {
    pub service: String,
    pub fee: Option<String>,
    pub processing_time: Option<String>,
    pub requirements: Option<String>,
}

/// Filter shared by every directory lookup.
///
/// `term` is interpreted per table (search text, level, gender, ...); `None`
/// returns the first `limit` rows unfiltered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryFilter {
    pub term: Option<String>,
    pub limit: u32,
}

impl DirectoryFilter {
    pub fn new(term: Option<String>, limit: u32) -> Self {
        let term = term.map(|value| value.trim().to_string()).filter(|value| !value.is_empty());
        Self { term, limit }
    }

    pub fn unfiltered(limit: u32) -> Self {
        Self { term: None, limit }
    }

    /// `%term%` in lower case for `LIKE ... ESCAPE '\'` comparisons. Wildcards in
    /// the term match literally.
    pub fn like_pattern(&self) -> Option<String> {
        self.term.as_ref().map(|term| {
            let mut pattern = String::with_capacity(term.len() + 2);
            pattern.push('%');
            for ch in term.to_lowercase().chars() {
                if matches!(ch, '\\' | '%' | '_') {
                    pattern.push('\\');
                }
                pattern.push(ch);
            }
            pattern.push('%');
            pattern
        })
    }
}
