//! Catalog type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A course offering as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: String,
    pub course_code: String,

    /// Term indicator: F (fall), S (winter) or Y (full year)
    pub section_code: String,

    pub name: String,
    pub description: String,
    pub division: String,
    pub prerequisites: String,
    pub exclusions: String,
    pub department: Option<String>,
    pub campus: String,

    /// Session codes such as "20249" (Fall 2024)
    pub sessions: Vec<String>,
}

/// A lecture, tutorial or practical section of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingSection {
    pub course_id: String,
    pub course_code: String,

    /// Section name, e.g. "LEC0101"
    pub section_code: String,

    /// "Lecture", "Tutorial", "Practical", ...
    #[serde(rename = "type")]
    pub section_type: String,

    pub instructors: Vec<String>,
    pub times: Vec<MeetingTime>,
    pub size: u32,
    pub enrolment: u32,

    /// Delivery mode of the section
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingTime {
    pub day: u32,

    /// "HH:MM:SS"
    pub start: String,
    pub end: String,
    pub location: String,
}

/// Course shape exchanged with the recommenders and returned to clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseRecord {
    pub course_code: String,
    pub name: String,
    pub department: String,
    pub division: String,
    pub description: String,
    pub prerequisites: String,
    pub exclusions: String,
    pub campus: String,
    pub section_code: String,

    /// Comma-joined session codes
    pub sessions: String,

    /// Formatted lecture sections
    pub meeting_sections: Vec<String>,
}

/// Which text of a course an embedding was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddingField {
    /// The rendered course document
    Document,
    Name,
    Description,
    Prerequisites,
}

impl EmbeddingField {
    pub const ALL: [EmbeddingField; 4] = [
        EmbeddingField::Document,
        EmbeddingField::Name,
        EmbeddingField::Description,
        EmbeddingField::Prerequisites,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Name => "name",
            Self::Description => "description",
            Self::Prerequisites => "prerequisites",
        }
    }
}

/// Relative importance of the per-field embeddings in weighted retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldWeights {
    pub name: f64,
    pub description: f64,
    pub prerequisites: f64,
}

/// Allowed deviation of the weight sum from 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            name: 0.3,
            description: 0.5,
            prerequisites: 0.2,
        }
    }
}

impl FieldWeights {
    /// Weights are usable when none is negative and they sum to 1.
    pub fn is_valid(&self) -> bool {
        let values = [self.name, self.description, self.prerequisites];
        values.iter().all(|w| w.is_finite() && *w >= 0.0)
            && (values.iter().sum::<f64>() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
    }
}

/// A retrieved course with its ranking score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCourse {
    pub course_id: String,

    /// Cosine similarity (document mode) or squared L2 distance (weighted mode)
    pub score: f32,

    pub record: CourseRecord,
}

/// Options for the ingest operation.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Directory holding the numbered timetable pages
    pub source_dir: PathBuf,

    /// Reset the store before ingesting
    pub reset: bool,

    /// Courses embedded per request
    pub batch_size: usize,
}

pub const DEFAULT_BATCH_SIZE: usize = 100;

impl IngestOptions {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            reset: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Statistics from an ingest operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    pub pages: u32,
    pub courses: u32,
    pub meeting_sections: u32,

    /// Courses whose embeddings were all stored
    pub embedded_courses: u32,

    /// Embedding batches skipped after a provider error
    pub failed_batches: u32,

    pub duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionCount {
    pub division: String,
    pub courses: u64,
}

/// Statistics for the catalog store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStats {
    pub courses: u64,
    pub meeting_sections: u64,
    pub embedded_courses: u64,

    /// Course counts per division, largest first
    pub by_division: Vec<DivisionCount>,

    pub db_size_bytes: u64,

    pub last_ingest_at: Option<DateTime<Utc>>,
}
