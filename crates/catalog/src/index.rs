//! SQLite-backed course store with embedding vectors.

use crate::types::{Course, DivisionCount, EmbeddingField, MeetingSection, MeetingTime};
use advisor_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// Initialize the SQLite catalog database.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Catalog(format!("Failed to create catalog directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Catalog(format!("Failed to open catalog database: {}", e)))?;

    create_tables(&conn)?;

    tracing::debug!("Initialized catalog store at {:?}", db_path);
    Ok(conn)
}

/// Open an in-memory store, used for tests and throwaway catalogs.
pub fn init_in_memory() -> AppResult<Connection> {
    let conn = Connection::open_in_memory()
        .map_err(|e| AppError::Catalog(format!("Failed to open in-memory catalog: {}", e)))?;
    create_tables(&conn)?;
    Ok(conn)
}

fn create_tables(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            course_id TEXT PRIMARY KEY,
            course_code TEXT NOT NULL,
            section_code TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            division TEXT NOT NULL,
            prerequisites TEXT NOT NULL,
            exclusions TEXT NOT NULL,
            department TEXT,
            campus TEXT NOT NULL,
            sessions TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS meeting_sections (
            course_id TEXT NOT NULL,
            course_code TEXT NOT NULL,
            section_code TEXT NOT NULL,
            section_type TEXT NOT NULL,
            instructors TEXT NOT NULL,
            times TEXT NOT NULL,
            size INTEGER NOT NULL,
            enrolment INTEGER NOT NULL,
            notes TEXT NOT NULL,
            PRIMARY KEY (course_id, section_code)
        );

        CREATE TABLE IF NOT EXISTS embeddings (
            course_id TEXT NOT NULL,
            field TEXT NOT NULL,
            vector BLOB NOT NULL,
            PRIMARY KEY (course_id, field)
        );

        CREATE TABLE IF NOT EXISTS catalog_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sections_course ON meeting_sections(course_id);
        CREATE INDEX IF NOT EXISTS idx_embeddings_field ON embeddings(field);
        "#,
    )
    .map_err(|e| AppError::Catalog(format!("Failed to create tables: {}", e)))?;

    Ok(())
}

/// Insert or replace a course.
pub fn insert_course(conn: &Connection, course: &Course) -> AppResult<()> {
    let sessions = serde_json::to_string(&course.sessions)?;

    conn.execute(
        "INSERT OR REPLACE INTO courses
         (course_id, course_code, section_code, name, description, division,
          prerequisites, exclusions, department, campus, sessions)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            course.course_id,
            course.course_code,
            course.section_code,
            course.name,
            course.description,
            course.division,
            course.prerequisites,
            course.exclusions,
            course.department,
            course.campus,
            sessions,
        ],
    )
    .map_err(|e| AppError::Catalog(format!("Failed to insert course {}: {}", course.course_id, e)))?;

    Ok(())
}

/// Insert or replace a meeting section.
pub fn insert_section(conn: &Connection, section: &MeetingSection) -> AppResult<()> {
    let instructors = serde_json::to_string(&section.instructors)?;
    let times = serde_json::to_string(&section.times)?;

    conn.execute(
        "INSERT OR REPLACE INTO meeting_sections
         (course_id, course_code, section_code, section_type, instructors, times,
          size, enrolment, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            section.course_id,
            section.course_code,
            section.section_code,
            section.section_type,
            instructors,
            times,
            section.size,
            section.enrolment,
            section.notes,
        ],
    )
    .map_err(|e| {
        AppError::Catalog(format!(
            "Failed to insert section {} of {}: {}",
            section.section_code, section.course_id, e
        ))
    })?;

    Ok(())
}

/// Store courses and sections in a single transaction.
pub fn store_catalog(
    conn: &mut Connection,
    courses: &[Course],
    sections: &[MeetingSection],
) -> AppResult<()> {
    let tx = conn
        .transaction()
        .map_err(|e| AppError::Catalog(format!("Failed to begin transaction: {}", e)))?;

    for course in courses {
        insert_course(&tx, course)?;
    }
    for section in sections {
        insert_section(&tx, section)?;
    }

    tx.commit()
        .map_err(|e| AppError::Catalog(format!("Failed to commit catalog: {}", e)))?;

    Ok(())
}

/// Insert or replace the embedding of one course field.
pub fn upsert_embedding(
    conn: &Connection,
    course_id: &str,
    field: EmbeddingField,
    vector: &[f32],
) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO embeddings (course_id, field, vector) VALUES (?1, ?2, ?3)",
        params![course_id, field.as_str(), embedding_to_bytes(vector)],
    )
    .map_err(|e| AppError::Catalog(format!("Failed to store embedding: {}", e)))?;

    Ok(())
}

/// Store every field vector of one embedding batch, all or nothing.
pub fn store_embeddings(
    conn: &mut Connection,
    rows: &[(String, EmbeddingField, Vec<f32>)],
) -> AppResult<()> {
    let tx = conn
        .transaction()
        .map_err(|e| AppError::Catalog(format!("Failed to begin transaction: {}", e)))?;

    for (course_id, field, vector) in rows {
        upsert_embedding(&tx, course_id, *field, vector)?;
    }

    tx.commit()
        .map_err(|e| AppError::Catalog(format!("Failed to commit embeddings: {}", e)))?;

    Ok(())
}

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    let sessions_json: String = row.get(10)?;
    let sessions = serde_json::from_str(&sessions_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(Course {
        course_id: row.get(0)?,
        course_code: row.get(1)?,
        section_code: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        division: row.get(5)?,
        prerequisites: row.get(6)?,
        exclusions: row.get(7)?,
        department: row.get(8)?,
        campus: row.get(9)?,
        sessions,
    })
}

fn section_from_row(row: &Row<'_>) -> rusqlite::Result<MeetingSection> {
    let instructors_json: String = row.get(4)?;
    let times_json: String = row.get(5)?;

    let instructors: Vec<String> = serde_json::from_str(&instructors_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e)))?;
    let times: Vec<MeetingTime> = serde_json::from_str(&times_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(MeetingSection {
        course_id: row.get(0)?,
        course_code: row.get(1)?,
        section_code: row.get(2)?,
        section_type: row.get(3)?,
        instructors,
        times,
        size: row.get(6)?,
        enrolment: row.get(7)?,
        notes: row.get(8)?,
    })
}

const COURSE_COLUMNS: &str = "course_id, course_code, section_code, name, description, division, \
                              prerequisites, exclusions, department, campus, sessions";

const SECTION_COLUMNS: &str = "course_id, course_code, section_code, section_type, instructors, \
                               times, size, enrolment, notes";

/// Load every course in insertion order.
pub fn load_courses(conn: &Connection) -> AppResult<Vec<Course>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {} FROM courses ORDER BY rowid", COURSE_COLUMNS))
        .map_err(|e| AppError::Catalog(format!("Failed to prepare query: {}", e)))?;

    let courses = stmt
        .query_map([], course_from_row)
        .map_err(|e| AppError::Catalog(format!("Failed to query courses: {}", e)))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| AppError::Catalog(format!("Failed to read course: {}", e)))?;

    Ok(courses)
}

/// Fetch one course by id.
pub fn get_course(conn: &Connection, course_id: &str) -> AppResult<Option<Course>> {
    conn.query_row(
        &format!("SELECT {} FROM courses WHERE course_id = ?1", COURSE_COLUMNS),
        params![course_id],
        course_from_row,
    )
    .optional()
    .map_err(|e| AppError::Catalog(format!("Failed to load course {}: {}", course_id, e)))
}

/// Meeting sections of a course, ordered by section code.
pub fn sections_for_course(conn: &Connection, course_id: &str) -> AppResult<Vec<MeetingSection>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM meeting_sections WHERE course_id = ?1 ORDER BY section_code",
            SECTION_COLUMNS
        ))
        .map_err(|e| AppError::Catalog(format!("Failed to prepare query: {}", e)))?;

    let sections = stmt
        .query_map(params![course_id], section_from_row)
        .map_err(|e| AppError::Catalog(format!("Failed to query sections: {}", e)))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| AppError::Catalog(format!("Failed to read section: {}", e)))?;

    Ok(sections)
}

/// All vectors stored for a field, as `(course_id, vector)` pairs.
pub fn load_embeddings(conn: &Connection, field: EmbeddingField) -> AppResult<Vec<(String, Vec<f32>)>> {
    let mut stmt = conn
        .prepare("SELECT course_id, vector FROM embeddings WHERE field = ?1 ORDER BY rowid")
        .map_err(|e| AppError::Catalog(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map(params![field.as_str()], |row| {
            let course_id: String = row.get(0)?;
            let bytes: Vec<u8> = row.get(1)?;
            Ok((course_id, bytes))
        })
        .map_err(|e| AppError::Catalog(format!("Failed to query embeddings: {}", e)))?;

    let mut vectors = Vec::new();
    for row in rows {
        let (course_id, bytes) =
            row.map_err(|e| AppError::Catalog(format!("Failed to read embedding: {}", e)))?;
        vectors.push((course_id, bytes_to_embedding(&bytes)?));
    }

    Ok(vectors)
}

/// Counts of courses, sections and courses with a document embedding.
pub fn get_stats(conn: &Connection) -> AppResult<(u64, u64, u64)> {
    let count = |sql: &str, what: &str| -> AppResult<u64> {
        conn.query_row(sql, [], |row| row.get::<_, i64>(0))
            .map(|v| v as u64)
            .map_err(|e| AppError::Catalog(format!("Failed to count {}: {}", what, e)))
    };

    let courses = count("SELECT COUNT(*) FROM courses", "courses")?;
    let sections = count("SELECT COUNT(*) FROM meeting_sections", "meeting sections")?;
    let embedded = count(
        "SELECT COUNT(*) FROM embeddings WHERE field = 'document'",
        "embeddings",
    )?;

    Ok((courses, sections, embedded))
}

/// Course counts per division, largest first.
pub fn division_counts(conn: &Connection) -> AppResult<Vec<DivisionCount>> {
    let mut stmt = conn
        .prepare(
            "SELECT division, COUNT(*) AS n FROM courses
             GROUP BY division ORDER BY n DESC, division ASC",
        )
        .map_err(|e| AppError::Catalog(format!("Failed to prepare query: {}", e)))?;

    let counts = stmt
        .query_map([], |row| {
            Ok(DivisionCount {
                division: row.get(0)?,
                courses: row.get::<_, i64>(1)? as u64,
            })
        })
        .map_err(|e| AppError::Catalog(format!("Failed to count divisions: {}", e)))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| AppError::Catalog(format!("Failed to read division count: {}", e)))?;

    Ok(counts)
}

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO catalog_meta (key, value) VALUES (?1, ?2)",
        params![key, value],
    )
    .map_err(|e| AppError::Catalog(format!("Failed to write catalog metadata: {}", e)))?;
    Ok(())
}

pub fn get_meta(conn: &Connection, key: &str) -> AppResult<Option<String>> {
    conn.query_row(
        "SELECT value FROM catalog_meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| AppError::Catalog(format!("Failed to read catalog metadata: {}", e)))
}

/// Reset the store (delete all data).
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        "DELETE FROM embeddings;
         DELETE FROM meeting_sections;
         DELETE FROM courses;
         DELETE FROM catalog_meta;",
    )
    .map_err(|e| AppError::Catalog(format!("Failed to reset catalog: {}", e)))?;

    tracing::info!("Reset course catalog");
    Ok(())
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Catalog(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    pub(crate) fn sample_course(id: &str, code: &str, division: &str) -> Course {
        Course {
            course_id: id.to_string(),
            course_code: code.to_string(),
            section_code: "F".to_string(),
            name: format!("{} course", code),
            description: format!("Description of {}", code),
            division: division.to_string(),
            prerequisites: String::new(),
            exclusions: String::new(),
            department: Some("Computer Science".to_string()),
            campus: "St. George".to_string(),
            sessions: vec!["20249".to_string()],
        }
    }

    pub(crate) fn sample_section(course_id: &str, code: &str, kind: &str) -> MeetingSection {
        MeetingSection {
            course_id: course_id.to_string(),
            course_code: "CSC000H1".to_string(),
            section_code: code.to_string(),
            section_type: kind.to_string(),
            instructors: vec!["Grace Hopper".to_string()],
            times: vec![MeetingTime {
                day: 1,
                start: "09:00:00".to_string(),
                end: "10:00:00".to_string(),
                location: "MP".to_string(),
            }],
            size: 100,
            enrolment: 90,
            notes: "INPER".to_string(),
        }
    }

    #[test]
    fn test_init_index() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = init_index(temp_file.path()).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 4);
    }

    #[test]
    fn test_course_round_trip() {
        let conn = init_in_memory().unwrap();
        let mut course = sample_course("1", "CSC108H1", "Arts and Science");
        course.department = None;
        insert_course(&conn, &course).unwrap();

        assert_eq!(get_course(&conn, "1").unwrap(), Some(course));
        assert_eq!(get_course(&conn, "missing").unwrap(), None);
    }

    #[test]
    fn test_sections_for_course() {
        let conn = init_in_memory().unwrap();
        insert_section(&conn, &sample_section("1", "TUT0101", "Tutorial")).unwrap();
        insert_section(&conn, &sample_section("1", "LEC0101", "Lecture")).unwrap();
        insert_section(&conn, &sample_section("2", "LEC0101", "Lecture")).unwrap();

        let sections = sections_for_course(&conn, "1").unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].section_code, "LEC0101");
        assert_eq!(sections[0].times[0].location, "MP");

        assert_eq!(sections_for_course(&conn, "2").unwrap().len(), 1);
    }

    #[test]
    fn test_store_catalog_and_stats() {
        let mut conn = init_in_memory().unwrap();
        let courses = vec![
            sample_course("1", "CSC108H1", "Arts and Science"),
            sample_course("2", "MAT137Y1", "Arts and Science"),
            sample_course("3", "APS100H1", "Engineering"),
        ];
        let sections = vec![sample_section("1", "LEC0101", "Lecture")];
        store_catalog(&mut conn, &courses, &sections).unwrap();
        upsert_embedding(&conn, "1", EmbeddingField::Document, &[1.0, 0.0]).unwrap();
        upsert_embedding(&conn, "1", EmbeddingField::Name, &[1.0, 0.0]).unwrap();

        assert_eq!(get_stats(&conn).unwrap(), (3, 1, 1));

        let divisions = division_counts(&conn).unwrap();
        assert_eq!(
            divisions,
            vec![
                DivisionCount {
                    division: "Arts and Science".to_string(),
                    courses: 2
                },
                DivisionCount {
                    division: "Engineering".to_string(),
                    courses: 1
                },
            ]
        );

        let loaded = load_courses(&conn).unwrap();
        let ids: Vec<_> = loaded.iter().map(|c| c.course_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_embeddings_round_trip() {
        let conn = init_in_memory().unwrap();
        upsert_embedding(&conn, "1", EmbeddingField::Description, &[0.25, -1.5, 3.0]).unwrap();
        upsert_embedding(&conn, "1", EmbeddingField::Description, &[0.5, 0.5, 0.5]).unwrap();

        let vectors = load_embeddings(&conn, EmbeddingField::Description).unwrap();
        assert_eq!(vectors, vec![("1".to_string(), vec![0.5, 0.5, 0.5])]);
        assert!(load_embeddings(&conn, EmbeddingField::Name).unwrap().is_empty());
    }

    #[test]
    fn test_meta_and_reset() {
        let conn = init_in_memory().unwrap();
        insert_course(&conn, &sample_course("1", "CSC108H1", "A")).unwrap();
        set_meta(&conn, "embedding.model", "trigram-v1").unwrap();
        assert_eq!(
            get_meta(&conn, "embedding.model").unwrap().as_deref(),
            Some("trigram-v1")
        );

        reset_index(&conn).unwrap();
        assert_eq!(get_stats(&conn).unwrap(), (0, 0, 0));
        assert_eq!(get_meta(&conn, "embedding.model").unwrap(), None);
    }

    #[test]
    fn test_bytes_to_embedding_rejects_bad_length() {
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());
        assert_eq!(
            bytes_to_embedding(&embedding_to_bytes(&[1.0, 2.0])).unwrap(),
            vec![1.0, 2.0]
        );
    }
}
