//! Conversion of raw timetable export pages into catalog records.
//!
//! The export is a directory of pages `1.json … N.json`, each holding
//! `payload.pageableCourse.courses[]`.

use crate::types::{Course, MeetingSection, MeetingTime};
use advisor_core::{AppError, AppResult};
use chrono::NaiveTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct RawPage {
    payload: RawPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPayload {
    pageable_course: RawPageableCourse,
}

#[derive(Debug, Deserialize)]
struct RawPageableCourse {
    #[serde(default)]
    courses: Vec<RawCourse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCourse {
    id: serde_json::Value,
    code: String,
    #[serde(default)]
    section_code: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    department: Option<RawDepartment>,
    #[serde(default)]
    campus: Option<String>,
    #[serde(default)]
    sessions: Option<Vec<String>>,
    #[serde(default)]
    cm_course_info: Option<RawCourseInfo>,
    #[serde(default)]
    sections: Option<Vec<RawSection>>,
}

#[derive(Debug, Deserialize)]
struct RawDepartment {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCourseInfo {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    division: Option<String>,
    #[serde(default)]
    prerequisites_text: Option<String>,
    #[serde(default)]
    exclusions_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSection {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    section_type: Option<String>,
    #[serde(default)]
    instructors: Option<Vec<RawInstructor>>,
    #[serde(default)]
    meeting_times: Option<Vec<RawMeetingTime>>,
    #[serde(default)]
    max_enrolment: Option<u32>,
    #[serde(default)]
    current_enrolment: Option<u32>,
    #[serde(default)]
    delivery_modes: Option<Vec<RawDeliveryMode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInstructor {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMeetingTime {
    start: RawTimePoint,
    end: RawTimePoint,
    #[serde(default)]
    building: Option<RawBuilding>,
}

#[derive(Debug, Deserialize)]
struct RawTimePoint {
    #[serde(default)]
    day: Option<u32>,
    #[serde(default)]
    millisofday: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBuilding {
    #[serde(default)]
    building_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDeliveryMode {
    #[serde(default)]
    mode: Option<String>,
}

/// Courses and sections extracted from an export.
#[derive(Debug, Default)]
pub struct TransformedCatalog {
    pub pages: u32,
    pub courses: Vec<Course>,
    pub meeting_sections: Vec<MeetingSection>,
}

/// Format milliseconds since midnight as `HH:MM:SS`.
///
/// Values past 24h wrap around, as a wall clock would.
pub fn millis_to_time(millis: u64) -> String {
    let seconds = ((millis / 1000) % 86_400) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "00:00:00".to_string())
}

/// Parse one export page.
pub fn transform_page(json: &str) -> AppResult<(Vec<Course>, Vec<MeetingSection>)> {
    let page: RawPage = serde_json::from_str(json)
        .map_err(|e| AppError::Catalog(format!("Invalid timetable page: {}", e)))?;

    let mut courses = Vec::with_capacity(page.payload.pageable_course.courses.len());
    let mut sections = Vec::new();

    for raw in page.payload.pageable_course.courses {
        let course_id = match &raw.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        let info = raw.cm_course_info.unwrap_or_default();

        for section in raw.sections.unwrap_or_default() {
            sections.push(transform_section(&course_id, &raw.code, section));
        }

        courses.push(Course {
            course_id,
            course_code: raw.code,
            section_code: raw.section_code.unwrap_or_default(),
            name: raw.name.unwrap_or_default(),
            description: info.description.unwrap_or_default(),
            division: info.division.unwrap_or_default(),
            prerequisites: info.prerequisites_text.unwrap_or_default(),
            exclusions: info.exclusions_text.unwrap_or_default(),
            department: raw.department.and_then(|d| d.name),
            campus: raw.campus.unwrap_or_default(),
            sessions: raw.sessions.unwrap_or_default(),
        });
    }

    Ok((courses, sections))
}

fn transform_section(course_id: &str, course_code: &str, raw: RawSection) -> MeetingSection {
    let instructors = raw
        .instructors
        .unwrap_or_default()
        .into_iter()
        .map(|i| {
            format!(
                "{} {}",
                i.first_name.unwrap_or_default(),
                i.last_name.unwrap_or_default()
            )
            .trim()
            .to_string()
        })
        .collect();

    let times = raw
        .meeting_times
        .unwrap_or_default()
        .into_iter()
        .map(|t| MeetingTime {
            day: t.start.day.unwrap_or(0),
            start: millis_to_time(t.start.millisofday),
            end: millis_to_time(t.end.millisofday),
            location: t
                .building
                .and_then(|b| b.building_code)
                .unwrap_or_default(),
        })
        .collect();

    let notes = raw
        .delivery_modes
        .and_then(|modes| modes.into_iter().next())
        .and_then(|m| m.mode)
        .unwrap_or_default();

    MeetingSection {
        course_id: course_id.to_string(),
        course_code: course_code.to_string(),
        section_code: raw.name.unwrap_or_default(),
        section_type: raw.section_type.unwrap_or_default(),
        instructors,
        times,
        size: raw.max_enrolment.unwrap_or(0),
        enrolment: raw.current_enrolment.unwrap_or(0),
        notes,
    }
}

/// List the numbered pages of an export in numeric order.
pub fn list_pages(source_dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !source_dir.is_dir() {
        return Err(AppError::Catalog(format!(
            "Source directory not found: {:?}",
            source_dir
        )));
    }

    let mut pages: Vec<(u32, PathBuf)> = walkdir::WalkDir::new(source_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let path = e.into_path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                return None;
            }
            let number = path.file_stem()?.to_str()?.parse::<u32>().ok()?;
            Some((number, path))
        })
        .collect();

    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// Read and transform every page of an export.
pub fn load_catalog_dir(source_dir: &Path) -> AppResult<TransformedCatalog> {
    let mut catalog = TransformedCatalog::default();

    for page_path in list_pages(source_dir)? {
        let contents = std::fs::read_to_string(&page_path)?;
        let (courses, sections) = transform_page(&contents)
            .map_err(|e| AppError::Catalog(format!("{:?}: {}", page_path, e)))?;

        tracing::debug!(
            "Transformed {:?}: {} courses, {} sections",
            page_path,
            courses.len(),
            sections.len()
        );

        catalog.pages += 1;
        catalog.courses.extend(courses);
        catalog.meeting_sections.extend(sections);
    }

    Ok(catalog)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    pub(crate) const SAMPLE_PAGE: &str = r#"{
      "payload": {
        "pageableCourse": {
          "courses": [
            {
              "id": "62012",
              "code": "CSC311H1",
              "sectionCode": "F",
              "name": "Introduction to Machine Learning",
              "department": {"name": "Computer Science"},
              "campus": "St. George",
              "sessions": ["20249"],
              "cmCourseInfo": {
                "description": "An introduction to methods for automated learning of relationships on the basis of empirical data.",
                "division": "Faculty of Arts and Science",
                "prerequisitesText": "CSC207H1, MAT235Y1",
                "exclusionsText": "CSC411H1"
              },
              "sections": [
                {
                  "name": "LEC0101",
                  "type": "Lecture",
                  "instructors": [{"firstName": "Ada", "lastName": "Lovelace"}],
                  "meetingTimes": [
                    {"start": {"day": 2, "millisofday": 36000000}, "end": {"day": 2, "millisofday": 39600000}, "building": {"buildingCode": "BA"}}
                  ],
                  "maxEnrolment": 200,
                  "currentEnrolment": 180,
                  "deliveryModes": [{"mode": "INPER"}]
                },
                {
                  "name": "TUT0101",
                  "type": "Tutorial",
                  "meetingTimes": [],
                  "deliveryModes": []
                }
              ]
            },
            {
              "id": 70001,
              "code": "HIS101H5",
              "sectionCode": "S",
              "name": "Global History",
              "department": null,
              "campus": "Mississauga",
              "sessions": ["20251"],
              "cmCourseInfo": null,
              "sections": []
            }
          ]
        }
      }
    }"#;

    #[test]
    fn test_millis_to_time() {
        assert_eq!(millis_to_time(0), "00:00:00");
        assert_eq!(millis_to_time(36_000_000), "10:00:00");
        assert_eq!(millis_to_time(48_600_500), "13:30:00");
        assert_eq!(millis_to_time(86_400_000 + 60_000), "00:01:00");
    }

    #[test]
    fn test_transform_page_extracts_courses() {
        let (courses, sections) = transform_page(SAMPLE_PAGE).unwrap();
        assert_eq!(courses.len(), 2);

        let csc = &courses[0];
        assert_eq!(csc.course_id, "62012");
        assert_eq!(csc.department.as_deref(), Some("Computer Science"));
        assert_eq!(csc.prerequisites, "CSC207H1, MAT235Y1");
        assert_eq!(csc.sessions, vec!["20249".to_string()]);

        let his = &courses[1];
        assert_eq!(his.course_id, "70001");
        assert!(his.department.is_none());
        assert!(his.description.is_empty());
        assert!(his.division.is_empty());

        assert_eq!(sections.len(), 2);
        let lecture = &sections[0];
        assert_eq!(lecture.course_id, "62012");
        assert_eq!(lecture.instructors, vec!["Ada Lovelace".to_string()]);
        assert_eq!(lecture.times[0].start, "10:00:00");
        assert_eq!(lecture.times[0].end, "11:00:00");
        assert_eq!(lecture.times[0].location, "BA");
        assert_eq!(lecture.notes, "INPER");

        let tutorial = &sections[1];
        assert_eq!(tutorial.size, 0);
        assert!(tutorial.notes.is_empty());
    }

    #[test]
    fn test_transform_rejects_wrong_shape() {
        let err = transform_page(r#"{"payload": {}}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid timetable page"));
    }

    #[test]
    fn test_pages_load_in_numeric_order() {
        let temp = TempDir::new().unwrap();
        for n in [10, 2, 1] {
            fs::write(temp.path().join(format!("{}.json", n)), "{}").unwrap();
        }
        fs::write(temp.path().join("notes.txt"), "skip").unwrap();
        fs::write(temp.path().join("summary.json"), "{}").unwrap();

        let pages = list_pages(temp.path()).unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["1.json", "2.json", "10.json"]);
    }

    #[test]
    fn test_load_catalog_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("1.json"), SAMPLE_PAGE).unwrap();

        let catalog = load_catalog_dir(temp.path()).unwrap();
        assert_eq!(catalog.pages, 1);
        assert_eq!(catalog.courses.len(), 2);
        assert_eq!(catalog.meeting_sections.len(), 2);
    }

    #[test]
    fn test_missing_source_dir() {
        assert!(list_pages(Path::new("/definitely/not/here")).is_err());
    }
}
