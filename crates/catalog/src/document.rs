//! Text rendering of courses for embedding, filtering and recommendation.

use crate::types::{Course, CourseRecord, EmbeddingField, MeetingSection};
use std::collections::BTreeMap;

const NOT_AVAILABLE: &str = "N/A";
const NO_PREREQUISITES: &str = "No prerequisites";
const NO_EXCLUSIONS: &str = "No exclusions";

/// Section type attached to recommendations.
pub const LECTURE: &str = "Lecture";

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "null" {
        default
    } else {
        value
    }
}

fn sessions_text(course: &Course) -> String {
    course.sessions.join(", ")
}

/// One-line description of a meeting section.
///
/// `Section: LEC0101, Type: Lecture, Instructors: A B, Times: Day 2, 10:00:00-11:00:00 at BA, Class Size: 200`
pub fn format_meeting_section(section: &MeetingSection) -> String {
    let times = section
        .times
        .iter()
        .map(|t| {
            format!(
                "Day {}, {}-{} at {}",
                t.day,
                or_default(&t.start, NOT_AVAILABLE),
                or_default(&t.end, NOT_AVAILABLE),
                or_default(&t.location, NOT_AVAILABLE)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Section: {}, Type: {}, Instructors: {}, Times: {}, Class Size: {}",
        or_default(&section.section_code, NOT_AVAILABLE),
        or_default(&section.section_type, NOT_AVAILABLE),
        section.instructors.join(", "),
        times,
        section.size
    )
}

/// Formatted lecture sections of a course.
pub fn lecture_sections(sections: &[MeetingSection]) -> Vec<String> {
    sections
        .iter()
        .filter(|s| s.section_type == LECTURE)
        .map(format_meeting_section)
        .collect()
}

/// Session codes with their term names, e.g. `20249 (Fall 2024)`.
fn described_sessions(course: &Course) -> String {
    course
        .sessions
        .iter()
        .map(|code| {
            let name = describe_session(code);
            if name == code.trim() {
                name
            } else {
                format!("{} ({})", code.trim(), name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Descriptive paragraph embedded as the course's document vector.
pub fn render_course_document(course: &Course, sections: &[MeetingSection]) -> String {
    let code = or_default(&course.course_code, NOT_AVAILABLE);
    let department_code: String = code.chars().take(3).collect();
    let sessions = described_sessions(course);
    let meeting_info = lecture_sections(sections).join("\n");

    format!(
        "This course {code} - '{name}' is offered by the {department} department in the {division}.\n\
         Course Description: {description}\n\
         Understanding the course code: {code}: The first three letters represent the department ({department_code}), \
         and the section code {section_code} indicates when it's offered - 'F' means Fall semester (September-December), \
         'S' means Winter semester (January-April), and 'Y' means full year course.\n\
         Prerequisites required: {prerequisites}\n\
         Exclusions: {exclusions}\n\
         This course is offered at the {campus} campus during these sessions: {sessions}.\n\
         Meeting Sections: {meeting_info}",
        code = code,
        name = or_default(&course.name, NOT_AVAILABLE),
        department = or_default(course.department.as_deref().unwrap_or(""), NOT_AVAILABLE),
        division = or_default(&course.division, NOT_AVAILABLE),
        description = or_default(&course.description, NOT_AVAILABLE),
        department_code = department_code,
        section_code = or_default(&course.section_code, NOT_AVAILABLE),
        prerequisites = or_default(&course.prerequisites, NO_PREREQUISITES),
        exclusions = or_default(&course.exclusions, NO_EXCLUSIONS),
        campus = or_default(&course.campus, NOT_AVAILABLE),
        sessions = or_default(&sessions, NOT_AVAILABLE),
        meeting_info = or_default(&meeting_info, NOT_AVAILABLE),
    )
}

/// Text embedded for a single field of a course.
pub fn field_text(course: &Course, sections: &[MeetingSection], field: EmbeddingField) -> String {
    match field {
        EmbeddingField::Document => render_course_document(course, sections),
        EmbeddingField::Name => or_default(&course.name, NOT_AVAILABLE).to_string(),
        EmbeddingField::Description => or_default(&course.description, NOT_AVAILABLE).to_string(),
        EmbeddingField::Prerequisites => {
            or_default(&course.prerequisites, NO_PREREQUISITES).to_string()
        }
    }
}

/// Flat metadata used by retrieval filters.
///
/// Empty values are replaced with readable placeholders so that filters
/// never compare against an empty string.
pub fn course_metadata(course: &Course, sections: &[MeetingSection]) -> BTreeMap<String, String> {
    let sessions = sessions_text(course);
    let meeting_info = lecture_sections(sections).join("\n");

    let entries = [
        ("course_id", course.course_id.as_str(), "No Course ID"),
        ("course_code", course.course_code.as_str(), "No Course Code"),
        ("name", course.name.as_str(), "No Course Name"),
        (
            "department",
            course.department.as_deref().unwrap_or(""),
            "No Department Information",
        ),
        ("division", course.division.as_str(), "No Division Information"),
        ("campus", course.campus.as_str(), "No Campus Information"),
        ("section_code", course.section_code.as_str(), "No Section Code"),
        ("prerequisites", course.prerequisites.as_str(), "No Prerequisites"),
        ("exclusions", course.exclusions.as_str(), "No Exclusions"),
        ("sessions", sessions.as_str(), "No Session Information"),
        ("meeting_info", meeting_info.as_str(), "No Meeting Information"),
        ("description", course.description.as_str(), "No Description Available"),
    ];

    entries
        .iter()
        .map(|(key, value, default)| (key.to_string(), or_default(value, default).to_string()))
        .collect()
}

/// Recommendation-facing record of a course with its lecture sections.
pub fn course_record(course: &Course, sections: &[MeetingSection]) -> CourseRecord {
    let sessions = sessions_text(course);

    CourseRecord {
        course_code: or_default(&course.course_code, NOT_AVAILABLE).to_string(),
        name: or_default(&course.name, NOT_AVAILABLE).to_string(),
        department: or_default(course.department.as_deref().unwrap_or(""), NOT_AVAILABLE)
            .to_string(),
        division: or_default(&course.division, NOT_AVAILABLE).to_string(),
        description: or_default(&course.description, NOT_AVAILABLE).to_string(),
        prerequisites: or_default(&course.prerequisites, NO_PREREQUISITES).to_string(),
        exclusions: or_default(&course.exclusions, NO_EXCLUSIONS).to_string(),
        campus: or_default(&course.campus, NOT_AVAILABLE).to_string(),
        section_code: or_default(&course.section_code, NOT_AVAILABLE).to_string(),
        sessions: or_default(&sessions, NOT_AVAILABLE).to_string(),
        meeting_sections: lecture_sections(sections),
    }
}

/// Human-readable name of a session code: `"20249"` is `"Fall 2024"`.
///
/// Codes that do not follow the `YYYYT` pattern are returned unchanged.
pub fn describe_session(code: &str) -> String {
    let code = code.trim();
    if code.len() != 5 || !code.chars().all(|c| c.is_ascii_digit()) {
        return code.to_string();
    }

    let (year, term) = code.split_at(4);
    let season = match term {
        "9" => "Fall",
        "1" => "Winter",
        "5" => "Summer",
        _ => return code.to_string(),
    };

    format!("{} {}", season, year)
}
