use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::model::ids::{CourseId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("lesson id {0} appears more than once in the course")]
    DuplicateLessonId(LessonId),

    #[error("lesson {lesson} has a malformed video url: {raw}")]
    InvalidVideoUrl { lesson: LessonId, raw: String },
}

//
// ─── DOCUMENT ──────────────────────────────────────────────────────────────────
//

/// A course document as published by course authoring.
///
/// Missing `weeks`/`modules`/`lessons` arrays deserialize as empty so that
/// partially authored courses are still readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub weeks: Vec<Week>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    pub week_number: u32,
    #[serde(default)]
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl Lesson {
    #[must_use]
    pub fn new(id: LessonId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            duration: None,
            video_url: None,
        }
    }

    /// Parsed video location. Malformed values read as `None`; `Course::validate`
    /// keeps them out of stored courses.
    #[must_use]
    pub fn video_url(&self) -> Option<Url> {
        self.video_url.as_deref().and_then(|raw| Url::parse(raw).ok())
    }
}

impl Module {
    #[must_use]
    pub fn new(title: impl Into<String>, lessons: Vec<Lesson>) -> Self {
        Self {
            title: title.into(),
            content: String::new(),
            lessons,
        }
    }
}

impl Week {
    #[must_use]
    pub fn new(week_number: u32, modules: Vec<Module>) -> Self {
        Self {
            week_number,
            modules,
        }
    }

    /// Number of lessons across every module in this week.
    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}

impl Course {
    #[must_use]
    pub fn new(id: CourseId, title: impl Into<String>, weeks: Vec<Week>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            weeks,
        }
    }

    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.weeks.iter().map(Week::lesson_count).sum()
    }

    /// Iterate every lesson in document order.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.weeks
            .iter()
            .flat_map(|w| w.modules.iter())
            .flat_map(|m| m.lessons.iter())
    }

    #[must_use]
    pub fn lesson(&self, id: &LessonId) -> Option<&Lesson> {
        self.lessons().find(|lesson| &lesson.id == id)
    }

    #[must_use]
    pub fn contains_lesson(&self, id: &LessonId) -> bool {
        self.lesson(id).is_some()
    }

    /// Check authoring invariants before the course is stored.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if the title is blank, a lesson id repeats, or a
    /// video url does not parse.
    pub fn validate(&self) -> Result<(), CourseError> {
        if self.title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        let mut seen = HashSet::new();
        for lesson in self.lessons() {
            if !seen.insert(&lesson.id) {
                return Err(CourseError::DuplicateLessonId(lesson.id.clone()));
            }
            if let Some(raw) = lesson.video_url.as_deref() {
                if Url::parse(raw).is_err() {
                    return Err(CourseError::InvalidVideoUrl {
                        lesson: lesson.id.clone(),
                        raw: raw.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(id: &str, title: &str) -> Lesson {
        Lesson::new(LessonId::new(id).unwrap(), title)
    }

    #[test]
    fn missing_arrays_deserialize_as_empty() {
        let raw = r#"{
            "id": "c1",
            "title": "Rust",
            "weeks": [
                { "weekNumber": 1 },
                { "weekNumber": 2, "modules": [ { "title": "Ownership" } ] }
            ]
        }"#;
        let course: Course = serde_json::from_str(raw).unwrap();
        assert_eq!(course.weeks.len(), 2);
        assert!(course.weeks[0].modules.is_empty());
        assert!(course.weeks[1].modules[0].lessons.is_empty());
        assert_eq!(course.lesson_count(), 0);
    }

    #[test]
    fn course_without_weeks_is_readable() {
        let course: Course = serde_json::from_str(r#"{"id":"c1","title":"Empty"}"#).unwrap();
        assert!(course.weeks.is_empty());
        assert!(course.validate().is_ok());
    }

    #[test]
    fn duplicate_titles_are_allowed_but_duplicate_ids_are_not() {
        let same_title = Course::new(
            CourseId::new("c1").unwrap(),
            "Rust",
            vec![Week::new(
                1,
                vec![Module::new(
                    "M",
                    vec![lesson("a", "Intro"), lesson("b", "Intro")],
                )],
            )],
        );
        assert!(same_title.validate().is_ok());

        let same_id = Course::new(
            CourseId::new("c1").unwrap(),
            "Rust",
            vec![Week::new(
                1,
                vec![Module::new("M", vec![lesson("a", "One"), lesson("a", "Two")])],
            )],
        );
        assert_eq!(
            same_id.validate(),
            Err(CourseError::DuplicateLessonId(LessonId::new("a").unwrap()))
        );
    }

    #[test]
    fn malformed_video_url_fails_validation() {
        let mut l = lesson("a", "Intro");
        l.video_url = Some("not a url".into());
        assert!(l.video_url().is_none());
        let course = Course::new(
            CourseId::new("c1").unwrap(),
            "Rust",
            vec![Week::new(1, vec![Module::new("M", vec![l.clone()])])],
        );
        assert!(matches!(
            course.validate(),
            Err(CourseError::InvalidVideoUrl { .. })
        ));

        l.video_url = Some("https://cdn.example.com/v/1.mp4".into());
        assert_eq!(l.video_url().unwrap().host_str(), Some("cdn.example.com"));
    }
}
