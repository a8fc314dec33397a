use serde::Serialize;
use std::collections::BTreeSet;

use crate::curriculum::{CurriculumIndex, module_progress, percent, week_progress};
use url::Url;

use crate::model::{Course, LessonId};

/// Call-to-action shown on a course card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResumeLabel {
    #[serde(rename = "Get Started")]
    GetStarted,
    Resume,
}

/// Where a student should pick up a course, plus completion ratios at every level.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeState {
    /// `None` only when the course has no lessons.
    pub next_flat_index: Option<usize>,
    pub next_lesson_id: Option<LessonId>,
    /// Video of the resume target, when one is authored.
    pub next_video_url: Option<Url>,
    pub week_progress: Vec<f64>,
    pub module_progress: Vec<Vec<f64>>,
    pub course_progress: f64,
    pub course_percent: u8,
    pub completed_count: usize,
    pub total_lessons: usize,
    pub all_complete: bool,
    pub label: Option<ResumeLabel>,
}

/// Pure resolver over a course snapshot and a completed set.
pub struct ResumeResolver;

impl ResumeResolver {
    /// Resolve the resume target and progress ratios.
    ///
    /// The target is the first lesson (document order) not in `completed`. When
    /// every lesson is complete the target wraps to index 0.
    #[must_use]
    pub fn resolve(course: &Course, completed: &BTreeSet<LessonId>) -> ResumeState {
        let index = CurriculumIndex::build(course);
        Self::resolve_with_index(course, &index, completed)
    }

    /// Same as `resolve` for callers that already built the index.
    #[must_use]
    pub fn resolve_with_index(
        course: &Course,
        index: &CurriculumIndex,
        completed: &BTreeSet<LessonId>,
    ) -> ResumeState {
        let first_incomplete = index.first_incomplete(completed);
        let next_flat_index = if index.is_empty() {
            None
        } else {
            Some(first_incomplete.unwrap_or(0))
        };
        let next_lesson_id = next_flat_index
            .and_then(|flat| index.get(flat))
            .map(|l| l.lesson_id.clone());
        let next_video_url = next_lesson_id
            .as_ref()
            .and_then(|id| course.lesson(id))
            .and_then(|lesson| lesson.video_url());

        let week_ratios = course
            .weeks
            .iter()
            .map(|week| week_progress(week, completed))
            .collect();
        let module_ratios = course
            .weeks
            .iter()
            .map(|week| {
                week.modules
                    .iter()
                    .map(|module| module_progress(module, completed))
                    .collect()
            })
            .collect();

        let total_lessons = index.len();
        let completed_count = index
            .lessons()
            .iter()
            .filter(|l| completed.contains(&l.lesson_id))
            .count();
        let course_progress = index.course_progress(completed);
        let course_percent = percent(course_progress);
        let label = if index.is_empty() {
            None
        } else if course_percent > 0 {
            Some(ResumeLabel::Resume)
        } else {
            Some(ResumeLabel::GetStarted)
        };

        ResumeState {
            next_flat_index,
            next_lesson_id,
            next_video_url,
            week_progress: week_ratios,
            module_progress: module_ratios,
            course_progress,
            course_percent,
            completed_count,
            total_lessons,
            all_complete: total_lessons > 0 && first_incomplete.is_none(),
            label,
        }
    }
}
