//! Flattening of a course's week → module → lesson tree.
//!
//! The flat index of a lesson is its 0-based position in a depth-first walk of
//! the document. Every `(week, module, lesson)` triple maps to exactly one flat
//! index and back.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::model::{Course, LessonId, Module, Week};

/// Position of a single lesson within the course tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRef {
    pub week_idx: usize,
    pub module_idx: usize,
    pub lesson_idx: usize,
    pub lesson_id: LessonId,
}

/// Ordered, derived view of a course. Cheap to rebuild per request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurriculumIndex {
    lessons: Vec<LessonRef>,
    // module_starts[w][m] is the flat index of the first lesson of that module.
    module_starts: Vec<Vec<usize>>,
    module_lens: Vec<Vec<usize>>,
}

impl CurriculumIndex {
    #[must_use]
    pub fn build(course: &Course) -> Self {
        let mut lessons = Vec::with_capacity(course.lesson_count());
        let mut module_starts = Vec::with_capacity(course.weeks.len());
        let mut module_lens = Vec::with_capacity(course.weeks.len());

        for (week_idx, week) in course.weeks.iter().enumerate() {
            let mut starts = Vec::with_capacity(week.modules.len());
            let mut lens = Vec::with_capacity(week.modules.len());
            for (module_idx, module) in week.modules.iter().enumerate() {
                starts.push(lessons.len());
                lens.push(module.lessons.len());
                for (lesson_idx, lesson) in module.lessons.iter().enumerate() {
                    lessons.push(LessonRef {
                        week_idx,
                        module_idx,
                        lesson_idx,
                        lesson_id: lesson.id.clone(),
                    });
                }
            }
            module_starts.push(starts);
            module_lens.push(lens);
        }

        Self {
            lessons,
            module_starts,
            module_lens,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    /// No lessons at all: nothing to resume.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    #[must_use]
    pub fn lessons(&self) -> &[LessonRef] {
        &self.lessons
    }

    /// Lesson at flat index `flat`.
    #[must_use]
    pub fn get(&self, flat: usize) -> Option<&LessonRef> {
        self.lessons.get(flat)
    }

    #[must_use]
    pub fn flat_index_of(&self, week_idx: usize, module_idx: usize, lesson_idx: usize) -> Option<usize> {
        let len = *self.module_lens.get(week_idx)?.get(module_idx)?;
        if lesson_idx >= len {
            return None;
        }
        Some(self.module_starts[week_idx][module_idx] + lesson_idx)
    }

    /// Flat index of the first lesson carrying `lesson_id`.
    #[must_use]
    pub fn position_of(&self, lesson_id: &LessonId) -> Option<usize> {
        self.lessons.iter().position(|l| &l.lesson_id == lesson_id)
    }

    #[must_use]
    pub fn contains(&self, lesson_id: &LessonId) -> bool {
        self.position_of(lesson_id).is_some()
    }

    /// The lesson that follows `flat` in document order, if any.
    #[must_use]
    pub fn next_after(&self, flat: usize) -> Option<&LessonRef> {
        self.lessons.get(flat.checked_add(1)?)
    }

    /// The lesson that precedes `flat` in document order, if any.
    #[must_use]
    pub fn previous_before(&self, flat: usize) -> Option<&LessonRef> {
        self.lessons.get(flat.checked_sub(1)?)
    }

    /// Flat index of the first lesson not yet in `completed`.
    #[must_use]
    pub fn first_incomplete(&self, completed: &BTreeSet<LessonId>) -> Option<usize> {
        self.lessons
            .iter()
            .position(|l| !completed.contains(&l.lesson_id))
    }

    /// Flat index of the first incomplete lesson in week `week_idx`.
    #[must_use]
    pub fn first_incomplete_in_week(
        &self,
        week_idx: usize,
        completed: &BTreeSet<LessonId>,
    ) -> Option<usize> {
        self.lessons
            .iter()
            .position(|l| l.week_idx == week_idx && !completed.contains(&l.lesson_id))
    }

    /// Fraction of the whole course that is complete.
    #[must_use]
    pub fn course_progress(&self, completed: &BTreeSet<LessonId>) -> f64 {
        ratio(
            self.lessons
                .iter()
                .filter(|l| completed.contains(&l.lesson_id))
                .count(),
            self.lessons.len(),
        )
    }
}

/// `done / total`, defined as 0 for an empty container.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ratio(done: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        done as f64 / total as f64
    }
}

/// Converts a ratio to a whole percentage capped at 100.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percent(ratio: f64) -> u8 {
    if !ratio.is_finite() || ratio <= 0.0 {
        return 0;
    }
    (ratio * 100.0).round().min(100.0) as u8
}

#[must_use]
pub fn module_progress(module: &Module, completed: &BTreeSet<LessonId>) -> f64 {
    let done = module
        .lessons
        .iter()
        .filter(|l| completed.contains(&l.id))
        .count();
    ratio(done, module.lessons.len())
}

#[must_use]
pub fn week_progress(week: &Week, completed: &BTreeSet<LessonId>) -> f64 {
    let done = week
        .modules
        .iter()
        .flat_map(|m| m.lessons.iter())
        .filter(|l| completed.contains(&l.id))
        .count();
    ratio(done, week.lesson_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, Lesson};

    fn lid(id: &str) -> LessonId {
        LessonId::new(id).unwrap()
    }

    fn module(title: &str, ids: &[&str]) -> Module {
        Module::new(title, ids.iter().map(|id| Lesson::new(lid(id), *id)).collect())
    }

    fn course(weeks: Vec<Week>) -> Course {
        Course::new(CourseId::new("c1").unwrap(), "Course", weeks)
    }

    fn sample() -> Course {
        course(vec![
            Week::new(1, vec![module("m1", &["a", "b"]), module("m2", &[])]),
            Week::new(2, vec![]),
            Week::new(3, vec![module("m3", &["c"]), module("m4", &["d", "e", "f"])]),
        ])
    }

    #[test]
    fn flattening_is_depth_first_in_document_order() {
        let index = CurriculumIndex::build(&sample());
        let ids: Vec<_> = index.lessons().iter().map(|l| l.lesson_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c", "d", "e", "f"]);
        assert_eq!(index.len(), sample().lesson_count());
    }

    #[test]
    fn flat_index_round_trips_every_triple() {
        let c = sample();
        let index = CurriculumIndex::build(&c);
        let mut seen = BTreeSet::new();
        for (w, week) in c.weeks.iter().enumerate() {
            for (m, module) in week.modules.iter().enumerate() {
                for (l, lesson) in module.lessons.iter().enumerate() {
                    let flat = index.flat_index_of(w, m, l).unwrap();
                    assert!(seen.insert(flat), "flat index {flat} reused");
                    let back = index.get(flat).unwrap();
                    assert_eq!((back.week_idx, back.module_idx, back.lesson_idx), (w, m, l));
                    assert_eq!(back.lesson_id, lesson.id);
                }
            }
        }
        assert_eq!(seen.len(), index.len());
        assert_eq!(seen.iter().copied().collect::<Vec<_>>(), (0..index.len()).collect::<Vec<_>>());
    }

    #[test]
    fn out_of_range_triples_have_no_flat_index() {
        let index = CurriculumIndex::build(&sample());
        assert_eq!(index.flat_index_of(0, 1, 0), None);
        assert_eq!(index.flat_index_of(1, 0, 0), None);
        assert_eq!(index.flat_index_of(0, 0, 2), None);
        assert_eq!(index.flat_index_of(9, 0, 0), None);
        assert_eq!(index.flat_index_of(2, 1, 2), Some(5));
    }

    #[test]
    fn empty_course_yields_empty_index() {
        let index = CurriculumIndex::build(&course(Vec::new()));
        assert!(index.is_empty());
        assert_eq!(index.first_incomplete(&BTreeSet::new()), None);
        assert_eq!(index.course_progress(&BTreeSet::new()), 0.0);
    }

    #[test]
    fn empty_containers_report_zero_progress() {
        let c = sample();
        let completed: BTreeSet<_> = [lid("a"), lid("b")].into_iter().collect();
        let empty_module = &c.weeks[0].modules[1];
        let empty_week = &c.weeks[1];
        let p = module_progress(empty_module, &completed);
        assert_eq!(p, 0.0);
        assert!(!p.is_nan());
        assert_eq!(week_progress(empty_week, &completed), 0.0);
        assert_eq!(week_progress(&c.weeks[0], &completed), 1.0);
    }

    #[test]
    fn unknown_completed_ids_do_not_inflate_progress() {
        let c = sample();
        let index = CurriculumIndex::build(&c);
        let completed: BTreeSet<_> = [lid("a"), lid("zzz"), lid("yyy")].into_iter().collect();
        assert!((index.course_progress(&completed) - 1.0 / 6.0).abs() < 1e-9);
        assert_eq!(percent(index.course_progress(&completed)), 17);
    }

    #[test]
    fn first_incomplete_in_week_scopes_to_week() {
        let index = CurriculumIndex::build(&sample());
        let completed: BTreeSet<_> = [lid("c")].into_iter().collect();
        assert_eq!(index.first_incomplete_in_week(0, &completed), Some(0));
        assert_eq!(index.first_incomplete_in_week(1, &completed), None);
        assert_eq!(index.first_incomplete_in_week(2, &completed), Some(3));
    }

    #[test]
    fn navigation_helpers_respect_bounds() {
        let index = CurriculumIndex::build(&sample());
        assert_eq!(index.next_after(0).unwrap().lesson_id, lid("b"));
        assert!(index.next_after(5).is_none());
        assert!(index.next_after(usize::MAX).is_none());
        assert!(index.previous_before(0).is_none());
        assert_eq!(index.position_of(&lid("d")), Some(3));
    }

    #[test]
    fn percent_rounds_and_caps() {
        assert_eq!(percent(1.0 / 3.0), 33);
        assert_eq!(percent(2.0 / 3.0), 67);
        assert_eq!(percent(1.0), 100);
        assert_eq!(percent(1.5), 100);
        assert_eq!(percent(0.0), 0);
    }
}
