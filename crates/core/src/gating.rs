use serde::Serialize;
use std::collections::BTreeSet;

use crate::curriculum::CurriculumIndex;
use crate::model::{Course, LessonId, QuizAttempt};

/// Action offered after a quiz result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum NextStep {
    /// Passed. `flat_index` is `None` when this was the final lesson.
    #[serde(rename_all = "camelCase")]
    NextLesson {
        flat_index: Option<usize>,
        lesson_id: Option<LessonId>,
    },
    /// Failed or not attempted.
    WatchLessonAgain { flat_index: Option<usize> },
}

/// Access rules for quizzes and lesson advancement.
///
/// The completed set is already scoped to one student, so no identity is needed here.
pub struct GatingPolicy;

impl GatingPolicy {
    /// A lesson's quiz opens once the lesson itself is marked complete.
    ///
    /// Prior quiz results play no part. A lesson that is not in the course is never unlocked.
    #[must_use]
    pub fn is_quiz_unlocked(
        lesson_id: &LessonId,
        course: &Course,
        completed: &BTreeSet<LessonId>,
    ) -> bool {
        course.contains_lesson(lesson_id) && completed.contains(lesson_id)
    }

    /// Only a passed attempt permits moving on.
    #[must_use]
    pub fn can_advance(attempt: Option<&QuizAttempt>) -> bool {
        attempt.is_some_and(|a| a.passed)
    }

    #[must_use]
    pub fn next_step(
        index: &CurriculumIndex,
        lesson_id: &LessonId,
        attempt: Option<&QuizAttempt>,
    ) -> NextStep {
        let current = index.position_of(lesson_id);
        if Self::can_advance(attempt) {
            let next = current.and_then(|flat| index.next_after(flat).map(|l| (flat + 1, l)));
            NextStep::NextLesson {
                flat_index: next.as_ref().map(|(flat, _)| *flat),
                lesson_id: next.map(|(_, l)| l.lesson_id.clone()),
            }
        } else {
            NextStep::WatchLessonAgain {
                flat_index: current,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, Feedback, Lesson, Module, Score, Week};
    use crate::time::fixed_now;

    fn lid(id: &str) -> LessonId {
        LessonId::new(id).unwrap()
    }

    fn course() -> Course {
        Course::new(
            CourseId::new("c1").unwrap(),
            "Gated",
            vec![Week::new(
                1,
                vec![Module::new(
                    "m",
                    vec![Lesson::new(lid("a"), "A"), Lesson::new(lid("b"), "B")],
                )],
            )],
        )
    }

    fn attempt(id: &str, score: i64) -> QuizAttempt {
        QuizAttempt::new(
            lid(id),
            vec![String::new()],
            vec![Feedback::Wrong],
            Score::new(score).unwrap(),
            fixed_now(),
        )
    }

    #[test]
    fn quiz_unlocks_once_lesson_is_complete() {
        let c = course();
        let mut completed = BTreeSet::new();
        assert!(!GatingPolicy::is_quiz_unlocked(&lid("a"), &c, &completed));
        completed.insert(lid("a"));
        assert!(GatingPolicy::is_quiz_unlocked(&lid("a"), &c, &completed));
        assert!(!GatingPolicy::is_quiz_unlocked(&lid("b"), &c, &completed));
    }

    #[test]
    fn foreign_lesson_is_never_unlocked() {
        let completed: BTreeSet<_> = [lid("zzz")].into_iter().collect();
        assert!(!GatingPolicy::is_quiz_unlocked(&lid("zzz"), &course(), &completed));
    }

    #[test]
    fn only_passed_attempts_advance() {
        assert!(!GatingPolicy::can_advance(None));
        assert!(!GatingPolicy::can_advance(Some(&attempt("a", 59))));
        assert!(GatingPolicy::can_advance(Some(&attempt("a", 60))));
    }

    #[test]
    fn next_step_points_at_following_lesson_or_rewatch() {
        let index = CurriculumIndex::build(&course());
        assert_eq!(
            GatingPolicy::next_step(&index, &lid("a"), Some(&attempt("a", 90))),
            NextStep::NextLesson {
                flat_index: Some(1),
                lesson_id: Some(lid("b")),
            }
        );
        assert_eq!(
            GatingPolicy::next_step(&index, &lid("b"), Some(&attempt("b", 90))),
            NextStep::NextLesson {
                flat_index: None,
                lesson_id: None,
            }
        );
        assert_eq!(
            GatingPolicy::next_step(&index, &lid("a"), Some(&attempt("a", 10))),
            NextStep::WatchLessonAgain { flat_index: Some(0) }
        );
    }
}
