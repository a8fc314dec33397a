use learnpath_core::model::{CompletedSet, CourseId, Progress, StudentId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    bool_to_i64, conn, course_id_from_str, lesson_id_from_str, map_attempt_row, ser,
    student_id_from_str, to_json,
};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<Option<Progress>, StorageError> {
        // One read transaction so a concurrent save cannot tear the record.
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let header = sqlx::query(
            r"
            SELECT student_id, course_id, created_at, updated_at
            FROM progress
            WHERE student_id = ?1 AND course_id = ?2
            ",
        )
        .bind(student_id.as_str())
        .bind(course_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?;

        let Some(header) = header else {
            return Ok(None);
        };

        let completed_rows = sqlx::query(
            r"
            SELECT lesson_id FROM completed_lessons
            WHERE student_id = ?1 AND course_id = ?2
            ORDER BY lesson_id ASC
            ",
        )
        .bind(student_id.as_str())
        .bind(course_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(conn)?;

        let mut completed = CompletedSet::new();
        for row in completed_rows {
            completed.insert(lesson_id_from_str(row.try_get("lesson_id").map_err(ser)?)?);
        }

        let attempt_rows = sqlx::query(
            r"
            SELECT lesson_id, answers, feedback, score, passed, submitted_at
            FROM quiz_attempts
            WHERE student_id = ?1 AND course_id = ?2
            ORDER BY lesson_id ASC
            ",
        )
        .bind(student_id.as_str())
        .bind(course_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(conn)?;

        let attempts = attempt_rows
            .iter()
            .map(map_attempt_row)
            .collect::<Result<Vec<_>, _>>()?;
        tx.commit().await.map_err(conn)?;

        Ok(Some(Progress::from_persisted(
            student_id_from_str(header.try_get("student_id").map_err(ser)?)?,
            course_id_from_str(header.try_get("course_id").map_err(ser)?)?,
            completed,
            attempts,
            header.try_get("created_at").map_err(ser)?,
            header.try_get("updated_at").map_err(ser)?,
        )))
    }

    /// Replaces the stored record with `progress` in a single transaction.
    async fn save_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        let student = progress.student_id().as_str();
        let course = progress.course_id().as_str();
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO progress (student_id, course_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(student_id, course_id) DO UPDATE SET
                updated_at = excluded.updated_at
            ",
        )
        .bind(student)
        .bind(course)
        .bind(progress.created_at())
        .bind(progress.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM completed_lessons WHERE student_id = ?1 AND course_id = ?2")
            .bind(student)
            .bind(course)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for lesson_id in progress.completed_lessons() {
            sqlx::query(
                r"
                INSERT INTO completed_lessons (student_id, course_id, lesson_id)
                VALUES (?1, ?2, ?3)
                ",
            )
            .bind(student)
            .bind(course)
            .bind(lesson_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        sqlx::query("DELETE FROM quiz_attempts WHERE student_id = ?1 AND course_id = ?2")
            .bind(student)
            .bind(course)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for attempt in progress.attempts() {
            sqlx::query(
                r"
                INSERT INTO quiz_attempts (
                    student_id, course_id, lesson_id, answers, feedback,
                    score, passed, submitted_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
            )
            .bind(student)
            .bind(course)
            .bind(attempt.lesson_id.as_str())
            .bind(to_json(&attempt.answers)?)
            .bind(to_json(&attempt.feedback)?)
            .bind(i64::from(attempt.score.value()))
            .bind(bool_to_i64(attempt.passed))
            .bind(attempt.submitted_at)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
