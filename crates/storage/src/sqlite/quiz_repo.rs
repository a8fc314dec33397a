use chrono::Utc;
use learnpath_core::model::{LessonId, Question, Quiz};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{bool_from_i64, bool_to_i64, conn, from_json, ser, to_json};
use crate::repository::{QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn get_quiz(&self, lesson_id: &LessonId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT questions, generated FROM quizzes WHERE lesson_id = ?1
            ",
        )
        .bind(lesson_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let questions: Vec<Question> =
            from_json("questions", &row.try_get::<String, _>("questions").map_err(ser)?)?;
        let generated = bool_from_i64("generated", row.try_get::<i64, _>("generated").map_err(ser)?)?;

        Ok(Some(Quiz {
            lesson_id: lesson_id.clone(),
            questions,
            generated,
        }))
    }

    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO quizzes (lesson_id, questions, generated, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(lesson_id) DO UPDATE SET
                questions = excluded.questions,
                generated = excluded.generated,
                updated_at = excluded.updated_at
            ",
        )
        .bind(quiz.lesson_id.as_str())
        .bind(to_json(&quiz.questions)?)
        .bind(bool_to_i64(quiz.generated))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }
}
