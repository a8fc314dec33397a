use chrono::Utc;
use learnpath_core::model::{Course, CourseId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, from_json, ser, to_json};
use crate::repository::{CourseRepository, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT document FROM courses WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let document: String = row.try_get("document").map_err(ser)?;
        let course: Course = from_json("course", &document)?;
        if &course.id != id {
            return Err(StorageError::Serialization(format!(
                "course document id {} does not match row id {id}",
                course.id
            )));
        }
        Ok(Some(course))
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let document = to_json(course)?;
        sqlx::query(
            r"
            INSERT INTO courses (id, title, document, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                document = excluded.document,
                updated_at = excluded.updated_at
            ",
        )
        .bind(course.id.as_str())
        .bind(&course.title)
        .bind(document)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }
}
