use droplite_core::{api::FileId, models::files::FileRecord};
use sqlx::FromRow;

#[derive(FromRow)]
pub struct File {
    pub id: FileId,
    pub filename: String,
    pub original_filename: String,
    pub mimetype: String,
    pub size: i64,
    pub upload_date: chrono::DateTime<chrono::Utc>,
}

impl File {
    pub async fn insert<'a, E>(
        filename: &'a str,
        original_filename: &'a str,
        mimetype: &'a str,
        size: i64,
        exec: E,
    ) -> Result<FileId, sqlx::Error>
    where
        E: sqlx::SqliteExecutor<'a>,
    {
        let result = sqlx::query(
            "INSERT INTO files (filename, original_filename, mimetype, size, upload_date)
            VALUES (?, ?, ?, ?, ?)",
        )
        .bind(filename)
        .bind(original_filename)
        .bind(mimetype)
        .bind(size)
        .bind(chrono::Utc::now())
        .execute(exec)
        .await?;
        Ok(FileId(result.last_insert_rowid()))
    }

    pub async fn get_optional<'a, E>(id: &FileId, exec: E) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::SqliteExecutor<'a>,
    {
        sqlx::query_as::<_, File>(
            "SELECT id, filename, original_filename, mimetype, size, upload_date
            FROM files WHERE id = ? LIMIT 1",
        )
        .bind(id.0)
        .fetch_optional(exec)
        .await
    }

    /// Newest upload first.
    pub async fn get_all<'a, E>(exec: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: sqlx::SqliteExecutor<'a>,
    {
        sqlx::query_as::<_, File>(
            "SELECT id, filename, original_filename, mimetype, size, upload_date
            FROM files ORDER BY upload_date DESC, id DESC",
        )
        .fetch_all(exec)
        .await
    }

    pub async fn delete<'a, E>(id: &FileId, exec: E) -> Result<(), sqlx::Error>
    where
        E: sqlx::SqliteExecutor<'a>,
    {
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id.0)
            .execute(exec)
            .await?;
        Ok(())
    }
}

impl From<File> for FileRecord {
    fn from(x: File) -> Self {
        Self {
            id: x.id,
            filename: x.filename,
            original_filename: x.original_filename,
            mimetype: x.mimetype,
            size: x.size,
            upload_date: x.upload_date,
        }
    }
}
