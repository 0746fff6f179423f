use droplite_core::{models::theme::ThemeConfig, StrConversion, ThemeMode};
use sqlx::FromRow;

/// The single preferences row. There is one user, stored under id 1.
#[derive(FromRow)]
pub struct ThemePreferences {
    pub theme: String,
    pub gradient_from: String,
    pub gradient_to: String,
    pub gradient_on: bool,
}

const PREFERENCES_ID: i64 = 1;

impl ThemePreferences {
    pub async fn get_optional<'a, E>(exec: E) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::SqliteExecutor<'a>,
    {
        sqlx::query_as::<_, ThemePreferences>(
            "SELECT theme, gradient_from, gradient_to, gradient_on
            FROM theme_preferences WHERE id = ?",
        )
        .bind(PREFERENCES_ID)
        .fetch_optional(exec)
        .await
    }

    pub async fn upsert<'a, E>(config: &'a ThemeConfig, exec: E) -> Result<(), sqlx::Error>
    where
        E: sqlx::SqliteExecutor<'a>,
    {
        sqlx::query(
            "INSERT INTO theme_preferences (id, theme, gradient_from, gradient_to, gradient_on)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                theme = excluded.theme,
                gradient_from = excluded.gradient_from,
                gradient_to = excluded.gradient_to,
                gradient_on = excluded.gradient_on",
        )
        .bind(PREFERENCES_ID)
        .bind(config.theme.as_str())
        .bind(&config.gradient_from)
        .bind(&config.gradient_to)
        .bind(config.gradient_on)
        .execute(exec)
        .await?;
        Ok(())
    }
}

impl From<ThemePreferences> for ThemeConfig {
    fn from(x: ThemePreferences) -> Self {
        Self {
            theme: ThemeMode::from_str(&x.theme),
            gradient_from: x.gradient_from,
            gradient_to: x.gradient_to,
            gradient_on: x.gradient_on,
        }
    }
}
