use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite, SqlitePool};

use crate::config::DatabaseConfig;

const CREATE_TODOS: &str = r#"CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL CHECK (length(title) BETWEEN 1 AND 50),
    description TEXT NOT NULL CHECK (length(description) BETWEEN 1 AND 100),
    completed BOOLEAN NOT NULL DEFAULT 0,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL
);"#;

/// Opens the pool, creating the database file and the `todos` table when missing.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let url = config.url.as_str();

    if !url.contains(":memory:") && !Sqlite::database_exists(url).await.unwrap_or(false) {
        tracing::info!(url, "creating database");
        Sqlite::create_database(url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(url)
        .await?;

    sqlx::query(CREATE_TODOS).execute(&pool).await?;
    tracing::debug!(url, "todos table ready");

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_file_database_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todo.db");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", path.display()),
            max_connections: 2,
            acquire_timeout_secs: 5,
        };

        let pool = connect(&config).await.unwrap();
        assert!(path.exists());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM todos")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        // second open finds the existing table
        pool.close().await;
        connect(&config).await.unwrap().close().await;
    }
}
