use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, SqlitePool};

use super::{RepositoryError, Result, TodoRepository};
use crate::model::{Todo, TodoId};

#[derive(Debug, Clone)]
pub struct SqliteTodoRepository {
    pool: SqlitePool,
}

impl SqliteTodoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TodoRepository for SqliteTodoRepository {
    async fn get_by_id(&self, id: TodoId) -> Result<Todo> {
        query_as::<_, Todo>(
            "SELECT id, title, description, completed, created_at, updated_at FROM todos WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound(id))
    }

    async fn list(&self) -> Result<Vec<Todo>> {
        let todos = query_as::<_, Todo>(
            "SELECT id, title, description, completed, created_at, updated_at FROM todos ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(todos)
    }

    async fn create(&self, todo: &mut Todo) -> Result<()> {
        let now = Utc::now();
        let stored = query_as::<_, Todo>(
            "INSERT INTO todos (title, description, completed, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             RETURNING id, title, description, completed, created_at, updated_at",
        )
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.completed)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(id = stored.id, "todo created");
        *todo = stored;
        Ok(())
    }

    async fn update(&self, todo: &mut Todo) -> Result<()> {
        let stored = query_as::<_, Todo>(
            "UPDATE todos SET title = ?, description = ?, completed = ?, updated_at = ? \
             WHERE id = ? \
             RETURNING id, title, description, completed, created_at, updated_at",
        )
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.completed)
        .bind(Utc::now())
        .bind(todo.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound(todo.id))?;

        *todo = stored;
        Ok(())
    }

    async fn delete(&self, todo: &Todo) -> Result<()> {
        let rows_affected = query("DELETE FROM todos WHERE id = ?")
            .bind(todo.id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if rows_affected == 0 {
            return Err(RepositoryError::NotFound(todo.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db;

    async fn repository() -> SqliteTodoRepository {
        let pool = db::connect(&DatabaseConfig::in_memory()).await.unwrap();
        SqliteTodoRepository::new(pool)
    }

    #[tokio::test]
    async fn list_on_empty_table_is_empty() {
        let repo = repository().await;
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_assigns_id_and_round_trips() {
        let repo = repository().await;
        let mut todo = Todo::new("1", "hoge");
        repo.create(&mut todo).await.unwrap();
        assert_eq!(todo.id, 1);

        let fetched = repo.get_by_id(todo.id).await.unwrap();
        assert_eq!(fetched.title, "1");
        assert_eq!(fetched.description, "hoge");
        assert!(!fetched.completed);
        assert_eq!(fetched.id, todo.id);
    }

    #[tokio::test]
    async fn list_returns_rows_in_id_order() {
        let repo = repository().await;
        for title in ["a", "b", "c"] {
            repo.create(&mut Todo::new(title, "desc")).await.unwrap();
        }
        let titles: Vec<_> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let repo = repository().await;
        let mut first = Todo::new("a", "desc");
        repo.create(&mut first).await.unwrap();
        repo.delete(&first).await.unwrap();

        let mut second = Todo::new("b", "desc");
        repo.create(&mut second).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn get_by_id_missing_is_not_found() {
        let repo = repository().await;
        assert!(matches!(
            repo.get_by_id(42).await,
            Err(RepositoryError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn update_overwrites_fields() {
        let repo = repository().await;
        let mut todo = Todo::new("1", "hoge");
        repo.create(&mut todo).await.unwrap();

        todo.title = "2".to_string();
        todo.description = "fuga".to_string();
        todo.completed = true;
        repo.update(&mut todo).await.unwrap();

        let stored = repo.get_by_id(todo.id).await.unwrap();
        assert_eq!(stored.title, "2");
        assert_eq!(stored.description, "fuga");
        assert!(stored.completed);
        assert_eq!(stored.created_at, todo.created_at);
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn update_and_delete_of_vanished_row_are_not_found() {
        let repo = repository().await;
        let mut todo = Todo::new("1", "hoge");
        repo.create(&mut todo).await.unwrap();
        repo.delete(&todo).await.unwrap();

        assert!(matches!(
            repo.update(&mut todo).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete(&todo).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.get_by_id(todo.id).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn check_constraint_is_rejected() {
        let repo = repository().await;
        let mut todo = Todo::new("", "hoge");
        assert!(matches!(
            repo.create(&mut todo).await,
            Err(RepositoryError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn closed_pool_is_storage_failure() {
        let repo = repository().await;
        repo.pool.close().await;
        assert!(matches!(repo.list().await, Err(RepositoryError::Storage(_))));
    }
}
