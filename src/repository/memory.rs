use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{RepositoryError, Result, TodoRepository};
use crate::model::{Todo, TodoId};

#[derive(Debug, Default)]
struct Table {
    last_id: TodoId,
    rows: BTreeMap<TodoId, Todo>,
}

/// In-process store with the same semantics as the SQLite one.
#[derive(Debug, Default)]
pub struct MemoryTodoRepository {
    table: RwLock<Table>,
}

impl MemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoRepository for MemoryTodoRepository {
    async fn get_by_id(&self, id: TodoId) -> Result<Todo> {
        self.table
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn list(&self) -> Result<Vec<Todo>> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn create(&self, todo: &mut Todo) -> Result<()> {
        let mut table = self.table.write().await;
        table.last_id += 1;
        let now = Utc::now();
        todo.id = table.last_id;
        todo.created_at = now;
        todo.updated_at = now;
        table.rows.insert(todo.id, todo.clone());
        Ok(())
    }

    async fn update(&self, todo: &mut Todo) -> Result<()> {
        let mut table = self.table.write().await;
        let row = table
            .rows
            .get_mut(&todo.id)
            .ok_or(RepositoryError::NotFound(todo.id))?;
        row.title = todo.title.clone();
        row.description = todo.description.clone();
        row.completed = todo.completed;
        row.updated_at = Utc::now();
        *todo = row.clone();
        Ok(())
    }

    async fn delete(&self, todo: &Todo) -> Result<()> {
        self.table
            .write()
            .await
            .rows
            .remove(&todo.id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(todo.id))
    }
}
