use async_trait::async_trait;
use sqlx::error::ErrorKind;

use crate::model::{Todo, TodoId};

mod memory;
mod sqlite;

pub use memory::MemoryTodoRepository;
pub use sqlite::SqliteTodoRepository;

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("todo {0} not found")]
    NotFound(TodoId),

    /// The engine refused the row, e.g. a CHECK or NOT NULL constraint.
    #[error("todo rejected by storage: {0}")]
    Rejected(String),

    #[error("storage failure: {0}")]
    Storage(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if matches!(
                db.kind(),
                ErrorKind::CheckViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
            ) {
                return Self::Rejected(db.message().to_string());
            }
        }
        Self::Storage(err)
    }
}

/// Persistence for todos. Each call is a single statement; nothing spans calls.
///
/// `update` and `delete` return [`RepositoryError::NotFound`] when the id no
/// longer matches a row.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    async fn get_by_id(&self, id: TodoId) -> Result<Todo>;

    /// All todos in id order. An empty table is an empty vec.
    async fn list(&self) -> Result<Vec<Todo>>;

    /// Inserts `todo` and writes the assigned id and timestamps back into it.
    async fn create(&self, todo: &mut Todo) -> Result<()>;

    /// Overwrites title, description and completed of the row with `todo.id`.
    async fn update(&self, todo: &mut Todo) -> Result<()>;

    async fn delete(&self, todo: &Todo) -> Result<()>;
}
