use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};

use crate::{
    error::ApiError,
    model::{Todo, TodoId},
    response,
    schema::TodoSchema,
    validation::validate,
    AppState,
};

/// The todo addressed by the `:id` path segment, looked up before the handler runs.
#[derive(Debug, Clone)]
pub struct ResolvedTodo(pub Todo);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ResolvedTodo {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Path(raw_id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InvalidTodo)?;
        if raw_id.is_empty() {
            return Err(ApiError::InvalidTodo);
        }

        // an id that cannot exist is just another miss
        let id: TodoId = raw_id.parse().map_err(|_| ApiError::NotFound)?;
        let todo = state.repo.get_by_id(id).await?;
        Ok(Self(todo))
    }
}

fn decode(body: &[u8]) -> Result<TodoSchema, ApiError> {
    TodoSchema::from_slice(body).map_err(|err| {
        tracing::debug!(error = %err, "undecodable todo body");
        ApiError::MissingArgument
    })
}

// Handler for the health checker route
pub async fn health_checker_handler() -> impl IntoResponse {
    (StatusCode::OK, ".")
}

// Handler for getting all Todo items
pub async fn get_todos(
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let todos = data.repo.list().await?;
    Ok(response::ok_with(StatusCode::OK, "todos", todos))
}

// Handler for getting a specific Todo by ID
pub async fn get_todo(ResolvedTodo(todo): ResolvedTodo) -> impl IntoResponse {
    response::ok_with(StatusCode::OK, "todo", todo)
}

// Handler for creating a new Todo. `completed` is ignored and always starts false.
pub async fn create_todo(
    State(data): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let schema = decode(&body)?;
    validate(&schema)?;

    let mut todo = Todo::new(schema.title, schema.description);
    data.repo.create(&mut todo).await?;
    tracing::info!(id = todo.id, "todo created");

    Ok(response::ok(StatusCode::CREATED))
}

// Handler for updating a Todo by ID
pub async fn update_todo(
    State(data): State<Arc<AppState>>,
    ResolvedTodo(mut todo): ResolvedTodo,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let schema = decode(&body)?;
    validate(&schema)?;

    todo.title = schema.title;
    todo.description = schema.description;
    todo.completed = schema.completed;
    data.repo.update(&mut todo).await?;

    Ok(response::ok(StatusCode::OK))
}

// Handler for deleting a Todo by ID
pub async fn delete_todo(
    State(data): State<Arc<AppState>>,
    ResolvedTodo(todo): ResolvedTodo,
) -> Result<impl IntoResponse, ApiError> {
    data.repo.delete(&todo).await?;
    tracing::info!(id = todo.id, "todo deleted");

    Ok(response::ok(StatusCode::OK))
}
