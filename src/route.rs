use std::sync::Arc;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

use crate::{
    config::Config,
    handler::*,
    middleware::{mw_access_log, mw_client_ip, mw_timeout_envelope, panic_response, AccessLog},
    AppState,
};

pub fn create_router(app_state: Arc<AppState>, config: &Config) -> Router {
    let access_log = Arc::new(AccessLog::new(&config.server.name, &config.service.env));

    let app = Router::new()
        .route("/v1/todos", get(get_todos).post(create_todo))
        .route(
            "/v1/todos/:id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        // healthz: k8s-style liveness probe
        .route("/healthz", get(health_checker_handler))
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(from_fn(mw_client_ip))
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(from_fn_with_state(access_log, mw_access_log))
                .layer(from_fn(mw_timeout_envelope))
                .layer(TimeoutLayer::new(config.server.request_timeout())),
        );

    match cors_layer(&config.server.allowed_origins) {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([CONTENT_TYPE]),
    )
}
