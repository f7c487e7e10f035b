use std::{any::Any, net::IpAddr, net::SocketAddr, sync::Arc, time::Instant};

use axum::{
    body::HttpBody,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};

use crate::error::ApiError;

/// Address of the caller as reported by proxies, or the socket peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Service metadata written on every access log line.
#[derive(Debug, Clone)]
pub struct AccessLog {
    service: String,
    env: String,
}

impl AccessLog {
    pub fn new(service: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            env: env.into(),
        }
    }
}

/// First parsable address among `True-Client-IP`, `X-Real-IP` and the leading
/// `X-Forwarded-For` entry, falling back to the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse().ok())
    };

    header_ip("true-client-ip")
        .or_else(|| header_ip("x-real-ip"))
        .or_else(|| header_ip("x-forwarded-for"))
        .or(peer.map(|addr| addr.ip()))
}

pub async fn mw_client_ip<B>(mut request: Request<B>, next: Next<B>) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    if let Some(ip) = client_ip(request.headers(), peer) {
        request.extensions_mut().insert(ClientIp(ip));
    }

    next.run(request).await
}

pub fn status_label(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=299 => "OK",
        300..=399 => "Redirect",
        400..=499 => "Client Error",
        500..=599 => "Server Error",
        _ => "Unknown",
    }
}

pub async fn mw_access_log<B>(
    State(log): State<Arc<AccessLog>>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let started = Instant::now();
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let method = request.method().to_string();
    let proto = format!("{:?}", request.version());
    let path = request.uri().path().to_string();
    let user_agent = header_value(request.headers(), header::USER_AGENT.as_str());
    let request_id = header_value(request.headers(), "x-request-id");
    let client_ip = request
        .extensions()
        .get::<ClientIp>()
        .map(|ClientIp(ip)| ip.to_string())
        .unwrap_or_default();

    let response = next.run(request).await;

    let status = response.status();
    let size = response.body().size_hint().exact().unwrap_or_default();
    let duration = format!("{:?}", started.elapsed());

    macro_rules! served {
        ($level:ident) => {
            tracing::$level!(
                service = %log.service,
                env = %log.env,
                method = %method,
                proto = %proto,
                path = %path,
                user_agent = %user_agent,
                status = status.as_u16(),
                label = status_label(status),
                size,
                req_id = %request_id,
                client_ip = %client_ip,
                timestamp = %timestamp,
                duration = %duration,
                "Served"
            )
        };
    }

    if status.is_server_error() {
        served!(error);
    } else if status.is_client_error() {
        served!(warn);
    } else {
        served!(info);
    }

    response
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Gives the bare 408 produced by the timeout layer the error envelope.
pub async fn mw_timeout_envelope<B>(request: Request<B>, next: Next<B>) -> Response {
    let response = next.run(request).await;
    if response.status() == StatusCode::REQUEST_TIMEOUT
        && response.body().size_hint().exact() == Some(0)
    {
        return ApiError::Timeout.into_response();
    }
    response
}

/// Turns a handler panic into the generic 500 envelope.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "handler panicked");

    ApiError::Internal.into_response()
}
