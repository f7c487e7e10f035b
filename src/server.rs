use std::{
    future::Future,
    net::{SocketAddr, TcpListener},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{Router, Server};
use sqlx::SqlitePool;
use tokio::{signal, sync::oneshot, task::JoinHandle};

use crate::{
    config::Config, db, repository::SqliteTodoRepository, route::create_router, AppState,
};

/// The wired service: pool, repository, state and router built in dependency order,
/// plus the bound listener.
pub struct Application {
    config: Config,
    listener: TcpListener,
    router: Router,
    pool: SqlitePool,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        let pool = db::connect(&config.database)
            .await
            .with_context(|| format!("Failed to connect to database {}", config.database.url))?;
        tracing::info!("Connection to the database is successful");

        let repo = Arc::new(SqliteTodoRepository::new(pool.clone()));
        let app_state = Arc::new(AppState::new(repo));
        let router = create_router(app_state, &config);

        Self::with_router(config, pool, router)
    }

    /// Binds `server.listen_addr:server.port` for `router`. `pool` is closed on shutdown.
    pub fn with_router(config: Config, pool: SqlitePool, router: Router) -> Result<Self> {
        let addr: SocketAddr = config
            .server_address()
            .parse()
            .with_context(|| format!("Invalid listen address {}", config.server_address()))?;
        let listener = TcpListener::bind(addr).with_context(|| format!("Could not bind {addr}"))?;
        listener
            .set_nonblocking(true)
            .context("Could not make the listener non-blocking")?;

        Ok(Self {
            config,
            listener,
            router,
            pool,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Listener has no local address")
    }

    /// Serves until SIGINT/SIGTERM.
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests for at most
    /// `server.shutdown_grace_secs` before aborting the connections that are left.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Self {
            config,
            listener,
            router,
            pool,
        } = self;
        let addr = listener.local_addr().context("Listener has no local address")?;
        let pool_close_limit = config.database.acquire_timeout();

        let connections = ConnectionTasks::default();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = Server::from_tcp(listener)
            .with_context(|| format!("Could not listen on {addr}"))?
            .executor(connections.clone())
            .serve(router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async {
                stop_rx.await.ok();
            });

        tracing::info!(
            address = %addr,
            service = %config.server.name,
            env = %config.service.env,
            "Server started successfully"
        );
        let mut serving = tokio::spawn(server);

        tokio::select! {
            result = &mut serving => {
                close_pool(&pool, pool_close_limit).await;
                return result
                    .context("Server task failed")?
                    .context("Server error");
            }
            () = shutdown => {}
        }

        let grace = config.server.shutdown_grace();
        tracing::info!(
            grace_secs = grace.as_secs(),
            "server shutdown signal has been received, new requests will be rejected"
        );
        stop_tx.send(()).ok();

        match tokio::time::timeout(grace, &mut serving).await {
            Ok(Ok(Ok(()))) => tracing::info!("in-flight requests drained"),
            Ok(Ok(Err(err))) => tracing::error!(error = %err, "server error during shutdown"),
            Ok(Err(err)) => tracing::error!(error = %err, "server task failed during shutdown"),
            Err(_) => {
                serving.abort();
                let aborted = connections.abort_all();
                tracing::warn!(
                    connections = aborted,
                    "grace period elapsed, closed remaining connections"
                );
            }
        }

        close_pool(&pool, pool_close_limit).await;
        tracing::info!("server shutdown");
        Ok(())
    }
}

/// Spawns hyper's per-connection tasks on tokio and keeps their handles so
/// they can be aborted once the grace period is over.
#[derive(Clone, Default)]
struct ConnectionTasks(Arc<Mutex<Vec<JoinHandle<()>>>>);

impl ConnectionTasks {
    fn abort_all(&self) -> usize {
        let mut tasks = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let mut aborted = 0;
        for task in tasks.drain(..) {
            if !task.is_finished() {
                task.abort();
                aborted += 1;
            }
        }
        aborted
    }
}

impl<F> hyper::rt::Executor<F> for ConnectionTasks
where
    F: Future<Output = ()> + Send + 'static,
{
    fn execute(&self, fut: F) {
        let task = tokio::spawn(fut);
        let mut tasks = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
    }
}

async fn close_pool(pool: &SqlitePool, limit: Duration) {
    if tokio::time::timeout(limit, pool.close()).await.is_err() {
        tracing::warn!(
            limit_secs = limit.as_secs(),
            "database pool did not close in time, abandoning checked-out connections"
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
