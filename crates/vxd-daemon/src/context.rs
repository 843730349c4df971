//! Daemon context: the shared state every connection handler dispatches
//! against, built once at startup from [`Config`].

use std::sync::Arc;
use std::time::Duration;

use vxd_config::Config;
use vxd_core::{DaemonResult, Engine, InMemoryEngine, ScriptEngine};

use crate::lifecycle::Lifecycle;
use crate::lock::ProjectLock;
use crate::render::RenderManager;
use crate::workers::WorkerPool;

/// Everything a request handler needs: the engine, the project lock, the
/// two worker pools, the render manager, and the lifecycle controller.
/// Each field owns its own synchronization; there is no single outer
/// mutex because the pieces are independently concurrent (§5).
pub struct DaemonContext {
    /// Resolved configuration this context was built from.
    pub config: Config,
    /// The voxel engine singleton.
    pub engine: Arc<dyn Engine>,
    /// The script runtime, if scripting is enabled.
    pub script_engine: Arc<dyn ScriptEngine>,
    /// Process-wide project lock.
    pub lock: Arc<ProjectLock>,
    /// General-purpose worker pool for engine operations.
    pub general_pool: Arc<WorkerPool>,
    /// Dedicated pool for `execute_script`, serialized further by the
    /// script runtime's own non-reentrancy.
    pub script_pool: Arc<WorkerPool>,
    /// Render artifact manager.
    pub render: Arc<RenderManager>,
    /// Signal/state-machine controller.
    pub lifecycle: Arc<Lifecycle>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
}

impl DaemonContext {
    /// Build a context from resolved configuration, using the in-memory
    /// reference engine and script runtime.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_engine(config, Arc::new(InMemoryEngine::new()))
    }

    /// Build a context from resolved configuration and an explicit engine
    /// (used by tests to inject [`crate::lock::ProjectLock`]-contending
    /// fakes).
    #[must_use]
    pub fn with_engine(config: Config, engine: Arc<dyn Engine>) -> Self {
        let (shutdown_tx, _shutdown_rx) = tokio::sync::watch::channel(false);
        let general_pool = Arc::new(WorkerPool::start(
            config.worker_pool.worker_count,
            config.worker_pool.queue_capacity,
            config.worker_pool.priority_queue,
        ));
        let script_pool = Arc::new(WorkerPool::start(
            config.script_pool.worker_count,
            config.script_pool.queue_capacity,
            false,
        ));
        let render = Arc::new(RenderManager::new(
            config.render.base_dir.clone(),
            Duration::from_secs(config.render.ttl_seconds),
            config.render.max_total_bytes,
        ));
        let script_engine: Arc<dyn ScriptEngine> = Arc::new(crate::script::StepScriptEngine::new(Arc::clone(&engine)));

        Self {
            config,
            engine,
            script_engine,
            lock: Arc::new(ProjectLock::new()),
            general_pool,
            script_pool,
            render,
            lifecycle: Arc::new(Lifecycle::new()),
            shutdown_tx,
        }
    }

    /// Spawn the background sweepers (idle-lock reset, render expiry) tied
    /// to this context's shutdown signal.
    pub fn spawn_background_tasks(self: &Arc<Self>) {
        let idle_timeout = Duration::from_secs(self.config.idle_timeout_secs);
        tokio::spawn(crate::lock::run_idle_sweeper(
            Arc::clone(&self.lock),
            Arc::clone(&self.engine),
            idle_timeout,
            self.shutdown_tx.subscribe(),
        ));

        let sweep_interval = Duration::from_secs(self.config.render.sweep_interval_seconds);
        tokio::spawn(crate::render::run_sweeper(
            Arc::clone(&self.render),
            sweep_interval,
            self.shutdown_tx.subscribe(),
        ));
    }

    /// Signal every background task to stop, then drain both worker
    /// pools.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        self.general_pool.shutdown().await;
        self.script_pool.shutdown().await;
    }

    /// Reset the engine to a fresh, empty state. Used by `reset`/implicit
    /// `create_project` cleanup; requires the caller already holds the
    /// project lock.
    ///
    /// # Errors
    ///
    /// Propagates whatever the underlying engine's `reset` returns.
    pub fn reset_engine(&self) -> DaemonResult<()> {
        self.engine.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_context_builds_with_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.render.base_dir = dir.path().to_path_buf();
        let ctx = Arc::new(DaemonContext::new(config));
        assert_eq!(ctx.lifecycle.state(), crate::lifecycle::State::Stopped);
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn reset_engine_delegates_to_engine() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.render.base_dir = dir.path().to_path_buf();
        let ctx = Arc::new(DaemonContext::new(config));
        ctx.reset_engine().unwrap();
        ctx.shutdown().await;
    }
}
