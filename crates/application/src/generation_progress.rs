use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use kkvat_domain::{ProgressStep, decode_progress_steps};

use crate::api_gateway::ApiGateway;

/// Default delay between progress polls.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(3);

/// Polls generator progress for one entity at a time.
///
/// Starting a new watch aborts the previous poll, and dropping the monitor
/// stops polling. Failed polls publish an empty step list and are not retried
/// early.
pub struct GenerationProgressMonitor {
    gateway: ApiGateway,
    interval: Duration,
    steps: Arc<watch::Sender<Vec<ProgressStep>>>,
    task: Option<(String, JoinHandle<()>)>,
}

impl GenerationProgressMonitor {
    /// Creates an idle monitor.
    #[must_use]
    pub fn new(gateway: ApiGateway, interval: Duration) -> Self {
        let (steps, _) = watch::channel(Vec::new());
        Self {
            gateway,
            interval: interval.max(Duration::from_millis(1)),
            steps: Arc::new(steps),
            task: None,
        }
    }

    /// Subscribes to published step lists.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<ProgressStep>> {
        self.steps.subscribe()
    }

    /// Returns the entity currently being watched.
    #[must_use]
    pub fn watching(&self) -> Option<&str> {
        self.task.as_ref().map(|(name, _)| name.as_str())
    }

    /// Fetches progress for `name` now and then on every interval.
    pub fn watch(&mut self, name: &str) {
        self.stop();

        let gateway = self.gateway.clone();
        let steps = self.steps.clone();
        let interval = self.interval;
        let entity = name.to_owned();
        tracing::info!(entity = %entity, ?interval, "watching generation progress");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                steps.send_replace(fetch_steps(&gateway, &entity).await);
            }
        });
        self.task = Some((name.to_owned(), handle));
    }

    /// Stops polling. Safe to call when idle.
    pub fn stop(&mut self) {
        if let Some((name, handle)) = self.task.take() {
            handle.abort();
            tracing::debug!(entity = %name, "stopped watching generation progress");
        }
    }
}

impl Drop for GenerationProgressMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn fetch_steps(gateway: &ApiGateway, name: &str) -> Vec<ProgressStep> {
    match gateway
        .get_json::<Value>(&format!("/api/generator/progress/{name}"), &[])
        .await
    {
        Ok(payload) => decode_progress_steps(&payload),
        Err(error) => {
            tracing::debug!(entity = name, error = %error, "progress poll failed");
            Vec::new()
        }
    }
}
