use std::{sync::Arc, time::Duration};

use rand::Rng;
use tokio::{sync::watch, task::JoinHandle, time};

/// Ceiling the simulated progress never passes before the response arrives.
pub const SIMULATED_CEILING: f64 = 90.0;
pub const MAX_STEP: f64 = 15.0;

pub fn next_progress(current: f64, step: f64) -> f64 {
    (current + step).min(SIMULATED_CEILING)
}

/// Advances a percentage on a timer, independent of real upload progress.
/// The task is aborted when the ticker is completed or dropped.
pub struct ProgressTicker {
    sender: Arc<watch::Sender<f64>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn start(sender: Arc<watch::Sender<f64>>, tick: Duration) -> Self {
        sender.send_replace(0.0);

        let task_sender = sender.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick);
            interval.tick().await;
            loop {
                interval.tick().await;
                let step = rand::thread_rng().gen_range(0.0..MAX_STEP);
                task_sender.send_modify(|progress| *progress = next_progress(*progress, step));
            }
        });

        Self {
            sender,
            handle: Some(handle),
        }
    }

    /// Stops ticking and jumps to 100%.
    pub fn complete(mut self) {
        self.stop();
        self.sender.send_replace(100.0);
    }

    /// Stops ticking and hides the indicator.
    pub fn abandon(mut self) {
        self.stop();
        self.sender.send_replace(0.0);
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
