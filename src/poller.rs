use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Repeating tick source for focused-process polling. Aborted when dropped.
#[derive(Debug)]
pub struct FocusPoller {
    task: JoinHandle<()>,
}

impl FocusPoller {
    pub fn start(period: Duration, ticks: mpsc::UnboundedSender<()>) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if ticks.send(()).is_err() {
                    break;
                }
            }
        });
        Self { task }
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for FocusPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}
