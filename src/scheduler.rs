//! Recurring automatic push
//!
//! An explicitly owned timer: `configure(minutes)` replaces whatever was
//! scheduled before, `0` turns it off, and dropping the scheduler stops it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::browser::BrowserHost;
use crate::remote::ObjectStore;
use crate::sync::SyncEngine;

type Callback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub struct AutoPushScheduler {
    callback: Callback,
    task: Option<JoinHandle<()>>,
    interval_minutes: u32,
}

impl AutoPushScheduler {
    /// Scheduler invoking an arbitrary callback on every tick
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            callback: Arc::new(move || callback().boxed()),
            task: None,
            interval_minutes: 0,
        }
    }

    /// Scheduler that pushes through `engine` on every tick
    pub fn for_engine<S, H>(engine: Arc<SyncEngine<S, H>>) -> Self
    where
        S: ObjectStore + 'static,
        H: BrowserHost + 'static,
    {
        Self::new(move || {
            let engine = engine.clone();
            async move {
                let result = engine.push().await;
                match result.error {
                    None => info!("auto-push complete"),
                    Some(error) => warn!(%error, "auto-push failed"),
                }
            }
        })
    }

    /// Push every `interval_minutes`; `0` disables. Must run inside a Tokio runtime.
    pub fn configure(&mut self, interval_minutes: u32) {
        self.cancel();
        self.interval_minutes = interval_minutes;
        if interval_minutes == 0 {
            info!("auto-push disabled");
            return;
        }
        info!(interval_minutes, "auto-push scheduled");
        self.start(Duration::from_secs(u64::from(interval_minutes) * 60));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.interval_minutes = 0;
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    fn start(&mut self, period: Duration) {
        let callback = self.callback.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                callback().await;
            }
        }));
    }
}

impl Drop for AutoPushScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
