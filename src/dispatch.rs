use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::reconcile::Reconciler;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Everything the service reacts to arrives as one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Startup,
    AlarmFired {
        name: String,
    },
    NotificationAction {
        notification_id: String,
        action_index: usize,
    },
    Rescan,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: Sender<Event>,
}

impl EventSender {
    pub async fn send(&self, event: Event) -> AppResult<()> {
        self.sender
            .send(event)
            .await
            .map_err(|e| AppError::scheduler(format!("event queue closed: {:?}", e.0)))
    }
}

pub struct EventBus {
    sender: EventSender,
    receiver: Receiver<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = channel::<Event>(capacity);
        Self {
            sender: EventSender { sender },
            receiver,
        }
    }

    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    pub fn into_parts(self) -> (EventSender, Receiver<Event>) {
        (self.sender, self.receiver)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub handled: usize,
    pub failed: usize,
}

/// Single consumer of the event queue. Events are handled strictly one
/// after another, which serializes alarm fires against reconciliation.
pub struct Dispatcher {
    reconciler: Arc<Reconciler>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(reconciler: Arc<Reconciler>, clock: Arc<dyn Clock>) -> Self {
        Self { reconciler, clock }
    }

    /// Runs until `Event::Shutdown` or until every sender is gone.
    pub async fn run(&self, mut receiver: Receiver<Event>) -> DispatchStats {
        info!("starting dispatch loop");
        let mut stats = DispatchStats::default();

        while let Some(event) = receiver.recv().await {
            stats.handled += 1;
            match self.handle(event).await {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => break,
                Err(e) => {
                    stats.failed += 1;
                    if e.is_transient() {
                        warn!(error = %e, "event failed, will retry on next trigger");
                    } else {
                        error!(error = %e, "event rejected");
                    }
                }
            }
        }

        info!(handled = stats.handled, failed = stats.failed, "dispatch loop done");
        stats
    }

    pub async fn handle(&self, event: Event) -> AppResult<ControlFlow<()>> {
        let now = self.clock.now();
        debug!(?event, %now, "dispatching");

        match event {
            Event::Startup => {
                let report = self.reconciler.reconcile(now).await?;
                info!(?report, "startup reconciliation finished");
            }
            Event::AlarmFired { name } => {
                self.reconciler.on_alarm(&name, now).await?;
            }
            Event::NotificationAction {
                notification_id,
                action_index,
            } => {
                self.reconciler
                    .on_notification_action(&notification_id, action_index, now)
                    .await?;
            }
            Event::Rescan => {
                let report = self.reconciler.rescan(now).await?;
                if !report.is_idle() {
                    info!(?report, "rescan finished");
                }
            }
            Event::Shutdown => return Ok(ControlFlow::Break(())),
        }

        Ok(ControlFlow::Continue(()))
    }
}

/// Posts `Event::Rescan` every `period` until the queue closes.
pub fn spawn_rescan_ticker(events: EventSender, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // the first tick completes immediately and startup already reconciled
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if events.send(Event::Rescan).await.is_err() {
                break;
            }
        }
    })
}
