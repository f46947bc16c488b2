use crate::app::App;
use crate::clock::SystemClock;
use crate::config::{ACTION_COMPLETE, ACTION_SNOOZE, EVENT_QUEUE_CAPACITY};
use crate::dispatch::{spawn_rescan_ticker, DispatchStats, Dispatcher, Event, EventBus, EventSender};
use crate::error::AppResult;
use crate::notifier::ConsoleNotifier;
use crate::reconcile::notification_id;
use crate::scheduler::TokioAlarmScheduler;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Long-lived session: startup reconciliation, then alarms, periodic
/// rescans and console answers, all through one dispatch loop, until
/// Ctrl-C or `quit`.
pub async fn run(app: &App, rescan_every: Duration) -> AppResult<DispatchStats> {
    let (events, receiver) = EventBus::new(EVENT_QUEUE_CAPACITY).into_parts();

    let scheduler = Arc::new(TokioAlarmScheduler::new(events.clone()));
    let reconciler = Arc::new(app.reconciler(scheduler.clone(), Arc::new(ConsoleNotifier)));
    let dispatcher = Dispatcher::new(reconciler, Arc::new(SystemClock));

    events.send(Event::Startup).await?;
    let tasks = [
        spawn_rescan_ticker(events.clone(), rescan_every),
        spawn_console_reader(events.clone()),
        spawn_shutdown_on_ctrl_c(events),
    ];

    info!(rescan_secs = rescan_every.as_secs(), "reminder service running");
    let stats = dispatcher.run(receiver).await;

    for task in tasks {
        task.abort();
    }
    let pending = scheduler.pending();
    if !pending.is_empty() {
        info!(pending = pending.len(), "dropping pending alarms on shutdown");
    }
    scheduler.cancel_all();
    Ok(stats)
}

/// Turns an answer typed into the service terminal into an event.
///
/// `complete <id>`, `snooze <id>`, `<action index> <id>`, `rescan`, `quit`.
pub fn parse_console_line(line: &str) -> Option<Event> {
    let mut words = line.split_whitespace();
    let command = words.next()?;
    let argument = words.next();
    if words.next().is_some() {
        return None;
    }

    match (command.to_ascii_lowercase().as_str(), argument) {
        ("quit" | "exit" | "q", None) => Some(Event::Shutdown),
        ("rescan", None) => Some(Event::Rescan),
        ("complete" | "c", Some(id)) => Some(action(id, ACTION_COMPLETE)),
        ("snooze" | "s", Some(id)) => Some(action(id, ACTION_SNOOZE)),
        (index, Some(id)) => index.parse().ok().map(|index| action(id, index)),
        _ => None,
    }
}

fn action(reminder_id: &str, action_index: usize) -> Event {
    Event::NotificationAction {
        notification_id: notification_id(reminder_id),
        action_index,
    }
}

fn spawn_console_reader(events: EventSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "stopped reading console answers");
                    break;
                }
            };
            match parse_console_line(&line) {
                Some(event) => {
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => println!(
                    "unrecognized `{}`, try `complete <id>`, `snooze <id>` or `quit`",
                    line.trim()
                ),
            }
        }
    })
}

fn spawn_shutdown_on_ctrl_c(events: EventSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            return;
        }
        info!("Ctrl-C received, shutting down");
        let _ = events.send(Event::Shutdown).await;
    })
}
