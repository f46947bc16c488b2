//! CLI command definitions and dispatch.

use crate::app::{resolve_due, App};
use crate::category::Category;
use crate::clock::{Clock, SystemClock};
use crate::config::DEFAULT_RESCAN_SECS;
use crate::dispatch::EventBus;
use crate::error::{AppError, AppResult};
use crate::notifier::ConsoleNotifier;
use crate::output::{print_item, print_list, print_success, CategoryRow, OutputFormat, ReminderRow};
use crate::reminder::{parse_date, parse_time, NewReminder, Priority, Recurrence, ReminderUpdate};
use crate::scheduler::TokioAlarmScheduler;
use crate::service;
use crate::storage::{CategoryStore, ReminderStore};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Natural Reminders: recurring reminders with local alarms
#[derive(Debug, Parser)]
#[command(name = "reminders", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding storage, settings and logs
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Also log info-level events to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile, then stay up firing alarms and taking answers on stdin
    Run {
        /// Seconds between rescans for reminders written by other processes
        #[arg(long, default_value_t = DEFAULT_RESCAN_SECS)]
        rescan_secs: u64,
    },
    /// Run one reconciliation pass and print what changed
    Reconcile,
    /// Add a reminder
    Add(AddArgs),
    /// Change fields of an existing reminder
    Edit(EditArgs),
    /// List reminders by due time
    List {
        /// Include completed reminders
        #[arg(long)]
        all: bool,
    },
    /// Show one reminder
    Show { id: String },
    /// Mark a reminder completed, even a recurring one
    Complete { id: String },
    /// Mark a completed reminder open again
    Reopen { id: String },
    /// Push a reminder back by the configured snooze length
    Snooze { id: String },
    /// Delete a reminder
    Delete { id: String },
    /// Category management
    #[command(subcommand)]
    Categories(CategoryCommand),
    /// Settings management
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// What to be reminded of
    pub title: String,
    /// Due date, YYYY-MM-DD (default: next occurrence of the time)
    #[arg(long)]
    pub date: Option<String>,
    /// Time of day, HH:MM[:SS] (default: configured default reminder time)
    #[arg(long)]
    pub time: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// low, medium or high (default: configured default priority)
    #[arg(long)]
    pub priority: Option<String>,
    /// Tag, repeatable
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Category id
    #[arg(long)]
    pub category: Option<String>,
    /// Repeat daily, weekly, monthly or yearly
    #[arg(long)]
    pub every: Option<String>,
    /// Units between repeats
    #[arg(long, default_value_t = 1)]
    pub interval: u32,
    /// Last date a repeat may fall on, YYYY-MM-DD
    #[arg(long)]
    pub until: Option<String>,
    /// Don't raise a notification when it fires
    #[arg(long)]
    pub silent: bool,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    /// New description, an empty string clears it
    #[arg(long)]
    pub description: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,
    /// HH:MM[:SS]
    #[arg(long)]
    pub time: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    /// Replaces all tags, repeatable
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Category id
    #[arg(long, conflicts_with = "no_category")]
    pub category: Option<String>,
    /// Remove the category
    #[arg(long)]
    pub no_category: bool,
    /// Repeat daily, weekly, monthly or yearly
    #[arg(long, conflicts_with = "no_repeat")]
    pub every: Option<String>,
    #[arg(long, requires = "every")]
    pub interval: Option<u32>,
    #[arg(long, requires = "every")]
    pub until: Option<String>,
    /// Stop repeating
    #[arg(long)]
    pub no_repeat: bool,
    /// Don't raise a notification when it fires
    #[arg(long, conflicts_with = "notify")]
    pub silent: bool,
    /// Raise a notification when it fires
    #[arg(long)]
    pub notify: bool,
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    /// List categories
    List,
    /// Add a category
    Add {
        id: String,
        name: String,
        /// #RRGGBB
        #[arg(long, default_value = "#6B7280")]
        color: String,
        #[arg(long, default_value = "tag")]
        icon: String,
    },
    /// Change a category
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Remove a category
    Remove { id: String },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Print current settings
    Show,
    /// Set one value: snooze-minutes, default-reminder-time,
    /// default-priority, default-tags, notification-sound
    Set { key: String, value: String },
    /// Restore defaults
    Reset,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, data_dir: PathBuf) -> AppResult<()> {
        let mut app = App::open(data_dir).await?;
        let format = self.format;

        match &self.command {
            Commands::Run { rescan_secs } => {
                let stats = service::run(&app, Duration::from_secs((*rescan_secs).max(1))).await?;
                print_success(&format!("service stopped after {} events", stats.handled));
            }
            Commands::Reconcile => {
                let (events, _receiver) = EventBus::new(1).into_parts();
                let scheduler = Arc::new(TokioAlarmScheduler::new(events));
                let reconciler = app.reconciler(scheduler.clone(), Arc::new(ConsoleNotifier));
                let report = reconciler.reconcile(SystemClock.now()).await?;
                scheduler.cancel_all();
                print_item(&report, format);
            }
            Commands::Add(args) => {
                let new = new_reminder(args, &app)?;
                let reminder = app.add_reminder(new).await?;
                print_item(&reminder, format);
            }
            Commands::Edit(args) => {
                let reminder = app.edit_reminder(&args.id, reminder_update(args)?).await?;
                print_item(&reminder, format);
            }
            Commands::List { all } => {
                let reminders = app.list_reminders(*all).await?;
                print_list::<_, ReminderRow>(&reminders, format);
            }
            Commands::Show { id } => {
                print_item(&app.get_reminder(id).await?, format);
            }
            Commands::Complete { id } => {
                let (events, _receiver) = EventBus::new(1).into_parts();
                let reconciler = app.reconciler(
                    Arc::new(TokioAlarmScheduler::new(events)),
                    Arc::new(ConsoleNotifier),
                );
                let reminder = reconciler.complete(id).await?;
                print_success(&format!("completed `{}`", reminder.title));
            }
            Commands::Reopen { id } => {
                let reminder = app
                    .store
                    .update_by_id(id, ReminderUpdate::completed(false))
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("reminder {}", id)))?;
                print_success(&format!("reopened `{}`", reminder.title));
            }
            Commands::Snooze { id } => {
                let (events, _receiver) = EventBus::new(1).into_parts();
                let scheduler = Arc::new(TokioAlarmScheduler::new(events));
                let reconciler = app.reconciler(scheduler.clone(), Arc::new(ConsoleNotifier));
                let reminder = reconciler.snooze(id, SystemClock.now()).await?;
                scheduler.cancel_all();
                print_success(&format!(
                    "snoozed `{}` until {}",
                    reminder.title,
                    reminder.due_at().format("%Y-%m-%d %H:%M:%S")
                ));
            }
            Commands::Delete { id } => {
                app.delete_reminder(id).await?;
                print_success(&format!("deleted {}", id));
            }
            Commands::Categories(command) => execute_category(command, &app, format).await?,
            Commands::Settings(command) => match command {
                SettingsCommand::Show => print_item(&app.settings, format),
                SettingsCommand::Set { key, value } => {
                    let mut settings = app.settings.clone();
                    settings.set(key, value)?;
                    app.save_settings(settings).await?;
                    print_success(&format!("{} = {}", key, value));
                }
                SettingsCommand::Reset => {
                    app.settings = app.settings_store.reset().await?;
                    print_success("settings restored to defaults");
                }
            },
        }

        Ok(())
    }
}

async fn execute_category(
    command: &CategoryCommand,
    app: &App,
    format: OutputFormat,
) -> AppResult<()> {
    match command {
        CategoryCommand::List => {
            let categories = app.store.get_all_categories().await?;
            print_list::<_, CategoryRow>(&categories, format);
        }
        CategoryCommand::Add {
            id,
            name,
            color,
            icon,
        } => {
            app.store
                .add_category(Category {
                    id: id.clone(),
                    name: name.clone(),
                    color: color.clone(),
                    icon: icon.clone(),
                    description: None,
                })
                .await?;
            print_success(&format!("added category {}", id));
        }
        CategoryCommand::Update {
            id,
            name,
            color,
            icon,
        } => {
            let mut category = app
                .store
                .get_category(id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("category {}", id)))?;
            if let Some(name) = name {
                category.name = name.clone();
            }
            if let Some(color) = color {
                category.color = color.clone();
            }
            if let Some(icon) = icon {
                category.icon = icon.clone();
            }
            app.store.update_category(category).await?;
            print_success(&format!("updated category {}", id));
        }
        CategoryCommand::Remove { id } => {
            app.store.remove_category(id).await?;
            print_success(&format!("removed category {}", id));
        }
    }
    Ok(())
}

fn new_reminder(args: &AddArgs, app: &App) -> AppResult<NewReminder> {
    let date = args.date.as_deref().map(parse_date).transpose()?;
    let time = args.time.as_deref().map(parse_time).transpose()?;
    let due_at = resolve_due(date, time, app.settings.reminder_time()?, SystemClock.now());

    let mut new = NewReminder::new(args.title.clone(), due_at);
    new.description = args.description.clone();
    new.priority = match &args.priority {
        Some(priority) => priority.parse()?,
        None => app.settings.default_priority,
    };
    new.tags = args.tags.iter().map(|t| t.trim().to_string()).collect();
    new.category_id = args.category.clone();
    new.notification = !args.silent;

    if let Some(every) = &args.every {
        let mut rule = Recurrence::new(every.parse()?, args.interval);
        rule.end_date = args.until.as_deref().map(parse_date).transpose()?;
        rule.validate()?;
        new.recurring = Some(rule);
    } else if args.until.is_some() {
        return Err(AppError::validation("--until needs --every"));
    }

    Ok(new)
}

fn reminder_update(args: &EditArgs) -> AppResult<ReminderUpdate> {
    let mut update = ReminderUpdate {
        title: args.title.clone(),
        description: args
            .description
            .as_ref()
            .map(|d| Some(d.trim().to_string()).filter(|d| !d.is_empty())),
        date: args.date.as_deref().map(parse_date).transpose()?,
        time: args.time.as_deref().map(parse_time).transpose()?,
        priority: args.priority.as_deref().map(str::parse::<Priority>).transpose()?,
        ..ReminderUpdate::default()
    };
    if !args.tags.is_empty() {
        update.tags = Some(args.tags.iter().map(|t| t.trim().to_string()).collect());
    }
    if args.no_category {
        update.category_id = Some(None);
    } else if let Some(category) = &args.category {
        update.category_id = Some(Some(category.clone()));
    }
    if args.no_repeat {
        update.recurring = Some(None);
    } else if let Some(every) = &args.every {
        let mut rule = Recurrence::new(every.parse()?, args.interval.unwrap_or(1));
        rule.end_date = args.until.as_deref().map(parse_date).transpose()?;
        update.recurring = Some(Some(rule));
    }
    if args.silent {
        update.notification = Some(false);
    } else if args.notify {
        update.notification = Some(true);
    }
    Ok(update)
}
