//! Habitual: habit reminders on crontab schedules
//!
//! Main binary with subcommands:
//! - `preview`: Show the merged schedule for a time and interval
//! - `owner`, `habit`, `bind-chat`, `jobs`: Manage stored habits and reminder jobs
//! - `run`: Dispatch due reminders until interrupted

use chrono::FixedOffset;
use clap::{Args, Parser, Subcommand};
use habitual_reminders::{HabitDraft, HabitId, OwnerId, ReminderConfig};
use habitual_schedule::Language;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod run;

/// Parse a UTC offset such as "+06:00", "-03:30" or "Z".
fn parse_utc_offset(s: &str) -> Result<FixedOffset, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.is_empty() {
        return FixedOffset::east_opt(0).ok_or_else(|| "invalid UTC offset".to_string());
    }
    s.parse::<FixedOffset>().map_err(|_| {
        format!(
            "invalid UTC offset '{}', expected +HH:MM or -HH:MM",
            s
        )
    })
}

/// Parse a phrase language, accepting "en"/"english" and "ru"/"russian".
fn parse_language(s: &str) -> Result<Language, String> {
    match s.to_lowercase().as_str() {
        "en" | "english" => Ok(Language::English),
        "ru" | "russian" => Ok(Language::Russian),
        _ => Err(format!("unknown language '{}', expected en or ru", s)),
    }
}

#[derive(Parser)]
#[command(name = "habitual")]
#[command(about = "Habit reminders on crontab schedules", long_about = None)]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true, env = "HABITUAL_DB", default_value = "habitual.db")]
    db: String,

    /// Local time zone habit times are written in
    #[arg(long, global = true, env = "HABITUAL_UTC_OFFSET", value_parser = parse_utc_offset, default_value = "+00:00")]
    utc_offset: FixedOffset,

    /// Seconds a queued reminder stays valid
    #[arg(long, global = true, env = "HABITUAL_EXPIRE_SECONDS", default_value = "3600")]
    expire_seconds: u64,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn config(&self) -> ReminderConfig {
        ReminderConfig {
            utc_offset: self.utc_offset,
            expire_seconds: self.expire_seconds,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged crontab and periodicity for a time and interval
    Preview {
        /// Time of day, HH:MM
        #[arg(long)]
        time: String,

        /// Interval, D/H/M (defaults to every day)
        #[arg(long)]
        interval: Option<String>,

        /// Phrase language (en, ru)
        #[arg(long, value_parser = parse_language, default_value = "en")]
        language: Language,
    },

    /// Manage habit owners
    Owner {
        #[command(subcommand)]
        command: OwnerCommand,
    },

    /// Manage habits
    Habit {
        #[command(subcommand)]
        command: HabitCommand,
    },

    /// Record the chat an owner reached us from and enable their reminders
    BindChat {
        /// Owner phone number
        phone: String,

        /// Chat id to deliver reminders to
        chat_id: i64,
    },

    /// List reminder jobs
    Jobs,

    /// Run the reminder dispatcher
    Run,
}

#[derive(Subcommand)]
enum OwnerCommand {
    /// Register an owner
    Add {
        username: String,

        /// Phone number used to match the owner's chat
        phone: String,
    },
}

#[derive(Subcommand)]
enum HabitCommand {
    /// Create a habit
    Create {
        /// Owner id
        #[arg(long)]
        owner: i64,

        #[command(flatten)]
        fields: HabitFields,
    },

    /// Update fields of a habit
    Update {
        /// Habit id
        id: i64,

        #[command(flatten)]
        fields: HabitFields,
    },

    /// Delete a habit and its reminder
    Delete {
        /// Habit id
        id: i64,
    },

    /// List an owner's habits
    List {
        /// Owner id
        #[arg(long)]
        owner: i64,
    },
}

#[derive(Args)]
struct HabitFields {
    /// Where the habit is performed
    #[arg(long)]
    place: Option<String>,

    /// What the habit is
    #[arg(long)]
    action: Option<String>,

    /// Time of day, HH:MM
    #[arg(long)]
    time: Option<String>,

    /// Interval, D/H/M
    #[arg(long)]
    interval: Option<String>,

    /// Time needed, M:SS
    #[arg(long)]
    duration: Option<String>,

    /// Whether this is a nice habit
    #[arg(long)]
    nice: Option<bool>,

    /// Nice habit performed as a reward
    #[arg(long)]
    related: Option<i64>,

    #[arg(long)]
    reward: Option<String>,

    #[arg(long)]
    published: Option<bool>,
}

impl From<HabitFields> for HabitDraft {
    fn from(fields: HabitFields) -> Self {
        HabitDraft {
            place: fields.place,
            action: fields.action,
            time_to_do: fields.time,
            interval: fields.interval,
            time_to_done: fields.duration,
            is_nice_habit: fields.nice,
            related_habit: fields.related.map(HabitId),
            reward: fields.reward,
            is_published: fields.published,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "habitual=info,habitual_reminders=info,habitual_schedule=info".to_string()
            }),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match cli.command {
        Commands::Preview {
            time,
            interval,
            language,
        } => commands::preview(&time, interval.as_deref(), language),

        Commands::Owner {
            command: OwnerCommand::Add { username, phone },
        } => commands::add_owner(&cli.db, config, &username, &phone),

        Commands::Habit { command } => match command {
            HabitCommand::Create { owner, fields } => {
                commands::create_habit(&cli.db, config, OwnerId(owner), fields.into())
            }
            HabitCommand::Update { id, fields } => {
                commands::update_habit(&cli.db, config, HabitId(id), fields.into())
            }
            HabitCommand::Delete { id } => commands::delete_habit(&cli.db, config, HabitId(id)),
            HabitCommand::List { owner } => {
                commands::list_habits(&cli.db, config, OwnerId(owner))
            }
        },

        Commands::BindChat { phone, chat_id } => {
            commands::bind_chat(&cli.db, config, &phone, chat_id)
        }

        Commands::Jobs => commands::list_jobs(&cli.db, config),

        Commands::Run => run::run(&cli.db, config).await,
    }
}
