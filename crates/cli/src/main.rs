//! Avatar Studio CLI - profile, login, avatar generation and gallery.
//!
//! # Usage
//!
//! ```bash
//! # Register a profile (marks the session logged in)
//! avatar-studio register -u alice --country-of-origin Chile --country-of-occupation Peru \
//!     --age 19-25 --gender Female --ethnicity "Hispanic or Latino" --occupation Engineer \
//!     --languages Spanish,English
//!
//! # Log in / out
//! avatar-studio login -u alice
//! avatar-studio logout
//!
//! # Generate an avatar and list previous ones
//! avatar-studio generate --prompt "a realistic portrait" --out me.png
//! avatar-studio gallery --out-dir avatars/
//! ```
//!
//! # Commands
//!
//! - `register` - Submit the profile form
//! - `login` / `logout` / `reset-password` - Session transitions
//! - `status` - Show the stored session
//! - `quota` - Show remaining generations
//! - `generate` - Generate one avatar (requires login)
//! - `gallery` - List previous avatars (requires login)
//! - `locate` - Detect the current country from coordinates
//! - `watch` - Report session changes made by other processes

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process;

use avatar_studio_client::ClientConfig;
use avatar_studio_core::{AgeRange, Ethnicity, Gender};
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::{CommandError, Context};

/// Shown when a command fails in a way it did not anticipate.
const FALLBACK_NOTICE: &str = "Something went wrong. Please try again.";

#[derive(Parser)]
#[command(name = "avatar-studio")]
#[command(author, version, about = "Avatar Studio command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a profile locally and on the backend, then log in
    Register(ProfileArgs),
    /// Log in with the stored user id and password
    Login(CredentialArgs),
    /// Log out and remove every stored session key
    Logout,
    /// Set a new password for the stored user id
    ResetPassword(CredentialArgs),
    /// Show the stored session
    Status,
    /// Show remaining avatar generations
    Quota,
    /// Generate one avatar from a prompt
    Generate {
        /// Text prompt describing the avatar
        #[arg(short, long)]
        prompt: String,

        /// Where to write the image
        #[arg(short, long, default_value = "avatar.png")]
        out: PathBuf,
    },
    /// List previously generated avatars
    Gallery {
        /// Also write every image into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Detect the current country from coordinates
    Locate {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Print session changes made elsewhere until interrupted
    Watch,
}

#[derive(clap::Args)]
struct CredentialArgs {
    /// User id (the registered name)
    #[arg(short, long)]
    user_id: String,

    /// Password; read from stdin when omitted
    #[arg(short, long)]
    password: Option<String>,
}

#[derive(clap::Args)]
struct ProfileArgs {
    #[command(flatten)]
    credentials: CredentialArgs,

    #[arg(long)]
    country_of_origin: String,

    /// Defaults to the country detected by `locate`
    #[arg(long)]
    country_of_occupation: Option<String>,

    /// Age brackets, comma separated (e.g. `19-25,26-35`)
    #[arg(long, value_delimiter = ',')]
    age: Vec<AgeRange>,

    #[arg(long)]
    gender: Option<Gender>,

    #[arg(long)]
    ethnicity: Option<Ethnicity>,

    #[arg(long, default_value = "")]
    occupation: String,

    /// Spoken languages, comma separated
    #[arg(long, value_delimiter = ',')]
    languages: Vec<String>,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            output::error(format_args!("Configuration error: {e}"));
            process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = init_sentry(&config);

    // Log to stderr so command output stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "avatar_studio=info,avatar_studio_client=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // A panic inside the command surfaces here as a join error instead of
    // tearing down the process with a raw backtrace
    let code = match tokio::spawn(run(cli, config)).await {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            if e.is_internal() {
                tracing::error!(error = %e, "Command failed");
            }
            output::error(e.user_message());
            1
        }
        Err(e) => {
            tracing::error!(error = %e, "Command aborted unexpectedly");
            output::error(FALLBACK_NOTICE);
            2
        }
    };

    // Flush pending Sentry events before exiting
    drop(sentry_guard);
    process::exit(code);
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CommandError> {
    let ctx = Context::new(config)?;

    match cli.command {
        Commands::Register(args) => {
            let password = commands::read_password(args.credentials.password).await?;
            let form = commands::account::RegisterInput {
                user_id: args.credentials.user_id,
                password,
                country_of_origin: args.country_of_origin,
                country_of_occupation: args.country_of_occupation,
                age: args.age,
                gender: args.gender,
                ethnicity: args.ethnicity,
                occupation: args.occupation,
                languages: args.languages,
            };
            commands::account::register(&ctx, form).await?;
        }
        Commands::Login(args) => {
            let password = commands::read_password(args.password).await?;
            commands::account::login(&ctx, &args.user_id, &password)?;
        }
        Commands::Logout => commands::account::logout(&ctx)?,
        Commands::ResetPassword(args) => {
            let password = commands::read_password(args.password).await?;
            commands::account::reset_password(&ctx, &args.user_id, &password)?;
        }
        Commands::Status => commands::account::status(&ctx),
        Commands::Quota => commands::avatar::quota(&ctx).await,
        Commands::Generate { prompt, out } => {
            commands::avatar::generate(&ctx, &prompt, &out).await?;
        }
        Commands::Gallery { out_dir } => {
            commands::avatar::gallery(&ctx, out_dir.as_deref()).await?;
        }
        Commands::Locate { lat, lon } => commands::location::locate(&ctx, lat, lon).await?,
        Commands::Watch => commands::watch::watch(&ctx).await?,
    }
    Ok(())
}
