mod config;
mod handlers;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use storage::Backend;
use storage::backend::{FileSessionStore, OAuthProvider};
use tracing_subscriber::EnvFilter;
use tracker::{Store, SystemClock};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "ironlog")]
#[command(about = "Workout log: sessions, routines, exercise library and body metrics", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Auth(AuthCommand),
    #[command(subcommand)]
    Workouts(WorkoutCommand),
    #[command(subcommand)]
    Session(SessionCommand),
    #[command(subcommand)]
    Routines(RoutineCommand),
    #[command(subcommand)]
    Library(LibraryCommand),
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Volume and max-weight trends
    Progress {
        #[arg(long, default_value = "month")]
        range: tracker::progress::TimeRange,

        /// Show the trend of one exercise
        #[arg(long)]
        exercise: Option<String>,
    },
}

#[derive(Subcommand)]
enum AuthCommand {
    Login {
        #[arg(long, env = "IRONLOG_EMAIL")]
        email: String,
        #[arg(long, env = "IRONLOG_PASSWORD")]
        password: String,
    },
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Continue without an account
    Guest,
    /// Print the URL that starts a federated sign-in
    OauthUrl {
        #[arg(value_enum)]
        provider: Provider,
        #[arg(long)]
        redirect_to: Option<String>,
    },
    /// Finish a federated sign-in from the URL the browser landed on
    OauthComplete { redirect_url: String },
    Logout,
    Whoami,
}

#[derive(Clone, Copy, ValueEnum)]
enum Provider {
    Google,
    Github,
    Apple,
}

impl From<Provider> for OAuthProvider {
    fn from(provider: Provider) -> Self {
        match provider {
            Provider::Google => OAuthProvider::Google,
            Provider::Github => OAuthProvider::Github,
            Provider::Apple => OAuthProvider::Apple,
        }
    }
}

#[derive(Subcommand)]
enum WorkoutCommand {
    /// Workouts grouped by month
    List {
        #[arg(long)]
        recent: Option<usize>,
    },
    Show { date: NaiveDate },
    /// Stamp the end time of a workout
    Finish { id: i64 },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Start today's workout, or continue the one in progress
    Start,
    /// Add an exercise with its sets to today's workout and save it
    Log {
        /// Library exercise id
        #[arg(long, conflicts_with = "name")]
        library: Option<String>,

        /// Free-text exercise name
        #[arg(long)]
        name: Option<String>,

        /// REPSxWEIGHT, e.g. 8x62.5; repeat for more sets
        #[arg(long = "set", value_parser = handlers::parse_set, required = true)]
        sets: Vec<(i32, Decimal)>,
    },
    /// Run the live timer until Ctrl-C; finishes the workout after two hours
    Watch,
    /// End today's session now
    Finish,
    /// Leave the session; an empty one is discarded
    Cancel,
}

#[derive(Subcommand)]
enum RoutineCommand {
    List,
    Show { id: i64 },
    Create {
        name: String,
        /// Library exercise ids, in order
        #[arg(long = "exercise", required = true)]
        exercises: Vec<String>,
    },
    /// Save a renamed duplicate
    Copy { id: i64 },
    Delete { id: i64 },
    /// Open today's workout prefilled from a routine
    Start {
        id: i64,
        /// Add to a workout already logged today
        #[arg(long)]
        append: bool,
    },
}

#[derive(Subcommand)]
enum LibraryCommand {
    Search {
        #[arg(default_value = "")]
        query: String,
        /// all, favorites or a body part
        #[arg(long, default_value = "all")]
        filter: String,
    },
    BodyParts,
    Show { id: String },
    /// Toggle an exercise in the favorites
    Favorite { id: String },
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Profile card with BMI
    Show,
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<i32>,
    },
    /// Record today's weight (kg) and height (cm)
    Measure {
        #[arg(long)]
        weight: Option<Decimal>,
        #[arg(long)]
        height: Option<Decimal>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = Config::from_env().context("Failed to load ironlog configuration")?;
    let backend = Backend::new(&config.backend()).context("Failed to build backend client")?;
    let sessions = Arc::new(FileSessionStore::new(&config.session_file));

    let mut store = Store::new(backend, sessions, SystemClock).with_image_bucket(&config.image_bucket);
    let out = handlers::Output { json: cli.json };

    if !matches!(cli.command, Commands::Auth(_))
        && !store
            .restore_session()
            .await
            .context("Failed to restore session")?
    {
        anyhow::bail!("Not signed in; run `ironlog auth login` first");
    }

    match cli.command {
        Commands::Auth(cmd) => handle_auth(&mut store, cmd, out).await,
        Commands::Workouts(cmd) => handle_workouts(&mut store, cmd, out).await,
        Commands::Session(cmd) => handle_session(&mut store, cmd, out).await,
        Commands::Routines(cmd) => handle_routines(&mut store, cmd, out).await,
        Commands::Library(cmd) => handle_library(&mut store, cmd, out).await,
        Commands::Profile(cmd) => handle_profile(&mut store, cmd, out).await,
        Commands::Progress { range, exercise } => {
            handlers::progress(&store, range, exercise.as_deref(), out)
        }
    }
}

async fn handle_auth(store: &mut Store, cmd: AuthCommand, out: handlers::Output) -> Result<()> {
    match cmd {
        AuthCommand::Login { email, password } => handlers::login(store, email, password).await,
        AuthCommand::Signup {
            email,
            password,
            confirm_password,
        } => handlers::signup(store, email, password, confirm_password).await,
        AuthCommand::Guest => {
            store.sign_in_anonymously().await?;
            println!("Signed in as a guest");
            Ok(())
        }
        AuthCommand::OauthUrl {
            provider,
            redirect_to,
        } => {
            println!("{}", store.authorize_url(provider.into(), redirect_to.as_deref())?);
            Ok(())
        }
        AuthCommand::OauthComplete { redirect_url } => {
            store.complete_oauth(&redirect_url).await?;
            handlers::whoami(store, out)
        }
        AuthCommand::Logout => {
            if store.restore_session().await? {
                store.sign_out().await?;
            }
            println!("Signed out");
            Ok(())
        }
        AuthCommand::Whoami => {
            store.restore_session().await?;
            handlers::whoami(store, out)
        }
    }
}

async fn handle_workouts(store: &mut Store, cmd: WorkoutCommand, out: handlers::Output) -> Result<()> {
    match cmd {
        WorkoutCommand::List { recent } => handlers::list_workouts(store, recent, out),
        WorkoutCommand::Show { date } => handlers::show_workout(store, date, out),
        WorkoutCommand::Finish { id } => {
            let workout = store.finish_workout(id).await?;
            handlers::print_workout(store, &workout, out)
        }
        WorkoutCommand::Delete { id } => {
            store.delete_workout(id).await?;
            println!("Workout {} deleted", id);
            Ok(())
        }
    }
}

async fn handle_session(store: &mut Store, cmd: SessionCommand, out: handlers::Output) -> Result<()> {
    match cmd {
        SessionCommand::Start => {
            store.start_or_continue_today().await?;
            handlers::print_editor(store, out)
        }
        SessionCommand::Log {
            library,
            name,
            sets,
        } => handlers::log_exercise(store, library, name, sets, out).await,
        SessionCommand::Watch => handlers::watch(store).await,
        SessionCommand::Finish => handlers::finish_today(store, out).await,
        SessionCommand::Cancel => {
            store.cancel_editor().await?;
            println!("Left the session");
            Ok(())
        }
    }
}

async fn handle_routines(store: &mut Store, cmd: RoutineCommand, out: handlers::Output) -> Result<()> {
    match cmd {
        RoutineCommand::List => handlers::list_routines(store, out),
        RoutineCommand::Show { id } => handlers::show_routine(store, id, out),
        RoutineCommand::Create { name, exercises } => {
            handlers::create_routine(store, name, exercises, out).await
        }
        RoutineCommand::Copy { id } => {
            store.copy_routine(id)?;
            let saved = store.save_routine().await?;
            println!("Saved \"{}\" as routine {}", saved.name, saved.id);
            Ok(())
        }
        RoutineCommand::Delete { id } => {
            store.delete_routine(id).await?;
            println!("Routine {} deleted", id);
            Ok(())
        }
        RoutineCommand::Start { id, append } => handlers::start_routine(store, id, append, out).await,
    }
}

async fn handle_library(store: &mut Store, cmd: LibraryCommand, out: handlers::Output) -> Result<()> {
    match cmd {
        LibraryCommand::Search { query, filter } => handlers::search_library(store, &query, &filter, out),
        LibraryCommand::BodyParts => handlers::body_parts(store, out),
        LibraryCommand::Show { id } => handlers::show_library_exercise(store, &id, out),
        LibraryCommand::Favorite { id } => {
            let favorite = store.toggle_favorite(&id).await?;
            println!(
                "{} {} favorites",
                id,
                if favorite { "added to" } else { "removed from" }
            );
            Ok(())
        }
    }
}

async fn handle_profile(store: &mut Store, cmd: ProfileCommand, out: handlers::Output) -> Result<()> {
    match cmd {
        ProfileCommand::Show => handlers::show_profile(store, out),
        ProfileCommand::Update { name, age } => {
            store
                .update_profile(&storage::dto::profile::UpdateProfileRequest {
                    full_name: name,
                    age,
                })
                .await?;
            handlers::show_profile(store, out)
        }
        ProfileCommand::Measure { weight, height } => {
            store
                .add_measurement(&storage::dto::measurement::NewMeasurementRequest { weight, height })
                .await?;
            handlers::show_profile(store, out)
        }
    }
}
