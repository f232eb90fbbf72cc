mod application;
mod domain;
mod infrastructure;

use application::commands::{
    AppState, HostMode, TimerStateResponse, TipResponse, add_site_impl, get_focus_tip_impl,
    get_timer_state_impl, list_sites_impl, pause_timer_impl, remove_site_impl, reset_timer_impl,
    start_timer_impl, switch_phase_impl, toggle_timer_impl, update_settings_impl,
};
use clap::{Parser, Subcommand};
use domain::models::BlockedSite;
use infrastructure::config::resolve_workspace_root;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "tomato-focus")]
#[command(about = "Pomodoro focus timer that blocks distracting sites during work phases.")]
struct Cli {
    /// Workspace holding config/, state/ and logs/.
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,
    /// Keep all state in memory and skip system side effects.
    #[arg(long, global = true)]
    local: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current timer state.
    Status,
    Start,
    Pause,
    /// Start when paused, pause when running.
    Toggle,
    /// Restore the full duration of the current phase.
    Reset,
    /// Jump to a phase, paused: work, short-break or long-break.
    Switch { phase: String },
    /// Change durations; omitted values are kept.
    Settings {
        #[arg(long)]
        work: Option<u32>,
        #[arg(long)]
        short_break: Option<u32>,
        #[arg(long)]
        long_break: Option<u32>,
        #[arg(long)]
        interval: Option<u32>,
    },
    /// Manage the block list.
    Sites {
        #[command(subcommand)]
        command: SitesCommand,
    },
    /// Print a focus tip for the current phase.
    Tip,
    /// Keep ticking in the foreground until Ctrl+C.
    Run,
}

#[derive(Subcommand, Debug)]
enum SitesCommand {
    List,
    Add { url: String },
    Remove { id: String },
}

#[derive(Debug, Serialize)]
struct RemoveSiteResponse {
    id: String,
    removed: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let formatted = serde_json::to_string_pretty(value).map_err(|error| error.to_string())?;
    println!("{formatted}");
    Ok(())
}

async fn timer_state(state: &AppState) -> Result<TimerStateResponse, String> {
    get_timer_state_impl(state)
        .await
        .map_err(|error| state.command_error("get_timer_state", &error))
}

async fn start_timer(state: &AppState) -> Result<TimerStateResponse, String> {
    start_timer_impl(state)
        .await
        .map_err(|error| state.command_error("start_timer", &error))
}

async fn pause_timer(state: &AppState) -> Result<TimerStateResponse, String> {
    pause_timer_impl(state)
        .await
        .map_err(|error| state.command_error("pause_timer", &error))
}

async fn toggle_timer(state: &AppState) -> Result<TimerStateResponse, String> {
    toggle_timer_impl(state)
        .await
        .map_err(|error| state.command_error("toggle_timer", &error))
}

async fn reset_timer(state: &AppState) -> Result<TimerStateResponse, String> {
    reset_timer_impl(state)
        .await
        .map_err(|error| state.command_error("reset_timer", &error))
}

async fn switch_phase(state: &AppState, phase: String) -> Result<TimerStateResponse, String> {
    switch_phase_impl(state, phase)
        .await
        .map_err(|error| state.command_error("switch_phase", &error))
}

async fn update_settings(
    state: &AppState,
    work: Option<u32>,
    short_break: Option<u32>,
    long_break: Option<u32>,
    interval: Option<u32>,
) -> Result<TimerStateResponse, String> {
    update_settings_impl(state, work, short_break, long_break, interval)
        .await
        .map_err(|error| state.command_error("update_settings", &error))
}

async fn list_sites(state: &AppState) -> Result<Vec<BlockedSite>, String> {
    list_sites_impl(state)
        .await
        .map_err(|error| state.command_error("list_sites", &error))
}

async fn add_site(state: &AppState, url: String) -> Result<BlockedSite, String> {
    add_site_impl(state, url)
        .await
        .map_err(|error| state.command_error("add_site", &error))
}

async fn remove_site(state: &AppState, id: String) -> Result<RemoveSiteResponse, String> {
    let removed = remove_site_impl(state, id.clone())
        .await
        .map_err(|error| state.command_error("remove_site", &error))?;
    Ok(RemoveSiteResponse { id, removed })
}

async fn focus_tip(state: &AppState) -> Result<TipResponse, String> {
    get_focus_tip_impl(state)
        .await
        .map_err(|error| state.command_error("get_focus_tip", &error))
}

/// Holds the process open so the armed ticker keeps the timer moving. Shutdown
/// leaves the persisted state as-is; the next start reconciles it.
async fn run_foreground(state: &AppState) -> Result<(), String> {
    print_json(&timer_state(state).await?)?;
    state.log_info("run", "foreground ticking started");
    tokio::signal::ctrl_c()
        .await
        .map_err(|error| format!("failed to wait for Ctrl+C: {error}"))?;
    state.log_info("run", "foreground ticking stopped");
    print_json(&timer_state(state).await?)
}

async fn dispatch(cli: Cli) -> Result<(), String> {
    let mode = if cli.local {
        HostMode::LocalOnly
    } else {
        HostMode::Persistent
    };
    let workspace_root = resolve_workspace_root(cli.workspace).map_err(|error| error.to_string())?;
    let state = AppState::open(workspace_root, mode)
        .await
        .map_err(|error| error.to_string())?;

    match cli.command {
        Command::Status => print_json(&timer_state(&state).await?),
        Command::Start => print_json(&start_timer(&state).await?),
        Command::Pause => print_json(&pause_timer(&state).await?),
        Command::Toggle => print_json(&toggle_timer(&state).await?),
        Command::Reset => print_json(&reset_timer(&state).await?),
        Command::Switch { phase } => print_json(&switch_phase(&state, phase).await?),
        Command::Settings {
            work,
            short_break,
            long_break,
            interval,
        } => print_json(&update_settings(&state, work, short_break, long_break, interval).await?),
        Command::Sites { command } => match command {
            SitesCommand::List => print_json(&list_sites(&state).await?),
            SitesCommand::Add { url } => print_json(&add_site(&state, url).await?),
            SitesCommand::Remove { id } => print_json(&remove_site(&state, id).await?),
        },
        Command::Tip => print_json(&focus_tip(&state).await?),
        Command::Run => run_foreground(&state).await,
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to start async runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
