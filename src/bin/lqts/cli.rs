use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "lqts", author, version = lqts::core::version(), about = "LQTS client", styles = lqts::utils::STYLES)]
pub struct LqtsCli {
    #[command(subcommand)]
    pub command: Commands,

    /// The configuration file to use
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Submit one or more jobs
    #[command(alias = "submit")]
    Qsub(QsubArgs),
    /// Show job status
    Qstat(QstatArgs),
    /// Show a one-line running/queued summary
    Qsummary,
    /// Show or change the worker core count
    Workers(WorkersArgs),
    /// Show every job in a submission group
    Jobgroup(JobgroupArgs),
    /// Delete one or more jobs
    Qdel(QdelArgs),
    /// Change the priority of one or more queued jobs
    Qpriority(QpriorityArgs),
    /// Clear the entire queue (dangerous)
    Qclear(ConfirmArgs),
    /// Clear completed jobs, optionally scoped to one group
    ClearCompleted(ClearCompletedArgs),
    /// Resume a paused queue
    Resume,
    /// Print shell completion script to stdout
    Completions(CompletionsArgs),
}

#[derive(Debug, Parser)]
pub struct QsubArgs {
    /// Command and arguments to run, e.g. `lqts qsub -- echo hello`
    #[arg(required = true, last = true)]
    pub command: Vec<String>,

    /// Directory to run the command in (defaults to the current directory)
    #[arg(short = 'd', long)]
    pub working_dir: Option<PathBuf>,

    /// File to write combined stdout/stderr to
    #[arg(short = 'o', long)]
    pub log_file: Option<PathBuf>,

    /// Scheduling priority; higher runs first (default: 10)
    #[arg(short, long, default_value_t = 10)]
    pub priority: i32,

    /// Number of CPU cores to reserve (default: 1)
    #[arg(short, long, default_value_t = 1)]
    pub cores: u32,

    /// Comma-separated job ids this job depends on, e.g. `3.0,3.1`
    #[arg(long)]
    pub depends_on: Option<String>,

    /// Kill the job if it runs longer than this (HH:MM:SS, MM:SS, or MM)
    #[arg(short, long)]
    pub walltime: Option<String>,
}

#[derive(Debug, Parser)]
pub struct QstatArgs {
    #[arg(short, long)]
    pub running: bool,
    #[arg(short, long)]
    pub queued: bool,
    #[arg(short = 'C', long)]
    pub completed: bool,
}

#[derive(Debug, Parser)]
pub struct WorkersArgs {
    /// Set the worker core count instead of just reporting it
    #[arg(short, long)]
    pub set: Option<u32>,
}

#[derive(Debug, Parser)]
pub struct JobgroupArgs {
    pub group: u32,
}

#[derive(Debug, Parser)]
pub struct QdelArgs {
    /// Comma-separated job ids or groups, e.g. `3.2,4,5.*`
    pub ids: String,
}

#[derive(Debug, Parser)]
pub struct QpriorityArgs {
    /// Comma-separated job ids or groups, e.g. `3.2,4,5.*`
    pub ids: String,
    pub priority: i32,
}

#[derive(Debug, Parser)]
pub struct ConfirmArgs {
    /// Required to confirm the operation
    #[arg(long)]
    pub really: bool,
}

#[derive(Debug, Parser)]
pub struct ClearCompletedArgs {
    #[arg(long)]
    pub really: bool,
    #[arg(long)]
    pub group: Option<u32>,
}

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum Shell {
    Bash,
    Elvish,
    Fish,
    Powershell,
    Zsh,
}
