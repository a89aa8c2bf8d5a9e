use clap::{Parser, Subcommand, ValueEnum};
use rplan_core::ResourceKind;
use rplan_engine::PlanOrder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "rplan-runner")]
#[command(about = "Process tree restoration planner")]
pub struct Cli {
    /// Raise the log level to debug (overrides RUST_LOG).
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Build a restore plan for a snapshot.
    Plan(PlanCommand),
    /// Replay a plan document against a snapshot.
    Verify(VerifyCommand),
    /// Print the closed process tree of a snapshot.
    Tree(TreeCommand),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OrderArg {
    Depth,
    Dfs,
}

impl From<OrderArg> for PlanOrder {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Depth => PlanOrder::Depth,
            OrderArg::Dfs => PlanOrder::Dfs,
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct PlanCommand {
    #[arg(long)]
    pub snapshot: PathBuf,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,
    /// Group the printed actions by graph depth.
    #[arg(long, default_value_t = false)]
    pub buckets: bool,
    /// Drop every action on resources of this kind (the result is not replayable).
    #[arg(long = "skip", value_name = "KIND")]
    pub skip: Vec<ResourceKind>,
    /// Keep redundant Shares; also turns validation off.
    #[arg(long, default_value_t = false)]
    pub no_shrink: bool,
    #[arg(long, default_value_t = false)]
    pub no_validate: bool,
    /// Also write the plan document as JSON to this file.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct VerifyCommand {
    #[arg(long)]
    pub snapshot: PathBuf,
    #[arg(long)]
    pub plan: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, clap::Args)]
pub struct TreeCommand {
    #[arg(long)]
    pub snapshot: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
