mod cli;
mod config;
mod io;
mod logging;
mod run;

pub use cli::{Cli, Commands, OrderArg, OutputFormat, PlanCommand, TreeCommand, VerifyCommand};
pub use config::{
    load_runner_config, validate_runner_config, OutputConfig, RunnerConfig, RunnerConfigError,
    RUNNER_CONFIG_SCHEMA_0_0_1,
};
pub use io::{load_snapshot, load_snapshot_tree, SnapshotLoadError};
pub use logging::init_tracing;
pub use run::{execute_plan, execute_tree, execute_verify, RunnerError};
