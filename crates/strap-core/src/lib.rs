#![deny(clippy::all, warnings)]

mod core;

pub use crate::core::bootstrap::{bootstrap, BootstrapRequest};
pub use crate::core::config::{
    CommandContext, Config, DependencyConfig, EnvironmentConfig, GlobalOptions, UpdateConfig,
};
pub use crate::core::dependencies::{sync_dependencies, DepsError, SyncState};
pub use crate::core::environment::{EnvError, EnvState, Environment, RestartRequest};
pub use crate::core::runtime::effects::{
    CommandRunner, Effects, FileSystem, SharedEffects, SystemEffects,
};
pub use crate::core::runtime::process::{Invocation, ProcessError, RunOutput};
pub use crate::core::tooling::messages::{format_status_message, to_json_response, CommandGroup};
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome, RESTART_EXIT_CODE};
pub use crate::core::update::{check_updates, force_update, UpdateCheck, UpdateError, Updater};
