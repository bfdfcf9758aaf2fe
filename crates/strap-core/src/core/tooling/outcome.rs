use serde::{Deserialize, Serialize};
use serde_json::Value;

use strap_domain::RestartReason;

/// Exit code reserved for "relaunch me": the supervising wrapper restarts
/// the command with the environment activated.
pub const RESTART_EXIT_CODE: i32 = 75;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
            restart: None,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
            restart: None,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
            restart: None,
        }
    }

    /// A successful run that must be relaunched by the supervisor.
    pub fn restart(reason: RestartReason, message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
            restart: Some(reason.as_str().to_string()),
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.restart.is_some() {
            return RESTART_EXIT_CODE;
        }
        match self.status {
            CommandStatus::Ok => 0,
            CommandStatus::UserError | CommandStatus::Failure => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}
