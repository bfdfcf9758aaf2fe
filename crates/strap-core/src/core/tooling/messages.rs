use serde_json::{json, Value};

use super::outcome::ExecutionOutcome;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandGroup {
    Bootstrap,
    Check,
    ForceUpdate,
}

impl CommandGroup {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CommandGroup::Bootstrap => "bootstrap",
            CommandGroup::Check => "check",
            CommandGroup::ForceUpdate => "force-update",
        }
    }
}

#[must_use]
pub fn format_status_message(group: CommandGroup, message: &str) -> String {
    format!("strap {} · {}", group.as_str(), message)
}

#[must_use]
pub fn to_json_response(group: CommandGroup, outcome: &ExecutionOutcome, code: i32) -> Value {
    json!({
        "command": group.as_str(),
        "status": outcome.status,
        "exit_code": code,
        "message": outcome.message,
        "details": outcome.details,
        "restart": outcome.restart,
    })
}
