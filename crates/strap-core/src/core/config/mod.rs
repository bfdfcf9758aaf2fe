pub(crate) mod context;
pub(crate) mod settings;

pub use context::CommandContext;
pub use settings::{Config, DependencyConfig, EnvironmentConfig, GlobalOptions, UpdateConfig};
