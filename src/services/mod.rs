/// Default service implementations
///
/// Production wiring for the seams in `runtime::services`: reqwest for HTTP,
/// tokio processes for shell commands, lazily opened SQLite pools for
/// database nodes.

use crate::config::Config;
use crate::runtime::services::Services;
use std::sync::Arc;

// reqwest-backed HTTP client
pub mod http;

// Shell command runner
pub mod command;

// SQLite connection pools
pub mod database;

// API key decryption
pub mod decrypt;

pub use command::ShellCommandService;
pub use database::SqliteDatabaseService;
pub use decrypt::PassthroughDecrypt;
pub use http::ReqwestHttpService;

/// Services backed by the real network, processes and database files
pub fn default_services(config: &Config) -> Services {
    Services {
        http: Arc::new(ReqwestHttpService::new()),
        db: Arc::new(SqliteDatabaseService::new(
            &config.storage.data_dir,
            &config.storage.connections,
        )),
        exec: Arc::new(ShellCommandService),
        decrypt: Arc::new(PassthroughDecrypt),
    }
}
