//! Command implementations for the CLI.

mod check;
mod collect;
mod config;
mod load;
mod report;

pub use check::cmd_check;
pub use collect::cmd_collect;
pub use config::cmd_config;
pub use load::cmd_load;
pub use report::cmd_report;
