//! CLI command implementations.

mod archive;
mod config;
mod doctor;
mod list;
mod process;
mod serve;
mod status;

pub use archive::run_archive;
pub use config::run_config;
pub use doctor::run_doctor;
pub use list::run_list;
pub use process::run_process;
pub use serve::run_serve;
pub use status::run_status;
