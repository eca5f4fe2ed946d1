pub mod config;
pub mod run;
pub mod status;

pub use run::run_pipeline;
pub use status::show_status;
