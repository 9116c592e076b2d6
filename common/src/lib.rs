pub mod api;
pub mod config;
pub mod job;
pub mod logging;

pub use api::ErrorResponse;
pub use config::LoggingConfig;
pub use job::{Job, JobId, JobOutcome, JobRecord, JobReport, JobStatus, JobType, NewJob,
             ParseEnumError, ResultInfo};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_DB_PATH: &str = "taskq.db";
