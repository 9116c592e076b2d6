pub mod client;
pub mod config;
pub mod executor;
pub mod worker;

pub use client::{ClientError, DispatcherClient, JobSource};
pub use executor::{ExecutionError, Executor, FsExecutor};
pub use worker::{Poll, Worker};
