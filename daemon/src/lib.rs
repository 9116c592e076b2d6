pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod migrations;
pub mod routes;
pub mod store;

pub use dispatcher::Dispatcher;
pub use error::{ApiError, DispatchError, StoreError};
pub use store::StoreClient;
