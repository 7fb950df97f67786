mod config;
mod error;
mod store;

pub use config::HttpConfig;
pub use error::{HttpDaoError, HttpResult};
pub use store::HttpEventStore;
