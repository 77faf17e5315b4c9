pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::http_api::HttpFraudApi;
pub use adapters::local_storage::LocalStorage;
pub use config::CliConfig;
pub use core::etl::EtlEngine;
pub use domain::model::RunMode;
pub use utils::error::{EtlError, Result};
