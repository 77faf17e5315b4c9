pub mod dispatch;
pub mod etl;
pub mod flatten;
pub mod normalize;
pub mod tps;

pub use crate::domain::model::{ApiResponse, OutputRow, RawRecord, RunMode, Token};
pub use crate::domain::ports::{ConfigProvider, FraudApi, Storage};
pub use crate::utils::error::Result;
