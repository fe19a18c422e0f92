pub mod aggregate;
pub mod etl;
pub mod output;
pub mod pipeline;

pub use crate::domain::model::{AddressOutcome, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
