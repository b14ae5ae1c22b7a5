pub mod etl;
pub mod group;
pub mod pipeline;

pub use crate::domain::model::{Record, TransformResult};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
