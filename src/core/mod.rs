pub mod pricing;
pub mod registration;
pub mod report;
pub mod scheduler;
pub mod store;
pub mod vaccination;

pub use crate::domain::ports::{AttentionLog, Clock, ConfigProvider};
pub use crate::utils::error::Result;
