pub mod engine;
pub mod repository;

pub use crate::domain::model::{Lead, Record};
pub use crate::domain::ports::{ContactView, LeadStore};
pub use crate::utils::error::Result;
