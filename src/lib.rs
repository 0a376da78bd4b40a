pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::CrmConfig;

pub use core::{engine::CrmEngine, repository::JsonLeadRepository};
pub use domain::model::{AnyContact, Contact, Customer, Lead, Record, Stage};
pub use domain::ports::{ContactView, LeadStore};
pub use domain::services::StageStatistics;
pub use utils::error::{CrmError, Result};
