pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ClinicConfig;

pub use adapters::clock::{FixedClock, SystemClock};
pub use core::{
    registration::{RegistrationSession, RegistrationSummary},
    scheduler::{Agenda, BusinessHours},
    store::ClinicStore,
};
pub use utils::error::{ClinicError, Result};
