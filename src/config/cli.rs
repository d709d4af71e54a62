use crate::config::toml_config::ClinicConfig;
use crate::domain::model::{ServiceCategory, SLOT_FORMAT};
use crate::utils::error::{ClinicError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDateTime;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "vet-clinic")]
#[command(about = "Register a veterinary consultation: booking, cost and vaccination plan")]
pub struct CliConfig {
    #[arg(long, help = "Path to a TOML clinic configuration")]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = "")]
    pub owner: String,

    #[arg(long, default_value = "")]
    pub phone: String,

    #[arg(long, default_value = "")]
    pub email: String,

    #[arg(long, default_value = "")]
    pub pet: String,

    #[arg(long, default_value = "")]
    pub species: String,

    #[arg(long, default_value = "0")]
    pub age: String,

    #[arg(long, default_value = "0.0")]
    pub weight: String,

    #[arg(long, help = "Last vaccination date (YYYY-MM-DD)")]
    pub last_vaccination: Option<String>,

    #[arg(long, default_value = "general_checkup", help = "general_checkup, urgent_care, vaccination or minor_surgery")]
    pub service: String,

    #[arg(long, help = "Consultation length in minutes")]
    pub minutes: Option<u32>,

    #[arg(long, default_value = "1")]
    pub pet_count: u32,

    #[arg(long = "medication", help = "Catalog medication name, repeat for more units")]
    pub medications: Vec<String>,

    #[arg(long, value_parser = parse_instant, help = "Reference instant (YYYY-MM-DD HH:MM)")]
    pub at: Option<NaiveDateTime>,

    #[arg(long, help = "Print the summary as JSON")]
    pub json: bool,

    #[arg(long, help = "Write the booked agenda to this CSV file")]
    pub agenda_csv: Option<PathBuf>,

    #[arg(long, help = "Skip the processing pauses")]
    pub no_delay: bool,

    #[arg(long, help = "Only print the loaded configuration")]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

fn parse_instant(input: &str) -> std::result::Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(input.trim(), SLOT_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DD HH:MM: {}", e))
}

impl CliConfig {
    /// 未知的服務名稱退回一般檢查
    pub fn service_category(&self) -> ServiceCategory {
        ServiceCategory::parse(&self.service).unwrap_or_else(|| {
            tracing::warn!(
                "⚠️ Unknown service '{}', using {}",
                self.service,
                ServiceCategory::default()
            );
            ServiceCategory::default()
        })
    }

    /// 載入 TOML 配置 (未指定時使用預設值) 並套用命令列覆寫
    pub fn load_clinic_config(&self) -> Result<ClinicConfig> {
        let mut clinic = match &self.config {
            Some(path) => {
                tracing::info!("📄 Loading configuration from {}", path.display());
                ClinicConfig::from_file(path)?
            }
            None => ClinicConfig::default(),
        };
        if self.no_delay {
            clinic.workflow.processing_delay_ms = 0;
        }
        if let Some(minutes) = self.minutes {
            clinic.schedule.default_duration_minutes = minutes;
        }
        clinic.validate()?;
        Ok(clinic)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_positive_number("pet_count", self.pet_count as usize, 1)?;
        if let Some(minutes) = self.minutes {
            validation::validate_range("minutes", minutes, 1, 480)?;
        }
        if let Some(path) = &self.config {
            if !path.exists() {
                return Err(ClinicError::ConfigError {
                    message: format!("Configuration file not found: {}", path.display()),
                });
            }
        }
        Ok(())
    }
}
