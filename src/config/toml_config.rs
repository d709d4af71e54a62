use crate::core::pricing::{BaseCost, CategoryRates, PricingPolicy, DEFAULT_DURATION_MINUTES};
use crate::core::scheduler::BusinessHours;
use crate::core::ConfigProvider;
use crate::domain::model::{Medication, ServiceCategory, Veterinarian};
use crate::utils::error::{ClinicError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// 診所配置，所有區段皆可省略
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    pub clinic: ClinicSection,
    pub schedule: ScheduleConfig,
    pub pricing: PricingConfig,
    pub workflow: WorkflowConfig,
    pub staff: Vec<Veterinarian>,
    pub catalog: Vec<Medication>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicSection {
    pub name: String,
}

impl Default for ClinicSection {
    fn default() -> Self {
        Self {
            name: "Veterinary Clinic".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub open_hour: u32,
    pub close_hour: u32,
    pub slot_minutes: u32,
    /// 每次登記預約的連續時段數
    pub block_count: u32,
    pub default_duration_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        let hours = BusinessHours::default();
        Self {
            open_hour: hours.open_hour,
            close_hour: hours.close_hour,
            slot_minutes: hours.slot_minutes,
            block_count: 1,
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    #[default]
    PerMinute,
    FlatRate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub mode: PricingMode,
    pub rate_per_minute: f64,
    pub surcharge_per_half_hour: f64,
    pub multi_pet_discount: f64,
    pub flat_rates: CategoryRates,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            mode: PricingMode::PerMinute,
            rate_per_minute: 1000.0,
            surcharge_per_half_hour: 2000.0,
            multi_pet_discount: crate::core::pricing::DEFAULT_MULTI_PET_DISCOUNT,
            flat_rates: CategoryRates::default(),
        }
    }
}

impl PricingConfig {
    pub fn to_policy(&self) -> PricingPolicy {
        let base_cost = match self.mode {
            PricingMode::PerMinute => BaseCost::PerMinute {
                rate_per_minute: self.rate_per_minute,
            },
            PricingMode::FlatRate => BaseCost::FlatRate {
                rates: self.flat_rates,
                surcharge_per_half_hour: self.surcharge_per_half_hour,
            },
        };
        PricingPolicy::new(base_cost, self.multi_pet_discount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// 處理流程中每段模擬延遲 (毫秒)
    pub processing_delay_ms: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            processing_delay_ms: 1500,
        }
    }
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            clinic: ClinicSection::default(),
            schedule: ScheduleConfig::default(),
            pricing: PricingConfig::default(),
            workflow: WorkflowConfig::default(),
            staff: default_staff(),
            catalog: default_catalog(),
        }
    }
}

pub fn default_staff() -> Vec<Veterinarian> {
    vec![
        Veterinarian::new("Ana Lopez", "General").with_contact("555-2000", "ana@veterinaria.cl"),
        Veterinarian::new("Benjamin Ruiz", "Surgery")
            .with_contact("555-2001", "benjamin@veterinaria.cl"),
        Veterinarian::new("Carla Soto", "Exotics").with_contact("555-2002", "carla@veterinaria.cl"),
    ]
}

pub fn default_catalog() -> Vec<Medication> {
    vec![
        Medication::new("Generic antibiotic", 500, 15000.0),
        Medication::new("Basic painkiller", 200, 8000.0),
        Medication::promotional("Premium anti-inflammatory", 200, 25000.0, 0.20),
        Medication::promotional("Canine vitamins", 100, 12000.0, 0.10),
    ]
}

fn category_key(category: ServiceCategory) -> &'static str {
    match category {
        ServiceCategory::GeneralCheckup => "general_checkup",
        ServiceCategory::UrgentCare => "urgent_care",
        ServiceCategory::Vaccination => "vaccination",
        ServiceCategory::MinorSurgery => "minor_surgery",
    }
}

fn env_var_regex() -> &'static Regex {
    static ENV_VAR: OnceLock<Regex> = OnceLock::new();
    ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"))
}

impl ClinicConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ClinicError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ClinicError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CLINIC_NAME})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_regex()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("clinic.name", &self.clinic.name)?;

        let hours = self.business_hours();
        if !hours.is_valid() {
            return Err(ClinicError::ConfigValidationError {
                field: "schedule".to_string(),
                message: format!(
                    "open_hour ({}) must be before close_hour ({}) and slot_minutes ({}) must divide an hour",
                    hours.open_hour, hours.close_hour, hours.slot_minutes
                ),
            });
        }
        validation::validate_positive_number(
            "schedule.block_count",
            self.schedule.block_count as usize,
            1,
        )?;

        validation::validate_range(
            "pricing.multi_pet_discount",
            self.pricing.multi_pet_discount,
            0.0,
            0.5,
        )?;
        validation::validate_positive_amount(
            "pricing.rate_per_minute",
            self.pricing.rate_per_minute,
            false,
        )?;
        validation::validate_positive_amount(
            "pricing.surcharge_per_half_hour",
            self.pricing.surcharge_per_half_hour,
            true,
        )?;
        for category in ServiceCategory::ALL {
            validation::validate_positive_amount(
                &format!("pricing.flat_rates.{}", category_key(category)),
                self.pricing.flat_rates.rate_for(category),
                false,
            )?;
        }

        for (idx, vet) in self.staff.iter().enumerate() {
            validation::validate_non_empty_string(&format!("staff[{}].name", idx), &vet.name)?;
            if !vet.email.is_empty() {
                validation::validate_email(&format!("staff[{}].email", idx), &vet.email)?;
            }
        }

        for (idx, med) in self.catalog.iter().enumerate() {
            validation::validate_non_empty_string(&format!("catalog[{}].name", idx), &med.name)?;
            validation::validate_positive_amount(&format!("catalog[{}].price", idx), med.price, false)?;
            if let Some(discount) = med.promo_discount {
                validation::validate_range(
                    &format!("catalog[{}].promo_discount", idx),
                    discount,
                    0.0,
                    1.0,
                )?;
            }
        }

        Ok(())
    }
}

impl ConfigProvider for ClinicConfig {
    fn business_hours(&self) -> BusinessHours {
        BusinessHours::new(
            self.schedule.open_hour,
            self.schedule.close_hour,
            self.schedule.slot_minutes,
        )
    }

    fn pricing_policy(&self) -> PricingPolicy {
        self.pricing.to_policy()
    }

    fn staff(&self) -> Vec<Veterinarian> {
        self.staff.clone()
    }

    fn catalog(&self) -> Vec<Medication> {
        self.catalog.clone()
    }

    fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.workflow.processing_delay_ms)
    }

    fn block_count(&self) -> u32 {
        self.schedule.block_count
    }

    fn default_duration_minutes(&self) -> u32 {
        self.schedule.default_duration_minutes
    }
}

impl Validate for ClinicConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
