use crate::core::pricing::PricingPolicy;
use crate::core::scheduler::BusinessHours;
use crate::domain::model::{Medication, Veterinarian};
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// 記錄每次完成的看診登記 (取代全域 singleton)
pub trait AttentionLog: Send + Sync {
    fn record_attention(&self, owner_name: &str, pet_count: u32, pet_name: &str, species: &str);
}

impl<T: AttentionLog + ?Sized> AttentionLog for Arc<T> {
    fn record_attention(&self, owner_name: &str, pet_count: u32, pet_name: &str, species: &str) {
        (**self).record_attention(owner_name, pet_count, pet_name, species)
    }
}

pub trait ConfigProvider: Send + Sync {
    fn business_hours(&self) -> BusinessHours;
    fn pricing_policy(&self) -> PricingPolicy;
    fn staff(&self) -> Vec<Veterinarian>;
    fn catalog(&self) -> Vec<Medication>;
    fn processing_delay(&self) -> Duration;
    fn block_count(&self) -> u32;
    fn default_duration_minutes(&self) -> u32;
}
