use crate::domain::model::ServiceCategory;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DURATION_MINUTES: u32 = 30;
pub const DEFAULT_MULTI_PET_DISCOUNT: f64 = 0.10;

/// 固定費率模式下各類別的基本價
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRates {
    pub general_checkup: f64,
    pub urgent_care: f64,
    pub vaccination: f64,
    pub minor_surgery: f64,
}

impl Default for CategoryRates {
    fn default() -> Self {
        Self {
            general_checkup: 15000.0,
            urgent_care: 25000.0,
            vaccination: 12000.0,
            minor_surgery: 18000.0,
        }
    }
}

impl CategoryRates {
    pub fn rate_for(&self, category: ServiceCategory) -> f64 {
        match category {
            ServiceCategory::GeneralCheckup => self.general_checkup,
            ServiceCategory::UrgentCare => self.urgent_care,
            ServiceCategory::Vaccination => self.vaccination,
            ServiceCategory::MinorSurgery => self.minor_surgery,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BaseCost {
    /// 分鐘數 x 每分鐘費率 x 類別倍率
    PerMinute { rate_per_minute: f64 },
    /// 類別固定價 + 每滿 30 分鐘加收
    FlatRate {
        rates: CategoryRates,
        surcharge_per_half_hour: f64,
    },
}

impl Default for BaseCost {
    fn default() -> Self {
        BaseCost::PerMinute {
            rate_per_minute: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quote {
    pub category: ServiceCategory,
    pub minutes: u32,
    pub base: f64,
    pub discounted: f64,
    pub discount_applied: bool,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingPolicy {
    pub base_cost: BaseCost,
    pub multi_pet_discount: f64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            base_cost: BaseCost::default(),
            multi_pet_discount: DEFAULT_MULTI_PET_DISCOUNT,
        }
    }
}

impl PricingPolicy {
    pub fn new(base_cost: BaseCost, multi_pet_discount: f64) -> Self {
        Self {
            base_cost,
            multi_pet_discount,
        }
    }

    pub fn base_cost(&self, category: ServiceCategory, minutes: u32) -> f64 {
        let minutes = if minutes == 0 {
            DEFAULT_DURATION_MINUTES
        } else {
            minutes
        };
        match self.base_cost {
            BaseCost::PerMinute { rate_per_minute } => {
                f64::from(minutes) * rate_per_minute * category.multiplier()
            }
            BaseCost::FlatRate {
                rates,
                surcharge_per_half_hour,
            } => rates.rate_for(category) + f64::from(minutes / 30) * surcharge_per_half_hour,
        }
    }

    /// 一次結帳超過一隻寵物時套用折扣，回傳 (金額, 是否套用)
    pub fn apply_discount(&self, amount: f64, count: u32) -> (f64, bool) {
        if count > 1 {
            (amount * (1.0 - self.multi_pet_discount.clamp(0.0, 1.0)), true)
        } else {
            (amount, false)
        }
    }

    pub fn quote(&self, category: ServiceCategory, minutes: u32, pet_count: u32) -> Quote {
        let base = self.base_cost(category, minutes);
        let (discounted, discount_applied) = self.apply_discount(base, pet_count);
        let total = round_whole(discounted);
        tracing::debug!(
            "Quote for {} ({} min, {} pet(s)): base={:.2}, total={}",
            category,
            minutes,
            pet_count,
            base,
            total
        );
        Quote {
            category,
            minutes,
            base,
            discounted,
            discount_applied,
            total,
        }
    }
}

/// 四捨五入到整數單位 (無小數貨幣)，.5 取偶數
pub fn round_whole(amount: f64) -> i64 {
    amount.round_ties_even() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_rate() -> PricingPolicy {
        PricingPolicy::new(
            BaseCost::FlatRate {
                rates: CategoryRates::default(),
                surcharge_per_half_hour: 2000.0,
            },
            0.15,
        )
    }

    #[test]
    fn test_urgent_care_thirty_minutes() {
        let policy = PricingPolicy::default();
        let quote = policy.quote(ServiceCategory::UrgentCare, 30, 1);
        assert_eq!(quote.base, 30.0 * 1000.0 * 2.5);
        assert_eq!(quote.total, 75000);
        assert!(!quote.discount_applied);
    }

    #[test]
    fn test_cost_is_monotonic_in_multiplier() {
        let policy = PricingPolicy::default();
        let mut categories = ServiceCategory::ALL.to_vec();
        categories.sort_by(|a, b| a.multiplier().total_cmp(&b.multiplier()));

        for minutes in [1, 15, 30, 45, 90] {
            for pair in categories.windows(2) {
                assert!(
                    policy.base_cost(pair[0], minutes) <= policy.base_cost(pair[1], minutes),
                    "{:?} vs {:?} at {} min",
                    pair[0],
                    pair[1],
                    minutes
                );
            }
        }
    }

    #[test]
    fn test_multi_pet_discount_never_increases_total() {
        for policy in [PricingPolicy::default(), flat_rate()] {
            for category in ServiceCategory::ALL {
                for count in 2..6 {
                    let single = policy.quote(category, 30, 1).total;
                    let billed = policy.quote(category, 30, count);
                    assert!(billed.discount_applied);
                    assert!(billed.total <= single);
                }
            }
        }
    }

    #[test]
    fn test_flat_rate_with_surcharge() {
        let policy = flat_rate();
        assert_eq!(policy.base_cost(ServiceCategory::GeneralCheckup, 30), 17000.0);
        assert_eq!(policy.base_cost(ServiceCategory::Vaccination, 29), 12000.0);
        assert_eq!(policy.base_cost(ServiceCategory::UrgentCare, 60), 29000.0);

        let quote = policy.quote(ServiceCategory::GeneralCheckup, 30, 2);
        assert_eq!(quote.total, 14450);
    }

    #[test]
    fn test_zero_minutes_uses_default_duration() {
        let policy = PricingPolicy::default();
        assert_eq!(
            policy.base_cost(ServiceCategory::GeneralCheckup, 0),
            policy.base_cost(ServiceCategory::GeneralCheckup, DEFAULT_DURATION_MINUTES)
        );
        assert!(policy.quote(ServiceCategory::Vaccination, 0, 1).total > 0);
    }

    #[test]
    fn test_round_whole_ties_to_even() {
        assert_eq!(round_whole(12345.4), 12345);
        assert_eq!(round_whole(12345.6), 12346);
        assert_eq!(round_whole(2.5), 2);
        assert_eq!(round_whole(3.5), 4);
    }
}
