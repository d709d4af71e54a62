use crate::domain::model::Pet;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaccinationFrequency {
    Annual,
    Semiannual,
    NotRequired,
}

impl VaccinationFrequency {
    pub fn interval_months(&self) -> Option<u32> {
        match self {
            VaccinationFrequency::Annual => Some(12),
            VaccinationFrequency::Semiannual => Some(6),
            VaccinationFrequency::NotRequired => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            VaccinationFrequency::Annual => "Annual vaccine required",
            VaccinationFrequency::Semiannual => "Semiannual vaccine required",
            VaccinationFrequency::NotRequired => "Vaccine not required",
        }
    }
}

struct SpeciesRule {
    aliases: &'static [&'static str],
    /// 年齡低於此值 (年) 使用 young 頻率
    threshold_age: u32,
    young: VaccinationFrequency,
    adult: VaccinationFrequency,
}

const SPECIES_RULES: &[SpeciesRule] = &[
    SpeciesRule {
        aliases: &["dog", "perro"],
        threshold_age: 2,
        young: VaccinationFrequency::Semiannual,
        adult: VaccinationFrequency::Annual,
    },
    SpeciesRule {
        aliases: &["cat", "gato"],
        threshold_age: 1,
        young: VaccinationFrequency::Semiannual,
        adult: VaccinationFrequency::Annual,
    },
    SpeciesRule {
        aliases: &["ferret", "huron", "hurón"],
        threshold_age: 0,
        young: VaccinationFrequency::Annual,
        adult: VaccinationFrequency::Annual,
    },
];

/// 其他物種超過此年齡不再需要疫苗
const SENIOR_AGE_OTHER_SPECIES: u32 = 12;

fn rule_for(species: &str) -> Option<&'static SpeciesRule> {
    let key = species.trim().to_lowercase();
    SPECIES_RULES
        .iter()
        .find(|rule| rule.aliases.iter().any(|alias| *alias == key))
}

/// 依物種與年齡決定疫苗頻率
pub fn frequency_for(species: &str, age_years: u32) -> VaccinationFrequency {
    match rule_for(species) {
        Some(rule) if age_years < rule.threshold_age => rule.young,
        Some(rule) => rule.adult,
        None if age_years > SENIOR_AGE_OTHER_SPECIES => VaccinationFrequency::NotRequired,
        None => VaccinationFrequency::Annual,
    }
}

/// 物種門檻年齡，未列在表中的物種沒有門檻
pub fn threshold_age(species: &str) -> Option<u32> {
    rule_for(species).map(|rule| rule.threshold_age)
}

pub fn next_due(last: NaiveDate, frequency: VaccinationFrequency) -> NaiveDate {
    frequency
        .interval_months()
        .and_then(|months| last.checked_add_months(Months::new(months)))
        .unwrap_or(last)
}

/// 沒有接種紀錄時以 today 起算
pub fn next_due_for(pet: &Pet, today: NaiveDate) -> NaiveDate {
    let last = pet.last_vaccination.unwrap_or(today);
    next_due(last, frequency_for(&pet.species, pet.age_years))
}

/// 建議劑量：體重 x 0.1 x 年齡係數，最低 0.1
pub fn recommended_dose(weight_kg: f64, age_years: u32) -> f64 {
    let age_factor = match age_years {
        0 => 0.8,
        a if a > 10 => 0.6,
        _ => 1.0,
    };
    (weight_kg * 0.1 * age_factor).max(0.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn shorter(a: VaccinationFrequency, b: VaccinationFrequency) -> bool {
        match (a.interval_months(), b.interval_months()) {
            (Some(x), Some(y)) => x <= y,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    #[test]
    fn test_rule_table() {
        assert_eq!(frequency_for("dog", 1), VaccinationFrequency::Semiannual);
        assert_eq!(frequency_for("Perro", 2), VaccinationFrequency::Annual);
        assert_eq!(frequency_for("cat", 0), VaccinationFrequency::Semiannual);
        assert_eq!(frequency_for("GATO", 5), VaccinationFrequency::Annual);
        assert_eq!(frequency_for("ferret", 7), VaccinationFrequency::Annual);
        assert_eq!(frequency_for("rabbit", 4), VaccinationFrequency::Annual);
        assert_eq!(frequency_for("parrot", 13), VaccinationFrequency::NotRequired);
    }

    #[test]
    fn test_young_pets_get_the_shorter_interval() {
        for species in ["dog", "cat", "ferret"] {
            let threshold = threshold_age(species).unwrap();
            let adult = frequency_for(species, threshold);
            for age in 0..threshold {
                assert!(shorter(frequency_for(species, age), adult), "{} age {}", species, age);
            }
        }
    }

    #[test]
    fn test_next_due_offsets() {
        let last = date(2025, 1, 31);
        assert_eq!(next_due(last, VaccinationFrequency::Annual), date(2026, 1, 31));
        assert_eq!(next_due(last, VaccinationFrequency::Semiannual), date(2025, 7, 31));
        assert_eq!(next_due(last, VaccinationFrequency::NotRequired), last);
        // clamps to the end of a shorter month
        assert_eq!(
            next_due(date(2024, 8, 31), VaccinationFrequency::Semiannual),
            date(2025, 2, 28)
        );
    }

    #[test]
    fn test_next_due_without_record_starts_today() {
        let pet = Pet {
            name: "Misu".to_string(),
            species: "cat".to_string(),
            age_years: 4,
            weight_kg: 3.5,
            last_vaccination: None,
        };
        assert_eq!(next_due_for(&pet, date(2025, 3, 10)), date(2026, 3, 10));
    }

    #[test]
    fn test_recommended_dose() {
        assert!((recommended_dose(10.0, 5) - 1.0).abs() < 1e-9);
        assert!((recommended_dose(10.0, 0) - 0.8).abs() < 1e-9);
        assert!((recommended_dose(10.0, 11) - 0.6).abs() < 1e-9);
        assert_eq!(recommended_dose(0.0, 3), 0.1);
    }
}
