use crate::utils::error::{ClinicError, Result};
use regex::Regex;
use std::sync::OnceLock;

pub const SAFE_EMAIL: &str = "invalid@mail.com";

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"))
}

pub fn validate_email(field_name: &str, email: &str) -> Result<()> {
    if email_regex().is_match(email.trim()) {
        Ok(())
    } else {
        Err(ClinicError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: email.to_string(),
            reason: "Expected the form name@domain.com".to_string(),
        })
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(ClinicError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// 金額檢查：allow_zero 為 false 時必須大於 0
pub fn validate_positive_amount(field_name: &str, value: f64, allow_zero: bool) -> Result<()> {
    let ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if ok && value.is_finite() {
        return Ok(());
    }
    Err(ClinicError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: if allow_zero {
            "Amount cannot be negative".to_string()
        } else {
            "Amount must be greater than zero".to_string()
        },
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClinicError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ClinicError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// 只接受數字 (空字串視為合法，代表欄位清空)
pub fn is_valid_integer(input: &str) -> bool {
    input.chars().all(|c| c.is_ascii_digit())
}

/// 數字加上最多一個小數點
pub fn is_valid_decimal(input: &str) -> bool {
    input.chars().filter(|c| *c == '.').count() <= 1
        && input.chars().all(|c| c.is_ascii_digit() || c == '.')
}

pub fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

/// 取最後 10 碼格式化為 (xxx)xxxx-xxxx；不足 10 碼時原樣返回
pub fn format_phone(input: &str) -> String {
    let digits: Vec<char> = input.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 10 {
        return input.to_string();
    }
    let body: String = digits[digits.len() - 10..].iter().collect();
    format!("({}){}-{}", &body[..3], &body[3..7], &body[6..])
}

pub fn safe_email(email: &str) -> String {
    let trimmed = email.trim();
    if email_regex().is_match(trimmed) && trimmed != SAFE_EMAIL {
        trimmed.to_string()
    } else {
        SAFE_EMAIL.to_string()
    }
}
