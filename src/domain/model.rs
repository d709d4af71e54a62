use crate::utils::error::{ClinicError, Result};
use crate::utils::validation::{format_phone, or_default, safe_email};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SLOT_FORMAT: &str = "%Y-%m-%d %H:%M";

pub const MIN_LINE_QUANTITY: u32 = 1;
pub const MAX_LINE_QUANTITY: u32 = 100;

/// 可預約的時段 (精確到分鐘)，建立後不可變
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentSlot(NaiveDateTime);

impl AppointmentSlot {
    pub fn new(at: NaiveDateTime) -> Self {
        let at = at
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(at);
        Self(at)
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for AppointmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(SLOT_FORMAT))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    #[default]
    GeneralCheckup,
    UrgentCare,
    Vaccination,
    MinorSurgery,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 4] = [
        ServiceCategory::GeneralCheckup,
        ServiceCategory::UrgentCare,
        ServiceCategory::Vaccination,
        ServiceCategory::MinorSurgery,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ServiceCategory::GeneralCheckup => "General checkup",
            ServiceCategory::UrgentCare => "Urgent care",
            ServiceCategory::Vaccination => "Vaccination",
            ServiceCategory::MinorSurgery => "Minor surgery",
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            ServiceCategory::UrgentCare => 2.5,
            ServiceCategory::MinorSurgery => 3.0,
            ServiceCategory::GeneralCheckup | ServiceCategory::Vaccination => 1.0,
        }
    }

    /// 寬鬆解析 (英文/西文別名)，無法辨識時回傳 None
    pub fn parse(input: &str) -> Option<Self> {
        let key = input.trim().to_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "general_checkup" | "checkup" | "control" => Some(ServiceCategory::GeneralCheckup),
            "urgent_care" | "urgent" | "urgencia" => Some(ServiceCategory::UrgentCare),
            "vaccination" | "vaccine" | "vacuna" | "vacunacion" | "vacunación" => {
                Some(ServiceCategory::Vaccination)
            }
            "minor_surgery" | "surgery" | "cirugia" | "cirugía" | "cirugia_menor"
            | "cirugía_menor" => Some(ServiceCategory::MinorSurgery),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Veterinarian {
    pub name: String,
    pub specialty: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl Veterinarian {
    pub fn new(name: impl Into<String>, specialty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specialty: specialty.into(),
            phone: String::new(),
            email: String::new(),
        }
    }

    pub fn with_contact(mut self, phone: impl Into<String>, email: impl Into<String>) -> Self {
        self.phone = phone.into();
        self.email = email.into();
        self
    }
}

/// 帶寵物來看診的飼主
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
    pub phone: String,
    pub email: String,
}

/// 藥品訂單的付款人
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Client {
    pub const ANONYMOUS_NAME: &'static str = "Anonymous client";
    pub const ANONYMOUS_EMAIL: &'static str = "anonymous@mail.com";
    pub const ANONYMOUS_PHONE: &'static str = "00000000";

    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let email = email.into();
        if name.trim().is_empty() {
            return Err(ClinicError::validation("Client name cannot be empty"));
        }
        if email.trim().is_empty() {
            return Err(ClinicError::validation("Client email is required"));
        }
        Ok(Self {
            name,
            email,
            phone: phone.into(),
        })
    }

    /// 空白欄位以匿名預設值補上
    pub fn from_owner(owner: &Owner) -> Self {
        let pick = |value: &str, default: &str| {
            if value.trim().is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        };
        Self {
            name: pick(&owner.name, Self::ANONYMOUS_NAME),
            email: pick(&owner.email, Self::ANONYMOUS_EMAIL),
            phone: pick(&owner.phone, Self::ANONYMOUS_PHONE),
        }
    }
}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && self.email.eq_ignore_ascii_case(&other.email)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub name: String,
    pub species: String,
    pub age_years: u32,
    pub weight_kg: f64,
    pub last_vaccination: Option<NaiveDate>,
}

impl Pet {
    pub fn describe(&self) -> String {
        let last = self
            .last_vaccination
            .map(|d| d.to_string())
            .unwrap_or_else(|| "No record".to_string());
        format!(
            "{} ({}) | Age: {} years | Weight: {:.1} kg | Last vaccine: {}",
            self.name, self.species, self.age_years, self.weight_kg, last
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dose_mg: u32,
    pub price: f64,
    /// 促銷折扣比例 (0.0 ~ 1.0)
    #[serde(default)]
    pub promo_discount: Option<f64>,
}

impl Medication {
    pub fn new(name: impl Into<String>, dose_mg: u32, price: f64) -> Self {
        Self {
            name: name.into(),
            dose_mg,
            price,
            promo_discount: None,
        }
    }

    pub fn promotional(name: impl Into<String>, dose_mg: u32, price: f64, discount: f64) -> Self {
        Self {
            promo_discount: Some(discount),
            ..Self::new(name, dose_mg, price)
        }
    }

    pub fn is_promotional(&self) -> bool {
        self.promo_discount.map(|d| d > 0.0).unwrap_or(false)
    }

    pub fn unit_price(&self) -> f64 {
        match self.promo_discount {
            Some(discount) => self.price * (1.0 - discount.clamp(0.0, 1.0)),
            None => self.price,
        }
    }
}

/// 同名 (不分大小寫) 且同劑量即視為同一藥品
impl PartialEq for Medication {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && self.dose_mg == other.dose_mg
    }
}

impl fmt::Display for Medication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}mg - ${:.0}", self.name, self.dose_mg, self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub medication: Medication,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(medication: Medication, quantity: u32) -> Result<Self> {
        if !(MIN_LINE_QUANTITY..=MAX_LINE_QUANTITY).contains(&quantity) {
            return Err(ClinicError::validation(format!(
                "Quantity must be between {} and {} units (got {})",
                MIN_LINE_QUANTITY, MAX_LINE_QUANTITY, quantity
            )));
        }
        Ok(Self {
            medication,
            quantity,
        })
    }

    pub fn subtotal(&self) -> f64 {
        self.medication.unit_price() * self.quantity as f64
    }

    pub fn list_subtotal(&self) -> f64 {
        self.medication.price * self.quantity as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub client: Client,
    lines: Vec<OrderLine>,
    pub date: NaiveDate,
}

impl Order {
    /// 建立訂單，同一藥品的明細會合併
    pub fn new(client: Client, lines: Vec<OrderLine>, date: NaiveDate) -> Result<Self> {
        let mut order = Self {
            client,
            lines: Vec::with_capacity(lines.len()),
            date,
        };
        for line in lines {
            order.add_line(line)?;
        }
        Ok(order)
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn add_line(&mut self, line: OrderLine) -> Result<()> {
        match self
            .lines
            .iter_mut()
            .find(|existing| existing.medication == line.medication)
        {
            Some(existing) => {
                let merged = OrderLine::new(
                    existing.medication.clone(),
                    existing.quantity + line.quantity,
                )?;
                *existing = merged;
            }
            None => self.lines.push(line),
        }
        Ok(())
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(OrderLine::subtotal).sum()
    }

    pub fn total_without_promotion(&self) -> f64 {
        self.lines.iter().map(OrderLine::list_subtotal).sum()
    }

    pub fn has_promotion(&self) -> bool {
        self.total() < self.total_without_promotion()
    }

    pub fn unit_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// 合併同一客戶的兩張訂單，日期取較早者
    pub fn combine(self, other: Order) -> Result<Order> {
        if self.client != other.client {
            return Err(ClinicError::validation(
                "Only orders belonging to the same client can be combined",
            ));
        }
        let date = self.date.min(other.date);
        let mut lines = self.lines;
        lines.extend(other.lines);
        Order::new(self.client, lines, date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsultationStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl ConsultationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConsultationStatus::Pending => "Pending",
            ConsultationStatus::Confirmed => "Confirmed",
            ConsultationStatus::Completed => "Completed",
            ConsultationStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: String,
    pub description: String,
    pub cost: i64,
    pub status: ConsultationStatus,
    pub scheduled_at: Option<AppointmentSlot>,
    pub veterinarian: Option<Veterinarian>,
    pub comments: Option<String>,
}

impl Consultation {
    pub fn final_cost_with_discount(&self, fraction: f64) -> f64 {
        self.cost as f64 * (1.0 - fraction.clamp(0.0, 1.0))
    }

    pub fn update_status(&mut self, status: ConsultationStatus, at: Option<AppointmentSlot>) {
        self.status = status;
        self.scheduled_at = at;
    }

    pub fn summary_text(&self, owner: &Owner, pets: &[Pet]) -> String {
        let date = self
            .scheduled_at
            .map(|s| s.to_string())
            .unwrap_or_else(|| "Pending".to_string());
        let comments = self
            .comments
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("No comments");
        let vet = self
            .veterinarian
            .as_ref()
            .map(|v| v.name.as_str())
            .unwrap_or("Not assigned");
        let pet_lines: Vec<String> = pets.iter().map(|p| format!("  - {}", p.describe())).collect();

        let mut out = String::new();
        out.push_str(&format!("Client      : {}\n", or_default(&owner.name, "N/A")));
        out.push_str(&format!("Phone       : {}\n", format_phone(&owner.phone)));
        out.push_str(&format!("Email       : {}\n", safe_email(&owner.email)));
        out.push_str(&format!("Veterinarian: {}\n", vet));
        out.push_str(&format!("Status      : {}\n", self.status.label()));
        out.push_str(&format!("Appointment : {}\n", date));
        out.push_str("Pets        :\n");
        out.push_str(&pet_lines.join("\n"));
        out.push('\n');
        out.push_str(&format!("Comments    : {}", comments));
        out
    }
}
