use crate::core::pricing::{round_whole, PricingPolicy, Quote};
use crate::core::scheduler::{Agenda, Reservation};
use crate::core::store::Observable;
use crate::core::vaccination;
use crate::domain::model::{
    Client, Consultation, ConsultationStatus, Medication, Order, OrderLine, Owner, Pet,
    ServiceCategory, MAX_LINE_QUANTITY,
};
use crate::domain::ports::{AttentionLog, Clock, ConfigProvider};
use crate::utils::error::Result;
use crate::utils::validation::{is_valid_decimal, is_valid_integer};
use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

pub const PROGRESS_CALCULATING: &str = "Calculating costs...";
pub const PROGRESS_CONFIRMING: &str = "Confirming booking and order...";

/// 登記表單的原始輸入 (字串欄位保留使用者輸入)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationForm {
    pub owner_name: String,
    pub owner_phone: String,
    pub owner_email: String,
    pub pet_name: String,
    pub pet_species: String,
    pub pet_age: String,
    pub pet_weight: String,
    pub pet_last_vaccination: String,
    pub service: Option<ServiceCategory>,
    pub pet_count: u32,
    pub cart: Vec<OrderLine>,
}

impl Default for RegistrationForm {
    fn default() -> Self {
        Self {
            owner_name: String::new(),
            owner_phone: String::new(),
            owner_email: String::new(),
            pet_name: String::new(),
            pet_species: String::new(),
            pet_age: "0".to_string(),
            pet_weight: "0.0".to_string(),
            pet_last_vaccination: String::new(),
            service: None,
            pet_count: 1,
            cart: Vec::new(),
        }
    }
}

impl RegistrationForm {
    pub fn owner(&self) -> Owner {
        Owner {
            name: self.owner_name.clone(),
            phone: self.owner_phone.clone(),
            email: self.owner_email.clone(),
        }
    }

    /// 解析失敗時退回預設值：年齡 0、體重 0.0、接種日期 today
    pub fn pet(&self, today: NaiveDate) -> Pet {
        let last_vaccination = NaiveDate::parse_from_str(self.pet_last_vaccination.trim(), "%Y-%m-%d")
            .unwrap_or(today);
        Pet {
            name: self.pet_name.clone(),
            species: self.pet_species.clone(),
            age_years: self.pet_age.trim().parse().unwrap_or(0),
            weight_kg: self.pet_weight.trim().parse().unwrap_or(0.0),
            last_vaccination: Some(last_vaccination),
        }
    }

    pub fn cart_total(&self) -> f64 {
        self.cart.iter().map(OrderLine::subtotal).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationState {
    pub form: RegistrationForm,
    pub processing: bool,
    pub progress_message: Option<String>,
    pub summary: Option<RegistrationSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationSummary {
    pub owner: Owner,
    pub pet: Pet,
    pub pet_count: u32,
    pub quote: Quote,
    pub consultation: Consultation,
    pub reservation: Reservation,
    pub order: Option<Order>,
    pub vaccination_recommendation: Option<String>,
    pub next_vaccination: Option<NaiveDate>,
    pub grand_total: i64,
}

impl RegistrationSummary {
    pub fn order_total(&self) -> i64 {
        self.order
            .as_ref()
            .map(|order| round_whole(order.total()))
            .unwrap_or(0)
    }

    pub fn render(&self) -> String {
        let mut out = format!("=== Consultation {} ===\n", self.consultation.id);
        out.push_str(&self.consultation.summary_text(&self.owner, std::slice::from_ref(&self.pet)));
        out.push('\n');
        out.push_str(&format!(
            "Service     : {} ({} min)\n",
            self.quote.category, self.quote.minutes
        ));
        out.push_str(&format!("Cost        : ${}", self.consultation.cost));
        if self.quote.discount_applied {
            out.push_str(&format!(" (multi-pet discount, {} pets)", self.pet_count));
        }
        out.push('\n');
        if let Some(recommendation) = &self.vaccination_recommendation {
            out.push_str(&format!("Vaccination : {}\n", recommendation));
        }
        if let Some(order) = &self.order {
            out.push_str("--- Medication order ---\n");
            for line in order.lines() {
                out.push_str(&format!(
                    "- {}x {}: ${:.0}\n",
                    line.quantity,
                    line.medication.name,
                    line.subtotal()
                ));
            }
            out.push_str(&format!("Order total : ${}", self.order_total()));
            if order.has_promotion() {
                out.push_str(&format!(
                    " (list price ${})",
                    round_whole(order.total_without_promotion())
                ));
            }
            out.push('\n');
        }
        out.push_str(&format!("Grand total : ${}", self.grand_total));
        out
    }
}

/// 一次看診登記流程：填表、選服務、購物車、處理
pub struct RegistrationSession<L: AttentionLog, C: Clock> {
    log: L,
    clock: C,
    pricing: PricingPolicy,
    catalog: Vec<Medication>,
    processing_delay: Duration,
    block_count: u32,
    duration_minutes: u32,
    state: Observable<RegistrationState>,
}

impl<L: AttentionLog, C: Clock> RegistrationSession<L, C> {
    pub fn new(log: L, clock: C, config: &impl ConfigProvider) -> Self {
        Self {
            log,
            clock,
            pricing: config.pricing_policy(),
            catalog: config.catalog(),
            processing_delay: config.processing_delay(),
            block_count: config.block_count(),
            duration_minutes: config.default_duration_minutes(),
            state: Observable::default(),
        }
    }

    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }

    pub fn state(&self) -> &Observable<RegistrationState> {
        &self.state
    }

    pub fn catalog(&self) -> &[Medication] {
        &self.catalog
    }

    pub fn find_medication(&self, name: &str) -> Option<&Medication> {
        let name = name.trim();
        self.catalog
            .iter()
            .find(|med| med.name.eq_ignore_ascii_case(name))
    }

    pub fn update_owner(&self, name: Option<&str>, phone: Option<&str>, email: Option<&str>) {
        self.state.update(|state| {
            let form = &mut state.form;
            if let Some(name) = name {
                form.owner_name = name.to_string();
            }
            if let Some(phone) = phone {
                form.owner_phone = phone.to_string();
            }
            if let Some(email) = email {
                form.owner_email = email.to_string();
            }
        });
    }

    /// 年齡只接受數字、體重只接受小數；不合法的輸入直接忽略
    pub fn update_pet(
        &self,
        name: Option<&str>,
        species: Option<&str>,
        age: Option<&str>,
        weight: Option<&str>,
        last_vaccination: Option<&str>,
    ) {
        self.state.update(|state| {
            let form = &mut state.form;
            if let Some(name) = name {
                form.pet_name = name.to_string();
            }
            if let Some(species) = species {
                form.pet_species = species.to_string();
            }
            match age {
                Some(age) if is_valid_integer(age) => form.pet_age = age.to_string(),
                Some(age) => tracing::debug!("Ignoring non-numeric age input '{}'", age),
                None => {}
            }
            match weight {
                Some(weight) if is_valid_decimal(weight) => form.pet_weight = weight.to_string(),
                Some(weight) => tracing::debug!("Ignoring non-decimal weight input '{}'", weight),
                None => {}
            }
            if let Some(date) = last_vaccination {
                form.pet_last_vaccination = date.to_string();
            }
        });
    }

    pub fn select_service(&self, service: ServiceCategory) {
        self.state.update(|state| state.form.service = Some(service));
    }

    pub fn set_pet_count(&self, count: u32) {
        self.state.update(|state| state.form.pet_count = count.max(1));
    }

    /// 同一藥品 (名稱不分大小寫且同劑量) 數量 +1；已達上限時不變並回傳 false
    pub fn add_to_cart(&self, medication: &Medication) -> bool {
        let mut added = false;
        self.state.update(|state| {
            let cart = &mut state.form.cart;
            match cart.iter_mut().find(|line| line.medication == *medication)
            {
                Some(line) if line.quantity >= MAX_LINE_QUANTITY => {
                    tracing::warn!(
                        "⚠️ {} already at the maximum of {} units",
                        medication.name,
                        MAX_LINE_QUANTITY
                    );
                }
                Some(line) => {
                    line.quantity += 1;
                    added = true;
                }
                None => {
                    cart.push(OrderLine {
                        medication: medication.clone(),
                        quantity: 1,
                    });
                    added = true;
                }
            }
        });
        added
    }

    pub fn remove_from_cart(&self, medication: &Medication) {
        self.state.update(|state| {
            let cart = &mut state.form.cart;
            if let Some(index) = cart.iter().position(|line| line.medication == *medication) {
                if cart[index].quantity > 1 {
                    cart[index].quantity -= 1;
                } else {
                    cart.remove(index);
                }
            }
        });
    }

    pub fn cart_total(&self) -> f64 {
        self.state.get().form.cart_total()
    }

    /// 處理登記：兩段模擬延遲後排程、計價並記錄。已處理過則直接回傳原結果
    pub async fn process(&self, agenda: &mut Agenda) -> Result<RegistrationSummary> {
        let current = self.state.get();
        if let Some(existing) = current.summary {
            tracing::debug!("Registration already processed, returning existing summary");
            return Ok(existing);
        }
        let form = current.form;

        self.set_progress(PROGRESS_CALCULATING);
        tokio::time::sleep(self.processing_delay).await;
        self.set_progress(PROGRESS_CONFIRMING);
        tokio::time::sleep(self.processing_delay).await;

        let result = self.build_summary(&form, agenda);

        self.state.update(|state| {
            state.processing = false;
            state.progress_message = None;
            if let Ok(summary) = &result {
                state.summary = Some(summary.clone());
            }
        });
        result
    }

    fn set_progress(&self, message: &str) {
        tracing::info!("⏳ {}", message);
        self.state.update(|state| {
            state.processing = true;
            state.progress_message = Some(message.to_string());
        });
    }

    fn build_summary(&self, form: &RegistrationForm, agenda: &mut Agenda) -> Result<RegistrationSummary> {
        let today = self.clock.today();
        let owner = form.owner();
        let client = Client::from_owner(&owner);
        let pet = form.pet(today);
        let service = form.service.unwrap_or_default();

        // 訂單不成立時不可留下預約
        let order = if form.cart.is_empty() {
            None
        } else {
            Some(Order::new(client.clone(), form.cart.clone(), today)?)
        };

        let start = agenda.next_business_slot(self.clock.now());
        let reservation = agenda.reserve_block(start, self.block_count);
        if !reservation.is_assigned() {
            tracing::warn!("⚠️ Proceeding without a scheduled slot for {}", pet.name);
        }

        let quote = self
            .pricing
            .quote(service, self.duration_minutes, form.pet_count);

        let (vaccination_recommendation, next_vaccination, comments) =
            if service == ServiceCategory::Vaccination {
                let frequency = vaccination::frequency_for(&pet.species, pet.age_years);
                let next = vaccination::next_due_for(&pet, today);
                (
                    Some(format!(
                        "{}. Next dose: {} ({:.2} ml)",
                        frequency.description(),
                        next.format("%Y-%m-%d"),
                        vaccination::recommended_dose(pet.weight_kg, pet.age_years)
                    )),
                    Some(next),
                    Some(format!("Protocol applied: {}.", frequency.description())),
                )
            } else {
                (None, None, None)
            };

        let consultation = Consultation {
            id: format!("C-{}", rand::thread_rng().gen_range(100..=999)),
            description: format!("Consultation for {}", pet.name),
            cost: quote.total,
            status: ConsultationStatus::Pending,
            scheduled_at: reservation.first_slot(),
            veterinarian: reservation.veterinarian.clone(),
            comments,
        };

        self.log
            .record_attention(&client.name, form.pet_count, &pet.name, &pet.species);

        let order_total = order.as_ref().map(|o| round_whole(o.total())).unwrap_or(0);
        let grand_total = quote.total + order_total;

        tracing::info!(
            "✅ Registered {} for {} ({}), total ${}",
            consultation.id,
            client.name,
            service,
            grand_total
        );

        Ok(RegistrationSummary {
            owner,
            pet,
            pet_count: form.pet_count,
            quote,
            consultation,
            reservation,
            order,
            vaccination_recommendation,
            next_vaccination,
            grand_total,
        })
    }

    /// 重設表單與結果
    pub fn clear(&self) {
        self.state.set(RegistrationState::default());
    }
}
