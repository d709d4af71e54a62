use crate::domain::ports::AttentionLog;
use serde::Serialize;
use tokio::sync::watch;

pub const NO_OWNER_YET: &str = "N/A";

/// 可訂閱的值：get/set/update 推送新值，subscribe 取得 watch::Receiver
#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    pub fn update(&self, modify: impl FnOnce(&mut T)) {
        self.tx.send_modify(modify);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClinicStats {
    pub total_pets: u32,
    pub total_consultations: u32,
    pub last_owner: String,
    pub patients: Vec<String>,
}

/// 診所層級的記憶體狀態 (計數與病患清單)
#[derive(Debug)]
pub struct ClinicStore {
    total_pets: Observable<u32>,
    total_consultations: Observable<u32>,
    last_owner: Observable<String>,
    patients: Observable<Vec<String>>,
}

impl Default for ClinicStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClinicStore {
    pub fn new() -> Self {
        Self {
            total_pets: Observable::new(0),
            total_consultations: Observable::new(0),
            last_owner: Observable::new(NO_OWNER_YET.to_string()),
            patients: Observable::new(Vec::new()),
        }
    }

    pub fn total_pets(&self) -> &Observable<u32> {
        &self.total_pets
    }

    pub fn total_consultations(&self) -> &Observable<u32> {
        &self.total_consultations
    }

    pub fn last_owner(&self) -> &Observable<String> {
        &self.last_owner
    }

    pub fn patients(&self) -> &Observable<Vec<String>> {
        &self.patients
    }

    pub fn snapshot(&self) -> ClinicStats {
        ClinicStats {
            total_pets: self.total_pets.get(),
            total_consultations: self.total_consultations.get(),
            last_owner: self.last_owner.get(),
            patients: self.patients.get(),
        }
    }
}

impl AttentionLog for ClinicStore {
    fn record_attention(&self, owner_name: &str, pet_count: u32, pet_name: &str, species: &str) {
        self.last_owner.set(owner_name.to_string());
        self.total_pets.update(|total| *total += pet_count);
        self.total_consultations.update(|total| *total += 1);
        let entry = format!("Pet: {} ({}) - Owner: {}", pet_name, species, owner_name);
        self.patients.update(|list| list.push(entry));

        tracing::debug!(
            "Recorded attention for {} ({} pet(s)), consultations so far: {}",
            owner_name,
            pet_count,
            self.total_consultations.get()
        );
    }
}
