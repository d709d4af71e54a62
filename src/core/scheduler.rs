use crate::domain::model::{AppointmentSlot, Veterinarian};
use crate::domain::ports::Clock;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// suggest_next 最多檢查的候選時段數
const MAX_SUGGESTION_ATTEMPTS: usize = 100;

/// 營業時間：週一至週五，open_hour <= 小時 < close_hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub open_hour: u32,
    pub close_hour: u32,
    pub slot_minutes: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open_hour: 8,
            close_hour: 18,
            slot_minutes: 30,
        }
    }
}

impl BusinessHours {
    pub fn new(open_hour: u32, close_hour: u32, slot_minutes: u32) -> Self {
        Self {
            open_hour,
            close_hour,
            slot_minutes,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.open_hour < self.close_hour
            && self.close_hour <= 24
            && self.slot_minutes > 0
            && 60 % self.slot_minutes == 0
    }

    // 不合法的設定會讓 next_business_slot 無法結束，退回預設值
    fn sanitized(self) -> Self {
        if self.is_valid() {
            self
        } else {
            tracing::warn!(
                "⚠️ Invalid business hours {:?}, falling back to defaults",
                self
            );
            Self::default()
        }
    }

    pub fn slot_length(&self) -> Duration {
        Duration::minutes(i64::from(self.slot_minutes))
    }

    pub fn is_business_day(at: NaiveDateTime) -> bool {
        !matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        Self::is_business_day(at) && at.hour() >= self.open_hour && at.hour() < self.close_hour
    }

    fn opening_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::from_hms_opt(self.open_hour, 0, 0).unwrap_or(NaiveTime::MIN))
    }

    /// 將 from 進位到下一個時段邊界，再往後找到第一個營業中的時段
    pub fn next_business_slot(&self, from: NaiveDateTime) -> AppointmentSlot {
        let hours = self.sanitized();
        let slot = i64::from(hours.slot_minutes);

        let minute_of_day = i64::from(from.hour() * 60 + from.minute());
        let on_boundary =
            minute_of_day % slot == 0 && from.second() == 0 && from.nanosecond() == 0;
        let midnight = from.date().and_time(NaiveTime::MIN);
        let mut candidate = midnight + Duration::minutes(minute_of_day / slot * slot);
        if !on_boundary {
            candidate += Duration::minutes(slot);
        }

        loop {
            if !Self::is_business_day(candidate) {
                candidate = hours.opening_on(candidate.date() + Duration::days(1));
                continue;
            }
            if candidate.hour() < hours.open_hour {
                candidate = hours.opening_on(candidate.date());
                continue;
            }
            if candidate.hour() >= hours.close_hour {
                candidate = hours.opening_on(candidate.date() + Duration::days(1));
                continue;
            }
            return AppointmentSlot::new(candidate);
        }
    }
}

#[derive(Debug, Clone)]
pub struct StaffMember {
    pub profile: Veterinarian,
    booked: BTreeSet<AppointmentSlot>,
}

impl StaffMember {
    pub fn new(profile: Veterinarian) -> Self {
        Self {
            profile,
            booked: BTreeSet::new(),
        }
    }

    pub fn is_free(&self, slot: &AppointmentSlot) -> bool {
        !self.booked.contains(slot)
    }

    pub fn booked(&self) -> impl Iterator<Item = &AppointmentSlot> {
        self.booked.iter()
    }

    // 同一時段不可重複預約
    fn book(&mut self, slot: AppointmentSlot) -> bool {
        self.booked.insert(slot)
    }
}

/// 預約結果；沒有可用人員時 veterinarian 為 None 且 slots 為空
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reservation {
    pub veterinarian: Option<Veterinarian>,
    pub slots: Vec<AppointmentSlot>,
}

impl Reservation {
    pub fn unassigned() -> Self {
        Self {
            veterinarian: None,
            slots: Vec::new(),
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.veterinarian.is_some()
    }

    pub fn first_slot(&self) -> Option<AppointmentSlot> {
        self.slots.first().copied()
    }
}

/// 診所排班表，整個流程共用同一份 (以 &mut 傳遞)
#[derive(Debug, Clone)]
pub struct Agenda {
    hours: BusinessHours,
    staff: Vec<StaffMember>,
}

impl Agenda {
    pub fn new(hours: BusinessHours, staff: Vec<Veterinarian>) -> Self {
        let mut agenda = Self {
            hours,
            staff: Vec::new(),
        };
        agenda.register_staff(staff);
        agenda
    }

    pub fn hours(&self) -> BusinessHours {
        self.hours
    }

    pub fn staff(&self) -> &[StaffMember] {
        &self.staff
    }

    pub fn next_business_slot(&self, from: NaiveDateTime) -> AppointmentSlot {
        self.hours.next_business_slot(from)
    }

    pub fn next_business_slot_from_clock(&self, clock: &dyn Clock, hours_ahead: i64) -> AppointmentSlot {
        self.next_business_slot(clock.now() + Duration::hours(hours_ahead))
    }

    /// 沒有任何人預約該時段
    pub fn is_available(&self, slot: &AppointmentSlot) -> bool {
        self.staff.iter().all(|member| member.is_free(slot))
    }

    pub fn available_staff_at(&self, slot: &AppointmentSlot) -> Vec<&Veterinarian> {
        self.staff
            .iter()
            .filter(|member| member.is_free(slot))
            .map(|member| &member.profile)
            .collect()
    }

    /// 指派第一位該時段空閒的人員
    pub fn reserve(&mut self, slot: AppointmentSlot) -> Option<Veterinarian> {
        let member = self.staff.iter_mut().find(|member| member.is_free(&slot))?;
        member.book(slot);
        tracing::debug!("Reserved {} for {}", slot, member.profile.name);
        Some(member.profile.clone())
    }

    fn block_slots(&self, start: AppointmentSlot, blocks: u32) -> Vec<AppointmentSlot> {
        let step = self.hours.slot_length();
        (0..blocks)
            .map(|idx| AppointmentSlot::new(start.starts_at() + step * idx as i32))
            .collect()
    }

    /// 整段時段都要落在營業時間內，且該人員每一格都空閒
    pub fn has_availability(&self, staff_name: &str, start: AppointmentSlot, blocks: u32) -> bool {
        let slots = self.block_slots(start, blocks);
        let hours = self.hours.sanitized();
        if !slots.iter().all(|slot| hours.contains(slot.starts_at())) {
            return false;
        }
        self.staff
            .iter()
            .find(|member| member.profile.name == staff_name)
            .map(|member| slots.iter().all(|slot| member.is_free(slot)))
            .unwrap_or(false)
    }

    /// 為指定人員預約整段連續時段，任何一格被占用就全部不預約
    pub fn reserve_block_with(&mut self, staff_name: &str, start: AppointmentSlot, blocks: u32) -> Reservation {
        if !self.has_availability(staff_name, start, blocks) {
            return Reservation::unassigned();
        }
        let slots = self.block_slots(start, blocks);
        let Some(member) = self
            .staff
            .iter_mut()
            .find(|member| member.profile.name == staff_name)
        else {
            return Reservation::unassigned();
        };
        for slot in &slots {
            member.book(*slot);
        }
        tracing::debug!(
            "Reserved {} block(s) from {} for {}",
            slots.len(),
            start,
            member.profile.name
        );
        Reservation {
            veterinarian: Some(member.profile.clone()),
            slots,
        }
    }

    pub fn reserve_block(&mut self, start: AppointmentSlot, blocks: u32) -> Reservation {
        if blocks <= 1 {
            return self.reserve_single(start);
        }

        let candidate = self
            .staff
            .iter()
            .find(|member| self.has_availability(&member.profile.name, start, blocks))
            .map(|member| member.profile.name.clone());

        match candidate {
            Some(name) => self.reserve_block_with(&name, start, blocks),
            None => {
                tracing::info!(
                    "No staff free for {} consecutive slots from {}, trying a single slot",
                    blocks,
                    start
                );
                self.reserve_single(start)
            }
        }
    }

    fn reserve_single(&mut self, start: AppointmentSlot) -> Reservation {
        match self.reserve(start) {
            Some(vet) => Reservation {
                veterinarian: Some(vet),
                slots: vec![start],
            },
            None => {
                tracing::warn!("⚠️ No staff available at {}", start);
                Reservation::unassigned()
            }
        }
    }

    /// 從 from 的下一個時段開始找第一個沒人預約的營業時段
    pub fn suggest_next(&self, from: NaiveDateTime) -> AppointmentSlot {
        let step = self.hours.slot_length();
        let mut candidate = self.next_business_slot(from + step);
        for _ in 0..MAX_SUGGESTION_ATTEMPTS {
            if self.is_available(&candidate) {
                return candidate;
            }
            candidate = self.next_business_slot(candidate.starts_at() + step);
        }
        self.next_business_slot(from + Duration::days(1))
    }

    /// 新增尚未登記 (以姓名判斷) 的人員，回傳新增數量
    pub fn register_staff(&mut self, new_staff: Vec<Veterinarian>) -> usize {
        let mut added = 0;
        for vet in new_staff {
            if self.staff.iter().any(|member| member.profile.name == vet.name) {
                continue;
            }
            self.staff.push(StaffMember::new(vet));
            added += 1;
        }
        added
    }

    pub fn schedule_by_staff(&self) -> BTreeMap<String, Vec<AppointmentSlot>> {
        self.staff
            .iter()
            .map(|member| (member.profile.name.clone(), member.booked().copied().collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::FixedClock;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn slot(y: i32, m: u32, d: u32, h: u32, min: u32) -> AppointmentSlot {
        AppointmentSlot::new(at(y, m, d, h, min))
    }

    fn staff() -> Vec<Veterinarian> {
        vec![
            Veterinarian::new("Ana Lopez", "General"),
            Veterinarian::new("Benjamin Ruiz", "Surgery"),
        ]
    }

    #[test]
    fn test_friday_evening_rolls_to_monday_opening() {
        let hours = BusinessHours::default();
        // 2025-01-03 is a Friday
        let next = hours.next_business_slot(at(2025, 1, 3, 19, 0));
        assert_eq!(next, slot(2025, 1, 6, 8, 0));
    }

    #[test]
    fn test_rounds_up_to_next_half_hour() {
        let hours = BusinessHours::default();
        assert_eq!(hours.next_business_slot(at(2025, 1, 6, 10, 10)), slot(2025, 1, 6, 10, 30));
        assert_eq!(hours.next_business_slot(at(2025, 1, 6, 10, 30)), slot(2025, 1, 6, 10, 30));
        assert_eq!(hours.next_business_slot(at(2025, 1, 6, 17, 45)), slot(2025, 1, 7, 8, 0));
    }

    #[test]
    fn test_seconds_force_next_boundary() {
        let hours = BusinessHours::default();
        let from = at(2025, 1, 6, 10, 0) + Duration::seconds(20);
        assert_eq!(hours.next_business_slot(from), slot(2025, 1, 6, 10, 30));
    }

    #[test]
    fn test_before_opening_and_weekend() {
        let hours = BusinessHours::default();
        assert_eq!(hours.next_business_slot(at(2025, 1, 6, 6, 15)), slot(2025, 1, 6, 8, 0));
        // Saturday morning
        assert_eq!(hours.next_business_slot(at(2025, 1, 4, 10, 0)), slot(2025, 1, 6, 8, 0));
    }

    #[test]
    fn test_hourly_nine_to_six_variant() {
        let hours = BusinessHours::new(9, 18, 60);
        assert_eq!(hours.next_business_slot(at(2025, 1, 6, 8, 20)), slot(2025, 1, 6, 9, 0));
        assert_eq!(hours.next_business_slot(at(2025, 1, 6, 12, 1)), slot(2025, 1, 6, 13, 0));
        assert_eq!(hours.next_business_slot(at(2025, 1, 3, 17, 30)), slot(2025, 1, 6, 9, 0));
    }

    #[test]
    fn test_invalid_hours_fall_back_to_defaults() {
        let hours = BusinessHours::new(18, 8, 30);
        assert!(!hours.is_valid());
        assert_eq!(hours.next_business_slot(at(2025, 1, 6, 5, 0)), slot(2025, 1, 6, 8, 0));
    }

    #[test]
    fn test_next_slot_always_in_business_hours() {
        let variants = [BusinessHours::default(), BusinessHours::new(9, 18, 60)];
        for hours in variants {
            let mut from = at(2025, 1, 1, 0, 0);
            let end = at(2025, 1, 15, 0, 0);
            while from < end {
                let next = hours.next_business_slot(from);
                assert!(hours.contains(next.starts_at()), "{} -> {}", from, next);
                assert!(next.starts_at() >= from, "{} -> {}", from, next);
                assert_eq!(next.starts_at().minute() % hours.slot_minutes, 0);
                from += Duration::minutes(17);
            }
        }
    }

    #[test]
    fn test_next_slot_from_clock() {
        let agenda = Agenda::new(BusinessHours::default(), staff());
        let clock = FixedClock(at(2025, 1, 6, 9, 0));
        assert_eq!(agenda.next_business_slot_from_clock(&clock, 2), slot(2025, 1, 6, 11, 0));
    }

    #[test]
    fn test_reserve_assigns_first_free_and_never_double_books() {
        let mut agenda = Agenda::new(BusinessHours::default(), staff());
        let s = slot(2025, 1, 6, 9, 0);

        assert_eq!(agenda.reserve(s).unwrap().name, "Ana Lopez");
        assert!(!agenda.is_available(&s));
        assert_eq!(agenda.reserve(s).unwrap().name, "Benjamin Ruiz");
        assert!(agenda.reserve(s).is_none());
        assert!(agenda.available_staff_at(&s).is_empty());

        for booked in agenda.schedule_by_staff().values() {
            assert_eq!(booked, &vec![s]);
        }
    }

    #[test]
    fn test_reserve_block_picks_first_staff_free_for_whole_block() {
        let mut agenda = Agenda::new(BusinessHours::default(), staff());
        agenda.reserve(slot(2025, 1, 6, 9, 30));

        let reservation = agenda.reserve_block(slot(2025, 1, 6, 9, 0), 2);

        assert_eq!(reservation.veterinarian.unwrap().name, "Benjamin Ruiz");
        assert_eq!(
            reservation.slots,
            vec![slot(2025, 1, 6, 9, 0), slot(2025, 1, 6, 9, 30)]
        );
    }

    #[test]
    fn test_reserve_block_falls_back_to_single_slot() {
        let mut agenda = Agenda::new(BusinessHours::default(), staff());
        agenda.reserve_block_with("Ana Lopez", slot(2025, 1, 6, 9, 30), 1);
        agenda.reserve_block_with("Benjamin Ruiz", slot(2025, 1, 6, 10, 0), 1);

        let reservation = agenda.reserve_block(slot(2025, 1, 6, 9, 0), 3);

        assert_eq!(reservation.veterinarian.unwrap().name, "Ana Lopez");
        assert_eq!(reservation.slots, vec![slot(2025, 1, 6, 9, 0)]);
    }

    #[test]
    fn test_block_past_closing_falls_back_to_single_slot() {
        let mut agenda = Agenda::new(BusinessHours::default(), staff());
        // 2025-01-03 is a Friday, 17:30 is the last slot of the day
        let last = slot(2025, 1, 3, 17, 30);

        assert!(!agenda.has_availability("Ana Lopez", last, 2));
        let reservation = agenda.reserve_block(last, 2);

        assert_eq!(reservation.veterinarian.unwrap().name, "Ana Lopez");
        assert_eq!(reservation.slots, vec![last]);
        for booked in agenda.schedule_by_staff().values() {
            assert!(booked.iter().all(|s| agenda.hours().contains(s.starts_at())));
        }
    }

    #[test]
    fn test_reserve_block_without_staff_is_unassigned() {
        let mut agenda = Agenda::new(BusinessHours::default(), vec![]);
        let reservation = agenda.reserve_block(slot(2025, 1, 6, 9, 0), 2);
        assert_eq!(reservation, Reservation::unassigned());
        assert!(reservation.first_slot().is_none());
    }

    #[test]
    fn test_reserve_block_with_is_all_or_nothing() {
        let mut agenda = Agenda::new(BusinessHours::default(), staff());
        agenda.reserve(slot(2025, 1, 6, 10, 0));

        let reservation = agenda.reserve_block_with("Ana Lopez", slot(2025, 1, 6, 9, 0), 3);

        assert!(!reservation.is_assigned());
        assert_eq!(agenda.schedule_by_staff()["Ana Lopez"], vec![slot(2025, 1, 6, 10, 0)]);
        assert!(!agenda.has_availability("Nobody", slot(2025, 1, 6, 9, 0), 1));
    }

    #[test]
    fn test_suggest_next_skips_booked_slots() {
        let mut agenda = Agenda::new(BusinessHours::default(), staff());
        agenda.reserve(slot(2025, 1, 6, 9, 30));
        agenda.reserve(slot(2025, 1, 6, 10, 0));

        assert_eq!(agenda.suggest_next(at(2025, 1, 6, 9, 0)), slot(2025, 1, 6, 10, 30));
    }

    #[test]
    fn test_register_staff_ignores_duplicates() {
        let mut agenda = Agenda::new(BusinessHours::default(), staff());
        let added = agenda.register_staff(vec![
            Veterinarian::new("Ana Lopez", "Dermatology"),
            Veterinarian::new("Carla Soto", "Exotics"),
        ]);
        assert_eq!(added, 1);
        assert_eq!(agenda.staff().len(), 3);
        assert_eq!(agenda.staff()[0].profile.specialty, "General");
    }

    #[test]
    fn test_schedule_by_staff_is_sorted() {
        let mut agenda = Agenda::new(BusinessHours::default(), staff());
        agenda.reserve_block_with("Ana Lopez", slot(2025, 1, 7, 8, 0), 1);
        agenda.reserve_block_with("Ana Lopez", slot(2025, 1, 6, 15, 0), 2);

        let schedule = agenda.schedule_by_staff();
        assert_eq!(
            schedule["Ana Lopez"],
            vec![
                slot(2025, 1, 6, 15, 0),
                slot(2025, 1, 6, 15, 30),
                slot(2025, 1, 7, 8, 0)
            ]
        );
        assert!(schedule["Benjamin Ruiz"].is_empty());
    }
}
