use crate::core::scheduler::Agenda;
use crate::core::store::ClinicStats;
use crate::utils::error::{ClinicError, Result};
use std::path::Path;

/// 將所有預約輸出為 CSV (veterinarian, specialty, slot)
pub fn agenda_csv(agenda: &Agenda) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["veterinarian", "specialty", "slot"])?;

    for member in agenda.staff() {
        for slot in member.booked() {
            writer.write_record([
                member.profile.name.as_str(),
                member.profile.specialty.as_str(),
                slot.to_string().as_str(),
            ])?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ClinicError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ClinicError::ValidationError {
        message: format!("Agenda export is not valid UTF-8: {}", e),
    })
}

pub async fn write_agenda_csv(agenda: &Agenda, path: &Path) -> Result<()> {
    let content = agenda_csv(agenda)?;
    tokio::fs::write(path, content).await?;
    tracing::info!("📁 Agenda exported to {}", path.display());
    Ok(())
}

pub fn stats_text(stats: &ClinicStats) -> String {
    let mut out = format!(
        "Consultations: {}\nPets attended: {}\nLast owner   : {}\n",
        stats.total_consultations, stats.total_pets, stats.last_owner
    );
    for patient in &stats.patients {
        out.push_str(&format!("  - {}\n", patient));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scheduler::BusinessHours;
    use crate::core::store::ClinicStore;
    use crate::domain::model::{AppointmentSlot, Veterinarian};
    use crate::domain::ports::AttentionLog;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn slot(h: u32, m: u32) -> AppointmentSlot {
        AppointmentSlot::new(
            NaiveDate::from_ymd_opt(2025, 1, 6)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap(),
        )
    }

    fn agenda_with_bookings() -> Agenda {
        let mut agenda = Agenda::new(
            BusinessHours::default(),
            vec![Veterinarian::new("Ana Lopez", "General, Exotics")],
        );
        agenda.reserve_block(slot(9, 0), 2);
        agenda
    }

    #[test]
    fn test_agenda_csv_lists_every_booking() {
        let csv = agenda_csv(&agenda_with_bookings()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "veterinarian,specialty,slot");
        assert_eq!(lines[1], "Ana Lopez,\"General, Exotics\",2025-01-06 09:00");
        assert_eq!(lines[2], "Ana Lopez,\"General, Exotics\",2025-01-06 09:30");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_agenda_has_only_header() {
        let agenda = Agenda::new(BusinessHours::default(), Vec::new());
        assert_eq!(agenda_csv(&agenda).unwrap(), "veterinarian,specialty,slot\n");
    }

    #[tokio::test]
    async fn test_write_agenda_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agenda.csv");
        write_agenda_csv(&agenda_with_bookings(), &path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("2025-01-06 09:30"));
    }

    #[test]
    fn test_stats_text() {
        let store = ClinicStore::new();
        store.record_attention("Ana", 1, "Toby", "Dog");
        let text = stats_text(&store.snapshot());
        assert!(text.contains("Consultations: 1"));
        assert!(text.contains("  - Pet: Toby (Dog) - Owner: Ana"));
    }
}
