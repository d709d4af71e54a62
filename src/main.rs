use clap::Parser;
use std::sync::Arc;
use vet_clinic::core::report;
use vet_clinic::domain::ports::{Clock, ConfigProvider};
use vet_clinic::utils::error::{ClinicError, ErrorSeverity};
use vet_clinic::utils::{logger, validation::Validate};
use vet_clinic::{Agenda, CliConfig, ClinicStore, FixedClock, RegistrationSession, SystemClock};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting vet-clinic CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(&config).await {
        tracing::error!(
            "❌ Registration failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(config: &CliConfig) -> vet_clinic::Result<()> {
    let clinic = config.load_clinic_config()?;

    if config.dry_run {
        tracing::info!("🔍 Dry run, printing configuration for {}", clinic.clinic.name);
        println!("{}", serde_json::to_string_pretty(&clinic)?);
        return Ok(());
    }

    let store = Arc::new(ClinicStore::new());
    let clock = FixedClock(config.at.unwrap_or_else(|| SystemClock.now()));
    let mut agenda = Agenda::new(clinic.business_hours(), clinic.staff());

    let session = RegistrationSession::new(store.clone(), clock, &clinic);
    session.update_owner(Some(&config.owner), Some(&config.phone), Some(&config.email));
    session.update_pet(
        Some(&config.pet),
        Some(&config.species),
        Some(&config.age),
        Some(&config.weight),
        config.last_vaccination.as_deref(),
    );
    session.select_service(config.service_category());
    session.set_pet_count(config.pet_count);

    for name in &config.medications {
        match session.find_medication(name).cloned() {
            Some(medication) => {
                session.add_to_cart(&medication);
            }
            None => tracing::warn!("⚠️ '{}' is not in the catalog, skipping", name),
        }
    }

    let summary = session.process(&mut agenda).await?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.render());
        println!();
        print!("{}", report::stats_text(&store.snapshot()));
    }

    if let Some(path) = &config.agenda_csv {
        report::write_agenda_csv(&agenda, path).await?;
    }

    if !summary.reservation.is_assigned() {
        return Err(ClinicError::SchedulingError {
            message: format!(
                "no veterinarian was free, next open slot is {}",
                agenda.suggest_next(clock.now())
            ),
        });
    }

    tracing::info!("✅ Registration {} completed", summary.consultation.id);
    Ok(())
}
