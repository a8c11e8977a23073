//! In-process interval runner for the attendance passes.
//!
//! Optional: deployments that drive the trigger endpoints from an external
//! cron leave it disabled. Each tick runs one unforced pass at the current
//! time; a failing pass is logged and the loop keeps going.

use crate::{
    config::settings::SchedulerConfig,
    core::attendance::{self, AutosaveReport, GenerationReport},
    errors::Result,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::time::Duration;
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, error, info};

/// Runs one unforced generation pass now.
pub async fn generation_tick(db: &DatabaseConnection) -> Result<GenerationReport> {
    let report = attendance::generate_attendance_sheets(db, Utc::now(), false).await?;
    if report.records_created() > 0 || report.failures() > 0 {
        info!(
            "Scheduled generation: {} record(s) created, {} failure(s)",
            report.records_created(),
            report.failures()
        );
    } else {
        debug!("Scheduled generation: nothing due");
    }
    Ok(report)
}

/// Runs one unforced autosave pass now.
pub async fn autosave_tick(db: &DatabaseConnection) -> Result<AutosaveReport> {
    let report = attendance::autosave_attendance_sheets(db, Utc::now(), false).await?;
    if report.archived() > 0 || report.failures() > 0 {
        info!(
            "Scheduled autosave: {} session(s) archived, {} failure(s)",
            report.archived(),
            report.failures()
        );
    } else {
        debug!("Scheduled autosave: nothing due");
    }
    Ok(report)
}

/// Ticks both passes on their own intervals until the task is dropped.
pub async fn run(db: DatabaseConnection, config: SchedulerConfig) {
    let mut generate = interval(Duration::from_secs(config.generate_interval_secs));
    let mut autosave = interval(Duration::from_secs(config.autosave_interval_secs));
    generate.set_missed_tick_behavior(MissedTickBehavior::Skip);
    autosave.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "Scheduler started (generation every {}s, autosave every {}s)",
        config.generate_interval_secs, config.autosave_interval_secs
    );

    loop {
        tokio::select! {
            _ = generate.tick() => {
                if let Err(e) = generation_tick(&db).await {
                    error!("Scheduled generation failed: {}", e);
                }
            }
            _ = autosave.tick() => {
                if let Err(e) = autosave_tick(&db).await {
                    error!("Scheduled autosave failed: {}", e);
                }
            }
        }
    }
}

/// Spawns [`run`] on the current runtime.
#[must_use]
pub fn spawn(db: DatabaseConnection, config: SchedulerConfig) -> JoinHandle<()> {
    tokio::spawn(run(db, config))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::grade::{self, GradeInput};
    use crate::entities::Attendance;
    use crate::test_utils::*;
    use chrono::Timelike;
    use sea_orm::{EntityTrait, PaginatorTrait};

    #[tokio::test]
    async fn test_ticks_with_nothing_due() -> Result<()> {
        let db = setup_test_db().await?;
        let report = generation_tick(&db).await?;
        assert_eq!(report.records_created(), 0);
        assert!(!report.forced);

        let report = autosave_tick(&db).await?;
        assert_eq!(report.archived(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_generation_tick_opens_due_session() -> Result<()> {
        let db = setup_test_db().await?;
        let reset_time = Utc::now().time().with_nanosecond(0).unwrap();
        let robotics = grade::create_grade(
            &db,
            GradeInput {
                name: "Robotics".to_string(),
                reset_time,
                class_time: None,
                lesson_duration: 2,
                weekdays: String::new(),
            },
        )
        .await?;
        create_test_student(&db, "Maria", "Papadopoulos", Some(robotics.id)).await?;

        let report = generation_tick(&db).await?;
        assert_eq!(report.records_created(), 1);
        assert_eq!(Attendance::find().count(&db).await?, 1);

        // A fresh session is not archived before the lesson is over.
        let report = autosave_tick(&db).await?;
        assert_eq!(report.archived(), 0);
        assert_eq!(Attendance::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_spawned_runner_ticks_immediately() -> Result<()> {
        let db = setup_test_db().await?;
        let handle = spawn(
            db.clone(),
            SchedulerConfig {
                enabled: true,
                generate_interval_secs: 3600,
                autosave_interval_secs: 3600,
            },
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        handle.abort();
        Ok(())
    }
}
