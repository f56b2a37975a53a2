//! Monitoring cycle: the pass that ties the three telemetry checks together.
//!
//! `CycleCoordinator::run_cycle` executes four phases strictly in order:
//! 1. Safety: fit the inactivity model and collect anomalies
//! 2. Reminders: dispatch each due reminder and mark it delivered, one at a time
//! 3. Vitals: evaluate the most recent vitals record
//! 4. Advisory: ask the advisor for guidance text
//!
//! Every phase runs even when an earlier one had nothing to report. A store
//! failure in any phase aborts the cycle and no partial result is returned.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::advisory::Advisor;
use crate::cycle::result::{AdvisoryNote, CycleResult, DispatchedReminder};
use crate::db::Database;
use crate::detection::AnomalyDetector;
use crate::reminders::ReminderDispatcher;
use crate::settings::MonitorSettings;
use crate::vitals::VitalsEvaluator;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub struct CycleCoordinator {
    detector: AnomalyDetector,
    dispatcher: ReminderDispatcher,
    evaluator: VitalsEvaluator,
    advisor: Box<dyn Advisor>,
    advisory_prompt: String,
}

impl CycleCoordinator {
    pub fn new(
        detector: AnomalyDetector,
        dispatcher: ReminderDispatcher,
        evaluator: VitalsEvaluator,
        advisor: Box<dyn Advisor>,
        advisory_prompt: impl Into<String>,
    ) -> Self {
        Self {
            detector,
            dispatcher,
            evaluator,
            advisor,
            advisory_prompt: advisory_prompt.into(),
        }
    }

    /// Wire every component to the same store handle.
    pub fn from_settings(
        db: Database,
        settings: &MonitorSettings,
        advisor: Box<dyn Advisor>,
    ) -> Self {
        Self::new(
            AnomalyDetector::new(db.clone(), settings.detection.clone()),
            ReminderDispatcher::new(db.clone()),
            VitalsEvaluator::new(db, settings.vitals.clone()),
            advisor,
            settings.advisory_prompt.clone(),
        )
    }

    pub async fn run_cycle(&self) -> Result<CycleResult> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle treating `now` as the cycle start time.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleResult> {
        log_info!("Monitoring cycle started at {}", now.to_rfc3339());

        let safety = self
            .detector
            .detect_anomalies()
            .await
            .context("safety phase failed")?;

        let reminders = self
            .dispatch_due_reminders(now)
            .await
            .context("reminder phase failed")?;

        let vitals = self
            .evaluator
            .check_latest_vitals()
            .await
            .context("vitals phase failed")?;

        let advisory = self.consult_advisor();

        log_info!(
            "Monitoring cycle finished: {} reminder(s) dispatched, {} vitals alert(s)",
            reminders.len(),
            vitals.alerts().len()
        );

        Ok(CycleResult {
            started_at: now,
            safety,
            reminders,
            vitals,
            advisory,
        })
    }

    async fn dispatch_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<DispatchedReminder>> {
        let due = self.dispatcher.get_due_reminders(now).await?;
        let mut dispatched = Vec::with_capacity(due.len());

        // One at a time: each mark is committed before the next reminder is touched.
        for reminder in due {
            log_info!(
                "Reminder: {} at {}",
                reminder.reminder_type,
                reminder.scheduled_time.to_rfc3339()
            );
            let outcome = self.dispatcher.mark_delivered(reminder.row_id).await?;
            dispatched.push(DispatchedReminder { reminder, outcome });
        }

        Ok(dispatched)
    }

    fn consult_advisor(&self) -> AdvisoryNote {
        match self.advisor.advise(&self.advisory_prompt) {
            Ok(text) => AdvisoryNote {
                prompt: self.advisory_prompt.clone(),
                text,
                failed: false,
            },
            Err(err) => {
                log_warn!("Advisor failed: {err:#}");
                AdvisoryNote {
                    prompt: self.advisory_prompt.clone(),
                    text: format!("Advice unavailable: {err}"),
                    failed: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::{Duration, TimeZone};

    use crate::advisory::StubAdvisor;
    use crate::db::{test_support::test_db, MarkOutcome, Reminder, SafetyEvent, VitalsRecord};
    use crate::detection::{DetectionConfig, SafetyOutcome};
    use crate::vitals::{VitalsAlert, VitalsOutcome};

    struct FailingAdvisor;

    impl Advisor for FailingAdvisor {
        fn advise(&self, _prompt: &str) -> Result<String> {
            Err(anyhow!("model offline"))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap()
    }

    fn coordinator(db: &Database, advisor: Box<dyn Advisor>) -> CycleCoordinator {
        let settings = MonitorSettings {
            detection: DetectionConfig {
                seed: Some(11),
                ..DetectionConfig::default()
            },
            ..MonitorSettings::default()
        };
        CycleCoordinator::from_settings(db.clone(), &settings, advisor)
    }

    #[tokio::test]
    async fn empty_store_runs_every_phase() {
        let db = test_db();
        let result = coordinator(&db, Box::new(StubAdvisor))
            .run_cycle_at(now())
            .await
            .expect("cycle");

        assert!(matches!(
            result.safety,
            SafetyOutcome::InsufficientData { valid_samples: 0, .. }
        ));
        assert!(result.reminders.is_empty());
        assert_eq!(result.vitals, VitalsOutcome::NoData);
        assert_eq!(result.advisory.prompt, "fall prevention tips for elderly");
        assert!(!result.advisory.failed);
        assert_eq!(result.started_at, now());
    }

    #[tokio::test]
    async fn overdue_reminder_is_dispatched_and_marked() {
        let db = test_db();
        db.upsert_reminders(&[Reminder::new(1, "Medication", now() - Duration::hours(1))])
            .await
            .expect("seed");

        let result = coordinator(&db, Box::new(StubAdvisor))
            .run_cycle_at(now())
            .await
            .expect("cycle");

        assert_eq!(result.reminders.len(), 1);
        assert_eq!(result.reminders[0].reminder.row_id, 1);
        assert_eq!(result.reminders[0].outcome, MarkOutcome::Marked);
        assert_eq!(result.delivered_reminders().count(), 1);

        let stored = db.get_reminder(1).await.expect("get").expect("exists");
        assert!(stored.delivered);
    }

    #[tokio::test]
    async fn second_cycle_sees_no_already_dispatched_reminders() {
        let db = test_db();
        db.upsert_reminders(&[
            Reminder::new(1, "Medication", now() - Duration::hours(2)),
            Reminder::new(2, "Hydration", now() - Duration::minutes(5)),
            Reminder::new(3, "Appointment", now() + Duration::hours(3)),
        ])
        .await
        .expect("seed");

        let coordinator = coordinator(&db, Box::new(StubAdvisor));
        let first = coordinator.run_cycle_at(now()).await.expect("first cycle");
        let second = coordinator.run_cycle_at(now()).await.expect("second cycle");

        let first_ids: Vec<i64> = first.reminders.iter().map(|d| d.reminder.row_id).collect();
        assert_eq!(first_ids, vec![1, 2]);
        assert!(second.reminders.is_empty());
    }

    #[tokio::test]
    async fn collects_all_phase_outputs() {
        let db = test_db();
        let base = now() - Duration::days(1);
        let mut events: Vec<SafetyEvent> = (0..20)
            .map(|i| {
                SafetyEvent::new(
                    i + 1,
                    base + Duration::minutes(i * 30),
                    Some(format!("{}", 30 + (i % 5)).as_str()),
                    "Living Room",
                )
            })
            .collect();
        events.push(SafetyEvent::new(21, base, Some("7200"), "Stairs"));
        db.upsert_safety_events(&events).await.expect("safety");
        db.upsert_vitals(&[VitalsRecord::new(1, now() - Duration::minutes(1), 45.0, 150.0, 95.0)])
            .await
            .expect("vitals");

        let result = coordinator(&db, Box::new(StubAdvisor))
            .run_cycle_at(now())
            .await
            .expect("cycle");

        let anomalies = result.safety.anomalies().expect("model fit");
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].location, "Stairs");
        assert_eq!(
            result.vitals.alerts(),
            &[VitalsAlert::AbnormalHeartRate { value: 45.0 }]
        );
    }

    #[tokio::test]
    async fn advisor_failure_becomes_text() {
        let db = test_db();
        let result = coordinator(&db, Box::new(FailingAdvisor))
            .run_cycle_at(now())
            .await
            .expect("advisor errors must not fail the cycle");

        assert!(result.advisory.failed);
        assert!(result.advisory.text.contains("model offline"));
    }

    #[tokio::test]
    async fn store_failure_aborts_the_cycle() {
        let db = test_db();
        db.upsert_reminders(&[Reminder::new(1, "Medication", now() - Duration::hours(1))])
            .await
            .expect("seed");
        db.execute(|conn| {
            conn.execute_batch("DROP TABLE vitals")?;
            Ok(())
        })
        .await
        .expect("drop vitals");

        let err = coordinator(&db, Box::new(StubAdvisor))
            .run_cycle_at(now())
            .await
            .expect_err("missing vitals table must fail the cycle");
        assert!(format!("{err:#}").contains("vitals phase failed"));

        // earlier phases already committed their marks
        let stored = db.get_reminder(1).await.expect("get").expect("exists");
        assert!(stored.delivered);
    }

    #[tokio::test]
    async fn safety_store_failure_reports_its_phase() {
        let db = test_db();
        db.execute(|conn| {
            conn.execute_batch("DROP TABLE safety_events")?;
            Ok(())
        })
        .await
        .expect("drop safety_events");

        let err = coordinator(&db, Box::new(StubAdvisor))
            .run_cycle_at(now())
            .await
            .expect_err("missing safety table must fail the cycle");
        assert!(format!("{err:#}").contains("safety phase failed"));
    }

    #[tokio::test]
    async fn result_serializes_in_phase_order() {
        let db = test_db();
        let result = coordinator(&db, Box::new(StubAdvisor))
            .run_cycle_at(now())
            .await
            .expect("cycle");

        let json = serde_json::to_string(&result).expect("json");
        let safety = json.find("\"safety\"").expect("safety key");
        let reminders = json.find("\"reminders\"").expect("reminders key");
        let vitals = json.find("\"vitals\"").expect("vitals key");
        let advisory = json.find("\"advisory\"").expect("advisory key");
        assert!(safety < reminders && reminders < vitals && vitals < advisory);
        assert!(json.contains("\"status\":\"insufficientData\""));
    }
}
