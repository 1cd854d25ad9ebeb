use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info};
use uuid::Uuid;

use super::notification_dispatcher::NotificationDispatcher;

/// Identifier of the single daily digest job.
pub const DAILY_DIGEST_JOB: &str = "daily_task_notifications";

/// Source of the current instant.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),

    #[error("Trigger has been stopped")]
    Stopped,
}

/// Wall-clock time of day, in a named zone, at which the digest fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestSchedule {
    hour: u32,
    minute: u32,
    timezone: Tz,
}

impl DigestSchedule {
    pub fn new(hour: u32, minute: u32, timezone: Tz) -> Result<Self, TriggerError> {
        if hour > 23 {
            return Err(TriggerError::InvalidSchedule(format!(
                "hour must be between 0 and 23, got {}",
                hour
            )));
        }
        if minute > 59 {
            return Err(TriggerError::InvalidSchedule(format!(
                "minute must be between 0 and 59, got {}",
                minute
            )));
        }

        Ok(Self {
            hour,
            minute,
            timezone,
        })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First firing instant strictly after `now`, using the zone's offset
    /// on the day it fires.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.with_timezone(&self.timezone).date_naive();

        (0..=2)
            .filter_map(|days| today.checked_add_days(Days::new(days)))
            .filter_map(|date| self.fire_on(date))
            .find(|at| *at > now)
    }

    fn fire_on(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let local = date.and_time(NaiveTime::from_hms_opt(self.hour, self.minute, 0)?);

        let at = match self.timezone.from_local_datetime(&local) {
            LocalResult::Single(at) => at,
            LocalResult::Ambiguous(earliest, _) => earliest,
            // Skipped by a forward clock change; fire once the clock is past it.
            LocalResult::None => self
                .timezone
                .from_local_datetime(&(local + Duration::hours(1)))
                .earliest()?,
        };

        Some(at.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Uninitialized,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledJob {
    id: Uuid,
    fires_at: DateTime<Utc>,
}

struct TriggerInner {
    scheduler: JobScheduler,
    jobs: Mutex<HashMap<&'static str, ScheduledJob>>,
    state: Mutex<TriggerState>,
    clock: Clock,
}

impl TriggerInner {
    /// Schedules a one-shot run at the next firing instant, replacing the
    /// previous job under the same key.
    async fn arm(
        &self,
        schedule: &DigestSchedule,
        dispatcher: &Arc<NotificationDispatcher>,
        fired: &mpsc::UnboundedSender<()>,
    ) -> Result<Uuid, TriggerError> {
        if *self.state.lock().await == TriggerState::Stopped {
            return Err(TriggerError::Stopped);
        }

        let now = (self.clock)();
        let fires_at = schedule.next_fire_after(now).ok_or_else(|| {
            TriggerError::InvalidSchedule(format!("no firing time after {}", now))
        })?;
        let delay = (fires_at - now).to_std().unwrap_or_default();

        let dispatcher = dispatcher.clone();
        let fired = fired.clone();
        let job = Job::new_one_shot_async(delay, move |_uuid, _l| {
            let dispatcher = dispatcher.clone();
            let fired = fired.clone();

            Box::pin(async move {
                info!("Running daily task notifications");
                dispatcher.run_once().await;
                let _ = fired.send(());
            })
        })?;

        let mut jobs = self.jobs.lock().await;
        if let Some(previous) = jobs.get(DAILY_DIGEST_JOB) {
            self.scheduler.remove(&previous.id).await?;
        }
        let id = self.scheduler.add(job).await?;
        jobs.insert(DAILY_DIGEST_JOB, ScheduledJob { id, fires_at });

        info!(
            job = DAILY_DIGEST_JOB,
            "Next daily notification run at {}",
            fires_at.with_timezone(&schedule.timezone())
        );
        Ok(id)
    }
}

/// Owns the scheduler that fires the daily dispatch.
///
/// Each run is a one-shot job keyed by a fixed identifier. After it fires the
/// next one is scheduled from the zone's offset on that day, and registering
/// again replaces the pending job so at most one exists.
pub struct DailyTrigger {
    inner: Arc<TriggerInner>,
    rearm: Mutex<Option<JoinHandle<()>>>,
}

impl DailyTrigger {
    pub async fn new() -> Result<Self, TriggerError> {
        Self::with_clock(Arc::new(Utc::now)).await
    }

    pub async fn with_clock(clock: Clock) -> Result<Self, TriggerError> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            inner: Arc::new(TriggerInner {
                scheduler,
                jobs: Mutex::new(HashMap::new()),
                state: Mutex::new(TriggerState::Uninitialized),
                clock,
            }),
            rearm: Mutex::new(None),
        })
    }

    /// Registers the daily digest job, replacing any earlier registration.
    pub async fn register(
        &self,
        schedule: &DigestSchedule,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Result<Uuid, TriggerError> {
        let mut rearm = self.rearm.lock().await;
        if let Some(previous) = rearm.take() {
            previous.abort();
        }

        let (fired, mut runs) = mpsc::unbounded_channel();
        let id = self.inner.arm(schedule, &dispatcher, &fired).await?;

        let inner = self.inner.clone();
        let schedule = *schedule;
        *rearm = Some(tokio::spawn(async move {
            while runs.recv().await.is_some() {
                if let Err(e) = inner.arm(&schedule, &dispatcher, &fired).await {
                    error!("Failed to schedule next daily notification run: {}", e);
                    break;
                }
            }
        }));

        Ok(id)
    }

    /// Starts firing registered jobs. Calling it again is a no-op.
    pub async fn start(&self) -> Result<(), TriggerError> {
        let mut state = self.inner.state.lock().await;
        match *state {
            TriggerState::Running => Ok(()),
            TriggerState::Stopped => Err(TriggerError::Stopped),
            TriggerState::Uninitialized => {
                self.inner.scheduler.start().await?;
                *state = TriggerState::Running;
                info!("Notification scheduler started");
                Ok(())
            }
        }
    }

    /// Stops the scheduler. Calling it again is a no-op.
    pub async fn stop(&self) -> Result<(), TriggerError> {
        let mut rearm = self.rearm.lock().await;
        let mut state = self.inner.state.lock().await;
        if *state == TriggerState::Stopped {
            return Ok(());
        }

        if let Some(handle) = rearm.take() {
            handle.abort();
        }
        self.inner.scheduler.clone().shutdown().await?;
        *state = TriggerState::Stopped;
        info!("Notification scheduler stopped");
        Ok(())
    }

    /// Next firing instant of the digest job, if one is registered.
    pub async fn next_fire(&self) -> Option<DateTime<Utc>> {
        self.inner
            .jobs
            .lock()
            .await
            .get(DAILY_DIGEST_JOB)
            .map(|job| job.fires_at)
    }

    #[cfg(test)]
    async fn job_id(&self) -> Option<Uuid> {
        self.inner.jobs.lock().await.get(DAILY_DIGEST_JOB).map(|job| job.id)
    }

    #[cfg(test)]
    async fn registered_jobs(&self) -> usize {
        self.inner.jobs.lock().await.len()
    }

    #[cfg(test)]
    async fn state(&self) -> TriggerState {
        *self.inner.state.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::DigestComposer;
    use crate::task::{TaskPriority, TaskStatus};
    use crate::testing::{task, user, InMemoryStore, RecordingMailer};
    use chrono::Timelike;
    use chrono_tz::Europe::Berlin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dispatcher_with(store: Arc<InMemoryStore>, mailer: Arc<RecordingMailer>) -> Arc<NotificationDispatcher> {
        let composer = DigestComposer::new(store.clone(), "http://localhost:3000");
        Arc::new(NotificationDispatcher::new(store, composer, mailer, Tz::UTC))
    }

    fn dispatcher() -> Arc<NotificationDispatcher> {
        dispatcher_with(
            Arc::new(InMemoryStore::new(Vec::new())),
            Arc::new(RecordingMailer::default()),
        )
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn fixed_clock(at: DateTime<Utc>) -> Clock {
        Arc::new(move || at)
    }

    #[test]
    fn test_schedule_bounds() {
        assert!(DigestSchedule::new(0, 0, Tz::UTC).is_ok());
        assert!(DigestSchedule::new(23, 59, Tz::UTC).is_ok());
        assert!(matches!(
            DigestSchedule::new(24, 0, Tz::UTC),
            Err(TriggerError::InvalidSchedule(_))
        ));
        assert!(matches!(
            DigestSchedule::new(8, 60, Tz::UTC),
            Err(TriggerError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn test_next_fire_later_today_or_tomorrow() {
        let schedule = DigestSchedule::new(8, 0, Tz::UTC).unwrap();
        assert_eq!(
            schedule.next_fire_after(utc(2026, 10, 16, 7, 59)),
            Some(utc(2026, 10, 16, 8, 0))
        );
        assert_eq!(
            schedule.next_fire_after(utc(2026, 10, 16, 8, 0)),
            Some(utc(2026, 10, 17, 8, 0))
        );
    }

    #[test]
    fn test_next_fire_keeps_local_time_across_dst_change() {
        let schedule = DigestSchedule::new(8, 0, Berlin).unwrap();

        // Summer: 08:00 CEST is 06:00 UTC.
        assert_eq!(
            schedule.next_fire_after(utc(2026, 7, 1, 12, 0)),
            Some(utc(2026, 7, 2, 6, 0))
        );
        // Clocks go back on 2026-10-25: 08:00 CET is 07:00 UTC.
        assert_eq!(
            schedule.next_fire_after(utc(2026, 10, 24, 7, 0)),
            Some(utc(2026, 10, 25, 7, 0))
        );
        assert_eq!(
            schedule.next_fire_after(utc(2026, 11, 2, 12, 0)),
            Some(utc(2026, 11, 3, 7, 0))
        );
    }

    #[test]
    fn test_consecutive_fires_stay_at_local_time() {
        let schedule = DigestSchedule::new(8, 0, Berlin).unwrap();
        let mut previous = schedule.next_fire_after(utc(2026, 7, 1, 0, 0)).unwrap();

        // Runs through the October and March clock changes.
        for _ in 0..300 {
            let next = schedule.next_fire_after(previous).unwrap();
            let local = next.with_timezone(&Berlin);
            assert_eq!((local.hour(), local.minute()), (8, 0), "fired at {}", local);
            assert_eq!(
                local.date_naive(),
                previous.with_timezone(&Berlin).date_naive().succ_opt().unwrap()
            );
            previous = next;
        }
    }

    #[test]
    fn test_skipped_and_repeated_local_times() {
        // 02:30 does not exist on 2027-03-28 in Berlin; it fires at 03:30 CEST.
        let schedule = DigestSchedule::new(2, 30, Berlin).unwrap();
        assert_eq!(
            schedule.next_fire_after(utc(2027, 3, 27, 12, 0)),
            Some(utc(2027, 3, 28, 1, 30))
        );

        // 02:30 happens twice on 2026-10-25; the first one wins.
        assert_eq!(
            schedule.next_fire_after(utc(2026, 10, 24, 12, 0)),
            Some(utc(2026, 10, 25, 0, 30))
        );
    }

    #[tokio::test]
    async fn test_registering_twice_keeps_one_job() {
        let trigger = DailyTrigger::with_clock(fixed_clock(utc(2026, 10, 24, 10, 0)))
            .await
            .unwrap();
        let schedule = DigestSchedule::new(8, 0, Berlin).unwrap();

        let first = trigger.register(&schedule, dispatcher()).await.unwrap();
        let second = trigger.register(&schedule, dispatcher()).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(trigger.registered_jobs().await, 1);
        assert_eq!(trigger.job_id().await, Some(second));
        let stale = trigger.inner.scheduler.clone().next_tick_for_job(first).await;
        assert!(!matches!(stale, Ok(Some(_))));
    }

    #[tokio::test]
    async fn test_next_fire_uses_offset_of_firing_day() {
        let trigger = DailyTrigger::with_clock(fixed_clock(utc(2026, 10, 24, 10, 0)))
            .await
            .unwrap();
        assert_eq!(trigger.next_fire().await, None);

        let schedule = DigestSchedule::new(8, 0, Berlin).unwrap();
        trigger.register(&schedule, dispatcher()).await.unwrap();

        assert_eq!(trigger.next_fire().await, Some(utc(2026, 10, 25, 7, 0)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fired_job_is_replaced_by_next_day() {
        let calls = Arc::new(AtomicUsize::new(0));
        let clock: Clock = {
            let calls = calls.clone();
            Arc::new(move || {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    utc(2026, 10, 16, 7, 59) + Duration::seconds(59)
                } else {
                    utc(2026, 10, 16, 8, 0) + Duration::seconds(30)
                }
            })
        };

        let alice = user("alice");
        let store = Arc::new(InMemoryStore::new(vec![alice.clone()]));
        store.add_task(task(&alice, "Standup", TaskPriority::High, TaskStatus::Pending, Some(Utc::now().date_naive())));
        let mailer = Arc::new(RecordingMailer::default());

        let trigger = DailyTrigger::with_clock(clock).await.unwrap();
        let schedule = DigestSchedule::new(8, 0, Tz::UTC).unwrap();
        let first = trigger
            .register(&schedule, dispatcher_with(store, mailer.clone()))
            .await
            .unwrap();
        assert_eq!(trigger.next_fire().await, Some(utc(2026, 10, 16, 8, 0)));

        trigger.start().await.unwrap();
        for _ in 0..100 {
            if trigger.next_fire().await == Some(utc(2026, 10, 17, 8, 0)) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }

        assert_eq!(trigger.next_fire().await, Some(utc(2026, 10, 17, 8, 0)));
        assert_ne!(trigger.job_id().await, Some(first));
        assert_eq!(trigger.registered_jobs().await, 1);
        assert_eq!(mailer.recipients(), vec![alice.email]);
        trigger.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let trigger = DailyTrigger::new().await.unwrap();
        assert_eq!(trigger.state().await, TriggerState::Uninitialized);

        trigger.start().await.unwrap();
        trigger.start().await.unwrap();
        assert_eq!(trigger.state().await, TriggerState::Running);

        trigger.stop().await.unwrap();
        trigger.stop().await.unwrap();
        assert_eq!(trigger.state().await, TriggerState::Stopped);
    }

    #[tokio::test]
    async fn test_stopped_trigger_rejects_registration() {
        let trigger = DailyTrigger::new().await.unwrap();
        trigger.stop().await.unwrap();

        let schedule = DigestSchedule::new(8, 0, Tz::UTC).unwrap();
        assert!(matches!(
            trigger.register(&schedule, dispatcher()).await,
            Err(TriggerError::Stopped)
        ));
        assert!(matches!(trigger.start().await, Err(TriggerError::Stopped)));
    }
}
