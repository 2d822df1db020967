use crate::domain::model::Event;
use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::time::Duration;
use tokio::sync::mpsc;

/// A fixed weekday and wall-clock time in a named time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    weekday: Weekday,
    time: NaiveTime,
    tz: Tz,
}

impl WeeklySchedule {
    pub fn new(weekday: Weekday, time: NaiveTime, tz: Tz) -> Self {
        Self { weekday, time, tz }
    }

    /// First scheduled instant strictly after `after`.
    pub fn next_fire(&self, after: DateTime<Utc>) -> DateTime<Tz> {
        let local = after.with_timezone(&self.tz);
        let mut date = local.date_naive();

        loop {
            if date.weekday() == self.weekday {
                if let Some(candidate) = self.resolve(date.and_time(self.time)) {
                    if candidate > local {
                        return candidate;
                    }
                }
            }
            date += chrono::Duration::days(1);
        }
    }

    // 夏令時間跳過的時刻往後挪一小時
    fn resolve(&self, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(naive + chrono::Duration::hours(1)))
                    .earliest()
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Weekly(WeeklySchedule),
    Every(Duration),
}

/// Emits `Event::Tick` on the configured cadence until the receiver is dropped.
pub struct Scheduler {
    cadence: Cadence,
}

impl Scheduler {
    pub fn new(cadence: Cadence) -> Self {
        Self { cadence }
    }

    pub async fn run(self, events: mpsc::Sender<Event>) {
        match self.cadence {
            Cadence::Weekly(schedule) => {
                let mut after = Utc::now();
                loop {
                    let next = schedule.next_fire(after);
                    let wait = (next.with_timezone(&Utc) - Utc::now())
                        .to_std()
                        .unwrap_or(Duration::ZERO);
                    tracing::info!("⏰ Next round scheduled for {}", next);

                    tokio::time::sleep(wait).await;
                    if events.send(Event::Tick).await.is_err() {
                        break;
                    }
                    // 從上一次觸發時間往後算，避免時鐘誤差造成重複 tick
                    after = next.with_timezone(&Utc);
                }
            }
            Cadence::Every(period) => {
                tracing::warn!("🔧 Debug cadence: ticking every {:?}", period);
                let mut interval = tokio::time::interval(period);
                // 第一次 tick 會立即完成，略過
                interval.tick().await;
                loop {
                    interval.tick().await;
                    if events.send(Event::Tick).await.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Scheduler stopped");
    }
}
