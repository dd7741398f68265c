//! Process-wide clock, real or simulated.
//!
//! Everything that asks "what time is it" or waits for the next tick goes
//! through this module so `tiltr simulate` can run a day of schedule in seconds.

use std::sync::{Arc, Mutex};
use std::time::{Duration as StdDuration, Instant};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::OnceCell;

static TIME_SOURCE: OnceCell<Arc<dyn TimeSource>> = OnceCell::new();

pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Sleep for `duration` of this source's time.
    fn sleep(&self, duration: StdDuration);

    fn is_simulated(&self) -> bool;

    /// Simulated sources stop at their end time.
    fn is_ended(&self) -> bool {
        false
    }
}

pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: StdDuration) {
        std::thread::sleep(duration);
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Accelerated clock running from `start` to `end`.
///
/// A multiplier of 0 fast-forwards: every sleep jumps the clock immediately.
/// Otherwise one real second covers `multiplier` simulated seconds.
pub struct SimulatedTimeSource {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    multiplier: f64,
    state: Mutex<SimulatedClock>,
}

struct SimulatedClock {
    elapsed: StdDuration,
    sleeping: Option<(Instant, StdDuration)>,
}

impl SimulatedTimeSource {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, multiplier: f64) -> Self {
        Self {
            start,
            end,
            multiplier: if multiplier.is_finite() && multiplier >= 0.0 {
                multiplier
            } else {
                0.0
            },
            state: Mutex::new(SimulatedClock {
                elapsed: StdDuration::ZERO,
                sleeping: None,
            }),
        }
    }

    pub fn is_fast_forward(&self) -> bool {
        self.multiplier == 0.0
    }

    fn clock(&self) -> std::sync::MutexGuard<'_, SimulatedClock> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn at(&self, elapsed: StdDuration) -> DateTime<Utc> {
        let elapsed = ChronoDuration::from_std(elapsed).unwrap_or(ChronoDuration::MAX);
        self.start
            .checked_add_signed(elapsed)
            .map_or(self.end, |t| t.min(self.end))
    }

    fn remaining(&self, elapsed: StdDuration) -> StdDuration {
        (self.end - self.at(elapsed)).to_std().unwrap_or(StdDuration::ZERO)
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        let clock = self.clock();
        let mut elapsed = clock.elapsed;
        // Advance smoothly through an in-progress accelerated sleep.
        if let Some((started, length)) = clock.sleeping {
            let progressed = started.elapsed().mul_f64(self.multiplier);
            elapsed += progressed.min(length);
        }
        self.at(elapsed)
    }

    fn sleep(&self, duration: StdDuration) {
        let length = {
            let mut clock = self.clock();
            let length = duration.min(self.remaining(clock.elapsed));
            if self.is_fast_forward() {
                clock.elapsed += length;
                None
            } else {
                clock.sleeping = Some((Instant::now(), length));
                Some(length)
            }
        };

        match length {
            // Yield so log output keeps up.
            None => std::thread::sleep(StdDuration::from_millis(1)),
            Some(length) => {
                std::thread::sleep(length.div_f64(self.multiplier));
                let mut clock = self.clock();
                clock.sleeping = None;
                clock.elapsed += length;
            }
        }
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        self.now() >= self.end
    }
}

/// Install the global time source. Only the first call has an effect.
pub fn init_time_source(source: Arc<dyn TimeSource>) {
    TIME_SOURCE.set(source).ok();
}

pub fn is_initialized() -> bool {
    TIME_SOURCE.get().is_some()
}

fn source() -> &'static Arc<dyn TimeSource> {
    TIME_SOURCE.get_or_init(|| Arc::new(RealTimeSource))
}

/// Shared handle to the installed source, for threads that sleep on it.
pub fn current() -> Arc<dyn TimeSource> {
    Arc::clone(source())
}

pub fn now() -> DateTime<Utc> {
    source().now()
}

pub fn sleep(duration: StdDuration) {
    source().sleep(duration)
}

pub fn is_simulated() -> bool {
    source().is_simulated()
}

pub fn simulation_ended() -> bool {
    source().is_ended()
}

/// Parse `YYYY-MM-DD HH:MM[:SS]` as a wall-clock time in `tz` (host zone if `None`).
///
/// A bare `HH:MM[:SS]` means that time today, by the real clock.
pub fn parse_datetime(text: &str, tz: Option<Tz>) -> Result<DateTime<Utc>> {
    let naive = match NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M"))
    {
        Ok(naive) => naive,
        Err(e) => {
            let time = NaiveTime::parse_from_str(text, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
                .map_err(|_| {
                    anyhow!("invalid datetime '{text}': {e} (use YYYY-MM-DD HH:MM:SS or HH:MM)")
                })?;
            let today = match tz {
                Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
                None => chrono::Local::now().date_naive(),
            };
            today.and_time(time)
        }
    };

    let local = match tz {
        Some(tz) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc)),
        None => chrono::Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc)),
    };
    local.ok_or_else(|| anyhow!("'{text}' does not exist in the configured timezone"))
}
