//! In-game clock and cadences.
//!
//! Game time is written `HHMM` and runs from 06:00 to 26:00 (2 a.m. the
//! next morning) in ten-minute steps. Passing 26:00 starts a new day.
//!
//! # Design Principles
//!
//! - All day arithmetic is checked; the day counter never wraps.
//! - Cadences are derived from minutes since midnight, so an hourly cadence
//!   fires on the hour regardless of when the clock started.

use crate::config::TimeConfig;

/// First time of a day.
pub const DAY_START: u16 = 600;

/// Last time of a day.
pub const DAY_END: u16 = 2600;

/// Minutes per clock step.
const STEP_MINUTES: u16 = 10;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClockError {
    /// Day counter would overflow.
    #[error("day counter overflow")]
    DayOverflow,

    /// A time value is not a valid ten-minute step inside a day.
    #[error("invalid game time {0}")]
    InvalidTime(u16),

    /// Invalid clock configuration.
    #[error("invalid time configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// A time of day, `HHMM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameTime(u16);

impl GameTime {
    /// The first time of a day.
    pub const START: Self = Self(DAY_START);

    /// Validate an `HHMM` value.
    pub const fn new(hhmm: u16) -> Result<Self, ClockError> {
        let minutes = hhmm % 100;
        if hhmm < DAY_START || hhmm > DAY_END || minutes >= 60 || minutes % STEP_MINUTES != 0 {
            return Err(ClockError::InvalidTime(hhmm));
        }
        Ok(Self(hhmm))
    }

    /// The raw `HHMM` value.
    pub const fn hhmm(self) -> u16 {
        self.0
    }

    /// Minutes since midnight (may exceed 24h after midnight).
    pub fn minutes_of_day(self) -> u32 {
        let hours = u32::from(self.0 / 100);
        let minutes = u32::from(self.0 % 100);
        hours.saturating_mul(60).saturating_add(minutes)
    }

    /// The next ten-minute step, or `None` past the end of the day.
    pub const fn next(self) -> Option<Self> {
        let mut hhmm = self.0.saturating_add(STEP_MINUTES);
        if hhmm % 100 >= 60 {
            hhmm = hhmm.saturating_add(40);
        }
        if hhmm > DAY_END { None } else { Some(Self(hhmm)) }
    }

    /// Whether a cadence of `every_minutes` fires at this time.
    pub fn is_on_cadence(self, every_minutes: u32) -> bool {
        self.minutes_of_day()
            .checked_rem(every_minutes)
            .is_some_and(|rest| rest == 0)
    }
}

impl std::fmt::Display for GameTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Something the clock reports while advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// The time moved one step forward.
    TimeChanged(GameTime),
    /// A new day started at [`GameTime::START`].
    DayStarted(u32),
}

/// Real-time driven game clock.
#[derive(Debug, Clone, PartialEq)]
pub struct GameClock {
    /// Current day, starting at 1.
    day: u32,

    /// Current time of day.
    time: GameTime,

    /// Real seconds per ten-minute step.
    seconds_per_step: f64,

    /// Real seconds accumulated towards the next step.
    accumulated: f64,
}

impl GameClock {
    /// A clock at day 1, 06:00.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if the step duration is not a
    /// positive finite number.
    pub fn new(config: &TimeConfig) -> Result<Self, ClockError> {
        Self::from_parts(1, GameTime::START, config.seconds_per_ten_minutes)
    }

    /// A clock from explicit parts (tests and restoration).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if the step duration is not a
    /// positive finite number.
    pub fn from_parts(day: u32, time: GameTime, seconds_per_step: f64) -> Result<Self, ClockError> {
        if !seconds_per_step.is_finite() || seconds_per_step <= 0.0 {
            return Err(ClockError::InvalidConfig {
                reason: format!("seconds_per_ten_minutes must be positive, got {seconds_per_step}"),
            });
        }
        Ok(Self {
            day,
            time,
            seconds_per_step,
            accumulated: 0.0,
        })
    }

    /// Current day.
    pub const fn day(&self) -> u32 {
        self.day
    }

    /// Current time of day.
    pub const fn time(&self) -> GameTime {
        self.time
    }

    /// Advance by `dt` real seconds. Reports at most one event per call.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::DayOverflow`] if the day counter would wrap.
    pub fn advance(&mut self, dt: f64) -> Result<Option<ClockEvent>, ClockError> {
        self.accumulated += dt;
        if self.accumulated < self.seconds_per_step {
            return Ok(None);
        }
        self.accumulated -= self.seconds_per_step;
        if let Some(next) = self.time.next() {
            self.time = next;
            return Ok(Some(ClockEvent::TimeChanged(next)));
        }
        self.day = self.day.checked_add(1).ok_or(ClockError::DayOverflow)?;
        self.time = GameTime::START;
        Ok(Some(ClockEvent::DayStarted(self.day)))
    }
}
