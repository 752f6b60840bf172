use std::env;

use serde::Serialize;

/// Pomodoro timer lengths, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FocusSettings {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub cycles_before_long_break: u32,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            cycles_before_long_break: 4,
        }
    }
}

impl FocusSettings {
    /// Break length after completing the `completed`-th work interval.
    #[must_use]
    pub fn break_after(&self, completed: u32) -> u32 {
        if self.cycles_before_long_break > 0
            && completed > 0
            && completed % self.cycles_before_long_break == 0
        {
            self.long_break_minutes
        } else {
            self.short_break_minutes
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub revision_reminder_days: u32,
    pub focus: FocusSettings,
    pub admin_username: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            revision_reminder_days: 7,
            focus: FocusSettings::default(),
            admin_username: "admin".to_owned(),
        }
    }
}

impl TrackerConfig {
    /// Defaults overridden by `TRACKER_*` environment variables.
    ///
    /// Unparseable or zero numeric values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let positive = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|v| *v > 0)
        };

        let revision_reminder_days = positive("TRACKER_REVISION_REMINDER_DAYS")
            .unwrap_or(defaults.revision_reminder_days);
        let work_minutes =
            positive("TRACKER_FOCUS_MINUTES").unwrap_or(defaults.focus.work_minutes);
        let admin_username = lookup("TRACKER_ADMIN_USERNAME")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.admin_username);

        Self {
            revision_reminder_days,
            focus: FocusSettings {
                work_minutes,
                ..defaults.focus
            },
            admin_username,
        }
    }
}
