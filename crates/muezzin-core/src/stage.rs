//! Notification stage evaluation
//!
//! A prayer has three notification opportunities, each a window on the
//! prayer-relative delta produced by [`crate::time::resolve`]. The windows are
//! disjoint, so at most one stage can be due for a user and prayer at a time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::types::{CompletionStatus, NotificationSetting, PrayerName, Stage};

/// Widest window allowed by validation, in minutes
pub const MAX_WINDOW_WIDTH: f64 = 1.5;

/// Inclusive bounds on the delta, in minutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start: f64,
    pub end: f64,
}

impl Window {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, delta: f64) -> bool {
        delta >= self.start && delta <= self.end
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Window) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Whole minutes from the prayer time to the window's midpoint
    pub fn offset_minutes(&self) -> i64 {
        ((self.start + self.end) / 2.0).trunc() as i64
    }
}

/// Firing windows for the three stages
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageWindows {
    pub pre_reminder: Window,
    pub at_time: Window,
    pub delay_reminder: Window,
}

impl Default for StageWindows {
    fn default() -> Self {
        Self {
            pre_reminder: Window::new(-5.5, -4.5),
            at_time: Window::new(0.0, 1.0),
            delay_reminder: Window::new(30.0, 31.0),
        }
    }
}

impl StageWindows {
    pub fn window(&self, stage: Stage) -> Window {
        match stage {
            Stage::PreReminder => self.pre_reminder,
            Stage::AtTime => self.at_time,
            Stage::DelayReminder => self.delay_reminder,
        }
    }

    /// The stage whose window contains `delta`, if any
    pub fn stage_for(&self, delta: f64) -> Option<Stage> {
        Stage::ALL
            .into_iter()
            .find(|stage| self.window(*stage).contains(delta))
    }

    /// Check bounds are ordered, narrow, and pairwise disjoint
    pub fn validate(&self) -> Result<()> {
        for stage in Stage::ALL {
            let w = self.window(stage);
            if !w.start.is_finite() || !w.end.is_finite() || w.start > w.end {
                return Err(Error::config(format!(
                    "Window for {} must satisfy start <= end (got {}..{})",
                    stage, w.start, w.end
                )));
            }
            if w.width() > MAX_WINDOW_WIDTH {
                return Err(Error::config(format!(
                    "Window for {} is {} minutes wide, at most {} allowed",
                    stage,
                    w.width(),
                    MAX_WINDOW_WIDTH
                )));
            }
        }

        for (i, a) in Stage::ALL.iter().enumerate() {
            for b in &Stage::ALL[i + 1..] {
                if self.window(*a).overlaps(&self.window(*b)) {
                    return Err(Error::config(format!(
                        "Windows for {} and {} overlap",
                        a, b
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Stages already dispatched today for one user and prayer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentStages(BTreeSet<Stage>);

impl SentStages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.0.contains(&stage)
    }

    pub fn insert(&mut self, stage: Stage) {
        self.0.insert(stage);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Stage> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Stage> for SentStages {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Everything the evaluator looks at for one user and prayer
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    pub prayer: PrayerName,
    pub setting: NotificationSetting,
    pub delta: f64,
    pub completion: CompletionStatus,
    pub sent_today: &'a SentStages,
}

/// A stage that should be dispatched now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueStage {
    pub stage: Stage,
    /// Request the adhan sound asset (at-time stage only)
    pub adhan: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    NotDue,
    Due(DueStage),
}

impl Evaluation {
    pub fn due(&self) -> Option<DueStage> {
        match self {
            Evaluation::Due(due) => Some(*due),
            Evaluation::NotDue => None,
        }
    }
}

/// Decide which stage, if any, is due for this input
pub fn evaluate(windows: &StageWindows, input: &StageInput<'_>) -> Evaluation {
    if input.setting.is_off() {
        return Evaluation::NotDue;
    }

    let Some(stage) = windows.stage_for(input.delta) else {
        return Evaluation::NotDue;
    };

    if input.sent_today.contains(stage) {
        return Evaluation::NotDue;
    }

    let eligible = match stage {
        Stage::PreReminder => input.prayer.is_obligatory(),
        Stage::AtTime => !input.completion.is_settled(),
        Stage::DelayReminder => input.prayer.is_obligatory() && !input.completion.is_settled(),
    };
    if !eligible {
        return Evaluation::NotDue;
    }

    Evaluation::Due(DueStage {
        stage,
        adhan: stage == Stage::AtTime && input.setting == NotificationSetting::Adhan,
    })
}

/// Visible text of a prayer notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrayerMessage {
    pub title: String,
    pub body: String,
}

impl PrayerMessage {
    pub fn for_stage(stage: Stage, prayer: PrayerName, windows: &StageWindows) -> Self {
        let name = prayer.display_name();
        match stage {
            Stage::PreReminder => {
                let lead = -windows.pre_reminder.offset_minutes();
                Self {
                    title: format!("{} in {} minutes", name, lead),
                    body: format!("Get ready, {} begins in {} minutes.", name, lead),
                }
            }
            Stage::AtTime if prayer == PrayerName::Sunrise => Self {
                title: "Sunrise".to_string(),
                body: "The sun is rising. The time for Fajr has ended.".to_string(),
            },
            Stage::AtTime => Self {
                title: format!("It's time for {}", name),
                body: format!("The time for {} has begun.", name),
            },
            Stage::DelayReminder => {
                let late = windows.delay_reminder.offset_minutes();
                Self {
                    title: format!("Have you prayed {}?", name),
                    body: format!(
                        "{} began {} minutes ago. Mark it as prayed once you're done.",
                        name, late
                    ),
                }
            }
        }
    }
}
