use std::fmt;

use feedback_core::{ActiveCombination, FeedbackStatus, SensorKind, VisualStyle};
use jiff::Timestamp;
use tracing::{debug, info, warn};

use crate::haptics::{FeedbackPattern, HapticError, HapticOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color { r: 0xff, g: 0, b: 0 };
    pub const YELLOW: Color = Color { r: 0xff, g: 0xff, b: 0 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 0xff };

    pub fn for_kind(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Health => Color::RED,
            SensorKind::Location => Color::YELLOW,
            SensorKind::Activity => Color::BLUE,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Coloured ring around the dial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    pub bar: Color,
    pub background: Color,
    /// Fraction of the ring covered by `bar`.
    pub value: f64,
}

impl Ring {
    /// One colour for a single kind; for a pair the bar takes the first
    /// kind's colour over half the ring and the second fills the rest.
    pub fn for_kinds(kinds: &[SensorKind]) -> Option<Self> {
        match kinds {
            [kind] => Some(Ring {
                bar: Color::for_kind(*kind),
                background: Color::for_kind(*kind),
                value: 1.0,
            }),
            [first, second] => Some(Ring {
                bar: Color::for_kind(*first),
                background: Color::for_kind(*second),
                value: 0.5,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Icons {
    pub health: bool,
    pub location: bool,
    pub activity: bool,
}

impl Icons {
    pub fn for_kinds(kinds: &[SensorKind]) -> Self {
        Self {
            health: kinds.contains(&SensorKind::Health),
            location: kinds.contains(&SensorKind::Location),
            activity: kinds.contains(&SensorKind::Activity),
        }
    }

    pub fn any(&self) -> bool {
        self.health || self.location || self.activity
    }
}

/// Everything the watch face currently shows. At most one of ring, icons
/// and notification is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceState {
    pub ring: Option<Ring>,
    pub icons: Icons,
    pub notification: Option<String>,
    pub last_haptic: Option<FeedbackPattern>,
    pub last_update: Option<Timestamp>,
}

impl FaceState {
    pub fn is_blank(&self) -> bool {
        self.ring.is_none() && !self.icons.any() && self.notification.is_none()
    }
}

fn notification_text(kinds: &[SensorKind]) -> String {
    let names: Vec<&str> = kinds.iter().map(|kind| kind.as_str()).collect();
    format!("Sensing {}", names.join(" and "))
}

/// Turns received statuses into watch-face output.
pub struct Presenter {
    state: FaceState,
    /// Style used when a status carries none.
    style: VisualStyle,
    haptics: Option<Box<dyn HapticOutput>>,
}

impl Presenter {
    pub fn new(haptics: Option<Box<dyn HapticOutput>>) -> Self {
        Self {
            state: FaceState::default(),
            style: VisualStyle::default(),
            haptics,
        }
    }

    pub fn state(&self) -> &FaceState {
        &self.state
    }

    pub fn haptics_enabled(&self) -> bool {
        self.haptics.is_some()
    }

    /// Apply `status`. Returns false if it was ignored.
    pub fn apply(&mut self, status: &FeedbackStatus) -> bool {
        if status.combination == ActiveCombination::Error {
            debug!(?status, "Ignoring status without a valid combination");
            return false;
        }

        if status.visual_style != VisualStyle::Error {
            self.style = status.visual_style;
        }

        let kinds = status.combination.kinds();
        let mut next = FaceState {
            last_haptic: None,
            last_update: Some(Timestamp::now()),
            ..FaceState::default()
        };

        if !kinds.is_empty() {
            match self.style {
                VisualStyle::Ring | VisualStyle::Error => next.ring = Ring::for_kinds(kinds),
                VisualStyle::Icon => next.icons = Icons::for_kinds(kinds),
                VisualStyle::Notification => next.notification = Some(notification_text(kinds)),
            }

            if let Some(pattern) =
                FeedbackPattern::from_flags(status.vibration_enabled, status.sound_enabled)
            {
                next.last_haptic = self.play(pattern).then_some(pattern);
            }
        }

        info!(
            combination = %status.combination,
            style = %self.style,
            ring = ?next.ring.map(|r| (r.bar.to_string(), r.background.to_string())),
            notification = next.notification.as_deref(),
            haptic = ?next.last_haptic,
            "Face updated"
        );
        self.state = next;
        true
    }

    fn play(&mut self, pattern: FeedbackPattern) -> bool {
        let Some(haptics) = self.haptics.as_mut() else {
            return false;
        };

        match haptics.play(pattern) {
            Ok(()) => true,
            Err(HapticError::Unsupported) => {
                warn!("Haptic output unsupported, disabling");
                self.haptics = None;
                false
            }
            Err(e) => {
                warn!(error = %e, %pattern, "Haptic feedback failed");
                false
            }
        }
    }
}
