pub mod protocol;

pub use protocol::{Bundle, Decoded, field};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of sensor kinds known to the system.
pub const TOTAL_KINDS: usize = 3;

/// Upper bound on concurrently active kinds.
pub const MAX_ACTIVE: usize = TOTAL_KINDS - 1;

/// A capability that can be switched on and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    /// Heart-rate monitor.
    Health,
    /// Location provider.
    Location,
    /// Pedometer. Reserved: there is no backing sensor, only bookkeeping.
    Activity,
}

impl SensorKind {
    pub const ALL: [SensorKind; TOTAL_KINDS] =
        [SensorKind::Health, SensorKind::Location, SensorKind::Activity];

    const fn index(self) -> usize {
        match self {
            SensorKind::Health => 0,
            SensorKind::Location => 1,
            SensorKind::Activity => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SensorKind::Health => "health",
            SensorKind::Location => "location",
            SensorKind::Activity => "activity",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant(s.into()))
    }
}

/// Returned when a string does not name any variant of an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub Box<str>);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Which kinds are currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ServiceState {
    active: [bool; TOTAL_KINDS],
}

impl ServiceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: SensorKind) -> Self {
        self.set(kind, true);
        self
    }

    pub fn is_active(&self, kind: SensorKind) -> bool {
        self.active[kind.index()]
    }

    pub fn set(&mut self, kind: SensorKind, active: bool) {
        self.active[kind.index()] = active;
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|a| **a).count()
    }

    pub fn active_kinds(&self) -> impl Iterator<Item = SensorKind> + '_ {
        SensorKind::ALL
            .into_iter()
            .filter(|kind| self.is_active(*kind))
    }

    pub fn inactive_kinds(&self) -> impl Iterator<Item = SensorKind> + '_ {
        SensorKind::ALL
            .into_iter()
            .filter(|kind| !self.is_active(*kind))
    }
}

/// The set of active kinds as carried on the wire.
///
/// There is no variant for all three kinds at once; the registry never lets
/// more than [`MAX_ACTIVE`] kinds run, and the encoder reports that state as
/// [`ActiveCombination::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActiveCombination {
    NoFeedback,
    Health,
    Location,
    Activity,
    HealthAndLocation,
    HealthAndActivity,
    LocationAndActivity,
    /// Sentinel for an unparseable or impossible combination.
    Error,
}

impl ActiveCombination {
    pub const ALL: [ActiveCombination; 8] = [
        ActiveCombination::NoFeedback,
        ActiveCombination::Health,
        ActiveCombination::Location,
        ActiveCombination::Activity,
        ActiveCombination::HealthAndLocation,
        ActiveCombination::HealthAndActivity,
        ActiveCombination::LocationAndActivity,
        ActiveCombination::Error,
    ];

    /// Case analysis over the active kinds.
    ///
    /// With two kinds active, the inactive one identifies the pair.
    pub fn from_state(state: &ServiceState) -> Self {
        match state.active_count() {
            0 => ActiveCombination::NoFeedback,
            1 => match state.active_kinds().next() {
                Some(SensorKind::Health) => ActiveCombination::Health,
                Some(SensorKind::Location) => ActiveCombination::Location,
                Some(SensorKind::Activity) => ActiveCombination::Activity,
                None => ActiveCombination::Error,
            },
            2 => match state.inactive_kinds().next() {
                Some(SensorKind::Health) => ActiveCombination::LocationAndActivity,
                Some(SensorKind::Location) => ActiveCombination::HealthAndActivity,
                Some(SensorKind::Activity) => ActiveCombination::HealthAndLocation,
                None => ActiveCombination::Error,
            },
            _ => ActiveCombination::Error,
        }
    }

    /// Kinds represented by this combination. Empty for the sentinels.
    pub fn kinds(self) -> &'static [SensorKind] {
        use SensorKind::*;
        match self {
            ActiveCombination::NoFeedback | ActiveCombination::Error => &[],
            ActiveCombination::Health => &[Health],
            ActiveCombination::Location => &[Location],
            ActiveCombination::Activity => &[Activity],
            ActiveCombination::HealthAndLocation => &[Health, Location],
            ActiveCombination::HealthAndActivity => &[Health, Activity],
            ActiveCombination::LocationAndActivity => &[Location, Activity],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActiveCombination::NoFeedback => "NoFeedback",
            ActiveCombination::Health => "Health",
            ActiveCombination::Location => "Location",
            ActiveCombination::Activity => "Activity",
            ActiveCombination::HealthAndLocation => "HealthAndLocation",
            ActiveCombination::HealthAndActivity => "HealthAndActivity",
            ActiveCombination::LocationAndActivity => "LocationAndActivity",
            ActiveCombination::Error => "Error",
        }
    }
}

impl fmt::Display for ActiveCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActiveCombination {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActiveCombination::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.into()))
    }
}

/// How the watch face presents feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VisualStyle {
    #[default]
    Ring,
    Icon,
    Notification,
    /// Sentinel for an unparseable style.
    Error,
}

impl VisualStyle {
    pub const SELECTABLE: [VisualStyle; 3] =
        [VisualStyle::Ring, VisualStyle::Icon, VisualStyle::Notification];

    /// Ordinal as persisted in the settings store.
    pub fn ordinal(self) -> i64 {
        match self {
            VisualStyle::Ring => 0,
            VisualStyle::Icon => 1,
            VisualStyle::Notification => 2,
            VisualStyle::Error => -1,
        }
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        VisualStyle::SELECTABLE
            .into_iter()
            .find(|style| style.ordinal() == ordinal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VisualStyle::Ring => "Ring",
            VisualStyle::Icon => "Icon",
            VisualStyle::Notification => "Notification",
            VisualStyle::Error => "Error",
        }
    }
}

impl fmt::Display for VisualStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisualStyle {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VisualStyle::SELECTABLE
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant(s.into()))
    }
}

/// Persisted user choices that ride along with every status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    pub vibration_enabled: bool,
    pub sound_enabled: bool,
    pub visual_style: VisualStyle,
}

/// Snapshot relayed to the watch face. Rebuilt on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackStatus {
    pub combination: ActiveCombination,
    pub visual_style: VisualStyle,
    pub vibration_enabled: bool,
    pub sound_enabled: bool,
}

impl FeedbackStatus {
    pub fn new(state: &ServiceState, preferences: &UserPreferences) -> Self {
        Self {
            combination: ActiveCombination::from_state(state),
            visual_style: preferences.visual_style,
            vibration_enabled: preferences.vibration_enabled,
            sound_enabled: preferences.sound_enabled,
        }
    }

    /// Status with nothing active, used when sensing shuts down.
    pub fn idle(preferences: &UserPreferences) -> Self {
        Self::new(&ServiceState::new(), preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_active_kind_maps_to_itself() {
        let state = ServiceState::new().with(SensorKind::Health);
        assert_eq!(
            ActiveCombination::from_state(&state),
            ActiveCombination::Health
        );

        let state = ServiceState::new().with(SensorKind::Activity);
        assert_eq!(
            ActiveCombination::from_state(&state),
            ActiveCombination::Activity
        );
    }

    #[test]
    fn pair_is_identified_by_the_inactive_kind() {
        let state = ServiceState::new()
            .with(SensorKind::Health)
            .with(SensorKind::Location);
        assert_eq!(
            ActiveCombination::from_state(&state),
            ActiveCombination::HealthAndLocation
        );

        let state = ServiceState::new()
            .with(SensorKind::Location)
            .with(SensorKind::Activity);
        assert_eq!(
            ActiveCombination::from_state(&state),
            ActiveCombination::LocationAndActivity
        );
    }

    #[test]
    fn all_three_active_is_an_error() {
        let state = SensorKind::ALL
            .into_iter()
            .fold(ServiceState::new(), ServiceState::with);
        assert_eq!(
            ActiveCombination::from_state(&state),
            ActiveCombination::Error
        );
    }

    #[test]
    fn combination_kinds_agree_with_from_state() {
        for combination in ActiveCombination::ALL {
            if combination == ActiveCombination::Error {
                continue;
            }
            let state = combination
                .kinds()
                .iter()
                .copied()
                .fold(ServiceState::new(), ServiceState::with);
            assert_eq!(ActiveCombination::from_state(&state), combination);
        }
    }

    #[test]
    fn visual_style_ordinals() {
        for style in VisualStyle::SELECTABLE {
            assert_eq!(VisualStyle::from_ordinal(style.ordinal()), Some(style));
        }
        assert_eq!(VisualStyle::from_ordinal(7), None);
        assert_eq!(VisualStyle::from_ordinal(-1), None);
    }

    #[test]
    fn sensor_kind_parses_case_insensitively() {
        assert_eq!("Health".parse::<SensorKind>(), Ok(SensorKind::Health));
        assert_eq!(" location ".parse::<SensorKind>(), Ok(SensorKind::Location));
        assert!("heart".parse::<SensorKind>().is_err());
    }
}
