pub mod app;
pub mod config;
pub mod haptics;
pub mod presenter;

pub use app::Face;
pub use config::{Config, HapticsConfig, PortConfig};
pub use haptics::{FeedbackPattern, HapticError, HapticOutput, LogHaptics, NoHaptics};
pub use presenter::{Color, FaceState, Icons, Presenter, Ring};
