mod bundle;
mod feedback;

pub use bundle::Bundle;
pub use feedback::{Decoded, parse_flag};

/// Names of the fields carried in a feedback bundle.
pub mod field {
    pub const COLOR: &str = "colorFeedback";
    pub const VISUAL: &str = "visualFeedback";
    pub const VIBRATION: &str = "vibrationFeedback";
    pub const SOUND: &str = "soundFeedback";

    pub const ALL: [&str; 4] = [COLOR, VISUAL, VIBRATION, SOUND];
}
