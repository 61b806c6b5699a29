use std::str::FromStr;

use super::{Bundle, field};
use crate::{ActiveCombination, FeedbackStatus, VisualStyle};

/// Result of decoding a bundle.
///
/// `status` is always usable. `fallbacks` names every field that was missing
/// or unparseable and therefore holds its sentinel value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub status: FeedbackStatus,
    pub fallbacks: Vec<&'static str>,
}

impl Decoded {
    pub fn is_clean(&self) -> bool {
        self.fallbacks.is_empty()
    }
}

/// Parse a boolean the way the peer writes it: `True`/`False`, any case,
/// surrounding whitespace ignored.
pub fn parse_flag(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn flag_str(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

impl FeedbackStatus {
    /// Serialize each component into its own named field.
    pub fn encode(&self) -> Bundle {
        Bundle::new()
            .with(field::COLOR, self.combination.as_str())
            .with(field::VISUAL, self.visual_style.as_str())
            .with(field::VIBRATION, flag_str(self.vibration_enabled))
            .with(field::SOUND, flag_str(self.sound_enabled))
    }

    /// Parse every field independently. Never fails.
    pub fn decode(bundle: &Bundle) -> Decoded {
        let mut fallbacks = Vec::new();

        let combination = parse_field(bundle, field::COLOR, &mut fallbacks, |raw| {
            ActiveCombination::from_str(raw).ok()
        })
        .unwrap_or(ActiveCombination::Error);

        let visual_style = parse_field(bundle, field::VISUAL, &mut fallbacks, |raw| {
            VisualStyle::from_str(raw).ok()
        })
        .unwrap_or(VisualStyle::Error);

        let vibration_enabled =
            parse_field(bundle, field::VIBRATION, &mut fallbacks, parse_flag).unwrap_or(false);
        let sound_enabled =
            parse_field(bundle, field::SOUND, &mut fallbacks, parse_flag).unwrap_or(false);

        Decoded {
            status: FeedbackStatus {
                combination,
                visual_style,
                vibration_enabled,
                sound_enabled,
            },
            fallbacks,
        }
    }
}

fn parse_field<T>(
    bundle: &Bundle,
    name: &'static str,
    fallbacks: &mut Vec<&'static str>,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    let value = bundle.get(name).and_then(parse);
    if value.is_none() {
        fallbacks.push(name);
    }
    value
}
