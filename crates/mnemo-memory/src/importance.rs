//! Heuristic importance scoring for candidate memories.

use std::sync::LazyLock;

use regex::Regex;

/// Upper bound of the importance scale.
pub const MAX_SCORE: u8 = 10;

const INSTRUCTION_CUES: &[&str] = &[
    "set", "turn on", "turn off", "switch", "adjust", "control", "change", "start", "stop",
    "enable", "disable", "schedule",
];

const DEVICE_CUES: &[&str] = &[
    "light",
    "lamp",
    "thermostat",
    "air conditioner",
    "heater",
    "curtain",
    "blinds",
    "television",
    "speaker",
    "temperature",
    "humidity",
    "device",
    "scene",
    "alarm",
];

const EMOTION_CUES: &[&str] = &[
    "love",
    "like",
    "hate",
    "dislike",
    "prefer",
    "favorite",
    "hope",
    "wish",
    "happy",
    "annoyed",
    "satisfied",
    "frustrated",
];

static NUMERIC_OR_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d|\b(morning|afternoon|evening|night|noon|midnight|tonight)\b").unwrap()
});

/// Score how worth remembering `text` is, on a 1..=10 scale.
///
/// Base score 1; each matching category adds its bonus once, no matter how
/// many of its cues match: +2 for an instruction/action cue, +1 for a numeric
/// or time expression, +1 for a device or scene keyword, +1 for an emotional
/// cue. Pure function of the text and the fixed rule tables.
#[must_use]
pub fn score(text: &str) -> u8 {
    let lower = text.to_lowercase();
    let mut score: u8 = 1;

    if INSTRUCTION_CUES.iter().any(|cue| lower.contains(cue)) {
        score += 2;
    }
    if NUMERIC_OR_TIME.is_match(&lower) {
        score += 1;
    }
    if DEVICE_CUES.iter().any(|cue| lower.contains(cue)) {
        score += 1;
    }
    if EMOTION_CUES.iter().any(|cue| lower.contains(cue)) {
        score += 1;
    }

    score.min(MAX_SCORE)
}
