use serde::{Deserialize, Serialize};

/// 12 non-negative pitch-class energies, index 0 = C … 11 = B.
pub type PitchClassVector = [f64; 12];

/// Timeline label for a frame with too little pitched energy to score.
pub const NO_KEY: &str = "---";

/// Global key label when no frame voted.
pub const UNKNOWN_KEY: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyMode {
    Major,
    Minor,
}

impl std::fmt::Display for KeyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMode::Major => write!(f, "Major"),
            KeyMode::Minor => write!(f, "Minor"),
        }
    }
}

/// The winning key of one frame.
///
/// `root` and `mode` are present whenever the frame was scored; a silent
/// frame carries only the `"---"` name and zero confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyLabel {
    pub name: String,
    /// Raw signed Pearson correlation; negative values are kept.
    #[serde(rename = "conf")]
    pub confidence: f64,
    #[serde(rename = "root_idx", default, skip_serializing_if = "Option::is_none")]
    pub root: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<KeyMode>,
}

impl KeyLabel {
    pub fn silent() -> Self {
        Self {
            name: NO_KEY.to_string(),
            confidence: 0.0,
            root: None,
            mode: None,
        }
    }

    pub fn key(&self) -> Option<(u8, KeyMode)> {
        Some((self.root?, self.mode?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyAlternate {
    pub name: String,
    #[serde(rename = "conf")]
    pub confidence: f64,
}

/// Key estimate at one sampled instant of the piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEstimate {
    /// Seconds from the start of the piece.
    pub time: f64,
    pub main: KeyLabel,
    /// Up to three runner-up keys, best first.
    #[serde(rename = "alts", default)]
    pub alternates: Vec<KeyAlternate>,
}

impl FrameEstimate {
    pub fn silent(time: f64) -> Self {
        Self {
            time,
            main: KeyLabel::silent(),
            alternates: Vec::new(),
        }
    }
}

/// Time-ordered, fixed-stride sequence of frame estimates.
pub type KeyTimeline = Vec<FrameEstimate>;

/// A sounding note as reported by the live front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteInput {
    pub pitch: u8,
    #[serde(default = "NoteInput::default_velocity")]
    pub velocity: u8,
}

impl NoteInput {
    pub fn new(pitch: u8) -> Self {
        Self {
            pitch,
            velocity: Self::default_velocity(),
        }
    }

    fn default_velocity() -> u8 {
        64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Suspended,
}

impl ChordQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChordQuality::Major => "major",
            ChordQuality::Minor => "minor",
            ChordQuality::Diminished => "diminished",
            ChordQuality::Augmented => "augmented",
            ChordQuality::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for ChordQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display-ready chord label for a live note set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordResult {
    pub root: String,
    pub quality: Option<ChordQuality>,
    /// Primary name, `"---"` when nothing was recognized, `"Error"` on internal failure.
    pub name: String,
    /// Every plausible name, primary first. Never empty.
    pub aliases: Vec<String>,
    /// Note names the chosen detection ran on.
    pub notes: Vec<String>,
    /// Quality string, or `"none"` / `"error"` for the terminal states.
    pub type_code: String,
    pub confidence: f64,
}

impl ChordResult {
    /// Fewer than two notes: nothing to name.
    pub fn insufficient() -> Self {
        Self {
            root: String::new(),
            quality: None,
            name: NO_KEY.to_string(),
            aliases: vec![UNKNOWN_KEY.to_string()],
            notes: Vec::new(),
            type_code: "none".to_string(),
            confidence: 0.0,
        }
    }

    /// Resolution failed internally.
    pub fn error() -> Self {
        Self {
            root: String::new(),
            quality: None,
            name: "Error".to_string(),
            aliases: vec![UNKNOWN_KEY.to_string()],
            notes: Vec::new(),
            type_code: "error".to_string(),
            confidence: 0.0,
        }
    }
}
