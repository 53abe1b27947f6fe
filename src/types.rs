use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// FPL `element_type`. Unknown or missing codes fall back to goalkeeper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Position {
    #[default]
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub fn code(self) -> u8 {
        match self {
            Position::Goalkeeper => 1,
            Position::Defender => 2,
            Position::Midfielder => 3,
            Position::Forward => 4,
        }
    }

    /// Midfielders and forwards.
    pub fn is_attacking(self) -> bool {
        matches!(self, Position::Midfielder | Position::Forward)
    }
}

impl From<i64> for Position {
    fn from(code: i64) -> Self {
        match code {
            2 => Position::Defender,
            3 => Position::Midfielder,
            4 => Position::Forward,
            _ => Position::Goalkeeper,
        }
    }
}

impl From<Position> for i64 {
    fn from(p: Position) -> Self {
        i64::from(p.code())
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        };
        write!(f, "{s}")
    }
}

/// One fantasy-team pick for a gameweek. Treated as immutable input by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default = "unknown_team")]
    pub team_name: String,
    #[serde(default)]
    pub element_type: Position,
    #[serde(default)]
    pub is_captain: bool,
    #[serde(default)]
    pub is_vice_captain: bool,
    #[serde(default = "default_multiplier")]
    pub multiplier: u8,
    #[serde(default)]
    pub total_points: i32,
}

fn unknown_team() -> String {
    "Unknown".to_string()
}

fn default_multiplier() -> u8 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileTier {
    HighProfile,
    MidProfile,
    LowProfile,
}

impl std::fmt::Display for ProfileTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProfileTier::HighProfile => "high_profile",
            ProfileTier::MidProfile => "mid_profile",
            ProfileTier::LowProfile => "low_profile",
        };
        write!(f, "{s}")
    }
}

/// Single-pass summary of a roster. Echoed back to the client with every suggestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamAnalysis {
    pub captain: Option<RosterEntry>,
    pub vice_captain: Option<RosterEntry>,
    pub high_profile_players: Vec<RosterEntry>,
    pub defensive_players: Vec<RosterEntry>,
    pub attacking_players: Vec<RosterEntry>,
    /// Advisory only: 2 per high-profile, 1 per attacker, 0.5 per defender.
    pub team_strength: f64,
}

// ---------------------------------------------------------------------------
// Bet legs
// ---------------------------------------------------------------------------

/// Which selection slot produced a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Captain,
    ViceCaptain,
    HighProfile,
    Defensive,
    Attacking,
    Extra,
}

impl SlotKind {
    /// Prefix of the leg id, `{prefix}_{roster_id}`.
    pub fn prefix(self) -> &'static str {
        match self {
            SlotKind::Captain => "captain",
            SlotKind::ViceCaptain => "vc",
            SlotKind::HighProfile => "high",
            SlotKind::Defensive => "def",
            SlotKind::Attacking => "att",
            SlotKind::Extra => "extra",
        }
    }

    pub fn confidence(self) -> Confidence {
        match self {
            SlotKind::Captain => Confidence::High,
            SlotKind::ViceCaptain => Confidence::MediumHigh,
            SlotKind::HighProfile | SlotKind::Defensive | SlotKind::Attacking => Confidence::Medium,
            SlotKind::Extra => Confidence::LowMedium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    #[serde(rename = "Medium-High")]
    MediumHigh,
    Medium,
    #[serde(rename = "Low-Medium")]
    LowMedium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BetType {
    #[serde(rename = "Goal Scorer")]
    GoalScorer,
    #[serde(rename = "Goal Scorer (Captain)")]
    CaptainGoalScorer,
    Assist,
    #[serde(rename = "Assist (Vice Captain)")]
    ViceCaptainAssist,
    #[serde(rename = "Clean Sheet")]
    CleanSheet,
    #[serde(rename = "Yellow Card")]
    YellowCard,
    #[serde(rename = "Shots on Target")]
    ShotsOnTarget,
    #[serde(rename = "Man of the Match")]
    ManOfTheMatch,
    #[serde(rename = "Over Goals")]
    OverGoals,
}

impl BetType {
    pub const ALL: [BetType; 9] = [
        BetType::GoalScorer,
        BetType::CaptainGoalScorer,
        BetType::Assist,
        BetType::ViceCaptainAssist,
        BetType::CleanSheet,
        BetType::YellowCard,
        BetType::ShotsOnTarget,
        BetType::ManOfTheMatch,
        BetType::OverGoals,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BetType::GoalScorer => "Goal Scorer",
            BetType::CaptainGoalScorer => "Goal Scorer (Captain)",
            BetType::Assist => "Assist",
            BetType::ViceCaptainAssist => "Assist (Vice Captain)",
            BetType::CleanSheet => "Clean Sheet",
            BetType::YellowCard => "Yellow Card",
            BetType::ShotsOnTarget => "Shots on Target",
            BetType::ManOfTheMatch => "Man of the Match",
            BetType::OverGoals => "Over Goals",
        }
    }

    /// Catalogue price for the market. Slot-specific legs mostly quote their own
    /// base odds; the defensive and attacking legs use these directly.
    pub fn catalogue_odds(self) -> f64 {
        match self {
            BetType::GoalScorer | BetType::CaptainGoalScorer => 2.0,
            BetType::Assist | BetType::ViceCaptainAssist => 2.5,
            BetType::CleanSheet => 1.8,
            BetType::ShotsOnTarget => 1.5,
            BetType::ManOfTheMatch => 3.5,
            BetType::YellowCard => 2.2,
            BetType::OverGoals => 1.6,
        }
    }
}

impl std::fmt::Display for BetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetLeg {
    pub id: String,
    pub player: String,
    pub team: String,
    #[serde(rename = "betType")]
    pub bet_type: BetType,
    pub odds: f64,
    pub confidence: Confidence,
    #[serde(skip)]
    pub slot: SlotKind,
    #[serde(skip)]
    pub base_odds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetSuggestionResult {
    pub bet_legs: Vec<BetLeg>,
    /// Product of every leg's odds in construction order.
    pub total_odds: f64,
    pub team_analysis: TeamAnalysis,
    pub luck_level: i32,
}

impl BetSuggestionResult {
    /// Result for an empty roster: no legs, neutral total.
    pub fn empty(luck_level: i32) -> Self {
        Self {
            bet_legs: Vec::new(),
            total_odds: 1.0,
            team_analysis: TeamAnalysis::default(),
            luck_level,
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// One placed bet as stored in a user's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    /// Local wall clock, naive ISO-8601 (`2024-09-14T15:02:11.123456`).
    #[serde(with = "iso_micros")]
    pub timestamp: NaiveDateTime,
    #[serde(default = "neutral_odds")]
    pub total_odds: f64,
    #[serde(default)]
    pub luck_level: i32,
    #[serde(default)]
    pub stake: f64,
    #[serde(default)]
    pub potential_win: f64,
    #[serde(default)]
    pub legs_count: usize,
    #[serde(default = "unknown_bet_id")]
    pub bet_id: String,
}

/// Naive timestamps with exactly six fractional digits, the layout existing
/// history files use. Parsing accepts any fraction width.
pub mod iso_micros {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<NaiveDateTime>().map_err(serde::de::Error::custom)
    }
}

fn neutral_odds() -> f64 {
    1.0
}

fn unknown_bet_id() -> String {
    "unknown".to_string()
}

/// A leg as the client echoes it back when placing a bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedLeg {
    pub id: String,
    #[serde(default)]
    pub player: String,
    #[serde(default)]
    pub team: String,
    #[serde(rename = "betType", default)]
    pub bet_type: String,
    #[serde(default = "neutral_odds")]
    pub odds: f64,
}

/// Input to `HistoryTracker::record`. Missing fields take explicit defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetSummary {
    #[serde(default)]
    pub bet_id: Option<String>,
    #[serde(default)]
    pub legs: Vec<PlacedLeg>,
    #[serde(default = "neutral_odds")]
    pub total_odds: f64,
    #[serde(default)]
    pub total_stake: f64,
    #[serde(default)]
    pub potential_win: f64,
    #[serde(default)]
    pub luck_level: i32,
}

impl Default for BetSummary {
    fn default() -> Self {
        Self {
            bet_id: None,
            legs: Vec::new(),
            total_odds: 1.0,
            total_stake: 0.0,
            potential_win: 0.0,
            luck_level: 0,
        }
    }
}
