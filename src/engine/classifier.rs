use crate::config::CURATED_NAMES;
use crate::types::{Position, ProfileTier, RosterEntry, TeamAnalysis};

/// Assigns a popularity tier to a roster entry. Selection and leg building only
/// see tiers, so the name heuristic can be swapped out behind this trait.
pub trait ProfileClassifier: Send + Sync {
    fn classify(&self, entry: &RosterEntry) -> ProfileTier;

    fn is_high_profile(&self, entry: &RosterEntry) -> bool {
        self.classify(entry) == ProfileTier::HighProfile
    }
}

/// Lower-cased substring match against a fixed list of well-known names.
/// Any listed name appearing anywhere in the display name counts, false
/// positives included.
#[derive(Debug, Clone)]
pub struct NameListClassifier {
    names: Vec<String>,
}

impl NameListClassifier {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names.into_iter().map(|n| n.as_ref().to_lowercase()).collect(),
        }
    }

    pub fn curated() -> Self {
        Self::new(CURATED_NAMES.iter().copied())
    }
}

impl Default for NameListClassifier {
    fn default() -> Self {
        Self::curated()
    }
}

impl ProfileClassifier for NameListClassifier {
    fn classify(&self, entry: &RosterEntry) -> ProfileTier {
        let name = entry.name.to_lowercase();
        if self.names.iter().any(|n| name.contains(n.as_str())) {
            ProfileTier::HighProfile
        } else if entry.element_type == Position::Goalkeeper {
            ProfileTier::MidProfile
        } else {
            ProfileTier::LowProfile
        }
    }
}

/// Single pass over the roster: flagged captain and vice-captain (first match
/// wins), plus non-high-profile entries bucketed into defenders and attackers.
pub fn analyze(classifier: &dyn ProfileClassifier, roster: &[RosterEntry]) -> TeamAnalysis {
    let mut analysis = TeamAnalysis::default();

    for entry in roster {
        if entry.is_captain {
            if analysis.captain.is_none() {
                analysis.captain = Some(entry.clone());
            }
        } else if entry.is_vice_captain && analysis.vice_captain.is_none() {
            analysis.vice_captain = Some(entry.clone());
        }

        if classifier.is_high_profile(entry) {
            analysis.high_profile_players.push(entry.clone());
        } else if entry.element_type == Position::Defender {
            analysis.defensive_players.push(entry.clone());
        } else if entry.element_type.is_attacking() {
            analysis.attacking_players.push(entry.clone());
        }
    }

    analysis.team_strength = analysis.high_profile_players.len() as f64 * 2.0
        + analysis.attacking_players.len() as f64
        + analysis.defensive_players.len() as f64 * 0.5;

    analysis
}
