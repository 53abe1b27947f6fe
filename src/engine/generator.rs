use std::sync::Arc;

use tracing::debug;

use crate::config::MIN_LEGS;
use crate::types::{BetLeg, BetSuggestionResult, RosterEntry, SlotKind};

use super::classifier::{analyze, NameListClassifier, ProfileClassifier};
use super::legs::build_leg;
use super::selector::select;

/// Turns a roster, luck level and history baseline into a bet slip.
#[derive(Clone)]
pub struct BetGenerator {
    classifier: Arc<dyn ProfileClassifier>,
}

impl BetGenerator {
    pub fn new(classifier: Arc<dyn ProfileClassifier>) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &dyn ProfileClassifier {
        self.classifier.as_ref()
    }

    /// Legs come out in slot order: captain, vice-captain, up to two
    /// high-profile, defensive, attacking, then extras until there are at least
    /// `MIN_LEGS`. An empty roster yields an empty slip.
    pub fn generate(
        &self,
        roster: &[RosterEntry],
        luck_level: i32,
        baseline_odds: f64,
    ) -> BetSuggestionResult {
        if roster.is_empty() {
            return BetSuggestionResult::empty(luck_level);
        }

        let classifier = self.classifier();
        let analysis = analyze(classifier, roster);
        let mut selected = select(classifier, roster, &analysis, luck_level);

        let mut legs: Vec<BetLeg> = Vec::with_capacity(6);
        let mut push = |slot: SlotKind, entry: &RosterEntry| {
            let tier = classifier.classify(entry);
            legs.push(build_leg(slot, entry, tier, luck_level, baseline_odds));
        };

        if let Some(captain) = selected.captain {
            push(SlotKind::Captain, captain);
        }
        if let Some(vice) = selected.vice_captain {
            push(SlotKind::ViceCaptain, vice);
        }
        for &player in &selected.high_profile {
            let is_leader = [selected.captain, selected.vice_captain]
                .into_iter()
                .flatten()
                .any(|leader| std::ptr::eq(leader, player));
            if !is_leader {
                push(SlotKind::HighProfile, player);
            }
        }
        if let Some(defender) = selected.defensive {
            push(SlotKind::Defensive, defender);
        }
        if let Some(attacker) = selected.attacking {
            push(SlotKind::Attacking, attacker);
        }

        while legs.len() < MIN_LEGS {
            let Some(extra) = selected.extra.pop_front() else {
                break;
            };
            let tier = classifier.classify(extra);
            legs.push(build_leg(SlotKind::Extra, extra, tier, luck_level, baseline_odds));
        }

        let total_odds = legs.iter().fold(1.0, |acc, leg| acc * leg.odds);

        debug!(
            luck_level,
            baseline_odds,
            legs = legs.len(),
            total_odds,
            "Generated bet suggestions"
        );

        BetSuggestionResult {
            bet_legs: legs,
            total_odds,
            team_analysis: analysis,
            luck_level,
        }
    }
}

impl Default for BetGenerator {
    fn default() -> Self {
        Self::new(Arc::new(NameListClassifier::curated()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BetType, Position};
    use std::collections::HashSet;

    fn entry(id: u32, name: &str, position: i64, points: i32) -> RosterEntry {
        RosterEntry {
            id,
            name: name.to_string(),
            team_name: "TST".to_string(),
            element_type: Position::from(position),
            is_captain: false,
            is_vice_captain: false,
            multiplier: 1,
            total_points: points,
        }
    }

    fn squad() -> Vec<RosterEntry> {
        let mut squad = vec![
            entry(1, "Jordan Pickford", 1, 40),
            entry(2, "Mark Flekken", 1, 22),
            entry(3, "Virgil van Dijk", 2, 55),
            entry(4, "Ola Aina", 2, 48),
            entry(5, "Gabriel Magalhaes", 2, 50),
            entry(6, "Joachim Andersen", 2, 30),
            entry(7, "Rico Lewis", 2, 12),
            entry(8, "Mohamed Salah", 3, 120),
            entry(9, "Cole Palmer", 3, 101),
            entry(10, "Bryan Mbeumo", 3, 88),
            entry(11, "Jacob Murphy", 3, 60),
            entry(12, "Alex Iwobi", 3, 45),
            entry(13, "Chris Wood", 4, 90),
            entry(14, "Erling Haaland", 4, 95),
            entry(15, "Jean-Philippe Mateta", 4, 70),
        ];
        squad[7].is_captain = true;
        squad[12].is_vice_captain = true;
        squad
    }

    #[test]
    fn four_player_end_to_end() {
        let mut salah = entry(3, "salah", 3, 3);
        salah.is_captain = true;
        let mut fwd = entry(4, "Chris Wood", 4, 0);
        fwd.is_vice_captain = true;
        let roster = vec![
            entry(1, "Jordan Pickford", 1, 5),
            entry(2, "van dijk", 2, 8),
            salah,
            fwd,
        ];

        let result = BetGenerator::default().generate(&roster, 0, 1.2);
        let legs = &result.bet_legs;
        assert_eq!(legs.len(), 4);

        assert_eq!(legs[0].id, "captain_3");
        assert_eq!(legs[0].bet_type, BetType::CaptainGoalScorer);
        assert_eq!(legs[0].base_odds, 1.8);
        assert_eq!(legs[0].odds, 1.8);

        assert_eq!(legs[1].id, "vc_4");
        assert_eq!(legs[1].bet_type, BetType::ViceCaptainAssist);
        assert_eq!(legs[1].odds, 2.0);

        assert_eq!(legs[2].id, "high_2");
        assert_eq!(legs[2].bet_type, BetType::YellowCard);
        assert_eq!(legs[2].odds, 2.5);

        // No defender or attacker left; the keeper pads the slip.
        assert_eq!(legs[3].id, "extra_1");
        assert_eq!(legs[3].bet_type, BetType::CleanSheet);
        assert_eq!(legs[3].odds, 1.8);

        assert!((result.total_odds - 1.8 * 2.0 * 2.5 * 1.8).abs() < 1e-9);
        assert_eq!(result.luck_level, 0);
    }

    #[test]
    fn full_squad_gives_four_to_six_distinct_legs() {
        let generator = BetGenerator::default();
        let roster = squad();
        for luck in -6..=6 {
            for baseline in [1.1, 1.2, 2.1, 6.0] {
                let result = generator.generate(&roster, luck, baseline);
                let n = result.bet_legs.len();
                assert!((4..=6).contains(&n), "luck {luck}: {n} legs");

                let players: HashSet<&str> =
                    result.bet_legs.iter().map(|l| l.player.as_str()).collect();
                assert_eq!(players.len(), n, "player reused at luck {luck}");

                let max = if luck > 0 { 8.0 } else { 5.0 };
                for leg in &result.bet_legs {
                    assert!((1.1..=max).contains(&leg.odds), "{} odds {}", leg.id, leg.odds);
                }
            }
        }
    }

    #[test]
    fn identical_inputs_give_identical_odds() {
        let generator = BetGenerator::default();
        let roster = squad();
        let a = generator.generate(&roster, 3, 1.7);
        let b = generator.generate(&roster, 3, 1.7);
        let odds_a: Vec<f64> = a.bet_legs.iter().map(|l| l.odds).collect();
        let odds_b: Vec<f64> = b.bet_legs.iter().map(|l| l.odds).collect();
        assert_eq!(odds_a, odds_b);
        assert!((a.total_odds - b.total_odds).abs() < 1e-9);
    }

    #[test]
    fn successive_luck_levels_surface_different_players() {
        let generator = BetGenerator::default();
        let roster = squad();
        let ids = |luck| -> Vec<String> {
            generator
                .generate(&roster, luck, 1.2)
                .bet_legs
                .into_iter()
                .map(|l| l.id)
                .collect()
        };
        assert_ne!(ids(1), ids(2));
        assert_ne!(ids(-1), ids(-2));
    }

    #[test]
    fn total_odds_is_product_of_legs() {
        let result = BetGenerator::default().generate(&squad(), 2, 1.5);
        let product: f64 = result.bet_legs.iter().map(|l| l.odds).product();
        assert!((result.total_odds - product).abs() < 1e-9);
    }

    #[test]
    fn empty_roster_is_degenerate() {
        let result = BetGenerator::default().generate(&[], 2, 1.2);
        assert!(result.bet_legs.is_empty());
        assert_eq!(result.total_odds, 1.0);
        assert_eq!(result.luck_level, 2);
    }

    #[test]
    fn short_roster_returns_fewer_legs() {
        let roster = vec![entry(1, "Jordan Pickford", 1, 10), entry(2, "Ola Aina", 2, 3)];
        let result = BetGenerator::default().generate(&roster, 0, 1.2);
        // Defensive leg plus one extra; nothing else to draw from.
        assert_eq!(result.bet_legs.len(), 2);
        assert_eq!(result.bet_legs[0].id, "def_2");
        assert_eq!(result.bet_legs[1].id, "extra_1");
    }
}
