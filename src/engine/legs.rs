use crate::types::{BetLeg, BetType, Position, ProfileTier, RosterEntry, SlotKind};

use super::odds;

/// Market and base odds for a slot, keyed on the player's position and tier.
pub fn market_for(slot: SlotKind, position: Position, tier: ProfileTier) -> (BetType, f64) {
    use Position::*;

    match slot {
        SlotKind::Captain => match position {
            Goalkeeper => (BetType::CleanSheet, 1.5),
            Defender => (BetType::YellowCard, 2.0),
            Midfielder | Forward => (BetType::CaptainGoalScorer, 1.8),
        },
        SlotKind::ViceCaptain => match position {
            Goalkeeper => (BetType::CleanSheet, 1.6),
            Defender => (BetType::YellowCard, 2.2),
            Midfielder | Forward => (BetType::ViceCaptainAssist, 2.0),
        },
        SlotKind::HighProfile => match position {
            Goalkeeper => (BetType::CleanSheet, 1.7),
            Defender => (BetType::YellowCard, 2.5),
            Midfielder | Forward => (BetType::GoalScorer, 2.2),
        },
        SlotKind::Defensive => (BetType::YellowCard, BetType::YellowCard.catalogue_odds()),
        SlotKind::Attacking => (BetType::Assist, BetType::Assist.catalogue_odds()),
        SlotKind::Extra => {
            let high = tier == ProfileTier::HighProfile;
            match position {
                Goalkeeper => (BetType::CleanSheet, 1.8),
                Defender => (BetType::YellowCard, 2.8),
                Midfielder if high => (BetType::Assist, 2.5),
                Midfielder => (BetType::ShotsOnTarget, 1.6),
                Forward if high => (BetType::GoalScorer, 2.5),
                Forward => (BetType::ShotsOnTarget, 1.8),
            }
        }
    }
}

/// Build a leg for one selected player, quoting adjusted odds.
pub fn build_leg(
    slot: SlotKind,
    entry: &RosterEntry,
    tier: ProfileTier,
    luck_level: i32,
    baseline_odds: f64,
) -> BetLeg {
    let (bet_type, base_odds) = market_for(slot, entry.element_type, tier);

    BetLeg {
        id: format!("{}_{}", slot.prefix(), entry.id),
        player: entry.name.clone(),
        team: entry.team_name.clone(),
        bet_type,
        odds: odds::adjust(base_odds, luck_level, baseline_odds),
        confidence: slot.confidence(),
        slot,
        base_odds,
    }
}
