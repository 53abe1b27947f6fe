use std::collections::VecDeque;

use crate::config::MAX_HIGH_PROFILE_LEGS;
use crate::types::{Position, RosterEntry, TeamAnalysis};

use super::classifier::ProfileClassifier;

/// Roster entries assigned to each leg slot for one request. No entry appears
/// in more than one slot.
#[derive(Debug, Default)]
pub struct SelectionSet<'a> {
    pub captain: Option<&'a RosterEntry>,
    pub vice_captain: Option<&'a RosterEntry>,
    pub high_profile: Vec<&'a RosterEntry>,
    pub defensive: Option<&'a RosterEntry>,
    pub attacking: Option<&'a RosterEntry>,
    /// Everything left over, in rotated order. Drained from the front to pad legs.
    pub extra: VecDeque<&'a RosterEntry>,
}

/// Order the roster for a luck level: sort by the luck-sign key, then rotate
/// left by `2 * |luck|` (modulo roster length) so each luck step surfaces
/// different players. Sorting is stable.
pub fn luck_order<'a>(
    classifier: &dyn ProfileClassifier,
    roster: &'a [RosterEntry],
    luck_level: i32,
) -> Vec<&'a RosterEntry> {
    let mut ordered: Vec<&RosterEntry> = roster.iter().collect();

    if luck_level > 0 {
        ordered.sort_by_key(|e| {
            (
                !classifier.is_high_profile(e),
                e.element_type.is_attacking(),
                e.total_points,
            )
        });
    } else {
        ordered.sort_by_key(|e| {
            (
                classifier.is_high_profile(e),
                e.total_points,
                e.element_type.code(),
            )
        });
    }

    if !ordered.is_empty() {
        let shift = (luck_level.unsigned_abs() as usize * 2) % ordered.len();
        ordered.rotate_left(shift);
    }
    ordered
}

/// Partition the roster into leg slots for a luck level.
///
/// Captain and vice-captain slots are only filled when the roster has a flagged
/// captain / vice-captain, but the slot itself is re-picked from the rotated
/// order: attackers first for positive luck, high-profile players otherwise.
pub fn select<'a>(
    classifier: &dyn ProfileClassifier,
    roster: &'a [RosterEntry],
    analysis: &TeamAnalysis,
    luck_level: i32,
) -> SelectionSet<'a> {
    let ordered = luck_order(classifier, roster, luck_level);
    let mut used = vec![false; ordered.len()];
    let mut set = SelectionSet::default();

    if analysis.captain.is_some() && !ordered.is_empty() {
        let preferred = if luck_level > 0 {
            ordered.iter().position(|e| e.element_type.is_attacking())
        } else {
            ordered.iter().position(|e| classifier.is_high_profile(e))
        };
        let idx = preferred.unwrap_or(0);
        used[idx] = true;
        set.captain = Some(ordered[idx]);
    }

    if analysis.vice_captain.is_some() {
        // Left empty rather than doubling up the captain on a one-player roster.
        if let Some(idx) = first_unused(&ordered, &used, |_| true) {
            used[idx] = true;
            set.vice_captain = Some(ordered[idx]);
        }
    }

    for _ in 0..MAX_HIGH_PROFILE_LEGS {
        let Some(idx) = first_unused(&ordered, &used, |e| classifier.is_high_profile(e)) else {
            break;
        };
        used[idx] = true;
        set.high_profile.push(ordered[idx]);
    }

    if let Some(idx) = first_unused(&ordered, &used, |e| e.element_type == Position::Defender) {
        used[idx] = true;
        set.defensive = Some(ordered[idx]);
    }

    if let Some(idx) = first_unused(&ordered, &used, |e| e.element_type.is_attacking()) {
        used[idx] = true;
        set.attacking = Some(ordered[idx]);
    }

    set.extra = ordered
        .iter()
        .zip(&used)
        .filter(|(_, taken)| !**taken)
        .map(|(e, _)| *e)
        .collect();

    set
}

fn first_unused(
    ordered: &[&RosterEntry],
    used: &[bool],
    pred: impl Fn(&RosterEntry) -> bool,
) -> Option<usize> {
    ordered
        .iter()
        .zip(used)
        .position(|(e, &taken)| !taken && pred(*e))
}
