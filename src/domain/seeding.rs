//! Single-elimination layout: shuffling, bye padding and the match grid.
//!
//! Everything here is pure; persistence happens in the bracket service.

use rand::Rng;
use rand::seq::SliceRandom;

use super::entrants::{Entrant, Slot};
use super::models::{MatchStatus, Participant};

/// A match to be created, before it receives an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMatch {
    pub round: u32,
    pub position: u32,
    pub team1: Option<Participant>,
    pub team2: Option<Participant>,
    pub status: MatchStatus,
    pub winner: Option<Participant>,
}

impl PlannedMatch {
    fn placeholder(round: u32, position: u32) -> Self {
        Self {
            round,
            position,
            team1: None,
            team2: None,
            status: MatchStatus::Upcoming,
            winner: None,
        }
    }

    fn opening(position: u32, first: &Slot, second: &Slot) -> Self {
        let team1 = first.participant();
        let team2 = second.participant();

        let winner = match (&team1, &team2) {
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            _ => None,
        };
        let status = if winner.is_some() {
            MatchStatus::Completed
        } else {
            MatchStatus::Upcoming
        };

        Self {
            round: 1,
            position,
            team1,
            team2,
            status,
            winner,
        }
    }

    pub fn is_bye(&self) -> bool {
        self.round == 1 && self.winner.is_some()
    }
}

/// Smallest power of two that holds `entrants` slots.
pub fn bracket_size(entrants: usize) -> usize {
    entrants.max(1).next_power_of_two()
}

pub fn total_rounds(size: usize) -> u32 {
    size.trailing_zeros()
}

/// Uniform Fisher-Yates shuffle: every seed order is equally likely.
pub fn shuffle_entrants<R: Rng + ?Sized>(entrants: &mut [Entrant], rng: &mut R) {
    entrants.shuffle(rng);
}

/// Pads the entrant list with byes up to the bracket size.
///
/// Byes are interleaved so each one lands opposite a real entrant: the first
/// `byes` pairs are (entrant, bye), the remaining pairs are two entrants.
/// There are always fewer byes than pairs, so no pair is bye against bye.
pub fn pad_with_byes(entrants: Vec<Entrant>) -> Vec<Slot> {
    let size = bracket_size(entrants.len());
    let byes = size - entrants.len();

    let mut slots = Vec::with_capacity(size);
    for (idx, entrant) in entrants.into_iter().enumerate() {
        slots.push(Slot::Entrant(entrant));
        if idx < byes {
            slots.push(Slot::Bye);
        }
    }
    slots
}

/// Every match of the bracket, ordered by round then position.
///
/// Round one is filled from `slots` (position `p` takes slots `2p` and
/// `2p + 1`); later rounds are empty placeholders fed by progression.
pub fn plan_matches(slots: &[Slot]) -> Vec<PlannedMatch> {
    let size = slots.len();
    let rounds = total_rounds(size);
    let mut planned = Vec::with_capacity(size.saturating_sub(1));

    for round in 1..=rounds {
        let matches_in_round = size >> round;
        for position in 0..matches_in_round {
            let planned_match = if round == 1 {
                let (first, second) = (&slots[2 * position], &slots[2 * position + 1]);
                PlannedMatch::opening(position as u32, first, second)
            } else {
                PlannedMatch::placeholder(round, position as u32)
            };
            planned.push(planned_match);
        }
    }

    planned
}
