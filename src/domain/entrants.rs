use super::models::{EntrantKind, Participant, PaymentStatus, Registration};
use crate::errors::{EngineError, EngineResult};

/// A team or player eligible for a bracket slot, built from an approved
/// registration. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrant {
    pub entity_id: String,
    pub kind: EntrantKind,
    pub display_name: String,
    pub registration_id: String,
}

impl Entrant {
    /// Team identity wins over the individual one when the registration
    /// carries a team.
    pub fn from_registration(registration: &Registration) -> Self {
        match registration.team_id.as_deref().filter(|id| !id.is_empty()) {
            Some(team_id) => Self {
                entity_id: team_id.to_string(),
                kind: EntrantKind::Team,
                display_name: registration
                    .team_name
                    .clone()
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| registration.player_game_id.clone()),
                registration_id: registration.id.clone(),
            },
            None => Self {
                entity_id: registration.user_id.clone(),
                kind: EntrantKind::Solo,
                display_name: registration.player_game_id.clone(),
                registration_id: registration.id.clone(),
            },
        }
    }

    pub fn participant(&self) -> Participant {
        Participant {
            id: self.entity_id.clone(),
            name: self.display_name.clone(),
            kind: self.kind,
        }
    }
}

/// A position in the padded first round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Entrant(Entrant),
    Bye,
}

impl Slot {
    pub fn participant(&self) -> Option<Participant> {
        match self {
            Slot::Entrant(entrant) => Some(entrant.participant()),
            Slot::Bye => None,
        }
    }
}

/// Entrants for every approved registration, in registration order.
pub fn resolve_entrants(registrations: &[Registration]) -> EngineResult<Vec<Entrant>> {
    let entrants: Vec<Entrant> = registrations
        .iter()
        .filter(|r| r.payment_status == PaymentStatus::Approved)
        .map(Entrant::from_registration)
        .collect();

    if entrants.len() < 2 {
        return Err(EngineError::Precondition(format!(
            "at least 2 approved entrants required, found {}",
            entrants.len()
        )));
    }

    Ok(entrants)
}
