use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raised when a stored enum column holds a value we do not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Draft,
    Registration,
    Live,
    Completed,
}

text_enum!(TournamentStatus {
    Draft => "draft",
    Registration => "registration",
    Live => "live",
    Completed => "completed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Upcoming,
    Live,
    Completed,
}

text_enum!(MatchStatus {
    Upcoming => "upcoming",
    Live => "live",
    Completed => "completed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(PaymentStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Viewer,
    Player,
    Organizer,
    Admin,
}

text_enum!(UserRole {
    Viewer => "viewer",
    Player => "player",
    Organizer => "organizer",
    Admin => "admin",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrantKind {
    Team,
    Solo,
}

text_enum!(EntrantKind {
    Team => "team",
    Solo => "solo",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PaymentApproved,
    PaymentRejected,
    MatchStart,
    ResultPosted,
}

text_enum!(NotificationKind {
    PaymentApproved => "payment_approved",
    PaymentRejected => "payment_rejected",
    MatchStart => "match_start",
    ResultPosted => "result_posted",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketType {
    SingleElimination,
}

text_enum!(BracketType {
    SingleElimination => "single_elimination",
});

/// One row of a tournament's prize table. Amounts are minor currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeShare {
    pub position: u32,
    pub percentage: f64,
    pub amount: i64,
}

/// Lobby credentials handed to entrants shortly before play starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub password: String,
    pub visible_from: Option<DateTime<Utc>>,
    pub revealed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: String,
    pub title: String,
    pub organizer_id: String,
    pub status: TournamentStatus,
    pub prize_pool: i64,
    pub prize_distribution: Vec<PrizeShare>,
    pub room: Option<Room>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tournament {
    /// Percentage paid to the champion: the entry ranked first, or 0 when the
    /// prize table has no such entry.
    pub fn first_place_percentage(&self) -> f64 {
        self.prize_distribution
            .iter()
            .find(|share| share.position == 1)
            .map(|share| share.percentage)
            .unwrap_or(0.0)
    }

    /// Champion's cut of the prize pool, rounded to the nearest minor unit.
    pub fn winner_share(&self) -> i64 {
        (self.prize_pool as f64 * self.first_place_percentage() / 100.0).round() as i64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    pub tournament_id: String,
    pub user_id: String,
    pub team_id: Option<String>,
    pub team_name: Option<String>,
    pub player_game_id: String,
    pub payment_status: PaymentStatus,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An occupied side of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub kind: EntrantKind,
}

/// Which side of a match a participant occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Team1,
    Team2,
}

impl Side {
    /// Slot in the next round fed by the match at `position`: even positions
    /// feed `team1`, odd positions feed `team2`.
    pub fn fed_by(position: u32) -> Self {
        if position % 2 == 0 { Side::Team1 } else { Side::Team2 }
    }

    pub fn column_prefix(&self) -> &'static str {
        match self {
            Side::Team1 => "team1",
            Side::Team2 => "team2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    pub team1_score: i32,
    pub team2_score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub tournament_id: String,
    pub round: u32,
    pub position: u32,
    pub team1: Option<Participant>,
    pub team2: Option<Participant>,
    pub status: MatchStatus,
    pub winner_id: Option<String>,
    pub winner_name: Option<String>,
    pub scores: Option<Scores>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    pub fn side(&self, side: Side) -> Option<&Participant> {
        match side {
            Side::Team1 => self.team1.as_ref(),
            Side::Team2 => self.team2.as_ref(),
        }
    }

    /// Completed with a non-empty winner, i.e. ready to feed the next round.
    pub fn is_decided(&self) -> bool {
        self.status == MatchStatus::Completed
            && self.winner_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// The side whose id matches `winner_id`.
    pub fn winner(&self) -> Option<&Participant> {
        let winner_id = self.winner_id.as_deref()?;
        [self.team1.as_ref(), self.team2.as_ref()]
            .into_iter()
            .flatten()
            .find(|p| p.id == winner_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketRound {
    pub round_number: u32,
    pub match_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub id: String,
    pub tournament_id: String,
    pub bracket_type: BracketType,
    pub rounds: Vec<BracketRound>,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
}

impl Bracket {
    pub fn final_round(&self) -> u32 {
        self.rounds
            .iter()
            .map(|r| r.round_number)
            .max()
            .unwrap_or(0)
    }

    pub fn total_matches(&self) -> usize {
        self.rounds.iter().map(|r| r.match_ids.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub tournaments_joined: i64,
    pub tournaments_won: i64,
    pub total_earnings: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub role: UserRole,
    pub fcm_token: Option<String>,
    pub stats: Stats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    pub member_ids: Vec<String>,
    pub stats: Stats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub data: serde_json::Value,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub user_id: String,
    pub user_display_name: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tournament_with(prize_pool: i64, shares: Vec<PrizeShare>) -> Tournament {
        Tournament {
            id: "t1".into(),
            title: "Cup".into(),
            organizer_id: "org".into(),
            status: TournamentStatus::Live,
            prize_pool,
            prize_distribution: shares,
            room: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn share(position: u32, percentage: f64) -> PrizeShare {
        PrizeShare {
            position,
            percentage,
            amount: 0,
        }
    }

    #[test]
    fn test_first_place_is_matched_by_position() {
        let t = tournament_with(10_000, vec![share(2, 30.0), share(1, 50.0), share(3, 20.0)]);
        assert_eq!(t.first_place_percentage(), 50.0);
        assert_eq!(t.winner_share(), 5_000);
    }

    #[test]
    fn test_missing_first_place_pays_nothing() {
        let t = tournament_with(10_000, vec![share(2, 30.0)]);
        assert_eq!(t.winner_share(), 0);
    }

    #[test]
    fn test_side_parity() {
        assert_eq!(Side::fed_by(0), Side::Team1);
        assert_eq!(Side::fed_by(1), Side::Team2);
        assert_eq!(Side::fed_by(6), Side::Team1);
    }

    #[test]
    fn test_status_text_round_trip() {
        assert_eq!("live".parse::<TournamentStatus>(), Ok(TournamentStatus::Live));
        assert_eq!(MatchStatus::Completed.as_str(), "completed");
        assert!("finished".parse::<MatchStatus>().is_err());
    }
}
