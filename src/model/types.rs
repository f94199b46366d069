use serde::{Deserialize, Serialize};
use std::fmt;

// === Questions ===

/// How a recognition question's media should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Image,
    #[serde(alias = "sound")]
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionQuestion {
    pub prompt: String,
    pub media_kind: MediaKind,
    pub media_url: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenQuestion {
    pub prompt: String,
    pub answer: String,
}

/// A single question as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Question {
    Choice(ChoiceQuestion),
    Recognition(RecognitionQuestion),
    Open(OpenQuestion),
}

impl Question {
    pub fn prompt(&self) -> &str {
        match self {
            Question::Choice(q) => &q.prompt,
            Question::Recognition(q) => &q.prompt,
            Question::Open(q) => &q.prompt,
        }
    }
}

// === Rounds ===

/// One of the three themed rounds of a group. Persisted as the plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Round {
    Choice = 1,
    Recognition = 2,
    Open = 3,
}

impl Round {
    pub const ALL: [Round; 3] = [Round::Choice, Round::Recognition, Round::Open];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<Round> {
        match self {
            Round::Choice => Some(Round::Recognition),
            Round::Recognition => Some(Round::Open),
            Round::Open => None,
        }
    }

    pub fn previous(self) -> Option<Round> {
        match self {
            Round::Choice => None,
            Round::Recognition => Some(Round::Choice),
            Round::Open => Some(Round::Recognition),
        }
    }
}

impl TryFrom<u8> for Round {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Round::Choice),
            2 => Ok(Round::Recognition),
            3 => Ok(Round::Open),
            other => Err(format!("round must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<Round> for u8 {
    fn from(round: Round) -> Self {
        round.number()
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

// === Teams ===

/// The four fixed team slots every group is played with, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSlot {
    Alpha,
    Beta,
    Gamma,
    Delta,
}

impl TeamSlot {
    pub const ALL: [TeamSlot; 4] = [
        TeamSlot::Alpha,
        TeamSlot::Beta,
        TeamSlot::Gamma,
        TeamSlot::Delta,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TeamSlot::Alpha => "Alpha",
            TeamSlot::Beta => "Beta",
            TeamSlot::Gamma => "Gamma",
            TeamSlot::Delta => "Delta",
        }
    }
}

impl fmt::Display for TeamSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ceiling for a single round score. Three of them always fit in a `u32` total.
pub const MAX_ROUND_SCORE: u32 = u32::MAX / 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamScore {
    pub team_name: TeamSlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    pub round1_score: u32,
    pub round2_score: u32,
    pub round3_score: u32,
    pub total_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scored_question: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scored_round: Option<Round>,
}

impl TeamScore {
    pub fn new(slot: TeamSlot) -> Self {
        Self {
            team_name: slot,
            school_name: None,
            round1_score: 0,
            round2_score: 0,
            round3_score: 0,
            total_score: 0,
            last_scored_question: None,
            last_scored_round: None,
        }
    }

    pub fn round_score(&self, round: Round) -> u32 {
        match round {
            Round::Choice => self.round1_score,
            Round::Recognition => self.round2_score,
            Round::Open => self.round3_score,
        }
    }

    /// Apply `delta` to one round, clamped to `0..=MAX_ROUND_SCORE`, and keep
    /// the total in sync.
    pub fn apply_delta(&mut self, round: Round, delta: i32) {
        let slot = match round {
            Round::Choice => &mut self.round1_score,
            Round::Recognition => &mut self.round2_score,
            Round::Open => &mut self.round3_score,
        };
        *slot = if delta >= 0 {
            slot.saturating_add(delta.unsigned_abs()).min(MAX_ROUND_SCORE)
        } else {
            slot.saturating_sub(delta.unsigned_abs())
        };
        self.total_score = self
            .round1_score
            .saturating_add(self.round2_score)
            .saturating_add(self.round3_score);
    }

    pub fn has_scored(&self, round: Round, question: usize) -> bool {
        self.last_scored_round == Some(round) && self.last_scored_question == Some(question)
    }

    pub fn mark_scored(&mut self, round: Round, question: usize) {
        self.last_scored_round = Some(round);
        self.last_scored_question = Some(question);
    }

    pub fn clear_scored_marker(&mut self) {
        self.last_scored_round = None;
        self.last_scored_question = None;
    }

    /// School name if one was entered, otherwise the slot name.
    pub fn display_name(&self) -> String {
        self.school_name
            .clone()
            .unwrap_or_else(|| self.team_name.to_string())
    }
}

// === Groups ===

/// Group id reserved for the final stage. Regular groups are numbered from 1.
pub const FINAL_GROUP_ID: u32 = 0;

/// Current-group pointer used when the question source has no groups at all.
pub const DEFAULT_GROUP_ID: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupState {
    pub group_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub current_round: Round,
    pub current_question: usize,
    pub teams: Vec<TeamScore>,
    pub is_started: bool,
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<TeamSlot>,
}

impl GroupState {
    pub fn new(group_id: u32, group_name: Option<String>) -> Self {
        let current_round = if group_id == FINAL_GROUP_ID {
            Round::Open
        } else {
            Round::Choice
        };
        Self {
            group_id,
            group_name,
            current_round,
            current_question: 0,
            teams: TeamSlot::ALL.into_iter().map(TeamScore::new).collect(),
            is_started: false,
            is_completed: false,
            winner: None,
        }
    }

    pub fn is_final(&self) -> bool {
        self.group_id == FINAL_GROUP_ID
    }

    pub fn is_in_progress(&self) -> bool {
        self.is_started && !self.is_completed
    }

    pub fn team(&self, slot: TeamSlot) -> Option<&TeamScore> {
        self.teams.iter().find(|t| t.team_name == slot)
    }

    pub fn team_mut(&mut self, slot: TeamSlot) -> Option<&mut TeamScore> {
        self.teams.iter_mut().find(|t| t.team_name == slot)
    }

    /// Highest total; ties go to the earliest slot.
    pub fn leader(&self) -> Option<&TeamScore> {
        self.teams.iter().fold(None, |best: Option<&TeamScore>, team| match best {
            Some(b) if b.total_score >= team.total_score => Some(b),
            _ => Some(team),
        })
    }
}

// === Tournament ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Groups,
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupWinner {
    pub group_id: u32,
    pub winner: TeamSlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
}

/// The whole persisted snapshot of progress, scores and stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentState {
    pub current_stage: Stage,
    pub current_group: u32,
    pub groups: Vec<GroupState>,
    pub group_winners: Vec<GroupWinner>,
    #[serde(default)]
    pub finalists: Vec<String>,
}

impl TournamentState {
    pub fn group(&self, group_id: u32) -> Option<&GroupState> {
        self.groups.iter().find(|g| g.group_id == group_id)
    }

    pub fn group_mut(&mut self, group_id: u32) -> Option<&mut GroupState> {
        self.groups.iter_mut().find(|g| g.group_id == group_id)
    }

    pub fn current(&self) -> Option<&GroupState> {
        self.group(self.current_group)
    }
}

// === Announcements ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leader {
    pub team: TeamSlot,
    pub name: String,
    pub score: u32,
}

impl From<&TeamScore> for Leader {
    fn from(team: &TeamScore) -> Self {
        Self {
            team: team.team_name,
            name: team.display_name(),
            score: team.total_score,
        }
    }
}

/// Shown once when a group finishes, until the moderator dismisses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupComplete {
    pub group_id: u32,
    pub winner: TeamSlot,
    pub winner_name: String,
    pub score: u32,
    pub is_final: bool,
    pub all_groups_complete: bool,
}

// === Console views ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentQuestion {
    pub group_id: u32,
    pub round: Round,
    pub index: usize,
    pub total: usize,
    pub is_last: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub state: TournamentState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_complete: Option<GroupComplete>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question: Option<CurrentQuestion>,
}
