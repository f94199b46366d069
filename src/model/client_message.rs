use serde::{Deserialize, Serialize};

use crate::model::types::{Round, TeamSlot};

/// Intents sent by a host console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ConsoleAction {
    #[serde(rename_all = "camelCase")]
    StartGroup { group_id: u32 },
    #[serde(rename_all = "camelCase")]
    SelectGroup { group_id: u32 },
    #[serde(rename_all = "camelCase")]
    SwitchGroup { group_id: u32 },

    NextQuestion,
    PrevQuestion,

    #[serde(rename_all = "camelCase")]
    AwardPoint {
        group_id: u32,
        team: TeamSlot,
        round: Round,
    },
    #[serde(rename_all = "camelCase")]
    AdjustScore {
        group_id: u32,
        team: TeamSlot,
        round: Round,
        delta: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        question_index: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    RevokeScore {
        group_id: u32,
        team: TeamSlot,
        round: Round,
    },

    StartFinal,

    #[serde(rename_all = "camelCase")]
    UpdateTeamName {
        group_id: u32,
        team: TeamSlot,
        name: String,
    },

    #[serde(rename_all = "camelCase")]
    ResetGroup { group_id: u32 },
    ResetAll,

    DismissGroupComplete,
    ReloadQuestions,
}
