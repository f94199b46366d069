//! Progression and scoring rules for the tournament state.
//!
//! Every operation either applies completely or returns an [`EngineError`]
//! without touching the state. Persisting the result is the controller's job.

use crate::model::types::{
    CurrentQuestion, FINAL_GROUP_ID, GroupComplete, GroupState, GroupWinner, Leader, Round, Stage,
    TeamSlot, TournamentState,
};
use crate::repository::QuestionRepository;
use log::info;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Group {0} is already in progress. Please complete it first.")]
    GroupInProgress(u32),
    #[error("Group {0} not found")]
    GroupNotFound(u32),
    #[error("Team {team} not found in group {group_id}")]
    TeamNotFound { group_id: u32, team: TeamSlot },
    #[error("{team} already scored round {round} question {}", .question + 1)]
    AlreadyScored {
        team: TeamSlot,
        round: Round,
        question: usize,
    },
    #[error("No final round is available")]
    FinalUnavailable,
    #[error("Group {0} has not been started")]
    NoCurrentGroup(u32),
}

/// Which duplicate-award rule an award is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorePolicy {
    /// One award per team per question. A repeat for the same round and
    /// question is rejected.
    OncePerQuestion,
    /// Any number of awards; deltas accumulate.
    Unrestricted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreAward {
    pub group_id: u32,
    pub team: TeamSlot,
    pub round: Round,
    pub delta: i32,
    /// Question the award is for. Under `OncePerQuestion` this defaults to
    /// the group's current question.
    pub question_index: Option<usize>,
}

/// Where a `next_question` call ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Question { round: Round, index: usize },
    NextRound { round: Round, leader: Option<Leader> },
    Completed(GroupComplete),
    /// Already at the end of a completed group; nothing changed.
    AlreadyCompleted,
}

impl TournamentState {
    /// Start `group_id` and make it current. The final's state is created on
    /// first start.
    pub fn start_group(
        &mut self,
        repository: &QuestionRepository,
        group_id: u32,
    ) -> Result<(), EngineError> {
        if let Some(other) = self
            .groups
            .iter()
            .find(|g| g.group_id != group_id && g.is_in_progress())
        {
            return Err(EngineError::GroupInProgress(other.group_id));
        }

        let index = match self.groups.iter().position(|g| g.group_id == group_id) {
            Some(index) => index,
            None => {
                self.groups.push(synthesize_group(repository, group_id)?);
                self.groups.len() - 1
            }
        };

        let group = &mut self.groups[index];
        if !group.is_started {
            info!("Starting group {group_id}");
            group.is_started = true;
        }
        if group.is_final() {
            self.current_stage = Stage::Final;
        }
        self.current_group = group_id;
        Ok(())
    }

    /// Point the console at another group without touching its progress.
    pub fn switch_group(&mut self, group_id: u32) -> Result<(), EngineError> {
        if self.group(group_id).is_none() {
            return Err(EngineError::GroupNotFound(group_id));
        }
        self.current_group = group_id;
        Ok(())
    }

    pub fn next_question(
        &mut self,
        repository: &QuestionRepository,
    ) -> Result<Advance, EngineError> {
        let group_id = self.current_group;
        let group = self
            .group_mut(group_id)
            .ok_or(EngineError::NoCurrentGroup(group_id))?;
        let round = group.current_round;
        let len = repository
            .round_len(group_id, round)
            .ok_or(EngineError::GroupNotFound(group_id))?;

        if group.current_question + 1 < len {
            group.current_question += 1;
            return Ok(Advance::Question {
                round,
                index: group.current_question,
            });
        }

        if let Some(next) = round.next()
            && !group.is_final()
        {
            group.current_round = next;
            group.current_question = 0;
            return Ok(Advance::NextRound {
                round: next,
                leader: group.leader().map(Leader::from),
            });
        }

        if group.is_completed {
            return Ok(Advance::AlreadyCompleted);
        }

        self.complete_group(repository, group_id)
            .map(Advance::Completed)
            .ok_or(EngineError::NoCurrentGroup(group_id))
    }

    /// Step back one question. Returns whether the position moved; the
    /// first question of a group is a floor.
    pub fn previous_question(
        &mut self,
        repository: &QuestionRepository,
    ) -> Result<bool, EngineError> {
        let group_id = self.current_group;
        let group = self
            .group_mut(group_id)
            .ok_or(EngineError::NoCurrentGroup(group_id))?;

        if group.current_question > 0 {
            group.current_question -= 1;
            return Ok(true);
        }

        if let Some(previous) = group.current_round.previous()
            && !group.is_final()
        {
            let len = repository
                .round_len(group_id, previous)
                .ok_or(EngineError::GroupNotFound(group_id))?;
            group.current_round = previous;
            group.current_question = len.saturating_sub(1);
            return Ok(true);
        }

        Ok(false)
    }

    pub fn award_score(
        &mut self,
        award: ScoreAward,
        policy: ScorePolicy,
    ) -> Result<(), EngineError> {
        let group = self
            .group_mut(award.group_id)
            .ok_or(EngineError::GroupNotFound(award.group_id))?;
        let current_question = group.current_question;
        let team = group
            .team_mut(award.team)
            .ok_or(EngineError::TeamNotFound {
                group_id: award.group_id,
                team: award.team,
            })?;

        match policy {
            ScorePolicy::OncePerQuestion => {
                let question = award.question_index.unwrap_or(current_question);
                if team.has_scored(award.round, question) {
                    return Err(EngineError::AlreadyScored {
                        team: award.team,
                        round: award.round,
                        question,
                    });
                }
                team.apply_delta(award.round, award.delta);
                team.mark_scored(award.round, question);
            }
            ScorePolicy::Unrestricted => {
                team.apply_delta(award.round, award.delta);
                if let Some(question) = award.question_index {
                    team.mark_scored(award.round, question);
                }
            }
        }
        Ok(())
    }

    /// One point for the current question, at most once per team.
    pub fn award_point(
        &mut self,
        group_id: u32,
        team: TeamSlot,
        round: Round,
    ) -> Result<(), EngineError> {
        self.award_score(
            ScoreAward {
                group_id,
                team,
                round,
                delta: 1,
                question_index: None,
            },
            ScorePolicy::OncePerQuestion,
        )
    }

    pub fn adjust_score(
        &mut self,
        group_id: u32,
        team: TeamSlot,
        round: Round,
        delta: i32,
        question_index: Option<usize>,
    ) -> Result<(), EngineError> {
        self.award_score(
            ScoreAward {
                group_id,
                team,
                round,
                delta,
                question_index,
            },
            ScorePolicy::Unrestricted,
        )
    }

    /// Take one point back from a round and forget the last award.
    pub fn revoke_score(
        &mut self,
        group_id: u32,
        team: TeamSlot,
        round: Round,
    ) -> Result<(), EngineError> {
        let team_score = self
            .group_mut(group_id)
            .ok_or(EngineError::GroupNotFound(group_id))?
            .team_mut(team)
            .ok_or(EngineError::TeamNotFound { group_id, team })?;
        team_score.apply_delta(round, -1);
        team_score.clear_scored_marker();
        Ok(())
    }

    pub fn start_final(&mut self, repository: &QuestionRepository) -> Result<(), EngineError> {
        if !repository.has_final() {
            return Err(EngineError::FinalUnavailable);
        }
        if self.group(FINAL_GROUP_ID).is_none() {
            info!("Creating final stage");
        }
        self.start_group(repository, FINAL_GROUP_ID)
    }

    pub fn update_team_name(
        &mut self,
        group_id: u32,
        team: TeamSlot,
        name: &str,
    ) -> Result<(), EngineError> {
        let team_score = self
            .group_mut(group_id)
            .ok_or(EngineError::GroupNotFound(group_id))?
            .team_mut(team)
            .ok_or(EngineError::TeamNotFound { group_id, team })?;
        let name = name.trim();
        team_score.school_name = (!name.is_empty()).then(|| name.to_string());
        Ok(())
    }

    /// Put a group back to its unstarted state, keeping school names, and
    /// drop its recorded winner.
    pub fn reset_group(&mut self, group_id: u32) -> Result<(), EngineError> {
        let group = self
            .group_mut(group_id)
            .ok_or(EngineError::GroupNotFound(group_id))?;

        let mut fresh = GroupState::new(group_id, group.group_name.clone());
        for team in &mut fresh.teams {
            team.school_name = group
                .team(team.team_name)
                .and_then(|t| t.school_name.clone());
        }
        *group = fresh;

        self.group_winners.retain(|w| w.group_id != group_id);
        info!("Reset group {group_id}");
        Ok(())
    }

    /// Where the current group stands, with the question to show.
    pub fn current_question(&self, repository: &QuestionRepository) -> Option<CurrentQuestion> {
        let group = self.current()?;
        let total = repository.round_len(group.group_id, group.current_round)?;
        let last_round = group.is_final() || group.current_round == Round::Open;
        Some(CurrentQuestion {
            group_id: group.group_id,
            round: group.current_round,
            index: group.current_question,
            total,
            is_last: last_round && group.current_question + 1 >= total,
            question: repository.question_at(
                group.group_id,
                group.current_round,
                group.current_question,
            ),
        })
    }

    /// Mark a group finished, record its winner once, and build the
    /// announcement. The final's winner is kept on its group state only.
    fn complete_group(
        &mut self,
        repository: &QuestionRepository,
        group_id: u32,
    ) -> Option<GroupComplete> {
        let group = self.group_mut(group_id)?;
        let winner = group.leader()?.clone();
        group.is_completed = true;
        group.winner = Some(winner.team_name);
        let is_final = group.is_final();

        if !is_final && !self.group_winners.iter().any(|w| w.group_id == group_id) {
            self.group_winners.push(GroupWinner {
                group_id,
                winner: winner.team_name,
                school_name: winner.school_name.clone(),
            });
        }

        let all_groups_complete = repository.groups.iter().all(|g| {
            self.group_winners
                .iter()
                .any(|w| w.group_id == g.group_id)
        });

        info!(
            "Group {group_id} complete, winner {} with {} points",
            winner.display_name(),
            winner.total_score
        );
        Some(GroupComplete {
            group_id,
            winner: winner.team_name,
            winner_name: winner.display_name(),
            score: winner.total_score,
            is_final,
            all_groups_complete,
        })
    }
}

fn synthesize_group(
    repository: &QuestionRepository,
    group_id: u32,
) -> Result<GroupState, EngineError> {
    if group_id == FINAL_GROUP_ID {
        if !repository.has_final() {
            return Err(EngineError::FinalUnavailable);
        }
        return Ok(GroupState::new(FINAL_GROUP_ID, Some("Final".to_string())));
    }
    repository
        .group(group_id)
        .map(|g| GroupState::new(group_id, g.name.clone()))
        .ok_or(EngineError::GroupNotFound(group_id))
}
