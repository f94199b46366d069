use crate::engine::{Advance, EngineError, ScoreAward, ScorePolicy};
use crate::initializer;
use crate::model::types::{
    GroupComplete, Round, Snapshot, TeamSlot, TournamentState,
};
use crate::persistence::PersistenceClient;
use crate::repository::QuestionRepository;
use log::{error, info, warn};

/// The only write path into the tournament. Every accepted intent is applied
/// to the in-memory state and then written to the store as a whole.
pub struct TournamentController {
    repository: QuestionRepository,
    state: TournamentState,
    store: PersistenceClient,
    group_complete: Option<GroupComplete>,
}

impl TournamentController {
    /// Resume the stored tournament, or start a fresh one if there is none.
    pub fn open(repository: QuestionRepository, store: PersistenceClient) -> Self {
        let state = match store.load() {
            Some(state) => {
                info!("Resuming saved tournament (current group {})", state.current_group);
                state
            }
            None => initializer::initialize(&repository, &store),
        };
        Self {
            repository,
            state,
            store,
            group_complete: None,
        }
    }

    pub fn state(&self) -> &TournamentState {
        &self.state
    }

    pub fn repository(&self) -> &QuestionRepository {
        &self.repository
    }

    pub fn group_complete(&self) -> Option<&GroupComplete> {
        self.group_complete.as_ref()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            group_complete: self.group_complete.clone(),
            current_question: self.state.current_question(&self.repository),
        }
    }

    /// Swap in a reloaded question catalog, keeping tournament progress.
    pub fn replace_repository(&mut self, repository: QuestionRepository) {
        self.repository = repository;
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.state) {
            error!("Failed to save tournament state: {e:#}");
        }
    }

    /// Run `op` against the state; persist only if it was accepted.
    fn apply<T>(
        &mut self,
        op: impl FnOnce(&mut TournamentState, &QuestionRepository) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        match op(&mut self.state, &self.repository) {
            Ok(value) => {
                self.persist();
                Ok(value)
            }
            Err(e) => {
                warn!("Rejected console intent: {e}");
                Err(e)
            }
        }
    }

    pub fn start_group(&mut self, group_id: u32) -> Result<(), EngineError> {
        self.apply(|state, repo| state.start_group(repo, group_id))
    }

    pub fn switch_group(&mut self, group_id: u32) -> Result<(), EngineError> {
        self.apply(|state, _| state.switch_group(group_id))
    }

    /// Switch to a group, starting it first if it has not been started.
    pub fn select_group(&mut self, group_id: u32) -> Result<(), EngineError> {
        match self.state.group(group_id).map(|g| g.is_started) {
            Some(true) => self.switch_group(group_id),
            Some(false) => self.start_group(group_id),
            None => {
                warn!("Rejected console intent: group {group_id} not found");
                Err(EngineError::GroupNotFound(group_id))
            }
        }
    }

    pub fn next_question(&mut self) -> Result<Advance, EngineError> {
        let advance = self.apply(|state, repo| state.next_question(repo))?;
        if let Advance::Completed(done) = &advance {
            self.group_complete = Some(done.clone());
        }
        Ok(advance)
    }

    pub fn previous_question(&mut self) -> Result<bool, EngineError> {
        self.apply(|state, repo| state.previous_question(repo))
    }

    pub fn award_score(&mut self, award: ScoreAward, policy: ScorePolicy) -> Result<(), EngineError> {
        self.apply(|state, _| state.award_score(award, policy))
    }

    pub fn award_point(
        &mut self,
        group_id: u32,
        team: TeamSlot,
        round: Round,
    ) -> Result<(), EngineError> {
        self.apply(|state, _| state.award_point(group_id, team, round))
    }

    pub fn adjust_score(
        &mut self,
        group_id: u32,
        team: TeamSlot,
        round: Round,
        delta: i32,
        question_index: Option<usize>,
    ) -> Result<(), EngineError> {
        self.apply(|state, _| state.adjust_score(group_id, team, round, delta, question_index))
    }

    pub fn revoke_score(
        &mut self,
        group_id: u32,
        team: TeamSlot,
        round: Round,
    ) -> Result<(), EngineError> {
        self.apply(|state, _| state.revoke_score(group_id, team, round))
    }

    pub fn start_final(&mut self) -> Result<(), EngineError> {
        self.apply(|state, repo| state.start_final(repo))
    }

    pub fn update_team_name(
        &mut self,
        group_id: u32,
        team: TeamSlot,
        name: &str,
    ) -> Result<(), EngineError> {
        self.apply(|state, _| state.update_team_name(group_id, team, name))
    }

    pub fn reset_group(&mut self, group_id: u32) -> Result<(), EngineError> {
        self.apply(|state, _| state.reset_group(group_id))?;
        if self
            .group_complete
            .as_ref()
            .is_some_and(|n| n.group_id == group_id)
        {
            self.group_complete = None;
        }
        Ok(())
    }

    /// Throw away the stored tournament and start over from the catalog.
    /// School names are lost.
    pub fn reset_all(&mut self) {
        info!("Resetting the whole tournament");
        self.store.clear();
        self.state = initializer::initialize(&self.repository, &self.store);
        self.group_complete = None;
    }

    pub fn dismiss_group_complete(&mut self) {
        self.group_complete = None;
    }
}
