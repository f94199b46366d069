use crate::model::types::{DEFAULT_GROUP_ID, GroupState, Stage, TournamentState};
use crate::persistence::PersistenceClient;
use crate::repository::QuestionRepository;
use log::{error, info};

/// A brand new tournament: every group at round 1, question 0, all scores
/// zero, nothing started. The final is not part of it until it is started.
pub fn fresh_state(repository: &QuestionRepository) -> TournamentState {
    TournamentState {
        current_stage: Stage::Groups,
        current_group: repository
            .groups
            .first()
            .map(|g| g.group_id)
            .unwrap_or(DEFAULT_GROUP_ID),
        groups: repository
            .groups
            .iter()
            .map(|g| GroupState::new(g.group_id, g.name.clone()))
            .collect(),
        group_winners: Vec::new(),
        finalists: Vec::new(),
    }
}

/// Build a fresh tournament and seed the store with it so an immediate
/// restart resumes the same tournament.
pub fn initialize(repository: &QuestionRepository, store: &PersistenceClient) -> TournamentState {
    let state = fresh_state(repository);
    info!(
        "Initialized tournament with {} groups",
        state.groups.len()
    );
    if let Err(e) = store.save(&state) {
        error!("Failed to seed tournament state: {e:#}");
    }
    state
}
