use crate::{GROUP_IDS, TestClient, TestServer};
use quiz_host::model::client_message::ConsoleAction;
use quiz_host::model::types::{FINAL_GROUP_ID, Round, Stage, TeamSlot};

#[tokio::test]
async fn only_one_group_runs_at_a_time() {
    let server = TestServer::start().await;
    let (mut console, _, _) = TestClient::connect_console(&server).await;
    console.act(ConsoleAction::StartGroup { group_id: 1 }).await;

    console
        .send_action(ConsoleAction::StartGroup { group_id: 3 })
        .await;
    assert_eq!(
        console.recv_error().await,
        "Group 1 is already in progress. Please complete it first."
    );

    console.finish_group().await;
    let snapshot = console.act(ConsoleAction::StartGroup { group_id: 3 }).await;
    assert_eq!(snapshot.state.current_group, 3);
    assert!(snapshot.state.group(3).unwrap().is_started);
}

#[tokio::test]
async fn switching_groups_keeps_their_progress() {
    let server = TestServer::start().await;
    let (mut console, _, _) = TestClient::connect_console(&server).await;
    console.act(ConsoleAction::StartGroup { group_id: 1 }).await;
    console.act(ConsoleAction::NextQuestion).await;

    let snapshot = console.act(ConsoleAction::SwitchGroup { group_id: 2 }).await;
    assert_eq!(snapshot.state.current_group, 2);
    assert!(!snapshot.state.group(2).unwrap().is_started);
    let view = snapshot.current_question.unwrap();
    assert_eq!(view.question.unwrap().prompt(), "G2 choice 0");

    let snapshot = console.act(ConsoleAction::SwitchGroup { group_id: 1 }).await;
    let view = snapshot.current_question.unwrap();
    assert_eq!(view.group_id, 1);
    assert_eq!(view.index, 1);

    console
        .send_action(ConsoleAction::SwitchGroup { group_id: 8 })
        .await;
    assert_eq!(console.recv_error().await, "Group 8 not found");
}

#[tokio::test]
async fn select_group_starts_or_switches() {
    let server = TestServer::start().await;
    let (mut console, _, _) = TestClient::connect_console(&server).await;

    let snapshot = console.act(ConsoleAction::SelectGroup { group_id: 2 }).await;
    assert_eq!(snapshot.state.current_group, 2);
    assert!(snapshot.state.group(2).unwrap().is_started);

    console.act(ConsoleAction::SwitchGroup { group_id: 1 }).await;
    let snapshot = console.act(ConsoleAction::SelectGroup { group_id: 2 }).await;
    assert_eq!(snapshot.state.current_group, 2);

    console
        .send_action(ConsoleAction::SelectGroup { group_id: 9 })
        .await;
    assert_eq!(console.recv_error().await, "Group 9 not found");
}

#[tokio::test]
async fn group_winners_lead_into_the_final() {
    let server = TestServer::start().await;
    let (mut console, _, _) = TestClient::connect_console(&server).await;

    let leaders = [TeamSlot::Beta, TeamSlot::Alpha, TeamSlot::Delta];
    for (group_id, team) in GROUP_IDS.into_iter().zip(leaders) {
        console.act(ConsoleAction::StartGroup { group_id }).await;
        console
            .act(ConsoleAction::AdjustScore {
                group_id,
                team,
                round: Round::Choice,
                delta: 2,
                question_index: None,
            })
            .await;
        let notification = console.finish_group().await;
        assert_eq!(notification.winner, team);
        assert_eq!(notification.all_groups_complete, group_id == 3);
    }

    let snapshot = console.act(ConsoleAction::StartFinal).await;
    assert_eq!(snapshot.state.current_stage, Stage::Final);
    assert_eq!(snapshot.state.current_group, FINAL_GROUP_ID);
    let winners: Vec<_> = snapshot.state.group_winners.iter().map(|w| w.winner).collect();
    assert_eq!(winners, vec![TeamSlot::Beta, TeamSlot::Alpha, TeamSlot::Delta]);

    let view = snapshot.current_question.unwrap();
    assert_eq!(view.round, Round::Open);
    assert_eq!(view.total, 2);
    assert_eq!(view.question.unwrap().prompt(), "Final 0");

    console
        .act(ConsoleAction::AwardPoint {
            group_id: FINAL_GROUP_ID,
            team: TeamSlot::Gamma,
            round: Round::Open,
        })
        .await;
    let notification = console.finish_group().await;
    assert!(notification.is_final);
    assert_eq!(notification.group_id, FINAL_GROUP_ID);
    assert_eq!(notification.winner, TeamSlot::Gamma);

    let snapshot = console.act(ConsoleAction::DismissGroupComplete).await;
    assert_eq!(snapshot.state.group_winners.len(), 3);
    assert_eq!(
        snapshot.state.group(FINAL_GROUP_ID).unwrap().winner,
        Some(TeamSlot::Gamma)
    );
}

#[tokio::test]
async fn reset_group_clears_progress_but_keeps_school_names() {
    let server = TestServer::start().await;
    let (mut console, _, _) = TestClient::connect_console(&server).await;
    console.act(ConsoleAction::StartGroup { group_id: 1 }).await;
    console
        .act(ConsoleAction::UpdateTeamName {
            group_id: 1,
            team: TeamSlot::Delta,
            name: "Lakeview".to_string(),
        })
        .await;
    console
        .act(ConsoleAction::AwardPoint {
            group_id: 1,
            team: TeamSlot::Delta,
            round: Round::Choice,
        })
        .await;
    console.finish_group().await;

    let snapshot = console.act(ConsoleAction::ResetGroup { group_id: 1 }).await;
    assert!(snapshot.group_complete.is_none());
    assert!(snapshot.state.group_winners.is_empty());

    let group = snapshot.state.group(1).unwrap();
    assert!(!group.is_started);
    assert!(!group.is_completed);
    assert_eq!(group.winner, None);
    assert_eq!(group.current_round, Round::Choice);
    assert_eq!(group.current_question, 0);
    let delta = group.team(TeamSlot::Delta).unwrap();
    assert_eq!(delta.total_score, 0);
    assert_eq!(delta.school_name.as_deref(), Some("Lakeview"));
}

#[tokio::test]
async fn reset_all_starts_a_fresh_tournament() {
    let server = TestServer::start().await;
    let (mut console, _, _) = TestClient::connect_console(&server).await;
    console.act(ConsoleAction::StartGroup { group_id: 2 }).await;
    console
        .act(ConsoleAction::UpdateTeamName {
            group_id: 2,
            team: TeamSlot::Alpha,
            name: "Northside".to_string(),
        })
        .await;
    console.finish_group().await;

    let snapshot = console.act(ConsoleAction::ResetAll).await;
    assert_eq!(snapshot.state.current_stage, Stage::Groups);
    assert_eq!(snapshot.state.current_group, 1);
    assert!(snapshot.group_complete.is_none());
    assert!(snapshot.state.group_winners.is_empty());
    assert!(snapshot.state.groups.iter().all(|g| !g.is_started));
    assert_eq!(
        snapshot.state.group(2).unwrap().team(TeamSlot::Alpha).unwrap().school_name,
        None
    );
}
