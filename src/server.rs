use crate::{
    controller::TournamentController,
    engine::{Advance, EngineError},
    heartbeat::HeartbeatState,
    model::{
        client_message::ConsoleAction,
        server_message::{ServerMessage, send_msg},
    },
    persistence::PersistenceClient,
    repository::{QuestionRepository, RepositoryError},
};
use futures_util::{SinkExt, StreamExt};
use log::*;
use std::{mem, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{Mutex, mpsc},
};
use tokio_retry::{Retry, strategy::ExponentialBackoff};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error, Message, Result},
};

pub type Tx = mpsc::UnboundedSender<Message>;
pub type Rx = mpsc::UnboundedReceiver<Message>;

/// Where the question catalog is read from, kept for reloads.
#[derive(Debug, Clone)]
pub struct QuestionSource {
    pub questions_path: PathBuf,
    pub final_questions_path: Option<PathBuf>,
    pub media_base_url: String,
}

impl QuestionSource {
    pub fn load(&self) -> Result<QuestionRepository, RepositoryError> {
        QuestionRepository::load(
            &self.questions_path,
            self.final_questions_path.as_deref(),
            &self.media_base_url,
        )
    }

    /// Load with a few quick retries, for sources still being written at startup.
    pub async fn load_with_retry(&self) -> Result<QuestionRepository, RepositoryError> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(100)
            .max_delay(Duration::from_secs(2))
            .take(3);
        let source = self;
        Retry::spawn(strategy, move || async move {
            source.load().inspect_err(|e| warn!("Loading questions failed: {e}"))
        })
        .await
    }
}

/// The console is blocked in `Loading` until a question catalog is available.
pub enum Console {
    Loading {
        reason: String,
        store: PersistenceClient,
    },
    Ready(TournamentController),
}

impl Console {
    /// First message for a newly connected console.
    pub fn greeting(&self) -> ServerMessage {
        match self {
            Console::Loading { reason, .. } => ServerMessage::Loading {
                reason: reason.clone(),
            },
            Console::Ready(controller) => ready_message(controller),
        }
    }

    fn handle(&mut self, action: ConsoleAction, source: &QuestionSource) -> ActionResult {
        match self {
            Console::Ready(controller) => process_action(action, controller, source),
            Console::Loading { reason, store } => {
                if !matches!(action, ConsoleAction::ReloadQuestions) {
                    return ActionResult::reply(ServerMessage::Loading {
                        reason: reason.clone(),
                    });
                }
                match source.load() {
                    Ok(repository) => {
                        let store = mem::replace(store, PersistenceClient::disabled());
                        let controller = TournamentController::open(repository, store);
                        let msg = ready_message(&controller);
                        *self = Console::Ready(controller);
                        info!("Questions loaded, console ready");
                        ActionResult::broadcast(vec![msg])
                    }
                    Err(e) => {
                        warn!("Reloading questions failed: {e}");
                        *reason = e.to_string();
                        ActionResult::reply(ServerMessage::Loading {
                            reason: reason.clone(),
                        })
                    }
                }
            }
        }
    }
}

pub struct AppState {
    pub console: Mutex<Console>,
    consoles: Mutex<Vec<Tx>>,
    source: QuestionSource,
    ping_interval: Duration,
    pong_timeout: Duration,
}

impl AppState {
    pub fn new(
        console: Console,
        source: QuestionSource,
        ping_interval: Duration,
        pong_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            console: Mutex::new(console),
            consoles: Mutex::new(Vec::new()),
            source,
            ping_interval,
            pong_timeout,
        })
    }

    async fn broadcast(&self, messages: &[ServerMessage]) {
        let consoles = self.consoles.lock().await;
        for tx in consoles.iter() {
            for msg in messages {
                send_msg(tx, msg);
            }
        }
    }
}

fn ready_message(controller: &TournamentController) -> ServerMessage {
    ServerMessage::ConsoleReady {
        questions: controller.repository().clone(),
        snapshot: controller.snapshot(),
    }
}

/// Messages produced by one intent: a reply for the sender and a broadcast
/// for every console.
struct ActionResult {
    reply: Option<ServerMessage>,
    broadcast: Vec<ServerMessage>,
}

impl ActionResult {
    fn reply(msg: ServerMessage) -> Self {
        Self {
            reply: Some(msg),
            broadcast: Vec::new(),
        }
    }

    fn broadcast(messages: Vec<ServerMessage>) -> Self {
        Self {
            reply: None,
            broadcast: messages,
        }
    }
}

/// Apply one intent to the controller. Runs under the console lock and does
/// not await.
fn process_action(
    action: ConsoleAction,
    controller: &mut TournamentController,
    source: &QuestionSource,
) -> ActionResult {
    let group_id = controller.state().current_group;

    let outcome: Result<Vec<ServerMessage>, EngineError> = match action {
        ConsoleAction::StartGroup { group_id } => controller.start_group(group_id).map(|_| vec![]),
        ConsoleAction::SelectGroup { group_id } => {
            controller.select_group(group_id).map(|_| vec![])
        }
        ConsoleAction::SwitchGroup { group_id } => {
            controller.switch_group(group_id).map(|_| vec![])
        }

        ConsoleAction::NextQuestion => controller.next_question().map(|advance| match advance {
            Advance::NextRound { round, leader } => vec![ServerMessage::RoundStarted {
                group_id,
                round,
                leader,
            }],
            Advance::Completed(notification) => {
                vec![ServerMessage::GroupComplete { notification }]
            }
            Advance::Question { .. } | Advance::AlreadyCompleted => vec![],
        }),
        ConsoleAction::PrevQuestion => controller.previous_question().map(|_| vec![]),

        ConsoleAction::AwardPoint {
            group_id,
            team,
            round,
        } => controller
            .award_point(group_id, team, round)
            .map(|_| vec![]),
        ConsoleAction::AdjustScore {
            group_id,
            team,
            round,
            delta,
            question_index,
        } => controller
            .adjust_score(group_id, team, round, delta, question_index)
            .map(|_| vec![]),
        ConsoleAction::RevokeScore {
            group_id,
            team,
            round,
        } => controller
            .revoke_score(group_id, team, round)
            .map(|_| vec![]),

        ConsoleAction::StartFinal => controller.start_final().map(|_| vec![]),

        ConsoleAction::UpdateTeamName {
            group_id,
            team,
            name,
        } => controller
            .update_team_name(group_id, team, &name)
            .map(|_| vec![]),

        ConsoleAction::ResetGroup { group_id } => controller.reset_group(group_id).map(|_| vec![]),
        ConsoleAction::ResetAll => {
            controller.reset_all();
            Ok(vec![])
        }

        ConsoleAction::DismissGroupComplete => {
            controller.dismiss_group_complete();
            Ok(vec![])
        }
        ConsoleAction::ReloadQuestions => {
            return match source.load() {
                Ok(repository) => {
                    controller.replace_repository(repository);
                    ActionResult::broadcast(vec![ready_message(controller)])
                }
                Err(e) => {
                    warn!("Reloading questions failed: {e}");
                    ActionResult::reply(ServerMessage::error(format!(
                        "Failed to reload questions: {e}"
                    )))
                }
            };
        }
    };

    match outcome {
        Ok(announcements) => {
            let mut broadcast = vec![ServerMessage::Snapshot {
                snapshot: controller.snapshot(),
            }];
            broadcast.extend(announcements);
            ActionResult::broadcast(broadcast)
        }
        Err(e) => ActionResult::reply(ServerMessage::error(e.to_string())),
    }
}

async fn process_console_message(text: &str, app_state: &Arc<AppState>, tx: &Tx) {
    // Parse before taking the lock
    let action = match serde_json::from_str::<ConsoleAction>(text) {
        Ok(action) => action,
        Err(e) => {
            warn!("Failed to parse message: {text}");
            warn!("Error: {e}");
            send_msg(tx, &ServerMessage::error(format!("Invalid message: {e}")));
            return;
        }
    };

    // Sent under the console lock so snapshots go out in apply order.
    // Lock order is console, then consoles, as in handle_connection.
    let mut console = app_state.console.lock().await;
    let result = console.handle(action, &app_state.source);

    if let Some(reply) = result.reply {
        send_msg(tx, &reply);
    }
    if !result.broadcast.is_empty() {
        app_state.broadcast(&result.broadcast).await;
    }
}

async fn accept_connection(peer: SocketAddr, stream: TcpStream, app_state: Arc<AppState>) {
    if let Err(e) = handle_connection(peer, stream, app_state).await {
        match e {
            Error::ConnectionClosed | Error::AlreadyClosed | Error::Protocol(_) => (),
            err => error!("Error processing connection: {err}"),
        }
    }
}

async fn handle_connection(
    peer: SocketAddr,
    stream: TcpStream,
    app_state: Arc<AppState>,
) -> Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("Console connected: {peer}");

    let (tx, mut rx): (Tx, Rx) = mpsc::unbounded_channel();
    {
        let console = app_state.console.lock().await;
        send_msg(&tx, &console.greeting());
        app_state.consoles.lock().await.push(tx.clone());
    }

    let (mut ws_write, mut ws_read) = ws_stream.split();
    let mut heartbeat = HeartbeatState::new(app_state.pong_timeout);
    let mut ping_interval = tokio::time::interval(app_state.ping_interval);

    loop {
        tokio::select! {
            Some(msg) = rx.recv() => {
                if ws_write.send(msg).await.is_err() {
                    break;
                }
            }

            msg_result = ws_read.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        let text = text.as_str();
                        if text.is_empty() {
                            warn!("Received empty message");
                            continue;
                        }
                        debug!("Received message: {text}");
                        process_console_message(text, &app_state, &tx).await;
                    }
                    Some(Ok(Message::Pong(_))) => heartbeat.record_pong(),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }

            _ = ping_interval.tick() => {
                if !heartbeat.is_alive() {
                    info!("Console {peer} timed out (no pong received)");
                    break;
                }
                if ws_write.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }
        }
    }

    info!("Console disconnected: {peer}");
    app_state
        .consoles
        .lock()
        .await
        .retain(|other| !other.same_channel(&tx));
    Ok(())
}

pub async fn start_ws_server(listener: TcpListener, app_state: Arc<AppState>) {
    match listener.local_addr() {
        Ok(addr) => info!("Listening for consoles on: {addr}"),
        Err(e) => warn!("Listening for consoles on an unknown address: {e}"),
    }

    while let Ok((stream, peer)) = listener.accept().await {
        tokio::spawn(accept_connection(peer, stream, app_state.clone()));
    }
}
