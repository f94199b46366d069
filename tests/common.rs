use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use quiz_host::controller::TournamentController;
use quiz_host::fixtures;
use quiz_host::model::client_message::ConsoleAction;
use quiz_host::model::server_message::ServerMessage;
use quiz_host::model::types::{GroupComplete, Snapshot};
use quiz_host::persistence::PersistenceClient;
use quiz_host::repository::QuestionRepository;
use quiz_host::server::{AppState, Console, QuestionSource, start_ws_server};
use serde::{Serialize, de::DeserializeOwned};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};


/// Groups every test server is seeded with.
pub const GROUP_IDS: [u32; 3] = [1, 2, 3];
/// Questions per round in every seeded group.
pub const ROUND_LEN: usize = 2;

pub struct TestServer {
    pub ws_port: u16,
    pub app_state: Arc<AppState>,
    dir: PathBuf,
    _temp_dir: Option<TempDir>,
}

impl TestServer {
    /// Three groups of two questions per round, plus a two question final.
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().unwrap();
        write_questions(temp_dir.path());
        let mut server = Self::start_in(temp_dir.path()).await;
        server._temp_dir = Some(temp_dir);
        server
    }

    /// No questions file yet, so the console comes up loading.
    pub async fn start_without_questions() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let mut server = Self::start_in(temp_dir.path()).await;
        server._temp_dir = Some(temp_dir);
        server
    }

    /// Start against an existing directory, reusing whatever tournament is
    /// stored there.
    pub async fn start_in(dir: &Path) -> Self {
        let source = QuestionSource {
            questions_path: dir.join("questions.json"),
            final_questions_path: None,
            media_base_url: "https://media.example.com/".to_string(),
        };
        let store = PersistenceClient::new(Some(dir.join("state")));
        let console = match source.load() {
            Ok(repository) => Console::Ready(TournamentController::open(repository, store)),
            Err(e) => Console::Loading {
                reason: e.to_string(),
                store,
            },
        };
        let app_state = AppState::new(
            console,
            source,
            Duration::from_secs(5),
            Duration::from_secs(10),
        );

        let ws_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ws_port = ws_listener.local_addr().unwrap().port();
        tokio::spawn(start_ws_server(ws_listener, app_state.clone()));

        // Give the server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Self {
            ws_port,
            app_state,
            dir: dir.to_path_buf(),
            _temp_dir: None,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.ws_port)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_questions(&self) {
        write_questions(&self.dir);
    }
}

pub fn write_questions(dir: &Path) {
    std::fs::write(
        dir.join("questions.json"),
        fixtures::questions_document(&GROUP_IDS, ROUND_LEN, true),
    )
    .unwrap();
}

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct TestClient {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
}

impl TestClient {
    pub async fn connect(url: &str) -> Self {
        let (ws_stream, _) = connect_async(url).await.expect("Failed to connect");
        let (write, read) = ws_stream.split();
        Self { write, read }
    }

    /// Connect and consume the `ConsoleReady` greeting.
    pub async fn connect_console(server: &TestServer) -> (Self, QuestionRepository, Snapshot) {
        let mut client = Self::connect(&server.ws_url()).await;
        match client.recv_json::<ServerMessage>().await {
            ServerMessage::ConsoleReady {
                questions,
                snapshot,
            } => (client, questions, snapshot),
            other => panic!("Expected ConsoleReady, got {other:?}"),
        }
    }

    pub async fn send_json<T: Serialize>(&mut self, msg: &T) {
        let json = serde_json::to_string(msg).unwrap();
        self.write.send(Message::Text(json.into())).await.unwrap();
    }

    pub async fn send_raw_text(&mut self, text: &str) {
        self.write
            .send(Message::Text(text.to_string().into()))
            .await
            .unwrap();
    }

    pub async fn send_action(&mut self, action: ConsoleAction) {
        self.send_json(&action).await;
    }

    pub async fn recv_json<T: DeserializeOwned>(&mut self) -> T {
        let timeout_duration = Duration::from_secs(2);
        loop {
            match tokio::time::timeout(timeout_duration, self.read.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => {
                    return serde_json::from_str(text.as_str()).unwrap();
                }
                // Heartbeat frames
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(e))) => panic!("WebSocket error: {e}"),
                Ok(None) => panic!("WebSocket stream closed"),
                Err(_) => {
                    panic!("Timeout waiting for message from server (waited {timeout_duration:?})")
                }
            }
        }
    }

    pub async fn recv_snapshot(&mut self) -> Snapshot {
        match self.recv_json::<ServerMessage>().await {
            ServerMessage::Snapshot { snapshot } => snapshot,
            other => panic!("Expected Snapshot, got {other:?}"),
        }
    }

    pub async fn recv_error(&mut self) -> String {
        match self.recv_json::<ServerMessage>().await {
            ServerMessage::Error { message } => message,
            other => panic!("Expected Error, got {other:?}"),
        }
    }

    /// Send an intent that should succeed and return the republished state.
    pub async fn act(&mut self, action: ConsoleAction) -> Snapshot {
        self.send_action(action).await;
        self.recv_snapshot().await
    }

    /// Step through the current group to its end, consuming round
    /// announcements, and return the completion notice.
    pub async fn finish_group(&mut self) -> GroupComplete {
        loop {
            let snapshot = self.act(ConsoleAction::NextQuestion).await;
            let group = snapshot.state.current().unwrap();
            if group.is_completed {
                return match self.recv_json::<ServerMessage>().await {
                    ServerMessage::GroupComplete { notification } => notification,
                    other => panic!("Expected GroupComplete, got {other:?}"),
                };
            }
            if group.current_question == 0 {
                match self.recv_json::<ServerMessage>().await {
                    ServerMessage::RoundStarted { .. } => {}
                    other => panic!("Expected RoundStarted, got {other:?}"),
                }
            }
        }
    }

    /// Fail if anything other than heartbeat frames arrives within `wait`.
    pub async fn expect_silence(&mut self, wait: Duration) {
        loop {
            match tokio::time::timeout(wait, self.read.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => panic!("Unexpected message: {text}"),
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(e))) => panic!("WebSocket error: {e}"),
                Ok(None) => panic!("WebSocket stream closed"),
                Err(_) => return,
            }
        }
    }
}
