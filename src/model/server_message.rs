use log::{debug, error};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;

use crate::model::types::{GroupComplete, Leader, Round, Snapshot};
use crate::repository::QuestionRepository;
use crate::server::Tx;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ServerMessage {
    /// First message on a connection once questions are available.
    #[serde(rename_all = "camelCase")]
    ConsoleReady {
        questions: QuestionRepository,
        snapshot: Snapshot,
    },
    /// Questions are not available; no tournament can be driven yet.
    #[serde(rename_all = "camelCase")]
    Loading { reason: String },
    #[serde(rename_all = "camelCase")]
    Snapshot { snapshot: Snapshot },
    #[serde(rename_all = "camelCase")]
    GroupComplete { notification: GroupComplete },
    #[serde(rename_all = "camelCase")]
    RoundStarted {
        group_id: u32,
        round: Round,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        leader: Option<Leader>,
    },
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

pub fn send_msg(tx: &Tx, msg: &ServerMessage) {
    debug!("Sending server message: {msg:?}");
    let msg = serde_json::to_string(msg).unwrap_or_else(|e| {
        format!("Catastrophic! Serde error when trying to serialize serverside: {e}")
    });
    tx.send(Message::text(msg)).unwrap_or_else(|e| {
        error!("Sending server message through channel failed: {e}");
    })
}
