//! Read-only question catalog, normalized from the source documents.
//!
//! The source groups each round's questions into named sections. Sections
//! carry no meaning for progression, so they are concatenated in source order
//! into one sequence per round. The optional final is a flat list of open
//! questions and is played as a single round 3.

use crate::model::types::{
    ChoiceQuestion, FINAL_GROUP_ID, MediaKind, OpenQuestion, Question, RecognitionQuestion, Round,
};
use log::info;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("question source is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("group {group}, round {round}, question {index}: {source}")]
    Question {
        group: u32,
        round: u8,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("group {group}: {reason}")]
    InvalidGroup { group: u32, reason: String },
}

// === Source documents ===

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    groups: Vec<RawGroup>,
    #[serde(default, rename = "final")]
    final_round: Option<Vec<RawOpen>>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    group_number: u32,
    #[serde(default)]
    name: Option<String>,
    rounds: Vec<RawRound>,
}

#[derive(Debug, Deserialize)]
struct RawRound {
    round_number: u8,
    #[serde(default)]
    sections: Vec<RawSection>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    questions: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    question: String,
    options: Vec<String>,
    answer: String,
    #[serde(default)]
    section: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRecognition {
    question: String,
    #[serde(rename = "type")]
    kind: MediaKind,
    url: String,
    answer: String,
}

#[derive(Debug, Deserialize)]
struct RawOpen {
    question: String,
    answer: String,
}

impl From<RawOpen> for OpenQuestion {
    fn from(raw: RawOpen) -> Self {
        OpenQuestion {
            prompt: raw.question,
            answer: raw.answer,
        }
    }
}

// === Normalized catalog ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupQuestions {
    pub group_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub choice: Vec<ChoiceQuestion>,
    pub recognition: Vec<RecognitionQuestion>,
    pub open: Vec<OpenQuestion>,
}

impl GroupQuestions {
    pub fn round_len(&self, round: Round) -> usize {
        match round {
            Round::Choice => self.choice.len(),
            Round::Recognition => self.recognition.len(),
            Round::Open => self.open.len(),
        }
    }

    pub fn question(&self, round: Round, index: usize) -> Option<Question> {
        match round {
            Round::Choice => self.choice.get(index).cloned().map(Question::Choice),
            Round::Recognition => self
                .recognition
                .get(index)
                .cloned()
                .map(Question::Recognition),
            Round::Open => self.open.get(index).cloned().map(Question::Open),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRepository {
    pub groups: Vec<GroupQuestions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_round: Option<Vec<OpenQuestion>>,
}

impl QuestionRepository {
    /// Read and normalize the source files. A separate final document, when
    /// given, replaces any final embedded in the main document.
    pub fn load(
        questions_path: &Path,
        final_path: Option<&Path>,
        media_base_url: &str,
    ) -> Result<Self, RepositoryError> {
        let main = read_source(questions_path)?;
        let final_doc = final_path.map(read_source).transpose()?;
        let repository = Self::from_json(&main, final_doc.as_deref(), media_base_url)?;
        info!(
            "Loaded {} groups from {} (final: {})",
            repository.groups.len(),
            questions_path.display(),
            if repository.has_final() { "yes" } else { "no" }
        );
        Ok(repository)
    }

    pub fn from_json(
        main: &str,
        final_doc: Option<&str>,
        media_base_url: &str,
    ) -> Result<Self, RepositoryError> {
        let document: RawDocument = serde_json::from_str(main)?;

        let mut seen = HashSet::new();
        let mut groups = Vec::with_capacity(document.groups.len());
        for raw in document.groups {
            if raw.group_number == FINAL_GROUP_ID {
                return Err(RepositoryError::InvalidGroup {
                    group: raw.group_number,
                    reason: "group number 0 is reserved for the final".to_string(),
                });
            }
            if !seen.insert(raw.group_number) {
                return Err(RepositoryError::InvalidGroup {
                    group: raw.group_number,
                    reason: "duplicate group number".to_string(),
                });
            }
            groups.push(normalize_group(raw, media_base_url)?);
        }

        let final_round = match final_doc {
            Some(text) => Some(serde_json::from_str::<Vec<RawOpen>>(text)?),
            None => document.final_round,
        }
        .map(|questions| questions.into_iter().map(OpenQuestion::from).collect());

        Ok(Self {
            groups,
            final_round,
        })
    }

    pub fn group(&self, group_id: u32) -> Option<&GroupQuestions> {
        self.groups.iter().find(|g| g.group_id == group_id)
    }

    pub fn has_final(&self) -> bool {
        self.final_round.is_some()
    }

    pub fn regular_group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of questions in `round` for a group, the final included.
    /// `None` when the group is unknown.
    pub fn round_len(&self, group_id: u32, round: Round) -> Option<usize> {
        if group_id == FINAL_GROUP_ID {
            let questions = self.final_round.as_ref()?;
            return Some(if round == Round::Open {
                questions.len()
            } else {
                0
            });
        }
        self.group(group_id).map(|g| g.round_len(round))
    }

    pub fn question_at(&self, group_id: u32, round: Round, index: usize) -> Option<Question> {
        if group_id == FINAL_GROUP_ID {
            if round != Round::Open {
                return None;
            }
            return self
                .final_round
                .as_ref()?
                .get(index)
                .cloned()
                .map(Question::Open);
        }
        self.group(group_id)?.question(round, index)
    }
}

fn read_source(path: &Path) -> Result<String, RepositoryError> {
    fs::read_to_string(path).map_err(|source| RepositoryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn normalize_group(raw: RawGroup, media_base_url: &str) -> Result<GroupQuestions, RepositoryError> {
    let group_id = raw.group_number;
    let mut group = GroupQuestions {
        group_id,
        name: raw.name,
        choice: Vec::new(),
        recognition: Vec::new(),
        open: Vec::new(),
    };
    let mut seen_rounds = HashSet::new();

    for round in raw.rounds {
        let number = round.round_number;
        let kind = Round::try_from(number)
            .map_err(|reason| RepositoryError::InvalidGroup { group: group_id, reason })?;
        if !seen_rounds.insert(kind) {
            return Err(RepositoryError::InvalidGroup {
                group: group_id,
                reason: format!("round {number} appears more than once"),
            });
        }

        let mut index = 0;
        for section in round.sections {
            for value in section.questions {
                match kind {
                    Round::Choice => {
                        let q: RawChoice = parse_question(value, group_id, number, index)?;
                        if q.options.len() < 2 {
                            return Err(RepositoryError::InvalidGroup {
                                group: group_id,
                                reason: format!(
                                    "round 1 question {index} needs at least two options"
                                ),
                            });
                        }
                        group.choice.push(ChoiceQuestion {
                            prompt: q.question,
                            options: q.options,
                            answer: q.answer,
                            category: q.section.or_else(|| section.section.clone()),
                        });
                    }
                    Round::Recognition => {
                        let q: RawRecognition = parse_question(value, group_id, number, index)?;
                        group.recognition.push(RecognitionQuestion {
                            prompt: q.question,
                            media_kind: q.kind,
                            media_url: resolve_media_url(media_base_url, &q.url),
                            answer: q.answer,
                        });
                    }
                    Round::Open => {
                        let q: RawOpen = parse_question(value, group_id, number, index)?;
                        group.open.push(q.into());
                    }
                }
                index += 1;
            }
        }
    }

    if let Some(missing) = Round::ALL.into_iter().find(|r| !seen_rounds.contains(r)) {
        return Err(RepositoryError::InvalidGroup {
            group: group_id,
            reason: format!("round {missing} is missing"),
        });
    }
    Ok(group)
}

fn parse_question<T: DeserializeOwned>(
    value: serde_json::Value,
    group: u32,
    round: u8,
    index: usize,
) -> Result<T, RepositoryError> {
    serde_json::from_value(value).map_err(|source| RepositoryError::Question {
        group,
        round,
        index,
        source,
    })
}

/// Root relative media paths at the serving base; absolute URLs pass through.
fn resolve_media_url(base: &str, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() || Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        raw.trim_start_matches('/')
    )
}
