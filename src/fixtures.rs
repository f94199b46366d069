//! Question documents for tests. Compiled only for tests and with the
//! `test-support` feature.

use crate::repository::QuestionRepository;
use serde_json::{Value, json};

/// A source document where every group has `round_len` questions per round.
/// The inline final, when present, has two questions.
pub fn questions_document(group_ids: &[u32], round_len: usize, with_final: bool) -> String {
    questions_document_with_lengths(
        group_ids,
        [round_len; 3],
        with_final.then_some(2),
    )
}

/// Like [`questions_document`] but with distinct lengths per round and a
/// configurable final length.
pub fn questions_document_with_lengths(
    group_ids: &[u32],
    round_lengths: [usize; 3],
    final_len: Option<usize>,
) -> String {
    let groups: Vec<Value> = group_ids
        .iter()
        .map(|&id| {
            json!({
                "group_number": id,
                "name": format!("Group {id}"),
                "rounds": [
                    {
                        "round_number": 1,
                        "type": "mcq",
                        "sections": [{
                            "section": "Science",
                            "questions": (0..round_lengths[0]).map(|i| json!({
                                "question": format!("G{id} choice {i}"),
                                "options": ["A", "B", "C", "D"],
                                "answer": "A",
                            })).collect::<Vec<_>>(),
                        }],
                    },
                    {
                        "round_number": 2,
                        "type": "recognition",
                        "sections": [{
                            "section": "Image",
                            "questions": (0..round_lengths[1]).map(|i| json!({
                                "question": format!("G{id} recognition {i}"),
                                "type": "image",
                                "url": format!("images/g{id}-{i}.png"),
                                "answer": "Picture",
                            })).collect::<Vec<_>>(),
                        }],
                    },
                    {
                        "round_number": 3,
                        "type": "general",
                        "sections": [{
                            "section": "General",
                            "questions": (0..round_lengths[2]).map(|i| json!({
                                "question": format!("G{id} open {i}"),
                                "answer": "Answer",
                            })).collect::<Vec<_>>(),
                        }],
                    },
                ],
            })
        })
        .collect();

    let mut document = json!({ "groups": groups });
    if let Some(len) = final_len {
        document["final"] = json!(
            (0..len)
                .map(|i| json!({ "question": format!("Final {i}"), "answer": "Final answer" }))
                .collect::<Vec<_>>()
        );
    }
    document.to_string()
}

pub fn repository(group_ids: &[u32], round_len: usize, with_final: bool) -> QuestionRepository {
    QuestionRepository::from_json(
        &questions_document(group_ids, round_len, with_final),
        None,
        "/",
    )
    .expect("fixture document should be valid")
}

pub fn repository_with_lengths(
    group_ids: &[u32],
    round_lengths: [usize; 3],
    final_len: Option<usize>,
) -> QuestionRepository {
    QuestionRepository::from_json(
        &questions_document_with_lengths(group_ids, round_lengths, final_len),
        None,
        "/",
    )
    .expect("fixture document should be valid")
}
