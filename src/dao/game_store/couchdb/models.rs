use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::game::{Game, GameCode};

pub const GAME_PREFIX: &str = "game::";

/// Document id used for the game stored under `code`.
pub fn game_doc_id(code: &GameCode) -> String {
    format!("{GAME_PREFIX}{code}")
}

/// Game code part of a document id; ids without the prefix are returned unchanged.
pub fn code_from_doc_id(doc_id: &str) -> &str {
    doc_id.strip_prefix(GAME_PREFIX).unwrap_or(doc_id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub game: Game,
}

impl From<(Game, Option<String>)> for CouchGameDocument {
    fn from((game, rev): (Game, Option<String>)) -> Self {
        Self {
            id: game_doc_id(&game.code),
            rev,
            game,
        }
    }
}

/// Minimal projection used to read a document's current revision.
#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    #[serde(rename = "_rev")]
    pub rev: String,
}

/// Body of a filtered `_changes` request.
#[derive(Debug, Serialize)]
pub struct DocIdsFilter<'a> {
    pub doc_ids: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    #[serde(default)]
    pub results: Vec<ChangeRow>,
    pub last_seq: Value,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRow {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Sequence token as sent back in the `since` parameter.
pub fn sequence_token(seq: &Value) -> String {
    match seq {
        Value::String(token) => token.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sports::{GameSetup, badminton};

    #[test]
    fn document_flattens_the_game_next_to_couch_fields() {
        let game = badminton::config().create_game(GameCode::generate(), GameSetup::default());
        let code = game.code.clone();
        let doc = CouchGameDocument::from((game, Some("3-abc".into())));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["_id"], format!("game::{code}"));
        assert_eq!(json["_rev"], "3-abc");
        assert_eq!(json["sport"], "badminton");
        assert_eq!(json["code"], code.as_str());

        let back: CouchGameDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back.game, doc.game);
        assert_eq!(code_from_doc_id(&back.id), code.as_str());
    }

    #[test]
    fn sequence_tokens_accept_numbers_and_strings() {
        assert_eq!(sequence_token(&Value::from(42)), "42");
        assert_eq!(sequence_token(&Value::from("17-g1AAAA")), "17-g1AAAA");
    }
}
