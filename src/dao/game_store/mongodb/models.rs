use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};

use crate::state::game::{Game, GameCode};

/// Stored shape of a game: the game document nested under its code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub game: Game,
}

impl From<Game> for MongoGameDocument {
    fn from(game: Game) -> Self {
        Self {
            id: game.code.to_string(),
            game,
        }
    }
}

impl From<MongoGameDocument> for Game {
    fn from(value: MongoGameDocument) -> Self {
        value.game
    }
}

pub fn doc_id(code: &GameCode) -> Document {
    doc! {"_id": code.as_str()}
}

/// Change stream filter restricted to one game document.
pub fn watch_filter(code: &GameCode) -> Document {
    doc! {"$match": {"documentKey._id": code.as_str()}}
}
