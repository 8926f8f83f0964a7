use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    /// Position in the conversation, starting at 0.
    pub seq: i64,
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn is_user(&self) -> bool {
        self.role == "user"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub id: String,
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
}
