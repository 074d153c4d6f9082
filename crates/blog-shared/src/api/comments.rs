use serde::{Deserialize, Serialize};

/// Body for creating or editing a comment or reply.
///
/// The field names used by older clients (`comment`, `replyText`,
/// `editedReplyText`) are still accepted.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentRequest {
    #[serde(alias = "comment", alias = "replyText", alias = "editedReplyText")]
    pub text: String,
}
