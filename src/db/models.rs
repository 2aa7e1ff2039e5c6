use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LetterType {
    Public,
    Anonymous,
    Private,
    Encrypted,
}

impl LetterType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(LetterType::Public),
            "anonymous" => Some(LetterType::Anonymous),
            "private" => Some(LetterType::Private),
            "encrypted" => Some(LetterType::Encrypted),
            _ => None,
        }
    }

    /// Birthdays act as the access-control key and are only stored for
    /// private and encrypted letters.
    pub fn requires_birthdays(self) -> bool {
        matches!(self, LetterType::Private | LetterType::Encrypted)
    }
}

/// Full letter row as exposed to readers. Security fields are never selected.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Letter {
    pub id: i64,
    pub from_name: String,
    pub to_name: String,
    pub letter_content: String,
    pub letter_type: LetterType,
    pub show_from_name: bool,
    pub show_to_name: bool,
    pub created_at: i64,
}

/// Listing row for private letters: names plus a truncated content preview.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PrivatePreview {
    pub id: i64,
    pub from_name: String,
    pub to_name: String,
    pub content_preview: String,
    pub letter_preview: String,
    pub created_at: i64,
}

/// Listing row for encrypted letters: the security question and a short
/// content hint, never the content or the answer.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EncryptedPreview {
    pub id: i64,
    pub security_question: String,
    pub content_hint: String,
    pub created_at: i64,
}

/// Insert payload. Optional fields are nulled out by the repository when the
/// letter type does not use them.
#[derive(Debug, Clone)]
pub struct NewLetter {
    pub from_name: String,
    pub to_name: String,
    pub letter_content: String,
    pub letter_type: LetterType,
    pub show_from_name: bool,
    pub show_to_name: bool,
    pub from_birthday: Option<NaiveDate>,
    pub to_birthday: Option<NaiveDate>,
    pub security_question: Option<String>,
    pub security_answer: Option<String>,
}
