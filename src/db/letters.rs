use sqlx::{Pool, Sqlite};

use crate::db::models::{EncryptedPreview, Letter, LetterType, NewLetter, PrivatePreview};
use crate::error::AppError;
use crate::intent::{IdentityKey, SearchFilter, SearchScope};

const FULL_COLUMNS: &str =
    "id, from_name, to_name, letter_content, letter_type, show_from_name, show_to_name, created_at";

pub struct LetterRepository;

impl LetterRepository {
    /// Inserts one letter and returns its generated id. Optional fields are
    /// nulled when the letter type does not use them; the security answer is
    /// stored lowercased and trimmed so lookups can normalize the same way.
    pub async fn create(pool: &Pool<Sqlite>, letter: NewLetter) -> Result<i64, AppError> {
        let keeps_birthdays = letter.letter_type.requires_birthdays();
        let keeps_security = letter.letter_type == LetterType::Encrypted;

        let from_birthday = letter.from_birthday.filter(|_| keeps_birthdays);
        let to_birthday = letter.to_birthday.filter(|_| keeps_birthdays);
        let security_question = letter.security_question.filter(|_| keeps_security);
        let security_answer = letter
            .security_answer
            .filter(|_| keeps_security)
            .map(|a| a.trim().to_lowercase());
        let created_at = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
INSERT INTO letters
    (from_name, to_name, letter_content, letter_type, show_from_name, show_to_name,
     from_birthday, to_birthday, security_question, security_answer, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&letter.from_name)
        .bind(&letter.to_name)
        .bind(&letter.letter_content)
        .bind(letter.letter_type)
        .bind(letter.show_from_name)
        .bind(letter.show_to_name)
        .bind(from_birthday)
        .bind(to_birthday)
        .bind(security_question)
        .bind(security_answer)
        .bind(created_at)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Public and anonymous letters, newest first, optionally filtered by a
    /// LIKE match on the sender and/or recipient name.
    pub async fn list_open(
        pool: &Pool<Sqlite>,
        search: Option<&SearchFilter>,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Letter>, AppError> {
        let mut sql = format!(
            "SELECT {FULL_COLUMNS} FROM letters WHERE letter_type IN ('public', 'anonymous')"
        );
        if let Some(filter) = search {
            sql.push_str(search_condition(filter.scope));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query_as::<_, Letter>(&sql);
        if let Some(filter) = search {
            let pattern = format!("%{}%", filter.term);
            query = query.bind(pattern.clone());
            if filter.scope == SearchScope::Both {
                query = query.bind(pattern);
            }
        }
        let letters = query
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(pool)
            .await?;

        Ok(letters)
    }

    pub async fn count_open(
        pool: &Pool<Sqlite>,
        search: Option<&SearchFilter>,
    ) -> Result<i64, AppError> {
        let mut sql = String::from(
            "SELECT COUNT(*) FROM letters WHERE letter_type IN ('public', 'anonymous')",
        );
        if let Some(filter) = search {
            sql.push_str(search_condition(filter.scope));
        }

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(filter) = search {
            let pattern = format!("%{}%", filter.term);
            query = query.bind(pattern.clone());
            if filter.scope == SearchScope::Both {
                query = query.bind(pattern);
            }
        }
        let total = query.fetch_one(pool).await?;

        Ok(total)
    }

    /// Private letters matching the identity key, as previews: the first 100
    /// characters of content, with an ellipsis when truncated.
    pub async fn list_private(
        pool: &Pool<Sqlite>,
        key: &IdentityKey,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PrivatePreview>, AppError> {
        let previews = sqlx::query_as::<_, PrivatePreview>(
            r#"
SELECT id, from_name, to_name,
       substr(letter_content, 1, 100) AS content_preview,
       CASE WHEN length(letter_content) > 100
            THEN substr(letter_content, 1, 100) || '...'
            ELSE letter_content
       END AS letter_preview,
       created_at
FROM letters
WHERE letter_type = 'private'
  AND from_name = ? AND to_name = ? AND from_birthday = ? AND to_birthday = ?
ORDER BY created_at DESC, id DESC
LIMIT ? OFFSET ?
            "#,
        )
        .bind(&key.from_name)
        .bind(&key.to_name)
        .bind(key.from_birthday)
        .bind(key.to_birthday)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(pool)
        .await?;

        Ok(previews)
    }

    pub async fn count_private(pool: &Pool<Sqlite>, key: &IdentityKey) -> Result<i64, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
SELECT COUNT(*)
FROM letters
WHERE letter_type = 'private'
  AND from_name = ? AND to_name = ? AND from_birthday = ? AND to_birthday = ?
            "#,
        )
        .bind(&key.from_name)
        .bind(&key.to_name)
        .bind(key.from_birthday)
        .bind(key.to_birthday)
        .fetch_one(pool)
        .await?;

        Ok(total)
    }

    /// A single private letter, released only when the id and the full
    /// identity key match.
    pub async fn select_private(
        pool: &Pool<Sqlite>,
        key: &IdentityKey,
        letter_id: i64,
    ) -> Result<Option<Letter>, AppError> {
        let letter = sqlx::query_as::<_, Letter>(&format!(
            r#"
SELECT {FULL_COLUMNS}
FROM letters
WHERE id = ? AND letter_type = 'private'
  AND from_name = ? AND to_name = ? AND from_birthday = ? AND to_birthday = ?
            "#
        ))
        .bind(letter_id)
        .bind(&key.from_name)
        .bind(&key.to_name)
        .bind(key.from_birthday)
        .bind(key.to_birthday)
        .fetch_optional(pool)
        .await?;

        Ok(letter)
    }

    /// Encrypted letters matching the identity key, as previews: the security
    /// question and a 50-character hint. Content and answer stay hidden.
    pub async fn list_encrypted(
        pool: &Pool<Sqlite>,
        key: &IdentityKey,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<EncryptedPreview>, AppError> {
        let previews = sqlx::query_as::<_, EncryptedPreview>(
            r#"
SELECT id, security_question, created_at,
       substr(letter_content, 1, 50) AS content_hint
FROM letters
WHERE letter_type = 'encrypted'
  AND from_name = ? AND to_name = ? AND from_birthday = ? AND to_birthday = ?
ORDER BY created_at DESC, id DESC
LIMIT ? OFFSET ?
            "#,
        )
        .bind(&key.from_name)
        .bind(&key.to_name)
        .bind(key.from_birthday)
        .bind(key.to_birthday)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(pool)
        .await?;

        Ok(previews)
    }

    pub async fn count_encrypted(pool: &Pool<Sqlite>, key: &IdentityKey) -> Result<i64, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
SELECT COUNT(*)
FROM letters
WHERE letter_type = 'encrypted'
  AND from_name = ? AND to_name = ? AND from_birthday = ? AND to_birthday = ?
            "#,
        )
        .bind(&key.from_name)
        .bind(&key.to_name)
        .bind(key.from_birthday)
        .bind(key.to_birthday)
        .fetch_one(pool)
        .await?;

        Ok(total)
    }

    /// Releases the full content of one encrypted letter when the id, the
    /// identity key and the normalized security answer all match.
    pub async fn unlock_encrypted(
        pool: &Pool<Sqlite>,
        key: &IdentityKey,
        letter_id: i64,
        normalized_answer: &str,
    ) -> Result<Option<Letter>, AppError> {
        let letter = sqlx::query_as::<_, Letter>(&format!(
            r#"
SELECT {FULL_COLUMNS}
FROM letters
WHERE id = ? AND letter_type = 'encrypted'
  AND from_name = ? AND to_name = ? AND from_birthday = ? AND to_birthday = ?
  AND security_answer = ?
            "#
        ))
        .bind(letter_id)
        .bind(&key.from_name)
        .bind(&key.to_name)
        .bind(key.from_birthday)
        .bind(key.to_birthday)
        .bind(normalized_answer)
        .fetch_optional(pool)
        .await?;

        Ok(letter)
    }
}

fn search_condition(scope: SearchScope) -> &'static str {
    match scope {
        SearchScope::From => " AND from_name LIKE ?",
        SearchScope::To => " AND to_name LIKE ?",
        SearchScope::Both => " AND (from_name LIKE ? OR to_name LIKE ?)",
    }
}
