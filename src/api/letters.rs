use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::db::{
    models::{EncryptedPreview, Letter, LetterType, NewLetter, PrivatePreview},
    LetterRepository,
};
use crate::error::AppError;
use crate::intent::{LettersQuery, Page, QueryIntent};
use crate::visibility;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLetterRequest {
    pub from_name: Option<String>,
    pub to_name: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub letter_type: Option<String>,
    // Raw strings so a malformed date reports through the validation
    // contract instead of a body-deserialization rejection
    pub from_birthday: Option<String>,
    pub to_birthday: Option<String>,
    pub show_from_name: Option<bool>,
    pub show_to_name: Option<bool>,
    pub security_question: Option<String>,
    pub security_answer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateLetterResponse {
    pub message: String,
    pub id: i64,
}

/// One element of the `letters` array. The shape depends on the query that
/// produced it: full rows for open lists and reveals, previews otherwise.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LetterView {
    Full(Letter),
    Private(PrivatePreview),
    Encrypted(EncryptedPreview),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total: i64,
    pub has_more: bool,
    pub limit: u32,
}

impl Pagination {
    fn new(page: Page, total: i64) -> Self {
        let limit = page.limit as i64;
        Pagination {
            current_page: page.page,
            total_pages: ((total + limit - 1) / limit) as u32,
            total,
            has_more: total > page.page as i64 * limit,
            limit: page.limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LettersResponse {
    pub letters: Vec<LetterView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(rename = "hasMore", skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

impl LettersResponse {
    /// The shape returned when an incomplete identity key short-circuits the
    /// request before any query runs.
    fn empty() -> Self {
        LettersResponse {
            letters: Vec::new(),
            pagination: None,
            total: Some(0),
            has_more: Some(false),
        }
    }

    fn paged(letters: Vec<LetterView>, page: Page, total: i64) -> Self {
        LettersResponse {
            letters,
            pagination: Some(Pagination::new(page, total)),
            total: None,
            has_more: None,
        }
    }

    fn plain(letters: Vec<LetterView>) -> Self {
        LettersResponse {
            letters,
            pagination: None,
            total: None,
            has_more: None,
        }
    }
}

/// POST /api/letters
pub async fn create_letter(
    State(state): State<AppState>,
    Json(req): Json<CreateLetterRequest>,
) -> Result<(StatusCode, Json<CreateLetterResponse>), AppError> {
    let letter = validate_create(req)?;

    tracing::info!(
        "Inserting {:?} letter from {} to {}",
        letter.letter_type,
        letter.from_name,
        letter.to_name
    );
    let id = LetterRepository::create(&state.db, letter).await?;
    tracing::info!("Letter inserted with id {}", id);

    Ok((
        StatusCode::CREATED,
        Json(CreateLetterResponse {
            message: "Letter created successfully".to_string(),
            id,
        }),
    ))
}

/// GET /api/letters
pub async fn query_letters(
    State(state): State<AppState>,
    Query(params): Query<LettersQuery>,
) -> Result<Json<LettersResponse>, AppError> {
    let response = match QueryIntent::resolve(&params) {
        QueryIntent::Empty => LettersResponse::empty(),
        QueryIntent::ListOpen { search, page } => {
            let total = LetterRepository::count_open(&state.db, search.as_ref()).await?;
            let rows =
                LetterRepository::list_open(&state.db, search.as_ref(), page.limit, page.offset())
                    .await?;
            let letters = rows
                .into_iter()
                .map(visibility::redact)
                .map(LetterView::Full)
                .collect();
            LettersResponse::paged(letters, page, total)
        }
        QueryIntent::ListPrivate { key, page } => {
            let total = LetterRepository::count_private(&state.db, &key).await?;
            let rows =
                LetterRepository::list_private(&state.db, &key, page.limit, page.offset()).await?;
            let letters = rows.into_iter().map(LetterView::Private).collect();
            LettersResponse::paged(letters, page, total)
        }
        QueryIntent::SelectPrivate { key, letter_id } => {
            let letters = LetterRepository::select_private(&state.db, &key, letter_id)
                .await?
                .map(visibility::redact)
                .map(LetterView::Full)
                .into_iter()
                .collect();
            LettersResponse::plain(letters)
        }
        QueryIntent::ListEncrypted { key, page } => {
            let total = LetterRepository::count_encrypted(&state.db, &key).await?;
            let rows =
                LetterRepository::list_encrypted(&state.db, &key, page.limit, page.offset())
                    .await?;
            let letters = rows.into_iter().map(LetterView::Encrypted).collect();
            LettersResponse::paged(letters, page, total)
        }
        QueryIntent::UnlockEncrypted {
            key,
            letter_id,
            answer,
        } => {
            let letters = LetterRepository::unlock_encrypted(&state.db, &key, letter_id, &answer)
                .await?
                .map(visibility::redact)
                .map(LetterView::Full)
                .into_iter()
                .collect();
            LettersResponse::plain(letters)
        }
    };

    tracing::debug!("Returning {} letters", response.letters.len());
    Ok(Json(response))
}

fn required(field: Option<String>) -> Result<String, AppError> {
    field
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Missing required fields".to_string()))
}

fn parse_birthday(raw: Option<String>, field: &str) -> Result<Option<NaiveDate>, AppError> {
    match raw.filter(|s| !s.trim().is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid date for {}", field))),
    }
}

fn validate_create(req: CreateLetterRequest) -> Result<NewLetter, AppError> {
    let from_name = required(req.from_name)?;
    let to_name = required(req.to_name)?;
    let letter_content = required(req.content)?;
    let type_raw = required(req.letter_type)?;
    let letter_type = LetterType::parse(&type_raw)
        .ok_or_else(|| AppError::Validation(format!("Unknown letter type: {}", type_raw)))?;

    let from_birthday = parse_birthday(req.from_birthday, "fromBirthday")?;
    let to_birthday = parse_birthday(req.to_birthday, "toBirthday")?;

    if letter_type.requires_birthdays() && (from_birthday.is_none() || to_birthday.is_none()) {
        return Err(AppError::Validation(
            "Birthdays are required for private and encrypted letters".to_string(),
        ));
    }

    let (security_question, security_answer) = if letter_type == LetterType::Encrypted {
        let question = req.security_question.filter(|s| !s.trim().is_empty());
        let answer = req.security_answer.filter(|s| !s.trim().is_empty());
        if question.is_none() || answer.is_none() {
            return Err(AppError::Validation(
                "Security question and answer are required for encrypted letters".to_string(),
            ));
        }
        (question, answer)
    } else {
        (req.security_question, req.security_answer)
    };

    Ok(NewLetter {
        from_name,
        to_name,
        letter_content,
        letter_type,
        show_from_name: req.show_from_name.unwrap_or(true),
        show_to_name: req.show_to_name.unwrap_or(true),
        from_birthday,
        to_birthday,
        security_question,
        security_answer,
    })
}
