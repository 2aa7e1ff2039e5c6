use chrono::NaiveDate;
use serde::Deserialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Raw query parameters of GET /api/letters. Field names mirror the wire
/// format; numeric and date fields arrive as strings and are coerced during
/// intent resolution, so a malformed value degrades to "absent" rather than
/// an error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LettersQuery {
    #[serde(rename = "type")]
    pub letter_type: Option<String>,
    pub search: Option<String>,
    pub search_type: Option<String>,
    pub from_name: Option<String>,
    pub to_name: Option<String>,
    pub from_birthday: Option<String>,
    pub to_birthday: Option<String>,
    pub security_answer: Option<String>,
    pub letter_id: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub action: Option<String>,
}

/// The four-tuple that gates access to private and encrypted letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey {
    pub from_name: String,
    pub to_name: String,
    pub from_birthday: NaiveDate,
    pub to_birthday: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    From,
    To,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub term: String,
    pub scope: SearchScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page
            .and_then(|s| s.parse().ok())
            .filter(|&p| p >= 1)
            .unwrap_or(DEFAULT_PAGE);
        let limit = limit
            .and_then(|s| s.parse().ok())
            .filter(|&l| l >= 1)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        Page { page, limit }
    }

    // u64 arithmetic: page is attacker-controlled and u32 math can overflow
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

/// What a retrieval request is actually asking for. Each variant maps to one
/// explicit query shape in `LetterRepository`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryIntent {
    ListOpen {
        search: Option<SearchFilter>,
        page: Page,
    },
    ListPrivate {
        key: IdentityKey,
        page: Page,
    },
    SelectPrivate {
        key: IdentityKey,
        letter_id: i64,
    },
    ListEncrypted {
        key: IdentityKey,
        page: Page,
    },
    UnlockEncrypted {
        key: IdentityKey,
        letter_id: i64,
        answer: String,
    },
    /// Nothing to look up: an incomplete identity key or a parameter
    /// combination with no defined query. Served without touching the store.
    Empty,
}

impl QueryIntent {
    pub fn resolve(params: &LettersQuery) -> QueryIntent {
        let action = params.action.as_deref().unwrap_or("list");
        let page = Page::from_raw(params.page.as_deref(), params.limit.as_deref());
        let letter_id = params.letter_id.as_deref().and_then(|s| s.parse::<i64>().ok());

        match params.letter_type.as_deref() {
            Some("private") => {
                let Some(key) = identity_key(params) else {
                    return QueryIntent::Empty;
                };
                if action == "list" {
                    QueryIntent::ListPrivate { key, page }
                } else if action == "select" {
                    match letter_id {
                        Some(letter_id) => QueryIntent::SelectPrivate { key, letter_id },
                        None => QueryIntent::Empty,
                    }
                } else {
                    QueryIntent::Empty
                }
            }
            Some("encrypted") => {
                let Some(key) = identity_key(params) else {
                    return QueryIntent::Empty;
                };
                let answer = params.security_answer.as_deref().filter(|s| !s.is_empty());
                match (letter_id, answer) {
                    (Some(letter_id), Some(answer)) => QueryIntent::UnlockEncrypted {
                        key,
                        letter_id,
                        answer: normalize_answer(answer),
                    },
                    (None, None) if action == "list" => QueryIntent::ListEncrypted { key, page },
                    _ => QueryIntent::Empty,
                }
            }
            // Absent, "public", "anonymous" and anything else all read the
            // open board.
            _ => QueryIntent::ListOpen {
                search: search_filter(params),
                page,
            },
        }
    }
}

/// Security answers are compared lowercased and trimmed, matching how they
/// are stored at write time.
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn identity_key(params: &LettersQuery) -> Option<IdentityKey> {
    let from_name = params.from_name.as_deref().filter(|s| !s.is_empty())?;
    let to_name = params.to_name.as_deref().filter(|s| !s.is_empty())?;
    let from_birthday = params.from_birthday.as_deref()?.parse::<NaiveDate>().ok()?;
    let to_birthday = params.to_birthday.as_deref()?.parse::<NaiveDate>().ok()?;
    Some(IdentityKey {
        from_name: from_name.to_string(),
        to_name: to_name.to_string(),
        from_birthday,
        to_birthday,
    })
}

fn search_filter(params: &LettersQuery) -> Option<SearchFilter> {
    let term = params.search.as_deref().filter(|s| !s.trim().is_empty())?;
    let scope = match params.search_type.as_deref() {
        Some("from") => SearchScope::From,
        Some("to") => SearchScope::To,
        _ => SearchScope::Both,
    };
    Some(SearchFilter {
        term: term.to_string(),
        scope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn private_params() -> LettersQuery {
        LettersQuery {
            letter_type: Some("private".into()),
            from_name: Some("A".into()),
            to_name: Some("B".into()),
            from_birthday: Some("2000-01-01".into()),
            to_birthday: Some("2001-02-03".into()),
            ..Default::default()
        }
    }

    #[test]
    fn bare_request_lists_open_board_with_defaults() {
        let intent = QueryIntent::resolve(&LettersQuery::default());
        assert_eq!(
            intent,
            QueryIntent::ListOpen {
                search: None,
                page: Page { page: 1, limit: 10 },
            }
        );
    }

    #[test]
    fn non_numeric_paging_falls_back_to_defaults() {
        let params = LettersQuery {
            page: Some("abc".into()),
            limit: Some("".into()),
            ..Default::default()
        };
        match QueryIntent::resolve(&params) {
            QueryIntent::ListOpen { page, .. } => {
                assert_eq!(page, Page { page: 1, limit: 10 });
            }
            other => panic!("unexpected intent: {:?}", other),
        }
    }

    #[test]
    fn limit_is_capped() {
        let params = LettersQuery {
            page: Some("3".into()),
            limit: Some("5000".into()),
            ..Default::default()
        };
        match QueryIntent::resolve(&params) {
            QueryIntent::ListOpen { page, .. } => {
                assert_eq!(page.limit, MAX_LIMIT);
                assert_eq!(page.offset(), 2 * MAX_LIMIT as u64);
            }
            other => panic!("unexpected intent: {:?}", other),
        }
    }

    #[test]
    fn huge_page_numbers_do_not_overflow_the_offset() {
        let params = LettersQuery {
            page: Some(u32::MAX.to_string()),
            limit: Some("100".into()),
            ..Default::default()
        };
        match QueryIntent::resolve(&params) {
            QueryIntent::ListOpen { page, .. } => {
                assert_eq!(page.offset(), (u32::MAX as u64 - 1) * 100);
            }
            other => panic!("unexpected intent: {:?}", other),
        }
    }

    #[test]
    fn search_scope_mapping() {
        for (search_type, scope) in [
            (Some("from"), SearchScope::From),
            (Some("to"), SearchScope::To),
            (Some("both"), SearchScope::Both),
            (None, SearchScope::Both),
        ] {
            let params = LettersQuery {
                search: Some("Bob".into()),
                search_type: search_type.map(Into::into),
                ..Default::default()
            };
            match QueryIntent::resolve(&params) {
                QueryIntent::ListOpen { search: Some(filter), .. } => {
                    assert_eq!(filter.scope, scope);
                    assert_eq!(filter.term, "Bob");
                }
                other => panic!("unexpected intent: {:?}", other),
            }
        }
    }

    #[test]
    fn blank_search_is_ignored() {
        let params = LettersQuery {
            search: Some("   ".into()),
            ..Default::default()
        };
        match QueryIntent::resolve(&params) {
            QueryIntent::ListOpen { search, .. } => assert_eq!(search, None),
            other => panic!("unexpected intent: {:?}", other),
        }
    }

    #[test]
    fn private_with_missing_identity_field_is_empty() {
        let mut params = private_params();
        params.to_birthday = None;
        assert_eq!(QueryIntent::resolve(&params), QueryIntent::Empty);

        let mut params = private_params();
        params.from_name = Some("".into());
        assert_eq!(QueryIntent::resolve(&params), QueryIntent::Empty);
    }

    #[test]
    fn malformed_birthday_is_treated_as_missing() {
        let mut params = private_params();
        params.from_birthday = Some("not-a-date".into());
        assert_eq!(QueryIntent::resolve(&params), QueryIntent::Empty);
    }

    #[test]
    fn private_list_and_select() {
        let params = private_params();
        match QueryIntent::resolve(&params) {
            QueryIntent::ListPrivate { key, .. } => {
                assert_eq!(key.from_name, "A");
                assert_eq!(key.to_birthday.to_string(), "2001-02-03");
            }
            other => panic!("unexpected intent: {:?}", other),
        }

        let mut params = private_params();
        params.action = Some("select".into());
        params.letter_id = Some("42".into());
        match QueryIntent::resolve(&params) {
            QueryIntent::SelectPrivate { letter_id, .. } => assert_eq!(letter_id, 42),
            other => panic!("unexpected intent: {:?}", other),
        }
    }

    #[test]
    fn private_select_without_letter_id_is_empty() {
        let mut params = private_params();
        params.action = Some("select".into());
        assert_eq!(QueryIntent::resolve(&params), QueryIntent::Empty);
    }

    #[test]
    fn private_unknown_action_is_empty() {
        let mut params = private_params();
        params.action = Some("delete".into());
        assert_eq!(QueryIntent::resolve(&params), QueryIntent::Empty);
    }

    #[test]
    fn encrypted_list_and_unlock() {
        let mut params = private_params();
        params.letter_type = Some("encrypted".into());
        assert!(matches!(
            QueryIntent::resolve(&params),
            QueryIntent::ListEncrypted { .. }
        ));

        params.letter_id = Some("7".into());
        params.security_answer = Some(" FLUFFY ".into());
        match QueryIntent::resolve(&params) {
            QueryIntent::UnlockEncrypted { letter_id, answer, .. } => {
                assert_eq!(letter_id, 7);
                assert_eq!(answer, "fluffy");
            }
            other => panic!("unexpected intent: {:?}", other),
        }
    }

    #[test]
    fn encrypted_answer_without_letter_id_is_empty() {
        let mut params = private_params();
        params.letter_type = Some("encrypted".into());
        params.security_answer = Some("fluffy".into());
        assert_eq!(QueryIntent::resolve(&params), QueryIntent::Empty);

        let mut params = private_params();
        params.letter_type = Some("encrypted".into());
        params.letter_id = Some("7".into());
        assert_eq!(QueryIntent::resolve(&params), QueryIntent::Empty);
    }

    #[test]
    fn unknown_type_reads_open_board() {
        let params = LettersQuery {
            letter_type: Some("anonymous".into()),
            ..Default::default()
        };
        assert!(matches!(
            QueryIntent::resolve(&params),
            QueryIntent::ListOpen { .. }
        ));
    }
}
