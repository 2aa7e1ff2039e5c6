use crate::db::models::Letter;

pub const ANONYMOUS: &str = "Anonymous";

/// Replaces hidden names with "Anonymous" before a full row leaves the
/// service. Preview rows (private listings, encrypted listings) never pass
/// through here; they carry no visibility flags and must not be rewritten.
pub fn redact(mut letter: Letter) -> Letter {
    if !letter.show_from_name {
        letter.from_name = ANONYMOUS.to_string();
    }
    if !letter.show_to_name {
        letter.to_name = ANONYMOUS.to_string();
    }
    letter
}
