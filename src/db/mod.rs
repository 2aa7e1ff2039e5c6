pub mod letters;
pub mod models;

pub use letters::LetterRepository;
pub use models::{EncryptedPreview, Letter, LetterType, NewLetter, PrivatePreview};
