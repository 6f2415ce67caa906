//! Phonetic encoders for name fragments. Each returns an empty code when the
//! input carries no encodable letters.

mod caverphone;
mod double_metaphone;
mod metaphone;
mod soundex;

pub use caverphone::caverphone;
pub use double_metaphone::{DoubleMetaphone, double_metaphone};
pub use metaphone::metaphone;
pub use soundex::{refined_soundex, soundex};

fn ascii_letters_upper(word: &str) -> Vec<char> {
    word.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|ch| ch.to_ascii_uppercase())
        .collect()
}
