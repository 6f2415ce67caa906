use std::sync::LazyLock;

use regex::Regex;
use trawl_core::{Identity, email_local_part, is_valid_email};

static FRAGMENT_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s.\-_,:;]+").expect("valid separator regex"));
static ALPHABETIC_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{L}{2,}$").expect("valid fragment regex"));

pub fn name_fragments(identity: &Identity) -> Vec<String> {
    let name = identity
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let source = match name {
        Some(name) if is_valid_email(name) => email_local_part(name),
        Some(name) => name,
        None => match identity.email.as_deref() {
            Some(email) => email_local_part(email),
            None => return Vec::new(),
        },
    };
    split_fragments(source)
}

pub fn split_fragments(text: &str) -> Vec<String> {
    let mut fragments: Vec<String> = Vec::new();
    for piece in FRAGMENT_SEPARATORS.split(text) {
        let fragment = piece.to_lowercase();
        if ALPHABETIC_FRAGMENT.is_match(&fragment) && !fragments.contains(&fragment) {
            fragments.push(fragment);
        }
    }
    fragments
}

#[cfg(test)]
mod tests {
    use trawl_core::IdentityContext;

    use super::*;

    fn identity(name: Option<&str>, email: Option<&str>) -> Identity {
        Identity {
            id: 1,
            project_id: 1,
            context: IdentityContext::Source,
            name: name.map(str::to_owned),
            email: email.map(str::to_owned),
        }
    }

    #[test]
    fn display_name_is_split_and_filtered() {
        let fragments = name_fragments(&identity(Some("Jean-Luc O'Neil, Jr. (JL) 42"), None));
        assert_eq!(fragments, vec!["jean", "luc", "jr"]);
    }

    #[test]
    fn email_local_part_is_used_without_a_name() {
        let fragments = name_fragments(&identity(None, Some("john_smith@example.org")));
        assert_eq!(fragments, vec!["john", "smith"]);

        let from_name = name_fragments(&identity(Some("jane.doe@example.org"), None));
        assert_eq!(from_name, vec!["jane", "doe"]);
    }

    #[test]
    fn single_letters_digits_and_repeats_are_dropped() {
        assert_eq!(split_fragments("J. R. R. Tolkien"), vec!["tolkien"]);
        assert_eq!(split_fragments("anna anna;ANNA"), vec!["anna"]);
        assert!(split_fragments("x1 42 _").is_empty());
        assert_eq!(split_fragments("Müller Ølsen"), vec!["müller", "ølsen"]);
    }
}
