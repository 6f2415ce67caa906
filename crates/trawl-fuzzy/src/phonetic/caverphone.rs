const CODE_LENGTH: usize = 10;

#[derive(Clone, Copy)]
enum Rule {
    Prefix(&'static str, &'static str),
    Suffix(&'static str, &'static str),
    Everywhere(&'static str, &'static str),
    Run(char, &'static str),
    LeadingVowel,
    Vowels,
}

use Rule::{Everywhere, LeadingVowel, Prefix, Run, Suffix, Vowels};

// Caverphone 2.0, applied in order to the lowercased a-z letters.
const RULES: &[Rule] = &[
    Suffix("e", ""),
    Prefix("cough", "cou2f"),
    Prefix("rough", "rou2f"),
    Prefix("tough", "tou2f"),
    Prefix("enough", "enou2f"),
    Prefix("trough", "trou2f"),
    Prefix("gn", "2n"),
    Suffix("mb", "m2"),
    Everywhere("cq", "2q"),
    Everywhere("ci", "si"),
    Everywhere("ce", "se"),
    Everywhere("cy", "sy"),
    Everywhere("tch", "2ch"),
    Everywhere("c", "k"),
    Everywhere("q", "k"),
    Everywhere("x", "k"),
    Everywhere("v", "f"),
    Everywhere("dg", "2g"),
    Everywhere("tio", "sio"),
    Everywhere("tia", "sia"),
    Everywhere("d", "t"),
    Everywhere("ph", "fh"),
    Everywhere("b", "p"),
    Everywhere("sh", "s2"),
    Everywhere("z", "s"),
    LeadingVowel,
    Vowels,
    Everywhere("j", "y"),
    Prefix("y3", "Y3"),
    Prefix("y", "A"),
    Everywhere("y", "3"),
    Everywhere("3gh3", "3kh3"),
    Everywhere("gh", "22"),
    Everywhere("g", "k"),
    Run('s', "S"),
    Run('t', "T"),
    Run('p', "P"),
    Run('k', "K"),
    Run('f', "F"),
    Run('m', "M"),
    Run('n', "N"),
    Everywhere("w3", "W3"),
    Everywhere("wh3", "Wh3"),
    Suffix("w", "3"),
    Everywhere("w", "2"),
    Prefix("h", "A"),
    Everywhere("h", "2"),
    Everywhere("r3", "R3"),
    Suffix("r", "3"),
    Everywhere("r", "2"),
    Everywhere("l3", "L3"),
    Suffix("l", "3"),
    Everywhere("l", "2"),
    Everywhere("2", ""),
    Suffix("3", "A"),
    Everywhere("3", ""),
];

/// Caverphone 2.0 code, always ten characters padded with `1`.
pub fn caverphone(word: &str) -> String {
    let mut text = word
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|ch| ch.to_ascii_lowercase())
        .collect::<String>();
    if text.is_empty() {
        return String::new();
    }

    for rule in RULES {
        text = apply(*rule, text);
    }

    text.extend(std::iter::repeat_n('1', CODE_LENGTH));
    text.truncate(CODE_LENGTH);
    text
}

fn apply(rule: Rule, text: String) -> String {
    match rule {
        Prefix(from, to) => match text.strip_prefix(from) {
            Some(rest) => format!("{to}{rest}"),
            None => text,
        },
        Suffix(from, to) => match text.strip_suffix(from) {
            Some(rest) => format!("{rest}{to}"),
            None => text,
        },
        Everywhere(from, to) => text.replace(from, to),
        Run(letter, to) => collapse_runs(&text, letter, to),
        LeadingVowel => match text.chars().next() {
            Some(first) if is_vowel(first) => format!("A{}", &text[first.len_utf8()..]),
            _ => text,
        },
        Vowels => text
            .chars()
            .map(|ch| if is_vowel(ch) { '3' } else { ch })
            .collect(),
    }
}

fn collapse_runs(text: &str, letter: char, to: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.chars() {
        if ch == letter {
            if !in_run {
                out.push_str(to);
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

fn is_vowel(ch: char) -> bool {
    matches!(ch, 'a' | 'e' | 'i' | 'o' | 'u')
}
