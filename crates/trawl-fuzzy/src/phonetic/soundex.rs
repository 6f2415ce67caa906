use super::ascii_letters_upper;

const SOUNDEX_LENGTH: usize = 4;

// Digit per letter A..Z. Vowels code '0'; H and W are skipped before lookup.
const SOUNDEX_TABLE: &[u8; 26] = b"01230120022455012623010202";
const REFINED_TABLE: &[u8; 26] = b"01360240043788015936020505";

/// American Soundex: first letter plus three digits, zero padded.
pub fn soundex(word: &str) -> String {
    let letters = ascii_letters_upper(word);
    let Some(&first) = letters.first() else {
        return String::new();
    };

    let mut code = String::with_capacity(SOUNDEX_LENGTH);
    code.push(first);

    let mut last = soundex_digit(first);
    for &letter in &letters[1..] {
        if code.len() == SOUNDEX_LENGTH {
            break;
        }
        if matches!(letter, 'H' | 'W') {
            continue;
        }
        let digit = soundex_digit(letter);
        if digit == '0' {
            last = '0';
            continue;
        }
        if digit != last {
            code.push(digit);
            last = digit;
        }
    }

    while code.len() < SOUNDEX_LENGTH {
        code.push('0');
    }
    code
}

/// Refined Soundex: first letter followed by the uncapped digit run with
/// adjacent repeats collapsed.
pub fn refined_soundex(word: &str) -> String {
    let letters = ascii_letters_upper(word);
    let Some(&first) = letters.first() else {
        return String::new();
    };

    let mut code = String::with_capacity(letters.len() + 1);
    code.push(first);

    let mut last = None;
    for letter in letters {
        let digit = table_digit(REFINED_TABLE, letter);
        if last != Some(digit) {
            code.push(digit);
            last = Some(digit);
        }
    }
    code
}

fn soundex_digit(letter: char) -> char {
    table_digit(SOUNDEX_TABLE, letter)
}

fn table_digit(table: &[u8; 26], letter: char) -> char {
    let offset = (letter as u8).wrapping_sub(b'A') as usize;
    table.get(offset).map(|&digit| digit as char).unwrap_or('0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soundex_matches_reference_codes() {
        assert_eq!(soundex("Robert"), "R163");
        assert_eq!(soundex("Rupert"), "R163");
        assert_eq!(soundex("Ashcraft"), "A261");
        assert_eq!(soundex("Tymczak"), "T522");
        assert_eq!(soundex("Pfister"), "P236");
        assert_eq!(soundex("Lee"), "L000");
    }

    #[test]
    fn soundex_skips_non_letters() {
        assert_eq!(soundex("o'brien"), soundex("OBrien"));
        assert_eq!(soundex("123"), "");
        assert_eq!(soundex(""), "");
    }

    #[test]
    fn refined_soundex_keeps_every_digit_run() {
        assert_eq!(refined_soundex("jumped"), "J408106");
        assert_eq!(refined_soundex("testing"), "T6036084");
        assert_eq!(refined_soundex("Braz"), refined_soundex("Broz"));
        assert_eq!(refined_soundex("--"), "");
    }
}
