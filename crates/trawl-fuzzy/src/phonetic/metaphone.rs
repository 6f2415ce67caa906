use super::ascii_letters_upper;

const FRONT_VOWELS: &[char] = &['E', 'I', 'Y'];
const SOFTENS_H: &[char] = &['C', 'S', 'P', 'T', 'G'];

/// Original Metaphone. `0` stands for the "th" sound. The code is not
/// truncated.
pub fn metaphone(word: &str) -> String {
    let letters = prepare(ascii_letters_upper(word));
    match letters.len() {
        0 => return String::new(),
        1 => return letters[0].to_string(),
        _ => {}
    }

    let word = Letters(&letters);
    let mut code = String::with_capacity(letters.len());

    let mut index = 0;
    while index < letters.len() {
        let letter = letters[index];
        if letter != 'C' && word.prev_is(index, letter) {
            index += 1;
            continue;
        }

        match letter {
            'A' | 'E' | 'I' | 'O' | 'U' => {
                if index == 0 {
                    code.push(letter);
                }
            }
            'B' => {
                if !(word.prev_is(index, 'M') && word.is_last(index)) {
                    code.push('B');
                }
            }
            'C' => encode_c(word, index, &mut code),
            'D' => {
                if word.next_is(index, 'G') && word.at(index + 2).is_some_and(is_front_vowel) {
                    code.push('J');
                    index += 2;
                } else {
                    code.push('T');
                }
            }
            'G' => encode_g(word, index, &mut code),
            'H' => {
                let after_softener = index > 0 && SOFTENS_H.contains(&letters[index - 1]);
                if !word.is_last(index) && !after_softener && word.is_vowel(index + 1) {
                    code.push('H');
                }
            }
            'K' => {
                if !word.prev_is(index, 'C') {
                    code.push('K');
                }
            }
            'P' => code.push(if word.next_is(index, 'H') { 'F' } else { 'P' }),
            'Q' => code.push('K'),
            'S' => {
                if word.region_is(index, "SH")
                    || word.region_is(index, "SIO")
                    || word.region_is(index, "SIA")
                {
                    code.push('X');
                } else {
                    code.push('S');
                }
            }
            'T' => {
                if word.region_is(index, "TIA") || word.region_is(index, "TIO") {
                    code.push('X');
                } else if word.region_is(index, "TH") {
                    code.push('0');
                } else if !word.region_is(index, "TCH") {
                    code.push('T');
                }
            }
            'V' => code.push('F'),
            'W' | 'Y' => {
                if word.is_vowel(index + 1) {
                    code.push(letter);
                }
            }
            'X' => code.push_str("KS"),
            'Z' => code.push('S'),
            'F' | 'J' | 'L' | 'M' | 'N' | 'R' => code.push(letter),
            _ => {}
        }
        index += 1;
    }

    code
}

fn encode_c(word: Letters<'_>, index: usize, code: &mut String) {
    let next_front = word.at(index + 1).is_some_and(is_front_vowel);
    if word.prev_is(index, 'S') && next_front {
        return;
    }
    if word.region_is(index, "CIA") {
        code.push('X');
    } else if next_front {
        code.push('S');
    } else if word.prev_is(index, 'S') && word.next_is(index, 'H') {
        code.push('K');
    } else if word.next_is(index, 'H') {
        if index == 0 && word.is_vowel(2) {
            code.push('K');
        } else {
            code.push('X');
        }
    } else {
        code.push('K');
    }
}

fn encode_g(word: Letters<'_>, index: usize, code: &mut String) {
    if word.next_is(index, 'H') && (word.is_last(index + 1) || !word.is_vowel(index + 2)) {
        return;
    }
    if index > 0 && word.region_is(index, "GN") {
        return;
    }

    let doubled = word.prev_is(index, 'G');
    if word.at(index + 1).is_some_and(is_front_vowel) && !doubled {
        code.push('J');
    } else {
        code.push('K');
    }
}

fn prepare(mut letters: Vec<char>) -> Vec<char> {
    if letters.len() < 2 {
        return letters;
    }

    match (letters[0], letters[1]) {
        ('K' | 'G' | 'P', 'N') | ('A', 'E') | ('W', 'R') => {
            letters.remove(0);
        }
        ('W', 'H') => {
            letters.remove(0);
            letters[0] = 'W';
        }
        ('X', _) => letters[0] = 'S',
        _ => {}
    }
    letters
}

fn is_front_vowel(letter: char) -> bool {
    FRONT_VOWELS.contains(&letter)
}

#[derive(Clone, Copy)]
struct Letters<'a>(&'a [char]);

impl Letters<'_> {
    fn at(&self, index: usize) -> Option<char> {
        self.0.get(index).copied()
    }

    fn is_last(&self, index: usize) -> bool {
        index + 1 == self.0.len()
    }

    fn is_vowel(&self, index: usize) -> bool {
        self.at(index)
            .is_some_and(|letter| matches!(letter, 'A' | 'E' | 'I' | 'O' | 'U'))
    }

    fn next_is(&self, index: usize, letter: char) -> bool {
        self.at(index + 1) == Some(letter)
    }

    fn prev_is(&self, index: usize, letter: char) -> bool {
        index > 0 && self.0[index - 1] == letter
    }

    fn region_is(&self, index: usize, region: &str) -> bool {
        let len = region.chars().count();
        self.0
            .get(index..index + len)
            .is_some_and(|slice| slice.iter().copied().eq(region.chars()))
    }
}
