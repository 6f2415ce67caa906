const MAX_CODE_LENGTH: usize = 4;

const SILENT_STARTS: &[&str] = &["GN", "KN", "PN", "WR", "PS"];
const GERMANIC_STARTS: &[&str] = &["VAN ", "VON "];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DoubleMetaphone {
    pub primary: String,
    pub alternate: String,
}

impl DoubleMetaphone {
    /// Primary code, followed by the alternate when it differs.
    pub fn codes(&self) -> Vec<String> {
        let mut codes = Vec::with_capacity(2);
        if !self.primary.is_empty() {
            codes.push(self.primary.clone());
        }
        if !self.alternate.is_empty() && self.alternate != self.primary {
            codes.push(self.alternate.clone());
        }
        codes
    }
}

/// Double Metaphone with four-character codes.
pub fn double_metaphone(word: &str) -> DoubleMetaphone {
    let value = word.trim().to_uppercase().chars().collect::<Vec<_>>();
    if value.is_empty() {
        return DoubleMetaphone::default();
    }

    let mut encoder = Encoder {
        word: Word(&value),
        slavo_germanic: is_slavo_germanic(&value),
        primary: String::with_capacity(MAX_CODE_LENGTH),
        alternate: String::with_capacity(MAX_CODE_LENGTH),
    };
    encoder.run();

    DoubleMetaphone {
        primary: encoder.primary,
        alternate: encoder.alternate.trim_end().to_owned(),
    }
}

fn is_slavo_germanic(value: &[char]) -> bool {
    let text = value.iter().collect::<String>();
    text.contains('W') || text.contains('K') || text.contains("CZ") || text.contains("WITZ")
}

#[derive(Clone, Copy)]
struct Word<'a>(&'a [char]);

impl Word<'_> {
    fn len(&self) -> isize {
        self.0.len() as isize
    }

    fn last(&self) -> isize {
        self.len() - 1
    }

    fn at(&self, index: isize) -> char {
        if index < 0 {
            return '\0';
        }
        self.0.get(index as usize).copied().unwrap_or('\0')
    }

    fn is_vowel_at(&self, index: isize) -> bool {
        is_vowel(self.at(index))
    }

    /// True when the `length` letters starting at `start` equal one of
    /// `options`.
    fn contains(&self, start: isize, length: usize, options: &[&str]) -> bool {
        if start < 0 {
            return false;
        }
        let start = start as usize;
        let Some(slice) = self.0.get(start..start + length) else {
            return false;
        };
        options
            .iter()
            .any(|option| slice.iter().copied().eq(option.chars()))
    }

    fn starts_with(&self, options: &[&str]) -> bool {
        options
            .iter()
            .any(|option| self.contains(0, option.chars().count(), &[*option]))
    }
}

fn is_vowel(letter: char) -> bool {
    matches!(letter, 'A' | 'E' | 'I' | 'O' | 'U' | 'Y')
}

struct Encoder<'a> {
    word: Word<'a>,
    slavo_germanic: bool,
    primary: String,
    alternate: String,
}

impl Encoder<'_> {
    fn run(&mut self) {
        let word = self.word;
        let mut index: isize = if word.starts_with(SILENT_STARTS) { 1 } else { 0 };

        while !self.is_complete() && index < word.len() {
            index = match word.at(index) {
                'A' | 'E' | 'I' | 'O' | 'U' | 'Y' => {
                    if index == 0 {
                        self.both('A');
                    }
                    index + 1
                }
                'B' => {
                    self.both('P');
                    self.skip_double(index, 'B')
                }
                'Ç' => {
                    self.both('S');
                    index + 1
                }
                'C' => self.handle_c(index),
                'D' => self.handle_d(index),
                'F' => {
                    self.both('F');
                    self.skip_double(index, 'F')
                }
                'G' => self.handle_g(index),
                'H' => self.handle_h(index),
                'J' => self.handle_j(index),
                'K' => {
                    self.both('K');
                    self.skip_double(index, 'K')
                }
                'L' => self.handle_l(index),
                'M' => {
                    self.both('M');
                    if self.m_is_doubled(index) {
                        index + 2
                    } else {
                        index + 1
                    }
                }
                'N' => {
                    self.both('N');
                    self.skip_double(index, 'N')
                }
                'Ñ' => {
                    self.both('N');
                    index + 1
                }
                'P' => self.handle_p(index),
                'Q' => {
                    self.both('K');
                    self.skip_double(index, 'Q')
                }
                'R' => self.handle_r(index),
                'S' => self.handle_s(index),
                'T' => self.handle_t(index),
                'V' => {
                    self.both('F');
                    self.skip_double(index, 'V')
                }
                'W' => self.handle_w(index),
                'X' => self.handle_x(index),
                'Z' => self.handle_z(index),
                _ => index + 1,
            };
        }
    }

    fn is_complete(&self) -> bool {
        self.primary.len() >= MAX_CODE_LENGTH && self.alternate.len() >= MAX_CODE_LENGTH
    }

    fn push_primary(&mut self, code: &str) {
        push_limited(&mut self.primary, code);
    }

    fn push_alternate(&mut self, code: &str) {
        push_limited(&mut self.alternate, code);
    }

    fn push(&mut self, primary: &str, alternate: &str) {
        self.push_primary(primary);
        self.push_alternate(alternate);
    }

    fn both(&mut self, letter: char) {
        let mut buf = [0u8; 4];
        let code = letter.encode_utf8(&mut buf);
        self.push(code, code);
    }

    fn split(&mut self, primary: char, alternate: char) {
        let mut primary_buf = [0u8; 4];
        let mut alternate_buf = [0u8; 4];
        let primary = primary.encode_utf8(&mut primary_buf);
        let alternate = alternate.encode_utf8(&mut alternate_buf);
        self.push(primary, alternate);
    }

    fn skip_double(&self, index: isize, letter: char) -> isize {
        if self.word.at(index + 1) == letter {
            index + 2
        } else {
            index + 1
        }
    }

    fn is_germanic(&self) -> bool {
        self.word.starts_with(GERMANIC_STARTS) || self.word.contains(0, 3, &["SCH"])
    }

    fn handle_c(&mut self, index: isize) -> isize {
        let word = self.word;
        if self.c_is_hard_in_ach(index) {
            self.both('K');
            return index + 2;
        }
        if index == 0 && word.contains(index, 6, &["CAESAR"]) {
            self.both('S');
            return index + 2;
        }
        if word.contains(index, 2, &["CH"]) {
            return self.handle_ch(index);
        }
        if word.contains(index, 2, &["CZ"]) && !word.contains(index - 2, 4, &["WICZ"]) {
            self.split('S', 'X');
            return index + 2;
        }
        if word.contains(index + 1, 3, &["CIA"]) {
            self.both('X');
            return index + 3;
        }
        if word.contains(index, 2, &["CC"]) && !(index == 1 && word.at(0) == 'M') {
            return self.handle_cc(index);
        }
        if word.contains(index, 2, &["CK", "CG", "CQ"]) {
            self.both('K');
            return index + 2;
        }
        if word.contains(index, 2, &["CI", "CE", "CY"]) {
            if word.contains(index, 3, &["CIO", "CIE", "CIA"]) {
                self.split('S', 'X');
            } else {
                self.both('S');
            }
            return index + 2;
        }

        self.both('K');
        if word.contains(index + 1, 2, &[" C", " Q", " G"]) {
            index + 3
        } else if word.contains(index + 1, 1, &["C", "K", "Q"])
            && !word.contains(index + 1, 2, &["CE", "CI"])
        {
            index + 2
        } else {
            index + 1
        }
    }

    fn handle_cc(&mut self, index: isize) -> isize {
        let word = self.word;
        if word.contains(index + 2, 1, &["I", "E", "H"]) && !word.contains(index + 2, 2, &["HU"]) {
            if (index == 1 && word.at(index - 1) == 'A')
                || word.contains(index - 1, 5, &["UCCEE", "UCCES"])
            {
                self.push("KS", "KS");
            } else {
                self.both('X');
            }
            index + 3
        } else {
            self.both('K');
            index + 2
        }
    }

    fn handle_ch(&mut self, index: isize) -> isize {
        let word = self.word;
        if index > 0 && word.contains(index, 4, &["CHAE"]) {
            self.split('K', 'X');
            return index + 2;
        }
        if self.ch_is_greek_initial(index) || self.ch_is_hard(index) {
            self.both('K');
            return index + 2;
        }

        if index > 0 {
            if word.contains(0, 2, &["MC"]) {
                self.both('K');
            } else {
                self.split('X', 'K');
            }
        } else {
            self.both('X');
        }
        index + 2
    }

    fn handle_d(&mut self, index: isize) -> isize {
        let word = self.word;
        if word.contains(index, 2, &["DG"]) {
            if word.contains(index + 2, 1, &["I", "E", "Y"]) {
                self.both('J');
                index + 3
            } else {
                self.push("TK", "TK");
                index + 2
            }
        } else if word.contains(index, 2, &["DT", "DD"]) {
            self.both('T');
            index + 2
        } else {
            self.both('T');
            index + 1
        }
    }

    fn handle_g(&mut self, index: isize) -> isize {
        let word = self.word;
        let next = word.at(index + 1);

        if next == 'H' {
            return self.handle_gh(index);
        }
        if next == 'N' {
            if index == 1 && word.is_vowel_at(0) && !self.slavo_germanic {
                self.push("KN", "N");
            } else if !word.contains(index + 2, 2, &["EY"]) && next != 'Y' && !self.slavo_germanic {
                self.push("N", "KN");
            } else {
                self.push("KN", "KN");
            }
            return index + 2;
        }
        if word.contains(index + 1, 2, &["LI"]) && !self.slavo_germanic {
            self.push("KL", "L");
            return index + 2;
        }
        if index == 0
            && (next == 'Y'
                || word.contains(
                    index + 1,
                    2,
                    &["ES", "EP", "EB", "EL", "EY", "IB", "IL", "IN", "IE", "EI", "ER"],
                ))
        {
            self.split('K', 'J');
            return index + 2;
        }
        if (word.contains(index + 1, 2, &["ER"]) || next == 'Y')
            && !word.contains(0, 6, &["DANGER", "RANGER", "MANGER"])
            && !word.contains(index - 1, 1, &["E", "I"])
            && !word.contains(index - 1, 3, &["RGY", "OGY"])
        {
            self.split('K', 'J');
            return index + 2;
        }
        if word.contains(index + 1, 1, &["E", "I", "Y"])
            || word.contains(index - 1, 4, &["AGGI", "OGGI"])
        {
            if self.is_germanic() || word.contains(index + 1, 2, &["ET"]) {
                self.both('K');
            } else if word.contains(index + 1, 3, &["IER"]) {
                self.both('J');
            } else {
                self.split('J', 'K');
            }
            return index + 2;
        }

        self.both('K');
        if next == 'G' { index + 2 } else { index + 1 }
    }

    fn handle_gh(&mut self, index: isize) -> isize {
        let word = self.word;
        if index > 0 && !word.is_vowel_at(index - 1) {
            self.both('K');
            return index + 2;
        }
        if index == 0 {
            if word.at(index + 2) == 'I' {
                self.both('J');
            } else {
                self.both('K');
            }
            return index + 2;
        }
        // "hugh", "bough": silent after an early B, H or D.
        if (index > 1 && word.contains(index - 2, 1, &["B", "H", "D"]))
            || (index > 2 && word.contains(index - 3, 1, &["B", "H", "D"]))
            || (index > 3 && word.contains(index - 4, 1, &["B", "H"]))
        {
            return index + 2;
        }

        if index > 2
            && word.at(index - 1) == 'U'
            && word.contains(index - 3, 1, &["C", "G", "L", "R", "T"])
        {
            self.both('F');
        } else if word.at(index - 1) != 'I' {
            self.both('K');
        }
        index + 2
    }

    fn handle_h(&mut self, index: isize) -> isize {
        let word = self.word;
        if (index == 0 || word.is_vowel_at(index - 1)) && word.is_vowel_at(index + 1) {
            self.both('H');
            index + 2
        } else {
            index + 1
        }
    }

    fn handle_j(&mut self, index: isize) -> isize {
        let word = self.word;
        if word.contains(index, 4, &["JOSE"]) || word.contains(0, 4, &["SAN "]) {
            if (index == 0 && (word.at(index + 4) == ' ' || word.len() == 4))
                || word.contains(0, 4, &["SAN "])
            {
                self.both('H');
            } else {
                self.split('J', 'H');
            }
            return index + 1;
        }

        if index == 0 {
            self.split('J', 'A');
        } else if word.is_vowel_at(index - 1)
            && !self.slavo_germanic
            && matches!(word.at(index + 1), 'A' | 'O')
        {
            self.split('J', 'H');
        } else if index == word.last() {
            self.push("J", "");
        } else if !word.contains(index + 1, 1, &["L", "T", "K", "S", "N", "M", "B", "Z"])
            && !word.contains(index - 1, 1, &["S", "K", "L"])
        {
            self.both('J');
        }

        self.skip_double(index, 'J')
    }

    fn handle_l(&mut self, index: isize) -> isize {
        if self.word.at(index + 1) == 'L' {
            if self.ll_is_spanish(index) {
                self.push_primary("L");
            } else {
                self.both('L');
            }
            index + 2
        } else {
            self.both('L');
            index + 1
        }
    }

    fn handle_p(&mut self, index: isize) -> isize {
        let word = self.word;
        if word.at(index + 1) == 'H' {
            self.both('F');
            return index + 2;
        }
        self.both('P');
        if word.contains(index + 1, 1, &["P", "B"]) {
            index + 2
        } else {
            index + 1
        }
    }

    fn handle_r(&mut self, index: isize) -> isize {
        let word = self.word;
        if index == word.last()
            && !self.slavo_germanic
            && word.contains(index - 2, 2, &["IE"])
            && !word.contains(index - 4, 2, &["ME", "MA"])
        {
            self.push_alternate("R");
        } else {
            self.both('R');
        }
        self.skip_double(index, 'R')
    }

    fn handle_s(&mut self, index: isize) -> isize {
        let word = self.word;
        if word.contains(index - 1, 3, &["ISL", "YSL"]) {
            return index + 1;
        }
        if index == 0 && word.contains(index, 5, &["SUGAR"]) {
            self.split('X', 'S');
            return index + 1;
        }
        if word.contains(index, 2, &["SH"]) {
            if word.contains(index + 1, 4, &["HEIM", "HOEK", "HOLM", "HOLZ"]) {
                self.both('S');
            } else {
                self.both('X');
            }
            return index + 2;
        }
        if word.contains(index, 3, &["SIO", "SIA"]) || word.contains(index, 4, &["SIAN"]) {
            if self.slavo_germanic {
                self.both('S');
            } else {
                self.split('S', 'X');
            }
            return index + 3;
        }
        if (index == 0 && word.contains(index + 1, 1, &["M", "N", "L", "W"]))
            || word.contains(index + 1, 1, &["Z"])
        {
            self.split('S', 'X');
            return if word.contains(index + 1, 1, &["Z"]) {
                index + 2
            } else {
                index + 1
            };
        }
        if word.contains(index, 2, &["SC"]) {
            return self.handle_sc(index);
        }

        if index == word.last() && word.contains(index - 2, 2, &["AI", "OI"]) {
            self.push_alternate("S");
        } else {
            self.both('S');
        }
        if word.contains(index + 1, 1, &["S", "Z"]) {
            index + 2
        } else {
            index + 1
        }
    }

    fn handle_sc(&mut self, index: isize) -> isize {
        let word = self.word;
        if word.at(index + 2) == 'H' {
            if word.contains(index + 3, 2, &["OO", "ER", "EN", "UY", "ED", "EM"]) {
                if word.contains(index + 3, 2, &["ER", "EN"]) {
                    self.push("X", "SK");
                } else {
                    self.push("SK", "SK");
                }
            } else if index == 0 && !word.is_vowel_at(3) && word.at(3) != 'W' {
                self.split('X', 'S');
            } else {
                self.both('X');
            }
        } else if word.contains(index + 2, 1, &["I", "E", "Y"]) {
            self.both('S');
        } else {
            self.push("SK", "SK");
        }
        index + 3
    }

    fn handle_t(&mut self, index: isize) -> isize {
        let word = self.word;
        if word.contains(index, 4, &["TION"]) || word.contains(index, 3, &["TIA", "TCH"]) {
            self.both('X');
            return index + 3;
        }
        if word.contains(index, 2, &["TH"]) || word.contains(index, 3, &["TTH"]) {
            if word.contains(index + 2, 2, &["OM", "AM"]) || self.is_germanic() {
                self.both('T');
            } else {
                self.split('0', 'T');
            }
            return index + 2;
        }

        self.both('T');
        if word.contains(index + 1, 1, &["T", "D"]) {
            index + 2
        } else {
            index + 1
        }
    }

    fn handle_w(&mut self, index: isize) -> isize {
        let word = self.word;
        if word.contains(index, 2, &["WR"]) {
            self.both('R');
            return index + 2;
        }

        if index == 0 && (word.is_vowel_at(index + 1) || word.contains(index, 2, &["WH"])) {
            if word.is_vowel_at(index + 1) {
                self.split('A', 'F');
            } else {
                self.both('A');
            }
            return index + 1;
        }
        if (index == word.last() && word.is_vowel_at(index - 1))
            || word.contains(index - 1, 5, &["EWSKI", "EWSKY", "OWSKI", "OWSKY"])
            || word.contains(0, 3, &["SCH"])
        {
            self.push_alternate("F");
            return index + 1;
        }
        if word.contains(index, 4, &["WICZ", "WITZ"]) {
            self.push("TS", "FX");
            return index + 4;
        }
        index + 1
    }

    fn handle_x(&mut self, index: isize) -> isize {
        let word = self.word;
        if index == 0 {
            self.both('S');
            return index + 1;
        }

        let french_ending = index == word.last()
            && (word.contains(index - 3, 3, &["IAU", "EAU"])
                || word.contains(index - 2, 2, &["AU", "OU"]));
        if !french_ending {
            self.push("KS", "KS");
        }
        if word.contains(index + 1, 1, &["C", "X"]) {
            index + 2
        } else {
            index + 1
        }
    }

    fn handle_z(&mut self, index: isize) -> isize {
        let word = self.word;
        if word.at(index + 1) == 'H' {
            self.both('J');
            return index + 2;
        }

        if word.contains(index + 1, 2, &["ZO", "ZI", "ZA"])
            || (self.slavo_germanic && index > 0 && word.at(index - 1) != 'T')
        {
            self.push("S", "TS");
        } else {
            self.both('S');
        }
        self.skip_double(index, 'Z')
    }

    fn c_is_hard_in_ach(&self, index: isize) -> bool {
        let word = self.word;
        if word.contains(index, 4, &["CHIA"]) {
            return true;
        }
        if index <= 1 || word.is_vowel_at(index - 2) || !word.contains(index - 1, 3, &["ACH"]) {
            return false;
        }
        let after = word.at(index + 2);
        (after != 'I' && after != 'E') || word.contains(index - 2, 6, &["BACHER", "MACHER"])
    }

    fn ch_is_greek_initial(&self, index: isize) -> bool {
        let word = self.word;
        index == 0
            && (word.contains(index + 1, 5, &["HARAC", "HARIS"])
                || word.contains(index + 1, 3, &["HOR", "HYM", "HIA", "HEM"]))
            && !word.contains(0, 5, &["CHORE"])
    }

    fn ch_is_hard(&self, index: isize) -> bool {
        let word = self.word;
        self.is_germanic()
            || word.contains(index - 2, 6, &["ORCHES", "ARCHIT", "ORCHID"])
            || word.contains(index + 2, 1, &["T", "S"])
            || ((word.contains(index - 1, 1, &["A", "O", "U", "E"]) || index == 0)
                && (word.contains(
                    index + 2,
                    1,
                    &["L", "R", "N", "M", "B", "H", "F", "V", "W", " "],
                ) || index + 1 == word.last()))
    }

    fn ll_is_spanish(&self, index: isize) -> bool {
        let word = self.word;
        if index == word.len() - 3 && word.contains(index - 1, 4, &["ILLO", "ILLA", "ALLE"]) {
            return true;
        }
        (word.contains(word.len() - 2, 2, &["AS", "OS"])
            || word.contains(word.len() - 1, 1, &["A", "O"]))
            && word.contains(index - 1, 4, &["ALLE"])
    }

    fn m_is_doubled(&self, index: isize) -> bool {
        let word = self.word;
        if word.at(index + 1) == 'M' {
            return true;
        }
        word.contains(index - 1, 3, &["UMB"])
            && (index + 1 == word.last() || word.contains(index + 2, 2, &["ER"]))
    }
}

fn push_limited(code: &mut String, addition: &str) {
    for letter in addition.chars() {
        if code.chars().count() >= MAX_CODE_LENGTH {
            break;
        }
        code.push(letter);
    }
}
