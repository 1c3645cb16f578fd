use std::collections::HashMap;

/// Chinese punctuation the IME produces from a plain ASCII keystroke.
pub const PUNCTUATION_TABLE: &[(char, char)] = &[
    ('，', ','),
    ('。', '.'),
    ('！', '!'),
    ('？', '?'),
    ('【', '['),
    ('】', ']'),
    ('（', '('),
    ('）', ')'),
    ('；', ';'),
    ('：', ':'),
    ('“', '"'),
    ('”', '"'),
    ('‘', '\''),
    ('’', '\''),
    ('《', '<'),
    ('》', '>'),
    ('、', '\\'),
];

lazy_static::lazy_static! {
    static ref PUNCTUATION_MAP: HashMap<char, char> = PUNCTUATION_TABLE.iter().copied().collect();
}

pub fn is_chinese_punctuation(c: char) -> bool {
    PUNCTUATION_MAP.contains_key(&c)
}

pub fn translate_char(c: char) -> Option<char> {
    PUNCTUATION_MAP.get(&c).copied()
}

/// Replaces every table character by its ASCII key; other characters pass through.
pub fn translate(text: &str) -> String {
    text.chars().map(|c| translate_char(c).unwrap_or(c)).collect()
}
