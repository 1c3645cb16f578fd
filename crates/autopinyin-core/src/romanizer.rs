use pinyin::ToPinyin;

/// Converts Han text into the key sequence the Pinyin IME expects.
pub trait Romanizer {
    fn romanize(&self, text: &str) -> String;
}

/// Tone-less Hanyu Pinyin with `ü` typed as `v`, syllables joined without separators.
///
/// Characters without a reading are kept as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct PinyinRomanizer;

impl Romanizer for PinyinRomanizer {
    fn romanize(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() * 2);
        for (c, py) in text.chars().zip(text.to_pinyin()) {
            match py {
                Some(py) => out.extend(py.plain().chars().map(|ch| if ch == 'ü' { 'v' } else { ch })),
                None => out.push(c),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_syllables() {
        let r = PinyinRomanizer;
        assert_eq!(r.romanize("你好"), "nihao");
        assert_eq!(r.romanize("世界"), "shijie");
        assert_eq!(r.romanize(""), "");
    }

    #[test]
    fn test_u_umlaut_is_typed_as_v() {
        assert_eq!(PinyinRomanizer.romanize("女"), "nv");
    }

    #[test]
    fn test_unreadable_chars_pass_through() {
        assert_eq!(PinyinRomanizer.romanize("中x"), "zhongx");
    }
}
