use crate::punctuation::is_chinese_punctuation;
use crate::types::{ClassifiedRun, RunKind};

impl RunKind {
    /// Character class, checked in priority order.
    pub fn of(c: char) -> RunKind {
        if ('\u{4e00}'..='\u{9fff}').contains(&c) {
            RunKind::Ideograph
        } else if is_chinese_punctuation(c) {
            RunKind::ChinesePunctuation
        } else if c == '\n' {
            RunKind::Newline
        } else if c.is_ascii() {
            RunKind::Ascii
        } else {
            RunKind::Other
        }
    }
}

/// Splits `text` into maximal runs of one character class, in order.
pub fn classify(text: &str) -> Vec<ClassifiedRun> {
    let mut runs: Vec<ClassifiedRun> = Vec::new();
    for c in text.chars() {
        let kind = RunKind::of(c);
        match runs.last_mut() {
            Some(run) if run.kind == kind => run.text.push(c),
            _ => runs.push(ClassifiedRun::new(kind, c.to_string())),
        }
    }
    runs
}

/// Splits a run into pieces of at most `max_chars` characters.
pub fn chunk_chars(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<(RunKind, String)> {
        classify(text).into_iter().map(|r| (r.kind, r.text)).collect()
    }

    #[test]
    fn test_mixed_input() {
        assert_eq!(
            kinds("a，世界\n"),
            vec![
                (RunKind::Ascii, "a".to_string()),
                (RunKind::ChinesePunctuation, "，".to_string()),
                (RunKind::Ideograph, "世界".to_string()),
                (RunKind::Newline, "\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(classify("").is_empty());
    }

    #[test]
    fn test_other_class() {
        assert_eq!(
            kinds("価格：€5"),
            vec![
                (RunKind::Ideograph, "価格".to_string()),
                (RunKind::ChinesePunctuation, "：".to_string()),
                (RunKind::Other, "€".to_string()),
                (RunKind::Ascii, "5".to_string()),
            ]
        );
        // Punctuation outside the table is not a punctuation run.
        assert_eq!(RunKind::of('…'), RunKind::Other);
        assert_eq!(RunKind::of('\r'), RunKind::Ascii);
    }

    #[test]
    fn test_runs_reconstruct_and_are_maximal() {
        let samples = [
            "你好，world！\n\n第二行 line2。",
            "《三体》、“黑暗森林”——刘慈欣",
            "\n",
            "abc",
            "中文中文中文中文中文中文中文中文中文中文中文",
        ];
        for s in samples {
            let runs = classify(s);
            let joined: String = runs.iter().map(|r| r.text.as_str()).collect();
            assert_eq!(joined, s);
            for pair in runs.windows(2) {
                assert_ne!(pair[0].kind, pair[1].kind, "{:?}", s);
            }
            for run in &runs {
                assert!(run.text.chars().all(|c| RunKind::of(c) == run.kind));
            }
        }
    }

    #[test]
    fn test_chunk_chars() {
        assert_eq!(chunk_chars("一二三四五六七", 3), vec!["一二三", "四五六", "七"]);
        assert_eq!(chunk_chars("一二三", 3), vec!["一二三"]);
        assert_eq!(chunk_chars("一二", 10), vec!["一二"]);
        assert!(chunk_chars("", 5).is_empty());
    }
}
