use autopinyin_core::config::NewlineKeys;
use autopinyin_core::keys::SHIFT_ENTER;
use autopinyin_core::testing::{fast_config, ScriptedDesktop};
use autopinyin_core::types::{Conversion, ImeStatus, KeyboardKind};
use autopinyin_core::{classify, source, Config, ExhaustionPolicy, RunKind};
use std::path::PathBuf;

fn samples_dir() -> PathBuf {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("..");
    p.push("..");
    p.push("samples");
    p
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn desktop() -> ScriptedDesktop {
    ScriptedDesktop::new(ImeStatus::new(KeyboardKind::Other, Conversion::English))
        .with_pages("shijie", "", &[&["视界", "事件"], &["世界"]])
        .with_pages("nihao", "", &[&["你", "你们"]])
        .with_pages("nihao", "你", &[&["好", "号"]])
}

#[test]
fn mixed_text_classifies_into_runs() {
    init_tracing();
    let runs: Vec<(RunKind, String)> = classify("a，世界\n")
        .into_iter()
        .map(|r| (r.kind, r.text))
        .collect();
    assert_eq!(
        runs,
        vec![
            (RunKind::Ascii, "a".to_string()),
            (RunKind::ChinesePunctuation, "，".to_string()),
            (RunKind::Ideograph, "世界".to_string()),
            (RunKind::Newline, "\n".to_string()),
        ]
    );
}

#[test]
fn scripted_desktop_reproduces_mixed_text() {
    init_tracing();
    let desktop = desktop();
    let mut ap = desktop.auto_pinyin(fast_config()).expect("build");

    let report = ap.auto_input("a，世界\n").expect("auto_input");
    assert_eq!(desktop.output(), "a，世界\n");
    assert_eq!(report.runs, 4);
    assert_eq!(report.committed_chars, 5);
    assert!(report.skipped.is_empty());
    assert_eq!(desktop.taps().last(), Some(&SHIFT_ENTER));
}

#[test]
fn sample_file_round_trips_through_the_ime() {
    init_tracing();
    let text = source::load_text(samples_dir().join("mixed.txt")).expect("load sample");
    assert_eq!(text, "a，世界\n你好。\n");

    let desktop = desktop();
    let mut ap = desktop.auto_pinyin(fast_config()).expect("build");
    ap.auto_input(&text).expect("auto_input");
    assert_eq!(desktop.output(), text);
    assert_eq!(
        desktop.typed(),
        vec!["a", ",", "shijie", "nihao", "."]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
}

#[test]
fn sample_config_overrides_defaults() {
    init_tracing();
    let config = Config::load(samples_dir().join("config.json")).expect("load config");
    assert_eq!(config.split_length, 4);
    assert_eq!(config.on_exhausted, ExhaustionPolicy::Skip);
    assert_eq!(config.newline, NewlineKeys::Enter);
    assert_eq!(config.ui_respond_time_ms, 100);
    assert_eq!(config.max_page_turns, 20);
}

#[test]
fn unknown_word_is_skipped_when_allowed() {
    init_tracing();
    let desktop = desktop().with_pages("zhong", "", &[&["种", "重"]]);
    let mut ap = desktop
        .auto_pinyin(Config {
            on_exhausted: ExhaustionPolicy::Skip,
            ..fast_config()
        })
        .expect("build");

    let report = ap.auto_input("a中b").expect("auto_input");
    assert_eq!(desktop.output(), "ab");
    assert_eq!(report.skipped, vec!["中".to_string()]);
    assert!(!desktop.is_composing());
}
