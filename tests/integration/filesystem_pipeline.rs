//! Runner writing to the filesystem stores, read back through the latest-record loader.

use super::support::{settings, ScriptedProvider, Step};
use deckwright::config::{ConfigLoader, SourceDocument, WORKSPACE_CONFIG_FILE};
use deckwright::error::DeckError;
use deckwright::generation::{Unit, UnitRunner};
use deckwright::prompt::SlidePromptCatalog;
use deckwright::provider::RemoteCallAdapter;
use deckwright::store::{latest_records, FsFallbackSink, JsonRecordStore};
use std::sync::Arc;
use tempfile::TempDir;

fn fs_runner(dir: &TempDir, provider: ScriptedProvider, debug_dump: bool) -> UnitRunner {
    let records = Arc::new(JsonRecordStore::new(dir.path().join("slides")));
    let fallback = Arc::new(FsFallbackSink::new(dir.path().join("slides/fallback")));
    let mut settings = settings(1, 3);
    settings.pre_call_delay_ms = 0;
    settings.debug_dump = debug_dump;
    UnitRunner::new(
        RemoteCallAdapter::new(Arc::new(provider), fallback.clone(), "system"),
        Arc::new(SlidePromptCatalog::new()),
        records,
        fallback,
        &settings,
    )
}

#[tokio::test]
async fn test_records_land_on_disk_and_latest_picks_them_up() {
    let dir = TempDir::new().unwrap();
    let content = "```json\n{\"title\": \"Cover\"}\n```\n---\n{\"title\": \"Motivation\"}\n---\nplain words";
    let provider = ScriptedProvider::new().script(1, vec![Step::Reply(content.to_string())]);
    let runner = fs_runner(&dir, provider, false);

    let outcome = runner
        .run("<html/>", Arc::new(Unit::new(1, 3, "cover").unwrap()))
        .await;
    assert!(outcome.success(), "{}", outcome.summary);

    let latest = latest_records(&dir.path().join("slides")).unwrap();
    let slides: Vec<u32> = latest.iter().map(|r| r.slide).collect();
    assert_eq!(slides, vec![1, 2]);
    assert_eq!(latest[0].record["title"], "Cover");

    let fallback: Vec<String> = std::fs::read_dir(dir.path().join("slides/fallback"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(fallback.len(), 1);
    assert!(fallback[0].starts_with("slide3_"));
    assert!(fallback[0].ends_with(".txt"));
}

#[tokio::test]
async fn test_mismatch_dump_is_written_when_enabled() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::new().script(4, vec![Step::Objects(1)]);
    let runner = fs_runner(&dir, provider, true);

    let outcome = runner
        .run("<html/>", Arc::new(Unit::new(4, 5, "market").unwrap()))
        .await;
    assert!(!outcome.success());

    let dumps: Vec<String> = std::fs::read_dir(dir.path().join("slides/fallback"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with("batch4-5_mismatch_"))
        .collect();
    assert_eq!(dumps.len(), 1);
}

#[tokio::test]
async fn test_repeated_saves_never_overwrite() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::new();
    let runner = fs_runner(&dir, provider, false);

    for _ in 0..3 {
        let outcome = runner
            .run("<html/>", Arc::new(Unit::new(2, 2, "").unwrap()))
            .await;
        assert!(outcome.success());
    }

    let files = std::fs::read_dir(dir.path().join("slides"))
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().is_file())
        .count();
    assert_eq!(files, 3);
}

#[test]
fn test_json_export_source_is_unwrapped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("EX2.json");
    std::fs::write(
        &path,
        r#"{"title": "deck", "content": {"html": "<h1>Company</h1>"}}"#,
    )
    .unwrap();

    let source = SourceDocument::load(&path).unwrap();
    assert_eq!(source.text, "<h1>Company</h1>");

    assert!(matches!(
        SourceDocument::load(&dir.path().join("missing.html")),
        Err(DeckError::SourceNotFound(_))
    ));
}

#[test]
fn test_environment_file_overrides_workspace_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(WORKSPACE_CONFIG_FILE),
        "[generation]\nconcurrency = 2\nmax_attempts = 5\n",
    )
    .unwrap();

    let env_name = std::env::var("DECK_ENV").unwrap_or_else(|_| "development".to_string());
    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    std::fs::write(
        dir.path().join("config").join(format!("{}.toml", env_name)),
        "[generation]\nconcurrency = 4\n",
    )
    .unwrap();

    let config = ConfigLoader::load(dir.path()).unwrap();
    assert_eq!(config.generation.concurrency, 4);
    assert_eq!(config.generation.max_attempts, 5);
}
