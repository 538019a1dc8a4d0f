//! Narration scripts from records on disk through a scripted provider.

use async_trait::async_trait;
use deckwright::error::ProviderError;
use deckwright::narration::{write_scripts, NarrationSettings, ScriptGenerator, NARRATION_SYSTEM_PROMPT};
use deckwright::provider::{
    ChatMessage, CompletionOptions, CompletionResponse, ModelProviderClient, RemoteCallAdapter,
};
use deckwright::store::{latest_records, FsFallbackSink, JsonRecordStore, RecordStore};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

/// Writes one script per `"slideNumber": N` in the prompt, titled after the
/// slide's `mainTitle`. Slides in `failing` answer with HTTP 500.
#[derive(Default)]
struct NarrationProvider {
    failing: Vec<u32>,
    requests: Mutex<Vec<(Vec<u32>, Option<f32>, String)>>,
}

fn values_after<'a>(prompt: &'a str, marker: &str, end: char) -> Vec<&'a str> {
    prompt
        .split(marker)
        .skip(1)
        .filter_map(|rest| rest.split(end).next())
        .collect()
}

#[async_trait]
impl ModelProviderClient for NarrationProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ProviderError> {
        let prompt = messages[messages.len() - 1].content.clone();
        let slides: Vec<u32> = values_after(&prompt, "\"slideNumber\": ", ',')
            .into_iter()
            .filter_map(|n| n.parse().ok())
            .collect();
        let titles = values_after(&prompt, "\"mainTitle\": \"", '"');
        self.requests
            .lock()
            .push((slides.clone(), options.temperature, messages[0].content.clone()));

        if slides.iter().any(|s| self.failing.contains(s)) {
            return Err(ProviderError::Status {
                status: 500,
                body: "upstream".to_string(),
            });
        }

        let content = slides
            .iter()
            .zip(titles)
            .map(|(slide, title)| {
                json!({
                    "slideNumber": slide,
                    "title": title,
                    "narration": "spoken text",
                    "talkPoints": ["one", "two", "three"],
                })
                .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n---\n");

        Ok(CompletionResponse {
            content,
            model: "narration".to_string(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "narration"
    }
}

fn seed_records(dir: &TempDir) -> std::path::PathBuf {
    let slides = dir.path().join("slides");
    let store = JsonRecordStore::new(&slides);
    store.save("slide1", &json!({"mainTitle": "old cover"})).unwrap();
    store.save("slide1", &json!({"mainTitle": "new cover"})).unwrap();
    for slide in 2..=4 {
        store
            .save(&format!("slide{}", slide), &json!({"mainTitle": format!("title {}", slide)}))
            .unwrap();
    }
    slides
}

fn generator(
    dir: &TempDir,
    provider: Arc<NarrationProvider>,
    settings: &NarrationSettings,
) -> ScriptGenerator {
    let fallback = Arc::new(FsFallbackSink::new(dir.path().join("slides/fallback")));
    let adapter = RemoteCallAdapter::new(provider, fallback, NARRATION_SYSTEM_PROMPT)
        .with_options(CompletionOptions {
            temperature: Some(settings.temperature),
            max_tokens: None,
        });
    ScriptGenerator::new(adapter, settings, 1)
}

#[tokio::test]
async fn test_scripts_follow_latest_records_in_batches() {
    let dir = TempDir::new().unwrap();
    let slides_dir = seed_records(&dir);
    let provider = Arc::new(NarrationProvider::default());
    let settings = NarrationSettings {
        batch_size: 2,
        max_slides: Some(3),
        ..NarrationSettings::default()
    };

    let slides = settings.select(latest_records(&slides_dir).unwrap());
    let report = generator(&dir, provider.clone(), &settings).generate(&slides).await;
    assert!(report.is_complete());

    let path = write_scripts(&dir.path().join("slide_scripts"), &report.scripts).unwrap();
    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let titles: Vec<&str> = written
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["new cover", "title 2", "title 3"]);

    let requests = provider.requests.lock();
    let batches: Vec<Vec<u32>> = requests.iter().map(|r| r.0.clone()).collect();
    assert_eq!(batches, vec![vec![1, 2], vec![3]]);
    assert!(requests.iter().all(|r| r.1 == Some(0.6)));
    assert!(requests.iter().all(|r| r.2 == NARRATION_SYSTEM_PROMPT));
}

#[tokio::test]
async fn test_failed_slide_is_reported_and_dumped() {
    let dir = TempDir::new().unwrap();
    let slides_dir = seed_records(&dir);
    let provider = Arc::new(NarrationProvider {
        failing: vec![2],
        ..NarrationProvider::default()
    });
    let settings = NarrationSettings::default();

    let slides = settings.select(latest_records(&slides_dir).unwrap());
    let report = generator(&dir, provider, &settings).generate(&slides).await;

    let narrated: Vec<u64> = report
        .scripts
        .iter()
        .filter_map(|s| s["slideNumber"].as_u64())
        .collect();
    assert_eq!(narrated, vec![1, 3, 4]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].slides, vec![2]);

    let dumps: Vec<String> = std::fs::read_dir(dir.path().join("slides/fallback"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(dumps.len(), 1);
    assert!(dumps[0].starts_with("scripts2-2_call_"));
}
