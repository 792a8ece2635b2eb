//! Integration tests for the localization pipeline
//!
//! These tests run the stages back to back against a temporary source tree
//! and a mocked OpenAI-compatible endpoint.

use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use ui_localizer::{
    config::{
        Config, Settings, EXTRACTED_TEXT_FILE, REPLACEMENT_REPORT_FILE, TRANSLATIONS_FILE,
        TRANSLATION_CACHE_FILE, TRANSLATION_MAPPING_FILE,
    },
    extract::Extractor,
    replace::{replace_sources, Replacer},
    retry::RetryConfig,
    translation::translate_extraction,
    PipelineError,
};

// ==================== Test Helpers ====================

const APP_VUE: &str = r#"<template>
  <div class="page" @click="onClick">
    <div>Hello World</div>
    <input placeholder="Search files">
  </div>
</template>

<script setup>
import { ref } from 'vue'
const done = ref('Upload complete')
</script>
"#;

/// Create a project with `src/App.vue` and a config pointing at `base_url`
fn create_project(base_url: &str) -> (TempDir, Config) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let source = temp_dir.path().join("src");
    fs::create_dir_all(&source).expect("Failed to create src");
    fs::write(source.join("App.vue"), APP_VUE).expect("Failed to write App.vue");

    let config = create_test_config(base_url, temp_dir.path(), "gpt-4o-mini");
    (temp_dir, config)
}

fn create_test_config(base_url: &str, root: &Path, model: &str) -> Config {
    Config {
        openai_api_key: "test-openai-key".to_string(),
        openai_model: model.to_string(),
        openai_base_url: base_url.to_string(),
        openai_temperature: 0.3,
        target_language: "Simplified Chinese".to_string(),
        batch_size: 10,
        batch_delay: Duration::ZERO,
        item_delay: Duration::ZERO,
        retry: RetryConfig::single_attempt(),
        settings: Settings::new(root.join("src"), root),
    }
}

fn create_openai_response(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "choices": [
            {
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }
        ]
    })
}

async fn mount_batch_translation(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-openai-key"))
        .and(body_string_contains("3 UI texts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_openai_response(
            "1. 你好世界\n2. 搜索文件\n3. 上传完成",
        )))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn extract(config: &Config) {
    let settings = &config.settings;
    let extraction = Extractor::new(&settings.source_dir)
        .extract()
        .expect("Extraction should succeed");
    extraction
        .write(&settings.artifact(EXTRACTED_TEXT_FILE))
        .expect("Should write extraction");
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).expect("Should read file"))
        .expect("Should be valid JSON")
}

// ==================== Pipeline Tests ====================

#[tokio::test]
async fn test_full_pipeline_rewrites_sources() {
    let mock_server = MockServer::start().await;
    mount_batch_translation(&mock_server, 1).await;

    let (temp_dir, config) = create_project(&format!("{}/v1", mock_server.uri()));
    let settings = &config.settings;

    extract(&config);
    let extracted = read_json(&settings.artifact(EXTRACTED_TEXT_FILE));
    let texts: Vec<&str> = extracted["texts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["Hello World", "Search files", "Upload complete"]);

    let run = translate_extraction(&config).await.expect("Translation should succeed");
    assert_eq!(run.metadata.total_texts, 3);
    assert_eq!(run.metadata.failed_translations, 0);
    assert!(settings.artifact(TRANSLATIONS_FILE).exists());

    let mapping = read_json(&settings.artifact(TRANSLATION_MAPPING_FILE));
    assert_eq!(mapping["Hello World"], "你好世界");

    let report = replace_sources(settings, false).expect("Replacement should succeed");
    assert_eq!(report.metadata.total_replacements, 3);

    let app = fs::read_to_string(settings.source_dir.join("App.vue")).unwrap();
    assert!(app.contains("<div>你好世界</div>"));
    assert!(app.contains(r#"placeholder="搜索文件""#));
    assert!(app.contains("ref('上传完成')"));
    assert!(!app.contains("Hello World"));

    let backup = fs::read_to_string(settings.backup_dir().join("App.vue")).unwrap();
    assert_eq!(backup, APP_VUE);

    let raw_report = read_json(&temp_dir.path().join(REPLACEMENT_REPORT_FILE));
    assert_eq!(raw_report["changes"][0]["file"], "App.vue");
}

#[tokio::test]
async fn test_second_run_served_from_cache() {
    let mock_server = MockServer::start().await;
    mount_batch_translation(&mock_server, 1).await;

    let (_temp_dir, config) = create_project(&format!("{}/v1", mock_server.uri()));
    extract(&config);

    translate_extraction(&config).await.expect("First run should succeed");
    let second = translate_extraction(&config).await.expect("Second run should succeed");

    assert_eq!(second.metadata.cached_translations, 3);
    assert_eq!(second.metadata.metrics.api_calls, 0);
    assert!(second.translations.iter().all(|t| t.from_cache));
}

#[tokio::test]
async fn test_cache_is_scoped_to_model() {
    let mock_server = MockServer::start().await;
    mount_batch_translation(&mock_server, 2).await;

    let (temp_dir, config) = create_project(&format!("{}/v1", mock_server.uri()));
    extract(&config);
    translate_extraction(&config).await.expect("gpt-4o-mini run should succeed");

    let other = create_test_config(&format!("{}/v1", mock_server.uri()), temp_dir.path(), "gpt-4");
    let run = translate_extraction(&other).await.expect("gpt-4 run should succeed");

    assert_eq!(run.metadata.cached_translations, 0);
    assert_eq!(run.metadata.metrics.cache_hits, 0);

    let cache = read_json(&config.settings.artifact(TRANSLATION_CACHE_FILE));
    assert_eq!(cache["cache"].as_object().unwrap().len(), 6);
}

#[tokio::test]
async fn test_provider_down_keeps_originals() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&mock_server)
        .await;

    let (_temp_dir, config) = create_project(&format!("{}/v1", mock_server.uri()));
    extract(&config);

    let run = translate_extraction(&config).await.expect("Run should still complete");

    assert_eq!(run.metadata.failed_translations, 3);
    assert!(run.translations.iter().all(|t| t.error && t.translated == t.original));
    assert!(run.mapping().is_empty());
    assert_eq!(run.metadata.metrics.batch_fallbacks, 1);
}

#[tokio::test]
async fn test_dry_run_then_restore() {
    let mock_server = MockServer::start().await;
    mount_batch_translation(&mock_server, 1).await;

    let (_temp_dir, config) = create_project(&format!("{}/v1", mock_server.uri()));
    let settings = &config.settings;
    extract(&config);
    translate_extraction(&config).await.unwrap();

    let dry = replace_sources(settings, true).unwrap();
    assert_eq!(dry.metadata.total_replacements, 3);
    assert_eq!(
        fs::read_to_string(settings.source_dir.join("App.vue")).unwrap(),
        APP_VUE
    );
    assert!(!settings.backup_dir().exists());

    replace_sources(settings, false).unwrap();
    Replacer::new(settings).restore().unwrap();
    assert_eq!(
        fs::read_to_string(settings.source_dir.join("App.vue")).unwrap(),
        APP_VUE
    );
}

// ==================== Precondition Tests ====================

#[tokio::test]
async fn test_translate_without_extraction_fails() {
    let (_temp_dir, config) = create_project("http://localhost:1/v1");

    let err = translate_extraction(&config).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::ExtractionNotFound(_))
    ));
}

#[test]
fn test_replace_without_mapping_fails() {
    let (_temp_dir, config) = create_project("http://localhost:1/v1");

    let err = replace_sources(&config.settings, false).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::MappingNotFound(_))
    ));
}

#[test]
fn test_extract_missing_source_fails() {
    let temp_dir = TempDir::new().unwrap();
    let err = Extractor::new(temp_dir.path().join("src"))
        .extract()
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::DirectoryNotFound(_))
    ));
}
