mod fixtures;

use fixtures::*;
use serde_json::json;
use shroud::domain::constants::CONFIG;
use shroud::domain::{ApiKeyDraft, ApiKeyFormat, RuleDraft, TemplateDraft, Tier, VaultMode};
use shroud::{StoreError, StoreSettings};
use shroud_storage::{ContextId, KeyValueStore, MemoryStore};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_api_keys_are_sealed_at_rest() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;

    let key = popup.config().add_api_key(openai_key('a')).await.unwrap();
    assert_eq!(key.format, ApiKeyFormat::Openai);

    let raw = raw_config(&store).await;
    assert_eq!(raw["apiKeyVault"]["keys"], json!([]));
    let sibling = raw["_encryptedApiKeyVault"].as_str().expect("vault sealed");
    assert!(!sibling.contains(&key.key_value));
    assert!(!raw.to_string().contains(&key.key_value));

    let reader = signed_in(&store, "background");
    let keys = reader.config().list_api_keys().await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].key_value, key.key_value);
}

#[tokio::test]
async fn test_loads_within_ttl_share_one_document() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;

    let first = popup.config().load().await.unwrap().unwrap();
    let second = popup.config().load().await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_expired_cache_is_read_again() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;

    let first = popup.config().load().await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(fast_settings().cache_ttl_ms + 50)).await;
    let second = popup.config().load().await.unwrap().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.settings, second.settings);
}

#[tokio::test]
async fn test_writes_from_another_context_invalidate_the_cache() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;
    let before = popup.config().load().await.unwrap().unwrap();

    let background = signed_in(&store, "background");
    let mut config = background.config().require().await.unwrap();
    config.settings.strict_mode = true;
    background.config().save(config).await.unwrap();

    let after = popup.config().load().await.unwrap().unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(after.settings.strict_mode);
}

#[tokio::test]
async fn test_own_writes_keep_the_cache() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;

    let mut config = popup.config().require().await.unwrap();
    config.settings.theme = "midnight".into();
    let saved = popup.config().save(config).await.unwrap();

    let loaded = popup.config().load().await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&saved, &loaded));
}

#[tokio::test]
async fn test_locked_context_preserves_sealed_fields() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;
    popup.config().add_api_key(openai_key('b')).await.unwrap();
    let sealed_before = raw_config(&store).await["_encryptedApiKeyVault"].clone();

    let worker = anonymous(&store, "worker");
    let mut config = worker.config().require().await.unwrap();
    assert!(config.api_key_vault.as_ref().is_none_or(|v| v.keys.is_empty()));
    config.settings.show_notifications = false;
    worker.config().save(config).await.unwrap();

    let raw = raw_config(&store).await;
    assert_eq!(raw["_encryptedApiKeyVault"], sealed_before);
    assert_eq!(raw["settings"]["showNotifications"], json!(false));
    assert_eq!(signed_in(&store, "popup-2").config().list_api_keys().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_vault_changes_are_refused_while_locked() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;
    popup.config().add_api_key(openai_key('c')).await.unwrap();

    let stranger = other_identity(&store, "popup-2");
    let err = stranger.config().add_api_key(openai_key('d')).await.unwrap_err();
    assert!(err.is_key_unavailable(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_plaintext_fields_are_resealed() {
    let store = MemoryStore::default();
    let key_value = format!("sk-{}", "p".repeat(48));
    store
        .set_one(
            CONFIG,
            json!({
                "version": 2,
                "account": { "tier": "free", "email": "greg@example.com" },
                "apiKeyVault": { "keys": [{
                    "id": "k1", "keyValue": key_value, "format": "openai", "createdAt": 1, "enabled": true
                }] }
            }),
        )
        .await
        .unwrap();

    let popup = signed_in(&store, "popup");
    assert!(popup.config().reseal_plaintext_fields().await.unwrap());

    let raw = raw_config(&store).await;
    assert!(raw["_encryptedApiKeyVault"].is_string());
    assert!(raw["_encryptedAccountData"].is_string());
    assert!(raw["account"].get("email").is_none());
    assert!(!raw.to_string().contains(&key_value));

    let config = popup.config().require().await.unwrap();
    assert_eq!(config.account.email.as_deref(), Some("greg@example.com"));
    assert_eq!(config.api_key_vault.unwrap().keys[0].key_value, key_value);

    assert!(!popup.config().reseal_plaintext_fields().await.unwrap());
}

#[tokio::test]
async fn test_resealing_waits_for_an_identity() {
    let store = MemoryStore::default();
    store
        .set_one(CONFIG, json!({ "version": 2, "stats": { "activityLog": [{
            "id": "a1", "timestamp": 5, "type": "substitution", "service": "chatgpt",
            "details": {}, "message": "replaced"
        }] } }))
        .await
        .unwrap();

    let worker = anonymous(&store, "worker");
    assert!(!worker.config().reseal_plaintext_fields().await.unwrap());
    assert!(raw_config(&store).await.get("_encryptedActivityLogs").is_none());
}

#[tokio::test]
async fn test_missing_templates_are_added_on_load() {
    let store = MemoryStore::default();
    store.set_one(CONFIG, json!({ "version": 2, "account": { "tier": "pro" } })).await.unwrap();

    let popup = signed_in(&store, "popup");
    let config = popup.config().load().await.unwrap().unwrap();
    let templates = config.prompt_templates.as_ref().unwrap();
    assert_eq!(templates.templates.len(), 3);
    assert_eq!(templates.max_templates, -1);
    assert!(raw_config(&store).await["promptTemplates"].is_object());
}

#[tokio::test]
async fn test_missing_templates_do_not_fail_a_locked_load() {
    let store = MemoryStore::default();
    let stored = json!({
        "version": 2,
        "account": { "tier": "free", "email": "greg@example.com" },
        "settings": {}
    });
    store.set_one(CONFIG, stored).await.unwrap();

    let worker = anonymous(&store, "worker");
    let config = worker.config().load().await.unwrap().unwrap();
    assert_eq!(config.prompt_templates.as_ref().unwrap().templates.len(), 3);
    assert_eq!(config.account.email.as_deref(), Some("greg@example.com"));

    let raw = raw_config(&store).await;
    assert!(raw.get("promptTemplates").is_none());
    assert_eq!(raw["account"]["email"], json!("greg@example.com"));

    let again = worker.config().load().await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&config, &again));
}

#[tokio::test]
async fn test_free_tier_key_rules() {
    let store = MemoryStore::default();
    let settings = StoreSettings { free_api_key_limit: 2, ..fast_settings() };
    let popup = shroud::Shroud::new(
        store.fork(ContextId::new("popup")),
        Arc::new(shroud::StaticIdentity::new(SECRET)),
        settings,
    );
    initialized(&popup, Tier::Free).await;

    let github = ApiKeyDraft { key_value: format!("ghp_{}", "x".repeat(36)), ..ApiKeyDraft::default() };
    let err = popup.config().add_api_key(github).await.unwrap_err();
    assert!(matches!(err, StoreError::ProFeatureRequired { .. }), "unexpected error: {err}");

    popup.config().add_api_key(openai_key('e')).await.unwrap();
    popup.config().add_api_key(openai_key('f')).await.unwrap();
    let err = popup.config().add_api_key(openai_key('g')).await.unwrap_err();
    assert!(matches!(err, StoreError::FreeTierLimit { .. }), "unexpected error: {err}");
}

#[tokio::test]
async fn test_paid_tier_accepts_any_format() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Pro).await;

    let key = popup
        .config()
        .add_api_key(ApiKeyDraft { key_value: format!("AKIA{}", "Z".repeat(16)), ..ApiKeyDraft::default() })
        .await
        .unwrap();
    assert_eq!(key.format, ApiKeyFormat::Aws);

    popup.config().record_api_key_protection(&key.id).await.unwrap();
    let stored = popup.config().get_api_key(&key.id).await.unwrap().unwrap();
    assert_eq!(stored.protection_count, 1);
    assert!(stored.last_used > 0);

    popup.config().remove_api_key(&key.id).await.unwrap();
    assert!(popup.config().list_api_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_vault_settings_leave_keys_alone() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;
    popup.config().add_api_key(openai_key('h')).await.unwrap();

    let vault = popup
        .config()
        .update_vault_settings(|vault| {
            vault.mode = VaultMode::AutoRedact;
            vault.keys.clear();
        })
        .await
        .unwrap();
    assert_eq!(vault.mode, VaultMode::AutoRedact);
    assert_eq!(vault.keys.len(), 1);
}

#[tokio::test]
async fn test_custom_rules_need_a_paid_tier() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;

    let draft = RuleDraft { name: "ssn".into(), pattern: r"\d{3}-\d{2}-\d{4}".into(), ..RuleDraft::default() };
    let err = popup.config().add_custom_rule(draft).await.unwrap_err();
    assert!(matches!(err, StoreError::ProFeatureRequired { .. }));
}

#[tokio::test]
async fn test_custom_rule_lifecycle() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Pro).await;

    let draft = RuleDraft {
        name: "ssn".into(),
        pattern: r"\d{3}-\d{2}-\d{4}".into(),
        replacement: "XXX-XX-XXXX".into(),
        ..RuleDraft::default()
    };
    let rule = popup.config().add_custom_rule(draft).await.unwrap();
    assert_eq!(rule.priority, 50);
    assert!(rule.enabled);
    assert!(raw_config(&store).await["_encryptedCustomRules"].is_string());

    assert!(!popup.config().toggle_custom_rule(&rule.id).await.unwrap());
    popup.config().record_rule_match(&rule.id).await.unwrap();
    let updated = popup.config().update_custom_rule(&rule.id, |r| r.priority = 90).await.unwrap();
    assert_eq!(updated.match_count, 1);
    assert_eq!(updated.priority, 90);
    assert!(updated.last_used.is_some());

    let missing = popup.config().update_custom_rule("nope", |_| {}).await.unwrap_err();
    assert!(matches!(missing, StoreError::NotFound { .. }));

    popup.config().remove_custom_rule(&rule.id).await.unwrap();
    let config = popup.config().require().await.unwrap();
    assert!(config.custom_rules.unwrap().rules.is_empty());
}

#[tokio::test]
async fn test_starter_templates_are_read_only_on_free() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;

    let err = popup
        .config()
        .update_template("starter-code-review", |t| t.name = "Mine".into())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ProFeatureRequired { .. }));

    let draft = TemplateDraft { name: "Mine".into(), content: "Hi {{name}}".into(), ..TemplateDraft::default() };
    assert!(popup.config().add_template(draft).await.is_err());
    assert!(popup.config().update_template("missing", |_| {}).await.unwrap().is_none());
}

#[tokio::test]
async fn test_template_lifecycle_on_paid_tier() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Pro).await;

    let draft = TemplateDraft { name: "Intro".into(), content: "I am {{name}}".into(), ..TemplateDraft::default() };
    let template = popup.config().add_template(draft).await.unwrap();
    assert_eq!(popup.config().list_templates().await.unwrap().len(), 4);

    let edited = popup
        .config()
        .update_template(&template.id, |t| t.content = "I am {{name}} from {{company}}".into())
        .await
        .unwrap()
        .unwrap();
    assert!(edited.updated_at >= template.updated_at);

    popup.config().record_template_usage(&template.id).await.unwrap();
    let stored = popup.config().get_template(&template.id).await.unwrap().unwrap();
    assert_eq!(stored.usage_count, 1);

    popup.config().update_template_settings(|t| t.enable_keyboard_shortcuts = false).await.unwrap();
    let config = popup.config().require().await.unwrap();
    let templates = config.prompt_templates.unwrap();
    assert!(!templates.enable_keyboard_shortcuts);
    assert_eq!(templates.templates.len(), 4);

    popup.config().remove_template(&template.id).await.unwrap();
    assert_eq!(popup.config().list_templates().await.unwrap().len(), 3);
}
