mod fixtures;

use fixtures::*;
use serde_json::json;
use shroud::domain::constants::ARCHIVED_PRO_DATA;
use shroud::domain::{IdentityData, ProfileDraft, RuleDraft, TemplateDraft, Tier};
use shroud_storage::{KeyValueStore, MemoryStore};

const USER: &str = "user-1";

async fn paid_account_with_data(store: &MemoryStore) -> shroud::Shroud<MemoryStore> {
    let popup = signed_in(store, "popup");
    initialized(&popup, Tier::Pro).await;

    for name in ["Work", "Home"] {
        let draft = ProfileDraft {
            profile_name: name.into(),
            real: IdentityData { name: Some(format!("{name} Real")), ..IdentityData::default() },
            alias: IdentityData { name: Some(format!("{name} Alias")), ..IdentityData::default() },
            ..ProfileDraft::default()
        };
        popup.profiles().create_profile(draft).await.unwrap();
    }
    popup
        .config()
        .add_template(TemplateDraft { name: "Intro".into(), content: "I am {{name}}".into(), ..TemplateDraft::default() })
        .await
        .unwrap();
    popup
        .config()
        .add_custom_rule(RuleDraft { name: "ids".into(), pattern: r"ID-\d+".into(), ..RuleDraft::default() })
        .await
        .unwrap();
    for seed in ['a', 'b', 'c'] {
        popup.config().add_api_key(openai_key(seed)).await.unwrap();
    }
    let mut config = popup.config().require().await.unwrap();
    config.stats.total_substitutions = 99;
    popup.config().save(config).await.unwrap();

    popup
}

#[tokio::test]
async fn test_downgrade_archives_and_resets() {
    let store = MemoryStore::default();
    let popup = paid_account_with_data(&store).await;

    let record = popup.archive().downgrade(USER).await.unwrap();
    assert_eq!(record.user_id, USER);
    assert_eq!(record.expires_at - record.archived_at, 90 * 24 * 60 * 60 * 1000);

    assert!(popup.profiles().load().await.unwrap().is_empty());
    let config = popup.config().require().await.unwrap();
    assert_eq!(config.tier(), Tier::Free);
    let templates = config.prompt_templates.unwrap();
    assert!(templates.templates.iter().all(|t| t.is_starter));
    assert_eq!(templates.max_templates, 3);
    let rules = config.custom_rules.unwrap();
    assert!(!rules.enabled);
    assert!(rules.rules.is_empty());
    assert_eq!(config.api_key_vault.unwrap().keys.len(), 3);
    assert_eq!(config.stats.total_substitutions, 0);

    let stats = popup.archive().get_stats(USER).await.unwrap().unwrap();
    assert_eq!((stats.profile_count, stats.template_count, stats.rule_count), (2, 1, 1));
}

#[tokio::test]
async fn test_archive_then_restore_round_trips() {
    let store = MemoryStore::default();
    let popup = paid_account_with_data(&store).await;
    let profiles_before = popup.profiles().load().await.unwrap();

    popup.archive().downgrade(USER).await.unwrap();
    let preview = popup.archive().upgrade(USER, Tier::Pro).await.unwrap();
    assert!(preview.has_archive);
    assert_eq!(preview.archive_info.unwrap().profile_count, 2);

    assert!(popup.archive().restore(USER).await.unwrap());

    assert_eq!(popup.profiles().load().await.unwrap(), profiles_before);
    let config = popup.config().require().await.unwrap();
    assert_eq!(config.tier(), Tier::Pro);
    let templates = config.prompt_templates.unwrap().templates;
    assert_eq!(templates.len(), 4);
    assert!(templates.iter().any(|t| t.name == "Intro" && !t.is_starter));
    let rules = config.custom_rules.unwrap();
    assert!(rules.enabled);
    assert_eq!(rules.rules.len(), 1);
    assert_eq!(config.stats.total_substitutions, 99);

    assert!(store.get_one(ARCHIVED_PRO_DATA).await.unwrap().is_none());
    assert!(!popup.archive().restore(USER).await.unwrap());
}

#[tokio::test]
async fn test_upgrade_without_archive_starts_fresh() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;

    let preview = popup.archive().upgrade(USER, Tier::Enterprise).await.unwrap();
    assert!(!preview.has_archive);
    assert!(preview.archive_info.is_none());
    let config = popup.config().require().await.unwrap();
    assert_eq!(config.tier(), Tier::Enterprise);
    assert_eq!(config.prompt_templates.unwrap().max_templates, -1);
}

#[tokio::test]
async fn test_expired_archives_are_removed() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Pro).await;
    let record = popup.archive().archive(USER).await.unwrap();

    let mut expired = serde_json::to_value(&record).unwrap();
    expired["expiresAt"] = json!(record.archived_at - 1);
    store.set_one(ARCHIVED_PRO_DATA, expired).await.unwrap();

    assert!(popup.archive().get_archived_data(USER).await.unwrap().is_none());
    assert!(store.get_one(ARCHIVED_PRO_DATA).await.unwrap().is_none());
    assert!(!popup.archive().restore(USER).await.unwrap());
}

#[tokio::test]
async fn test_archives_belong_to_one_user() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Pro).await;
    popup.archive().archive(USER).await.unwrap();

    assert!(popup.archive().get_archived_data("user-2").await.unwrap().is_none());
    assert!(!popup.archive().restore("user-2").await.unwrap());
    assert!(popup.archive().get_archived_data(USER).await.unwrap().is_some());
}
