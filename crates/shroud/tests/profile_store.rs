mod fixtures;

use fixtures::*;
use serde_json::{Value, json};
use shroud::domain::constants::{ENCRYPTION_KEY_MATERIAL, PROFILES};
use shroud::domain::tier::{AiService, PiiType};
use shroud::domain::{IdentityData, ProfileDraft, ProfilePatch, Tier};
use shroud::{DecryptFault, StoreError};
use shroud_storage::{KeyValueStore, MemoryStore};

fn draft(name: &str, real: &str, alias: &str) -> ProfileDraft {
    ProfileDraft {
        profile_name: name.into(),
        real: IdentityData { name: Some(real.into()), email: Some("greg.barker@example.com".into()), ..IdentityData::default() },
        alias: IdentityData { name: Some(alias.into()), ..IdentityData::default() },
        ..ProfileDraft::default()
    }
}

#[tokio::test]
async fn test_free_tier_allows_one_profile() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;

    let profile = popup.profiles().create_profile(draft("Work", "Greg Barker", "John Smith")).await.unwrap();
    assert!(profile.variations.is_none());
    assert!(!profile.settings.enable_variations);
    assert!(profile.enabled);

    for _ in 0..2 {
        let err = popup.profiles().create_profile(draft("Home", "Greg", "Jo")).await.unwrap_err();
        assert!(matches!(err, StoreError::FreeTierLimit { .. }), "unexpected error: {err}");
    }
    assert_eq!(popup.profiles().load().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_free_tier_limit_ignores_deleted_profiles() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;

    for round in 0..3 {
        let profile = popup.profiles().create_profile(draft("Work", "Greg Barker", "John Smith")).await.unwrap();
        assert!(popup.profiles().delete_profile(&profile.id).await.unwrap(), "round {round}");
    }

    popup.profiles().create_profile(draft("Work", "Greg Barker", "John Smith")).await.unwrap();
    let err = popup.profiles().create_profile(draft("Home", "Greg", "Jo")).await.unwrap_err();
    assert!(matches!(err, StoreError::FreeTierLimit { .. }), "unexpected error: {err}");
    assert_eq!(popup.profiles().load().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_paid_tier_profiles_carry_variations() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Pro).await;

    let first = popup.profiles().create_profile(draft("Work", "Greg Barker", "John Smith")).await.unwrap();
    popup.profiles().create_profile(draft("Home", "Greg", "Jo")).await.unwrap();

    let variations = first.variations.expect("paid tier variations");
    assert!(variations.real.name.unwrap().contains(&"gbarker".to_owned()));
    assert!(variations.alias.name.unwrap().contains(&"jsmith".to_owned()));
    assert!(variations.real.email.is_some());
    assert!(variations.alias.email.is_none());
    assert!(first.settings.enable_variations);
}

#[tokio::test]
async fn test_updating_identity_regenerates_variations() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Pro).await;
    let profile = popup.profiles().create_profile(draft("Work", "Greg Barker", "John Smith")).await.unwrap();

    let patch = ProfilePatch {
        alias: Some(IdentityData { name: Some("Alex Doe".into()), ..IdentityData::default() }),
        ..ProfilePatch::default()
    };
    let updated = popup.profiles().update_profile(&profile.id, patch).await.unwrap().unwrap();

    assert_eq!(updated.alias.name.as_deref(), Some("Alex Doe"));
    let alias_names = updated.variations.unwrap().alias.name.unwrap();
    assert!(alias_names.contains(&"adoe".to_owned()));
    assert!(!alias_names.contains(&"jsmith".to_owned()));
    assert!(updated.metadata.updated_at >= profile.metadata.updated_at);
    assert_eq!(updated.metadata.created_at, profile.metadata.created_at);
}

#[tokio::test]
async fn test_updating_on_free_tier_clears_variations() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Pro).await;
    let profile = popup.profiles().create_profile(draft("Work", "Greg Barker", "John Smith")).await.unwrap();
    assert!(profile.variations.is_some());

    let mut config = popup.config().require().await.unwrap();
    config.account.tier = Tier::Free;
    popup.config().save(config).await.unwrap();

    let patch = ProfilePatch { real: Some(IdentityData::default()), ..ProfilePatch::default() };
    let updated = popup.profiles().update_profile(&profile.id, patch).await.unwrap().unwrap();
    assert!(updated.variations.is_none());

    let renamed = ProfilePatch { profile_name: Some("Office".into()), ..ProfilePatch::default() };
    let missing = popup.profiles().update_profile("unknown", renamed).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_toggle_delete_and_usage() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;
    let profile = popup.profiles().create_profile(draft("Work", "Greg Barker", "John Smith")).await.unwrap();

    assert_eq!(popup.profiles().toggle_profile(&profile.id).await.unwrap(), Some(false));
    assert_eq!(popup.profiles().toggle_profile("unknown").await.unwrap(), None);

    popup.profiles().increment_usage(&profile.id, AiService::Claude, PiiType::Email).await.unwrap();
    popup.profiles().increment_usage(&profile.id, AiService::Claude, PiiType::Name).await.unwrap();
    popup.profiles().increment_usage("unknown", AiService::Claude, PiiType::Name).await.unwrap();

    let stored = popup.profiles().get_profile(&profile.id).await.unwrap().unwrap();
    let usage = &stored.metadata.usage_stats;
    assert_eq!(usage.total_substitutions, 2);
    assert_eq!(usage.by_service.claude, 2);
    assert_eq!(usage.by_pii_type.email, 1);
    assert!(usage.last_used > 0);
    assert!(!stored.enabled);

    assert!(popup.profiles().delete_profile(&profile.id).await.unwrap());
    assert!(!popup.profiles().delete_profile(&profile.id).await.unwrap());
    assert!(popup.profiles().load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_profiles_are_one_sealed_blob() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;
    popup.profiles().create_profile(draft("Work", "Greg Barker", "John Smith")).await.unwrap();

    let raw = store.get_one(PROFILES).await.unwrap().unwrap();
    let blob = raw.as_str().expect("profiles sealed as a string");
    assert!(!blob.contains("Greg"));
}

#[tokio::test]
async fn test_locked_and_foreign_contexts_leave_the_blob_untouched() {
    let store = MemoryStore::default();
    let popup = signed_in(&store, "popup");
    initialized(&popup, Tier::Free).await;
    popup.profiles().create_profile(draft("Work", "Greg Barker", "John Smith")).await.unwrap();
    let blob = store.get_one(PROFILES).await.unwrap();

    let err = anonymous(&store, "worker").profiles().load().await.unwrap_err();
    assert!(err.is_key_unavailable(), "unexpected error: {err}");

    let err = other_identity(&store, "popup-2").profiles().load().await.unwrap_err();
    assert_eq!(err.decrypt_fault(), Some(DecryptFault::IdentityMismatch));

    assert_eq!(store.get_one(PROFILES).await.unwrap(), blob);
}

#[tokio::test]
async fn test_legacy_profiles_migrate_in_a_signed_in_context() {
    let store = MemoryStore::default();
    install_legacy_material(&store).await;
    let profiles = json!([{
        "id": "p1", "profileName": "Legacy", "real": { "name": "Greg" }, "alias": { "name": "John" },
        "metadata": { "createdAt": 1, "updatedAt": 1 }
    }]);
    store.set_one(PROFILES, json!(seal_legacy(&profiles))).await.unwrap();

    let popup = signed_in(&store, "popup");
    let loaded = popup.profiles().load().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].profile_name, "Legacy");

    let blob = store.get_one(PROFILES).await.unwrap().unwrap();
    let reopened: Value = popup.engine().decrypt(blob.as_str().unwrap()).await.unwrap();
    assert_eq!(reopened[0]["id"], json!("p1"));
    assert!(store.get_one(ENCRYPTION_KEY_MATERIAL).await.unwrap().is_none());
}

#[tokio::test]
async fn test_legacy_profiles_are_only_read_without_a_session() {
    let store = MemoryStore::default();
    install_legacy_material(&store).await;
    let sealed = json!(seal_legacy(&json!([])));
    store.set_one(PROFILES, sealed.clone()).await.unwrap();

    let worker = anonymous(&store, "worker");
    assert!(worker.profiles().load().await.unwrap().is_empty());

    assert_eq!(store.get_one(PROFILES).await.unwrap(), Some(sealed));
    assert!(store.get_one(ENCRYPTION_KEY_MATERIAL).await.unwrap().is_some());
}

#[tokio::test]
async fn test_legacy_material_outlives_unmigrated_aliases() {
    let store = MemoryStore::default();
    install_legacy_material(&store).await;
    store.set_one(PROFILES, json!(seal_legacy(&json!([])))).await.unwrap();
    store.set_one("aliases", json!(seal_legacy(&json!([])))).await.unwrap();

    let popup = signed_in(&store, "popup");
    popup.profiles().load().await.unwrap();

    assert!(store.get_one(ENCRYPTION_KEY_MATERIAL).await.unwrap().is_some());
}
