//! Version 1 to version 2 document conversion. Pure functions; the coordinator does
//! the reading and writing.

use crate::config::defaults;
use fxhash::FxHashMap;
use shroud_domain::constants::CONFIG_VERSION;
use shroud_domain::legacy::AliasKind;
use shroud_domain::{
    AccountInfo, AliasEntry, AliasProfile, GlobalSettings, IdentityData, Millis, ProfileMetadata,
    ProfileSettings, Stats, Tier, UsageStats, UserConfig, UserConfigV1,
};

/// Groups v1 records into profiles, one per category.
///
/// Untagged records become a profile each. Groups keep the order in which their first
/// record appears, and ids derive from the group so a rerun yields the same profiles.
#[must_use]
pub fn group_v1(entries: &[AliasEntry], now: Millis) -> Vec<AliasProfile> {
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut groups: Vec<(String, Vec<&AliasEntry>)> = Vec::new();

    for entry in entries {
        let key = entry.group_key();
        match index.get(&key) {
            Some(&at) => groups[at].1.push(entry),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![entry]));
            },
        }
    }

    groups.into_iter().filter_map(|(key, members)| profile_from_group(&key, &members, now)).collect()
}

fn profile_from_group(key: &str, members: &[&AliasEntry], now: Millis) -> Option<AliasProfile> {
    let head = *members.first()?;
    let mut real = IdentityData::default();
    let mut alias = IdentityData::default();

    for entry in members {
        let (real_slot, alias_slot) = match entry.kind {
            AliasKind::Name => (&mut real.name, &mut alias.name),
            AliasKind::Email => (&mut real.email, &mut alias.email),
            AliasKind::Phone => (&mut real.phone, &mut alias.phone),
            AliasKind::Address => (&mut real.address, &mut alias.address),
            AliasKind::Other => continue,
        };
        *real_slot = Some(entry.real_value.clone());
        *alias_slot = Some(entry.alias_value.clone());
    }

    let profile_name = if head.category.as_deref().is_some_and(|c| !c.is_empty()) {
        key.to_owned()
    } else {
        let label = real.name.as_deref().or(real.email.as_deref()).unwrap_or("Unknown");
        format!("Profile - {label}")
    };

    let usage_stats = UsageStats {
        total_substitutions: members.iter().map(|e| e.metadata.usage_count).sum(),
        last_used: members.iter().map(|e| e.metadata.last_used).max().unwrap_or_default(),
        ..UsageStats::default()
    };
    let created_at = members.iter().map(|e| e.metadata.created_at).min().unwrap_or(now);

    Some(AliasProfile {
        id: format!("v1-{key}"),
        profile_name,
        description: Some("Migrated from v1".to_owned()),
        enabled: head.enabled,
        real,
        alias,
        variations: None,
        metadata: ProfileMetadata {
            created_at,
            updated_at: now,
            usage_stats,
            confidence: head.metadata.confidence,
        },
        settings: ProfileSettings::default(),
    })
}

/// The v2 document for a v1 config. Carried over: the global switches, domain lists
/// and the aggregate stats. The account starts on the free tier.
#[must_use]
pub fn upgrade_config(old: UserConfigV1, now: Millis) -> UserConfig {
    let UserConfigV1 { settings, stats, .. } = old;

    UserConfig {
        version: CONFIG_VERSION,
        account: AccountInfo::default(),
        settings: GlobalSettings {
            enabled: settings.enabled,
            show_notifications: settings.show_notifications,
            protected_domains: settings.protected_domains,
            excluded_domains: settings.excluded_domains,
            strict_mode: settings.strict_mode,
            ..GlobalSettings::default()
        },
        stats: Stats {
            total_substitutions: stats.total_substitutions,
            success_rate: stats.success_rate,
            last_sync_timestamp: stats.last_sync_timestamp,
            ..Stats::default()
        },
        api_key_vault: None,
        custom_rules: None,
        prompt_templates: Some(defaults::templates_config(Tier::Free, now)),
        sealed: Default::default(),
        extra: Default::default(),
    }
}
