//! Custom redaction rules. Paid tiers only for creation; every tier can manage
//! rules that already exist.

use super::ConfigStore;
use crate::error::StoreError;
use shroud_domain::rules::DEFAULT_RULE_PRIORITY;
use shroud_domain::{CustomRule, CustomRulesConfig, RuleDraft, UserConfig};
use shroud_kernel::safe_nanoid;
use shroud_kernel::time::now_millis;
use shroud_storage::KeyValueStore;
use tracing::{debug, info};

fn rules_mut(config: &mut UserConfig) -> Result<&mut CustomRulesConfig, StoreError> {
    if config.sealed.custom_rules.is_some() {
        return Err(StoreError::key_unavailable("Custom rules are still sealed"));
    }
    Ok(config.custom_rules.get_or_insert_with(CustomRulesConfig::default))
}

fn find_mut<'a>(rules: &'a mut CustomRulesConfig, id: &str) -> Result<&'a mut CustomRule, StoreError> {
    rules
        .rules
        .iter_mut()
        .find(|rule| rule.id == id)
        .ok_or_else(|| StoreError::not_found(format!("Custom rule {id}")))
}

impl<S: KeyValueStore> ConfigStore<S> {
    /// # Errors
    /// [`StoreError::ProFeatureRequired`] On the free tier.
    pub async fn add_custom_rule(&self, draft: RuleDraft) -> Result<CustomRule, StoreError> {
        let mut config = self.require().await?;
        if config.tier().is_free() {
            return Err(StoreError::pro_feature("Custom rules require PRO"));
        }

        let rule = CustomRule {
            id: safe_nanoid!(),
            name: draft.name,
            pattern: draft.pattern,
            replacement: draft.replacement,
            enabled: true,
            priority: draft.priority.unwrap_or(DEFAULT_RULE_PRIORITY),
            category: draft.category,
            description: draft.description,
            created_at: now_millis(),
            last_used: None,
            match_count: 0,
            test_cases: draft.test_cases,
        };
        rules_mut(&mut config)?.rules.push(rule.clone());

        self.save(config).await?;
        info!(rule_id = %rule.id, priority = rule.priority, "Custom rule added");
        Ok(rule)
    }

    /// Removes a rule. Unknown ids are ignored.
    pub async fn remove_custom_rule(&self, id: &str) -> Result<(), StoreError> {
        let mut config = self.require().await?;
        let rules = rules_mut(&mut config)?;
        let before = rules.rules.len();
        rules.rules.retain(|rule| rule.id != id);

        if rules.rules.len() != before {
            self.save(config).await?;
            info!(rule_id = id, "Custom rule removed");
        }
        Ok(())
    }

    /// Applies `update` to the rule with `id`.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] If no such rule exists.
    pub async fn update_custom_rule(
        &self,
        id: &str,
        update: impl FnOnce(&mut CustomRule),
    ) -> Result<CustomRule, StoreError> {
        let mut config = self.require().await?;
        let rule = find_mut(rules_mut(&mut config)?, id)?;
        update(rule);
        rule.id = id.to_owned();
        let rule = rule.clone();

        self.save(config).await?;
        debug!(rule_id = id, "Custom rule updated");
        Ok(rule)
    }

    /// Flips `enabled` and returns the new state.
    pub async fn toggle_custom_rule(&self, id: &str) -> Result<bool, StoreError> {
        let rule = self.update_custom_rule(id, |rule| rule.enabled = !rule.enabled).await?;
        Ok(rule.enabled)
    }

    pub async fn record_rule_match(&self, id: &str) -> Result<(), StoreError> {
        let now = now_millis();
        self.update_custom_rule(id, |rule| {
            rule.match_count += 1;
            rule.last_used = Some(now);
        })
        .await
        .map(drop)
    }

    /// Applies `update` to the rule set settings. The rule list is kept as stored.
    pub async fn update_rules_settings(
        &self,
        update: impl FnOnce(&mut CustomRulesConfig),
    ) -> Result<bool, StoreError> {
        let mut config = self.require().await?;
        let rules = rules_mut(&mut config)?;
        let kept = std::mem::take(&mut rules.rules);
        update(rules);
        rules.rules = kept;
        let enabled = rules.enabled;

        self.save(config).await?;
        debug!(enabled, "Custom rules settings updated");
        Ok(enabled)
    }
}
