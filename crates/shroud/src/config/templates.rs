//! Prompt templates. Starter templates are seeded for every tier; custom ones
//! need a paid tier.

use super::ConfigStore;
use super::defaults;
use crate::error::StoreError;
use shroud_domain::{PromptTemplate, PromptTemplatesConfig, TemplateDraft, UserConfig};
use shroud_kernel::safe_nanoid;
use shroud_kernel::time::now_millis;
use shroud_storage::KeyValueStore;
use tracing::{debug, info};

fn templates_mut(config: &mut UserConfig) -> &mut PromptTemplatesConfig {
    let tier = config.tier();
    config.prompt_templates.get_or_insert_with(|| defaults::templates_config(tier, now_millis()))
}

impl<S: KeyValueStore> ConfigStore<S> {
    /// # Errors
    /// [`StoreError::ProFeatureRequired`] On the free tier.
    pub async fn add_template(&self, draft: TemplateDraft) -> Result<PromptTemplate, StoreError> {
        let mut config = self.require().await?;
        if config.tier().is_free() {
            return Err(StoreError::pro_feature("Custom templates require PRO"));
        }

        let now = now_millis();
        let template = PromptTemplate {
            id: safe_nanoid!(),
            name: draft.name,
            description: draft.description,
            content: draft.content,
            category: draft.category,
            tags: draft.tags,
            created_at: now,
            updated_at: now,
            usage_count: 0,
            last_used: None,
            profile_id: draft.profile_id,
            is_starter: false,
            readonly: false,
        };
        templates_mut(&mut config).templates.push(template.clone());

        self.save(config).await?;
        info!(template_id = %template.id, "Template added");
        Ok(template)
    }

    /// Removes a template. Unknown ids are ignored.
    pub async fn remove_template(&self, id: &str) -> Result<(), StoreError> {
        let mut config = self.require().await?;
        let templates = templates_mut(&mut config);
        let before = templates.templates.len();
        templates.templates.retain(|t| t.id != id);

        if templates.templates.len() != before {
            self.save(config).await?;
            info!(template_id = id, "Template removed");
        }
        Ok(())
    }

    /// Applies `update` to the template with `id` and bumps `updatedAt`.
    ///
    /// Returns `None` without writing when no such template exists.
    ///
    /// # Errors
    /// [`StoreError::ProFeatureRequired`] If a free account edits a starter template.
    pub async fn update_template(
        &self,
        id: &str,
        update: impl FnOnce(&mut PromptTemplate),
    ) -> Result<Option<PromptTemplate>, StoreError> {
        let mut config = self.require().await?;
        let free = config.tier().is_free();
        let Some(template) = templates_mut(&mut config).templates.iter_mut().find(|t| t.id == id) else {
            debug!(template_id = id, "Template not found, nothing to update");
            return Ok(None);
        };
        if free && template.is_starter {
            return Err(StoreError::pro_feature("Editing starter templates requires PRO"));
        }

        update(template);
        template.id = id.to_owned();
        template.updated_at = now_millis();
        let template = template.clone();

        self.save(config).await?;
        debug!(template_id = id, "Template updated");
        Ok(Some(template))
    }

    pub async fn get_template(&self, id: &str) -> Result<Option<PromptTemplate>, StoreError> {
        Ok(self.list_templates().await?.into_iter().find(|t| t.id == id))
    }

    pub async fn list_templates(&self) -> Result<Vec<PromptTemplate>, StoreError> {
        let config = self.load().await?;
        Ok(config.and_then(|c| c.prompt_templates.as_ref().map(|t| t.templates.clone())).unwrap_or_default())
    }

    /// Counts one use of the template. Unknown ids are ignored.
    pub async fn record_template_usage(&self, id: &str) -> Result<(), StoreError> {
        let mut config = self.require().await?;
        let Some(template) = templates_mut(&mut config).templates.iter_mut().find(|t| t.id == id) else {
            return Ok(());
        };
        template.usage_count += 1;
        template.last_used = Some(now_millis());

        self.save(config).await.map(drop)
    }

    /// Applies `update` to the template settings. The template list is kept as stored.
    pub async fn update_template_settings(
        &self,
        update: impl FnOnce(&mut PromptTemplatesConfig),
    ) -> Result<(), StoreError> {
        let mut config = self.require().await?;
        let templates = templates_mut(&mut config);
        let kept = std::mem::take(&mut templates.templates);
        update(templates);
        templates.templates = kept;

        self.save(config).await?;
        debug!("Template settings updated");
        Ok(())
    }
}
