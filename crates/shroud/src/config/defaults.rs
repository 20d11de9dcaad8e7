//! First-run documents and the starter template set.

use shroud_domain::constants::{CONFIG_VERSION, FREE_TEMPLATE_LIMIT};
use shroud_domain::{
    AccountInfo, GlobalSettings, Millis, PromptTemplate, PromptTemplatesConfig, Stats, Tier, UserConfig,
};

/// The document written when none exists.
#[must_use]
pub fn default_config(tier: Tier, now: Millis) -> UserConfig {
    UserConfig {
        version: CONFIG_VERSION,
        account: AccountInfo { tier, ..AccountInfo::default() },
        settings: GlobalSettings::default(),
        stats: Stats { last_sync_timestamp: now, ..Stats::default() },
        api_key_vault: None,
        custom_rules: None,
        prompt_templates: Some(templates_config(tier, now)),
        sealed: Default::default(),
        extra: Default::default(),
    }
}

/// Starter templates with the tier's template cap.
#[must_use]
pub fn templates_config(tier: Tier, now: Millis) -> PromptTemplatesConfig {
    PromptTemplatesConfig {
        templates: starter_templates(now),
        max_templates: max_templates(tier),
        default_profile: None,
        enable_keyboard_shortcuts: true,
    }
}

/// `-1` (unlimited) on paid tiers.
#[must_use]
pub const fn max_templates(tier: Tier) -> i32 {
    if tier.is_free() { FREE_TEMPLATE_LIMIT } else { -1 }
}

const PROFESSIONAL_EMAIL: &str = "\
Write a professional email with the following details:

From: {{name}} ({{email}})
Company: {{company}}
Subject: [Your subject here]

Please draft a polite, professional email that:
- Introduces myself and my company
- Clearly states the purpose
- Includes a call to action
- Ends with appropriate closing

Tone: Professional and friendly";

const CODE_REVIEW: &str = "\
I'm {{name}}, a developer at {{company}}. Please review the following code:

[Paste your code here]

Specifically, please check for:
- Security vulnerabilities
- Performance issues
- Code style and best practices
- Potential bugs or edge cases

Provide feedback as if you're conducting a professional code review.";

const MEETING_SUMMARY: &str = "\
Create professional meeting notes for:

Attendee: {{name}} ({{email}})
Company: {{company}}
Date: [Today's date]
Topic: [Meeting topic]

Please help me structure meeting notes that include:
- Key discussion points
- Action items and owners
- Decisions made
- Next steps and timeline

Keep it concise and professional, suitable for sharing with stakeholders.";

/// (id, name, category, description, content)
const STARTERS: [(&str, &str, &str, &str, &str); 3] = [
    (
        "starter-professional-email",
        "Professional Email",
        "Email",
        "Generate a professional email using your protected identity",
        PROFESSIONAL_EMAIL,
    ),
    (
        "starter-code-review",
        "Code Review Request",
        "Code Review",
        "Request AI to review code as your developer persona",
        CODE_REVIEW,
    ),
    (
        "starter-meeting-summary",
        "Meeting Summary",
        "Writing",
        "Create meeting notes using your work identity",
        MEETING_SUMMARY,
    ),
];

/// The fixed starter set. Starters are editable on paid tiers only.
#[must_use]
pub fn starter_templates(now: Millis) -> Vec<PromptTemplate> {
    STARTERS
        .iter()
        .map(|&(id, name, category, description, content)| PromptTemplate {
            id: id.to_owned(),
            name: name.to_owned(),
            description: Some(description.to_owned()),
            content: content.to_owned(),
            category: Some(category.to_owned()),
            tags: None,
            created_at: now,
            updated_at: now,
            usage_count: 0,
            last_used: None,
            profile_id: None,
            is_starter: true,
            readonly: false,
        })
        .collect()
}
