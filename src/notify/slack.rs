//! Slack message rendering and GitHub→Slack user mapping.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::effects::PrData;
use crate::types::{Identity, PrNumber};

use super::WebhookPayload;

/// Maps GitHub logins to Slack member IDs.
///
/// Stored in the repository as `{"mappings": {"octocat": "U024BE7LH"}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackUserMap {
    #[serde(default)]
    pub mappings: BTreeMap<String, String>,
}

impl SlackUserMap {
    pub fn slack_id(&self, login: &str) -> Option<&str> {
        self.mappings.get(login).map(String::as_str)
    }

    /// A Slack mention for the login, or `@login` when unmapped.
    pub fn mention_or_login(&self, login: &str) -> String {
        match self.slack_id(login) {
            Some(id) => format!("<@{}>", id),
            None => format!("@{}", login),
        }
    }

    /// Converts identities into Slack mentions, returning the mentions and the
    /// identities that have no mapping. Both lists are sorted.
    pub fn mentions<'a, I>(&self, identities: I) -> (Vec<String>, Vec<Identity>)
    where
        I: IntoIterator<Item = &'a Identity>,
    {
        let mut mentions = Vec::new();
        let mut unmapped = Vec::new();
        for identity in identities {
            match self.slack_id(identity.as_str()) {
                Some(id) => mentions.push(format!("<@{}>", id)),
                None => unmapped.push(identity.clone()),
            }
        }
        (mentions, unmapped)
    }
}

fn mrkdwn_section(text: String) -> serde_json::Value {
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": text },
    })
}

/// A stale-PR alert.
pub fn stale_pr_message(pr: PrNumber, url: &str, creator: &str, age_days: i64) -> WebhookPayload {
    WebhookPayload {
        text: format!(
            "🚨 Stale PR Detected: <{}|#{}> by @{}",
            url, pr.0, creator
        ),
        blocks: vec![mrkdwn_section(format!(
            "*🚨 Stale PR Detected*\n*PR:* <{}|#{}>\n*Creator:* @{}\n*Age:* {} days",
            url, pr.0, creator, age_days
        ))],
        ..WebhookPayload::default()
    }
}

/// Announces a PR whose required checks have passed, mentioning everyone
/// who should look at it. Unmapped people are left out of the mention list.
pub fn pr_ready_message(pr: &PrData, notify: &BTreeSet<Identity>, users: &SlackUserMap) -> WebhookPayload {
    let (mentions, unmapped) = users.mentions(notify);
    if !unmapped.is_empty() {
        let names: Vec<&str> = unmapped.iter().map(Identity::as_str).collect();
        tracing::info!(pr = %pr.number, unmapped = ?names, "No Slack mapping for some users");
    }

    let mut line = format!("*<{}|PR #{}: {}>*", pr.html_url, pr.number.0, pr.title);
    if !mentions.is_empty() {
        line.push_str(" - Notifying: ");
        line.push_str(&mentions.join(" "));
    }

    WebhookPayload {
        blocks: vec![mrkdwn_section(line)],
        ..WebhookPayload::default()
    }
}

/// Reminds a PR author that a label requires follow-up work.
pub fn metadata_reminder_message(pr: &PrData, label: &str, users: &SlackUserMap) -> WebhookPayload {
    WebhookPayload::text(format!(
        "{}, your PR *<{}|{}>* has the *'{}'* label! Don't forget to release fields in metadata.",
        users.mention_or_login(&pr.author),
        pr.html_url,
        pr.title,
        label
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::pr_data;
    use chrono::Utc;

    fn users() -> SlackUserMap {
        SlackUserMap {
            mappings: BTreeMap::from([("alice".to_string(), "U1".to_string())]),
        }
    }

    fn ids(names: &[&str]) -> BTreeSet<Identity> {
        names.iter().filter_map(|n| Identity::parse(n)).collect()
    }

    #[test]
    fn mapping_file_shape_parses() {
        let map: SlackUserMap =
            serde_json::from_str(r#"{"mappings": {"alice": "U1", "bob": "U2"}}"#).unwrap();
        assert_eq!(map.slack_id("bob"), Some("U2"));
        assert_eq!(map.slack_id("carol"), None);
    }

    #[test]
    fn unmapped_users_fall_back_to_login() {
        assert_eq!(users().mention_or_login("alice"), "<@U1>");
        assert_eq!(users().mention_or_login("bob"), "@bob");
    }

    #[test]
    fn mentions_split_mapped_and_unmapped() {
        let (mentions, unmapped) = users().mentions(&ids(&["alice", "bob"]));
        assert_eq!(mentions, vec!["<@U1>".to_string()]);
        assert_eq!(unmapped, vec![Identity::parse("bob").unwrap()]);
    }

    #[test]
    fn stale_message_has_text_and_block() {
        let payload = stale_pr_message(PrNumber(42), "https://x/42", "dave", 5);
        assert!(payload.text.contains("<https://x/42|#42> by @dave"));
        assert_eq!(payload.blocks.len(), 1);
        let block_text = payload.blocks[0]["text"]["text"].as_str().unwrap();
        assert!(block_text.ends_with("*Age:* 5 days"));
    }

    #[test]
    fn pr_ready_lists_only_mapped_mentions() {
        let pr = pr_data(7, "erin", Utc::now());
        let payload = pr_ready_message(&pr, &ids(&["alice", "bob"]), &users());
        let text = payload.blocks[0]["text"]["text"].as_str().unwrap();
        assert_eq!(
            text,
            "*<https://github.com/acme/widgets/pull/7|PR #7: PR 7>* - Notifying: <@U1>"
        );
    }

    #[test]
    fn pr_ready_without_mentions_has_no_suffix() {
        let pr = pr_data(7, "erin", Utc::now());
        let payload = pr_ready_message(&pr, &BTreeSet::new(), &users());
        let text = payload.blocks[0]["text"]["text"].as_str().unwrap();
        assert!(!text.contains("Notifying"));
    }

    #[test]
    fn metadata_reminder_mentions_author() {
        let pr = pr_data(9, "alice", Utc::now());
        let payload = metadata_reminder_message(&pr, "database", &users());
        assert!(payload.text.starts_with("<@U1>, your PR"));
        assert!(payload.text.contains("*'database'*"));
    }
}
