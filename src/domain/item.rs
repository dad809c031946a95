use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::Displayable;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Active,
    Disconnected,
}

/// A linked account connection to the external feed. The access credential
/// is held encrypted; the core only passes it through [`crate::feed::SecretCipher`]
/// and never logs or stores it in clear form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedItem {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Feed-side item identity; unique across all users.
    pub feed_item_id: String,
    pub access_token_enc: String,
    /// Opaque pagination token from the feed. Forwarded verbatim on the next
    /// sync call; never parsed.
    pub transactions_cursor: Option<String>,
    pub status: ItemStatus,
    pub institution_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LinkedItem {
    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }
}

impl Displayable for LinkedItem {
    fn display_label(&self) -> String {
        match self.institution_name.as_deref() {
            Some(name) => format!("item:{} ({name})", self.id),
            None => format!("item:{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn display_label_names_the_institution_when_known() {
        let mut item = LinkedItem {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            feed_item_id: "item-x".into(),
            access_token_enc: "enc:t".into(),
            transactions_cursor: None,
            status: ItemStatus::Active,
            institution_name: Some("First Example Bank".into()),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };
        assert!(item.display_label().contains("First Example Bank"));

        item.institution_name = None;
        assert_eq!(item.display_label(), format!("item:{}", item.id));
    }
}
