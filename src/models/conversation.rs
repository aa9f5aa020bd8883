use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::timestamp::normalize_required;

#[derive(Debug, Clone, FromRow)]
pub struct ConversationModel {
    pub id: String,
    pub participants: Vec<String>,
    pub item_id: Option<String>,
    pub last_message: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Display info about the other participant, resolved at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtherUser {
    pub id: String,
    pub name: String,
    pub picture: Option<String>,
}

/// Summary of the item a conversation is attached to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationItem {
    pub name: String,
    pub image_url: String,
    pub exhibitor_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub participants: Vec<String>,
    pub item_id: Option<String>,
    pub last_message: String,
    pub last_message_at: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_user: Option<OtherUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ConversationItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<i64>,
}

impl ConversationModel {
    pub fn into_wire(self) -> Conversation {
        Conversation {
            id: self.id,
            participants: self.participants,
            item_id: self.item_id,
            last_message: self.last_message,
            last_message_at: normalize_required(self.last_message_at),
            created_at: normalize_required(self.created_at),
            other_user: None,
            item: None,
            unread_count: None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    pub created_at: String,
    pub read: bool,
}

impl MessageModel {
    pub fn into_wire(self) -> Message {
        Message {
            id: self.id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            text: self.text,
            created_at: normalize_required(self.created_at),
            read: self.read,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn conversation_wire_shape() {
        let model = ConversationModel {
            id: "conv-1".to_string(),
            participants: vec!["u1".to_string(), "u2".to_string()],
            item_id: Some("item-1".to_string()),
            last_message: "hello".to_string(),
            last_message_at: Some(Utc.with_ymd_and_hms(2025, 11, 22, 13, 0, 0).unwrap()),
            created_at: Some(Utc.with_ymd_and_hms(2025, 11, 22, 12, 0, 0).unwrap()),
        };
        let value = serde_json::to_value(model.into_wire()).unwrap();
        assert_eq!(value["itemId"], "item-1");
        assert_eq!(value["lastMessage"], "hello");
        assert_eq!(value["lastMessageAt"], "2025-11-22T13:00:00.000Z");
        // Enrichment fields are omitted until resolved.
        assert!(value.get("otherUser").is_none());
        assert!(value.get("unreadCount").is_none());
    }
}
