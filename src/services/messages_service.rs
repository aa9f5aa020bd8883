use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::app_user::anonymous_name;
use crate::models::{
    Conversation, ConversationItem, ConversationModel, Message, MessageModel, OtherUser, UserModel,
};
use crate::services::notifier::Notifier;

const CONVERSATION_COLUMNS: &str = "id::text, participants, item_id::text, \
     last_message, last_message_at, created_at";
const MESSAGE_COLUMNS: &str = "id::text, conversation_id::text, sender_id, text, \
     created_at, read";

/// How much of a message is kept as the conversation preview.
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationInput {
    pub recipient_id: String,
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInput {
    pub conversation_id: String,
    pub message_id: String,
    pub reason: String,
    pub additional_info: Option<String>,
}

/// A conversation plus whether this call created it.
#[derive(Debug, Serialize)]
pub struct ConversationCreated {
    #[serde(flatten)]
    pub conversation: Conversation,
    #[serde(rename = "isNew")]
    pub is_new: bool,
}

#[derive(Debug, Serialize)]
pub struct ConversationWithMessages {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Direct messages: append-only per-conversation message lists with read
/// flags, plus moderation reports.
#[derive(Clone)]
pub struct MessageService {
    pool: PgPool,
    notifier: Notifier,
    admin_email: String,
}

impl MessageService {
    pub fn new(pool: PgPool, notifier: Notifier, admin_email: String) -> Self {
        Self {
            pool,
            notifier,
            admin_email,
        }
    }

    /// All conversations the user participates in, newest activity first,
    /// enriched with the counterpart's display identity and unread counts.
    pub async fn list_conversations(&self, user_id: &str) -> AppResult<Vec<Conversation>> {
        let sql = format!(
            "SELECT {} FROM conversations WHERE $1 = ANY(participants) \
             ORDER BY last_message_at DESC",
            CONVERSATION_COLUMNS
        );
        let models: Vec<ConversationModel> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let mut conversations = Vec::with_capacity(models.len());
        for model in models {
            let id = model.id.clone();
            let mut conversation = self.enrich(model, user_id).await?;
            conversation.unread_count = Some(self.conversation_unread(&id, user_id).await?);
            conversations.push(conversation);
        }
        Ok(conversations)
    }

    /// One conversation with its full message history, oldest first.
    /// Side effect: the counterpart's unread messages become read.
    pub async fn get_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<ConversationWithMessages> {
        let model = self.fetch_participant_conversation(conversation_id, user_id).await?;

        let sql = format!(
            "SELECT {} FROM messages WHERE conversation_id = $1::uuid \
             ORDER BY created_at ASC",
            MESSAGE_COLUMNS
        );
        let messages: Vec<MessageModel> = sqlx::query_as(&sql)
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await?;

        sqlx::query(
            "UPDATE messages SET read = TRUE \
             WHERE conversation_id = $1::uuid AND sender_id <> $2 AND read = FALSE",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(ConversationWithMessages {
            conversation: self.enrich(model, user_id).await?,
            messages: messages.into_iter().map(MessageModel::into_wire).collect(),
        })
    }

    /// Create a conversation with `recipient_id`, or return the existing one
    /// for the same pair and item.
    pub async fn create_conversation(
        &self,
        user_id: &str,
        input: CreateConversationInput,
    ) -> AppResult<ConversationCreated> {
        if input.recipient_id.trim().is_empty() {
            return Err(AppError::BadRequest("recipientId is required".to_string()));
        }
        if user_id == input.recipient_id {
            return Err(AppError::BadRequest(
                "Cannot start conversation with yourself".to_string(),
            ));
        }
        if let Some(item_id) = &input.item_id {
            if uuid::Uuid::parse_str(item_id).is_err() {
                return Err(AppError::BadRequest("itemId must be a valid id".to_string()));
            }
        }

        if let Some(item_id) = &input.item_id {
            let sql = format!(
                "SELECT {} FROM conversations \
                 WHERE $1 = ANY(participants) AND $2 = ANY(participants) \
                 AND item_id = $3::uuid",
                CONVERSATION_COLUMNS
            );
            let existing: Option<ConversationModel> = sqlx::query_as(&sql)
                .bind(user_id)
                .bind(&input.recipient_id)
                .bind(item_id)
                .fetch_optional(&self.pool)
                .await?;
            if let Some(model) = existing {
                return Ok(ConversationCreated {
                    conversation: self.enrich(model, user_id).await?,
                    is_new: false,
                });
            }
        }

        let sql = format!(
            "INSERT INTO conversations (participants, item_id) \
             VALUES ($1, $2::uuid) RETURNING {}",
            CONVERSATION_COLUMNS
        );
        let model: ConversationModel = sqlx::query_as(&sql)
            .bind(vec![user_id.to_string(), input.recipient_id.clone()])
            .bind(input.item_id.as_deref())
            .fetch_one(&self.pool)
            .await?;

        Ok(ConversationCreated {
            conversation: self.enrich(model, user_id).await?,
            is_new: true,
        })
    }

    pub async fn send_message(
        &self,
        conversation_id: &str,
        user_id: &str,
        text: &str,
    ) -> AppResult<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::BadRequest("text is required".to_string()));
        }

        self.fetch_participant_conversation(conversation_id, user_id).await?;

        let sql = format!(
            "INSERT INTO messages (conversation_id, sender_id, text) \
             VALUES ($1::uuid, $2, $3) RETURNING {}",
            MESSAGE_COLUMNS
        );
        let model: MessageModel = sqlx::query_as(&sql)
            .bind(conversation_id)
            .bind(user_id)
            .bind(text)
            .fetch_one(&self.pool)
            .await?;

        sqlx::query(
            "UPDATE conversations SET last_message = $1, last_message_at = NOW() \
             WHERE id = $2::uuid",
        )
        .bind(preview(text))
        .bind(conversation_id)
        .execute(&self.pool)
        .await?;

        Ok(model.into_wire())
    }

    /// Total unread messages across all of the user's conversations.
    pub async fn unread_count(&self, user_id: &str) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages m \
             JOIN conversations c ON c.id = m.conversation_id \
             WHERE $1 = ANY(c.participants) AND m.sender_id <> $1 AND m.read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Create-or-get the user's item-less conversation with the admin user.
    pub async fn contact_admin(&self, user_id: &str) -> AppResult<ConversationCreated> {
        let admin: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = $1 LIMIT 1")
                .bind(&self.admin_email)
                .fetch_optional(&self.pool)
                .await?;
        let (admin_id,) = admin
            .ok_or_else(|| AppError::NotFound("Admin user not found".to_string()))?;

        if user_id == admin_id {
            return Err(AppError::BadRequest(
                "Cannot contact yourself".to_string(),
            ));
        }

        let sql = format!(
            "SELECT {} FROM conversations \
             WHERE $1 = ANY(participants) AND $2 = ANY(participants) \
             AND item_id IS NULL",
            CONVERSATION_COLUMNS
        );
        let existing: Option<ConversationModel> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(&admin_id)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(model) = existing {
            return Ok(ConversationCreated {
                conversation: self.enrich(model, user_id).await?,
                is_new: false,
            });
        }

        let sql = format!(
            "INSERT INTO conversations (participants) VALUES ($1) RETURNING {}",
            CONVERSATION_COLUMNS
        );
        let model: ConversationModel = sqlx::query_as(&sql)
            .bind(vec![user_id.to_string(), admin_id])
            .fetch_one(&self.pool)
            .await?;

        Ok(ConversationCreated {
            conversation: self.enrich(model, user_id).await?,
            is_new: true,
        })
    }

    /// Record a moderation report and notify the admin. The email is
    /// best-effort; the report row is saved either way.
    pub async fn report(
        &self,
        user_id: &str,
        user_email: &str,
        input: ReportInput,
    ) -> AppResult<()> {
        self.fetch_participant_conversation(&input.conversation_id, user_id)
            .await?;

        if uuid::Uuid::parse_str(&input.message_id).is_err() {
            return Err(AppError::NotFound("Message not found".to_string()));
        }
        let message: Option<(String, String)> = sqlx::query_as(
            "SELECT sender_id, text FROM messages \
             WHERE id = $1::uuid AND conversation_id = $2::uuid",
        )
        .bind(&input.message_id)
        .bind(&input.conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        let (reported_user_id, message_text) =
            message.ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

        let email_body = format!(
            "A message was reported.\n\n\
             Reporter: {} ({})\n\
             Reported user: {}\n\
             Conversation: {}\n\
             Message: {}\n\
             Reason: {}\n\
             Additional info: {}\n",
            user_id,
            user_email,
            reported_user_id,
            input.conversation_id,
            message_text,
            input.reason,
            input.additional_info.as_deref().unwrap_or("(none)"),
        );
        let email_sent = self
            .notifier
            .send("【通報】メッセージが報告されました", &email_body)
            .await;

        sqlx::query(
            "INSERT INTO reports (reporter_id, reported_user_id, conversation_id, \
             message_id, message_text, reason, additional_info, email_sent) \
             VALUES ($1, $2, $3::uuid, $4::uuid, $5, $6, $7, $8)",
        )
        .bind(user_id)
        .bind(&reported_user_id)
        .bind(&input.conversation_id)
        .bind(&input.message_id)
        .bind(&message_text)
        .bind(&input.reason)
        .bind(input.additional_info.as_deref())
        .bind(email_sent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn conversation_unread(&self, conversation_id: &str, user_id: &str) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages \
             WHERE conversation_id = $1::uuid AND sender_id <> $2 AND read = FALSE",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn fetch_participant_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<ConversationModel> {
        if uuid::Uuid::parse_str(conversation_id).is_err() {
            return Err(AppError::NotFound("Conversation not found".to_string()));
        }
        let sql = format!(
            "SELECT {} FROM conversations WHERE id = $1::uuid",
            CONVERSATION_COLUMNS
        );
        let model: Option<ConversationModel> = sqlx::query_as(&sql)
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await?;
        let model = model
            .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;
        if !model.participants.iter().any(|p| p == user_id) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
        Ok(model)
    }

    /// Resolve the counterpart's display identity and the attached item
    /// summary. Display names are the user's chosen alias (never the Google
    /// profile name); an attached item's exhibitor name wins over both.
    async fn enrich(&self, model: ConversationModel, user_id: &str) -> AppResult<Conversation> {
        let other_id = model
            .participants
            .iter()
            .find(|p| *p != user_id)
            .cloned();
        let item_id = model.item_id.clone();
        let mut conversation = model.into_wire();

        if let Some(other_id) = other_id {
            let user: Option<UserModel> = sqlx::query_as(
                "SELECT id, email, name, picture, display_name, display_picture \
                 FROM users WHERE id = $1",
            )
            .bind(&other_id)
            .fetch_optional(&self.pool)
            .await?;
            conversation.other_user = Some(match user {
                Some(user) => OtherUser {
                    name: user.public_name(),
                    picture: user.display_picture,
                    id: other_id,
                },
                None => OtherUser {
                    name: anonymous_name(&other_id),
                    picture: None,
                    id: other_id,
                },
            });
        }

        if let Some(item_id) = item_id {
            let row: Option<(String, String, String)> = sqlx::query_as(
                "SELECT name, image_url, exhibitor_name FROM items WHERE id = $1::uuid",
            )
            .bind(&item_id)
            .fetch_optional(&self.pool)
            .await?;
            if let Some((name, image_url, exhibitor_name)) = row {
                if let Some(other) = conversation.other_user.as_mut() {
                    if !exhibitor_name.is_empty() {
                        other.name = exhibitor_name.clone();
                    }
                }
                conversation.item = Some(ConversationItem {
                    name,
                    image_url,
                    exhibitor_name: Some(exhibitor_name),
                });
            }
        }

        Ok(conversation)
    }
}

/// First `PREVIEW_CHARS` characters of a message, safe on multi-byte text.
fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let long = "あ".repeat(150);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 100);
        assert_eq!(p, "あ".repeat(100));

        assert_eq!(preview("short"), "short");
    }
}
