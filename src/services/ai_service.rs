use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};

const GEMINI_MODEL: &str = "gemini-2.5-flash-lite";
const MAX_GENERATIONS_PER_DAY: i32 = 3;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDescriptionInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price: Option<i64>,
    pub exhibitor_name: Option<String>,
    pub booth_detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedDescription {
    pub description: String,
    pub remaining: i32,
}

#[derive(Debug, Serialize)]
pub struct AiUsage {
    pub remaining: i32,
    pub used: i32,
    pub limit: i32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

/// Item-description generation backed by Gemini, rate-limited to
/// three generations per user per day.
#[derive(Clone)]
pub struct AiService {
    pool: PgPool,
    client: reqwest::Client,
    api_key: Option<String>,
}

impl AiService {
    pub fn new(pool: PgPool, api_key: Option<String>) -> Self {
        if api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set, description generation disabled");
        }
        Self {
            pool,
            client: reqwest::Client::new(),
            api_key,
        }
    }

    pub async fn generate_description(
        &self,
        user_id: &str,
        input: GenerateDescriptionInput,
    ) -> AppResult<GeneratedDescription> {
        let price = match input.price {
            Some(price) if !input.name.is_empty() && !input.category.is_empty() => price,
            _ => {
                return Err(AppError::BadRequest(
                    "name, category and price are required".to_string(),
                ))
            }
        };

        let remaining = self.consume_quota(user_id).await?;

        let prompt = build_prompt(
            &input.name,
            &input.category,
            price,
            input.exhibitor_name.as_deref(),
        );
        let description = self.call_gemini(&prompt).await?;

        Ok(GeneratedDescription {
            description,
            remaining,
        })
    }

    pub async fn usage(&self, user_id: &str) -> AppResult<AiUsage> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT count FROM ai_usage WHERE user_id = $1 AND date = CURRENT_DATE",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        let used = row.map(|(c,)| c).unwrap_or(0);
        Ok(AiUsage {
            remaining: (MAX_GENERATIONS_PER_DAY - used).max(0),
            used,
            limit: MAX_GENERATIONS_PER_DAY,
        })
    }

    /// Take one generation from today's quota. The upsert increments
    /// atomically, so concurrent calls cannot exceed the limit.
    async fn consume_quota(&self, user_id: &str) -> AppResult<i32> {
        let (count,): (i32,) = sqlx::query_as(
            "INSERT INTO ai_usage (user_id, date, count) VALUES ($1, CURRENT_DATE, 1) \
             ON CONFLICT (user_id, date) DO UPDATE \
             SET count = ai_usage.count + 1 \
             WHERE ai_usage.count < $2 \
             RETURNING count",
        )
        .bind(user_id)
        .bind(MAX_GENERATIONS_PER_DAY)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::RateLimited(
                "本日の生成回数の上限に達しました。明日また利用できます。".to_string(),
            )
        })?;

        Ok(MAX_GENERATIONS_PER_DAY - count)
    }

    async fn call_gemini(&self, prompt: &str) -> AppResult<String> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            AppError::Internal("GEMINI_API_KEY is not configured".to_string())
        })?;

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            GEMINI_MODEL
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "Gemini returned status {}",
                response.status()
            )));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Gemini response parse failed: {}", e)))?;

        parsed
            .candidates
            .and_then(|mut c| c.drain(..).next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|mut p| p.drain(..).next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Internal("Gemini returned no text".to_string()))
    }
}

fn build_prompt(name: &str, category: &str, price: i64, exhibitor_name: Option<&str>) -> String {
    let price_text = if price == 0 {
        "無料".to_string()
    } else {
        format!("{}円", price)
    };
    let exhibitor_text = exhibitor_name
        .map(|e| format!("出店者: {}", e))
        .unwrap_or_default();

    format!(
        "あなたは駒場祭（東京大学の学園祭）のフリマアプリで使用される商品説明を生成するAIアシスタントです。\n\n\
         以下の情報を元に、魅力的で分かりやすい商品説明を生成してください。\n\n\
         【商品情報】\n\
         - 商品名: {name}\n\
         - カテゴリ: {category}\n\
         - 価格: {price_text}\n\
         {exhibitor_text}\n\n\
         【要件】\n\
         - 2〜3文程度の簡潔な説明にしてください\n\
         - 駒場祭の雰囲気に合った、親しみやすい文体で書いてください\n\
         - 商品の魅力や特徴を強調してください\n\
         - 「です・ます調」を使用してください\n\
         - 絵文字は使用しないでください\n\
         - 商品名やカテゴリをそのまま繰り返さないでください\n\
         - 実際には存在しない詳細情報（味、サイズ、材料など）を勝手に追加しないでください\n\n\
         商品説明のみを出力してください。"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_renders_free_items_as_muryo() {
        let prompt = build_prompt("お茶", "飲食物", 0, Some("Club X"));
        assert!(prompt.contains("- 価格: 無料"));
        assert!(prompt.contains("出店者: Club X"));
    }

    #[test]
    fn prompt_renders_priced_items_in_yen() {
        let prompt = build_prompt("マグカップ", "物品", 500, None);
        assert!(prompt.contains("- 価格: 500円"));
        assert!(!prompt.contains("出店者:"));
    }
}
