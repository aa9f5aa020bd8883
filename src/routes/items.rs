use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::middleware::AuthenticatedUser;
use crate::models::{CreateItemInput, Item, PurchaseApplication, UpdateItemInput};
use crate::services::applications_service::MyApplication;

use super::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemsQuery {
    /// Restrict the listing to one owner's items.
    pub user_id: Option<String>,
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListItemsQuery>,
) -> AppResult<Json<Vec<Item>>> {
    let items = state.items.list(query.user_id.as_deref()).await?;
    Ok(Json(items))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Item>> {
    let item = state.items.get_by_id(&id).await?;
    Ok(Json(item))
}

pub async fn create_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<CreateItemInput>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let item = state.items.create(&user.uid, input).await?;

    // New-listing notification is best-effort and must not delay the
    // response.
    let notifier = state.notifier.clone();
    let (subject, body) = listing_notification(&item);
    tokio::spawn(async move {
        notifier.send(&subject, &body).await;
    });

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateItemInput>,
) -> AppResult<Json<Item>> {
    let item = state.items.update(&id, &user.uid, input).await?;
    Ok(Json(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.items.delete(&id, &user.uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelBody {
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn apply(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<PurchaseApplication>)> {
    let application = state.applications.apply(&id, &user).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn cancel_application(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    body: Option<Json<CancelBody>>,
) -> AppResult<Json<serde_json::Value>> {
    let reason = body.as_ref().and_then(|b| b.reason.as_deref());
    state.applications.cancel(&id, &user.uid, reason).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_applications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<PurchaseApplication>>> {
    let applications = state.applications.list_applications(&id, &user.uid).await?;
    Ok(Json(applications))
}

pub async fn my_application(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<MyApplication>> {
    let mine = state.applications.my_application(&id, &user.uid).await?;
    Ok(Json(mine))
}

fn price_label(price: i32) -> String {
    if price == 0 {
        "無料".to_string()
    } else {
        format!("¥{}", price)
    }
}

/// Subject and plain-text body of the new-listing admin notification.
fn listing_notification(item: &Item) -> (String, String) {
    let subject = format!("【新商品登録】{}", item.name);
    let body = format!(
        "商品名: {}\n価格: {}\nカテゴリ: {}\n説明: {}\n出店団体: {}\nエリア: {}\n詳細場所: {}\n登録者: {}",
        item.name,
        price_label(item.price),
        item.category,
        item.description,
        item.exhibitor_name,
        item.booth_area,
        item.booth_detail,
        item.user.name,
    );
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserSnapshot;

    fn sample_item(price: i32) -> Item {
        Item {
            id: "abc".to_string(),
            name: "お茶".to_string(),
            description: "温かいお茶".to_string(),
            category: "飲食物".to_string(),
            price,
            image_url: "https://example.com/tea.jpg".to_string(),
            booth_area: "A".to_string(),
            booth_detail: "テント3".to_string(),
            exhibitor_name: "サークルX".to_string(),
            user_id: "user-1".to_string(),
            user: UserSnapshot {
                name: "山田".to_string(),
                picture: None,
            },
            posted_at: "2025-11-22T10:00:00.000Z".to_string(),
            is_sold_out: false,
            has_application: false,
            last_application_at: None,
        }
    }

    #[test]
    fn notification_renders_free_for_zero_price() {
        let (subject, body) = listing_notification(&sample_item(0));
        assert_eq!(subject, "【新商品登録】お茶");
        assert!(body.contains("価格: 無料"));
        assert!(!body.contains('円'));
    }

    #[test]
    fn notification_includes_price_and_exhibitor() {
        let (_, body) = listing_notification(&sample_item(500));
        assert!(body.contains("価格: ¥500"));
        assert!(body.contains("出店団体: サークルX"));
    }
}
