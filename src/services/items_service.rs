use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{CreateItemInput, Item, ItemModel, UpdateItemInput};
use crate::validation::{validate_create, validate_update};

const ITEM_COLUMNS: &str = "id::text, name, description, category, price, image_url, \
     booth_area, booth_detail, exhibitor_name, user_id, user_name, user_picture, \
     posted_at, is_sold_out, has_application, last_application_at";

/// CRUD over the items collection. Owns field validation and ownership
/// checks; the denormalized application flags are written only by the
/// purchase-application workflow.
#[derive(Clone)]
pub struct ItemStore {
    pool: PgPool,
}

impl ItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All items, newest first, optionally restricted to one owner.
    pub async fn list(&self, filter_by_owner: Option<&str>) -> AppResult<Vec<Item>> {
        let sql = match filter_by_owner {
            Some(_) => format!(
                "SELECT {} FROM items WHERE user_id = $1 ORDER BY posted_at DESC",
                ITEM_COLUMNS
            ),
            None => format!("SELECT {} FROM items ORDER BY posted_at DESC", ITEM_COLUMNS),
        };

        let mut query = sqlx::query_as::<_, ItemModel>(&sql);
        if let Some(user_id) = filter_by_owner {
            query = query.bind(user_id);
        }

        let models = query.fetch_all(&self.pool).await?;
        Ok(models.into_iter().map(ItemModel::into_wire).collect())
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Item> {
        Ok(self.fetch_model(id).await?.into_wire())
    }

    /// Create an item for `owner_id`. The owner's display name and picture
    /// are copied into the row at this moment and never refreshed.
    pub async fn create(&self, owner_id: &str, input: CreateItemInput) -> AppResult<Item> {
        validate_create(&input).map_err(AppError::Validation)?;

        let owner: Option<(String, Option<String>)> = sqlx::query_as(
            "SELECT name, picture FROM users WHERE id = $1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        let (owner_name, owner_picture) =
            owner.unwrap_or_else(|| ("Unknown User".to_string(), None));

        let sql = format!(
            "INSERT INTO items (name, description, category, price, image_url, \
             booth_area, booth_detail, exhibitor_name, user_id, user_name, user_picture) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {}",
            ITEM_COLUMNS
        );
        let model: ItemModel = sqlx::query_as(&sql)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.category)
            .bind(input.price as i32)
            .bind(&input.image_url)
            .bind(&input.booth_area)
            .bind(&input.booth_detail)
            .bind(&input.exhibitor_name)
            .bind(owner_id)
            .bind(&owner_name)
            .bind(owner_picture.as_deref())
            .fetch_one(&self.pool)
            .await?;

        Ok(model.into_wire())
    }

    /// Update the allow-listed fields of an owned item. Absent fields keep
    /// their stored value.
    pub async fn update(
        &self,
        id: &str,
        caller_id: &str,
        input: UpdateItemInput,
    ) -> AppResult<Item> {
        validate_update(&input).map_err(AppError::Validation)?;

        let current = self.fetch_model(id).await?;
        check_update(&current, caller_id, &input)?;

        let sql = format!(
            "UPDATE items SET \
             name = COALESCE($1, name), \
             description = COALESCE($2, description), \
             category = COALESCE($3, category), \
             price = COALESCE($4, price), \
             image_url = COALESCE($5, image_url), \
             booth_area = COALESCE($6, booth_area), \
             booth_detail = COALESCE($7, booth_detail), \
             exhibitor_name = COALESCE($8, exhibitor_name), \
             is_sold_out = COALESCE($9, is_sold_out) \
             WHERE id = $10::uuid \
             RETURNING {}",
            ITEM_COLUMNS
        );
        let model: ItemModel = sqlx::query_as(&sql)
            .bind(input.name.as_deref())
            .bind(input.description.as_deref())
            .bind(input.category.as_deref())
            .bind(input.price.map(|p| p as i32))
            .bind(input.image_url.as_deref())
            .bind(input.booth_area.as_deref())
            .bind(input.booth_detail.as_deref())
            .bind(input.exhibitor_name.as_deref())
            .bind(input.is_sold_out)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(model.into_wire())
    }

    /// Delete an owned item. Existing applications under it are left in
    /// place (current product behavior).
    pub async fn delete(&self, id: &str, caller_id: &str) -> AppResult<()> {
        let current = self.fetch_model(id).await?;
        if current.user_id != caller_id {
            return Err(AppError::Forbidden(
                "You do not own this item.".to_string(),
            ));
        }

        sqlx::query("DELETE FROM items WHERE id = $1::uuid")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn fetch_model(&self, id: &str) -> AppResult<ItemModel> {
        if uuid::Uuid::parse_str(id).is_err() {
            return Err(AppError::NotFound("Item not found".to_string()));
        }

        let sql = format!("SELECT {} FROM items WHERE id = $1::uuid", ITEM_COLUMNS);
        sqlx::query_as::<_, ItemModel>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Item not found".to_string()))
    }
}

/// Ordering matters: ownership is rejected before the empty-update check,
/// so a non-owner always sees 403 and a missing item always 404, whatever
/// the body contains.
fn check_update(current: &ItemModel, caller_id: &str, input: &UpdateItemInput) -> AppResult<()> {
    if current.user_id != caller_id {
        return Err(AppError::Forbidden(
            "You do not own this item.".to_string(),
        ));
    }
    if input.is_empty() {
        return Err(AppError::BadRequest(
            "No fields to update provided.".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_item(owner: &str) -> ItemModel {
        ItemModel {
            id: "4f9c0d92-61a8-4b7e-9f52-8f4f6a2f6cf1".to_string(),
            name: "お茶".to_string(),
            description: "温かいお茶".to_string(),
            category: "飲食物".to_string(),
            price: 100,
            image_url: "https://example.com/tea.jpg".to_string(),
            booth_area: "A".to_string(),
            booth_detail: "テント3".to_string(),
            exhibitor_name: "サークルX".to_string(),
            user_id: owner.to_string(),
            user_name: "山田".to_string(),
            user_picture: None,
            posted_at: None,
            is_sold_out: false,
            has_application: false,
            last_application_at: None,
        }
    }

    #[test]
    fn foreign_caller_gets_forbidden_even_with_empty_body() {
        let err = check_update(&stored_item("owner"), "someone-else", &UpdateItemInput::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn owner_with_empty_body_gets_bad_request() {
        let err = check_update(&stored_item("owner"), "owner", &UpdateItemInput::default())
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn owner_with_fields_passes() {
        let input = UpdateItemInput {
            is_sold_out: Some(true),
            ..Default::default()
        };
        assert!(check_update(&stored_item("owner"), "owner", &input).is_ok());
    }
}
