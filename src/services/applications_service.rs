use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthenticatedUser;
use crate::models::{ApplicationModel, PurchaseApplication};

const APPLICATION_COLUMNS: &str = "id::text, item_id::text, applicant_id, \
     applicant_name, applicant_picture, status, created_at";

/// Response of GET /api/items/:id/my-application.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyApplication {
    pub has_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<PurchaseApplication>,
}

/// Purchase-application workflow. `apply` and `cancel` run as single
/// transactions that first lock the parent item row, so the per-(item,
/// applicant) uniqueness check and the denormalized `has_application` /
/// `last_application_at` flags stay consistent under concurrent requests.
#[derive(Clone)]
pub struct ApplicationWorkflow {
    pool: PgPool,
}

impl ApplicationWorkflow {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn apply(
        &self,
        item_id: &str,
        applicant: &AuthenticatedUser,
    ) -> AppResult<PurchaseApplication> {
        let mut tx = self.pool.begin().await?;

        let owner_id = lock_item(&mut tx, item_id).await?;
        if owner_id == applicant.uid {
            return Err(AppError::BadRequest(
                "You cannot apply to your own item.".to_string(),
            ));
        }

        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT id::text FROM purchase_applications \
             WHERE item_id = $1::uuid AND applicant_id = $2",
        )
        .bind(item_id)
        .bind(&applicant.uid)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("Already applied".to_string()));
        }

        // Snapshot the applicant's current display identity; later profile
        // edits do not update existing applications.
        let profile: Option<(String, Option<String>)> = sqlx::query_as(
            "SELECT name, picture FROM users WHERE id = $1",
        )
        .bind(&applicant.uid)
        .fetch_optional(&mut *tx)
        .await?;
        let (applicant_name, applicant_picture) = profile
            .unwrap_or_else(|| (applicant.name.clone(), applicant.picture.clone()));

        let sql = format!(
            "INSERT INTO purchase_applications \
             (item_id, applicant_id, applicant_name, applicant_picture, status) \
             VALUES ($1::uuid, $2, $3, $4, 'pending') \
             RETURNING {}",
            APPLICATION_COLUMNS
        );
        let model: ApplicationModel = sqlx::query_as(&sql)
            .bind(item_id)
            .bind(&applicant.uid)
            .bind(&applicant_name)
            .bind(applicant_picture.as_deref())
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE items SET has_application = TRUE, last_application_at = NOW() \
             WHERE id = $1::uuid",
        )
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Application created: item={}, applicant={}",
            item_id,
            applicant.uid
        );
        Ok(model.into_wire())
    }

    pub async fn cancel(
        &self,
        item_id: &str,
        applicant_id: &str,
        reason: Option<&str>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        lock_item(&mut tx, item_id).await?;

        // Deletes every row for this applicant; the invariant guarantees at
        // most one, but a stray duplicate must not survive a cancel.
        let deleted = sqlx::query(
            "DELETE FROM purchase_applications \
             WHERE item_id = $1::uuid AND applicant_id = $2",
        )
        .bind(item_id)
        .bind(applicant_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if deleted == 0 {
            return Err(AppError::NotFound(
                "No application found for this item".to_string(),
            ));
        }

        let (remaining,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM purchase_applications WHERE item_id = $1::uuid",
        )
        .bind(item_id)
        .fetch_one(&mut *tx)
        .await?;

        if remaining == 0 {
            sqlx::query(
                "UPDATE items SET has_application = FALSE, last_application_at = NULL \
                 WHERE id = $1::uuid",
            )
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Application cancelled: item={}, applicant={}, reason={}",
            item_id,
            applicant_id,
            reason.unwrap_or("(none)")
        );
        Ok(())
    }

    /// Applications under an item, newest first. Owner only.
    pub async fn list_applications(
        &self,
        item_id: &str,
        caller_id: &str,
    ) -> AppResult<Vec<PurchaseApplication>> {
        let owner_id = self.item_owner(item_id).await?;
        if owner_id != caller_id {
            return Err(AppError::Forbidden(
                "Only the item owner can view applications.".to_string(),
            ));
        }

        let sql = format!(
            "SELECT {} FROM purchase_applications \
             WHERE item_id = $1::uuid ORDER BY created_at DESC",
            APPLICATION_COLUMNS
        );
        let models: Vec<ApplicationModel> = sqlx::query_as(&sql)
            .bind(item_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(models.into_iter().map(ApplicationModel::into_wire).collect())
    }

    /// Whether (and how) the caller has applied to an item. Any
    /// authenticated user may ask about their own application.
    pub async fn my_application(
        &self,
        item_id: &str,
        caller_id: &str,
    ) -> AppResult<MyApplication> {
        self.item_owner(item_id).await?;

        let sql = format!(
            "SELECT {} FROM purchase_applications \
             WHERE item_id = $1::uuid AND applicant_id = $2",
            APPLICATION_COLUMNS
        );
        let model: Option<ApplicationModel> = sqlx::query_as(&sql)
            .bind(item_id)
            .bind(caller_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(MyApplication {
            has_applied: model.is_some(),
            application: model.map(ApplicationModel::into_wire),
        })
    }

    async fn item_owner(&self, item_id: &str) -> AppResult<String> {
        if uuid::Uuid::parse_str(item_id).is_err() {
            return Err(AppError::NotFound("Item not found".to_string()));
        }
        let row: Option<(String,)> =
            sqlx::query_as("SELECT user_id FROM items WHERE id = $1::uuid")
                .bind(item_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(owner,)| owner)
            .ok_or_else(|| AppError::NotFound("Item not found".to_string()))
    }
}

/// Read the item's owner inside the transaction, taking a row lock that
/// serializes every concurrent apply/cancel on the same item.
async fn lock_item(tx: &mut Transaction<'_, Postgres>, item_id: &str) -> AppResult<String> {
    if uuid::Uuid::parse_str(item_id).is_err() {
        return Err(AppError::NotFound("Item not found".to_string()));
    }
    let row: Option<(String,)> =
        sqlx::query_as("SELECT user_id FROM items WHERE id = $1::uuid FOR UPDATE")
            .bind(item_id)
            .fetch_optional(&mut **tx)
            .await?;
    row.map(|(owner,)| owner)
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn my_application_omits_absent_application() {
        let none = MyApplication {
            has_applied: false,
            application: None,
        };
        let value = serde_json::to_value(&none).unwrap();
        assert_eq!(value["hasApplied"], false);
        assert!(value.get("application").is_none());
    }
}
