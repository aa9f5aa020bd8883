use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::timestamp::{normalize_optional, normalize_required};

/// Item category. Wire values are the Japanese strings the frontend renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    #[serde(rename = "飲食物")]
    Food,
    #[serde(rename = "物品")]
    Goods,
    #[serde(rename = "その他")]
    Other,
}

impl ItemCategory {
    pub const WIRE_VALUES: &'static [&'static str] = &["飲食物", "物品", "その他"];

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "飲食物" => Some(ItemCategory::Food),
            "物品" => Some(ItemCategory::Goods),
            "その他" => Some(ItemCategory::Other),
            _ => None,
        }
    }
}

/// An item row as stored in Postgres.
#[derive(Debug, Clone, FromRow)]
pub struct ItemModel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: i32,
    pub image_url: String,
    pub booth_area: String,
    pub booth_detail: String,
    pub exhibitor_name: String,
    pub user_id: String,
    pub user_name: String,
    pub user_picture: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub is_sold_out: bool,
    pub has_application: bool,
    pub last_application_at: Option<DateTime<Utc>>,
}

/// Display snapshot of the owner, frozen at item creation time.
/// Later profile edits do not update it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSnapshot {
    pub name: String,
    pub picture: Option<String>,
}

/// An item as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: i32,
    pub image_url: String,
    pub booth_area: String,
    pub booth_detail: String,
    pub exhibitor_name: String,
    pub user_id: String,
    pub user: UserSnapshot,
    pub posted_at: String,
    pub is_sold_out: bool,
    pub has_application: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_application_at: Option<String>,
}

/// Body of POST /api/items. Owner, timestamps and flags are server-assigned.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub booth_area: String,
    #[serde(default)]
    pub booth_detail: String,
    #[serde(default)]
    pub exhibitor_name: String,
}

/// Body of PUT /api/items/:id. Absent fields are left untouched; fields
/// outside this allow-list are ignored by deserialization and never persisted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<i64>,
    pub image_url: Option<String>,
    pub booth_area: Option<String>,
    pub booth_detail: Option<String>,
    pub exhibitor_name: Option<String>,
    pub is_sold_out: Option<bool>,
}

impl UpdateItemInput {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
            && self.booth_area.is_none()
            && self.booth_detail.is_none()
            && self.exhibitor_name.is_none()
            && self.is_sold_out.is_none()
    }
}

impl ItemModel {
    pub fn into_wire(self) -> Item {
        Item {
            id: self.id,
            name: self.name,
            description: self.description,
            category: self.category,
            price: self.price,
            image_url: self.image_url,
            booth_area: self.booth_area,
            booth_detail: self.booth_detail,
            exhibitor_name: self.exhibitor_name,
            user_id: self.user_id,
            user: UserSnapshot {
                name: self.user_name,
                picture: self.user_picture,
            },
            posted_at: normalize_required(self.posted_at),
            is_sold_out: self.is_sold_out,
            has_application: self.has_application,
            last_application_at: normalize_optional(self.last_application_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_model() -> ItemModel {
        ItemModel {
            id: "abc123".to_string(),
            name: "Tea".to_string(),
            description: "Hot tea".to_string(),
            category: "飲食物".to_string(),
            price: 0,
            image_url: "https://x/y.jpg".to_string(),
            booth_area: "A".to_string(),
            booth_detail: "Tent 3".to_string(),
            exhibitor_name: "Club X".to_string(),
            user_id: "google-sub-1".to_string(),
            user_name: "Alice".to_string(),
            user_picture: None,
            posted_at: Some(Utc.with_ymd_and_hms(2025, 11, 22, 10, 0, 0).unwrap()),
            is_sold_out: false,
            has_application: false,
            last_application_at: None,
        }
    }

    #[test]
    fn category_round_trips_japanese_wire_values() {
        for value in ItemCategory::WIRE_VALUES {
            let cat = ItemCategory::from_wire(value).unwrap();
            let json = serde_json::to_string(&cat).unwrap();
            assert_eq!(json, format!("\"{}\"", value));
        }
        assert!(ItemCategory::from_wire("food").is_none());
    }

    #[test]
    fn wire_item_uses_camel_case_and_drops_absent_last_application_at() {
        let item = sample_model().into_wire();
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["imageUrl"], "https://x/y.jpg");
        assert_eq!(value["boothDetail"], "Tent 3");
        assert_eq!(value["exhibitorName"], "Club X");
        assert_eq!(value["isSoldOut"], false);
        assert_eq!(value["price"], 0);
        assert_eq!(value["postedAt"], "2025-11-22T10:00:00.000Z");
        assert_eq!(value["user"]["name"], "Alice");
        assert!(value.get("lastApplicationAt").is_none());
    }

    #[test]
    fn last_application_at_is_serialized_when_present() {
        let mut model = sample_model();
        model.has_application = true;
        model.last_application_at =
            Some(Utc.with_ymd_and_hms(2025, 11, 22, 11, 0, 0).unwrap());
        let value = serde_json::to_value(model.into_wire()).unwrap();
        assert_eq!(value["hasApplication"], true);
        assert_eq!(value["lastApplicationAt"], "2025-11-22T11:00:00.000Z");
    }

    #[test]
    fn identical_reads_serialize_identically() {
        let a = serde_json::to_string(&sample_model().into_wire()).unwrap();
        let b = serde_json::to_string(&sample_model().into_wire()).unwrap();
        assert_eq!(a, b);
    }
}
