//! Field validation for item payloads. Every violated rule is collected and
//! reported together, never just the first one.

use url::Url;

use crate::error::FieldViolation;
use crate::models::{CreateItemInput, ItemCategory, UpdateItemInput};

fn check_non_empty(violations: &mut Vec<FieldViolation>, field: &str, value: &str) {
    if value.trim().is_empty() {
        violations.push(FieldViolation::new(
            field,
            &format!("{} must be a non-empty string", field),
        ));
    }
}

fn check_category(violations: &mut Vec<FieldViolation>, value: &str) {
    if ItemCategory::from_wire(value).is_none() {
        violations.push(FieldViolation::new(
            "category",
            &format!(
                "category must be one of: {}",
                ItemCategory::WIRE_VALUES.join(", ")
            ),
        ));
    }
}

fn check_price(violations: &mut Vec<FieldViolation>, value: i64) {
    if value < 0 || value > i32::MAX as i64 {
        violations.push(FieldViolation::new(
            "price",
            "price must be an integer >= 0",
        ));
    }
}

fn check_url(violations: &mut Vec<FieldViolation>, field: &str, value: &str) {
    if Url::parse(value).is_err() {
        violations.push(FieldViolation::new(
            field,
            &format!("{} must be a valid URL", field),
        ));
    }
}

pub fn validate_create(input: &CreateItemInput) -> Result<(), Vec<FieldViolation>> {
    let mut violations = Vec::new();
    check_non_empty(&mut violations, "name", &input.name);
    check_non_empty(&mut violations, "description", &input.description);
    check_category(&mut violations, &input.category);
    check_price(&mut violations, input.price);
    check_url(&mut violations, "imageUrl", &input.image_url);
    check_non_empty(&mut violations, "boothArea", &input.booth_area);
    check_non_empty(&mut violations, "boothDetail", &input.booth_detail);
    check_non_empty(&mut violations, "exhibitorName", &input.exhibitor_name);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Same rules as create, applied only to the fields that were supplied.
pub fn validate_update(input: &UpdateItemInput) -> Result<(), Vec<FieldViolation>> {
    let mut violations = Vec::new();
    if let Some(name) = &input.name {
        check_non_empty(&mut violations, "name", name);
    }
    if let Some(description) = &input.description {
        check_non_empty(&mut violations, "description", description);
    }
    if let Some(category) = &input.category {
        check_category(&mut violations, category);
    }
    if let Some(price) = input.price {
        check_price(&mut violations, price);
    }
    if let Some(image_url) = &input.image_url {
        check_url(&mut violations, "imageUrl", image_url);
    }
    if let Some(booth_area) = &input.booth_area {
        check_non_empty(&mut violations, "boothArea", booth_area);
    }
    if let Some(booth_detail) = &input.booth_detail {
        check_non_empty(&mut violations, "boothDetail", booth_detail);
    }
    if let Some(exhibitor_name) = &input.exhibitor_name {
        check_non_empty(&mut violations, "exhibitorName", exhibitor_name);
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> CreateItemInput {
        CreateItemInput {
            name: "Tea".to_string(),
            description: "Hot tea".to_string(),
            category: "飲食物".to_string(),
            price: 0,
            image_url: "https://x/y.jpg".to_string(),
            booth_area: "A".to_string(),
            booth_detail: "Tent 3".to_string(),
            exhibitor_name: "Club X".to_string(),
        }
    }

    #[test]
    fn valid_create_passes_with_zero_price() {
        assert!(validate_create(&valid_input()).is_ok());
    }

    #[test]
    fn negative_price_is_reported() {
        let input = CreateItemInput {
            price: -5,
            ..valid_input()
        };
        let violations = validate_create(&input).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "price");
    }

    #[test]
    fn all_violations_are_reported_together() {
        let input = CreateItemInput {
            name: "".to_string(),
            price: -1,
            category: "food".to_string(),
            ..valid_input()
        };
        let violations = validate_create(&input).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "category", "price"]);
    }

    #[test]
    fn image_url_must_parse() {
        let input = CreateItemInput {
            image_url: "not a url".to_string(),
            ..valid_input()
        };
        let violations = validate_create(&input).unwrap_err();
        assert_eq!(violations[0].field, "imageUrl");
    }

    #[test]
    fn update_checks_only_supplied_fields() {
        let input = UpdateItemInput {
            price: Some(500),
            ..Default::default()
        };
        assert!(validate_update(&input).is_ok());

        let input = UpdateItemInput {
            name: Some("".to_string()),
            price: Some(-1),
            ..Default::default()
        };
        let violations = validate_update(&input).unwrap_err();
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(UpdateItemInput::default().is_empty());
        let input = UpdateItemInput {
            is_sold_out: Some(true),
            ..Default::default()
        };
        assert!(!input.is_empty());
    }
}
