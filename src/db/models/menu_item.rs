//! Menu Item Model

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use super::serde_helpers;

/// A single selectable option within a customization group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomizationOption {
    pub name: String,
    /// Price surcharge added to the unit price when selected
    #[serde(default)]
    pub surcharge: f64,
}

/// A named customization group, e.g. "Size" or "Extra toppings"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomizationGroup {
    pub name: String,
    pub options: Vec<CustomizationOption>,
}

/// Menu item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    #[serde(with = "serde_helpers::record_id")]
    pub restaurant: RecordId,
    pub name: String,
    pub description: Option<String>,
    /// Base price
    pub price: f64,
    /// Discounted price, takes precedence over `price` when set
    pub discounted_price: Option<f64>,
    #[serde(default)]
    pub customization_groups: Vec<CustomizationGroup>,
    /// Dietary tags: "vegetarian", "vegan", "gluten_free", ...
    #[serde(default)]
    pub dietary: Vec<String>,
    #[serde(default = "default_prep_minutes")]
    pub preparation_minutes: i64,
    #[serde(default = "default_true")]
    pub is_available: bool,
    pub created_at: String,
}

fn default_true() -> bool {
    true
}

fn default_prep_minutes() -> i64 {
    15
}

impl MenuItem {
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
    }

    /// Effective base price: discounted price when present
    pub fn effective_price(&self) -> f64 {
        self.discounted_price.unwrap_or(self.price)
    }

    /// Look up the surcharge for a chosen (group, option) pair
    pub fn option_surcharge(&self, group: &str, option: &str) -> Option<f64> {
        self.customization_groups
            .iter()
            .find(|g| g.name == group)?
            .options
            .iter()
            .find(|o| o.name == option)
            .map(|o| o.surcharge)
    }
}

/// Menu item creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct MenuItemCreate {
    /// Restaurant id as "restaurant:xxx"
    pub restaurant: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub discounted_price: Option<f64>,
    #[serde(default)]
    pub customization_groups: Vec<CustomizationGroup>,
    #[serde(default)]
    pub dietary: Vec<String>,
    pub preparation_minutes: Option<i64>,
}

/// Menu item update payload (partial)
#[derive(Debug, Clone, Deserialize)]
pub struct MenuItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub discounted_price: Option<f64>,
    pub customization_groups: Option<Vec<CustomizationGroup>>,
    pub dietary: Option<Vec<String>>,
    pub preparation_minutes: Option<i64>,
    pub is_available: Option<bool>,
}
