//! Restaurant Model
//!
//! Read-mostly reference data consulted by the order service during
//! checkout (price snapshot, delivery-radius check, open-hours check).

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use super::serde_helpers;

/// Physical address with coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Opening hours for one weekday, times as "HH:MM" in the restaurant's
/// local timezone. `weekday` follows chrono's numbering (Mon=0 .. Sun=6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningHours {
    pub weekday: u8,
    pub open: String,
    pub close: String,
}

/// Restaurant profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    #[serde(with = "serde_helpers::record_id")]
    pub owner: RecordId,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub cuisine: Vec<String>,
    pub address: Address,
    pub phone: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub opening_hours: Vec<OpeningHours>,
    /// IANA timezone for the opening-hours check
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub delivery_radius_km: f64,
    pub delivery_fee: f64,
    pub minimum_order: f64,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub rating_count: i64,
    pub created_at: String,
}

fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Restaurant {
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
    }

    fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    /// Whether the restaurant is open at the given instant.
    ///
    /// No opening-hours entries means always open. Entries with a close
    /// time before the open time span midnight.
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        if self.opening_hours.is_empty() {
            return true;
        }

        let local = at.with_timezone(&self.tz());
        let weekday = local.weekday().num_days_from_monday() as u8;
        let now = local.time();

        self.opening_hours.iter().any(|h| {
            let (Some(open), Some(close)) = (parse_hhmm(&h.open), parse_hhmm(&h.close)) else {
                return false;
            };
            if open <= close {
                h.weekday == weekday && now >= open && now < close
            } else {
                // Spans midnight: e.g. 18:00-02:00
                (h.weekday == weekday && now >= open)
                    || (previous_weekday(weekday) == h.weekday && now < close)
            }
        })
    }
}

fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

fn previous_weekday(weekday: u8) -> u8 {
    (weekday + 6) % 7
}

/// Restaurant creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct RestaurantCreate {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub cuisine: Vec<String>,
    pub address: Address,
    pub phone: Option<String>,
    #[serde(default)]
    pub opening_hours: Vec<OpeningHours>,
    pub timezone: Option<String>,
    pub delivery_radius_km: f64,
    pub delivery_fee: f64,
    pub minimum_order: f64,
}

/// Restaurant update payload (partial)
#[derive(Debug, Clone, Deserialize)]
pub struct RestaurantUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cuisine: Option<Vec<String>>,
    pub address: Option<Address>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub opening_hours: Option<Vec<OpeningHours>>,
    pub timezone: Option<String>,
    pub delivery_radius_km: Option<f64>,
    pub delivery_fee: Option<f64>,
    pub minimum_order: Option<f64>,
}
