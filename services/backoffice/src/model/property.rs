//! Property listings as seen by the lead pipeline and view counter.
//!
//! # Purpose
//! A property is referenced weakly by leads and owns a view counter that
//! drives milestone notifications. Listing attributes use a closed set of
//! typed flags instead of an open string map.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Property {
    pub id: Uuid,
    /// Broker who receives inquiries for this listing.
    pub owner_id: String,
    pub title: String,
    pub views: u64,
    #[serde(default)]
    pub features: PropertyFeatures,
}

/// Deserializing goes through [`PropertyFeatures::from_map`], so stored rows
/// and request bodies share one closed key set.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default, PartialEq, Eq)]
#[serde(try_from = "Map<String, Value>")]
pub struct PropertyFeatures {
    pub furnished: bool,
    pub accepts_exchange: bool,
    pub accepts_financing: bool,
    pub pool: bool,
    pub barbecue: bool,
    pub gym: bool,
    pub elevator: bool,
    pub gated_community: bool,
    pub pet_friendly: bool,
    pub balcony: bool,
    pub video_url: Option<String>,
    pub virtual_tour_url: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FeatureError {
    #[error("unknown property feature: {0}")]
    Unknown(String),
    #[error("property feature {key} expects a {expected}")]
    WrongType { key: String, expected: &'static str },
}

impl PropertyFeatures {
    /// Build from a loosely-typed attribute map. Keys may use the English
    /// field names or the legacy listing keys (`mobiliado`, `piscina`, ...).
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, FeatureError> {
        let mut features = PropertyFeatures::default();
        for (key, value) in map {
            let slot = match key.as_str() {
                "furnished" | "mobiliado" => &mut features.furnished,
                "accepts_exchange" | "aceita_permuta" => &mut features.accepts_exchange,
                "accepts_financing" | "aceita_financiamento" => &mut features.accepts_financing,
                "pool" | "piscina" => &mut features.pool,
                "barbecue" | "churrasqueira" => &mut features.barbecue,
                "gym" | "academia" => &mut features.gym,
                "elevator" | "elevador" => &mut features.elevator,
                "gated_community" | "condominio_fechado" => &mut features.gated_community,
                "pet_friendly" | "aceita_pets" => &mut features.pet_friendly,
                "balcony" | "varanda" => &mut features.balcony,
                "video_url" => {
                    features.video_url = url_value(key, value)?;
                    continue;
                }
                "virtual_tour_url" | "tour_virtual_url" => {
                    features.virtual_tour_url = url_value(key, value)?;
                    continue;
                }
                other => return Err(FeatureError::Unknown(other.to_string())),
            };
            *slot = value.as_bool().ok_or_else(|| FeatureError::WrongType {
                key: key.clone(),
                expected: "boolean",
            })?;
        }
        Ok(features)
    }
}

impl TryFrom<Map<String, Value>> for PropertyFeatures {
    type Error = FeatureError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_map(&map)
    }
}

fn url_value(key: &str, value: &Value) -> Result<Option<String>, FeatureError> {
    match value {
        Value::Null => Ok(None),
        Value::String(url) if url.trim().is_empty() => Ok(None),
        Value::String(url) => Ok(Some(url.trim().to_string())),
        _ => Err(FeatureError::WrongType {
            key: key.to_string(),
            expected: "string",
        }),
    }
}
