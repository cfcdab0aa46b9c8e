use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::quote::VehicleType;

fn default_origin() -> String {
    "Japan".to_string()
}

fn default_destination() -> String {
    "Uganda".to_string()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutePriority {
    Express,
    Economy,
    /// Also absorbs priorities this service does not recognise.
    #[default]
    #[serde(other)]
    Standard,
}

impl RoutePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Express => "express",
            Self::Economy => "economy",
        }
    }
}

impl fmt::Display for RoutePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub shipment_id: i64,
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_destination")]
    pub destination: String,
    #[serde(default)]
    pub vehicle_type: Option<VehicleType>,
    #[serde(default)]
    pub priority: RoutePriority,
}

impl RouteRequest {
    pub fn vehicle_type_or_default(&self) -> VehicleType {
        self.vehicle_type.unwrap_or(VehicleType::Sedan)
    }

    pub fn cache_key(&self) -> String {
        format!(
            "route:{}:{}:{}:{}",
            self.origin.trim().to_ascii_lowercase(),
            self.destination.trim().to_ascii_lowercase(),
            self.priority,
            self.vehicle_type_or_default()
        )
    }
}

/// Recommended routing for one shipment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptimization {
    pub recommended_route: String,
    pub transit_time_days: u32,
    pub cost_range: String,
    pub alternative_routes: Vec<String>,
    pub reasoning: String,
    pub confidence_score: f64,
}

impl Default for RouteOptimization {
    fn default() -> Self {
        Self {
            recommended_route: String::new(),
            transit_time_days: 40,
            cost_range: "$2,500 - $3,500".to_string(),
            alternative_routes: Vec::new(),
            reasoning: String::new(),
            confidence_score: 0.7,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub success: bool,
    pub shipment_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization: Option<RouteOptimization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayPredictionRequest {
    pub shipment_id: i64,
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_destination")]
    pub destination: String,
    #[serde(default = "default_current_status")]
    pub current_status: String,
    #[serde(default)]
    pub current_location: Option<String>,
    #[serde(default)]
    pub expected_delivery: Option<String>,
}

fn default_current_status() -> String {
    "in_transit".to_string()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown risk level `{other}` (expected Low|Medium|High)")),
        }
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayPrediction {
    pub risk_level: RiskLevel,
    pub estimated_delay_days: u32,
    pub risk_factors: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub confidence_score: f64,
    pub reasoning: String,
}

impl Default for DelayPrediction {
    fn default() -> Self {
        Self {
            risk_level: RiskLevel::Medium,
            estimated_delay_days: 0,
            risk_factors: Vec::new(),
            recommended_actions: Vec::new(),
            confidence_score: 0.7,
            reasoning: "Analysis based on current shipping patterns".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelayPredictionResponse {
    pub success: bool,
    pub shipment_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<DelayPrediction>,
    pub analyzed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
