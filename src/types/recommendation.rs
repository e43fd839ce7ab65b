//! Recommendation payloads returned by the generative recommender

use serde::{Deserialize, Serialize};

/// Direction of a proposed adjustment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Increase,
    Decrease,
    Maintain,
}

impl Action {
    /// Case-insensitive parse tolerant of surrounding whitespace.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "increase" => Some(Self::Increase),
            "decrease" => Some(Self::Decrease),
            "maintain" => Some(Self::Maintain),
            _ => None,
        }
    }
}

/// One proposed parameter delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateChange {
    pub parameter: String,
    pub action: Action,
    pub new_value: f64,
}

/// Self-reported confidence of the recommender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// A recommendation as returned by the recommender.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// The candidate set, applied left to right.
    pub recommendations: Vec<CandidateChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_saving_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}
