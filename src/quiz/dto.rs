use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::quiz::repo::QuizAttempt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Truth,
    Dare,
}

impl CardType {
    pub fn as_str(self) -> &'static str {
        match self {
            CardType::Truth => "truth",
            CardType::Dare => "dare",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "truth" => Some(CardType::Truth),
            "dare" => Some(CardType::Dare),
            _ => None,
        }
    }
}

/// Kept as a raw string so an unknown type is a 400 with our message
/// rather than a query rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CardQuery {
    #[serde(default, rename = "type")]
    pub card_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    #[serde(default, alias = "cardId")]
    pub card_id: Option<Uuid>,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub success: bool,
    pub attempt: QuizAttempt,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentAttempt {
    pub id: Uuid,
    pub card_type: String,
    pub category: String,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizStats {
    pub total_completed: usize,
    pub truths_completed: usize,
    pub dares_completed: usize,
    pub streak: u32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_played: Option<OffsetDateTime>,
    pub category_stats: BTreeMap<String, usize>,
    pub recent_attempts: Vec<RecentAttempt>,
}
