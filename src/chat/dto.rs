use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::repo::ChatMessage;
use crate::chat::services::ChatAction;
use crate::plans::dto::{GroupedFoods, NutritionSummary, PlanView};

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default, alias = "planId")]
    pub plan_id: Option<Uuid>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub plan: PlanView,
    pub summary: NutritionSummary,
    pub grouped_foods: GroupedFoods,
    pub actions: Vec<ChatAction>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatMessage>,
}
