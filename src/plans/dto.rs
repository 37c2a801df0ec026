use serde::{Deserialize, Serialize};

use crate::plans::repo_types::{FoodItem, Plan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }

    /// Case-insensitive; accepts the plural "snacks".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "breakfast" => Some(MealType::Breakfast),
            "lunch" => Some(MealType::Lunch),
            "dinner" => Some(MealType::Dinner),
            "snack" | "snacks" => Some(MealType::Snack),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreatePlanRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub is_consumed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub preferences: Option<String>,
    #[serde(default)]
    pub goals: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<String>,
}

/// Targets vs. what has been checked off so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionSummary {
    pub total_calories: i32,
    pub consumed_calories: i32,
    pub remaining_calories: i32,
    pub total_protein: f64,
    pub consumed_protein: f64,
    pub remaining_protein: f64,
    pub total_carbs: f64,
    pub consumed_carbs: f64,
    pub remaining_carbs: f64,
    pub total_fat: f64,
    pub consumed_fat: f64,
    pub remaining_fat: f64,
    pub total_items: usize,
    pub consumed_items: usize,
    pub completion_percentage: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupedFoods {
    pub breakfast: Vec<FoodItem>,
    pub lunch: Vec<FoodItem>,
    pub dinner: Vec<FoodItem>,
    pub snack: Vec<FoodItem>,
}

#[derive(Debug, Serialize)]
pub struct PlanView {
    #[serde(flatten)]
    pub plan: Plan,
    pub food_items: Vec<FoodItem>,
}

#[derive(Debug, Serialize)]
pub struct CreatePlanResponse {
    pub plan: PlanView,
    pub summary: NutritionSummary,
}

#[derive(Debug, Serialize)]
pub struct ActivePlanResponse {
    pub plan: PlanView,
    pub summary: NutritionSummary,
    pub grouped_foods: GroupedFoods,
}

#[derive(Debug, Serialize)]
pub struct NoActivePlan {
    pub message: &'static str,
    pub has_no_plan: bool,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub food_item: FoodItem,
    pub summary: NutritionSummary,
}
