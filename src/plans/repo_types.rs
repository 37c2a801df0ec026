use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::plans::dto::MealType;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub target_calories: i32,
    pub target_protein: f64,
    pub target_carbs: f64,
    pub target_fat: f64,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FoodItem {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub meal_type: String,
    pub name: String,
    pub portion: String,
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub is_consumed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub consumed_at: Option<OffsetDateTime>,
    pub sort_order: i32,
}

/// Plan header written when a plan is generated.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub name: String,
    pub description: String,
    pub target_calories: i32,
    pub target_protein: f64,
    pub target_carbs: f64,
    pub target_fat: f64,
}

/// A food item to insert; `sort_order` is relative to its meal type.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFoodItem {
    pub meal_type: MealType,
    pub name: String,
    pub portion: String,
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub sort_order: i32,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FoodItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
}

impl FoodItemPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
