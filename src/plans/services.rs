use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use time::{macros::format_description, OffsetDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::plans::dto::{GroupedFoods, MealType, NutritionSummary};
use crate::llm::LlmClient;
use crate::plans::repo::{FoodItem, NewFoodItem, NewPlan, Plan};
use crate::plans::store::PlanStore;
use crate::profile::dto::Profile;

pub const DEFAULT_PORTION: &str = "1 serving";
/// Calories of a single food item are capped here.
pub const MAX_ITEM_CALORIES: i32 = 10_000;
const PLAN_DESCRIPTION: &str = "AI-generated personalized meal plan";

#[derive(Debug, thiserror::Error)]
pub enum PlanParseError {
    #[error("model output is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("model output has no \"meals\" array")]
    MissingMeals,
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratePlanError {
    #[error(transparent)]
    Model(#[from] crate::llm::LlmError),
    #[error(transparent)]
    Parse(#[from] PlanParseError),
    #[error("model returned no usable meals")]
    NoMeals,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub fn compute_summary(plan: &Plan, items: &[FoodItem]) -> NutritionSummary {
    let consumed: Vec<&FoodItem> = items.iter().filter(|i| i.is_consumed).collect();

    let consumed_calories: i64 = consumed.iter().map(|i| i64::from(i.calories)).sum();
    let consumed_calories = i32::try_from(consumed_calories).unwrap_or(i32::MAX);
    let consumed_protein: f64 = consumed.iter().map(|i| i.protein).sum();
    let consumed_carbs: f64 = consumed.iter().map(|i| i.carbs).sum();
    let consumed_fat: f64 = consumed.iter().map(|i| i.fat).sum();

    let completion_percentage = if items.is_empty() {
        0
    } else {
        (consumed.len() as f64 / items.len() as f64 * 100.0).round() as u32
    };

    NutritionSummary {
        total_calories: plan.target_calories,
        consumed_calories,
        remaining_calories: plan.target_calories.saturating_sub(consumed_calories),
        total_protein: plan.target_protein,
        consumed_protein,
        remaining_protein: plan.target_protein - consumed_protein,
        total_carbs: plan.target_carbs,
        consumed_carbs,
        remaining_carbs: plan.target_carbs - consumed_carbs,
        total_fat: plan.target_fat,
        consumed_fat,
        remaining_fat: plan.target_fat - consumed_fat,
        total_items: items.len(),
        consumed_items: consumed.len(),
        completion_percentage,
    }
}

/// Buckets items by meal type, keeping their order. Unknown types are left out.
pub fn group_by_meal(items: &[FoodItem]) -> GroupedFoods {
    let mut grouped = GroupedFoods::default();
    for item in items {
        let bucket = match MealType::parse(&item.meal_type) {
            Some(MealType::Breakfast) => &mut grouped.breakfast,
            Some(MealType::Lunch) => &mut grouped.lunch,
            Some(MealType::Dinner) => &mut grouped.dinner,
            Some(MealType::Snack) => &mut grouped.snack,
            None => continue,
        };
        bucket.push(item.clone());
    }
    grouped
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

pub fn build_plan_prompt(profile: &Profile) -> String {
    let t = &profile.targets;
    let mut prompt = format!(
        "Create a daily meal plan for a {age}-year-old {sex}, {weight}kg, {height}cm tall, \
         with {activity} lifestyle, aiming to {goal} on a {diet} diet.\n\n\
         Target: {cal} calories, {protein}g protein, {carbs}g carbs, {fat}g fat.\n",
        age = profile.age,
        sex = profile.sex.as_str(),
        weight = profile.weight_kg,
        height = profile.height_cm,
        activity = profile.activity_level.as_str().replace('_', " "),
        goal = profile.goal.as_str().replace('_', " "),
        diet = profile.diet_type.as_str().replace('_', " "),
        cal = t.calories,
        protein = t.protein,
        carbs = t.carbs,
        fat = t.fat,
    );
    if !profile.allergies.is_empty() {
        prompt.push_str(&format!("Allergies: {}\n", join_or_none(&profile.allergies)));
    }
    if !profile.dislikes.is_empty() {
        prompt.push_str(&format!("Dislikes: {}\n", join_or_none(&profile.dislikes)));
    }
    prompt.push_str(
        r#"
Return ONLY a valid JSON object with this exact structure (no markdown, no explanations):
{
  "meals": [
    {
      "mealType": "breakfast",
      "name": "Food name",
      "portion": "Amount (e.g., 1 cup, 150g)",
      "calories": 300,
      "protein": 20,
      "carbs": 40,
      "fat": 10
    }
  ]
}

Include 3-4 breakfast items, 3-4 lunch items, 3-4 dinner items, and 2-3 snacks. Make it realistic and delicious!"#,
    );
    prompt
}

pub fn build_recommendation_prompt(preferences: &str, goals: &str) -> String {
    format!(
        "Generate a personalized meal plan for someone with these preferences: {preferences} \
         and goals: {goals}. Include breakfast, lunch, dinner, and snacks. \
         Put each suggestion on its own line."
    )
}

/// Non-empty trimmed lines of a free-text answer.
pub fn split_recommendations(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Removes a surrounding ``` / ```json fence if the model added one.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Reads a number the way a lenient form parser would: JSON numbers as-is,
/// strings by their leading numeric prefix ("320 kcal" -> 320), else 0.
pub fn lenient_number(v: Option<&Value>) -> f64 {
    lazy_static! {
        static ref LEADING_NUMBER: Regex =
            Regex::new(r"^\s*(-?\d+(?:\.\d+)?)").expect("number regex compiles");
    }
    let n = match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => LEADING_NUMBER
            .captures(s)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() {
        n.max(0.0)
    } else {
        0.0
    }
}

/// Whole calories from a lenient number, within `0..=MAX_ITEM_CALORIES`.
pub fn item_calories(v: Option<&Value>) -> i32 {
    lenient_number(v).min(f64::from(MAX_ITEM_CALORIES)).trunc() as i32
}

#[derive(Debug, Deserialize)]
struct GeneratedPlan {
    meals: Option<Vec<Value>>,
}

fn text_field<'a>(meal: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| meal.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Turns the model's `{ "meals": [...] }` answer into rows to insert.
/// Entries without a known meal type or a name are dropped; each meal type
/// gets its own 0-based order.
pub fn parse_generated_meals(text: &str) -> Result<Vec<NewFoodItem>, PlanParseError> {
    let parsed: GeneratedPlan = serde_json::from_str(strip_code_fence(text))?;
    let meals = parsed.meals.ok_or(PlanParseError::MissingMeals)?;

    let mut next_order: HashMap<MealType, i32> = HashMap::new();
    let mut items = Vec::with_capacity(meals.len());
    for meal in &meals {
        let Some(meal_type) =
            text_field(meal, &["mealType", "meal_type"]).and_then(MealType::parse)
        else {
            debug!(entry = %meal, "dropping meal with unknown type");
            continue;
        };
        let Some(name) = text_field(meal, &["name"]) else {
            debug!(entry = %meal, "dropping meal without name");
            continue;
        };

        let order = next_order.entry(meal_type).or_insert(0);
        items.push(NewFoodItem {
            meal_type,
            name: name.to_string(),
            portion: text_field(meal, &["portion"])
                .unwrap_or(DEFAULT_PORTION)
                .to_string(),
            calories: item_calories(meal.get("calories")),
            protein: lenient_number(meal.get("protein")),
            carbs: lenient_number(meal.get("carbs")),
            fat: lenient_number(meal.get("fat")),
            sort_order: *order,
        });
        *order += 1;
    }
    Ok(items)
}

pub fn default_plan_name(now: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day]");
    let date = now.date().format(&fmt).unwrap_or_else(|_| now.date().to_string());
    format!("Meal Plan - {date}")
}

/// Asks the model for a plan, then replaces the user's active plan with it.
pub async fn generate_plan<S>(
    store: &S,
    llm: &dyn LlmClient,
    user_id: Uuid,
    profile: &Profile,
    name: Option<String>,
) -> Result<(Plan, Vec<FoodItem>), GeneratePlanError>
where
    S: PlanStore + ?Sized,
{
    let prompt = build_plan_prompt(profile);
    let text = llm.generate(&prompt).await?;
    let preview: String = text.chars().take(500).collect();
    debug!(%preview, "plan model output");

    let items = parse_generated_meals(&text)?;
    if items.is_empty() {
        warn!(%user_id, "model returned no usable meals");
        return Err(GeneratePlanError::NoMeals);
    }

    let deactivated = store.deactivate_active_plans(user_id).await?;

    let new_plan = NewPlan {
        name: name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_plan_name(OffsetDateTime::now_utc())),
        description: PLAN_DESCRIPTION.to_string(),
        target_calories: profile.targets.calories,
        target_protein: profile.targets.protein,
        target_carbs: profile.targets.carbs,
        target_fat: profile.targets.fat,
    };
    let (plan, rows) = store
        .create_plan_with_items(user_id, &new_plan, &items)
        .await
        .context("store generated plan")?;

    info!(%user_id, plan_id = %plan.id, items = rows.len(), deactivated, "meal plan generated");
    Ok((plan, rows))
}
