//! The fixed function-calling schema offered to the model, and decoding of
//! the calls it sends back into plan edits.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::llm::{FunctionCall, FunctionDeclaration};
use crate::plans::dto::MealType;
use crate::plans::repo::FoodItemPatch;
use crate::plans::services::{item_calories, lenient_number, DEFAULT_PORTION};

pub const UPDATE_FOOD_ITEM: &str = "update_food_item";
pub const ADD_FOOD_ITEM: &str = "add_food_item";
pub const REMOVE_FOOD_ITEM: &str = "remove_food_item";

pub fn declarations() -> Vec<FunctionDeclaration> {
    vec![
        FunctionDeclaration {
            name: UPDATE_FOOD_ITEM.into(),
            description: "Update an existing food item in the meal plan".into(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "food_id": { "type": "STRING", "description": "The ID of the food item to update" },
                    "name": { "type": "STRING", "description": "New name of the food" },
                    "portion": { "type": "STRING", "description": "New portion size" },
                    "calories": { "type": "NUMBER", "description": "Calories count" },
                    "protein": { "type": "NUMBER", "description": "Protein in grams" },
                    "carbs": { "type": "NUMBER", "description": "Carbs in grams" },
                    "fat": { "type": "NUMBER", "description": "Fat in grams" }
                },
                "required": ["food_id"]
            }),
        },
        FunctionDeclaration {
            name: ADD_FOOD_ITEM.into(),
            description: "Add a new food item to the meal plan".into(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "meal_type": { "type": "STRING", "description": "breakfast, lunch, dinner, or snack" },
                    "name": { "type": "STRING", "description": "Name of the food" },
                    "portion": { "type": "STRING", "description": "Portion size" },
                    "calories": { "type": "NUMBER", "description": "Calories count" },
                    "protein": { "type": "NUMBER", "description": "Protein in grams" },
                    "carbs": { "type": "NUMBER", "description": "Carbs in grams" },
                    "fat": { "type": "NUMBER", "description": "Fat in grams" }
                },
                "required": ["meal_type", "name", "calories", "protein", "carbs", "fat"]
            }),
        },
        FunctionDeclaration {
            name: REMOVE_FOOD_ITEM.into(),
            description: "Remove a food item from the meal plan".into(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "food_id": { "type": "STRING", "description": "The ID of the food item to remove" }
                },
                "required": ["food_id"]
            }),
        },
    ]
}

/// A food item the model wants appended; its order is assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct AddedFood {
    pub meal_type: MealType,
    pub name: String,
    pub portion: String,
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanEdit {
    Update { food_id: Uuid, patch: FoodItemPatch },
    Add(AddedFood),
    Remove { food_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolCallError {
    #[error("unknown tool {0}")]
    UnknownTool(String),
    #[error("missing argument {0}")]
    MissingArg(&'static str),
    #[error("invalid argument {name}: {reason}")]
    InvalidArg { name: &'static str, reason: String },
}

fn arg<'a>(args: &'a Value, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

fn string_arg(args: &Value, name: &'static str) -> Result<Option<String>, ToolCallError> {
    match arg(args, name) {
        None => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Some(other) => Err(ToolCallError::InvalidArg {
            name,
            reason: format!("expected string, got {other}"),
        }),
    }
}

fn food_id_arg(args: &Value) -> Result<Uuid, ToolCallError> {
    // models sometimes camel-case argument names
    let raw = arg(args, "food_id")
        .or_else(|| arg(args, "foodId"))
        .ok_or(ToolCallError::MissingArg("food_id"))?;
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    Uuid::parse_str(&text).map_err(|e| ToolCallError::InvalidArg {
        name: "food_id",
        reason: e.to_string(),
    })
}

fn number_arg(args: &Value, name: &str) -> Option<f64> {
    arg(args, name).map(|v| lenient_number(Some(v)))
}

impl PlanEdit {
    pub fn from_call(call: &FunctionCall) -> Result<Self, ToolCallError> {
        let args = &call.args;
        match call.name.as_str() {
            UPDATE_FOOD_ITEM => Ok(PlanEdit::Update {
                food_id: food_id_arg(args)?,
                patch: FoodItemPatch {
                    name: string_arg(args, "name")?,
                    portion: string_arg(args, "portion")?,
                    calories: arg(args, "calories").map(|c| item_calories(Some(c))),
                    protein: number_arg(args, "protein"),
                    carbs: number_arg(args, "carbs"),
                    fat: number_arg(args, "fat"),
                },
            }),
            ADD_FOOD_ITEM => {
                let raw_meal = string_arg(args, "meal_type")?
                    .or(string_arg(args, "mealType")?)
                    .ok_or(ToolCallError::MissingArg("meal_type"))?;
                let meal_type =
                    MealType::parse(&raw_meal).ok_or_else(|| ToolCallError::InvalidArg {
                        name: "meal_type",
                        reason: format!("unknown meal type {raw_meal}"),
                    })?;
                let name = string_arg(args, "name")?.ok_or(ToolCallError::MissingArg("name"))?;
                Ok(PlanEdit::Add(AddedFood {
                    meal_type,
                    name,
                    portion: string_arg(args, "portion")?
                        .unwrap_or_else(|| DEFAULT_PORTION.to_string()),
                    calories: item_calories(arg(args, "calories")),
                    protein: number_arg(args, "protein").unwrap_or(0.0),
                    carbs: number_arg(args, "carbs").unwrap_or(0.0),
                    fat: number_arg(args, "fat").unwrap_or(0.0),
                }))
            }
            REMOVE_FOOD_ITEM => Ok(PlanEdit::Remove {
                food_id: food_id_arg(args)?,
            }),
            other => Err(ToolCallError::UnknownTool(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Value) -> FunctionCall {
        FunctionCall {
            name: name.into(),
            args,
        }
    }

    #[test]
    fn declarations_expose_three_tools_with_required_ids() {
        let decls = declarations();
        let names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec![UPDATE_FOOD_ITEM, ADD_FOOD_ITEM, REMOVE_FOOD_ITEM]);
        assert_eq!(decls[0].parameters["required"], json!(["food_id"]));
        assert_eq!(decls[2].parameters["required"], json!(["food_id"]));
        assert_eq!(decls[1].parameters["required"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn update_keeps_only_supplied_fields() {
        let id = Uuid::new_v4();
        let edit = PlanEdit::from_call(&call(
            UPDATE_FOOD_ITEM,
            json!({ "food_id": id.to_string(), "portion": "2 cups", "calories": 410.6, "fat": null }),
        ))
        .expect("decode");
        assert_eq!(
            edit,
            PlanEdit::Update {
                food_id: id,
                patch: FoodItemPatch {
                    portion: Some("2 cups".into()),
                    calories: Some(410),
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn add_defaults_portion_and_normalizes_meal_type() {
        let edit = PlanEdit::from_call(&call(
            ADD_FOOD_ITEM,
            json!({ "meal_type": "Snacks", "name": "Almonds", "calories": "170", "protein": 6, "carbs": 6, "fat": 15 }),
        ))
        .expect("decode");
        let PlanEdit::Add(food) = edit else {
            panic!("expected add");
        };
        assert_eq!(food.meal_type, MealType::Snack);
        assert_eq!(food.portion, DEFAULT_PORTION);
        assert_eq!(food.calories, 170);
        assert_eq!(food.fat, 15.0);
    }

    #[test]
    fn calories_from_the_model_are_capped() {
        use crate::plans::services::MAX_ITEM_CALORIES;

        let edit = PlanEdit::from_call(&call(
            ADD_FOOD_ITEM,
            json!({ "meal_type": "lunch", "name": "Everything", "calories": 1e10, "protein": 1, "carbs": 1, "fat": 1 }),
        ))
        .expect("decode");
        assert!(matches!(edit, PlanEdit::Add(AddedFood { calories: MAX_ITEM_CALORIES, .. })));

        let id = Uuid::new_v4();
        let edit = PlanEdit::from_call(&call(
            UPDATE_FOOD_ITEM,
            json!({ "food_id": id.to_string(), "calories": 1e10 }),
        ))
        .expect("decode");
        let PlanEdit::Update { patch, .. } = edit else {
            panic!("expected update");
        };
        assert_eq!(patch.calories, Some(MAX_ITEM_CALORIES));
    }

    #[test]
    fn add_accepts_camel_case_meal_type() {
        let edit = PlanEdit::from_call(&call(
            ADD_FOOD_ITEM,
            json!({ "mealType": "dinner", "name": "Tofu stir fry", "calories": 450, "protein": 25, "carbs": 40, "fat": 18 }),
        ))
        .expect("decode");
        assert!(matches!(edit, PlanEdit::Add(AddedFood { meal_type: MealType::Dinner, .. })));
    }

    #[test]
    fn add_rejects_unknown_meal_type_and_missing_name() {
        let err = PlanEdit::from_call(&call(ADD_FOOD_ITEM, json!({ "meal_type": "brunch", "name": "x" })))
            .unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidArg { name: "meal_type", .. }));

        let err = PlanEdit::from_call(&call(ADD_FOOD_ITEM, json!({ "meal_type": "lunch" }))).unwrap_err();
        assert_eq!(err, ToolCallError::MissingArg("name"));
    }

    #[test]
    fn remove_requires_a_uuid() {
        let id = Uuid::new_v4();
        let edit = PlanEdit::from_call(&call(REMOVE_FOOD_ITEM, json!({ "foodId": id.to_string() })))
            .expect("decode");
        assert_eq!(edit, PlanEdit::Remove { food_id: id });

        let err = PlanEdit::from_call(&call(REMOVE_FOOD_ITEM, json!({ "food_id": 42 }))).unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidArg { name: "food_id", .. }));

        let err = PlanEdit::from_call(&call(REMOVE_FOOD_ITEM, json!({}))).unwrap_err();
        assert_eq!(err, ToolCallError::MissingArg("food_id"));
    }

    #[test]
    fn unknown_tool_is_an_error() {
        let err = PlanEdit::from_call(&call("delete_plan", json!({}))).unwrap_err();
        assert_eq!(err, ToolCallError::UnknownTool("delete_plan".into()));
    }
}
