use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chat::repo::{ChatMessage, ROLE_ASSISTANT, ROLE_USER};
use crate::chat::store::MessageLog;
use crate::chat::tools::{self, PlanEdit};
use crate::llm::{LlmClient, LlmError, Turn};
use crate::plans::repo::{FoodItem, NewFoodItem, Plan};
use crate::plans::store::PlanStore;

/// How many stored messages are replayed to the model.
pub const HISTORY_WINDOW: i64 = 10;

pub const FALLBACK_REPLY: &str = "I've processed your request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Update,
    Add,
    Remove,
    Unknown,
}

/// One entry of the action log stored with the assistant message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_id: Option<Uuid>,
    pub details: Value,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Model(#[from] LlmError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// What a chat turn produced.
#[derive(Debug)]
pub struct ChatOutcome {
    pub reply: String,
    pub actions: Vec<ChatAction>,
    pub items: Vec<FoodItem>,
}

pub fn build_system_prompt(items: &[FoodItem], goal: Option<&str>, diet_type: Option<&str>) -> String {
    let food_context = items
        .iter()
        .map(|i| {
            format!(
                "ID: {}, Type: {}, Name: {}, Portion: {}, Cals: {}",
                i.id, i.meal_type, i.name, i.portion, i.calories
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a nutrition assistant helping a user modify their meal plan.\n\
         Current Plan Context:\n\
         {food_context}\n\n\
         User Goal: {goal}\n\
         Diet Type: {diet}\n\n\
         When the user asks to change something, use the available tools to modify the plan.\n\
         Always reply with a confirmation of what you did or a clarifying question.\n\
         If you add or update foods, estimate the nutritional values (protein, carbs, fat) if not provided.\n",
        goal = goal.map(|g| g.replace('_', " ")).unwrap_or_else(|| "healthy eating".into()),
        diet = diet_type.map(|d| d.replace('_', " ")).unwrap_or_else(|| "balanced".into()),
    )
}

/// Stored messages as model turns. Leading assistant turns are dropped so the
/// conversation opens with the user.
pub fn history_turns(messages: &[ChatMessage]) -> Vec<Turn> {
    messages
        .iter()
        .skip_while(|m| m.role != ROLE_USER)
        .map(|m| {
            if m.role == ROLE_ASSISTANT {
                Turn::model(m.content.clone())
            } else {
                Turn::user(m.content.clone())
            }
        })
        .collect()
}

/// Reply shown when the model changed the plan but said nothing.
pub fn confirmation_for(actions: &[ChatAction]) -> Option<&'static str> {
    let applied = |k: ActionKind| actions.iter().any(|a| a.applied && a.kind == k);
    if applied(ActionKind::Add) {
        Some("I've added that to your plan.")
    } else if applied(ActionKind::Remove) {
        Some("I've removed that from your plan.")
    } else if applied(ActionKind::Update) {
        Some("I've updated your plan.")
    } else {
        None
    }
}

pub fn action_log(actions: &[ChatAction]) -> Option<Value> {
    if actions.is_empty() {
        None
    } else {
        Some(json!(actions))
    }
}

async fn apply_edit<S>(store: &S, plan_id: Uuid, edit: PlanEdit) -> anyhow::Result<ChatAction>
where
    S: PlanStore + ?Sized,
{
    let action = match edit {
        PlanEdit::Update { food_id, patch } => {
            let details = serde_json::to_value(&patch)?;
            if patch.is_empty() {
                ChatAction {
                    kind: ActionKind::Update,
                    food_id: Some(food_id),
                    details,
                    applied: false,
                    note: Some("nothing to update".into()),
                }
            } else {
                let updated = store.update_item(plan_id, food_id, &patch).await?;
                ChatAction {
                    kind: ActionKind::Update,
                    food_id: Some(food_id),
                    details,
                    applied: updated.is_some(),
                    note: updated.is_none().then(|| "food item is not in this plan".into()),
                }
            }
        }
        PlanEdit::Add(food) => {
            let sort_order = store
                .next_sort_order(plan_id, food.meal_type.as_str())
                .await?;
            let row = store
                .insert_item(
                    plan_id,
                    &NewFoodItem {
                        meal_type: food.meal_type,
                        name: food.name,
                        portion: food.portion,
                        calories: food.calories,
                        protein: food.protein,
                        carbs: food.carbs,
                        fat: food.fat,
                        sort_order,
                    },
                )
                .await?;
            ChatAction {
                kind: ActionKind::Add,
                food_id: Some(row.id),
                details: json!({
                    "meal_type": row.meal_type,
                    "name": row.name,
                    "portion": row.portion,
                    "calories": row.calories,
                    "protein": row.protein,
                    "carbs": row.carbs,
                    "fat": row.fat,
                }),
                applied: true,
                note: None,
            }
        }
        PlanEdit::Remove { food_id } => {
            let removed = store.delete_item(plan_id, food_id).await?;
            ChatAction {
                kind: ActionKind::Remove,
                food_id: Some(food_id),
                details: Value::Null,
                applied: removed,
                note: (!removed).then(|| "food item is not in this plan".into()),
            }
        }
    };
    Ok(action)
}

fn kind_of(name: &str) -> ActionKind {
    match name {
        tools::UPDATE_FOOD_ITEM => ActionKind::Update,
        tools::ADD_FOOD_ITEM => ActionKind::Add,
        tools::REMOVE_FOOD_ITEM => ActionKind::Remove,
        _ => ActionKind::Unknown,
    }
}

/// Runs one chat turn against a plan the caller already owns: stores the
/// user message, asks the model, applies its tool calls and stores the reply.
pub async fn handle_message<S>(
    store: &S,
    llm: &dyn LlmClient,
    plan: &Plan,
    goal: Option<&str>,
    diet_type: Option<&str>,
    message: &str,
) -> Result<ChatOutcome, ChatError>
where
    S: PlanStore + MessageLog + ?Sized,
{
    store
        .insert_message(plan.id, ROLE_USER, message, None)
        .await?;

    let items = store.list_items(plan.id).await?;
    let history = store.recent_messages(plan.id, HISTORY_WINDOW).await?;

    let system = build_system_prompt(&items, goal, diet_type);
    let reply = llm
        .generate_with_tools(&system, &history_turns(&history), &tools::declarations())
        .await?;
    debug!(calls = reply.function_calls.len(), "chat model reply");

    let mut actions = Vec::with_capacity(reply.function_calls.len());
    for call in &reply.function_calls {
        let action = match PlanEdit::from_call(call) {
            Ok(edit) => apply_edit(store, plan.id, edit).await?,
            Err(e) => {
                warn!(plan_id = %plan.id, tool = %call.name, error = %e, "skipping tool call");
                ChatAction {
                    kind: kind_of(&call.name),
                    food_id: None,
                    details: call.args.clone(),
                    applied: false,
                    note: Some(e.to_string()),
                }
            }
        };
        actions.push(action);
    }

    let text = reply.text.trim();
    let reply_text = if !text.is_empty() {
        text.to_string()
    } else {
        confirmation_for(&actions)
            .unwrap_or(FALLBACK_REPLY)
            .to_string()
    };

    store
        .insert_message(
            plan.id,
            ROLE_ASSISTANT,
            &reply_text,
            action_log(&actions).as_ref(),
        )
        .await?;

    let items = store.list_items(plan.id).await?;
    info!(
        plan_id = %plan.id,
        applied = actions.iter().filter(|a| a.applied).count(),
        attempted = actions.len(),
        "chat turn handled"
    );

    Ok(ChatOutcome {
        reply: reply_text,
        actions,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake::ScriptedLlm;
    use crate::llm::{FunctionCall, ModelReply};
    use crate::plans::dto::MealType;
    use crate::plans::services::DEFAULT_PORTION;
    use crate::plans::store::memory::MemoryStore;
    use time::OffsetDateTime;

    fn action(kind: ActionKind, applied: bool) -> ChatAction {
        ChatAction {
            kind,
            food_id: None,
            details: Value::Null,
            applied,
            note: None,
        }
    }

    fn message(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            role: role.into(),
            content: content.into(),
            action: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn confirmation_prefers_add_then_remove_then_update() {
        let all = [
            action(ActionKind::Update, true),
            action(ActionKind::Remove, true),
            action(ActionKind::Add, true),
        ];
        assert_eq!(confirmation_for(&all), Some("I've added that to your plan."));

        let no_add = [action(ActionKind::Update, true), action(ActionKind::Remove, true)];
        assert_eq!(confirmation_for(&no_add), Some("I've removed that from your plan."));

        let update = [action(ActionKind::Update, true)];
        assert_eq!(confirmation_for(&update), Some("I've updated your plan."));
    }

    #[test]
    fn skipped_actions_do_not_confirm() {
        let skipped = [action(ActionKind::Add, false), action(ActionKind::Unknown, false)];
        assert_eq!(confirmation_for(&skipped), None);
        assert_eq!(confirmation_for(&[]), None);
    }

    #[test]
    fn action_log_is_absent_without_actions() {
        assert!(action_log(&[]).is_none());
        let log = action_log(&[action(ActionKind::Remove, true)]).expect("log");
        assert_eq!(log[0]["type"], "remove");
        assert_eq!(log[0]["applied"], true);
        assert!(log[0].get("note").is_none());
    }

    #[test]
    fn system_prompt_lists_items_and_defaults() {
        let item = FoodItem {
            id: Uuid::nil(),
            plan_id: Uuid::nil(),
            meal_type: "lunch".into(),
            name: "Lentil soup".into(),
            portion: "1 bowl".into(),
            calories: 320,
            protein: 18.0,
            carbs: 45.0,
            fat: 6.0,
            is_consumed: false,
            consumed_at: None,
            sort_order: 0,
        };
        let prompt = build_system_prompt(&[item], None, Some("low_carb"));
        assert!(prompt.contains(
            "ID: 00000000-0000-0000-0000-000000000000, Type: lunch, Name: Lentil soup, Portion: 1 bowl, Cals: 320"
        ));
        assert!(prompt.contains("User Goal: healthy eating"));
        assert!(prompt.contains("Diet Type: low carb"));
    }

    #[test]
    fn history_starts_with_user_and_maps_roles() {
        let msgs = vec![
            message(ROLE_ASSISTANT, "orphan reply"),
            message(ROLE_USER, "swap lunch"),
            message(ROLE_ASSISTANT, "done"),
            message(ROLE_USER, "and dinner?"),
        ];
        let turns = history_turns(&msgs);
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].text, "swap lunch");
        assert_eq!(turns[1].role, crate::llm::TurnRole::Model);
        assert_eq!(turns[2].role, crate::llm::TurnRole::User);
    }

    fn food(meal_type: MealType, name: &str, sort_order: i32) -> NewFoodItem {
        NewFoodItem {
            meal_type,
            name: name.into(),
            portion: "1 cup".into(),
            calories: 300,
            protein: 10.0,
            carbs: 40.0,
            fat: 6.0,
            sort_order,
        }
    }

    fn call(name: &str, args: Value) -> FunctionCall {
        FunctionCall {
            name: name.into(),
            args,
        }
    }

    fn scripted(text: &str, function_calls: Vec<FunctionCall>) -> ScriptedLlm {
        ScriptedLlm {
            reply: ModelReply {
                text: text.into(),
                function_calls,
            },
            ..Default::default()
        }
    }

    fn item_id(store: &MemoryStore, plan_id: Uuid, name: &str) -> Uuid {
        store
            .tables()
            .items
            .iter()
            .find(|i| i.plan_id == plan_id && i.name == name)
            .map(|i| i.id)
            .expect("seeded item")
    }

    #[tokio::test]
    async fn chat_turn_applies_valid_calls_and_records_the_rest() {
        let store = MemoryStore::default();
        let plan = store.seed_plan(
            Uuid::new_v4(),
            &[
                food(MealType::Breakfast, "Oats", 0),
                food(MealType::Breakfast, "Eggs", 1),
                food(MealType::Dinner, "Rice", 0),
            ],
        );
        let other = store.seed_plan(Uuid::new_v4(), &[food(MealType::Lunch, "Steak", 0)]);
        let oats = item_id(&store, plan.id, "Oats");
        let steak = item_id(&store, other.id, "Steak");

        let llm = scripted(
            "  ",
            vec![
                call(
                    tools::UPDATE_FOOD_ITEM,
                    json!({"food_id": oats.to_string(), "portion": "1/2 cup", "calories": 180}),
                ),
                call(
                    tools::ADD_FOOD_ITEM,
                    json!({"meal_type": "Breakfast", "name": "Yogurt", "calories": "150 kcal", "protein": 9}),
                ),
                call(tools::REMOVE_FOOD_ITEM, json!({"food_id": steak.to_string()})),
                call(tools::UPDATE_FOOD_ITEM, json!({"food_id": 42, "calories": 1})),
                call("rename_plan", json!({"name": "Bulk"})),
            ],
        );

        let out = handle_message(
            &store,
            &llm,
            &plan,
            Some("lose_weight"),
            None,
            "lighter breakfast please",
        )
        .await
        .unwrap();

        let kinds: Vec<(ActionKind, bool)> = out.actions.iter().map(|a| (a.kind, a.applied)).collect();
        assert_eq!(
            kinds,
            vec![
                (ActionKind::Update, true),
                (ActionKind::Add, true),
                (ActionKind::Remove, false),
                (ActionKind::Update, false),
                (ActionKind::Unknown, false),
            ]
        );
        assert_eq!(out.actions[0].details, json!({"portion": "1/2 cup", "calories": 180}));
        assert_eq!(out.actions[2].note.as_deref(), Some("food item is not in this plan"));
        assert!(out.actions[3].food_id.is_none());
        assert!(out.actions[3].note.is_some());
        assert!(out.actions[4].note.as_deref().unwrap_or_default().contains("rename_plan"));
        assert_eq!(out.reply, "I've added that to your plan.");

        let names: Vec<&str> = out.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Oats", "Eggs", "Yogurt", "Rice"]);
        let updated = &out.items[0];
        assert_eq!((updated.portion.as_str(), updated.calories), ("1/2 cup", 180));
        assert_eq!((updated.protein, updated.carbs, updated.fat), (10.0, 40.0, 6.0));
        let added = &out.items[2];
        assert_eq!(added.sort_order, 2);
        assert_eq!(added.portion, DEFAULT_PORTION);
        assert_eq!((added.calories, added.protein, added.fat), (150, 9.0, 0.0));
        assert_eq!(out.actions[1].food_id, Some(added.id));

        let t = store.tables();
        assert!(t.items.iter().any(|i| i.id == steak));
        let log: Vec<&ChatMessage> = t.messages.iter().filter(|m| m.plan_id == plan.id).collect();
        assert_eq!(log.len(), 2);
        assert_eq!((log[0].role.as_str(), log[0].content.as_str()), (ROLE_USER, "lighter breakfast please"));
        assert!(log[0].action.is_none());
        assert_eq!(log[1].role, ROLE_ASSISTANT);
        assert_eq!(log[1].content, out.reply);
        let stored = log[1].action.as_ref().expect("action log");
        assert_eq!(stored.as_array().map(Vec::len), Some(5));
        assert_eq!(stored[1]["type"], "add");
        drop(t);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains(&format!("ID: {oats}, Type: breakfast, Name: Oats")));
        assert!(!prompts[0].contains("Steak"));
        assert!(prompts[0].contains("User Goal: lose weight"));
    }

    #[tokio::test]
    async fn silent_reply_without_calls_falls_back() {
        let store = MemoryStore::default();
        let plan = store.seed_plan(Uuid::new_v4(), &[food(MealType::Lunch, "Soup", 0)]);
        let llm = scripted("", vec![]);

        let out = handle_message(&store, &llm, &plan, None, None, "hi").await.unwrap();

        assert_eq!(out.reply, FALLBACK_REPLY);
        assert!(out.actions.is_empty());
        assert_eq!(out.items.len(), 1);
        let t = store.tables();
        assert_eq!(t.messages.len(), 2);
        assert!(t.messages.iter().all(|m| m.action.is_none()));
    }

    #[tokio::test]
    async fn model_text_wins_over_confirmation() {
        let store = MemoryStore::default();
        let plan = store.seed_plan(Uuid::new_v4(), &[food(MealType::Snack, "Chips", 0)]);
        let chips = item_id(&store, plan.id, "Chips");
        let llm = scripted(
            " Dropped the chips. ",
            vec![call(tools::REMOVE_FOOD_ITEM, json!({"foodId": chips.to_string()}))],
        );

        let out = handle_message(&store, &llm, &plan, None, None, "no chips")
            .await
            .unwrap();

        assert_eq!(out.reply, "Dropped the chips.");
        assert!(out.actions[0].applied);
        assert!(out.items.is_empty());
    }
}
