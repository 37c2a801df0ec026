//! Plan persistence as seen by the generation and chat flows.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::plans::repo::{self, FoodItem, FoodItemPatch, NewFoodItem, NewPlan, Plan};

#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn deactivate_active_plans(&self, user_id: Uuid) -> anyhow::Result<u64>;

    async fn create_plan_with_items(
        &self,
        user_id: Uuid,
        plan: &NewPlan,
        items: &[NewFoodItem],
    ) -> anyhow::Result<(Plan, Vec<FoodItem>)>;

    /// Items in display order: meal type, then `sort_order`, then insertion.
    async fn list_items(&self, plan_id: Uuid) -> anyhow::Result<Vec<FoodItem>>;

    async fn next_sort_order(&self, plan_id: Uuid, meal_type: &str) -> anyhow::Result<i32>;

    async fn insert_item(&self, plan_id: Uuid, item: &NewFoodItem) -> anyhow::Result<FoodItem>;

    /// `None` when the item is not part of the plan.
    async fn update_item(
        &self,
        plan_id: Uuid,
        item_id: Uuid,
        patch: &FoodItemPatch,
    ) -> anyhow::Result<Option<FoodItem>>;

    async fn delete_item(&self, plan_id: Uuid, item_id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
impl PlanStore for PgPool {
    async fn deactivate_active_plans(&self, user_id: Uuid) -> anyhow::Result<u64> {
        repo::deactivate_active_plans(self, user_id).await
    }

    async fn create_plan_with_items(
        &self,
        user_id: Uuid,
        plan: &NewPlan,
        items: &[NewFoodItem],
    ) -> anyhow::Result<(Plan, Vec<FoodItem>)> {
        repo::create_plan_with_items(self, user_id, plan, items).await
    }

    async fn list_items(&self, plan_id: Uuid) -> anyhow::Result<Vec<FoodItem>> {
        repo::list_items(self, plan_id).await
    }

    async fn next_sort_order(&self, plan_id: Uuid, meal_type: &str) -> anyhow::Result<i32> {
        repo::next_sort_order(self, plan_id, meal_type).await
    }

    async fn insert_item(&self, plan_id: Uuid, item: &NewFoodItem) -> anyhow::Result<FoodItem> {
        repo::insert_item(self, plan_id, item).await
    }

    async fn update_item(
        &self,
        plan_id: Uuid,
        item_id: Uuid,
        patch: &FoodItemPatch,
    ) -> anyhow::Result<Option<FoodItem>> {
        repo::update_item(self, plan_id, item_id, patch).await
    }

    async fn delete_item(&self, plan_id: Uuid, item_id: Uuid) -> anyhow::Result<bool> {
        repo::delete_item(self, plan_id, item_id).await
    }
}
