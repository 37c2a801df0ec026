use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub use crate::plans::repo_types::{FoodItem, FoodItemPatch, NewFoodItem, NewPlan, Plan};

const PLAN_COLUMNS: &str = r#"
    id, user_id, name, description, target_calories, target_protein,
    target_carbs, target_fat, is_active, created_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, plan_id, meal_type, name, portion, calories, protein, carbs, fat,
    is_consumed, consumed_at, sort_order
"#;

// breakfast, lunch, dinner, snack, then anything unknown
const ITEM_ORDER: &str = r#"
    CASE meal_type
        WHEN 'breakfast' THEN 0
        WHEN 'lunch' THEN 1
        WHEN 'dinner' THEN 2
        WHEN 'snack' THEN 3
        ELSE 4
    END,
    sort_order ASC,
    created_at ASC
"#;

/// Marks every active plan of the user inactive. Returns how many were touched.
pub async fn deactivate_active_plans(db: &PgPool, user_id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query(
        r#"
        UPDATE plans
           SET is_active = FALSE
         WHERE user_id = $1 AND is_active = TRUE
        "#,
    )
    .bind(user_id)
    .execute(db)
    .await
    .context("deactivate active plans")?;
    Ok(res.rows_affected())
}

async fn insert_item_conn(
    conn: &mut PgConnection,
    plan_id: Uuid,
    item: &NewFoodItem,
) -> anyhow::Result<FoodItem> {
    let sql = format!(
        r#"
        INSERT INTO food_items
            (plan_id, meal_type, name, portion, calories, protein, carbs, fat, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {ITEM_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, FoodItem>(&sql)
        .bind(plan_id)
        .bind(item.meal_type.as_str())
        .bind(&item.name)
        .bind(&item.portion)
        .bind(item.calories)
        .bind(item.protein)
        .bind(item.carbs)
        .bind(item.fat)
        .bind(item.sort_order)
        .fetch_one(conn)
        .await
        .context("insert food item")?;
    Ok(row)
}

/// Inserts an active plan and its items in one transaction.
pub async fn create_plan_with_items(
    db: &PgPool,
    user_id: Uuid,
    plan: &NewPlan,
    items: &[NewFoodItem],
) -> anyhow::Result<(Plan, Vec<FoodItem>)> {
    let mut tx = db.begin().await.context("begin tx")?;

    let sql = format!(
        r#"
        INSERT INTO plans
            (user_id, name, description, target_calories, target_protein,
             target_carbs, target_fat, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
        RETURNING {PLAN_COLUMNS}
        "#
    );
    let created = sqlx::query_as::<_, Plan>(&sql)
        .bind(user_id)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.target_calories)
        .bind(plan.target_protein)
        .bind(plan.target_carbs)
        .bind(plan.target_fat)
        .fetch_one(&mut *tx)
        .await
        .context("insert plan")?;

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        rows.push(insert_item_conn(&mut *tx, created.id, item).await?);
    }

    tx.commit().await.context("commit tx")?;
    Ok((created, rows))
}

pub async fn find_active_plan(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Plan>> {
    let sql = format!(
        r#"
        SELECT {PLAN_COLUMNS}
          FROM plans
         WHERE user_id = $1 AND is_active = TRUE
         ORDER BY created_at DESC
         LIMIT 1
        "#
    );
    let row = sqlx::query_as::<_, Plan>(&sql)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("find active plan")?;
    Ok(row)
}

pub async fn find_plan(db: &PgPool, plan_id: Uuid) -> anyhow::Result<Option<Plan>> {
    let sql = format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1");
    let row = sqlx::query_as::<_, Plan>(&sql)
        .bind(plan_id)
        .fetch_optional(db)
        .await
        .context("find plan")?;
    Ok(row)
}

/// Items of a plan, grouped by meal type then explicit order.
pub async fn list_items(db: &PgPool, plan_id: Uuid) -> anyhow::Result<Vec<FoodItem>> {
    let sql = format!(
        r#"
        SELECT {ITEM_COLUMNS}
          FROM food_items
         WHERE plan_id = $1
         ORDER BY {ITEM_ORDER}
        "#
    );
    let rows = sqlx::query_as::<_, FoodItem>(&sql)
        .bind(plan_id)
        .fetch_all(db)
        .await
        .context("list food items")?;
    Ok(rows)
}

pub async fn find_item(db: &PgPool, item_id: Uuid) -> anyhow::Result<Option<FoodItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM food_items WHERE id = $1");
    let row = sqlx::query_as::<_, FoodItem>(&sql)
        .bind(item_id)
        .fetch_optional(db)
        .await
        .context("find food item")?;
    Ok(row)
}

/// Sets the consumed flag; `consumed_at` follows it.
pub async fn set_consumed(db: &PgPool, item_id: Uuid, consumed: bool) -> anyhow::Result<FoodItem> {
    let sql = format!(
        r#"
        UPDATE food_items
           SET is_consumed = $2,
               consumed_at = CASE WHEN $2 THEN now() ELSE NULL END
         WHERE id = $1
        RETURNING {ITEM_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, FoodItem>(&sql)
        .bind(item_id)
        .bind(consumed)
        .fetch_one(db)
        .await
        .context("set consumed")?;
    Ok(row)
}

/// One past the highest `sort_order` of the meal type, 0 when it has no items.
pub async fn next_sort_order(db: &PgPool, plan_id: Uuid, meal_type: &str) -> anyhow::Result<i32> {
    let (max,): (Option<i32>,) = sqlx::query_as(
        r#"
        SELECT MAX(sort_order)
          FROM food_items
         WHERE plan_id = $1 AND meal_type = $2
        "#,
    )
    .bind(plan_id)
    .bind(meal_type)
    .fetch_one(db)
    .await
    .context("max sort order")?;
    Ok(max.map_or(0, |m| m + 1))
}

pub async fn insert_item(db: &PgPool, plan_id: Uuid, item: &NewFoodItem) -> anyhow::Result<FoodItem> {
    let mut conn = db.acquire().await.context("acquire connection")?;
    insert_item_conn(&mut *conn, plan_id, item).await
}

/// Applies a partial update to an item of the given plan.
/// `None` when the item is not part of that plan.
pub async fn update_item(
    db: &PgPool,
    plan_id: Uuid,
    item_id: Uuid,
    patch: &FoodItemPatch,
) -> anyhow::Result<Option<FoodItem>> {
    let sql = format!(
        r#"
        UPDATE food_items
           SET name = COALESCE($3, name),
               portion = COALESCE($4, portion),
               calories = COALESCE($5, calories),
               protein = COALESCE($6, protein),
               carbs = COALESCE($7, carbs),
               fat = COALESCE($8, fat)
         WHERE id = $1 AND plan_id = $2
        RETURNING {ITEM_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, FoodItem>(&sql)
        .bind(item_id)
        .bind(plan_id)
        .bind(patch.name.as_deref())
        .bind(patch.portion.as_deref())
        .bind(patch.calories)
        .bind(patch.protein)
        .bind(patch.carbs)
        .bind(patch.fat)
        .fetch_optional(db)
        .await
        .context("update food item")?;
    Ok(row)
}

/// Deletes an item of the given plan. Returns whether a row was removed.
pub async fn delete_item(db: &PgPool, plan_id: Uuid, item_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        DELETE FROM food_items
         WHERE id = $1 AND plan_id = $2
        "#,
    )
    .bind(item_id)
    .bind(plan_id)
    .execute(db)
    .await
    .context("delete food item")?;
    Ok(res.rows_affected() > 0)
}
