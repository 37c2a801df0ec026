use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

pub use crate::profile::repo_types::ProfileRow;
use crate::profile::dto::Profile;

const PROFILE_COLUMNS: &str = r#"
    id, email, name, age, sex, height_cm, weight_kg, activity_level, goal, diet_type,
    allergies, dislikes, target_calories, target_protein, target_carbs, target_fat,
    profile_completed, updated_at
"#;

pub async fn find_profile(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<ProfileRow>> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1");
    let row = sqlx::query_as::<_, ProfileRow>(&sql)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("find profile")?;
    Ok(row)
}

/// Overwrites the profile columns and marks the profile completed.
/// Returns `None` when the user does not exist.
pub async fn save_profile(
    db: &PgPool,
    user_id: Uuid,
    profile: &Profile,
) -> anyhow::Result<Option<ProfileRow>> {
    let sql = format!(
        r#"
        UPDATE users
           SET name = COALESCE($2, name),
               age = $3,
               sex = $4,
               height_cm = $5,
               weight_kg = $6,
               activity_level = $7,
               goal = $8,
               diet_type = $9,
               allergies = $10,
               dislikes = $11,
               target_calories = $12,
               target_protein = $13,
               target_carbs = $14,
               target_fat = $15,
               profile_completed = TRUE,
               updated_at = now()
         WHERE id = $1
        RETURNING {PROFILE_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, ProfileRow>(&sql)
        .bind(user_id)
        .bind(profile.name.as_deref())
        .bind(profile.age)
        .bind(profile.sex.as_str())
        .bind(profile.height_cm)
        .bind(profile.weight_kg)
        .bind(profile.activity_level.as_str())
        .bind(profile.goal.as_str())
        .bind(profile.diet_type.as_str())
        .bind(&profile.allergies)
        .bind(&profile.dislikes)
        .bind(profile.targets.calories)
        .bind(profile.targets.protein)
        .bind(profile.targets.carbs)
        .bind(profile.targets.fat)
        .fetch_optional(db)
        .await
        .context("save profile")?;
    Ok(row)
}
