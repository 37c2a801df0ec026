use crate::profile::dto::{
    ActivityLevel, DietType, Goal, MacroTargets, Profile, ProfileRequest, Sex,
};
use crate::profile::repo::ProfileRow;

/// Used when a stored profile has no targets.
pub const DEFAULT_TARGETS: MacroTargets = MacroTargets {
    calories: 2000,
    protein: 150.0,
    carbs: 250.0,
    fat: 70.0,
};

const GOAL_CALORIE_DELTA: f64 = 500.0;

/// Mifflin-St Jeor basal metabolic rate in kcal/day.
pub fn basal_metabolic_rate(sex: Sex, age: i32, height_cm: f64, weight_kg: f64) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    match sex {
        Sex::Male => base + 5.0,
        Sex::Female | Sex::Other => base - 161.0,
    }
}

pub fn daily_calories(
    sex: Sex,
    age: i32,
    height_cm: f64,
    weight_kg: f64,
    activity: ActivityLevel,
    goal: Goal,
) -> i32 {
    let tdee = basal_metabolic_rate(sex, age, height_cm, weight_kg) * activity.multiplier();
    let adjusted = match goal {
        Goal::LoseWeight => tdee - GOAL_CALORIE_DELTA,
        Goal::GainWeight => tdee + GOAL_CALORIE_DELTA,
        Goal::MaintainWeight | Goal::GainMuscle => tdee,
    };
    adjusted.round() as i32
}

/// 25% protein, 45% carbs, 30% fat, in grams.
pub fn split_macros(calories: i32) -> MacroTargets {
    let kcal = f64::from(calories);
    MacroTargets {
        calories,
        protein: (kcal * 0.25 / 4.0).round(),
        carbs: (kcal * 0.45 / 4.0).round(),
        fat: (kcal * 0.30 / 9.0).round(),
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Validates a profile submission and fills in any omitted targets.
pub fn build_profile(req: ProfileRequest) -> Result<Profile, String> {
    if !(1..=120).contains(&req.age) {
        return Err("age must be between 1 and 120".into());
    }
    if !(req.height_cm > 0.0 && req.height_cm <= 300.0) {
        return Err("height_cm must be between 0 and 300".into());
    }
    if !(req.weight_kg > 0.0 && req.weight_kg <= 500.0) {
        return Err("weight_kg must be between 0 and 500".into());
    }
    if req.target_calories.is_some_and(|c| c <= 0) {
        return Err("target_calories must be positive".into());
    }
    for (field, value) in [
        ("target_protein", req.target_protein),
        ("target_carbs", req.target_carbs),
        ("target_fat", req.target_fat),
    ] {
        if value.is_some_and(|v| v < 0.0 || !v.is_finite()) {
            return Err(format!("{field} must be a non-negative number"));
        }
    }

    let calories = req.target_calories.unwrap_or_else(|| {
        daily_calories(
            req.sex,
            req.age,
            req.height_cm,
            req.weight_kg,
            req.activity_level,
            req.goal,
        )
    });
    let computed = split_macros(calories);
    let targets = MacroTargets {
        calories,
        protein: req.target_protein.unwrap_or(computed.protein),
        carbs: req.target_carbs.unwrap_or(computed.carbs),
        fat: req.target_fat.unwrap_or(computed.fat),
    };

    Ok(Profile {
        name: req
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        age: req.age,
        sex: req.sex,
        height_cm: req.height_cm,
        weight_kg: req.weight_kg,
        activity_level: req.activity_level,
        goal: req.goal,
        diet_type: req.diet_type,
        allergies: clean_list(req.allergies),
        dislikes: clean_list(req.dislikes),
        targets,
    })
}

impl ProfileRow {
    /// The stored profile, if every planner field is present and valid.
    pub fn to_profile(&self) -> Option<Profile> {
        let sex = Sex::parse(self.sex.as_deref()?)?;
        let activity_level = ActivityLevel::parse(self.activity_level.as_deref()?)?;
        let goal = Goal::parse(self.goal.as_deref()?)?;
        let diet_type = DietType::parse(self.diet_type.as_deref()?)?;

        Some(Profile {
            name: self.name.clone(),
            age: self.age?,
            sex,
            height_cm: self.height_cm?,
            weight_kg: self.weight_kg?,
            activity_level,
            goal,
            diet_type,
            allergies: self.allergies.clone(),
            dislikes: self.dislikes.clone(),
            targets: MacroTargets {
                calories: self.target_calories.unwrap_or(DEFAULT_TARGETS.calories),
                protein: self.target_protein.unwrap_or(DEFAULT_TARGETS.protein),
                carbs: self.target_carbs.unwrap_or(DEFAULT_TARGETS.carbs),
                fat: self.target_fat.unwrap_or(DEFAULT_TARGETS.fat),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn request() -> ProfileRequest {
        ProfileRequest {
            name: Some("  Sam ".into()),
            age: 30,
            sex: Sex::Male,
            height_cm: 180.0,
            weight_kg: 80.0,
            activity_level: ActivityLevel::Moderate,
            goal: Goal::MaintainWeight,
            diet_type: DietType::Omnivore,
            allergies: vec!["peanuts".into(), "  ".into()],
            dislikes: vec![],
            target_calories: None,
            target_protein: None,
            target_carbs: None,
            target_fat: None,
        }
    }

    #[test]
    fn bmr_differs_by_sex() {
        assert_eq!(basal_metabolic_rate(Sex::Male, 30, 180.0, 80.0), 1780.0);
        assert_eq!(basal_metabolic_rate(Sex::Female, 25, 165.0, 60.0), 1345.25);
        assert_eq!(basal_metabolic_rate(Sex::Other, 25, 165.0, 60.0), 1345.25);
    }

    #[test]
    fn daily_calories_applies_activity_and_goal() {
        let maintain = daily_calories(
            Sex::Male,
            30,
            180.0,
            80.0,
            ActivityLevel::Moderate,
            Goal::MaintainWeight,
        );
        assert_eq!(maintain, 2759);

        let lose = daily_calories(
            Sex::Female,
            25,
            165.0,
            60.0,
            ActivityLevel::Sedentary,
            Goal::LoseWeight,
        );
        assert_eq!(lose, 1114);

        let gain = daily_calories(
            Sex::Male,
            30,
            180.0,
            80.0,
            ActivityLevel::Moderate,
            Goal::GainWeight,
        );
        assert_eq!(gain, 3259);
    }

    #[test]
    fn macros_split_by_calorie_share() {
        let t = split_macros(2759);
        assert_eq!(t.protein, 172.0);
        assert_eq!(t.carbs, 310.0);
        assert_eq!(t.fat, 92.0);
    }

    #[test]
    fn build_profile_computes_missing_targets_and_cleans_lists() {
        let p = build_profile(request()).expect("valid");
        assert_eq!(p.name.as_deref(), Some("Sam"));
        assert_eq!(p.targets.calories, 2759);
        assert_eq!(p.targets.protein, 172.0);
        assert_eq!(p.allergies, vec!["peanuts".to_string()]);
    }

    #[test]
    fn build_profile_keeps_explicit_targets() {
        let mut req = request();
        req.target_calories = Some(2200);
        req.target_fat = Some(60.0);
        let p = build_profile(req).expect("valid");
        assert_eq!(p.targets.calories, 2200);
        assert_eq!(p.targets.fat, 60.0);
        // derived from the explicit calorie figure
        assert_eq!(p.targets.protein, 138.0);
    }

    #[test]
    fn build_profile_rejects_out_of_range_values() {
        let mut req = request();
        req.age = 0;
        assert!(build_profile(req).is_err());

        let mut req = request();
        req.weight_kg = -3.0;
        assert!(build_profile(req).is_err());

        let mut req = request();
        req.target_carbs = Some(-1.0);
        assert!(build_profile(req).unwrap_err().contains("target_carbs"));
    }

    #[test]
    fn request_deserializes_snake_case_enums() {
        let req: ProfileRequest = serde_json::from_value(serde_json::json!({
            "age": 41, "sex": "female", "height_cm": 170, "weight_kg": 65.5,
            "activity_level": "very_active", "goal": "gain_muscle", "diet_type": "low_carb"
        }))
        .expect("deserialize");
        assert_eq!(req.activity_level, ActivityLevel::VeryActive);
        assert_eq!(req.diet_type, DietType::LowCarb);
        assert!(req.allergies.is_empty());
    }

    fn row() -> ProfileRow {
        ProfileRow {
            id: Uuid::new_v4(),
            email: "a@b.io".into(),
            name: None,
            age: Some(30),
            sex: Some("male".into()),
            height_cm: Some(180.0),
            weight_kg: Some(80.0),
            activity_level: Some("light".into()),
            goal: Some("lose_weight".into()),
            diet_type: Some("vegan".into()),
            allergies: vec![],
            dislikes: vec!["okra".into()],
            target_calories: None,
            target_protein: Some(120.0),
            target_carbs: None,
            target_fat: None,
            profile_completed: true,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn stored_row_converts_with_default_targets() {
        let p = row().to_profile().expect("complete");
        assert_eq!(p.diet_type, DietType::Vegan);
        assert_eq!(p.targets.calories, 2000);
        assert_eq!(p.targets.protein, 120.0);
        assert_eq!(p.targets.fat, 70.0);
    }

    #[test]
    fn incomplete_or_unknown_values_are_not_a_profile() {
        let mut r = row();
        r.age = None;
        assert!(r.to_profile().is_none());

        let mut r = row();
        r.goal = Some("bulk".into());
        assert!(r.to_profile().is_none());
    }
}
