use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    LoseWeight,
    MaintainWeight,
    GainWeight,
    GainMuscle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietType {
    Omnivore,
    Vegetarian,
    Vegan,
    Keto,
    Paleo,
    Mediterranean,
    LowCarb,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Sex::Male),
            "female" => Some(Sex::Female),
            "other" => Some(Sex::Other),
            _ => None,
        }
    }
}

impl ActivityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sedentary" => Some(ActivityLevel::Sedentary),
            "light" => Some(ActivityLevel::Light),
            "moderate" => Some(ActivityLevel::Moderate),
            "active" => Some(ActivityLevel::Active),
            "very_active" => Some(ActivityLevel::VeryActive),
            _ => None,
        }
    }

    /// TDEE multiplier applied to BMR.
    pub fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }
}

impl Goal {
    pub fn as_str(self) -> &'static str {
        match self {
            Goal::LoseWeight => "lose_weight",
            Goal::MaintainWeight => "maintain_weight",
            Goal::GainWeight => "gain_weight",
            Goal::GainMuscle => "gain_muscle",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lose_weight" => Some(Goal::LoseWeight),
            "maintain_weight" => Some(Goal::MaintainWeight),
            "gain_weight" => Some(Goal::GainWeight),
            "gain_muscle" => Some(Goal::GainMuscle),
            _ => None,
        }
    }
}

impl DietType {
    pub fn as_str(self) -> &'static str {
        match self {
            DietType::Omnivore => "omnivore",
            DietType::Vegetarian => "vegetarian",
            DietType::Vegan => "vegan",
            DietType::Keto => "keto",
            DietType::Paleo => "paleo",
            DietType::Mediterranean => "mediterranean",
            DietType::LowCarb => "low_carb",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "omnivore" => Some(DietType::Omnivore),
            "vegetarian" => Some(DietType::Vegetarian),
            "vegan" => Some(DietType::Vegan),
            "keto" => Some(DietType::Keto),
            "paleo" => Some(DietType::Paleo),
            "mediterranean" => Some(DietType::Mediterranean),
            "low_carb" => Some(DietType::LowCarb),
            _ => None,
        }
    }
}

/// Daily calorie and macro targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// A complete profile: every field the planner needs is present.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub name: Option<String>,
    pub age: i32,
    pub sex: Sex,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    pub diet_type: DietType,
    pub allergies: Vec<String>,
    pub dislikes: Vec<String>,
    pub targets: MacroTargets,
}

/// Body of `POST /user/profile`. Omitted targets are computed.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub age: i32,
    pub sex: Sex,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    pub diet_type: DietType,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    #[serde(default)]
    pub target_calories: Option<i32>,
    #[serde(default)]
    pub target_protein: Option<f64>,
    #[serde(default)]
    pub target_carbs: Option<f64>,
    #[serde(default)]
    pub target_fat: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: &'static str,
    pub profile: Profile,
}

#[derive(Debug, Serialize)]
pub struct CheckProfileUser {
    pub name: Option<String>,
    pub email: String,
    pub profile: Option<Profile>,
}

#[derive(Debug, Serialize)]
pub struct CheckProfileResponse {
    pub profile_completed: bool,
    pub user: Option<CheckProfileUser>,
}
