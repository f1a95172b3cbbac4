//! Domain types for calorie calculation inputs and results.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Activity multipliers applied to BMR to obtain TDEE.
mod activity_multiplier {
    pub const SEDENTARY: f64 = 1.2;
    pub const LIGHTLY_ACTIVE: f64 = 1.375;
    pub const MODERATELY_ACTIVE: f64 = 1.55;
    pub const VERY_ACTIVE: f64 = 1.725;
    pub const EXTRA_ACTIVE: f64 = 1.9;
}

/// Biological sex used by the Mifflin-St Jeor equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Returns all gender variants.
    pub fn all() -> &'static [Gender] {
        &[Gender::Male, Gender::Female]
    }

    /// Returns the identifier used in JSON and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    /// Returns the display name for the gender.
    pub fn display_name(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl FromStr for Gender {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "man" => Ok(Gender::Male),
            "female" | "f" | "woman" => Ok(Gender::Female),
            _ => Err(InputError::UnknownGender(s.to_string())),
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Habitual activity level, each carrying a fixed TDEE multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtraActive,
}

impl ActivityLevel {
    /// Returns all activity levels, least active first.
    pub fn all() -> &'static [ActivityLevel] {
        &[
            ActivityLevel::Sedentary,
            ActivityLevel::LightlyActive,
            ActivityLevel::ModeratelyActive,
            ActivityLevel::VeryActive,
            ActivityLevel::ExtraActive,
        ]
    }

    /// Returns the multiplier that scales BMR into TDEE.
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => activity_multiplier::SEDENTARY,
            ActivityLevel::LightlyActive => activity_multiplier::LIGHTLY_ACTIVE,
            ActivityLevel::ModeratelyActive => activity_multiplier::MODERATELY_ACTIVE,
            ActivityLevel::VeryActive => activity_multiplier::VERY_ACTIVE,
            ActivityLevel::ExtraActive => activity_multiplier::EXTRA_ACTIVE,
        }
    }

    /// Returns the identifier used in JSON and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::LightlyActive => "lightly_active",
            ActivityLevel::ModeratelyActive => "moderately_active",
            ActivityLevel::VeryActive => "very_active",
            ActivityLevel::ExtraActive => "extra_active",
        }
    }

    /// Returns the display name for the activity level.
    pub fn display_name(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "Sedentary (little or no exercise)",
            ActivityLevel::LightlyActive => "Lightly active (exercise 1-3 days/week)",
            ActivityLevel::ModeratelyActive => "Moderately active (exercise 3-5 days/week)",
            ActivityLevel::VeryActive => "Very active (exercise 6-7 days/week)",
            ActivityLevel::ExtraActive => "Extra active (hard daily training)",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "sedentary" => return Ok(ActivityLevel::Sedentary),
            "light" | "lightly_active" => return Ok(ActivityLevel::LightlyActive),
            "moderate" | "moderately_active" => return Ok(ActivityLevel::ModeratelyActive),
            "very" | "very_active" => return Ok(ActivityLevel::VeryActive),
            "extra" | "extra_active" => return Ok(ActivityLevel::ExtraActive),
            _ => {}
        }

        // Older form values carried the multiplier itself ("1.55")
        if let Ok(value) = normalized.parse::<f64>()
            && let Some(level) = ActivityLevel::all()
                .iter()
                .find(|level| level.multiplier() == value)
        {
            return Ok(*level);
        }

        Err(InputError::UnknownActivityLevel(s.to_string()))
    }
}

impl std::fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Body-weight goal that shifts the calorie target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    Loss,
    Maintain,
    Gain,
}

impl Goal {
    /// Returns all goal variants.
    pub fn all() -> &'static [Goal] {
        &[Goal::Loss, Goal::Maintain, Goal::Gain]
    }

    /// Returns the identifier used in JSON and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Goal::Loss => "loss",
            Goal::Maintain => "maintain",
            Goal::Gain => "gain",
        }
    }

    /// Returns the label shown next to the goal choice.
    pub fn display_name(&self) -> &'static str {
        match self {
            Goal::Loss => "Lose weight (500 kcal deficit)",
            Goal::Maintain => "Maintain weight",
            Goal::Gain => "Gain weight (500 kcal surplus)",
        }
    }
}

impl FromStr for Goal {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "loss" | "lose" | "cut" => Ok(Goal::Loss),
            "maintain" | "maintenance" => Ok(Goal::Maintain),
            "gain" | "bulk" => Ok(Goal::Gain),
            _ => Err(InputError::UnknownGoal(s.to_string())),
        }
    }
}

impl std::fmt::Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Biometric input for a single calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    /// Age in years.
    pub age: u32,
    /// Body weight in kilograms.
    #[serde(rename = "weight")]
    pub weight_kg: f64,
    /// Height in centimetres.
    #[serde(rename = "height")]
    pub height_cm: f64,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
}

impl Default for UserData {
    fn default() -> Self {
        Self {
            age: 25,
            weight_kg: 70.0,
            height_cm: 170.0,
            gender: Gender::Male,
            activity_level: ActivityLevel::ModeratelyActive,
            goal: Goal::Maintain,
        }
    }
}

/// Daily macronutrient targets in grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macros {
    pub protein: i64,
    pub carbs: i64,
    pub fats: i64,
}

/// Energy and macronutrient targets derived from [`UserData`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalorieResults {
    /// Basal metabolic rate in kcal/day.
    pub bmr: f64,
    /// Total daily energy expenditure in kcal/day.
    pub tdee: f64,
    /// Daily calorie target after the goal adjustment.
    pub target_calories: f64,
    pub macros: Macros,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_multipliers_increase() {
        let multipliers: Vec<f64> = ActivityLevel::all().iter().map(|a| a.multiplier()).collect();
        assert_eq!(multipliers, vec![1.2, 1.375, 1.55, 1.725, 1.9]);
    }

    #[test]
    fn test_activity_from_legacy_multiplier() {
        assert_eq!(
            "1.55".parse::<ActivityLevel>().unwrap(),
            ActivityLevel::ModeratelyActive
        );
        assert_eq!("1.9".parse::<ActivityLevel>().unwrap(), ActivityLevel::ExtraActive);
        assert!("1.6".parse::<ActivityLevel>().is_err());
    }

    #[test]
    fn test_activity_aliases() {
        assert_eq!(
            "Lightly-Active".parse::<ActivityLevel>().unwrap(),
            ActivityLevel::LightlyActive
        );
        assert_eq!("very".parse::<ActivityLevel>().unwrap(), ActivityLevel::VeryActive);
        assert_eq!(
            "extra active".parse::<ActivityLevel>().unwrap(),
            ActivityLevel::ExtraActive
        );
    }

    #[test]
    fn test_unknown_values_are_rejected() {
        assert_eq!(
            "other".parse::<Gender>(),
            Err(InputError::UnknownGender("other".to_string()))
        );
        assert_eq!(
            "shred".parse::<Goal>(),
            Err(InputError::UnknownGoal("shred".to_string()))
        );
    }

    #[test]
    fn test_ids_parse_back() {
        for gender in Gender::all() {
            assert_eq!(gender.id().parse::<Gender>().unwrap(), *gender);
        }
        for level in ActivityLevel::all() {
            assert_eq!(level.id().parse::<ActivityLevel>().unwrap(), *level);
        }
        for goal in Goal::all() {
            assert_eq!(goal.id().parse::<Goal>().unwrap(), *goal);
        }
    }

    #[test]
    fn test_user_data_json_shape() {
        let json = serde_json::to_value(UserData::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "age": 25,
                "weight": 70.0,
                "height": 170.0,
                "gender": "male",
                "activityLevel": "moderately_active",
                "goal": "maintain"
            })
        );
    }
}
