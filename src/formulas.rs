//! Energy expenditure and macronutrient formulas.

use crate::domain::{ActivityLevel, Gender, Goal, Macros};

/// Mifflin-St Jeor coefficients (weight in kg, height in cm, age in years).
mod mifflin_st_jeor {
    pub const WEIGHT: f64 = 10.0;
    pub const HEIGHT: f64 = 6.25;
    pub const AGE: f64 = 5.0;
    pub const MALE_OFFSET: f64 = 5.0;
    pub const FEMALE_OFFSET: f64 = -161.0;
}

/// Share of target calories assigned to each macronutrient.
mod macro_share {
    pub const PROTEIN: f64 = 0.30;
    pub const CARBS: f64 = 0.40;
    pub const FATS: f64 = 0.30;
}

/// Energy density of protein (kcal per gram).
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;

/// Energy density of carbohydrate (kcal per gram).
pub const KCAL_PER_G_CARBS: f64 = 4.0;

/// Energy density of fat (kcal per gram).
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// Daily deficit or surplus applied for the loss and gain goals (kcal).
pub const GOAL_ADJUSTMENT_KCAL: f64 = 500.0;

/// Calculates Basal Metabolic Rate with the Mifflin-St Jeor equation.
///
/// Formula:
/// ```text
/// BMR = 10 × weight + 6.25 × height - 5 × age + s
/// ```
/// where `s` is +5 for men and -161 for women.
///
/// Inputs are not validated: zero or negative values produce the
/// corresponding (possibly negative) BMR.
pub fn calculate_bmr(weight_kg: f64, height_cm: f64, age: u32, gender: Gender) -> f64 {
    let offset = match gender {
        Gender::Male => mifflin_st_jeor::MALE_OFFSET,
        Gender::Female => mifflin_st_jeor::FEMALE_OFFSET,
    };

    mifflin_st_jeor::WEIGHT * weight_kg + mifflin_st_jeor::HEIGHT * height_cm
        - mifflin_st_jeor::AGE * f64::from(age)
        + offset
}

/// Scales BMR by the activity multiplier.
pub fn calculate_tdee(bmr: f64, activity_level: ActivityLevel) -> f64 {
    bmr * activity_level.multiplier()
}

/// Shifts TDEE by the goal adjustment. No floor is applied.
pub fn calculate_target_calories(tdee: f64, goal: Goal) -> f64 {
    match goal {
        Goal::Loss => tdee - GOAL_ADJUSTMENT_KCAL,
        Goal::Maintain => tdee,
        Goal::Gain => tdee + GOAL_ADJUSTMENT_KCAL,
    }
}

/// Converts a share of the calorie target into whole grams.
///
/// Rounds half away from zero. Each macro is rounded on its own, so the
/// grams do not add back up to the exact target.
pub fn macro_grams(target_calories: f64, share: f64, kcal_per_gram: f64) -> i64 {
    (target_calories * share / kcal_per_gram).round() as i64
}

/// Splits target calories 30/40/30 into protein, carbohydrate and fat grams.
pub fn calculate_macros(target_calories: f64) -> Macros {
    Macros {
        protein: macro_grams(target_calories, macro_share::PROTEIN, KCAL_PER_G_PROTEIN),
        carbs: macro_grams(target_calories, macro_share::CARBS, KCAL_PER_G_CARBS),
        fats: macro_grams(target_calories, macro_share::FATS, KCAL_PER_G_FAT),
    }
}
