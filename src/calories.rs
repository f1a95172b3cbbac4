//! Daily calorie and macronutrient targets from biometric input.
//!
//! The calculation is a pure function of [`UserData`]:
//! 1. BMR from the Mifflin-St Jeor equation
//! 2. TDEE as BMR times the activity multiplier
//! 3. Target calories as TDEE shifted by the goal (±500 kcal)
//! 4. A fixed 30/40/30 protein/carbohydrate/fat split, rounded to grams
//!
//! Inputs are not validated. Degenerate values (zero weight, zero height)
//! flow through the arithmetic and produce degenerate but well-formed results.

use crate::domain::{CalorieResults, UserData};
use crate::formulas::{calculate_bmr, calculate_macros, calculate_target_calories, calculate_tdee};

/// Computes energy expenditure and macronutrient targets for `input`.
pub fn compute(input: &UserData) -> CalorieResults {
    let bmr = calculate_bmr(input.weight_kg, input.height_cm, input.age, input.gender);
    let tdee = calculate_tdee(bmr, input.activity_level);
    let target_calories = calculate_target_calories(tdee, input.goal);

    CalorieResults {
        bmr,
        tdee,
        target_calories,
        macros: calculate_macros(target_calories),
    }
}
