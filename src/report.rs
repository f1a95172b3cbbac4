//! Presentation of calculation results for terminals, chat and JSON clients.

use std::fmt::Write;

use serde::Serialize;

use crate::domain::{CalorieResults, Goal, UserData};
use crate::formulas::{KCAL_PER_G_CARBS, KCAL_PER_G_FAT, KCAL_PER_G_PROTEIN};

/// Quick tips shown alongside every result.
pub const TIPS: [&str; 3] = [
    "Drink 2-3 litres of water a day to support your metabolism.",
    "Favour lean protein sources to protect your muscle mass.",
    "Sleep 7-8 hours a night; it regulates the hormones that drive fat loss.",
];

/// One segment of the macronutrient chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroSlice {
    pub name: &'static str,
    pub grams: i64,
    /// Calories supplied by this macro (grams times energy density).
    pub kcal: f64,
    /// Chart colour as a hex string.
    pub color: &'static str,
}

/// Display model of a calculation: headline numbers rounded to whole kcal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsView {
    pub target_calories: i64,
    pub bmr: i64,
    pub tdee: i64,
    pub goal_label: &'static str,
    pub macro_chart: Vec<MacroSlice>,
    pub tips: Vec<&'static str>,
}

impl ResultsView {
    pub fn new(user: &UserData, results: &CalorieResults) -> Self {
        Self {
            target_calories: results.target_calories.round() as i64,
            bmr: results.bmr.round() as i64,
            tdee: results.tdee.round() as i64,
            goal_label: goal_label(user.goal),
            macro_chart: macro_chart(results),
            tips: TIPS.to_vec(),
        }
    }
}

/// Short summary of what the goal means for the plan.
pub fn goal_label(goal: Goal) -> &'static str {
    match goal {
        Goal::Loss => "Weight loss",
        Goal::Maintain => "Weight maintenance",
        Goal::Gain => "Muscle gain",
    }
}

/// Builds the protein, carbohydrate and fat chart segments, in that order.
pub fn macro_chart(results: &CalorieResults) -> Vec<MacroSlice> {
    let macros = &results.macros;
    vec![
        MacroSlice {
            name: "Protein",
            grams: macros.protein,
            kcal: macros.protein as f64 * KCAL_PER_G_PROTEIN,
            color: "#10b981",
        },
        MacroSlice {
            name: "Carbs",
            grams: macros.carbs,
            kcal: macros.carbs as f64 * KCAL_PER_G_CARBS,
            color: "#3b82f6",
        },
        MacroSlice {
            name: "Fats",
            grams: macros.fats,
            kcal: macros.fats as f64 * KCAL_PER_G_FAT,
            color: "#f59e0b",
        },
    ]
}

/// Renders a plain-text report suitable for a terminal or a chat message.
pub fn render_text(user: &UserData, results: &CalorieResults) -> String {
    let view = ResultsView::new(user, results);
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "=== Daily Target ===");
    let _ = writeln!(out);
    let _ = writeln!(out, "Target: {} kcal ({})", view.target_calories, view.goal_label);
    let _ = writeln!(out, "BMR:    {} kcal", view.bmr);
    let _ = writeln!(out, "TDEE:   {} kcal", view.tdee);
    let _ = writeln!(out);
    let _ = writeln!(out, "=== Macros ===");
    let _ = writeln!(out);
    for slice in &view.macro_chart {
        let _ = writeln!(
            out,
            "{:8} {:5} g  {:6.0} kcal",
            slice.name, slice.grams, slice.kcal
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "=== Quick Tips ===");
    let _ = writeln!(out);
    for (i, tip) in view.tips.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, tip);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calories::compute;

    #[test]
    fn test_view_rounds_headline_numbers() {
        let user = UserData::default();
        let view = ResultsView::new(&user, &compute(&user));

        // 1642.5 rounds half away from zero, 2545.875 rounds up
        assert_eq!(view.bmr, 1643);
        assert_eq!(view.tdee, 2546);
        assert_eq!(view.target_calories, 2546);
        assert_eq!(view.goal_label, "Weight maintenance");
    }

    #[test]
    fn test_macro_chart_kcal() {
        let user = UserData::default();
        let chart = macro_chart(&compute(&user));

        let names: Vec<&str> = chart.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Protein", "Carbs", "Fats"]);
        assert_eq!(chart[0].kcal, 191.0 * 4.0);
        assert_eq!(chart[1].kcal, 255.0 * 4.0);
        assert_eq!(chart[2].kcal, 85.0 * 9.0);
    }

    #[test]
    fn test_goal_labels() {
        assert_eq!(goal_label(Goal::Loss), "Weight loss");
        assert_eq!(goal_label(Goal::Gain), "Muscle gain");
    }

    #[test]
    fn test_render_text_contains_numbers() {
        let user = UserData::default();
        let text = render_text(&user, &compute(&user));

        assert!(text.contains("Target: 2546 kcal (Weight maintenance)"));
        assert!(text.contains("BMR:    1643 kcal"));
        assert!(text.contains("Protein"));
        assert!(text.contains("191 g"));
        assert!(text.contains("3. Sleep"));
    }
}
