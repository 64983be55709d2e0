use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::api_connection::endpoints::RecipeRequest;

/// Sent when the user asks for recipes without typing anything.
pub const DEFAULT_PREFERENCE: &str = "Find recipes with my ingredients";
pub const DEFAULT_BUDGET: f64 = 5.0;
pub const MIN_BUDGET: f64 = 0.0;
pub const MAX_BUDGET: f64 = 100.0;

/// The kitchen utensils a user can pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Utensil {
    Pot,
    Pan,
    Bowl,
    Knife,
    CuttingBoard,
    Oven,
    Microwave,
    Blender,
    Toaster,
    Grill,
    Whisk,
    Spatula,
    BakingTray,
    Colander,
    Kettle,
}

impl Utensil {
    pub const ALL: [Utensil; 15] = [
        Utensil::Pot,
        Utensil::Pan,
        Utensil::Bowl,
        Utensil::Knife,
        Utensil::CuttingBoard,
        Utensil::Oven,
        Utensil::Microwave,
        Utensil::Blender,
        Utensil::Toaster,
        Utensil::Grill,
        Utensil::Whisk,
        Utensil::Spatula,
        Utensil::BakingTray,
        Utensil::Colander,
        Utensil::Kettle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Utensil::Pot => "pot",
            Utensil::Pan => "pan",
            Utensil::Bowl => "bowl",
            Utensil::Knife => "knife",
            Utensil::CuttingBoard => "cutting board",
            Utensil::Oven => "oven",
            Utensil::Microwave => "microwave",
            Utensil::Blender => "blender",
            Utensil::Toaster => "toaster",
            Utensil::Grill => "grill",
            Utensil::Whisk => "whisk",
            Utensil::Spatula => "spatula",
            Utensil::BakingTray => "baking tray",
            Utensil::Colander => "colander",
            Utensil::Kettle => "kettle",
        }
    }
}

impl fmt::Display for Utensil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Utensil {
    type Err = String;

    /// Accepts the display label as well as dashed or underscored spellings
    /// ("cutting board", "cutting-board", "Cutting_Board").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', '_'], " ");
        Utensil::ALL
            .iter()
            .copied()
            .find(|u| u.label() == wanted)
            .ok_or_else(|| format!("Unknown utensil: {}", s.trim()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UtensilSelection {
    selected: BTreeSet<Utensil>,
}

impl UtensilSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the utensil in or out of the selection; returns whether it is
    /// selected afterwards.
    pub fn toggle(&mut self, utensil: Utensil) -> bool {
        if self.selected.remove(&utensil) {
            false
        } else {
            self.selected.insert(utensil);
            true
        }
    }

    pub fn contains(&self, utensil: Utensil) -> bool {
        self.selected.contains(&utensil)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Utensil> + '_ {
        self.selected.iter().copied()
    }

    /// Labels in the fixed list order.
    pub fn labels(&self) -> Vec<String> {
        self.iter().map(|u| u.label().to_string()).collect()
    }
}

impl FromIterator<Utensil> for UtensilSelection {
    fn from_iter<T: IntoIterator<Item = Utensil>>(iter: T) -> Self {
        Self {
            selected: iter.into_iter().collect(),
        }
    }
}

/// Budget clamped to `MIN_BUDGET..=MAX_BUDGET`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget(f64);

impl Budget {
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Budget(value.clamp(MIN_BUDGET, MAX_BUDGET))
        } else {
            Budget(DEFAULT_BUDGET)
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Budget {
    fn default() -> Self {
        Budget(DEFAULT_BUDGET)
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

/// Builds the `/api/recipes` body. A blank preference becomes
/// [`DEFAULT_PREFERENCE`]; a zero or unusable budget becomes
/// [`DEFAULT_BUDGET`].
pub fn compose(
    ingredients: &[String],
    utensils: &UtensilSelection,
    preference: &str,
    budget: f64,
) -> RecipeRequest {
    let preference = preference.trim();
    let preference = if preference.is_empty() {
        DEFAULT_PREFERENCE.to_string()
    } else {
        preference.to_string()
    };

    let budget = if budget.is_finite() && budget > 0.0 {
        Budget::new(budget).value()
    } else {
        DEFAULT_BUDGET
    };

    RecipeRequest {
        available_ingredients: ingredients.to_vec(),
        available_utensils: utensils.labels(),
        preference,
        budget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_empty_preference_uses_fallback() {
        let request = compose(&["Egg".to_string()], &UtensilSelection::new(), "", 12.0);
        assert_eq!(request.preference, DEFAULT_PREFERENCE);

        let request = compose(&[], &UtensilSelection::new(), "   \t", 12.0);
        assert_eq!(request.preference, DEFAULT_PREFERENCE);
    }

    #[test]
    fn test_compose_keeps_trimmed_preference() {
        let request = compose(&[], &UtensilSelection::new(), "  something spicy ", 12.0);
        assert_eq!(request.preference, "something spicy");
        assert_eq!(request.budget, 12.0);
    }

    #[test]
    fn test_compose_budget_defaults_when_zero_or_invalid() {
        let utensils = UtensilSelection::new();
        assert_eq!(compose(&[], &utensils, "x", 0.0).budget, DEFAULT_BUDGET);
        assert_eq!(compose(&[], &utensils, "x", f64::NAN).budget, DEFAULT_BUDGET);
        assert_eq!(compose(&[], &utensils, "x", -3.0).budget, DEFAULT_BUDGET);
        assert_eq!(compose(&[], &utensils, "x", 250.0).budget, MAX_BUDGET);
    }

    #[test]
    fn test_compose_carries_ingredients_and_utensils_in_list_order() {
        let utensils: UtensilSelection = [Utensil::Oven, Utensil::Pot, Utensil::CuttingBoard]
            .into_iter()
            .collect();
        let ingredients = vec!["Egg".to_string(), "Milk".to_string()];
        let request = compose(&ingredients, &utensils, "breakfast", 8.5);
        assert_eq!(request.available_ingredients, ingredients);
        assert_eq!(request.available_utensils, vec!["pot", "cutting board", "oven"]);
    }

    #[test]
    fn test_toggle_semantics() {
        let mut utensils = UtensilSelection::new();
        assert!(utensils.toggle(Utensil::Pan));
        assert!(utensils.contains(Utensil::Pan));
        assert!(!utensils.toggle(Utensil::Pan));
        assert!(utensils.is_empty());
    }

    #[test]
    fn test_utensil_from_str_accepts_spellings() {
        assert_eq!("Cutting-Board".parse::<Utensil>(), Ok(Utensil::CuttingBoard));
        assert_eq!("baking_tray".parse::<Utensil>(), Ok(Utensil::BakingTray));
        assert_eq!(" pot ".parse::<Utensil>(), Ok(Utensil::Pot));
        assert!("spork".parse::<Utensil>().is_err());
    }

    #[test]
    fn test_budget_clamps() {
        assert_eq!(Budget::new(-1.0).value(), MIN_BUDGET);
        assert_eq!(Budget::new(101.0).value(), MAX_BUDGET);
        assert_eq!(Budget::new(f64::INFINITY).value(), DEFAULT_BUDGET);
        assert_eq!(Budget::default().value(), DEFAULT_BUDGET);
        assert_eq!(Budget::new(7.5).to_string(), "$7.50");
    }
}
