use anyhow::{Context, Result, bail};
use mealmax_game::{Kitchen, Meal};

/// How a CLI token names a meal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MealSelector {
    Id(i64),
    Name(String),
}

impl MealSelector {
    /// Integer tokens are treated as IDs, anything else as a meal name.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        token
            .parse::<i64>()
            .map_or_else(|_| Self::Name(token.to_string()), Self::Id)
    }

    pub fn fetch(&self, kitchen: &Kitchen) -> Result<Meal> {
        let meal = match self {
            Self::Id(id) => kitchen.get_meal_by_id(*id)?,
            Self::Name(name) => kitchen.get_meal_by_name(name)?,
        };
        Ok(meal)
    }
}

/// Resolve CLI meal arguments into active meals, in the order given.
pub fn resolve_meal_inputs(kitchen: &Kitchen, tokens: &[String]) -> Result<Vec<Meal>> {
    let mut meals = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token.trim().is_empty() {
            continue;
        }
        let meal = MealSelector::parse(token)
            .fetch(kitchen)
            .with_context(|| format!("cannot stage meal '{token}'"))?;
        log::debug!("Resolved '{token}' to meal {} ({})", meal.id, meal.meal);
        meals.push(meal);
    }

    if meals.len() < 2 {
        bail!("at least two meals are required for a battle");
    }
    Ok(meals)
}
