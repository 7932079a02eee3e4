//! Meal records and their validation rules
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Preparation difficulty of a meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Low,
    Med,
    High,
}

impl Difficulty {
    pub const ALL: [Self; 3] = [Self::Low, Self::Med, Self::High];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Med => "MED",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = MealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MED" => Ok(Self::Med),
            "HIGH" => Ok(Self::High),
            other => Err(MealError::InvalidDifficulty(other.to_string())),
        }
    }
}

/// Validation failures for a meal record.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MealError {
    #[error("price must be a non-negative number (got {0})")]
    NegativePrice(f64),
    #[error("invalid difficulty level: {0}. Must be 'LOW', 'MED', or 'HIGH'")]
    InvalidDifficulty(String),
}

/// A persisted meal as seen by the kitchen and the battle arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    pub meal: String,
    pub cuisine: String,
    pub price: f64,
    pub difficulty: Difficulty,
}

impl Meal {
    /// Build a meal record, rejecting negative or non-finite prices.
    ///
    /// # Errors
    ///
    /// Returns [`MealError::NegativePrice`] when `price` is below zero or not finite.
    pub fn new(
        id: i64,
        meal: impl Into<String>,
        cuisine: impl Into<String>,
        price: f64,
        difficulty: Difficulty,
    ) -> Result<Self, MealError> {
        if !price.is_finite() || price < 0.0 {
            return Err(MealError::NegativePrice(price));
        }
        Ok(Self {
            id,
            meal: meal.into(),
            cuisine: cuisine.into(),
            price,
            difficulty,
        })
    }
}
