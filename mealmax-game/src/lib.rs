//! MealMax Game Engine
//!
//! Meals live in a SQLite-backed [`Kitchen`]. Any two of them can be staged in a
//! [`BattleModel`] and fought; the outcome feeds the win/loss statistics that rank
//! meals on the leaderboard. This crate has no UI or terminal dependencies.

pub mod battle;
pub mod kitchen;
pub mod meal;
pub mod numbers;
pub mod random;

// Re-export commonly used types
pub use battle::{
    BattleConfig, BattleConfigError, BattleError, BattleModel, BattleReport, DifficultyModifier,
    MAX_COMBATANTS,
};
pub use kitchen::{
    Kitchen, KitchenError, LeaderboardEntry, LeaderboardSort, MatchResult, MealRef,
};
pub use meal::{Difficulty, Meal, MealError};
pub use random::{RandomError, RandomOrg, RandomSource, SeededRandom, parse_fraction};

/// Trait for abstracting where battle outcomes are recorded.
/// [`Kitchen`] is the production implementation.
pub trait StatsLedger {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Record one battle result for a meal.
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be stored.
    fn record_result(&self, meal_id: i64, result: MatchResult) -> Result<(), Self::Error>;
}
