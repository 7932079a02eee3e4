//! Battle arena: two staged combatants, a weighted score, and a random roll
use crate::StatsLedger;
use crate::kitchen::MatchResult;
use crate::meal::{Difficulty, Meal};
use crate::numbers::count_to_f64;
use crate::random::{RandomError, RandomSource};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

const DEFAULT_BATTLE_DATA: &str = include_str!("../data/battle.json");

/// Maximum number of meals that can be staged at once.
pub const MAX_COMBATANTS: usize = 2;

/// Score penalty per difficulty level. Harder meals lose fewer points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyModifier {
    #[serde(rename = "HIGH")]
    pub high: f64,
    #[serde(rename = "MED")]
    pub med: f64,
    #[serde(rename = "LOW")]
    pub low: f64,
}

impl DifficultyModifier {
    #[must_use]
    pub const fn for_difficulty(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::High => self.high,
            Difficulty::Med => self.med,
            Difficulty::Low => self.low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleConfig {
    pub difficulty_modifier: DifficultyModifier,
    /// Divisor turning the score gap into a probability-like delta.
    pub delta_scale: f64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        serde_json::from_str(DEFAULT_BATTLE_DATA).unwrap_or(BattleConfig {
            difficulty_modifier: DifficultyModifier {
                high: 1.0,
                med: 2.0,
                low: 3.0,
            },
            delta_scale: 100.0,
        })
    }
}

impl BattleConfig {
    /// Parse a battle configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or `delta_scale` is not a positive number.
    pub fn from_json(json: &str) -> Result<Self, BattleConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    ///
    /// Returns [`BattleConfigError::DeltaScale`] when the scale is zero, negative, or non-finite.
    pub fn validate(&self) -> Result<(), BattleConfigError> {
        if !self.delta_scale.is_finite() || self.delta_scale <= 0.0 {
            return Err(BattleConfigError::DeltaScale(self.delta_scale));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum BattleConfigError {
    #[error("malformed battle config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("delta_scale must be a positive number (got {0})")]
    DeltaScale(f64),
}

#[derive(Debug, Error)]
pub enum BattleError {
    #[error("combatant list is full, cannot add more combatants")]
    CombatantsFull,
    #[error("two combatants must be prepped for a battle")]
    NotEnoughCombatants,
    #[error(transparent)]
    Random(#[from] RandomError),
    #[error("failed to record battle result: {0}")]
    Stats(Box<dyn std::error::Error + Send + Sync>),
}

/// What happened in one battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    pub winner: Meal,
    pub loser: Meal,
    pub winner_score: f64,
    pub loser_score: f64,
    pub delta: f64,
    pub roll: f64,
}

impl BattleReport {
    #[must_use]
    pub fn winner_name(&self) -> &str {
        &self.winner.meal
    }
}

/// Two-slot staging area plus the scoring rules.
#[derive(Debug, Clone, Default)]
pub struct BattleModel {
    combatants: SmallVec<[Meal; MAX_COMBATANTS]>,
    config: BattleConfig,
}

impl BattleModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: BattleConfig) -> Self {
        Self {
            combatants: SmallVec::new(),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Currently staged meals, in prep order.
    #[must_use]
    pub fn combatants(&self) -> &[Meal] {
        &self.combatants
    }

    /// Stage a meal for the next battle.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::CombatantsFull`] when two meals are already staged.
    pub fn prep_combatant(&mut self, meal: Meal) -> Result<(), BattleError> {
        if self.combatants.len() >= MAX_COMBATANTS {
            warn!(
                "Attempted to add combatant {} but the combatant list is full",
                meal.meal
            );
            return Err(BattleError::CombatantsFull);
        }
        info!("Adding combatant {} to combatants list", meal.meal);
        self.combatants.push(meal);
        Ok(())
    }

    pub fn clear_combatants(&mut self) {
        info!("Clearing the combatants list");
        self.combatants.clear();
    }

    /// `price * cuisine length - difficulty modifier`.
    #[must_use]
    pub fn get_battle_score(&self, meal: &Meal) -> f64 {
        let cuisine_len = count_to_f64(meal.cuisine.chars().count());
        let modifier = self
            .config
            .difficulty_modifier
            .for_difficulty(meal.difficulty);
        let score = meal.price.mul_add(cuisine_len, -modifier);
        debug!("Battle score for {}: {score:.3}", meal.meal);
        score
    }

    /// Fight the two staged meals, record the result, and keep only the winner staged.
    ///
    /// The first combatant wins when the scaled score gap beats the roll.
    /// Nothing changes when the roll or either stats update fails.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::NotEnoughCombatants`] unless exactly two meals are staged,
    /// or the random source or ledger failure.
    pub fn battle<L, R>(&mut self, ledger: &L, random: &mut R) -> Result<BattleReport, BattleError>
    where
        L: StatsLedger + ?Sized,
        R: RandomSource + ?Sized,
    {
        let [first, second] = self.combatants.as_slice() else {
            warn!("Not enough combatants to start a battle");
            return Err(BattleError::NotEnoughCombatants);
        };
        info!("Battle started between {} and {}", first.meal, second.meal);

        let first_score = self.get_battle_score(first);
        let second_score = self.get_battle_score(second);
        let delta = (first_score - second_score).abs() / self.config.delta_scale;
        debug!("Score delta between combatants: {delta:.3}");

        let roll = random.random_fraction()?;
        debug!("Random roll for battle: {roll:.3}");

        let (winner_index, winner_score, loser_score) = if delta > roll {
            (0, first_score, second_score)
        } else {
            (1, second_score, first_score)
        };
        let winner = self.combatants[winner_index].clone();
        let loser = self.combatants[1 - winner_index].clone();

        ledger
            .record_result(winner.id, MatchResult::Win)
            .map_err(|e| BattleError::Stats(Box::new(e)))?;
        ledger
            .record_result(loser.id, MatchResult::Loss)
            .map_err(|e| BattleError::Stats(Box::new(e)))?;

        self.combatants.remove(1 - winner_index);
        info!("The winner is: {}", winner.meal);

        Ok(BattleReport {
            winner,
            loser,
            winner_score,
            loser_score,
            delta,
            roll,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::convert::Infallible;

    struct FixedRoll(f64);

    impl RandomSource for FixedRoll {
        fn random_fraction(&mut self) -> Result<f64, RandomError> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct RecordingLedger {
        calls: RefCell<Vec<(i64, MatchResult)>>,
    }

    impl StatsLedger for RecordingLedger {
        type Error = Infallible;

        fn record_result(&self, meal_id: i64, result: MatchResult) -> Result<(), Self::Error> {
            self.calls.borrow_mut().push((meal_id, result));
            Ok(())
        }
    }

    fn pizza() -> Meal {
        Meal::new(1, "Pizza", "Italian", 10.0, Difficulty::Med).unwrap()
    }

    fn sushi() -> Meal {
        Meal::new(2, "Sushi", "Japanese", 15.0, Difficulty::High).unwrap()
    }

    #[test]
    fn new_model_has_no_combatants() {
        assert!(BattleModel::new().combatants().is_empty());
    }

    #[test]
    fn prep_combatant_stages_meal() {
        let mut model = BattleModel::new();
        model.prep_combatant(pizza()).unwrap();
        assert_eq!(model.combatants(), &[pizza()]);
    }

    #[test]
    fn prep_combatant_rejects_third_meal() {
        let mut model = BattleModel::new();
        model.prep_combatant(pizza()).unwrap();
        model.prep_combatant(sushi()).unwrap();
        let burger = Meal::new(3, "Burger", "American", 8.0, Difficulty::Low).unwrap();
        assert!(matches!(
            model.prep_combatant(burger),
            Err(BattleError::CombatantsFull)
        ));
        assert_eq!(model.combatants().len(), MAX_COMBATANTS);
    }

    #[test]
    fn clear_combatants_empties_staging() {
        let mut model = BattleModel::new();
        model.prep_combatant(pizza()).unwrap();
        model.clear_combatants();
        assert!(model.combatants().is_empty());
    }

    #[test]
    fn battle_score_weights_price_by_cuisine_length() {
        let model = BattleModel::new();
        let meal = Meal::new(1, "Pizza", "Italian", 10.0, Difficulty::Low).unwrap();
        assert!((model.get_battle_score(&meal) - 67.0).abs() < 1e-9);
        assert!((model.get_battle_score(&pizza()) - 68.0).abs() < 1e-9);
        assert!((model.get_battle_score(&sushi()) - 119.0).abs() < 1e-9);
    }

    #[test]
    fn battle_score_counts_characters_not_bytes() {
        let model = BattleModel::new();
        let meal = Meal::new(1, "Crêpe", "Français", 2.0, Difficulty::High).unwrap();
        assert!((model.get_battle_score(&meal) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn first_combatant_wins_when_delta_beats_roll() {
        let mut model = BattleModel::new();
        model.prep_combatant(pizza()).unwrap();
        model.prep_combatant(sushi()).unwrap();
        let ledger = RecordingLedger::default();

        // |68 - 119| / 100 = 0.51 > 0.5
        let report = model.battle(&ledger, &mut FixedRoll(0.5)).unwrap();

        assert_eq!(report.winner_name(), "Pizza");
        assert_eq!(report.loser.meal, "Sushi");
        assert!((report.delta - 0.51).abs() < 1e-9);
        assert_eq!(
            *ledger.calls.borrow(),
            vec![(1, MatchResult::Win), (2, MatchResult::Loss)]
        );
        assert_eq!(model.combatants(), &[pizza()]);
    }

    #[test]
    fn second_combatant_wins_when_roll_is_not_beaten() {
        let mut model = BattleModel::new();
        model.prep_combatant(pizza()).unwrap();
        model.prep_combatant(sushi()).unwrap();
        let ledger = RecordingLedger::default();

        let report = model.battle(&ledger, &mut FixedRoll(0.51)).unwrap();

        assert_eq!(report.winner_name(), "Sushi");
        assert!((report.winner_score - 119.0).abs() < 1e-9);
        assert_eq!(
            *ledger.calls.borrow(),
            vec![(2, MatchResult::Win), (1, MatchResult::Loss)]
        );
        assert_eq!(model.combatants(), &[sushi()]);
    }

    #[test]
    fn battle_requires_two_combatants() {
        let mut model = BattleModel::new();
        let ledger = RecordingLedger::default();
        assert!(matches!(
            model.battle(&ledger, &mut FixedRoll(0.5)),
            Err(BattleError::NotEnoughCombatants)
        ));
        model.prep_combatant(pizza()).unwrap();
        assert!(matches!(
            model.battle(&ledger, &mut FixedRoll(0.5)),
            Err(BattleError::NotEnoughCombatants)
        ));
        assert!(ledger.calls.borrow().is_empty());
    }

    #[test]
    fn failed_roll_leaves_staging_untouched() {
        struct Offline;
        impl RandomSource for Offline {
            fn random_fraction(&mut self) -> Result<f64, RandomError> {
                Err(RandomError::Timeout)
            }
        }

        let mut model = BattleModel::new();
        model.prep_combatant(pizza()).unwrap();
        model.prep_combatant(sushi()).unwrap();
        let ledger = RecordingLedger::default();
        assert!(matches!(
            model.battle(&ledger, &mut Offline),
            Err(BattleError::Random(RandomError::Timeout))
        ));
        assert_eq!(model.combatants().len(), 2);
        assert!(ledger.calls.borrow().is_empty());
    }

    #[test]
    fn default_config_matches_bundled_json() {
        let cfg = BattleConfig::default();
        assert!((cfg.difficulty_modifier.for_difficulty(Difficulty::High) - 1.0).abs() < 1e-9);
        assert!((cfg.difficulty_modifier.for_difficulty(Difficulty::Med) - 2.0).abs() < 1e-9);
        assert!((cfg.difficulty_modifier.for_difficulty(Difficulty::Low) - 3.0).abs() < 1e-9);
        assert!((cfg.delta_scale - 100.0).abs() < 1e-9);
    }

    #[test]
    fn custom_config_changes_scoring() {
        let cfg = BattleConfig::from_json(
            r#"{"difficulty_modifier": {"HIGH": 0, "MED": 5, "LOW": 10}, "delta_scale": 10}"#,
        )
        .unwrap();
        let model = BattleModel::with_config(cfg);
        assert!((model.get_battle_score(&pizza()) - 65.0).abs() < 1e-9);
    }

    #[test]
    fn config_rejects_non_positive_scale() {
        let err = BattleConfig::from_json(
            r#"{"difficulty_modifier": {"HIGH": 1, "MED": 2, "LOW": 3}, "delta_scale": 0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, BattleConfigError::DeltaScale(_)));
        assert!(matches!(
            BattleConfig::from_json("{"),
            Err(BattleConfigError::Json(_))
        ));
    }
}
