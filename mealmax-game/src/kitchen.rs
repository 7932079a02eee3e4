//! Kitchen: meal storage and battle statistics
//!
//! A single SQLite table holds every meal. Deletion is soft: rows keep their
//! name (so the name stays reserved) and are hidden from lookups, stats
//! updates, and the leaderboard.
use crate::StatsLedger;
use crate::meal::{Difficulty, Meal, MealError};
use crate::numbers::ratio_to_pct_tenths;
use log::{error, info, warn};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

const CREATE_MEAL_TABLE: &str = include_str!("../data/create_meal_table.sql");
const DROP_MEAL_TABLE: &str = "DROP TABLE IF EXISTS meals;";

/// Outcome of a single battle for one meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Win,
    Loss,
}

impl MatchResult {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Loss => "loss",
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchResult {
    type Err = KitchenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(Self::Win),
            "loss" => Ok(Self::Loss),
            other => Err(KitchenError::InvalidResult(other.to_string())),
        }
    }
}

/// Ordering applied to the leaderboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardSort {
    #[default]
    Wins,
    WinPct,
}

impl LeaderboardSort {
    const fn column(self) -> &'static str {
        match self {
            Self::Wins => "wins",
            Self::WinPct => "win_pct",
        }
    }
}

impl FromStr for LeaderboardSort {
    type Err = KitchenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wins" => Ok(Self::Wins),
            "win_pct" => Ok(Self::WinPct),
            other => Err(KitchenError::InvalidSort(other.to_string())),
        }
    }
}

/// One ranked row of the leaderboard. `win_pct` is a percentage with one decimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: i64,
    pub meal: String,
    pub cuisine: String,
    pub price: f64,
    pub difficulty: Difficulty,
    pub battles: i64,
    pub wins: i64,
    pub win_pct: f64,
}

/// How a meal was looked up, used to phrase lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MealRef {
    Id(i64),
    Name(String),
}

impl fmt::Display for MealRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "with ID {id}"),
            Self::Name(name) => write!(f, "with name {name}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum KitchenError {
    #[error("invalid price: {0}. Price must be a positive number")]
    InvalidPrice(f64),
    #[error("meal with name '{0}' already exists")]
    DuplicateMeal(String),
    #[error("meal {0} not found")]
    NotFound(MealRef),
    #[error("meal {0} has been deleted")]
    Deleted(MealRef),
    #[error("invalid sort_by parameter: {0}")]
    InvalidSort(String),
    #[error("invalid result: {0}. Expected 'win' or 'loss'")]
    InvalidResult(String),
    #[error(transparent)]
    Meal(#[from] MealError),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToSql for Difficulty {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Difficulty {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: MealError| FromSqlError::Other(Box::new(e)))
    }
}

type MealRow = (i64, String, String, f64, Difficulty, bool);

/// Meal storage backed by one SQLite connection.
pub struct Kitchen {
    conn: Connection,
}

impl Kitchen {
    /// Open (or create) the kitchen database at `path` and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KitchenError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!("Opened kitchen database at {}", path.display());
        Self::from_connection(conn)
    }

    /// Open a throwaway in-memory kitchen.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, KitchenError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, KitchenError> {
        conn.execute_batch(CREATE_MEAL_TABLE)?;
        Ok(Self { conn })
    }

    /// Verify the connection answers a trivial query.
    ///
    /// # Errors
    ///
    /// Returns the underlying database error when the probe fails.
    pub fn check_database_connection(&self) -> Result<(), KitchenError> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| {
                error!("Database connection error: {e}");
                KitchenError::from(e)
            })?;
        Ok(())
    }

    /// Whether a table with the given name exists.
    ///
    /// # Errors
    ///
    /// Returns the underlying database error when the lookup fails.
    pub fn check_table_exists(&self, table: &str) -> Result<bool, KitchenError> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        if found.is_none() {
            warn!("Table {table} does not exist");
        }
        Ok(found.is_some())
    }

    /// Insert a new meal and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`KitchenError::InvalidPrice`] for non-positive prices,
    /// [`KitchenError::DuplicateMeal`] when the name is taken (deleted meals included),
    /// or a database error.
    pub fn create_meal(
        &self,
        meal: &str,
        cuisine: &str,
        price: f64,
        difficulty: Difficulty,
    ) -> Result<i64, KitchenError> {
        if !price.is_finite() || price <= 0.0 {
            warn!("Rejected meal {meal} with invalid price {price}");
            return Err(KitchenError::InvalidPrice(price));
        }

        match self.conn.execute(
            "INSERT INTO meals (meal, cuisine, price, difficulty) VALUES (?1, ?2, ?3, ?4)",
            params![meal, cuisine, price, difficulty],
        ) {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                info!("Meal successfully added to the database: {meal} (id {id})");
                Ok(id)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
                    && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                error!("Duplicate meal name: {meal}");
                Err(KitchenError::DuplicateMeal(meal.to_string()))
            }
            Err(e) => {
                error!("Database error: {e}");
                Err(e.into())
            }
        }
    }

    /// Drop every meal and recreate an empty table.
    ///
    /// # Errors
    ///
    /// Returns the underlying database error.
    pub fn clear_meals(&self) -> Result<(), KitchenError> {
        self.conn.execute_batch(DROP_MEAL_TABLE)?;
        self.conn.execute_batch(CREATE_MEAL_TABLE)?;
        info!("Meals cleared successfully");
        Ok(())
    }

    /// Soft-delete a meal.
    ///
    /// # Errors
    ///
    /// Returns [`KitchenError::NotFound`] or [`KitchenError::Deleted`] when the meal is not active.
    pub fn delete_meal(&self, meal_id: i64) -> Result<(), KitchenError> {
        self.ensure_active(meal_id)?;
        self.conn.execute(
            "UPDATE meals SET deleted = TRUE WHERE id = ?1",
            params![meal_id],
        )?;
        info!("Meal with ID {meal_id} marked as deleted");
        Ok(())
    }

    /// Active meals that have fought at least once, best first. Ties keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns the underlying database error.
    pub fn get_leaderboard(
        &self,
        sort: LeaderboardSort,
    ) -> Result<Vec<LeaderboardEntry>, KitchenError> {
        let sql = format!(
            "SELECT id, meal, cuisine, price, difficulty, battles, wins, \
             (wins * 1.0 / battles) AS win_pct \
             FROM meals WHERE deleted = FALSE AND battles > 0 \
             ORDER BY {} DESC, id ASC",
            sort.column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let entries = stmt
            .query_map([], |row| {
                Ok(LeaderboardEntry {
                    id: row.get(0)?,
                    meal: row.get(1)?,
                    cuisine: row.get(2)?,
                    price: row.get(3)?,
                    difficulty: row.get(4)?,
                    battles: row.get(5)?,
                    wins: row.get(6)?,
                    win_pct: ratio_to_pct_tenths(row.get(7)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        info!("Leaderboard retrieved successfully ({} meals)", entries.len());
        Ok(entries)
    }

    /// # Errors
    ///
    /// Returns [`KitchenError::NotFound`] or [`KitchenError::Deleted`] when the meal is not active.
    pub fn get_meal_by_id(&self, meal_id: i64) -> Result<Meal, KitchenError> {
        self.fetch_meal(
            "SELECT id, meal, cuisine, price, difficulty, deleted FROM meals WHERE id = ?1",
            params![meal_id],
            MealRef::Id(meal_id),
        )
    }

    /// # Errors
    ///
    /// Returns [`KitchenError::NotFound`] or [`KitchenError::Deleted`] when the meal is not active.
    pub fn get_meal_by_name(&self, name: &str) -> Result<Meal, KitchenError> {
        self.fetch_meal(
            "SELECT id, meal, cuisine, price, difficulty, deleted FROM meals WHERE meal = ?1",
            params![name],
            MealRef::Name(name.to_string()),
        )
    }

    /// Count one battle for the meal, and one win when `result` is [`MatchResult::Win`].
    ///
    /// # Errors
    ///
    /// Returns [`KitchenError::NotFound`] or [`KitchenError::Deleted`] when the meal is not active.
    pub fn update_meal_stats(&self, meal_id: i64, result: MatchResult) -> Result<(), KitchenError> {
        self.ensure_active(meal_id)?;
        let sql = match result {
            MatchResult::Win => "UPDATE meals SET battles = battles + 1, wins = wins + 1 WHERE id = ?1",
            MatchResult::Loss => "UPDATE meals SET battles = battles + 1 WHERE id = ?1",
        };
        self.conn.execute(sql, params![meal_id])?;
        info!("Recorded {result} for meal with ID {meal_id}");
        Ok(())
    }

    fn fetch_meal(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        reference: MealRef,
    ) -> Result<Meal, KitchenError> {
        let row: Option<MealRow> = self
            .conn
            .query_row(sql, params, |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .optional()?;

        let Some((id, meal, cuisine, price, difficulty, deleted)) = row else {
            info!("Meal {reference} not found");
            return Err(KitchenError::NotFound(reference));
        };
        if deleted {
            info!("Meal {reference} has been deleted");
            return Err(KitchenError::Deleted(reference));
        }
        Ok(Meal::new(id, meal, cuisine, price, difficulty)?)
    }

    fn ensure_active(&self, meal_id: i64) -> Result<(), KitchenError> {
        let deleted: Option<bool> = self
            .conn
            .query_row(
                "SELECT deleted FROM meals WHERE id = ?1",
                params![meal_id],
                |row| row.get(0),
            )
            .optional()?;
        match deleted {
            None => {
                info!("Meal with ID {meal_id} not found");
                Err(KitchenError::NotFound(MealRef::Id(meal_id)))
            }
            Some(true) => {
                info!("Meal with ID {meal_id} has been deleted");
                Err(KitchenError::Deleted(MealRef::Id(meal_id)))
            }
            Some(false) => Ok(()),
        }
    }
}

impl StatsLedger for Kitchen {
    type Error = KitchenError;

    fn record_result(&self, meal_id: i64, result: MatchResult) -> Result<(), Self::Error> {
        self.update_meal_stats(meal_id, result)
    }
}
