mod reports;
mod selectors;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use mealmax_game::{
    BattleConfig, BattleModel, BattleReport, Difficulty, Kitchen, LeaderboardSort, MatchResult,
    RandomOrg, RandomSource, SeededRandom,
};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};

use reports::ReportFormat;
use selectors::{MealSelector, resolve_meal_inputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RandomMode {
    /// Reproducible rolls from --seed (or fresh entropy when no seed is given)
    Seeded,
    /// Fetch each roll from random.org
    RandomOrg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    /// Most wins first
    Wins,
    /// Highest win percentage first
    WinPct,
}

impl From<SortArg> for LeaderboardSort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Wins => Self::Wins,
            SortArg::WinPct => Self::WinPct,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "mealmax", version)]
#[command(about = "Manage the MealMax kitchen and pit meals against each other")]
struct Args {
    /// SQLite database holding the meals table
    #[arg(long, env = "MEALMAX_DB", default_value = "meal_max.db", global = true)]
    db: PathBuf,

    /// Where battle rolls come from
    #[arg(long, value_enum, default_value_t = RandomMode::Seeded, global = true)]
    random: RandomMode,

    /// Seed for reproducible battles (seeded mode only)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// JSON file overriding the bundled battle scoring rules
    #[arg(long, global = true)]
    battle_config: Option<PathBuf>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console, global = true)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add a meal to the kitchen
    CreateMeal {
        #[arg(long)]
        name: String,
        #[arg(long)]
        cuisine: String,
        #[arg(long, allow_hyphen_values = true)]
        price: f64,
        /// LOW, MED or HIGH
        #[arg(long)]
        difficulty: Difficulty,
    },
    /// Mark a meal as deleted
    DeleteMeal { id: i64 },
    /// Look up one active meal
    GetMeal {
        #[arg(long, conflicts_with = "name", required_unless_present = "name")]
        id: Option<i64>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Rank meals that have fought at least once
    Leaderboard {
        #[arg(long, value_enum, default_value_t = SortArg::Wins)]
        sort: SortArg,
    },
    /// Record a win or loss for a meal by hand
    UpdateStats { id: i64, result: MatchResult },
    /// Drop and recreate the meals table
    ClearMeals,
    /// Verify the database connection and the meals table
    DbCheck,
    /// Fight two meals (IDs or names)
    Battle { first: String, second: String },
    /// The winner stays on and each following meal challenges it
    Gauntlet {
        #[arg(num_args = 2.., required = true)]
        meals: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let kitchen = Kitchen::open(&args.db)
        .with_context(|| format!("failed to open kitchen at {}", args.db.display()))?;
    let mut output_target = OutputTarget::new(args.output.clone())?;
    run(&args, &kitchen, output_target.writer())?;
    output_target.flush_inner()?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init();
}

fn run(args: &Args, kitchen: &Kitchen, out: &mut dyn Write) -> Result<()> {
    let format = args.report;
    match &args.command {
        Command::CreateMeal {
            name,
            cuisine,
            price,
            difficulty,
        } => {
            let id = kitchen.create_meal(name, cuisine, *price, *difficulty)?;
            let meal = kitchen.get_meal_by_id(id)?;
            reports::write_meal(out, format, &meal)?;
        }
        Command::DeleteMeal { id } => {
            kitchen.delete_meal(*id)?;
            reports::write_status(out, format, &format!("Meal {id} deleted"))?;
        }
        Command::GetMeal { id, name } => {
            let selector = match (id, name) {
                (Some(id), _) => MealSelector::Id(*id),
                (None, Some(name)) => MealSelector::Name(name.clone()),
                (None, None) => bail!("either --id or --name is required"),
            };
            let meal = selector.fetch(kitchen)?;
            reports::write_meal(out, format, &meal)?;
        }
        Command::Leaderboard { sort } => {
            let sort = LeaderboardSort::from(*sort);
            let entries = kitchen.get_leaderboard(sort)?;
            reports::write_leaderboard(out, format, sort, &entries)?;
        }
        Command::UpdateStats { id, result } => {
            kitchen.update_meal_stats(*id, *result)?;
            reports::write_status(out, format, &format!("Recorded a {result} for meal {id}"))?;
        }
        Command::ClearMeals => {
            kitchen.clear_meals()?;
            reports::write_status(out, format, "Meals table cleared")?;
        }
        Command::DbCheck => {
            kitchen.check_database_connection()?;
            if !kitchen.check_table_exists("meals")? {
                bail!("meals table does not exist");
            }
            reports::write_status(out, format, "Database connection and meals table are healthy")?;
        }
        Command::Battle { first, second } => {
            let rounds = run_gauntlet(args, kitchen, &[first.clone(), second.clone()])?;
            reports::write_battles(out, format, &rounds)?;
        }
        Command::Gauntlet { meals } => {
            let rounds = run_gauntlet(args, kitchen, meals)?;
            reports::write_battles(out, format, &rounds)?;
        }
    }
    Ok(())
}

/// Stage the first meal, then let each following meal challenge whoever is still standing.
fn run_gauntlet(args: &Args, kitchen: &Kitchen, tokens: &[String]) -> Result<Vec<BattleReport>> {
    let meals = resolve_meal_inputs(kitchen, tokens)?;
    let config = load_battle_config(args.battle_config.as_deref())?;
    let mut random = build_random_source(args.random, args.seed)?;
    let mut model = BattleModel::with_config(config);

    let mut rounds = Vec::with_capacity(meals.len().saturating_sub(1));
    for meal in meals {
        model.prep_combatant(meal)?;
        if model.combatants().len() < 2 {
            continue;
        }
        let report = model
            .battle(kitchen, random.as_mut())
            .with_context(|| format!("round {} failed", rounds.len() + 1))?;
        rounds.push(report);
    }
    Ok(rounds)
}

fn load_battle_config(path: Option<&Path>) -> Result<BattleConfig> {
    let Some(path) = path else {
        return Ok(BattleConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read battle config {}", path.display()))?;
    BattleConfig::from_json(&json)
        .with_context(|| format!("invalid battle config {}", path.display()))
}

fn build_random_source(mode: RandomMode, seed: Option<u64>) -> Result<Box<dyn RandomSource>> {
    match mode {
        RandomMode::Seeded => Ok(Box::new(
            seed.map_or_else(SeededRandom::from_entropy, SeededRandom::from_user_seed),
        )),
        RandomMode::RandomOrg => {
            if seed.is_some() {
                log::warn!("--seed is ignored when rolls come from random.org");
            }
            Ok(Box::new(RandomOrg::new()?))
        }
    }
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}
