use anyhow::Result;
use chrono::Utc;
use clap::ValueEnum;
use colored::Colorize;
use mealmax_game::{BattleReport, LeaderboardEntry, LeaderboardSort, Meal};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable colored output
    Console,
    /// Pretty-printed JSON
    Json,
    /// Markdown tables
    Markdown,
}

#[derive(Serialize)]
struct StatusPayload<'a> {
    status: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct LeaderboardPayload<'a> {
    sort: LeaderboardSort,
    generated_at: String,
    entries: &'a [LeaderboardEntry],
}

const fn sort_label(sort: LeaderboardSort) -> &'static str {
    match sort {
        LeaderboardSort::Wins => "wins",
        LeaderboardSort::WinPct => "win %",
    }
}

pub fn write_status(out: &mut dyn Write, format: ReportFormat, message: &str) -> Result<()> {
    match format {
        ReportFormat::Json => {
            serde_json::to_writer_pretty(
                &mut *out,
                &StatusPayload {
                    status: "success",
                    message,
                },
            )?;
            writeln!(out)?;
        }
        ReportFormat::Markdown => writeln!(out, "- ✅ {message}")?,
        ReportFormat::Console => writeln!(out, "{} {message}", "✅".green())?,
    }
    Ok(())
}

pub fn write_meal(out: &mut dyn Write, format: ReportFormat, meal: &Meal) -> Result<()> {
    match format {
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, meal)?;
            writeln!(out)?;
        }
        ReportFormat::Markdown => {
            writeln!(out, "## {}\n", meal.meal)?;
            writeln!(out, "- **ID**: {}", meal.id)?;
            writeln!(out, "- **Cuisine**: {}", meal.cuisine)?;
            writeln!(out, "- **Price**: {:.2}", meal.price)?;
            writeln!(out, "- **Difficulty**: {}", meal.difficulty)?;
        }
        ReportFormat::Console => {
            writeln!(out, "🍽️  {} (#{})", meal.meal.bold(), meal.id)?;
            writeln!(out, "   Cuisine: {}", meal.cuisine)?;
            writeln!(out, "   Price: {:.2}", meal.price)?;
            writeln!(out, "   Difficulty: {}", meal.difficulty)?;
        }
    }
    Ok(())
}

pub fn write_leaderboard(
    out: &mut dyn Write,
    format: ReportFormat,
    sort: LeaderboardSort,
    entries: &[LeaderboardEntry],
) -> Result<()> {
    match format {
        ReportFormat::Json => {
            let payload = LeaderboardPayload {
                sort,
                generated_at: Utc::now().to_rfc3339(),
                entries,
            };
            serde_json::to_writer_pretty(&mut *out, &payload)?;
            writeln!(out)?;
        }
        ReportFormat::Markdown => {
            writeln!(out, "# MealMax Leaderboard\n")?;
            writeln!(
                out,
                "_Sorted by {} at {}_\n",
                sort_label(sort),
                Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
            )?;
            if entries.is_empty() {
                writeln!(out, "_No meals have battled yet._")?;
                return Ok(());
            }
            writeln!(
                out,
                "| Rank | Meal | Cuisine | Price | Difficulty | Battles | Wins | Win % |"
            )?;
            writeln!(out, "|---|---|---|---|---|---|---|---|")?;
            for (rank, entry) in entries.iter().enumerate() {
                writeln!(
                    out,
                    "| {} | {} | {} | {:.2} | {} | {} | {} | {:.1} |",
                    rank + 1,
                    entry.meal,
                    entry.cuisine,
                    entry.price,
                    entry.difficulty,
                    entry.battles,
                    entry.wins,
                    entry.win_pct
                )?;
            }
        }
        ReportFormat::Console => {
            writeln!(out, "{}", "🏆 MealMax Leaderboard".bright_cyan().bold())?;
            writeln!(out, "{}", "=====================".cyan())?;
            writeln!(out, "Sorted by: {}", sort_label(sort))?;
            if entries.is_empty() {
                writeln!(out, "No meals have battled yet.")?;
                return Ok(());
            }
            for (rank, entry) in entries.iter().enumerate() {
                writeln!(
                    out,
                    "{:>3}. {:<20} {:>3} wins / {:>3} battles ({:>5.1}%)  {} · {}",
                    rank + 1,
                    entry.meal.bold(),
                    entry.wins,
                    entry.battles,
                    entry.win_pct,
                    entry.cuisine,
                    entry.difficulty
                )?;
            }
        }
    }
    Ok(())
}

pub fn write_battles(
    out: &mut dyn Write,
    format: ReportFormat,
    reports: &[BattleReport],
) -> Result<()> {
    match format {
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, reports)?;
            writeln!(out)?;
        }
        ReportFormat::Markdown => {
            writeln!(out, "# MealMax Battle Results\n")?;
            for (round, report) in reports.iter().enumerate() {
                writeln!(
                    out,
                    "### Round {}: {} vs {}\n",
                    round + 1,
                    report.winner.meal,
                    report.loser.meal
                )?;
                writeln!(out, "- **Winner**: {}", report.winner.meal)?;
                writeln!(
                    out,
                    "- **Scores**: {:.2} vs {:.2}",
                    report.winner_score, report.loser_score
                )?;
                writeln!(
                    out,
                    "- **Delta / roll**: {:.3} / {:.2}\n",
                    report.delta, report.roll
                )?;
            }
        }
        ReportFormat::Console => {
            writeln!(out, "{}", "⚔️  MealMax Battle".bright_cyan().bold())?;
            writeln!(out, "{}", "=================".cyan())?;
            for (round, report) in reports.iter().enumerate() {
                writeln!(
                    out,
                    "Round {}: {} beat {}",
                    round + 1,
                    report.winner.meal.as_str().green().bold(),
                    report.loser.meal.as_str().red()
                )?;
                writeln!(
                    out,
                    "   Scores: {:.2} vs {:.2} (delta {:.3}, roll {:.2})",
                    report.winner_score, report.loser_score, report.delta, report.roll
                )?;
            }
            if let Some(last) = reports.last() {
                writeln!(out)?;
                writeln!(out, "🏁 Champion: {}", last.winner_name())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealmax_game::Difficulty;

    fn meal(id: i64, name: &str, cuisine: &str, price: f64) -> Meal {
        Meal::new(id, name, cuisine, price, Difficulty::Med).unwrap()
    }

    fn entry(name: &str, battles: i64, wins: i64, win_pct: f64) -> LeaderboardEntry {
        LeaderboardEntry {
            id: 1,
            meal: name.to_string(),
            cuisine: "Italian".to_string(),
            price: 10.0,
            difficulty: Difficulty::Med,
            battles,
            wins,
            win_pct,
        }
    }

    fn render(f: impl FnOnce(&mut dyn Write) -> Result<()>) -> String {
        let mut buf: Vec<u8> = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn json_status_is_machine_readable() {
        let text = render(|out| write_status(out, ReportFormat::Json, "Meal deleted"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["message"], "Meal deleted");
    }

    #[test]
    fn json_leaderboard_carries_sort_and_entries() {
        let entries = vec![entry("Pizza", 5, 3, 60.0)];
        let text = render(|out| {
            write_leaderboard(out, ReportFormat::Json, LeaderboardSort::WinPct, &entries)
        });
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["sort"], "win_pct");
        assert_eq!(value["entries"][0]["meal"], "Pizza");
        assert_eq!(value["entries"][0]["win_pct"], 60.0);
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn markdown_leaderboard_renders_table() {
        let entries = vec![entry("Pizza", 5, 3, 60.0), entry("Sushi", 2, 1, 50.0)];
        let text = render(|out| {
            write_leaderboard(out, ReportFormat::Markdown, LeaderboardSort::Wins, &entries)
        });
        assert!(text.contains("# MealMax Leaderboard"));
        assert!(text.contains("| 1 | Pizza | Italian | 10.00 | MED | 5 | 3 | 60.0 |"));
        assert!(text.contains("| 2 | Sushi |"));
    }

    #[test]
    fn empty_leaderboard_says_so() {
        let text = render(|out| {
            write_leaderboard(out, ReportFormat::Markdown, LeaderboardSort::Wins, &[])
        });
        assert!(text.contains("No meals have battled yet"));
    }

    #[test]
    fn battle_reports_name_each_round() {
        let reports = vec![BattleReport {
            winner: meal(1, "Pizza", "Italian", 10.0),
            loser: meal(2, "Sushi", "Japanese", 15.0),
            winner_score: 68.0,
            loser_score: 118.0,
            delta: 0.5,
            roll: 0.42,
        }];
        let text = render(|out| write_battles(out, ReportFormat::Markdown, &reports));
        assert!(text.contains("### Round 1: Pizza vs Sushi"));
        assert!(text.contains("- **Winner**: Pizza"));

        let json = render(|out| write_battles(out, ReportFormat::Json, &reports));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["winner"]["meal"], "Pizza");
        assert_eq!(value[0]["roll"], 0.42);
    }

    #[test]
    fn console_meal_lists_fields() {
        let text = render(|out| {
            write_meal(
                out,
                ReportFormat::Console,
                &meal(3, "Tacos", "Mexican", 6.5),
            )
        });
        assert!(text.contains("Cuisine: Mexican"));
        assert!(text.contains("Price: 6.50"));
        assert!(text.contains("Difficulty: MED"));
    }
}
