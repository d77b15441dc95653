//! Statistics command handler

use anyhow::Result;
use chrono::Utc;

use shelfwise_core::session::Session;
use shelfwise_core::stats::{compute_stats, format_average_rating, LibraryStats};

use crate::output::{stars, Output};

const BAR_WIDTH: usize = 24;
const MONTH_LETTERS: [&str; 12] = ["J", "F", "M", "A", "M", "J", "J", "A", "S", "O", "N", "D"];

/// Show library statistics
pub fn show(session: &Session, output: &Output) -> Result<()> {
    let stats = compute_stats(
        session.books(),
        session.settings(),
        Utc::now().date_naive(),
    );

    if output.is_json() {
        println!("{}", serde_json::to_string_pretty(&to_json(&stats))?);
        return Ok(());
    }
    if output.is_quiet() {
        println!("{} {} {} {}", stats.total, stats.read, stats.reading, stats.want);
        return Ok(());
    }

    println!("── Library ──");
    println!("Total:        {}", stats.total);
    println!(
        "Read:         {} ({} this year)",
        stats.read, stats.read_this_year
    );
    println!("Reading:      {}", stats.reading);
    println!("Want to read: {}", stats.want);
    match stats.average_rating {
        Some(avg) => println!(
            "Avg rating:   {} over {} rated",
            format_average_rating(avg),
            stats.rated_count
        ),
        None => println!("Avg rating:   —"),
    }
    println!("Genres:       {}", stats.genre_count);
    if stats.total_pages > 0 {
        println!("Pages read:   {}", stats.total_pages);
    }
    if stats.average_days > 0 {
        println!("Avg pace:     {} days per book", stats.average_days);
    }

    if let Some(goal) = stats.goal {
        println!();
        println!("── Reading Goal ──");
        println!(
            "{}/{} books ({}%){}",
            goal.read_this_year,
            goal.goal,
            goal.percent,
            if goal.remaining == 0 {
                " — goal achieved! 🎉".to_string()
            } else {
                format!(" — {} to go, {} days left", goal.remaining, goal.days_left)
            }
        );
    }

    println!();
    println!("── Books per Year ──");
    let year_max = stats.yearly.iter().map(|(_, c)| *c).max().unwrap_or(0);
    for (year, count) in &stats.yearly {
        println!("{} │ {} {}", year, bar(*count, year_max), count);
    }

    if stats.monthly.iter().any(|c| *c > 0) {
        println!();
        println!("── This Year by Month ──");
        let month_max = stats.monthly.iter().copied().max().unwrap_or(0);
        for (i, count) in stats.monthly.iter().enumerate() {
            if *count > 0 {
                println!("{}  │ {} {}", MONTH_LETTERS[i], bar(*count, month_max), count);
            }
        }
    }

    if !stats.top_genres.is_empty() {
        println!();
        println!("── Top Genres (read) ──");
        let genre_max = stats.top_genres[0].count;
        for genre in &stats.top_genres {
            println!(
                "{:<16} {} {}",
                truncate_label(&genre.genre, 16),
                bar(genre.count, genre_max),
                genre.count
            );
        }
    }

    if !stats.top_authors.is_empty() {
        println!();
        println!("── Top Authors (read) ──");
        for (i, author) in stats.top_authors.iter().enumerate() {
            let avg = author
                .average_rating
                .map(|a| format!(" · avg {}", format_average_rating(a)))
                .unwrap_or_default();
            println!(
                "{}. {} — {} book(s){}",
                i + 1,
                author.author,
                author.count,
                avg
            );
        }
    }

    if stats.rating_distribution.iter().any(|c| *c > 0) {
        println!();
        println!("── Ratings ──");
        let rating_max = stats.rating_distribution.iter().copied().max().unwrap_or(0);
        for r in (1..=5usize).rev() {
            let count = stats.rating_distribution[r - 1];
            println!(
                "{:<5} │ {} {}",
                stars(r as u8),
                bar(count, rating_max),
                count
            );
        }
    }

    if !stats.leaderboard.is_empty() {
        println!();
        println!("── Best Rated ──");
        for (i, book) in stats.leaderboard.iter().enumerate() {
            let year = if book.date_read.len() >= 4 {
                format!(" · {}", &book.date_read[..4])
            } else {
                String::new()
            };
            println!(
                "{:>2}. {} — {} {}{}",
                i + 1,
                book.title,
                book.author,
                stars(book.rating),
                year
            );
        }
    }

    if stats.formats.physical + stats.formats.digital + stats.formats.borrowed > 0 {
        println!();
        println!("── Formats ──");
        println!("Physical: {}", stats.formats.physical);
        println!("Digital:  {}", stats.formats.digital);
        println!("Borrowed: {}", stats.formats.borrowed);
    }

    Ok(())
}

fn to_json(stats: &LibraryStats) -> serde_json::Value {
    serde_json::json!({
        "total": stats.total,
        "read": stats.read,
        "reading": stats.reading,
        "want": stats.want,
        "readThisYear": stats.read_this_year,
        "averageRating": stats.average_rating,
        "ratedCount": stats.rated_count,
        "genreCount": stats.genre_count,
        "yearly": stats.yearly.iter().map(|(y, c)| serde_json::json!({"year": y, "count": c})).collect::<Vec<_>>(),
        "monthly": stats.monthly,
        "topGenres": stats.top_genres.iter().map(|g| serde_json::json!({"genre": g.genre, "count": g.count})).collect::<Vec<_>>(),
        "topAuthors": stats.top_authors.iter().map(|a| serde_json::json!({
            "author": a.author,
            "count": a.count,
            "averageRating": a.average_rating,
        })).collect::<Vec<_>>(),
        "ratingDistribution": stats.rating_distribution,
        "leaderboard": stats.leaderboard.iter().map(|b| serde_json::json!({
            "id": b.id,
            "title": b.title,
            "author": b.author,
            "rating": b.rating,
            "dateRead": b.date_read,
        })).collect::<Vec<_>>(),
        "averageDays": stats.average_days,
        "totalPages": stats.total_pages,
        "formats": {
            "physical": stats.formats.physical,
            "digital": stats.formats.digital,
            "borrowed": stats.formats.borrowed,
        },
        "goal": stats.goal.map(|g| serde_json::json!({
            "goal": g.goal,
            "readThisYear": g.read_this_year,
            "percent": g.percent,
            "remaining": g.remaining,
            "daysLeft": g.days_left,
        })),
    })
}

/// Proportional bar, minimum one block for non-zero counts
fn bar(count: usize, max: usize) -> String {
    if count == 0 || max == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH / max).max(1);
    "█".repeat(width)
}

fn truncate_label(text: &str, max: usize) -> String {
    crate::output::truncate(text, max)
}
