//! Statistics aggregation
//!
//! Pure derivation of dashboard and statistics-page numbers from the book
//! set. Everything is recomputed in full on each call; personal libraries
//! are small enough that incremental maintenance would be pure overhead.
//! The reference date is injected so the aggregates are deterministic.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};

use crate::filter::{ownership_counts, OwnershipCounts};
use crate::models::{Book, ReadingStatus, Settings};

/// How many trailing years the yearly histogram covers
pub const YEARLY_WINDOW: i32 = 5;
/// Cap on the genre ranking
pub const TOP_GENRES: usize = 6;
/// Cap on the author ranking
pub const TOP_AUTHORS: usize = 5;
/// Cap on the best-rated leaderboard
pub const LEADERBOARD_SIZE: usize = 10;

/// One ranked genre
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreStat {
    pub genre: String,
    pub count: usize,
}

/// One ranked author
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorStat {
    pub author: String,
    pub count: usize,
    /// Mean rating over this author's rated books; None when none are rated
    pub average_rating: Option<f64>,
}

/// Progress toward the annual reading goal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalProgress {
    pub goal: u32,
    pub read_this_year: usize,
    /// Rounded percent, clamped to 0..=100
    pub percent: u8,
    pub remaining: u32,
    /// Days from the reference date to Dec 31 of the goal year
    pub days_left: i64,
}

/// Everything the dashboard and statistics pages show
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryStats {
    pub total: usize,
    pub read: usize,
    pub reading: usize,
    pub want: usize,
    pub read_this_year: usize,
    /// Mean rating over rated (non-zero) read books
    pub average_rating: Option<f64>,
    /// How many read books carry a rating
    pub rated_count: usize,
    /// Distinct non-empty genres among read books
    pub genre_count: usize,
    /// Exactly [`YEARLY_WINDOW`] buckets ending at the reference year,
    /// zero-filled for years with no finished books
    pub yearly: Vec<(i32, usize)>,
    /// Reference year only, one bucket per month
    pub monthly: [usize; 12],
    pub top_genres: Vec<GenreStat>,
    pub top_authors: Vec<AuthorStat>,
    /// 1★..5★ buckets over rated read books
    pub rating_distribution: [usize; 5],
    /// Best-rated read books, rating desc, ties by finish date desc
    pub leaderboard: Vec<Book>,
    /// Mean whole days from start to finish; 0 when no book has both dates
    pub average_days: u32,
    /// Pages across all read books
    pub total_pages: u64,
    pub formats: OwnershipCounts,
    /// None when no goal is set
    pub goal: Option<GoalProgress>,
}

/// Compute all aggregates for the given book set
pub fn compute_stats(books: &[Book], settings: &Settings, today: NaiveDate) -> LibraryStats {
    let year = today.year();
    let year_prefix = year.to_string();

    let read_books: Vec<&Book> = books
        .iter()
        .filter(|b| b.status == ReadingStatus::Read)
        .collect();
    let rated: Vec<&&Book> = read_books.iter().filter(|b| b.rating > 0).collect();

    let read_this_year = read_books
        .iter()
        .filter(|b| b.date_read.starts_with(&year_prefix))
        .count();

    let average_rating = if rated.is_empty() {
        None
    } else {
        let sum: u32 = rated.iter().map(|b| b.rating as u32).sum();
        Some(sum as f64 / rated.len() as f64)
    };

    let genre_count = read_books
        .iter()
        .filter(|b| !b.genre.is_empty())
        .map(|b| b.genre.as_str())
        .collect::<HashSet<_>>()
        .len();

    // Yearly histogram: fixed trailing window, zero-filled
    let mut yearly: Vec<(i32, usize)> = (year - (YEARLY_WINDOW - 1)..=year)
        .map(|y| (y, 0))
        .collect();
    for book in &read_books {
        let Some(y) = book.date_read.get(0..4).and_then(|s| s.parse::<i32>().ok()) else {
            continue;
        };
        if let Some(bucket) = yearly.iter_mut().find(|(by, _)| *by == y) {
            bucket.1 += 1;
        }
    }

    // Monthly histogram: reference year only, month from chars 5-6;
    // malformed or out-of-range months are dropped silently
    let mut monthly = [0usize; 12];
    for book in &read_books {
        if !book.date_read.starts_with(&year_prefix) {
            continue;
        }
        let Some(m) = book.date_read.get(5..7).and_then(|s| s.parse::<usize>().ok()) else {
            continue;
        };
        if (1..=12).contains(&m) {
            monthly[m - 1] += 1;
        }
    }

    let top_genres = rank_genres(&read_books);
    let top_authors = rank_authors(&read_books);

    let mut rating_distribution = [0usize; 5];
    for book in &rated {
        rating_distribution[book.rating as usize - 1] += 1;
    }

    let mut leaderboard: Vec<Book> = rated.iter().map(|b| (***b).clone()).collect();
    leaderboard.sort_by(|a, b| {
        b.rating
            .cmp(&a.rating)
            .then_with(|| b.date_read.cmp(&a.date_read))
    });
    leaderboard.truncate(LEADERBOARD_SIZE);

    let average_days = reading_pace(&read_books);
    let total_pages = read_books.iter().map(|b| b.pages as u64).sum();

    let goal = (settings.goal > 0).then(|| {
        let percent = (100.0 * read_this_year as f64 / settings.goal as f64).round() as i64;
        GoalProgress {
            goal: settings.goal,
            read_this_year,
            percent: percent.clamp(0, 100) as u8,
            remaining: settings.goal.saturating_sub(read_this_year as u32),
            days_left: days_until_year_end(settings.goal_year, today),
        }
    });

    LibraryStats {
        total: books.len(),
        read: read_books.len(),
        reading: books
            .iter()
            .filter(|b| b.status == ReadingStatus::Reading)
            .count(),
        want: books
            .iter()
            .filter(|b| b.status == ReadingStatus::Want)
            .count(),
        read_this_year,
        average_rating,
        rated_count: rated.len(),
        genre_count,
        yearly,
        monthly,
        top_genres,
        top_authors,
        rating_distribution,
        leaderboard,
        average_days,
        total_pages,
        formats: ownership_counts(books),
        goal,
    }
}

/// Format a mean rating for display, one decimal, half rounds away from zero
pub fn format_average_rating(average: f64) -> String {
    format!("{:.1}★", (average * 10.0).round() / 10.0)
}

/// Read-book counts per non-empty genre, ties in first-encountered order
fn rank_genres(read_books: &[&Book]) -> Vec<GenreStat> {
    let mut counts: Vec<GenreStat> = Vec::new();
    for book in read_books {
        if book.genre.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|g| g.genre == book.genre) {
            Some(stat) => stat.count += 1,
            None => counts.push(GenreStat {
                genre: book.genre.clone(),
                count: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(TOP_GENRES);
    counts
}

/// Read-book counts per author with per-author mean rating
fn rank_authors(read_books: &[&Book]) -> Vec<AuthorStat> {
    struct Acc {
        author: String,
        count: usize,
        rating_sum: u32,
        rated: usize,
    }

    let mut accs: Vec<Acc> = Vec::new();
    for book in read_books {
        if book.author.is_empty() {
            continue;
        }
        let idx = match accs.iter().position(|a| a.author == book.author) {
            Some(idx) => idx,
            None => {
                accs.push(Acc {
                    author: book.author.clone(),
                    count: 0,
                    rating_sum: 0,
                    rated: 0,
                });
                accs.len() - 1
            }
        };
        accs[idx].count += 1;
        if book.rating > 0 {
            accs[idx].rating_sum += book.rating as u32;
            accs[idx].rated += 1;
        }
    }
    accs.sort_by(|a, b| b.count.cmp(&a.count));
    accs.truncate(TOP_AUTHORS);
    accs.into_iter()
        .map(|a| AuthorStat {
            average_rating: (a.rated > 0).then(|| a.rating_sum as f64 / a.rated as f64),
            author: a.author,
            count: a.count,
        })
        .collect()
}

/// Mean whole days between start and finish dates
///
/// Books with both dates set stay in the denominator even when the span is
/// negative or a date fails to parse; those spans count as zero days.
fn reading_pace(read_books: &[&Book]) -> u32 {
    let with_dates: Vec<&&Book> = read_books
        .iter()
        .filter(|b| !b.date_started.is_empty() && !b.date_read.is_empty())
        .collect();
    if with_dates.is_empty() {
        return 0;
    }
    let total_days: i64 = with_dates
        .iter()
        .map(|b| {
            let started = NaiveDate::parse_from_str(&b.date_started, "%Y-%m-%d");
            let finished = NaiveDate::parse_from_str(&b.date_read, "%Y-%m-%d");
            match (started, finished) {
                (Ok(s), Ok(f)) => (f - s).num_days().max(0),
                _ => 0,
            }
        })
        .sum();
    (total_days as f64 / with_dates.len() as f64).round() as u32
}

/// Days from the reference date to Dec 31 of the goal year
fn days_until_year_end(goal_year: i32, today: NaiveDate) -> i64 {
    match NaiveDate::from_ymd_opt(goal_year, 12, 31) {
        Some(end) => (end - today).num_days(),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn read_book(title: &str, rating: u8, date_read: &str) -> Book {
        let mut b = Book::new(title);
        b.status = ReadingStatus::Read;
        b.rating = rating;
        b.date_read = date_read.to_string();
        b
    }

    #[test]
    fn test_counts_and_average_rating_scenario() {
        // Ratings [5, 5, 3, 0, 4]: average of rated = 4.25, shown as 4.3★
        let books = vec![
            read_book("A", 5, "2024-01-01"),
            read_book("B", 5, "2024-02-01"),
            read_book("C", 3, "2024-03-01"),
            read_book("D", 0, "2024-04-01"),
            read_book("E", 4, "2024-05-01"),
        ];
        let stats = compute_stats(&books, &Settings::default(), today());
        assert_eq!(stats.total, 5);
        assert_eq!(stats.read, 5);
        assert_eq!(stats.rated_count, 4);
        let avg = stats.average_rating.unwrap();
        assert!((avg - 4.25).abs() < 1e-9);
        assert_eq!(format_average_rating(avg), "4.3★");
    }

    #[test]
    fn test_average_rating_none_when_nothing_rated() {
        let books = vec![read_book("A", 0, "2024-01-01")];
        let stats = compute_stats(&books, &Settings::default(), today());
        assert!(stats.average_rating.is_none());
    }

    #[test]
    fn test_yearly_histogram_fixed_window() {
        let books = vec![
            read_book("A", 0, "2024-01-10"),
            read_book("B", 0, "2022-03-10"),
            read_book("C", 0, "2019-03-10"), // outside the window
            read_book("D", 0, ""),           // no finish date
        ];
        let stats = compute_stats(&books, &Settings::default(), today());
        assert_eq!(stats.yearly.len(), 5);
        assert_eq!(
            stats.yearly,
            vec![(2020, 0), (2021, 0), (2022, 1), (2023, 0), (2024, 1)]
        );
    }

    #[test]
    fn test_yearly_histogram_with_zero_books() {
        let stats = compute_stats(&[], &Settings::default(), today());
        assert_eq!(stats.yearly.len(), 5);
        assert!(stats.yearly.iter().all(|(_, c)| *c == 0));
    }

    #[test]
    fn test_monthly_histogram_current_year_only() {
        let books = vec![
            read_book("A", 0, "2024-01-10"),
            read_book("B", 0, "2024-01-20"),
            read_book("C", 0, "2024-12-31"),
            read_book("D", 0, "2023-01-05"), // previous year
            read_book("E", 0, "2024-13-05"), // out-of-range month, dropped
            read_book("F", 0, "2024"),       // malformed, dropped
        ];
        let stats = compute_stats(&books, &Settings::default(), today());
        assert_eq!(stats.monthly[0], 2);
        assert_eq!(stats.monthly[11], 1);
        assert_eq!(stats.monthly.iter().sum::<usize>(), 3);
    }

    #[test]
    fn test_genre_ranking_ties_first_encountered() {
        let mut a = read_book("A", 0, "");
        a.genre = "Fantasy".to_string();
        let mut b = read_book("B", 0, "");
        b.genre = "Sci-Fi".to_string();
        let mut c = read_book("C", 0, "");
        c.genre = "Sci-Fi".to_string();
        let mut d = read_book("D", 0, "");
        d.genre = "Horror".to_string();
        let books = vec![a, b, c, d];

        let stats = compute_stats(&books, &Settings::default(), today());
        assert_eq!(stats.top_genres[0].genre, "Sci-Fi");
        assert_eq!(stats.top_genres[0].count, 2);
        // Fantasy and Horror tie at 1; Fantasy was seen first
        assert_eq!(stats.top_genres[1].genre, "Fantasy");
        assert_eq!(stats.top_genres[2].genre, "Horror");
    }

    #[test]
    fn test_genre_ranking_capped_at_six() {
        let mut books = Vec::new();
        for i in 0..10 {
            let mut b = read_book(&format!("B{}", i), 0, "");
            b.genre = format!("Genre {}", i);
            books.push(b);
        }
        let stats = compute_stats(&books, &Settings::default(), today());
        assert_eq!(stats.top_genres.len(), TOP_GENRES);
    }

    #[test]
    fn test_author_ranking_with_guarded_average() {
        let mut a = read_book("A", 4, "");
        a.set_author("Ursula K. Le Guin");
        let mut b = read_book("B", 5, "");
        b.set_author("Ursula K. Le Guin");
        let mut c = read_book("C", 0, "");
        c.set_author("Unrated Author");
        let books = vec![a, b, c];

        let stats = compute_stats(&books, &Settings::default(), today());
        assert_eq!(stats.top_authors[0].author, "Ursula K. Le Guin");
        assert_eq!(stats.top_authors[0].count, 2);
        assert!((stats.top_authors[0].average_rating.unwrap() - 4.5).abs() < 1e-9);
        // No rated books: average stays None instead of dividing by zero
        assert_eq!(stats.top_authors[1].average_rating, None);
    }

    #[test]
    fn test_rating_distribution() {
        let books = vec![
            read_book("A", 5, ""),
            read_book("B", 5, ""),
            read_book("C", 3, ""),
            read_book("D", 0, ""),
        ];
        let stats = compute_stats(&books, &Settings::default(), today());
        assert_eq!(stats.rating_distribution, [0, 0, 1, 0, 2]);
    }

    #[test]
    fn test_leaderboard_rating_then_date_read() {
        let books = vec![
            read_book("Older 5", 5, "2023-01-01"),
            read_book("Newer 5", 5, "2024-01-01"),
            read_book("Four", 4, "2024-05-01"),
            read_book("Unrated", 0, "2024-06-01"),
        ];
        let stats = compute_stats(&books, &Settings::default(), today());
        let titles: Vec<&str> = stats.leaderboard.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Newer 5", "Older 5", "Four"]);
    }

    #[test]
    fn test_leaderboard_capped_at_ten() {
        let mut books = Vec::new();
        for i in 0..15 {
            books.push(read_book(&format!("B{}", i), 3, "2024-01-01"));
        }
        let stats = compute_stats(&books, &Settings::default(), today());
        assert_eq!(stats.leaderboard.len(), LEADERBOARD_SIZE);
    }

    #[test]
    fn test_reading_pace_negative_span_counts_as_zero() {
        let mut quick = read_book("Quick", 0, "2024-03-11");
        quick.date_started = "2024-03-01".to_string();
        // Finish before start: a data-entry error, kept in the denominator
        let mut backwards = read_book("Backwards", 0, "2024-01-01");
        backwards.date_started = "2024-02-01".to_string();
        let books = vec![quick, backwards];

        let stats = compute_stats(&books, &Settings::default(), today());
        // (10 + 0) / 2 = 5
        assert_eq!(stats.average_days, 5);
    }

    #[test]
    fn test_reading_pace_zero_without_dated_books() {
        let books = vec![read_book("A", 0, "2024-01-01")];
        let stats = compute_stats(&books, &Settings::default(), today());
        assert_eq!(stats.average_days, 0);
    }

    #[test]
    fn test_goal_progress_clamped() {
        let mut settings = Settings::default();
        settings.goal = 2;
        settings.goal_year = 2024;
        let books = vec![
            read_book("A", 0, "2024-01-01"),
            read_book("B", 0, "2024-02-01"),
            read_book("C", 0, "2024-03-01"),
        ];
        let stats = compute_stats(&books, &settings, today());
        let goal = stats.goal.unwrap();
        assert_eq!(goal.percent, 100);
        assert_eq!(goal.remaining, 0);
        // 2024-06-15 to 2024-12-31
        assert_eq!(goal.days_left, 199);
    }

    #[test]
    fn test_goal_absent_when_unset() {
        let stats = compute_stats(&[], &Settings::default(), today());
        assert!(stats.goal.is_none());
    }

    #[test]
    fn test_total_pages_and_formats() {
        let mut a = read_book("A", 0, "");
        a.pages = 300;
        a.own_physical = true;
        let mut b = Book::new("B");
        b.pages = 999; // not read, excluded from the page total
        b.own_digital = true;
        let books = vec![a, b];

        let stats = compute_stats(&books, &Settings::default(), today());
        assert_eq!(stats.total_pages, 300);
        assert_eq!(stats.formats.physical, 1);
        assert_eq!(stats.formats.digital, 1);
    }
}
