use chrono::{Datelike, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use std::thread;
use std::time::Duration;
use tracing::info;

use crate::types::Score;

/// Retry `operation` up to `max_attempts` times with a linearly increasing
/// delay (`base_delay`, then 2x, 3x, ...). `is_retryable` decides whether an
/// error is worth another attempt; a non-retryable error is returned at once.
pub fn retry_with_backoff<F, T, E, P>(
    max_attempts: u32,
    base_delay: Duration,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1;
    loop {
        match operation(attempt) {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= max_attempts || !is_retryable(&e) {
                    return Err(e);
                }
                info!("Retry attempt {} after error: {}", attempt, e);
                thread::sleep(base_delay * attempt);
                attempt += 1;
            }
        }
    }
}

/// Parse a rendered score like "2–1" (the site uses an en dash, hand-edited
/// pages sometimes a plain hyphen). Anything that is not exactly two
/// non-negative integers yields None: "2-1-3" is somebody's typo, not a score.
pub fn parse_score(raw: &str) -> Option<Score> {
    let parts: Vec<&str> = raw.split(['–', '-']).map(str::trim).collect();
    if parts.len() != 2 {
        return None;
    }
    let home = parts[0].parse::<u32>().ok()?;
    let away = parts[1].parse::<u32>().ok()?;
    Some(Score { home, away })
}

/// Split a "HH:MM | la 24.5." blob into independently parsed time and date.
///
/// Either half may be missing or malformed on its own; a missing year
/// defaults to the current year. The leading weekday token ("la", "su", ...)
/// is stripped before date parsing.
pub fn parse_datetime_blob(raw: &str) -> (Option<NaiveDate>, Option<NaiveTime>) {
    let Some((time_part, date_part)) = raw.split_once('|') else {
        return (None, None);
    };

    let time = NaiveTime::parse_from_str(time_part.trim(), "%H:%M").ok();

    let weekday_re = Regex::new(r"^[[:alpha:]äöåÄÖÅ]+\s*").expect("static regex");
    let date_str = weekday_re
        .replace(date_part.trim(), "")
        .trim_end_matches('.')
        .to_string();

    let date = NaiveDate::parse_from_str(&date_str, "%d.%m.%Y")
        .ok()
        .or_else(|| {
            let year = Utc::now().year();
            NaiveDate::parse_from_str(&format!("{}.{}", date_str, year), "%d.%m.%Y").ok()
        });

    (date, time)
}

/// Fold the Finnish diacritics the site emits into ASCII.
fn fold_char(c: char) -> char {
    match c {
        'ä' | 'å' | 'á' | 'à' | 'â' => 'a',
        'ö' | 'ó' | 'ò' | 'ô' | 'õ' => 'o',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'ü' | 'ú' | 'ù' => 'u',
        'í' | 'ì' | 'î' => 'i',
        'š' => 's',
        'ž' => 'z',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Normalize a person or team name for comparison: lowercase, diacritics
/// folded, punctuation dropped, and "Last, First" flipped to "first last".
pub fn normalize_name(name: &str) -> String {
    let reordered = match name.split_once(',') {
        Some((last, first)) => format!("{} {}", first.trim(), last.trim()),
        None => name.to_string(),
    };

    let mut words: Vec<String> = reordered
        .to_lowercase()
        .chars()
        .map(fold_char)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    // Word order inside a name is not reliable across sources.
    words.sort();
    words.join(" ")
}

pub fn names_match(a: &str, b: &str) -> bool {
    !a.trim().is_empty() && normalize_name(a) == normalize_name(b)
}

/// Normalize a statistic label into a stable map key, e.g.
/// "Laukaukset maalia kohti" -> "laukaukset_maalia_kohti".
pub fn stat_key(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .map(fold_char)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}
