//! Best-effort field extraction from a rendered match page.
//!
//! Every field is tried independently: a structural query first, then a
//! free-text pattern over the page, then absent. No single miss is an error;
//! overall record quality is judged later by the classifier. The selectors
//! here track the live site and are expected to drift; the fallbacks are
//! what keep the crawler useful while they do.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::debug;

use crate::events::extract_events;
use crate::types::{ExtractedFields, StatPair, StatValue, TeamSide};
use crate::utils::{parse_datetime_blob, parse_score, stat_key};

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    document
        .select(&sel(css))
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Label-driven lookup used for venue, weather, attendance and the like.
///
/// Strategy 1: an element whose own text contains the label; the value is
/// whatever follows the label in the parent's combined text.
/// Strategy 2: a table row where one cell is the label and the next cell the
/// value. Mirrors the strategies that survived against the live site.
fn label_value(document: &Html, label_re: &Regex) -> Option<String> {
    // Strategy 1: label and value share a parent.
    for el in document.select(&sel("span, div, dt, th, td, li, p")) {
        let own = element_text(el);
        if own.len() > 120 || !label_re.is_match(&own) {
            continue;
        }
        if let Some(parent) = el.parent().and_then(ElementRef::wrap) {
            let combined = parent.text().collect::<Vec<_>>().join(" ");
            if let Some(m) = label_re.find(&combined) {
                let tail = combined[m.end()..]
                    .trim_start_matches([':', ' ', '\u{a0}'])
                    .trim();
                let value = tail.lines().next().unwrap_or("").trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    // Strategy 2: adjacent table cells.
    for row in document.select(&sel("tr")) {
        let cells: Vec<String> = row.select(&sel("td, th")).map(element_text).collect();
        for pair in cells.windows(2) {
            if label_re.is_match(&pair[0]) && !pair[1].is_empty() {
                return Some(pair[1].clone());
            }
        }
    }

    None
}

fn extract_title(document: &Html) -> Option<String> {
    first_text(document, "title").or_else(|| {
        document
            .select(&sel("meta[property='og:title']"))
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

fn extract_teams(document: &Html, title: Option<&str>) -> (Option<String>, Option<String>) {
    let names: Vec<String> = document
        .select(&sel(".spl-match-header .team-name"))
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    if names.len() >= 2 {
        return (Some(names[0].clone()), Some(names[1].clone()));
    }

    // Fallback: titles read "HJK - TPS | Tulospalvelu".
    if let Some(title) = title {
        let head = title.split('|').next().unwrap_or(title);
        let re = Regex::new(r"^\s*(.{2,40}?)\s+[–-]\s+(.{2,40}?)\s*$").expect("static regex");
        if let Some(cap) = re.captures(head.trim()) {
            return (Some(cap[1].trim().to_string()), Some(cap[2].trim().to_string()));
        }
    }

    debug!("Team names not found");
    (None, None)
}

fn extract_score_raw(document: &Html, page_text: &str) -> Option<String> {
    if let Some(raw) = first_text(document, ".spl-match-score") {
        return Some(raw);
    }
    // Free-text fallback: the site separates goals with an en dash, which
    // keeps this from matching date ranges written with hyphens.
    let re = Regex::new(r"\b(\d{1,2}\s*–\s*\d{1,2})\b").expect("static regex");
    re.find(page_text).map(|m| m.as_str().to_string())
}

fn extract_half_time(document: &Html, page_text: &str) -> Option<String> {
    if let Some(raw) = first_text(document, ".spl-half-time") {
        // Rendered as "(2–0)"; the parens are presentation, not data.
        return Some(raw.trim_matches(['(', ')']).trim().to_string());
    }
    let re = Regex::new(r"\(\s*(\d{1,2}\s*[–-]\s*\d{1,2})\s*\)").expect("static regex");
    re.captures(page_text).map(|cap| cap[1].to_string())
}

const STATUS_MARKERS: [&str; 8] = [
    "päättynyt",
    "ei alkanut",
    "käynnissä",
    "puoliaika",
    "keskeytetty",
    "finished",
    "not started",
    "live",
];

fn extract_status_text(document: &Html, page_text: &str) -> Option<String> {
    if let Some(status) = first_text(document, ".spl-match-status") {
        return Some(status);
    }
    let lower = page_text.to_lowercase();
    STATUS_MARKERS
        .iter()
        .find(|marker| lower.contains(*marker))
        .map(|marker| marker.to_string())
}

fn extract_datetime_raw(document: &Html, page_text: &str) -> Option<String> {
    if let Some(raw) = first_text(document, ".spl-match-datetime") {
        return Some(raw);
    }
    let re = Regex::new(r"\d{1,2}:\d{2}\s*\|\s*[^|\n<]{1,40}").expect("static regex");
    re.find(page_text).map(|m| m.as_str().trim().to_string())
}

fn extract_attendance(document: &Html, page_text: &str) -> Option<u32> {
    let label = Regex::new(r"(?i)yleisö").expect("static regex");
    if let Some(value) = label_value(document, &label) {
        let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(n) = digits.parse::<u32>() {
            return Some(n);
        }
    }
    // Last resort: a number in the label's neighbourhood, bounded to weed
    // out years and scores.
    let re = Regex::new(r"(?i)yleisö\D{0,20}(\d{2,6})").expect("static regex");
    re.captures(page_text)
        .and_then(|cap| cap[1].parse::<u32>().ok())
        .filter(|n| (50..50_000).contains(n))
}

fn extract_stats(document: &Html) -> BTreeMap<String, StatPair> {
    let mut stats = BTreeMap::new();

    // Primary: dedicated stat rows.
    for row in document.select(&sel(".spl-stat-row")) {
        let name = row.select(&sel(".stat-name")).next().map(element_text);
        let home = row.select(&sel(".stat-home")).next().map(element_text);
        let away = row.select(&sel(".stat-away")).next().map(element_text);
        if let (Some(name), Some(home), Some(away)) = (name, home, away) {
            if !name.is_empty() {
                stats.insert(
                    stat_key(&name),
                    StatPair {
                        home: StatValue::parse(&home),
                        away: StatValue::parse(&away),
                    },
                );
            }
        }
    }
    if !stats.is_empty() {
        return stats;
    }

    // Fallback: three-cell table rows laid out home / label / away.
    for row in document.select(&sel("tr")) {
        let cells: Vec<String> = row.select(&sel("td")).map(element_text).collect();
        if cells.len() == 3 && !cells[1].is_empty() && cells[1].parse::<i64>().is_err() {
            stats.insert(
                stat_key(&cells[1]),
                StatPair {
                    home: StatValue::parse(&cells[0]),
                    away: StatValue::parse(&cells[2]),
                },
            );
        }
    }

    stats
}

fn extract_match_id_from_page(document: &Html) -> Option<u32> {
    let re = Regex::new(r"/match/(\d+)").expect("static regex");
    let from_attr = |css: &str, attr: &str| -> Option<u32> {
        document
            .select(&sel(css))
            .next()
            .and_then(|el| el.value().attr(attr))
            .and_then(|v| re.captures(v))
            .and_then(|cap| cap[1].parse::<u32>().ok())
    };
    from_attr("meta[property='og:url']", "content")
        .or_else(|| from_attr("link[rel='canonical']", "href"))
}

/// Extract every field the record model knows about. Never fails: a field
/// that cannot be located is simply absent.
pub fn extract(markup: &str, requested_id: u32) -> ExtractedFields {
    let document = Html::parse_document(markup);
    let page_text = document.root_element().text().collect::<Vec<_>>().join("\n");

    let mut fields = ExtractedFields::default();

    fields.page_title = extract_title(&document);
    let (home, away) = extract_teams(&document, fields.page_title.as_deref());
    fields.team_home = home;
    fields.team_away = away;

    fields.score_raw = extract_score_raw(&document, &page_text);
    fields.score = fields.score_raw.as_deref().and_then(parse_score);
    if fields.score_raw.is_some() && fields.score.is_none() {
        debug!(
            "Score text {:?} did not parse for match {}",
            fields.score_raw, requested_id
        );
    }
    fields.half_time_score = extract_half_time(&document, &page_text)
        .as_deref()
        .and_then(parse_score);

    fields.status_text = extract_status_text(&document, &page_text);

    fields.match_datetime_raw = extract_datetime_raw(&document, &page_text);
    if let Some(raw) = &fields.match_datetime_raw {
        let (date, time) = parse_datetime_blob(raw);
        fields.kickoff_date = date;
        fields.kickoff_time = time;
    }

    fields.venue = label_value(&document, &Regex::new(r"(?i)stadion|paikka").expect("static regex"));
    fields.weather = label_value(&document, &Regex::new(r"(?i)sää").expect("static regex"));
    fields.attendance = extract_attendance(&document, &page_text);
    fields.man_of_the_match =
        label_value(&document, &Regex::new(r"(?i)ottelun paras").expect("static regex"));

    fields.stats = extract_stats(&document);
    fields.home_events = extract_events(&document, TeamSide::Home);
    fields.away_events = extract_events(&document, TeamSide::Away);

    fields.match_id_from_page = extract_match_id_from_page(&document);
    if let Some(page_id) = fields.match_id_from_page {
        if page_id != requested_id {
            fields.notes.push(format!(
                "page reports match id {} but {} was requested",
                page_id, requested_id
            ));
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Score;

    #[test]
    fn test_structural_extraction() {
        let html = r#"<html><head><title>HJK - TPS | Tulospalvelu</title></head><body>
            <div class="spl-match-header">
              <span class="team-name">HJK</span>
              <span class="team-name">TPS</span>
            </div>
            <div class="spl-match-score">2–1</div>
            <div class="spl-half-time">(1–0)</div>
            <div class="spl-match-status">Päättynyt</div>
            <div class="spl-match-datetime">18:30 | la 24.5.2025</div>
        </body></html>"#;
        let fields = extract(html, 42);
        assert_eq!(fields.team_home.as_deref(), Some("HJK"));
        assert_eq!(fields.team_away.as_deref(), Some("TPS"));
        assert_eq!(fields.score, Some(Score { home: 2, away: 1 }));
        assert_eq!(fields.half_time_score, Some(Score { home: 1, away: 0 }));
        assert_eq!(fields.status_text.as_deref(), Some("Päättynyt"));
        assert!(fields.kickoff_time.is_some());
        assert!(fields.kickoff_date.is_some());
    }

    #[test]
    fn test_teams_fall_back_to_title() {
        let html = r#"<html><head><title>FC Lahti - SalPa | Tulospalvelu</title></head>
            <body><p>Ei alkanut</p></body></html>"#;
        let fields = extract(html, 1);
        assert_eq!(fields.team_home.as_deref(), Some("FC Lahti"));
        assert_eq!(fields.team_away.as_deref(), Some("SalPa"));
        assert_eq!(fields.status_text.as_deref(), Some("ei alkanut"));
    }

    #[test]
    fn test_malformed_score_left_absent() {
        let html = r#"<html><body><div class="spl-match-score">2-1-3</div></body></html>"#;
        let fields = extract(html, 1);
        assert_eq!(fields.score_raw.as_deref(), Some("2-1-3"));
        assert_eq!(fields.score, None);
    }

    #[test]
    fn test_attendance_via_label_sibling() {
        let html = r#"<html><body>
            <div><span>Yleisö</span> 1234</div>
        </body></html>"#;
        let fields = extract(html, 1);
        assert_eq!(fields.attendance, Some(1234));

        let html = r#"<html><body>
            <table><tr><td>Yleisö</td><td>2540</td></tr></table>
        </body></html>"#;
        let fields = extract(html, 1);
        assert_eq!(fields.attendance, Some(2540));
    }

    #[test]
    fn test_stats_from_three_cell_rows() {
        let html = r#"<html><body><table>
            <tr><td>7</td><td>Kulmapotkut</td><td>3</td></tr>
            <tr><td>58%</td><td>Pallonhallinta</td><td>42%</td></tr>
        </table></body></html>"#;
        let fields = extract(html, 1);
        assert_eq!(
            fields.stats.get("kulmapotkut"),
            Some(&StatPair {
                home: StatValue::Number(7),
                away: StatValue::Number(3),
            })
        );
        assert_eq!(
            fields.stats.get("pallonhallinta"),
            Some(&StatPair {
                home: StatValue::Text("58%".to_string()),
                away: StatValue::Text("42%".to_string()),
            })
        );
    }

    #[test]
    fn test_id_mismatch_becomes_note() {
        let html = r#"<html><head>
            <meta property="og:url" content="https://tulospalvelu.palloliitto.fi/match/999/stats"/>
        </head><body></body></html>"#;
        let fields = extract(html, 42);
        assert_eq!(fields.match_id_from_page, Some(999));
        assert_eq!(fields.notes.len(), 1);
        assert!(fields.notes[0].contains("999"));
    }

    #[test]
    fn test_empty_page_yields_all_absent_without_panic() {
        let fields = extract("", 1);
        assert!(fields.team_home.is_none());
        assert!(fields.score.is_none());
        assert!(fields.stats.is_empty());
        assert!(fields.home_events.is_empty());
    }
}
