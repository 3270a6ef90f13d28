use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle status assigned to one fetch + extract attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    NotStarted,
    Live,
    Finished,
    /// Finished per status text, but team names could not be extracted.
    FinishedPartial,
    /// Some fields extracted but no conclusive status marker.
    PartialData,
    /// Page rendered but nothing usable could be extracted.
    ParsingFailed,
    /// The fetcher never produced markup for this identifier.
    PageLoadFailed,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStatus::NotStarted => "not_started",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
            MatchStatus::FinishedPartial => "finished_partial",
            MatchStatus::PartialData => "partial_data",
            MatchStatus::ParsingFailed => "parsing_failed",
            MatchStatus::PageLoadFailed => "page_load_failed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

/// Statistic values are usually integers but the site also emits things
/// like "58%" or "12 (4)", which we keep verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Number(i64),
    Text(String),
}

impl StatValue {
    pub fn parse(raw: &str) -> StatValue {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => StatValue::Number(n),
            Err(_) => StatValue::Text(trimmed.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatPair {
    pub home: StatValue,
    pub away: StatValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamSide {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Goal,
    YellowCard,
    RedCard,
}

/// A goal or card, attributed to one side of the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub kind: EventKind,
    pub player: String,
    pub minute: Option<u32>,
}

/// One crawled match, keyed by the site's stable integer identifier.
///
/// Every field other than `match_id` is best-effort: a failed fetch still
/// produces a record (status `PageLoadFailed`), and a re-fetch of the same
/// identifier replaces the prior record rather than duplicating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: u32,
    pub status: MatchStatus,
    pub team_home: Option<String>,
    pub team_away: Option<String>,
    pub score: Option<Score>,
    pub half_time_score: Option<Score>,
    pub kickoff_date: Option<NaiveDate>,
    pub kickoff_time: Option<NaiveTime>,
    /// The raw "HH:MM | la 24.5." blob as rendered, kept for re-parsing.
    pub match_datetime_raw: Option<String>,
    pub venue: Option<String>,
    pub weather: Option<String>,
    pub attendance: Option<u32>,
    #[serde(default)]
    pub stats: BTreeMap<String, StatPair>,
    #[serde(default)]
    pub home_events: Vec<MatchEvent>,
    #[serde(default)]
    pub away_events: Vec<MatchEvent>,
    pub man_of_the_match: Option<String>,
    /// Identifier the page reports about itself. A mismatch with `match_id`
    /// is recorded in `notes`, never used for classification.
    pub match_id_from_page: Option<u32>,
    pub fetched_at: DateTime<Utc>,
    pub url: String,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl MatchRecord {
    /// Empty record for a failed fetch. The failure kind goes into `notes`
    /// so the audit trail survives checkpointing.
    pub fn load_failed(match_id: u32, url: String, failure: String) -> Self {
        Self {
            match_id,
            status: MatchStatus::PageLoadFailed,
            team_home: None,
            team_away: None,
            score: None,
            half_time_score: None,
            kickoff_date: None,
            kickoff_time: None,
            match_datetime_raw: None,
            venue: None,
            weather: None,
            attendance: None,
            stats: BTreeMap::new(),
            home_events: Vec::new(),
            away_events: Vec::new(),
            man_of_the_match: None,
            match_id_from_page: None,
            fetched_at: Utc::now(),
            url,
            notes: vec![failure],
        }
    }
}

/// Ephemeral per-attempt bundle produced by the extractor. Folded into a
/// `MatchRecord` by the orchestrator and never persisted on its own.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFields {
    pub team_home: Option<String>,
    pub team_away: Option<String>,
    pub score: Option<Score>,
    /// Raw score text. An unparseable score string is still a
    /// classification signal even when the numbers are unusable.
    pub score_raw: Option<String>,
    pub half_time_score: Option<Score>,
    pub status_text: Option<String>,
    pub kickoff_date: Option<NaiveDate>,
    pub kickoff_time: Option<NaiveTime>,
    pub match_datetime_raw: Option<String>,
    pub venue: Option<String>,
    pub weather: Option<String>,
    pub attendance: Option<u32>,
    pub stats: BTreeMap<String, StatPair>,
    pub home_events: Vec<MatchEvent>,
    pub away_events: Vec<MatchEvent>,
    pub man_of_the_match: Option<String>,
    pub match_id_from_page: Option<u32>,
    pub page_title: Option<String>,
    pub notes: Vec<String>,
}

impl ExtractedFields {
    pub fn teams_present(&self) -> bool {
        self.team_home.is_some() && self.team_away.is_some()
    }

    /// True when the datetime blob carried an HH:MM token.
    pub fn has_time_token(&self) -> bool {
        self.kickoff_time.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_value_parse() {
        assert_eq!(StatValue::parse("7"), StatValue::Number(7));
        assert_eq!(StatValue::parse(" -1 "), StatValue::Number(-1));
        assert_eq!(StatValue::parse("58%"), StatValue::Text("58%".to_string()));
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let record = MatchRecord::load_failed(
            3748452,
            "https://tulospalvelu.palloliitto.fi/match/3748452/stats".to_string(),
            "fetch_failed: navigation timeout".to_string(),
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: MatchRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.status, MatchStatus::PageLoadFailed);
    }
}
