//! Maps one extraction attempt to a lifecycle status.
//!
//! A pure, priority-ordered rule over the extracted signals; first match
//! wins. `PageLoadFailed` is assigned by the orchestrator when the fetcher
//! never produced markup, so it is not decided here.

use crate::types::{ExtractedFields, MatchStatus};

const FINISHED_MARKERS: [&str; 3] = ["päättynyt", "finished", "lopputulos"];
const NOT_STARTED_MARKERS: [&str; 3] = ["ei alkanut", "not started", "alkamaton"];
const LIVE_MARKERS: [&str; 4] = ["käynnissä", "live", "puoliaika", "keskeytetty"];

/// Titles of genuine result pages name the service; error pages do not.
const RESULT_PAGE_MARKERS: [&str; 3] = ["tulospalvelu", "palloliitto", "ottelu"];
const ERROR_PAGE_MARKERS: [&str; 3] = ["404", "not found", "virhe"];

fn contains_any(text: &str, markers: &[&str]) -> bool {
    let lower = text.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

fn looks_like_result_page(title: &str) -> bool {
    contains_any(title, &RESULT_PAGE_MARKERS) && !contains_any(title, &ERROR_PAGE_MARKERS)
}

pub fn classify(fields: &ExtractedFields) -> MatchStatus {
    let status_text = fields.status_text.as_deref().unwrap_or("");

    if contains_any(status_text, &FINISHED_MARKERS) {
        return if fields.teams_present() {
            MatchStatus::Finished
        } else {
            MatchStatus::FinishedPartial
        };
    }

    if contains_any(status_text, &NOT_STARTED_MARKERS) {
        return MatchStatus::NotStarted;
    }

    // A score rendered without any kickoff time token means the match is in
    // play: the site replaces the scheduled time with the running score.
    let score_without_time = fields.score_raw.is_some() && !fields.has_time_token();
    if contains_any(status_text, &LIVE_MARKERS) || score_without_time {
        return MatchStatus::Live;
    }

    if fields.teams_present() {
        return MatchStatus::PartialData;
    }

    if fields
        .page_title
        .as_deref()
        .map(looks_like_result_page)
        .unwrap_or(false)
    {
        return MatchStatus::PartialData;
    }

    MatchStatus::ParsingFailed
}
