//! Goal and card extraction.
//!
//! The site renders event rows as loose adjacent text nodes ("Korhonen"
//! followed by "67'") instead of labelled elements, so this module walks
//! child and following-sibling text nodes. That traversal is the most
//! markup-sensitive part of the whole extractor and is kept behind the
//! single `extract_events` entry point so it can be tested and replaced
//! on its own.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::types::{EventKind, MatchEvent, TeamSide};

fn side_selector(side: TeamSide) -> Selector {
    let css = match side {
        TeamSide::Home => ".spl-match-events .events-home",
        TeamSide::Away => ".spl-match-events .events-away",
    };
    Selector::parse(css).expect("static selector")
}

fn kind_selectors() -> [(EventKind, Selector); 3] {
    [
        (EventKind::Goal, Selector::parse(".goal, .maali").expect("static selector")),
        (
            EventKind::YellowCard,
            Selector::parse(".yellow-card, .varoitus").expect("static selector"),
        ),
        (
            EventKind::RedCard,
            Selector::parse(".red-card, .poisto").expect("static selector"),
        ),
    ]
}

/// Collect the text nodes around an event row: its own children first, then
/// following siblings of the row itself. Stops after a handful of nodes so a
/// run of malformed markup cannot swallow the rest of the page.
fn nearby_text(row: ElementRef<'_>) -> Vec<String> {
    let mut pieces = Vec::new();

    for child in row.children() {
        if let Some(text) = child.value().as_text() {
            let t = text.trim();
            if !t.is_empty() {
                pieces.push(t.to_string());
            }
        } else if let Some(el) = ElementRef::wrap(child) {
            let t = el.text().collect::<String>().trim().to_string();
            if !t.is_empty() {
                pieces.push(t);
            }
        }
    }

    let mut walked = 0;
    for sibling in row.next_siblings() {
        if pieces.len() >= 2 || walked >= 4 {
            break;
        }
        walked += 1;
        if let Some(text) = sibling.value().as_text() {
            let t = text.trim();
            if !t.is_empty() {
                pieces.push(t.to_string());
            }
        }
    }

    pieces
}

fn parse_event(row: ElementRef<'_>, kind: EventKind) -> Option<MatchEvent> {
    let minute_re = Regex::new(r"(\d{1,3})\s*['’′]").expect("static regex");
    let pieces = nearby_text(row);

    let mut player: Option<String> = None;
    let mut minute: Option<u32> = None;

    for piece in &pieces {
        if let Some(cap) = minute_re.captures(piece) {
            if minute.is_none() {
                minute = cap[1].parse::<u32>().ok();
            }
            // A piece can be "Korhonen 67'"; strip the minute off the name.
            let name = minute_re.replace(piece, "").trim().to_string();
            if player.is_none() && !name.is_empty() {
                player = Some(name);
            }
        } else if player.is_none() {
            player = Some(piece.clone());
        }
    }

    player.map(|player| MatchEvent { kind, player, minute })
}

/// Extract all goal/card events for one side. Tolerates absent containers,
/// rows without minutes and rows without names; never panics on markup.
pub fn extract_events(document: &Html, side: TeamSide) -> Vec<MatchEvent> {
    let container_sel = side_selector(side);
    let Some(container) = document.select(&container_sel).next() else {
        return Vec::new();
    };

    let mut events = Vec::new();
    for (kind, selector) in kind_selectors() {
        for row in container.select(&selector) {
            if let Some(event) = parse_event(row, kind) {
                events.push(event);
            }
        }
    }
    events
}
