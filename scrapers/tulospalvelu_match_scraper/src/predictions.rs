//! Season-prediction scoring against the crawled data.
//!
//! A prediction file is plain text: a numbered list of teams in predicted
//! final order, and dashed lines naming predicted top scorers with a goal
//! count, e.g. `- Korhonen (12)`. Scoring compares it to the standings and
//! scorer tallies computed from the record set.

use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

use crate::analysis::{compute_standings, top_scorers, TeamStanding};
use crate::types::MatchRecord;
use crate::utils::names_match;

/// Points per team slotted into the correct final position.
const POINTS_PER_POSITION: i32 = 3;
/// Points per actual goal by a predicted scorer.
const POINTS_PER_GOAL: i32 = 2;
/// Bonus for naming the right league winner.
const PROMOTION_BONUS: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictedScorer {
    pub name: String,
    pub goals: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Prediction {
    /// Teams in predicted finishing order, first is the predicted champion.
    pub teams: Vec<String>,
    pub scorers: Vec<PredictedScorer>,
}

/// Parse a prediction file. Lines that match neither pattern are ignored,
/// so the file can carry free-form commentary.
pub fn parse_predictions(text: &str) -> Prediction {
    let team_re = Regex::new(r"(?m)^\s*\d+\.\s+(\S[^\n]*?)\s*$").expect("static regex");
    let scorer_re = Regex::new(r"(?m)^\s*-\s+(.*?)\s+\((\d+)\)\s*$").expect("static regex");

    let teams = team_re
        .captures_iter(text)
        .map(|cap| cap[1].trim().to_string())
        .collect();
    let scorers = scorer_re
        .captures_iter(text)
        .filter_map(|cap| {
            Some(PredictedScorer {
                name: cap[1].trim().to_string(),
                goals: cap[2].parse().ok()?,
            })
        })
        .collect();

    Prediction { teams, scorers }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub total: i32,
    /// One human-readable line per scoring rule that fired.
    pub lines: Vec<String>,
}

fn score_against(
    prediction: &Prediction,
    standings: &[TeamStanding],
    scorers: &[(String, u32)],
) -> ScoreBreakdown {
    let mut total = 0;
    let mut lines = Vec::new();

    for (position, predicted) in prediction.teams.iter().enumerate() {
        let Some(actual) = standings.get(position) else {
            break;
        };
        if names_match(predicted, &actual.team) {
            total += POINTS_PER_POSITION;
            lines.push(format!(
                "{}p: correct position {} ({})",
                POINTS_PER_POSITION,
                position + 1,
                actual.team
            ));
        }
    }

    for predicted in &prediction.scorers {
        let Some((name, goals)) = scorers
            .iter()
            .find(|(name, _)| names_match(&predicted.name, name))
        else {
            debug!("Predicted scorer {} has no goals yet", predicted.name);
            continue;
        };
        let points = POINTS_PER_GOAL * *goals as i32;
        total += points;
        lines.push(format!(
            "{}p: {} scored {} (predicted {})",
            points, name, goals, predicted.goals
        ));
    }

    if let (Some(first), Some(leader)) = (prediction.teams.first(), standings.first()) {
        if names_match(first, &leader.team) {
            total += PROMOTION_BONUS;
            lines.push(format!("{}p: correct promotion ({})", PROMOTION_BONUS, leader.team));
        }
    }

    ScoreBreakdown { total, lines }
}

/// Score a prediction against the current record set.
pub fn score_prediction(
    prediction: &Prediction,
    records: &BTreeMap<u32, MatchRecord>,
) -> ScoreBreakdown {
    let standings = compute_standings(records.values());
    let scorers = top_scorers(records.values());
    score_against(prediction, &standings, &scorers)
}

/// Render the score as a small markdown section, usable standalone or
/// appended to the main report.
pub fn render_score(name: &str, breakdown: &ScoreBreakdown) -> String {
    let mut out = format!("## Prediction: {}\n\n", name);
    out.push_str(&format!("Total: **{} points**\n\n", breakdown.total));
    for line in &breakdown.lines {
        out.push_str(&format!("- {}\n", line));
    }
    if breakdown.lines.is_empty() {
        out.push_str("- no scoring rules matched yet\n");
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
My 2025 prediction

1. Jippo
2. TPS
3. FC Lahti

Top scorers:
- Korhonen, Aleksi (12)
- Nieminen (9)
";

    #[test]
    fn test_parse_teams_and_scorers() {
        let prediction = parse_predictions(SAMPLE);
        assert_eq!(prediction.teams, vec!["Jippo", "TPS", "FC Lahti"]);
        assert_eq!(
            prediction.scorers,
            vec![
                PredictedScorer {
                    name: "Korhonen, Aleksi".to_string(),
                    goals: 12,
                },
                PredictedScorer {
                    name: "Nieminen".to_string(),
                    goals: 9,
                },
            ]
        );
    }

    #[test]
    fn test_parse_ignores_commentary() {
        let prediction = parse_predictions("just some notes\nwithout structure\n");
        assert_eq!(prediction, Prediction::default());
    }

    fn standing(team: &str, points: i32) -> TeamStanding {
        TeamStanding {
            team: team.to_string(),
            played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_for: 0,
            goals_against: 0,
            points,
        }
    }

    #[test]
    fn test_position_points_and_promotion_bonus() {
        let prediction = parse_predictions("1. Jippo\n2. TPS\n3. EIF\n");
        let standings = vec![standing("Jippo", 40), standing("EIF", 35), standing("TPS", 30)];
        let breakdown = score_against(&prediction, &standings, &[]);
        // Position 1 correct (3p) plus promotion bonus (5p); 2 and 3 wrong.
        assert_eq!(breakdown.total, 8);
        assert_eq!(breakdown.lines.len(), 2);
    }

    #[test]
    fn test_scorer_points_use_fuzzy_names() {
        let prediction = parse_predictions("- Kärki, Aleksi (10)\n");
        let scorers = vec![("Aleksi Kärki".to_string(), 4u32)];
        let breakdown = score_against(&prediction, &[], &scorers);
        assert_eq!(breakdown.total, 8); // 2 points per actual goal
        assert!(breakdown.lines[0].contains("Aleksi Kärki"));
    }

    #[test]
    fn test_empty_prediction_scores_zero() {
        let breakdown = score_against(&Prediction::default(), &[], &[]);
        assert_eq!(breakdown.total, 0);
        assert!(breakdown.lines.is_empty());
    }
}
