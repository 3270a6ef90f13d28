//! Aggregations over the crawled record set: league standings, monthly
//! attendance and scoring trends, top scorers and the markdown report that
//! ties them together. Only fully finished matches with a parsed score
//! participate; partial and failed records are counted but never scored.

use chrono::{Datelike, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use crate::types::{EventKind, MatchRecord, MatchStatus};
use crate::utils::names_match;

/// League-rule point deductions, applied by team name. PK-35 entered the
/// 2025 season two points down per the License Committee decision.
const POINT_DEDUCTIONS: &[(&str, i32)] = &[("PK-35", 2)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamStanding {
    pub team: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub points: i32,
}

impl TeamStanding {
    fn new(team: String) -> Self {
        Self {
            team,
            played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
        }
    }

    pub fn goal_difference(&self) -> i32 {
        self.goals_for - self.goals_against
    }
}

fn is_scoreable(record: &MatchRecord) -> bool {
    record.status == MatchStatus::Finished
        && record.team_home.is_some()
        && record.team_away.is_some()
        && record.score.is_some()
}

/// Build the league table from finished matches: 3 points for a win, 1 for
/// a draw, configured deductions applied last. Sorted by points, then goal
/// difference, then goals scored; name breaks the final tie so the order is
/// stable.
pub fn compute_standings<'a, I>(records: I) -> Vec<TeamStanding>
where
    I: IntoIterator<Item = &'a MatchRecord>,
{
    let mut table: BTreeMap<String, TeamStanding> = BTreeMap::new();

    for record in records.into_iter().filter(|r| is_scoreable(r)) {
        let home = record.team_home.clone().unwrap_or_default();
        let away = record.team_away.clone().unwrap_or_default();
        let score = match record.score {
            Some(s) => s,
            None => continue,
        };

        {
            let entry = table
                .entry(home.clone())
                .or_insert_with(|| TeamStanding::new(home.clone()));
            entry.played += 1;
            entry.goals_for += score.home as i32;
            entry.goals_against += score.away as i32;
            if score.home > score.away {
                entry.wins += 1;
                entry.points += 3;
            } else if score.home == score.away {
                entry.draws += 1;
                entry.points += 1;
            } else {
                entry.losses += 1;
            }
        }
        {
            let entry = table
                .entry(away.clone())
                .or_insert_with(|| TeamStanding::new(away.clone()));
            entry.played += 1;
            entry.goals_for += score.away as i32;
            entry.goals_against += score.home as i32;
            if score.away > score.home {
                entry.wins += 1;
                entry.points += 3;
            } else if score.home == score.away {
                entry.draws += 1;
                entry.points += 1;
            } else {
                entry.losses += 1;
            }
        }
    }

    let mut standings: Vec<TeamStanding> = table.into_values().collect();
    for standing in &mut standings {
        for (name, deduction) in POINT_DEDUCTIONS {
            if names_match(&standing.team, name) {
                debug!("Applying {}-point deduction to {}", deduction, standing.team);
                standing.points -= deduction;
            }
        }
    }

    standings.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.goal_difference().cmp(&a.goal_difference()))
            .then(b.goals_for.cmp(&a.goals_for))
            .then(a.team.cmp(&b.team))
    });
    standings
}

/// Goal tallies per player, summed over both sides of every finished match.
/// Returned sorted by goals descending; names are kept as extracted.
pub fn top_scorers<'a, I>(records: I) -> Vec<(String, u32)>
where
    I: IntoIterator<Item = &'a MatchRecord>,
{
    let mut tally: BTreeMap<String, u32> = BTreeMap::new();
    for record in records.into_iter().filter(|r| is_scoreable(r)) {
        for event in record.home_events.iter().chain(record.away_events.iter()) {
            if event.kind == EventKind::Goal && !event.player.trim().is_empty() {
                *tally.entry(event.player.clone()).or_insert(0) += 1;
            }
        }
    }
    let mut scorers: Vec<(String, u32)> = tally.into_iter().collect();
    scorers.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    scorers
}

#[derive(Debug, Clone, PartialEq)]
struct MonthlyRow {
    month: String,
    matches: u32,
    attendance_sum: u32,
    attendance_count: u32,
    goals: u32,
}

fn monthly_rows<'a, I>(records: I) -> Vec<MonthlyRow>
where
    I: IntoIterator<Item = &'a MatchRecord>,
{
    let mut months: BTreeMap<String, MonthlyRow> = BTreeMap::new();
    for record in records.into_iter().filter(|r| is_scoreable(r)) {
        let Some(date) = record.kickoff_date else {
            continue;
        };
        let key = format!("{:04}-{:02}", date.year(), date.month());
        let row = months.entry(key.clone()).or_insert_with(|| MonthlyRow {
            month: key,
            matches: 0,
            attendance_sum: 0,
            attendance_count: 0,
            goals: 0,
        });
        row.matches += 1;
        if let Some(attendance) = record.attendance {
            row.attendance_sum += attendance;
            row.attendance_count += 1;
        }
        if let Some(score) = record.score {
            row.goals += score.home + score.away;
        }
    }
    months.into_values().collect()
}

fn fmt_avg(sum: u32, count: u32) -> String {
    if count == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}", sum as f64 / count as f64)
    }
}

/// Render the full markdown report: overview, status breakdown, monthly
/// trends, league table and top scorers.
pub fn build_report(records: &BTreeMap<u32, MatchRecord>) -> String {
    let finished: Vec<&MatchRecord> = records.values().filter(|r| is_scoreable(r)).collect();

    let mut status_counts: BTreeMap<String, u32> = BTreeMap::new();
    for record in records.values() {
        *status_counts.entry(record.status.to_string()).or_insert(0) += 1;
    }

    let total_goals: u32 = finished
        .iter()
        .filter_map(|r| r.score)
        .map(|s| s.home + s.away)
        .sum();
    let attendance_sum: u32 = finished.iter().filter_map(|r| r.attendance).sum();
    let attendance_count = finished.iter().filter(|r| r.attendance.is_some()).count() as u32;

    let mut out = String::new();
    out.push_str("# Match Data Report\n\n");
    out.push_str(&format!(
        "Updated: {}\n\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    out.push_str("## Overview\n\n");
    out.push_str(&format!("- Records crawled: {}\n", records.len()));
    out.push_str(&format!("- Finished matches with scores: {}\n", finished.len()));
    out.push_str(&format!("- Total goals: {}\n", total_goals));
    out.push_str(&format!(
        "- Goals per match: {}\n",
        fmt_avg(total_goals, finished.len() as u32)
    ));
    out.push_str(&format!(
        "- Average attendance: {}\n\n",
        fmt_avg(attendance_sum, attendance_count)
    ));

    out.push_str("## Records by status\n\n");
    out.push_str("| Status | Count |\n|--------|-------|\n");
    for (status, count) in &status_counts {
        out.push_str(&format!("| {} | {} |\n", status, count));
    }
    out.push('\n');

    out.push_str("## By month\n\n");
    out.push_str("| Month | Matches | Avg attendance | Goals/match |\n");
    out.push_str("|-------|---------|----------------|-------------|\n");
    for row in monthly_rows(finished.iter().copied()) {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            row.month,
            row.matches,
            fmt_avg(row.attendance_sum, row.attendance_count),
            fmt_avg(row.goals, row.matches)
        ));
    }
    out.push('\n');

    out.push_str("## League table\n\n");
    out.push_str("| # | Team | P | W | D | L | GF | GA | GD | Pts |\n");
    out.push_str("|---|------|---|---|---|---|----|----|----|-----|\n");
    for (idx, standing) in compute_standings(finished.iter().copied()).iter().enumerate() {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            idx + 1,
            standing.team,
            standing.played,
            standing.wins,
            standing.draws,
            standing.losses,
            standing.goals_for,
            standing.goals_against,
            standing.goal_difference(),
            standing.points
        ));
    }
    out.push('\n');

    let scorers = top_scorers(finished.iter().copied());
    if !scorers.is_empty() {
        out.push_str("## Top scorers\n\n");
        out.push_str("| Player | Goals |\n|--------|-------|\n");
        for (player, goals) in scorers.iter().take(10) {
            out.push_str(&format!("| {} | {} |\n", player, goals));
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchEvent, Score};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn finished(id: u32, home: &str, away: &str, score: (u32, u32)) -> MatchRecord {
        let mut record = MatchRecord::load_failed(id, String::new(), String::new());
        record.notes.clear();
        record.status = MatchStatus::Finished;
        record.team_home = Some(home.to_string());
        record.team_away = Some(away.to_string());
        record.score = Some(Score {
            home: score.0,
            away: score.1,
        });
        record
    }

    #[test]
    fn test_points_three_one_zero() {
        let records = vec![
            finished(1, "Jippo", "SalPa", (2, 0)),
            finished(2, "TPS", "SJK Akatemia", (4, 3)),
            finished(3, "SalPa", "TPS", (1, 1)),
        ];
        let standings = compute_standings(&records);

        let by_name = |name: &str| standings.iter().find(|s| s.team == name).unwrap();
        assert_eq!(by_name("Jippo").points, 3);
        assert_eq!(by_name("TPS").points, 4);
        assert_eq!(by_name("SalPa").points, 1);
        assert_eq!(by_name("SJK Akatemia").points, 0);
    }

    #[test]
    fn test_tiebreak_order_points_gd_gf() {
        let records = vec![
            // Both win once: A 3-0, B 2-0. Same points, A ahead on GD.
            finished(1, "A", "C", (3, 0)),
            finished(2, "B", "C", (2, 0)),
        ];
        let standings = compute_standings(&records);
        assert_eq!(standings[0].team, "A");
        assert_eq!(standings[1].team, "B");
        assert_eq!(standings[2].team, "C");
    }

    #[test]
    fn test_deduction_applied_by_fuzzy_name() {
        let records = vec![finished(1, "PK-35", "EIF", (1, 0))];
        let standings = compute_standings(&records);
        let pk35 = standings.iter().find(|s| s.team == "PK-35").unwrap();
        assert_eq!(pk35.points, 1); // 3 for the win, minus 2
    }

    #[test]
    fn test_partial_records_do_not_score() {
        let mut partial = finished(1, "HJK", "TPS", (2, 1));
        partial.status = MatchStatus::FinishedPartial;
        let mut no_score = finished(2, "HJK", "TPS", (0, 0));
        no_score.score = None;
        let standings = compute_standings(vec![&partial, &no_score]);
        assert!(standings.is_empty());
    }

    #[test]
    fn test_top_scorers_sums_both_sides() {
        let mut record = finished(1, "Jippo", "SalPa", (2, 1));
        record.home_events = vec![
            MatchEvent {
                kind: EventKind::Goal,
                player: "Korhonen".to_string(),
                minute: Some(12),
            },
            MatchEvent {
                kind: EventKind::Goal,
                player: "Korhonen".to_string(),
                minute: Some(70),
            },
            MatchEvent {
                kind: EventKind::YellowCard,
                player: "Korhonen".to_string(),
                minute: Some(80),
            },
        ];
        record.away_events = vec![MatchEvent {
            kind: EventKind::Goal,
            player: "Nieminen".to_string(),
            minute: None,
        }];
        let scorers = top_scorers(vec![&record]);
        assert_eq!(scorers[0], ("Korhonen".to_string(), 2));
        assert_eq!(scorers[1], ("Nieminen".to_string(), 1));
    }

    #[test]
    fn test_report_sections_present() {
        let mut records = BTreeMap::new();
        let mut record = finished(1, "Jippo", "SalPa", (2, 0));
        record.kickoff_date = NaiveDate::from_ymd_opt(2025, 5, 24);
        record.attendance = Some(1200);
        records.insert(1, record);
        records.insert(
            2,
            MatchRecord::load_failed(2, String::new(), "fetch_failed".to_string()),
        );

        let report = build_report(&records);
        assert!(report.contains("## Overview"));
        assert!(report.contains("- Records crawled: 2"));
        assert!(report.contains("| page_load_failed | 1 |"));
        assert!(report.contains("| 2025-05 | 1 | 1200.0 | 2.0 |"));
        assert!(report.contains("| 1 | Jippo |"));
    }

    #[test]
    fn test_report_with_no_records_is_still_valid() {
        let report = build_report(&BTreeMap::new());
        assert!(report.contains("- Records crawled: 0"));
        assert!(report.contains("- Goals per match: n/a"));
    }
}
