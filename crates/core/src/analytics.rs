//! Pure statistics over a session's stats row and its scan event log.
//!
//! `compute` is deterministic and side-effect free: ordering, guarded
//! division, and rounding all happen here so callers can treat the report as
//! a value. Quartiles use Tukey's median-of-halves: Q1/Q3 are the medians of
//! the lower/upper halves of the sorted sample, with the middle element
//! excluded from both halves on odd counts.

use serde::{Deserialize, Serialize};

use crate::model::{CachedAnalytics, Quartiles, ScanEvent, SessionId, SessionStats, SessionStatus};

//
// ─── COUNTDOWN QUARTER ────────────────────────────────────────────────────────
//

/// One quarter of the countdown duration (not of the data).
///
/// The fourth quarter also absorbs scans that arrive after the countdown has
/// run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountdownQuarter {
    #[serde(rename = "Q1")]
    First,
    #[serde(rename = "Q2")]
    Second,
    #[serde(rename = "Q3")]
    Third,
    #[serde(rename = "Q4")]
    Fourth,
}

impl CountdownQuarter {
    /// Stable label used in storage and display ("Q1".."Q4").
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CountdownQuarter::First => "Q1",
            CountdownQuarter::Second => "Q2",
            CountdownQuarter::Third => "Q3",
            CountdownQuarter::Fourth => "Q4",
        }
    }

    /// Parses the storage label.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Q1" => Some(Self::First),
            "Q2" => Some(Self::Second),
            "Q3" => Some(Self::Third),
            "Q4" => Some(Self::Fourth),
            _ => None,
        }
    }

    fn from_index(index: usize) -> Self {
        match index {
            0 => Self::First,
            1 => Self::Second,
            2 => Self::Third,
            _ => Self::Fourth,
        }
    }
}

impl std::fmt::Display for CountdownQuarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ─── STATISTICS REPORT ────────────────────────────────────────────────────────
//

/// Full statistics for one session.
///
/// Time fields are in minutes rounded to two decimals, rates in percent
/// rounded to one decimal. Time fields are `None` only when the sample they
/// describe is empty (or in the explicit no-data report for a session with
/// zero starting teams).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub session_id: SessionId,
    pub sequence_number: i64,
    pub status: SessionStatus,
    pub countdown_duration_seconds: u32,
    pub starting_team_count: u32,
    pub finishing_team_count: u32,
    pub total_scans: u32,
    pub completion_rate: f64,
    pub participation_rate: f64,
    pub early_completion_rate: f64,
    pub late_completion_rate: f64,
    pub average_completion_minutes: Option<f64>,
    pub median_completion_minutes: Option<f64>,
    pub time_to_first_scan_minutes: Option<f64>,
    pub time_to_last_scan_minutes: Option<f64>,
    pub quartiles_minutes: Option<Quartiles>,
    pub completion_spread_minutes: Option<f64>,
    pub peak_completion_period: Option<CountdownQuarter>,
    /// Seconds-precision analytics for the stats row cache. Not serialized;
    /// the rendered report carries the rounded minute values above.
    #[serde(skip)]
    pub derived: Option<CachedAnalytics>,
}

impl StatisticsReport {
    /// The explicit "no data" report: all counts and rates zero, times null.
    ///
    /// Returned for a session whose stats row exists but records zero
    /// starting teams. A missing stats row is the caller's `NotFound`, never
    /// a zero report.
    #[must_use]
    pub fn no_data(stats: &SessionStats) -> Self {
        Self {
            session_id: stats.session_id().clone(),
            sequence_number: stats.sequence_number(),
            status: stats.status(),
            countdown_duration_seconds: stats.countdown_duration_seconds(),
            starting_team_count: stats.starting_team_count(),
            finishing_team_count: stats.finishing_team_count(),
            total_scans: 0,
            completion_rate: 0.0,
            participation_rate: 0.0,
            early_completion_rate: 0.0,
            late_completion_rate: 0.0,
            average_completion_minutes: None,
            median_completion_minutes: None,
            time_to_first_scan_minutes: None,
            time_to_last_scan_minutes: None,
            quartiles_minutes: None,
            completion_spread_minutes: None,
            peak_completion_period: None,
            derived: None,
        }
    }
}

//
// ─── COMPUTE ──────────────────────────────────────────────────────────────────
//

/// Computes the full statistics report for one session.
///
/// Events may arrive in any order; they are stably sorted by elapsed seconds
/// (ties keep arrival order) before any order-dependent statistic is taken.
#[must_use]
pub fn compute(stats: &SessionStats, events: &[ScanEvent]) -> StatisticsReport {
    let starting = stats.starting_team_count();
    if starting == 0 {
        return StatisticsReport::no_data(stats);
    }

    let mut elapsed: Vec<u32> = events.iter().map(|e| e.elapsed_seconds).collect();
    elapsed.sort();

    let duration = stats.countdown_duration_seconds();
    let total_scans = u32::try_from(elapsed.len()).unwrap_or(u32::MAX);
    let completion_rate = round1(percent(stats.finishing_team_count(), starting));
    let participation_rate = round1(percent(total_scans, starting));

    let mut report = StatisticsReport {
        session_id: stats.session_id().clone(),
        sequence_number: stats.sequence_number(),
        status: stats.status(),
        countdown_duration_seconds: duration,
        starting_team_count: starting,
        finishing_team_count: stats.finishing_team_count(),
        total_scans,
        completion_rate,
        participation_rate,
        early_completion_rate: 0.0,
        late_completion_rate: 0.0,
        average_completion_minutes: Some(0.0),
        median_completion_minutes: None,
        time_to_first_scan_minutes: Some(0.0),
        time_to_last_scan_minutes: Some(0.0),
        quartiles_minutes: None,
        completion_spread_minutes: None,
        peak_completion_period: None,
        derived: None,
    };

    let (Some(&first), Some(&last)) = (elapsed.first(), elapsed.last()) else {
        return report;
    };

    let early_cutoff = f64::from(duration) * 0.5;
    let late_cutoff = f64::from(duration) * 0.75;
    let early = elapsed.iter().filter(|&&e| f64::from(e) <= early_cutoff).count();
    let late = elapsed.iter().filter(|&&e| f64::from(e) >= late_cutoff).count();

    let sum: u64 = elapsed.iter().map(|&e| u64::from(e)).sum();
    #[allow(clippy::cast_precision_loss)]
    let average_seconds = sum as f64 / elapsed.len() as f64;
    let median_seconds = median(&elapsed);
    let quartiles = quartile_boundaries(&elapsed);
    let spread = last - first;
    let peak = peak_quarter(duration, &elapsed);
    #[allow(clippy::cast_precision_loss)]
    let early_completion_rate = round1(early as f64 / elapsed.len() as f64 * 100.0);
    #[allow(clippy::cast_precision_loss)]
    let late_completion_rate = round1(late as f64 / elapsed.len() as f64 * 100.0);

    report.early_completion_rate = early_completion_rate;
    report.late_completion_rate = late_completion_rate;
    report.average_completion_minutes = Some(minutes(average_seconds));
    report.median_completion_minutes = Some(minutes(median_seconds));
    report.time_to_first_scan_minutes = Some(minutes(f64::from(first)));
    report.time_to_last_scan_minutes = Some(minutes(f64::from(last)));
    report.quartiles_minutes = Some(Quartiles {
        q1: minutes(quartiles.q1),
        q2: minutes(quartiles.q2),
        q3: minutes(quartiles.q3),
    });
    report.completion_spread_minutes = Some(minutes(f64::from(spread)));
    report.peak_completion_period = Some(peak);
    report.derived = Some(CachedAnalytics {
        median_completion_seconds: median_seconds,
        quartiles,
        early_completion_rate,
        late_completion_rate,
        participation_rate,
        completion_spread_seconds: spread,
        peak_completion_period: peak,
    });

    report
}

//
// ─── HELPERS ──────────────────────────────────────────────────────────────────
//

fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    f64::from(part) / f64::from(whole) * 100.0
}

/// Seconds to minutes, rounded to two decimals.
fn minutes(seconds: f64) -> f64 {
    round2(seconds / 60.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Standard median of a sorted, non-empty sample.
fn median(sorted: &[u32]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        f64::from(sorted[n / 2])
    } else {
        (f64::from(sorted[n / 2 - 1]) + f64::from(sorted[n / 2])) / 2.0
    }
}

/// Tukey median-of-halves quartiles over a sorted, non-empty sample.
fn quartile_boundaries(sorted: &[u32]) -> Quartiles {
    let n = sorted.len();
    let q2 = median(sorted);
    if n == 1 {
        let only = f64::from(sorted[0]);
        return Quartiles {
            q1: only,
            q2,
            q3: only,
        };
    }

    let half = n / 2;
    Quartiles {
        q1: median(&sorted[..half]),
        q2,
        q3: median(&sorted[n - half..]),
    }
}

/// Which quarter of the countdown duration saw the most scans.
///
/// Overtime scans land in the fourth quarter; ties resolve to the earliest
/// quarter.
fn peak_quarter(duration_seconds: u32, elapsed: &[u32]) -> CountdownQuarter {
    let mut counts = [0_u32; 4];
    for &e in elapsed {
        let index = (u64::from(e) * 4 / u64::from(duration_seconds.max(1))).min(3);
        counts[usize::try_from(index).unwrap_or(3)] += 1;
    }

    let mut best = 0;
    for (index, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = index;
        }
    }
    CountdownQuarter::from_index(best)
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn stats(duration: u32, starting: u32, finishing: u32) -> SessionStats {
        let mut s =
            SessionStats::start(SessionId::new("s1"), duration, starting, 1, fixed_now()).unwrap();
        s.set_finishing_team_count(finishing);
        s
    }

    fn events(elapsed: &[u32]) -> Vec<ScanEvent> {
        elapsed
            .iter()
            .map(|&e| ScanEvent::new(SessionId::new("s1"), e, fixed_now()))
            .collect()
    }

    #[test]
    fn pinned_four_event_scenario() {
        // Events at 10/20/30/40s of a 100s countdown, four of four teams.
        let report = compute(&stats(100, 4, 4), &events(&[10, 20, 30, 40]));

        assert_eq!(report.total_scans, 4);
        assert_eq!(report.completion_rate, 100.0);
        assert_eq!(report.participation_rate, 100.0);
        // 50s is exactly half of the countdown, so all four events are early.
        assert_eq!(report.early_completion_rate, 100.0);
        assert_eq!(report.late_completion_rate, 0.0);
        assert_eq!(report.median_completion_minutes, Some(0.42)); // 25s
        assert_eq!(report.time_to_first_scan_minutes, Some(0.17)); // 10s
        assert_eq!(report.time_to_last_scan_minutes, Some(0.67)); // 40s
        assert_eq!(report.completion_spread_minutes, Some(0.5)); // 30s

        let derived = report.derived.as_ref().unwrap();
        assert_eq!(derived.median_completion_seconds, 25.0);
        assert_eq!(derived.quartiles.q1, 15.0);
        assert_eq!(derived.quartiles.q2, 25.0);
        assert_eq!(derived.quartiles.q3, 35.0);
        assert_eq!(derived.completion_spread_seconds, 30);
    }

    #[test]
    fn quartiles_exclude_middle_element_on_odd_counts() {
        let report = compute(&stats(600, 5, 5), &events(&[10, 20, 30, 40, 50]));
        let derived = report.derived.unwrap();
        assert_eq!(derived.median_completion_seconds, 30.0);
        assert_eq!(derived.quartiles.q1, 15.0);
        assert_eq!(derived.quartiles.q3, 45.0);
    }

    #[test]
    fn single_event_quartiles_collapse() {
        let report = compute(&stats(600, 5, 1), &events(&[120]));
        let derived = report.derived.unwrap();
        assert_eq!(derived.quartiles.q1, 120.0);
        assert_eq!(derived.quartiles.q3, 120.0);
        assert_eq!(derived.completion_spread_seconds, 0);
    }

    #[test]
    fn events_are_sorted_before_order_dependent_statistics() {
        let report = compute(&stats(100, 4, 2), &events(&[40, 10]));
        assert_eq!(report.time_to_first_scan_minutes, Some(0.17));
        assert_eq!(report.time_to_last_scan_minutes, Some(0.67));
    }

    #[test]
    fn late_rate_boundary_is_inclusive() {
        let report = compute(&stats(100, 4, 2), &events(&[75, 10]));
        assert_eq!(report.late_completion_rate, 50.0);
    }

    #[test]
    fn zero_starting_teams_yields_no_data_report() {
        let report = compute(&stats(100, 0, 0), &events(&[10]));
        assert_eq!(report.total_scans, 0);
        assert_eq!(report.completion_rate, 0.0);
        assert_eq!(report.participation_rate, 0.0);
        assert_eq!(report.median_completion_minutes, None);
        assert_eq!(report.time_to_first_scan_minutes, None);
        assert!(report.derived.is_none());
    }

    #[test]
    fn zero_events_with_starting_teams_is_a_valid_zero_report() {
        let report = compute(&stats(100, 6, 0), &[]);
        assert_eq!(report.total_scans, 0);
        assert_eq!(report.completion_rate, 0.0);
        assert_eq!(report.participation_rate, 0.0);
        assert_eq!(report.average_completion_minutes, Some(0.0));
        assert_eq!(report.time_to_first_scan_minutes, Some(0.0));
        assert_eq!(report.median_completion_minutes, None);
        assert!(report.derived.is_none());
    }

    #[test]
    fn peak_quarter_ties_resolve_to_the_earliest() {
        // Two scans in Q1 (10, 20) and two in Q2 (30, 40) of a 100s countdown.
        let report = compute(&stats(100, 4, 4), &events(&[10, 20, 30, 40]));
        assert_eq!(report.peak_completion_period, Some(CountdownQuarter::First));
    }

    #[test]
    fn overtime_scans_count_toward_the_fourth_quarter() {
        let report = compute(&stats(100, 4, 3), &events(&[130, 150, 10]));
        assert_eq!(
            report.peak_completion_period,
            Some(CountdownQuarter::Fourth)
        );
    }

    #[test]
    fn rates_are_rounded_to_one_decimal() {
        // 1 of 3 teams: 33.333…% → 33.3
        let report = compute(&stats(100, 3, 1), &events(&[10]));
        assert_eq!(report.completion_rate, 33.3);
        assert_eq!(report.participation_rate, 33.3);
    }

    #[test]
    fn quarter_labels_roundtrip() {
        for quarter in [
            CountdownQuarter::First,
            CountdownQuarter::Second,
            CountdownQuarter::Third,
            CountdownQuarter::Fourth,
        ] {
            assert_eq!(CountdownQuarter::parse(quarter.as_str()), Some(quarter));
        }
        assert_eq!(CountdownQuarter::parse("Q5"), None);
    }
}
