//! Daily differencing and weekly resampling of cumulative case counts.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::config::NegativeDeltaPolicy;
use crate::fips::CountyId;

/// Cumulative confirmed cases for one county, aligned to a shared date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyCaseSeries {
    pub id: CountyId,
    pub name: String,
    pub cumulative: Vec<f64>,
}

/// Day-over-day new cases, aligned to the same date axis as the cumulative
/// series. The first date has no predecessor and therefore no value.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyNewCases {
    pub values: Vec<Option<f64>>,
    /// Negative deltas found in the source (before any clamping).
    pub negative_deltas: usize,
}

impl DailyCaseSeries {
    /// First difference along the date axis.
    pub fn daily_new_cases(&self, policy: NegativeDeltaPolicy) -> DailyNewCases {
        let mut values = Vec::with_capacity(self.cumulative.len());
        let mut negative_deltas = 0;

        if !self.cumulative.is_empty() {
            values.push(None);
        }

        for pair in self.cumulative.windows(2) {
            let delta = pair[1] - pair[0];
            if delta < 0.0 {
                negative_deltas += 1;
            }
            let delta = match policy {
                NegativeDeltaPolicy::Clamp => delta.max(0.0),
                NegativeDeltaPolicy::Keep => delta,
            };
            values.push(Some(delta));
        }

        DailyNewCases {
            values,
            negative_deltas,
        }
    }
}

/// Returns the first date on or after `date` that falls on `week_end`.
pub fn week_ending(date: NaiveDate, week_end: Weekday) -> NaiveDate {
    let today = date.weekday().num_days_from_monday() as i64;
    let target = week_end.num_days_from_monday() as i64;
    date + Duration::days((target - today).rem_euclid(7))
}

/// Weekly bucket layout for one date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekPlan {
    /// Closing date of each bucket, contiguous and increasing by 7 days.
    pub labels: Vec<NaiveDate>,
    /// Bucket index for each raw date, `None` for dropped leading days.
    bucket_of: Vec<Option<usize>>,
}

/// Sums daily values into weeks closed on the right and labelled by their
/// closing date (`week_end`), after skipping `leading_days_dropped` raw days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyResampler {
    pub leading_days_dropped: usize,
    pub week_end: Weekday,
}

impl Default for WeeklyResampler {
    fn default() -> Self {
        Self {
            leading_days_dropped: 5,
            week_end: Weekday::Sun,
        }
    }
}

impl WeeklyResampler {
    /// Lays out weekly buckets for a strictly increasing date axis.
    pub fn plan(&self, dates: &[NaiveDate]) -> WeekPlan {
        let kept = dates.get(self.leading_days_dropped..).unwrap_or(&[]);

        let (Some(first), Some(last)) = (kept.first(), kept.last()) else {
            return WeekPlan {
                labels: Vec::new(),
                bucket_of: vec![None; dates.len()],
            };
        };

        let first_label = week_ending(*first, self.week_end);
        let last_label = week_ending(*last, self.week_end);
        let weeks = ((last_label - first_label).num_days() / 7 + 1) as usize;
        let labels = (0..weeks)
            .map(|w| first_label + Duration::days(7 * w as i64))
            .collect();

        let bucket_of = dates
            .iter()
            .enumerate()
            .map(|(i, date)| {
                (i >= self.leading_days_dropped).then(|| {
                    let label = week_ending(*date, self.week_end);
                    ((label - first_label).num_days() / 7) as usize
                })
            })
            .collect();

        WeekPlan { labels, bucket_of }
    }

    /// Sums `daily` into the buckets of `plan`. Missing values count as zero.
    pub fn resample(&self, plan: &WeekPlan, daily: &DailyNewCases) -> Vec<f64> {
        let mut sums = vec![0.0; plan.labels.len()];
        for (bucket, value) in plan.bucket_of.iter().zip(&daily.values) {
            if let (Some(b), Some(v)) = (bucket, value) {
                sums[*b] += v;
            }
        }
        sums
    }
}
