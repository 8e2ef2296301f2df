//! Repository ranking.
//!
//! ```text
//! popularity = log10(stars + 1) * 0.40
//!            + log10(forks + 1) * 0.25
//!            + max(0, (365 - days_since_update) / 365) * 0.20
//! activity   = (log10(watchers + 1) * 0.60 + issues_bell_curve(open_issues) * 0.40) * 0.15
//! total      = popularity + activity
//! ```
//!
//! Every function here is total: malformed dates and negative counts still
//! yield a finite score.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::SharedClock;
use crate::config::ScoringWeights;
use crate::models::{Repository, ScoreBreakdown, ScoredRepository, ScoringFactors, ScoringInfo};


pub const ALGORITHM_VERSION: &str = "1.0";
const MS_PER_DAY: f64 = 86_400_000.0;

/// Step function rewarding a moderate number of open issues.
pub fn issues_bell_curve(open_issues: i64) -> f64 {
    if open_issues == 0 {
        0.2
    } else if open_issues <= 5 {
        0.5
    } else if open_issues <= 20 {
        1.0
    } else if open_issues <= 50 {
        0.8
    } else if open_issues <= 100 {
        0.6
    } else if open_issues <= 200 {
        0.4
    } else {
        0.2
    }
}

/// Whole days between `date` and `now`, rounded up, in either direction.
/// An unparseable date is infinitely old.
pub fn days_since(date: &str, now: DateTime<Utc>) -> f64 {
    match parse_timestamp(date) {
        Some(parsed) => {
            let diff_ms = (now - parsed).num_milliseconds().abs();
            (diff_ms as f64 / MS_PER_DAY).ceil()
        }
        None => f64::INFINITY,
    }
}

/// RFC 3339, or a bare date or date-time read as UTC.
fn parse_timestamp(date: &str) -> Option<DateTime<Utc>> {
    let date = date.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `log10(n + 1)`, with negative counts treated as zero.
fn log_count(count: Option<i64>) -> f64 {
    (count.unwrap_or(0).max(0) as f64 + 1.0).log10()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopularityRawValues {
    pub stars: i64,
    pub forks: i64,
    pub days_since_update: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopularityBreakdown {
    pub stars: f64,
    pub forks: f64,
    pub recency: f64,
    pub raw_values: PopularityRawValues,
}

impl PopularityBreakdown {
    pub fn total(&self) -> f64 {
        self.stars + self.forks + self.recency
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRawValues {
    pub watchers: i64,
    pub open_issues: i64,
}

/// Weighted sub-scores before the overall activity weight is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityBreakdown {
    pub watchers: f64,
    pub open_issues: f64,
    pub raw_values: ActivityRawValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub id: Option<u64>,
    pub full_name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedBreakdown {
    pub repository: RepositorySummary,
    pub popularity: PopularityBreakdown,
    pub activity: ActivityBreakdown,
    pub weights: ScoringFactors,
}

#[derive(Debug, Clone)]
pub struct Scorer {
    weights: ScoringWeights,
    clock: SharedClock,
}

impl Scorer {
    pub fn new(weights: ScoringWeights, clock: SharedClock) -> Self {
        Self { weights, clock }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn popularity_breakdown(&self, repository: &Repository) -> PopularityBreakdown {
        let now = self.clock.now();
        let days_since_update = last_updated(repository)
            .map(|date| days_since(date, now))
            .unwrap_or(0.0);

        let stars = log_count(repository.stargazers_count) * self.weights.stars;
        let forks = log_count(repository.forks_count) * self.weights.forks;
        let recency = ((365.0 - days_since_update) / 365.0).max(0.0) * self.weights.recency;

        PopularityBreakdown {
            stars,
            forks,
            recency,
            raw_values: PopularityRawValues {
                stars: repository.stargazers_count.unwrap_or(0),
                forks: repository.forks_count.unwrap_or(0),
                days_since_update,
            },
        }
    }

    pub fn popularity_score(&self, repository: &Repository) -> f64 {
        let breakdown = self.popularity_breakdown(repository);
        let total = breakdown.total();
        debug!(
            "Popularity score for {}: stars={:.3}, forks={:.3}, recency={:.3}, total={:.3}",
            repository.display_name(),
            breakdown.stars,
            breakdown.forks,
            breakdown.recency,
            total
        );
        total
    }

    pub fn activity_breakdown(&self, repository: &Repository) -> ActivityBreakdown {
        let open_issues = repository.open_issues_count.unwrap_or(0);
        ActivityBreakdown {
            watchers: log_count(repository.watchers_count) * self.weights.watchers,
            open_issues: issues_bell_curve(open_issues) * self.weights.open_issues,
            raw_values: ActivityRawValues {
                watchers: repository.watchers_count.unwrap_or(0),
                open_issues,
            },
        }
    }

    pub fn activity_score(&self, repository: &Repository) -> f64 {
        let breakdown = self.activity_breakdown(repository);
        let total = (breakdown.watchers + breakdown.open_issues) * self.weights.activity;
        debug!(
            "Activity score for {}: watchers={:.3}, issues={:.3}, total={:.3}",
            repository.display_name(),
            breakdown.watchers,
            breakdown.open_issues,
            total
        );
        total
    }

    pub fn calculate_score(&self, repository: Repository) -> ScoredRepository {
        let popularity = self.popularity_score(&repository);
        let activity = self.activity_score(&repository);
        let total = popularity + activity;

        ScoredRepository {
            repository,
            popularity_score: total,
            score_breakdown: ScoreBreakdown {
                popularity,
                activity,
                total,
            },
        }
    }

    /// Scores each repository, keeping the order GitHub returned them in.
    /// Absent input scores to an empty list.
    pub fn score_repositories(&self, repositories: Option<Vec<Repository>>) -> Vec<ScoredRepository> {
        let scored: Vec<ScoredRepository> = repositories
            .unwrap_or_default()
            .into_iter()
            .map(|repository| self.calculate_score(repository))
            .collect();

        if !scored.is_empty() {
            info!("Scored {} repositories", scored.len());
        }
        scored
    }

    pub fn detailed_breakdown(&self, repository: &Repository) -> DetailedBreakdown {
        DetailedBreakdown {
            repository: RepositorySummary {
                id: repository.id,
                full_name: repository.full_name.clone(),
                url: repository.html_url.clone(),
            },
            popularity: self.popularity_breakdown(repository),
            activity: self.activity_breakdown(repository),
            weights: self.factors(),
        }
    }

    pub fn factors(&self) -> ScoringFactors {
        ScoringFactors {
            stars: percent(self.weights.stars),
            forks: percent(self.weights.forks),
            recency: percent(self.weights.recency),
            activity: percent(self.weights.activity),
        }
    }

    pub fn scoring_info(&self) -> ScoringInfo {
        ScoringInfo {
            algorithm_version: ALGORITHM_VERSION.to_string(),
            factors: self.factors(),
        }
    }
}

/// `updated_at`, then `pushed_at`; `None` means "just now".
fn last_updated(repository: &Repository) -> Option<&str> {
    repository
        .updated_at
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| repository.pushed_at.as_deref().filter(|s| !s.is_empty()))
}

fn percent(weight: f64) -> String {
    format!("{}%", (weight * 100.0).round() as i64)
}
