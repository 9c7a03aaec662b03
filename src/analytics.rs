use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use crate::models::{ApplicationSource, ApplicationStatus, JobApplication};

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub total: usize,
    /// Every status, zero counts included, in declaration order.
    pub status_counts: Vec<(ApplicationStatus, usize)>,
    pub source_counts: Vec<(ApplicationSource, usize)>,
    /// Chronological, keyed by (year, month).
    pub monthly_counts: BTreeMap<(i32, u32), usize>,
    pub interview_rate: u32,
    pub offer_rate: u32,
    pub apps_per_week: f64,
}

impl Stats {
    /// `None` when there is nothing to aggregate.
    pub fn compute(apps: &[JobApplication]) -> Option<Self> {
        if apps.is_empty() {
            return None;
        }
        let total = apps.len();

        let status_counts: Vec<(ApplicationStatus, usize)> = ApplicationStatus::ALL
            .iter()
            .map(|&status| (status, apps.iter().filter(|a| a.status == status).count()))
            .collect();

        let source_counts = ApplicationSource::ALL
            .iter()
            .map(|&source| (source, apps.iter().filter(|a| a.source == source).count()))
            .collect();

        let mut monthly_counts = BTreeMap::new();
        for app in apps {
            let key = (app.application_date.year(), app.application_date.month());
            *monthly_counts.entry(key).or_insert(0) += 1;
        }

        let count_of = |status: ApplicationStatus| {
            status_counts
                .iter()
                .find(|(s, _)| *s == status)
                .map_or(0, |(_, n)| *n)
        };
        let interviews = count_of(ApplicationStatus::Interview);
        let offers = count_of(ApplicationStatus::Offer);

        let interview_rate = percent(interviews, total);
        let offer_rate = if interviews > 0 { percent(offers, interviews) } else { 0 };

        Some(Stats {
            total,
            status_counts,
            source_counts,
            monthly_counts,
            interview_rate,
            offer_rate,
            apps_per_week: apps_per_week(apps),
        })
    }

    pub fn share_of_total(&self, count: usize) -> u32 {
        percent(count, self.total)
    }
}

fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

/// Total over the weeks spanned by oldest..newest application, at least one week.
fn apps_per_week(apps: &[JobApplication]) -> f64 {
    let dates = apps.iter().map(|a| a.application_date);
    let (Some(oldest), Some(newest)) = (dates.clone().min(), dates.max()) else {
        return 0.0;
    };
    let days = (newest - oldest).num_days();
    let weeks = ((days as f64) / 7.0).ceil().max(1.0);
    (apps.len() as f64 / weeks * 10.0).round() / 10.0
}

pub fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|| format!("{year}-{month:02}"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub total: usize,
    pub active: usize,
    pub interviews: usize,
    pub offers: usize,
    pub rejections: usize,
    pub recent: Vec<JobApplication>,
}

impl Dashboard {
    pub fn compute(apps: &[JobApplication], recent_limit: usize) -> Self {
        let count = |status: ApplicationStatus| apps.iter().filter(|a| a.status == status).count();

        let mut recent = apps.to_vec();
        recent.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        recent.truncate(recent_limit);

        Dashboard {
            total: apps.len(),
            active: apps.iter().filter(|a| a.status.is_active()).count(),
            interviews: count(ApplicationStatus::Interview),
            offers: count(ApplicationStatus::Offer),
            rejections: count(ApplicationStatus::Rejected),
            recent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{acme, test_db};
    use chrono::{Duration, TimeZone, Utc};

    fn app(id: &str, date: (i32, u32, u32), status: ApplicationStatus) -> JobApplication {
        JobApplication {
            id: id.to_string(),
            company_name: format!("Company {id}"),
            job_title: "Engineer".to_string(),
            job_description: String::new(),
            application_portal: String::new(),
            application_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            status,
            source: ApplicationSource::LinkedIn,
            notes: String::new(),
            resume: None,
            cover_letter: None,
            last_updated: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        }
    }

    fn count(stats: &Stats, status: ApplicationStatus) -> usize {
        stats.status_counts.iter().find(|(s, _)| *s == status).unwrap().1
    }

    #[test]
    fn empty_collection_has_no_stats() {
        assert!(Stats::compute(&[]).is_none());
    }

    #[test]
    fn status_counts_sum_to_total() {
        use ApplicationStatus::*;
        let apps = vec![
            app("1", (2024, 1, 1), Applied),
            app("2", (2024, 1, 5), Interview),
            app("3", (2024, 2, 1), Rejected),
            app("4", (2024, 2, 9), Withdrawn),
            app("5", (2024, 2, 10), Interview),
        ];
        let stats = Stats::compute(&apps).unwrap();
        let sum: usize = stats.status_counts.iter().map(|(_, n)| n).sum();
        assert_eq!(sum, stats.total);
        assert_eq!(stats.status_counts.len(), 6);
        assert_eq!(count(&stats, Pending), 0);
        assert_eq!(stats.interview_rate, 40);
        assert!(stats.interview_rate <= 100);
    }

    #[test]
    fn offer_rate_is_zero_without_interviews() {
        let apps = vec![
            app("1", (2024, 1, 1), ApplicationStatus::Offer),
            app("2", (2024, 1, 1), ApplicationStatus::Applied),
        ];
        let stats = Stats::compute(&apps).unwrap();
        assert_eq!(stats.interview_rate, 0);
        assert_eq!(stats.offer_rate, 0);
    }

    #[test]
    fn offer_rate_is_relative_to_interviews() {
        let apps = vec![
            app("1", (2024, 1, 1), ApplicationStatus::Offer),
            app("2", (2024, 1, 1), ApplicationStatus::Interview),
            app("3", (2024, 1, 1), ApplicationStatus::Interview),
            app("4", (2024, 1, 1), ApplicationStatus::Interview),
        ];
        assert_eq!(Stats::compute(&apps).unwrap().offer_rate, 33);
    }

    #[test]
    fn velocity_uses_at_least_one_week() {
        let same_day = vec![
            app("1", (2024, 1, 1), ApplicationStatus::Applied),
            app("2", (2024, 1, 1), ApplicationStatus::Applied),
            app("3", (2024, 1, 1), ApplicationStatus::Applied),
        ];
        assert_eq!(Stats::compute(&same_day).unwrap().apps_per_week, 3.0);

        // 15 days spans three started weeks
        let spread = vec![
            app("1", (2024, 1, 1), ApplicationStatus::Applied),
            app("2", (2024, 1, 8), ApplicationStatus::Applied),
            app("3", (2024, 1, 16), ApplicationStatus::Applied),
            app("4", (2024, 1, 16), ApplicationStatus::Applied),
        ];
        assert_eq!(Stats::compute(&spread).unwrap().apps_per_week, 1.3);
    }

    #[test]
    fn months_are_chronological() {
        let apps = vec![
            app("1", (2024, 2, 1), ApplicationStatus::Applied),
            app("2", (2023, 12, 31), ApplicationStatus::Applied),
            app("3", (2024, 2, 20), ApplicationStatus::Applied),
        ];
        let stats = Stats::compute(&apps).unwrap();
        let labels: Vec<(String, usize)> = stats
            .monthly_counts
            .iter()
            .map(|(&(y, m), &n)| (month_label(y, m), n))
            .collect();
        assert_eq!(
            labels,
            vec![("December 2023".to_string(), 1), ("February 2024".to_string(), 2)]
        );
    }

    #[test]
    fn dashboard_counts_active_and_recent() {
        let mut apps = vec![
            app("1", (2024, 1, 1), ApplicationStatus::Applied),
            app("2", (2024, 1, 2), ApplicationStatus::Rejected),
            app("3", (2024, 1, 3), ApplicationStatus::Withdrawn),
            app("4", (2024, 1, 4), ApplicationStatus::Offer),
        ];
        apps[0].last_updated += Duration::days(3);
        apps[3].last_updated += Duration::days(1);

        let dash = Dashboard::compute(&apps, 3);
        assert_eq!((dash.total, dash.active, dash.offers, dash.rejections), (4, 2, 1, 1));
        let recent: Vec<&str> = dash.recent.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(recent[..2], ["1", "4"]);
        assert_eq!(recent.len(), 3);
    }

    #[test]
    fn status_edit_moves_application_between_buckets() {
        let db = test_db();
        let id = db.add_application(acme()).unwrap();

        let stats = Stats::compute(&db.list_applications().unwrap()).unwrap();
        assert_eq!(count(&stats, ApplicationStatus::Applied), 1);
        assert_eq!(count(&stats, ApplicationStatus::Interview), 0);

        let mut stored = db.get_application(&id).unwrap().unwrap();
        stored.status = ApplicationStatus::Interview;
        db.update_application(&stored).unwrap();

        let stats = Stats::compute(&db.list_applications().unwrap()).unwrap();
        assert_eq!(count(&stats, ApplicationStatus::Applied), 0);
        assert_eq!(count(&stats, ApplicationStatus::Interview), 1);
        assert_eq!(stats.interview_rate, 100);
    }
}
