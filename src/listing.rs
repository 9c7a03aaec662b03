use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{ApplicationSource, ApplicationStatus, JobApplication};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Date,
    Company,
    Title,
    Updated,
}

#[derive(Debug, Clone)]
pub struct ListQuery {
    pub search: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub source: Option<ApplicationSource>,
    pub sort: SortKey,
    pub descending: bool,
}

impl Default for ListQuery {
    /// Newest application first, no filters.
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            source: None,
            sort: SortKey::Date,
            descending: true,
        }
    }
}

impl ListQuery {
    pub fn matches(&self, app: &JobApplication) -> bool {
        if let Some(status) = self.status {
            if app.status != status {
                return false;
            }
        }
        if let Some(source) = self.source {
            if app.source != source {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                [
                    &app.company_name,
                    &app.job_title,
                    &app.job_description,
                    &app.notes,
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
            }
            _ => true,
        }
    }

    pub fn apply(&self, apps: Vec<JobApplication>) -> Vec<JobApplication> {
        let mut result: Vec<JobApplication> = apps.into_iter().filter(|a| self.matches(a)).collect();
        result.sort_by(|a, b| {
            let ord = compare(self.sort, a, b);
            if self.descending { ord.reverse() } else { ord }
        });
        result
    }
}

fn compare(key: SortKey, a: &JobApplication, b: &JobApplication) -> Ordering {
    match key {
        SortKey::Date => a.application_date.cmp(&b.application_date),
        SortKey::Company => a
            .company_name
            .to_lowercase()
            .cmp(&b.company_name.to_lowercase()),
        SortKey::Title => a.job_title.to_lowercase().cmp(&b.job_title.to_lowercase()),
        SortKey::Updated => a.last_updated.cmp(&b.last_updated),
    }
}
