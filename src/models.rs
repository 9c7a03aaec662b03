use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Applied,
    Interview,
    Offer,
    Rejected,
    Pending,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Interview,
        ApplicationStatus::Offer,
        ApplicationStatus::Rejected,
        ApplicationStatus::Pending,
        ApplicationStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::Interview => "Interview",
            ApplicationStatus::Offer => "Offer",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Withdrawn => "Withdrawn",
        }
    }

    /// Still in the pipeline: not rejected and not withdrawn.
    pub fn is_active(&self) -> bool {
        !matches!(self, ApplicationStatus::Rejected | ApplicationStatus::Withdrawn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApplicationSource {
    LinkedIn,
    Indeed,
    #[serde(rename = "NUWorks")]
    NuWorks,
    #[serde(rename = "Company Website")]
    CompanyWebsite,
    Referral,
    Friend,
    Other,
}

impl ApplicationSource {
    pub const ALL: [ApplicationSource; 7] = [
        ApplicationSource::LinkedIn,
        ApplicationSource::Indeed,
        ApplicationSource::NuWorks,
        ApplicationSource::CompanyWebsite,
        ApplicationSource::Referral,
        ApplicationSource::Friend,
        ApplicationSource::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationSource::LinkedIn => "LinkedIn",
            ApplicationSource::Indeed => "Indeed",
            ApplicationSource::NuWorks => "NUWorks",
            ApplicationSource::CompanyWebsite => "Company Website",
            ApplicationSource::Referral => "Referral",
            ApplicationSource::Friend => "Friend",
            ApplicationSource::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SectionKind {
    Header,
    Summary,
    Experience,
    Education,
    Skills,
    Projects,
    Certifications,
    Custom,
}

impl SectionKind {
    pub const ALL: [SectionKind; 8] = [
        SectionKind::Header,
        SectionKind::Summary,
        SectionKind::Experience,
        SectionKind::Education,
        SectionKind::Skills,
        SectionKind::Projects,
        SectionKind::Certifications,
        SectionKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Header => "HEADER",
            SectionKind::Summary => "SUMMARY",
            SectionKind::Experience => "EXPERIENCE",
            SectionKind::Education => "EDUCATION",
            SectionKind::Skills => "SKILLS",
            SectionKind::Projects => "PROJECTS",
            SectionKind::Certifications => "CERTIFICATIONS",
            SectionKind::Custom => "CUSTOM",
        }
    }
}

/// Error returned when a user-supplied enum name does not match any variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub what: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: '{}'", self.what, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

// Accepts "Company Website", "company-website", "company_website", "companywebsite".
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

macro_rules! name_parsing {
    ($ty:ty, $what:literal) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize(s);
                <$ty>::ALL
                    .iter()
                    .copied()
                    .find(|v| normalize(v.as_str()) == wanted)
                    .ok_or_else(|| UnknownVariant {
                        what: $what,
                        value: s.to_string(),
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// Stored as their display names in text columns.
macro_rules! text_column {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

name_parsing!(ApplicationStatus, "status");
name_parsing!(ApplicationSource, "source");
name_parsing!(SectionKind, "section type");
text_column!(ApplicationStatus);
text_column!(ApplicationSource);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    /// Base64 data URI (`data:<mime>;base64,<payload>`).
    pub data: String,
    pub last_updated: DateTime<Utc>,
}

/// The user-editable part of an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub company_name: String,
    pub job_title: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub application_portal: String,
    pub application_date: NaiveDate,
    pub status: ApplicationStatus,
    pub source: ApplicationSource,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<Document>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: String,
    pub company_name: String,
    pub job_title: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub application_portal: String,
    pub application_date: NaiveDate,
    pub status: ApplicationStatus,
    pub source: ApplicationSource,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<Document>,
    pub last_updated: DateTime<Utc>,
}

impl JobApplication {
    pub fn from_new(id: String, new: NewApplication, last_updated: DateTime<Utc>) -> Self {
        Self {
            id,
            company_name: new.company_name,
            job_title: new.job_title,
            job_description: new.job_description,
            application_portal: new.application_portal,
            application_date: new.application_date,
            status: new.status,
            source: new.source,
            notes: new.notes,
            resume: new.resume,
            cover_letter: new.cover_letter,
            last_updated,
        }
    }

    pub fn document(&self, slot: DocumentSlot) -> Option<&Document> {
        match slot {
            DocumentSlot::Resume => self.resume.as_ref(),
            DocumentSlot::CoverLetter => self.cover_letter.as_ref(),
        }
    }

    pub fn set_document(&mut self, slot: DocumentSlot, doc: Option<Document>) {
        match slot {
            DocumentSlot::Resume => self.resume = doc,
            DocumentSlot::CoverLetter => self.cover_letter = doc,
        }
    }
}

/// Which of an application's two document slots is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DocumentSlot {
    Resume,
    CoverLetter,
}

impl DocumentSlot {
    pub fn label(&self) -> &'static str {
        match self {
            DocumentSlot::Resume => "resume",
            DocumentSlot::CoverLetter => "cover letter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSection {
    pub id: String,
    pub title: String,
    pub content: String,
    pub order: u32,
    #[serde(rename = "type")]
    pub kind: SectionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMasterResume {
    pub name: String,
    pub sections: Vec<ResumeSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterResume {
    pub id: String,
    pub name: String,
    pub sections: Vec<ResumeSection>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeCopy {
    pub id: String,
    pub master_resume_id: String,
    pub name: String,
    pub purpose: String,
    pub sections: Vec<ResumeSection>,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_in_several_spellings() {
        for s in ["Company Website", "company-website", "COMPANY_WEBSITE"] {
            assert_eq!(s.parse::<ApplicationSource>().unwrap(), ApplicationSource::CompanyWebsite);
        }
        assert_eq!("nuworks".parse::<ApplicationSource>().unwrap(), ApplicationSource::NuWorks);
        assert!("monster".parse::<ApplicationSource>().is_err());
    }

    #[test]
    fn parses_status_case_insensitively() {
        assert_eq!("interview".parse::<ApplicationStatus>().unwrap(), ApplicationStatus::Interview);
        let err = "ghosted".parse::<ApplicationStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown status: 'ghosted'");
    }

    #[test]
    fn application_json_uses_record_field_names() {
        let app = JobApplication {
            id: "1704844800000".to_string(),
            company_name: "Acme".to_string(),
            job_title: "Engineer".to_string(),
            job_description: String::new(),
            application_portal: String::new(),
            application_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            status: ApplicationStatus::Applied,
            source: ApplicationSource::CompanyWebsite,
            notes: String::new(),
            resume: None,
            cover_letter: None,
            last_updated: Utc::now(),
        };
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["companyName"], "Acme");
        assert_eq!(json["applicationDate"], "2024-01-10");
        assert_eq!(json["source"], "Company Website");
        assert!(json.get("resume").is_none());
    }

    #[test]
    fn section_kind_parses_from_display_name() {
        assert_eq!("projects".parse::<SectionKind>().unwrap(), SectionKind::Projects);
        assert_eq!(SectionKind::Custom.to_string(), "CUSTOM");
    }

    #[test]
    fn document_kind_from_extension() {
        assert_eq!(DocumentKind::from_extension("PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_extension("docx"), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::from_extension("doc"), None);
    }
}
