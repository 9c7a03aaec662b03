//! Section editing for master résumés and their copies.
//!
//! Sections are kept sorted by `order`, and `order` is renumbered to 1..=n
//! after every structural change.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Result, TrackerError};
use crate::models::{ResumeSection, SectionKind};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Direction {
    Up,
    Down,
}

/// Starter sections for a new résumé.
pub fn default_sections(mut next_id: impl FnMut() -> String) -> Vec<ResumeSection> {
    let template = [
        (
            "Contact Information",
            "Your Name\nEmail: your.email@example.com\nPhone: (123) 456-7890\nLocation: City, State\nLinkedIn: linkedin.com/in/yourprofile",
            SectionKind::Header,
        ),
        (
            "Professional Summary",
            "Experienced professional with expertise in...",
            SectionKind::Summary,
        ),
        (
            "Work Experience",
            "Company Name | Position | Date - Date\n• Accomplishment 1\n• Accomplishment 2\n• Accomplishment 3",
            SectionKind::Experience,
        ),
        (
            "Education",
            "University Name | Degree | Graduation Date\nRelevant Coursework: Course 1, Course 2",
            SectionKind::Education,
        ),
        (
            "Skills",
            "Technical Skills: Skill 1, Skill 2, Skill 3\nSoft Skills: Skill 1, Skill 2, Skill 3",
            SectionKind::Skills,
        ),
    ];

    template
        .into_iter()
        .enumerate()
        .map(|(i, (title, content, kind))| ResumeSection {
            id: next_id(),
            title: title.to_string(),
            content: content.to_string(),
            order: i as u32 + 1,
            kind,
        })
        .collect()
}

/// Sorts by `order` (stable) and renumbers to 1..=n.
pub fn normalized(mut sections: Vec<ResumeSection>) -> Vec<ResumeSection> {
    sections.sort_by_key(|s| s.order);
    renumber(&mut sections);
    sections
}

fn renumber(sections: &mut [ResumeSection]) {
    for (i, section) in sections.iter_mut().enumerate() {
        section.order = i as u32 + 1;
    }
}

/// Value-clones sections, giving each a fresh id.
pub fn clone_sections(
    sections: &[ResumeSection],
    mut next_id: impl FnMut() -> String,
) -> Vec<ResumeSection> {
    sections
        .iter()
        .map(|s| ResumeSection {
            id: next_id(),
            ..s.clone()
        })
        .collect()
}

pub fn add_section(
    sections: &mut Vec<ResumeSection>,
    id: String,
    title: &str,
    kind: SectionKind,
    content: &str,
) -> Result<()> {
    let title = checked_title(title)?;
    sections.push(ResumeSection {
        id,
        title: title.to_string(),
        content: content.to_string(),
        order: sections.len() as u32 + 1,
        kind,
    });
    Ok(())
}

pub fn remove_section(sections: &mut Vec<ResumeSection>, section_id: &str) -> Result<ResumeSection> {
    let idx = position(sections, section_id)?;
    let removed = sections.remove(idx);
    renumber(sections);
    Ok(removed)
}

/// Swaps with the neighbour. Moving past either end is a no-op.
pub fn move_section(
    sections: &mut [ResumeSection],
    section_id: &str,
    direction: Direction,
) -> Result<()> {
    let idx = position(sections, section_id)?;
    match direction {
        Direction::Up if idx > 0 => sections.swap(idx, idx - 1),
        Direction::Down if idx + 1 < sections.len() => sections.swap(idx, idx + 1),
        _ => {}
    }
    renumber(sections);
    Ok(())
}

pub fn set_title(sections: &mut [ResumeSection], section_id: &str, title: &str) -> Result<()> {
    let title = checked_title(title)?;
    let idx = position(sections, section_id)?;
    sections[idx].title = title.to_string();
    Ok(())
}

pub fn set_content(sections: &mut [ResumeSection], section_id: &str, content: &str) -> Result<()> {
    let idx = position(sections, section_id)?;
    sections[idx].content = content.to_string();
    Ok(())
}

fn checked_title(title: &str) -> Result<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TrackerError::Validation("Section title is required".to_string()));
    }
    Ok(title)
}

fn position(sections: &[ResumeSection], section_id: &str) -> Result<usize> {
    sections
        .iter()
        .position(|s| s.id == section_id)
        .ok_or_else(|| TrackerError::not_found("Section", section_id))
}

/// Plain-text export with markdown-like headers.
pub fn render_text(name: &str, sections: &[ResumeSection]) -> String {
    let mut ordered: Vec<&ResumeSection> = sections.iter().collect();
    ordered.sort_by_key(|s| s.order);

    let mut out = format!("# {}\n\n", name);
    for section in ordered {
        out.push_str(&format!("## {}\n{}\n\n", section.title, section.content));
    }
    out
}

pub fn export_file_name(name: &str) -> String {
    format!("{}.txt", WHITESPACE.replace_all(name, "_"))
}
