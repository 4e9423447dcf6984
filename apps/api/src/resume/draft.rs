//! Resume drafts: the editable snapshot behind the resume builder form.
//!
//! A `ResumeDraft` is compared structurally, never by identity. Pending photo
//! uploads take part in comparisons only through their size and content type.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::models::resume::ResumeRow;

/// Largest photo accepted by the resume builder.
pub const MAX_PHOTO_BYTES: u64 = 4 * 1024 * 1024;

/// Colour applied to drafts that have never chosen one.
pub const DEFAULT_COLOR_HEX: &str = "#000000";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub position: Option<String>,
    pub company: Option<String>,
    /// `YYYY-MM-DD`
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub degree: Option<String>,
    pub school: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// A photo chosen in the form but not yet uploaded.
/// `data` never leaves the process as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    #[serde(skip)]
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Photo {
    /// Already uploaded; nothing to send again.
    Stored { url: String },
    Pending(Attachment),
    /// The user cleared the photo.
    Removed,
}

/// Snapshot of every field in the resume builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeDraft {
    // General info
    pub title: Option<String>,
    pub description: Option<String>,
    // Personal info
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub job_title: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub photo: Option<Photo>,
    pub work_experience: Vec<WorkExperience>,
    pub education: Vec<Education>,
    pub skills: Vec<String>,
    pub summary: Option<String>,
    // Styling
    pub color_hex: Option<String>,
    pub border_style: Option<String>,
}

/// A partial edit. Every `Some` field replaces the draft's value; `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub job_title: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub photo: Option<Photo>,
    pub work_experience: Option<Vec<WorkExperience>>,
    pub education: Option<Vec<Education>>,
    pub skills: Option<Vec<String>>,
    pub summary: Option<String>,
    pub color_hex: Option<String>,
    pub border_style: Option<String>,
}

impl ResumePatch {
    pub fn photo(photo: Photo) -> Self {
        Self {
            photo: Some(photo),
            ..Self::default()
        }
    }
}

fn replace<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn replace_opt<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

impl ResumeDraft {
    /// Empty form as shown for a brand-new resume.
    pub fn empty() -> Self {
        Self {
            color_hex: Some(DEFAULT_COLOR_HEX.to_string()),
            ..Self::default()
        }
    }

    /// Merges a partial edit into the draft. An invalid photo is dropped from
    /// the patch and the rest still applies.
    pub fn apply(&mut self, patch: ResumePatch) {
        let ResumePatch {
            title,
            description,
            first_name,
            last_name,
            job_title,
            city,
            country,
            phone,
            email,
            photo,
            work_experience,
            education,
            skills,
            summary,
            color_hex,
            border_style,
        } = patch;

        replace_opt(&mut self.title, title);
        replace_opt(&mut self.description, description);
        replace_opt(&mut self.first_name, first_name);
        replace_opt(&mut self.last_name, last_name);
        replace_opt(&mut self.job_title, job_title);
        replace_opt(&mut self.city, city);
        replace_opt(&mut self.country, country);
        replace_opt(&mut self.phone, phone);
        replace_opt(&mut self.email, email);
        replace_opt(&mut self.photo, photo.filter(photo_is_acceptable));
        replace(&mut self.work_experience, work_experience);
        replace(&mut self.education, education);
        replace(&mut self.skills, skills);
        replace_opt(&mut self.summary, summary);
        replace_opt(&mut self.color_hex, color_hex);
        replace_opt(&mut self.border_style, border_style);
    }

    /// JSON projection used for change detection. Map equality in `serde_json`
    /// ignores key order; pending photos collapse to `{ size, type }`.
    pub fn fingerprint(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Some(slot) = value.get_mut("photo") {
            *slot = self.photo_fingerprint();
        }
        value
    }

    pub fn photo_fingerprint(&self) -> Value {
        match &self.photo {
            None => Value::Null,
            Some(Photo::Pending(attachment)) => json!({
                "size": attachment.size,
                "type": attachment.content_type,
            }),
            Some(Photo::Stored { url }) => json!({ "url": url }),
            Some(Photo::Removed) => json!("removed"),
        }
    }

    /// Trimmed copy with blank strings turned into `None`, the shape the
    /// persistence layer stores.
    pub fn normalized(&self) -> Self {
        Self {
            title: clean(&self.title),
            description: clean(&self.description),
            first_name: clean(&self.first_name),
            last_name: clean(&self.last_name),
            job_title: clean(&self.job_title),
            city: clean(&self.city),
            country: clean(&self.country),
            phone: clean(&self.phone),
            email: clean(&self.email),
            photo: self.photo.clone(),
            work_experience: self
                .work_experience
                .iter()
                .map(|exp| WorkExperience {
                    position: clean(&exp.position),
                    company: clean(&exp.company),
                    start_date: clean(&exp.start_date),
                    end_date: clean(&exp.end_date),
                    description: clean(&exp.description),
                })
                .collect(),
            education: self
                .education
                .iter()
                .map(|edu| Education {
                    degree: clean(&edu.degree),
                    school: clean(&edu.school),
                    start_date: clean(&edu.start_date),
                    end_date: clean(&edu.end_date),
                })
                .collect(),
            skills: self
                .skills
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            summary: clean(&self.summary),
            color_hex: clean(&self.color_hex),
            border_style: clean(&self.border_style),
        }
    }

    /// Rebuilds the editable form from a stored resume. Malformed JSON columns
    /// fall back to empty values rather than failing the load.
    pub fn from_record(row: &ResumeRow) -> Self {
        let general = &row.general_info;
        let personal = &row.personal_info;

        let work_experience: Vec<WorkExperience> =
            decode_list(&row.work_experiences, "work_experiences", row);
        let education: Vec<Education> = decode_list(&row.education, "education", row);

        let photo_url = row
            .photo_url
            .clone()
            .or_else(|| text_field(personal, "photo"));

        Self {
            title: text_field(general, "title"),
            description: text_field(general, "description"),
            first_name: text_field(personal, "first_name"),
            last_name: text_field(personal, "last_name"),
            job_title: text_field(personal, "job_title"),
            city: text_field(personal, "city"),
            country: text_field(personal, "country"),
            phone: text_field(personal, "phone"),
            email: text_field(personal, "email"),
            photo: photo_url.map(|url| Photo::Stored { url }),
            work_experience: work_experience
                .into_iter()
                .map(|exp| WorkExperience {
                    start_date: exp.start_date.as_deref().map(date_only),
                    end_date: exp.end_date.as_deref().map(date_only),
                    ..exp
                })
                .collect(),
            education: education
                .into_iter()
                .map(|edu| Education {
                    start_date: edu.start_date.as_deref().map(date_only),
                    end_date: edu.end_date.as_deref().map(date_only),
                    ..edu
                })
                .collect(),
            skills: row.skills.clone(),
            summary: Some(row.summary.clone()).filter(|s| !s.is_empty()),
            color_hex: row
                .color
                .clone()
                .or_else(|| Some(DEFAULT_COLOR_HEX.to_string())),
            border_style: row.border.clone(),
        }
    }
}

fn photo_is_acceptable(photo: &Photo) -> bool {
    let Photo::Pending(attachment) = photo else {
        return true;
    };
    if attachment.data.is_empty() {
        warn!("Dropping photo '{}': no image data received", attachment.file_name);
        return false;
    }
    if !attachment.content_type.starts_with("image/") {
        warn!(
            "Dropping photo '{}': content type {} is not an image",
            attachment.file_name, attachment.content_type
        );
        return false;
    }
    if attachment.size > MAX_PHOTO_BYTES {
        warn!(
            "Dropping photo '{}': {} bytes exceeds the {} byte limit",
            attachment.file_name, attachment.size, MAX_PHOTO_BYTES
        );
        return false;
    }
    if attachment.data.len() as u64 != attachment.size {
        warn!(
            "Dropping photo '{}': declared size {} but {} bytes received",
            attachment.file_name,
            attachment.size,
            attachment.data.len()
        );
        return false;
    }
    true
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn decode_list<T: serde::de::DeserializeOwned>(value: &Value, column: &str, row: &ResumeRow) -> Vec<T> {
    match serde_json::from_value(value.clone()) {
        Ok(list) => list,
        Err(e) => {
            warn!("Resume {} has malformed {column}: {e}", row.id);
            Vec::new()
        }
    }
}

/// Drops the time part of an ISO timestamp.
fn date_only(raw: &str) -> String {
    raw.split('T').next().unwrap_or(raw).to_string()
}
