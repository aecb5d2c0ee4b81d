//! Job posting domain models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::profile::Role;

/// A job posting as returned by the remote job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Server-assigned, never sent on create.
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    /// Defaulted server-side to the creation date.
    pub posted_date: NaiveDate,
    /// e.g. `"Full-time"`, `"Part-time"`, `"Contract"`.
    pub job_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Identity subject of the posting user, when the server records one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<String>,
}

impl Job {
    /// Whether the given identity may edit or delete this job.
    ///
    /// Owners and admins may. This only gates affordances; the server
    /// enforces the same rule on the mutation itself.
    pub fn editable_by(&self, subject: Option<&str>, role: Option<Role>) -> bool {
        if role == Some(Role::Admin) {
            return true;
        }
        match (self.owner_user_id.as_deref(), subject) {
            (Some(owner), Some(subject)) => owner == subject,
            _ => false,
        }
    }

    /// Case-insensitive match against title, company, and description.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.company.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
    }
}

/// Payload for creating a job. `id` and `posted_date` are server-assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreate {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub job_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Partial update payload; the server replaces the supplied fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(owner: Option<&str>) -> Job {
        Job {
            id: 7,
            title: "Platform Engineer".into(),
            company: "Acme".into(),
            location: "Remote".into(),
            description: "Build things".into(),
            posted_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            job_type: "Full-time".into(),
            url: None,
            owner_user_id: owner.map(String::from),
        }
    }

    #[test]
    fn owner_may_edit() {
        assert!(job(Some("auth0|alice")).editable_by(Some("auth0|alice"), Some(Role::User)));
    }

    #[test]
    fn non_owner_may_not_edit() {
        assert!(!job(Some("auth0|alice")).editable_by(Some("auth0|bob"), Some(Role::User)));
    }

    #[test]
    fn admin_may_edit_any_job() {
        assert!(job(Some("auth0|alice")).editable_by(Some("auth0|bob"), Some(Role::Admin)));
        assert!(job(None).editable_by(None, Some(Role::Admin)));
    }

    #[test]
    fn anonymous_may_not_edit() {
        assert!(!job(Some("auth0|alice")).editable_by(None, None));
    }

    #[test]
    fn ownerless_job_not_editable_by_regular_user() {
        assert!(!job(None).editable_by(Some("auth0|alice"), Some(Role::User)));
    }

    #[test]
    fn search_matches_title_company_description() {
        let j = job(None);
        assert!(j.matches("platform"));
        assert!(j.matches("ACME"));
        assert!(j.matches("build"));
        assert!(!j.matches("haskell"));
    }

    #[test]
    fn update_payload_omits_absent_fields() {
        let payload = JobUpdate {
            title: Some("Senior Platform Engineer".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "title": "Senior Platform Engineer" })
        );
    }
}
