//! Request and response types for profile operations.

use hireflow_store::{Certification, Education, Language, Profile, Project, Skill};
use serde::{Deserialize, Serialize};

use crate::completeness::Completeness;

/// Partial update of the contact details.
///
/// Absent fields are left unchanged; an empty string clears a field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct BasicsPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

/// Partial update of a profile.
///
/// Lists given here replace the stored lists wholesale. Roles are edited
/// through their own operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    /// Contact details.
    #[serde(default)]
    pub basics: Option<BasicsPatch>,
    /// Professional summary; empty clears it.
    #[serde(default)]
    pub summary: Option<String>,
    /// Skills.
    #[serde(default)]
    pub skills: Option<Vec<Skill>>,
    /// Education history.
    #[serde(default)]
    pub education: Option<Vec<Education>>,
    /// Projects.
    #[serde(default)]
    pub projects: Option<Vec<Project>>,
    /// Certifications.
    #[serde(default)]
    pub certifications: Option<Vec<Certification>>,
    /// Spoken languages.
    #[serde(default)]
    pub languages: Option<Vec<Language>>,
}

/// A new work-history entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleInput {
    /// Job title.
    pub title: String,
    /// Employer.
    pub company: String,
    /// Work location.
    #[serde(default)]
    pub location: Option<String>,
    /// Start date.
    #[serde(default)]
    pub start_date: Option<String>,
    /// End date; ignored for a current role.
    #[serde(default)]
    pub end_date: Option<String>,
    /// Whether this is the current position.
    #[serde(default)]
    pub current: bool,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Bullet-point achievements.
    #[serde(default)]
    pub highlights: Vec<String>,
}

/// Partial update of a role. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct RolePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub highlights: Option<Vec<String>>,
}

/// A profile together with its completeness.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    /// The profile.
    #[serde(flatten)]
    pub profile: Profile,
    /// Its completeness.
    pub completeness: Completeness,
}
