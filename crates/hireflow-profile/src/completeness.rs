//! Profile completeness scoring.
//!
//! Thirteen equally weighted checks, evaluated in a fixed order. The score
//! is the rounded percentage of checks passed; missing fields are listed in
//! check order.

use hireflow_store::Profile;
use serde::Serialize;

type Check = fn(&Profile) -> bool;

fn filled(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

const CHECKS: [(&str, Check); 13] = [
    ("basics.email", |p: &Profile| filled(p.basics.email.as_ref())),
    ("basics.phone", |p: &Profile| filled(p.basics.phone.as_ref())),
    ("basics.name", |p: &Profile| filled(p.basics.name.as_ref())),
    ("basics.location", |p: &Profile| filled(p.basics.location.as_ref())),
    ("basics.linkedin", |p: &Profile| filled(p.basics.linkedin.as_ref())),
    ("basics.github_or_website", |p: &Profile| {
        filled(p.basics.github.as_ref()) || filled(p.basics.website.as_ref())
    }),
    ("summary", |p: &Profile| filled(p.summary.as_ref())),
    ("roles", |p: &Profile| !p.roles.is_empty()),
    ("skills", |p: &Profile| !p.skills.is_empty()),
    ("education", |p: &Profile| !p.education.is_empty()),
    ("projects", |p: &Profile| !p.projects.is_empty()),
    ("certifications", |p: &Profile| !p.certifications.is_empty()),
    ("languages", |p: &Profile| !p.languages.is_empty()),
];

/// Completeness of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completeness {
    /// Percentage of checks passed, 0 to 100.
    pub score: u8,
    /// Names of failed checks, in check order.
    pub missing: Vec<&'static str>,
}

/// Score `profile`.
#[must_use]
pub fn calculate(profile: &Profile) -> Completeness {
    let missing: Vec<&'static str> = CHECKS
        .iter()
        .filter(|(_, check)| !check(profile))
        .map(|(name, _)| *name)
        .collect();

    let total = CHECKS.len();
    let completed = total - missing.len();
    // completed <= 13, so the quotient fits in a u8
    let score = u8::try_from((completed * 200 + total) / (total * 2)).unwrap_or(100);

    Completeness { score, missing }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireflow_core::{RoleId, UserId};
    use hireflow_store::{Certification, Education, Language, Project, Role, Skill};

    fn full_profile() -> Profile {
        let mut profile = Profile::empty(UserId::from_bytes([1u8; 32]));
        profile.basics.name = Some("Ada Lovelace".to_string());
        profile.basics.email = Some("ada@example.com".to_string());
        profile.basics.phone = Some("+44 20 0000 0000".to_string());
        profile.basics.location = Some("London".to_string());
        profile.basics.linkedin = Some("https://linkedin.com/in/ada".to_string());
        profile.basics.github = Some("https://github.com/ada".to_string());
        profile.summary = Some("Analyst and programmer.".to_string());
        profile.roles.push(Role {
            role_id: RoleId::generate(),
            title: "Analyst".to_string(),
            company: "Analytical Engines".to_string(),
            location: None,
            start_date: None,
            end_date: None,
            current: true,
            description: None,
            highlights: Vec::new(),
        });
        profile.skills.push(Skill {
            name: "Mathematics".to_string(),
            level: None,
            keywords: Vec::new(),
        });
        profile.education.push(Education {
            institution: "Home".to_string(),
            degree: None,
            field: None,
            start_date: None,
            end_date: None,
        });
        profile.projects.push(Project {
            name: "Note G".to_string(),
            description: None,
            url: None,
            highlights: Vec::new(),
        });
        profile.certifications.push(Certification {
            name: "Royal Society".to_string(),
            issuer: None,
            date: None,
            url: None,
        });
        profile.languages.push(Language {
            language: "English".to_string(),
            fluency: None,
        });
        profile
    }

    #[test]
    fn empty_profile_scores_zero() {
        let result = calculate(&Profile::empty(UserId::from_bytes([1u8; 32])));

        assert_eq!(result.score, 0);
        assert_eq!(result.missing.len(), 13);
        assert_eq!(result.missing[0], "basics.email");
        assert!(result.missing.contains(&"summary"));
        assert!(result.missing.contains(&"roles"));
    }

    #[test]
    fn full_profile_scores_hundred() {
        let result = calculate(&full_profile());

        assert_eq!(result.score, 100);
        assert!(result.missing.is_empty());
    }

    #[test]
    fn github_or_website_either_suffices() {
        let mut profile = full_profile();
        profile.basics.github = None;
        profile.basics.website = Some("https://ada.dev".to_string());
        assert!(calculate(&profile).missing.is_empty());

        profile.basics.website = None;
        assert_eq!(calculate(&profile).missing, vec!["basics.github_or_website"]);
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let mut profile = full_profile();
        profile.summary = Some("   ".to_string());
        profile.basics.phone = Some(String::new());

        let result = calculate(&profile);
        assert_eq!(result.missing, vec!["basics.phone", "summary"]);
        // 11 of 13
        assert_eq!(result.score, 85);
    }

    #[test]
    fn score_rounds_to_nearest() {
        let mut profile = Profile::empty(UserId::from_bytes([1u8; 32]));
        profile.basics.email = Some("a@b.c".to_string());
        // 1 of 13 = 7.69
        assert_eq!(calculate(&profile).score, 8);

        profile.summary = Some("hi".to_string());
        // 2 of 13 = 15.38
        assert_eq!(calculate(&profile).score, 15);
    }

    #[test]
    fn missing_follows_check_order() {
        let mut profile = full_profile();
        profile.languages.clear();
        profile.basics.email = None;
        profile.roles.clear();

        assert_eq!(
            calculate(&profile).missing,
            vec!["basics.email", "roles", "languages"]
        );
    }
}
