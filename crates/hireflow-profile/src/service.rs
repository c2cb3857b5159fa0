//! Profile reads and edits.
//!
//! Every operation loads the profile (creating an empty one on first use),
//! applies its change, saves it and returns it scored. Sequences are not
//! transactional; concurrent edits of one profile race and the last write
//! wins.

use std::sync::Arc;

use chrono::Utc;
use hireflow_core::{RoleId, UserId};
use hireflow_store::{Profile, Role, Store};

use crate::completeness;
use crate::error::{ProfileError, Result};
use crate::types::{BasicsPatch, ProfileView, RoleInput, RolePatch, UpdateProfileRequest};

/// Profile operations for the authenticated user.
pub struct ProfileService {
    store: Arc<dyn Store>,
}

/// Empty strings clear a field.
fn normalize(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn apply(target: &mut Option<String>, patch: Option<String>) {
    if let Some(value) = patch {
        *target = normalize(value);
    }
}

fn required(field: &str, value: String) -> Result<String> {
    normalize(value).ok_or_else(|| ProfileError::InvalidInput(format!("{field} must not be empty")))
}

impl ProfileService {
    /// Create a new profile service.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn load(&self, user_id: &UserId) -> Result<Profile> {
        if let Some(profile) = self.store.get_profile(user_id)? {
            return Ok(profile);
        }

        let profile = Profile::empty(*user_id);
        self.store.put_profile(&profile)?;
        tracing::info!(user_id = %user_id, "Created profile");
        Ok(profile)
    }

    fn save(&self, mut profile: Profile) -> Result<ProfileView> {
        profile.updated_at = Utc::now();
        self.store.put_profile(&profile)?;
        Ok(Self::view(profile))
    }

    fn view(profile: Profile) -> ProfileView {
        let completeness = completeness::calculate(&profile);
        ProfileView {
            profile,
            completeness,
        }
    }

    /// Get the user's profile, creating an empty one if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn get_profile(&self, user_id: &UserId) -> Result<ProfileView> {
        Ok(Self::view(self.load(user_id)?))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn update_profile(
        &self,
        user_id: &UserId,
        request: UpdateProfileRequest,
    ) -> Result<ProfileView> {
        let mut profile = self.load(user_id)?;

        if let Some(BasicsPatch {
            name,
            email,
            phone,
            location,
            linkedin,
            github,
            website,
        }) = request.basics
        {
            let basics = &mut profile.basics;
            apply(&mut basics.name, name);
            apply(&mut basics.email, email);
            apply(&mut basics.phone, phone);
            apply(&mut basics.location, location);
            apply(&mut basics.linkedin, linkedin);
            apply(&mut basics.github, github);
            apply(&mut basics.website, website);
        }
        apply(&mut profile.summary, request.summary);
        if let Some(skills) = request.skills {
            profile.skills = skills;
        }
        if let Some(education) = request.education {
            profile.education = education;
        }
        if let Some(projects) = request.projects {
            profile.projects = projects;
        }
        if let Some(certifications) = request.certifications {
            profile.certifications = certifications;
        }
        if let Some(languages) = request.languages {
            profile.languages = languages;
        }

        let view = self.save(profile)?;
        tracing::info!(
            user_id = %user_id,
            score = view.completeness.score,
            "Updated profile"
        );
        Ok(view)
    }

    /// Append a role to the work history.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::InvalidInput` if the title or company is blank.
    pub fn add_role(&self, user_id: &UserId, input: RoleInput) -> Result<(Role, ProfileView)> {
        let role = Role {
            role_id: RoleId::generate(),
            title: required("title", input.title)?,
            company: required("company", input.company)?,
            location: input.location.and_then(normalize),
            start_date: input.start_date.and_then(normalize),
            end_date: if input.current {
                None
            } else {
                input.end_date.and_then(normalize)
            },
            current: input.current,
            description: input.description.and_then(normalize),
            highlights: input.highlights,
        };

        let mut profile = self.load(user_id)?;
        profile.roles.push(role.clone());
        let view = self.save(profile)?;

        tracing::info!(user_id = %user_id, role_id = %role.role_id, "Added role");
        Ok((role, view))
    }

    /// Edit a role.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::RoleNotFound` if the role doesn't exist.
    pub fn update_role(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        patch: RolePatch,
    ) -> Result<(Role, ProfileView)> {
        let mut profile = self.load(user_id)?;
        let role = profile
            .roles
            .iter_mut()
            .find(|r| r.role_id == *role_id)
            .ok_or(ProfileError::RoleNotFound(*role_id))?;

        if let Some(title) = patch.title {
            role.title = required("title", title)?;
        }
        if let Some(company) = patch.company {
            role.company = required("company", company)?;
        }
        apply(&mut role.location, patch.location);
        apply(&mut role.start_date, patch.start_date);
        apply(&mut role.end_date, patch.end_date);
        apply(&mut role.description, patch.description);
        if let Some(current) = patch.current {
            role.current = current;
        }
        if role.current {
            role.end_date = None;
        }
        if let Some(highlights) = patch.highlights {
            role.highlights = highlights;
        }

        let role = role.clone();
        let view = self.save(profile)?;

        tracing::info!(user_id = %user_id, role_id = %role_id, "Updated role");
        Ok((role, view))
    }

    /// Remove a role.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::RoleNotFound` if the role doesn't exist.
    pub fn delete_role(&self, user_id: &UserId, role_id: &RoleId) -> Result<ProfileView> {
        let mut profile = self.load(user_id)?;
        let before = profile.roles.len();
        profile.roles.retain(|r| r.role_id != *role_id);
        if profile.roles.len() == before {
            return Err(ProfileError::RoleNotFound(*role_id));
        }

        let view = self.save(profile)?;
        tracing::info!(user_id = %user_id, role_id = %role_id, "Deleted role");
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireflow_store::{RocksStore, Skill};
    use tempfile::TempDir;

    fn setup() -> (ProfileService, Arc<RocksStore>, TempDir, UserId) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let service = ProfileService::new(store.clone());
        let user_id = UserId::from_bytes([1u8; 32]);
        (service, store, dir, user_id)
    }

    fn engineer() -> RoleInput {
        RoleInput {
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            end_date: Some("2024-01".to_string()),
            current: true,
            ..RoleInput::default()
        }
    }

    #[test]
    fn get_creates_empty_profile_once() {
        let (service, store, _dir, user_id) = setup();

        let view = service.get_profile(&user_id).unwrap();
        assert_eq!(view.completeness.score, 0);
        assert!(store.get_profile(&user_id).unwrap().is_some());

        let again = service.get_profile(&user_id).unwrap();
        assert_eq!(again.profile.created_at, view.profile.created_at);
    }

    #[test]
    fn update_patches_only_given_fields() {
        let (service, _store, _dir, user_id) = setup();

        service
            .update_profile(
                &user_id,
                UpdateProfileRequest {
                    basics: Some(BasicsPatch {
                        name: Some("Ada".to_string()),
                        email: Some("ada@example.com".to_string()),
                        ..BasicsPatch::default()
                    }),
                    summary: Some("Programmer".to_string()),
                    ..UpdateProfileRequest::default()
                },
            )
            .unwrap();

        let view = service
            .update_profile(
                &user_id,
                UpdateProfileRequest {
                    basics: Some(BasicsPatch {
                        email: Some(String::new()),
                        ..BasicsPatch::default()
                    }),
                    skills: Some(vec![Skill {
                        name: "Rust".to_string(),
                        level: None,
                        keywords: Vec::new(),
                    }]),
                    ..UpdateProfileRequest::default()
                },
            )
            .unwrap();

        assert_eq!(view.profile.basics.name.as_deref(), Some("Ada"));
        assert_eq!(view.profile.basics.email, None);
        assert_eq!(view.profile.summary.as_deref(), Some("Programmer"));
        assert_eq!(view.profile.skills.len(), 1);
        assert!(view.completeness.missing.contains(&"basics.email"));
        assert!(!view.completeness.missing.contains(&"skills"));
    }

    #[test]
    fn add_role_clears_end_date_when_current() {
        let (service, _store, _dir, user_id) = setup();

        let (role, view) = service.add_role(&user_id, engineer()).unwrap();

        assert!(role.current);
        assert_eq!(role.end_date, None);
        assert_eq!(view.profile.roles, vec![role]);
        assert!(!view.completeness.missing.contains(&"roles"));
    }

    #[test]
    fn add_role_requires_title_and_company() {
        let (service, _store, _dir, user_id) = setup();

        let result = service.add_role(
            &user_id,
            RoleInput {
                title: "  ".to_string(),
                ..engineer()
            },
        );
        assert!(matches!(result, Err(ProfileError::InvalidInput(_))));
    }

    #[test]
    fn update_role_patches_fields() {
        let (service, _store, _dir, user_id) = setup();
        let (role, _) = service.add_role(&user_id, engineer()).unwrap();

        let (updated, view) = service
            .update_role(
                &user_id,
                &role.role_id,
                RolePatch {
                    title: Some("Senior Engineer".to_string()),
                    current: Some(false),
                    end_date: Some("2025-06".to_string()),
                    ..RolePatch::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "Senior Engineer");
        assert_eq!(updated.company, "Acme");
        assert_eq!(updated.end_date.as_deref(), Some("2025-06"));
        assert_eq!(view.profile.roles[0], updated);
    }

    #[test]
    fn missing_role_is_not_found() {
        let (service, _store, _dir, user_id) = setup();
        let role_id = RoleId::generate();

        let update = service.update_role(&user_id, &role_id, RolePatch::default());
        assert!(matches!(update, Err(ProfileError::RoleNotFound(_))));

        let delete = service.delete_role(&user_id, &role_id);
        assert!(matches!(delete, Err(ProfileError::RoleNotFound(_))));
    }

    #[test]
    fn delete_role_removes_it() {
        let (service, _store, _dir, user_id) = setup();
        let (role, _) = service.add_role(&user_id, engineer()).unwrap();

        let view = service.delete_role(&user_id, &role.role_id).unwrap();

        assert!(view.profile.roles.is_empty());
        assert!(view.completeness.missing.contains(&"roles"));
    }

    #[test]
    fn view_serializes_flat_with_completeness() {
        let (service, _store, _dir, user_id) = setup();
        let view = service.get_profile(&user_id).unwrap();

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("basics").is_some());
        assert_eq!(json["completeness"]["score"], 0);
    }
}
