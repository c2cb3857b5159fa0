//! Candidate profiles for hireflow.
//!
//! A profile holds contact details, a summary and the usual resume lists
//! (roles, skills, education, projects, certifications, languages). Every
//! read and write returns it together with a completeness score.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod completeness;
pub mod error;
pub mod service;
pub mod types;

pub use completeness::{calculate, Completeness};
pub use error::{ProfileError, Result};
pub use service::ProfileService;
pub use types::{BasicsPatch, ProfileView, RoleInput, RolePatch, UpdateProfileRequest};

pub use hireflow_store::{Profile, Role};
