//! Collaborator interfaces consumed by the engine.
//!
//! The engine never talks to storage directly. It consumes two
//! capabilities, both injected at the composition root:
//!
//! - [`PermissionChecker`] answers "does principal P hold permission K?"
//!   against the permission-string registry.
//! - [`Directory`] serves keyed lookups against the contact / worker /
//!   employer / benefit / dispatch records that linkage predicates walk.
//!
//! Absence is not an error: a lookup for a record that does not exist
//! returns `Ok(None)`, and linkage predicates translate that into "the
//! relationship cannot be established". Only infrastructure failure
//! (backend unreachable, query error) surfaces as [`DirectoryError`], and
//! that propagates all the way out of the engine; an outage must never be
//! silently reported as a denial.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;

/// Infrastructure failure in a collaborator lookup.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The backing store could not serve the lookup.
    #[error("directory backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A directory contact. Principals are matched to contacts by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Contact identifier.
    pub id: String,
    /// Contact email (unique within the directory).
    pub email: String,
}

/// A worker record, owned by exactly one contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    /// Worker identifier.
    pub id: String,
    /// The contact this worker record belongs to.
    pub contact_id: String,
}

/// A trust benefit record tied to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitRecord {
    /// Benefit record identifier.
    pub id: String,
    /// The worker the benefit belongs to.
    pub worker_id: String,
}

/// A dispatch job order placed by an employer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchJobRecord {
    /// Job order identifier.
    pub id: String,
    /// The employer that placed the order.
    pub employer_id: String,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Permission-string lookup capability.
///
/// The admin-bypass permission key goes through this same interface, so the
/// bypass rule stays configurable and testable in isolation.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    /// Whether the principal holds the named permission.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] only on infrastructure failure.
    async fn has_permission(
        &self,
        principal_id: &str,
        permission: &str,
    ) -> Result<bool, DirectoryError>;
}

/// Keyed entity lookups used by linkage predicates.
///
/// Every method is a scoped lookup by a known identifier; linkage runs on
/// the hot authorization path and must never scan a collection.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Contact with the given email, if any.
    async fn contact_by_email(&self, email: &str) -> Result<Option<ContactRecord>, DirectoryError>;

    /// Worker record by id, if any.
    async fn worker_by_id(&self, worker_id: &str) -> Result<Option<WorkerRecord>, DirectoryError>;

    /// Contact ids associated with an employer. Unknown employer yields an
    /// empty list.
    async fn employer_contact_ids(&self, employer_id: &str)
        -> Result<Vec<String>, DirectoryError>;

    /// Trust benefit record by id, if any.
    async fn benefit_by_id(&self, benefit_id: &str)
        -> Result<Option<BenefitRecord>, DirectoryError>;

    /// Dispatch job order by id, if any.
    async fn dispatch_job_by_id(
        &self,
        job_id: &str,
    ) -> Result<Option<DispatchJobRecord>, DirectoryError>;
}
