//! Linkage predicates: relationship tests between a principal and one
//! specific entity instance.
//!
//! The predicate set is a closed enum rather than a string-keyed function
//! map, so an unknown predicate name cannot exist at runtime. Each kind is
//! scoped to exactly one entity type; invoking it against any other type
//! returns false rather than erroring.
//!
//! Resolution rules:
//! - Missing records mean "the relationship cannot be established" and
//!   yield false, never an error.
//! - Every resolution performs at most three keyed lookups.
//! - Infrastructure failure in a lookup propagates as [`DirectoryError`].

use serde::{Deserialize, Serialize};

use crate::directory::{Directory, DirectoryError};
use crate::types::EntityType;

/// The relationship predicates the hall system understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkageKind {
    /// The worker record belongs to the principal's own contact.
    OwnsWorker,
    /// The principal is an associated contact of the employer.
    EmployerAssociation,
    /// The trust benefit belongs to a worker owned by the principal.
    BenefitRecipient,
    /// The principal is associated with the employer that placed the job.
    DispatchedEmployer,
}

impl LinkageKind {
    /// The single entity type this predicate understands.
    pub fn entity_type(self) -> EntityType {
        match self {
            LinkageKind::OwnsWorker => EntityType::Worker,
            LinkageKind::EmployerAssociation => EntityType::Employer,
            LinkageKind::BenefitRecipient => EntityType::TrustBenefit,
            LinkageKind::DispatchedEmployer => EntityType::DispatchJob,
        }
    }
}

impl std::fmt::Display for LinkageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkageKind::OwnsWorker => write!(f, "ownsWorker"),
            LinkageKind::EmployerAssociation => write!(f, "employerAssociation"),
            LinkageKind::BenefitRecipient => write!(f, "benefitRecipient"),
            LinkageKind::DispatchedEmployer => write!(f, "dispatchedEmployer"),
        }
    }
}

/// Everything a predicate needs to know about the question being asked.
#[derive(Debug, Clone, Copy)]
pub struct LinkageContext<'a> {
    /// The principal's id.
    pub principal_id: &'a str,
    /// The principal's email, matched against directory contacts.
    pub principal_email: &'a str,
    /// The entity type of the policy under evaluation.
    pub entity_type: EntityType,
    /// The entity instance being accessed.
    pub entity_id: &'a str,
}

/// Evaluate a linkage predicate. Side-effect free.
///
/// # Errors
///
/// Returns [`DirectoryError`] only when a lookup fails at the
/// infrastructure level.
pub async fn resolve(
    kind: LinkageKind,
    ctx: &LinkageContext<'_>,
    directory: &dyn Directory,
) -> Result<bool, DirectoryError> {
    if ctx.entity_type != kind.entity_type() {
        tracing::debug!(
            linkage = %kind,
            expected = %kind.entity_type(),
            actual = %ctx.entity_type,
            "linkage invoked against mismatched entity type"
        );
        return Ok(false);
    }

    match kind {
        LinkageKind::OwnsWorker => owns_worker(ctx, directory).await,
        LinkageKind::EmployerAssociation => employer_association(ctx, directory).await,
        LinkageKind::BenefitRecipient => benefit_recipient(ctx, directory).await,
        LinkageKind::DispatchedEmployer => dispatched_employer(ctx, directory).await,
    }
}

/// Principal's contact owns the worker record.
async fn owns_worker(
    ctx: &LinkageContext<'_>,
    directory: &dyn Directory,
) -> Result<bool, DirectoryError> {
    let Some(contact) = directory.contact_by_email(ctx.principal_email).await? else {
        return Ok(false);
    };
    let Some(worker) = directory.worker_by_id(ctx.entity_id).await? else {
        return Ok(false);
    };
    Ok(worker.contact_id == contact.id)
}

/// Principal's contact is on the employer's contact list.
async fn employer_association(
    ctx: &LinkageContext<'_>,
    directory: &dyn Directory,
) -> Result<bool, DirectoryError> {
    let Some(contact) = directory.contact_by_email(ctx.principal_email).await? else {
        return Ok(false);
    };
    let contact_ids = directory.employer_contact_ids(ctx.entity_id).await?;
    Ok(contact_ids.contains(&contact.id))
}

/// The benefit belongs to a worker whose contact is the principal.
async fn benefit_recipient(
    ctx: &LinkageContext<'_>,
    directory: &dyn Directory,
) -> Result<bool, DirectoryError> {
    let Some(benefit) = directory.benefit_by_id(ctx.entity_id).await? else {
        return Ok(false);
    };
    let Some(worker) = directory.worker_by_id(&benefit.worker_id).await? else {
        return Ok(false);
    };
    let Some(contact) = directory.contact_by_email(ctx.principal_email).await? else {
        return Ok(false);
    };
    Ok(worker.contact_id == contact.id)
}

/// The job was placed by an employer the principal is associated with.
async fn dispatched_employer(
    ctx: &LinkageContext<'_>,
    directory: &dyn Directory,
) -> Result<bool, DirectoryError> {
    let Some(job) = directory.dispatch_job_by_id(ctx.entity_id).await? else {
        return Ok(false);
    };
    let Some(contact) = directory.contact_by_email(ctx.principal_email).await? else {
        return Ok(false);
    };
    let contact_ids = directory.employer_contact_ids(&job.employer_id).await?;
    Ok(contact_ids.contains(&contact.id))
}
