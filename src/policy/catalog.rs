//! Built-in policy catalog for the hall administration system.
//!
//! Registered once at startup by the composition root. Staff-wide
//! permissions (`*.viewAll`, `*.editAll`) grant access to every instance;
//! the linkage conditions open specific instances to the members they
//! belong to.

use crate::linkage::LinkageKind;
use crate::types::EntityType;

use super::{Condition, EntityAccessPolicy, PolicyRegistry, RegistryError, Rule};

/// The default policies shipped with the system.
pub fn default_policies() -> Vec<EntityAccessPolicy> {
    vec![
        EntityAccessPolicy {
            id: "worker.view".to_owned(),
            name: "View worker record".to_owned(),
            description: "Read a worker's registration and dispatch history".to_owned(),
            entity_type: EntityType::Worker,
            rules: vec![
                Rule::Condition(Condition::permission("workers.viewAll")),
                Rule::Condition(Condition::linkage(LinkageKind::OwnsWorker)),
            ],
        },
        EntityAccessPolicy {
            id: "worker.edit".to_owned(),
            name: "Edit worker record".to_owned(),
            description: "Modify a worker's registration details".to_owned(),
            entity_type: EntityType::Worker,
            rules: vec![
                Rule::Condition(Condition::permission("workers.editAll")),
                Rule::All {
                    all: vec![
                        Condition::permission("workers.editOwn"),
                        Condition::linkage(LinkageKind::OwnsWorker),
                    ],
                },
            ],
        },
        EntityAccessPolicy {
            id: "employer.view".to_owned(),
            name: "View employer".to_owned(),
            description: "Read an employer's profile and agreements".to_owned(),
            entity_type: EntityType::Employer,
            rules: vec![
                Rule::Condition(Condition::permission("employers.viewAll")),
                Rule::Condition(Condition::linkage(LinkageKind::EmployerAssociation)),
            ],
        },
        EntityAccessPolicy {
            id: "benefit.view".to_owned(),
            name: "View trust benefit".to_owned(),
            description: "Read a trust benefit record".to_owned(),
            entity_type: EntityType::TrustBenefit,
            rules: vec![
                Rule::Condition(Condition::permission("benefits.viewAll")),
                Rule::Condition(Condition::linkage(LinkageKind::BenefitRecipient)),
            ],
        },
        EntityAccessPolicy {
            id: "dispatch.view".to_owned(),
            name: "View dispatch job".to_owned(),
            description: "Read a dispatch job order".to_owned(),
            entity_type: EntityType::DispatchJob,
            rules: vec![
                Rule::Condition(Condition::permission("dispatch.viewAll")),
                Rule::Any {
                    any: vec![
                        Condition::permission("dispatch.viewOwn"),
                        Condition::linkage(LinkageKind::DispatchedEmployer),
                    ],
                },
            ],
        },
    ]
}

/// Register the default catalog into a registry.
///
/// # Errors
///
/// Returns [`RegistryError::Duplicate`] if any default id is already taken.
pub fn register_defaults(registry: &PolicyRegistry) -> Result<(), RegistryError> {
    for policy in default_policies() {
        registry.register(policy)?;
    }
    Ok(())
}
