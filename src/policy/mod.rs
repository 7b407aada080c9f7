//! Access policy definitions: the rule trees the engine evaluates.
//!
//! A policy names an entity type and carries an ordered list of [`Rule`]s.
//! The list is implicitly OR'd: access is granted as soon as any rule
//! holds. A rule is either a bare [`Condition`], an `any` group (OR over
//! conditions), or an `all` group (AND over conditions).
//!
//! Condition semantics:
//! - `permission` set, principal lacks it → false, the linkage is not
//!   consulted.
//! - `permission` set and held, no `linkage` → true.
//! - `linkage` set → the named predicate must hold for the entity instance;
//!   with both fields set, both must hold.

use serde::{Deserialize, Serialize};

use crate::linkage::LinkageKind;
use crate::types::EntityType;

pub mod catalog;
pub mod registry;

pub use registry::{PolicyRegistry, RegistryError};

/// The smallest evaluable unit of a policy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    /// Permission string the principal must hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    /// Relationship predicate that must hold between principal and entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkage: Option<LinkageKind>,
}

impl Condition {
    /// Condition satisfied by holding a permission.
    pub fn permission(key: impl Into<String>) -> Self {
        Self {
            permission: Some(key.into()),
            linkage: None,
        }
    }

    /// Condition satisfied by a linkage predicate.
    pub fn linkage(kind: LinkageKind) -> Self {
        Self {
            permission: None,
            linkage: Some(kind),
        }
    }

    /// Condition requiring both a permission and a linkage.
    pub fn permission_and_linkage(key: impl Into<String>, kind: LinkageKind) -> Self {
        Self {
            permission: Some(key.into()),
            linkage: Some(kind),
        }
    }
}

/// One entry in a policy's rule list.
///
/// Serialized shape mirrors the catalog notation: a bare condition object,
/// `{"any": [..]}`, or `{"all": [..]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rule {
    /// OR over conditions, short-circuiting on the first true.
    Any {
        /// The alternatives.
        any: Vec<Condition>,
    },
    /// AND over conditions, short-circuiting on the first false.
    All {
        /// The requirements.
        all: Vec<Condition>,
    },
    /// A single condition.
    Condition(Condition),
}

/// A registered access policy for one entity type.
///
/// Immutable once registered; the registry rejects duplicate ids rather
/// than overwriting, since a silent overwrite could widen access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAccessPolicy {
    /// Stable policy identifier (e.g. `worker.view`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What the policy governs.
    pub description: String,
    /// The entity type this policy applies to.
    pub entity_type: EntityType,
    /// Rule list, implicitly OR'd.
    pub rules: Vec<Rule>,
}

/// Administrative projection of a policy.
///
/// Rule bodies are deliberately absent: they may encode sensitive linkage
/// logic and are never serialized to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummary {
    /// Policy identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What the policy governs.
    pub description: String,
    /// The entity type this policy applies to.
    pub entity_type: EntityType,
}

impl From<&EntityAccessPolicy> for PolicySummary {
    fn from(policy: &EntityAccessPolicy) -> Self {
        Self {
            id: policy.id.clone(),
            name: policy.name.clone(),
            description: policy.description.clone(),
            entity_type: policy.entity_type,
        }
    }
}
