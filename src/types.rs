//! Core value types shared across the engine.
//!
//! These are the inputs and outputs of an access evaluation: who is asking
//! ([`Principal`]), what kind of record they are asking about
//! ([`EntityType`]), and what the engine decided ([`AccessResult`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kinds of entity the hall administration system manages.
///
/// Every policy and every linkage predicate is scoped to exactly one
/// entity type. The set is closed on purpose: a typo'd entity type is a
/// compile error, not a silently-false runtime branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    /// A registered worker on the out-of-work list.
    Worker,
    /// A signatory employer.
    Employer,
    /// A trust benefit record (health, pension, training).
    TrustBenefit,
    /// A dispatch job order placed by an employer.
    DispatchJob,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Worker => write!(f, "worker"),
            EntityType::Employer => write!(f, "employer"),
            EntityType::TrustBenefit => write!(f, "trustBenefit"),
            EntityType::DispatchJob => write!(f, "dispatchJob"),
        }
    }
}

/// An already-authenticated caller.
///
/// Authentication happens upstream (session layer); the engine only ever
/// sees a resolved identity. The email is carried alongside the id because
/// linkage predicates match principals to directory contacts by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable user identifier.
    pub id: String,
    /// Email address, used for contact linkage lookups.
    pub email: String,
}

impl Principal {
    /// Convenience constructor.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}

/// The outcome of one access evaluation.
///
/// Immutable once produced. The `reason` is diagnostic only; callers must
/// branch on `granted`, never on the reason text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResult {
    /// Whether access is allowed.
    pub granted: bool,
    /// Coarse diagnostic phrase (e.g. "admin bypass", "unknown policy").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the decision was computed.
    pub evaluated_at: DateTime<Utc>,
}

impl AccessResult {
    /// A grant decision timestamped now.
    pub fn granted(reason: impl Into<String>) -> Self {
        Self {
            granted: true,
            reason: Some(reason.into()),
            evaluated_at: Utc::now(),
        }
    }

    /// A deny decision timestamped now.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            granted: false,
            reason: Some(reason.into()),
            evaluated_at: Utc::now(),
        }
    }
}
