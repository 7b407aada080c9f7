//! In-memory collaborator implementations.
//!
//! Used by the integration tests and by the demo composition root in
//! `main.rs`. A production deployment substitutes implementations backed by
//! the administration database behind the same traits.
//!
//! [`InMemoryDirectory`] counts every lookup it serves, which lets tests
//! assert that short-circuit paths (admin bypass, failed AND legs) never
//! touch the directory at all.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    BenefitRecord, ContactRecord, Directory, DirectoryError, DispatchJobRecord, PermissionChecker,
    WorkerRecord,
};

/// In-memory permission-string registry.
#[derive(Default)]
pub struct InMemoryPermissions {
    grants: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl InMemoryPermissions {
    /// Create an empty permission registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a permission to a principal.
    pub async fn grant(&self, principal_id: &str, permission: &str) {
        let mut grants = self.grants.write().await;
        grants
            .entry(principal_id.to_owned())
            .or_default()
            .insert(permission.to_owned());
    }
}

#[async_trait]
impl PermissionChecker for InMemoryPermissions {
    async fn has_permission(
        &self,
        principal_id: &str,
        permission: &str,
    ) -> Result<bool, DirectoryError> {
        let grants = self.grants.read().await;
        Ok(grants
            .get(principal_id)
            .is_some_and(|set| set.contains(permission)))
    }
}

/// In-memory entity directory with a lookup counter.
#[derive(Default)]
pub struct InMemoryDirectory {
    inner: Arc<RwLock<DirectoryData>>,
    lookups: AtomicU64,
}

#[derive(Default)]
struct DirectoryData {
    /// Keyed by lowercased email.
    contacts: HashMap<String, ContactRecord>,
    workers: HashMap<String, WorkerRecord>,
    employer_contacts: HashMap<String, Vec<String>>,
    benefits: HashMap<String, BenefitRecord>,
    dispatch_jobs: HashMap<String, DispatchJobRecord>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lookups served so far.
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    fn count(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    /// Add a contact. Email matching is case-insensitive.
    pub async fn add_contact(&self, id: &str, email: &str) {
        let mut data = self.inner.write().await;
        data.contacts.insert(
            email.to_lowercase(),
            ContactRecord {
                id: id.to_owned(),
                email: email.to_owned(),
            },
        );
    }

    /// Add a worker owned by a contact.
    pub async fn add_worker(&self, id: &str, contact_id: &str) {
        let mut data = self.inner.write().await;
        data.workers.insert(
            id.to_owned(),
            WorkerRecord {
                id: id.to_owned(),
                contact_id: contact_id.to_owned(),
            },
        );
    }

    /// Associate a contact with an employer.
    pub async fn link_employer_contact(&self, employer_id: &str, contact_id: &str) {
        let mut data = self.inner.write().await;
        data.employer_contacts
            .entry(employer_id.to_owned())
            .or_default()
            .push(contact_id.to_owned());
    }

    /// Add a trust benefit record for a worker.
    pub async fn add_benefit(&self, id: &str, worker_id: &str) {
        let mut data = self.inner.write().await;
        data.benefits.insert(
            id.to_owned(),
            BenefitRecord {
                id: id.to_owned(),
                worker_id: worker_id.to_owned(),
            },
        );
    }

    /// Add a dispatch job order placed by an employer.
    pub async fn add_dispatch_job(&self, id: &str, employer_id: &str) {
        let mut data = self.inner.write().await;
        data.dispatch_jobs.insert(
            id.to_owned(),
            DispatchJobRecord {
                id: id.to_owned(),
                employer_id: employer_id.to_owned(),
            },
        );
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn contact_by_email(&self, email: &str) -> Result<Option<ContactRecord>, DirectoryError> {
        self.count();
        let data = self.inner.read().await;
        Ok(data.contacts.get(&email.to_lowercase()).cloned())
    }

    async fn worker_by_id(&self, worker_id: &str) -> Result<Option<WorkerRecord>, DirectoryError> {
        self.count();
        let data = self.inner.read().await;
        Ok(data.workers.get(worker_id).cloned())
    }

    async fn employer_contact_ids(
        &self,
        employer_id: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        self.count();
        let data = self.inner.read().await;
        Ok(data
            .employer_contacts
            .get(employer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn benefit_by_id(
        &self,
        benefit_id: &str,
    ) -> Result<Option<BenefitRecord>, DirectoryError> {
        self.count();
        let data = self.inner.read().await;
        Ok(data.benefits.get(benefit_id).cloned())
    }

    async fn dispatch_job_by_id(
        &self,
        job_id: &str,
    ) -> Result<Option<DispatchJobRecord>, DirectoryError> {
        self.count();
        let data = self.inner.read().await;
        Ok(data.dispatch_jobs.get(job_id).cloned())
    }
}
