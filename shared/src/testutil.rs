//! In-memory fakes shared by module tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Analysis, Lead};
use crate::reasoning::ReasoningService;
use crate::store::LeadStore;
use crate::{Error, Result};

/// In-memory [`LeadStore`] with the same guarded-update semantics as the
/// Postgres backend, plus a lookup counter for poller assertions.
#[derive(Default)]
pub struct MemoryLeadStore {
    leads: Mutex<HashMap<Uuid, Lead>>,
    lookups: AtomicUsize,
}

impl MemoryLeadStore {
    pub fn with_lead(lead: Lead) -> Self {
        let store = Self::default();
        store.leads.lock().unwrap().insert(lead.id, lead);
        store
    }

    /// Number of reads served so far (by id or slug).
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Replace a stored lead wholesale, bypassing transition guards. Lets
    /// tests stage a state change between poll ticks.
    pub fn put(&self, lead: Lead) {
        self.leads.lock().unwrap().insert(lead.id, lead);
    }

    pub fn snapshot(&self, id: Uuid) -> Option<Lead> {
        self.leads.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn insert(&self, lead: &Lead) -> Result<()> {
        let mut leads = self.leads.lock().unwrap();
        if leads.values().any(|l| l.slug == lead.slug) {
            return Err(Error::Validation(format!("slug already taken: {}", lead.slug)));
        }
        leads.insert(lead.id, lead.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Lead>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.leads.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Lead>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .leads
            .lock()
            .unwrap()
            .values()
            .find(|l| l.slug == slug)
            .cloned())
    }

    async fn complete(&self, id: Uuid, analysis: &Analysis) -> Result<bool> {
        let mut leads = self.leads.lock().unwrap();
        match leads.get_mut(&id) {
            Some(lead) => Ok(lead.complete(analysis.clone()).is_ok()),
            None => Ok(false),
        }
    }

    async fn fail(&self, id: Uuid, reason: &str) -> Result<bool> {
        let mut leads = self.leads.lock().unwrap();
        match leads.get_mut(&id) {
            Some(lead) => Ok(lead.fail(reason).is_ok()),
            None => Ok(false),
        }
    }
}

/// Scripted [`ReasoningService`]: pops one canned outcome per call and
/// records every prompt it saw.
#[derive(Default)]
pub struct ScriptedReasoning {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedReasoning {
    pub fn replying(text: &str) -> Self {
        let script = Self::default();
        script.push_ok(text);
        script
    }

    pub fn failing(error: Error) -> Self {
        let script = Self::default();
        script.replies.lock().unwrap().push_back(Err(error));
        script
    }

    pub fn push_ok(&self, text: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoning {
    async fn generate(&self, prompt: &str, _json_mode: bool) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Internal("script exhausted".into())))
    }
}
