//! Session registry: the single shared mutable structure, safe for
//! concurrent create/lookup/destroy. Consults the admission policy and the
//! configured concurrency cap on every `create`; reaps sessions that have
//! gone `DISCONNECTED` on transport loss so a stale id eventually surfaces
//! `SESSION_NOT_FOUND` rather than a live-looking disconnected entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;
use url::Url;

use crate::admission::AdmissionPolicy;
use crate::error::BrokerError;
use crate::model::SessionSummary;
use crate::session::{Session, SessionState};
use crate::source_map::SourceFetcher;
use crate::types::SessionId;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    admission: AdmissionPolicy,
    max_sessions: usize,
    command_timeout: Duration,
    fetcher: Arc<dyn SourceFetcher>,
}

impl SessionRegistry {
    pub fn new(
        admission: AdmissionPolicy,
        max_sessions: usize,
        command_timeout: Duration,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Arc<Self> {
        Arc::new(SessionRegistry {
            sessions: RwLock::new(HashMap::new()),
            admission,
            max_sessions,
            command_timeout,
            fetcher,
        })
    }

    pub async fn create(&self, target_url: &str, name: Option<String>) -> Result<Arc<Session>, BrokerError> {
        let parsed = Url::parse(target_url).map_err(|e| BrokerError::InvalidParameters(e.to_string()))?;
        self.admission.validate(&parsed)?;

        if self.sessions.read().await.len() >= self.max_sessions {
            return Err(BrokerError::MaxSessionsReached);
        }

        let id = SessionId::new();
        let session = Session::connect(id, name, parsed, self.fetcher.clone(), self.command_timeout).await?;
        self.sessions.write().await.insert(id, session.clone());
        Ok(session)
    }

    pub async fn get(&self, id: SessionId) -> Result<Arc<Session>, BrokerError> {
        self.sessions.read().await.get(&id).cloned().ok_or(BrokerError::SessionNotFound(id))
    }

    pub async fn destroy(&self, id: SessionId) -> Result<(), BrokerError> {
        let session = self.sessions.write().await.remove(&id).ok_or(BrokerError::SessionNotFound(id))?;
        session.disconnect().await;
        Ok(())
    }

    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions.values() {
            summaries.push(session.summary().await);
        }
        summaries
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Periodically drop sessions that reached `DISCONNECTED` on their own
    /// (transport loss), rather than via an explicit `destroy`.
    pub fn spawn_reaper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.reap_once().await;
            }
        })
    }

    async fn reap_once(&self) {
        let mut dead = Vec::new();
        {
            let sessions = self.sessions.read().await;
            for (id, session) in sessions.iter() {
                if session.state().await == SessionState::Disconnected {
                    dead.push(*id);
                }
            }
        }
        if dead.is_empty() {
            return;
        }
        let mut sessions = self.sessions.write().await;
        for id in dead {
            if sessions.remove(&id).is_some() {
                info!(session = %id, "reaped disconnected session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_connect_to_disallowed_host() {
        let registry = SessionRegistry::new(
            AdmissionPolicy::default(),
            8,
            Duration::from_secs(5),
            Arc::new(crate::source_map::DefaultSourceFetcher::default()),
        );
        let err = registry.create("ws://evil.example.com/t", None).await.unwrap_err();
        assert!(matches!(err, BrokerError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn unknown_session_id_is_session_not_found() {
        let registry = SessionRegistry::new(
            AdmissionPolicy::default(),
            8,
            Duration::from_secs(5),
            Arc::new(crate::source_map::DefaultSourceFetcher::default()),
        );
        let err = registry.get(SessionId::new()).await.unwrap_err();
        assert!(matches!(err, BrokerError::SessionNotFound(_)));
    }
}
