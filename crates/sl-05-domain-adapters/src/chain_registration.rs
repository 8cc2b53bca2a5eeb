//! # Chain Registration Adapter
//!
//! Supply chains and participant authorizations, plus the authorization
//! lookups every other intent depends on.

use crate::authorization_cache::AuthorizationCache;
use crate::domain::{
    Authorization, DomainError, EntityKey, LedgerCall, LedgerState, PendingIntent, SupplyChain,
};
use crate::ports::{ChainRegistrationApi, EntityStore};
use crate::writer::IntentWriter;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Chain registration adapter.
pub struct ChainRegistrationAdapter {
    writer: IntentWriter,
    entities: Arc<dyn EntityStore>,
    cache: Arc<AuthorizationCache>,
}

impl ChainRegistrationAdapter {
    /// Create the adapter.
    pub fn new(
        writer: IntentWriter,
        entities: Arc<dyn EntityStore>,
        cache: Arc<AuthorizationCache>,
    ) -> Self {
        Self {
            writer,
            entities,
            cache,
        }
    }

    /// The authorization cache this adapter owns.
    pub fn cache(&self) -> &Arc<AuthorizationCache> {
        &self.cache
    }

    fn stage_chain(&self, chain_id: u64, name: &str, owner: &str) -> Result<PendingIntent, DomainError> {
        let name = name.trim();
        let owner = owner.trim().to_lowercase();
        if name.is_empty() {
            return Err(DomainError::validation("chain name must not be empty"));
        }
        if owner.is_empty() {
            return Err(DomainError::validation("chain owner must not be empty"));
        }

        let prepared = {
            let _guard = self.writer.lock();
            match self.entities.load_chain(chain_id)? {
                None => {}
                Some(existing) if existing.ledger.is_failed() => {}
                // A repeated request; the coordinator records it as redundant.
                Some(existing)
                    if existing.ledger.is_pending()
                        && existing.name == name
                        && existing.owner == owner => {}
                Some(_) => {
                    return Err(DomainError::AlreadyExists {
                        kind: "supply chain",
                        id: chain_id.to_string(),
                    })
                }
            }

            let call = LedgerCall::CreateChain {
                chain_id,
                name: name.to_string(),
                owner: owner.clone(),
            };
            self.writer
                .stage(call.operation(), call.to_parameters(), |record_id| {
                    self.entities.save_chain(&SupplyChain {
                        id: chain_id,
                        name: name.to_string(),
                        owner: owner.clone(),
                        ledger: LedgerState::pending(record_id),
                    })?;
                    self.cache.invalidate_chain(chain_id);
                    Ok(())
                })?
        };

        info!(chain_id, owner = %owner, record_id = %prepared.id(), "[sl-05] Supply chain registration submitted");
        self.writer.dispatch(EntityKey::Chain(chain_id), prepared)
    }

    fn stage_authorization(
        &self,
        chain_id: u64,
        participant: &str,
        role: &str,
        granted_by: &str,
    ) -> Result<PendingIntent, DomainError> {
        let participant = participant.trim().to_lowercase();
        let granted_by = granted_by.trim().to_lowercase();
        let role = role.trim();
        if participant.is_empty() {
            return Err(DomainError::validation("participant must not be empty"));
        }
        if role.is_empty() {
            return Err(DomainError::validation("role must not be empty"));
        }

        let prepared = {
            let _guard = self.writer.lock();
            let chain = self
                .entities
                .load_chain(chain_id)?
                .filter(|c| !c.ledger.is_failed())
                .ok_or_else(|| DomainError::not_found("supply chain", chain_id))?;
            if chain.owner != granted_by {
                return Err(DomainError::NotAuthorized {
                    chain_id,
                    participant: granted_by,
                });
            }
            if let Some(existing) = self.entities.load_authorization(chain_id, &participant)? {
                if existing.ledger.is_confirmed() && existing.role == role {
                    return Err(DomainError::AlreadyExists {
                        kind: "authorization",
                        id: format!("{chain_id}:{participant}"),
                    });
                }
            }

            let call = LedgerCall::Authorize {
                chain_id,
                participant: participant.clone(),
                role: role.to_string(),
            };
            self.writer
                .stage(call.operation(), call.to_parameters(), |record_id| {
                    self.entities.save_authorization(&Authorization {
                        chain_id,
                        participant: participant.clone(),
                        role: role.to_string(),
                        ledger: LedgerState::pending(record_id),
                    })?;
                    self.cache.invalidate(chain_id, &participant);
                    Ok(())
                })?
        };

        info!(
            chain_id,
            participant = %participant,
            role,
            record_id = %prepared.id(),
            "[sl-05] Participant authorization submitted"
        );
        self.writer.dispatch(
            EntityKey::Authorization {
                chain_id,
                participant,
            },
            prepared,
        )
    }

    fn lookup_authorized(&self, chain_id: u64, participant: &str) -> Result<bool, DomainError> {
        let Some(chain) = self.entities.load_chain(chain_id)? else {
            return Ok(false);
        };
        if chain.ledger.is_failed() {
            return Ok(false);
        }
        if chain.owner == participant {
            return Ok(true);
        }
        Ok(self
            .entities
            .load_authorization(chain_id, participant)?
            .is_some_and(|a| a.is_effective()))
    }
}

#[async_trait]
impl ChainRegistrationApi for ChainRegistrationAdapter {
    async fn create_chain(
        &self,
        chain_id: u64,
        name: &str,
        owner: &str,
    ) -> Result<PendingIntent, DomainError> {
        self.stage_chain(chain_id, name, owner)
    }

    async fn authorize_participant(
        &self,
        chain_id: u64,
        participant: &str,
        role: &str,
        granted_by: &str,
    ) -> Result<PendingIntent, DomainError> {
        self.stage_authorization(chain_id, participant, role, granted_by)
    }

    fn is_authorized(&self, chain_id: u64, participant: &str) -> Result<bool, DomainError> {
        let participant = participant.trim().to_lowercase();
        if let Some(answer) = self.cache.get(chain_id, &participant) {
            return Ok(answer);
        }
        let answer = self.lookup_authorized(chain_id, &participant)?;
        self.cache.insert(chain_id, &participant, answer);
        Ok(answer)
    }
}
