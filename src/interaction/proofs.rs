//! Proof requests and tokens
//!
//! ```text
//!   none --request--> pending --approve--> accepted --mint--> minted
//!                        \--reject--> rejected
//! ```
//!
//! Only the expression's creator opens a request, and the peer is always the
//! acknowledger. The peer approves or rejects; the initiator may cancel while
//! the request is pending.

use tracing::{error, info, warn};

use super::{content_hash, InteractionService};
use crate::domain::{
    new_id, AcknowledgementStatus, Notification, NotificationType, Principal, ProofRequest,
    ProofRequestStatus, ProofToken, ProofTokenStatus,
};
use crate::types::{PeacemakingError, Result};

impl InteractionService {
    async fn request(&self, id: &str) -> Result<ProofRequest> {
        self.proofs
            .get_request(id)
            .await?
            .ok_or_else(|| PeacemakingError::NotFound(format!("proof request {}", id)))
    }

    pub async fn request_proof(
        &self,
        principal: &Principal,
        expression_id: &str,
        acknowledgement_id: &str,
    ) -> Result<ProofRequest> {
        let expression = self.expression(expression_id).await?;
        let acknowledgement = self.acknowledgement(acknowledgement_id).await?;

        if acknowledgement.expression_id != expression.id {
            return Err(PeacemakingError::BadRequest(
                "acknowledgement does not belong to this expression".into(),
            ));
        }
        if expression.creator_id != principal.user_id {
            return Err(PeacemakingError::Forbidden(
                "only the expression creator can request a proof".into(),
            ));
        }
        if acknowledgement.status != AcknowledgementStatus::Active {
            return Err(PeacemakingError::Conflict("acknowledgement was refuted".into()));
        }

        let now = self.clock.now();
        let request = ProofRequest {
            id: new_id(),
            expression_id: expression.id.clone(),
            acknowledgement_id: acknowledgement.id.clone(),
            initiator_id: principal.user_id.clone(),
            peer_id: acknowledgement.acknowledger_id.clone(),
            status: ProofRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.proofs.insert_request(&request).await?;
        info!(user_id = %principal.user_id, request_id = %request.id, "Proof requested");

        self.notify(
            Notification::new(
                &request.peer_id,
                NotificationType::ProofRequestReceived,
                "Proof request",
                "You have been asked to co-sign a proof of peacemaking",
                now,
            )
            .with("requestId", request.id.clone())
            .with("expressionId", request.expression_id.clone())
            .with("initiatorId", request.initiator_id.clone()),
        )
        .await;

        Ok(request)
    }

    /// `pending -> accepted` by the peer, issuing the proof token
    pub async fn approve_proof(&self, principal: &Principal, request_id: &str) -> Result<ProofToken> {
        let request = self.request(request_id).await?;
        if request.peer_id != principal.user_id {
            return Err(PeacemakingError::Forbidden(
                "only the peer can approve a proof request".into(),
            ));
        }

        let expression = self.expression(&request.expression_id).await?;
        let acknowledgement = self.acknowledgement(&request.acknowledgement_id).await?;
        let hash = match &expression.hash {
            Some(hash) => hash.clone(),
            None => content_hash(&expression.content, &acknowledgement.content)?,
        };

        let now = self.clock.now();
        let claimed = self
            .proofs
            .transition_request(
                request_id,
                ProofRequestStatus::Pending,
                ProofRequestStatus::Accepted,
                now,
            )
            .await?;
        if !claimed && !self.accepted_without_token(request_id).await? {
            return Err(PeacemakingError::Conflict(
                "proof request is no longer pending".into(),
            ));
        }

        let token = ProofToken {
            id: new_id(),
            request_id: request.id.clone(),
            token_id: None,
            expression_id: expression.id.clone(),
            acknowledgement_id: acknowledgement.id.clone(),
            creator_id: expression.creator_id.clone(),
            acknowledger_id: acknowledgement.acknowledger_id.clone(),
            content_hash: hash,
            on_chain_hash: None,
            status: ProofTokenStatus::Accepted,
            created_at: now,
            minted_at: None,
        };

        // The unique token per request decides between concurrent approvals
        match self.proofs.insert_token(&token).await {
            Ok(()) => {}
            Err(PeacemakingError::Conflict(_)) => {
                return Err(PeacemakingError::Conflict(
                    "proof request is no longer pending".into(),
                ));
            }
            Err(e) if claimed => {
                self.release_claim(request_id).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        }
        if !claimed {
            warn!(request_id = %request_id, "Issued the missing token of an accepted proof request");
        }
        info!(user_id = %principal.user_id, request_id = %request_id, token_id = %token.id, "Proof approved");

        self.notify(
            Notification::new(
                &request.initiator_id,
                NotificationType::ProofRequestAccepted,
                "Proof accepted",
                "Your proof request was accepted",
                now,
            )
            .with("requestId", request.id.clone())
            .with("proofId", token.id.clone()),
        )
        .await;

        Ok(token)
    }

    /// Accepted requests whose token insert never happened
    async fn accepted_without_token(&self, request_id: &str) -> Result<bool> {
        let accepted = self
            .proofs
            .get_request(request_id)
            .await?
            .is_some_and(|r| r.status == ProofRequestStatus::Accepted);
        Ok(accepted && self.proofs.token_for_request(request_id).await?.is_none())
    }

    /// Puts a claimed request back so it can be approved again
    async fn release_claim(&self, request_id: &str) {
        match self
            .proofs
            .transition_request(
                request_id,
                ProofRequestStatus::Accepted,
                ProofRequestStatus::Pending,
                self.clock.now(),
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => error!(request_id = %request_id, "Proof request changed during rollback"),
            Err(rollback) => {
                error!(request_id = %request_id, error = %rollback, "Proof request rollback failed")
            }
        }
    }

    /// `pending -> rejected`; the peer rejects or the initiator cancels
    pub async fn reject_proof(&self, principal: &Principal, request_id: &str) -> Result<ProofRequest> {
        let request = self.request(request_id).await?;
        if !request.is_participant(&principal.user_id) {
            return Err(PeacemakingError::Forbidden(
                "not a participant of this proof request".into(),
            ));
        }

        let now = self.clock.now();
        if !self
            .proofs
            .transition_request(
                request_id,
                ProofRequestStatus::Pending,
                ProofRequestStatus::Rejected,
                now,
            )
            .await?
        {
            return Err(PeacemakingError::Conflict(
                "proof request is no longer pending".into(),
            ));
        }

        let cancelled = principal.user_id == request.initiator_id;
        info!(user_id = %principal.user_id, request_id = %request_id, cancelled, "Proof request closed");

        // Tell the other side
        let recipient = if cancelled {
            &request.peer_id
        } else {
            &request.initiator_id
        };
        let message = if cancelled {
            "A proof request addressed to you was withdrawn"
        } else {
            "Your proof request was declined"
        };
        self.notify(
            Notification::new(
                recipient,
                NotificationType::ProofRequestRejected,
                "Proof request closed",
                message,
                now,
            )
            .with("requestId", request.id.clone()),
        )
        .await;

        self.request(request_id).await
    }

    /// `accepted -> minted` once the chain has assigned a token id
    pub async fn mark_minted(
        &self,
        principal: &Principal,
        proof_id: &str,
        token_id: i64,
        on_chain_hash: &str,
    ) -> Result<ProofToken> {
        let token = self
            .proofs
            .get_token(proof_id)
            .await?
            .ok_or_else(|| PeacemakingError::NotFound(format!("proof {}", proof_id)))?;
        if token.creator_id != principal.user_id && token.acknowledger_id != principal.user_id {
            return Err(PeacemakingError::Forbidden(
                "not a participant of this proof".into(),
            ));
        }

        let now = self.clock.now();
        if !self
            .proofs
            .mark_minted(proof_id, token_id, on_chain_hash, now)
            .await?
        {
            return Err(PeacemakingError::Conflict("proof is already minted".into()));
        }
        info!(proof_id = %proof_id, token_id, "Proof minted");

        for recipient in [&token.creator_id, &token.acknowledger_id] {
            self.notify(
                Notification::new(
                    recipient,
                    NotificationType::NftMinted,
                    "Proof minted",
                    "Your proof of peacemaking is now on chain",
                    now,
                )
                .with("proofId", token.id.clone())
                .with("tokenId", token_id),
            )
            .await;
        }

        self.proofs
            .get_token(proof_id)
            .await?
            .ok_or_else(|| PeacemakingError::NotFound(format!("proof {}", proof_id)))
    }

    /// Tokens where the user is creator or acknowledger
    pub async fn proofs_for_user(&self, user_id: &str) -> Result<Vec<ProofToken>> {
        self.proofs.tokens_for_user(user_id).await
    }

    /// Requests where the user is initiator or peer
    pub async fn requests_for_user(&self, user_id: &str) -> Result<Vec<ProofRequest>> {
        self.proofs.requests_for_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{fixture, principal, text};
    use super::super::NewExpression;
    use crate::store::ProofStore;
    use super::*;

    async fn pair(f: &super::super::tests::Fixture) -> (String, String) {
        let expression = f
            .service
            .create_expression(
                &principal("alice"),
                NewExpression {
                    content: text("I was wrong"),
                    hash: None,
                    on_chain_id: None,
                },
            )
            .await
            .unwrap();
        let ack = f
            .service
            .create_acknowledgement(&principal("bob"), &expression.id, text("Thank you"))
            .await
            .unwrap();
        (expression.id, ack.id)
    }

    #[tokio::test]
    async fn test_happy_path_to_minted() {
        let f = fixture();
        let (expression_id, ack_id) = pair(&f).await;
        let alice = principal("alice");
        let bob = principal("bob");

        let request = f
            .service
            .request_proof(&alice, &expression_id, &ack_id)
            .await
            .unwrap();
        assert_eq!(request.peer_id, "bob");

        let token = f.service.approve_proof(&bob, &request.id).await.unwrap();
        assert_eq!(token.creator_id, "alice");
        assert_eq!(token.acknowledger_id, "bob");
        assert_eq!(token.status, ProofTokenStatus::Accepted);
        assert!(token.minted_at.is_none());
        assert_eq!(
            token.content_hash,
            content_hash(&text("I was wrong"), &text("Thank you")).unwrap()
        );

        let minted = f
            .service
            .mark_minted(&bob, &token.id, 7, "0xabc")
            .await
            .unwrap();
        assert_eq!(minted.status, ProofTokenStatus::Minted);
        assert_eq!(minted.token_id, Some(7));
        assert!(minted.minted_at.is_some());

        assert!(matches!(
            f.service.mark_minted(&alice, &token.id, 8, "0xdef").await,
            Err(PeacemakingError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_only_creator_requests_and_only_peer_approves() {
        let f = fixture();
        let (expression_id, ack_id) = pair(&f).await;

        assert!(matches!(
            f.service
                .request_proof(&principal("bob"), &expression_id, &ack_id)
                .await,
            Err(PeacemakingError::Forbidden(_))
        ));

        let request = f
            .service
            .request_proof(&principal("alice"), &expression_id, &ack_id)
            .await
            .unwrap();
        assert!(matches!(
            f.service.approve_proof(&principal("alice"), &request.id).await,
            Err(PeacemakingError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.approve_proof(&principal("carol"), &request.id).await,
            Err(PeacemakingError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_pending_request_conflicts() {
        let f = fixture();
        let (expression_id, ack_id) = pair(&f).await;
        let alice = principal("alice");

        f.service
            .request_proof(&alice, &expression_id, &ack_id)
            .await
            .unwrap();
        assert!(matches!(
            f.service.request_proof(&alice, &expression_id, &ack_id).await,
            Err(PeacemakingError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_no_new_request_once_accepted() {
        let f = fixture();
        let (expression_id, ack_id) = pair(&f).await;
        let alice = principal("alice");

        let request = f
            .service
            .request_proof(&alice, &expression_id, &ack_id)
            .await
            .unwrap();
        f.service
            .approve_proof(&principal("bob"), &request.id)
            .await
            .unwrap();

        match f.service.request_proof(&alice, &expression_id, &ack_id).await {
            Err(PeacemakingError::Conflict(msg)) => assert!(msg.contains("already been issued")),
            other => panic!("expected conflict, got {:?}", other.map(|r| r.id)),
        }
    }

    #[tokio::test]
    async fn test_approve_issues_missing_token_of_accepted_request() {
        let f = fixture();
        let (expression_id, ack_id) = pair(&f).await;
        let bob = principal("bob");

        let request = f
            .service
            .request_proof(&principal("alice"), &expression_id, &ack_id)
            .await
            .unwrap();
        // Accepted, but the token insert never ran
        assert!(f
            .proofs
            .transition_request(
                &request.id,
                ProofRequestStatus::Pending,
                ProofRequestStatus::Accepted,
                request.created_at,
            )
            .await
            .unwrap());
        assert!(f.proofs.token_for_request(&request.id).await.unwrap().is_none());

        let token = f.service.approve_proof(&bob, &request.id).await.unwrap();
        assert_eq!(token.request_id, request.id);
        assert_eq!(
            f.proofs.token_for_request(&request.id).await.unwrap().map(|t| t.id),
            Some(token.id)
        );

        assert!(matches!(
            f.service.approve_proof(&bob, &request.id).await,
            Err(PeacemakingError::Conflict(_))
        ));
        assert_eq!(f.proofs.tokens_for_user("bob").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_is_terminal() {
        let f = fixture();
        let (expression_id, ack_id) = pair(&f).await;
        let bob = principal("bob");

        let request = f
            .service
            .request_proof(&principal("alice"), &expression_id, &ack_id)
            .await
            .unwrap();
        let rejected = f.service.reject_proof(&bob, &request.id).await.unwrap();
        assert_eq!(rejected.status, ProofRequestStatus::Rejected);

        assert!(matches!(
            f.service.approve_proof(&bob, &request.id).await,
            Err(PeacemakingError::Conflict(_))
        ));

        let notes = f.bus.list_for_user("alice").await.unwrap();
        assert!(notes
            .iter()
            .any(|n| n.notification.kind == NotificationType::ProofRequestRejected));

        // A fresh request is allowed once the previous one is closed
        assert!(f
            .service
            .request_proof(&principal("alice"), &expression_id, &ack_id)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_initiator_cancel_notifies_peer() {
        let f = fixture();
        let (expression_id, ack_id) = pair(&f).await;
        let alice = principal("alice");

        let request = f
            .service
            .request_proof(&alice, &expression_id, &ack_id)
            .await
            .unwrap();
        f.service.reject_proof(&alice, &request.id).await.unwrap();

        let notes = f.bus.list_for_user("bob").await.unwrap();
        assert!(notes
            .iter()
            .any(|n| n.notification.kind == NotificationType::ProofRequestRejected));
    }
}
