//! Proof protocol integration tests
//!
//! Expression -> acknowledgement -> proof request -> proof token, with the
//! participants registered as real email accounts and every notification
//! checked on the bus.

use std::sync::Arc;

use peacemaking::domain::{
    ContentMap, NotificationType, Principal, ProofRequestStatus, ProofTokenStatus,
};
use peacemaking::interaction::{content_hash, NewExpression};
use peacemaking::ports::{
    Clock, Eip191Verifier, ManualClock, OsRandom, StrictMediaValidator, UnconfiguredRoomService,
    WebauthnRsVerifier,
};
use peacemaking::server::{Ports, Services};
use peacemaking::store::Stores;
use peacemaking::PeacemakingError;

fn services() -> Arc<Services> {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
    let ports = Ports {
        clock,
        random: Arc::new(OsRandom),
        signatures: Arc::new(Eip191Verifier),
        webauthn: Arc::new(
            WebauthnRsVerifier::new("localhost", "http://localhost:8080", "Proof of Peacemaking")
                .unwrap(),
        ),
        rooms: Arc::new(UnconfiguredRoomService),
        media: Arc::new(StrictMediaValidator),
    };
    Arc::new(Services::new(Stores::memory(), ports))
}

async fn account(services: &Services, name: &str) -> Principal {
    services
        .auth
        .register_with_email(&format!("{}@example.org", name), "a long password", name)
        .await
        .unwrap()
        .user
        .principal()
}

fn text(s: &str) -> ContentMap {
    ContentMap::from([("text".to_string(), s.to_string())])
}

async fn kinds(services: &Services, user_id: &str) -> Vec<NotificationType> {
    services
        .notifications
        .list_for_user(user_id)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.notification.kind)
        .collect()
}

#[tokio::test]
async fn test_full_exchange() {
    let services = services();
    let creator = account(&services, "amara").await;
    let peer = account(&services, "bashir").await;

    let expression = services
        .interaction
        .create_expression(
            &creator,
            NewExpression {
                content: text("I forgive the harm done to my family"),
                hash: None,
                on_chain_id: None,
            },
        )
        .await
        .unwrap();

    let acknowledgement = services
        .interaction
        .create_acknowledgement(&peer, &expression.id, text("I hear you"))
        .await
        .unwrap();

    let entry = services.interaction.get_expression(&expression.id).await.unwrap();
    assert_eq!(entry.active_acknowledgements, 1);

    let request = services
        .interaction
        .request_proof(&creator, &expression.id, &acknowledgement.id)
        .await
        .unwrap();
    assert_eq!(request.status, ProofRequestStatus::Pending);
    assert_eq!(request.peer_id, peer.user_id);

    // The initiator cannot approve their own request
    assert!(matches!(
        services.interaction.approve_proof(&creator, &request.id).await,
        Err(PeacemakingError::Forbidden(_))
    ));

    let token = services
        .interaction
        .approve_proof(&peer, &request.id)
        .await
        .unwrap();
    assert_eq!(token.status, ProofTokenStatus::Accepted);
    assert_eq!(token.creator_id, creator.user_id);
    assert_eq!(token.acknowledger_id, peer.user_id);
    assert_eq!(
        token.content_hash,
        content_hash(&expression.content, &acknowledgement.content).unwrap()
    );

    let minted = services
        .interaction
        .mark_minted(&peer, &token.id, 7, "0xfeed")
        .await
        .unwrap();
    assert_eq!(minted.status, ProofTokenStatus::Minted);
    assert_eq!(minted.token_id, Some(7));
    assert!(matches!(
        services.interaction.mark_minted(&creator, &token.id, 8, "0xbeef").await,
        Err(PeacemakingError::Conflict(_))
    ));

    for user in [&creator, &peer] {
        let proofs = services.interaction.proofs_for_user(&user.user_id).await.unwrap();
        assert_eq!(proofs.len(), 1);
        assert_eq!(proofs[0].id, token.id);
    }

    let creator_kinds = kinds(&services, &creator.user_id).await;
    assert!(creator_kinds.contains(&NotificationType::NewAcknowledgement));
    assert!(creator_kinds.contains(&NotificationType::ProofRequestAccepted));
    assert!(creator_kinds.contains(&NotificationType::NftMinted));

    let peer_kinds = kinds(&services, &peer.user_id).await;
    assert!(peer_kinds.contains(&NotificationType::AcknowledgementConfirmed));
    assert!(peer_kinds.contains(&NotificationType::ProofRequestReceived));
    assert!(peer_kinds.contains(&NotificationType::NftMinted));
}

#[tokio::test]
async fn test_concurrent_approvals_issue_one_token() {
    let services = services();
    let creator = account(&services, "chen").await;
    let peer = account(&services, "dara").await;

    let expression = services
        .interaction
        .create_expression(
            &creator,
            NewExpression {
                content: text("Let us begin again"),
                hash: None,
                on_chain_id: None,
            },
        )
        .await
        .unwrap();
    let acknowledgement = services
        .interaction
        .create_acknowledgement(&peer, &expression.id, text("Agreed"))
        .await
        .unwrap();
    let request = services
        .interaction
        .request_proof(&creator, &expression.id, &acknowledgement.id)
        .await
        .unwrap();

    let first = {
        let services = Arc::clone(&services);
        let peer = peer.clone();
        let id = request.id.clone();
        tokio::spawn(async move { services.interaction.approve_proof(&peer, &id).await })
    };
    let second = {
        let services = Arc::clone(&services);
        let peer = peer.clone();
        let id = request.id.clone();
        tokio::spawn(async move { services.interaction.approve_proof(&peer, &id).await })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let approved = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(PeacemakingError::Conflict(_))))
        .count();
    assert_eq!((approved, conflicts), (1, 1));

    let proofs = services.interaction.proofs_for_user(&peer.user_id).await.unwrap();
    assert_eq!(proofs.len(), 1);
}

#[tokio::test]
async fn test_rejected_request_cannot_be_approved() {
    let services = services();
    let creator = account(&services, "emeka").await;
    let peer = account(&services, "farah").await;

    let expression = services
        .interaction
        .create_expression(
            &creator,
            NewExpression {
                content: text("I was wrong"),
                hash: None,
                on_chain_id: None,
            },
        )
        .await
        .unwrap();
    let acknowledgement = services
        .interaction
        .create_acknowledgement(&peer, &expression.id, text("Thank you"))
        .await
        .unwrap();
    let request = services
        .interaction
        .request_proof(&creator, &expression.id, &acknowledgement.id)
        .await
        .unwrap();

    let rejected = services
        .interaction
        .reject_proof(&peer, &request.id)
        .await
        .unwrap();
    assert_eq!(rejected.status, ProofRequestStatus::Rejected);
    assert!(kinds(&services, &creator.user_id)
        .await
        .contains(&NotificationType::ProofRequestRejected));

    assert!(matches!(
        services.interaction.approve_proof(&peer, &request.id).await,
        Err(PeacemakingError::Conflict(_))
    ));
    assert!(services
        .interaction
        .proofs_for_user(&peer.user_id)
        .await
        .unwrap()
        .is_empty());

    // A fresh request for the same pair is allowed once the old one is closed
    let again = services
        .interaction
        .request_proof(&creator, &expression.id, &acknowledgement.id)
        .await
        .unwrap();
    assert_ne!(again.id, request.id);
}

#[tokio::test]
async fn test_outsider_cannot_touch_a_request() {
    let services = services();
    let creator = account(&services, "gita").await;
    let peer = account(&services, "hamid").await;
    let outsider = account(&services, "ines").await;

    let expression = services
        .interaction
        .create_expression(
            &creator,
            NewExpression {
                content: text("Shared grief"),
                hash: None,
                on_chain_id: None,
            },
        )
        .await
        .unwrap();
    let acknowledgement = services
        .interaction
        .create_acknowledgement(&peer, &expression.id, text("Shared hope"))
        .await
        .unwrap();

    assert!(matches!(
        services
            .interaction
            .request_proof(&outsider, &expression.id, &acknowledgement.id)
            .await,
        Err(PeacemakingError::Forbidden(_))
    ));

    let request = services
        .interaction
        .request_proof(&creator, &expression.id, &acknowledgement.id)
        .await
        .unwrap();
    assert!(matches!(
        services.interaction.reject_proof(&outsider, &request.id).await,
        Err(PeacemakingError::Forbidden(_))
    ));
    assert!(matches!(
        services.interaction.approve_proof(&outsider, &request.id).await,
        Err(PeacemakingError::Forbidden(_))
    ));
}
