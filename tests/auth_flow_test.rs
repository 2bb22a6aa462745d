//! Authentication integration tests
//!
//! Drives the wallet, passkey and email flows through the service container
//! against in-memory stores:
//! - Nonce rotation and replay rejection with real secp256k1 signatures
//! - Concurrent verification of one signature
//! - Ceremony session typing and sign-count checks with a scripted authenticator

use k256::ecdsa::SigningKey;
use serde::Deserialize;
use std::sync::Arc;

use peacemaking::domain::{PasskeyCredential, SessionPurpose};
use peacemaking::ports::signature::{address_from_key, eip191_hash};
use peacemaking::ports::{
    challenge_for, AuthenticationStart, Clock, Eip191Verifier, ManualClock, OsRandom,
    RegistrationStart, StrictMediaValidator, UnconfiguredRoomService, VerifiedAssertion,
    VerifiedCredential, WebauthnUser, WebauthnVerifier,
};
use peacemaking::server::{Ports, Services};
use peacemaking::store::Stores;
use peacemaking::{PeacemakingError, Result};

// =============================================================================
// Fixtures
// =============================================================================

struct Wallet {
    key: SigningKey,
}

impl Wallet {
    fn random() -> Self {
        Self {
            key: SigningKey::random(&mut rand::thread_rng()),
        }
    }

    fn address(&self) -> String {
        address_from_key(self.key.verifying_key())
    }

    /// `personal_sign` over `message`
    fn sign(&self, message: &str) -> String {
        let digest = eip191_hash(message.as_bytes());
        let (sig, recid) = self.key.sign_prehash_recoverable(&digest).unwrap();
        let mut raw = sig.to_bytes().to_vec();
        raw.push(recid.to_byte() + 27);
        format!("0x{}", hex::encode(raw))
    }
}

/// Browser response understood by `ScriptedAuthenticator`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptedResponse {
    credential_id: String,
    sign_count: u32,
}

/// Accepts whatever credential id and counter the "browser" reports
struct ScriptedAuthenticator;

impl ScriptedAuthenticator {
    fn parse(response: &[u8]) -> Result<ScriptedResponse> {
        serde_json::from_slice(response)
            .map_err(|e| PeacemakingError::Unauthorized(format!("bad credential: {}", e)))
    }
}

impl WebauthnVerifier for ScriptedAuthenticator {
    fn begin_registration(
        &self,
        user: &WebauthnUser,
        _existing: &[PasskeyCredential],
    ) -> Result<RegistrationStart> {
        Ok(RegistrationStart {
            options: serde_json::json!({ "publicKey": { "user": { "name": user.email } } }),
            ceremony: b"registration".to_vec(),
        })
    }

    fn finish_registration(
        &self,
        _user: &WebauthnUser,
        ceremony: &[u8],
        response: &[u8],
    ) -> Result<VerifiedCredential> {
        assert_eq!(ceremony, b"registration");
        let response = Self::parse(response)?;
        Ok(VerifiedCredential {
            credential_id: response.credential_id.into_bytes(),
            public_key: b"public-key".to_vec(),
            aaguid: vec![0; 16],
            sign_count: response.sign_count,
        })
    }

    fn begin_authentication(
        &self,
        _user: &WebauthnUser,
        credentials: &[PasskeyCredential],
    ) -> Result<AuthenticationStart> {
        Ok(AuthenticationStart {
            options: serde_json::json!({ "allowCredentials": credentials.len() }),
            ceremony: b"authentication".to_vec(),
        })
    }

    fn finish_authentication(
        &self,
        _user: &WebauthnUser,
        ceremony: &[u8],
        response: &[u8],
        credentials: &[PasskeyCredential],
    ) -> Result<VerifiedAssertion> {
        assert_eq!(ceremony, b"authentication");
        let response = Self::parse(response)?;
        let credential_id = response.credential_id.into_bytes();
        if !credentials.iter().any(|c| c.credential_id == credential_id) {
            return Err(PeacemakingError::Unauthorized("unknown credential".into()));
        }
        Ok(VerifiedAssertion {
            credential_id,
            sign_count: response.sign_count,
            public_key: None,
        })
    }
}

fn setup() -> (Services, Stores, Arc<ManualClock>) {
    let stores = Stores::memory();
    let clock = Arc::new(ManualClock::default());
    let ports = Ports {
        clock: clock.clone() as Arc<dyn Clock>,
        random: Arc::new(OsRandom),
        signatures: Arc::new(Eip191Verifier),
        webauthn: Arc::new(ScriptedAuthenticator),
        rooms: Arc::new(UnconfiguredRoomService),
        media: Arc::new(StrictMediaValidator),
    };
    (Services::new(stores.clone(), ports), stores, clock)
}

fn credential(id: &str, sign_count: u32) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({ "credentialId": id, "signCount": sign_count }))
        .unwrap()
}

// =============================================================================
// Wallet Login
// =============================================================================

#[tokio::test]
async fn test_nonce_rotates_and_signature_cannot_be_replayed() {
    let (services, stores, _) = setup();
    let wallet = Wallet::random();

    let nonce = services.auth.generate_nonce(&wallet.address()).await.unwrap();
    assert!((0..1_000_000).contains(&nonce));

    let signature = wallet.sign(&challenge_for(nonce));
    let outcome = services
        .auth
        .verify_signature(&wallet.address(), &signature)
        .await
        .unwrap();
    assert!(outcome.valid);
    assert!(!outcome.token.is_empty());

    let user = stores
        .users
        .get_by_address(&wallet.address())
        .await
        .unwrap()
        .unwrap();
    assert_ne!(user.nonce, nonce);

    let replay = services
        .auth
        .verify_signature(&wallet.address(), &signature)
        .await
        .unwrap();
    assert!(!replay.valid);
    assert!(replay.token.is_empty());

    let me = services.auth.authenticate(&outcome.token).await.unwrap();
    assert_eq!(me.id, user.id);
}

#[tokio::test]
async fn test_address_is_case_insensitive() {
    let (services, _, _) = setup();
    let wallet = Wallet::random();
    let upper = format!("0x{}", wallet.address()[2..].to_ascii_uppercase());

    let nonce = services.auth.generate_nonce(&upper).await.unwrap();
    let outcome = services
        .auth
        .verify_signature(&wallet.address(), &wallet.sign(&challenge_for(nonce)))
        .await
        .unwrap();
    assert!(outcome.valid);
}

#[tokio::test]
async fn test_foreign_signature_leaves_nonce_unchanged() {
    let (services, stores, _) = setup();
    let owner = Wallet::random();
    let intruder = Wallet::random();

    let nonce = services.auth.generate_nonce(&owner.address()).await.unwrap();
    let outcome = services
        .auth
        .verify_signature(&owner.address(), &intruder.sign(&challenge_for(nonce)))
        .await
        .unwrap();
    assert!(!outcome.valid);

    let user = stores
        .users
        .get_by_address(&owner.address())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.nonce, nonce);
}

#[tokio::test]
async fn test_concurrent_verification_issues_one_session() {
    let (services, _, _) = setup();
    let services = Arc::new(services);
    let wallet = Wallet::random();

    let nonce = services.auth.generate_nonce(&wallet.address()).await.unwrap();
    let signature = wallet.sign(&challenge_for(nonce));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let services = Arc::clone(&services);
        let address = wallet.address();
        let signature = signature.clone();
        handles.push(tokio::spawn(async move {
            services.auth.verify_signature(&address, &signature).await
        }));
    }

    let mut valid = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().valid {
            valid += 1;
        }
    }
    assert_eq!(valid, 1);
}

#[tokio::test]
async fn test_unknown_address_is_rejected_without_creating_user() {
    let (services, stores, _) = setup();
    let wallet = Wallet::random();

    let outcome = services
        .auth
        .verify_signature(&wallet.address(), &wallet.sign(&challenge_for(1)))
        .await
        .unwrap();
    assert!(!outcome.valid);
    assert!(stores
        .users
        .get_by_address(&wallet.address())
        .await
        .unwrap()
        .is_none());
}

// =============================================================================
// Passkeys
// =============================================================================

#[tokio::test]
async fn test_registration_session_rejected_at_login_finish() {
    let (services, _, _) = setup();

    let (_, ceremony) = services
        .passkeys
        .begin_registration("ada@example.org", "ada")
        .await
        .unwrap();
    assert_eq!(ceremony.purpose, SessionPurpose::RegistrationCeremony);

    let err = services
        .passkeys
        .finish_authentication(&ceremony.token, &credential("cred-1", 1))
        .await
        .unwrap_err();
    match err {
        PeacemakingError::BadRequest(message) => assert_eq!(message, "invalid session type"),
        other => panic!("expected BadRequest, got {:?}", other),
    }

    // The ceremony is still usable for its own purpose
    let session = services
        .passkeys
        .finish_registration(&ceremony.token, &credential("cred-1", 1))
        .await
        .unwrap();
    assert_eq!(session.purpose, SessionPurpose::Auth);
}

#[tokio::test]
async fn test_auth_session_cannot_finish_a_ceremony() {
    let (services, _, _) = setup();
    let outcome = services
        .auth
        .register_with_email("grace@example.org", "correct horse", "grace")
        .await
        .unwrap();

    let err = services
        .passkeys
        .finish_registration(&outcome.session.token, &credential("cred", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, PeacemakingError::BadRequest(_)));
}

#[tokio::test]
async fn test_sign_count_must_advance() {
    let (services, stores, _) = setup();

    let (_, ceremony) = services
        .passkeys
        .begin_registration("lin@example.org", "lin")
        .await
        .unwrap();
    let session = services
        .passkeys
        .finish_registration(&ceremony.token, &credential("cred-lin", 5))
        .await
        .unwrap();

    let (_, login) = services
        .passkeys
        .begin_authentication("lin@example.org")
        .await
        .unwrap();
    let err = services
        .passkeys
        .finish_authentication(&login.token, &credential("cred-lin", 5))
        .await
        .unwrap_err();
    assert!(matches!(err, PeacemakingError::Unauthorized(_)));

    let stored = stores
        .passkeys
        .credentials_for_user(&session.user_id)
        .await
        .unwrap();
    assert_eq!(stored[0].sign_count, 5);

    let auth = services
        .passkeys
        .finish_authentication(&login.token, &credential("cred-lin", 6))
        .await
        .unwrap();
    assert_eq!(auth.purpose, SessionPurpose::Auth);
    assert_eq!(auth.user_id, session.user_id);

    let stored = stores
        .passkeys
        .credentials_for_user(&session.user_id)
        .await
        .unwrap();
    assert_eq!(stored[0].sign_count, 6);
}

#[tokio::test]
async fn test_counterless_authenticator_is_accepted() {
    let (services, _, _) = setup();

    let (_, ceremony) = services
        .passkeys
        .begin_registration("sam@example.org", "sam")
        .await
        .unwrap();
    services
        .passkeys
        .finish_registration(&ceremony.token, &credential("cred-sam", 0))
        .await
        .unwrap();

    for _ in 0..2 {
        let (_, login) = services
            .passkeys
            .begin_authentication("sam@example.org")
            .await
            .unwrap();
        services
            .passkeys
            .finish_authentication(&login.token, &credential("cred-sam", 0))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_failed_registration_removes_tentative_user() {
    let (services, stores, _) = setup();

    let (_, ceremony) = services
        .passkeys
        .begin_registration("kim@example.org", "kim")
        .await
        .unwrap();
    let err = services
        .passkeys
        .finish_registration(&ceremony.token, b"not json")
        .await
        .unwrap_err();
    assert!(matches!(err, PeacemakingError::Unauthorized(_)));

    assert!(stores
        .users
        .get_by_email("kim@example.org")
        .await
        .unwrap()
        .is_none());

    // The email is free again
    services
        .passkeys
        .begin_registration("kim@example.org", "kim")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ceremony_expires_after_five_minutes() {
    let (services, stores, clock) = setup();

    let (_, ceremony) = services
        .passkeys
        .begin_registration("eve@example.org", "eve")
        .await
        .unwrap();
    clock.advance(chrono::Duration::seconds(301));

    let err = services
        .passkeys
        .finish_registration(&ceremony.token, &credential("cred-eve", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, PeacemakingError::Unauthorized(_)));

    // The abandoned registration does not hold on to the email or username
    services.sessions.sweep().await.unwrap();
    let (_, retry) = services
        .passkeys
        .begin_registration("eve@example.org", "eve")
        .await
        .unwrap();
    assert_ne!(retry.user_id, ceremony.user_id);
    assert!(stores.users.get_by_id(&ceremony.user_id).await.unwrap().is_none());

    services
        .passkeys
        .finish_registration(&retry.token, &credential("cred-eve", 1))
        .await
        .unwrap();
    services
        .passkeys
        .begin_authentication("eve@example.org")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_registration_in_flight_keeps_identifiers() {
    let (services, _, clock) = setup();

    let (_, ceremony) = services
        .passkeys
        .begin_registration("oma@example.org", "oma")
        .await
        .unwrap();
    clock.advance(chrono::Duration::seconds(60));

    for (email, username) in [("oma@example.org", "someone"), ("other@example.org", "oma")] {
        let err = services
            .passkeys
            .begin_registration(email, username)
            .await
            .unwrap_err();
        assert!(matches!(err, PeacemakingError::Conflict(_)));
    }

    // A completed registration is never reclaimed, however old
    services
        .passkeys
        .finish_registration(&ceremony.token, &credential("cred-oma", 0))
        .await
        .unwrap();
    clock.advance(chrono::Duration::days(30));
    services.sessions.sweep().await.unwrap();
    let err = services
        .passkeys
        .begin_registration("oma@example.org", "oma")
        .await
        .unwrap_err();
    assert!(matches!(err, PeacemakingError::Conflict(_)));
}

#[tokio::test]
async fn test_registration_counter_is_the_baseline() {
    let (services, stores, _) = setup();

    let (_, ceremony) = services
        .passkeys
        .begin_registration("ravi@example.org", "ravi")
        .await
        .unwrap();
    let session = services
        .passkeys
        .finish_registration(&ceremony.token, &credential("cred-ravi", 47))
        .await
        .unwrap();
    let stored = stores
        .passkeys
        .credentials_for_user(&session.user_id)
        .await
        .unwrap();
    assert_eq!(stored[0].sign_count, 47);
    assert_eq!(stored[0].aaguid.len(), 16);

    // A copy of the key replaying a low counter is refused
    let (_, login) = services
        .passkeys
        .begin_authentication("ravi@example.org")
        .await
        .unwrap();
    let err = services
        .passkeys
        .finish_authentication(&login.token, &credential("cred-ravi", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, PeacemakingError::Unauthorized(_)));

    services
        .passkeys
        .finish_authentication(&login.token, &credential("cred-ravi", 48))
        .await
        .unwrap();
}

// =============================================================================
// Email Accounts and Sessions
// =============================================================================

#[tokio::test]
async fn test_email_login_and_logout_everywhere() {
    let (services, _, _) = setup();

    let registered = services
        .auth
        .register_with_email("Noor@Example.org", "peace-be-with-you", "noor")
        .await
        .unwrap();

    let err = services
        .auth
        .login_with_email("noor@example.org", "wrong password")
        .await
        .unwrap_err();
    match err {
        PeacemakingError::Unauthorized(message) => {
            assert_eq!(message, "invalid email or password")
        }
        other => panic!("expected Unauthorized, got {:?}", other),
    }

    let second = services
        .auth
        .login_with_email("noor@example.org", "peace-be-with-you")
        .await
        .unwrap();
    assert_eq!(second.user.id, registered.user.id);

    let removed = services.auth.logout_all(&registered.user.id).await.unwrap();
    assert_eq!(removed, 2);
    assert!(services
        .auth
        .authenticate(&second.session.token)
        .await
        .is_err());
}
