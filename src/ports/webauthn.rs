//! Passkey ceremonies
//!
//! The verifier turns users into creation/assertion options and checks the
//! browser's responses. Ceremony state is returned as opaque bytes so it can
//! ride in a ceremony session between the two HTTP round-trips.

use serde_cbor::Value as Cbor;
use uuid::Uuid;
use webauthn_rs::prelude::{
    Passkey, PasskeyAuthentication, PasskeyRegistration, PublicKeyCredential,
    RegisterPublicKeyCredential, Url, Webauthn, WebauthnBuilder,
};

use crate::domain::PasskeyCredential;
use crate::types::{PeacemakingError, Result};

/// The account a ceremony is performed for
#[derive(Debug, Clone)]
pub struct WebauthnUser {
    pub user_id: String,
    pub email: String,
    pub username: String,
}

/// Options to hand to `navigator.credentials.create` plus ceremony state
#[derive(Debug, Clone)]
pub struct RegistrationStart {
    pub options: serde_json::Value,
    pub ceremony: Vec<u8>,
}

/// Options to hand to `navigator.credentials.get` plus ceremony state
#[derive(Debug, Clone)]
pub struct AuthenticationStart {
    pub options: serde_json::Value,
    pub ceremony: Vec<u8>,
}

/// A credential accepted at the end of registration
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedCredential {
    pub credential_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub aaguid: Vec<u8>,
    pub sign_count: u32,
}

/// A successful assertion
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedAssertion {
    pub credential_id: Vec<u8>,
    pub sign_count: u32,
    /// Replacement key material when the authenticator updated it
    pub public_key: Option<Vec<u8>>,
}

pub trait WebauthnVerifier: Send + Sync {
    fn begin_registration(
        &self,
        user: &WebauthnUser,
        existing: &[PasskeyCredential],
    ) -> Result<RegistrationStart>;

    fn finish_registration(
        &self,
        user: &WebauthnUser,
        ceremony: &[u8],
        response: &[u8],
    ) -> Result<VerifiedCredential>;

    fn begin_authentication(
        &self,
        user: &WebauthnUser,
        credentials: &[PasskeyCredential],
    ) -> Result<AuthenticationStart>;

    fn finish_authentication(
        &self,
        user: &WebauthnUser,
        ceremony: &[u8],
        response: &[u8],
        credentials: &[PasskeyCredential],
    ) -> Result<VerifiedAssertion>;
}

/// Offsets into authenticator data: rpIdHash (32), flags (1), signCount (4),
/// then attested credential data led by the AAGUID (16)
const FLAGS_OFFSET: usize = 32;
const SIGN_COUNT_OFFSET: usize = 33;
const AAGUID_OFFSET: usize = 37;
const AAGUID_END: usize = AAGUID_OFFSET + 16;
/// Attested credential data present
const FLAG_AT: u8 = 0x40;

/// AAGUID and initial sign count from a registration's attestation object
fn attested_authenticator(attestation_object: &[u8]) -> Result<(Vec<u8>, u32)> {
    let invalid = |msg: &str| PeacemakingError::BadRequest(format!("Invalid attestation: {}", msg));

    let object: Cbor = serde_cbor::from_slice(attestation_object)
        .map_err(|e| invalid(&e.to_string()))?;
    let Cbor::Map(fields) = object else {
        return Err(invalid("attestation object is not a map"));
    };
    let auth_data = match fields.get(&Cbor::Text("authData".into())) {
        Some(Cbor::Bytes(bytes)) => bytes,
        _ => return Err(invalid("missing authenticator data")),
    };

    if auth_data.len() < AAGUID_END || auth_data[FLAGS_OFFSET] & FLAG_AT == 0 {
        return Err(invalid("no attested credential data"));
    }
    let sign_count = u32::from_be_bytes([
        auth_data[SIGN_COUNT_OFFSET],
        auth_data[SIGN_COUNT_OFFSET + 1],
        auth_data[SIGN_COUNT_OFFSET + 2],
        auth_data[SIGN_COUNT_OFFSET + 3],
    ]);
    Ok((auth_data[AAGUID_OFFSET..AAGUID_END].to_vec(), sign_count))
}

/// Verifier backed by `webauthn-rs`.
///
/// The serialized `Passkey` is kept as the credential's public key bytes.
pub struct WebauthnRsVerifier {
    webauthn: Webauthn,
}

impl WebauthnRsVerifier {
    pub fn new(rp_id: &str, rp_origin: &str, rp_name: &str) -> Result<Self> {
        let origin = Url::parse(rp_origin)
            .map_err(|e| PeacemakingError::Config(format!("Invalid WebAuthn origin: {}", e)))?;
        let webauthn = WebauthnBuilder::new(rp_id, &origin)
            .map_err(|e| PeacemakingError::Config(format!("Invalid WebAuthn config: {}", e)))?
            .rp_name(rp_name)
            .build()
            .map_err(|e| PeacemakingError::Config(format!("Invalid WebAuthn config: {}", e)))?;
        Ok(Self { webauthn })
    }

    fn user_handle(user: &WebauthnUser) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, user.user_id.as_bytes())
    }

    fn passkeys(credentials: &[PasskeyCredential]) -> Result<Vec<Passkey>> {
        credentials
            .iter()
            .map(|c| {
                serde_json::from_slice::<Passkey>(&c.public_key).map_err(|e| {
                    PeacemakingError::Internal(format!("Stored passkey is unreadable: {}", e))
                })
            })
            .collect()
    }
}

impl WebauthnVerifier for WebauthnRsVerifier {
    fn begin_registration(
        &self,
        user: &WebauthnUser,
        existing: &[PasskeyCredential],
    ) -> Result<RegistrationStart> {
        let exclude = Self::passkeys(existing)?
            .iter()
            .map(|p| p.cred_id().clone())
            .collect::<Vec<_>>();
        let exclude = if exclude.is_empty() { None } else { Some(exclude) };

        let (options, state) = self
            .webauthn
            .start_passkey_registration(Self::user_handle(user), &user.email, &user.username, exclude)
            .map_err(|e| PeacemakingError::Internal(format!("WebAuthn registration start failed: {}", e)))?;

        Ok(RegistrationStart {
            options: serde_json::to_value(&options)
                .map_err(|e| PeacemakingError::Internal(e.to_string()))?,
            ceremony: serde_json::to_vec(&state)
                .map_err(|e| PeacemakingError::Internal(e.to_string()))?,
        })
    }

    fn finish_registration(
        &self,
        _user: &WebauthnUser,
        ceremony: &[u8],
        response: &[u8],
    ) -> Result<VerifiedCredential> {
        let state: PasskeyRegistration = serde_json::from_slice(ceremony)
            .map_err(|e| PeacemakingError::BadRequest(format!("Corrupt ceremony state: {}", e)))?;
        let response: RegisterPublicKeyCredential = serde_json::from_slice(response)
            .map_err(|e| PeacemakingError::BadRequest(format!("Invalid attestation: {}", e)))?;

        let passkey = self
            .webauthn
            .finish_passkey_registration(&response, &state)
            .map_err(|e| PeacemakingError::Unauthorized(format!("WebAuthn registration failed: {}", e)))?;

        // The attestation has been verified; its authenticator data is trusted
        let attestation_object: &[u8] = response.response.attestation_object.as_ref();
        let (aaguid, sign_count) = attested_authenticator(attestation_object)?;

        let credential_id: &[u8] = passkey.cred_id().as_ref();
        Ok(VerifiedCredential {
            credential_id: credential_id.to_vec(),
            public_key: serde_json::to_vec(&passkey)
                .map_err(|e| PeacemakingError::Internal(e.to_string()))?,
            aaguid,
            sign_count,
        })
    }

    fn begin_authentication(
        &self,
        _user: &WebauthnUser,
        credentials: &[PasskeyCredential],
    ) -> Result<AuthenticationStart> {
        let passkeys = Self::passkeys(credentials)?;
        let (options, state) = self
            .webauthn
            .start_passkey_authentication(&passkeys)
            .map_err(|e| PeacemakingError::Internal(format!("WebAuthn login start failed: {}", e)))?;

        Ok(AuthenticationStart {
            options: serde_json::to_value(&options)
                .map_err(|e| PeacemakingError::Internal(e.to_string()))?,
            ceremony: serde_json::to_vec(&state)
                .map_err(|e| PeacemakingError::Internal(e.to_string()))?,
        })
    }

    fn finish_authentication(
        &self,
        _user: &WebauthnUser,
        ceremony: &[u8],
        response: &[u8],
        credentials: &[PasskeyCredential],
    ) -> Result<VerifiedAssertion> {
        let state: PasskeyAuthentication = serde_json::from_slice(ceremony)
            .map_err(|e| PeacemakingError::BadRequest(format!("Corrupt ceremony state: {}", e)))?;
        let response: PublicKeyCredential = serde_json::from_slice(response)
            .map_err(|e| PeacemakingError::BadRequest(format!("Invalid assertion: {}", e)))?;

        let result = self
            .webauthn
            .finish_passkey_authentication(&response, &state)
            .map_err(|e| PeacemakingError::Unauthorized(format!("WebAuthn login failed: {}", e)))?;

        let credential_id: &[u8] = result.cred_id().as_ref();
        let mut public_key = None;
        for mut passkey in Self::passkeys(credentials)? {
            let stored: &[u8] = passkey.cred_id().as_ref();
            if stored == credential_id {
                if passkey.update_credential(&result).unwrap_or(false) {
                    public_key = Some(
                        serde_json::to_vec(&passkey)
                            .map_err(|e| PeacemakingError::Internal(e.to_string()))?,
                    );
                }
                break;
            }
        }

        Ok(VerifiedAssertion {
            credential_id: credential_id.to_vec(),
            sign_count: result.counter(),
            public_key,
        })
    }
}
