//! Service container
//!
//! Wires the stores and ports into the services the routes call.

use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{AuthService, PasskeyService, SessionManager};
use crate::config::Args;
use crate::conversation::ConversationService;
use crate::interaction::InteractionService;
use crate::notifications::NotificationBus;
use crate::ports::{
    Clock, Eip191Verifier, LiveKitRoomService, MediaUrlValidator, OsRandom, RandomSource,
    RoomService, SignatureVerifier, StrictMediaValidator, SystemClock, UnconfiguredRoomService,
    WebauthnRsVerifier, WebauthnVerifier,
};
use crate::statistics::StatisticsService;
use crate::store::Stores;
use crate::types::Result;

/// Implementations of every external port
#[derive(Clone)]
pub struct Ports {
    pub clock: Arc<dyn Clock>,
    pub random: Arc<dyn RandomSource>,
    pub signatures: Arc<dyn SignatureVerifier>,
    pub webauthn: Arc<dyn WebauthnVerifier>,
    pub rooms: Arc<dyn RoomService>,
    pub media: Arc<dyn MediaUrlValidator>,
}

impl Ports {
    /// Production adapters configured from `args`
    pub fn from_args(args: &Args) -> Result<Self> {
        let webauthn = WebauthnRsVerifier::new(
            &args.webauthn_rp_id,
            &args.webauthn_rp_origin,
            &args.webauthn_rp_name,
        )?;

        let rooms: Arc<dyn RoomService> = match args.livekit() {
            Some(livekit) => {
                info!(host = %livekit.host, "Conferencing enabled");
                Arc::new(LiveKitRoomService::new(
                    &livekit.host,
                    &livekit.api_key,
                    &livekit.api_secret,
                ))
            }
            None => {
                warn!("LiveKit not configured, conversation rooms are disabled");
                Arc::new(UnconfiguredRoomService)
            }
        };

        Ok(Self {
            clock: Arc::new(SystemClock),
            random: Arc::new(OsRandom),
            signatures: Arc::new(Eip191Verifier),
            webauthn: Arc::new(webauthn),
            rooms,
            media: Arc::new(StrictMediaValidator),
        })
    }
}

/// Every service behind the HTTP routes
pub struct Services {
    pub sessions: Arc<SessionManager>,
    pub auth: Arc<AuthService>,
    pub passkeys: Arc<PasskeyService>,
    pub notifications: Arc<NotificationBus>,
    pub statistics: StatisticsService,
    pub interaction: Arc<InteractionService>,
    pub conversations: Arc<ConversationService>,
    /// "mongodb" or "memory"
    pub storage: &'static str,
}

impl Services {
    pub fn new(stores: Stores, ports: Ports) -> Self {
        let sessions = Arc::new(SessionManager::new(
            stores.sessions.clone(),
            ports.random.clone(),
            ports.clock.clone(),
        ));

        let auth = Arc::new(AuthService::new(
            stores.users.clone(),
            sessions.clone(),
            ports.signatures.clone(),
            ports.random.clone(),
            ports.clock.clone(),
        ));

        let passkeys = Arc::new(PasskeyService::new(
            stores.users.clone(),
            stores.passkeys.clone(),
            sessions.clone(),
            ports.webauthn.clone(),
            ports.clock.clone(),
        ));

        let notifications = Arc::new(NotificationBus::new(
            stores.notifications.clone(),
            ports.clock.clone(),
        ));

        let statistics = StatisticsService::new(
            stores.users.clone(),
            stores.expressions.clone(),
            stores.acknowledgements.clone(),
            stores.statistics.clone(),
            ports.clock.clone(),
        );

        let interaction = Arc::new(InteractionService::new(
            stores.expressions.clone(),
            stores.acknowledgements.clone(),
            stores.proofs.clone(),
            notifications.clone(),
            statistics.clone(),
            ports.media.clone(),
            ports.clock.clone(),
        ));

        let conversations = Arc::new(ConversationService::new(
            stores.conversations.clone(),
            ports.rooms.clone(),
            notifications.clone(),
            ports.clock.clone(),
        ));

        Self {
            sessions,
            auth,
            passkeys,
            notifications,
            statistics,
            interaction,
            conversations,
            storage: stores.backend,
        }
    }

    /// Services over `stores` with the production port adapters
    pub fn build(stores: Stores, args: &Args) -> Result<Self> {
        Ok(Self::new(stores, Ports::from_args(args)?))
    }
}
