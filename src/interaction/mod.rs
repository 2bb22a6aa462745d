//! Expressions, acknowledgements and proofs
//!
//! Every status change is a conditional update on the expected "from" state,
//! so concurrent or repeated transitions resolve to one success and
//! `Conflict` for the rest.

mod proofs;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{
    new_id, validate_content, Acknowledgement, AcknowledgementStatus, ContentMap, Expression,
    ExpressionStatus, Notification, NotificationType, Principal,
};
use crate::notifications::NotificationBus;
use crate::ports::{Clock, MediaUrlValidator};
use crate::statistics::StatisticsService;
use crate::store::{AcknowledgementStore, ExpressionStore, ProofStore};
use crate::types::{PeacemakingError, Result};

/// Default and maximum page sizes for expression listings
pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 200;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpression {
    pub content: ContentMap,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub on_chain_id: Option<i64>,
}

/// An expression with its acknowledgements, as listed to readers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionEntry {
    #[serde(flatten)]
    pub expression: Expression,
    pub acknowledgements: Vec<Acknowledgement>,
    pub active_acknowledgements: usize,
}

/// Hex SHA-256 over the canonical JSON of both contents
pub fn content_hash(expression: &ContentMap, acknowledgement: &ContentMap) -> Result<String> {
    #[derive(Serialize)]
    struct Canonical<'a> {
        expression: &'a ContentMap,
        acknowledgement: &'a ContentMap,
    }

    let bytes = serde_json::to_vec(&Canonical {
        expression,
        acknowledgement,
    })
    .map_err(|e| PeacemakingError::Internal(format!("content encoding failed: {}", e)))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

pub struct InteractionService {
    expressions: Arc<dyn ExpressionStore>,
    acknowledgements: Arc<dyn AcknowledgementStore>,
    proofs: Arc<dyn ProofStore>,
    bus: Arc<NotificationBus>,
    statistics: StatisticsService,
    media: Arc<dyn MediaUrlValidator>,
    clock: Arc<dyn Clock>,
}

impl InteractionService {
    pub fn new(
        expressions: Arc<dyn ExpressionStore>,
        acknowledgements: Arc<dyn AcknowledgementStore>,
        proofs: Arc<dyn ProofStore>,
        bus: Arc<NotificationBus>,
        statistics: StatisticsService,
        media: Arc<dyn MediaUrlValidator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            expressions,
            acknowledgements,
            proofs,
            bus,
            statistics,
            media,
            clock,
        }
    }

    /// Publish without letting a delivery failure reach the caller
    async fn notify(&self, notification: Notification) {
        let user_id = notification.user_id.clone();
        let kind = notification.kind;
        if let Err(e) = self.bus.publish(notification).await {
            warn!(user_id = %user_id, kind = kind.as_str(), error = %e, "Notification not delivered");
        }
    }

    fn validate(&self, content: &ContentMap) -> Result<()> {
        for medium in validate_content(content)? {
            if let Some(value) = content.get(medium.as_str()) {
                self.media.validate(medium, value)?;
            }
        }
        Ok(())
    }

    async fn expression(&self, id: &str) -> Result<Expression> {
        self.expressions
            .get(id)
            .await?
            .ok_or_else(|| PeacemakingError::NotFound(format!("expression {}", id)))
    }

    async fn acknowledgement(&self, id: &str) -> Result<Acknowledgement> {
        self.acknowledgements
            .get(id)
            .await?
            .ok_or_else(|| PeacemakingError::NotFound(format!("acknowledgement {}", id)))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub async fn create_expression(
        &self,
        principal: &Principal,
        input: NewExpression,
    ) -> Result<Expression> {
        self.validate(&input.content)?;

        let now = self.clock.now();
        let status = if input.hash.is_some() || input.on_chain_id.is_some() {
            ExpressionStatus::Confirmed
        } else {
            ExpressionStatus::Draft
        };
        let expression = Expression {
            id: new_id(),
            creator_id: principal.user_id.clone(),
            content: input.content,
            hash: input.hash,
            on_chain_id: input.on_chain_id,
            status,
            created_at: now,
            updated_at: now,
        };
        self.expressions.insert(&expression).await?;
        info!(user_id = %principal.user_id, expression_id = %expression.id, "Expression created");

        self.statistics.schedule_refresh();
        self.notify(
            Notification::new(
                &expression.creator_id,
                NotificationType::ExpressionConfirmed,
                "Expression recorded",
                "Your expression has been recorded",
                now,
            )
            .with("expressionId", expression.id.clone()),
        )
        .await;

        Ok(expression)
    }

    /// `draft -> confirmed`, creator only
    pub async fn confirm_expression(
        &self,
        principal: &Principal,
        id: &str,
        hash: Option<String>,
        on_chain_id: Option<i64>,
    ) -> Result<Expression> {
        let expression = self.expression(id).await?;
        if expression.creator_id != principal.user_id {
            return Err(PeacemakingError::Forbidden(
                "only the creator can confirm an expression".into(),
            ));
        }

        let now = self.clock.now();
        if !self.expressions.confirm(id, hash, on_chain_id, now).await? {
            return Err(PeacemakingError::Conflict("expression is already confirmed".into()));
        }

        self.notify(
            Notification::new(
                &expression.creator_id,
                NotificationType::ExpressionConfirmed,
                "Expression confirmed",
                "Your expression has been confirmed",
                now,
            )
            .with("expressionId", id),
        )
        .await;

        self.expression(id).await
    }

    async fn entry(&self, expression: Expression) -> Result<ExpressionEntry> {
        let acknowledgements = self
            .acknowledgements
            .list_for_expression(&expression.id)
            .await?;
        let active_acknowledgements = acknowledgements
            .iter()
            .filter(|a| a.status == AcknowledgementStatus::Active)
            .count();
        Ok(ExpressionEntry {
            expression,
            acknowledgements,
            active_acknowledgements,
        })
    }

    /// Newest first; `limit` defaults to 50 and is capped at 200
    pub async fn list_expressions(&self, limit: Option<usize>) -> Result<Vec<ExpressionEntry>> {
        let limit = limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        let mut entries = Vec::new();
        for expression in self.expressions.list_recent(limit).await? {
            entries.push(self.entry(expression).await?);
        }
        Ok(entries)
    }

    pub async fn get_expression(&self, id: &str) -> Result<ExpressionEntry> {
        let expression = self.expression(id).await?;
        self.entry(expression).await
    }

    pub async fn expressions_by_creator(&self, user_id: &str) -> Result<Vec<ExpressionEntry>> {
        let mut entries = Vec::new();
        for expression in self.expressions.list_by_creator(user_id).await? {
            entries.push(self.entry(expression).await?);
        }
        Ok(entries)
    }

    // =========================================================================
    // Acknowledgements
    // =========================================================================

    pub async fn create_acknowledgement(
        &self,
        principal: &Principal,
        expression_id: &str,
        content: ContentMap,
    ) -> Result<Acknowledgement> {
        let expression = self.expression(expression_id).await?;
        if expression.creator_id == principal.user_id {
            return Err(PeacemakingError::BadRequest(
                "cannot acknowledge your own expression".into(),
            ));
        }
        self.validate(&content)?;

        let now = self.clock.now();
        let acknowledgement = Acknowledgement {
            id: new_id(),
            expression_id: expression.id.clone(),
            acknowledger_id: principal.user_id.clone(),
            content,
            hash: None,
            on_chain_id: None,
            status: AcknowledgementStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.acknowledgements.insert(&acknowledgement).await?;
        info!(
            user_id = %principal.user_id,
            expression_id = %expression.id,
            acknowledgement_id = %acknowledgement.id,
            "Acknowledgement created"
        );

        self.statistics.schedule_refresh();
        self.notify(
            Notification::new(
                &expression.creator_id,
                NotificationType::NewAcknowledgement,
                "New acknowledgement",
                "Someone acknowledged your expression",
                now,
            )
            .with("expressionId", expression.id.clone())
            .with("acknowledgementId", acknowledgement.id.clone())
            .with("acknowledgerId", principal.user_id.clone()),
        )
        .await;
        self.notify(
            Notification::new(
                &principal.user_id,
                NotificationType::AcknowledgementConfirmed,
                "Acknowledgement recorded",
                "Your acknowledgement has been recorded",
                now,
            )
            .with("expressionId", expression.id)
            .with("acknowledgementId", acknowledgement.id.clone()),
        )
        .await;

        Ok(acknowledgement)
    }

    /// `active -> refuted`, acknowledger only
    pub async fn refute_acknowledgement(
        &self,
        principal: &Principal,
        id: &str,
    ) -> Result<Acknowledgement> {
        let acknowledgement = self.acknowledgement(id).await?;
        if acknowledgement.acknowledger_id != principal.user_id {
            return Err(PeacemakingError::Forbidden(
                "only the acknowledger can refute an acknowledgement".into(),
            ));
        }

        if !self
            .acknowledgements
            .transition(
                id,
                AcknowledgementStatus::Active,
                AcknowledgementStatus::Refuted,
                self.clock.now(),
            )
            .await?
        {
            return Err(PeacemakingError::Conflict(
                "acknowledgement is already refuted".into(),
            ));
        }

        info!(user_id = %principal.user_id, acknowledgement_id = %id, "Acknowledgement refuted");
        self.acknowledgement(id).await
    }
}
