use crate::config::EngineConfig;
use crate::domain::audit::{AuditAction, PaymentAuditEntry};
use crate::domain::payment::{
    Amount, Payment, PaymentMethod, PaymentSource, PaymentStatus,
};
use crate::domain::ports::{
    Actor, AppointmentDirectoryBox, AuditLogBox, CardGatewayBox, PaymentStoreBox,
};
use crate::error::{PaymentError, Result};
use crate::processors::{
    CardProcessor, GiftCertificateProcessor, ManualProcessor, ProcessorOutcome, SourceProcessor,
};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

/// What a single payment attempt produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptOutcome {
    Completed,
    /// The card charge needs out-of-band customer authentication; the
    /// payment stays pending and the reconciler finalizes it.
    RequiresAction,
    Failed {
        reason: String,
        can_retry: bool,
        next_attempt: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub payment_id: Uuid,
    pub appointment_id: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub amount_applied: Option<Decimal>,
    pub external_ref: Option<String>,
    pub outcome: ReceiptOutcome,
}

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub appointment_id: String,
    pub amount: Decimal,
    pub source: PaymentSource,
    /// Caller-driven retry counter. Each call is exactly one attempt; the
    /// caller resubmits with the incremented value from the last receipt.
    pub retry_attempt: u32,
}

/// Owns the payment record's lifecycle: creates it, dispatches to the
/// matching source processor, applies the result and decides retry
/// eligibility. Audit writes are best-effort and never fail the caller.
pub struct PaymentOrchestrator {
    payments: PaymentStoreBox,
    audit_log: AuditLogBox,
    appointments: AppointmentDirectoryBox,
    gateway: CardGatewayBox,
    gift: GiftCertificateProcessor,
    card: CardProcessor,
    manual: ManualProcessor,
    config: EngineConfig,
}

impl PaymentOrchestrator {
    pub fn new(
        payments: PaymentStoreBox,
        audit_log: AuditLogBox,
        appointments: AppointmentDirectoryBox,
        gateway: CardGatewayBox,
        gift: GiftCertificateProcessor,
        card: CardProcessor,
        config: EngineConfig,
    ) -> Self {
        Self {
            payments,
            audit_log,
            appointments,
            gateway,
            gift,
            card,
            manual: ManualProcessor,
            config,
        }
    }

    /// Runs one payment attempt end to end.
    ///
    /// Validation, appointment lookup, tenant check and the
    /// one-payment-per-appointment rule all reject before anything is
    /// written. The pending row and its `source_selected` entry are
    /// persisted before the source is charged, so the decision survives a
    /// crash mid-charge.
    pub async fn process_payment(
        &self,
        request: PaymentRequest,
        actor: &Actor,
    ) -> Result<PaymentReceipt> {
        let amount = Amount::new(request.amount)?;
        if request.retry_attempt >= self.config.max_retries {
            return Err(PaymentError::RetryExhausted {
                attempt: request.retry_attempt,
                max: self.config.max_retries,
            });
        }

        let appointment = self
            .appointments
            .find(&request.appointment_id)
            .await?
            .ok_or_else(|| {
                PaymentError::NotFound(format!("appointment {}", request.appointment_id))
            })?;
        if appointment.tenant_id != actor.tenant_id {
            return Err(PaymentError::Unauthorized(
                "appointment belongs to another tenant".to_string(),
            ));
        }
        // A single payment may not exceed what the appointment owes; a
        // partially covered appointment takes the remainder as a further,
        // smaller payment.
        if amount.value() > appointment.amount_due {
            return Err(PaymentError::Validation(format!(
                "amount {} exceeds the appointment's amount due of {}",
                amount.value(),
                appointment.amount_due
            )));
        }

        let method = request.source.method();
        let mut payment = Payment::new(
            &request.appointment_id,
            &actor.tenant_id,
            amount,
            method,
            request.retry_attempt,
        );
        // Conflict detection happens inside the store's create, atomically
        // with the insert, so two racing submissions cannot both pass.
        self.payments.create(payment.clone()).await?;

        self.audit(
            payment.id,
            AuditAction::SourceSelected,
            json!({
                "source": method.as_str(),
                "selected_by": actor.user_id,
                "retry_attempt": request.retry_attempt,
                "amount": payment.amount,
            }),
        )
        .await;
        if let Some(action) = attempt_action(method) {
            self.audit(payment.id, action, json!({ "amount": payment.amount }))
                .await;
        }

        let processor = self.processor_for(&request.source);
        let outcome = processor.process(&payment, &request.source).await;
        payment.processor = Some(processor.name().to_string());

        match outcome {
            ProcessorOutcome::Approved {
                external_ref,
                amount_applied,
            } => {
                payment.external_ref = external_ref;
                payment.complete(amount_applied)?;
                self.payments.update(payment.clone()).await?;

                if let Some(reference) = &payment.external_ref {
                    self.audit(
                        payment.id,
                        AuditAction::GatewayChargeCreated,
                        json!({ "reference": reference }),
                    )
                    .await;
                }
                if let Some(action) = success_action(method) {
                    self.audit(payment.id, action, json!({ "amount_applied": amount_applied }))
                        .await;
                }
                self.audit(
                    payment.id,
                    AuditAction::PaymentSucceeded,
                    json!({ "amount_applied": amount_applied }),
                )
                .await;
                tracing::info!(
                    payment_id = %payment.id,
                    appointment_id = %payment.appointment_id,
                    method = %method,
                    applied = %amount_applied,
                    "payment completed"
                );

                Ok(receipt(&payment, ReceiptOutcome::Completed))
            }
            ProcessorOutcome::ActionRequired { external_ref } => {
                payment.external_ref = Some(external_ref.clone());
                self.payments.update(payment.clone()).await?;
                self.audit(
                    payment.id,
                    AuditAction::GatewayChargeCreated,
                    json!({ "reference": external_ref, "requires_action": true }),
                )
                .await;
                tracing::info!(
                    payment_id = %payment.id,
                    reference = %external_ref,
                    "charge requires customer authentication; awaiting gateway event"
                );

                Ok(receipt(&payment, ReceiptOutcome::RequiresAction))
            }
            ProcessorOutcome::Declined { reason } => {
                if let Some(action) = failure_action(method) {
                    self.audit(payment.id, action, json!({ "reason": reason })).await;
                }
                self.audit(
                    payment.id,
                    AuditAction::PaymentFailed,
                    json!({ "reason": reason }),
                )
                .await;
                self.rollback(&mut payment, &reason).await;

                let can_retry = request.retry_attempt + 1 < self.config.max_retries;
                tracing::warn!(
                    payment_id = %payment.id,
                    appointment_id = %payment.appointment_id,
                    method = %method,
                    %reason,
                    can_retry,
                    "payment attempt failed"
                );
                Ok(receipt(
                    &payment,
                    ReceiptOutcome::Failed {
                        reason,
                        can_retry,
                        next_attempt: request.retry_attempt + 1,
                    },
                ))
            }
        }
    }

    /// Starts a refund of a completed payment.
    ///
    /// Card refunds go through the gateway and stay `Completed` until the
    /// `ChargeRefunded` event lands; everything else settles on the spot.
    pub async fn initiate_refund(&self, payment_id: Uuid, actor: &Actor) -> Result<Payment> {
        let mut payment = self
            .payments
            .get(payment_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("payment {payment_id}")))?;
        if payment.tenant_id != actor.tenant_id {
            return Err(PaymentError::Unauthorized(
                "payment belongs to another tenant".to_string(),
            ));
        }
        if payment.status != PaymentStatus::Completed {
            return Err(PaymentError::InvalidTransition {
                from: payment.status,
                to: PaymentStatus::Refunded,
            });
        }

        self.audit(
            payment.id,
            AuditAction::RefundInitiated,
            json!({ "initiated_by": actor.user_id }),
        )
        .await;

        let refundable = payment.amount_applied.unwrap_or(payment.amount);
        match (&payment.method, &payment.external_ref) {
            (PaymentMethod::Card, Some(reference)) => {
                let refund_ref = self.gateway.create_refund(reference, refundable).await?;
                self.audit(
                    payment.id,
                    AuditAction::GatewayRefundCreated,
                    json!({ "reference": refund_ref, "amount": refundable }),
                )
                .await;
                tracing::info!(
                    payment_id = %payment.id,
                    reference = %refund_ref,
                    "gateway refund created; awaiting confirmation event"
                );
            }
            _ => {
                payment.refund()?;
                self.payments.update(payment.clone()).await?;
                self.audit(
                    payment.id,
                    AuditAction::RefundCompleted,
                    json!({ "amount": refundable }),
                )
                .await;
                tracing::info!(payment_id = %payment.id, "manual refund recorded");
            }
        }

        Ok(payment)
    }

    /// Marks the payment failed and records why. Fault-tolerant: a failed
    /// status write is itself audited, and nothing here ever raises. The
    /// processor failure being reported takes priority over rollback
    /// completeness.
    async fn rollback(&self, payment: &mut Payment, cause: &str) {
        if let Err(error) = payment.fail(cause) {
            tracing::error!(payment_id = %payment.id, %error, "rollback hit an illegal transition");
            self.audit(
                payment.id,
                AuditAction::RollbackFailed,
                json!({ "cause": cause, "error": error.to_string() }),
            )
            .await;
            return;
        }
        match self.payments.update(payment.clone()).await {
            Ok(()) => {
                self.audit(
                    payment.id,
                    AuditAction::PaymentRolledBack,
                    json!({ "cause": cause }),
                )
                .await;
            }
            Err(error) => {
                tracing::error!(
                    payment_id = %payment.id,
                    %error,
                    "failed to persist rollback status"
                );
                self.audit(
                    payment.id,
                    AuditAction::RollbackFailed,
                    json!({ "cause": cause, "error": error.to_string() }),
                )
                .await;
            }
        }
    }

    fn processor_for(&self, source: &PaymentSource) -> &dyn SourceProcessor {
        match source {
            PaymentSource::GiftCertificate { .. } => &self.gift,
            PaymentSource::Card(_) => &self.card,
            PaymentSource::Cash { .. } | PaymentSource::Other { .. } => &self.manual,
        }
    }

    /// Audit writes are swallowed on failure; they must never surface as
    /// the operation's error.
    async fn audit(&self, payment_id: Uuid, action: AuditAction, detail: serde_json::Value) {
        let entry = PaymentAuditEntry::new(payment_id, action, detail);
        if let Err(error) = self.audit_log.append(entry).await {
            tracing::warn!(%payment_id, action = %action, %error, "audit write failed");
        }
    }
}

fn receipt(payment: &Payment, outcome: ReceiptOutcome) -> PaymentReceipt {
    PaymentReceipt {
        payment_id: payment.id,
        appointment_id: payment.appointment_id.clone(),
        amount: payment.amount,
        method: payment.method,
        status: payment.status,
        amount_applied: payment.amount_applied,
        external_ref: payment.external_ref.clone(),
        outcome,
    }
}

fn attempt_action(method: PaymentMethod) -> Option<AuditAction> {
    match method {
        PaymentMethod::GiftCertificate => Some(AuditAction::GiftCertificatePaymentAttempt),
        PaymentMethod::Card => Some(AuditAction::CreditCardPaymentAttempt),
        PaymentMethod::Cash | PaymentMethod::Other => None,
    }
}

fn success_action(method: PaymentMethod) -> Option<AuditAction> {
    match method {
        PaymentMethod::GiftCertificate => Some(AuditAction::GiftCertificatePaymentSucceeded),
        PaymentMethod::Card => Some(AuditAction::CreditCardPaymentSucceeded),
        PaymentMethod::Cash | PaymentMethod::Other => Some(AuditAction::ManualPaymentProcessed),
    }
}

fn failure_action(method: PaymentMethod) -> Option<AuditAction> {
    match method {
        PaymentMethod::GiftCertificate => Some(AuditAction::GiftCertificatePaymentFailed),
        PaymentMethod::Card => Some(AuditAction::CreditCardPaymentFailed),
        PaymentMethod::Cash | PaymentMethod::Other => None,
    }
}
