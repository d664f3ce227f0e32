#![allow(dead_code)]

use payledger::application::ledger::CertificateLedger;
use payledger::application::orchestrator::PaymentOrchestrator;
use payledger::application::reconciler::GatewayEventReconciler;
use payledger::config::EngineConfig;
use payledger::domain::certificate::GiftCertificate;
use payledger::domain::payment::Amount;
use payledger::domain::ports::{Actor, Appointment, CertificateStore, Role};
use payledger::infrastructure::gateway::{MockBehavior, MockCardGateway};
use payledger::infrastructure::in_memory::{
    InMemoryAppointmentDirectory, InMemoryAuditLog, InMemoryCertificateStore, InMemoryPaymentStore,
};
use payledger::processors::{CardProcessor, GiftCertificateProcessor};
use rust_decimal::Decimal;

/// Fully wired engine over in-memory stores. The store handles are kept
/// around so tests can inspect state behind the services' backs.
pub struct TestEngine {
    pub orchestrator: PaymentOrchestrator,
    pub reconciler: GatewayEventReconciler,
    pub ledger: CertificateLedger,
    pub payments: InMemoryPaymentStore,
    pub certificates: InMemoryCertificateStore,
    pub audit: InMemoryAuditLog,
    pub directory: InMemoryAppointmentDirectory,
    pub config: EngineConfig,
}

impl TestEngine {
    pub fn new(behavior: MockBehavior) -> Self {
        Self::with_config(behavior, EngineConfig::default())
    }

    pub fn with_config(behavior: MockBehavior, config: EngineConfig) -> Self {
        let payments = InMemoryPaymentStore::new();
        let certificates = InMemoryCertificateStore::new();
        let audit = InMemoryAuditLog::new();
        let directory = InMemoryAppointmentDirectory::new();
        let gateway = MockCardGateway::new(behavior);

        let orchestrator = PaymentOrchestrator::new(
            Box::new(payments.clone()),
            Box::new(audit.clone()),
            Box::new(directory.clone()),
            Box::new(gateway.clone()),
            GiftCertificateProcessor::new(Box::new(certificates.clone())),
            CardProcessor::new(
                Box::new(gateway.clone()),
                config.card_minimum,
                config.gateway_timeout,
            ),
            config.clone(),
        );
        let reconciler =
            GatewayEventReconciler::new(Box::new(payments.clone()), Box::new(audit.clone()));
        let ledger =
            CertificateLedger::new(Box::new(certificates.clone()), config.max_code_attempts);

        Self {
            orchestrator,
            reconciler,
            ledger,
            payments,
            certificates,
            audit,
            directory,
            config,
        }
    }

    pub async fn register_appointment(&self, id: &str, amount_due: Decimal) {
        self.directory
            .register(Appointment {
                id: id.to_string(),
                tenant_id: "salon-1".to_string(),
                amount_due,
            })
            .await;
    }

    pub async fn seed_certificate(&self, code: &str, amount: Decimal) -> GiftCertificate {
        let certificate = GiftCertificate::new(
            code.to_string(),
            Amount::new(amount).unwrap(),
            "salon-1",
            None,
            None,
        );
        assert!(self.certificates.create(certificate.clone()).await.unwrap());
        certificate
    }
}

pub fn owner() -> Actor {
    Actor {
        user_id: "owner-1".to_string(),
        tenant_id: "salon-1".to_string(),
        role: Role::Owner,
    }
}

pub fn staff() -> Actor {
    Actor {
        user_id: "staff-1".to_string(),
        tenant_id: "salon-1".to_string(),
        role: Role::Staff,
    }
}
