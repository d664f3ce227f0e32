use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use payledger::application::orchestrator::{PaymentOrchestrator, PaymentRequest};
use payledger::application::reconciler::{GatewayEvent, GatewayEventKind, GatewayEventReconciler};
use payledger::config::EngineConfig;
use payledger::domain::certificate::{GiftCertificate, normalize_code};
use payledger::domain::payment::{Amount, CardDetails, PaymentMethod, PaymentSource, PaymentStatus};
use payledger::domain::ports::{
    Actor, Appointment, AppointmentDirectory, AuditLog, CertificateStore, PaymentStore, Role,
};
use payledger::infrastructure::gateway::{MockBehavior, MockCardGateway};
use payledger::infrastructure::in_memory::{
    InMemoryAppointmentDirectory, InMemoryAuditLog, InMemoryCertificateStore, InMemoryPaymentStore,
};
use payledger::interfaces::csv::command_reader::{
    CertificateSeedReader, CommandOp, CommandReader, EventField,
};
use payledger::interfaces::csv::payment_writer::PaymentWriter;
use payledger::processors::{CardProcessor, GiftCertificateProcessor};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    commands: PathBuf,

    /// Certificate seed CSV file loaded before processing
    #[arg(long)]
    certificates: Option<PathBuf>,

    /// Print each payment's audit trail after the report
    #[arg(long)]
    audit: bool,

    /// Scripted behavior of the card gateway stand-in
    #[arg(long, value_enum, default_value_t = GatewayBehaviorArg::Approve)]
    gateway_behavior: GatewayBehaviorArg,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GatewayBehaviorArg {
    Approve,
    Decline,
    RequireAction,
    Hang,
}

impl From<GatewayBehaviorArg> for MockBehavior {
    fn from(arg: GatewayBehaviorArg) -> Self {
        match arg {
            GatewayBehaviorArg::Approve => MockBehavior::AlwaysApprove,
            GatewayBehaviorArg::Decline => MockBehavior::AlwaysDecline,
            GatewayBehaviorArg::RequireAction => MockBehavior::RequireAction,
            GatewayBehaviorArg::Hang => MockBehavior::Hang,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let gateway = MockCardGateway::new(cli.gateway_behavior.into());

    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = &cli.db_path {
        let store = payledger::infrastructure::rocksdb::RocksDbStore::open(db_path)
            .into_diagnostic()?;
        return run(&cli, store.clone(), store.clone(), store, gateway).await;
    }

    run(
        &cli,
        InMemoryPaymentStore::new(),
        InMemoryCertificateStore::new(),
        InMemoryAuditLog::new(),
        gateway,
    )
    .await
}

async fn run<P, C, A>(
    cli: &Cli,
    payments: P,
    certificates: C,
    audit_log: A,
    gateway: MockCardGateway,
) -> Result<()>
where
    P: PaymentStore + Clone + 'static,
    C: CertificateStore + Clone + 'static,
    A: AuditLog + Clone + 'static,
{
    let config = EngineConfig::default();
    let directory = InMemoryAppointmentDirectory::new();
    let orchestrator = PaymentOrchestrator::new(
        Box::new(payments.clone()),
        Box::new(audit_log.clone()),
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
        GatewayEventReconciler::new(Box::new(payments.clone()), Box::new(audit_log.clone()));
    let actor = Actor {
        user_id: "cli".to_string(),
        tenant_id: "cli".to_string(),
        role: Role::Owner,
    };

    if let Some(path) = &cli.certificates {
        seed_certificates(path, &certificates).await?;
    }

    let file = File::open(&cli.commands).into_diagnostic()?;
    let reader = CommandReader::new(file);
    // Payment ids in submission order, paired with their appointment for
    // the optional audit printout.
    let mut tracked: Vec<(Uuid, String)> = Vec::new();

    for command in reader.commands() {
        let record = match command {
            Ok(record) => record,
            Err(e) => {
                eprintln!("Error reading command: {}", e);
                continue;
            }
        };
        match record.op {
            CommandOp::Charge => {
                let (Some(appointment), Some(amount), Some(method)) =
                    (record.appointment, record.amount, record.method)
                else {
                    eprintln!("Error processing payment: charge needs appointment, amount and method");
                    continue;
                };
                let source = match method {
                    PaymentMethod::GiftCertificate => match record.code {
                        Some(code) => PaymentSource::GiftCertificate { code },
                        None => {
                            eprintln!("Error processing payment: gift_certificate needs a code");
                            continue;
                        }
                    },
                    PaymentMethod::Card => PaymentSource::Card(test_card()),
                    PaymentMethod::Cash => PaymentSource::Cash { note: None },
                    PaymentMethod::Other => PaymentSource::Other { note: None },
                };

                if directory.find(&appointment).await.into_diagnostic()?.is_none() {
                    directory
                        .register(Appointment {
                            id: appointment.clone(),
                            tenant_id: actor.tenant_id.clone(),
                            amount_due: amount,
                        })
                        .await;
                }

                let request = PaymentRequest {
                    appointment_id: appointment.clone(),
                    amount,
                    source,
                    retry_attempt: record.attempt.unwrap_or(0),
                };
                match orchestrator.process_payment(request, &actor).await {
                    Ok(receipt) => tracked.push((receipt.payment_id, appointment)),
                    Err(e) => eprintln!("Error processing payment: {}", e),
                }
            }
            CommandOp::Event => {
                let (Some(reference), Some(event)) = (record.reference, record.event) else {
                    eprintln!("Error applying event: event needs a reference and a kind");
                    continue;
                };
                let kind = match event {
                    EventField::Succeeded => GatewayEventKind::ChargeSucceeded,
                    EventField::Failed => GatewayEventKind::ChargeFailed {
                        code: "card_declined".to_string(),
                        message: "declined by issuer".to_string(),
                    },
                    EventField::Refunded => GatewayEventKind::ChargeRefunded {
                        amount: record.amount.unwrap_or(Decimal::ZERO),
                    },
                };
                if let Err(e) = reconciler.apply(GatewayEvent { reference, kind }).await {
                    eprintln!("Error applying event: {}", e);
                }
            }
            CommandOp::Refund => {
                let Some(appointment) = record.appointment else {
                    eprintln!("Error processing refund: refund needs an appointment");
                    continue;
                };
                let existing = payments
                    .list_by_appointment(&appointment)
                    .await
                    .into_diagnostic()?;
                let Some(completed) = existing
                    .iter()
                    .rev()
                    .find(|p| p.status == PaymentStatus::Completed)
                else {
                    eprintln!("Error processing refund: appointment {} has no completed payment", appointment);
                    continue;
                };
                if let Err(e) = orchestrator.initiate_refund(completed.id, &actor).await {
                    eprintln!("Error processing refund: {}", e);
                }
            }
        }
    }

    // Re-read every tracked payment so the report reflects state changes
    // made after the charge, e.g. by gateway events.
    let mut final_payments = Vec::with_capacity(tracked.len());
    for (payment_id, _) in &tracked {
        if let Some(payment) = payments.get(*payment_id).await.into_diagnostic()? {
            final_payments.push(payment);
        }
    }

    let stdout = io::stdout();
    let mut writer = PaymentWriter::new(stdout.lock(), config.max_retries);
    writer.write_payments(final_payments).into_diagnostic()?;

    if cli.audit {
        for (payment_id, appointment) in &tracked {
            let entries = audit_log
                .list_by_payment(*payment_id)
                .await
                .into_diagnostic()?;
            for entry in entries {
                println!("audit,{},{}", appointment, entry.action);
            }
        }
    }

    Ok(())
}

async fn seed_certificates<C: CertificateStore>(path: &PathBuf, certificates: &C) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    let reader = CertificateSeedReader::new(file);
    for seed in reader.seeds() {
        let seed = match seed {
            Ok(seed) => seed,
            Err(e) => {
                eprintln!("Error reading certificate seed: {}", e);
                continue;
            }
        };
        let amount = Amount::new(seed.amount).into_diagnostic()?;
        let certificate = GiftCertificate::new(
            normalize_code(&seed.code),
            amount,
            "cli",
            seed.client,
            seed.expires_at,
        );
        if !certificates.create(certificate).await.into_diagnostic()? {
            eprintln!("Error reading certificate seed: duplicate code {}", seed.code);
        }
    }
    Ok(())
}

/// Card commands carry no card columns; the driver charges a fixed test card.
fn test_card() -> CardDetails {
    CardDetails {
        number: "4242424242424242".to_string(),
        exp_month: 12,
        exp_year: 2030,
        name: "CLI Test Card".to_string(),
    }
}
