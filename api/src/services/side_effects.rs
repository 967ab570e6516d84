//! Side-Effect Worker
//!
//! 온체인 기록과 메일 발송은 요청 경로에서 분리해 비동기 작업으로 실행한다.
//!
//! ```text
//!  handler ──enqueue──▶ [bounded mpsc] ──▶ SideEffectWorker
//!                                            │  retry (delay × attempt)
//!                                            ├─▶ LedgerClient / EmailSender
//!                                            └─▶ dead_letters (소진 / 영구 실패)
//! ```
//!
//! 작업이 성공한 뒤의 DB 갱신(해시, ledger entry)은 재시도하지 않는다.
//! 체인 트랜잭션이 이미 나갔으므로 다시 실행하면 중복 기록이 된다.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::ledger::{LedgerClient, LedgerError};
use super::mailer::{EmailMessage, EmailSender, MailError};
use crate::config::SideEffectConfig;
use crate::db::{MarketplaceStore, NewDeadLetter, NewLedgerEntry};
use crate::types::UsdAmount;

/// 비동기로 실행할 외부 작업
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffect {
    RecordSale {
        sale_id: i64,
        film_id: i64,
        distributor_id: i64,
        amount: UsdAmount,
    },
    AssignDdt {
        film_id: i64,
        distributor_id: i64,
    },
    ApproveFilm {
        film_id: i64,
    },
    SendEmail {
        message: EmailMessage,
    },
}

impl SideEffect {
    pub fn kind(&self) -> &'static str {
        match self {
            SideEffect::RecordSale { .. } => "record_sale",
            SideEffect::AssignDdt { .. } => "assign_ddt",
            SideEffect::ApproveFilm { .. } => "approve_film",
            SideEffect::SendEmail { .. } => "send_email",
        }
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

impl JobError {
    pub fn is_permanent(&self) -> bool {
        match self {
            JobError::Ledger(e) => e.is_permanent(),
            JobError::Mail(e) => e.is_permanent(),
        }
    }
}

/// 작업 큐 (handler 쪽 핸들)
#[derive(Clone)]
pub struct SideEffectQueue {
    sender: mpsc::Sender<SideEffect>,
    store: Arc<dyn MarketplaceStore>,
}

impl SideEffectQueue {
    pub fn channel(
        store: Arc<dyn MarketplaceStore>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<SideEffect>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender, store }, receiver)
    }

    /// 큐에 넣고 바로 반환. 큐가 가득 찼거나 닫혔으면 즉시 dead letter로 보낸다
    pub async fn enqueue(&self, effect: SideEffect) {
        let kind = effect.kind();
        match self.sender.try_send(effect) {
            Ok(()) => tracing::debug!(kind, "side effect enqueued"),
            Err(TrySendError::Full(effect)) => {
                tracing::warn!(kind, "side effect queue full");
                dead_letter(self.store.as_ref(), &effect, "side effect queue full", 0).await;
            }
            Err(TrySendError::Closed(effect)) => {
                tracing::error!(kind, "side effect worker is not running");
                dead_letter(self.store.as_ref(), &effect, "side effect queue closed", 0).await;
            }
        }
    }
}

pub struct SideEffectWorker {
    store: Arc<dyn MarketplaceStore>,
    ledger: Arc<dyn LedgerClient>,
    mailer: Arc<dyn EmailSender>,
    config: SideEffectConfig,
}

impl SideEffectWorker {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        ledger: Arc<dyn LedgerClient>,
        mailer: Arc<dyn EmailSender>,
        config: SideEffectConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            mailer,
            config,
        }
    }

    /// 모든 sender가 drop될 때까지 작업을 하나씩 처리
    pub async fn run(self, mut receiver: mpsc::Receiver<SideEffect>) {
        tracing::info!(
            max_attempts = self.config.max_attempts,
            retry_delay_ms = self.config.retry_delay.as_millis() as u64,
            "side effect worker started"
        );

        while let Some(effect) = receiver.recv().await {
            self.process(effect).await;
        }

        tracing::info!("side effect queue closed, worker stopping");
    }

    /// 재시도 포함 실행. 성공하면 true
    pub async fn process(&self, effect: SideEffect) -> bool {
        let kind = effect.kind();
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.execute(&effect).await {
                Ok(()) => {
                    tracing::info!(kind, attempt, "side effect completed");
                    return true;
                }
                Err(e) if e.is_permanent() || attempt >= max_attempts => {
                    tracing::error!(
                        kind,
                        attempt,
                        permanent = e.is_permanent(),
                        error = %e,
                        "side effect failed, moving to dead letters"
                    );
                    dead_letter(self.store.as_ref(), &effect, &e.to_string(), attempt).await;
                    return false;
                }
                Err(e) => {
                    let delay = backoff(self.config.retry_delay, attempt);
                    tracing::warn!(
                        kind,
                        attempt,
                        max_attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "side effect failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn execute(&self, effect: &SideEffect) -> Result<(), JobError> {
        match effect {
            SideEffect::RecordSale {
                sale_id,
                film_id,
                distributor_id,
                amount,
            } => {
                let tx_hash = self
                    .ledger
                    .record_sale(*film_id, *distributor_id, *amount)
                    .await?;

                if let Err(e) = self.store.set_sale_transaction_hash(*sale_id, &tx_hash).await {
                    tracing::error!(sale_id, %tx_hash, error = %e, "failed to store sale transaction hash");
                }
                self.append_ledger(NewLedgerEntry {
                    operation_type: "SALE".to_string(),
                    film_id: *film_id,
                    distributor_id: Some(*distributor_id),
                    notes: format!("Sale of ${} USD", amount),
                    transaction_hash: tx_hash,
                })
                .await;
            }

            SideEffect::AssignDdt {
                film_id,
                distributor_id,
            } => {
                let tx_hash = self.ledger.assign_ddt(*film_id, *distributor_id).await?;
                self.append_ledger(NewLedgerEntry {
                    operation_type: "ASSIGN".to_string(),
                    film_id: *film_id,
                    distributor_id: Some(*distributor_id),
                    notes: "DDT assigned to distributor".to_string(),
                    transaction_hash: tx_hash,
                })
                .await;
            }

            SideEffect::ApproveFilm { film_id } => {
                let tx_hash = self.ledger.approve_film(*film_id).await?;
                self.append_ledger(NewLedgerEntry {
                    operation_type: "APPROVE_FILM".to_string(),
                    film_id: *film_id,
                    distributor_id: None,
                    notes: "Film approved and DDTs minted".to_string(),
                    transaction_hash: tx_hash,
                })
                .await;
            }

            SideEffect::SendEmail { message } => {
                self.mailer.send(message).await?;
            }
        }

        Ok(())
    }

    async fn append_ledger(&self, entry: NewLedgerEntry) {
        if let Err(e) = self.store.insert_ledger_entry(&entry).await {
            tracing::error!(
                operation = %entry.operation_type,
                tx_hash = %entry.transaction_hash,
                error = %e,
                "failed to append ledger entry"
            );
        }
    }
}

/// 선형 backoff. 설정값이 커도 overflow 없이 포화
fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}

async fn dead_letter(store: &dyn MarketplaceStore, effect: &SideEffect, error: &str, attempts: u32) {
    let payload = match serde_json::to_value(effect) {
        Ok(v) => v,
        Err(e) => serde_json::json!({ "kind": effect.kind(), "serialization_error": e.to_string() }),
    };

    let letter = NewDeadLetter {
        job_kind: effect.kind().to_string(),
        payload,
        last_error: error.to_string(),
        attempts: i32::try_from(attempts).unwrap_or(i32::MAX),
    };

    if let Err(e) = store.insert_dead_letter(&letter).await {
        // 여기서 실패하면 작업이 사라진다. 로그에 payload를 남긴다
        tracing::error!(kind = effect.kind(), payload = %letter.payload, error = %e, "failed to store dead letter");
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::testing::{FlakyLedger, RecordingMailer};
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::NewSale;

    fn config(max_attempts: u32) -> SideEffectConfig {
        SideEffectConfig {
            max_attempts,
            retry_delay: Duration::from_millis(1),
            queue_capacity: 8,
        }
    }

    #[test]
    fn test_backoff_is_linear_and_saturates() {
        let base = Duration::from_millis(250);
        assert_eq!(backoff(base, 1), Duration::from_millis(250));
        assert_eq!(backoff(base, 4), Duration::from_secs(1));
        assert_eq!(backoff(Duration::MAX, 3), Duration::MAX);
        assert_eq!(backoff(Duration::from_millis(u64::MAX), u32::MAX), Duration::MAX);
    }

    async fn seed_sale(store: &MemoryStore) -> i64 {
        store
            .insert_sale(&NewSale {
                film_id: 1,
                distributor_id: 2,
                holding_id: None,
                sale_amount: UsdAmount::from_micros(9_990_000),
                buyer_email: None,
                payment_method: None,
                payment_reference: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_transient_failures_then_hash_is_set() {
        let store = Arc::new(MemoryStore::new());
        let sale_id = seed_sale(&store).await;
        let ledger = Arc::new(FlakyLedger::failing(2));
        let worker = SideEffectWorker::new(
            store.clone(),
            ledger.clone(),
            Arc::new(RecordingMailer::default()),
            config(5),
        );

        let ok = worker
            .process(SideEffect::RecordSale {
                sale_id,
                film_id: 1,
                distributor_id: 2,
                amount: UsdAmount::from_micros(9_990_000),
            })
            .await;

        assert!(ok);
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 3);
        let sale = &store.sales()[0];
        assert!(sale.transaction_hash.is_some());
        let entries = store.ledger_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation_type, "SALE");
        assert!(store.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_job_is_dead_lettered() {
        let store = Arc::new(MemoryStore::new());
        let sale_id = seed_sale(&store).await;
        let ledger = Arc::new(FlakyLedger::failing(100));
        let worker = SideEffectWorker::new(
            store.clone(),
            ledger.clone(),
            Arc::new(RecordingMailer::default()),
            config(3),
        );

        let ok = worker
            .process(SideEffect::RecordSale {
                sale_id,
                film_id: 1,
                distributor_id: 2,
                amount: UsdAmount::from_micros(1_000_000),
            })
            .await;

        assert!(!ok);
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 3);
        assert!(store.sales()[0].transaction_hash.is_none());

        let letters = store.dead_letters();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].job_kind, "record_sale");
        assert_eq!(letters[0].attempts, 3);
        assert_eq!(letters[0].payload["sale_id"], sale_id);
    }

    #[tokio::test]
    async fn test_permanent_error_skips_retries() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(FlakyLedger {
            permanent: true,
            ..FlakyLedger::default()
        });
        let worker = SideEffectWorker::new(
            store.clone(),
            ledger.clone(),
            Arc::new(RecordingMailer::default()),
            config(5),
        );

        assert!(!worker.process(SideEffect::ApproveFilm { film_id: 7 }).await);
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.dead_letters()[0].attempts, 1);
    }

    #[tokio::test]
    async fn test_run_drains_queue() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let (queue, receiver) = SideEffectQueue::channel(store.clone(), 8);
        let worker = SideEffectWorker::new(
            store.clone(),
            Arc::new(FlakyLedger::default()),
            mailer.clone(),
            config(3),
        );

        queue.enqueue(SideEffect::AssignDdt { film_id: 1, distributor_id: 2 }).await;
        queue
            .enqueue(SideEffect::SendEmail {
                message: EmailMessage {
                    to: "dist@example.com".into(),
                    subject: "hi".into(),
                    html: "<p>hi</p>".into(),
                },
            })
            .await;
        drop(queue);

        worker.run(receiver).await;

        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
        assert_eq!(store.ledger_entries()[0].operation_type, "ASSIGN");
    }

    #[tokio::test]
    async fn test_full_queue_dead_letters_immediately() {
        let store = Arc::new(MemoryStore::new());
        let (queue, _receiver) = SideEffectQueue::channel(store.clone(), 1);

        queue.enqueue(SideEffect::ApproveFilm { film_id: 1 }).await;
        queue.enqueue(SideEffect::ApproveFilm { film_id: 2 }).await;

        let letters = store.dead_letters();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].attempts, 0);
        assert_eq!(letters[0].payload["film_id"], 2);
    }

    #[test]
    fn test_payload_shape() {
        let value = serde_json::to_value(SideEffect::AssignDdt {
            film_id: 3,
            distributor_id: 4,
        })
        .unwrap();
        assert_eq!(value["kind"], "assign_ddt");
        assert_eq!(value["distributor_id"], 4);
    }
}
