//! Webhook dispatch: match, sign, enqueue, send.
//!
//! ```text
//! dispatcher.dispatch(event, data)
//!   ├─ registry.matching(event)            // active && events.contains(event)
//!   ├─ Envelope::new() + to_json()          // once; every subscriber gets the same bytes
//!   └─ for each match:
//!        ├─ sign_payload()                  // HMAC-SHA256, only with a secret
//!        └─ send_tx.try_send(request) ───────────────────┐
//!                                                         │
//!             ┌───────────────────────────────────────────┘
//!             ▼
//!        run_sender (spawned task):
//!             ├─ recv from send_rx
//!             ├─ acquire semaphore permit (caps concurrency)
//!             └─ spawn deliver()
//!                  ├─ HTTP POST (+ optional retries)
//!                  └─ log, count, record in DeliveryLog
//! ```
//!
//! `dispatch` never blocks and never reports delivery results to its caller. A full channel
//! drops the delivery. On shutdown the sender stops accepting requests but still sends what was
//! already queued, then waits for in-flight sends up to `webhooks.shutdown_grace_period`.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::{RetryConfig, WebhookConfig};
use crate::types::abbrev_id;
use crate::webhooks::delivery::{self, DeliveryError, DeliveryRecord, HeaderNames, WebhookSendRequest};
use crate::webhooks::delivery_log::DeliveryLog;
use crate::webhooks::events::{Envelope, WebhookEventType};
use crate::webhooks::registry::{Subscription, SubscriptionRegistry};

#[derive(Clone)]
pub struct WebhookDispatcher {
    registry: Arc<SubscriptionRegistry>,
    send_tx: mpsc::Sender<WebhookSendRequest>,
    header_names: Arc<HeaderNames>,
    http_client: reqwest::Client,
    delivery_log: Arc<DeliveryLog>,
}

impl WebhookDispatcher {
    /// Create a new dispatcher and spawn the background sender task.
    ///
    /// The returned handle resolves once the sender has stopped after `shutdown` is cancelled (or
    /// every dispatcher clone is dropped) and its remaining deliveries are finished.
    pub fn spawn(
        registry: Arc<SubscriptionRegistry>,
        config: &WebhookConfig,
        product_name: &str,
        shutdown: CancellationToken,
    ) -> Result<(Self, JoinHandle<()>), reqwest::Error> {
        let (send_tx, send_rx) = mpsc::channel::<WebhookSendRequest>(config.channel_capacity);

        let http_client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let delivery_log = Arc::new(DeliveryLog::new(config.delivery_log_capacity));

        let context = SendContext {
            http_client: http_client.clone(),
            retry: Arc::new(config.retry.clone()),
            delivery_log: delivery_log.clone(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_sends)),
        };
        let sender = tokio::spawn(run_sender(send_rx, context, config.shutdown_grace_period, shutdown));

        let dispatcher = Self {
            registry,
            send_tx,
            header_names: Arc::new(HeaderNames::for_product(product_name)),
            http_client,
            delivery_log,
        };
        Ok((dispatcher, sender))
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn delivery_log(&self) -> &Arc<DeliveryLog> {
        &self.delivery_log
    }

    /// Fan an event out to every active subscription listening for it.
    ///
    /// Returns the number of deliveries handed to the sender task. Subscriptions whose request
    /// could not be signed or enqueued are logged and skipped.
    pub fn dispatch(&self, event: WebhookEventType, data: serde_json::Value) -> usize {
        let subscriptions = self.registry.matching(event.as_str());
        if subscriptions.is_empty() {
            tracing::debug!(event = %event, "No subscriptions for event");
            return 0;
        }

        let envelope = Envelope::new(event, data);
        let body = match envelope.to_json() {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(event = %event, error = %e, "Failed to serialize webhook envelope");
                return 0;
            }
        };

        counter!("fwdhooks_webhook_events_dispatched_total", "event" => event.as_str()).increment(1);

        let mut scheduled = 0;
        for subscription in &subscriptions {
            let request = match WebhookSendRequest::build(subscription, &envelope, &body, &self.header_names) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(
                        subscription_id = %subscription.id,
                        event = %event,
                        error = %e,
                        "Failed to sign webhook payload, skipping delivery"
                    );
                    continue;
                }
            };

            if let Err(e) = self.send_tx.try_send(request) {
                counter!("fwdhooks_webhook_deliveries_dropped_total").increment(1);
                tracing::warn!(
                    subscription_id = %subscription.id,
                    event = %event,
                    "Failed to push to sender channel, dropping delivery: {}",
                    e
                );
                continue;
            }
            scheduled += 1;
        }

        tracing::debug!(event = %event, matched = subscriptions.len(), scheduled, "Dispatched webhook event");
        scheduled
    }

    /// Send a `test.webhook` envelope to one subscription and wait for the single attempt.
    ///
    /// Ignores the subscription's event filter and active flag, and bypasses the sender queue.
    pub async fn send_test(&self, subscription: &Subscription) -> Result<DeliveryRecord, DeliveryError> {
        let envelope = Envelope::new(
            WebhookEventType::TestWebhook,
            serde_json::json!({
                "message": "This is a test webhook",
                "subscription_id": subscription.id,
            }),
        );
        let body = envelope.to_json()?;
        let request = WebhookSendRequest::build(subscription, &envelope, &body, &self.header_names)?;

        let single_attempt = RetryConfig {
            max_attempts: 1,
            ..Default::default()
        };
        let record = delivery::deliver(&self.http_client, &request, &single_attempt).await;
        report(&record);
        self.delivery_log.record(record.clone());
        Ok(record)
    }
}

/// Log and count a finished delivery.
fn report(record: &DeliveryRecord) {
    if record.success {
        counter!("fwdhooks_webhook_deliveries_total", "outcome" => "success").increment(1);
        tracing::debug!(
            subscription_id = %abbrev_id(&record.subscription_id),
            event = %record.event,
            status = record.status_code,
            attempts = record.attempts,
            "Webhook delivered successfully"
        );
    } else {
        counter!("fwdhooks_webhook_deliveries_total", "outcome" => "failure").increment(1);
        tracing::warn!(
            subscription_id = %abbrev_id(&record.subscription_id),
            url = %record.url,
            event = %record.event,
            status_code = ?record.status_code,
            error = ?record.error,
            attempts = record.attempts,
            "Webhook delivery failed"
        );
    }
}

// --- Sender task ---

/// Everything a spawned send needs. Holds no registry access and no secrets.
struct SendContext {
    http_client: reqwest::Client,
    retry: Arc<RetryConfig>,
    delivery_log: Arc<DeliveryLog>,
    semaphore: Arc<Semaphore>,
}

impl SendContext {
    /// Wait for a concurrency permit, then spawn the delivery into `in_flight`.
    async fn spawn_delivery(&self, in_flight: &mut JoinSet<()>, request: WebhookSendRequest) {
        // The semaphore is never closed
        let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
            return;
        };

        let client = self.http_client.clone();
        let retry = self.retry.clone();
        let log = self.delivery_log.clone();

        in_flight.spawn(async move {
            let _permit = permit;
            let record = delivery::deliver(&client, &request, &retry).await;
            report(&record);
            log.record(record);
        });
    }
}

fn reap(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result
        && !e.is_cancelled()
    {
        tracing::error!("Webhook send task panicked: {}", e);
    }
}

/// Long-lived task that receives signed requests and performs HTTP delivery.
///
/// On shutdown the channel is closed, requests already queued are still sent, and in-flight
/// sends are awaited for up to `grace_period`. Whatever is left after that is counted and logged
/// as abandoned.
async fn run_sender(
    mut rx: mpsc::Receiver<WebhookSendRequest>,
    context: SendContext,
    grace_period: Duration,
    shutdown: CancellationToken,
) {
    let mut in_flight = JoinSet::new();

    loop {
        while let Some(result) = in_flight.try_join_next() {
            reap(result);
        }

        let request = tokio::select! {
            req = rx.recv() => {
                match req {
                    Some(r) => r,
                    None => {
                        tracing::debug!("Webhook sender channel closed, shutting down");
                        break;
                    }
                }
            }
            _ = shutdown.cancelled() => {
                tracing::debug!("Webhook sender received shutdown signal");
                break;
            }
        };

        context.spawn_delivery(&mut in_flight, request).await;
    }

    rx.close();
    let flush = async {
        let mut flushed = 0usize;
        while let Some(request) = rx.recv().await {
            context.spawn_delivery(&mut in_flight, request).await;
            flushed += 1;
        }
        if flushed > 0 || !in_flight.is_empty() {
            tracing::info!(
                queued = flushed,
                in_flight = in_flight.len(),
                "Finishing webhook deliveries before shutdown"
            );
        }
        while let Some(result) = in_flight.join_next().await {
            reap(result);
        }
    };

    let finished = tokio::time::timeout(grace_period, flush).await;
    if finished.is_err() {
        let mut abandoned = in_flight.len();
        while rx.try_recv().is_ok() {
            abandoned += 1;
        }
        in_flight.abort_all();
        counter!("fwdhooks_webhook_deliveries_abandoned_total").increment(abandoned as u64);
        tracing::warn!(
            abandoned,
            grace_period_ms = grace_period.as_millis() as u64,
            "Shutdown grace period elapsed, abandoning webhook deliveries"
        );
    }

    tracing::debug!("Webhook sender task exited");
}
