//! Asynchronous delivery queue
//!
//! Decouples post creation from federation delivery: the request handler
//! enqueues a job and returns immediately, a pool of background workers
//! builds, signs and transmits the Create activity later.
//!
//! Jobs move Enqueued → Running → {Completed | Failed}. There is no
//! retry, persistence or dead-letter handling; jobs are lost on process
//! crash and in-flight jobs may be abandoned at shutdown.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::data::{Database, DeliveryJob, UserScope};
use crate::error::AppError;
use crate::federation::{DeliveryClient, activity, unique_inbox_targets};

/// Terminal and intermediate states of a delivery job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Enqueued,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Shared context for delivery workers
struct WorkerContext {
    db: Arc<Database>,
    client: DeliveryClient,
    /// Instance base URL; every generated id derives from it
    base_url: String,
}

/// In-process delivery queue with a fixed worker pool
///
/// Started once per process before any job is accepted; `shutdown`
/// closes the channel and drains the workers.
pub struct DeliveryQueue {
    sender: StdMutex<Option<mpsc::UnboundedSender<DeliveryJob>>>,
    workers: StdMutex<Vec<JoinHandle<()>>>,
}

impl DeliveryQueue {
    /// Start the queue and spawn the worker pool
    ///
    /// # Arguments
    /// * `worker_count` - Number of concurrent delivery workers
    /// * `db` - Shared database handle
    /// * `client` - Outbound delivery client
    /// * `base_url` - Instance base URL for generated ids
    pub fn start(
        worker_count: usize,
        db: Arc<Database>,
        client: DeliveryClient,
        base_url: String,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<DeliveryJob>();
        let receiver = Arc::new(Mutex::new(receiver));
        let context = Arc::new(WorkerContext {
            db,
            client,
            base_url,
        });

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let receiver = receiver.clone();
            let context = context.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    // Workers share one receiver; the lock is held only
                    // while waiting for the next job.
                    let job = receiver.lock().await.recv().await;
                    let Some(job) = job else {
                        break;
                    };

                    tracing::debug!(
                        worker_id,
                        post_id = %job.post_id,
                        state = JobState::Running.as_str(),
                        "Delivery job dequeued"
                    );

                    match run_job(&context, &job).await {
                        Ok(delivered) => {
                            tracing::info!(
                                worker_id,
                                post_id = %job.post_id,
                                delivered,
                                state = JobState::Completed.as_str(),
                                "Delivery job completed"
                            );
                        }
                        Err(error) => {
                            tracing::warn!(
                                worker_id,
                                post_id = %job.post_id,
                                %error,
                                state = JobState::Failed.as_str(),
                                "Delivery job failed"
                            );
                        }
                    }
                }

                tracing::debug!(worker_id, "Delivery worker stopped");
            }));
        }

        tracing::info!(worker_count, "Delivery queue started");

        Self {
            sender: StdMutex::new(Some(sender)),
            workers: StdMutex::new(workers),
        }
    }

    /// Enqueue a delivery job
    ///
    /// Non-blocking; returns immediately regardless of target
    /// reachability. Fails only when the queue has been shut down.
    pub fn enqueue(&self, job: DeliveryJob) -> Result<(), AppError> {
        let sender = self.sender.lock().expect("delivery queue lock poisoned");

        let Some(sender) = sender.as_ref() else {
            return Err(AppError::Delivery(
                "delivery queue is not running".to_string(),
            ));
        };

        tracing::debug!(
            post_id = %job.post_id,
            state = JobState::Enqueued.as_str(),
            "Delivery job enqueued"
        );

        sender
            .send(job)
            .map_err(|_| AppError::Delivery("delivery queue is not running".to_string()))
    }

    /// Stop accepting jobs, drain the channel and join the workers
    ///
    /// Jobs already enqueued are still processed; a job mid-delivery when
    /// the process is killed is abandoned.
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .expect("delivery queue lock poisoned")
            .take();
        drop(sender);

        let workers = {
            let mut guard = self.workers.lock().expect("delivery queue lock poisoned");
            std::mem::take(&mut *guard)
        };

        for worker in workers {
            let _ = worker.await;
        }

        tracing::info!("Delivery queue stopped");
    }
}

/// Execute a single delivery job
///
/// Loads the author and their signing key, builds the Create activity and
/// delivers it sequentially to each distinct follower inbox.
///
/// # Returns
/// Number of inboxes delivered to.
async fn run_job(context: &WorkerContext, job: &DeliveryJob) -> Result<usize, AppError> {
    let record = context
        .db
        .find_user(&job.username, &UserScope::Local)
        .await?
        .ok_or_else(|| AppError::Delivery(format!("unknown local author: {}", job.username)))?;

    let key = record
        .key
        .ok_or_else(|| AppError::Signing(format!("no key pair for user {}", job.username)))?;
    let private_key_pem = key
        .private_key_pem
        .as_deref()
        .ok_or_else(|| AppError::Signing(format!("no private key for user {}", job.username)))?;

    // The post URL doubles as the Note id; ids derive from the one
    // configured base URL so they match what the HTTP surface serves.
    let note = activity::note(
        &activity::post_url(&context.base_url, &job.post_id),
        &record.user.url,
        &job.content,
    );
    let create = activity::create(
        &activity::activity_url(&context.base_url, &job.post_id),
        &record.user.url,
        note,
    );

    let inboxes = context.db.follower_inboxes(&record.user.id).await?;
    let targets = unique_inbox_targets(inboxes);

    if targets.is_empty() {
        tracing::debug!(post_id = %job.post_id, "No follower inboxes; nothing to deliver");
        return Ok(0);
    }

    let mut delivered = 0usize;
    let mut first_error = None;

    for inbox in &targets {
        match context
            .client
            .signed_post(inbox, &create, &key.id, private_key_pem)
            .await
        {
            Ok(receipt) => {
                delivered += 1;
                tracing::debug!(inbox = %inbox, status = receipt.status, "Inbox accepted activity");
            }
            Err(error) => {
                tracing::warn!(inbox = %inbox, %error, "Inbox delivery failed");
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }

    match first_error {
        None => Ok(delivered),
        Some(error) => Err(error),
    }
}
