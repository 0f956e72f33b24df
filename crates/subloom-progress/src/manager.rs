//! Subscription set manager.
//!
//! # Design
//! - The set of open subscriptions is diffed against each running-job snapshot;
//!   jobs present in both sets keep their stream untouched.
//! - A job whose stream already finished is not re-opened while the backend still
//!   lists it as running; the marker is cleared once the job leaves the running set.
//! - After `shutdown` the manager is a no-op sink for snapshots and messages.

use std::collections::{BTreeSet, HashMap, HashSet};

use subloom_api_models::Job;
use subloom_events::{JobId, StreamMessage};
use tracing::{debug, info};

use crate::listing::running_ids;
use crate::reducer::{JobProgress, Transition};
use crate::subscription::{StreamConnector, StreamHandle, SubscriptionKey};

/// Open/close actions issued by one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    /// Jobs that received a new subscription, ascending.
    pub opened: Vec<JobId>,
    /// Jobs whose subscription was closed, ascending.
    pub closed: Vec<JobId>,
}

impl ReconcileReport {
    /// Whether the pass changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.opened.is_empty() && self.closed.is_empty()
    }
}

/// Effect of routing one stream message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The message belonged to no current subscription, or the manager is shut down.
    Ignored,
    /// The message updated the job's progress.
    Applied,
    /// The message ended the job's stream; its subscription was closed.
    Finished {
        /// Job whose stream ended.
        job_id: JobId,
        /// Terminal transition reported by the reducer.
        transition: Transition,
    },
}

struct Subscription<H> {
    generation: u64,
    handle: H,
}

/// Keeps exactly one stream open per running job.
pub struct SubscriptionManager<C: StreamConnector> {
    connector: C,
    subscriptions: HashMap<JobId, Subscription<C::Handle>>,
    progress: HashMap<JobId, JobProgress>,
    finished: HashSet<JobId>,
    next_generation: u64,
    shut_down: bool,
}

impl<C: StreamConnector> SubscriptionManager<C> {
    /// Create an empty manager around a connector.
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            subscriptions: HashMap::new(),
            progress: HashMap::new(),
            finished: HashSet::new(),
            next_generation: 1,
            shut_down: false,
        }
    }

    /// Reconcile against a polled job list.
    pub fn reconcile_jobs(&mut self, jobs: &[Job]) -> ReconcileReport {
        let running = running_ids(jobs);
        self.reconcile(&running)
    }

    /// Reconcile against the current set of running job ids.
    pub fn reconcile(&mut self, running: &BTreeSet<JobId>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        if self.shut_down {
            return report;
        }

        let mut stale: Vec<JobId> = self
            .subscriptions
            .keys()
            .filter(|id| !running.contains(*id))
            .cloned()
            .collect();
        stale.sort();
        for job_id in stale {
            if let Some(mut subscription) = self.subscriptions.remove(&job_id) {
                subscription.handle.close();
                info!(job_id = %job_id, generation = subscription.generation, "closed progress subscription");
            }
            self.progress.remove(&job_id);
            report.closed.push(job_id);
        }

        self.finished.retain(|id| running.contains(id));
        self.progress
            .retain(|id, _| running.contains(id) || self.subscriptions.contains_key(id));

        for job_id in running {
            if self.subscriptions.contains_key(job_id) || self.finished.contains(job_id) {
                continue;
            }
            let key = SubscriptionKey::new(job_id.clone(), self.next_generation);
            self.next_generation = self.next_generation.saturating_add(1);
            let handle = self.connector.open(&key);
            info!(subscription = %key, "opened progress subscription");
            self.subscriptions.insert(
                job_id.clone(),
                Subscription {
                    generation: key.generation,
                    handle,
                },
            );
            self.progress.insert(job_id.clone(), JobProgress::new());
            report.opened.push(job_id.clone());
        }

        report
    }

    /// Route a stream message to the job it belongs to.
    pub fn handle(&mut self, key: &SubscriptionKey, message: StreamMessage) -> MessageOutcome {
        if self.shut_down {
            return MessageOutcome::Ignored;
        }
        let current = self
            .subscriptions
            .get(&key.job_id)
            .is_some_and(|subscription| subscription.generation == key.generation);
        if !current {
            debug!(subscription = %key, "dropping message for inactive subscription");
            return MessageOutcome::Ignored;
        }

        let progress = self.progress.entry(key.job_id.clone()).or_default();
        let Some(transition) = progress.apply_message(message) else {
            return MessageOutcome::Applied;
        };

        if let Some(mut subscription) = self.subscriptions.remove(&key.job_id) {
            subscription.handle.close();
        }
        self.finished.insert(key.job_id.clone());
        match &transition {
            Transition::Completed => info!(subscription = %key, "progress stream completed"),
            Transition::Failed { message } => {
                info!(subscription = %key, reason = %message, "progress stream failed");
            }
        }
        MessageOutcome::Finished {
            job_id: key.job_id.clone(),
            transition,
        }
    }

    /// Streamed progress for a job, while the job is tracked.
    #[must_use]
    pub fn progress(&self, job_id: &JobId) -> Option<&JobProgress> {
        self.progress.get(job_id)
    }

    /// Whether the job currently has an open stream.
    #[must_use]
    pub fn is_subscribed(&self, job_id: &JobId) -> bool {
        self.subscriptions.contains_key(job_id)
    }

    /// Ids with an open stream, ascending.
    #[must_use]
    pub fn subscribed_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.subscriptions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of open streams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether no stream is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Whether [`Self::shutdown`] has run.
    #[must_use]
    pub const fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Borrow the connector.
    #[must_use]
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Close every stream and ignore all later input.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        let count = self.subscriptions.len();
        for (_, mut subscription) in self.subscriptions.drain() {
            subscription.handle.close();
        }
        self.progress.clear();
        self.finished.clear();
        debug!(closed = count, "subscription manager shut down");
    }
}

impl<C: StreamConnector> Drop for SubscriptionManager<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use subloom_events::ProgressEvent;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Action {
        Open(SubscriptionKey),
        Close(SubscriptionKey),
    }

    type Log = Rc<RefCell<Vec<Action>>>;

    struct LoggedHandle {
        key: SubscriptionKey,
        log: Log,
        closed: bool,
    }

    impl StreamHandle for LoggedHandle {
        fn close(&mut self) {
            if !self.closed {
                self.closed = true;
                self.log.borrow_mut().push(Action::Close(self.key.clone()));
            }
        }
    }

    #[derive(Default)]
    struct LoggedConnector {
        log: Log,
    }

    impl StreamConnector for LoggedConnector {
        type Handle = LoggedHandle;

        fn open(&mut self, key: &SubscriptionKey) -> Self::Handle {
            self.log.borrow_mut().push(Action::Open(key.clone()));
            LoggedHandle {
                key: key.clone(),
                log: Rc::clone(&self.log),
                closed: false,
            }
        }
    }

    fn ids(values: &[&str]) -> BTreeSet<JobId> {
        values.iter().map(|value| JobId::from(*value)).collect()
    }

    fn job_ids(values: &[&str]) -> Vec<JobId> {
        values.iter().map(|value| JobId::from(*value)).collect()
    }

    fn manager() -> (SubscriptionManager<LoggedConnector>, Log) {
        let connector = LoggedConnector::default();
        let log = Rc::clone(&connector.log);
        (SubscriptionManager::new(connector), log)
    }

    fn key_for(manager: &SubscriptionManager<LoggedConnector>, job: &str) -> SubscriptionKey {
        let job_id = JobId::from(job);
        let generation = manager
            .subscriptions
            .get(&job_id)
            .map(|subscription| subscription.generation)
            .expect("subscription exists");
        SubscriptionKey::new(job_id, generation)
    }

    #[test]
    fn replacing_one_running_job_leaves_the_other_untouched() {
        let (mut manager, log) = manager();
        let first = manager.reconcile(&ids(&["J1", "J2"]));
        assert_eq!(first.opened, job_ids(&["J1", "J2"]));
        let j2_key = key_for(&manager, "J2");
        log.borrow_mut().clear();

        let second = manager.reconcile(&ids(&["J2", "J3"]));
        assert_eq!(second.opened, job_ids(&["J3"]));
        assert_eq!(second.closed, job_ids(&["J1"]));
        assert_eq!(key_for(&manager, "J2"), j2_key);

        let actions = log.borrow().clone();
        assert_eq!(actions.len(), 2);
        assert!(
            actions
                .iter()
                .all(|action| !matches!(action, Action::Open(key) | Action::Close(key) if key.job_id == JobId::from("J2")))
        );
    }

    #[test]
    fn reconcile_is_idempotent() {
        let (mut manager, log) = manager();
        manager.reconcile(&ids(&["a", "b"]));
        let actions_after_first = log.borrow().len();

        let report = manager.reconcile(&ids(&["a", "b"]));
        assert!(report.is_empty());
        assert_eq!(log.borrow().len(), actions_after_first);
    }

    #[test]
    fn terminal_event_closes_subscription_and_blocks_reopen() {
        let (mut manager, log) = manager();
        manager.reconcile(&ids(&["job"]));
        let key = key_for(&manager, "job");

        let outcome = manager.handle(&key, StreamMessage::Event(ProgressEvent::Complete));
        assert_eq!(
            outcome,
            MessageOutcome::Finished {
                job_id: JobId::from("job"),
                transition: Transition::Completed,
            }
        );
        assert!(!manager.is_subscribed(&JobId::from("job")));
        assert!(log.borrow().contains(&Action::Close(key.clone())));

        let report = manager.reconcile(&ids(&["job"]));
        assert!(report.is_empty());
        let progress = manager.progress(&JobId::from("job")).expect("kept until job leaves");
        assert!((progress.progress_percent() - 100.0).abs() < f64::EPSILON);

        manager.reconcile(&ids(&[]));
        assert!(manager.progress(&JobId::from("job")).is_none());
        let report = manager.reconcile(&ids(&["job"]));
        assert_eq!(report.opened, job_ids(&["job"]));
    }

    #[test]
    fn messages_for_superseded_subscriptions_are_ignored() {
        let (mut manager, _log) = manager();
        manager.reconcile(&ids(&["job"]));
        let old_key = key_for(&manager, "job");
        manager.reconcile(&ids(&[]));
        manager.reconcile(&ids(&["job"]));
        let new_key = key_for(&manager, "job");
        assert_ne!(old_key, new_key);

        let outcome = manager.handle(
            &old_key,
            StreamMessage::Event(ProgressEvent::Progress { progress: 90.0 }),
        );
        assert_eq!(outcome, MessageOutcome::Ignored);
        let progress = manager.progress(&JobId::from("job")).expect("tracked");
        assert!(progress.progress_percent().abs() < f64::EPSILON);

        let outcome = manager.handle(
            &new_key,
            StreamMessage::Event(ProgressEvent::Progress { progress: 15.0 }),
        );
        assert_eq!(outcome, MessageOutcome::Applied);
    }

    #[test]
    fn transport_error_finishes_the_job_stream() {
        let (mut manager, _log) = manager();
        manager.reconcile(&ids(&["job"]));
        let key = key_for(&manager, "job");
        let outcome = manager.handle(
            &key,
            StreamMessage::TransportError {
                reason: "http 502".into(),
            },
        );
        assert!(matches!(
            outcome,
            MessageOutcome::Finished {
                transition: Transition::Failed { .. },
                ..
            }
        ));
        assert!(manager.is_empty());
    }

    #[test]
    fn shutdown_closes_everything_and_ignores_later_input() {
        let (mut manager, log) = manager();
        manager.reconcile(&ids(&["a", "b"]));
        let key = key_for(&manager, "a");

        manager.shutdown();
        let closes = log
            .borrow()
            .iter()
            .filter(|action| matches!(action, Action::Close(_)))
            .count();
        assert_eq!(closes, 2);
        assert!(manager.is_shut_down());

        assert_eq!(
            manager.handle(&key, StreamMessage::Opened),
            MessageOutcome::Ignored
        );
        assert!(manager.reconcile(&ids(&["c"])).is_empty());
        manager.shutdown();
        assert_eq!(log.borrow().len(), 4);
    }
}
