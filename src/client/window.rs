// ABOUTME: Tracks in-flight submissions by sequence id and queues prepared ones awaiting a slot
// ABOUTME: Guarantees each submission's completion signal fires exactly once

use crate::datatypes::{Submit, SubmitResponse};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
// tokio's Instant rather than std's so the sweep follows the runtime clock
use tokio::time::Instant;

/// Most submissions that may await a SUBMIT_RESP at once.
pub(crate) const WINDOW_SIZE: usize = 16;

/// A prepared submission waiting for a window slot.
///
/// The completion sender is consumed exactly once: with the matched
/// response, or with `None` when the submission is timed out or abandoned.
#[derive(Debug)]
pub(crate) struct Submission {
    pub message: Submit,
    pub completion: oneshot::Sender<Option<SubmitResponse>>,
}

#[derive(Debug)]
struct InFlight {
    send_time: Instant,
    submission: Submission,
}

/// In-flight submissions keyed by sequence id.
///
/// Guarded by its own mutex; the lock is held only across map operations.
#[derive(Debug, Default)]
pub(crate) struct SendWindow {
    entries: Mutex<HashMap<u32, InFlight>>,
}

impl SendWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= WINDOW_SIZE
    }

    /// Register a submission under a fresh sequence id.
    ///
    /// Fails and hands the submission back when the window is full or the
    /// sequence id is already live; callers check `is_full` first, so either
    /// indicates a dispatch bug.
    pub fn insert(&self, sequence_id: u32, submission: Submission) -> Result<(), Submission> {
        self.insert_at(sequence_id, submission, Instant::now())
    }

    fn insert_at(
        &self,
        sequence_id: u32,
        submission: Submission,
        send_time: Instant,
    ) -> Result<(), Submission> {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= WINDOW_SIZE || entries.contains_key(&sequence_id) {
            return Err(submission);
        }
        entries.insert(
            sequence_id,
            InFlight {
                send_time,
                submission,
            },
        );
        Ok(())
    }

    /// Complete the entry matching a SUBMIT_RESP.
    ///
    /// Returns false when the sequence id is unknown - a late response after
    /// the timeout sweep, silently ignored by the dispatcher.
    pub fn complete(&self, sequence_id: u32, response: SubmitResponse) -> bool {
        let entry = self.entries.lock().unwrap().remove(&sequence_id);
        match entry {
            Some(entry) => {
                let _ = entry.submission.completion.send(Some(response));
                true
            }
            None => false,
        }
    }

    /// Remove an entry without signalling, handing the submission back.
    pub fn remove(&self, sequence_id: u32) -> Option<Submission> {
        self.entries
            .lock()
            .unwrap()
            .remove(&sequence_id)
            .map(|entry| entry.submission)
    }

    /// Time out every entry older than `max_age`, signalling its waiter with
    /// no result. Returns how many were released.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let expired: Vec<InFlight> = {
            let mut entries = self.entries.lock().unwrap();
            let stale: Vec<u32> = entries
                .iter()
                .filter(|(_, entry)| entry.send_time.elapsed() > max_age)
                .map(|(&id, _)| id)
                .collect();
            stale
                .into_iter()
                .filter_map(|id| entries.remove(&id))
                .collect()
        };

        let count = expired.len();
        for entry in expired {
            let _ = entry.submission.completion.send(None);
        }
        count
    }

    /// Release every remaining entry with no result (stalled link).
    pub fn fail_all(&self) -> usize {
        let drained: Vec<InFlight> = self.entries.lock().unwrap().drain().map(|(_, e)| e).collect();
        let count = drained.len();
        for entry in drained {
            let _ = entry.submission.completion.send(None);
        }
        count
    }

    /// Take every entry out, oldest first, without signalling.
    ///
    /// Used on link reset to move in-flight submissions back to the pending
    /// queue; their waiters stay parked until the retry resolves or their
    /// own deadline fires.
    pub fn drain(&self) -> Vec<Submission> {
        let mut drained: Vec<InFlight> =
            self.entries.lock().unwrap().drain().map(|(_, e)| e).collect();
        drained.sort_by_key(|entry| entry.send_time);
        drained.into_iter().map(|entry| entry.submission).collect()
    }
}

/// FIFO of prepared submissions awaiting a window slot.
#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    inner: Mutex<VecDeque<Submission>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_back(&self, submission: Submission) {
        self.inner.lock().unwrap().push_back(submission);
    }

    pub fn push_front(&self, submission: Submission) {
        self.inner.lock().unwrap().push_front(submission);
    }

    pub fn pop_front(&self) -> Option<Submission> {
        self.inner.lock().unwrap().pop_front()
    }

    /// Put recovered in-flight submissions ahead of everything queued,
    /// preserving their original order.
    pub fn requeue_front(&self, submissions: Vec<Submission>) {
        let mut inner = self.inner.lock().unwrap();
        for submission in submissions.into_iter().rev() {
            inner.push_front(submission);
        }
    }
}
