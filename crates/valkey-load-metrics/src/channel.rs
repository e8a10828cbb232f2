use std::{
    collections::VecDeque,
    sync::{Arc, Condvar, Mutex},
    time::Duration,
};

use crate::message::Message;

struct State {
    queue: VecDeque<Message>,
    closed: bool,
}

struct Inner {
    state: Mutex<State>,
    cv: Condvar,
    capacity: usize,
}

/// The bounded, typed channel workers use to ship [`Message`]s to the
/// orchestrator. Mirrors the mutex + condvar + explicit-close shape of a
/// fair synchronized queue, but as a plain FIFO: there is exactly one
/// producer class per worker and one consumer, so no per-entity fairness is
/// needed.
///
/// `try_send` never blocks: on a full channel the message is dropped,
/// trading observability for load-path stability. `send_final` blocks up to
/// a timeout so the end-of-run summary survives normal churn.
#[derive(Clone)]
pub struct MetricsChannel {
    inner: Arc<Inner>,
}

impl MetricsChannel {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State { queue: VecDeque::with_capacity(capacity), closed: false }),
                cv: Condvar::new(),
                capacity,
            }),
        }
    }

    /// Non-blocking send. Returns `true` if the message was enqueued,
    /// `false` if it was dropped (channel full or closed).
    pub fn try_send(&self, msg: Message) -> bool {
        let mut st = self.inner.state.lock().expect("metrics channel mutex poisoned");
        if st.closed || st.queue.len() >= self.inner.capacity {
            return false;
        }
        st.queue.push_back(msg);
        drop(st);
        self.inner.cv.notify_one();
        true
    }

    /// Blocking send with a timeout, used only for `Final` messages.
    /// Returns `true` if enqueued before the timeout or before the channel
    /// closed, `false` otherwise.
    pub fn send_final(&self, msg: Message, timeout: Duration) -> bool {
        let mut st = self.inner.state.lock().expect("metrics channel mutex poisoned");
        let deadline_result = self.inner.cv.wait_timeout_while(st, timeout, |s| {
            !s.closed && s.queue.len() >= self.inner.capacity
        });
        st = match deadline_result {
            Ok((guard, _timed_out)) => guard,
            Err(_) => return false,
        };
        if st.closed {
            return false;
        }
        st.queue.push_back(msg);
        drop(st);
        self.inner.cv.notify_one();
        true
    }

    /// Polls for the next message, waiting up to `timeout`. Returns `None`
    /// on timeout or once the channel is closed and drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Message> {
        let mut st = self.inner.state.lock().expect("metrics channel mutex poisoned");
        if st.queue.is_empty() && !st.closed {
            let (guard, _timed_out) = self
                .inner
                .cv
                .wait_timeout_while(st, timeout, |s| s.queue.is_empty() && !s.closed)
                .expect("metrics channel mutex poisoned");
            st = guard;
        }
        let msg = st.queue.pop_front();
        drop(st);
        self.inner.cv.notify_all();
        msg
    }

    /// Drains every message currently queued without waiting, used during
    /// shutdown to flush pending data.
    pub fn drain(&self) -> Vec<Message> {
        let mut st = self.inner.state.lock().expect("metrics channel mutex poisoned");
        st.queue.drain(..).collect()
    }

    /// Marks the channel closed; senders and `recv_timeout` callers still
    /// draining will observe it once the queue empties.
    pub fn close(&self) {
        let mut st = self.inner.state.lock().expect("metrics channel mutex poisoned");
        st.closed = true;
        drop(st);
        self.inner.cv.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().expect("metrics channel mutex poisoned").closed
    }
}
