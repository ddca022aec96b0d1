//! Logical-clock task scheduler.
//!
//! Deferred work (auto-resume after a delay) is queued here instead of on
//! platform timers, so it advances with the frame tick and can be cancelled.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Clone, Debug)]
struct Pending<T> {
    handle: TaskHandle,
    due_ms: f64,
    payload: T,
}

#[derive(Clone, Debug)]
pub struct Scheduler<T> {
    now_ms: f64,
    next_id: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0.0,
            next_id: 1,
            pending: Vec::new(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Queue `payload` to fire `delay_ms` from now.
    pub fn schedule(&mut self, delay_ms: f32, payload: T) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            handle,
            due_ms: self.now_ms + delay_ms.max(0.0) as f64,
            payload,
        });
        handle
    }

    /// Returns `false` if the task already fired or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.handle != handle);
        self.pending.len() != before
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Move the clock forward and return every task that came due, earliest
    /// first (ties keep scheduling order).
    pub fn advance(&mut self, dt_ms: f32) -> Vec<T> {
        self.now_ms += dt_ms.max(0.0) as f64;
        let now = self.now_ms;
        let mut due: Vec<Pending<T>> = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].due_ms <= now {
                due.push(self.pending.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.handle.0.cmp(&b.handle.0)));
        due.into_iter().map(|p| p.payload).collect()
    }

    /// Drop every pending task. The clock keeps its value.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
