//! Marshalling work onto the UI thread.

use crate::animation::{Animation, AnimationStatus, CancelToken};
use crate::error::{LayoutError, LayoutResult};
use core::fmt;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

type Job = Box<dyn FnOnce() + Send>;
type TimerCallback = Box<dyn FnMut() -> bool + Send>;

enum Message {
    Job(Job),
    StartTimer(u64, Timer),
    Tick(u64),
}

struct Timer {
    stopped: CancelToken,
    callback: TimerCallback,
}

/// The UI thread's work queue.
///
/// The dispatcher itself stays on the UI thread and runs queued work when polled; other threads
/// enqueue work through a [`DispatchHandle`]. Timer callbacks live in the dispatcher and only
/// ever run or get dropped on its thread; ticker threads just send the timer's id.
pub struct Dispatcher {
    job_send: Sender<Message>,
    job_recv: Receiver<Message>,
    next_timer: Arc<AtomicU64>,
    timers: Mutex<HashMap<u64, Timer>>,
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        let (job_send, job_recv) = channel::unbounded();
        Dispatcher {
            job_send,
            job_recv,
            next_timer: Arc::new(AtomicU64::new(0)),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a handle that can be sent to other threads.
    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            job_send: self.job_send.clone(),
            next_timer: Arc::clone(&self.next_timer),
        }
    }

    /// Runs all queued work on the calling thread. Returns the number of jobs that ran.
    pub fn poll(&self) -> usize {
        let mut count = 0;
        loop {
            match self.job_recv.try_recv() {
                Ok(message) => {
                    self.run(message);
                    count += 1;
                }
                Err(TryRecvError::Empty) => break,
                // we hold a sender ourselves
                Err(TryRecvError::Disconnected) => unreachable!("job sender disconnected"),
            }
        }
        if count > 0 {
            trace!(count, "dispatcher polled");
        }
        count
    }

    /// Waits up to `timeout` for work, then runs everything that is queued.
    pub fn poll_timeout(&self, timeout: Duration) -> usize {
        match self.job_recv.recv_timeout(timeout) {
            Ok(message) => {
                self.run(message);
                1 + self.poll()
            }
            Err(RecvTimeoutError::Timeout) => 0,
            Err(RecvTimeoutError::Disconnected) => unreachable!("job sender disconnected"),
        }
    }

    fn run(&self, message: Message) {
        match message {
            Message::Job(job) => job(),
            Message::StartTimer(id, timer) => {
                self.timers.lock().insert(id, timer);
            }
            Message::Tick(id) => self.tick(id),
        }
    }

    fn tick(&self, id: u64) {
        // the callback runs unlocked so it may start further timers
        let timer = self.timers.lock().remove(&id);
        let mut timer = match timer {
            Some(timer) => timer,
            None => return,
        };
        if timer.stopped.is_cancelled() {
            trace!(timer = id, "timer released");
            return;
        }
        if (timer.callback)() {
            self.timers.lock().insert(id, timer);
        } else {
            timer.stopped.cancel();
        }
    }

    /// Runs `callback` on this thread every `interval` until it returns false or the returned
    /// token is cancelled.
    pub fn start_timer<F>(&self, interval: Duration, callback: F) -> CancelToken
    where
        F: 'static + FnMut() -> bool + Send,
    {
        let id = self.next_timer.fetch_add(1, Ordering::Relaxed);
        let stopped = CancelToken::new();
        self.timers.lock().insert(
            id,
            Timer {
                stopped: stopped.clone(),
                callback: Box::new(callback),
            },
        );
        spawn_ticker(self.job_send.clone(), id, interval, stopped.clone());
        stopped
    }

    /// Drives `animation` with a timer firing every `frame`. Cancel the returned token to stop
    /// it; the animation's batch is closed on the next frame.
    ///
    /// If the dispatcher is dropped first, the animation is dropped with it and closes its batch
    /// on the dispatcher's thread.
    pub fn animate(&self, mut animation: Animation, frame: Duration) -> CancelToken {
        let token = animation.cancel_token();
        self.start_timer(frame, move || animation.tick(frame) == AnimationStatus::Running);
        token
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        let timers = mem::take(&mut *self.timers.lock());
        for timer in timers.values() {
            timer.stopped.cancel();
        }
        if !timers.is_empty() {
            debug!(count = timers.len(), "dropping running timers");
        }
        drop(timers);

        // queued work is dropped here too, not on whichever thread lets go of the channel last
        while let Ok(message) = self.job_recv.try_recv() {
            drop(message);
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Dispatcher({} queued, {} timers)",
            self.job_recv.len(),
            self.timers.lock().len()
        )
    }
}

/// Sends a tick for timer `id` every `interval` until `stopped` is cancelled or the dispatcher
/// goes away.
fn spawn_ticker(job_send: Sender<Message>, id: u64, interval: Duration, stopped: CancelToken) {
    thread::spawn(move || {
        let ticker = channel::tick(interval);
        while !stopped.is_cancelled() {
            if ticker.recv().is_err() || job_send.send(Message::Tick(id)).is_err() {
                debug!(timer = id, "timer orphaned");
                return;
            }
        }
        // one last tick so the dispatcher releases the callback
        let _ = job_send.send(Message::Tick(id));
        debug!(timer = id, "timer stopped");
    });
}

/// A `Send` handle for enqueueing work on the UI thread.
#[derive(Clone)]
pub struct DispatchHandle {
    job_send: Sender<Message>,
    next_timer: Arc<AtomicU64>,
}

impl DispatchHandle {
    /// Queues `job` to run on the UI thread.
    pub fn invoke<F: 'static + FnOnce() + Send>(&self, job: F) -> LayoutResult<()> {
        self.job_send
            .send(Message::Job(Box::new(job)))
            .map_err(|_| LayoutError::DispatcherClosed)
    }

    /// Runs `callback` on the UI thread every `interval` until it returns false, the returned
    /// token is cancelled, or the dispatcher is dropped.
    ///
    /// The callback is handed over to the dispatcher, which owns it from then on.
    pub fn start_timer<F>(&self, interval: Duration, callback: F) -> LayoutResult<CancelToken>
    where
        F: 'static + FnMut() -> bool + Send,
    {
        let id = self.next_timer.fetch_add(1, Ordering::Relaxed);
        let stopped = CancelToken::new();
        let timer = Timer {
            stopped: stopped.clone(),
            callback: Box::new(callback),
        };
        self.job_send
            .send(Message::StartTimer(id, timer))
            .map_err(|_| LayoutError::DispatcherClosed)?;
        spawn_ticker(self.job_send.clone(), id, interval, stopped.clone());
        Ok(stopped)
    }
}

impl fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DispatchHandle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn invoke_from_another_thread() {
        let dispatcher = Dispatcher::new();
        let handle = dispatcher.handle();
        let ran_on = Arc::new(Mutex::new(None));

        let r = Arc::clone(&ran_on);
        thread::spawn(move || {
            handle
                .invoke(move || *r.lock() = Some(thread::current().id()))
                .unwrap();
        })
        .join()
        .unwrap();

        assert_eq!(dispatcher.poll(), 1);
        assert_eq!(*ran_on.lock(), Some(thread::current().id()));
        assert_eq!(dispatcher.poll(), 0);
    }

    #[test]
    fn invoke_after_drop_fails() {
        let handle = Dispatcher::new().handle();
        assert_eq!(handle.invoke(|| ()), Err(LayoutError::DispatcherClosed));
    }

    #[test]
    fn timer_runs_until_false() {
        let dispatcher = Dispatcher::new();
        let steps = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&steps);
        let stopped = dispatcher
            .handle()
            .start_timer(Duration::from_millis(5), move || {
                s.fetch_add(1, Ordering::SeqCst) + 1 < 2
            })
            .unwrap();

        while !stopped.is_cancelled() {
            dispatcher.poll_timeout(Duration::from_millis(100));
        }
        // stragglers queued before the stop are no-ops
        thread::sleep(Duration::from_millis(20));
        dispatcher.poll();
        assert_eq!(steps.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cancelled_timer_is_released_on_the_ui_thread() {
        struct DropFlag(Arc<Mutex<Option<thread::ThreadId>>>);
        impl Drop for DropFlag {
            fn drop(&mut self) {
                *self.0.lock() = Some(thread::current().id());
            }
        }

        let dispatcher = Dispatcher::new();
        let dropped_on = Arc::new(Mutex::new(None));
        let flag = DropFlag(Arc::clone(&dropped_on));
        let stopped = dispatcher.start_timer(Duration::from_millis(5), move || {
            let _keep = &flag;
            true
        });

        stopped.cancel();
        for _ in 0..50 {
            if dropped_on.lock().is_some() {
                break;
            }
            dispatcher.poll_timeout(Duration::from_millis(20));
        }
        assert_eq!(*dropped_on.lock(), Some(thread::current().id()));
    }

    #[test]
    fn start_timer_after_drop_fails() {
        let handle = Dispatcher::new().handle();
        assert_eq!(
            handle.start_timer(Duration::from_millis(5), || true).err(),
            Some(LayoutError::DispatcherClosed)
        );
    }
}
