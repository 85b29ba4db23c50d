//! Marshalling of work from background tasks onto the UI loop.
//!
//! Background tasks never touch UI-owned state directly. They wrap the change in
//! a closure and hand it to [`UiDispatcher::invoke_from_ui_loop`]; the loop that
//! owns the UI drains the queue in FIFO order.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::warn;
use std::time::Duration;

pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Sending half, cloned into every background task.
#[derive(Clone)]
pub struct UiDispatcher {
    tx: Sender<UiTask>,
}

/// Receiving half, owned by the UI loop.
pub struct UiLoop {
    rx: Receiver<UiTask>,
}

pub fn ui_channel() -> (UiDispatcher, UiLoop) {
    let (tx, rx) = unbounded();
    (UiDispatcher { tx }, UiLoop { rx })
}

impl UiDispatcher {
    /// Schedules `task` to run on the UI loop. Returns false once the loop is gone.
    pub fn invoke_from_ui_loop(&self, task: impl FnOnce() + Send + 'static) -> bool {
        match self.tx.send(Box::new(task)) {
            Ok(()) => true,
            Err(_) => {
                warn!("UI loop has shut down; dropping scheduled task");
                false
            }
        }
    }
}

impl UiLoop {
    /// Runs every task queued so far without blocking.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Waits up to `timeout` for one task and runs it.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    pub fn receiver(&self) -> &Receiver<UiTask> {
        &self.rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn tasks_run_in_fifo_order_on_the_loop() {
        let (dispatcher, ui_loop) = ui_channel();
        let order = Arc::new(Mutex::new(Vec::new()));

        let worker = {
            let order = order.clone();
            std::thread::spawn(move || {
                for i in 0..5 {
                    let order = order.clone();
                    dispatcher.invoke_from_ui_loop(move || order.lock().unwrap().push(i));
                }
            })
        };
        worker.join().unwrap();

        assert!(order.lock().unwrap().is_empty());
        assert_eq!(ui_loop.run_pending(), 5);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn invoking_after_loop_dropped_reports_failure() {
        let (dispatcher, ui_loop) = ui_channel();
        drop(ui_loop);
        assert!(!dispatcher.invoke_from_ui_loop(|| {}));
    }

    #[test]
    fn run_next_times_out_when_idle() {
        let (_dispatcher, ui_loop) = ui_channel();
        assert!(!ui_loop.run_next(Duration::from_millis(1)));
    }
}
