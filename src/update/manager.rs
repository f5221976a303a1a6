// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A dedicated update thread.
//!
//! A dispatcher is not thread-safe, so it lives on its own thread and
//! every document modification is sent there as a task.
//! A repaint thread periodically asks the update thread to apply
//! pending mutations.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{UpdateDispatcher, UpdateReport};
use crate::{Error, Options};

/// A task executed on the update thread.
pub type Task = Box<dyn FnOnce(&mut UpdateDispatcher) + Send>;

enum Message {
    Run(Task),
    Repaint,
    Suspend,
    Resume,
    Stop,
}

/// A notification sent by the update thread.
#[derive(Clone, Debug)]
pub enum ManagerEvent {
    /// The document was built and the thread accepts tasks.
    Started,
    /// Tasks are queued, but not executed.
    Suspended,
    /// Queued tasks are executed again.
    Resumed,
    /// Pending mutations are about to be applied.
    UpdateStarted,
    /// Pending mutations were applied.
    UpdateCompleted(UpdateReport),
    /// The document cannot be built or a task has panicked.
    UpdateFailed(String),
    /// The thread has exited.
    Stopped,
}

/// A receiver of [`ManagerEvent`]s.
///
/// Called on the update thread.
pub trait UpdateListener: Send {
    /// Handles an event.
    fn on_event(&self, event: &ManagerEvent);
}

impl<F: Fn(&ManagerEvent) + Send> UpdateListener for F {
    fn on_event(&self, event: &ManagerEvent) {
        self(event)
    }
}

/// A cloneable handle to a running [`UpdateManager`].
#[derive(Clone)]
pub struct UpdateHandle {
    sender: Sender<Message>,
    dirty: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl UpdateHandle {
    /// Schedules a task on the update thread.
    ///
    /// Mutations made by the task are applied right after it.
    /// Returns `false` when the manager is stopped.
    pub fn invoke_later<F>(&self, task: F) -> bool
    where
        F: FnOnce(&mut UpdateDispatcher) + Send + 'static,
    {
        self.send(Message::Run(Box::new(task)))
    }

    /// Executes a task on the update thread and waits for its result.
    ///
    /// Must not be called from the update thread itself.
    /// Returns `None` when the manager is stopped or while it is suspended
    /// and stops before resuming.
    pub fn invoke_and_wait<F, R>(&self, task: F) -> Option<R>
    where
        F: FnOnce(&mut UpdateDispatcher) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        let sent = self.invoke_later(move |d| {
            let _ = tx.send(task(d));
        });

        if !sent {
            return None;
        }

        rx.recv().ok()
    }

    /// Asks the update thread to apply pending mutations on the next repaint tick.
    pub fn request_repaint(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Stops task execution. Tasks are queued until [`resume`](Self::resume).
    pub fn suspend(&self) -> bool {
        self.send(Message::Suspend)
    }

    /// Resumes task execution.
    pub fn resume(&self) -> bool {
        self.send(Message::Resume)
    }

    /// Stops both threads. Queued tasks are dropped.
    pub fn interrupt(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.sender.send(Message::Stop);
    }

    /// Checks that the manager was not stopped.
    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Acquire)
    }

    fn send(&self, message: Message) -> bool {
        self.is_running() && self.sender.send(message).is_ok()
    }
}

impl std::fmt::Debug for UpdateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("UpdateHandle")
            .field("running", &self.is_running())
            .finish()
    }
}

/// Owns the update and the repaint threads.
///
/// Both threads are stopped on drop.
pub struct UpdateManager {
    handle: UpdateHandle,
    update_thread: Option<JoinHandle<()>>,
    repaint_thread: Option<JoinHandle<()>>,
}

impl UpdateManager {
    /// Starts the update thread.
    ///
    /// `factory` is called on the update thread to create a dispatcher,
    /// since a dispatcher cannot be moved between threads.
    pub fn start<F, L>(opt: &Options, factory: F, listener: L) -> std::io::Result<Self>
    where
        F: FnOnce() -> Result<UpdateDispatcher, Error> + Send + 'static,
        L: UpdateListener + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let handle = UpdateHandle {
            sender,
            dirty: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
        };

        let shutdown = handle.shutdown.clone();
        let update_thread = thread::Builder::new()
            .name("svgbridge-update".to_string())
            .spawn(move || {
                run_update_loop(factory, receiver, &listener, &shutdown);
                shutdown.store(true, Ordering::Release);
                listener.on_event(&ManagerEvent::Stopped);
            })?;

        let repaint_handle = handle.clone();
        let interval = opt.repaint_interval();
        let repaint_thread = thread::Builder::new()
            .name("svgbridge-repaint".to_string())
            .spawn(move || run_repaint_loop(&repaint_handle, interval));

        let repaint_thread = match repaint_thread {
            Ok(v) => v,
            Err(e) => {
                handle.interrupt();
                let _ = update_thread.join();
                return Err(e);
            }
        };

        Ok(UpdateManager {
            handle,
            update_thread: Some(update_thread),
            repaint_thread: Some(repaint_thread),
        })
    }

    /// Returns a handle that can be sent to other threads.
    pub fn handle(&self) -> UpdateHandle {
        self.handle.clone()
    }

    /// Stops both threads without waiting for them.
    pub fn interrupt(&self) {
        self.handle.interrupt();
    }

    /// Stops both threads and waits for them to exit.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.handle.interrupt();

        if let Some(t) = self.update_thread.take() {
            if t.join().is_err() {
                log::warn!("The update thread has panicked.");
            }
        }

        if let Some(t) = self.repaint_thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for UpdateManager {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

impl std::fmt::Debug for UpdateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("UpdateManager")
            .field("handle", &self.handle)
            .finish()
    }
}

fn run_update_loop<F, L>(factory: F, receiver: Receiver<Message>, listener: &L, shutdown: &AtomicBool)
where
    F: FnOnce() -> Result<UpdateDispatcher, Error>,
    L: UpdateListener,
{
    let mut dispatcher = match factory() {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Failed to start updates cause {}.", e);
            listener.on_event(&ManagerEvent::UpdateFailed(e.to_string()));
            return;
        }
    };

    listener.on_event(&ManagerEvent::Started);

    let mut suspended = false;
    let mut queued: VecDeque<Task> = VecDeque::new();
    for message in receiver.iter() {
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        match message {
            Message::Run(task) if suspended => queued.push_back(task),
            Message::Run(task) => {
                if !run_task(&mut dispatcher, task, listener) {
                    break;
                }

                flush(&mut dispatcher, listener);
            }
            Message::Repaint => {
                if !suspended && dispatcher.has_pending() {
                    flush(&mut dispatcher, listener);
                }
            }
            Message::Suspend => {
                if !suspended {
                    suspended = true;
                    listener.on_event(&ManagerEvent::Suspended);
                }
            }
            Message::Resume => {
                if suspended {
                    suspended = false;
                    listener.on_event(&ManagerEvent::Resumed);

                    while let Some(task) = queued.pop_front() {
                        if !run_task(&mut dispatcher, task, listener) {
                            return;
                        }
                    }

                    if dispatcher.has_pending() {
                        flush(&mut dispatcher, listener);
                    }
                }
            }
            Message::Stop => break,
        }
    }

    if !queued.is_empty() {
        log::debug!("{} queued tasks were dropped.", queued.len());
    }
}

/// Returns `false` when the task has panicked.
///
/// A dispatcher state after a panic is unknown, so the thread stops.
fn run_task<L: UpdateListener>(dispatcher: &mut UpdateDispatcher, task: Task, listener: &L) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| task(dispatcher))) {
        Ok(()) => true,
        Err(_) => {
            log::warn!("An update task has panicked.");
            listener.on_event(&ManagerEvent::UpdateFailed("a task has panicked".to_string()));
            false
        }
    }
}

fn flush<L: UpdateListener>(dispatcher: &mut UpdateDispatcher, listener: &L) {
    listener.on_event(&ManagerEvent::UpdateStarted);
    let report = dispatcher.process();
    listener.on_event(&ManagerEvent::UpdateCompleted(report));
}

fn run_repaint_loop(handle: &UpdateHandle, interval: Duration) {
    while handle.is_running() {
        thread::sleep(interval);

        if handle.dirty.swap(false, Ordering::AcqRel) && !handle.send(Message::Repaint) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeContext;
    use svgbridge_dom::Document;
    use svgbridge_gvt::NodeExt;

    const TEXT: &str = "<svg xmlns='http://www.w3.org/2000/svg'>
        <circle id='c' r='5'/><rect id='r' width='5' height='5'/>
    </svg>";

    fn factory() -> Result<UpdateDispatcher, Error> {
        let doc = Document::parse_str(TEXT)?;
        UpdateDispatcher::new(BridgeContext::new(Options::default()), doc)
    }

    #[test]
    fn tasks_are_applied_on_the_update_thread() {
        let (tx, rx) = mpsc::channel();
        let manager = UpdateManager::start(&Options::default(), factory, move |e: &ManagerEvent| {
            let _ = tx.send(e.clone());
        })
        .unwrap();

        let width = manager.handle().invoke_and_wait(|d| {
            let c = d.document().element_by_id("c").unwrap().id();
            d.document_mut().set_attribute(c, "r", "10");
            d.process();
            d.tree().node_by_id("c").unwrap().bounding_box().map(|r| r.width())
        });
        assert_eq!(width, Some(Some(20.0)));

        manager.stop();

        let events: Vec<ManagerEvent> = rx.iter().collect();
        assert!(matches!(events.first(), Some(ManagerEvent::Started)));
        assert!(matches!(events.last(), Some(ManagerEvent::Stopped)));
    }

    #[test]
    fn suspended_tasks_run_after_resume() {
        let manager = UpdateManager::start(&Options::default(), factory, |_: &ManagerEvent| {}).unwrap();
        let handle = manager.handle();

        assert!(handle.suspend());
        let (tx, rx) = mpsc::channel();
        handle.invoke_later(move |_| {
            let _ = tx.send(());
        });
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        assert!(handle.resume());
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn invalid_document_stops_the_thread() {
        let (tx, rx) = mpsc::channel();
        let manager = UpdateManager::start(
            &Options::default(),
            || Err(Error::InvalidSize),
            move |e: &ManagerEvent| {
                let _ = tx.send(e.clone());
            },
        )
        .unwrap();

        let events: Vec<ManagerEvent> = rx.iter().take(2).collect();
        assert!(matches!(events[0], ManagerEvent::UpdateFailed(_)));
        assert!(matches!(events[1], ManagerEvent::Stopped));
        assert!(manager.handle().invoke_and_wait(|_| ()).is_none());
    }
}
