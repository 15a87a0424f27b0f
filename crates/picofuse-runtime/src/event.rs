//! Events, per-core queues and callback dispatch.
//!
//! Each [`Core`] owns a queue (a list value of pending events), one
//! callback slot per [`EventType`], and a bounded interrupt inbox. Code
//! holding `&mut Application` posts straight to a queue with
//! [`post_event`](Application::post_event); interrupt handlers, which must
//! not touch the pool, post through an [`EventPoster`] and the owning core
//! moves those entries into its queue at the start of the next
//! [`dispatch`](Application::dispatch).

use crossbeam_channel::{Receiver, Sender, TrySendError};
use picofuse_core::{Core, EventType, Tag};

use crate::app::Application;
use crate::error::{EventError, ValueError};
use crate::value::{Body, InitArgs, ValueRef};

/// Handler invoked for each dispatched event: the application, the event
/// value, and the event's payload.
pub type Callback = Box<dyn FnMut(&mut Application, ValueRef, usize) + Send>;

/// Body of a `Tag::EVENT` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    pub(crate) source: ValueRef,
    pub(crate) event_type: EventType,
    pub(crate) payload: usize,
}

impl Event {
    /// The value that raised the event. Retained for the event's lifetime.
    pub fn source(&self) -> ValueRef {
        self.source
    }

    /// Classification.
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Opaque payload.
    pub fn payload(&self) -> usize {
        self.payload
    }
}

/// An interrupt-side post waiting in a core's inbox.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Pending {
    source: ValueRef,
    event_type: EventType,
    payload: usize,
}

/// Producer handle for interrupt context.
///
/// Cloneable and `Send`. Posting never allocates from the pool; it only
/// enqueues into a bounded per-core inbox.
#[derive(Clone, Debug)]
pub struct EventPoster {
    inboxes: [Sender<Pending>; Core::COUNT],
}

impl EventPoster {
    /// Queue an event for `core`.
    ///
    /// Fails with [`EventError::InboxFull`] when the inbox is at capacity
    /// and [`EventError::InboxClosed`] once the application is gone.
    pub fn post(
        &self,
        core: Core,
        source: ValueRef,
        event_type: EventType,
        payload: usize,
    ) -> Result<(), EventError> {
        let pending = Pending {
            source,
            event_type,
            payload,
        };
        self.inboxes[core.index()]
            .try_send(pending)
            .map_err(|e| match e {
                TrySendError::Full(_) => EventError::InboxFull { core },
                TrySendError::Disconnected(_) => EventError::InboxClosed { core },
            })
    }
}

#[derive(Default)]
struct CallbackSlot {
    callback: Option<Callback>,
    /// Bumped on every (un)registration so dispatch can tell whether the
    /// slot changed while its callback was running.
    epoch: u64,
}

/// Queue, callbacks and inbox for one core.
pub(crate) struct CoreState {
    pub(crate) queue: ValueRef,
    callbacks: [CallbackSlot; EventType::COUNT],
    pub(crate) inbox: Receiver<Pending>,
}

impl CoreState {
    pub(crate) fn new(queue: ValueRef, inbox: Receiver<Pending>) -> Self {
        Self {
            queue,
            callbacks: std::array::from_fn(|_| CallbackSlot::default()),
            inbox,
        }
    }
}

/// Build both inbox channels and the poster that feeds them.
pub(crate) fn inboxes(capacity: usize) -> (EventPoster, [Receiver<Pending>; Core::COUNT]) {
    let (tx0, rx0) = crossbeam_channel::bounded(capacity);
    let (tx1, rx1) = crossbeam_channel::bounded(capacity);
    (EventPoster { inboxes: [tx0, tx1] }, [rx0, rx1])
}

impl Application {
    /// Install `callback` for `event_type` on `core`, returning the one it
    /// replaces.
    pub fn register_callback<F>(
        &mut self,
        event_type: EventType,
        core: Core,
        callback: F,
    ) -> Option<Callback>
    where
        F: FnMut(&mut Application, ValueRef, usize) + Send + 'static,
    {
        let slot = &mut self.cores[core.index()].callbacks[event_type.index()];
        slot.epoch += 1;
        slot.callback.replace(Box::new(callback))
    }

    /// Remove the callback for `event_type` on `core`.
    ///
    /// A callback cannot remove itself this way while it is running: it is
    /// out of its slot for the duration of the call, so this returns `None`
    /// and the callback is dropped once it returns.
    pub fn unregister_callback(&mut self, event_type: EventType, core: Core) -> Option<Callback> {
        let slot = &mut self.cores[core.index()].callbacks[event_type.index()];
        slot.epoch += 1;
        slot.callback.take()
    }

    /// A standalone event value. It retains `source` until destroyed.
    #[track_caller]
    pub fn new_event(
        &mut self,
        source: ValueRef,
        event_type: EventType,
        payload: usize,
    ) -> Result<ValueRef, ValueError> {
        self.new_value(
            Tag::EVENT,
            InitArgs::Event {
                source,
                event_type,
                payload,
            },
        )
    }

    /// Build an event and append it to `core`'s queue.
    #[track_caller]
    pub fn post_event(
        &mut self,
        core: Core,
        source: ValueRef,
        event_type: EventType,
        payload: usize,
    ) -> Result<ValueRef, EventError> {
        let event = self.new_event(source, event_type, payload)?;
        let queue = self.cores[core.index()].queue;
        if let Err(e) = self.push_back(queue, event) {
            self.free_value(event)?;
            return Err(e.into());
        }
        self.metrics.events_posted += 1;
        tracing::trace!(%core, %event_type, payload, "event queued");
        Ok(event)
    }

    /// A producer handle for interrupt context.
    pub fn poster(&self) -> EventPoster {
        self.poster.clone()
    }

    /// Events waiting in `core`'s queue (not counting its inbox).
    pub fn pending_events(&self, core: Core) -> usize {
        self.list_len(self.cores[core.index()].queue).unwrap_or(0)
    }

    /// Move interrupt-side posts into the queue, dropping any whose source
    /// no longer exists.
    fn ingest(&mut self, core: Core) {
        loop {
            let pending = match self.cores[core.index()].inbox.try_recv() {
                Ok(p) => p,
                Err(_) => break,
            };
            if !self.contains(pending.source) {
                tracing::warn!(%core, source = %pending.source, "dropping event from stale source");
                self.metrics.events_dropped += 1;
                continue;
            }
            if let Err(e) =
                self.post_event(core, pending.source, pending.event_type, pending.payload)
            {
                tracing::warn!(%core, error = %e, "dropping interrupt event");
                self.metrics.events_dropped += 1;
            }
        }
    }

    /// Deliver every event queued for `core`, oldest first.
    ///
    /// Interrupt-side posts are ingested first. Each event is handed to
    /// the callback registered for its type (if any) and then released.
    /// Events a callback posts to the same core are delivered before this
    /// call returns. Returns the number of events consumed.
    pub fn dispatch(&mut self, core: Core) -> Result<usize, EventError> {
        self.ingest(core);
        let queue = self.cores[core.index()].queue;
        let mut dispatched = 0;
        while let Some(event) = self.pop_front(queue)? {
            let fields = match self.body(event)? {
                Body::Event(e) => Some(*e),
                _ => None,
            };
            if let Some(e) = fields {
                tracing::trace!(%core, event_type = %e.event_type, payload = e.payload, "dispatching");
                self.invoke(core, e.event_type, event, e.payload);
            }
            self.release(event);
            dispatched += 1;
        }
        self.metrics.events_dispatched += dispatched as u64;
        Ok(dispatched)
    }

    fn invoke(&mut self, core: Core, event_type: EventType, event: ValueRef, payload: usize) {
        let slot = &mut self.cores[core.index()].callbacks[event_type.index()];
        let Some(mut callback) = slot.callback.take() else {
            return;
        };
        let epoch = slot.epoch;
        callback(self, event, payload);
        self.metrics.callbacks_invoked += 1;
        let slot = &mut self.cores[core.index()].callbacks[event_type.index()];
        if slot.epoch == epoch {
            slot.callback = Some(callback);
        }
    }

    fn event(&self, event: ValueRef) -> Result<Event, ValueError> {
        match self.body(event)? {
            Body::Event(e) => Ok(*e),
            _ => Err(self.wrong_type(event, "event")),
        }
    }

    /// The value that raised `event`.
    pub fn event_source(&self, event: ValueRef) -> Result<ValueRef, ValueError> {
        Ok(self.event(event)?.source)
    }

    /// The classification of `event`.
    pub fn event_type(&self, event: ValueRef) -> Result<EventType, ValueError> {
        Ok(self.event(event)?.event_type)
    }

    /// The payload of `event`.
    pub fn event_payload(&self, event: ValueRef) -> Result<usize, ValueError> {
        Ok(self.event(event)?.payload)
    }
}
