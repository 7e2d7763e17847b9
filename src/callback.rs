//! Listener registration and event fan-out.
//!
//! Listeners run synchronously on the dispatching thread, after the state
//! change for the line has been made. For each event the manager calls every
//! generic listener, then every listener registered for the event's kind,
//! each group in registration order. A listener that fails or panics is
//! logged and skipped; the rest still run.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use crate::event::{Event, EventKind};
use crate::state::NetworkState;

/// Handle returned by the `subscribe*` methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// What a listener sees while handling an event.
pub struct ListenerContext<'a> {
    state: &'a NetworkState,
    outbound: &'a mut Vec<String>,
}

impl<'a> ListenerContext<'a> {
    pub(crate) fn new(state: &'a NetworkState, outbound: &'a mut Vec<String>) -> Self {
        Self { state, outbound }
    }

    /// Network state after the current line.
    pub fn state(&self) -> &NetworkState {
        self.state
    }

    /// Queue a raw line for sending once dispatch of the current line ends.
    pub fn send(&mut self, line: impl Into<String>) {
        self.outbound.push(line.into());
    }
}

/// Something that wants to observe events.
///
/// Closures `FnMut(&Event, &mut ListenerContext) -> anyhow::Result<()>`
/// implement this directly.
pub trait Listener: Send {
    /// Handle one event.
    fn on_event(&mut self, event: &Event, ctx: &mut ListenerContext<'_>) -> anyhow::Result<()>;
}

impl<F> Listener for F
where
    F: FnMut(&Event, &mut ListenerContext<'_>) -> anyhow::Result<()> + Send,
{
    fn on_event(&mut self, event: &Event, ctx: &mut ListenerContext<'_>) -> anyhow::Result<()> {
        self(event, ctx)
    }
}

struct Registration {
    id: ListenerId,
    filter: Option<String>,
    listener: Box<dyn Listener>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

/// Registry of listeners keyed by event kind.
#[derive(Debug, Default)]
pub struct CallbackManager {
    next_id: u64,
    generic: Vec<Registration>,
    specific: BTreeMap<EventKind, Vec<Registration>>,
}

impl CallbackManager {
    /// Empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Listen to every event.
    pub fn subscribe_all(&mut self, listener: impl Listener + 'static) -> ListenerId {
        let id = self.next_id();
        self.generic.push(Registration {
            id,
            filter: None,
            listener: Box::new(listener),
        });
        id
    }

    /// Listen to one kind of event.
    pub fn subscribe(&mut self, kind: EventKind, listener: impl Listener + 'static) -> ListenerId {
        self.add_specific(kind, None, Box::new(listener))
    }

    /// Listen to one kind of event for one channel or nickname.
    ///
    /// The filter is compared to [`Event::target`] under the connection's
    /// case mapping at the time the event fires.
    pub fn subscribe_filtered(
        &mut self,
        kind: EventKind,
        target: impl Into<String>,
        listener: impl Listener + 'static,
    ) -> ListenerId {
        self.add_specific(kind, Some(target.into()), Box::new(listener))
    }

    fn add_specific(
        &mut self,
        kind: EventKind,
        filter: Option<String>,
        listener: Box<dyn Listener>,
    ) -> ListenerId {
        let id = self.next_id();
        self.specific.entry(kind).or_default().push(Registration {
            id,
            filter,
            listener,
        });
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        if let Some(pos) = self.generic.iter().position(|r| r.id == id) {
            self.generic.remove(pos);
            return true;
        }
        for regs in self.specific.values_mut() {
            if let Some(pos) = regs.iter().position(|r| r.id == id) {
                regs.remove(pos);
                return true;
            }
        }
        false
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.generic.len() + self.specific.values().map(Vec::len).sum::<usize>()
    }

    /// True when nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event. Returns the number of listeners invoked.
    pub fn fire(&mut self, event: &Event, state: &NetworkState, outbound: &mut Vec<String>) -> usize {
        let mut ctx = ListenerContext::new(state, outbound);
        let mut called = 0;

        for reg in &mut self.generic {
            invoke(reg, event, &mut ctx);
            called += 1;
        }

        if let Some(regs) = self.specific.get_mut(&event.kind()) {
            for reg in regs {
                if let Some(filter) = &reg.filter {
                    match event.target() {
                        Some(target) if state.names_equal(target, filter) => {}
                        _ => continue,
                    }
                }
                invoke(reg, event, &mut ctx);
                called += 1;
            }
        }

        called
    }
}

fn invoke(reg: &mut Registration, event: &Event, ctx: &mut ListenerContext<'_>) {
    let result = catch_unwind(AssertUnwindSafe(|| reg.listener.on_event(event, ctx)));
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(listener = %reg.id, kind = %event.kind(), error = %format!("{e:#}"), "listener failed");
        }
        Err(panic) => {
            let msg = panic
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| panic.downcast_ref::<&str>().copied())
                .unwrap_or("unknown panic");
            warn!(listener = %reg.id, kind = %event.kind(), panic = msg, "listener panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hostmask::Hostmask;
    use std::sync::{Arc, Mutex};

    fn message(channel: &str) -> Event {
        Event::ChannelMessage {
            channel: channel.to_string(),
            sender: Hostmask::parse("a!b@c"),
            text: "hi".to_string(),
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> impl Listener + 'static {
        let log = Arc::clone(log);
        move |_: &Event, _: &mut ListenerContext<'_>| {
            log.lock().unwrap().push(name);
            Ok(())
        }
    }

    #[test]
    fn test_generic_before_specific() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = CallbackManager::new();
        manager.subscribe(EventKind::ChannelMessage, recorder(&log, "specific"));
        manager.subscribe_all(recorder(&log, "generic1"));
        manager.subscribe_all(recorder(&log, "generic2"));
        manager.subscribe(EventKind::ServerReady, recorder(&log, "other"));

        let state = NetworkState::new();
        let called = manager.fire(&message("#c"), &state, &mut Vec::new());
        assert_eq!(called, 3);
        assert_eq!(*log.lock().unwrap(), vec!["generic1", "generic2", "specific"]);
    }

    #[test]
    fn test_failure_isolation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = CallbackManager::new();
        manager.subscribe_all(|_: &Event, _: &mut ListenerContext<'_>| -> anyhow::Result<()> {
            anyhow::bail!("broken")
        });
        manager.subscribe_all(|_: &Event, _: &mut ListenerContext<'_>| -> anyhow::Result<()> {
            panic!("very broken")
        });
        manager.subscribe_all(recorder(&log, "survivor"));

        let state = NetworkState::new();
        manager.fire(&Event::ServerReady, &state, &mut Vec::new());
        assert_eq!(*log.lock().unwrap(), vec!["survivor"]);
    }

    #[test]
    fn test_filtered_uses_casemapping() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = CallbackManager::new();
        manager.subscribe_filtered(EventKind::ChannelMessage, "#Chan[1]", recorder(&log, "hit"));

        let state = NetworkState::new();
        manager.fire(&message("#chan{1}"), &state, &mut Vec::new());
        manager.fire(&message("#other"), &state, &mut Vec::new());
        assert_eq!(*log.lock().unwrap(), vec!["hit"]);
    }

    #[test]
    fn test_unsubscribe_idempotent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = CallbackManager::new();
        let a = manager.subscribe_all(recorder(&log, "a"));
        let b = manager.subscribe(EventKind::ServerReady, recorder(&log, "b"));
        assert_eq!(manager.len(), 2);
        assert!(manager.unsubscribe(a));
        assert!(!manager.unsubscribe(a));
        assert!(manager.unsubscribe(b));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_context_send() {
        let mut manager = CallbackManager::new();
        manager.subscribe(EventKind::ServerReady, |_: &Event, ctx: &mut ListenerContext<'_>| {
            ctx.send("JOIN #rust");
            Ok(())
        });
        let state = NetworkState::new();
        let mut out = Vec::new();
        manager.fire(&Event::ServerReady, &state, &mut out);
        assert_eq!(out, vec!["JOIN #rust".to_string()]);
    }
}
