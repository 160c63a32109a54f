//! Session-termination notifications.
//!
//! The OS announces logoff/shutdown to every window by message: first a
//! query round (`WM_QUERYENDSESSION`), then the actual notification
//! (`WM_ENDSESSION`) once the decision is final. [`SessionEndMonitor`]
//! sits in a [`HookChain`](crate::hook::HookChain), decodes the reason
//! bitmask, and pushes the decoded event to its subscribers on the
//! thread delivering the message.

use std::panic::{AssertUnwindSafe, catch_unwind};

use bitflags::bitflags;

use crate::hook::{MessageHook, WindowMessage};

/// `WM_QUERYENDSESSION` — the OS asks whether the session may end.
pub const WM_QUERYENDSESSION: u32 = 0x0011;

/// `WM_ENDSESSION` — the OS reports the outcome of the query round.
pub const WM_ENDSESSION: u32 = 0x0016;

bitflags! {
    /// Reason bits carried in the `lparam` of a session-end message.
    ///
    /// An empty set means an unspecified system shutdown.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EndSessionReasons: u32 {
        /// The application must close for a servicing restart
        /// (`ENDSESSION_CLOSEAPP`): someone else's Restart Manager
        /// session is shutting this process down.
        const CLOSE_APP = 0x0000_0001;
        /// The session is ending because of a critical system event
        /// (`ENDSESSION_CRITICAL`); no grace period can be assumed.
        const CRITICAL = 0x4000_0000;
        /// The user is logging off (`ENDSESSION_LOGOFF`).
        const LOGOFF = 0x8000_0000;
    }
}

/// Which of the two notification rounds this event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndKind {
    /// The query round: the session may still be vetoed.
    Query,
    /// The decision round: `WM_ENDSESSION` has been delivered.
    Ending,
}

/// A decoded session-end notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEndEvent {
    pub kind: SessionEndKind,
    pub reasons: EndSessionReasons,
    /// True only in the `Ending` round when the session is really
    /// terminating (`wparam != 0`). When set, subscribers should do
    /// their best-effort cleanup synchronously before returning —
    /// there is no grace period beyond this call.
    pub session_ending: bool,
}

/// What a subscriber wants done with the message it just saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEndDecision {
    /// Suppress default processing of this message by the host window.
    /// Advisory to other subscribers: delivery continues regardless.
    pub handled: bool,
    /// Result code to return to the OS. The first subscriber to set one
    /// wins; later values are ignored.
    pub result: Option<isize>,
}

impl SessionEndDecision {
    /// Take no position; let the message fall through.
    pub fn pass() -> Self {
        Self {
            handled: false,
            result: None,
        }
    }

    /// Mark the message handled with an explicit result code.
    pub fn handled(result: isize) -> Self {
        Self {
            handled: true,
            result: Some(result),
        }
    }

    /// Acknowledge the event without overriding the result code.
    pub fn acknowledged() -> Self {
        Self {
            handled: true,
            result: None,
        }
    }
}

/// Token identifying a subscription, used for unsubscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

type Subscriber = Box<dyn FnMut(&SessionEndEvent) -> SessionEndDecision>;

/// Decodes session-end messages and fans them out to subscribers.
///
/// Publication is synchronous and single-threaded: every subscriber
/// runs, in subscription order, on the thread that delivered the native
/// message. A panicking subscriber is logged and skipped; it never
/// prevents the remaining subscribers from running.
#[derive(Default)]
pub struct SessionEndMonitor {
    subscribers: Vec<(SubscriberId, Subscriber)>,
    next_id: u64,
}

impl SessionEndMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber; it will be called after all existing ones.
    pub fn subscribe<F>(&mut self, f: F) -> SubscriberId
    where
        F: FnMut(&SessionEndEvent) -> SessionEndDecision + 'static,
    {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    /// Removes a subscriber. Returns whether it was present.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        match self.subscribers.iter().position(|(sid, _)| *sid == id) {
            Some(pos) => {
                self.subscribers.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Publishes `event` to every subscriber and aggregates decisions.
    ///
    /// Returns `Some(result)` when any subscriber marked the event
    /// handled. Subscribers that marked it handled without an explicit
    /// result fall back to the default the OS expects: allow the query
    /// round (1), report nothing for the decision round (0).
    fn publish(&mut self, event: &SessionEndEvent) -> Option<isize> {
        let mut handled = false;
        let mut result = None;

        for (_, subscriber) in &mut self.subscribers {
            let decision = catch_unwind(AssertUnwindSafe(|| subscriber(event)));
            match decision {
                Ok(decision) => {
                    handled |= decision.handled;
                    if result.is_none() {
                        result = decision.result;
                    }
                }
                Err(_) => {
                    crate::log_error!("session-end subscriber panicked; continuing");
                }
            }
        }

        if !handled {
            return None;
        }
        Some(result.unwrap_or(match event.kind {
            SessionEndKind::Query => 1,
            SessionEndKind::Ending => 0,
        }))
    }
}

/// Decodes a raw message into a session-end event, if it is one.
pub fn decode(msg: &WindowMessage) -> Option<SessionEndEvent> {
    let kind = match msg.id {
        WM_QUERYENDSESSION => SessionEndKind::Query,
        WM_ENDSESSION => SessionEndKind::Ending,
        _ => return None,
    };
    let reasons = EndSessionReasons::from_bits_truncate(msg.lparam as u32);
    Some(SessionEndEvent {
        kind,
        reasons,
        session_ending: kind == SessionEndKind::Ending && msg.wparam != 0,
    })
}

impl MessageHook for SessionEndMonitor {
    fn try_handle(&mut self, msg: &WindowMessage) -> Option<isize> {
        let event = decode(msg)?;
        self.publish(&event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn query_msg(lparam: isize) -> WindowMessage {
        WindowMessage {
            hwnd: 0x20,
            id: WM_QUERYENDSESSION,
            wparam: 0,
            lparam,
        }
    }

    fn end_msg(wparam: usize, lparam: isize) -> WindowMessage {
        WindowMessage {
            hwnd: 0x20,
            id: WM_ENDSESSION,
            wparam,
            lparam,
        }
    }

    #[test]
    fn decode_reads_the_reason_bitmask() {
        let event = decode(&query_msg(0x8000_0001_u32 as i32 as isize)).unwrap();
        assert_eq!(event.kind, SessionEndKind::Query);
        assert_eq!(
            event.reasons,
            EndSessionReasons::CLOSE_APP | EndSessionReasons::LOGOFF
        );
        assert!(!event.session_ending);
    }

    #[test]
    fn decode_ignores_other_messages() {
        let msg = WindowMessage {
            hwnd: 0x20,
            id: 0x0010, // WM_CLOSE
            wparam: 0,
            lparam: 0,
        };
        assert!(decode(&msg).is_none());
    }

    #[test]
    fn ending_round_reports_actual_termination() {
        let event = decode(&end_msg(1, 0)).unwrap();
        assert_eq!(event.kind, SessionEndKind::Ending);
        assert!(event.session_ending);
        assert!(event.reasons.is_empty());

        let event = decode(&end_msg(0, 0)).unwrap();
        assert!(!event.session_ending);
    }

    #[test]
    fn subscribers_run_in_subscription_order() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut monitor = SessionEndMonitor::new();
        for tag in [1, 2, 3] {
            let calls = calls.clone();
            monitor.subscribe(move |_| {
                calls.borrow_mut().push(tag);
                SessionEndDecision::pass()
            });
        }

        assert_eq!(monitor.try_handle(&query_msg(0)), None);
        assert_eq!(*calls.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn handled_does_not_stop_delivery() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut monitor = SessionEndMonitor::new();
        {
            let calls = calls.clone();
            monitor.subscribe(move |_| {
                calls.borrow_mut().push(1);
                SessionEndDecision::handled(0)
            });
        }
        {
            let calls = calls.clone();
            monitor.subscribe(move |_| {
                calls.borrow_mut().push(2);
                SessionEndDecision::pass()
            });
        }

        assert_eq!(monitor.try_handle(&query_msg(0)), Some(0));
        assert_eq!(*calls.borrow(), vec![1, 2]);
    }

    #[test]
    fn first_explicit_result_wins() {
        let mut monitor = SessionEndMonitor::new();
        monitor.subscribe(|_| SessionEndDecision::handled(5));
        monitor.subscribe(|_| SessionEndDecision::handled(9));

        assert_eq!(monitor.try_handle(&query_msg(0)), Some(5));
    }

    #[test]
    fn handled_without_result_uses_the_round_default() {
        let mut monitor = SessionEndMonitor::new();
        monitor.subscribe(|_| SessionEndDecision::acknowledged());

        assert_eq!(monitor.try_handle(&query_msg(0)), Some(1));
        assert_eq!(monitor.try_handle(&end_msg(1, 0)), Some(0));
    }

    #[test]
    fn panicking_subscriber_is_isolated() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut monitor = SessionEndMonitor::new();
        monitor.subscribe(|_| panic!("subscriber bug"));
        {
            let calls = calls.clone();
            monitor.subscribe(move |_| {
                calls.borrow_mut().push(2);
                SessionEndDecision::acknowledged()
            });
        }

        assert_eq!(monitor.try_handle(&end_msg(1, 0)), Some(0));
        assert_eq!(*calls.borrow(), vec![2]);
    }

    #[test]
    fn unsubscribed_subscriber_no_longer_runs() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut monitor = SessionEndMonitor::new();
        let id = {
            let calls = calls.clone();
            monitor.subscribe(move |_| {
                calls.borrow_mut().push(1);
                SessionEndDecision::pass()
            })
        };

        assert!(monitor.unsubscribe(id));
        assert!(!monitor.unsubscribe(id));

        monitor.try_handle(&query_msg(0));
        assert!(calls.borrow().is_empty());
    }
}
