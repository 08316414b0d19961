// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime signal subscriptions and emission.
//!
//! The subscriber table is guarded by a mutex held only for membership
//! changes; emission snapshots the table and runs user callbacks outside
//! the lock. Subscriptions added during an emission do not observe the
//! in-flight emission; a subscriber that disconnects itself mid-callback
//! has its link invalidated immediately while the current snapshot still
//! completes.

use crate::dynamic::{ObjectId, Value};
use crate::error::Result;
use crate::meta::GenericFunction;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque subscription handle, returned by connect and accepted by
/// disconnect. Never reused within a signal's lifetime.
pub type LinkId = u64;

/// One signal subscriber.
#[derive(Clone)]
pub enum Subscriber {
    /// Local callable bound through the generic function adapter
    Handler(Arc<GenericFunction>),

    /// Forwarding pair: deliver by invoking `method` on `target`
    Forward { target: ObjectId, method: u32 },
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("Subscriber::Handler"),
            Self::Forward { target, method } => f
                .debug_struct("Subscriber::Forward")
                .field("target", target)
                .field("method", method)
                .finish(),
        }
    }
}

/// Sink used to deliver forwarding subscriptions to their target object.
pub type ForwardSink<'a> = dyn Fn(ObjectId, u32, &[Value]) -> Result<()> + 'a;

/// A live signal: the subscriber table behind a meta-signal id.
pub struct Signal {
    subscribers: Mutex<Vec<(LinkId, Subscriber)>>,
    next_link: AtomicU64,
}

impl Signal {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_link: AtomicU64::new(1),
        }
    }

    /// Append a subscriber; returns the link handle for disconnect.
    pub fn connect(&self, subscriber: Subscriber) -> LinkId {
        let link = self.next_link.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push((link, subscriber));
        link
    }

    /// Remove a subscription. Returns false for unknown or already
    /// disconnected links.
    pub fn disconnect(&self, link: LinkId) -> bool {
        let mut subs = self.subscribers.lock();
        let before = subs.len();
        subs.retain(|(l, _)| *l != link);
        subs.len() < before
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Deliver `args` to every currently-subscribed subscriber, in
    /// subscription order.
    ///
    /// Errors from one subscriber are swallowed and logged so the rest of
    /// the snapshot still runs. Forwarding pairs go through `forward`.
    pub fn emit(&self, args: &[Value], forward: Option<&ForwardSink<'_>>) {
        let snapshot: Vec<(LinkId, Subscriber)> = self.subscribers.lock().clone();
        for (link, subscriber) in snapshot {
            let outcome = match &subscriber {
                Subscriber::Handler(handler) => handler.call(args).map(|_| ()),
                Subscriber::Forward { target, method } => match forward {
                    Some(sink) => sink(*target, *method, args),
                    None => {
                        log::debug!(
                            "signal forward to object {:?} method {} dropped: no sink",
                            target,
                            method
                        );
                        Ok(())
                    }
                },
            };
            if let Err(e) = outcome {
                log::warn!("signal subscriber (link {}) failed: {}", link, e);
            }
        }
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::IntoValue;
    use crate::meta::IntoGenericFunction;
    use std::sync::atomic::AtomicI64;

    fn counting_handler(total: Arc<AtomicI64>) -> Subscriber {
        let f = move |v: i32| {
            total.fetch_add(v as i64, Ordering::SeqCst);
        };
        Subscriber::Handler(Arc::new(f.into_generic_function()))
    }

    #[test]
    fn emit_reaches_all_subscribers_in_order() {
        let signal = Signal::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            let f = move |_v: i32| {
                order.lock().push(tag);
            };
            signal.connect(Subscriber::Handler(Arc::new(f.into_generic_function())));
        }

        signal.emit(&[1i32.into_value()], None);
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn disconnect_prevents_future_delivery() {
        let signal = Signal::new();
        let total = Arc::new(AtomicI64::new(0));
        let link = signal.connect(counting_handler(total.clone()));

        signal.emit(&[5i32.into_value()], None);
        assert_eq!(total.load(Ordering::SeqCst), 5);

        assert!(signal.disconnect(link));
        signal.emit(&[7i32.into_value()], None);
        assert_eq!(total.load(Ordering::SeqCst), 5);

        // A stale link is rejected.
        assert!(!signal.disconnect(link));
    }

    #[test]
    fn link_ids_are_never_reused() {
        let signal = Signal::new();
        let total = Arc::new(AtomicI64::new(0));
        let a = signal.connect(counting_handler(total.clone()));
        signal.disconnect(a);
        let b = signal.connect(counting_handler(total));
        assert_ne!(a, b);
    }

    #[test]
    fn one_bad_subscriber_does_not_stop_the_rest() {
        let signal = Signal::new();
        let total = Arc::new(AtomicI64::new(0));

        // Strict re-cast failure inside the first handler.
        let broken = (|_s: String| ()).into_generic_function();
        signal.connect(Subscriber::Handler(Arc::new(broken)));
        signal.connect(counting_handler(total.clone()));

        signal.emit(&[3i32.into_value()], None);
        assert_eq!(total.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn self_disconnect_invalidates_link_but_snapshot_completes() {
        let signal = Arc::new(Signal::new());
        let total = Arc::new(AtomicI64::new(0));

        let link_slot = Arc::new(Mutex::new(None::<LinkId>));
        let sig = signal.clone();
        let slot = link_slot.clone();
        let self_removing = move |_v: i32| {
            if let Some(link) = *slot.lock() {
                sig.disconnect(link);
            }
        };
        let link = signal.connect(Subscriber::Handler(Arc::new(
            self_removing.into_generic_function(),
        )));
        *link_slot.lock() = Some(link);
        signal.connect(counting_handler(total.clone()));

        signal.emit(&[2i32.into_value()], None);
        // The later subscriber in the same snapshot still ran.
        assert_eq!(total.load(Ordering::SeqCst), 2);
        // The link is already gone.
        assert!(!signal.disconnect(link));
        assert_eq!(signal.subscriber_count(), 1);
    }

    #[test]
    fn forward_pairs_use_the_sink() {
        let signal = Signal::new();
        signal.connect(Subscriber::Forward {
            target: ObjectId(4),
            method: 9,
        });

        let seen = Mutex::new(Vec::new());
        signal.emit(
            &[1i32.into_value()],
            Some(&|target, method, args| {
                seen.lock().push((target, method, args.len()));
                Ok(())
            }),
        );
        assert_eq!(*seen.lock(), vec![(ObjectId(4), 9, 1)]);
    }

    #[test]
    fn mid_emission_connect_misses_inflight() {
        let signal = Arc::new(Signal::new());
        let total = Arc::new(AtomicI64::new(0));

        let sig = signal.clone();
        let tot = total.clone();
        let connector = move |_v: i32| {
            sig.connect(counting_handler(tot.clone()));
        };
        signal.connect(Subscriber::Handler(Arc::new(
            connector.into_generic_function(),
        )));

        signal.emit(&[1i32.into_value()], None);
        // The subscriber added during emission saw nothing yet.
        assert_eq!(total.load(Ordering::SeqCst), 0);

        signal.emit(&[1i32.into_value()], None);
        assert_eq!(total.load(Ordering::SeqCst), 1);
    }
}
