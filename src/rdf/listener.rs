//! Store change events
//!
//! Node-level and triple-level listeners are registered separately. The store
//! only keeps [`Weak`] references, so dropping the last `Arc` of a listener is
//! enough to stop delivery; [`Subscription`] handles allow explicit removal.
//! Events are delivered synchronously from inside the mutating call.

use super::typing::InternalType;
use super::types::{NodeId, RdfType, TripleId, TripleKey};
use std::sync::Weak;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    /// Net type change of a successful propagation run
    TypeChanged {
        node: NodeId,
        from: InternalType,
        to: InternalType,
    },
    /// First triple membership
    Activated { node: NodeId },
    /// Last triple membership gone
    Retired { node: NodeId },
}

impl NodeEvent {
    pub fn node(&self) -> NodeId {
        match *self {
            NodeEvent::TypeChanged { node, .. }
            | NodeEvent::Activated { node }
            | NodeEvent::Retired { node } => node,
        }
    }

    /// Public type transition, when this is a visible type change
    pub fn public_change(&self) -> Option<(RdfType, RdfType)> {
        match *self {
            NodeEvent::TypeChanged { from, to, .. } if from.public_type() != to.public_type() => {
                Some((from.public_type(), to.public_type()))
            }
            _ => None,
        }
    }
}

/// Per-graph triple membership change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripleEvent {
    Added {
        triple: TripleId,
        key: TripleKey,
        graph: NodeId,
    },
    Deleted {
        triple: TripleId,
        key: TripleKey,
        graph: NodeId,
    },
}

impl TripleEvent {
    pub fn triple(&self) -> TripleId {
        match *self {
            TripleEvent::Added { triple, .. } | TripleEvent::Deleted { triple, .. } => triple,
        }
    }

    pub fn graph(&self) -> NodeId {
        match *self {
            TripleEvent::Added { graph, .. } | TripleEvent::Deleted { graph, .. } => graph,
        }
    }
}

pub trait NodeListener: Send + Sync {
    fn on_node_event(&self, event: &NodeEvent);
}

pub trait TripleListener: Send + Sync {
    fn on_triple_event(&self, event: &TripleEvent);
}

impl<F> NodeListener for F
where
    F: Fn(&NodeEvent) + Send + Sync,
{
    fn on_node_event(&self, event: &NodeEvent) {
        self(event)
    }
}

impl<F> TripleListener for F
where
    F: Fn(&TripleEvent) + Send + Sync,
{
    fn on_triple_event(&self, event: &TripleEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Node,
    Triple,
}

/// Handle returned on subscription; pass it back to unsubscribe
#[must_use = "dropping a subscription handle makes explicit unsubscribe impossible"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub(crate) channel: Channel,
    pub(crate) id: u64,
}

impl Subscription {
    pub fn channel(&self) -> Channel {
        self.channel
    }
}

/// Weak listener list
pub(crate) struct Registry<L: ?Sized> {
    channel: Channel,
    next_id: u64,
    entries: Vec<(u64, Weak<L>)>,
}

impl<L: ?Sized> Registry<L> {
    pub(crate) fn new(channel: Channel) -> Self {
        Self {
            channel,
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub(crate) fn subscribe(&mut self, listener: Weak<L>) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, listener));
        Subscription {
            channel: self.channel,
            id,
        }
    }

    pub(crate) fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        if subscription.channel != self.channel {
            return false;
        }
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != subscription.id);
        self.entries.len() != before
    }

    /// Deliver to every live listener, forgetting the dropped ones
    pub(crate) fn notify(&mut self, mut deliver: impl FnMut(&L)) {
        if self.entries.is_empty() {
            return;
        }
        self.entries.retain(|(_, weak)| match weak.upgrade() {
            Some(listener) => {
                deliver(&*listener);
                true
            }
            None => false,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<L: ?Sized> std::fmt::Debug for Registry<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("channel", &self.channel)
            .field("listeners", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::types::StoreId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_dropped_listener_is_forgotten() {
        let mut registry: Registry<dyn NodeListener> = Registry::new(Channel::Node);
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let listener: Arc<dyn NodeListener> = Arc::new(move |_: &NodeEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let _sub = registry.subscribe(Arc::downgrade(&listener));

        let event = NodeEvent::Activated {
            node: NodeId::new(StoreId(0), 0),
        };
        registry.notify(|l| l.on_node_event(&event));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        drop(listener);
        registry.notify(|l| l.on_node_event(&event));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let mut registry: Registry<dyn TripleListener> = Registry::new(Channel::Triple);
        let listener: Arc<dyn TripleListener> = Arc::new(|_: &TripleEvent| {});
        let sub = registry.subscribe(Arc::downgrade(&listener));

        assert!(registry.unsubscribe(sub));
        assert!(!registry.unsubscribe(sub));
        assert_eq!(registry.len(), 0);
    }
}
