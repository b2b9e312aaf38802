//! Bridges actor deactivation into spawner death reports.

use std::collections::BTreeSet;

use sprout_siege_core::{ActorId, Event};

/// Watches subscribed actors and reports each death exactly once.
#[derive(Clone, Debug, Default)]
pub struct DeathListener {
    subscribed: BTreeSet<ActorId>,
}

impl DeathListener {
    /// Creates a listener without subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts watching an actor.
    pub fn subscribe(&mut self, actor: ActorId) {
        let _ = self.subscribed.insert(actor);
    }

    /// Reports whether an actor is still watched.
    #[must_use]
    pub fn is_subscribed(&self, actor: ActorId) -> bool {
        self.subscribed.contains(&actor)
    }

    /// Number of watched actors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribed.len()
    }

    /// Reports whether nothing is watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribed.is_empty()
    }

    /// Inspects an event and yields the actor whose death must be reported.
    ///
    /// Only deactivations of dead, subscribed actors qualify; the actor is
    /// unsubscribed on the first report so later notifications are dropped.
    pub fn notify(&mut self, event: &Event) -> Option<ActorId> {
        match event {
            Event::ActorDeactivated { actor, dead: true } if self.subscribed.remove(actor) => {
                Some(*actor)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_subscribed_death() {
        let mut listener = DeathListener::new();
        let actor = ActorId::new(3);
        listener.subscribe(actor);

        let death = Event::ActorDeactivated { actor, dead: true };
        assert_eq!(listener.notify(&death), Some(actor));
        assert_eq!(listener.notify(&death), None);
        assert!(listener.is_empty());
    }

    #[test]
    fn ignores_deactivation_without_death_and_strangers() {
        let mut listener = DeathListener::new();
        let actor = ActorId::new(1);
        listener.subscribe(actor);

        assert_eq!(
            listener.notify(&Event::ActorDeactivated { actor, dead: false }),
            None
        );
        assert!(listener.is_subscribed(actor));
        assert_eq!(
            listener.notify(&Event::ActorDeactivated {
                actor: ActorId::new(2),
                dead: true
            }),
            None
        );
    }
}
