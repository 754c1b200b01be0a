//! A single-threaded state container. Every change replaces the whole state
//! record and is then broadcast to the subscribers.

use std::fmt;

pub type SubscriptionId = usize;

type Subscriber<S> = Box<dyn FnMut(&S)>;

pub struct Store<S> {
    state: S,
    subscribers: Vec<(SubscriptionId, Subscriber<S>)>,
    next_id: SubscriptionId,
}

impl<S> Store<S> {
    pub fn new(initial: S) -> Self {
        Store {
            state: initial,
            subscribers: vec![],
            next_id: 0,
        }
    }

    pub fn get(&self) -> &S {
        &self.state
    }

    pub fn set(&mut self, next: S) {
        self.state = next;
        self.notify();
    }

    /// Computes the next state from the previous one and swaps it in.
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&S) -> S,
    {
        let next = f(&self.state);
        self.set(next);
    }

    /// Registers `callback`, which is called right away with the current
    /// state and again after every change.
    pub fn subscribe<F>(&mut self, mut callback: F) -> SubscriptionId
    where
        F: FnMut(&S) + 'static,
    {
        callback(&self.state);
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let len = self.subscribers.len();
        self.subscribers.retain(|(other, _)| *other != id);
        self.subscribers.len() != len
    }

    fn notify(&mut self) {
        let Store {
            state, subscribers, ..
        } = self;
        for (_, subscriber) in subscribers.iter_mut() {
            subscriber(&*state);
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        count: u32,
        label: &'static str,
    }

    fn recorder(store: &mut Store<Counter>) -> (SubscriptionId, Rc<RefCell<Vec<Counter>>>) {
        let seen = Rc::new(RefCell::new(vec![]));
        let sink = Rc::clone(&seen);
        let id = store.subscribe(move |state: &Counter| sink.borrow_mut().push(state.clone()));
        (id, seen)
    }

    #[test]
    fn subscribe_receives_current_state() {
        let mut store = Store::new(Counter {
            count: 0,
            label: "a",
        });
        let (_, seen) = recorder(&mut store);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].count, 0);
    }

    #[test]
    fn update_replaces_whole_state() {
        let mut store = Store::new(Counter {
            count: 0,
            label: "a",
        });
        let (_, seen) = recorder(&mut store);
        store.update(|prev| Counter {
            count: prev.count + 1,
            label: "b",
        });
        assert_eq!(
            store.get(),
            &Counter {
                count: 1,
                label: "b"
            }
        );
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow()[1], *store.get());
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut store = Store::new(Counter {
            count: 0,
            label: "a",
        });
        let (id, seen) = recorder(&mut store);
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set(Counter {
            count: 5,
            label: "c",
        });
        assert_eq!(seen.borrow().len(), 1);
    }
}
