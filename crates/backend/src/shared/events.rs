//! Реестр подписчиков с синхронной рассылкой.
//!
//! Подписчики вызываются в порядке регистрации. Ошибка или паника одного
//! подписчика логируется и не влияет на остальных и на вызывающего.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub struct ListenerRegistry<T: ?Sized> {
    name: &'static str,
    next_id: AtomicU64,
    listeners: Arc<Mutex<Vec<(u64, Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>)>>>,
}

impl<T: ?Sized + 'static> ListenerRegistry<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: AtomicU64::new(1),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handler: Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync> = Arc::new(handler);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, handler));

        let listeners = Arc::downgrade(&self.listeners);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(listeners) = listeners.upgrade() {
                    listeners
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .retain(|(lid, _)| *lid != id);
                }
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Разослать событие всем подписчикам
    pub fn notify(&self, payload: &T) {
        // список копируется, чтобы подписчик мог отписаться прямо из обработчика
        let listeners: Vec<Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(payload))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!("Listener of '{}' failed: {:#}", self.name, e);
                }
                Err(_) => {
                    tracing::error!("Listener of '{}' panicked", self.name);
                }
            }
        }
    }
}

/// Хендл подписки. Отписка только явная, через `unsubscribe`.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_in_registration_order() {
        let registry: ListenerRegistry<u32> = ListenerRegistry::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            let _sub = registry.subscribe(move |value: &u32| {
                seen.lock().unwrap().push(format!("{tag}:{value}"));
                Ok(())
            });
        }

        registry.notify(&7);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:7", "second:7", "third:7"]
        );
    }

    #[test]
    fn test_failing_listener_is_isolated() {
        let registry: ListenerRegistry<u32> = ListenerRegistry::new("test");
        let calls = Arc::new(AtomicU64::new(0));

        let _failing = registry.subscribe(|_| anyhow::bail!("boom"));
        let _panicking = registry.subscribe(|_| panic!("listener panic"));
        let counter = Arc::clone(&calls);
        let _ok = registry.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        registry.notify(&1);
        registry.notify(&2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let registry: ListenerRegistry<u32> = ListenerRegistry::new("test");
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let sub = registry.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        registry.notify(&1);
        sub.unsubscribe();
        registry.notify(&2);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unsized_payload() {
        let registry: ListenerRegistry<[String]> = ListenerRegistry::new("slice");
        let total = Arc::new(AtomicU64::new(0));
        let sum = Arc::clone(&total);
        let _sub = registry.subscribe(move |items: &[String]| {
            sum.fetch_add(items.len() as u64, Ordering::SeqCst);
            Ok(())
        });

        let items = vec!["a".to_string(), "b".to_string()];
        registry.notify(&items[..]);
        assert_eq!(total.load(Ordering::SeqCst), 2);
    }
}
