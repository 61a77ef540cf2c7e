//! Current-session tracking.

use tracing::warn;

use super::SessionFactory;
use crate::error::ClientResult;
use crate::session::Session;

/// Holds the current session of one thread of work.
///
/// The context owns its session. Binding a new session or unbinding closes
/// the previous one if it is still open; dropping the context closes the
/// current session.
#[derive(Debug)]
pub struct SessionContext {
    factory: SessionFactory,
    current: Option<Session>,
}

impl SessionContext {
    /// Creates an empty context.
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            factory,
            current: None,
        }
    }

    /// Returns the current session, opening and binding one if there is no
    /// open session.
    pub fn current_session(&mut self) -> ClientResult<&mut Session> {
        let session = match self.current.take() {
            Some(session) if session.is_open() => session,
            stale => {
                drop(stale);
                self.factory.open_session()?
            }
        };
        Ok(self.current.insert(session))
    }

    /// Returns the bound session without opening one.
    pub fn get(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Binds `session`, closing the previously bound session.
    pub fn bind(&mut self, session: Session) {
        self.terminate_current();
        self.current = Some(session);
    }

    /// Closes and removes the bound session.
    pub fn unbind(&mut self) {
        self.terminate_current();
    }

    fn terminate_current(&mut self) {
        if let Some(mut session) = self.current.take() {
            if let Err(err) = session.close() {
                warn!(session = %session.id(), error = %err, "failed to close bound session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory::MemoryDataSource;
    use std::sync::Arc;
    use std::thread;

    fn factory() -> (SessionFactory, Arc<MemoryDataSource>) {
        let source = Arc::new(MemoryDataSource::new());
        (SessionFactory::from_arc(source.clone()), source)
    }

    #[test]
    fn test_current_session_is_reused() {
        let (factory, source) = factory();
        let mut context = factory.context();
        assert!(context.get().is_none());

        let first = context.current_session().unwrap().id();
        let second = context.current_session().unwrap().id();
        assert_eq!(first, second);
        assert_eq!(source.connections_opened(), 1);
    }

    #[test]
    fn test_closed_session_is_replaced() {
        let (factory, source) = factory();
        let mut context = factory.context();
        let first = {
            let session = context.current_session().unwrap();
            session.close().unwrap();
            session.id()
        };
        let second = context.current_session().unwrap().id();
        assert_ne!(first, second);
        assert_eq!(source.connections_opened(), 2);
    }

    #[test]
    fn test_bind_closes_previous() {
        let (factory, source) = factory();
        let mut context = factory.context();
        context.current_session().unwrap();

        let replacement = factory.open_session().unwrap();
        let replacement_id = replacement.id();
        context.bind(replacement);

        let probes = source.probes();
        assert!(probes[0].is_closed());
        assert!(!probes[1].is_closed());
        assert_eq!(context.get().map(|s| s.id()), Some(replacement_id));
    }

    #[test]
    fn test_unbind_closes_current() {
        let (factory, source) = factory();
        let mut context = factory.context();
        context.current_session().unwrap().begin_transaction().unwrap();

        context.unbind();
        assert!(context.get().is_none());
        assert!(source.probes()[0].is_closed());
        context.unbind();
    }

    #[test]
    fn test_contexts_are_independent_across_threads() {
        let (factory, source) = factory();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let factory = factory.clone();
                thread::spawn(move || {
                    let mut context = factory.context();
                    let a = context.current_session().unwrap().id();
                    let b = context.current_session().unwrap().id();
                    assert_eq!(a, b);
                    a
                })
            })
            .collect();

        let mut ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_by_key(|id| id.as_u64());
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert_eq!(source.connections_opened(), 4);
        assert!(source.probes().iter().all(|p| p.is_closed()));
    }
}
