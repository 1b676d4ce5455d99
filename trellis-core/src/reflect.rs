//! Key-scoped metadata store.
//!
//! Decorators attach structured data to a class or to one of its methods
//! without touching the callable itself; the router and the injector read it
//! back later. Entries are keyed by `(key, subject)` where the subject is a
//! stable identity derived from the owning type's [`TypeId`].

use crate::logging::trace;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Metadata keys written by the built-in decorators.
pub mod keys {
    /// Ordered dependency list of a class.
    pub const DEPENDENCIES: &str = "dependencies";
    /// Route fragment attached to a controller method.
    pub const ROUTE: &str = "route";
    /// Error handler descriptor attached to a controller method.
    pub const HTTP_ERROR_HANDLER: &str = "httpErrorHandler";
    /// Class-level path prefix of a controller.
    pub const BASE_PATH: &str = "basePath";
}

/// Identity of a class or of a method on a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    Class(TypeId),
    Method(TypeId, &'static str),
}

impl Subject {
    pub fn of<T: 'static>() -> Self {
        Subject::Class(TypeId::of::<T>())
    }

    pub fn method<T: 'static>(name: &'static str) -> Self {
        Subject::Method(TypeId::of::<T>(), name)
    }
}

type Entry = Arc<dyn Any + Send + Sync>;

/// Out-of-band metadata registry shared by decorators, injector and router.
#[derive(Default)]
pub struct Reflector {
    entries: RwLock<HashMap<(&'static str, Subject), Entry>>,
}

impl Reflector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `value` to `subject` under `key`, replacing any previous value.
    pub fn define_metadata<V>(&self, key: &'static str, value: V, subject: Subject)
    where
        V: Any + Send + Sync,
    {
        trace!(key, subject = ?subject, "Defining metadata");
        self.entries.write().insert((key, subject), Arc::new(value));
    }

    /// Read the value stored under `key` for `subject`.
    ///
    /// A value of a different type than `V` reads as absent.
    pub fn get_metadata<V>(&self, key: &'static str, subject: Subject) -> Option<V>
    where
        V: Any + Send + Sync + Clone,
    {
        self.entries
            .read()
            .get(&(key, subject))
            .and_then(|entry| entry.downcast_ref::<V>())
            .cloned()
    }

    pub fn has_metadata(&self, key: &'static str, subject: Subject) -> bool {
        self.entries.read().contains_key(&(key, subject))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Users;
    struct Posts;

    #[test]
    fn test_define_and_get() {
        let reflector = Reflector::new();
        reflector.define_metadata(keys::BASE_PATH, "/users".to_string(), Subject::of::<Users>());

        let value: Option<String> = reflector.get_metadata(keys::BASE_PATH, Subject::of::<Users>());
        assert_eq!(value.as_deref(), Some("/users"));
        assert!(
            reflector
                .get_metadata::<String>(keys::BASE_PATH, Subject::of::<Posts>())
                .is_none()
        );
    }

    #[test]
    fn test_last_definition_wins() {
        let reflector = Reflector::new();
        let subject = Subject::method::<Users>("index");
        reflector.define_metadata(keys::ROUTE, 1_u32, subject);
        reflector.define_metadata(keys::ROUTE, 2_u32, subject);

        assert_eq!(reflector.get_metadata::<u32>(keys::ROUTE, subject), Some(2));
        assert_eq!(reflector.len(), 1);
    }

    #[test]
    fn test_type_mismatch_reads_as_absent() {
        let reflector = Reflector::new();
        reflector.define_metadata(keys::ROUTE, 7_u32, Subject::of::<Users>());

        assert!(reflector.get_metadata::<String>(keys::ROUTE, Subject::of::<Users>()).is_none());
        assert!(reflector.has_metadata(keys::ROUTE, Subject::of::<Users>()));
    }

    #[test]
    fn test_methods_and_classes_are_distinct_subjects() {
        let reflector = Reflector::new();
        reflector.define_metadata(keys::ROUTE, "class", Subject::of::<Users>());
        reflector.define_metadata(keys::ROUTE, "method", Subject::method::<Users>("show"));

        assert_eq!(
            reflector.get_metadata::<&str>(keys::ROUTE, Subject::of::<Users>()),
            Some("class")
        );
        assert_eq!(
            reflector.get_metadata::<&str>(keys::ROUTE, Subject::method::<Users>("show")),
            Some("method")
        );
        assert!(!reflector.has_metadata(keys::ROUTE, Subject::method::<Users>("index")));
    }
}
