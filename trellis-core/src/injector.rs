// Dependency injection

use crate::logging::{debug, trace};
use crate::reflect::{Reflector, Subject, keys};
use crate::Error;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A type-erased singleton held by the injector.
pub type Instance = Arc<dyn Any + Send + Sync>;

type Constructor = fn(&mut Dependencies) -> Result<Instance, Error>;

/// A type the injector knows how to build.
///
/// Dependencies declared with [`inject`] are resolved first and handed to
/// `construct` in declaration order.
///
/// ```
/// use std::sync::Arc;
/// use trellis_core::{Dependencies, Error, Injectable};
///
/// struct Database;
///
/// impl Injectable for Database {
///     fn construct(_: &mut Dependencies) -> Result<Self, Error> {
///         Ok(Database)
///     }
/// }
///
/// struct UserService {
///     db: Arc<Database>,
/// }
///
/// impl Injectable for UserService {
///     fn construct(deps: &mut Dependencies) -> Result<Self, Error> {
///         Ok(UserService { db: deps.next()? })
///     }
/// }
/// ```
pub trait Injectable: Send + Sync + Sized + 'static {
    fn construct(deps: &mut Dependencies) -> Result<Self, Error>;
}

/// A reference to an injectable class: its identity plus a way to build it.
#[derive(Clone, Copy)]
pub struct ClassRef {
    type_id: TypeId,
    name: &'static str,
    construct: Constructor,
}

impl ClassRef {
    pub fn of<T: Injectable>() -> Self {
        fn build<T: Injectable>(deps: &mut Dependencies) -> Result<Instance, Error> {
            Ok(Arc::new(T::construct(deps)?))
        }

        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            construct: build::<T>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn subject(&self) -> Subject {
        Subject::Class(self.type_id)
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ClassRef {}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassRef").field(&self.name).finish()
    }
}

/// Resolved dependencies of a class, consumed positionally by its constructor.
pub struct Dependencies {
    owner: &'static str,
    resolved: std::vec::IntoIter<(ClassRef, Instance)>,
}

impl Dependencies {
    fn new(owner: &'static str, resolved: Vec<(ClassRef, Instance)>) -> Self {
        Self {
            owner,
            resolved: resolved.into_iter(),
        }
    }

    /// An empty argument list, for building a class by hand.
    pub fn none() -> Self {
        Self::new("<manual>", Vec::new())
    }

    /// Take the next dependency, checking it has the expected type.
    pub fn next<T: Send + Sync + 'static>(&mut self) -> Result<Arc<T>, Error> {
        let (class, instance) = self.resolved.next().ok_or_else(|| {
            Error::DependencyInjection(format!(
                "{} asked for {} but no more dependencies were declared",
                self.owner,
                std::any::type_name::<T>()
            ))
        })?;

        instance.downcast::<T>().map_err(|_| {
            Error::DependencyInjection(format!(
                "{} expected {} but the declared dependency is {}",
                self.owner,
                std::any::type_name::<T>(),
                class.name()
            ))
        })
    }

    pub fn remaining(&self) -> usize {
        self.resolved.len()
    }
}

/// Declare the ordered dependencies of `T` (the class-level `Inject` decorator).
pub fn inject<T: 'static>(reflector: &Reflector, dependencies: impl IntoIterator<Item = ClassRef>) {
    let dependencies: Vec<ClassRef> = dependencies.into_iter().collect();
    trace!(
        class = std::any::type_name::<T>(),
        count = dependencies.len(),
        "Declaring dependencies"
    );
    reflector.define_metadata(keys::DEPENDENCIES, dependencies, Subject::of::<T>());
}

/// Resolves classes into memoized singletons.
///
/// Each injector owns its own cache, so tests can build an isolated graph
/// with a fresh instance.
pub struct Injector {
    reflector: Arc<Reflector>,
    instances: RwLock<HashMap<TypeId, Instance>>,
}

impl Injector {
    pub fn new() -> Self {
        Self::with_reflector(Arc::new(Reflector::new()))
    }

    pub fn with_reflector(reflector: Arc<Reflector>) -> Self {
        debug!("Creating new injector");
        Self {
            reflector,
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// The metadata store dependency lists are read from.
    pub fn reflector(&self) -> &Arc<Reflector> {
        &self.reflector
    }

    /// Store a pre-built singleton, replacing any cached instance of `T`.
    pub fn register<T: Send + Sync + 'static>(&self, instance: T) -> Arc<T> {
        let instance = Arc::new(instance);
        self.instances
            .write()
            .insert(TypeId::of::<T>(), instance.clone());
        debug!(class = std::any::type_name::<T>(), "Instance registered");
        instance
    }

    /// Look up a cached instance without constructing anything.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, Error> {
        let name = std::any::type_name::<T>();
        let instance = self
            .instances
            .read()
            .get(&TypeId::of::<T>())
            .cloned()
            .ok_or_else(|| Error::ProviderNotFound(name.to_string()))?;

        instance
            .downcast::<T>()
            .map_err(|_| Error::DependencyInjection(format!("cached instance of {} has the wrong type", name)))
    }

    /// Resolve `T`, constructing it and its dependency graph on first use.
    pub fn resolve<T: Injectable>(&self) -> Result<Arc<T>, Error> {
        let class = ClassRef::of::<T>();
        self.resolve_class(&class)?
            .downcast::<T>()
            .map_err(|_| Error::DependencyInjection(format!("cached instance of {} has the wrong type", class.name())))
    }

    /// Resolve a class reference into its type-erased singleton.
    pub fn resolve_class(&self, class: &ClassRef) -> Result<Instance, Error> {
        let mut path = Vec::new();
        self.resolve_in(class, &mut path)
    }

    /// Eagerly resolve and cache each class.
    pub fn bind(&self, classes: impl IntoIterator<Item = ClassRef>) -> Result<(), Error> {
        for class in classes {
            self.resolve_class(&class)?;
        }
        Ok(())
    }

    pub fn has<T: 'static>(&self) -> bool {
        self.instances.read().contains_key(&TypeId::of::<T>())
    }

    pub fn has_class(&self, class: &ClassRef) -> bool {
        self.instances.read().contains_key(&class.type_id())
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    /// Drop every cached instance.
    pub fn clear(&self) {
        self.instances.write().clear();
        debug!("Injector cache cleared");
    }

    fn resolve_in(&self, class: &ClassRef, path: &mut Vec<ClassRef>) -> Result<Instance, Error> {
        if let Some(instance) = self.instances.read().get(&class.type_id()) {
            trace!(class = class.name(), "Resolved from cache");
            return Ok(instance.clone());
        }

        if path.contains(class) {
            let cycle = path
                .iter()
                .skip_while(|entry| *entry != class)
                .chain(std::iter::once(class))
                .map(|entry| entry.name())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(Error::CyclicDependency(cycle));
        }

        let declared: Vec<ClassRef> = self
            .reflector
            .get_metadata(keys::DEPENDENCIES, class.subject())
            .unwrap_or_default();

        path.push(*class);
        let resolved = declared
            .iter()
            .map(|dependency| {
                self.resolve_in(dependency, path)
                    .map(|instance| (*dependency, instance))
            })
            .collect::<Result<Vec<_>, Error>>();
        path.pop();
        let resolved = resolved?;

        trace!(
            class = class.name(),
            dependencies = resolved.len(),
            "Constructing instance"
        );
        let mut deps = Dependencies::new(class.name(), resolved);
        let instance = (class.construct)(&mut deps)?;

        let stored = self
            .instances
            .write()
            .entry(class.type_id())
            .or_insert(instance)
            .clone();
        debug!(class = class.name(), "Instance resolved");
        Ok(stored)
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTED_BUILDS: AtomicUsize = AtomicUsize::new(0);

    // Only `test_resolve_is_memoized` resolves this one.
    struct Counted;

    impl Injectable for Counted {
        fn construct(_: &mut Dependencies) -> Result<Self, Error> {
            COUNTED_BUILDS.fetch_add(1, Ordering::SeqCst);
            Ok(Counted)
        }
    }

    struct Leaf;

    impl Injectable for Leaf {
        fn construct(_: &mut Dependencies) -> Result<Self, Error> {
            Ok(Leaf)
        }
    }

    struct Branch {
        leaf: Arc<Leaf>,
    }

    impl Injectable for Branch {
        fn construct(deps: &mut Dependencies) -> Result<Self, Error> {
            Ok(Branch { leaf: deps.next()? })
        }
    }

    struct Broken;

    impl Injectable for Broken {
        fn construct(_: &mut Dependencies) -> Result<Self, Error> {
            Err(Error::internal("constructor failed"))
        }
    }

    struct NeedsBroken;

    impl Injectable for NeedsBroken {
        fn construct(deps: &mut Dependencies) -> Result<Self, Error> {
            deps.next::<Broken>()?;
            Ok(NeedsBroken)
        }
    }

    #[test]
    fn test_resolve_is_memoized() {
        let injector = Injector::new();
        let first = injector.resolve::<Counted>().unwrap();
        let second = injector.resolve::<Counted>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(COUNTED_BUILDS.load(Ordering::SeqCst), 1);
        assert!(injector.has::<Counted>());
    }

    #[test]
    fn test_dependencies_are_shared() {
        let injector = Injector::new();
        inject::<Branch>(injector.reflector(), [ClassRef::of::<Leaf>()]);

        let branch = injector.resolve::<Branch>().unwrap();
        let leaf = injector.get::<Leaf>().unwrap();
        assert!(Arc::ptr_eq(&branch.leaf, &leaf));
    }

    #[test]
    fn test_missing_declaration_is_reported() {
        let injector = Injector::new();
        let err = injector.resolve::<Branch>().err().unwrap();
        assert!(matches!(err, Error::DependencyInjection(_)));
        assert!(!injector.has::<Branch>());
    }

    #[test]
    fn test_failed_construction_caches_nothing() {
        let injector = Injector::new();
        inject::<NeedsBroken>(injector.reflector(), [ClassRef::of::<Broken>()]);

        let err = injector.resolve::<NeedsBroken>().err().unwrap();
        assert!(matches!(err, Error::Internal { .. }));
        assert!(!injector.has::<Broken>());
        assert!(!injector.has::<NeedsBroken>());
    }

    #[test]
    fn test_register_and_get() {
        let injector = Injector::new();
        assert!(matches!(injector.get::<String>(), Err(Error::ProviderNotFound(_))));

        injector.register(String::from("configured"));
        assert_eq!(injector.get::<String>().unwrap().as_str(), "configured");

        injector.clear();
        assert!(injector.is_empty());
    }

    #[test]
    fn test_wrong_dependency_type() {
        let mut deps = Dependencies::new(
            "Owner",
            vec![(ClassRef::of::<Leaf>(), Arc::new(Leaf) as Instance)],
        );
        let err = deps.next::<Branch>().err().unwrap();
        assert!(err.to_string().contains("expected"));
        assert_eq!(deps.remaining(), 0);
    }
}
