//! 依赖注册表（Registry）
//!
//! 命令处理器在注册时通过注册表解析其依赖：
//! - `Registry`：对象安全的最小协议，按 `TypeId` 查找依赖；
//! - `RegistryExt::resolve`：带类型的便捷解析（向下转型）；
//! - `ServiceRegistry`：基于 `DashMap` 的进程内实现，支持实例与工厂两种提供方式。
//!
//! 对 trait 对象依赖，以 `Arc<dyn Trait>` 作为注册与解析的类型。
//!
use crate::error::{RegistryError, RegistryResult as Result};
use dashmap::DashMap;
use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

pub type AnyService = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn(&ServiceRegistry) -> Result<AnyService> + Send + Sync>;

/// 依赖注册表协议
pub trait Registry: Send + Sync {
    fn lookup(&self, type_id: TypeId, type_name: &'static str) -> Result<AnyService>;
}

pub trait RegistryExt {
    fn resolve<T>(&self) -> Result<T>
    where
        T: Any + Clone + Send + Sync;
}

impl<R> RegistryExt for R
where
    R: Registry + ?Sized,
{
    fn resolve<T>(&self) -> Result<T>
    where
        T: Any + Clone + Send + Sync,
    {
        let service = self.lookup(TypeId::of::<T>(), type_name::<T>())?;
        service
            .downcast_ref::<T>()
            .cloned()
            .ok_or(RegistryError::TypeMismatch {
                expected: type_name::<T>(),
                found: "unknown",
            })
    }
}

#[derive(Clone)]
enum Provider {
    Instance(AnyService),
    Factory(Factory),
}

#[derive(Default)]
pub struct ServiceRegistry {
    providers: DashMap<TypeId, Provider>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册单例，后注册者覆盖先注册者
    pub fn provide<T>(&self, instance: T)
    where
        T: Any + Send + Sync,
    {
        self.providers
            .insert(TypeId::of::<T>(), Provider::Instance(Arc::new(instance)));
    }

    /// 注册工厂，每次解析都会重新调用
    pub fn provide_factory<T, F>(&self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&ServiceRegistry) -> Result<T> + Send + Sync + 'static,
    {
        let f: Factory = Arc::new(move |registry: &ServiceRegistry| {
            Ok(Arc::new(factory(registry)?) as AnyService)
        });
        self.providers.insert(TypeId::of::<T>(), Provider::Factory(f));
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.providers.contains_key(&TypeId::of::<T>())
    }
}

impl Registry for ServiceRegistry {
    fn lookup(&self, type_id: TypeId, type_name: &'static str) -> Result<AnyService> {
        // 先克隆出 provider 再释放分片锁，工厂内部可能递归解析
        let provider = self
            .providers
            .get(&type_id)
            .map(|p| p.value().clone())
            .ok_or(RegistryError::Unbound { type_name })?;

        match provider {
            Provider::Instance(service) => Ok(service),
            Provider::Factory(factory) => factory(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn resolves_instances_and_trait_objects() {
        let registry = ServiceRegistry::new();
        registry.provide(42u32);
        registry.provide::<Arc<dyn Greeter>>(Arc::new(English));

        assert_eq!(registry.resolve::<u32>().unwrap(), 42);
        let greeter = registry.resolve::<Arc<dyn Greeter>>().unwrap();
        assert_eq!(greeter.greet(), "hello");
    }

    #[test]
    fn factory_can_resolve_its_own_dependencies() {
        #[derive(Clone, Debug, PartialEq)]
        struct Banner(String);

        let registry = ServiceRegistry::new();
        registry.provide(String::from("base"));
        registry.provide_factory(|r: &ServiceRegistry| {
            let base: String = r.resolve()?;
            Ok(Banner(format!("{base}-derived")))
        });

        assert_eq!(
            registry.resolve::<Banner>().unwrap(),
            Banner("base-derived".into())
        );
    }

    #[test]
    fn factory_errors_propagate() {
        let registry = ServiceRegistry::new();
        registry.provide_factory::<u8, _>(|_| {
            Err(RegistryError::Factory {
                type_name: "u8",
                reason: "not today".into(),
            })
        });

        assert!(matches!(
            registry.resolve::<u8>(),
            Err(RegistryError::Factory { reason, .. }) if reason == "not today"
        ));
    }

    #[test]
    fn unbound_dependency_is_reported() {
        let registry = ServiceRegistry::new();
        let err = registry.resolve::<u64>().unwrap_err();
        assert_eq!(err, RegistryError::Unbound { type_name: "u64" });
        assert!(!registry.contains::<u64>());
    }
}
