//! 定义合并、作用域与工厂集成测试

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use summer_abstractions::{
    Scope, ScopedProvider, TypeDescriptorBuilder, TypeInfo, TypeRegistry,
};
use summer_common::{BeanDefinition, BeanHandle, BeanValue, BeansResult};
use summer_container::BeanContainer;

#[derive(Debug)]
struct DataSource {
    url: RwLock<String>,
    pool_size: RwLock<i64>,
}

fn data_source_registry() -> Arc<TypeRegistry> {
    let types = TypeRegistry::new();
    types.register(
        "data_source",
        TypeDescriptorBuilder::new::<DataSource>()
            .constructor::<DataSource, _>(Vec::new(), |_| {
                Ok(DataSource {
                    url: RwLock::new(String::new()),
                    pool_size: RwLock::new(0),
                })
            })
            .simple_property::<DataSource, _>("url", TypeInfo::of::<String>(), |ds, value| {
                let url = summer_abstractions::downcast_arc::<String>(&value)?;
                *ds.url.write() = (*url).clone();
                Ok(())
            })
            .simple_property::<DataSource, _>(
                "pool_size",
                TypeInfo::of::<i64>(),
                |ds, value| {
                    let pool_size = summer_abstractions::downcast_arc::<i64>(&value)?;
                    *ds.pool_size.write() = *pool_size;
                    Ok(())
                },
            )
            .build(),
    );
    Arc::new(types)
}

#[test]
fn test_child_definition_overrides_only_one_property() {
    let container = BeanContainer::new(data_source_registry());
    container
        .register_definition(
            "base_ds",
            BeanDefinition::new("data_source")
                .with_abstract(true)
                .with_property("url", BeanValue::string("jdbc://primary"))
                .with_property("pool_size", BeanValue::Value(serde_json::json!(8))),
        )
        .unwrap();
    container
        .register_definition(
            "tuned_ds",
            BeanDefinition::child_of("base_ds")
                .with_property("pool_size", BeanValue::Value(serde_json::json!(32))),
        )
        .unwrap();

    let ds = container.get::<DataSource>("tuned_ds").unwrap();
    // 只覆盖 pool_size, 其余父属性原样保留
    assert_eq!(*ds.url.read(), "jdbc://primary");
    assert_eq!(*ds.pool_size.read(), 32);
}

#[test]
fn test_parent_container_delegation() {
    let parent = BeanContainer::new(data_source_registry());
    parent
        .register_definition(
            "shared_ds",
            BeanDefinition::new("data_source")
                .with_property("url", BeanValue::string("jdbc://parent")),
        )
        .unwrap();
    let parent: Arc<BeanContainer> = Arc::new(parent);

    let mut child = BeanContainer::new(data_source_registry());
    child.set_parent(parent.clone());

    // 本地未命中时向父容器委派一次
    let ds = child.get::<DataSource>("shared_ds").unwrap();
    assert_eq!(*ds.url.read(), "jdbc://parent");
    assert!(child.contains("shared_ds"));
    assert!(child.is_singleton("shared_ds").unwrap());

    // 父子容器各自独立缓存, 委派返回的是父容器的单例
    let from_parent = parent.get::<DataSource>("shared_ds").unwrap();
    assert!(Arc::ptr_eq(&ds, &from_parent));
}

#[test]
fn test_parent_definition_chain_across_containers() {
    let parent = BeanContainer::new(data_source_registry());
    parent
        .register_definition(
            "ds_template",
            BeanDefinition::new("data_source")
                .with_property("url", BeanValue::string("jdbc://template"))
                .with_property("pool_size", BeanValue::Value(serde_json::json!(4))),
        )
        .unwrap();

    let mut child = BeanContainer::new(data_source_registry());
    child.set_parent(Arc::new(parent) as Arc<_>);
    child
        .register_definition(
            "local_ds",
            BeanDefinition::child_of("ds_template")
                .with_property("pool_size", BeanValue::Value(serde_json::json!(16))),
        )
        .unwrap();

    let ds = child.get::<DataSource>("local_ds").unwrap();
    assert_eq!(*ds.url.read(), "jdbc://template");
    assert_eq!(*ds.pool_size.read(), 16);
}

/// 按名字缓存实例的会话作用域
struct SessionScope {
    cache: Mutex<HashMap<String, BeanHandle>>,
    callbacks: Mutex<HashMap<String, Box<dyn FnOnce() + Send>>>,
}

impl SessionScope {
    fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            callbacks: Mutex::new(HashMap::new()),
        }
    }

    fn close(&self) {
        let callbacks: Vec<_> = {
            let mut callbacks = self.callbacks.lock();
            callbacks.drain().collect()
        };
        self.cache.lock().clear();
        for (_, callback) in callbacks {
            callback();
        }
    }
}

impl Scope for SessionScope {
    fn get(&self, name: &str, provider: ScopedProvider<'_>) -> BeansResult<BeanHandle> {
        if let Some(existing) = self.cache.lock().get(name) {
            return Ok(existing.clone());
        }
        let created = provider()?;
        self.cache.lock().insert(name.to_string(), created.clone());
        Ok(created)
    }

    fn remove(&self, name: &str) -> Option<BeanHandle> {
        self.callbacks.lock().remove(name);
        self.cache.lock().remove(name)
    }

    fn register_destruction_callback(&self, name: &str, callback: Box<dyn FnOnce() + Send>) {
        self.callbacks.lock().insert(name.to_string(), callback);
    }
}

#[test]
fn test_custom_scope_caches_and_destroys() {
    let destroyed = Arc::new(Mutex::new(Vec::new()));
    let types = TypeRegistry::new();
    let destroyed_in_callback = destroyed.clone();
    types.register(
        "session_state",
        TypeDescriptorBuilder::new::<DataSource>()
            .constructor::<DataSource, _>(Vec::new(), |_| {
                Ok(DataSource {
                    url: RwLock::new("session".to_string()),
                    pool_size: RwLock::new(1),
                })
            })
            .destroy_callback::<DataSource, _>(move |_| {
                destroyed_in_callback.lock().push("session_state".to_string());
                Ok(())
            })
            .build(),
    );
    let container = BeanContainer::new(Arc::new(types));
    let scope = Arc::new(SessionScope::new());
    container.register_scope("session", scope.clone()).unwrap();
    container
        .register_definition(
            "session_state",
            BeanDefinition::new("session_state").with_scope("session"),
        )
        .unwrap();

    let first = container.get::<DataSource>("session_state").unwrap();
    let second = container.get::<DataSource>("session_state").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // 作用域结束时通过登记的回调销毁
    scope.close();
    assert_eq!(destroyed.lock().as_slice(), ["session_state"]);
}

#[test]
fn test_unregistered_scope_rejected() {
    let container = BeanContainer::new(data_source_registry());
    container
        .register_definition(
            "conversation_ds",
            BeanDefinition::new("data_source").with_scope("conversation"),
        )
        .unwrap();
    let err = container.get_handle("conversation_ds").unwrap_err();
    assert!(err.to_string().contains("conversation"));
}

#[derive(Debug)]
struct Connection {
    dsn: String,
}

#[derive(Debug)]
struct ConnectionFactory {
    prefix: String,
}

fn factory_registry() -> Arc<TypeRegistry> {
    let types = TypeRegistry::new();
    types.register(
        "connection_factory",
        TypeDescriptorBuilder::new::<ConnectionFactory>()
            .constructor::<ConnectionFactory, _>(Vec::new(), |_| {
                Ok(ConnectionFactory {
                    prefix: "tcp".to_string(),
                })
            })
            .factory_method::<Connection, _>(
                "open",
                false,
                vec![summer_abstractions::ParameterDescriptor::new(
                    "dsn",
                    TypeInfo::of::<String>(),
                )],
                |factory, mut args| {
                    let factory = summer_abstractions::downcast_arc::<ConnectionFactory>(
                        factory.expect("实例工厂方法需要工厂 Bean"),
                    )?;
                    let dsn = summer_abstractions::downcast_arc::<String>(&args.remove(0))?;
                    Ok(Connection {
                        dsn: format!("{}://{}", factory.prefix, dsn),
                    })
                },
            )
            .factory_method::<Connection, _>("default_connection", true, Vec::new(), |_, _| {
                Ok(Connection {
                    dsn: "tcp://default".to_string(),
                })
            })
            .build(),
    );
    types.register(
        "connection",
        TypeDescriptorBuilder::new::<Connection>().build(),
    );
    Arc::new(types)
}

#[test]
fn test_static_factory_method() {
    let container = BeanContainer::new(factory_registry());
    container
        .register_definition(
            "default_conn",
            BeanDefinition::new("connection_factory").with_factory_method("default_connection"),
        )
        .unwrap();

    let conn = container.get::<Connection>("default_conn").unwrap();
    assert_eq!(conn.dsn, "tcp://default");
    assert_eq!(
        container.get_type("default_conn").unwrap().id,
        std::any::TypeId::of::<Connection>()
    );
}

#[test]
fn test_instance_factory_method_with_argument() {
    let container = BeanContainer::new(factory_registry());
    container
        .register_definition("conn_factory", BeanDefinition::new("connection_factory"))
        .unwrap();
    container
        .register_definition(
            "orders_conn",
            BeanDefinition::default()
                .with_factory_bean("conn_factory")
                .with_factory_method("open")
                .with_constructor_arg(0, BeanValue::string("orders")),
        )
        .unwrap();

    let conn = container.get::<Connection>("orders_conn").unwrap();
    assert_eq!(conn.dsn, "tcp://orders");
    // 工厂 Bean 留下依赖边
    assert_eq!(container.dependents_of("conn_factory"), ["orders_conn"]);
}

#[test]
fn test_prototype_factory_method_skips_reresolution() {
    let container = BeanContainer::new(factory_registry());
    container
        .register_definition("conn_factory", BeanDefinition::new("connection_factory"))
        .unwrap();
    container
        .register_definition(
            "conn",
            BeanDefinition::default()
                .with_factory_bean("conn_factory")
                .with_factory_method("open")
                .with_constructor_arg(0, BeanValue::string("db"))
                .with_scope(summer_common::SCOPE_PROTOTYPE),
        )
        .unwrap();

    let first = container.get::<Connection>("conn").unwrap();
    let second = container.get::<Connection>("conn").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.dsn, second.dsn);
}

#[derive(Debug)]
struct Client {
    serial: u64,
}

#[derive(Debug)]
struct ClientFactory {
    issued: AtomicU64,
}

fn contract_registry() -> Arc<TypeRegistry> {
    let types = TypeRegistry::new();
    types.register(
        "client_factory",
        TypeDescriptorBuilder::new::<ClientFactory>()
            .constructor::<ClientFactory, _>(Vec::new(), |_| {
                Ok(ClientFactory {
                    issued: AtomicU64::new(0),
                })
            })
            .factory_contract(TypeInfo::of::<Client>(), true, |factory| {
                let factory = summer_abstractions::downcast_arc::<ClientFactory>(factory)?;
                Ok(Arc::new(Client {
                    serial: factory.issued.fetch_add(1, Ordering::Relaxed),
                }) as BeanHandle)
            })
            .build(),
    );
    types.register("client", TypeDescriptorBuilder::new::<Client>().build());
    Arc::new(types)
}

#[test]
fn test_factory_contract_product_injection_and_cache() {
    let container = BeanContainer::new(contract_registry());
    container
        .register_definition("client", BeanDefinition::new("client_factory"))
        .unwrap();

    // 非解引用请求返回产品, 单例产品只生产一次
    let first = container.get::<Client>("client").unwrap();
    let second = container.get::<Client>("client").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.serial, 0);

    // 解引用请求返回工厂对象本身
    let factory = container.get::<ClientFactory>("&client").unwrap();
    assert_eq!(factory.issued.load(Ordering::Relaxed), 1);

    // 类型查询报告产品类型
    assert_eq!(
        container.get_type("client").unwrap().id,
        std::any::TypeId::of::<Client>()
    );
    assert_eq!(
        container.get_type("&client").unwrap().id,
        std::any::TypeId::of::<ClientFactory>()
    );
}

#[test]
fn test_factory_dereference_on_plain_bean_rejected() {
    let container = BeanContainer::new(data_source_registry());
    container
        .register_definition("plain", BeanDefinition::new("data_source"))
        .unwrap();
    assert!(container.get_handle("&plain").is_err());
}
