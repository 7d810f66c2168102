//! 容器使用演示
//!
//! 组装一个带仓储与服务的小型对象图，演示按类型自动装配与有序销毁。

use std::sync::Arc;

use parking_lot::RwLock;
use summer_abstractions::{downcast_shared, TypeDescriptorBuilder, TypeInfo};
use summer_common::{AutowireMode, BeanDefinition, BeanValue};
use summer_composition::ContainerBuilder;

trait OrderRepository: std::fmt::Debug + Send + Sync {
    fn save(&self, order: &str);
    fn count(&self) -> usize;
}

#[derive(Debug)]
struct MemoryOrderRepository {
    orders: RwLock<Vec<String>>,
}

impl OrderRepository for MemoryOrderRepository {
    fn save(&self, order: &str) {
        self.orders.write().push(order.to_string());
    }

    fn count(&self) -> usize {
        self.orders.read().len()
    }
}

#[derive(Debug)]
struct OrderService {
    label: RwLock<String>,
    repository: RwLock<Option<Arc<dyn OrderRepository>>>,
}

impl OrderService {
    fn place_order(&self, order: &str) {
        if let Some(repository) = self.repository.read().as_ref() {
            repository.save(order);
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let container = ContainerBuilder::new()
        .with_name("demo")
        .register_type(
            "memory_order_repository",
            TypeDescriptorBuilder::new::<MemoryOrderRepository>()
                .constructor::<MemoryOrderRepository, _>(Vec::new(), |_| {
                    Ok(MemoryOrderRepository {
                        orders: RwLock::new(Vec::new()),
                    })
                })
                .implements::<dyn OrderRepository>(|handle| {
                    handle
                        .clone()
                        .downcast::<MemoryOrderRepository>()
                        .ok()
                        .map(|concrete| concrete as Arc<dyn OrderRepository>)
                })
                .destroy_callback::<MemoryOrderRepository, _>(|repository| {
                    println!("仓储销毁, 共保存 {} 笔订单", repository.count());
                    Ok(())
                })
                .build(),
        )
        .register_type(
            "order_service",
            TypeDescriptorBuilder::new::<OrderService>()
                .constructor::<OrderService, _>(Vec::new(), |_| {
                    Ok(OrderService {
                        label: RwLock::new(String::new()),
                        repository: RwLock::new(None),
                    })
                })
                .simple_property::<OrderService, _>(
                    "label",
                    TypeInfo::of::<String>(),
                    |service, value| {
                        let label = summer_abstractions::downcast_arc::<String>(&value)?;
                        *service.label.write() = (*label).clone();
                        Ok(())
                    },
                )
                .property::<OrderService, _>(
                    "repository",
                    TypeInfo::of::<dyn OrderRepository>(),
                    |service, value| {
                        let repository = downcast_shared::<dyn OrderRepository>(&value)?;
                        *service.repository.write() = Some(repository);
                        Ok(())
                    },
                )
                .build(),
        )
        .register_definition("order_repository", BeanDefinition::new("memory_order_repository"))
        .register_definition(
            "order_service",
            BeanDefinition::new("order_service")
                .with_autowire(AutowireMode::ByType)
                .with_property("label", BeanValue::string("主站下单")),
        )
        .build()?;

    container.pre_instantiate_singletons()?;

    let service = container.get::<OrderService>("order_service")?;
    service.place_order("order-1001");
    service.place_order("order-1002");

    let repository = container.get_trait::<dyn OrderRepository>("order_repository")?;
    println!("标签 '{}' 下已保存 {} 笔订单", service.label.read(), repository.count());

    container.destroy_all();
    Ok(())
}
