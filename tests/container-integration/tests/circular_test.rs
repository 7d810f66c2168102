//! 循环引用集成测试

use std::sync::Arc;

use parking_lot::RwLock;
use summer_abstractions::{
    BeanPostProcessor, ContainerConfig, TypeDescriptorBuilder, TypeInfo, TypeRegistry,
};
use summer_common::{
    AutowireMode, BeanDefinition, BeanHandle, BeanValue, BeansResult, SCOPE_PROTOTYPE,
};
use summer_container::BeanContainer;

#[derive(Debug)]
struct EngineA {
    partner: RwLock<Option<Arc<EngineB>>>,
}

#[derive(Debug)]
struct EngineB {
    partner: RwLock<Option<Arc<EngineA>>>,
}

fn cycle_registry() -> Arc<TypeRegistry> {
    let types = TypeRegistry::new();
    types.register(
        "engine_a",
        TypeDescriptorBuilder::new::<EngineA>()
            .constructor::<EngineA, _>(Vec::new(), |_| {
                Ok(EngineA {
                    partner: RwLock::new(None),
                })
            })
            .property::<EngineA, _>("partner", TypeInfo::of::<EngineB>(), |engine, value| {
                let partner = summer_abstractions::downcast_arc::<EngineB>(&value)?;
                *engine.partner.write() = Some(partner);
                Ok(())
            })
            .build(),
    );
    types.register(
        "engine_b",
        TypeDescriptorBuilder::new::<EngineB>()
            .constructor::<EngineB, _>(Vec::new(), |_| {
                Ok(EngineB {
                    partner: RwLock::new(None),
                })
            })
            .property::<EngineB, _>("partner", TypeInfo::of::<EngineA>(), |engine, value| {
                let partner = summer_abstractions::downcast_arc::<EngineA>(&value)?;
                *engine.partner.write() = Some(partner);
                Ok(())
            })
            .build(),
    );
    Arc::new(types)
}

fn cycle_container(allow_circular: bool) -> BeanContainer {
    let config = ContainerConfig {
        allow_circular_references: allow_circular,
        ..ContainerConfig::default()
    };
    let container = BeanContainer::with_config(cycle_registry(), config);
    container
        .register_definition(
            "a",
            BeanDefinition::new("engine_a").with_autowire(AutowireMode::ByType),
        )
        .unwrap();
    container
        .register_definition(
            "b",
            BeanDefinition::new("engine_b").with_autowire(AutowireMode::ByType),
        )
        .unwrap();
    container
}

#[test]
fn test_singleton_cycle_resolves_when_enabled() {
    let container = cycle_container(true);

    let a = container.get::<EngineA>("a").unwrap();
    let b = container.get::<EngineB>("b").unwrap();

    // 初始化完成后双方都持有可用引用
    let a_partner = a.partner.read().clone().expect("a 应持有 b");
    let b_partner = b.partner.read().clone().expect("b 应持有 a");
    assert!(Arc::ptr_eq(&a_partner, &b));
    assert!(Arc::ptr_eq(&b_partner, &a));
}

#[test]
fn test_singleton_cycle_fails_when_disabled() {
    let container = cycle_container(false);
    let err = container.get::<EngineA>("a").unwrap_err();
    assert_eq!(err.circular_bean_name(), Some("a"));
}

#[test]
fn test_prototype_constructor_self_cycle_fails_fast() {
    #[derive(Debug)]
    struct ProtoNode;

    let types = TypeRegistry::new();
    types.register(
        "proto_node",
        TypeDescriptorBuilder::new::<ProtoNode>()
            .constructor::<ProtoNode, _>(
                vec![summer_abstractions::ParameterDescriptor::new(
                    "inner",
                    TypeInfo::of::<ProtoNode>(),
                )],
                |_args| Ok(ProtoNode),
            )
            .build(),
    );
    let container = BeanContainer::new(Arc::new(types));
    container
        .register_definition(
            "p",
            BeanDefinition::new("proto_node")
                .with_scope(SCOPE_PROTOTYPE)
                .with_constructor_arg(0, BeanValue::reference("p")),
        )
        .unwrap();

    let err = container.get_handle("p").unwrap_err();
    assert_eq!(err.circular_bean_name(), Some("p"));
}

#[test]
fn test_prototype_property_self_cycle_fails_fast() {
    #[derive(Debug)]
    struct ProtoHolder {
        inner: RwLock<Option<BeanHandle>>,
    }

    let types = TypeRegistry::new();
    types.register(
        "proto_holder",
        TypeDescriptorBuilder::new::<ProtoHolder>()
            .constructor::<ProtoHolder, _>(Vec::new(), |_| {
                Ok(ProtoHolder {
                    inner: RwLock::new(None),
                })
            })
            .property::<ProtoHolder, _>("inner", TypeInfo::of::<ProtoHolder>(), |holder, value| {
                *holder.inner.write() = Some(value);
                Ok(())
            })
            .build(),
    );
    let container = BeanContainer::new(Arc::new(types));
    container
        .register_definition(
            "q",
            BeanDefinition::new("proto_holder")
                .with_scope(SCOPE_PROTOTYPE)
                .with_property("inner", BeanValue::reference("q")),
        )
        .unwrap();

    let err = container.get_handle("q").unwrap_err();
    assert_eq!(err.circular_bean_name(), Some("q"));
}

/// 把 a 的最终实例替换为包装对象的处理器
struct WrappingProcessor;

impl BeanPostProcessor for WrappingProcessor {
    fn processor_name(&self) -> &str {
        "wrapping_processor"
    }

    fn after_initialization(
        &self,
        bean_name: &str,
        instance: BeanHandle,
    ) -> BeansResult<Option<BeanHandle>> {
        if bean_name == "a" {
            let replacement: BeanHandle = Arc::new(EngineA {
                partner: RwLock::new(None),
            });
            return Ok(Some(replacement));
        }
        Ok(Some(instance))
    }
}

#[test]
fn test_raw_reference_wrapped_divergence_rejected() {
    let container = cycle_container(true);
    container.add_post_processor(Arc::new(WrappingProcessor));

    let err = container.get_handle("a").unwrap_err();
    // b 已注入 a 的原始早期引用, 最终实例却被包装替换
    assert!(err.to_string().contains("包装"));
}

#[test]
fn test_raw_reference_wrapped_divergence_tolerated_when_configured() {
    let config = ContainerConfig {
        allow_circular_references: true,
        allow_raw_injection_despite_wrapping: true,
        ..ContainerConfig::default()
    };
    let container = BeanContainer::with_config(cycle_registry(), config);
    container
        .register_definition(
            "a",
            BeanDefinition::new("engine_a").with_autowire(AutowireMode::ByType),
        )
        .unwrap();
    container
        .register_definition(
            "b",
            BeanDefinition::new("engine_b").with_autowire(AutowireMode::ByType),
        )
        .unwrap();
    container.add_post_processor(Arc::new(WrappingProcessor));

    // 容忍开关打开时创建成功, b 持有的是未包装的原始实例
    let a = container.get::<EngineA>("a").unwrap();
    let b = container.get::<EngineB>("b").unwrap();
    let raw_a = b.partner.read().clone().expect("b 应持有 a 的原始引用");
    assert!(!Arc::ptr_eq(&raw_a, &a));
}

#[test]
fn test_early_reference_identity_within_cycle() {
    let container = cycle_container(true);
    let a = container.get::<EngineA>("a").unwrap();
    // 循环中注入的早期引用与最终缓存的实例是同一个对象
    let b = a.partner.read().clone().unwrap();
    let b_again = container.get::<EngineB>("b").unwrap();
    assert!(Arc::ptr_eq(&b, &b_again));
}
