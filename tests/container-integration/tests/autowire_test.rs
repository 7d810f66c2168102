//! 自动装配集成测试

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use summer_abstractions::{TypeDescriptorBuilder, TypeInfo, TypeRegistry};
use summer_common::{
    AutowireMode, BeanDefinition, BeanValue, DependencyCheck, SCOPE_PROTOTYPE,
};
use summer_container::BeanContainer;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

trait Notifier: std::fmt::Debug + Send + Sync {
    fn id(&self) -> u64;
}

#[derive(Debug)]
struct MailNotifier {
    id: u64,
}

impl Notifier for MailNotifier {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug)]
struct SmsNotifier {
    id: u64,
}

impl Notifier for SmsNotifier {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug)]
struct AlertService {
    notifier: RwLock<Option<Arc<dyn Notifier>>>,
    threshold: RwLock<i64>,
}

fn notifier_registry() -> Arc<TypeRegistry> {
    let types = TypeRegistry::new();
    types.register(
        "mail_notifier",
        TypeDescriptorBuilder::new::<MailNotifier>()
            .constructor::<MailNotifier, _>(Vec::new(), |_| {
                Ok(MailNotifier {
                    id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                })
            })
            .implements::<dyn Notifier>(|handle| {
                handle
                    .clone()
                    .downcast::<MailNotifier>()
                    .ok()
                    .map(|concrete| concrete as Arc<dyn Notifier>)
            })
            .build(),
    );
    types.register(
        "sms_notifier",
        TypeDescriptorBuilder::new::<SmsNotifier>()
            .constructor::<SmsNotifier, _>(Vec::new(), |_| {
                Ok(SmsNotifier {
                    id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                })
            })
            .implements::<dyn Notifier>(|handle| {
                handle
                    .clone()
                    .downcast::<SmsNotifier>()
                    .ok()
                    .map(|concrete| concrete as Arc<dyn Notifier>)
            })
            .build(),
    );
    types.register(
        "alert_service",
        TypeDescriptorBuilder::new::<AlertService>()
            .constructor::<AlertService, _>(Vec::new(), |_| {
                Ok(AlertService {
                    notifier: RwLock::new(None),
                    threshold: RwLock::new(0),
                })
            })
            .property::<AlertService, _>(
                "notifier",
                TypeInfo::of::<dyn Notifier>(),
                |service, value| {
                    let notifier = summer_abstractions::downcast_shared::<dyn Notifier>(&value)?;
                    *service.notifier.write() = Some(notifier);
                    Ok(())
                },
            )
            .simple_property::<AlertService, _>(
                "threshold",
                TypeInfo::of::<i64>(),
                |service, value| {
                    let threshold = summer_abstractions::downcast_arc::<i64>(&value)?;
                    *service.threshold.write() = *threshold;
                    Ok(())
                },
            )
            .build(),
    );
    Arc::new(types)
}

fn service_definition() -> BeanDefinition {
    BeanDefinition::new("alert_service").with_autowire(AutowireMode::ByType)
}

#[test]
fn test_by_type_single_candidate_injected_with_edge() {
    let container = BeanContainer::new(notifier_registry());
    container
        .register_definition("mail", BeanDefinition::new("mail_notifier"))
        .unwrap();
    container
        .register_definition("alerts", service_definition())
        .unwrap();

    let service = container.get::<AlertService>("alerts").unwrap();
    let injected = service.notifier.read().clone().expect("应注入唯一候选");
    let mail = container.get::<MailNotifier>("mail").unwrap();
    assert_eq!(injected.id(), mail.id);

    // 真实注入留下依赖边
    assert_eq!(container.dependents_of("mail"), ["alerts"]);
    assert_eq!(container.dependencies_of("alerts"), ["mail"]);
}

#[test]
fn test_by_type_zero_candidates_optional_property_skipped() {
    let container = BeanContainer::new(notifier_registry());
    container
        .register_definition("alerts", service_definition())
        .unwrap();

    // 属性装配缺省可选, 没有候选时跳过
    let service = container.get::<AlertService>("alerts").unwrap();
    assert!(service.notifier.read().is_none());
}

#[test]
fn test_by_type_zero_candidates_required_check_fails() {
    let container = BeanContainer::new(notifier_registry());
    container
        .register_definition(
            "alerts",
            service_definition().with_dependency_check(DependencyCheck::Objects),
        )
        .unwrap();

    // 依赖检查把未满足的对象属性升级为错误
    let err = container.get_handle("alerts").unwrap_err();
    assert!(err.to_string().contains("notifier"));
}

#[test]
fn test_by_type_two_candidates_ambiguity_names_both() {
    let container = BeanContainer::new(notifier_registry());
    container
        .register_definition("mail", BeanDefinition::new("mail_notifier"))
        .unwrap();
    container
        .register_definition("sms", BeanDefinition::new("sms_notifier"))
        .unwrap();
    container
        .register_definition("alerts", service_definition())
        .unwrap();

    let err = container.get_handle("alerts").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("mail"), "错误应点名候选 mail: {message}");
    assert!(message.contains("sms"), "错误应点名候选 sms: {message}");
}

#[test]
fn test_by_type_primary_candidate_wins() {
    let container = BeanContainer::new(notifier_registry());
    container
        .register_definition("mail", BeanDefinition::new("mail_notifier"))
        .unwrap();
    container
        .register_definition(
            "sms",
            BeanDefinition::new("sms_notifier").with_primary(true),
        )
        .unwrap();
    container
        .register_definition("alerts", service_definition())
        .unwrap();

    let service = container.get::<AlertService>("alerts").unwrap();
    let injected = service.notifier.read().clone().unwrap();
    let sms = container.get::<SmsNotifier>("sms").unwrap();
    assert_eq!(injected.id(), sms.id);
}

#[test]
fn test_interface_scenario_single_implementor() {
    // a 按接口类型装配, b 是接口的唯一实现
    let container = BeanContainer::new(notifier_registry());
    container
        .register_definition("b", BeanDefinition::new("mail_notifier"))
        .unwrap();
    container
        .register_definition("a", service_definition())
        .unwrap();

    let a = container.get::<AlertService>("a").unwrap();
    let b = container.get_trait::<dyn Notifier>("b").unwrap();
    let injected = a.notifier.read().clone().unwrap();
    assert_eq!(injected.id(), b.id());
}

#[test]
fn test_by_name_autowiring() {
    let container = BeanContainer::new(notifier_registry());
    // 属性名 notifier 对应同名 Bean
    container
        .register_definition("notifier", BeanDefinition::new("mail_notifier"))
        .unwrap();
    container
        .register_definition(
            "alerts",
            BeanDefinition::new("alert_service").with_autowire(AutowireMode::ByName),
        )
        .unwrap();

    let service = container.get::<AlertService>("alerts").unwrap();
    assert!(service.notifier.read().is_some());
    assert_eq!(container.dependents_of("notifier"), ["alerts"]);
}

#[test]
fn test_scalar_property_passes_through_conversion() {
    let container = BeanContainer::new(notifier_registry());
    container
        .register_definition(
            "alerts",
            BeanDefinition::new("alert_service")
                .with_property("threshold", BeanValue::Value(serde_json::json!(42))),
        )
        .unwrap();

    let service = container.get::<AlertService>("alerts").unwrap();
    assert_eq!(*service.threshold.read(), 42);
}

#[test]
fn test_explicit_property_not_overwritten_by_autowire() {
    let container = BeanContainer::new(notifier_registry());
    container
        .register_definition("mail", BeanDefinition::new("mail_notifier"))
        .unwrap();
    container
        .register_definition("sms", BeanDefinition::new("sms_notifier"))
        .unwrap();
    // 显式引用绕过候选歧义
    container
        .register_definition(
            "alerts",
            service_definition().with_property("notifier", BeanValue::reference("sms")),
        )
        .unwrap();

    let service = container.get::<AlertService>("alerts").unwrap();
    let injected = service.notifier.read().clone().unwrap();
    let sms = container.get::<SmsNotifier>("sms").unwrap();
    assert_eq!(injected.id(), sms.id);
}

#[test]
fn test_prototype_instances_wired_independently() {
    let container = BeanContainer::new(notifier_registry());
    container
        .register_definition("mail", BeanDefinition::new("mail_notifier"))
        .unwrap();
    container
        .register_definition(
            "alerts",
            service_definition().with_scope(SCOPE_PROTOTYPE),
        )
        .unwrap();

    let first = container.get::<AlertService>("alerts").unwrap();
    let second = container.get::<AlertService>("alerts").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    // 两个原型实例都连到同一个单例候选
    assert_eq!(
        first.notifier.read().clone().unwrap().id(),
        second.notifier.read().clone().unwrap().id()
    );
}

#[test]
fn test_constructor_autowiring_selects_satisfiable() {
    #[derive(Debug)]
    struct Pager {
        notifier: Arc<dyn Notifier>,
    }

    let types = notifier_registry();
    types.register(
        "pager",
        TypeDescriptorBuilder::new::<Pager>()
            .constructor::<Pager, _>(
                vec![summer_abstractions::ParameterDescriptor::new(
                    "notifier",
                    TypeInfo::of::<dyn Notifier>(),
                )],
                |mut args| {
                    let notifier =
                        summer_abstractions::downcast_shared::<dyn Notifier>(&args.remove(0))?;
                    Ok(Pager { notifier })
                },
            )
            .build(),
    );
    let container = BeanContainer::new(types);
    container
        .register_definition("mail", BeanDefinition::new("mail_notifier"))
        .unwrap();
    container
        .register_definition(
            "pager",
            BeanDefinition::new("pager").with_autowire(AutowireMode::Constructor),
        )
        .unwrap();

    let pager = container.get::<Pager>("pager").unwrap();
    let mail = container.get::<MailNotifier>("mail").unwrap();
    assert_eq!(pager.notifier.id(), mail.id);
    assert_eq!(container.dependents_of("mail"), ["pager"]);
}
