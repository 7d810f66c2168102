//! 后置处理器流水线集成测试

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use summer_abstractions::{
    BeanPostProcessor, TypeDescriptorBuilder, TypeInfo, TypeRegistry,
};
use summer_common::{
    BeanDefinition, BeanHandle, BeanValue, BeansResult, MergedBeanDefinition, PropertyValues,
    SCOPE_PROTOTYPE,
};
use summer_container::BeanContainer;

#[derive(Debug)]
struct Document {
    title: RwLock<String>,
}

fn document_registry(constructions: Arc<Mutex<usize>>) -> Arc<TypeRegistry> {
    let types = TypeRegistry::new();
    types.register(
        "document",
        TypeDescriptorBuilder::new::<Document>()
            .constructor::<Document, _>(Vec::new(), move |_| {
                *constructions.lock() += 1;
                Ok(Document {
                    title: RwLock::new(String::new()),
                })
            })
            .simple_property::<Document, _>("title", TypeInfo::of::<String>(), |doc, value| {
                let title = summer_abstractions::downcast_arc::<String>(&value)?;
                *doc.title.write() = (*title).clone();
                Ok(())
            })
            .build(),
    );
    Arc::new(types)
}

/// 记录各阶段调用的处理器
struct RecordingProcessor {
    label: &'static str,
    order: i32,
    log: Arc<Mutex<Vec<String>>>,
}

impl BeanPostProcessor for RecordingProcessor {
    fn processor_name(&self) -> &str {
        self.label
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn before_initialization(
        &self,
        bean_name: &str,
        instance: BeanHandle,
    ) -> BeansResult<Option<BeanHandle>> {
        self.log
            .lock()
            .push(format!("{}:before_init:{}", self.label, bean_name));
        Ok(Some(instance))
    }

    fn after_initialization(
        &self,
        bean_name: &str,
        instance: BeanHandle,
    ) -> BeansResult<Option<BeanHandle>> {
        self.log
            .lock()
            .push(format!("{}:after_init:{}", self.label, bean_name));
        Ok(Some(instance))
    }
}

#[test]
fn test_processors_run_in_declared_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = BeanContainer::new(document_registry(Arc::new(Mutex::new(0))));
    // 注册顺序与执行顺序无关, order 小者先执行
    container.add_post_processor(Arc::new(RecordingProcessor {
        label: "late",
        order: 10,
        log: log.clone(),
    }));
    container.add_post_processor(Arc::new(RecordingProcessor {
        label: "early",
        order: -10,
        log: log.clone(),
    }));
    container
        .register_definition("doc", BeanDefinition::new("document"))
        .unwrap();

    container.get::<Document>("doc").unwrap();
    assert_eq!(
        log.lock().as_slice(),
        [
            "early:before_init:doc",
            "late:before_init:doc",
            "early:after_init:doc",
            "late:after_init:doc",
        ]
    );
}

/// 前置实例化直接给出替代实例的处理器
struct SubstituteProcessor;

impl BeanPostProcessor for SubstituteProcessor {
    fn before_instantiation(
        &self,
        bean_name: &str,
        _merged: &MergedBeanDefinition,
    ) -> BeansResult<Option<BeanHandle>> {
        if bean_name == "doc" {
            return Ok(Some(Arc::new(Document {
                title: RwLock::new("substituted".to_string()),
            })));
        }
        Ok(None)
    }
}

#[test]
fn test_before_instantiation_short_circuits_construction() {
    let constructions = Arc::new(Mutex::new(0));
    let container = BeanContainer::new(document_registry(constructions.clone()));
    container.add_post_processor(Arc::new(SubstituteProcessor));
    container
        .register_definition(
            "doc",
            BeanDefinition::new("document").with_property("title", BeanValue::string("ignored")),
        )
        .unwrap();

    let doc = container.get::<Document>("doc").unwrap();
    // 常规构造与属性填充都被跳过
    assert_eq!(*doc.title.read(), "substituted");
    assert_eq!(*constructions.lock(), 0);
}

/// 否决属性填充的处理器
struct VetoPopulationProcessor;

impl BeanPostProcessor for VetoPopulationProcessor {
    fn after_instantiation(&self, _bean_name: &str, _instance: &BeanHandle) -> BeansResult<bool> {
        Ok(false)
    }
}

#[test]
fn test_after_instantiation_vetoes_population() {
    let container = BeanContainer::new(document_registry(Arc::new(Mutex::new(0))));
    container.add_post_processor(Arc::new(VetoPopulationProcessor));
    container
        .register_definition(
            "doc",
            BeanDefinition::new("document").with_property("title", BeanValue::string("skipped")),
        )
        .unwrap();

    let doc = container.get::<Document>("doc").unwrap();
    assert_eq!(*doc.title.read(), "");
}

/// 改写属性集的处理器
struct RewriteProcessor;

impl BeanPostProcessor for RewriteProcessor {
    fn process_property_values(
        &self,
        _bean_name: &str,
        _instance: &BeanHandle,
        mut property_values: PropertyValues,
    ) -> BeansResult<Option<PropertyValues>> {
        property_values.add("title", BeanValue::string("rewritten"));
        Ok(Some(property_values))
    }
}

#[test]
fn test_property_values_rewritten_before_assignment() {
    let container = BeanContainer::new(document_registry(Arc::new(Mutex::new(0))));
    container.add_post_processor(Arc::new(RewriteProcessor));
    container
        .register_definition(
            "doc",
            BeanDefinition::new("document").with_property("title", BeanValue::string("original")),
        )
        .unwrap();

    let doc = container.get::<Document>("doc").unwrap();
    assert_eq!(*doc.title.read(), "rewritten");
}

/// 初始化链中返回空结果的处理器
struct ShortCircuitProcessor {
    log: Arc<Mutex<Vec<String>>>,
}

impl BeanPostProcessor for ShortCircuitProcessor {
    fn order(&self) -> i32 {
        0
    }

    fn before_initialization(
        &self,
        _bean_name: &str,
        _instance: BeanHandle,
    ) -> BeansResult<Option<BeanHandle>> {
        self.log.lock().push("short_circuit".to_string());
        Ok(None)
    }
}

#[test]
fn test_empty_result_short_circuits_initialization_chain() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = BeanContainer::new(document_registry(Arc::new(Mutex::new(0))));
    container.add_post_processor(Arc::new(ShortCircuitProcessor { log: log.clone() }));
    container.add_post_processor(Arc::new(RecordingProcessor {
        label: "after",
        order: 5,
        log: log.clone(),
    }));
    container
        .register_definition("doc", BeanDefinition::new("document"))
        .unwrap();

    container.get::<Document>("doc").unwrap();
    let events = log.lock().clone();
    // 短路只影响 before_initialization 链的剩余部分
    assert_eq!(
        events,
        ["short_circuit", "after:after_init:doc"]
    );
}

/// 统计合并定义后置处理次数的处理器
struct MergedCountingProcessor {
    runs: Arc<Mutex<usize>>,
}

impl BeanPostProcessor for MergedCountingProcessor {
    fn process_merged_definition(
        &self,
        _bean_name: &str,
        merged: &MergedBeanDefinition,
    ) -> BeansResult<()> {
        *self.runs.lock() += 1;
        merged.set_attribute("inspected", serde_json::json!(true));
        Ok(())
    }
}

#[test]
fn test_merged_definition_processed_once_per_definition() {
    let runs = Arc::new(Mutex::new(0));
    let container = BeanContainer::new(document_registry(Arc::new(Mutex::new(0))));
    container.add_post_processor(Arc::new(MergedCountingProcessor { runs: runs.clone() }));
    container
        .register_definition(
            "doc",
            BeanDefinition::new("document").with_scope(SCOPE_PROTOTYPE),
        )
        .unwrap();

    // 同一定义的重复创建不会重复处理
    container.get::<Document>("doc").unwrap();
    container.get::<Document>("doc").unwrap();
    assert_eq!(*runs.lock(), 1);
}

/// 执行即失败的处理器
struct FailingProcessor;

impl BeanPostProcessor for FailingProcessor {
    fn before_initialization(
        &self,
        _bean_name: &str,
        _instance: BeanHandle,
    ) -> BeansResult<Option<BeanHandle>> {
        Err(summer_common::BeansError::other("钩子内部失败"))
    }
}

#[test]
fn test_processor_failure_aborts_creation_with_cause() {
    let container = BeanContainer::new(document_registry(Arc::new(Mutex::new(0))));
    container.add_post_processor(Arc::new(FailingProcessor));
    container
        .register_definition("doc", BeanDefinition::new("document"))
        .unwrap();

    let err = container.get_handle("doc").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("doc"));
    assert!(message.contains("钩子内部失败"));
    // 失败清除了部分注册, 再次请求仍然从干净状态走完整流程
    assert!(container.get_handle("doc").is_err());
}
