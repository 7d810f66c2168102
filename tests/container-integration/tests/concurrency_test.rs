//! 并发访问集成测试
//!
//! 调度由调用方驱动, 并发只来自外部线程同时调用容器。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::RwLock;
use summer_abstractions::{TypeDescriptorBuilder, TypeInfo, TypeRegistry};
use summer_common::{BeanDefinition, BeanValue};
use summer_container::BeanContainer;

#[derive(Debug)]
struct Counter {
    label: RwLock<String>,
}

fn counter_container(constructions: Arc<AtomicUsize>) -> Arc<BeanContainer> {
    let types = TypeRegistry::new();
    types.register(
        "counter",
        TypeDescriptorBuilder::new::<Counter>()
            .constructor::<Counter, _>(Vec::new(), move |_| {
                constructions.fetch_add(1, Ordering::SeqCst);
                Ok(Counter {
                    label: RwLock::new(String::new()),
                })
            })
            .simple_property::<Counter, _>("label", TypeInfo::of::<String>(), |counter, value| {
                let label = summer_abstractions::downcast_arc::<String>(&value)?;
                *counter.label.write() = (*label).clone();
                Ok(())
            })
            .build(),
    );
    Arc::new(BeanContainer::new(Arc::new(types)))
}

#[test]
fn test_concurrent_get_yields_single_instance() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let container = counter_container(constructions.clone());
    container
        .register_definition(
            "counter",
            BeanDefinition::new("counter").with_property("label", BeanValue::string("shared")),
        )
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let container = container.clone();
        handles.push(thread::spawn(move || {
            container.get::<Counter>("counter").unwrap()
        }));
    }
    let instances: Vec<Arc<Counter>> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    // 单例创建不会被任何调用方观察到半成品状态
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    for instance in &instances[1..] {
        assert!(Arc::ptr_eq(&instances[0], instance));
        assert_eq!(*instance.label.read(), "shared");
    }
}

#[test]
fn test_concurrent_distinct_beans() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let container = counter_container(constructions.clone());
    for index in 0..4 {
        container
            .register_definition(
                format!("counter_{index}"),
                BeanDefinition::new("counter")
                    .with_property("label", BeanValue::string(format!("c{index}"))),
            )
            .unwrap();
    }

    let mut handles = Vec::new();
    for index in 0..4 {
        for _ in 0..4 {
            let container = container.clone();
            handles.push(thread::spawn(move || {
                let name = format!("counter_{index}");
                let counter = container.get::<Counter>(&name).unwrap();
                let label = counter.label.read().clone();
                label
            }));
        }
    }
    let labels: Vec<String> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(constructions.load(Ordering::SeqCst), 4);
    for index in 0..4 {
        assert!(labels.contains(&format!("c{index}")));
    }
}

#[test]
fn test_concurrent_destroy_and_get() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let container = counter_container(constructions);
    container
        .register_definition(
            "counter",
            BeanDefinition::new("counter").with_property("label", BeanValue::string("volatile")),
        )
        .unwrap();
    container.get::<Counter>("counter").unwrap();

    let reader = {
        let container = container.clone();
        thread::spawn(move || {
            for _ in 0..50 {
                // 销毁并发进行时请求要么成功要么干净失败, 不会观察到半销毁状态
                if let Ok(counter) = container.get::<Counter>("counter") {
                    assert_eq!(*counter.label.read(), "volatile");
                }
            }
        })
    };
    let destroyer = {
        let container = container.clone();
        thread::spawn(move || {
            for _ in 0..10 {
                container.destroy_singleton("counter");
            }
        })
    };
    reader.join().unwrap();
    destroyer.join().unwrap();
}
