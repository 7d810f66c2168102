//! # Summer Container
//!
//! Bean 生命周期与依赖解析引擎的具体实现。
//!
//! ## 核心组件
//!
//! - [`BeanContainer`] - 容器聚合，定义注册、作用域分发与对外操作
//! - [`SingletonRegistry`] - 三级缓存的单例注册表与有序销毁
//! - 定义合并、自动装配、构造方式解析与创建流水线按模块划分
//!
//! ## 并发模型
//!
//! 调用方驱动，无内部调度。单例缓存变更和整个按名创建序列
//! 在一把可重入的注册表级粗锁内执行；定义合并使用独立的窄锁；
//! 原型的创建中状态由显式传递的解析上下文承载。

pub mod constructor;
pub mod container;
pub mod creation;
pub mod merge;
pub mod resolver;
pub mod singleton;

pub use container::BeanContainer;
pub use singleton::SingletonRegistry;
