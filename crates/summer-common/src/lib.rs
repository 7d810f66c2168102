//! # Summer Common
//!
//! 这个 crate 提供 Summer 容器各层共享的数据模型和工具。
//!
//! ## 核心内容
//!
//! - [`BeanDefinition`] - Bean 的声明式蓝图
//! - [`MergedBeanDefinition`] - 父定义链展开后的合并定义
//! - [`BeanValue`] / [`BeanHandle`] - 属性值模型和类型擦除的实例句柄
//! - [`TypeInfo`] - 不依赖原生反射的类型元数据
//! - 分层的错误类型与 [`BeansResult`] 别名
//!
//! ## 设计原则
//!
//! - 基于 Rust 类型系统的编译时安全
//! - 合并定义缓存后不可变，仅保留一次性的处理标记
//! - 可扩展的类型描述能力，反射由手写类型表替代

pub mod definition;
pub mod errors;
pub mod metadata;
pub mod value;

pub use definition::*;
pub use errors::*;
pub use metadata::*;
pub use value::*;
