//! # Summer Abstractions
//!
//! 容器消费的外部能力抽象层，定义类型描述、实例化、类型转换、
//! 作用域和后置处理等核心接口。
//!
//! ## 核心接口
//!
//! - [`TypeDescriptor`] - 手写类型表形式的类型描述能力
//! - [`InstantiationStrategy`] - 原始对象构造策略
//! - [`ConversionService`] - 类型转换服务
//! - [`Scope`] - 自定义作用域处理器
//! - [`BeanPostProcessor`] - 创建各阶段的扩展钩子
//! - [`ContainerView`] - 父容器委派的只读视图

pub mod container;
pub mod conversion;
pub mod descriptor;
pub mod expression;
pub mod instantiation;
pub mod processor;
pub mod scope;

pub use container::*;
pub use conversion::*;
pub use descriptor::*;
pub use expression::*;
pub use instantiation::*;
pub use processor::*;
pub use scope::*;

// 高频使用的公共数据模型就近重导出
pub use summer_common::{BeanHandle, BeansResult, TypeInfo};
