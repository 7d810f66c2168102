//! # 容器组合层
//!
//! 这个 crate 负责把类型描述符、Bean 定义、后置处理器和各项外部能力
//! 组装成一个可用的容器实例。
//!
//! ## 基本使用
//!
//! ```rust
//! use std::sync::Arc;
//! use summer_abstractions::TypeDescriptorBuilder;
//! use summer_common::BeanDefinition;
//! use summer_composition::ContainerBuilder;
//!
//! #[derive(Debug)]
//! struct Clock;
//!
//! let container = ContainerBuilder::new()
//!     .register_type(
//!         "clock",
//!         TypeDescriptorBuilder::new::<Clock>()
//!             .constructor::<Clock, _>(Vec::new(), |_| Ok(Clock))
//!             .build(),
//!     )
//!     .register_definition("clock", BeanDefinition::new("clock"))
//!     .build()
//!     .unwrap();
//!
//! let clock = container.get::<Clock>("clock").unwrap();
//! let again = container.get::<Clock>("clock").unwrap();
//! assert!(Arc::ptr_eq(&clock, &again));
//! ```

pub mod builder;

pub use builder::ContainerBuilder;
