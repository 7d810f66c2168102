//! 实例化策略
//!
//! 在已解析的构造方式与参数之上完成原始对象构造

use summer_common::{BeanHandle, BeansResult, CreationError, MergedBeanDefinition};

use crate::descriptor::{ConstructorDescriptor, TypeDescriptor};

/// 实例化策略 trait
pub trait InstantiationStrategy: Send + Sync {
    /// 以指定构造函数和参数实例化 Bean
    fn instantiate(
        &self,
        bean_name: &str,
        merged: &MergedBeanDefinition,
        descriptor: &dyn TypeDescriptor,
        constructor: &ConstructorDescriptor,
        args: Vec<BeanHandle>,
    ) -> BeansResult<BeanHandle>;
}

/// 直接实例化策略
///
/// 不支持方法覆盖，带覆盖声明的定义需要使用 [`OverridingInstantiationStrategy`]
#[derive(Debug, Default)]
pub struct DirectInstantiationStrategy;

impl InstantiationStrategy for DirectInstantiationStrategy {
    fn instantiate(
        &self,
        bean_name: &str,
        merged: &MergedBeanDefinition,
        descriptor: &dyn TypeDescriptor,
        constructor: &ConstructorDescriptor,
        args: Vec<BeanHandle>,
    ) -> BeansResult<BeanHandle> {
        if !merged.definition.method_overrides.is_empty() {
            return Err(CreationError::InstantiationFailed {
                type_name: descriptor.type_info().name.clone(),
                message: format!("直接实例化策略不支持方法覆盖: {bean_name}"),
            }
            .into());
        }
        constructor.instantiate(args)
    }
}

/// 支持方法覆盖的实例化策略
///
/// 先直接构造，再通过类型描述符声明的包装工厂应用方法覆盖
#[derive(Debug, Default)]
pub struct OverridingInstantiationStrategy;

impl InstantiationStrategy for OverridingInstantiationStrategy {
    fn instantiate(
        &self,
        bean_name: &str,
        merged: &MergedBeanDefinition,
        descriptor: &dyn TypeDescriptor,
        constructor: &ConstructorDescriptor,
        args: Vec<BeanHandle>,
    ) -> BeansResult<BeanHandle> {
        let instance = constructor.instantiate(args)?;
        if merged.definition.method_overrides.is_empty() {
            return Ok(instance);
        }
        let factory = descriptor.override_factory().ok_or_else(|| {
            CreationError::InstantiationFailed {
                type_name: descriptor.type_info().name.clone(),
                message: format!("类型未声明方法覆盖的包装工厂: {bean_name}"),
            }
        })?;
        factory(instance, &merged.definition.method_overrides)
    }
}
