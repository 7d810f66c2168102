//! Bean 后置处理器
//!
//! 围绕实例化与初始化各阶段的有序扩展钩子

use summer_common::{BeanHandle, BeansResult, MergedBeanDefinition, PropertyValues};

/// Bean 后置处理器 trait
///
/// 所有钩子都有缺省实现，处理器按 [`order`](Self::order) 从小到大执行
pub trait BeanPostProcessor: Send + Sync {
    /// 处理器名称，用于错误与日志定位
    fn processor_name(&self) -> &str {
        "bean_post_processor"
    }

    /// 执行顺序，数值小者先执行
    fn order(&self) -> i32 {
        0
    }

    /// 实例化之前调用，返回替代实例时跳过常规构造流程
    fn before_instantiation(
        &self,
        _bean_name: &str,
        _merged: &MergedBeanDefinition,
    ) -> BeansResult<Option<BeanHandle>> {
        Ok(None)
    }

    /// 实例化之后调用，返回 false 否决属性填充
    fn after_instantiation(&self, _bean_name: &str, _instance: &BeanHandle) -> BeansResult<bool> {
        Ok(true)
    }

    /// 属性赋值之前改写属性集，返回 None 否决剩余的填充流程
    fn process_property_values(
        &self,
        _bean_name: &str,
        _instance: &BeanHandle,
        property_values: PropertyValues,
    ) -> BeansResult<Option<PropertyValues>> {
        Ok(Some(property_values))
    }

    /// 初始化回调之前的链式变换，返回 None 短路后续处理器
    fn before_initialization(
        &self,
        _bean_name: &str,
        instance: BeanHandle,
    ) -> BeansResult<Option<BeanHandle>> {
        Ok(Some(instance))
    }

    /// 初始化回调之后的链式变换，返回 None 短路后续处理器
    fn after_initialization(
        &self,
        _bean_name: &str,
        instance: BeanHandle,
    ) -> BeansResult<Option<BeanHandle>> {
        Ok(Some(instance))
    }

    /// 循环引用场景下早期引用暴露前的变换
    fn early_reference(&self, _bean_name: &str, instance: BeanHandle) -> BeansResult<BeanHandle> {
        Ok(instance)
    }

    /// 合并定义的一次性后置处理，在首次实例化前执行
    fn process_merged_definition(
        &self,
        _bean_name: &str,
        _merged: &MergedBeanDefinition,
    ) -> BeansResult<()> {
        Ok(())
    }

    /// 判断实例是否需要销毁回调
    fn requires_destruction(&self, _bean_name: &str, _instance: &BeanHandle) -> bool {
        false
    }

    /// 实例销毁前调用
    fn before_destruction(&self, _bean_name: &str, _instance: &BeanHandle) {}
}
