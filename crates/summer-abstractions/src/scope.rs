//! 自定义作用域

use summer_common::{BeanHandle, BeansResult};

/// 作用域内的实例提供者
pub type ScopedProvider<'a> = &'a mut dyn FnMut() -> BeansResult<BeanHandle>;

/// 作用域 trait
///
/// 单例与原型之外的作用域由注册的处理器接管实例缓存
pub trait Scope: Send + Sync {
    /// 返回作用域内缓存的实例，缺失时通过 provider 创建
    fn get(&self, name: &str, provider: ScopedProvider<'_>) -> BeansResult<BeanHandle>;

    /// 从作用域移除实例
    fn remove(&self, name: &str) -> Option<BeanHandle>;

    /// 注册实例的销毁回调，作用域结束时由处理器调用
    fn register_destruction_callback(&self, name: &str, callback: Box<dyn FnOnce() + Send>);
}
