//! 容器抽象
//!
//! 父容器委派所需的只读视图、解析上下文与容器配置

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use summer_common::{BeanHandle, BeansResult, CreationError, MergedBeanDefinition, TypeInfo};

/// 工厂 Bean 解引用前缀
///
/// 以该前缀开头的名称获取工厂对象本身而非其产品
pub const FACTORY_BEAN_PREFIX: &str = "&";

/// 判断名称是否是工厂解引用
pub fn is_factory_dereference(name: &str) -> bool {
    name.starts_with(FACTORY_BEAN_PREFIX)
}

/// 去掉工厂解引用前缀，得到规范查找名
pub fn transformed_bean_name(name: &str) -> &str {
    let mut result = name;
    while let Some(stripped) = result.strip_prefix(FACTORY_BEAN_PREFIX) {
        result = stripped;
    }
    result
}

/// 容器只读视图 trait
///
/// 本地未定义的名称可委派给实现该 trait 的父容器
pub trait ContainerView: Send + Sync {
    /// 按名称获取实例句柄
    fn get_handle(&self, name: &str) -> BeansResult<BeanHandle>;

    /// 判断是否包含指定名称的 Bean
    fn contains(&self, name: &str) -> bool;

    /// 获取指定名称的 Bean 类型
    fn get_type(&self, name: &str) -> BeansResult<TypeInfo>;

    /// 判断指定名称是否是单例
    fn is_singleton(&self, name: &str) -> BeansResult<bool>;

    /// 判断指定名称是否是原型
    fn is_prototype(&self, name: &str) -> BeansResult<bool>;

    /// 获取合并定义，供子容器展开指向父容器的定义链
    fn merged_definition(&self, name: &str) -> BeansResult<Arc<MergedBeanDefinition>>;
}

/// 解析上下文
///
/// 随一次解析调用链显式传递，承载原型与作用域 Bean 的创建中状态
#[derive(Debug, Default)]
pub struct ResolveContext {
    creation_chain: Vec<String>,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 把名称压入创建链，已存在时报告循环创建
    pub fn enter(&mut self, name: &str) -> BeansResult<()> {
        if self.creation_chain.iter().any(|entry| entry == name) {
            return Err(CreationError::CurrentlyInCreation {
                name: name.to_string(),
            }
            .into());
        }
        self.creation_chain.push(name.to_string());
        Ok(())
    }

    /// 把名称移出创建链
    pub fn exit(&mut self, name: &str) {
        if let Some(position) = self
            .creation_chain
            .iter()
            .rposition(|entry| entry == name)
        {
            self.creation_chain.remove(position);
        }
    }

    /// 判断名称是否在创建链上
    pub fn in_creation(&self, name: &str) -> bool {
        self.creation_chain.iter().any(|entry| entry == name)
    }

    /// 当前链深度
    pub fn depth(&self) -> usize {
        self.creation_chain.len()
    }
}

/// 容器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// 是否允许单例循环引用，关闭后循环创建立即失败
    pub allow_circular_references: bool,
    /// 早期引用被注入后最终实例被包装时是否容忍原始引用残留
    pub allow_raw_injection_despite_wrapping: bool,
    /// 是否缓存合并定义
    pub cache_bean_metadata: bool,
    /// 单次解析链的最大深度
    pub max_resolution_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_circular_references: true,
            allow_raw_injection_despite_wrapping: false,
            cache_bean_metadata: true,
            max_resolution_depth: 100,
        }
    }
}
