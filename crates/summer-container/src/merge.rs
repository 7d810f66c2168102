//! 定义合并
//!
//! 把 Bean 的父定义链展开为一份完全解析的合并定义。
//! 合并使用独立的窄锁，读多写少，不与单例创建的粗锁交叠。

use std::collections::HashMap;
use std::sync::Arc;

use summer_common::{
    BeanDefinition, BeansResult, DefinitionError, MergedBeanDefinition, SCOPE_SINGLETON,
};
use tracing::debug;

use crate::container::BeanContainer;

impl BeanContainer {
    /// 获取本地定义的合并结果
    ///
    /// 已缓存时直接返回，否则从原始定义展开
    pub(crate) fn merged_local_definition(
        &self,
        bean_name: &str,
    ) -> BeansResult<Arc<MergedBeanDefinition>> {
        if let Some(merged) = self.merged_definitions.lock().get(bean_name) {
            return Ok(merged.clone());
        }
        let raw = self.definition(bean_name)?;
        self.merged_definition_for(bean_name, &raw, None)
    }

    /// 展开指定原始定义
    ///
    /// `containing` 给出外层定义时，内部 Bean 的单例作用域会被降级为外层作用域
    pub(crate) fn merged_definition_for(
        &self,
        bean_name: &str,
        raw: &BeanDefinition,
        containing: Option<&BeanDefinition>,
    ) -> BeansResult<Arc<MergedBeanDefinition>> {
        let mut cache = self.merged_definitions.lock();
        let mut chain = Vec::new();
        self.do_merge(&mut cache, bean_name, raw, containing, &mut chain)
    }

    fn do_merge(
        &self,
        cache: &mut HashMap<String, Arc<MergedBeanDefinition>>,
        bean_name: &str,
        raw: &BeanDefinition,
        containing: Option<&BeanDefinition>,
        chain: &mut Vec<String>,
    ) -> BeansResult<Arc<MergedBeanDefinition>> {
        if containing.is_none() {
            if let Some(merged) = cache.get(bean_name) {
                return Ok(merged.clone());
            }
        }
        if chain.iter().any(|entry| entry == bean_name) {
            return Err(DefinitionError::CyclicParentChain {
                name: bean_name.to_string(),
                chain: format!("{} -> {}", chain.join(" -> "), bean_name),
            }
            .into());
        }
        chain.push(bean_name.to_string());

        let mut resolved = match raw.parent_name.clone() {
            None => raw.clone(),
            Some(parent_name) => {
                let parent_definition = if parent_name == bean_name {
                    // 父定义名与自身相同, 只能在父容器中解析
                    match &self.parent {
                        Some(parent) => parent
                            .merged_definition(&parent_name)
                            .map_err(|err| DefinitionError::ParentNotFound {
                                name: bean_name.to_string(),
                                parent: parent_name.clone(),
                                message: err.to_string(),
                            })?
                            .definition
                            .clone(),
                        None => {
                            return Err(DefinitionError::CyclicParentChain {
                                name: bean_name.to_string(),
                                chain: format!("{bean_name} -> {parent_name}"),
                            }
                            .into());
                        }
                    }
                } else if self.contains_definition(&parent_name) {
                    let parent_raw = self.definition(&parent_name)?;
                    self.do_merge(cache, &parent_name, &parent_raw, None, chain)?
                        .definition
                        .clone()
                } else if let Some(parent) = &self.parent {
                    parent
                        .merged_definition(&parent_name)
                        .map_err(|err| DefinitionError::ParentNotFound {
                            name: bean_name.to_string(),
                            parent: parent_name.clone(),
                            message: err.to_string(),
                        })?
                        .definition
                        .clone()
                } else {
                    return Err(DefinitionError::ParentNotFound {
                        name: bean_name.to_string(),
                        parent: parent_name,
                        message: "当前容器与父容器中均不存在该定义".to_string(),
                    }
                    .into());
                };
                let mut base = parent_definition;
                base.override_from(raw);
                base
            }
        };

        if resolved.scope.is_none() {
            resolved.scope = Some(SCOPE_SINGLETON.to_string());
        }
        if let Some(containing) = containing {
            if !containing.is_singleton_scope() && resolved.is_singleton_scope() {
                resolved.scope = containing.scope.clone();
            }
        }
        chain.pop();

        let merged = Arc::new(MergedBeanDefinition::new(resolved));
        // 只有真正开始创建过的 Bean 才缓存合并结果, 创建前的原始定义修改保持安全
        if containing.is_none()
            && self.config.cache_bean_metadata
            && self.is_eligible_for_metadata_caching(bean_name)
        {
            debug!("缓存合并定义: '{}'", bean_name);
            cache.insert(bean_name.to_string(), merged.clone());
        }
        Ok(merged)
    }

    /// 移除指定名称的合并定义缓存
    pub(crate) fn clear_merged_definition(&self, bean_name: &str) {
        self.merged_definitions.lock().remove(bean_name);
    }
}
