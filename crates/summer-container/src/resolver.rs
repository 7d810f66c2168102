//! 依赖解析与自动装配
//!
//! 发现未满足的属性，按名称或类型解析候选，经类型转换后赋值。
//! 每个真正用于满足依赖的 Bean 都会在依赖图中留下一条边。

use std::any::TypeId;

use summer_abstractions::{expression_body, is_expression, ResolveContext, TypeDescriptor};
use summer_common::{
    AutowireMode, BeanHandle, BeanValue, BeansError, BeansResult, CreationError, DependencyCheck,
    DependencyDescriptor, MergedBeanDefinition, PropertyValues, ResolutionError, TypeInfo,
};
use tracing::debug;

use crate::container::BeanContainer;

impl BeanContainer {
    /// 属性填充
    ///
    /// 钩子可以否决填充或改写属性集，随后按依赖检查模式校验并赋值
    pub(crate) fn populate_bean(
        &self,
        bean_name: &str,
        merged: &MergedBeanDefinition,
        instance: &BeanHandle,
        descriptor: Option<&dyn TypeDescriptor>,
        ctx: &mut ResolveContext,
    ) -> BeansResult<()> {
        let definition = &merged.definition;
        let mut pvs = definition.property_values.clone();

        if !definition.synthetic {
            for processor in self.processors() {
                let proceed = processor
                    .after_instantiation(bean_name, instance)
                    .map_err(|err| {
                        CreationError::post_processor_failed(bean_name, "after_instantiation", err)
                    })?;
                if !proceed {
                    return Ok(());
                }
            }
        }

        let autowire_needed = matches!(
            definition.autowire_mode,
            AutowireMode::ByName | AutowireMode::ByType
        );
        let descriptor = match descriptor {
            Some(descriptor) => descriptor,
            None => {
                if pvs.is_empty() && !autowire_needed {
                    return Ok(());
                }
                return Err(CreationError::unsatisfied(
                    bean_name,
                    "<instance>",
                    BeansError::other("实例类型未注册类型描述符, 无法进行属性填充"),
                )
                .into());
            }
        };

        match definition.autowire_mode {
            AutowireMode::ByName => self.autowire_by_name(bean_name, descriptor, &mut pvs, ctx)?,
            AutowireMode::ByType => self.autowire_by_type(bean_name, descriptor, &mut pvs, ctx)?,
            AutowireMode::No | AutowireMode::Constructor => {}
        }

        if !definition.synthetic {
            for processor in self.processors() {
                match processor
                    .process_property_values(bean_name, instance, pvs)
                    .map_err(|err| {
                        CreationError::post_processor_failed(
                            bean_name,
                            "process_property_values",
                            err,
                        )
                    })? {
                    Some(next) => pvs = next,
                    None => return Ok(()),
                }
            }
        }

        self.check_dependencies(bean_name, merged, descriptor, &pvs)?;
        self.apply_property_values(bean_name, instance, descriptor, &pvs, ctx)
    }

    /// 按名称自动装配
    fn autowire_by_name(
        &self,
        bean_name: &str,
        descriptor: &dyn TypeDescriptor,
        pvs: &mut PropertyValues,
        ctx: &mut ResolveContext,
    ) -> BeansResult<()> {
        for property_name in self.unsatisfied_non_simple_properties(descriptor, pvs) {
            if self.contains(&property_name) {
                let bean = self
                    .do_get(&property_name, ctx)
                    .map_err(|err| CreationError::unsatisfied(bean_name, &property_name, err))?;
                pvs.add(property_name.clone(), BeanValue::Instance(bean));
                self.singleton_registry
                    .register_dependent_bean(&property_name, bean_name);
                debug!(
                    "按名称自动装配: Bean '{}' 的属性 '{}'",
                    bean_name, property_name
                );
            } else {
                debug!(
                    "未找到名为 '{}' 的 Bean, 跳过 Bean '{}' 的按名称装配",
                    property_name, bean_name
                );
            }
        }
        Ok(())
    }

    /// 按类型自动装配
    fn autowire_by_type(
        &self,
        bean_name: &str,
        descriptor: &dyn TypeDescriptor,
        pvs: &mut PropertyValues,
        ctx: &mut ResolveContext,
    ) -> BeansResult<()> {
        for property_name in self.unsatisfied_non_simple_properties(descriptor, pvs) {
            let Some(property) = descriptor.property(&property_name) else {
                continue;
            };
            // 类型擦除的注入点按类型装配没有意义
            if property.type_info.is_erased() {
                continue;
            }
            let dependency =
                DependencyDescriptor::for_property(&property_name, property.type_info.clone());
            let mut autowired = Vec::new();
            let resolved = self
                .resolve_dependency(&dependency, bean_name, &mut autowired, ctx)
                .map_err(|err| CreationError::unsatisfied(bean_name, &property_name, err))?;
            if let Some(value) = resolved {
                pvs.add(property_name.clone(), BeanValue::Instance(value));
            }
            for autowired_name in autowired {
                self.singleton_registry
                    .register_dependent_bean(&autowired_name, bean_name);
                debug!(
                    "按类型自动装配: Bean '{}' 的属性 '{}' 使用 Bean '{}'",
                    bean_name, property_name, autowired_name
                );
            }
        }
        Ok(())
    }

    /// 计算可写、非简单、未被显式赋值且未被忽略的属性
    pub(crate) fn unsatisfied_non_simple_properties(
        &self,
        descriptor: &dyn TypeDescriptor,
        pvs: &PropertyValues,
    ) -> Vec<String> {
        let ignored = self.ignored_dependency_types.read();
        let mut result: Vec<String> = descriptor
            .properties()
            .iter()
            .filter(|property| {
                property.writable
                    && !property.simple
                    && !pvs.contains(&property.name)
                    && !ignored.contains(&property.type_info.id)
            })
            .map(|property| property.name.clone())
            .collect();
        result.sort();
        result
    }

    /// 解析一个注入点
    ///
    /// 唯一候选直接使用；多个候选时要求唯一的 primary；
    /// 没有候选时必填报错、可选跳过。用到的 Bean 名称写入 `autowired`
    pub(crate) fn resolve_dependency(
        &self,
        dependency: &DependencyDescriptor,
        requesting: &str,
        autowired: &mut Vec<String>,
        ctx: &mut ResolveContext,
    ) -> BeansResult<Option<BeanHandle>> {
        let target = dependency.type_info.id;
        let mut candidates = self.find_autowire_candidates(requesting, target);
        if candidates.is_empty() {
            if dependency.required {
                return Err(ResolutionError::NoCandidates {
                    type_name: dependency.type_info.name.clone(),
                }
                .into());
            }
            return Ok(None);
        }
        let chosen = if candidates.len() == 1 {
            candidates.remove(0)
        } else {
            let primaries: Vec<String> = candidates
                .iter()
                .filter(|candidate| {
                    self.merged_local_definition(candidate)
                        .map(|merged| merged.definition.primary)
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            match primaries.as_slice() {
                [single] => single.clone(),
                _ => {
                    return Err(ResolutionError::Ambiguous {
                        type_name: dependency.type_info.name.clone(),
                        candidates: candidates.join(", "),
                    }
                    .into());
                }
            }
        };
        let instance = self.do_get(&chosen, ctx)?;
        autowired.push(chosen);
        Ok(Some(instance))
    }

    /// 枚举按类型可注入的候选名称，排除请求方自身
    pub(crate) fn find_autowire_candidates(&self, requesting: &str, target: TypeId) -> Vec<String> {
        self.names_for_type(target)
            .into_iter()
            .filter(|candidate| candidate != requesting)
            .collect()
    }

    /// 依赖检查
    fn check_dependencies(
        &self,
        bean_name: &str,
        merged: &MergedBeanDefinition,
        descriptor: &dyn TypeDescriptor,
        pvs: &PropertyValues,
    ) -> BeansResult<()> {
        let mode = merged.definition.dependency_check;
        if matches!(mode, DependencyCheck::None) {
            return Ok(());
        }
        let ignored = self.ignored_dependency_types.read();
        for property in descriptor.properties() {
            if !property.writable
                || pvs.contains(&property.name)
                || ignored.contains(&property.type_info.id)
            {
                continue;
            }
            let unsatisfied = match mode {
                DependencyCheck::All => true,
                DependencyCheck::Simple => property.simple,
                DependencyCheck::Objects => !property.simple,
                DependencyCheck::None => false,
            };
            if unsatisfied {
                return Err(CreationError::DependencyCheckFailed {
                    name: bean_name.to_string(),
                    property: property.name.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// 把解析后的属性值赋给实例
    fn apply_property_values(
        &self,
        bean_name: &str,
        instance: &BeanHandle,
        descriptor: &dyn TypeDescriptor,
        pvs: &PropertyValues,
        ctx: &mut ResolveContext,
    ) -> BeansResult<()> {
        if pvs.is_empty() {
            return Ok(());
        }
        for pv in pvs.iter() {
            let property = descriptor.property(&pv.name).ok_or_else(|| {
                CreationError::unsatisfied(
                    bean_name,
                    &pv.name,
                    BeansError::other("类型描述符中不存在该属性"),
                )
            })?;
            if !property.writable {
                return Err(CreationError::unsatisfied(
                    bean_name,
                    &pv.name,
                    BeansError::other("属性不可写"),
                )
                .into());
            }
            let resolved = self
                .resolve_value(&pv.value, &property.type_info, ctx)
                .map_err(|err| CreationError::unsatisfied(bean_name, &pv.name, err))?;
            let Some(resolved) = resolved else {
                continue;
            };
            property
                .set_value(instance, resolved)
                .map_err(|err| CreationError::unsatisfied(bean_name, &pv.name, err))?;
        }
        Ok(())
    }

    /// 解析声明值
    ///
    /// 引用在此触发嵌套查找，字符串先过嵌入值解析器与表达式求值，
    /// 配置值最后经类型转换服务转换为目标类型
    pub(crate) fn resolve_value(
        &self,
        value: &BeanValue,
        target: &TypeInfo,
        ctx: &mut ResolveContext,
    ) -> BeansResult<Option<BeanHandle>> {
        match value {
            BeanValue::Null => Ok(None),
            BeanValue::Instance(handle) => Ok(Some(self.coerce_handle(handle, target))),
            BeanValue::Ref(ref_name) => {
                let bean = self.do_get(ref_name, ctx)?;
                Ok(Some(self.coerce_handle(&bean, target)))
            }
            BeanValue::Value(json) => {
                let mut json = json.clone();
                if let serde_json::Value::String(text) = &json {
                    let resolved = self.resolve_embedded_value(text)?;
                    if is_expression(&resolved) {
                        if let Some(evaluator) = &self.expression_evaluator {
                            json = evaluator.evaluate(expression_body(&resolved))?;
                        } else {
                            json = serde_json::Value::String(resolved);
                        }
                    } else {
                        json = serde_json::Value::String(resolved);
                    }
                }
                if target.id == std::any::TypeId::of::<serde_json::Value>() {
                    return Ok(Some(std::sync::Arc::new(json) as BeanHandle));
                }
                self.conversion_service.convert_value(&json, target).map(Some)
            }
        }
    }

    /// 把实例句柄尽可能地贴合到目标类型
    ///
    /// 依次尝试精确匹配、描述符上转型、类型转换，
    /// 都不适用时原样返回，由属性赋值器给出最终裁决
    pub(crate) fn coerce_handle(&self, handle: &BeanHandle, target: &TypeInfo) -> BeanHandle {
        if (**handle).type_id() == target.id {
            return handle.clone();
        }
        if let Some(descriptor) = self.types.get_by_type_id((**handle).type_id()) {
            if let Some(upcast) = descriptor.upcast(target.id, handle) {
                return upcast;
            }
        }
        if self.conversion_service.can_convert(target) {
            if let Ok(converted) = self.conversion_service.convert_handle(handle, target) {
                return converted;
            }
        }
        handle.clone()
    }
}
