//! Bean 创建流水线
//!
//! 前置实例化短路、实例构造、一次性的合并定义后置处理、
//! 早期引用暴露、属性填充、初始化链与销毁回调登记。

use std::sync::Arc;

use summer_abstractions::{
    BeanPostProcessor, CallbackFn, MethodDescriptor, ResolveContext, TypeDescriptor,
};
use summer_common::{
    BeanHandle, BeansError, BeansResult, CreationError, DefinitionError, MergedBeanDefinition,
    ScopeError,
};
use tracing::debug;

use crate::container::BeanContainer;
use crate::singleton::log_destroy_failure;

impl BeanContainer {
    /// 创建 Bean 实例的入口
    ///
    /// 前置实例化钩子可以返回替代实例并跳过常规构造流程
    pub(crate) fn create_bean(
        &self,
        bean_name: &str,
        merged: &Arc<MergedBeanDefinition>,
        ctx: &mut ResolveContext,
    ) -> BeansResult<BeanHandle> {
        debug!("开始创建 Bean 实例: '{}'", bean_name);
        self.prepare_method_overrides(bean_name, merged)?;

        if let Some(substitute) = self.resolve_before_instantiation(bean_name, merged)? {
            debug!("Bean '{}' 由前置实例化钩子提供替代实例", bean_name);
            return Ok(substitute);
        }

        let instance = self
            .do_create_bean(bean_name, merged, ctx)
            .map_err(|err| self.wrap_creation_error(bean_name, merged, err))?;
        debug!("完成 Bean 实例创建: '{}'", bean_name);
        Ok(instance)
    }

    /// 校验方法覆盖声明
    fn prepare_method_overrides(
        &self,
        bean_name: &str,
        merged: &MergedBeanDefinition,
    ) -> BeansResult<()> {
        if merged.definition.method_overrides.is_empty() {
            return Ok(());
        }
        let Ok(descriptor) = self.descriptor_for(merged, bean_name) else {
            return Ok(());
        };
        for method_override in merged.definition.method_overrides.iter() {
            if descriptor.method(&method_override.method_name).is_none() {
                return Err(DefinitionError::invalid(
                    bean_name,
                    format!(
                        "方法覆盖指向不存在的方法 '{}'",
                        method_override.method_name
                    ),
                )
                .into());
            }
        }
        Ok(())
    }

    /// 前置实例化钩子
    ///
    /// 任一钩子返回替代实例时, 替代实例仍经过初始化后钩子
    fn resolve_before_instantiation(
        &self,
        bean_name: &str,
        merged: &MergedBeanDefinition,
    ) -> BeansResult<Option<BeanHandle>> {
        if merged.definition.synthetic {
            return Ok(None);
        }
        for processor in self.processors() {
            let substitute = processor
                .before_instantiation(bean_name, merged)
                .map_err(|err| {
                    CreationError::post_processor_failed(bean_name, "before_instantiation", err)
                })?;
            if let Some(substitute) = substitute {
                let substitute = self.apply_after_initialization(bean_name, substitute)?;
                return Ok(Some(substitute));
            }
        }
        Ok(None)
    }

    /// 实际创建实例
    fn do_create_bean(
        &self,
        bean_name: &str,
        merged: &Arc<MergedBeanDefinition>,
        ctx: &mut ResolveContext,
    ) -> BeansResult<BeanHandle> {
        let instance = self.create_bean_instance(bean_name, merged, ctx)?;
        let instance_descriptor = self.types.get_by_type_id((*instance).type_id());

        // 合并定义的后置处理只执行一次
        if !merged.definition.synthetic {
            let merged_ref = merged.as_ref();
            merged.post_process_once(|| {
                for processor in self.processors() {
                    processor
                        .process_merged_definition(bean_name, merged_ref)
                        .map_err(|err| {
                            BeansError::from(CreationError::post_processor_failed(
                                bean_name,
                                "process_merged_definition",
                                err,
                            ))
                        })?;
                }
                Ok(())
            })?;
        }

        // 允许循环引用时在属性填充前暴露早期引用
        let early_exposure = merged.is_singleton()
            && self.config.allow_circular_references
            && self.singleton_registry.is_in_creation(bean_name);
        if early_exposure {
            debug!("提前缓存 Bean '{}' 以便解析潜在的循环引用", bean_name);
            let processors = self.processors();
            let raw = instance.clone();
            let owner = bean_name.to_string();
            self.singleton_registry.add_singleton_factory(bean_name, move || {
                let mut exposed = raw.clone();
                for processor in &processors {
                    exposed = processor.early_reference(&owner, exposed).map_err(|err| {
                        BeansError::from(CreationError::post_processor_failed(
                            &owner,
                            "early_reference",
                            err,
                        ))
                    })?;
                }
                Ok(exposed)
            });
        }

        let populated = self
            .populate_bean(
                bean_name,
                merged,
                &instance,
                instance_descriptor.as_deref(),
                ctx,
            )
            .and_then(|()| {
                self.initialize_bean(
                    bean_name,
                    merged,
                    instance.clone(),
                    instance_descriptor.as_deref(),
                )
            });
        let mut exposed = populated.map_err(|err| self.wrap_creation_error(bean_name, merged, err))?;

        // 早期引用一致性检查
        if early_exposure {
            if let Some(early) = self.singleton_registry.get_singleton(bean_name, false)? {
                if Arc::ptr_eq(&exposed, &instance) {
                    exposed = early;
                } else if !self.config.allow_raw_injection_despite_wrapping
                    && self.singleton_registry.has_dependent(bean_name)
                {
                    let actual: Vec<String> = self
                        .singleton_registry
                        .dependents_of(bean_name)
                        .into_iter()
                        .filter(|dependent| {
                            !self.remove_singleton_if_created_for_type_check_only(dependent)
                        })
                        .collect();
                    if !actual.is_empty() {
                        return Err(CreationError::RawReferenceWrapped {
                            name: bean_name.to_string(),
                            dependents: actual.join(", "),
                        }
                        .into());
                    }
                }
            }
        }

        self.register_disposable_if_necessary(
            bean_name,
            &exposed,
            merged,
            instance_descriptor.as_deref(),
        )?;
        Ok(exposed)
    }

    /// 初始化实例
    ///
    /// 初始化前后钩子是链式的引用变换, 空结果短路剩余处理器
    fn initialize_bean(
        &self,
        bean_name: &str,
        merged: &MergedBeanDefinition,
        instance: BeanHandle,
        descriptor: Option<&dyn TypeDescriptor>,
    ) -> BeansResult<BeanHandle> {
        let synthetic = merged.definition.synthetic;
        let mut wrapped = instance;
        if !synthetic {
            wrapped = self.apply_before_initialization(bean_name, wrapped)?;
        }
        self.invoke_init_methods(bean_name, merged, &wrapped, descriptor)?;
        if !synthetic {
            wrapped = self.apply_after_initialization(bean_name, wrapped)?;
        }
        Ok(wrapped)
    }

    /// 调用初始化契约回调与具名初始化方法
    fn invoke_init_methods(
        &self,
        bean_name: &str,
        merged: &MergedBeanDefinition,
        instance: &BeanHandle,
        descriptor: Option<&dyn TypeDescriptor>,
    ) -> BeansResult<()> {
        if let Some(descriptor) = descriptor {
            if let Some(init) = descriptor.lifecycle_init() {
                debug!("调用 Bean '{}' 的初始化契约回调", bean_name);
                init(instance).map_err(|err| CreationError::InitMethodFailed {
                    name: bean_name.to_string(),
                    method: "<lifecycle_init>".to_string(),
                    source: err,
                })?;
            }
        }
        if let Some(method_name) = &merged.definition.init_method_name {
            let method = descriptor
                .and_then(|d| d.method(method_name))
                .ok_or_else(|| CreationError::InitMethodFailed {
                    name: bean_name.to_string(),
                    method: method_name.clone(),
                    source: "类型描述符中不存在该方法".into(),
                })?;
            debug!("调用 Bean '{}' 的初始化方法 '{}'", bean_name, method_name);
            method
                .invoke(instance)
                .map_err(|err| CreationError::InitMethodFailed {
                    name: bean_name.to_string(),
                    method: method_name.clone(),
                    source: err,
                })?;
        }
        Ok(())
    }

    /// 初始化前钩子链
    fn apply_before_initialization(
        &self,
        bean_name: &str,
        instance: BeanHandle,
    ) -> BeansResult<BeanHandle> {
        let mut current = instance;
        for processor in self.processors() {
            match processor
                .before_initialization(bean_name, current.clone())
                .map_err(|err| {
                    CreationError::post_processor_failed(bean_name, "before_initialization", err)
                })? {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(current)
    }

    /// 初始化后钩子链
    pub(crate) fn apply_after_initialization(
        &self,
        bean_name: &str,
        instance: BeanHandle,
    ) -> BeansResult<BeanHandle> {
        let mut current = instance;
        for processor in self.processors() {
            match processor
                .after_initialization(bean_name, current.clone())
                .map_err(|err| {
                    CreationError::post_processor_failed(bean_name, "after_initialization", err)
                })? {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(current)
    }

    /// 需要销毁的 Bean 登记销毁回调
    ///
    /// 原型不登记; 单例登记到注册表, 其他作用域登记到作用域处理器
    fn register_disposable_if_necessary(
        &self,
        bean_name: &str,
        instance: &BeanHandle,
        merged: &MergedBeanDefinition,
        descriptor: Option<&dyn TypeDescriptor>,
    ) -> BeansResult<()> {
        if merged.is_prototype() {
            return Ok(());
        }
        let lifecycle_destroy = descriptor.and_then(|d| d.lifecycle_destroy().cloned());
        let destroy_method = match &merged.definition.destroy_method_name {
            Some(method_name) => match descriptor.and_then(|d| d.method(method_name).cloned()) {
                Some(method) => Some(method),
                None => {
                    return Err(DefinitionError::invalid(
                        bean_name,
                        format!("销毁方法 '{method_name}' 在类型描述符中不存在"),
                    )
                    .into());
                }
            },
            None => None,
        };
        let destruction_processors: Vec<Arc<dyn BeanPostProcessor>> = self
            .processors()
            .into_iter()
            .filter(|processor| processor.requires_destruction(bean_name, instance))
            .collect();
        if lifecycle_destroy.is_none()
            && destroy_method.is_none()
            && destruction_processors.is_empty()
        {
            return Ok(());
        }

        let adapter = DisposableAdapter {
            name: bean_name.to_string(),
            instance: instance.clone(),
            lifecycle_destroy,
            destroy_method,
            processors: destruction_processors,
        };
        if merged.is_singleton() {
            debug!("登记单例 '{}' 的销毁回调", bean_name);
            self.singleton_registry
                .register_disposable(bean_name, Box::new(move || adapter.destroy()));
        } else {
            let scope_name = merged.scope_name().to_string();
            let scope = self
                .scopes
                .read()
                .get(&scope_name)
                .cloned()
                .ok_or(ScopeError::NotRegistered { scope: scope_name })?;
            scope.register_destruction_callback(bean_name, Box::new(move || adapter.destroy()));
        }
        Ok(())
    }

    /// 同名的创建失败错误直接透传, 其余错误包装为创建失败
    fn wrap_creation_error(
        &self,
        bean_name: &str,
        merged: &MergedBeanDefinition,
        err: BeansError,
    ) -> BeansError {
        if let BeansError::Creation {
            source: CreationError::CreationFailed { name, .. },
        } = &err
        {
            if name == bean_name {
                return err;
            }
        }
        CreationError::creation_failed(bean_name, merged.definition.origin.clone(), err).into()
    }
}

/// 销毁回调适配器
///
/// 把销毁感知钩子、销毁契约回调和具名销毁方法合成一次调用,
/// 执行失败只记录日志, 不向销毁流程传播
struct DisposableAdapter {
    name: String,
    instance: BeanHandle,
    lifecycle_destroy: Option<CallbackFn>,
    destroy_method: Option<MethodDescriptor>,
    processors: Vec<Arc<dyn BeanPostProcessor>>,
}

impl DisposableAdapter {
    fn destroy(self) {
        for processor in &self.processors {
            processor.before_destruction(&self.name, &self.instance);
        }
        if let Some(callback) = &self.lifecycle_destroy {
            debug!("调用 Bean '{}' 的销毁契约回调", self.name);
            if let Err(err) = callback(&self.instance) {
                log_destroy_failure(&self.name, &err);
            }
        }
        if let Some(method) = &self.destroy_method {
            debug!("调用 Bean '{}' 的销毁方法 '{}'", self.name, method.name);
            if let Err(err) = method.invoke(&self.instance) {
                log_destroy_failure(&self.name, &err);
            }
        }
    }
}
