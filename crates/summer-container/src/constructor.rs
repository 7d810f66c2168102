//! 构造方式解析
//!
//! 工厂方法按名称与参数匹配，构造函数按可满足参数数排名，
//! 平局按声明顺序决出。解析结果缓存在合并定义上，
//! 原型的重复创建跳过重新解析。

use summer_abstractions::{ResolveContext, TypeDescriptor};
use summer_common::{
    AutowireMode, BeanHandle, BeansResult, ConstructorArgumentValues, CreationError,
    CreationResult, DefinitionError, DependencyDescriptor, MergedBeanDefinition,
    ResolvedExecutable, TypeInfo,
};
use tracing::debug;

use crate::container::BeanContainer;

impl BeanContainer {
    /// 查找定义声明类型的描述符
    pub(crate) fn descriptor_for(
        &self,
        merged: &MergedBeanDefinition,
        bean_name: &str,
    ) -> BeansResult<std::sync::Arc<dyn TypeDescriptor>> {
        let type_name = merged
            .definition
            .type_name
            .as_ref()
            .ok_or_else(|| DefinitionError::invalid(bean_name, "定义缺少类型名"))?;
        self.types.get(type_name).ok_or_else(|| {
            DefinitionError::TypeNotRegistered {
                type_name: type_name.clone(),
            }
            .into()
        })
    }

    /// 创建原始实例
    ///
    /// 工厂方法优先，否则解析构造函数并交给实例化策略
    pub(crate) fn create_bean_instance(
        &self,
        bean_name: &str,
        merged: &std::sync::Arc<MergedBeanDefinition>,
        ctx: &mut ResolveContext,
    ) -> BeansResult<BeanHandle> {
        if merged.definition.factory_method_name.is_some() {
            return self.instantiate_using_factory_method(bean_name, merged, ctx);
        }
        let descriptor = self.descriptor_for(merged, bean_name)?;
        let executable = merged.resolve_executable_with(|| {
            self.select_constructor(bean_name, merged, descriptor.as_ref())
        })?;
        let ResolvedExecutable::Constructor { index } = executable else {
            return Err(CreationError::NoUsableExecutable {
                name: bean_name.to_string(),
                message: "缓存的构造方式与定义不一致".to_string(),
            }
            .into());
        };
        let constructor = descriptor.constructors().get(index).ok_or_else(|| {
            CreationError::NoUsableExecutable {
                name: bean_name.to_string(),
                message: "缓存的构造函数下标越界".to_string(),
            }
        })?;
        let args =
            self.resolve_executable_args(bean_name, merged, &constructor.params, ctx)?;
        self.instantiation_strategy.instantiate(
            bean_name,
            merged,
            descriptor.as_ref(),
            constructor,
            args,
        )
    }

    /// 构造函数排名
    ///
    /// 候选必须全部参数可满足，可满足参数多者胜出，平局取声明顺序靠前者
    fn select_constructor(
        &self,
        bean_name: &str,
        merged: &MergedBeanDefinition,
        descriptor: &dyn TypeDescriptor,
    ) -> CreationResult<ResolvedExecutable> {
        let allow_autowire = matches!(
            merged.definition.autowire_mode,
            AutowireMode::Constructor
        );
        let mut best: Option<(usize, usize)> = None;
        for (index, constructor) in descriptor.constructors().iter().enumerate() {
            let Some(satisfiable) = self.params_satisfiable(
                bean_name,
                &merged.definition.constructor_args,
                &constructor
                    .params
                    .iter()
                    .map(|p| p.type_info.clone())
                    .collect::<Vec<_>>(),
                allow_autowire,
            ) else {
                continue;
            };
            match best {
                None => best = Some((index, satisfiable)),
                Some((_, current)) if satisfiable > current => best = Some((index, satisfiable)),
                Some(_) => {}
            }
        }
        match best {
            Some((index, _)) => {
                debug!("Bean '{}' 选中第 {} 个构造函数", bean_name, index);
                Ok(ResolvedExecutable::Constructor { index })
            }
            None => Err(CreationError::NoUsableExecutable {
                name: bean_name.to_string(),
                message: "没有参数全部可满足的构造函数".to_string(),
            }),
        }
    }

    /// 工厂方法匹配
    ///
    /// 名称、静态性和参数可满足性都符合的方法参与排名
    fn select_factory_method(
        &self,
        bean_name: &str,
        merged: &MergedBeanDefinition,
        descriptor: &dyn TypeDescriptor,
        method_name: &str,
        is_static: bool,
    ) -> CreationResult<ResolvedExecutable> {
        let mut best: Option<(usize, usize)> = None;
        for (index, method) in descriptor.factory_methods().iter().enumerate() {
            if method.name != method_name || method.is_static != is_static {
                continue;
            }
            let Some(satisfiable) = self.params_satisfiable(
                bean_name,
                &merged.definition.constructor_args,
                &method
                    .params
                    .iter()
                    .map(|p| p.type_info.clone())
                    .collect::<Vec<_>>(),
                true,
            ) else {
                continue;
            };
            match best {
                None => best = Some((index, satisfiable)),
                Some((_, current)) if satisfiable > current => best = Some((index, satisfiable)),
                Some(_) => {}
            }
        }
        match best {
            Some((index, _)) => Ok(ResolvedExecutable::FactoryMethod { index }),
            None => Err(CreationError::NoUsableExecutable {
                name: bean_name.to_string(),
                message: format!("没有参数匹配的工厂方法 '{method_name}'"),
            }),
        }
    }

    /// 判断参数表是否全部可满足，返回可满足的参数数
    fn params_satisfiable(
        &self,
        bean_name: &str,
        cargs: &ConstructorArgumentValues,
        param_types: &[TypeInfo],
        allow_autowire: bool,
    ) -> Option<usize> {
        let covered = explicit_coverage(cargs, param_types.len());
        let mut satisfiable = 0usize;
        for (position, type_info) in param_types.iter().enumerate() {
            if covered[position] {
                satisfiable += 1;
                continue;
            }
            if allow_autowire {
                let candidates = self.find_autowire_candidates(bean_name, type_info.id);
                let viable = match candidates.len() {
                    0 => false,
                    1 => true,
                    _ => {
                        candidates
                            .iter()
                            .filter(|candidate| {
                                self.merged_local_definition(candidate)
                                    .map(|merged| merged.definition.primary)
                                    .unwrap_or(false)
                            })
                            .count()
                            == 1
                    }
                };
                if viable {
                    satisfiable += 1;
                    continue;
                }
            }
            return None;
        }
        Some(satisfiable)
    }

    /// 解析构造方式的实际参数
    pub(crate) fn resolve_executable_args(
        &self,
        bean_name: &str,
        merged: &MergedBeanDefinition,
        params: &[summer_abstractions::ParameterDescriptor],
        ctx: &mut ResolveContext,
    ) -> BeansResult<Vec<BeanHandle>> {
        let cargs = &merged.definition.constructor_args;
        let mut args = Vec::with_capacity(params.len());
        let mut generic_cursor = 0usize;
        for (position, param) in params.iter().enumerate() {
            let explicit = cargs.get_indexed(position).cloned().or_else(|| {
                let generics = cargs.generic_values();
                if generic_cursor < generics.len() {
                    let value = generics[generic_cursor].clone();
                    generic_cursor += 1;
                    Some(value)
                } else {
                    None
                }
            });
            let value = match explicit {
                Some(value) => self
                    .resolve_value(&value, &param.type_info, ctx)
                    .map_err(|err| CreationError::unsatisfied(bean_name, &param.name, err))?
                    .ok_or_else(|| CreationError::NoUsableExecutable {
                        name: bean_name.to_string(),
                        message: format!("参数 '{}' 的声明值为空", param.name),
                    })?,
                None => {
                    let dependency = DependencyDescriptor::for_parameter(
                        &param.name,
                        param.type_info.clone(),
                        param.required,
                    );
                    let mut autowired = Vec::new();
                    let resolved = self
                        .resolve_dependency(&dependency, bean_name, &mut autowired, ctx)
                        .map_err(|err| {
                            CreationError::unsatisfied(bean_name, &param.name, err)
                        })?;
                    for autowired_name in &autowired {
                        self.singleton_registry
                            .register_dependent_bean(autowired_name, bean_name);
                        debug!(
                            "构造参数自动装配: Bean '{}' 的参数 '{}' 使用 Bean '{}'",
                            bean_name, param.name, autowired_name
                        );
                    }
                    match resolved {
                        Some(handle) => self.coerce_handle(&handle, &param.type_info),
                        None => {
                            return Err(CreationError::NoUsableExecutable {
                                name: bean_name.to_string(),
                                message: format!("参数 '{}' 没有可用的注入候选", param.name),
                            }
                            .into());
                        }
                    }
                }
            };
            args.push(value);
        }
        Ok(args)
    }

    /// 通过工厂方法创建实例
    fn instantiate_using_factory_method(
        &self,
        bean_name: &str,
        merged: &std::sync::Arc<MergedBeanDefinition>,
        ctx: &mut ResolveContext,
    ) -> BeansResult<BeanHandle> {
        let definition = &merged.definition;
        let Some(method_name) = definition.factory_method_name.clone() else {
            return Err(DefinitionError::invalid(bean_name, "缺少工厂方法名").into());
        };
        let (factory_descriptor, factory_instance) = match &definition.factory_bean_name {
            Some(factory_bean) => {
                if factory_bean == bean_name {
                    return Err(
                        DefinitionError::invalid(bean_name, "factory-bean 引用指向定义自身").into(),
                    );
                }
                let instance = self.do_get(factory_bean, ctx)?;
                self.singleton_registry
                    .register_dependent_bean(factory_bean, bean_name);
                let descriptor = self
                    .types
                    .get_by_type_id((*instance).type_id())
                    .ok_or_else(|| DefinitionError::TypeNotRegistered {
                        type_name: format!("工厂 Bean '{factory_bean}' 的实例类型"),
                    })?;
                (descriptor, Some(instance))
            }
            None => (self.descriptor_for(merged, bean_name)?, None),
        };
        let is_static = factory_instance.is_none();
        let executable = merged.resolve_executable_with(|| {
            self.select_factory_method(
                bean_name,
                merged,
                factory_descriptor.as_ref(),
                &method_name,
                is_static,
            )
        })?;
        let ResolvedExecutable::FactoryMethod { index } = executable else {
            return Err(CreationError::NoUsableExecutable {
                name: bean_name.to_string(),
                message: "缓存的构造方式与定义不一致".to_string(),
            }
            .into());
        };
        let method = factory_descriptor.factory_methods().get(index).ok_or_else(|| {
            CreationError::NoUsableExecutable {
                name: bean_name.to_string(),
                message: "缓存的工厂方法下标越界".to_string(),
            }
        })?;
        let args = self.resolve_executable_args(bean_name, merged, &method.params, ctx)?;
        debug!("使用工厂方法 '{}' 创建 Bean '{}'", method.name, bean_name);
        method.invoke(factory_instance.as_ref(), args)
    }

    /// 不实例化地推断工厂方法定义的产品类型
    ///
    /// 同名且静态性匹配的候选方法返回类型唯一时方可确定
    pub(crate) fn factory_method_return_type(
        &self,
        merged: &MergedBeanDefinition,
        _bean_name: &str,
    ) -> Option<TypeInfo> {
        let definition = &merged.definition;
        let method_name = definition.factory_method_name.as_ref()?;
        let descriptor = match &definition.factory_bean_name {
            Some(factory_bean) => {
                let factory_merged = self.merged_local_definition(factory_bean).ok()?;
                let type_name = factory_merged.definition.type_name.clone()?;
                self.types.get(&type_name)?
            }
            None => {
                let type_name = definition.type_name.as_ref()?;
                self.types.get(type_name)?
            }
        };
        let is_static = definition.factory_bean_name.is_none();
        let min_args = definition.constructor_args.count();
        let mut return_types: Vec<TypeInfo> = Vec::new();
        for method in descriptor.factory_methods() {
            if method.name == *method_name
                && method.is_static == is_static
                && method.params.len() >= min_args
                && !return_types.iter().any(|t| t.id == method.return_type.id)
            {
                return_types.push(method.return_type.clone());
            }
        }
        if return_types.len() == 1 {
            return_types.pop()
        } else {
            None
        }
    }
}

/// 计算显式构造参数对参数位置的覆盖情况
///
/// 无下标的通用参数按顺序补入未被下标覆盖的位置
fn explicit_coverage(cargs: &ConstructorArgumentValues, params_len: usize) -> Vec<bool> {
    let mut covered = vec![false; params_len];
    for (position, slot) in covered.iter_mut().enumerate() {
        if cargs.get_indexed(position).is_some() {
            *slot = true;
        }
    }
    let mut generics_left = cargs.generic_values().len();
    for slot in covered.iter_mut() {
        if !*slot && generics_left > 0 {
            *slot = true;
            generics_left -= 1;
        }
    }
    covered
}
