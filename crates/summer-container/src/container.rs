//! Bean 容器聚合
//!
//! 持有定义注册表、作用域分发、父容器委派和对外操作入口。
//! 查找请求先经过定义合并，再按作用域路由到对应的创建路径。

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use summer_abstractions::{
    downcast_shared, is_factory_dereference, transformed_bean_name, BeanPostProcessor,
    ContainerConfig, ContainerView, ConversionService, EmbeddedValueResolver, ExpressionEvaluator,
    InstantiationStrategy, ResolveContext, Scope, SimpleConversionService, TypeRegistry,
    DirectInstantiationStrategy, FACTORY_BEAN_PREFIX,
};
use summer_common::{
    BeanDefinition, BeanHandle, BeansError, BeansResult, CreationError, DefinitionError,
    MergedBeanDefinition, ResolutionError, ScopeError, TypeInfo, SCOPE_PROTOTYPE, SCOPE_SINGLETON,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::singleton::SingletonRegistry;

/// Bean 容器
///
/// 所有可变状态都归属于该聚合，锁边界显式可见
pub struct BeanContainer {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) config: ContainerConfig,
    pub(crate) types: Arc<TypeRegistry>,
    pub(crate) definitions: RwLock<HashMap<String, BeanDefinition>>,
    pub(crate) definition_names: RwLock<Vec<String>>,
    pub(crate) aliases: RwLock<HashMap<String, String>>,
    pub(crate) merged_definitions: Mutex<HashMap<String, Arc<MergedBeanDefinition>>>,
    pub(crate) already_created: RwLock<HashSet<String>>,
    pub(crate) singleton_registry: SingletonRegistry,
    pub(crate) singleton_types: DashMap<String, TypeInfo>,
    pub(crate) post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,
    pub(crate) scopes: RwLock<HashMap<String, Arc<dyn Scope>>>,
    pub(crate) parent: Option<Arc<dyn ContainerView>>,
    pub(crate) instantiation_strategy: Arc<dyn InstantiationStrategy>,
    pub(crate) conversion_service: Arc<dyn ConversionService>,
    pub(crate) expression_evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    pub(crate) embedded_value_resolvers: RwLock<Vec<Arc<dyn EmbeddedValueResolver>>>,
    pub(crate) ignored_dependency_types: RwLock<HashSet<TypeId>>,
    /// 工厂契约的单例产品缓存, 记录产出时的工厂实例地址,
    /// 工厂被销毁重建后旧产品不再复用
    pub(crate) product_cache: DashMap<String, (usize, BeanHandle)>,
}

impl std::fmt::Debug for BeanContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanContainer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("created_at", &self.created_at)
            .field("definitions", &self.definition_names.read().len())
            .field("singletons", &self.singleton_registry.singleton_count())
            .finish()
    }
}

impl BeanContainer {
    /// 以默认配置创建容器
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        Self::with_config(types, ContainerConfig::default())
    }

    /// 以指定配置创建容器
    pub fn with_config(types: Arc<TypeRegistry>, config: ContainerConfig) -> Self {
        let container = Self {
            id: Uuid::new_v4(),
            name: "default".to_string(),
            created_at: Utc::now(),
            config,
            types,
            definitions: RwLock::new(HashMap::new()),
            definition_names: RwLock::new(Vec::new()),
            aliases: RwLock::new(HashMap::new()),
            merged_definitions: Mutex::new(HashMap::new()),
            already_created: RwLock::new(HashSet::new()),
            singleton_registry: SingletonRegistry::new(),
            singleton_types: DashMap::new(),
            post_processors: RwLock::new(Vec::new()),
            scopes: RwLock::new(HashMap::new()),
            parent: None,
            instantiation_strategy: Arc::new(DirectInstantiationStrategy),
            conversion_service: Arc::new(SimpleConversionService::new()),
            expression_evaluator: None,
            embedded_value_resolvers: RwLock::new(Vec::new()),
            ignored_dependency_types: RwLock::new(HashSet::new()),
            product_cache: DashMap::new(),
        };
        info!("容器已创建: name={}, id={}", container.name, container.id);
        container
    }

    /// 设置容器名称
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// 容器名称
    pub fn container_name(&self) -> &str {
        &self.name
    }

    /// 设置父容器
    pub fn set_parent(&mut self, parent: Arc<dyn ContainerView>) {
        self.parent = Some(parent);
    }

    /// 设置实例化策略
    pub fn set_instantiation_strategy(&mut self, strategy: Arc<dyn InstantiationStrategy>) {
        self.instantiation_strategy = strategy;
    }

    /// 设置类型转换服务
    pub fn set_conversion_service(&mut self, service: Arc<dyn ConversionService>) {
        self.conversion_service = service;
    }

    /// 设置表达式求值器
    pub fn set_expression_evaluator(&mut self, evaluator: Arc<dyn ExpressionEvaluator>) {
        self.expression_evaluator = Some(evaluator);
    }

    /// 追加嵌入值解析器
    pub fn add_embedded_value_resolver(&self, resolver: Arc<dyn EmbeddedValueResolver>) {
        self.embedded_value_resolvers.write().push(resolver);
    }

    /// 对字符串值依次应用全部嵌入值解析器
    pub fn resolve_embedded_value(&self, value: &str) -> BeansResult<String> {
        let resolvers = self.embedded_value_resolvers.read().clone();
        let mut result = value.to_string();
        for resolver in resolvers {
            result = resolver.resolve(&result)?;
        }
        Ok(result)
    }

    /// 把类型加入自动装配的忽略名单
    pub fn ignore_dependency_type(&self, type_id: TypeId) {
        self.ignored_dependency_types.write().insert(type_id);
    }

    /// 类型注册表
    pub fn type_registry(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    // ---------------------------------------------------------------------
    // 别名管理
    // ---------------------------------------------------------------------

    /// 注册别名
    pub fn register_alias(&self, name: &str, alias: &str) -> BeansResult<()> {
        if name == alias {
            self.aliases.write().remove(alias);
            return Ok(());
        }
        if self.canonical_name(name) == alias {
            return Err(DefinitionError::AliasCycle {
                name: name.to_string(),
                alias: alias.to_string(),
            }
            .into());
        }
        self.aliases
            .write()
            .insert(alias.to_string(), name.to_string());
        Ok(())
    }

    /// 解析别名得到规范名
    pub fn canonical_name(&self, name: &str) -> String {
        let aliases = self.aliases.read();
        let mut current = name;
        while let Some(target) = aliases.get(current) {
            current = target;
        }
        current.to_string()
    }

    /// 指向规范名的全部别名
    pub fn aliases_of(&self, name: &str) -> Vec<String> {
        let aliases = self.aliases.read();
        let mut result = Vec::new();
        for (alias, _) in aliases.iter() {
            let mut current = alias.as_str();
            while let Some(target) = aliases.get(current) {
                current = target;
            }
            if current == name {
                result.push(alias.clone());
            }
        }
        result
    }

    // ---------------------------------------------------------------------
    // 定义与单例注册
    // ---------------------------------------------------------------------

    /// 注册 Bean 定义
    pub fn register_definition(
        &self,
        name: impl Into<String>,
        definition: BeanDefinition,
    ) -> BeansResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(DefinitionError::invalid(name, "Bean 名称不能为空").into());
        }
        if definition.type_name.is_none()
            && definition.factory_method_name.is_none()
            && definition.parent_name.is_none()
            && !definition.is_abstract
        {
            return Err(DefinitionError::invalid(
                &name,
                "定义必须给出类型名、工厂方法或父定义之一",
            )
            .into());
        }
        debug!("注册 Bean 定义: '{}'", name);
        let replaced = {
            let mut definitions = self.definitions.write();
            definitions.insert(name.clone(), definition).is_some()
        };
        if replaced {
            info!("Bean 定义被覆盖: '{}'", name);
            self.clear_merged_definition(&name);
        } else {
            self.definition_names.write().push(name.clone());
        }
        Ok(())
    }

    /// 注册外部构造的单例实例
    pub fn register_singleton<T: Any + Send + Sync>(
        &self,
        name: impl Into<String>,
        instance: Arc<T>,
    ) -> BeansResult<()> {
        self.register_singleton_handle(name, instance as BeanHandle, TypeInfo::of::<T>())
    }

    /// 注册类型擦除的单例实例句柄
    pub fn register_singleton_handle(
        &self,
        name: impl Into<String>,
        instance: BeanHandle,
        type_info: TypeInfo,
    ) -> BeansResult<()> {
        let name = name.into();
        debug!("注册单例实例: '{}' ({})", name, type_info.name);
        self.singleton_registry.register_singleton(&name, instance)?;
        self.singleton_types.insert(name, type_info);
        Ok(())
    }

    /// 注册后置处理器，按 order 从小到大排序
    pub fn add_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        let mut processors = self.post_processors.write();
        processors.retain(|existing| !Arc::ptr_eq(existing, &processor));
        processors.push(processor);
        processors.sort_by_key(|p| p.order());
    }

    /// 注册自定义作用域
    pub fn register_scope(&self, scope_name: &str, scope: Arc<dyn Scope>) -> BeansResult<()> {
        if scope_name == SCOPE_SINGLETON || scope_name == SCOPE_PROTOTYPE {
            return Err(DefinitionError::invalid(
                scope_name,
                "单例与原型作用域不允许被替换",
            )
            .into());
        }
        info!("注册作用域: '{}'", scope_name);
        self.scopes.write().insert(scope_name.to_string(), scope);
        Ok(())
    }

    /// 已注册的作用域名称
    pub fn scope_names(&self) -> Vec<String> {
        self.scopes.read().keys().cloned().collect()
    }

    /// 判断是否包含指定名称的定义
    pub fn contains_definition(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    /// 获取原始定义的副本
    pub fn definition(&self, name: &str) -> BeansResult<BeanDefinition> {
        self.definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| DefinitionError::not_found(name).into())
    }

    /// 按注册顺序返回定义名称
    pub fn definition_names(&self) -> Vec<String> {
        self.definition_names.read().clone()
    }

    // ---------------------------------------------------------------------
    // 查找入口
    // ---------------------------------------------------------------------

    /// 按名称获取实例句柄
    pub fn get_handle(&self, name: &str) -> BeansResult<BeanHandle> {
        let mut ctx = ResolveContext::new();
        self.do_get(name, &mut ctx)
    }

    /// 按名称获取并转换为具体类型
    ///
    /// 类型不匹配时先尝试类型转换，转换也失败才报错
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> BeansResult<Arc<T>> {
        let handle = self.get_handle(name)?;
        if let Ok(typed) = handle.clone().downcast::<T>() {
            return Ok(typed);
        }
        let converted = self
            .conversion_service
            .convert_handle(&handle, &TypeInfo::of::<T>())?;
        converted.downcast::<T>().map_err(|_| {
            ResolutionError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>().to_string(),
                actual: "类型擦除的实例".to_string(),
            }
            .into()
        })
    }

    /// 按名称获取并上转型为 trait 对象
    pub fn get_trait<I: ?Sized + Send + Sync + 'static>(&self, name: &str) -> BeansResult<Arc<I>> {
        let handle = self.get_handle(name)?;
        if let Ok(shared) = downcast_shared::<I>(&handle) {
            return Ok(shared);
        }
        let descriptor = self
            .types
            .get_by_type_id((*handle).type_id())
            .ok_or_else(|| ResolutionError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<I>().to_string(),
                actual: "未注册类型描述符的实例".to_string(),
            })?;
        let upcast = descriptor
            .upcast(TypeId::of::<I>(), &handle)
            .ok_or_else(|| ResolutionError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<I>().to_string(),
                actual: descriptor.type_info().name.clone(),
            })?;
        downcast_shared::<I>(&upcast)
    }

    /// 判断是否包含指定名称的 Bean
    pub fn contains(&self, name: &str) -> bool {
        let bean_name = self.canonical_name(transformed_bean_name(name));
        if self.singleton_registry.contains_singleton(&bean_name)
            || self.contains_definition(&bean_name)
        {
            return true;
        }
        match &self.parent {
            Some(parent) => parent.contains(&self.original_name(name, &bean_name)),
            None => false,
        }
    }

    /// 判断指定名称是否是单例
    pub fn is_singleton(&self, name: &str) -> BeansResult<bool> {
        let bean_name = self.canonical_name(transformed_bean_name(name));
        if let Some(handle) = self.singleton_registry.get_singleton(&bean_name, false)? {
            let contract = self
                .types
                .get_by_type_id((*handle).type_id())
                .and_then(|d| d.factory_contract().cloned());
            return Ok(match contract {
                Some(contract) if !is_factory_dereference(name) => contract.singleton_product,
                _ => true,
            });
        }
        if self.singleton_registry.contains_singleton(&bean_name) {
            return Ok(true);
        }
        if !self.contains_definition(&bean_name) {
            if let Some(parent) = &self.parent {
                return parent.is_singleton(&self.original_name(name, &bean_name));
            }
            return Err(DefinitionError::not_found(bean_name).into());
        }
        let merged = self.merged_local_definition(&bean_name)?;
        if !merged.is_singleton() {
            return Ok(false);
        }
        if !is_factory_dereference(name) {
            if let Ok(descriptor) = self.descriptor_for(&merged, &bean_name) {
                if let Some(contract) = descriptor.factory_contract() {
                    return Ok(contract.singleton_product);
                }
            }
        }
        Ok(true)
    }

    /// 判断指定名称是否是原型
    pub fn is_prototype(&self, name: &str) -> BeansResult<bool> {
        let bean_name = self.canonical_name(transformed_bean_name(name));
        if !self.contains_definition(&bean_name) {
            if let Some(parent) = &self.parent {
                return parent.is_prototype(&self.original_name(name, &bean_name));
            }
            if self.singleton_registry.contains_singleton(&bean_name) {
                return Ok(false);
            }
            return Err(DefinitionError::not_found(bean_name).into());
        }
        let merged = self.merged_local_definition(&bean_name)?;
        if merged.is_prototype() {
            return Ok(true);
        }
        if is_factory_dereference(name) {
            return Ok(false);
        }
        if let Ok(descriptor) = self.descriptor_for(&merged, &bean_name) {
            if let Some(contract) = descriptor.factory_contract() {
                return Ok(!contract.singleton_product);
            }
        }
        Ok(false)
    }

    /// 获取指定名称的 Bean 类型
    pub fn get_type(&self, name: &str) -> BeansResult<TypeInfo> {
        let bean_name = self.canonical_name(transformed_bean_name(name));
        if self.singleton_registry.contains_singleton(&bean_name) {
            if let Some(info) = self.singleton_types.get(&bean_name) {
                let info = info.clone();
                if !is_factory_dereference(name) {
                    if let Some(descriptor) = self.types.get_by_type_id(info.id) {
                        if let Some(contract) = descriptor.factory_contract() {
                            return Ok(contract.product_type.clone());
                        }
                    }
                }
                return Ok(info);
            }
        }
        if !self.contains_definition(&bean_name) {
            if let Some(parent) = &self.parent {
                return parent.get_type(&self.original_name(name, &bean_name));
            }
            return Err(DefinitionError::not_found(bean_name).into());
        }
        let merged = self.merged_local_definition(&bean_name)?;
        if merged.definition.factory_method_name.is_some() {
            return self
                .factory_method_return_type(&merged, &bean_name)
                .ok_or_else(|| {
                    DefinitionError::invalid(&bean_name, "无法确定工厂方法的返回类型").into()
                });
        }
        let descriptor = self.descriptor_for(&merged, &bean_name)?;
        if !is_factory_dereference(name) {
            if let Some(contract) = descriptor.factory_contract() {
                return Ok(contract.product_type.clone());
            }
        }
        Ok(descriptor.type_info().clone())
    }

    /// 按可注入类型枚举 Bean 名称
    pub fn names_for_type(&self, target: TypeId) -> Vec<String> {
        let mut result = Vec::new();
        for name in self.definition_names.read().iter() {
            if self.candidate_type_matches(name, target) {
                result.push(name.clone());
            }
        }
        for entry in self.singleton_types.iter() {
            if self.contains_definition(entry.key()) {
                continue;
            }
            let info = entry.value();
            let assignable = info.id == target
                || self
                    .types
                    .get_by_type_id(info.id)
                    .is_some_and(|d| d.is_assignable_to(target));
            if assignable {
                result.push(entry.key().clone());
            }
        }
        result
    }

    /// 预实例化全部非延迟的单例定义
    pub fn pre_instantiate_singletons(&self) -> BeansResult<()> {
        info!("容器 '{}' 开始预实例化单例", self.name);
        let names = self.definition_names.read().clone();
        for name in names {
            let merged = self.merged_local_definition(&name)?;
            if merged.definition.is_abstract || !merged.is_singleton() || merged.definition.lazy_init
            {
                continue;
            }
            let has_contract = merged
                .definition
                .type_name
                .as_ref()
                .and_then(|t| self.types.get(t))
                .is_some_and(|d| d.factory_contract().is_some());
            if has_contract {
                self.get_handle(&format!("{FACTORY_BEAN_PREFIX}{name}"))?;
            } else {
                self.get_handle(&name)?;
            }
        }
        Ok(())
    }

    /// 依赖指定 Bean 的 Bean 名称列表
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.singleton_registry
            .dependents_of(&self.canonical_name(transformed_bean_name(name)))
    }

    /// 指定 Bean 所依赖的 Bean 名称列表
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.singleton_registry
            .dependencies_of(&self.canonical_name(transformed_bean_name(name)))
    }

    /// 记录结构性包含关系
    pub fn register_contained_bean(&self, contained: &str, containing: &str) {
        self.singleton_registry
            .register_contained_bean(contained, containing);
    }

    // ---------------------------------------------------------------------
    // 销毁
    // ---------------------------------------------------------------------

    /// 销毁指定名称的单例
    pub fn destroy_singleton(&self, name: &str) {
        let bean_name = self.canonical_name(transformed_bean_name(name));
        self.product_cache.remove(&bean_name);
        self.singleton_registry.destroy_singleton(&bean_name);
    }

    /// 销毁全部单例并清空相关缓存
    pub fn destroy_all(&self) {
        info!("容器 '{}' 开始销毁全部单例", self.name);
        self.singleton_registry.destroy_all();
        self.product_cache.clear();
        self.singleton_types.clear();
    }

    // ---------------------------------------------------------------------
    // 查找核心
    // ---------------------------------------------------------------------

    pub(crate) fn do_get(&self, name: &str, ctx: &mut ResolveContext) -> BeansResult<BeanHandle> {
        let bean_name = self.canonical_name(transformed_bean_name(name));
        if ctx.depth() >= self.config.max_resolution_depth {
            return Err(BeansError::other(format!(
                "解析深度超过上限 {}: '{}'",
                self.config.max_resolution_depth, bean_name
            )));
        }

        if let Some(shared) = self.singleton_registry.get_singleton(&bean_name, true)? {
            if self.singleton_registry.is_in_creation(&bean_name) {
                debug!(
                    "返回尚未完全初始化的早期单例引用: '{}', 这是循环引用解析的结果",
                    bean_name
                );
            }
            return self.object_for_instance(shared, name, &bean_name, None);
        }

        if ctx.in_creation(&bean_name) {
            return Err(CreationError::CurrentlyInCreation { name: bean_name }.into());
        }

        if !self.contains_definition(&bean_name) {
            if let Some(parent) = &self.parent {
                return parent.get_handle(&self.original_name(name, &bean_name));
            }
        }

        self.mark_as_created(&bean_name);
        let merged = self.merged_local_definition(&bean_name)?;
        self.check_merged(&merged, &bean_name)?;

        // 先保证显式声明的先序依赖完成初始化
        for dependency in merged.definition.depends_on.clone() {
            if self.singleton_registry.is_dependent(&bean_name, &dependency) {
                return Err(DefinitionError::invalid(
                    &bean_name,
                    format!("depends-on 形成循环: '{bean_name}' 与 '{dependency}'"),
                )
                .into());
            }
            self.singleton_registry
                .register_dependent_bean(&dependency, &bean_name);
            self.do_get(&dependency, ctx)?;
        }

        let instance = if merged.is_singleton() {
            self.singleton_registry
                .get_or_create(&bean_name, || self.create_bean(&bean_name, &merged, ctx))?
        } else if merged.is_prototype() {
            ctx.enter(&bean_name)?;
            let created = self.create_bean(&bean_name, &merged, ctx);
            ctx.exit(&bean_name);
            created?
        } else {
            let scope_name = merged.scope_name().to_string();
            let scope = self
                .scopes
                .read()
                .get(&scope_name)
                .cloned()
                .ok_or(ScopeError::NotRegistered { scope: scope_name })?;
            ctx.enter(&bean_name)?;
            let mut provider = || self.create_bean(&bean_name, &merged, ctx);
            let created = scope.get(&bean_name, &mut provider);
            ctx.exit(&bean_name);
            created?
        };

        self.object_for_instance(instance, name, &bean_name, Some(&merged))
    }

    /// 从实例得到对外暴露的对象
    ///
    /// 工厂契约 Bean 对非解引用请求返回其产品，单例产品被缓存并后置处理一次
    fn object_for_instance(
        &self,
        instance: BeanHandle,
        requested_name: &str,
        bean_name: &str,
        merged: Option<&Arc<MergedBeanDefinition>>,
    ) -> BeansResult<BeanHandle> {
        let contract = self
            .types
            .get_by_type_id((*instance).type_id())
            .and_then(|d| d.factory_contract().cloned());

        if is_factory_dereference(requested_name) {
            if contract.is_none() {
                return Err(DefinitionError::invalid(
                    bean_name,
                    "以解引用方式请求的 Bean 未声明工厂契约",
                )
                .into());
            }
            return Ok(instance);
        }
        let Some(contract) = contract else {
            return Ok(instance);
        };

        let synthetic = match merged {
            Some(merged) => merged.definition.synthetic,
            None => {
                if self.contains_definition(bean_name) {
                    self.merged_local_definition(bean_name)?.definition.synthetic
                } else {
                    false
                }
            }
        };

        let factory_address = Arc::as_ptr(&instance) as *const u8 as usize;
        if contract.singleton_product && self.singleton_registry.contains_singleton(bean_name) {
            if let Some(entry) = self.product_cache.get(bean_name) {
                let (cached_address, product) = entry.value();
                if *cached_address == factory_address {
                    return Ok(product.clone());
                }
            }
            let mut product = contract.produce(&instance)?;
            if !synthetic {
                product = self.apply_after_initialization(bean_name, product)?;
            }
            self.product_cache
                .insert(bean_name.to_string(), (factory_address, product.clone()));
            Ok(product)
        } else {
            let mut product = contract.produce(&instance)?;
            if !synthetic {
                product = self.apply_after_initialization(bean_name, product)?;
            }
            Ok(product)
        }
    }

    pub(crate) fn check_merged(
        &self,
        merged: &MergedBeanDefinition,
        bean_name: &str,
    ) -> BeansResult<()> {
        if merged.definition.is_abstract {
            return Err(DefinitionError::BeanIsAbstract {
                name: bean_name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub(crate) fn original_name(&self, requested: &str, bean_name: &str) -> String {
        if is_factory_dereference(requested) {
            format!("{FACTORY_BEAN_PREFIX}{bean_name}")
        } else {
            bean_name.to_string()
        }
    }

    pub(crate) fn mark_as_created(&self, bean_name: &str) {
        self.already_created.write().insert(bean_name.to_string());
    }

    pub(crate) fn is_eligible_for_metadata_caching(&self, bean_name: &str) -> bool {
        self.already_created.read().contains(bean_name)
    }

    /// 仅因类型检查而创建的单例可以被移除
    pub(crate) fn remove_singleton_if_created_for_type_check_only(&self, bean_name: &str) -> bool {
        if self.already_created.read().contains(bean_name) {
            false
        } else {
            self.singleton_registry.remove_singleton(bean_name);
            true
        }
    }

    pub(crate) fn processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.post_processors.read().clone()
    }

    pub(crate) fn candidate_type_matches(&self, name: &str, target: TypeId) -> bool {
        let merged = match self.merged_local_definition(name) {
            Ok(merged) => merged,
            Err(err) => {
                self.singleton_registry.on_suppressed(err);
                return false;
            }
        };
        if merged.definition.is_abstract {
            return false;
        }
        if merged.definition.factory_method_name.is_some() {
            return self
                .factory_method_return_type(&merged, name)
                .is_some_and(|info| {
                    info.id == target
                        || self
                            .types
                            .get_by_type_id(info.id)
                            .is_some_and(|d| d.is_assignable_to(target))
                });
        }
        let Some(descriptor) = merged
            .definition
            .type_name
            .as_ref()
            .and_then(|type_name| self.types.get(type_name))
        else {
            return false;
        };
        if let Some(contract) = descriptor.factory_contract() {
            return contract.product_type.id == target
                || self
                    .types
                    .get_by_type_id(contract.product_type.id)
                    .is_some_and(|d| d.is_assignable_to(target));
        }
        descriptor.is_assignable_to(target)
    }
}

impl ContainerView for BeanContainer {
    fn get_handle(&self, name: &str) -> BeansResult<BeanHandle> {
        BeanContainer::get_handle(self, name)
    }

    fn contains(&self, name: &str) -> bool {
        BeanContainer::contains(self, name)
    }

    fn get_type(&self, name: &str) -> BeansResult<TypeInfo> {
        BeanContainer::get_type(self, name)
    }

    fn is_singleton(&self, name: &str) -> BeansResult<bool> {
        BeanContainer::is_singleton(self, name)
    }

    fn is_prototype(&self, name: &str) -> BeansResult<bool> {
        BeanContainer::is_prototype(self, name)
    }

    fn merged_definition(&self, name: &str) -> BeansResult<Arc<MergedBeanDefinition>> {
        let bean_name = self.canonical_name(transformed_bean_name(name));
        if !self.contains_definition(&bean_name) {
            if let Some(parent) = &self.parent {
                return parent.merged_definition(&bean_name);
            }
        }
        self.merged_local_definition(&bean_name)
    }
}
