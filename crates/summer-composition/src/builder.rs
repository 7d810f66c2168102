//! 容器构建器

use std::sync::Arc;

use summer_abstractions::{
    BeanPostProcessor, ContainerConfig, ContainerView, ConversionService, EmbeddedValueResolver,
    ExpressionEvaluator, InstantiationStrategy, Scope, TypeDescriptor, TypeRegistry,
};
use summer_common::{BeanDefinition, BeanHandle, BeansResult};
use summer_container::BeanContainer;
use tracing::info;

/// 容器构建器
///
/// 收集类型描述符、定义、单例与各项能力配置，一次性组装出容器
pub struct ContainerBuilder {
    name: String,
    config: ContainerConfig,
    types: Arc<TypeRegistry>,
    definitions: Vec<(String, BeanDefinition)>,
    singletons: Vec<(String, BeanHandle)>,
    singleton_infos: Vec<(String, summer_common::TypeInfo)>,
    post_processors: Vec<Arc<dyn BeanPostProcessor>>,
    scopes: Vec<(String, Arc<dyn Scope>)>,
    aliases: Vec<(String, String)>,
    parent: Option<Arc<dyn ContainerView>>,
    instantiation_strategy: Option<Arc<dyn InstantiationStrategy>>,
    conversion_service: Option<Arc<dyn ConversionService>>,
    expression_evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    embedded_value_resolvers: Vec<Arc<dyn EmbeddedValueResolver>>,
}

impl ContainerBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            name: "default".to_string(),
            config: ContainerConfig::default(),
            types: Arc::new(TypeRegistry::new()),
            definitions: Vec::new(),
            singletons: Vec::new(),
            singleton_infos: Vec::new(),
            post_processors: Vec::new(),
            scopes: Vec::new(),
            aliases: Vec::new(),
            parent: None,
            instantiation_strategy: None,
            conversion_service: None,
            expression_evaluator: None,
            embedded_value_resolvers: Vec::new(),
        }
    }

    /// 设置容器名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 设置容器配置
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// 使用已有的类型注册表
    pub fn with_type_registry(mut self, types: Arc<TypeRegistry>) -> Self {
        self.types = types;
        self
    }

    /// 注册类型描述符
    pub fn register_type(
        self,
        type_name: impl Into<String>,
        descriptor: Arc<dyn TypeDescriptor>,
    ) -> Self {
        self.types.register(type_name, descriptor);
        self
    }

    /// 注册 Bean 定义
    pub fn register_definition(
        mut self,
        bean_name: impl Into<String>,
        definition: BeanDefinition,
    ) -> Self {
        self.definitions.push((bean_name.into(), definition));
        self
    }

    /// 注册外部构造的单例
    pub fn register_singleton<T: std::any::Any + Send + Sync>(
        mut self,
        bean_name: impl Into<String>,
        instance: Arc<T>,
    ) -> Self {
        let bean_name = bean_name.into();
        self.singleton_infos
            .push((bean_name.clone(), summer_common::TypeInfo::of::<T>()));
        self.singletons.push((bean_name, instance as BeanHandle));
        self
    }

    /// 添加后置处理器
    pub fn add_post_processor(mut self, processor: Arc<dyn BeanPostProcessor>) -> Self {
        self.post_processors.push(processor);
        self
    }

    /// 注册自定义作用域
    pub fn register_scope(mut self, scope_name: impl Into<String>, scope: Arc<dyn Scope>) -> Self {
        self.scopes.push((scope_name.into(), scope));
        self
    }

    /// 注册别名
    pub fn register_alias(
        mut self,
        bean_name: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        self.aliases.push((bean_name.into(), alias.into()));
        self
    }

    /// 设置父容器
    pub fn with_parent(mut self, parent: Arc<dyn ContainerView>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// 设置实例化策略
    pub fn with_instantiation_strategy(mut self, strategy: Arc<dyn InstantiationStrategy>) -> Self {
        self.instantiation_strategy = Some(strategy);
        self
    }

    /// 设置类型转换服务
    pub fn with_conversion_service(mut self, service: Arc<dyn ConversionService>) -> Self {
        self.conversion_service = Some(service);
        self
    }

    /// 设置表达式求值器
    pub fn with_expression_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.expression_evaluator = Some(evaluator);
        self
    }

    /// 添加嵌入值解析器
    pub fn add_embedded_value_resolver(
        mut self,
        resolver: Arc<dyn EmbeddedValueResolver>,
    ) -> Self {
        self.embedded_value_resolvers.push(resolver);
        self
    }

    /// 组装容器
    pub fn build(self) -> BeansResult<BeanContainer> {
        let mut container = BeanContainer::with_config(self.types, self.config);
        container.set_name(self.name.clone());
        if let Some(parent) = self.parent {
            container.set_parent(parent);
        }
        if let Some(strategy) = self.instantiation_strategy {
            container.set_instantiation_strategy(strategy);
        }
        if let Some(service) = self.conversion_service {
            container.set_conversion_service(service);
        }
        if let Some(evaluator) = self.expression_evaluator {
            container.set_expression_evaluator(evaluator);
        }
        for resolver in self.embedded_value_resolvers {
            container.add_embedded_value_resolver(resolver);
        }
        for processor in self.post_processors {
            container.add_post_processor(processor);
        }
        for (scope_name, scope) in self.scopes {
            container.register_scope(&scope_name, scope)?;
        }

        let definition_count = self.definitions.len();
        for (bean_name, definition) in self.definitions {
            container.register_definition(bean_name, definition)?;
        }
        for ((bean_name, instance), (_, info)) in
            self.singletons.into_iter().zip(self.singleton_infos)
        {
            container.register_singleton_handle(bean_name, instance, info)?;
        }
        for (bean_name, alias) in self.aliases {
            container.register_alias(&bean_name, &alias)?;
        }
        info!(
            "容器 '{}' 组装完成, 注册了 {} 个定义",
            self.name, definition_count
        );
        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
