//! Bean 定义数据模型
//!
//! 声明式描述一个受管对象如何被创建、装配和销毁

use std::collections::HashMap;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::errors::{BeansResult, CreationResult};
use crate::metadata::TypeInfo;
use crate::value::BeanValue;

/// 单例作用域名称
pub const SCOPE_SINGLETON: &str = "singleton";
/// 原型作用域名称
pub const SCOPE_PROTOTYPE: &str = "prototype";

/// 自动装配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AutowireMode {
    /// 不自动装配
    #[default]
    No,
    /// 按属性名装配
    ByName,
    /// 按属性类型装配
    ByType,
    /// 按构造函数参数装配
    Constructor,
}

/// 依赖检查模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DependencyCheck {
    /// 不检查
    #[default]
    None,
    /// 仅检查简单类型属性
    Simple,
    /// 仅检查对象类型属性
    Objects,
    /// 检查全部属性
    All,
}

/// 单个属性值
#[derive(Debug, Clone)]
pub struct PropertyValue {
    /// 属性名
    pub name: String,
    /// 声明值
    pub value: BeanValue,
}

impl PropertyValue {
    /// 创建新的属性值
    pub fn new(name: impl Into<String>, value: BeanValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// 属性值集合
///
/// 保持声明顺序，按属性名去重
#[derive(Debug, Clone, Default)]
pub struct PropertyValues {
    values: Vec<PropertyValue>,
}

impl PropertyValues {
    /// 创建空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加属性值，同名时替换
    pub fn set(&mut self, value: PropertyValue) {
        if let Some(existing) = self.values.iter_mut().find(|pv| pv.name == value.name) {
            *existing = value;
        } else {
            self.values.push(value);
        }
    }

    /// 追加属性值
    pub fn add(&mut self, name: impl Into<String>, value: BeanValue) {
        self.set(PropertyValue::new(name, value));
    }

    /// 判断是否包含指定属性
    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|pv| pv.name == name)
    }

    /// 获取指定属性的值
    pub fn get(&self, name: &str) -> Option<&BeanValue> {
        self.values.iter().find(|pv| pv.name == name).map(|pv| &pv.value)
    }

    /// 遍历属性值
    pub fn iter(&self) -> impl Iterator<Item = &PropertyValue> {
        self.values.iter()
    }

    /// 判断集合是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 属性数量
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl FromIterator<PropertyValue> for PropertyValues {
    fn from_iter<I: IntoIterator<Item = PropertyValue>>(iter: I) -> Self {
        let mut values = Self::new();
        for pv in iter {
            values.set(pv);
        }
        values
    }
}

/// 构造参数集合
///
/// 按下标声明的参数可被子定义覆盖，通用参数按声明顺序追加
#[derive(Debug, Clone, Default)]
pub struct ConstructorArgumentValues {
    indexed: Vec<(usize, BeanValue)>,
    generic: Vec<BeanValue>,
}

impl ConstructorArgumentValues {
    /// 创建空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 按下标添加参数，重复下标时替换
    pub fn add_indexed(&mut self, index: usize, value: BeanValue) {
        if let Some(existing) = self.indexed.iter_mut().find(|(i, _)| *i == index) {
            existing.1 = value;
        } else {
            self.indexed.push((index, value));
        }
    }

    /// 添加通用参数
    pub fn add_generic(&mut self, value: BeanValue) {
        self.generic.push(value);
    }

    /// 获取指定下标的参数
    pub fn get_indexed(&self, index: usize) -> Option<&BeanValue> {
        self.indexed
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, value)| value)
    }

    /// 按声明顺序获取通用参数
    pub fn generic_values(&self) -> &[BeanValue] {
        &self.generic
    }

    /// 已声明的参数数量
    pub fn count(&self) -> usize {
        self.indexed.len() + self.generic.len()
    }

    /// 判断集合是否为空
    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.generic.is_empty()
    }

    /// 以 other 为子定义进行合并，下标参数子定义覆盖，通用参数追加
    pub fn merge_from_child(&mut self, child: &Self) {
        for (index, value) in &child.indexed {
            self.add_indexed(*index, value.clone());
        }
        for value in &child.generic {
            self.generic.push(value.clone());
        }
    }
}

/// 方法覆盖声明
#[derive(Debug, Clone)]
pub struct MethodOverride {
    /// 被覆盖的方法名
    pub method_name: String,
}

/// 方法覆盖集合
///
/// 直接实例化策略不支持方法覆盖，需要使用支持包装的策略
#[derive(Debug, Clone, Default)]
pub struct MethodOverrides {
    overrides: Vec<MethodOverride>,
}

impl MethodOverrides {
    /// 创建空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加方法覆盖
    pub fn add(&mut self, method_name: impl Into<String>) {
        self.overrides.push(MethodOverride {
            method_name: method_name.into(),
        });
    }

    /// 判断集合是否为空
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// 遍历方法覆盖
    pub fn iter(&self) -> impl Iterator<Item = &MethodOverride> {
        self.overrides.iter()
    }
}

/// Bean 定义
///
/// 受管对象的声明式蓝图
#[derive(Debug, Clone, Default)]
pub struct BeanDefinition {
    /// 注册在类型注册表中的类型名
    pub type_name: Option<String>,
    /// 作用域名称，未指定时合并阶段默认为单例
    pub scope: Option<String>,
    /// 父定义名称
    pub parent_name: Option<String>,
    /// 工厂方法名称
    pub factory_method_name: Option<String>,
    /// 工厂 Bean 名称，实例工厂方法在该 Bean 上调用
    pub factory_bean_name: Option<String>,
    /// 构造参数
    pub constructor_args: ConstructorArgumentValues,
    /// 属性值
    pub property_values: PropertyValues,
    /// 初始化回调方法名
    pub init_method_name: Option<String>,
    /// 销毁回调方法名
    pub destroy_method_name: Option<String>,
    /// 显式的先序依赖
    pub depends_on: Vec<String>,
    /// 自动装配模式
    pub autowire_mode: AutowireMode,
    /// 依赖检查模式
    pub dependency_check: DependencyCheck,
    /// 是否抽象定义
    pub is_abstract: bool,
    /// 是否延迟初始化
    pub lazy_init: bool,
    /// 是否容器内部合成的定义，合成定义跳过后置处理
    pub synthetic: bool,
    /// 按类型装配候选不唯一时是否优先
    pub primary: bool,
    /// 方法覆盖
    pub method_overrides: MethodOverrides,
    /// 定义来源描述
    pub origin: Option<String>,
}

impl BeanDefinition {
    /// 创建指向指定类型的定义
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    /// 创建以指定定义为父的子定义
    pub fn child_of(parent_name: impl Into<String>) -> Self {
        Self {
            parent_name: Some(parent_name.into()),
            ..Self::default()
        }
    }

    /// 设置作用域
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// 设置自动装配模式
    pub fn with_autowire(mut self, mode: AutowireMode) -> Self {
        self.autowire_mode = mode;
        self
    }

    /// 设置依赖检查模式
    pub fn with_dependency_check(mut self, check: DependencyCheck) -> Self {
        self.dependency_check = check;
        self
    }

    /// 添加属性值
    pub fn with_property(mut self, name: impl Into<String>, value: BeanValue) -> Self {
        self.property_values.add(name, value);
        self
    }

    /// 添加按下标的构造参数
    pub fn with_constructor_arg(mut self, index: usize, value: BeanValue) -> Self {
        self.constructor_args.add_indexed(index, value);
        self
    }

    /// 设置工厂方法
    pub fn with_factory_method(mut self, name: impl Into<String>) -> Self {
        self.factory_method_name = Some(name.into());
        self
    }

    /// 设置工厂 Bean
    pub fn with_factory_bean(mut self, name: impl Into<String>) -> Self {
        self.factory_bean_name = Some(name.into());
        self
    }

    /// 设置初始化回调方法名
    pub fn with_init_method(mut self, name: impl Into<String>) -> Self {
        self.init_method_name = Some(name.into());
        self
    }

    /// 设置销毁回调方法名
    pub fn with_destroy_method(mut self, name: impl Into<String>) -> Self {
        self.destroy_method_name = Some(name.into());
        self
    }

    /// 添加先序依赖
    pub fn with_depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// 标记为抽象定义
    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    /// 标记为延迟初始化
    pub fn with_lazy_init(mut self, lazy: bool) -> Self {
        self.lazy_init = lazy;
        self
    }

    /// 标记为按类型装配时的首选候选
    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    /// 设置定义来源描述
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// 判断作用域是否是单例，未指定时按单例处理
    pub fn is_singleton_scope(&self) -> bool {
        self.scope.as_deref().map_or(true, |s| s == SCOPE_SINGLETON)
    }

    /// 判断作用域是否是原型
    pub fn is_prototype_scope(&self) -> bool {
        self.scope.as_deref() == Some(SCOPE_PROTOTYPE)
    }

    /// 以 child 的显式声明覆盖当前定义
    ///
    /// 标量字段被子定义的值替换，属性值和构造参数按键合并且子定义优先
    pub fn override_from(&mut self, child: &Self) {
        if child.type_name.is_some() {
            self.type_name = child.type_name.clone();
        }
        if child.scope.is_some() {
            self.scope = child.scope.clone();
        }
        if child.factory_method_name.is_some() {
            self.factory_method_name = child.factory_method_name.clone();
        }
        if child.factory_bean_name.is_some() {
            self.factory_bean_name = child.factory_bean_name.clone();
        }
        if child.init_method_name.is_some() {
            self.init_method_name = child.init_method_name.clone();
        }
        if child.destroy_method_name.is_some() {
            self.destroy_method_name = child.destroy_method_name.clone();
        }
        if child.origin.is_some() {
            self.origin = child.origin.clone();
        }
        if !child.depends_on.is_empty() {
            self.depends_on = child.depends_on.clone();
        }
        if child.autowire_mode != AutowireMode::No {
            self.autowire_mode = child.autowire_mode;
        }
        if child.dependency_check != DependencyCheck::None {
            self.dependency_check = child.dependency_check;
        }
        self.is_abstract = child.is_abstract;
        self.lazy_init = child.lazy_init;
        self.synthetic = child.synthetic;
        self.primary = child.primary;
        self.constructor_args.merge_from_child(&child.constructor_args);
        for pv in child.property_values.iter() {
            self.property_values.set(pv.clone());
        }
        if !child.method_overrides.is_empty() {
            self.method_overrides = child.method_overrides.clone();
        }
        self.parent_name = None;
    }
}

/// 已解析的构造方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedExecutable {
    /// 类型描述符中按声明顺序的第 index 个构造函数
    Constructor { index: usize },
    /// 类型描述符中按声明顺序的第 index 个工厂方法
    FactoryMethod { index: usize },
}

/// 合并后的 Bean 定义
///
/// 父定义链已完全展开，每个 Bean 名称最多对应一个。
/// 缓存后除一次性的后置处理标记和构造方式缓存外不可变。
#[derive(Debug)]
pub struct MergedBeanDefinition {
    /// 展开后的定义
    pub definition: BeanDefinition,
    resolved_executable: OnceCell<ResolvedExecutable>,
    post_processed: OnceCell<()>,
    attributes: RwLock<HashMap<String, serde_json::Value>>,
}

impl MergedBeanDefinition {
    /// 从展开后的定义创建
    pub fn new(mut definition: BeanDefinition) -> Self {
        definition.parent_name = None;
        if definition.scope.is_none() {
            definition.scope = Some(SCOPE_SINGLETON.to_string());
        }
        Self {
            definition,
            resolved_executable: OnceCell::new(),
            post_processed: OnceCell::new(),
            attributes: RwLock::new(HashMap::new()),
        }
    }

    /// 作用域名称
    pub fn scope_name(&self) -> &str {
        self.definition.scope.as_deref().unwrap_or(SCOPE_SINGLETON)
    }

    /// 是否单例作用域
    pub fn is_singleton(&self) -> bool {
        self.scope_name() == SCOPE_SINGLETON
    }

    /// 是否原型作用域
    pub fn is_prototype(&self) -> bool {
        self.scope_name() == SCOPE_PROTOTYPE
    }

    /// 已缓存的构造方式
    pub fn resolved_executable(&self) -> Option<ResolvedExecutable> {
        self.resolved_executable.get().copied()
    }

    /// 获取或解析构造方式，解析结果缓存后供重复创建复用
    pub fn resolve_executable_with<F>(&self, resolve: F) -> CreationResult<ResolvedExecutable>
    where
        F: FnOnce() -> CreationResult<ResolvedExecutable>,
    {
        self.resolved_executable.get_or_try_init(resolve).copied()
    }

    /// 执行一次性的合并定义后置处理
    ///
    /// 多次调用只有首次会真正执行
    pub fn post_process_once<F>(&self, process: F) -> BeansResult<()>
    where
        F: FnOnce() -> BeansResult<()>,
    {
        self.post_processed.get_or_try_init(|| process().map(|()| ())).map(|_| ())
    }

    /// 是否已完成合并定义后置处理
    pub fn is_post_processed(&self) -> bool {
        self.post_processed.get().is_some()
    }

    /// 写入派生元数据
    pub fn set_attribute(&self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.write().insert(key.into(), value);
    }

    /// 读取派生元数据
    pub fn attribute(&self, key: &str) -> Option<serde_json::Value> {
        self.attributes.read().get(key).cloned()
    }
}

/// 依赖描述符
///
/// 描述一个注入点，属性赋值器或构造参数
#[derive(Debug, Clone)]
pub struct DependencyDescriptor {
    /// 注入点声明的类型
    pub type_info: TypeInfo,
    /// 注入点名称
    pub injection_point: String,
    /// 是否必须满足
    pub required: bool,
    /// 是否立即解析候选
    pub eager: bool,
    /// 泛型解包层级
    pub nesting_level: usize,
}

impl DependencyDescriptor {
    /// 为属性注入点创建描述符，属性装配缺省为可选
    pub fn for_property(name: impl Into<String>, type_info: TypeInfo) -> Self {
        Self {
            type_info,
            injection_point: name.into(),
            required: false,
            eager: true,
            nesting_level: 1,
        }
    }

    /// 为构造参数注入点创建描述符
    pub fn for_parameter(name: impl Into<String>, type_info: TypeInfo, required: bool) -> Self {
        Self {
            type_info,
            injection_point: name.into(),
            required,
            eager: true,
            nesting_level: 1,
        }
    }

    /// 设置是否必须满足
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}
