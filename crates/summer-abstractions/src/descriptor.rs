//! 类型描述能力
//!
//! 以手写类型表的形式枚举属性、构造函数、工厂方法和生命周期回调，
//! 容器据此完成属性赋值与实例构造，不依赖原生反射。
//!
//! 约定：受容器管理的 trait 都声明 `Send + Sync` 为超 trait，
//! trait 对象注入点以 `TypeId::of::<dyn Xxx>()` 标识，
//! trait 对象实例以 `Arc<Arc<dyn Xxx>>` 的形式装入实例句柄。

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use summer_common::{
    BeanHandle, BeansResult, MethodOverrides, ResolutionError, TypeInfo,
};

/// 属性赋值函数
pub type SetterFn = Arc<dyn Fn(&BeanHandle, BeanHandle) -> BeansResult<()> + Send + Sync>;
/// 无参生命周期回调函数
pub type CallbackFn =
    Arc<dyn Fn(&BeanHandle) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;
/// 构造函数
pub type ConstructorFn = Arc<dyn Fn(Vec<BeanHandle>) -> BeansResult<BeanHandle> + Send + Sync>;
/// 工厂方法函数，实例工厂方法会收到工厂 Bean 实例
pub type FactoryMethodFn =
    Arc<dyn Fn(Option<&BeanHandle>, Vec<BeanHandle>) -> BeansResult<BeanHandle> + Send + Sync>;
/// trait 上转型函数
pub type UpcastFn = Arc<dyn Fn(&BeanHandle) -> Option<BeanHandle> + Send + Sync>;
/// 方法覆盖包装函数
pub type OverrideFn =
    Arc<dyn Fn(BeanHandle, &MethodOverrides) -> BeansResult<BeanHandle> + Send + Sync>;
/// 工厂契约的产品生产函数
pub type ProductFn = Arc<dyn Fn(&BeanHandle) -> BeansResult<BeanHandle> + Send + Sync>;

/// 把实例句柄向下转型为具体类型
pub fn downcast_arc<T: Any + Send + Sync>(handle: &BeanHandle) -> BeansResult<Arc<T>> {
    handle.clone().downcast::<T>().map_err(|_| {
        ResolutionError::TypeMismatch {
            name: std::any::type_name::<T>().to_string(),
            expected: std::any::type_name::<T>().to_string(),
            actual: "类型擦除的实例".to_string(),
        }
        .into()
    })
}

/// 把以 `Arc<Arc<dyn Trait>>` 形式装入的 trait 对象句柄取出为 `Arc<dyn Trait>`
pub fn downcast_shared<I: ?Sized + Send + Sync + 'static>(
    handle: &BeanHandle,
) -> BeansResult<Arc<I>> {
    handle
        .clone()
        .downcast::<Arc<I>>()
        .map(|outer| (*outer).clone())
        .map_err(|_| {
            ResolutionError::TypeMismatch {
                name: std::any::type_name::<I>().to_string(),
                expected: std::any::type_name::<I>().to_string(),
                actual: "类型擦除的实例".to_string(),
            }
            .into()
        })
}

/// 属性描述符
#[derive(Clone)]
pub struct PropertyDescriptor {
    /// 属性名
    pub name: String,
    /// 声明类型
    pub type_info: TypeInfo,
    /// 是否简单类型，简单类型不参与按类型自动装配
    pub simple: bool,
    /// 是否可写
    pub writable: bool,
    set: SetterFn,
}

impl PropertyDescriptor {
    /// 对实例设置该属性
    pub fn set_value(&self, instance: &BeanHandle, value: BeanHandle) -> BeansResult<()> {
        (self.set)(instance, value)
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("type_info", &self.type_info)
            .field("simple", &self.simple)
            .field("writable", &self.writable)
            .finish()
    }
}

/// 构造参数或工厂方法参数描述符
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    /// 参数名
    pub name: String,
    /// 声明类型
    pub type_info: TypeInfo,
    /// 是否必须满足
    pub required: bool,
}

impl ParameterDescriptor {
    /// 创建必填参数描述符
    pub fn new(name: impl Into<String>, type_info: TypeInfo) -> Self {
        Self {
            name: name.into(),
            type_info,
            required: true,
        }
    }

    /// 标记为可选参数
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// 构造函数描述符
#[derive(Clone)]
pub struct ConstructorDescriptor {
    /// 参数列表，按声明顺序
    pub params: Vec<ParameterDescriptor>,
    construct: ConstructorFn,
}

impl ConstructorDescriptor {
    /// 以给定参数实例化
    pub fn instantiate(&self, args: Vec<BeanHandle>) -> BeansResult<BeanHandle> {
        (self.construct)(args)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("params", &self.params)
            .finish()
    }
}

/// 工厂方法描述符
#[derive(Clone)]
pub struct FactoryMethodDescriptor {
    /// 方法名
    pub name: String,
    /// 是否静态工厂方法
    pub is_static: bool,
    /// 参数列表
    pub params: Vec<ParameterDescriptor>,
    /// 返回类型
    pub return_type: TypeInfo,
    invoke: FactoryMethodFn,
}

impl FactoryMethodDescriptor {
    /// 调用工厂方法，实例工厂方法需要给出工厂 Bean
    pub fn invoke(
        &self,
        factory_bean: Option<&BeanHandle>,
        args: Vec<BeanHandle>,
    ) -> BeansResult<BeanHandle> {
        (self.invoke)(factory_bean, args)
    }
}

impl fmt::Debug for FactoryMethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryMethodDescriptor")
            .field("name", &self.name)
            .field("is_static", &self.is_static)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .finish()
    }
}

/// 无参回调方法描述符
///
/// 初始化与销毁回调按名称在此查找
#[derive(Clone)]
pub struct MethodDescriptor {
    /// 方法名
    pub name: String,
    invoke: CallbackFn,
}

impl MethodDescriptor {
    /// 在实例上调用
    pub fn invoke(
        &self,
        instance: &BeanHandle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (self.invoke)(instance)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .finish()
    }
}

/// 工厂契约
///
/// 标记一个 Bean 的产品而非其本身是被注入的对象
#[derive(Clone)]
pub struct FactoryContract {
    /// 产品类型
    pub product_type: TypeInfo,
    /// 产品是否单例，单例产品会被容器缓存
    pub singleton_product: bool,
    produce: ProductFn,
}

impl FactoryContract {
    /// 创建工厂契约
    pub fn new(
        product_type: TypeInfo,
        singleton_product: bool,
        produce: ProductFn,
    ) -> Self {
        Self {
            product_type,
            singleton_product,
            produce,
        }
    }

    /// 由工厂实例生产产品
    pub fn produce(&self, factory: &BeanHandle) -> BeansResult<BeanHandle> {
        (self.produce)(factory)
    }
}

impl fmt::Debug for FactoryContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryContract")
            .field("product_type", &self.product_type)
            .field("singleton_product", &self.singleton_product)
            .finish()
    }
}

/// 类型描述符 trait
///
/// 一个受管类型的全部可编程元数据
pub trait TypeDescriptor: Send + Sync {
    /// 类型信息
    fn type_info(&self) -> &TypeInfo;

    /// 属性表
    fn properties(&self) -> &[PropertyDescriptor];

    /// 按名称查找属性
    fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties().iter().find(|p| p.name == name)
    }

    /// 构造函数表，按声明顺序
    fn constructors(&self) -> &[ConstructorDescriptor];

    /// 工厂方法表
    fn factory_methods(&self) -> &[FactoryMethodDescriptor];

    /// 无参回调方法表
    fn methods(&self) -> &[MethodDescriptor];

    /// 按名称查找回调方法
    fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods().iter().find(|m| m.name == name)
    }

    /// 初始化契约回调，相当于类型自带的初始化方法
    fn lifecycle_init(&self) -> Option<&CallbackFn> {
        None
    }

    /// 销毁契约回调，声明了该回调的 Bean 需要有序销毁
    fn lifecycle_destroy(&self) -> Option<&CallbackFn> {
        None
    }

    /// 判断实例是否可以按 target 类型被注入
    fn is_assignable_to(&self, target: TypeId) -> bool;

    /// 把实例上转型为 target 类型的句柄
    fn upcast(&self, target: TypeId, instance: &BeanHandle) -> Option<BeanHandle>;

    /// 方法覆盖的包装工厂
    fn override_factory(&self) -> Option<&OverrideFn> {
        None
    }

    /// 工厂契约
    fn factory_contract(&self) -> Option<&FactoryContract> {
        None
    }
}

/// 基于手写表的类型描述符实现
pub struct MapTypeDescriptor {
    type_info: TypeInfo,
    properties: Vec<PropertyDescriptor>,
    constructors: Vec<ConstructorDescriptor>,
    factory_methods: Vec<FactoryMethodDescriptor>,
    methods: Vec<MethodDescriptor>,
    lifecycle_init: Option<CallbackFn>,
    lifecycle_destroy: Option<CallbackFn>,
    upcasts: HashMap<TypeId, UpcastFn>,
    override_factory: Option<OverrideFn>,
    factory_contract: Option<FactoryContract>,
}

impl fmt::Debug for MapTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapTypeDescriptor")
            .field("type_info", &self.type_info)
            .field("properties", &self.properties)
            .field("constructors", &self.constructors.len())
            .field("factory_methods", &self.factory_methods)
            .finish()
    }
}

impl TypeDescriptor for MapTypeDescriptor {
    fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    fn factory_methods(&self) -> &[FactoryMethodDescriptor] {
        &self.factory_methods
    }

    fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    fn lifecycle_init(&self) -> Option<&CallbackFn> {
        self.lifecycle_init.as_ref()
    }

    fn lifecycle_destroy(&self) -> Option<&CallbackFn> {
        self.lifecycle_destroy.as_ref()
    }

    fn is_assignable_to(&self, target: TypeId) -> bool {
        target == self.type_info.id || self.upcasts.contains_key(&target)
    }

    fn upcast(&self, target: TypeId, instance: &BeanHandle) -> Option<BeanHandle> {
        if target == self.type_info.id {
            return Some(instance.clone());
        }
        self.upcasts.get(&target).and_then(|cast| cast(instance))
    }

    fn override_factory(&self) -> Option<&OverrideFn> {
        self.override_factory.as_ref()
    }

    fn factory_contract(&self) -> Option<&FactoryContract> {
        self.factory_contract.as_ref()
    }
}

/// 类型描述符构建器
pub struct TypeDescriptorBuilder {
    inner: MapTypeDescriptor,
}

impl TypeDescriptorBuilder {
    /// 为指定类型创建构建器
    pub fn new<T: Any + Send + Sync>() -> Self {
        Self {
            inner: MapTypeDescriptor {
                type_info: TypeInfo::of::<T>(),
                properties: Vec::new(),
                constructors: Vec::new(),
                factory_methods: Vec::new(),
                methods: Vec::new(),
                lifecycle_init: None,
                lifecycle_destroy: None,
                upcasts: HashMap::new(),
                override_factory: None,
                factory_contract: None,
            },
        }
    }

    fn wrap_instance<T, F, R>(
        action: F,
    ) -> impl Fn(&BeanHandle) -> Result<R, BoxedError> + Send + Sync + 'static
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> Result<R, BoxedError> + Send + Sync + 'static,
    {
        move |instance: &BeanHandle| {
            let typed = instance
                .downcast_ref::<T>()
                .ok_or_else(|| -> BoxedError {
                    format!("实例类型与描述符不符: {}", std::any::type_name::<T>()).into()
                })?;
            action(typed)
        }
    }

    /// 添加可写属性
    pub fn property<T, F>(mut self, name: &str, declared: TypeInfo, set: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, BeanHandle) -> BeansResult<()> + Send + Sync + 'static,
    {
        let setter: SetterFn = Arc::new(move |instance: &BeanHandle, value: BeanHandle| {
            let typed = instance.downcast_ref::<T>().ok_or_else(|| {
                summer_common::BeansError::other(format!(
                    "实例类型与描述符不符: {}",
                    std::any::type_name::<T>()
                ))
            })?;
            set(typed, value)
        });
        self.inner.properties.push(PropertyDescriptor {
            name: name.to_string(),
            type_info: declared,
            simple: false,
            writable: true,
            set: setter,
        });
        self
    }

    /// 添加简单类型属性，简单属性不参与按类型自动装配
    pub fn simple_property<T, F>(mut self, name: &str, declared: TypeInfo, set: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, BeanHandle) -> BeansResult<()> + Send + Sync + 'static,
    {
        self = self.property::<T, F>(name, declared, set);
        if let Some(last) = self.inner.properties.last_mut() {
            last.simple = true;
        }
        self
    }

    /// 添加构造函数，按调用顺序排名
    pub fn constructor<T, F>(mut self, params: Vec<ParameterDescriptor>, construct: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Vec<BeanHandle>) -> BeansResult<T> + Send + Sync + 'static,
    {
        let construct: ConstructorFn = Arc::new(move |args: Vec<BeanHandle>| {
            construct(args).map(|instance| Arc::new(instance) as BeanHandle)
        });
        self.inner.constructors.push(ConstructorDescriptor { params, construct });
        self
    }

    /// 添加工厂方法
    pub fn factory_method<R, F>(
        mut self,
        name: &str,
        is_static: bool,
        params: Vec<ParameterDescriptor>,
        invoke: F,
    ) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(Option<&BeanHandle>, Vec<BeanHandle>) -> BeansResult<R> + Send + Sync + 'static,
    {
        let invoke: FactoryMethodFn =
            Arc::new(move |factory: Option<&BeanHandle>, args: Vec<BeanHandle>| {
                invoke(factory, args).map(|instance| Arc::new(instance) as BeanHandle)
            });
        self.inner.factory_methods.push(FactoryMethodDescriptor {
            name: name.to_string(),
            is_static,
            params,
            return_type: TypeInfo::of::<R>(),
            invoke,
        });
        self
    }

    /// 添加无参回调方法
    pub fn method<T, F>(mut self, name: &str, invoke: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> Result<(), BoxedError> + Send + Sync + 'static,
    {
        let invoke = Self::wrap_instance::<T, _, ()>(invoke);
        self.inner.methods.push(MethodDescriptor {
            name: name.to_string(),
            invoke: Arc::new(invoke),
        });
        self
    }

    /// 声明初始化契约回调
    pub fn init_callback<T, F>(mut self, invoke: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> Result<(), BoxedError> + Send + Sync + 'static,
    {
        let invoke = Self::wrap_instance::<T, _, ()>(invoke);
        self.inner.lifecycle_init = Some(Arc::new(invoke));
        self
    }

    /// 声明销毁契约回调
    pub fn destroy_callback<T, F>(mut self, invoke: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> Result<(), BoxedError> + Send + Sync + 'static,
    {
        let invoke = Self::wrap_instance::<T, _, ()>(invoke);
        self.inner.lifecycle_destroy = Some(Arc::new(invoke));
        self
    }

    /// 声明该类型可按 trait `I` 被注入
    pub fn implements<I>(
        mut self,
        cast: impl Fn(&BeanHandle) -> Option<Arc<I>> + Send + Sync + 'static,
    ) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let cast: UpcastFn = Arc::new(move |instance: &BeanHandle| {
            cast(instance).map(|shared| Arc::new(shared) as BeanHandle)
        });
        self.inner.upcasts.insert(TypeId::of::<I>(), cast);
        self
    }

    /// 声明方法覆盖的包装工厂
    pub fn override_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(BeanHandle, &MethodOverrides) -> BeansResult<BeanHandle> + Send + Sync + 'static,
    {
        self.inner.override_factory = Some(Arc::new(factory));
        self
    }

    /// 声明工厂契约
    pub fn factory_contract<F>(
        mut self,
        product_type: TypeInfo,
        singleton_product: bool,
        produce: F,
    ) -> Self
    where
        F: Fn(&BeanHandle) -> BeansResult<BeanHandle> + Send + Sync + 'static,
    {
        self.inner.factory_contract = Some(FactoryContract::new(
            product_type,
            singleton_product,
            Arc::new(produce),
        ));
        self
    }

    /// 完成构建
    pub fn build(self) -> Arc<MapTypeDescriptor> {
        Arc::new(self.inner)
    }
}

/// 回调使用的盒装错误类型
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// 类型注册表
///
/// 按类型名与 TypeId 双向索引已注册的类型描述符
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_name: DashMap<String, Arc<dyn TypeDescriptor>>,
    by_id: DashMap<TypeId, String>,
}

impl TypeRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册类型描述符
    pub fn register(&self, name: impl Into<String>, descriptor: Arc<dyn TypeDescriptor>) {
        let name = name.into();
        self.by_id.insert(descriptor.type_info().id, name.clone());
        self.by_name.insert(name, descriptor);
    }

    /// 按类型名查找
    pub fn get(&self, name: &str) -> Option<Arc<dyn TypeDescriptor>> {
        self.by_name.get(name).map(|entry| entry.value().clone())
    }

    /// 按 TypeId 查找
    pub fn get_by_type_id(&self, type_id: TypeId) -> Option<Arc<dyn TypeDescriptor>> {
        self.by_id
            .get(&type_id)
            .and_then(|entry| self.get(entry.value()))
    }

    /// 判断类型名是否已注册
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// 已注册的类型名列表
    pub fn type_names(&self) -> Vec<String> {
        self.by_name.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl fmt::Debug for dyn TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_info", self.type_info())
            .finish()
    }
}
