//! 类型转换服务
//!
//! 声明值在赋给注入点之前经过的可插拔转换

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use summer_common::{BeanHandle, BeansResult, ResolutionError, TypeInfo};

/// 单个类型的转换函数
pub type ConverterFn = Arc<dyn Fn(&serde_json::Value) -> BeansResult<BeanHandle> + Send + Sync>;

/// 类型转换服务 trait
pub trait ConversionService: Send + Sync {
    /// 把配置值转换为目标类型的实例句柄
    fn convert_value(&self, value: &serde_json::Value, target: &TypeInfo) -> BeansResult<BeanHandle>;

    /// 把已有实例转换为目标类型的实例句柄
    fn convert_handle(&self, handle: &BeanHandle, target: &TypeInfo) -> BeansResult<BeanHandle> {
        if (**handle).type_id() == target.id {
            return Ok(handle.clone());
        }
        Err(ResolutionError::TypeMismatch {
            name: target.name.clone(),
            expected: target.name.clone(),
            actual: "类型擦除的实例".to_string(),
        }
        .into())
    }

    /// 判断目标类型是否可转换
    fn can_convert(&self, target: &TypeInfo) -> bool;
}

/// 默认类型转换服务
///
/// 按目标 TypeId 注册转换函数，serde 可反序列化的类型可直接注册
pub struct SimpleConversionService {
    converters: DashMap<TypeId, ConverterFn>,
}

impl SimpleConversionService {
    /// 创建空服务，不含任何内置转换
    pub fn empty() -> Self {
        Self {
            converters: DashMap::new(),
        }
    }

    /// 创建带内置标量转换的服务
    pub fn new() -> Self {
        let service = Self::empty();
        service.register::<String>();
        service.register::<bool>();
        service.register::<i32>();
        service.register::<i64>();
        service.register::<u32>();
        service.register::<u64>();
        service.register::<f32>();
        service.register::<f64>();
        service.register::<usize>();
        service.register::<Vec<String>>();
        service
    }

    /// 注册基于 serde 反序列化的转换
    pub fn register<T>(&self)
    where
        T: DeserializeOwned + Any + Send + Sync,
    {
        let converter: ConverterFn = Arc::new(|value: &serde_json::Value| {
            serde_json::from_value::<T>(value.clone())
                .map(|converted| Arc::new(converted) as BeanHandle)
                .map_err(|err| {
                    ResolutionError::conversion_failed(
                        std::any::type_name::<T>(),
                        err.to_string(),
                    )
                    .into()
                })
        });
        self.converters.insert(TypeId::of::<T>(), converter);
    }

    /// 注册自定义转换函数
    pub fn register_converter(&self, target: TypeId, converter: ConverterFn) {
        self.converters.insert(target, converter);
    }
}

impl Default for SimpleConversionService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimpleConversionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleConversionService")
            .field("registered", &self.converters.len())
            .finish()
    }
}

impl ConversionService for SimpleConversionService {
    fn convert_value(&self, value: &serde_json::Value, target: &TypeInfo) -> BeansResult<BeanHandle> {
        match self.converters.get(&target.id) {
            Some(converter) => converter(value),
            None => Err(ResolutionError::conversion_failed(
                target.name.clone(),
                "没有注册对应的转换函数",
            )
            .into()),
        }
    }

    fn can_convert(&self, target: &TypeInfo) -> bool {
        self.converters.contains_key(&target.id)
    }
}
