//! 类型元数据定义
//!
//! 在不依赖原生反射的前提下描述 Bean 的类型信息

use std::any::TypeId;

use crate::value::BeanHandle;

/// 类型信息
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// 类型名称
    pub name: String,
    /// 类型ID
    pub id: TypeId,
    /// 模块路径
    pub module_path: String,
}

impl TypeInfo {
    /// 创建新的类型信息
    pub fn new(type_id: TypeId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            module_path: name.clone(),
            name,
            id: type_id,
        }
    }

    /// 从类型获取类型信息
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>()
                .split("::")
                .last()
                .unwrap_or("Unknown")
                .to_string(),
            id: TypeId::of::<T>(),
            module_path: std::any::type_name::<T>().to_string(),
        }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &str {
        self.name.split("::").last().unwrap_or(&self.name)
    }

    /// 判断是否是类型擦除的实例句柄类型
    ///
    /// 以该类型声明的注入点不参与按类型自动装配
    pub fn is_erased(&self) -> bool {
        self.id == TypeId::of::<BeanHandle>()
    }
}
