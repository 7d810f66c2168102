//! Bean 值模型
//!
//! 属性值和构造参数在定义中的声明形式

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 类型擦除的 Bean 实例句柄
///
/// 容器内部统一以该句柄持有和传递实例
pub type BeanHandle = Arc<dyn Any + Send + Sync>;

/// 属性值或构造参数的声明值
#[derive(Clone)]
pub enum BeanValue {
    /// 空值
    Null,
    /// 标量或结构化配置值，赋值前经过类型转换服务
    Value(serde_json::Value),
    /// 对另一个 Bean 的运行时引用，装配时解析
    Ref(String),
    /// 直接给定的实例
    Instance(BeanHandle),
}

impl BeanValue {
    /// 创建字符串值
    pub fn string(value: impl Into<String>) -> Self {
        Self::Value(serde_json::Value::String(value.into()))
    }

    /// 创建 Bean 引用值
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Ref(name.into())
    }

    /// 创建实例值
    pub fn instance<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self::Instance(value as BeanHandle)
    }

    /// 判断是否是引用值
    pub fn is_ref(&self) -> bool {
        matches!(self, Self::Ref(_))
    }
}

impl fmt::Debug for BeanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Ref(name) => f.debug_tuple("Ref").field(name).finish(),
            Self::Instance(_) => write!(f, "Instance(..)"),
        }
    }
}

impl From<serde_json::Value> for BeanValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}
