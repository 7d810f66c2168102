//! 错误类型定义

use thiserror::Error;

/// 定义阶段错误类型
///
/// 配置性错误，发现即致命
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("未找到 Bean 定义: {name}")]
    NotFound { name: String },

    #[error("抽象 Bean 不能被直接获取: {name}")]
    BeanIsAbstract { name: String },

    #[error("检测到循环的父定义链: {name}, 链路: {chain}")]
    CyclicParentChain { name: String, chain: String },

    #[error("无法解析父定义: {name}, 父定义: {parent}, 原因: {message}")]
    ParentNotFound {
        name: String,
        parent: String,
        message: String,
    },

    #[error("类型未注册: {type_name}")]
    TypeNotRegistered { type_name: String },

    #[error("检测到循环别名: {name} -> {alias}")]
    AliasCycle { name: String, alias: String },

    #[error("Bean 定义无效: {name}, 原因: {message}")]
    InvalidDefinition { name: String, message: String },
}

impl DefinitionError {
    /// 创建未找到定义错误
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// 创建定义无效错误
    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// 依赖解析错误类型
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("未找到可注入的候选 Bean: 目标类型 {type_name}")]
    NoCandidates { type_name: String },

    #[error("候选 Bean 不唯一: 目标类型 {type_name}, 候选: [{candidates}]")]
    Ambiguous {
        type_name: String,
        candidates: String,
    },

    #[error("类型不匹配: {name}, 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("类型转换失败: 目标类型 {target_type}, 原因: {message}")]
    ConversionFailed {
        target_type: String,
        message: String,
    },
}

impl ResolutionError {
    /// 创建类型转换失败错误
    pub fn conversion_failed(target_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConversionFailed {
            target_type: target_type.into(),
            message: message.into(),
        }
    }
}

/// 作用域错误类型
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("作用域未注册: {scope}")]
    NotRegistered { scope: String },

    #[error("作用域当前不可用: {scope}, 原因: {message}")]
    NotActive { scope: String, message: String },
}

/// Bean 创建错误类型
#[derive(Error, Debug)]
pub enum CreationError {
    #[error("Bean 创建失败: {name}, 原因: {source}")]
    CreationFailed {
        name: String,
        origin: Option<String>,
        #[source]
        source: Box<BeansError>,
        /// 同批次创建中被抑制的兄弟错误
        related: Vec<BeansError>,
    },

    #[error("Bean 正在创建中, 检测到循环创建: {name}")]
    CurrentlyInCreation { name: String },

    #[error("容器正在销毁单例, 不允许创建: {name}")]
    CreationNotAllowed { name: String },

    #[error("没有可用的构造方式: {name}, 原因: {message}")]
    NoUsableExecutable { name: String, message: String },

    #[error("实例化失败: {type_name}, 原因: {message}")]
    InstantiationFailed { type_name: String, message: String },

    #[error("依赖装配失败: {name}, 注入点: {property}, 原因: {source}")]
    UnsatisfiedDependency {
        name: String,
        property: String,
        #[source]
        source: Box<BeansError>,
    },

    #[error("依赖检查未通过: {name}, 属性 {property} 未被赋值")]
    DependencyCheckFailed { name: String, property: String },

    #[error("初始化回调失败: {name}, 方法: {method}, 原因: {source}")]
    InitMethodFailed {
        name: String,
        method: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("后置处理器执行失败: {name}, 阶段: {stage}, 原因: {source}")]
    PostProcessorFailed {
        name: String,
        stage: String,
        #[source]
        source: Box<BeansError>,
    },

    #[error(
        "Bean '{name}' 的早期引用已被注入到 [{dependents}], 但最终实例随后被包装, \
         这些依赖方持有的是未包装的原始实例"
    )]
    RawReferenceWrapped { name: String, dependents: String },
}

impl CreationError {
    /// 创建 Bean 创建失败错误
    pub fn creation_failed(
        name: impl Into<String>,
        origin: Option<String>,
        source: BeansError,
    ) -> Self {
        Self::CreationFailed {
            name: name.into(),
            origin,
            source: Box::new(source),
            related: Vec::new(),
        }
    }

    /// 创建依赖装配失败错误
    pub fn unsatisfied(
        name: impl Into<String>,
        property: impl Into<String>,
        source: BeansError,
    ) -> Self {
        Self::UnsatisfiedDependency {
            name: name.into(),
            property: property.into(),
            source: Box::new(source),
        }
    }

    /// 创建后置处理器失败错误
    pub fn post_processor_failed(
        name: impl Into<String>,
        stage: impl Into<String>,
        source: BeansError,
    ) -> Self {
        Self::PostProcessorFailed {
            name: name.into(),
            stage: stage.into(),
            source: Box::new(source),
        }
    }
}

/// 容器错误类型
#[derive(Error, Debug)]
pub enum BeansError {
    #[error("定义错误: {source}")]
    Definition {
        #[from]
        source: DefinitionError,
    },

    #[error("解析错误: {source}")]
    Resolution {
        #[from]
        source: ResolutionError,
    },

    #[error("作用域错误: {source}")]
    Scope {
        #[from]
        source: ScopeError,
    },

    #[error("创建错误: {source}")]
    Creation {
        #[from]
        source: CreationError,
    },

    #[error("{message}")]
    Other { message: String },
}

impl BeansError {
    /// 创建通用错误
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// 取出最内层的循环创建错误的 Bean 名称
    pub fn circular_bean_name(&self) -> Option<&str> {
        let Self::Creation { source } = self else {
            return None;
        };
        match source {
            CreationError::CurrentlyInCreation { name } => Some(name),
            CreationError::CreationFailed { source, .. }
            | CreationError::UnsatisfiedDependency { source, .. }
            | CreationError::PostProcessorFailed { source, .. } => source.circular_bean_name(),
            _ => None,
        }
    }
}

/// 结果类型别名
pub type DefinitionResult<T> = Result<T, DefinitionError>;
pub type ResolutionResult<T> = Result<T, ResolutionError>;
pub type CreationResult<T> = Result<T, CreationError>;
pub type BeansResult<T> = Result<T, BeansError>;
