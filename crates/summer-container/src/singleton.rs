//! 单例注册表
//!
//! 三级缓存加创建防护使单例循环引用成为可能，并按依赖关系有序销毁。
//! 全部缓存变更和整个按名创建序列在一把可重入的注册表级锁内执行，
//! 同名创建过程不会被两个调用方观察到不同的中间状态。

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use parking_lot::ReentrantMutex;
use summer_common::{BeanHandle, BeansError, BeansResult, CreationError, DefinitionError};
use tracing::{debug, error, info};

/// 早期引用的一次性记忆化提供者
struct EarlyFactory {
    cell: OnceCell<BeanHandle>,
    produce: Box<dyn Fn() -> BeansResult<BeanHandle> + Send + Sync>,
}

impl EarlyFactory {
    /// 触发提供者，结果只计算一次
    fn fire(&self) -> BeansResult<BeanHandle> {
        self.cell.get_or_try_init(|| (self.produce)()).cloned()
    }
}

/// 销毁回调登记
struct DisposableRegistration {
    name: String,
    callback: Box<dyn FnOnce() + Send>,
    registered_at: DateTime<Utc>,
}

#[derive(Default)]
struct SingletonState {
    /// 完全创建的单例 bean name -> bean instance
    singletons: HashMap<String, BeanHandle>,
    /// 早期单例引用 bean name -> bean instance
    early_singletons: HashMap<String, BeanHandle>,
    /// 早期引用提供者 bean name -> factory
    factories: HashMap<String, Arc<EarlyFactory>>,
    /// 已注册单例的名称，按注册顺序
    registered_order: Vec<String>,
    /// 正在创建中的单例名称
    in_creation: HashSet<String>,
    /// 创建检查的排除名单
    in_creation_exclusions: HashSet<String>,
    /// 当前创建批次收集的被抑制错误
    suppressed: Option<Vec<BeansError>>,
    /// 注册表是否处于销毁过程中
    in_destruction: bool,
    /// 销毁回调登记，按登记顺序
    disposables: Vec<DisposableRegistration>,
    /// 依赖图 bean name -> 依赖它的 bean 名称集合
    dependent_beans: HashMap<String, Vec<String>>,
    /// 依赖图 bean name -> 它依赖的 bean 名称集合
    dependencies_for: HashMap<String, Vec<String>>,
    /// 包含关系 外层 bean name -> 内部 bean 名称集合
    contained_beans: HashMap<String, Vec<String>>,
}

impl SingletonState {
    fn add_singleton(&mut self, name: &str, instance: BeanHandle) {
        self.singletons.insert(name.to_string(), instance);
        self.factories.remove(name);
        self.early_singletons.remove(name);
        if !self.registered_order.iter().any(|n| n == name) {
            self.registered_order.push(name.to_string());
        }
    }

    fn remove_singleton(&mut self, name: &str) {
        self.singletons.remove(name);
        self.factories.remove(name);
        self.early_singletons.remove(name);
        self.registered_order.retain(|n| n != name);
    }

    fn push_edge(map: &mut HashMap<String, Vec<String>>, key: &str, value: &str) {
        let entries = map.entry(key.to_string()).or_default();
        if !entries.iter().any(|existing| existing == value) {
            entries.push(value.to_string());
        }
    }
}

/// 单例注册表
///
/// 既管理单例缓存，也管理销毁回调与依赖图
pub struct SingletonRegistry {
    state: ReentrantMutex<RefCell<SingletonState>>,
}

impl Default for SingletonRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SingletonRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonRegistry")
            .field("singleton_count", &self.singleton_count())
            .finish()
    }
}

impl SingletonRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(SingletonState::default())),
        }
    }

    /// 注册外部构造的单例实例
    pub fn register_singleton(&self, name: &str, instance: BeanHandle) -> BeansResult<()> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if state.singletons.contains_key(name) {
            return Err(DefinitionError::invalid(name, "同名单例已存在, 不能重复注册").into());
        }
        state.add_singleton(name, instance);
        Ok(())
    }

    /// 获取单例实例
    ///
    /// `allow_early` 为真时允许触发早期引用提供者，
    /// 提供者只会被触发一次，结果被记忆化为早期引用
    pub fn get_singleton(&self, name: &str, allow_early: bool) -> BeansResult<Option<BeanHandle>> {
        let guard = self.state.lock();
        let factory = {
            let state = guard.borrow();
            if let Some(instance) = state.singletons.get(name) {
                return Ok(Some(instance.clone()));
            }
            if let Some(instance) = state.early_singletons.get(name) {
                return Ok(Some(instance.clone()));
            }
            if !allow_early {
                return Ok(None);
            }
            match state.factories.get(name) {
                Some(factory) => factory.clone(),
                None => return Ok(None),
            }
        };
        let early = factory.fire()?;
        let mut state = guard.borrow_mut();
        state
            .early_singletons
            .insert(name.to_string(), early.clone());
        state.factories.remove(name);
        Ok(Some(early))
    }

    /// 获取或创建单例
    ///
    /// 整个创建序列持有注册表锁，锁可重入以支持创建中递归解析其他单例
    pub fn get_or_create<F>(&self, name: &str, create: F) -> BeansResult<BeanHandle>
    where
        F: FnOnce() -> BeansResult<BeanHandle>,
    {
        let guard = self.state.lock();
        {
            let state = guard.borrow();
            if let Some(instance) = state.singletons.get(name) {
                return Ok(instance.clone());
            }
            if state.in_destruction {
                return Err(CreationError::CreationNotAllowed {
                    name: name.to_string(),
                }
                .into());
            }
        }
        self.before_singleton_creation(name)?;
        debug!("开始创建单例 Bean: '{}'", name);
        let record_suppressed = {
            let mut state = guard.borrow_mut();
            if state.suppressed.is_none() {
                state.suppressed = Some(Vec::new());
                true
            } else {
                false
            }
        };

        let result = create();

        self.after_singleton_creation(name);
        let related = if record_suppressed {
            guard.borrow_mut().suppressed.take().unwrap_or_default()
        } else {
            Vec::new()
        };
        match result {
            Ok(instance) => {
                guard.borrow_mut().add_singleton(name, instance.clone());
                Ok(instance)
            }
            Err(err) => {
                // 清除部分注册，让之后的重试从干净状态开始
                self.destroy_singleton(name);
                Err(Self::attach_related(name, err, related))
            }
        }
    }

    fn attach_related(name: &str, err: BeansError, related: Vec<BeansError>) -> BeansError {
        if related.is_empty() {
            return err;
        }
        match err {
            BeansError::Creation {
                source:
                    CreationError::CreationFailed {
                        name,
                        origin,
                        source,
                        related: mut existing,
                    },
            } => {
                existing.extend(related);
                CreationError::CreationFailed {
                    name,
                    origin,
                    source,
                    related: existing,
                }
                .into()
            }
            other => CreationError::CreationFailed {
                name: name.to_string(),
                origin: None,
                source: Box::new(other),
                related,
            }
            .into(),
        }
    }

    fn before_singleton_creation(&self, name: &str) -> BeansResult<()> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if !state.in_creation_exclusions.contains(name)
            && !state.in_creation.insert(name.to_string())
        {
            return Err(CreationError::CurrentlyInCreation {
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn after_singleton_creation(&self, name: &str) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if !state.in_creation_exclusions.contains(name) {
            state.in_creation.remove(name);
        }
    }

    /// 注册早期引用提供者
    ///
    /// 仅在对应名称尚未完全创建时生效
    pub fn add_singleton_factory<F>(&self, name: &str, produce: F)
    where
        F: Fn() -> BeansResult<BeanHandle> + Send + Sync + 'static,
    {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if state.singletons.contains_key(name) {
            return;
        }
        state.factories.insert(
            name.to_string(),
            Arc::new(EarlyFactory {
                cell: OnceCell::new(),
                produce: Box::new(produce),
            }),
        );
        state.early_singletons.remove(name);
        if !state.registered_order.iter().any(|n| n == name) {
            state.registered_order.push(name.to_string());
        }
    }

    /// 在当前创建批次中登记一个被抑制的错误
    pub fn on_suppressed(&self, err: BeansError) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if let Some(suppressed) = state.suppressed.as_mut() {
            suppressed.push(err);
        }
    }

    /// 从缓存中移除指定名称的单例条目
    pub fn remove_singleton(&self, name: &str) {
        let guard = self.state.lock();
        guard.borrow_mut().remove_singleton(name);
    }

    /// 判断是否包含完全创建的单例
    pub fn contains_singleton(&self, name: &str) -> bool {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.singletons.contains_key(name)
    }

    /// 按注册顺序返回单例名称
    pub fn singleton_names(&self) -> Vec<String> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.registered_order.clone()
    }

    /// 已注册单例数量
    pub fn singleton_count(&self) -> usize {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.registered_order.len()
    }

    /// 判断指定名称的单例是否正在创建中
    pub fn is_in_creation(&self, name: &str) -> bool {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.in_creation.contains(name)
    }

    /// 把名称加入或移出创建检查的排除名单
    pub fn set_currently_in_creation(&self, name: &str, in_creation: bool) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if in_creation {
            state.in_creation_exclusions.remove(name);
        } else {
            state.in_creation_exclusions.insert(name.to_string());
        }
    }

    /// 判断注册表是否处于销毁过程中
    pub fn is_in_destruction(&self) -> bool {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.in_destruction
    }

    /// 登记销毁回调
    ///
    /// 只有需要销毁的 Bean 才会被登记，销毁按登记的逆序进行
    pub fn register_disposable(&self, name: &str, callback: Box<dyn FnOnce() + Send>) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let registration = DisposableRegistration {
            name: name.to_string(),
            callback,
            registered_at: Utc::now(),
        };
        if let Some(existing) = state.disposables.iter_mut().find(|r| r.name == name) {
            *existing = registration;
        } else {
            state.disposables.push(registration);
        }
    }

    /// 指定名称的销毁回调登记时间
    pub fn disposable_registered_at(&self, name: &str) -> Option<DateTime<Utc>> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state
            .disposables
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.registered_at)
    }

    /// 记录一条依赖边: dependent 依赖 name
    pub fn register_dependent_bean(&self, name: &str, dependent: &str) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        SingletonState::push_edge(&mut state.dependent_beans, name, dependent);
        SingletonState::push_edge(&mut state.dependencies_for, dependent, name);
    }

    /// 记录包含关系: containing 在结构上包含 contained
    pub fn register_contained_bean(&self, contained: &str, containing: &str) {
        {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            SingletonState::push_edge(&mut state.contained_beans, containing, contained);
        }
        self.register_dependent_bean(contained, containing);
    }

    /// 判断指定名称是否被其他 Bean 依赖
    pub fn has_dependent(&self, name: &str) -> bool {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.dependent_beans.contains_key(name)
    }

    /// 依赖 name 的 Bean 名称列表
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.dependent_beans.get(name).cloned().unwrap_or_default()
    }

    /// name 依赖的 Bean 名称列表
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.dependencies_for.get(name).cloned().unwrap_or_default()
    }

    /// 判断 dependent 是否直接或间接依赖 name
    pub fn is_dependent(&self, name: &str, dependent: &str) -> bool {
        let guard = self.state.lock();
        let state = guard.borrow();
        let mut seen = HashSet::new();
        Self::is_dependent_inner(&state, name, dependent, &mut seen)
    }

    fn is_dependent_inner(
        state: &SingletonState,
        name: &str,
        dependent: &str,
        seen: &mut HashSet<String>,
    ) -> bool {
        if !seen.insert(name.to_string()) {
            return false;
        }
        let Some(dependents) = state.dependent_beans.get(name) else {
            return false;
        };
        if dependents.iter().any(|d| d == dependent) {
            return true;
        }
        dependents
            .iter()
            .any(|transitive| Self::is_dependent_inner(state, transitive, dependent, seen))
    }

    /// 销毁指定名称的单例
    ///
    /// 先递归销毁依赖它的 Bean，再执行自身的销毁回调，
    /// 然后销毁其结构上包含的 Bean，最后清理依赖图中的残留
    pub fn destroy_singleton(&self, name: &str) {
        let guard = self.state.lock();
        let disposable = {
            let mut state = guard.borrow_mut();
            state.remove_singleton(name);
            let position = state.disposables.iter().position(|r| r.name == name);
            position.map(|index| state.disposables.remove(index))
        };
        self.destroy_bean(name, disposable);
        drop(guard);
    }

    fn destroy_bean(&self, name: &str, disposable: Option<DisposableRegistration>) {
        let guard = self.state.lock();
        let dependents = {
            let mut state = guard.borrow_mut();
            state.dependent_beans.remove(name).unwrap_or_default()
        };
        if !dependents.is_empty() {
            debug!("销毁 Bean '{}' 前先销毁依赖它的 Bean: {:?}", name, dependents);
            for dependent in dependents {
                self.destroy_singleton(&dependent);
            }
        }

        if let Some(registration) = disposable {
            (registration.callback)();
        }

        let contained = {
            let mut state = guard.borrow_mut();
            state.contained_beans.remove(name).unwrap_or_default()
        };
        for contained_name in contained {
            self.destroy_singleton(&contained_name);
        }

        let mut state = guard.borrow_mut();
        state.dependent_beans.retain(|_, dependents| {
            dependents.retain(|d| d != name);
            !dependents.is_empty()
        });
        state.dependencies_for.remove(name);
    }

    /// 销毁全部单例
    ///
    /// 销毁期间新的单例创建请求直接失败，销毁按登记逆序进行
    pub fn destroy_all(&self) {
        info!("开始销毁注册表中的全部单例");
        let disposable_names: Vec<String> = {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            state.in_destruction = true;
            state.disposables.iter().map(|r| r.name.clone()).collect()
        };
        for name in disposable_names.iter().rev() {
            self.destroy_singleton(name);
        }

        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.contained_beans.clear();
        state.dependent_beans.clear();
        state.dependencies_for.clear();
        state.singletons.clear();
        state.factories.clear();
        state.early_singletons.clear();
        state.registered_order.clear();
        state.disposables.clear();
        state.in_destruction = false;
    }
}

/// 记录销毁回调执行中的失败，失败只记录日志不向外传播
pub fn log_destroy_failure(name: &str, err: &dyn std::fmt::Display) {
    error!("Bean '{}' 的销毁回调执行失败: {}", name, err);
}
