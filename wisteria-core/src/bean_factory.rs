//! Bean Factory - 核心容器接口
//!
//! 定义存储、父子定义合并与实例生命周期都在这一层完成。

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::bean::{BeanDefinition, DynValue, FactoryBean, RootBeanDefinition};
use crate::class::{DefaultInstanceBuilder, InstanceBuilder};
use crate::config::Environment;
use crate::error::{ContainerError, ContainerResult};
use crate::lifecycle::BeanPostProcessor;
use crate::scope::Scope;

/// 解引用前缀：`&name` 返回 FactoryBean 本身而非其产物
pub const FACTORY_BEAN_PREFIX: char = '&';

/// BeanFactory - 最基础的容器接口
///
/// 提供基本的 Bean 访问功能
///
/// 注意：此 trait 不包含泛型方法，因此可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称获取 Bean
    ///
    /// 循环依赖检测只覆盖经由本工厂单例创建路径的重入；
    /// 原型参与的多跳环或绕过工厂的外部构造不在检测范围内。
    fn get_bean(&self, name: &str) -> ContainerResult<DynValue>;

    /// 通过名称获取 Bean，显式传入构造参数（仅原型作用域支持）
    fn get_bean_with_args(&self, name: &str, args: &[DynValue]) -> ContainerResult<DynValue>;

    /// 检查是否包含指定名称的 Bean（定义或外部注册的单例，含父工厂）
    fn contains_bean(&self, name: &str) -> bool;

    /// 该名称解析出的实例是否是共享单例
    ///
    /// 普通名称命中已缓存的 FactoryBean 时回答的是产物的单例性；
    /// 定义声明的 FactoryBean 在首次实例化之前只能按定义的作用域回答，
    /// 不会为了询问而提前构造工厂。
    fn is_singleton(&self, name: &str) -> ContainerResult<bool>;
}

/// BeanFactoryExt - BeanFactory 的扩展 trait
///
/// 提供泛型方法，不能作为 trait object 使用
pub trait BeanFactoryExt: BeanFactory {
    /// 通过类型获取 Bean
    fn get_bean_by_type<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>>;

    /// 检查是否包含指定类型的 Bean
    fn contains_bean_by_type<T: Any + Send + Sync>(&self) -> bool;
}

/// ListableBeanFactory - 可列举的 Bean 工厂
pub trait ListableBeanFactory: BeanFactory {
    /// 获取所有 Bean 定义的名称（按注册顺序）
    fn get_bean_definition_names(&self) -> Vec<String>;

    /// 获取指定类型的所有 Bean 名称
    fn get_bean_names_for_type(&self, type_id: TypeId) -> Vec<String>;

    /// 获取 Bean 定义的数量
    fn get_bean_definition_count(&self) -> usize;
}

/// ConfigurableBeanFactory - 可配置的 Bean 工厂
pub trait ConfigurableBeanFactory: BeanFactory {
    /// 注册 Bean 定义
    fn register_bean_definition(
        &self,
        name: String,
        definition: BeanDefinition,
    ) -> ContainerResult<()>;

    /// 检查本工厂（不含父工厂）是否包含指定的 Bean 定义
    fn contains_bean_definition(&self, name: &str) -> bool;

    /// 移除 Bean 定义
    fn remove_bean_definition(&self, name: &str) -> ContainerResult<()>;

    /// 获取单个 Bean 定义（原始形态，未合并）
    fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition>;

    /// 注册一个现成的单例实例，绕过定义与生命周期
    fn register_singleton(&self, name: String, instance: DynValue) -> ContainerResult<()>;

    /// 注册别名
    fn register_alias(&self, alias: String, bean_name: String) -> ContainerResult<()>;

    /// 添加 BeanPostProcessor
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    /// 获取所有 BeanPostProcessor
    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>>;
}

/// ConfigurableListableBeanFactory - 可配置且可列举的 Bean 工厂
pub trait ConfigurableListableBeanFactory: ListableBeanFactory + ConfigurableBeanFactory {
    /// 预实例化所有非懒加载的单例 Bean
    fn preinstantiate_singletons(&self) -> ContainerResult<()>;

    /// 冻结配置（不再允许修改 Bean 定义）
    fn freeze_configuration(&self);

    /// 检查配置是否已冻结
    fn is_configuration_frozen(&self) -> bool;

    /// 销毁所有单例 Bean（调用 destroy 回调）
    fn destroy_singletons(&self);
}

/// 单例缓存槽位
///
/// `InCreation` 是循环依赖哨兵：创建期间同名请求命中它即报错，
/// 创建失败时整个槽位被移除，容器保持可重试。
enum SingletonSlot {
    InCreation,
    Ready(DynValue),
}

/// DefaultListableBeanFactory - ConfigurableListableBeanFactory 的默认实现
///
/// 支持父子工厂层级：本地查不到的定义委托给父工厂解析。
pub struct DefaultListableBeanFactory {
    /// Bean 定义存储
    definitions: RwLock<HashMap<String, BeanDefinition>>,

    /// 定义名称（保持注册顺序）
    definition_names: RwLock<Vec<String>>,

    /// 别名 -> 规范名
    aliases: RwLock<HashMap<String, String>>,

    /// 单例缓存（含 in-creation 哨兵）
    singletons: Mutex<HashMap<String, SingletonSlot>>,

    /// 类型到名称的映射
    type_to_name: RwLock<HashMap<TypeId, String>>,

    /// Bean 后置处理器列表（按 order 稳定排序）
    bean_post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,

    /// 配置是否已冻结
    configuration_frozen: RwLock<bool>,

    /// 是否允许同名定义覆盖（默认不允许）
    allow_definition_overriding: RwLock<bool>,

    /// 父工厂
    parent: Option<Arc<DefaultListableBeanFactory>>,

    /// 配置环境（占位符解析）
    environment: Arc<Environment>,

    /// 实例构建器
    instance_builder: Box<dyn InstanceBuilder>,
}

impl DefaultListableBeanFactory {
    /// 创建新的 Bean 工厂
    pub fn new() -> Self {
        Self::with_environment(Arc::new(Environment::new()))
    }

    /// 创建使用指定环境的 Bean 工厂
    pub fn with_environment(environment: Arc<Environment>) -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
            definition_names: RwLock::new(Vec::new()),
            aliases: RwLock::new(HashMap::new()),
            singletons: Mutex::new(HashMap::new()),
            type_to_name: RwLock::new(HashMap::new()),
            bean_post_processors: RwLock::new(Vec::new()),
            configuration_frozen: RwLock::new(false),
            allow_definition_overriding: RwLock::new(false),
            parent: None,
            environment,
            instance_builder: Box::new(DefaultInstanceBuilder),
        }
    }

    /// 设置父工厂
    pub fn with_parent(mut self, parent: Arc<DefaultListableBeanFactory>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// 替换实例构建器
    pub fn with_instance_builder(mut self, builder: Box<dyn InstanceBuilder>) -> Self {
        self.instance_builder = builder;
        self
    }

    /// 父工厂
    pub fn parent(&self) -> Option<&Arc<DefaultListableBeanFactory>> {
        self.parent.as_ref()
    }

    /// 配置环境
    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// 是否允许同名定义覆盖（后注册者生效）
    pub fn set_allow_definition_overriding(&self, allow: bool) {
        *self.allow_definition_overriding.write() = allow;
    }

    /// 本地单例缓存中是否已有该名称（不含父工厂）
    pub fn contains_singleton(&self, name: &str) -> bool {
        let bean_name = self.transformed_bean_name(name);
        matches!(
            self.singletons.lock().get(&bean_name),
            Some(SingletonSlot::Ready(_))
        )
    }

    /// 请求的名称是否是 FactoryBean 解引用形式
    fn is_factory_dereference(name: &str) -> bool {
        name.starts_with(FACTORY_BEAN_PREFIX)
    }

    /// 规范化名称：剥掉全部 '&' 前缀，再做一次别名查找
    ///
    /// 只查一步：别名必须直接指向规范名，不支持别名指向别名，
    /// 这样任何别名图（包括环）都不会导致解析不终止。
    fn transformed_bean_name(&self, name: &str) -> String {
        let stripped = name.trim_start_matches(FACTORY_BEAN_PREFIX);
        match self.aliases.read().get(stripped) {
            Some(canonical) => canonical.clone(),
            None => stripped.to_string(),
        }
    }

    /// 获取合并后的 Bean 定义
    ///
    /// 子定义沿 parent 链向上合并；模板与子定义同名时，
    /// 同名的父定义只能来自父工厂。
    pub fn get_merged_bean_definition(&self, name: &str) -> ContainerResult<RootBeanDefinition> {
        let bean_name = self.transformed_bean_name(name);
        let definition = self
            .definitions
            .read()
            .get(&bean_name)
            .cloned()
            .ok_or_else(|| ContainerError::NoSuchBeanDefinition(bean_name.clone()))?;
        self.merge_definition(&bean_name, &definition)
    }

    fn merge_definition(
        &self,
        bean_name: &str,
        definition: &BeanDefinition,
    ) -> ContainerResult<RootBeanDefinition> {
        match &definition.parent {
            None => Ok(RootBeanDefinition::from_definition(definition)),
            Some(parent_name) => {
                let mut merged = if parent_name == bean_name {
                    // 同名父定义只能来自父工厂
                    let parent = self.parent.as_ref().ok_or_else(|| {
                        ContainerError::NoSuchBeanDefinition(parent_name.clone())
                    })?;
                    parent.get_merged_bean_definition(parent_name)?
                } else {
                    // 父定义本层找不到时沿工厂层级向上找
                    match self.get_merged_bean_definition(parent_name) {
                        Ok(merged) => merged,
                        Err(e @ ContainerError::NoSuchBeanDefinition(_)) => match &self.parent {
                            Some(parent) => parent.get_merged_bean_definition(parent_name)?,
                            None => return Err(e),
                        },
                        Err(e) => return Err(e),
                    }
                };
                merged.override_from(definition);
                Ok(merged)
            }
        }
    }

    /// getBean 的主流程
    fn do_get_bean(&self, name: &str, args: Option<&[DynValue]>) -> ContainerResult<DynValue> {
        let bean_name = self.transformed_bean_name(name);
        tracing::trace!("Requesting bean '{}'", bean_name);

        // 快路径：已有的单例（含外部注册的实例）
        {
            let singletons = self.singletons.lock();
            match singletons.get(&bean_name) {
                Some(SingletonSlot::Ready(bean)) => {
                    tracing::debug!("Returning cached instance of singleton bean '{}'", bean_name);
                    let bean = Arc::clone(bean);
                    drop(singletons);
                    return self.object_for_shared_instance(name, &bean_name, bean);
                }
                Some(SingletonSlot::InCreation) => {
                    return Err(ContainerError::CurrentlyInCreation(bean_name));
                }
                None => {}
            }
        }

        // 本工厂没有定义时带原始名称（含 '&' 前缀）委托父工厂
        let merged = match self.get_merged_bean_definition(&bean_name) {
            Ok(merged) => merged,
            Err(e @ ContainerError::NoSuchBeanDefinition(_)) => match &self.parent {
                Some(parent) => {
                    tracing::trace!("Delegating bean '{}' to parent factory", bean_name);
                    return match args {
                        Some(args) => parent.get_bean_with_args(name, args),
                        None => parent.get_bean(name),
                    };
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        };

        if merged.abstract_bean {
            return Err(ContainerError::BeanIsAbstract(bean_name));
        }

        if args.is_some() {
            if merged.scope == Scope::Singleton {
                return Err(ContainerError::InvalidArguments {
                    name: bean_name,
                    reason: "explicit constructor arguments are only supported for prototype beans"
                        .to_string(),
                });
            }
            if merged.factory_method.is_none() {
                return Err(ContainerError::InvalidArguments {
                    name: bean_name,
                    reason: "explicit constructor arguments require a factory method".to_string(),
                });
            }
        }

        match merged.scope {
            Scope::Singleton => {
                // 占位哨兵后立即放锁：属性解析会递归进入 get_bean
                {
                    let mut singletons = self.singletons.lock();
                    match singletons.get(&bean_name) {
                        Some(SingletonSlot::Ready(bean)) => {
                            let bean = Arc::clone(bean);
                            drop(singletons);
                            return self.object_for_shared_instance(name, &bean_name, bean);
                        }
                        Some(SingletonSlot::InCreation) => {
                            return Err(ContainerError::CurrentlyInCreation(bean_name));
                        }
                        None => {
                            singletons
                                .insert(bean_name.clone(), SingletonSlot::InCreation);
                        }
                    }
                }

                tracing::info!("Creating shared instance of singleton bean '{}'", bean_name);
                match self.create_bean(&bean_name, &merged, args) {
                    Ok(bean) => {
                        self.singletons
                            .lock()
                            .insert(bean_name.clone(), SingletonSlot::Ready(Arc::clone(&bean)));
                        self.object_for_shared_instance(name, &bean_name, bean)
                    }
                    Err(e) => {
                        // 回滚哨兵，失败的创建不在缓存中留痕
                        self.singletons.lock().remove(&bean_name);
                        tracing::debug!("Creation of singleton bean '{}' failed: {}", bean_name, e);
                        Err(e)
                    }
                }
            }
            Scope::Prototype => {
                tracing::debug!("Creating new instance of prototype bean '{}'", bean_name);
                let bean = self.create_bean(&bean_name, &merged, args)?;
                self.object_for_shared_instance(name, &bean_name, bean)
            }
        }
    }

    /// 创建 Bean 实例并调用生命周期回调
    ///
    /// 顺序：实例化（构造/工厂方法 + 属性填充）
    /// → postProcessBeforeInitialization → init 回调
    /// → postProcessAfterInitialization
    fn create_bean(
        &self,
        name: &str,
        definition: &RootBeanDefinition,
        args: Option<&[DynValue]>,
    ) -> ContainerResult<DynValue> {
        let mut bean =
            self.instance_builder
                .build(name, definition, self, &self.environment, args)?;

        bean = self.apply_bean_post_processors_before_initialization(bean, name)?;

        if let Some(ref init_fn) = definition.init_callback {
            init_fn(&mut *bean).map_err(|e| {
                ContainerError::BeanCreationFailed(format!("{} init failed: {}", name, e))
            })?;
        }

        bean = self.apply_bean_post_processors_after_initialization(bean, name)?;

        Ok(Arc::from(bean))
    }

    /// 应用 postProcessBeforeInitialization
    fn apply_bean_post_processors_before_initialization(
        &self,
        bean: Box<dyn Any + Send + Sync>,
        bean_name: &str,
    ) -> ContainerResult<Box<dyn Any + Send + Sync>> {
        let processors = self.bean_post_processors.read();
        let mut current_bean = bean;

        for processor in processors.iter() {
            current_bean = processor.post_process_before_initialization(current_bean, bean_name)?;
        }

        Ok(current_bean)
    }

    /// 应用 postProcessAfterInitialization
    fn apply_bean_post_processors_after_initialization(
        &self,
        bean: Box<dyn Any + Send + Sync>,
        bean_name: &str,
    ) -> ContainerResult<Box<dyn Any + Send + Sync>> {
        let processors = self.bean_post_processors.read();
        let mut current_bean = bean;

        for processor in processors.iter() {
            current_bean = processor.post_process_after_initialization(current_bean, bean_name)?;
        }

        Ok(current_bean)
    }

    /// 处理 FactoryBean 解引用
    ///
    /// `&name` 要求实例必须是 FactoryBean 并返回工厂本身；
    /// 普通名称命中 FactoryBean 时返回 `get_object` 的产物。
    fn object_for_shared_instance(
        &self,
        requested_name: &str,
        bean_name: &str,
        bean: DynValue,
    ) -> ContainerResult<DynValue> {
        if Self::is_factory_dereference(requested_name) {
            if bean.downcast_ref::<Arc<dyn FactoryBean>>().is_none() {
                return Err(ContainerError::BeanIsNotAFactory(bean_name.to_string()));
            }
            return Ok(bean);
        }

        if let Some(factory) = bean.downcast_ref::<Arc<dyn FactoryBean>>() {
            tracing::debug!("Bean '{}' is a factory bean, returning its object", bean_name);
            let object = factory.get_object()?.ok_or_else(|| {
                ContainerError::FactoryBeanCircularReference(bean_name.to_string())
            })?;
            return Ok(object);
        }

        Ok(bean)
    }
}

impl Default for DefaultListableBeanFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanFactory for DefaultListableBeanFactory {
    fn get_bean(&self, name: &str) -> ContainerResult<DynValue> {
        self.do_get_bean(name, None)
    }

    fn get_bean_with_args(&self, name: &str, args: &[DynValue]) -> ContainerResult<DynValue> {
        self.do_get_bean(name, Some(args))
    }

    fn contains_bean(&self, name: &str) -> bool {
        let bean_name = self.transformed_bean_name(name);
        if self.definitions.read().contains_key(&bean_name) || self.contains_singleton(&bean_name)
        {
            return true;
        }
        match &self.parent {
            Some(parent) => parent.contains_bean(&bean_name),
            None => false,
        }
    }

    fn is_singleton(&self, name: &str) -> ContainerResult<bool> {
        let bean_name = self.transformed_bean_name(name);

        {
            let singletons = self.singletons.lock();
            if let Some(SingletonSlot::Ready(bean)) = singletons.get(&bean_name) {
                if !Self::is_factory_dereference(name) {
                    if let Some(factory) = bean.downcast_ref::<Arc<dyn FactoryBean>>() {
                        return Ok(factory.is_singleton());
                    }
                }
                return Ok(true);
            }
        }

        match self.get_merged_bean_definition(&bean_name) {
            Ok(merged) => Ok(merged.scope == Scope::Singleton),
            Err(e @ ContainerError::NoSuchBeanDefinition(_)) => match &self.parent {
                Some(parent) => parent.is_singleton(name),
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}

impl BeanFactoryExt for DefaultListableBeanFactory {
    fn get_bean_by_type<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        let type_id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();

        let name = {
            let type_to_name = self.type_to_name.read();
            type_to_name.get(&type_id).cloned()
        };

        let name = match name {
            Some(name) => name,
            None => {
                return Err(ContainerError::NoSuchBeanDefinition(format!(
                    "no bean of type '{}'",
                    type_name
                )))
            }
        };

        let bean = self.get_bean(&name)?;
        crate::bean::arc_of::<T>(&bean)
    }

    fn contains_bean_by_type<T: Any + Send + Sync>(&self) -> bool {
        self.type_to_name.read().contains_key(&TypeId::of::<T>())
    }
}

impl ListableBeanFactory for DefaultListableBeanFactory {
    fn get_bean_definition_names(&self) -> Vec<String> {
        self.definition_names.read().clone()
    }

    fn get_bean_names_for_type(&self, type_id: TypeId) -> Vec<String> {
        let definitions = self.definitions.read();
        self.definition_names
            .read()
            .iter()
            .filter(|name| {
                definitions
                    .get(name.as_str())
                    .and_then(|def| def.class.as_ref())
                    .map(|class| class.produced_type_id() == type_id)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    fn get_bean_definition_count(&self) -> usize {
        self.definitions.read().len()
    }
}

impl ConfigurableBeanFactory for DefaultListableBeanFactory {
    fn register_bean_definition(
        &self,
        name: String,
        definition: BeanDefinition,
    ) -> ContainerResult<()> {
        if *self.configuration_frozen.read() {
            return Err(ContainerError::Other(anyhow::anyhow!(
                "cannot register bean definition '{}': configuration is frozen",
                name
            )));
        }

        tracing::trace!(
            "Attempting to register bean definition: name='{}', scope={:?}",
            name,
            definition.scope
        );

        // 查重、写入与名单登记在同一临界区内完成，
        // 并发注册同名定义时只有一方成功
        let replaced = {
            let mut definitions = self.definitions.write();
            let replaced = if definitions.contains_key(&name) {
                if !*self.allow_definition_overriding.read() {
                    tracing::warn!("Bean definition '{}' already exists, registration failed", name);
                    return Err(ContainerError::BeanAlreadyExists(name));
                }
                tracing::debug!("Overriding bean definition '{}'", name);
                true
            } else {
                false
            };

            if let Some(class) = &definition.class {
                self.type_to_name
                    .write()
                    .insert(class.produced_type_id(), name.clone());
            }
            definitions.insert(name.clone(), definition);
            if !replaced {
                self.definition_names.write().push(name.clone());
            }
            replaced
        };

        if replaced {
            // 覆盖定义后不留旧实例
            self.singletons.lock().remove(&name);
        }

        tracing::debug!("Bean definition registered: '{}'", name);
        Ok(())
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        let bean_name = self.transformed_bean_name(name);
        self.definitions.read().contains_key(&bean_name)
    }

    fn remove_bean_definition(&self, name: &str) -> ContainerResult<()> {
        if *self.configuration_frozen.read() {
            return Err(ContainerError::Other(anyhow::anyhow!(
                "cannot remove bean definition '{}': configuration is frozen",
                name
            )));
        }

        self.definitions
            .write()
            .remove(name)
            .ok_or_else(|| ContainerError::NoSuchBeanDefinition(name.to_string()))?;
        self.definition_names.write().retain(|n| n != name);

        tracing::debug!("Bean definition removed: '{}'", name);
        Ok(())
    }

    fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition> {
        self.definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::NoSuchBeanDefinition(name.to_string()))
    }

    fn register_singleton(&self, name: String, instance: DynValue) -> ContainerResult<()> {
        let mut singletons = self.singletons.lock();
        if singletons.contains_key(&name) || self.definitions.read().contains_key(&name) {
            return Err(ContainerError::BeanAlreadyExists(name));
        }
        singletons.insert(name.clone(), SingletonSlot::Ready(instance));
        tracing::debug!("Registered external singleton '{}'", name);
        Ok(())
    }

    fn register_alias(&self, alias: String, bean_name: String) -> ContainerResult<()> {
        if alias == bean_name {
            return Ok(());
        }
        let mut aliases = self.aliases.write();
        if aliases.contains_key(&alias) || self.definitions.read().contains_key(&alias) {
            return Err(ContainerError::BeanAlreadyExists(alias));
        }
        tracing::debug!("Registered alias '{}' for bean '{}'", alias, bean_name);
        aliases.insert(alias, bean_name);
        Ok(())
    }

    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        let mut processors = self.bean_post_processors.write();
        tracing::debug!("Adding bean post processor '{}'", processor.name());
        processors.push(processor);

        // 稳定排序：同 order 保持注册顺序
        processors.sort_by_key(|p| p.order());
    }

    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.bean_post_processors.read().clone()
    }
}

impl ConfigurableListableBeanFactory for DefaultListableBeanFactory {
    fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        let bean_names = self.get_bean_definition_names();

        tracing::debug!("Pre-instantiating singletons in {} definitions", bean_names.len());

        for name in bean_names {
            let merged = self.get_merged_bean_definition(&name)?;
            if merged.abstract_bean || merged.scope != Scope::Singleton || merged.lazy {
                continue;
            }
            self.get_bean(&name)?;
        }

        Ok(())
    }

    fn freeze_configuration(&self) {
        *self.configuration_frozen.write() = true;
        tracing::debug!("Bean factory configuration frozen");
    }

    fn is_configuration_frozen(&self) -> bool {
        *self.configuration_frozen.read()
    }

    fn destroy_singletons(&self) {
        tracing::info!("Destroying singleton beans");

        let mut beans: Vec<(String, DynValue)> = self
            .singletons
            .lock()
            .drain()
            .filter_map(|(name, slot)| match slot {
                SingletonSlot::Ready(bean) => Some((name, bean)),
                SingletonSlot::InCreation => None,
            })
            .collect();
        beans.sort_by(|(a, _), (b, _)| a.cmp(b));

        // 单个回调失败只记录，不中断其余 Bean 的销毁
        for (name, mut bean) in beans {
            let destroy_fn = self
                .get_merged_bean_definition(&name)
                .ok()
                .and_then(|merged| merged.destroy_callback.clone());

            if let Some(destroy_fn) = destroy_fn {
                match Arc::get_mut(&mut bean) {
                    Some(bean_mut) => {
                        if let Err(e) = destroy_fn(bean_mut) {
                            tracing::warn!("Failed to destroy bean '{}': {}", name, e);
                        } else {
                            tracing::debug!("Bean '{}' destroyed", name);
                        }
                    }
                    None => {
                        tracing::warn!(
                            "Cannot destroy bean '{}': still has active references",
                            name
                        );
                    }
                }
            }
        }

        tracing::info!("Singleton beans destruction completed");
    }
}
