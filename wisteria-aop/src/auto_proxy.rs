//! 自动代理 - 容器与织入层的桥
//!
//! [`AutoProxyCreator`] 是一个 BeanPostProcessor：Bean 初始化后
//! 询问解析策略该不该代理、用哪些通知，命中就用 ProxyFactory
//! 原地换成代理，容器缓存与后续注入拿到的都是代理。

use std::any::Any;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use wisteria_core::bean_factory::{BeanFactory, DefaultListableBeanFactory};
use wisteria_core::error::{ContainerError, ContainerResult};
use wisteria_core::lifecycle::BeanPostProcessor;
use wisteria_core::DynValue;

use crate::advice::{MethodBeforeAdvice, MethodInterceptor};
use crate::advisor::{AdviceEntry, Advisor};
use crate::error::AopResult;
use crate::invocation::DynamicDispatch;
use crate::pointcut::Pointcut;
use crate::proxy::{ProxyConfig, ProxyFactory};
use crate::target_source::TargetSource;

/// 策略对某个 Bean 的裁决
#[derive(Clone)]
pub enum AdvisorSelection {
    /// 不代理
    DoNotProxy,

    /// 代理，但只用公共通知
    CommonOnly,

    /// 代理，公共通知之外再加这些专属通知
    Specific(Vec<AdviceEntry>),
}

impl std::fmt::Debug for AdvisorSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdvisorSelection::DoNotProxy => write!(f, "DoNotProxy"),
            AdvisorSelection::CommonOnly => write!(f, "CommonOnly"),
            AdvisorSelection::Specific(entries) => write!(f, "Specific({})", entries.len()),
        }
    }
}

/// 顾问解析策略 - 决定哪些 Bean 被代理、附加哪些通知
pub trait AdvisorResolutionStrategy: Send + Sync {
    /// 该 Bean 的代理裁决
    fn advisors_for(&self, bean_name: &str, target_type: &str) -> AdvisorSelection;

    /// 是否直接跳过该 Bean（连裁决都不做）
    fn should_skip(&self, _bean_name: &str, _target_type: &str) -> bool {
        false
    }

    /// 在产出代理前对装配器做最后调整
    fn customize_proxy_factory(&self, _factory: &mut ProxyFactory) -> AopResult<()> {
        Ok(())
    }
}

/// 目标来源定制 - 为特定 Bean 换用非默认的 TargetSource
///
/// 返回 `Some` 即接管该 Bean 的目标管理，并强制为其创建代理。
pub trait TargetSourceCreator: Send + Sync {
    fn target_source_for(
        &self,
        bean_name: &str,
        target: &Arc<dyn DynamicDispatch>,
    ) -> Option<Arc<dyn TargetSource>>;
}

/// 按 Bean 名称匹配的解析策略
///
/// 名称命中任一通配符模式的 Bean 用公共通知代理，其余不代理。
pub struct NameMatchAdvisorStrategy {
    patterns: Vec<String>,
}

impl NameMatchAdvisorStrategy {
    pub fn new(patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    fn name_matches(&self, bean_name: &str) -> bool {
        self.patterns.iter().any(|pattern| {
            Pointcut::execution(pattern, "*").class_filter.matches(bean_name)
        })
    }
}

impl AdvisorResolutionStrategy for NameMatchAdvisorStrategy {
    fn advisors_for(&self, bean_name: &str, _target_type: &str) -> AdvisorSelection {
        if self.name_matches(bean_name) {
            AdvisorSelection::CommonOnly
        } else {
            AdvisorSelection::DoNotProxy
        }
    }
}

/// 自动代理创建器
pub struct AutoProxyCreator {
    /// 解析策略
    strategy: Arc<dyn AdvisorResolutionStrategy>,

    /// 公共通知（对所有被代理的 Bean 生效）
    common_entries: Vec<AdviceEntry>,

    /// 公共通知的 Bean 名称，调用时从所属工厂解析
    common_interceptor_names: Vec<String>,

    /// 公共通知排在专属通知之前
    apply_common_first: bool,

    /// 目标来源定制链
    target_source_creators: Vec<Arc<dyn TargetSourceCreator>>,

    /// 每个代理的基础行为开关
    proxy_config: ProxyConfig,

    /// 所属工厂（解析公共通知名称用）
    owning_factory: RwLock<Weak<DefaultListableBeanFactory>>,
}

impl AutoProxyCreator {
    pub fn new(strategy: Arc<dyn AdvisorResolutionStrategy>) -> Self {
        Self {
            strategy,
            common_entries: Vec::new(),
            common_interceptor_names: Vec::new(),
            apply_common_first: true,
            target_source_creators: Vec::new(),
            proxy_config: ProxyConfig::default(),
            owning_factory: RwLock::new(Weak::new()),
        }
    }

    /// 追加公共通知
    pub fn with_common_entry(mut self, entry: AdviceEntry) -> Self {
        self.common_entries.push(entry);
        self
    }

    /// 设置公共通知的 Bean 名称
    pub fn with_common_interceptor_names(
        mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.common_interceptor_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// 专属通知排在公共通知之前
    pub fn with_specific_first(mut self) -> Self {
        self.apply_common_first = false;
        self
    }

    /// 追加目标来源定制
    pub fn with_target_source_creator(mut self, creator: Arc<dyn TargetSourceCreator>) -> Self {
        self.target_source_creators.push(creator);
        self
    }

    /// 设置每个代理的基础行为开关
    pub fn with_proxy_config(mut self, config: ProxyConfig) -> Self {
        self.proxy_config = config;
        self
    }

    /// 绑定所属工厂，公共通知名称经由它解析
    pub fn set_bean_factory(&self, factory: &Arc<DefaultListableBeanFactory>) {
        *self.owning_factory.write() = Arc::downgrade(factory);
    }

    /// 织入基础设施 Bean 本身不参与代理
    fn is_infrastructure(bean: &(dyn Any + Send + Sync)) -> bool {
        bean.downcast_ref::<Advisor>().is_some()
            || bean.downcast_ref::<Arc<dyn MethodInterceptor>>().is_some()
            || bean.downcast_ref::<Arc<dyn MethodBeforeAdvice>>().is_some()
            || bean.downcast_ref::<Arc<AutoProxyCreator>>().is_some()
    }

    /// 把容器里的通知 Bean 还原成织入条目
    fn entry_from_bean(value: &DynValue) -> Option<AdviceEntry> {
        if let Some(advisor) = value.downcast_ref::<Advisor>() {
            return Some(AdviceEntry::Advisor(Arc::new(advisor.clone())));
        }
        if let Some(interceptor) = value.downcast_ref::<Arc<dyn MethodInterceptor>>() {
            return Some(AdviceEntry::Interceptor(Arc::clone(interceptor)));
        }
        if let Some(advice) = value.downcast_ref::<Arc<dyn MethodBeforeAdvice>>() {
            return Some(AdviceEntry::BeforeAdvice(Arc::clone(advice)));
        }
        None
    }

    /// 解析公共通知：直接持有的条目加上按名称从工厂取的
    fn resolve_common_entries(&self) -> ContainerResult<Vec<AdviceEntry>> {
        let mut entries = self.common_entries.clone();

        if !self.common_interceptor_names.is_empty() {
            let factory = self.owning_factory.read().upgrade().ok_or_else(|| {
                ContainerError::BeanCreationFailed(
                    "auto proxy creator has common interceptor names but no owning factory"
                        .to_string(),
                )
            })?;

            for name in &self.common_interceptor_names {
                let value = factory.get_bean(name)?;
                let entry = Self::entry_from_bean(&value).ok_or_else(|| {
                    ContainerError::BeanCreationFailed(format!(
                        "common interceptor '{}' is not an advisor or advice",
                        name
                    ))
                })?;
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    /// 为该 Bean 问询定制目标来源
    ///
    /// 单例的目标由容器缓存，换目标来源没有意义；只有注册在所属
    /// 工厂里且非单例的 Bean 才会走到定制链。未绑定工厂时一律不问。
    fn custom_target_source(
        &self,
        bean_name: &str,
        target: &Arc<dyn DynamicDispatch>,
    ) -> Option<Arc<dyn TargetSource>> {
        if self.target_source_creators.is_empty() {
            return None;
        }
        let factory = self.owning_factory.read().upgrade()?;
        if !factory.contains_bean(bean_name) || factory.is_singleton(bean_name).unwrap_or(true) {
            return None;
        }
        self.target_source_creators
            .iter()
            .find_map(|creator| creator.target_source_for(bean_name, target))
    }

    /// `specific` 为 `None` 表示仅为接管目标来源而代理，不织入任何通知
    fn create_proxy(
        &self,
        bean_name: &str,
        target: Arc<dyn DynamicDispatch>,
        specific: Option<Vec<AdviceEntry>>,
        custom_source: Option<Arc<dyn TargetSource>>,
    ) -> ContainerResult<Arc<dyn DynamicDispatch>> {
        let adapter = crate::adapter::AdvisorAdapterRegistry::new();

        let entries = match specific {
            None => Vec::new(),
            Some(specific) => {
                let common = self.resolve_common_entries()?;
                let mut entries = Vec::with_capacity(common.len() + specific.len());
                if self.apply_common_first {
                    entries.extend(common);
                    entries.extend(specific);
                } else {
                    entries.extend(specific);
                    entries.extend(common);
                }
                entries
            }
        };

        let advisors: Vec<Advisor> = entries.into_iter().map(|e| adapter.wrap(e)).collect();

        let interfaces = target.interfaces();
        let mut factory = match custom_source {
            Some(source) => ProxyFactory::with_target_source(source, interfaces),
            None => ProxyFactory::new(target),
        };

        (|| -> AopResult<Arc<dyn DynamicDispatch>> {
            factory.set_config(self.proxy_config)?;
            factory.add_advisors(advisors)?;
            self.strategy.customize_proxy_factory(&mut factory)?;
            let proxy = factory.get_proxy()?;
            Ok(proxy as Arc<dyn DynamicDispatch>)
        })()
        .map_err(|e| {
            ContainerError::BeanCreationFailed(format!(
                "failed to weave proxy for bean '{}': {}",
                bean_name, e
            ))
        })
    }
}

impl BeanPostProcessor for AutoProxyCreator {
    fn name(&self) -> &str {
        "AutoProxyCreator"
    }

    fn order(&self) -> i32 {
        // 尽量靠后，让常规处理器先完成对 Bean 的加工
        i32::MAX - 100
    }

    fn post_process_after_initialization(
        &self,
        bean: Box<dyn Any + Send + Sync>,
        bean_name: &str,
    ) -> ContainerResult<Box<dyn Any + Send + Sync>> {
        if Self::is_infrastructure(bean.as_ref()) {
            tracing::trace!("Bean '{}' is weaving infrastructure, skipping", bean_name);
            return Ok(bean);
        }

        // 只有以动态派发形态注册的 Bean 才能被代理
        let target = match bean.downcast_ref::<Arc<dyn DynamicDispatch>>() {
            Some(target) => Arc::clone(target),
            None => return Ok(bean),
        };

        let target_type = target.target_type().to_string();
        if self.strategy.should_skip(bean_name, &target_type) {
            tracing::trace!("Bean '{}' skipped by resolution strategy", bean_name);
            return Ok(bean);
        }

        let custom_source = self.custom_target_source(bean_name, &target);

        let specific = match self.strategy.advisors_for(bean_name, &target_type) {
            AdvisorSelection::DoNotProxy => {
                // 定制目标来源本身就是代理的理由，但此时不织入任何通知
                if custom_source.is_none() {
                    tracing::trace!("Bean '{}' not selected for proxying", bean_name);
                    return Ok(bean);
                }
                None
            }
            AdvisorSelection::CommonOnly => Some(Vec::new()),
            AdvisorSelection::Specific(entries) => Some(entries),
        };

        tracing::info!("Weaving proxy for bean '{}' (type '{}')", bean_name, target_type);
        let proxy = self.create_proxy(bean_name, target, specific, custom_source)?;
        Ok(Box::new(proxy))
    }
}
