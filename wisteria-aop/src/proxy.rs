//! 代理装配与调用
//!
//! [`ProxyFactory`] 收集目标、接口与顾问并产出 [`AopProxy`]；
//! 代理对外仍是 [`DynamicDispatch`]，每次调用时借取目标、
//! 组装拦截链并驱动执行。

use std::sync::{Arc, Weak};

use crate::adapter::AdvisorAdapterRegistry;
use crate::advisor::Advisor;
use crate::error::{AopError, AopResult};
use crate::invocation::{DynValue, DynamicDispatch, InterfaceDef, ProxyInvocation};
use crate::target_source::{SingletonTargetSource, TargetSource};

/// 代理行为开关
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyConfig {
    /// 按目标类代理：不做接口方法白名单校验
    pub proxy_target_class: bool,

    /// 允许跳过空链调用的组装开销
    pub optimize: bool,

    /// 不暴露 Advised 查询接口
    pub opaque: bool,

    /// 调用期间把代理自身传入调用上下文
    pub expose_proxy: bool,

    /// 配置冻结，不再接受修改
    pub frozen: bool,
}

/// 已织入代理的查询接口
///
/// 代理以 `opaque` 创建时拿不到它。
pub trait Advised {
    /// 代理的行为配置
    fn proxy_config(&self) -> &ProxyConfig;

    /// 装配进代理的顾问（按执行顺序）
    fn advisors(&self) -> Vec<Arc<Advisor>>;

    /// 被代理的目标类型
    fn advised_target_type(&self) -> &str;
}

/// 代理创建策略
///
/// 根据配置与接口情况选择代理形态。
pub trait AopProxyFactory: Send + Sync {
    fn create_aop_proxy(
        &self,
        config: ProxyConfig,
        target_source: Arc<dyn TargetSource>,
        advisors: Vec<Arc<Advisor>>,
        interfaces: Vec<InterfaceDef>,
        adapter: AdvisorAdapterRegistry,
    ) -> AopResult<Arc<AopProxy>>;
}

/// 默认策略：有接口走接口白名单代理；
/// 否则需要 `proxy_target_class`，走按类透传代理。
#[derive(Debug, Default)]
pub struct DefaultAopProxyFactory;

impl AopProxyFactory for DefaultAopProxyFactory {
    fn create_aop_proxy(
        &self,
        config: ProxyConfig,
        target_source: Arc<dyn TargetSource>,
        advisors: Vec<Arc<Advisor>>,
        interfaces: Vec<InterfaceDef>,
        adapter: AdvisorAdapterRegistry,
    ) -> AopResult<Arc<AopProxy>> {
        let check_interfaces = if !interfaces.is_empty() && !config.proxy_target_class {
            true
        } else if config.proxy_target_class {
            false
        } else {
            return Err(AopError::Configuration(
                "target exposes no interfaces and proxy_target_class is not enabled".to_string(),
            ));
        };

        let type_name = target_source.target_type().to_string();
        tracing::debug!(
            "Creating {} proxy for type '{}' with {} advisor(s)",
            if check_interfaces { "interface" } else { "target-class" },
            type_name,
            advisors.len()
        );

        Ok(Arc::new_cyclic(|self_ref| AopProxy {
            config,
            advisors,
            target_source,
            interfaces,
            check_interfaces,
            adapter,
            type_name,
            self_ref: self_ref.clone(),
        }))
    }
}

/// 代理装配器
///
/// 第一次产出代理后配置即冻结，继续修改会报错。
pub struct ProxyFactory {
    config: ProxyConfig,
    target_source: Arc<dyn TargetSource>,
    advisors: Vec<Arc<Advisor>>,
    interfaces: Vec<InterfaceDef>,
    adapter: AdvisorAdapterRegistry,
    aop_proxy_factory: Arc<dyn AopProxyFactory>,
    proxy_created: bool,
}

impl ProxyFactory {
    /// 用固定目标创建装配器，接口取目标自述的接口
    pub fn new(target: Arc<dyn DynamicDispatch>) -> Self {
        let interfaces = target.interfaces();
        Self::with_target_source(Arc::new(SingletonTargetSource::new(target)), interfaces)
    }

    /// 用自定义目标来源创建装配器
    pub fn with_target_source(
        target_source: Arc<dyn TargetSource>,
        interfaces: Vec<InterfaceDef>,
    ) -> Self {
        Self {
            config: ProxyConfig::default(),
            target_source,
            advisors: Vec::new(),
            interfaces,
            adapter: AdvisorAdapterRegistry::new(),
            aop_proxy_factory: Arc::new(DefaultAopProxyFactory),
            proxy_created: false,
        }
    }

    /// 替换代理创建策略
    pub fn with_aop_proxy_factory(mut self, factory: Arc<dyn AopProxyFactory>) -> Self {
        self.aop_proxy_factory = factory;
        self
    }

    fn check_mutable(&self) -> AopResult<()> {
        if self.config.frozen || self.proxy_created {
            return Err(AopError::ConfigFrozen);
        }
        Ok(())
    }

    /// 修改行为开关
    pub fn set_config(&mut self, config: ProxyConfig) -> AopResult<()> {
        self.check_mutable()?;
        self.config = config;
        Ok(())
    }

    /// 当前行为开关
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// 追加一个顾问
    pub fn add_advisor(&mut self, advisor: Advisor) -> AopResult<()> {
        self.check_mutable()?;
        self.advisors.push(Arc::new(advisor));
        Ok(())
    }

    /// 追加一组顾问
    pub fn add_advisors(&mut self, advisors: impl IntoIterator<Item = Advisor>) -> AopResult<()> {
        self.check_mutable()?;
        self.advisors.extend(advisors.into_iter().map(Arc::new));
        Ok(())
    }

    /// 追加一个可代理的接口
    pub fn add_interface(&mut self, interface: InterfaceDef) -> AopResult<()> {
        self.check_mutable()?;
        self.interfaces.push(interface);
        Ok(())
    }

    /// 清空接口列表（配合 proxy_target_class 使用）
    pub fn clear_interfaces(&mut self) -> AopResult<()> {
        self.check_mutable()?;
        self.interfaces.clear();
        Ok(())
    }

    /// 替换目标来源
    pub fn set_target_source(&mut self, target_source: Arc<dyn TargetSource>) -> AopResult<()> {
        self.check_mutable()?;
        self.target_source = target_source;
        Ok(())
    }

    /// 产出代理；此后装配器不再可变
    pub fn get_proxy(&mut self) -> AopResult<Arc<AopProxy>> {
        self.proxy_created = true;

        // 稳定排序：同 order 保持装配顺序
        let mut advisors = self.advisors.clone();
        advisors.sort_by_key(|a| a.order);

        self.aop_proxy_factory.create_aop_proxy(
            self.config,
            Arc::clone(&self.target_source),
            advisors,
            self.interfaces.clone(),
            self.adapter,
        )
    }
}

/// 借取目标的归还守卫
///
/// 调用成功与失败都保证归还；静态来源免借还。
struct TargetGuard<'a> {
    source: &'a dyn TargetSource,
    target: Option<Arc<dyn DynamicDispatch>>,
}

impl<'a> TargetGuard<'a> {
    fn acquire(source: &'a dyn TargetSource) -> AopResult<Self> {
        let target = source.get_target()?;
        Ok(Self {
            source,
            target: Some(target),
        })
    }

    fn target(&self) -> &Arc<dyn DynamicDispatch> {
        self.target.as_ref().expect("target released early")
    }
}

impl Drop for TargetGuard<'_> {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            if !self.source.is_static() {
                self.source.release_target(target);
            }
        }
    }
}

/// 织入完成的代理
pub struct AopProxy {
    config: ProxyConfig,
    advisors: Vec<Arc<Advisor>>,
    target_source: Arc<dyn TargetSource>,
    interfaces: Vec<InterfaceDef>,
    check_interfaces: bool,
    adapter: AdvisorAdapterRegistry,
    type_name: String,
    self_ref: Weak<AopProxy>,
}

impl AopProxy {
    /// 组装适用于这次调用的拦截链
    fn chain_for(&self, method: &str) -> Vec<Arc<dyn crate::advice::MethodInterceptor>> {
        self.advisors
            .iter()
            .filter(|advisor| advisor.applies_to(&self.type_name, method))
            .map(|advisor| self.adapter.interceptor_for(advisor))
            .collect()
    }

    /// 查询接口；`opaque` 代理不可内省
    pub fn as_advised(&self) -> Option<&dyn Advised> {
        if self.config.opaque {
            None
        } else {
            Some(self)
        }
    }
}

impl Advised for AopProxy {
    fn proxy_config(&self) -> &ProxyConfig {
        &self.config
    }

    fn advisors(&self) -> Vec<Arc<Advisor>> {
        self.advisors.clone()
    }

    fn advised_target_type(&self) -> &str {
        &self.type_name
    }
}

impl DynamicDispatch for AopProxy {
    fn target_type(&self) -> &str {
        &self.type_name
    }

    fn interfaces(&self) -> Vec<InterfaceDef> {
        self.interfaces.clone()
    }

    fn invoke(&self, method: &str, args: &[DynValue]) -> AopResult<DynValue> {
        if self.check_interfaces && !self.interfaces.iter().any(|i| i.has_method(method)) {
            return Err(AopError::NoSuchMethod {
                target_type: self.type_name.clone(),
                method: method.to_string(),
            });
        }

        let guard = TargetGuard::acquire(self.target_source.as_ref())?;
        let chain = self.chain_for(method);

        if chain.is_empty() {
            tracing::trace!("Invoking '{}::{}' directly, no matching advice", self.type_name, method);
            return guard.target().invoke(method, args);
        }

        tracing::trace!(
            "Invoking '{}::{}' through {} interceptor(s)",
            self.type_name,
            method,
            chain.len()
        );

        let proxy = if self.config.expose_proxy {
            self.self_ref
                .upgrade()
                .map(|arc| arc as Arc<dyn DynamicDispatch>)
        } else {
            None
        };

        let mut invocation = ProxyInvocation::new(
            method,
            args.to_vec(),
            Some(Arc::clone(guard.target())),
            proxy,
            chain,
        );
        invocation.proceed()
    }
}

impl std::fmt::Debug for AopProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AopProxy")
            .field("target_type", &self.type_name)
            .field("advisors", &self.advisors.len())
            .field("interfaces", &self.interfaces.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::{MethodBeforeAdvice, MethodInterceptor};
    use crate::advisor::AdviceKind;
    use crate::pointcut::Pointcut;
    use crate::target_source::HotSwappableTargetSource;
    use parking_lot::Mutex;

    struct Greeter;

    impl DynamicDispatch for Greeter {
        fn target_type(&self) -> &str {
            "Greeter"
        }

        fn interfaces(&self) -> Vec<InterfaceDef> {
            vec![InterfaceDef::new("Greeting", vec!["greet"])]
        }

        fn invoke(&self, method: &str, _args: &[DynValue]) -> AopResult<DynValue> {
            match method {
                "greet" => Ok(Arc::new("hello".to_string())),
                other => Err(AopError::NoSuchMethod {
                    target_type: "Greeter".to_string(),
                    method: other.to_string(),
                }),
            }
        }
    }

    struct Recorder {
        log: Arc<Mutex<Vec<&'static str>>>,
        tag: &'static str,
    }

    impl MethodBeforeAdvice for Recorder {
        fn before(
            &self,
            _method: &str,
            _args: &[DynValue],
            _target: Option<&Arc<dyn DynamicDispatch>>,
        ) -> AopResult<()> {
            self.log.lock().push(self.tag);
            Ok(())
        }
    }

    struct Wrapper {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl MethodInterceptor for Wrapper {
        fn invoke(&self, invocation: &mut ProxyInvocation) -> AopResult<DynValue> {
            self.log.lock().push("around-in");
            let result = invocation.proceed();
            self.log.lock().push("around-out");
            result
        }
    }

    #[test]
    fn test_before_and_around_execution_order() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut factory = ProxyFactory::new(Arc::new(Greeter));
        factory
            .add_advisor(
                Advisor::unconditional(AdviceKind::Before(Arc::new(Recorder {
                    log: Arc::clone(&log),
                    tag: "before",
                })))
                .with_order(1),
            )
            .unwrap();
        factory
            .add_advisor(
                Advisor::unconditional(AdviceKind::Around(Arc::new(Wrapper {
                    log: Arc::clone(&log),
                })))
                .with_order(2),
            )
            .unwrap();

        let proxy = factory.get_proxy().unwrap();
        let result = proxy.invoke("greet", &[]).unwrap();

        assert_eq!(
            result.downcast_ref::<String>().map(String::as_str),
            Some("hello")
        );
        assert_eq!(
            *log.lock(),
            vec!["before", "around-in", "around-out"]
        );
    }

    #[test]
    fn test_around_can_short_circuit() {
        struct ShortCircuit;

        impl MethodInterceptor for ShortCircuit {
            fn invoke(&self, _invocation: &mut ProxyInvocation) -> AopResult<DynValue> {
                Ok(Arc::new("cached".to_string()))
            }
        }

        let mut factory = ProxyFactory::new(Arc::new(Greeter));
        factory
            .add_advisor(Advisor::unconditional(AdviceKind::Around(Arc::new(
                ShortCircuit,
            ))))
            .unwrap();

        let proxy = factory.get_proxy().unwrap();
        let result = proxy.invoke("greet", &[]).unwrap();
        assert_eq!(
            result.downcast_ref::<String>().map(String::as_str),
            Some("cached")
        );
    }

    #[test]
    fn test_factory_frozen_after_first_proxy() {
        let mut factory = ProxyFactory::new(Arc::new(Greeter));
        factory.get_proxy().unwrap();

        let result = factory.add_advisor(Advisor::unconditional(AdviceKind::Around(Arc::new(
            Wrapper {
                log: Arc::new(Mutex::new(Vec::new())),
            },
        ))));
        assert!(matches!(result, Err(AopError::ConfigFrozen)));
    }

    #[test]
    fn test_no_interfaces_and_no_target_class_fails() {
        struct Bare;

        impl DynamicDispatch for Bare {
            fn target_type(&self) -> &str {
                "Bare"
            }

            fn interfaces(&self) -> Vec<InterfaceDef> {
                vec![]
            }

            fn invoke(&self, _method: &str, _args: &[DynValue]) -> AopResult<DynValue> {
                Ok(Arc::new(()))
            }
        }

        let mut factory = ProxyFactory::new(Arc::new(Bare));
        assert!(matches!(
            factory.get_proxy(),
            Err(AopError::Configuration(_))
        ));
    }

    #[test]
    fn test_interface_whitelist_rejects_unknown_method() {
        let mut factory = ProxyFactory::new(Arc::new(Greeter));
        let proxy = factory.get_proxy().unwrap();

        let result = proxy.invoke("smuggle", &[]);
        assert!(matches!(result, Err(AopError::NoSuchMethod { .. })));
    }

    #[test]
    fn test_target_class_proxy_passes_any_method_through() {
        let mut factory = ProxyFactory::new(Arc::new(Greeter));
        factory
            .set_config(ProxyConfig {
                proxy_target_class: true,
                ..ProxyConfig::default()
            })
            .unwrap();

        let proxy = factory.get_proxy().unwrap();
        // 白名单关闭，未知方法的错误来自目标本身
        let result = proxy.invoke("smuggle", &[]);
        assert!(matches!(result, Err(AopError::NoSuchMethod { .. })));
        let result = proxy.invoke("greet", &[]).unwrap();
        assert_eq!(
            result.downcast_ref::<String>().map(String::as_str),
            Some("hello")
        );
    }

    #[test]
    fn test_expose_proxy_makes_self_visible_to_advice() {
        struct SeeProxy {
            seen: Arc<Mutex<bool>>,
        }

        impl MethodInterceptor for SeeProxy {
            fn invoke(&self, invocation: &mut ProxyInvocation) -> AopResult<DynValue> {
                *self.seen.lock() = invocation.proxy().is_some();
                invocation.proceed()
            }
        }

        let seen = Arc::new(Mutex::new(false));
        let mut factory = ProxyFactory::new(Arc::new(Greeter));
        factory
            .set_config(ProxyConfig {
                expose_proxy: true,
                ..ProxyConfig::default()
            })
            .unwrap();
        factory
            .add_advisor(Advisor::unconditional(AdviceKind::Around(Arc::new(
                SeeProxy {
                    seen: Arc::clone(&seen),
                },
            ))))
            .unwrap();

        let proxy = factory.get_proxy().unwrap();
        proxy.invoke("greet", &[]).unwrap();
        assert!(*seen.lock());
    }

    #[test]
    fn test_opaque_proxy_hides_advised() {
        let mut factory = ProxyFactory::new(Arc::new(Greeter));
        factory
            .set_config(ProxyConfig {
                opaque: true,
                ..ProxyConfig::default()
            })
            .unwrap();
        let proxy = factory.get_proxy().unwrap();
        assert!(proxy.as_advised().is_none());

        let mut factory = ProxyFactory::new(Arc::new(Greeter));
        let proxy = factory.get_proxy().unwrap();
        let advised = proxy.as_advised().unwrap();
        assert_eq!(advised.advised_target_type(), "Greeter");
    }

    #[test]
    fn test_pointcut_filters_chain_per_method() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut factory = ProxyFactory::new(Arc::new(Greeter));
        factory
            .add_advisor(Advisor::new(
                Pointcut::execution("*", "other_*"),
                AdviceKind::Before(Arc::new(Recorder {
                    log: Arc::clone(&log),
                    tag: "never",
                })),
            ))
            .unwrap();

        let proxy = factory.get_proxy().unwrap();
        proxy.invoke("greet", &[]).unwrap();
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_hot_swapped_target_reflected_on_next_call() {
        struct Fixed(&'static str);

        impl DynamicDispatch for Fixed {
            fn target_type(&self) -> &str {
                "Fixed"
            }

            fn interfaces(&self) -> Vec<InterfaceDef> {
                vec![InterfaceDef::new("Value", vec!["value"])]
            }

            fn invoke(&self, _method: &str, _args: &[DynValue]) -> AopResult<DynValue> {
                Ok(Arc::new(self.0.to_string()))
            }
        }

        let source = Arc::new(HotSwappableTargetSource::new(Arc::new(Fixed("one"))));
        let mut factory = ProxyFactory::with_target_source(
            Arc::clone(&source) as Arc<dyn TargetSource>,
            vec![InterfaceDef::new("Value", vec!["value"])],
        );
        let proxy = factory.get_proxy().unwrap();

        let first = proxy.invoke("value", &[]).unwrap();
        assert_eq!(first.downcast_ref::<String>().map(String::as_str), Some("one"));

        source.swap(Arc::new(Fixed("two")));

        let second = proxy.invoke("value", &[]).unwrap();
        assert_eq!(second.downcast_ref::<String>().map(String::as_str), Some("two"));
    }

    #[test]
    fn test_dynamic_target_released_even_on_error() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Failing;

        impl DynamicDispatch for Failing {
            fn target_type(&self) -> &str {
                "Failing"
            }

            fn interfaces(&self) -> Vec<InterfaceDef> {
                vec![InterfaceDef::new("Failing", vec!["boom"])]
            }

            fn invoke(&self, _method: &str, _args: &[DynValue]) -> AopResult<DynValue> {
                Err(AopError::Application(anyhow::anyhow!("boom")))
            }
        }

        struct Counting {
            inner: Arc<dyn DynamicDispatch>,
            released: Arc<AtomicUsize>,
        }

        impl TargetSource for Counting {
            fn target_type(&self) -> &str {
                self.inner.target_type()
            }

            fn get_target(&self) -> AopResult<Arc<dyn DynamicDispatch>> {
                Ok(Arc::clone(&self.inner))
            }

            fn release_target(&self, _target: Arc<dyn DynamicDispatch>) {
                self.released.fetch_add(1, Ordering::SeqCst);
            }
        }

        let released = Arc::new(AtomicUsize::new(0));
        let source = Arc::new(Counting {
            inner: Arc::new(Failing),
            released: Arc::clone(&released),
        });
        let mut factory = ProxyFactory::with_target_source(
            source as Arc<dyn TargetSource>,
            vec![InterfaceDef::new("Failing", vec!["boom"])],
        );
        let proxy = factory.get_proxy().unwrap();

        assert!(proxy.invoke("boom", &[]).is_err());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
