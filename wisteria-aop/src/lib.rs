//! Wisteria AOP - 代理织入支持
//!
//! 为容器管理的对象提供通知织入能力，支持：
//! - 前置通知与环绕拦截器，链式 proceed 语义
//! - 类过滤器 + 方法匹配器的切点模型
//! - 可热交换的调用目标来源
//! - 通过 BeanPostProcessor 在容器内自动织入代理

pub mod adapter;
pub mod advice;
pub mod advisor;
pub mod auto_proxy;
pub mod error;
pub mod invocation;
pub mod pointcut;
pub mod proxy;
pub mod target_source;

// 重新导出核心类型
pub use adapter::AdvisorAdapterRegistry;
pub use advice::{MethodBeforeAdvice, MethodBeforeAdviceInterceptor, MethodInterceptor};
pub use advisor::{registered_advisors, AdviceEntry, AdviceKind, Advisor, AdvisorRegistration};
pub use auto_proxy::{
    AdvisorResolutionStrategy, AdvisorSelection, AutoProxyCreator, NameMatchAdvisorStrategy,
    TargetSourceCreator,
};
pub use error::{AopError, AopResult};
pub use invocation::{dispatch_value, DynValue, DynamicDispatch, InterfaceDef, ProxyInvocation};
pub use pointcut::{ClassFilter, MethodMatcher, Pointcut};
pub use proxy::{
    Advised, AopProxy, AopProxyFactory, DefaultAopProxyFactory, ProxyConfig, ProxyFactory,
};
pub use target_source::{HotSwappableTargetSource, SingletonTargetSource, TargetSource};

// 导出 inventory 供注册宏使用
pub use inventory;

/// 预导入模块
pub mod prelude {
    pub use crate::adapter::AdvisorAdapterRegistry;
    pub use crate::advice::{MethodBeforeAdvice, MethodBeforeAdviceInterceptor, MethodInterceptor};
    pub use crate::advisor::{AdviceEntry, AdviceKind, Advisor, AdvisorRegistration};
    pub use crate::auto_proxy::{
        AdvisorResolutionStrategy, AdvisorSelection, AutoProxyCreator, NameMatchAdvisorStrategy,
        TargetSourceCreator,
    };
    pub use crate::error::{AopError, AopResult};
    pub use crate::invocation::{DynValue, DynamicDispatch, InterfaceDef, ProxyInvocation};
    pub use crate::pointcut::{ClassFilter, MethodMatcher, Pointcut};
    pub use crate::proxy::{Advised, AopProxy, ProxyConfig, ProxyFactory};
    pub use crate::target_source::{
        HotSwappableTargetSource, SingletonTargetSource, TargetSource,
    };
}
