//! 顾问（Advisor）- 切点与通知的配对
//!
//! 代理装配时按顾问的切点筛选通知，按 order 排序组链。

use std::sync::Arc;

use crate::advice::{MethodBeforeAdvice, MethodInterceptor};
use crate::pointcut::Pointcut;

/// 通知形态
#[derive(Clone)]
pub enum AdviceKind {
    /// 前置通知
    Before(Arc<dyn MethodBeforeAdvice>),

    /// 环绕拦截器
    Around(Arc<dyn MethodInterceptor>),
}

impl std::fmt::Debug for AdviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdviceKind::Before(_) => write!(f, "Before(...)"),
            AdviceKind::Around(_) => write!(f, "Around(...)"),
        }
    }
}

/// 顾问 - 带切点与执行顺序的通知
#[derive(Debug, Clone)]
pub struct Advisor {
    /// 执行顺序，小值先执行；同序值保持装配顺序
    pub order: i32,

    /// 切点
    pub pointcut: Pointcut,

    /// 通知
    pub advice: AdviceKind,
}

impl Advisor {
    /// 创建带切点的顾问
    pub fn new(pointcut: Pointcut, advice: AdviceKind) -> Self {
        Self {
            order: i32::MAX,
            pointcut,
            advice,
        }
    }

    /// 创建匹配一切的顾问
    pub fn unconditional(advice: AdviceKind) -> Self {
        Self::new(Pointcut::truthy(), advice)
    }

    /// 设置执行顺序
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// 顾问是否适用于指定连接点
    pub fn applies_to(&self, class_name: &str, method_name: &str) -> bool {
        self.pointcut.matches(class_name, method_name)
    }
}

/// 进入织入流程的异构条目
///
/// 自动代理既接受完整的顾问，也接受裸通知；
/// 裸通知在装配时被包装成匹配一切的顾问。
#[derive(Clone)]
pub enum AdviceEntry {
    Advisor(Arc<Advisor>),
    Interceptor(Arc<dyn MethodInterceptor>),
    BeforeAdvice(Arc<dyn MethodBeforeAdvice>),
}

impl std::fmt::Debug for AdviceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdviceEntry::Advisor(a) => write!(f, "Advisor(order={})", a.order),
            AdviceEntry::Interceptor(_) => write!(f, "Interceptor(...)"),
            AdviceEntry::BeforeAdvice(_) => write!(f, "BeforeAdvice(...)"),
        }
    }
}

/// 顾问注册器
///
/// 用于 inventory 自动收集和注册顾问
pub struct AdvisorRegistration {
    /// 顾问名称
    pub name: &'static str,

    /// 创建顾问实例的函数
    pub creator: fn() -> Advisor,
}

impl AdvisorRegistration {
    /// 创建新的顾问注册器
    pub const fn new(name: &'static str, creator: fn() -> Advisor) -> Self {
        Self { name, creator }
    }

    /// 创建顾问实例
    pub fn create_instance(&self) -> Advisor {
        (self.creator)()
    }
}

// 使用 inventory 收集所有顾问注册器
inventory::collect!(AdvisorRegistration);

/// 加载所有通过 inventory 注册的顾问
pub fn registered_advisors() -> Vec<Advisor> {
    let registrations: Vec<_> = inventory::iter::<AdvisorRegistration>().collect();
    tracing::info!("Loading {} advisor(s) from registry", registrations.len());

    registrations
        .into_iter()
        .map(|registration| {
            tracing::debug!("  ├─ Loading advisor: {}", registration.name);
            registration.create_instance()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AopResult;
    use crate::invocation::{DynValue, DynamicDispatch};

    struct Noop;

    impl MethodBeforeAdvice for Noop {
        fn before(
            &self,
            _method: &str,
            _args: &[DynValue],
            _target: Option<&Arc<dyn DynamicDispatch>>,
        ) -> AopResult<()> {
            Ok(())
        }
    }

    inventory::submit! {
        AdvisorRegistration::new("noop", || {
            Advisor::unconditional(AdviceKind::Before(Arc::new(Noop))).with_order(7)
        })
    }

    #[test]
    fn test_registered_advisors_are_loaded() {
        let advisors = registered_advisors();
        assert!(advisors.iter().any(|a| a.order == 7));
    }

    #[test]
    fn test_advisor_applies_through_pointcut() {
        let advisor = Advisor::new(
            Pointcut::execution("*Service", "save_*"),
            AdviceKind::Before(Arc::new(Noop)),
        );
        assert!(advisor.applies_to("UserService", "save_user"));
        assert!(!advisor.applies_to("UserService", "load_user"));
    }
}
