//! 通知（Advice）类型
//!
//! 两种基础通知：前置通知在目标方法前执行、无法改变控制流；
//! 环绕拦截器接管整个调用，自行决定是否 `proceed`。

use std::sync::Arc;

use crate::error::AopResult;
use crate::invocation::{DynValue, DynamicDispatch, ProxyInvocation};

/// 前置通知
///
/// 在目标方法执行前调用；返回错误会中止整个调用。
pub trait MethodBeforeAdvice: Send + Sync {
    fn before(
        &self,
        method: &str,
        args: &[DynValue],
        target: Option<&Arc<dyn DynamicDispatch>>,
    ) -> AopResult<()>;
}

/// 环绕拦截器
///
/// 完全接管调用：可以在 `proceed` 前后运行任意逻辑，
/// 也可以不调用 `proceed` 直接返回替代结果。
pub trait MethodInterceptor: Send + Sync {
    fn invoke(&self, invocation: &mut ProxyInvocation) -> AopResult<DynValue>;
}

/// 把前置通知适配为拦截器，使拦截链只需要处理一种元素
pub struct MethodBeforeAdviceInterceptor {
    advice: Arc<dyn MethodBeforeAdvice>,
}

impl MethodBeforeAdviceInterceptor {
    pub fn new(advice: Arc<dyn MethodBeforeAdvice>) -> Self {
        Self { advice }
    }
}

impl MethodInterceptor for MethodBeforeAdviceInterceptor {
    fn invoke(&self, invocation: &mut ProxyInvocation) -> AopResult<DynValue> {
        let target = invocation.target().cloned();
        self.advice
            .before(invocation.method(), invocation.args(), target.as_ref())?;
        invocation.proceed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::InterfaceDef;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Fixed;

    impl DynamicDispatch for Fixed {
        fn target_type(&self) -> &str {
            "Fixed"
        }

        fn interfaces(&self) -> Vec<InterfaceDef> {
            vec![]
        }

        fn invoke(&self, _method: &str, _args: &[DynValue]) -> AopResult<DynValue> {
            Ok(Arc::new("done".to_string()))
        }
    }

    #[test]
    fn test_before_advice_runs_then_proceeds() {
        struct Flag(Arc<AtomicBool>);

        impl MethodBeforeAdvice for Flag {
            fn before(
                &self,
                _method: &str,
                _args: &[DynValue],
                _target: Option<&Arc<dyn DynamicDispatch>>,
            ) -> AopResult<()> {
                self.0.store(true, Ordering::SeqCst);
                Ok(())
            }
        }

        let seen = Arc::new(AtomicBool::new(false));
        let interceptor: Arc<dyn MethodInterceptor> = Arc::new(
            MethodBeforeAdviceInterceptor::new(Arc::new(Flag(Arc::clone(&seen)))),
        );

        let mut invocation = ProxyInvocation::new(
            "run",
            vec![],
            Some(Arc::new(Fixed)),
            None,
            vec![interceptor],
        );
        let result = invocation.proceed().unwrap();

        assert!(seen.load(Ordering::SeqCst));
        assert_eq!(result.downcast_ref::<String>().map(String::as_str), Some("done"));
    }

    #[test]
    fn test_failing_before_advice_aborts_invocation() {
        struct Deny;

        impl MethodBeforeAdvice for Deny {
            fn before(
                &self,
                method: &str,
                _args: &[DynValue],
                _target: Option<&Arc<dyn DynamicDispatch>>,
            ) -> AopResult<()> {
                Err(crate::error::AopError::Application(anyhow::anyhow!(
                    "denied: {}",
                    method
                )))
            }
        }

        let interceptor: Arc<dyn MethodInterceptor> =
            Arc::new(MethodBeforeAdviceInterceptor::new(Arc::new(Deny)));
        let mut invocation = ProxyInvocation::new(
            "run",
            vec![],
            Some(Arc::new(Fixed)),
            None,
            vec![interceptor],
        );

        assert!(invocation.proceed().is_err());
    }
}
