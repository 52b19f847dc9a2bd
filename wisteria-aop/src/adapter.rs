//! 通知适配
//!
//! 拦截链只认 [`MethodInterceptor`]，适配注册表负责把其他
//! 通知形态转换过去，并把裸通知包装成完整的顾问。

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::advice::{MethodBeforeAdviceInterceptor, MethodInterceptor};
use crate::advisor::{AdviceEntry, AdviceKind, Advisor};

/// 通知适配注册表
///
/// 装配方显式持有并注入；确有需要时也可以用
/// [`shared`](Self::shared) 拿进程级的共享实例。
#[derive(Debug, Default, Clone, Copy)]
pub struct AdvisorAdapterRegistry;

/// 进程级共享实例：适配表无状态，共享它只是省一次构造
static SHARED: Lazy<AdvisorAdapterRegistry> = Lazy::new(AdvisorAdapterRegistry::new);

impl AdvisorAdapterRegistry {
    pub fn new() -> Self {
        Self
    }

    /// 进程级共享实例
    pub fn shared() -> &'static Self {
        &SHARED
    }

    /// 把异构条目统一为顾问；裸通知包装成匹配一切的顾问
    pub fn wrap(&self, entry: AdviceEntry) -> Advisor {
        match entry {
            AdviceEntry::Advisor(advisor) => (*advisor).clone(),
            AdviceEntry::Interceptor(interceptor) => {
                Advisor::unconditional(AdviceKind::Around(interceptor))
            }
            AdviceEntry::BeforeAdvice(advice) => {
                Advisor::unconditional(AdviceKind::Before(advice))
            }
        }
    }

    /// 把顾问的通知转成链上可执行的拦截器
    pub fn interceptor_for(&self, advisor: &Advisor) -> Arc<dyn MethodInterceptor> {
        match &advisor.advice {
            AdviceKind::Around(interceptor) => Arc::clone(interceptor),
            AdviceKind::Before(advice) => {
                Arc::new(MethodBeforeAdviceInterceptor::new(Arc::clone(advice)))
            }
        }
    }
}
