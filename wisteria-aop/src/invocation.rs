//! 方法调用抽象
//!
//! [`DynamicDispatch`] 是织入层对目标对象的全部认知：
//! 能报告自己的类型与接口，能按名调用方法。
//! [`ProxyInvocation`] 则是一次被拦截的调用在拦截链中的流动形态。

use std::sync::Arc;

use crate::advice::MethodInterceptor;
use crate::error::{AopError, AopResult};

pub use wisteria_core::bean::DynValue;

/// 接口描述：一组可在代理上调用的方法名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDef {
    pub name: String,
    pub methods: Vec<String>,
}

impl InterfaceDef {
    pub fn new(name: impl Into<String>, methods: Vec<&str>) -> Self {
        Self {
            name: name.into(),
            methods: methods.into_iter().map(String::from).collect(),
        }
    }

    /// 接口是否包含指定方法
    pub fn has_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }
}

/// 动态派发能力 - 可被代理的对象
///
/// 目标对象与代理本身都实现它；放进容器时以
/// `Arc<dyn DynamicDispatch>` 的形态擦除，便于按实例识别。
pub trait DynamicDispatch: Send + Sync {
    /// 目标类型名称
    fn target_type(&self) -> &str;

    /// 对象实现的接口
    fn interfaces(&self) -> Vec<InterfaceDef>;

    /// 按名调用方法
    fn invoke(&self, method: &str, args: &[DynValue]) -> AopResult<DynValue>;
}

/// 将可派发对象擦除为容器可缓存的值
pub fn dispatch_value(target: Arc<dyn DynamicDispatch>) -> DynValue {
    Arc::new(target)
}

/// 一次被拦截的方法调用
///
/// 拦截链上每个拦截器通过 [`proceed`](Self::proceed) 把调用传给
/// 下一环，链走完后才真正调用目标方法。游标只前进不后退，
/// 不调用 `proceed` 即短路整条链。
pub struct ProxyInvocation {
    method: String,
    args: Vec<DynValue>,
    target: Option<Arc<dyn DynamicDispatch>>,
    proxy: Option<Arc<dyn DynamicDispatch>>,
    chain: Vec<Arc<dyn MethodInterceptor>>,
    cursor: usize,
}

impl ProxyInvocation {
    pub fn new(
        method: impl Into<String>,
        args: Vec<DynValue>,
        target: Option<Arc<dyn DynamicDispatch>>,
        proxy: Option<Arc<dyn DynamicDispatch>>,
        chain: Vec<Arc<dyn MethodInterceptor>>,
    ) -> Self {
        Self {
            method: method.into(),
            args,
            target,
            proxy,
            chain,
            cursor: 0,
        }
    }

    /// 被调用的方法名
    pub fn method(&self) -> &str {
        &self.method
    }

    /// 调用参数
    pub fn args(&self) -> &[DynValue] {
        &self.args
    }

    /// 调用的目标对象（链走完后被调用的一方）
    pub fn target(&self) -> Option<&Arc<dyn DynamicDispatch>> {
        self.target.as_ref()
    }

    /// 发起这次调用的代理（expose_proxy 开启时可用）
    pub fn proxy(&self) -> Option<&Arc<dyn DynamicDispatch>> {
        self.proxy.as_ref()
    }

    /// 把调用传给链上的下一个拦截器；链尽头调用目标方法
    pub fn proceed(&mut self) -> AopResult<DynValue> {
        if self.cursor < self.chain.len() {
            let interceptor = Arc::clone(&self.chain[self.cursor]);
            self.cursor += 1;
            interceptor.invoke(self)
        } else {
            self.invoke_target()
        }
    }

    fn invoke_target(&self) -> AopResult<DynValue> {
        match &self.target {
            Some(target) => target.invoke(&self.method, &self.args),
            None => Err(AopError::NoTarget),
        }
    }
}

impl std::fmt::Debug for ProxyInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyInvocation")
            .field("method", &self.method)
            .field("args_len", &self.args.len())
            .field("chain_len", &self.chain.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}
