//! 织入层统一错误类型

use thiserror::Error;

/// 代理创建与调用过程中的错误类型
#[derive(Debug, Error)]
pub enum AopError {
    /// 代理配置无法满足（既无接口又未开启按类代理等）
    #[error("aop configuration error: {0}")]
    Configuration(String),

    /// 配置已冻结后再修改
    #[error("cannot modify advice: proxy configuration is frozen")]
    ConfigFrozen,

    /// 代理上不存在请求的方法
    #[error("no method '{method}' on proxied type '{target_type}'")]
    NoSuchMethod { target_type: String, method: String },

    /// 拦截链走到末端却没有可调用的目标
    #[error("invocation reached end of interceptor chain with no target")]
    NoTarget,

    /// TargetSource 获取目标失败
    #[error("failed to resolve invocation target: {0}")]
    TargetResolution(String),

    /// 通知或目标方法本身的失败
    #[error(transparent)]
    Application(#[from] anyhow::Error),
}

/// 织入层统一 Result 类型
pub type AopResult<T> = Result<T, AopError>;
