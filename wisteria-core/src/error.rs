//! 容器统一错误类型

use thiserror::Error;

/// 容器操作的错误类型
///
/// 解析、创建层面的失败只会中断触发它的那一次请求，
/// 容器自身保持干净、可重试的状态（不残留 in-creation 标记）。
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 在当前工厂及所有父工厂中都找不到指定名称的 Bean 定义
    #[error("no bean named '{0}' is defined")]
    NoSuchBeanDefinition(String),

    /// 尝试实例化一个抽象的 Bean 定义（仅作为模板使用）
    #[error("bean definition '{0}' is abstract and cannot be instantiated")]
    BeanIsAbstract(String),

    /// 单例创建过程中再次请求了同名 Bean，即存在循环依赖
    #[error("bean '{0}' is currently in creation: unresolvable circular reference?")]
    CurrentlyInCreation(String),

    /// FactoryBean 在解析依赖环时返回了空对象
    #[error("factory bean '{0}' returned no object: not fully initialized due to a circular bean reference")]
    FactoryBeanCircularReference(String),

    /// getBean 显式参数与作用域/工厂方法的非法组合
    #[error("invalid arguments for bean '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },

    /// 名称冲突：定义、别名或外部注册的单例已经存在
    #[error("bean '{0}' is already registered")]
    BeanAlreadyExists(String),

    /// 使用 '&' 前缀解引用了一个并非 FactoryBean 的 Bean
    #[error("bean '{0}' is not a factory bean, '&' dereference is not possible")]
    BeanIsNotAFactory(String),

    /// Bean 实例化或属性填充失败
    #[error("failed to create bean: {0}")]
    BeanCreationFailed(String),

    /// 按类型查找时实际类型不匹配
    #[error("bean type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },

    /// 日志系统初始化失败
    #[error("failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    /// 其他错误（init 回调、占位符解析等应用层失败）
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 容器统一 Result 类型
pub type ContainerResult<T> = Result<T, ContainerError>;
