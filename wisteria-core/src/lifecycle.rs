//! Bean 生命周期扩展点

use std::any::Any;

use crate::error::ContainerResult;

/// Bean 后置处理器
///
/// 在实例初始化回调前后各获得一次介入机会，
/// 可以原样放行，也可以返回替代实例（典型场景是织入代理）。
pub trait BeanPostProcessor: Send + Sync {
    /// 处理器名称（用于日志）
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 执行顺序，小值先执行；同序值保持注册顺序
    fn order(&self) -> i32 {
        i32::MAX
    }

    /// 初始化回调之前调用
    fn post_process_before_initialization(
        &self,
        bean: Box<dyn Any + Send + Sync>,
        _bean_name: &str,
    ) -> ContainerResult<Box<dyn Any + Send + Sync>> {
        Ok(bean)
    }

    /// 初始化回调之后调用
    fn post_process_after_initialization(
        &self,
        bean: Box<dyn Any + Send + Sync>,
        _bean_name: &str,
    ) -> ContainerResult<Box<dyn Any + Send + Sync>> {
        Ok(bean)
    }
}
