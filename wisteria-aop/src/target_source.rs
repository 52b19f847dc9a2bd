//! 调用目标来源
//!
//! 代理不直接持有目标对象，而是每次调用向 [`TargetSource`]
//! 借取，调用结束后归还。静态来源每次返回同一实例，
//! 动态来源（热交换、池化）可以在两次调用之间换掉目标。

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::AopResult;
use crate::invocation::DynamicDispatch;

/// 目标来源
pub trait TargetSource: Send + Sync {
    /// 目标类型名称
    fn target_type(&self) -> &str;

    /// 目标是否不可变（可省去每次调用的借还开销）
    fn is_static(&self) -> bool {
        false
    }

    /// 借取一次调用使用的目标
    fn get_target(&self) -> AopResult<Arc<dyn DynamicDispatch>>;

    /// 归还目标；与 `get_target` 成对调用，包括调用失败时
    fn release_target(&self, _target: Arc<dyn DynamicDispatch>) {}
}

/// 固定目标来源 - 始终返回同一实例
pub struct SingletonTargetSource {
    target: Arc<dyn DynamicDispatch>,
    type_name: String,
}

impl SingletonTargetSource {
    pub fn new(target: Arc<dyn DynamicDispatch>) -> Self {
        let type_name = target.target_type().to_string();
        Self { target, type_name }
    }
}

impl TargetSource for SingletonTargetSource {
    fn target_type(&self) -> &str {
        &self.type_name
    }

    fn is_static(&self) -> bool {
        true
    }

    fn get_target(&self) -> AopResult<Arc<dyn DynamicDispatch>> {
        Ok(Arc::clone(&self.target))
    }
}

/// 可热交换的目标来源
///
/// 运行中换掉目标实例，已发出的代理在下一次调用起
/// 指向新目标；返回被换下的旧目标。
pub struct HotSwappableTargetSource {
    target: RwLock<Arc<dyn DynamicDispatch>>,
    type_name: String,
}

impl HotSwappableTargetSource {
    pub fn new(target: Arc<dyn DynamicDispatch>) -> Self {
        let type_name = target.target_type().to_string();
        Self {
            target: RwLock::new(target),
            type_name,
        }
    }

    /// 换入新目标，返回旧目标
    pub fn swap(&self, new_target: Arc<dyn DynamicDispatch>) -> Arc<dyn DynamicDispatch> {
        let mut target = self.target.write();
        let old = Arc::clone(&target);
        *target = new_target;
        tracing::debug!("Swapped target of type '{}'", self.type_name);
        old
    }
}

impl TargetSource for HotSwappableTargetSource {
    fn target_type(&self) -> &str {
        &self.type_name
    }

    fn get_target(&self) -> AopResult<Arc<dyn DynamicDispatch>> {
        Ok(Arc::clone(&self.target.read()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AopResult;
    use crate::invocation::{DynValue, InterfaceDef};

    struct Tagged(&'static str);

    impl DynamicDispatch for Tagged {
        fn target_type(&self) -> &str {
            "Tagged"
        }

        fn interfaces(&self) -> Vec<InterfaceDef> {
            vec![]
        }

        fn invoke(&self, _method: &str, _args: &[DynValue]) -> AopResult<DynValue> {
            Ok(Arc::new(self.0.to_string()))
        }
    }

    #[test]
    fn test_singleton_source_is_static_and_stable() {
        let target: Arc<dyn DynamicDispatch> = Arc::new(Tagged("a"));
        let source = SingletonTargetSource::new(Arc::clone(&target));
        assert!(source.is_static());
        assert!(Arc::ptr_eq(&source.get_target().unwrap(), &target));
    }

    #[test]
    fn test_hot_swap_returns_old_target() {
        let first: Arc<dyn DynamicDispatch> = Arc::new(Tagged("first"));
        let source = HotSwappableTargetSource::new(Arc::clone(&first));
        assert!(!source.is_static());

        let old = source.swap(Arc::new(Tagged("second")));
        assert!(Arc::ptr_eq(&old, &first));

        let current = source.get_target().unwrap();
        let result = current.invoke("any", &[]).unwrap();
        assert_eq!(
            result.downcast_ref::<String>().map(String::as_str),
            Some("second")
        );
    }
}
