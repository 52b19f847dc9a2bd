//! 类型系统能力与实例构建
//!
//! 容器不依赖运行时反射，而是通过一组小的 trait 获得等价能力：
//! [`BeanClass`] 提供按名构造与具名工厂方法，[`PropertyAccess`] 提供
//! 按名赋值字段。[`InstanceBuilder`] 是注入进容器的构建入口，
//! 默认实现 [`DefaultInstanceBuilder`] 负责解析值引用并驱动上述能力。

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::bean::{DynValue, PropertyValue, RootBeanDefinition};
use crate::bean_factory::BeanFactory;
use crate::config::Environment;
use crate::error::{ContainerError, ContainerResult};

/// 目标类型能力 - 按名称构造实例
pub trait BeanClass: Send + Sync {
    /// 类型名称（用于日志与按类型查找）
    fn class_name(&self) -> &str;

    /// 构造产物的 TypeId
    ///
    /// 名称刻意避开 `Any::type_id`，防止在 `Arc<dyn BeanClass>` 上
    /// 被方法解析选中后者。
    fn produced_type_id(&self) -> TypeId;

    /// 调用默认构造（或带参构造）
    fn instantiate(&self, args: &[DynValue]) -> ContainerResult<Box<dyn PropertyAccess>>;

    /// 调用具名工厂方法
    fn invoke_factory_method(
        &self,
        method: &str,
        _args: &[DynValue],
    ) -> ContainerResult<Box<dyn PropertyAccess>> {
        Err(ContainerError::BeanCreationFailed(format!(
            "class '{}' has no factory method '{}'",
            self.class_name(),
            method
        )))
    }
}

/// 按名称赋值字段的能力，作用于刚构造出的实例
pub trait PropertyAccess: Send + Sync {
    /// 设置一个属性；属性不存在时返回错误
    fn set_property(&mut self, name: &str, value: DynValue) -> ContainerResult<()>;

    /// 擦除为容器可缓存的形态
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

type ConstructorFn<T> = Arc<dyn Fn(&[DynValue]) -> ContainerResult<T> + Send + Sync>;
type SetterFn<T> = Arc<dyn Fn(&mut T, DynValue) -> ContainerResult<()> + Send + Sync>;

/// 基于闭包的 BeanClass 实现
///
/// 用构造闭包加一组 setter 闭包描述一个类型，
/// 是不使用派生宏时注册 Bean 的主要方式。
///
/// # 示例
///
/// ```ignore
/// let class = SimpleBeanClass::new("DataSource", |_args| Ok(DataSource::default()))
///     .with_setter("url", |ds: &mut DataSource, v| {
///         ds.url = value_of::<String>(&v)?;
///         Ok(())
///     });
/// ```
pub struct SimpleBeanClass<T: Any + Send + Sync> {
    name: String,
    constructor: ConstructorFn<T>,
    factory_methods: HashMap<String, ConstructorFn<T>>,
    setters: Arc<HashMap<String, SetterFn<T>>>,
}

impl<T: Any + Send + Sync> SimpleBeanClass<T> {
    /// 创建类型能力，`constructor` 对应默认构造
    pub fn new<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&[DynValue]) -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            constructor: Arc::new(constructor),
            factory_methods: HashMap::new(),
            setters: Arc::new(HashMap::new()),
        }
    }

    /// 注册一个属性 setter
    pub fn with_setter<F>(mut self, property: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut T, DynValue) -> ContainerResult<()> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.setters).insert(property.into(), Arc::new(setter));
        self
    }

    /// 注册一个具名工厂方法
    pub fn with_factory_method<F>(mut self, method: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&[DynValue]) -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.factory_methods.insert(method.into(), Arc::new(factory));
        self
    }

    fn wrap(&self, value: T) -> Box<dyn PropertyAccess> {
        Box::new(SimpleInstance {
            value,
            class_name: self.name.clone(),
            setters: Arc::clone(&self.setters),
        })
    }
}

impl<T: Any + Send + Sync> BeanClass for SimpleBeanClass<T> {
    fn class_name(&self) -> &str {
        &self.name
    }

    fn produced_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn instantiate(&self, args: &[DynValue]) -> ContainerResult<Box<dyn PropertyAccess>> {
        let value = (self.constructor)(args)?;
        Ok(self.wrap(value))
    }

    fn invoke_factory_method(
        &self,
        method: &str,
        args: &[DynValue],
    ) -> ContainerResult<Box<dyn PropertyAccess>> {
        let factory = self.factory_methods.get(method).ok_or_else(|| {
            ContainerError::BeanCreationFailed(format!(
                "class '{}' has no factory method '{}'",
                self.name, method
            ))
        })?;
        let value = factory(args)?;
        Ok(self.wrap(value))
    }
}

struct SimpleInstance<T: Any + Send + Sync> {
    value: T,
    class_name: String,
    setters: Arc<HashMap<String, SetterFn<T>>>,
}

impl<T: Any + Send + Sync> PropertyAccess for SimpleInstance<T> {
    fn set_property(&mut self, name: &str, value: DynValue) -> ContainerResult<()> {
        let setter = self.setters.get(name).ok_or_else(|| {
            ContainerError::BeanCreationFailed(format!(
                "class '{}' has no property '{}'",
                self.class_name, name
            ))
        })?;
        setter(&mut self.value, value)
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        Box::new(self.value)
    }
}

/// 实例构建能力 - 容器注入的构建入口
///
/// 给定已合并的定义，要么走默认构造再填充属性，
/// 要么调用具名工厂方法；`Ref` 形式的值通过 `factory` 递归解析。
pub trait InstanceBuilder: Send + Sync {
    fn build(
        &self,
        bean_name: &str,
        definition: &RootBeanDefinition,
        factory: &dyn BeanFactory,
        environment: &Environment,
        args: Option<&[DynValue]>,
    ) -> ContainerResult<Box<dyn Any + Send + Sync>>;
}

/// 解析一个值或引用声明为真实值
pub fn resolve_property_value(
    spec: &PropertyValue,
    factory: &dyn BeanFactory,
    environment: &Environment,
) -> ContainerResult<DynValue> {
    match spec {
        PropertyValue::Value(value) => Ok(Arc::clone(value)),
        PropertyValue::Ref(name) => factory.get_bean(name),
        PropertyValue::Placeholder(expr) => {
            let resolved = environment.resolve_placeholders(expr)?;
            Ok(Arc::new(resolved) as DynValue)
        }
    }
}

/// 默认实例构建器
///
/// 按定义顺序：解析构造参数 → 构造（或工厂方法）→ 按键序填充属性。
#[derive(Debug, Default)]
pub struct DefaultInstanceBuilder;

impl InstanceBuilder for DefaultInstanceBuilder {
    fn build(
        &self,
        bean_name: &str,
        definition: &RootBeanDefinition,
        factory: &dyn BeanFactory,
        environment: &Environment,
        args: Option<&[DynValue]>,
    ) -> ContainerResult<Box<dyn Any + Send + Sync>> {
        let class = definition.class.as_ref().ok_or_else(|| {
            ContainerError::BeanCreationFailed(format!(
                "bean '{}' has no class to instantiate",
                bean_name
            ))
        })?;

        // 显式传入的参数整体替换定义中的构造参数
        let resolved_args: Vec<DynValue> = match args {
            Some(explicit) => explicit.to_vec(),
            None => definition
                .constructor_args
                .values()
                .map(|spec| resolve_property_value(spec, factory, environment))
                .collect::<ContainerResult<_>>()?,
        };

        let mut instance = match &definition.factory_method {
            Some(method) => {
                tracing::trace!(
                    "Invoking factory method '{}' on class '{}' for bean '{}'",
                    method,
                    class.class_name(),
                    bean_name
                );
                class.invoke_factory_method(method, &resolved_args)?
            }
            None => class.instantiate(&resolved_args)?,
        };

        for (property, spec) in &definition.property_values {
            let value = resolve_property_value(spec, factory, environment)?;
            instance.set_property(property, value).map_err(|e| {
                ContainerError::BeanCreationFailed(format!(
                    "failed to populate property '{}' of bean '{}': {}",
                    property, bean_name, e
                ))
            })?;
        }

        Ok(instance.into_any())
    }
}
