//! Bean 定义模型
//!
//! 声明式地描述一个 Bean 如何被构建：目标类型、作用域、构造参数、
//! 属性赋值、父定义引用等。定义支持父子继承，合并后的
//! [`RootBeanDefinition`] 是不再含 parent 引用的扁平形态。

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::class::BeanClass;
use crate::error::{ContainerError, ContainerResult};
use crate::Scope;

/// 容器内通用的类型擦除值
pub type DynValue = Arc<dyn Any + Send + Sync>;

/// 生命周期回调类型
pub type InitCallback = Arc<dyn Fn(&mut (dyn Any + Send + Sync)) -> ContainerResult<()> + Send + Sync>;
pub type DestroyCallback = Arc<dyn Fn(&mut (dyn Any + Send + Sync)) -> ContainerResult<()> + Send + Sync>;

/// 值或引用：构造参数与属性赋值的声明形式
///
/// `Ref` 在实例化时通过容器递归解析为真实 Bean，
/// `Placeholder` 形如 `${key}` 或 `${key:default}`，由 Environment 解析为字符串。
#[derive(Clone)]
pub enum PropertyValue {
    /// 直接给定的值
    Value(DynValue),

    /// 引用另一个 Bean（按名称）
    Ref(String),

    /// 占位符表达式，对 Environment 求值
    Placeholder(String),
}

impl PropertyValue {
    /// 从一个具体值构造
    pub fn of<T: Any + Send + Sync>(value: T) -> Self {
        PropertyValue::Value(Arc::new(value))
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Value(_) => write!(f, "Value(..)"),
            PropertyValue::Ref(name) => write!(f, "Ref({})", name),
            PropertyValue::Placeholder(expr) => write!(f, "Placeholder({})", expr),
        }
    }
}

/// 从类型擦除值中取出一个克隆出来的具体值
pub fn value_of<T: Any + Clone>(value: &DynValue) -> ContainerResult<T> {
    value
        .as_ref()
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| ContainerError::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            found: "unknown".to_string(),
        })
}

/// 将类型擦除值转换为 `Arc<T>`（共享所有权，不克隆内容）
pub fn arc_of<T: Any + Send + Sync>(value: &DynValue) -> ContainerResult<Arc<T>> {
    Arc::clone(value)
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            found: "unknown".to_string(),
        })
}

/// FactoryBean - 本身是 Bean、产物才是调用者真正想要对象的工厂
///
/// 注册进容器的 FactoryBean 以 `Arc<dyn FactoryBean>` 的形态擦除，
/// 这样容器在返回实例时能识别它并调用 `get_object`。
/// 名称带 `&` 前缀时返回工厂本身而非产物。
pub trait FactoryBean: Send + Sync {
    /// 产出对象。返回 `None` 表示由于循环引用尚未完成初始化，
    /// 容器会将其报告为 `FactoryBeanCircularReference`。
    fn get_object(&self) -> ContainerResult<Option<DynValue>>;

    /// 产物是否是单例
    fn is_singleton(&self) -> bool {
        true
    }
}

/// 将 FactoryBean 擦除为可注册进容器的值
pub fn factory_bean_value(factory: Arc<dyn FactoryBean>) -> DynValue {
    Arc::new(factory)
}

/// Bean 定义 - 描述如何创建和管理 Bean 的声明式记录
///
/// `scope`/`lazy` 使用 `Option` 区分“显式设置”和“继承父定义”，
/// 合并时只有显式设置的属性才会覆盖父定义。
#[derive(Clone, Default)]
pub struct BeanDefinition {
    /// 目标类型能力（抽象模板定义可以没有）
    pub class: Option<Arc<dyn BeanClass>>,

    /// 作用域，未设置时继承父定义，最终默认 Singleton
    pub scope: Option<Scope>,

    /// 是否延迟初始化（仅对单例有效）
    pub lazy: Option<bool>,

    /// 抽象定义仅作为模板，不可实例化
    pub abstract_bean: bool,

    /// 父定义名称（继承链）
    pub parent: Option<String>,

    /// 具名工厂方法，设置后用它代替默认构造
    pub factory_method: Option<String>,

    /// 构造参数，按序号索引；合并时子定义按相同序号覆盖
    pub constructor_args: BTreeMap<usize, PropertyValue>,

    /// 属性赋值，按属性名索引；合并时子定义按相同键覆盖
    pub property_values: BTreeMap<String, PropertyValue>,

    /// 初始化回调
    pub init_callback: Option<InitCallback>,

    /// 销毁回调
    pub destroy_callback: Option<DestroyCallback>,
}

impl BeanDefinition {
    /// 创建指向给定类型能力的定义
    pub fn new(class: Arc<dyn BeanClass>) -> Self {
        Self {
            class: Some(class),
            ..Default::default()
        }
    }

    /// 创建一个子定义，属性从父定义继承
    pub fn child_of(parent: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Default::default()
        }
    }

    /// 设置作用域
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// 设置延迟初始化
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = Some(lazy);
        self
    }

    /// 标记为抽象模板定义
    pub fn with_abstract(mut self, abstract_bean: bool) -> Self {
        self.abstract_bean = abstract_bean;
        self
    }

    /// 设置工厂方法名称
    pub fn with_factory_method(mut self, method: impl Into<String>) -> Self {
        self.factory_method = Some(method.into());
        self
    }

    /// 追加一个构造参数
    pub fn with_constructor_arg(mut self, index: usize, value: PropertyValue) -> Self {
        self.constructor_args.insert(index, value);
        self
    }

    /// 追加一个属性赋值
    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.property_values.insert(name.into(), value);
        self
    }

    /// 设置初始化回调
    pub fn with_init<F>(mut self, init_fn: F) -> Self
    where
        F: Fn(&mut (dyn Any + Send + Sync)) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.init_callback = Some(Arc::new(init_fn));
        self
    }

    /// 设置销毁回调
    pub fn with_destroy<F>(mut self, destroy_fn: F) -> Self
    where
        F: Fn(&mut (dyn Any + Send + Sync)) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.destroy_callback = Some(Arc::new(destroy_fn));
        self
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("class", &self.class.as_ref().map(|c| c.class_name().to_string()))
            .field("scope", &self.scope)
            .field("lazy", &self.lazy)
            .field("abstract", &self.abstract_bean)
            .field("parent", &self.parent)
            .field("factory_method", &self.factory_method)
            .field("constructor_args", &self.constructor_args)
            .field("property_values", &self.property_values)
            .finish()
    }
}

/// 合并后的根定义 - 不含 parent 引用的扁平形态
///
/// 由祖先链自根向叶合并产生：子定义显式设置的标量属性覆盖父定义，
/// 构造参数/属性映射按键取并集且子定义优先。一旦合并完成即不可变。
#[derive(Clone)]
pub struct RootBeanDefinition {
    pub class: Option<Arc<dyn BeanClass>>,
    pub scope: Scope,
    pub lazy: bool,
    pub abstract_bean: bool,
    pub factory_method: Option<String>,
    pub constructor_args: BTreeMap<usize, PropertyValue>,
    pub property_values: BTreeMap<String, PropertyValue>,
    pub init_callback: Option<InitCallback>,
    pub destroy_callback: Option<DestroyCallback>,
}

impl RootBeanDefinition {
    /// 将一个没有 parent 的定义物化为根定义（防御性拷贝）
    pub fn from_definition(bd: &BeanDefinition) -> Self {
        Self {
            class: bd.class.clone(),
            scope: bd.scope.unwrap_or_default(),
            lazy: bd.lazy.unwrap_or(false),
            abstract_bean: bd.abstract_bean,
            factory_method: bd.factory_method.clone(),
            constructor_args: bd.constructor_args.clone(),
            property_values: bd.property_values.clone(),
            init_callback: bd.init_callback.clone(),
            destroy_callback: bd.destroy_callback.clone(),
        }
    }

    /// 用子定义中显式设置的属性覆盖当前（已解析的父）定义
    ///
    /// 标量属性仅在子定义设置时替换；构造参数、属性映射合并，
    /// 键冲突时子定义优先，未冲突的父条目保留。
    /// abstract 标志始终取子定义的值：抽象模板的具体子定义必须可实例化。
    pub fn override_from(&mut self, child: &BeanDefinition) {
        if let Some(class) = &child.class {
            self.class = Some(Arc::clone(class));
        }
        if let Some(scope) = child.scope {
            self.scope = scope;
        }
        if let Some(lazy) = child.lazy {
            self.lazy = lazy;
        }
        self.abstract_bean = child.abstract_bean;
        if let Some(method) = &child.factory_method {
            self.factory_method = Some(method.clone());
        }
        for (index, value) in &child.constructor_args {
            self.constructor_args.insert(*index, value.clone());
        }
        for (name, value) in &child.property_values {
            self.property_values.insert(name.clone(), value.clone());
        }
        if let Some(init) = &child.init_callback {
            self.init_callback = Some(Arc::clone(init));
        }
        if let Some(destroy) = &child.destroy_callback {
            self.destroy_callback = Some(Arc::clone(destroy));
        }
    }
}

impl fmt::Debug for RootBeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootBeanDefinition")
            .field("class", &self.class.as_ref().map(|c| c.class_name().to_string()))
            .field("scope", &self.scope)
            .field("lazy", &self.lazy)
            .field("abstract", &self.abstract_bean)
            .field("factory_method", &self.factory_method)
            .field("constructor_args", &self.constructor_args)
            .field("property_values", &self.property_values)
            .finish()
    }
}
