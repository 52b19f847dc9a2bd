// wisteria-core: 声明式对象容器
//
// 提供以定义为中心的对象装配能力，支持：
// - 单例和原型作用域
// - 父子定义合并（模板继承）
// - FactoryBean 间接构造与 '&' 解引用
// - 生命周期管理（init/destroy 回调、后置处理器）
// - 配置占位符注入

pub mod bean;
pub mod bean_factory;
pub mod class;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod scope;

// 重新导出常用类型
pub use bean::{
    arc_of, factory_bean_value, value_of, BeanDefinition, DynValue, FactoryBean, PropertyValue,
    RootBeanDefinition,
};
pub use bean_factory::{
    BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
    DefaultListableBeanFactory, ListableBeanFactory, FACTORY_BEAN_PREFIX,
};
pub use class::{
    BeanClass, DefaultInstanceBuilder, InstanceBuilder, PropertyAccess, SimpleBeanClass,
};
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use error::{ContainerError, ContainerResult};
pub use lifecycle::BeanPostProcessor;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use scope::Scope;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::bean::{
        arc_of, factory_bean_value, value_of, BeanDefinition, DynValue, FactoryBean, PropertyValue,
    };
    pub use crate::bean_factory::{
        BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
        DefaultListableBeanFactory, ListableBeanFactory,
    };
    pub use crate::class::{BeanClass, InstanceBuilder, PropertyAccess, SimpleBeanClass};
    pub use crate::config::{
        self, ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource,
        PropertySource, TomlPropertySource,
    };
    pub use crate::error::{ContainerError, ContainerResult};
    pub use crate::lifecycle::BeanPostProcessor;
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::scope::Scope;
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
