// trellis-core: 轻量级 IoC 容器
//
// 提供基于元数据的依赖注入功能，支持：
// - 通过 ClassBuilder / inventory 注册类型元数据
// - 单例 Bean 缓存（按工厂名和类名）
// - 字段注入（Autowired）
// - BeanPostProcessor 扩展点（AOP 代理在此接入）
// - 配置源、插件与应用启动器

pub mod app;
pub mod bean;
pub mod bean_factory;
pub mod bean_post_processor;
pub mod class;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod logging;
pub mod plugin;
pub mod reader;
pub mod registry;
pub mod utils;

// 重新导出常用类型
pub use app::{RunningApplication, TrellisApplication};
pub use bean::{
    invoke_object_method, is_object_method, Autowired, BeanDefinition, BeanObject, BeanRef,
    BeanWrapper, PlainBean,
};
pub use bean_factory::{
    BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
    DefaultListableBeanFactory, ListableBeanFactory,
};
pub use bean_post_processor::BeanPostProcessor;
pub use class::{
    downcast_value, type_key, Arguments, ClassBuilder, ClassMetadata, ContractMetadata,
    FieldMetadata, Instance, InvocationError, MethodMetadata, MethodResult, Value, Visibility,
};
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use constants::*;
pub use context::{ApplicationContext, ApplicationContextBuilder, Container, ShutdownHook};
pub use error::{ApplicationError, ApplicationResult, ContainerError, ContainerResult};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use reader::BeanDefinitionReader;
pub use registry::{ClassRegistration, TypeRegistry};

// 导出 async_trait 和 inventory，供宏使用
pub use async_trait;
pub use inventory;

// 导出插件相关
pub use plugin::{load_plugins, ApplicationPlugin, PluginRegistry, PluginSubmission};

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::app::{RunningApplication, TrellisApplication};
    pub use crate::bean::{Autowired, BeanDefinition, BeanObject, BeanRef, PlainBean};
    pub use crate::bean_factory::{
        BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
        DefaultListableBeanFactory, ListableBeanFactory,
    };
    pub use crate::bean_post_processor::BeanPostProcessor;
    pub use crate::class::{Arguments, ClassBuilder, ClassMetadata};
    pub use crate::config::{
        self, ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource,
        PropertySource, TomlPropertySource,
    };
    pub use crate::context::{ApplicationContext, Container};
    pub use crate::error::{ApplicationError, ApplicationResult, ContainerError, ContainerResult};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::plugin::{load_plugins, ApplicationPlugin, PluginRegistry};
    pub use crate::registry::TypeRegistry;
    pub use crate::{args, submit_class, submit_plugin};
    pub use anyhow::{anyhow, Context};
}
