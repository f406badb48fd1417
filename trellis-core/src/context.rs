use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bean::{BeanDefinition, BeanRef};
use crate::bean_factory::{
    BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
    DefaultListableBeanFactory, ListableBeanFactory,
};
use crate::bean_post_processor::BeanPostProcessor;
use crate::config::{Environment, PropertySource};
use crate::constants::{DEPENDENCY_ORDERED_INIT_KEY, SCAN_PACKAGE_KEY};
use crate::error::{ContainerError, ContainerResult};
use crate::reader::BeanDefinitionReader;
use crate::registry::TypeRegistry;

/// Shutdown hook类型
pub type ShutdownHook = Box<dyn Fn() -> ContainerResult<()> + Send + Sync>;

/// 容器 trait - 定义依赖注入容器的核心接口
pub trait Container: Send + Sync {
    /// 注册 Bean 定义
    fn register(&self, definition: BeanDefinition) -> ContainerResult<()>;

    /// 通过名称获取 Bean
    fn get_bean(&self, name: &str) -> ContainerResult<BeanRef>;

    /// 通过类型获取 Bean
    fn get_bean_by_type<T: ?Sized + 'static>(&self) -> ContainerResult<BeanRef>;

    /// 检查是否包含指定名称的 Bean
    fn contains_bean(&self, name: &str) -> bool;

    /// 获取所有 Bean 的名称（注册顺序）
    fn get_bean_names(&self) -> Vec<String>;
}

/// 应用上下文 - Container 的默认实现
///
/// 持有 BeanFactory、类型注册表和 Environment，负责一次性的启动流程：
/// 读取 Bean 定义、注册、预实例化单例。
pub struct ApplicationContext {
    /// Bean 工厂 - 负责 Bean 的创建和管理
    bean_factory: Arc<DefaultListableBeanFactory>,

    /// 类型元数据
    type_registry: Arc<TypeRegistry>,

    /// 配置环境
    environment: Arc<Environment>,

    /// Shutdown hooks
    shutdown_hooks: RwLock<Vec<ShutdownHook>>,

    /// 应用名称
    app_name: RwLock<Option<String>>,

    /// 构建时显式指定的预实例化顺序，None 时读取配置
    dependency_ordered_init: Option<bool>,

    /// refresh 已开始，防止重入
    refreshed: AtomicBool,

    /// refresh 成功完成后才置位
    active: AtomicBool,

    closed: AtomicBool,
}

impl std::fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("app_name", &*self.app_name.read())
            .field("classes", &self.type_registry.len())
            .field("definitions", &self.bean_factory.get_bean_definition_count())
            .field("active", &self.is_active())
            .finish()
    }
}

impl ApplicationContext {
    /// 使用给定的类型注册表和空的 Environment 创建上下文
    pub fn new(type_registry: Arc<TypeRegistry>) -> Self {
        Self::with_environment(type_registry, Arc::new(Environment::new()))
    }

    pub fn with_environment(type_registry: Arc<TypeRegistry>, environment: Arc<Environment>) -> Self {
        Self {
            bean_factory: Arc::new(DefaultListableBeanFactory::new(Arc::clone(&type_registry))),
            type_registry,
            environment,
            shutdown_hooks: RwLock::new(Vec::new()),
            app_name: RwLock::new(None),
            dependency_ordered_init: None,
            refreshed: AtomicBool::new(false),
            active: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    /// 获取内部的 BeanFactory
    pub fn get_bean_factory(&self) -> &Arc<DefaultListableBeanFactory> {
        &self.bean_factory
    }

    pub fn type_registry(&self) -> &Arc<TypeRegistry> {
        &self.type_registry
    }

    /// 获取 Environment
    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// 设置应用名称
    pub fn set_app_name(&self, name: impl Into<String>) {
        *self.app_name.write() = Some(name.into());
    }

    /// 获取应用名称
    pub fn get_app_name(&self) -> Option<String> {
        self.app_name.read().clone()
    }

    /// 已完成 refresh 且尚未关闭
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && !self.closed.load(Ordering::Acquire)
    }

    /// 注册 BeanPostProcessor，按 order 顺序执行
    pub fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        self.bean_factory.add_bean_post_processor(processor);
    }

    /// 批量注册 Bean 定义，名称冲突时整批都不注册
    pub fn register_bean_definitions(&self, definitions: Vec<BeanDefinition>) -> ContainerResult<()> {
        self.bean_factory.register_bean_definitions(definitions)
    }

    /// 按注册顺序返回所有 Bean 定义名称
    pub fn get_bean_definition_names(&self) -> Vec<String> {
        self.bean_factory.get_bean_definition_names()
    }

    /// 按注册顺序预实例化所有非延迟单例
    pub fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        self.bean_factory.preinstantiate_singletons()
    }

    fn use_dependency_order(&self) -> bool {
        self.dependency_ordered_init
            .unwrap_or_else(|| self.environment.get_bool_or(DEPENDENCY_ORDERED_INIT_KEY, false))
    }

    /// 启动容器：读取组件、注册 Bean 定义、预实例化单例
    ///
    /// 只能调用一次。名称冲突、Bean 创建失败都会中止启动。
    pub fn refresh(&self) -> ContainerResult<()> {
        if self.refreshed.swap(true, Ordering::AcqRel) {
            return Err(ContainerError::Config(
                "Application context has already been refreshed".to_string(),
            ));
        }

        tracing::info!("Refreshing application context");

        let mut reader = BeanDefinitionReader::new(&self.type_registry);
        if let Some(package) = self.environment.get_string(SCAN_PACKAGE_KEY) {
            tracing::debug!("Loading bean definitions from package '{}'", package);
            reader = reader.with_scan_package(package);
        }
        let definitions = reader.load_bean_definitions();
        tracing::info!("Found {} bean definition(s)", definitions.len());

        self.register_bean_definitions(definitions)?;

        if self.use_dependency_order() {
            tracing::debug!("Pre-instantiating singletons in dependency order");
            self.bean_factory.preinstantiate_singletons_in_dependency_order()?;
        } else {
            self.bean_factory.preinstantiate_singletons()?;
        }
        self.active.store(true, Ordering::Release);

        tracing::info!(
            "Application context refreshed, {} singleton key(s) cached",
            self.bean_factory.singleton_count()
        );
        Ok(())
    }

    /// 关闭后的上下文不再创建 Bean
    fn ensure_open(&self) -> ContainerResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ContainerError::Config(
                "Application context has been closed".to_string(),
            ));
        }
        Ok(())
    }

    /// 注册 shutdown hook，关闭时按注册顺序执行
    pub fn register_shutdown_hook<F>(&self, hook: F)
    where
        F: Fn() -> ContainerResult<()> + Send + Sync + 'static,
    {
        let mut hooks = self.shutdown_hooks.write();
        hooks.push(Box::new(hook));
        tracing::debug!("Registered shutdown hook, total: {}", hooks.len());
    }

    /// 执行 shutdown hooks 并清空单例缓存
    pub fn shutdown(&self) -> ContainerResult<()> {
        tracing::info!("Starting application shutdown");

        {
            let hooks = self.shutdown_hooks.read();
            tracing::info!("Executing {} shutdown hook(s)", hooks.len());
            for (idx, hook) in hooks.iter().enumerate() {
                match hook() {
                    Ok(_) => tracing::debug!("Shutdown hook {} executed successfully", idx + 1),
                    Err(e) => tracing::warn!("Shutdown hook {} failed: {}", idx + 1, e),
                }
            }
        }

        self.active.store(false, Ordering::Release);
        self.closed.store(true, Ordering::Release);
        self.bean_factory.destroy_singletons()?;

        tracing::info!("Application shutdown complete");
        Ok(())
    }
}

impl Container for ApplicationContext {
    fn register(&self, definition: BeanDefinition) -> ContainerResult<()> {
        self.bean_factory.register_bean_definition(definition)
    }

    fn get_bean(&self, name: &str) -> ContainerResult<BeanRef> {
        self.ensure_open()?;
        self.bean_factory.get_bean(name)
    }

    fn get_bean_by_type<T: ?Sized + 'static>(&self) -> ContainerResult<BeanRef> {
        self.ensure_open()?;
        self.bean_factory.get_bean_by_type::<T>()
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.bean_factory.contains_bean(name)
    }

    fn get_bean_names(&self) -> Vec<String> {
        self.bean_factory.get_bean_definition_names()
    }
}

/// 应用上下文构建器
pub struct ApplicationContextBuilder {
    type_registry: Option<Arc<TypeRegistry>>,
    environment: Arc<Environment>,
    dependency_ordered_init: Option<bool>,
    app_name: Option<String>,
}

impl ApplicationContextBuilder {
    pub fn new() -> Self {
        Self {
            type_registry: None,
            environment: Arc::new(Environment::new()),
            dependency_ordered_init: None,
            app_name: None,
        }
    }

    pub fn type_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.type_registry = Some(registry);
        self
    }

    /// 使用已有的 Environment（替换默认的空 Environment）
    pub fn environment(mut self, environment: Arc<Environment>) -> Self {
        self.environment = environment;
        self
    }

    /// 添加配置源到 Environment
    pub fn add_property_source(self, source: Box<dyn PropertySource>) -> Self {
        self.environment.add_property_source(source);
        self
    }

    /// 设置激活的 profiles
    pub fn set_active_profiles(self, profiles: Vec<String>) -> Self {
        self.environment.set_active_profiles(profiles);
        self
    }

    /// 按依赖顺序预实例化（覆盖配置项）
    pub fn dependency_ordered_init(mut self, enabled: bool) -> Self {
        self.dependency_ordered_init = Some(enabled);
        self
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// 构建上下文
    pub fn build(self) -> Arc<ApplicationContext> {
        let registry = self.type_registry.unwrap_or_default();
        let mut context = ApplicationContext::with_environment(registry, self.environment);
        context.dependency_ordered_init = self.dependency_ordered_init;
        if let Some(name) = self.app_name {
            context.set_app_name(name);
        }
        Arc::new(context)
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::Autowired;
    use crate::class::ClassMetadata;
    use crate::config::MapPropertySource;
    use crate::{args, ClassBuilder};
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Clock;

    #[derive(Default)]
    struct Scheduler {
        clock: Autowired,
    }

    fn clock_class() -> ClassMetadata {
        ClassBuilder::<Clock>::named("app::infra::Clock")
            .component()
            .default_constructor()
            .method0("now", |_c: &Clock| Ok(1_700_000_000u64))
            .build()
    }

    fn scheduler_class() -> ClassMetadata {
        ClassBuilder::<Scheduler>::named("app::jobs::Scheduler")
            .component()
            .default_constructor()
            .autowired("clock", "app::infra::Clock", |s: &Scheduler| &s.clock)
            .method0("next_run", |s: &Scheduler| {
                let now = s.clock.require()?.call::<u64>("now", args![])?;
                Ok(now + 60)
            })
            .build()
    }

    fn registry(classes: Vec<ClassMetadata>) -> Arc<TypeRegistry> {
        Arc::new(TypeRegistry::new().with_classes(classes).unwrap())
    }

    #[test]
    fn test_refresh_registers_and_instantiates() {
        let context = ApplicationContext::builder()
            .type_registry(registry(vec![clock_class(), scheduler_class()]))
            .app_name("scheduler-test")
            .build();

        context.refresh().unwrap();

        assert!(context.is_active());
        assert_eq!(context.get_bean_definition_names(), vec!["clock", "scheduler"]);
        let scheduler = context.get_bean("scheduler").unwrap();
        assert_eq!(scheduler.call::<u64>("next_run", args![]).unwrap(), 1_700_000_060);
        assert_eq!(context.get_app_name().as_deref(), Some("scheduler-test"));
    }

    #[test]
    fn test_refresh_honours_scan_package() {
        let context = ApplicationContext::builder()
            .type_registry(registry(vec![clock_class(), scheduler_class()]))
            .add_property_source(Box::new(
                MapPropertySource::new("test").with_property(SCAN_PACKAGE_KEY, "app.infra"),
            ))
            .build();

        context.refresh().unwrap();
        assert_eq!(context.get_bean_names(), vec!["clock"]);
        assert!(!context.contains_bean("scheduler"));
    }

    #[test]
    fn test_dependency_order_from_configuration() {
        let context = ApplicationContext::builder()
            .type_registry(registry(vec![scheduler_class(), clock_class()]))
            .add_property_source(Box::new(
                MapPropertySource::new("test").with_property(DEPENDENCY_ORDERED_INIT_KEY, true),
            ))
            .build();

        context.refresh().unwrap();
        let scheduler = context.get_bean("scheduler").unwrap();
        assert!(scheduler.call::<u64>("next_run", args![]).is_ok());
    }

    #[test]
    fn test_simple_name_clash_aborts_refresh() {
        struct OtherClock;
        let clash = ClassBuilder::<OtherClock>::named("app::legacy::Clock")
            .component()
            .constructor(|| Ok(OtherClock))
            .build();
        let context = ApplicationContext::builder()
            .type_registry(registry(vec![clock_class(), clash]))
            .build();

        assert!(matches!(
            context.refresh(),
            Err(ContainerError::BeanAlreadyExists(name)) if name == "clock"
        ));
        assert!(context.get_bean_names().is_empty());
    }

    #[test]
    fn test_failed_refresh_leaves_context_inactive() {
        struct OtherClock;
        let clash = ClassBuilder::<OtherClock>::named("app::legacy::Clock")
            .component()
            .constructor(|| Ok(OtherClock))
            .build();
        let context = ApplicationContext::new(registry(vec![clock_class(), clash]));

        assert!(context.refresh().is_err());
        assert!(!context.is_active());
        assert!(matches!(context.refresh(), Err(ContainerError::Config(_))));
        assert!(!context.is_active());
    }

    #[test]
    fn test_failed_startup_leaves_context_inactive() {
        struct Broken;
        let broken = ClassBuilder::<Broken>::named("app::infra::Broken")
            .component()
            .constructor(|| -> anyhow::Result<Broken> { Err(anyhow::anyhow!("no database")) })
            .build();
        let context = ApplicationContext::new(registry(vec![clock_class(), broken]));

        assert!(matches!(context.refresh(), Err(ContainerError::StartupFailed(_))));
        assert!(!context.is_active());
    }

    #[test]
    fn test_refresh_only_once() {
        let context = ApplicationContext::new(registry(vec![clock_class()]));
        context.refresh().unwrap();
        assert!(matches!(context.refresh(), Err(ContainerError::Config(_))));
    }

    #[test]
    fn test_shutdown_runs_hooks_and_clears_cache() {
        let context = ApplicationContext::new(registry(vec![clock_class()]));
        context.refresh().unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        context.register_shutdown_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        context.register_shutdown_hook(|| Err(ContainerError::Config("flaky hook".to_string())));

        context.shutdown().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(context.get_bean_factory().singleton_count(), 0);
        assert!(!context.is_active());
    }

    #[test]
    fn test_get_bean_after_shutdown_fails() {
        let context = ApplicationContext::new(registry(vec![clock_class()]));
        context.refresh().unwrap();
        context.shutdown().unwrap();

        assert!(matches!(context.get_bean("clock"), Err(ContainerError::Config(_))));
        assert!(matches!(
            Container::get_bean_by_type::<Clock>(&context),
            Err(ContainerError::Config(_))
        ));
        assert_eq!(context.get_bean_factory().singleton_count(), 0);
    }

    #[test]
    fn test_get_bean_by_type_through_container() {
        let context = ApplicationContext::new(registry(vec![ClassBuilder::<Clock>::new()
            .component()
            .default_constructor()
            .build()]));
        context.refresh().unwrap();
        let clock = Container::get_bean_by_type::<Clock>(&context).unwrap();
        assert!(clock.target_as::<Clock>().is_some());
    }
}
