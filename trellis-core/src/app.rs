use std::path::Path;
use std::sync::Arc;

use crate::config::{Environment, EnvironmentPropertySource, PropertySource, TomlPropertySource};
use crate::constants::{APPLICATION_NAME_KEY, DEFAULT_CONFIG_FILE, DEFAULT_ENV_PREFIX, SCAN_PACKAGE_KEY};
use crate::context::ApplicationContext;
use crate::error::{ApplicationError, ApplicationResult};
use crate::logging::LoggingConfig;
use crate::plugin::{load_plugins_into, ApplicationPlugin, PluginRegistry};
use crate::registry::TypeRegistry;

/// Trellis 应用程序
///
/// 提供便捷的应用启动方式
pub struct TrellisApplication {
    /// 应用名称
    name: String,

    /// 配置文件路径
    config_files: Vec<String>,

    /// 环境变量前缀
    env_prefix: String,

    /// 激活的 profiles
    profiles: Vec<String>,

    /// 是否显示 banner
    show_banner: bool,

    /// 日志配置，None 时从环境变量和配置文件推导
    logging_config: Option<LoggingConfig>,

    init_logging: bool,

    /// 代码中直接添加的配置源
    property_sources: Vec<Box<dyn PropertySource>>,

    /// 显式指定的类型注册表，None 时按 scanPackage 扫描全局注册表
    type_registry: Option<Arc<TypeRegistry>>,

    plugins: Vec<Box<dyn ApplicationPlugin>>,

    /// 是否加载通过 submit_plugin! 收集的插件
    inventory_plugins: bool,

    dependency_ordered_init: Option<bool>,
}

impl TrellisApplication {
    /// 创建新的应用
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_files: vec![DEFAULT_CONFIG_FILE.to_string()],
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            profiles: Vec::new(),
            show_banner: true,
            logging_config: None,
            init_logging: true,
            property_sources: Vec::new(),
            type_registry: None,
            plugins: Vec::new(),
            inventory_plugins: true,
            dependency_ordered_init: None,
        }
    }

    /// 设置配置文件路径
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_files = vec![path.into()];
        self
    }

    /// 添加多个配置文件
    pub fn config_files(mut self, paths: Vec<String>) -> Self {
        self.config_files = paths;
        self
    }

    /// 设置环境变量前缀
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// 设置激活的 profiles
    pub fn profiles(mut self, profiles: Vec<String>) -> Self {
        self.profiles = profiles;
        self
    }

    /// 设置是否显示 banner
    pub fn banner(mut self, show: bool) -> Self {
        self.show_banner = show;
        self
    }

    /// 设置日志配置
    ///
    /// 如果不设置，将使用默认配置（从环境变量和配置文件读取）
    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    /// 不初始化全局日志订阅器（由调用方自行安装）
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// 添加配置源
    pub fn property_source(mut self, source: Box<dyn PropertySource>) -> Self {
        self.property_sources.push(source);
        self
    }

    /// 使用显式的类型注册表
    pub fn type_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.type_registry = Some(registry);
        self
    }

    /// 添加插件，同名时优先于 submit_plugin! 收集的插件
    pub fn plugin(mut self, plugin: impl ApplicationPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// 设置是否加载全局收集的插件
    pub fn inventory_plugins(mut self, enabled: bool) -> Self {
        self.inventory_plugins = enabled;
        self
    }

    /// 按依赖顺序预实例化单例
    pub fn dependency_ordered_init(mut self, enabled: bool) -> Self {
        self.dependency_ordered_init = Some(enabled);
        self
    }

    /// 运行应用
    pub async fn run(self) -> ApplicationResult<RunningApplication> {
        let start_time = std::time::Instant::now();

        // 解析 active profiles
        // 优先级：代码设置 > 环境变量 APP_PROFILES_ACTIVE
        let mut active_profiles = self.profiles.clone();
        if active_profiles.is_empty() {
            if let Ok(profiles_str) = std::env::var(format!("{}PROFILES_ACTIVE", self.env_prefix)) {
                active_profiles = profiles_str
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
        }

        let environment = Arc::new(Environment::new());
        let loaded = self.load_configurations(&environment, &active_profiles)?;
        environment.add_property_source(Box::new(EnvironmentPropertySource::new(&self.env_prefix)));
        environment.set_active_profiles(active_profiles.clone());

        let TrellisApplication {
            name,
            show_banner,
            logging_config,
            init_logging,
            property_sources,
            type_registry,
            plugins,
            inventory_plugins,
            dependency_ordered_init,
            env_prefix,
            ..
        } = self;

        for source in property_sources {
            environment.add_property_source(source);
        }
        let name = environment.get_string(APPLICATION_NAME_KEY).unwrap_or(name);

        // 日志配置依赖 Environment，所以在配置加载后初始化
        if init_logging {
            logging_config
                .unwrap_or_else(LoggingConfig::from_env)
                .merge_environment(&environment)
                .init()?;
        }

        if show_banner {
            print_banner();
        }

        tracing::info!("Starting {} application", name);
        for (file, priority) in &loaded {
            tracing::info!("Loaded configuration from: {} (priority: {})", file, priority);
        }
        tracing::debug!("Environment variable prefix: {}", env_prefix);
        if active_profiles.is_empty() {
            tracing::info!("No active profiles set, using default configuration");
        } else {
            tracing::info!("Active profiles: {:?}", active_profiles);
        }

        let type_registry = match type_registry {
            Some(registry) => registry,
            None => {
                let package = environment.get_string(SCAN_PACKAGE_KEY).unwrap_or_default();
                tracing::info!("Scanning registered classes in package '{}'", package);
                Arc::new(TypeRegistry::scan(&package)?)
            }
        };
        tracing::debug!("Type registry holds {} class(es)", type_registry.len());

        let mut builder = ApplicationContext::builder()
            .type_registry(type_registry)
            .environment(Arc::clone(&environment))
            .app_name(name.clone());
        if let Some(enabled) = dependency_ordered_init {
            builder = builder.dependency_ordered_init(enabled);
        }
        let context = builder.build();

        let mut registry = PluginRegistry::new();
        for plugin in plugins {
            registry.register(plugin);
        }
        if inventory_plugins {
            load_plugins_into(&mut registry);
        } else {
            registry.sort_by_priority();
        }

        registry.configure_all(&context)?;
        context.refresh()?;
        registry.startup_all(&context).await?;

        tracing::info!("Started {} in {}ms", name, start_time.elapsed().as_millis());

        Ok(RunningApplication {
            context,
            plugins: registry,
        })
    }

    /// 加载配置文件
    ///
    /// 加载顺序（优先级从低到高）：
    /// 1. application.toml (default)
    /// 2. application-{profile}.toml (profile specific)
    fn load_configurations(
        &self,
        environment: &Environment,
        active_profiles: &[String],
    ) -> ApplicationResult<Vec<(String, i32)>> {
        let mut loaded = Vec::new();

        for base_config in &self.config_files {
            if try_load_config_file(environment, base_config, 0)? {
                loaded.push((base_config.clone(), 0));
            }
        }

        for (index, profile) in active_profiles.iter().enumerate() {
            for base_config in &self.config_files {
                let profile_config = profile_config_path(base_config, profile);
                let priority = 10 + index as i32;
                if try_load_config_file(environment, &profile_config, priority)? {
                    loaded.push((profile_config, priority));
                }
            }
        }

        Ok(loaded)
    }
}

impl Default for TrellisApplication {
    fn default() -> Self {
        Self::new("TrellisApplication")
    }
}

/// 获取 profile 配置文件路径
///
/// 例如：application.toml -> application-dev.toml
fn profile_config_path(base_path: &str, profile: &str) -> String {
    if let Some(dot_pos) = base_path.rfind('.') {
        let (name, ext) = base_path.split_at(dot_pos);
        format!("{}-{}{}", name, profile, ext)
    } else {
        format!("{}-{}", base_path, profile)
    }
}

/// 文件不存在时跳过，存在但无法解析时报错
fn try_load_config_file(
    environment: &Environment,
    config_file: &str,
    priority: i32,
) -> ApplicationResult<bool> {
    if !Path::new(config_file).exists() {
        return Ok(false);
    }
    let source = TomlPropertySource::from_file(config_file)
        .map_err(|e| ApplicationError::ConfigLoadFailed(e.to_string()))?;
    environment.add_property_source(Box::new(source.with_priority(priority)));
    Ok(true)
}

fn print_banner() {
    println!();
    println!(r"  _            _ _ _     ");
    println!(r" | |_ _ _ ___ | | (_)___ ");
    println!(r" |  _| '_/ -_)| | | (_-< ");
    println!(r"  \__|_| \___||_|_|_/__/ ");
    println!();
    println!("  :: Trellis ::        (v{})", env!("CARGO_PKG_VERSION"));
    println!();
}

/// 已启动的应用
pub struct RunningApplication {
    context: Arc<ApplicationContext>,
    plugins: PluginRegistry,
}

impl RunningApplication {
    pub fn context(&self) -> &Arc<ApplicationContext> {
        &self.context
    }

    /// 先逆序关闭插件，再关闭上下文
    pub async fn shutdown(self) -> ApplicationResult<()> {
        self.plugins.shutdown_all(&self.context).await;
        self.context.shutdown()?;
        Ok(())
    }
}
