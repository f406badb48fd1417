//! 配置键常量
//!
//! 容器与 AOP 模块读取的所有配置键都定义在这里，避免在各处硬编码字符串。

/// 组件扫描的包（模块路径前缀），例如 `demo.service` 或 `demo::service`
pub const SCAN_PACKAGE_KEY: &str = "scanPackage";

/// 切点表达式
pub const POINT_CUT_KEY: &str = "pointCut";

/// 切面类名
pub const ASPECT_CLASS_KEY: &str = "aspectClass";

/// 前置通知方法名
pub const ASPECT_BEFORE_KEY: &str = "aspectBefore";

/// 返回后通知方法名
pub const ASPECT_AFTER_KEY: &str = "aspectAfter";

/// 异常通知方法名
pub const ASPECT_AFTER_THROW_KEY: &str = "aspectAfterThrow";

/// 异常通知关注的异常类型名（仅携带，不参与过滤）
pub const ASPECT_AFTER_THROWING_NAME_KEY: &str = "aspectAfterThrowingName";

/// 视图模板根目录，由外部 Web 层使用
pub const TEMPLATE_ROOT_KEY: &str = "templateRoot";

/// 按依赖顺序预实例化单例
pub const DEPENDENCY_ORDERED_INIT_KEY: &str = "trellis.dependencyOrderedInit";

/// 应用名称
pub const APPLICATION_NAME_KEY: &str = "trellis.application.name";

/// 日志配置
pub const LOGGING_LEVEL_KEY: &str = "logging.level";
pub const LOGGING_FORMAT_KEY: &str = "logging.format";
pub const LOGGING_FILTER_KEY: &str = "logging.filter";

/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "application.toml";

/// 默认环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "APP_";
