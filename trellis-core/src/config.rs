use std::collections::HashMap;
use std::fs;
use std::path::Path;

use parking_lot::RwLock;

use crate::error::{ContainerError, ContainerResult};

/// 配置值类型
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    /// 转换为字符串
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 转换为整数
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 转换为布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// 标量值的文本形式，数组和表返回 None
    pub fn to_text(&self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Int(i) => Some(i.to_string()),
            ConfigValue::Float(f) => Some(f.to_string()),
            ConfigValue::Bool(b) => Some(b.to_string()),
            ConfigValue::Array(_) | ConfigValue::Object(_) => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

/// 配置源 trait
pub trait PropertySource: Send + Sync {
    /// 获取配置源名称
    fn name(&self) -> &str;

    /// 获取配置值
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// 获取所有配置键
    fn keys(&self) -> Vec<String>;

    /// 配置源优先级（数字越大优先级越高）
    fn priority(&self) -> i32 {
        0
    }
}

/// Environment - 配置管理器
///
/// 按优先级从高到低查询所有配置源，第一个命中的值生效。
pub struct Environment {
    /// 配置源列表（按优先级排序）
    sources: RwLock<Vec<Box<dyn PropertySource>>>,

    /// 当前激活的 profile
    active_profiles: RwLock<Vec<String>>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<String> = self
            .sources
            .read()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        f.debug_struct("Environment")
            .field("active_profiles", &*self.active_profiles.read())
            .field("sources", &sources)
            .finish()
    }
}

impl Environment {
    /// 创建新的环境
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
            active_profiles: RwLock::new(Vec::new()),
        }
    }

    /// 添加配置源
    pub fn add_property_source(&self, source: Box<dyn PropertySource>) {
        tracing::debug!(
            "Adding property source '{}' (priority {})",
            source.name(),
            source.priority()
        );
        let mut sources = self.sources.write();
        sources.push(source);
        // 按优先级降序排序，同优先级保持添加顺序
        sources.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// 获取配置值
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        let sources = self.sources.read();
        for source in sources.iter() {
            if let Some(value) = source.get(key) {
                tracing::trace!("Config '{}' found in source '{}'", key, source.name());
                return Some(value);
            }
        }
        tracing::trace!("Config '{}' not found in any source", key);
        None
    }

    pub fn contains_property(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 获取字符串配置，空白字符串视为未配置
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(|v| v.to_text())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// 获取字符串配置（带默认值）
    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    /// 获取整数配置
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// 获取布尔值配置
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// 获取布尔值配置（带默认值）
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// 设置激活的 profile
    pub fn set_active_profiles(&self, profiles: Vec<String>) {
        *self.active_profiles.write() = profiles;
    }

    /// 获取激活的 profile
    pub fn get_active_profiles(&self) -> Vec<String> {
        self.active_profiles.read().clone()
    }

    /// 检查是否包含指定的 profile
    pub fn accepts_profiles(&self, profile: &str) -> bool {
        self.active_profiles.read().iter().any(|p| p == profile)
    }

    /// 所有配置源的名称（按优先级）
    pub fn property_source_names(&self) -> Vec<String> {
        self.sources.read().iter().map(|s| s.name().to_string()).collect()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// ========== Property Sources ==========

/// 环境变量配置源
pub struct EnvironmentPropertySource {
    prefix: String,
    priority: i32,
}

impl EnvironmentPropertySource {
    /// 创建环境变量配置源
    ///
    /// # 参数
    /// * `prefix` - 环境变量前缀，例如 "APP_"
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            priority: 100,
        }
    }

    /// 将环境变量名转换为配置键
    /// 例如: APP_SERVER_PORT -> server.port
    fn env_to_key(&self, env_key: &str) -> String {
        let stripped = env_key.strip_prefix(&self.prefix).unwrap_or(env_key);
        stripped.to_lowercase().replace('_', ".")
    }

    /// 将配置键转换为环境变量名
    /// 例如: server.port -> APP_SERVER_PORT, pointCut -> APP_POINTCUT
    fn key_to_env(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.replace('.', "_").to_uppercase())
    }
}

impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        std::env::var(self.key_to_env(key)).ok().map(ConfigValue::String)
    }

    fn keys(&self) -> Vec<String> {
        std::env::vars()
            .filter(|(k, _)| k.starts_with(&self.prefix))
            .map(|(k, _)| self.env_to_key(&k))
            .collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// TOML 文件配置源
pub struct TomlPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl TomlPropertySource {
    /// 从文件加载 TOML 配置
    pub fn from_file(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ContainerError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse(&content, path.to_string_lossy())
    }

    /// 从字符串解析 TOML 配置
    pub fn parse(content: &str, name: impl Into<String>) -> ContainerResult<Self> {
        let name = name.into();
        let value: toml::Value = toml::from_str(content)
            .map_err(|e| ContainerError::Config(format!("Failed to parse TOML '{}': {}", name, e)))?;

        let mut properties = HashMap::new();
        flatten_toml(&value, String::new(), &mut properties);

        Ok(Self {
            name,
            properties,
            priority: 0,
        })
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// 展平 TOML 结构
/// 例如: { aop: { pointCut: "x" } } -> { "aop.pointCut": "x" }
fn flatten_toml(value: &toml::Value, prefix: String, result: &mut HashMap<String, ConfigValue>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let new_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_toml(val, new_prefix, result);
            }
        }
        other => {
            result.insert(prefix, toml_value_to_config(other));
        }
    }
}

fn toml_value_to_config(value: &toml::Value) -> ConfigValue {
    match value {
        toml::Value::String(s) => ConfigValue::String(s.clone()),
        toml::Value::Integer(i) => ConfigValue::Int(*i),
        toml::Value::Float(f) => ConfigValue::Float(*f),
        toml::Value::Boolean(b) => ConfigValue::Bool(*b),
        toml::Value::Array(arr) => ConfigValue::Array(arr.iter().map(toml_value_to_config).collect()),
        toml::Value::Table(table) => ConfigValue::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_value_to_config(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
    }
}

impl PropertySource for TomlPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 内存配置源（用于测试或运行时配置）
pub struct MapPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            priority: 50,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AOP_TOML: &str = r#"
scanPackage = "demo.service"
pointCut = "pub .* demo::service::.*::.*(.*)"
aspectClass = "demo::aspect::LogAspect"

[server]
port = 8080
debug = true
"#;

    #[test]
    fn test_toml_flattening() {
        let source = TomlPropertySource::parse(AOP_TOML, "application.toml").unwrap();
        assert_eq!(
            source.get("scanPackage"),
            Some(ConfigValue::String("demo.service".to_string()))
        );
        assert_eq!(source.get("server.port"), Some(ConfigValue::Int(8080)));
        assert_eq!(source.get("server.debug"), Some(ConfigValue::Bool(true)));
        assert!(source.get("server").is_none());
    }

    #[test]
    fn test_invalid_toml() {
        let err = TomlPropertySource::parse("pointCut = ", "broken.toml")
            .err()
            .unwrap();
        assert!(matches!(err, ContainerError::Config(_)));
    }

    #[test]
    fn test_priority_order() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            TomlPropertySource::parse(AOP_TOML, "application.toml").unwrap(),
        ));
        env.add_property_source(Box::new(
            MapPropertySource::new("overrides").with_property("aspectClass", "demo::aspect::Audit"),
        ));

        assert_eq!(
            env.get_string("aspectClass").as_deref(),
            Some("demo::aspect::Audit")
        );
        assert_eq!(env.get_string("scanPackage").as_deref(), Some("demo.service"));
        assert_eq!(env.get_string("server.port").as_deref(), Some("8080"));
        assert_eq!(env.get_i64("server.port"), Some(8080));
        assert!(env.get_bool_or("server.debug", false));
        assert_eq!(env.property_source_names(), vec!["overrides", "application.toml"]);
    }

    #[test]
    fn test_blank_string_is_absent() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test").with_property("aspectBefore", "   "),
        ));
        assert_eq!(env.get_string("aspectBefore"), None);
        assert!(env.contains_property("aspectBefore"));
    }

    #[test]
    fn test_environment_variables() {
        std::env::set_var("TRELLIS_TEST_CFG_SERVER_PORT", "9090");
        let source = EnvironmentPropertySource::new("TRELLIS_TEST_CFG_");
        assert_eq!(
            source.get("server.port"),
            Some(ConfigValue::String("9090".to_string()))
        );
        assert!(source.keys().contains(&"server.port".to_string()));
        std::env::remove_var("TRELLIS_TEST_CFG_SERVER_PORT");
    }

    #[test]
    fn test_profiles() {
        let env = Environment::new();
        env.set_active_profiles(vec!["dev".to_string()]);
        assert!(env.accepts_profiles("dev"));
        assert!(!env.accepts_profiles("prod"));
        assert_eq!(env.get_active_profiles(), vec!["dev".to_string()]);
    }
}
