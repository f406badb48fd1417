//! 统一的错误处理类型
//!
//! 容器层使用 `ContainerError`，启动层使用 `ApplicationError`。
//! 用户代码（Bean 方法、构造函数、通知方法）的失败统一使用 `anyhow::Error`，
//! 这样调用方可以通过 `downcast_ref` 拿到原始错误类型。

use thiserror::Error;

/// 容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Bean definition '{0}' already exists")]
    BeanAlreadyExists(String),

    #[error("Bean '{0}' not found")]
    BeanNotFound(String),

    #[error("Failed to create bean '{name}': {source}")]
    BeanCreationFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Class '{0}' is not registered in the type registry")]
    ClassNotFound(String),

    #[error("Type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Dependency validation failed: {0}")]
    DependencyValidationFailed(String),

    #[error("Post processor '{processor}' failed for bean '{name}': {source}")]
    PostProcessingFailed {
        processor: String,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Startup failed, {} bean(s) could not be created:\n  {}", .0.len(), .0.join("\n  "))]
    StartupFailed(Vec<String>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 容器操作结果
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// 应用启动错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoadFailed(String),

    #[error("Plugin '{plugin}' failed: {message}")]
    PluginFailed { plugin: String, message: String },

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("{0}")]
    Other(String),
}

/// 应用启动结果
pub type ApplicationResult<T> = std::result::Result<T, ApplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_failed_lists_every_bean() {
        let err = ContainerError::StartupFailed(vec![
            "orderService: boom".to_string(),
            "userService: bang".to_string(),
        ]);
        let text = err.to_string();
        assert!(text.contains("2 bean(s)"));
        assert!(text.contains("orderService: boom"));
        assert!(text.contains("userService: bang"));
    }

    #[test]
    fn test_creation_failure_keeps_source() {
        let err = ContainerError::BeanCreationFailed {
            name: "calculator".to_string(),
            source: anyhow::anyhow!("constructor exploded"),
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("constructor exploded"));
    }
}
