//! AOP Plugin - 通过插件机制把 AOP 接入应用启动流程
//!
//! 在容器刷新之前注册 `AopBeanPostProcessor`，这样预实例化的每个 Bean 都会经过它

use std::sync::Arc;

use async_trait::async_trait;
use trellis_core::prelude::*;

use crate::bean_post_processor::AopBeanPostProcessor;
use crate::registry::AspectRegistry;

/// AOP 应用插件
///
/// 通过 inventory 自动注册，`TrellisApplication` 默认就会加载：
///
/// ```ignore
/// #[tokio::main]
/// async fn main() -> ApplicationResult<()> {
///     let app = TrellisApplication::new("demo").run().await?;
///     app.shutdown().await
/// }
/// ```
///
/// 也可以显式添加，例如使用自定义的切面注册表：
///
/// ```ignore
/// TrellisApplication::new("demo")
///     .plugin(AopPlugin::new().with_aspects(Arc::new(aspects)))
///     .run()
///     .await?;
/// ```
pub struct AopPlugin {
    /// 插件名称
    name: String,
    /// 是否启用
    enabled: bool,
    /// 为空时使用全局切面注册表
    aspects: Option<Arc<AspectRegistry>>,
}

impl AopPlugin {
    pub fn new() -> Self {
        Self {
            name: "AopPlugin".to_string(),
            enabled: true,
            aspects: None,
        }
    }

    /// 创建禁用的 AOP 插件
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_aspects(mut self, aspects: Arc<AspectRegistry>) -> Self {
        self.aspects = Some(aspects);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn aspects(&self) -> Arc<AspectRegistry> {
        self.aspects
            .clone()
            .unwrap_or_else(|| Arc::clone(crate::get_global_registry()))
    }
}

impl Default for AopPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApplicationPlugin for AopPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&self, context: &Arc<ApplicationContext>) -> ApplicationResult<()> {
        if !self.enabled {
            tracing::info!("AOP plugin is disabled, skipping initialization");
            return Ok(());
        }

        let aspects = self.aspects();
        tracing::debug!("AOP plugin sees {} aspect(s): {:?}", aspects.len(), aspects.names());

        let processor = AopBeanPostProcessor::new(Arc::clone(context.environment())).with_aspects(aspects);

        // 配置错误在启动阶段暴露，而不是等到第一个 Bean 创建时
        let enabled = processor
            .resolve_config()
            .map_err(|e| ApplicationError::PluginFailed {
                plugin: self.name.clone(),
                message: e.to_string(),
            })?
            .is_some();
        if !enabled {
            tracing::info!("No pointcut configured, AOP proxying is inactive");
            return Ok(());
        }

        context.add_bean_post_processor(Arc::new(processor));
        tracing::info!("AOP BeanPostProcessor registered");
        Ok(())
    }

    async fn on_shutdown(&self, _context: &Arc<ApplicationContext>) -> ApplicationResult<()> {
        if self.enabled {
            tracing::debug!("Shutting down AOP support");
        }
        Ok(())
    }
}

trellis_core::submit_plugin!(AopPlugin);
