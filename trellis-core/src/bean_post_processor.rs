//! BeanPostProcessor - Bean 工厂扩展机制
//!
//! 在 Bean 实例化之后、放入单例缓存之前调用，可以用包装对象替换原始 Bean。
//! AOP 模块正是通过这个钩子把命中切点的 Bean 替换成代理。

use crate::bean::BeanRef;
use crate::error::ContainerResult;

/// BeanPostProcessor trait
///
/// # 示例
///
/// ```
/// use trellis_core::prelude::*;
///
/// struct LoggingPostProcessor;
///
/// impl BeanPostProcessor for LoggingPostProcessor {
///     fn post_process_after_instantiation(
///         &self,
///         bean: BeanRef,
///         bean_name: &str,
///     ) -> ContainerResult<BeanRef> {
///         tracing::info!("Instantiated {} as {}", bean_name, bean.runtime_type());
///         Ok(bean)
///     }
///
///     fn name(&self) -> &str {
///         "LoggingPostProcessor"
///     }
/// }
/// ```
pub trait BeanPostProcessor: Send + Sync {
    /// 返回处理后的 Bean（原始 Bean 或包装后的 Bean）
    fn post_process_after_instantiation(
        &self,
        bean: BeanRef,
        _bean_name: &str,
    ) -> ContainerResult<BeanRef> {
        Ok(bean)
    }

    /// 获取处理器的名称（用于日志和调试）
    fn name(&self) -> &str {
        "BeanPostProcessor"
    }

    /// 获取处理器的优先级（数字越小越先执行）
    fn order(&self) -> i32 {
        1000
    }
}
