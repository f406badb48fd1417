use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use trellis_aop::prelude::*;
use trellis_core::prelude::*;

// ==================== 业务服务 ====================

mod service {
    use super::*;

    /// 计算器契约
    pub trait CalculatorApi {}

    #[derive(Debug, thiserror::Error)]
    #[error("/ by zero")]
    pub struct ArithmeticError;

    #[derive(Default)]
    pub struct Calculator;

    impl Calculator {
        pub fn add(&self, a: i32, b: i32) -> i32 {
            a + b
        }

        pub fn divide(&self, a: i32, b: i32) -> anyhow::Result<i32> {
            if b == 0 {
                return Err(ArithmeticError.into());
            }
            Ok(a / b)
        }

        pub fn version(&self) -> String {
            env!("CARGO_PKG_VERSION").to_string()
        }
    }

    fn calculator_class() -> ClassMetadata {
        ClassBuilder::<Calculator>::new()
            .component()
            .default_constructor()
            .implements_trait::<dyn CalculatorApi>(&["add", "divide"])
            .method2("add", |c: &Calculator, a: i32, b: i32| Ok(c.add(a, b)))
            .method2("divide", |c: &Calculator, a: i32, b: i32| c.divide(a, b))
            .method0("version", |c: &Calculator| Ok(c.version()))
            .mark_final("version")
            .build()
    }

    trellis_core::submit_class!(calculator_class);

    /// 前台服务，依赖计算器契约（注入的是代理）
    #[derive(Default)]
    pub struct ReportService {
        calculator: Autowired,
    }

    impl ReportService {
        pub fn summary(&self, a: i32, b: i32) -> anyhow::Result<String> {
            let calculator = self.calculator.require()?;
            let sum = calculator.call::<i32>("add", args![a, b])?;
            let quotient = calculator.call::<i32>("divide", args![a, b])?;
            Ok(format!("{} + {} = {}, {} / {} = {}", a, b, sum, a, b, quotient))
        }
    }

    fn report_service_class() -> ClassMetadata {
        ClassBuilder::<ReportService>::new()
            .component()
            .default_constructor()
            .autowired_type::<dyn CalculatorApi, _>("calculator", |s: &ReportService| &s.calculator)
            .method2("summary", |s: &ReportService, a: i32, b: i32| s.summary(a, b))
            .build()
    }

    trellis_core::submit_class!(report_service_class);
}

// ==================== 切面 ====================

mod aspect {
    use super::*;

    /// 记录每次调用的日志切面
    #[derive(Default)]
    pub struct LogAspect {
        invocations: AtomicUsize,
    }

    fn log_aspect() -> AspectMetadata {
        AspectBuilder::<LogAspect>::new()
            .default_constructor()
            .advice("before", &[AdviceParam::JoinPoint], |aspect: &LogAspect, context| {
                let count = aspect.invocations.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(join_point) = context.join_point_mut() {
                    tracing::info!("[LogAspect] #{} before {}", count, join_point.signature());
                    join_point.set_user_attribute("started", Some(Box::new(std::time::Instant::now())));
                }
                Ok(())
            })
            .advice(
                "afterReturning",
                &[AdviceParam::JoinPoint, AdviceParam::ReturnValue],
                |_aspect: &LogAspect, context| {
                    let elapsed = context
                        .join_point()
                        .and_then(|jp| jp.user_attribute("started"))
                        .and_then(|v| v.downcast_ref::<std::time::Instant>())
                        .map(|started| started.elapsed());
                    let method = context.join_point().map(|jp| jp.method().name()).unwrap_or("?");
                    match context.return_value::<i32>() {
                        Some(value) => tracing::info!("[LogAspect] {} returned {} in {:?}", method, value, elapsed),
                        None => tracing::info!("[LogAspect] {} returned in {:?}", method, elapsed),
                    }
                    Ok(())
                },
            )
            .advice(
                "afterThrowing",
                &[AdviceParam::JoinPoint, AdviceParam::Failure],
                |_aspect: &LogAspect, context| {
                    let method = context.join_point().map(|jp| jp.signature()).unwrap_or_default();
                    if let Some(failure) = context.failure() {
                        tracing::warn!(
                            "[LogAspect] {} failed: {}",
                            method,
                            ErrorInfo::from_anyhow(failure).summary()
                        );
                    }
                    Ok(())
                },
            )
            .build()
    }

    trellis_aop::submit_aspect!(log_aspect);
}

fn exercise(context: &Arc<ApplicationContext>) -> anyhow::Result<()> {
    let calculator = context.get_bean_by_type::<dyn service::CalculatorApi>()?;
    tracing::info!("calculator is {} (proxy: {})", calculator.runtime_type(), calculator.is_proxy());

    let sum = calculator.call::<i32>("add", args![40, 2])?;
    tracing::info!("add(40, 2) = {}", sum);

    if let Err(e) = calculator.call::<i32>("divide", args![1, 0]) {
        let by_zero = e.downcast_ref::<service::ArithmeticError>().is_some();
        tracing::info!("divide(1, 0) failed as expected: {} (ArithmeticError: {})", e, by_zero);
    }

    // 契约代理不暴露契约之外的方法
    if let Err(e) = calculator.call::<String>("version", args![]) {
        tracing::info!("version() through the contract proxy: {}", e);
    }

    let reports = context.get_bean("reportService")?;
    tracing::info!("{}", reports.call::<String>("summary", args![84, 2])?);
    Ok(())
}

#[tokio::main]
async fn main() -> ApplicationResult<()> {
    // 查找配置文件
    let config_file = ["demos/app-demo/application.toml", "application.toml"]
        .into_iter()
        .find(|path| std::path::Path::new(path).exists())
        .unwrap_or("application.toml");

    let app = TrellisApplication::new("TrellisDemo")
        .config_file(config_file)
        .env_prefix("APP_")
        .run()
        .await?;

    // 在一个作用域中使用 beans，确保在 shutdown 前释放所有引用
    if let Err(e) = exercise(app.context()) {
        tracing::error!("Demo failed: {:#}", e);
    }

    app.shutdown().await
}
