//! 测试用的类型与切面

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::{ClassBuilder, ClassMetadata};

use crate::advice::AdviceParam;
use crate::aspect::{AspectBuilder, AspectMetadata};

pub const CALCULATOR: &str = "demo::service::Calculator";
pub const CALCULATOR_API: &str = "demo::service::CalculatorApi";
pub const LOG_ASPECT: &str = "demo::aspect::LogAspect";

#[derive(Debug, thiserror::Error)]
#[error("/ by zero")]
pub struct ArithmeticError;

#[derive(Default)]
pub struct Calculator {
    calls: Option<Arc<AtomicUsize>>,
}

impl Calculator {
    pub fn counting(calls: Arc<AtomicUsize>) -> Self {
        Self { calls: Some(calls) }
    }

    fn record(&self) {
        if let Some(calls) = &self.calls {
            calls.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub fn calculator_builder() -> ClassBuilder<Calculator> {
    ClassBuilder::<Calculator>::named(CALCULATOR)
        .component()
        .default_constructor()
        .method2("add", |c: &Calculator, a: i32, b: i32| {
            c.record();
            Ok(a + b)
        })
        .method2("divide", |c: &Calculator, a: i32, b: i32| {
            c.record();
            if b == 0 {
                return Err(ArithmeticError.into());
            }
            Ok(a / b)
        })
        .method0("version", |_c: &Calculator| Ok("1.0".to_string()))
        .method0("checksum", |c: &Calculator| {
            c.record();
            Ok(7u32)
        })
        .mark_final("version")
        .mark_private("checksum")
}

/// 实现了 CalculatorApi 契约的计算器
pub fn calculator_class() -> ClassMetadata {
    calculator_builder()
        .implements(CALCULATOR_API, &["add", "divide"])
        .build()
}

/// 没有实现任何契约的计算器
pub fn bare_calculator_class() -> ClassMetadata {
    calculator_builder().build()
}

#[derive(Default)]
pub struct LogAspect {
    log: Arc<Mutex<Vec<String>>>,
}

/// 把每次通知调用记录到 log 中的切面
pub fn log_aspect(log: Arc<Mutex<Vec<String>>>) -> AspectMetadata {
    AspectBuilder::<LogAspect>::named(LOG_ASPECT)
        .constructor(move || Ok(LogAspect { log: Arc::clone(&log) }))
        .advice("before", &[AdviceParam::JoinPoint], |aspect: &LogAspect, context| {
            let method = context
                .join_point()
                .map(|jp| jp.method().name())
                .unwrap_or("?");
            aspect.log.lock().push(format!("before {}", method));
            Ok(())
        })
        .advice(
            "afterReturning",
            &[AdviceParam::ReturnValue, AdviceParam::JoinPoint],
            |aspect: &LogAspect, context| {
                let value = context.return_value::<i32>().copied().unwrap_or_default();
                aspect.log.lock().push(format!("afterReturning {}", value));
                Ok(())
            },
        )
        .advice(
            "afterThrowing",
            &[AdviceParam::Failure],
            |aspect: &LogAspect, context| {
                let failure = context.failure().map(|e| e.to_string()).unwrap_or_default();
                aspect.log.lock().push(format!("afterThrowing {}", failure));
                Ok(())
            },
        )
        .advice("misplaced", &[AdviceParam::ReturnValue], |_aspect: &LogAspect, _context| Ok(()))
        .build()
}
