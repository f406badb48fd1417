//! 切点（Pointcut）表达式
//!
//! 表达式形如 `<可见性> <返回类型> <类>::<方法>(<参数>)`，可以包在 `execution(...)` 里。
//! 括号按字面匹配，`(..)` 表示任意参数，其余部分都是正则表达式。
//!
//! ```text
//! pub .* demo::service::.*::.*(..)
//! execution(pub i32 demo::service::Calculator::add(i32, i32))
//! ```

use regex::Regex;
use trellis_core::{ClassMetadata, MethodMetadata};

use crate::error::{AopError, AopResult};
use crate::interceptor::MethodMatcher;

/// 编译后的切点
#[derive(Debug, Clone)]
pub struct Pointcut {
    expression: String,
    class_pattern: Regex,
    method_pattern: Regex,
}

impl Pointcut {
    /// 解析切点表达式，类模式和方法模式各编译一次
    pub fn parse(expression: &str) -> AopResult<Self> {
        let invalid = |reason: &str| AopError::InvalidPointcut {
            expression: expression.to_string(),
            reason: reason.to_string(),
        };

        let mut body = expression.trim();
        if let Some(inner) = body
            .strip_prefix("execution(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            body = inner.trim();
        }
        if body.is_empty() {
            return Err(invalid("expression is empty"));
        }

        let params_start = body
            .rfind('(')
            .ok_or_else(|| invalid("missing parameter list"))?;
        let head = body[..params_start].trim_end();
        let target = head.rsplit(char::is_whitespace).next().unwrap_or(head);
        let (class_part, method_part) = target
            .rsplit_once("::")
            .ok_or_else(|| invalid("expected '<class>::<method>' before the parameter list"))?;
        if class_part.is_empty() || method_part.is_empty() {
            return Err(invalid("class and method patterns must not be empty"));
        }

        let method_regex = body
            .replace('(', "\\(")
            .replace(')', "\\)")
            .replace("\\(..\\)", "\\(.*\\)");

        let compile = |pattern: &str| {
            Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| invalid(&e.to_string()))
        };

        Ok(Self {
            expression: expression.to_string(),
            class_pattern: compile(class_part)?,
            method_pattern: compile(&method_regex)?,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// 类是否需要被代理
    pub fn matches_class(&self, class_name: &str) -> bool {
        self.class_pattern.is_match(class_name)
    }

    /// 方法签名是否命中
    pub fn matches_method(&self, signature: &str) -> bool {
        self.method_pattern.is_match(signature)
    }
}

impl MethodMatcher for Pointcut {
    fn matches(&self, method: &MethodMetadata, class: &ClassMetadata) -> bool {
        self.matches_method(&method.signature(class.name()))
    }
}
