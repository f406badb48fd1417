//! 错误信息结构
//!
//! 把目标方法的失败整理成结构化信息，供日志和异常通知使用

use std::error::Error;

/// 结构化的错误信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// 错误消息（最外层）
    pub message: String,

    /// 错误类型名称，只有从具体类型构建时才知道
    pub error_type: Option<String>,

    /// 根因消息
    pub root_cause: String,

    /// 错误源链（不含最外层）
    pub source_chain: Vec<String>,
}

impl ErrorInfo {
    /// 从具体错误类型创建
    pub fn from_error<E: Error>(error: &E) -> Self {
        let mut source_chain = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            source_chain.push(source.to_string());
            current = source.source();
        }

        let message = error.to_string();
        Self {
            root_cause: source_chain.last().cloned().unwrap_or_else(|| message.clone()),
            message,
            error_type: Some(std::any::type_name::<E>().to_string()),
            source_chain,
        }
    }

    /// 从 anyhow 错误创建
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        Self {
            message: error.to_string(),
            error_type: None,
            root_cause: error.root_cause().to_string(),
            source_chain: error.chain().skip(1).map(|e| e.to_string()).collect(),
        }
    }

    /// 单行摘要：消息与根因不同时附上根因
    pub fn summary(&self) -> String {
        let head = match &self.error_type {
            Some(error_type) => format!("{}: {}", error_type, self.message),
            None => self.message.clone(),
        };
        if self.source_chain.is_empty() {
            head
        } else {
            format!("{} (root cause: {})", head, self.root_cause)
        }
    }

    /// 获取完整的错误描述（包含源链）
    pub fn full_description(&self) -> String {
        if self.source_chain.is_empty() {
            self.message.clone()
        } else {
            format!(
                "{}\nCaused by:\n  {}",
                self.message,
                self.source_chain.join("\n  ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct Refused;

    #[derive(Debug, thiserror::Error)]
    #[error("lookup failed")]
    struct LookupFailed(#[source] Refused);

    #[test]
    fn test_from_anyhow_with_context() {
        let error = anyhow::Error::new(Refused).context("loading account");
        let info = ErrorInfo::from_anyhow(&error);

        assert_eq!(info.message, "loading account");
        assert_eq!(info.root_cause, "connection refused");
        assert_eq!(info.source_chain, vec!["connection refused"]);
        assert_eq!(info.summary(), "loading account (root cause: connection refused)");
        assert_eq!(
            info.full_description(),
            "loading account\nCaused by:\n  connection refused"
        );
    }

    #[test]
    fn test_single_error_summary() {
        let info = ErrorInfo::from_anyhow(&anyhow::anyhow!("/ by zero"));
        assert_eq!(info.root_cause, "/ by zero");
        assert!(info.source_chain.is_empty());
        assert_eq!(info.summary(), "/ by zero");
        assert_eq!(info.full_description(), "/ by zero");
    }

    #[test]
    fn test_from_typed_error() {
        let info = ErrorInfo::from_error(&LookupFailed(Refused));
        assert_eq!(info.root_cause, "connection refused");
        assert!(info.error_type.as_deref().unwrap().ends_with("LookupFailed"));
        assert!(info.summary().contains("lookup failed (root cause: connection refused)"));
    }
}
