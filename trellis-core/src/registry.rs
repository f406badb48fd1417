//! 类型注册表
//!
//! 替代类路径扫描：所有可被容器管理的类型都以 `ClassMetadata` 的形式登记在这里。
//! 既可以显式调用 `register`，也可以通过 `submit_class!` 在链接期提交，
//! 然后用 `TypeRegistry::scan` 按包（模块路径前缀）收集。

use std::collections::HashMap;
use std::sync::Arc;

use crate::class::ClassMetadata;
use crate::error::{ContainerError, ContainerResult};
use crate::utils::naming::in_package;

/// 类型提交结构 - 用于 inventory 收集
pub struct ClassRegistration {
    pub create: fn() -> ClassMetadata,
}

inventory::collect!(ClassRegistration);

/// 在链接期登记一个类型
///
/// ```ignore
/// fn calculator_class() -> ClassMetadata { ... }
/// trellis_core::submit_class!(calculator_class);
/// ```
#[macro_export]
macro_rules! submit_class {
    ($create:expr) => {
        $crate::inventory::submit! {
            $crate::ClassRegistration { create: $create }
        }
    };
}

/// 类型注册表，按登记顺序保存
#[derive(Debug, Default)]
pub struct TypeRegistry {
    classes: Vec<Arc<ClassMetadata>>,
    index: HashMap<String, usize>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记类型，同名类型重复登记时报错
    pub fn register(&mut self, class: ClassMetadata) -> ContainerResult<()> {
        if self.index.contains_key(class.name()) {
            return Err(ContainerError::Config(format!(
                "Class '{}' is already registered",
                class.name()
            )));
        }
        tracing::trace!("Registering class '{}'", class.name());
        self.index.insert(class.name().to_string(), self.classes.len());
        self.classes.push(Arc::new(class));
        Ok(())
    }

    /// 登记一组类型（构建器风格）
    pub fn with_classes(
        mut self,
        classes: impl IntoIterator<Item = ClassMetadata>,
    ) -> ContainerResult<Self> {
        for class in classes {
            self.register(class)?;
        }
        Ok(self)
    }

    /// 收集 `submit_class!` 提交的、位于 `package` 下的类型
    ///
    /// `package` 为空时收集全部。链接顺序不确定，结果按类名排序。
    pub fn scan(package: &str) -> ContainerResult<Self> {
        let mut found: Vec<ClassMetadata> = inventory::iter::<ClassRegistration>
            .into_iter()
            .map(|registration| (registration.create)())
            .filter(|class| in_package(class.name(), package))
            .collect();
        found.sort_by(|a, b| a.name().cmp(b.name()));

        tracing::debug!("Scanned {} class(es) in package '{}'", found.len(), package);
        Self::new().with_classes(found)
    }

    pub fn get(&self, name: &str) -> Option<Arc<ClassMetadata>> {
        self.index.get(name).map(|&i| Arc::clone(&self.classes[i]))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// 按登记顺序遍历
    pub fn classes(&self) -> impl Iterator<Item = &Arc<ClassMetadata>> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
