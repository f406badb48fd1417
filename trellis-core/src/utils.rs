//! Utility functions for the container
//!
//! Bean naming and dependency graph analysis.

/// Naming convention utilities for bean names
pub mod naming {
    /// Lowercases the first character of a type name to derive its bean name.
    ///
    /// `UserService` becomes `userService`.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_core::utils::naming::to_camel_case;
    ///
    /// assert_eq!(to_camel_case("UserService"), "userService");
    /// assert_eq!(to_camel_case("A"), "a");
    /// assert_eq!(to_camel_case(""), "");
    /// ```
    pub fn to_camel_case(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                let mut result = String::with_capacity(s.len());
                result.extend(first.to_lowercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }

    /// Normalizes a package given in dotted form (`demo.service`) to a Rust path prefix.
    pub fn to_module_path(package: &str) -> String {
        package.trim().replace('.', "::")
    }

    /// Whether `class_name` lives in `package` (or one of its submodules).
    pub fn in_package(class_name: &str, package: &str) -> bool {
        let package = to_module_path(package);
        if package.is_empty() {
            return true;
        }
        match class_name.strip_prefix(package.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with("::"),
            None => false,
        }
    }
}

/// Dependency resolution utilities
pub mod dependency {
    use std::collections::{HashMap, HashSet, VecDeque};

    /// Dependency graph analysis result
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum DependencyValidationError {
        /// Circular dependency detected
        CircularDependency {
            /// The dependency chain forming the cycle
            cycle: Vec<String>,
        },
        /// Missing dependency detected
        MissingDependency {
            /// The bean that requires the dependency
            bean: String,
            /// The missing dependency
            missing: String,
        },
    }

    impl std::fmt::Display for DependencyValidationError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::CircularDependency { cycle } => {
                    write!(f, "Circular dependency detected: {}", cycle.join(" -> "))
                }
                Self::MissingDependency { bean, missing } => {
                    write!(f, "Bean '{}' depends on '{}' which is not registered", bean, missing)
                }
            }
        }
    }

    impl std::error::Error for DependencyValidationError {}

    /// Validates a dependency graph for missing beans and cycles.
    ///
    /// `order` lists the beans in registration order, so the first issue reported
    /// is deterministic. `dependencies` maps each bean to the beans it needs.
    pub fn validate_dependency_graph(
        order: &[String],
        dependencies: &HashMap<String, Vec<String>>,
    ) -> Result<(), DependencyValidationError> {
        for bean_name in order {
            for dep in dependencies.get(bean_name).into_iter().flatten() {
                if !dependencies.contains_key(dep) {
                    return Err(DependencyValidationError::MissingDependency {
                        bean: bean_name.clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }

        let mut visited = HashSet::new();
        let mut rec_stack = Vec::new();

        for bean_name in order {
            if !visited.contains(bean_name) {
                if let Some(cycle) =
                    detect_cycle_dfs(bean_name, dependencies, &mut visited, &mut rec_stack)
                {
                    return Err(DependencyValidationError::CircularDependency { cycle });
                }
            }
        }

        Ok(())
    }

    /// DFS-based cycle detection, returns the cycle if one is found
    fn detect_cycle_dfs(
        node: &str,
        graph: &HashMap<String, Vec<String>>,
        visited: &mut HashSet<String>,
        rec_stack: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());
        rec_stack.push(node.to_string());

        for dep in graph.get(node).into_iter().flatten() {
            if let Some(start_idx) = rec_stack.iter().position(|x| x == dep) {
                let mut cycle = rec_stack[start_idx..].to_vec();
                cycle.push(dep.to_string());
                return Some(cycle);
            }
            if !visited.contains(dep) {
                if let Some(cycle) = detect_cycle_dfs(dep, graph, visited, rec_stack) {
                    return Some(cycle);
                }
            }
        }

        rec_stack.pop();
        None
    }

    /// Orders beans so that dependencies come before their dependents.
    ///
    /// Independent beans keep their relative order from `order`.
    pub fn topological_sort(
        order: &[String],
        dependencies: &HashMap<String, Vec<String>>,
    ) -> Result<Vec<String>, DependencyValidationError> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for bean in order {
            let deps = dependencies.get(bean).map(Vec::as_slice).unwrap_or_default();
            in_degree.insert(bean.as_str(), deps.len());
            for dep in deps {
                dependents.entry(dep.as_str()).or_default().push(bean.as_str());
            }
        }

        let mut queue: VecDeque<&str> = order
            .iter()
            .map(String::as_str)
            .filter(|bean| in_degree.get(bean) == Some(&0))
            .collect();

        let mut result = Vec::with_capacity(order.len());

        while let Some(node) = queue.pop_front() {
            result.push(node.to_string());

            for dependent in dependents.get(node).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }

        if result.len() != order.len() {
            let cycle = order
                .iter()
                .filter(|bean| !result.contains(*bean))
                .cloned()
                .collect();
            return Err(DependencyValidationError::CircularDependency { cycle });
        }

        Ok(result)
    }
}
