//! The concept registry and dependency ordering.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};

use super::concept::{ConceptCalculator, ConceptClass, ConceptKind};

/// A concept resolved from its code.
#[derive(Clone)]
pub enum ConceptNode {
    /// A built-in kind.
    Builtin(ConceptKind),
    /// A registered plugin.
    Plugin(Arc<dyn ConceptCalculator>),
}

impl ConceptNode {
    /// The concept code.
    pub fn code(&self) -> &str {
        match self {
            ConceptNode::Builtin(kind) => kind.code(),
            ConceptNode::Plugin(plugin) => plugin.code(),
        }
    }

    /// The concept class.
    pub fn class(&self) -> ConceptClass {
        match self {
            ConceptNode::Builtin(kind) => kind.class(),
            ConceptNode::Plugin(plugin) => plugin.class(),
        }
    }

    fn explicit_dependencies(&self) -> Vec<String> {
        match self {
            ConceptNode::Builtin(kind) => kind
                .dependencies()
                .iter()
                .map(|dep| dep.code().to_string())
                .collect(),
            ConceptNode::Plugin(plugin) => plugin.dependencies(),
        }
    }
}

impl fmt::Debug for ConceptNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConceptNode::Builtin(kind) => write!(f, "Builtin({})", kind),
            ConceptNode::Plugin(plugin) => write!(f, "Plugin({})", plugin.code()),
        }
    }
}

/// Client-defined concepts, by code.
#[derive(Clone, Default)]
pub struct ConceptRegistry {
    plugins: BTreeMap<String, Arc<dyn ConceptCalculator>>,
}

impl fmt::Debug for ConceptRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConceptRegistry")
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConceptRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin.
    ///
    /// # Errors
    ///
    /// * `InvalidInput` when the code is empty, is a built-in code, or is
    ///   already registered
    pub fn register(&mut self, plugin: Arc<dyn ConceptCalculator>) -> EngineResult<()> {
        let code = plugin.code().to_string();
        if code.is_empty() {
            return Err(EngineError::invalid_input("concept_code", "must not be empty"));
        }
        if ConceptKind::from_code(&code).is_some() {
            return Err(EngineError::invalid_input(
                "concept_code",
                format!("'{}' is a built-in concept", code),
            ));
        }
        if self.plugins.contains_key(&code) {
            return Err(EngineError::invalid_input(
                "concept_code",
                format!("'{}' is already registered", code),
            ));
        }
        tracing::debug!(concept = %code, class = ?plugin.class(), "registered concept plugin");
        self.plugins.insert(code, plugin);
        Ok(())
    }

    /// Codes of the registered plugins, ascending.
    pub fn plugin_codes(&self) -> impl Iterator<Item = &str> + '_ {
        self.plugins.keys().map(String::as_str)
    }

    /// Resolves a code to a built-in kind or a plugin.
    pub fn resolve(&self, code: &str) -> EngineResult<ConceptNode> {
        if let Some(kind) = ConceptKind::from_code(code) {
            return Ok(ConceptNode::Builtin(kind));
        }
        self.plugins
            .get(code)
            .map(|plugin| ConceptNode::Plugin(Arc::clone(plugin)))
            .ok_or_else(|| EngineError::UnknownConcept {
                code: code.to_string(),
            })
    }

    /// Orders `requested` and their dependencies for calculation.
    ///
    /// Kahn's algorithm; among concepts ready at the same time the
    /// lexicographically smallest code goes first, so the order is
    /// deterministic. Withholdings come after every earning in the plan.
    ///
    /// # Errors
    ///
    /// * `UnknownConcept` for an unregistered code
    /// * `DependencyCycle` when the dependencies cannot be ordered
    pub fn plan(&self, requested: &[String]) -> EngineResult<Vec<ConceptNode>> {
        let mut nodes: BTreeMap<String, ConceptNode> = BTreeMap::new();
        let mut pending: Vec<String> = requested.to_vec();
        while let Some(code) = pending.pop() {
            if nodes.contains_key(&code) {
                continue;
            }
            let node = self.resolve(&code)?;
            pending.extend(node.explicit_dependencies());
            nodes.insert(code, node);
        }

        let earnings: Vec<String> = nodes
            .values()
            .filter(|node| node.class().is_earning())
            .map(|node| node.code().to_string())
            .collect();

        let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        for (code, node) in &nodes {
            let mut deps: BTreeSet<String> = node.explicit_dependencies().into_iter().collect();
            if node.class() == ConceptClass::Withholding {
                deps.extend(earnings.iter().cloned());
            }
            in_degree.insert(code.as_str(), deps.len());
            for dep in deps {
                let (dep_code, _) = nodes.get_key_value(&dep).ok_or_else(|| {
                    EngineError::UnknownConcept { code: dep.clone() }
                })?;
                dependents
                    .entry(dep_code.as_str())
                    .or_default()
                    .insert(code.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(code, _)| *code)
            .collect();
        let mut order = Vec::with_capacity(nodes.len());
        while let Some(code) = ready.pop_first() {
            order.push(code);
            for dependent in dependents.get(code).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if order.len() < nodes.len() {
            let placed: BTreeSet<&str> = order.iter().copied().collect();
            let concepts = nodes
                .keys()
                .filter(|code| !placed.contains(code.as_str()))
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            return Err(EngineError::DependencyCycle { concepts });
        }

        order
            .into_iter()
            .map(|code| self.resolve(code))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CalculatedConcept;
    use crate::orchestration::concept::ConceptContext;

    struct Fixed {
        code: &'static str,
        class: ConceptClass,
        deps: Vec<String>,
    }

    impl ConceptCalculator for Fixed {
        fn code(&self) -> &str {
            self.code
        }

        fn class(&self) -> ConceptClass {
            self.class
        }

        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }

        fn calculate(&self, _ctx: &ConceptContext<'_>) -> EngineResult<CalculatedConcept> {
            Ok(CalculatedConcept::deduction(self.code, crate::fixed_point::Money::ZERO, vec![]))
        }
    }

    fn plugin(code: &'static str, class: ConceptClass, deps: &[&str]) -> Arc<dyn ConceptCalculator> {
        Arc::new(Fixed {
            code,
            class,
            deps: deps.iter().map(|d| d.to_string()).collect(),
        })
    }

    fn codes(requested: &[&str]) -> Vec<String> {
        requested.iter().map(|c| c.to_string()).collect()
    }

    fn planned(registry: &ConceptRegistry, requested: &[&str]) -> Vec<String> {
        registry
            .plan(&codes(requested))
            .unwrap()
            .iter()
            .map(|node| node.code().to_string())
            .collect()
    }

    #[test]
    fn test_withholdings_follow_all_earnings() {
        let registry = ConceptRegistry::new();
        assert_eq!(
            planned(&registry, &["isr", "imss_worker", "overtime"]),
            vec!["overtime", "salary", "imss_worker", "isr"]
        );
    }

    #[test]
    fn test_order_is_deterministic() {
        let registry = ConceptRegistry::new();
        let first = planned(&registry, &["ptu", "aguinaldo", "isr_extraordinary", "salary"]);
        let second = planned(&registry, &["salary", "isr_extraordinary", "aguinaldo", "ptu"]);
        assert_eq!(first, second);
        assert_eq!(first, vec!["aguinaldo", "ptu", "salary", "isr_extraordinary"]);
    }

    #[test]
    fn test_plugin_dependencies_are_pulled_in() {
        let mut registry = ConceptRegistry::new();
        registry
            .register(plugin("meal_vouchers", ConceptClass::OrdinaryEarning, &["salary"]))
            .unwrap();
        registry
            .register(plugin("union_dues", ConceptClass::Withholding, &[]))
            .unwrap();
        assert_eq!(
            planned(&registry, &["union_dues", "meal_vouchers"]),
            vec!["salary", "meal_vouchers", "union_dues"]
        );
    }

    #[test]
    fn test_cycle_is_fatal() {
        let mut registry = ConceptRegistry::new();
        registry
            .register(plugin("a", ConceptClass::OrdinaryEarning, &["b"]))
            .unwrap();
        registry
            .register(plugin("b", ConceptClass::OrdinaryEarning, &["a"]))
            .unwrap();
        assert_eq!(
            registry.plan(&codes(&["a", "salary"])).unwrap_err(),
            EngineError::DependencyCycle {
                concepts: "a, b".to_string()
            }
        );
    }

    #[test]
    fn test_earning_depending_on_withholding_is_a_cycle() {
        let mut registry = ConceptRegistry::new();
        registry
            .register(plugin("net_bonus", ConceptClass::OrdinaryEarning, &["isr"]))
            .unwrap();
        assert!(matches!(
            registry.plan(&codes(&["net_bonus"])),
            Err(EngineError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn test_unknown_code() {
        let registry = ConceptRegistry::new();
        assert_eq!(
            registry.plan(&codes(&["bonus"])).unwrap_err(),
            EngineError::UnknownConcept {
                code: "bonus".to_string()
            }
        );
    }

    #[test]
    fn test_register_rejects_builtin_and_duplicate_codes() {
        let mut registry = ConceptRegistry::new();
        assert!(registry
            .register(plugin("salary", ConceptClass::OrdinaryEarning, &[]))
            .is_err());
        registry
            .register(plugin("bonus", ConceptClass::ExtraordinaryEarning, &[]))
            .unwrap();
        assert!(registry
            .register(plugin("bonus", ConceptClass::ExtraordinaryEarning, &[]))
            .is_err());
        assert_eq!(registry.plugin_codes().collect::<Vec<_>>(), vec!["bonus"]);
    }
}
