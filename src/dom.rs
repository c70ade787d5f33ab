//! Boundary to the widget document: params push their values into whatever
//! nodes their `binding` expression selects.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use crate::convert::{Converter, DefaultConverter};

pub trait QueryResult {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set_value(&self, value: &Value);
}

pub trait DomQuery {
    fn select(&self, expression: &str) -> Option<Box<dyn QueryResult>>;
}

/// Attribute store keyed by binding expression. Expressions must be
/// declared before they select anything.
#[derive(Default)]
pub struct MemoryDom {
    nodes: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&self, expression: &str) {
        self.nodes
            .borrow_mut()
            .entry(expression.to_string())
            .or_default();
    }

    pub fn value(&self, expression: &str) -> Option<String> {
        self.nodes.borrow().get(expression).cloned()
    }
}

struct MemorySelection {
    nodes: Rc<RefCell<BTreeMap<String, String>>>,
    expressions: Vec<String>,
}

impl QueryResult for MemorySelection {
    fn len(&self) -> usize {
        self.expressions.len()
    }

    fn set_value(&self, value: &Value) {
        let text = DefaultConverter.to_string(value);
        let mut nodes = self.nodes.borrow_mut();
        for expression in &self.expressions {
            nodes.insert(expression.clone(), text.clone());
        }
    }
}

impl DomQuery for MemoryDom {
    /// Comma-separated expressions select several nodes at once.
    fn select(&self, expression: &str) -> Option<Box<dyn QueryResult>> {
        let nodes = self.nodes.borrow();
        let expressions: Vec<String> = expression
            .split(',')
            .map(str::trim)
            .filter(|part| nodes.contains_key(*part))
            .map(str::to_string)
            .collect();
        if expressions.is_empty() {
            return None;
        }
        Some(Box::new(MemorySelection {
            nodes: Rc::clone(&self.nodes),
            expressions,
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn selection_writes_every_matched_node() {
        let dom = MemoryDom::new();
        dom.declare("#a@fill");
        dom.declare("#b@fill");
        let selection = dom.select("#a@fill, #b@fill, #missing").expect("selection");
        assert_eq!(selection.len(), 2);
        selection.set_value(&json!("red"));
        assert_eq!(dom.value("#a@fill").as_deref(), Some("red"));
        assert_eq!(dom.value("#b@fill").as_deref(), Some("red"));
        assert!(dom.select("#missing").is_none());
    }
}
