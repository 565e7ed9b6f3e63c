use std::collections::{BTreeMap, HashMap};

use crate::{
    foundation::error::{LimboError, LimboResult},
    graph::stage::{NodeId, Slot, StageKind},
};

/// Computation attached to a node: a pure function of the node's named inputs.
pub type Task<V> = Box<dyn Fn(&Inputs<V>) -> LimboResult<V> + Send>;

/// Resolved input values handed to a node's [`Task`].
#[derive(Debug)]
pub struct Inputs<V> {
    node: String,
    values: BTreeMap<Slot, V>,
}

impl<V> Inputs<V> {
    /// Name of the node being evaluated.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Value supplied for `slot`, or [`LimboError::MissingInput`] when nothing feeds it.
    pub fn get(&self, slot: Slot) -> LimboResult<&V> {
        self.values.get(&slot).ok_or_else(|| {
            LimboError::missing_input(format!("node '{}' has no value for input '{slot}'", self.node))
        })
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.values.contains_key(&slot)
    }
}

enum Source<V> {
    Link(NodeId),
    Constant(V),
}

struct Node<V> {
    name: String,
    kind: StageKind,
    task: Option<Task<V>>,
    constant: Option<V>,
    inputs: BTreeMap<Slot, Source<V>>,
    cache: Option<V>,
    evals: u64,
}

/// Lazy, memoizing evaluator over an arena of named derivation nodes.
///
/// Reading a node evaluates it and every uncached ancestor once, then caches the
/// result. Changing a node's inputs or overriding its output drops the cache of the
/// node and of every transitive consumer. The cache has no internal locking: one
/// graph belongs to one worker at a time.
pub struct DerivationGraph<V> {
    nodes: Vec<Node<V>>,
    ids_by_name: HashMap<String, NodeId>,
}

impl<V> Default for DerivationGraph<V> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            ids_by_name: HashMap::new(),
        }
    }
}

impl<V> std::fmt::Debug for DerivationGraph<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.nodes.iter().map(|n| (&n.name, n.kind, n.cache.is_some())))
            .finish()
    }
}

impl<V: Clone> DerivationGraph<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node computed by `task` from its named inputs.
    pub fn add_node<F>(&mut self, name: &str, kind: StageKind, task: F) -> LimboResult<NodeId>
    where
        F: Fn(&Inputs<V>) -> LimboResult<V> + Send + 'static,
    {
        self.insert(name, kind, Some(Box::new(task)))
    }

    /// Register a node without a task; it yields a value only once overridden.
    pub fn add_source(&mut self, name: &str, kind: StageKind) -> LimboResult<NodeId> {
        self.insert(name, kind, None)
    }

    fn insert(&mut self, name: &str, kind: StageKind, task: Option<Task<V>>) -> LimboResult<NodeId> {
        if self.ids_by_name.contains_key(name) {
            return Err(LimboError::validation(format!(
                "node '{name}' is already registered"
            )));
        }
        let id = NodeId(
            self.nodes
                .len()
                .try_into()
                .map_err(|_| LimboError::validation("node id overflow"))?,
        );
        self.nodes.push(Node {
            name: name.to_string(),
            kind,
            task,
            constant: None,
            inputs: BTreeMap::new(),
            cache: None,
            evals: 0,
        });
        self.ids_by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Feed `producer`'s output into the `slot` input of `consumer`.
    pub fn link(&mut self, producer: NodeId, consumer: NodeId, slot: Slot) -> LimboResult<()> {
        self.check(producer)?;
        self.check(consumer)?;
        if producer == consumer || self.is_upstream_of(consumer, producer) {
            return Err(LimboError::validation(format!(
                "linking '{}' into '{}' would form a cycle",
                self.nodes[producer.index()].name,
                self.nodes[consumer.index()].name
            )));
        }
        self.nodes[consumer.index()]
            .inputs
            .insert(slot, Source::Link(producer));
        self.invalidate(consumer);
        Ok(())
    }

    /// Supply a constant value for the `slot` input of `node`.
    pub fn set_input(&mut self, node: NodeId, slot: Slot, value: V) -> LimboResult<()> {
        self.check(node)?;
        self.nodes[node.index()]
            .inputs
            .insert(slot, Source::Constant(value));
        self.invalidate(node);
        Ok(())
    }

    /// Override the output of `node` with a constant, bypassing its task.
    pub fn set_constant(&mut self, node: NodeId, value: V) -> LimboResult<()> {
        self.check(node)?;
        self.nodes[node.index()].constant = Some(value);
        self.invalidate(node);
        Ok(())
    }

    /// Drop a previous [`set_constant`](Self::set_constant) override.
    pub fn clear_constant(&mut self, node: NodeId) -> LimboResult<()> {
        self.check(node)?;
        self.nodes[node.index()].constant = None;
        self.invalidate(node);
        Ok(())
    }

    /// Memoized value of `node`, evaluating uncached ancestors first.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn output(&mut self, node: NodeId) -> LimboResult<V> {
        self.check(node)?;
        self.evaluate(node)
    }

    /// Evaluate `node` for its side effects, discarding the value.
    pub fn update(&mut self, node: NodeId) -> LimboResult<()> {
        self.output(node).map(|_| ())
    }

    fn evaluate(&mut self, id: NodeId) -> LimboResult<V> {
        let idx = id.index();
        if let Some(v) = &self.nodes[idx].constant {
            return Ok(v.clone());
        }
        if let Some(v) = &self.nodes[idx].cache {
            return Ok(v.clone());
        }

        let pending = self.nodes[idx]
            .inputs
            .iter()
            .map(|(slot, source)| match source {
                Source::Link(producer) => (*slot, Err(*producer)),
                Source::Constant(v) => (*slot, Ok(v.clone())),
            })
            .collect::<Vec<_>>();

        let mut values = BTreeMap::new();
        for (slot, source) in pending {
            let value = match source {
                Ok(v) => v,
                Err(producer) => self.evaluate(producer)?,
            };
            values.insert(slot, value);
        }

        let node = &mut self.nodes[idx];
        let inputs = Inputs {
            node: node.name.clone(),
            values,
        };
        let task = node.task.as_ref().ok_or_else(|| {
            LimboError::missing_input(format!("node '{}' has no value supplied", node.name))
        })?;
        let value = task(&inputs)?;
        node.evals += 1;
        node.cache = Some(value.clone());
        tracing::debug!(
            node = %node.name,
            stage = node.kind.as_str(),
            evals = node.evals,
            "evaluated node"
        );
        Ok(value)
    }

    fn invalidate(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &mut self.nodes[id.index()];
            if node.cache.take().is_some() {
                tracing::trace!(node = %node.name, "invalidated node");
            }
            stack.extend(self.consumers(id));
        }
    }

    fn consumers(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| {
                n.inputs
                    .values()
                    .any(|s| matches!(s, Source::Link(p) if *p == id))
            })
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    fn is_upstream_of(&self, candidate: NodeId, of: NodeId) -> bool {
        let mut stack = vec![of];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(id) = stack.pop() {
            if id == candidate {
                return true;
            }
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            for source in self.nodes[id.index()].inputs.values() {
                if let Source::Link(p) = source {
                    stack.push(*p);
                }
            }
        }
        false
    }

    fn check(&self, id: NodeId) -> LimboResult<()> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(LimboError::validation(format!("unknown node id {}", id.0)))
        }
    }
}

impl<V> DerivationGraph<V> {
    /// Look up a node by its registered name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.ids_by_name.get(name).copied()
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.index()).map(|n| n.name.as_str())
    }

    pub fn kind(&self, id: NodeId) -> Option<StageKind> {
        self.nodes.get(id.index()).map(|n| n.kind)
    }

    /// Whether `id` currently holds a memoized value.
    pub fn is_cached(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|n| n.cache.is_some())
    }

    /// Number of times the task of `id` has run.
    pub fn eval_count(&self, id: NodeId) -> u64 {
        self.nodes.get(id.index()).map_or(0, |n| n.evals)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/evaluator.rs"]
mod tests;
