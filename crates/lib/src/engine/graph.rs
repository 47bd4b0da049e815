//! Task dependency graph.
//!
//! Edges point from a dependency to its dependent. Traversal from a target is
//! depth-first: every dependency is visited (in the order its edge was declared)
//! before the task itself, and each task appears once.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use thiserror::Error;

use super::task::{Task, name_key, same_name};

/// Errors raised while building or walking the task graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("task '{task}' is dependent on task '{dependency}' which does not exist")]
  MissingDependency { task: String, dependency: String },

  #[error("task '{task}' is a dependee of task '{dependee}' which does not exist")]
  MissingDependee { task: String, dependee: String },

  #[error("reflexive edges in graph are not allowed (task '{0}')")]
  ReflexiveEdge(String),

  #[error("unidirectional edges in graph are not allowed: '{start}' and '{end}' cannot depend on each other")]
  BidirectionalEdge { start: String, end: String },

  #[error("graph contains circular references involving task '{0}'")]
  CircularReference(String),

  #[error("task not found in graph: {0}")]
  NodeNotFound(String),
}

/// Directed graph of task names.
#[derive(Debug, Default)]
pub struct TaskGraph {
  graph: DiGraph<String, ()>,
  /// [`name_key`] -> node.
  nodes: HashMap<String, NodeIndex>,
}

impl TaskGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build the graph for a set of tasks.
  ///
  /// Dependencies and dependees are connected in declaration order so that
  /// traversal follows the order the script declared them in.
  pub fn build(tasks: &[Task]) -> Result<Self, GraphError> {
    let mut graph = Self::new();

    for task in tasks {
      graph.add(task.name());
    }

    for task in tasks {
      for dependency in task.dependencies() {
        if !graph.exists(&dependency.name) {
          if dependency.required {
            return Err(GraphError::MissingDependency {
              task: task.name().to_string(),
              dependency: dependency.name.clone(),
            });
          }
          continue;
        }
        graph.connect(&dependency.name, task.name())?;
      }

      for dependee in task.dependees() {
        if !graph.exists(&dependee.name) {
          if dependee.required {
            return Err(GraphError::MissingDependee {
              task: task.name().to_string(),
              dependee: dependee.name.clone(),
            });
          }
          continue;
        }
        graph.connect(task.name(), &dependee.name)?;
      }
    }

    Ok(graph)
  }

  /// Add a node. Adding an existing name is a no-op.
  pub fn add(&mut self, name: &str) {
    let key = name_key(name);
    if !self.nodes.contains_key(&key) {
      let idx = self.graph.add_node(name.to_string());
      self.nodes.insert(key, idx);
    }
  }

  pub fn exists(&self, name: &str) -> bool {
    self.nodes.contains_key(&name_key(name))
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  /// Connect `start` -> `end` (`end` depends on `start`).
  ///
  /// Missing nodes are created. Duplicate edges collapse into one.
  pub fn connect(&mut self, start: &str, end: &str) -> Result<(), GraphError> {
    if same_name(start, end) {
      return Err(GraphError::ReflexiveEdge(start.to_string()));
    }

    self.add(start);
    self.add(end);
    let from = self.index(start)?;
    let to = self.index(end)?;

    if self.graph.find_edge(from, to).is_some() {
      return Ok(());
    }
    if self.graph.find_edge(to, from).is_some() {
      return Err(GraphError::BidirectionalEdge {
        start: self.graph[to].clone(),
        end: self.graph[from].clone(),
      });
    }

    self.graph.add_edge(from, to, ());
    Ok(())
  }

  /// Fail if any cycle exists anywhere in the graph.
  pub fn verify_acyclic(&self) -> Result<(), GraphError> {
    toposort(&self.graph, None)
      .map(|_| ())
      .map_err(|cycle| GraphError::CircularReference(self.graph[cycle.node_id()].clone()))
  }

  /// Return the names of `target` and everything it depends on, dependencies first.
  pub fn traverse(&self, target: &str) -> Result<Vec<String>, GraphError> {
    let root = self.index(target)?;
    self.verify_acyclic()?;

    let mut visited = HashSet::new();
    let mut order = Vec::new();
    self.visit(root, &mut visited, &mut order);
    Ok(order)
  }

  /// True when some other task depends on `name`.
  pub fn has_dependents(&self, name: &str) -> Result<bool, GraphError> {
    let idx = self.index(name)?;
    Ok(self.graph.edges_directed(idx, Direction::Outgoing).next().is_some())
  }

  /// Render the dependency tree below `root`, one task per line.
  pub fn render_tree(&self, root: &str, out: &mut String) -> Result<(), GraphError> {
    let idx = self.index(root)?;
    self.verify_acyclic()?;
    out.push_str(&self.graph[idx]);
    out.push('\n');
    self.render_children(idx, "", out);
    Ok(())
  }

  fn render_children(&self, idx: NodeIndex, prefix: &str, out: &mut String) {
    let children = self.incoming_in_order(idx);
    let last = children.len().saturating_sub(1);
    for (i, child) in children.into_iter().enumerate() {
      let (branch, indent) = if i == last { ("└── ", "    ") } else { ("├── ", "│   ") };
      out.push_str(prefix);
      out.push_str(branch);
      out.push_str(&self.graph[child]);
      out.push('\n');
      self.render_children(child, &format!("{prefix}{indent}"), out);
    }
  }

  fn visit(&self, idx: NodeIndex, visited: &mut HashSet<NodeIndex>, order: &mut Vec<String>) {
    if !visited.insert(idx) {
      return;
    }
    for dep in self.incoming_in_order(idx) {
      self.visit(dep, visited, order);
    }
    order.push(self.graph[idx].clone());
  }

  /// petgraph walks adjacency lists newest-first; edge indices restore declaration order.
  fn incoming_in_order(&self, idx: NodeIndex) -> Vec<NodeIndex> {
    let mut edges: Vec<_> = self
      .graph
      .edges_directed(idx, Direction::Incoming)
      .map(|edge| (edge.id().index(), edge.source()))
      .collect();
    edges.sort_by_key(|(id, _)| *id);
    edges.into_iter().map(|(_, source)| source).collect()
  }

  fn index(&self, name: &str) -> Result<NodeIndex, GraphError> {
    self
      .nodes
      .get(&name_key(name))
      .copied()
      .ok_or_else(|| GraphError::NodeNotFound(name.to_string()))
  }
}
