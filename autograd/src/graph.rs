use std::{
    ops::Deref,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use log::debug;
use matrix::{Float, MatErr, Matrix};
use parking_lot::MappedRwLockReadGuard;

use crate::{
    AgErr, Function, Parameter, Result,
    ops::{ActFn, Activation, Add, Mul, Prod, ReduceMean, ReduceSum, Reshape, Sub, Transpose},
};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(0);

/// A handle to a node inside a `Graph`.
///
/// It's only meaningful for the graph that created it and only until that graph is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node {
    graph: u64,
    index: usize,
}

impl Node {
    /// The creation index of this node inside its graph.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A borrowed node value.
pub enum ValueRef<'g> {
    Local(&'g Matrix),
    Param(MappedRwLockReadGuard<'g, Matrix>),
}

impl Deref for ValueRef<'_> {
    type Target = Matrix;

    fn deref(&self) -> &Self::Target {
        match self {
            ValueRef::Local(m) => m,
            ValueRef::Param(guard) => guard,
        }
    }
}

enum Kind {
    Variable(Matrix),
    Wrap(Arc<dyn Parameter>),
    Operation {
        function: Box<dyn Function>,
        operands: Vec<usize>,
        value: Matrix,
    },
}

struct Entry {
    kind: Kind,
    requires_grad: bool,
    time_step: usize,
}

impl Entry {
    fn value(&self) -> ValueRef<'_> {
        match &self.kind {
            Kind::Variable(value) | Kind::Operation { value, .. } => ValueRef::Local(value),
            Kind::Wrap(param) => ValueRef::Param(param.value()),
        }
    }
}

/// An append-only computation graph.
///
/// Nodes can only refer to nodes created before them, so the creation order is always a valid
/// topological order and the backward pass doesn't need to sort anything.
///
/// A graph is meant for a single forward/backward pass, it's not shared between threads. All
/// the values it owns go back to the buffer pool on `clear` (or on drop).
pub struct Graph {
    id: u64,
    entries: Vec<Entry>,
    grads: Vec<Option<Matrix>>,
    time_step: usize,
    cleared: bool,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Creates a new empty `Graph`.
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            entries: Vec::new(),
            grads: Vec::new(),
            time_step: 0,
            cleared: false,
        }
    }

    /// Returns the amount of nodes in the graph.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wraps an externally supplied value as a leaf of the graph.
    ///
    /// # Arguments
    /// * `value` - The value, the graph takes ownership of it.
    /// * `requires_grad` - Whether gradients should be accumulated for this leaf.
    ///
    /// # Returns
    /// The new node.
    pub fn new_variable(&mut self, value: Matrix, requires_grad: bool) -> Node {
        self.push(Kind::Variable(value), requires_grad)
    }

    /// Creates a constant `1x1` leaf.
    pub fn new_scalar(&mut self, value: Float) -> Node {
        self.new_variable(Matrix::scalar(value), false)
    }

    /// Adapts a parameter as a node without copying its value.
    ///
    /// Gradients reaching this node are accumulated straight into the parameter.
    pub fn new_wrap<P>(&mut self, param: Arc<P>) -> Node
    where
        P: Parameter + 'static,
    {
        let requires_grad = param.requires_grad();
        self.push(Kind::Wrap(param), requires_grad)
    }

    /// Appends a new operation node and computes its output.
    ///
    /// # Arguments
    /// * `function` - The operation.
    /// * `operands` - The operation inputs, they must belong to this graph.
    ///
    /// # Returns
    /// The new node, or an error if the arity or the operand shapes don't fit the operation.
    ///
    /// # Panics
    /// If the graph was cleared or an operand belongs to another graph.
    pub fn apply<F>(&mut self, function: F, operands: &[Node]) -> Result<Node>
    where
        F: Function + 'static,
    {
        if operands.len() != function.arity() {
            return Err(AgErr::ArityMismatch {
                op: function.name(),
                got: operands.len(),
                expected: function.arity(),
            });
        }

        let operands: Vec<_> = operands.iter().map(|&node| self.index_of(node)).collect();

        let value = {
            let xs: Vec<_> = operands.iter().map(|&i| self.entries[i].value()).collect();
            let xs: Vec<&Matrix> = xs.iter().map(|x| &**x).collect();
            function.forward(&xs)?
        };

        let requires_grad = operands.iter().any(|&i| self.entries[i].requires_grad);
        let kind = Kind::Operation {
            function: Box::new(function),
            operands,
            value,
        };

        Ok(self.push(kind, requires_grad))
    }

    /// Borrows the current value of `node`.
    pub fn value(&self, node: Node) -> ValueRef<'_> {
        let index = self.index_of(node);
        self.entries[index].value()
    }

    /// Returns the gradient accumulated on `node` by the last backward pass.
    ///
    /// Wrapped parameters keep their gradients themselves, for those nodes this is `None`.
    pub fn grad(&self, node: Node) -> Option<&Matrix> {
        let index = self.index_of(node);
        self.grads[index].as_ref()
    }

    pub fn requires_grad(&self, node: Node) -> bool {
        let index = self.index_of(node);
        self.entries[index].requires_grad
    }

    /// Returns the time step at which `node` was created.
    pub fn node_time_step(&self, node: Node) -> usize {
        let index = self.index_of(node);
        self.entries[index].time_step
    }

    pub fn time_step(&self) -> usize {
        self.time_step
    }

    /// Moves to the next time step, nodes appended from now on are tagged with it.
    pub fn inc_time_step(&mut self) {
        self.assert_alive();
        self.time_step += 1;
    }

    /// Propagates gradients from `root` back to every node it depends on.
    ///
    /// Nodes are visited once, in strictly decreasing creation order starting at `root`. Those
    /// that didn't receive any gradient, or don't require one, are skipped.
    ///
    /// # Arguments
    /// * `root` - The node to start from.
    /// * `seed` - The gradient of `root`, ones of the root's shape when `None`.
    ///
    /// # Returns
    /// An error if the seed or any of the computed gradients has an unexpected shape.
    pub fn backward(&mut self, root: Node, seed: Option<Matrix>) -> Result<()> {
        let root = self.index_of(root);
        let dims = self.entries[root].value().dims();

        let seed = match seed {
            Some(seed) if seed.dims() != dims => {
                return Err(MatErr::ShapeMismatch {
                    op: "backward",
                    got: seed.dims(),
                    expected: dims,
                }
                .into());
            }
            Some(seed) => seed,
            None => Matrix::ones(dims.0, dims.1),
        };

        if !self.entries[root].requires_grad {
            seed.release();
            return Ok(());
        }

        let Self { entries, grads, .. } = &mut *self;
        let entries = &*entries;
        accumulate(entries, grads, root, seed)?;

        let mut visited = 0;
        for i in (0..=root).rev() {
            let Entry {
                kind:
                    Kind::Operation {
                        function,
                        operands,
                        value,
                    },
                requires_grad: true,
                ..
            } = &entries[i]
            else {
                continue;
            };

            let Some(gy) = grads[i].as_ref() else {
                continue;
            };

            let gxs = {
                let xs: Vec<_> = operands.iter().map(|&j| entries[j].value()).collect();
                let xs: Vec<&Matrix> = xs.iter().map(|x| &**x).collect();
                let requires_grad: Vec<_> =
                    operands.iter().map(|&j| entries[j].requires_grad).collect();

                function.backward(&xs, value, gy, &requires_grad)?
            };

            for (&j, gx) in operands.iter().zip(gxs) {
                if let Some(gx) = gx {
                    accumulate(entries, grads, j, gx)?;
                }
            }

            visited += 1;
        }

        debug!(graph = self.id, root = root, visited = visited; "backward pass done");
        Ok(())
    }

    /// Releases every node gradient.
    pub fn zero_grad(&mut self) {
        self.assert_alive();
        self.grads.iter_mut().filter_map(Option::take).for_each(Matrix::release);
    }

    /// Releases every value owned by the graph back to the pool.
    ///
    /// The graph and every node obtained from it can't be used afterwards.
    pub fn clear(&mut self) {
        self.assert_alive();
        self.release_all();
        self.cleared = true;
    }

    fn release_all(&mut self) {
        let nodes = self.entries.len();

        for entry in self.entries.drain(..) {
            match entry.kind {
                Kind::Variable(value) | Kind::Operation { value, .. } => value.release(),
                Kind::Wrap(_) => {}
            }
        }

        self.grads.drain(..).flatten().for_each(Matrix::release);
        debug!(graph = self.id, nodes = nodes; "released graph values");
    }

    fn push(&mut self, kind: Kind, requires_grad: bool) -> Node {
        self.assert_alive();

        let index = self.entries.len();
        self.entries.push(Entry {
            kind,
            requires_grad,
            time_step: self.time_step,
        });
        self.grads.push(None);

        Node {
            graph: self.id,
            index,
        }
    }

    fn index_of(&self, node: Node) -> usize {
        self.assert_alive();
        assert_eq!(
            node.graph, self.id,
            "node {} belongs to graph {}, not to graph {}",
            node.index, node.graph, self.id
        );
        node.index
    }

    fn assert_alive(&self) {
        assert!(!self.cleared, "graph {} has already been cleared", self.id);
    }
}

impl Graph {
    pub fn add(&mut self, a: Node, b: Node) -> Result<Node> {
        self.apply(Add, &[a, b])
    }

    pub fn sub(&mut self, a: Node, b: Node) -> Result<Node> {
        self.apply(Sub, &[a, b])
    }

    /// Element-wise product.
    pub fn prod(&mut self, a: Node, b: Node) -> Result<Node> {
        self.apply(Prod, &[a, b])
    }

    /// Matrix product.
    pub fn mul(&mut self, a: Node, b: Node) -> Result<Node> {
        self.apply(Mul, &[a, b])
    }

    pub fn reshape(&mut self, x: Node, rows: usize, cols: usize) -> Result<Node> {
        self.apply(Reshape::new(rows, cols), &[x])
    }

    pub fn transpose(&mut self, x: Node) -> Result<Node> {
        self.apply(Transpose, &[x])
    }

    pub fn activate(&mut self, x: Node, act_fn: ActFn) -> Result<Node> {
        self.apply(Activation::new(act_fn), &[x])
    }

    pub fn sigmoid(&mut self, x: Node) -> Result<Node> {
        self.activate(x, ActFn::sigmoid(1.))
    }

    pub fn tanh(&mut self, x: Node) -> Result<Node> {
        self.activate(x, ActFn::Tanh)
    }

    pub fn relu(&mut self, x: Node) -> Result<Node> {
        self.activate(x, ActFn::Relu)
    }

    pub fn square(&mut self, x: Node) -> Result<Node> {
        self.activate(x, ActFn::Square)
    }

    pub fn reduce_sum(&mut self, x: Node) -> Result<Node> {
        self.apply(ReduceSum, &[x])
    }

    pub fn reduce_mean(&mut self, x: Node) -> Result<Node> {
        self.apply(ReduceMean, &[x])
    }
}

impl Drop for Graph {
    fn drop(&mut self) {
        if !self.cleared {
            self.release_all();
        }
    }
}

/// Adds `grad` to whatever node `index` has accumulated so far.
fn accumulate(
    entries: &[Entry],
    grads: &mut [Option<Matrix>],
    index: usize,
    grad: Matrix,
) -> Result<()> {
    if let Kind::Wrap(param) = &entries[index].kind {
        let res = param.propagate_grad(&grad);
        grad.release();
        return res.map_err(AgErr::from);
    }

    match grads[index].as_mut() {
        Some(acc) => {
            let res = acc.add_in_place(&grad);
            grad.release();
            res?;
        }
        None => {
            let dims = entries[index].value().dims();
            if grad.dims() != dims {
                return Err(MatErr::ShapeMismatch {
                    op: "accumulate",
                    got: grad.dims(),
                    expected: dims,
                }
                .into());
            }

            grads[index] = Some(grad);
        }
    }

    Ok(())
}
