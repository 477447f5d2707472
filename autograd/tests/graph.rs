use std::sync::{Arc, Mutex as StdMutex};

use autograd::{Function, Graph, Parameter, Result, check_output_grad};
use matrix::{Float, Matrix};
use parking_lot::{MappedRwLockReadGuard, Mutex, RwLock, RwLockReadGuard};
use proptest::prelude::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A minimal parameter accumulating into a separate gradient.
struct Weight {
    value: RwLock<Matrix>,
    grad: Mutex<Option<Matrix>>,
}

impl Weight {
    fn new(value: Matrix) -> Arc<Self> {
        Arc::new(Self {
            value: RwLock::new(value),
            grad: Mutex::new(None),
        })
    }

    fn grad(&self) -> Option<Vec<Float>> {
        self.grad.lock().as_ref().map(|g| g.as_slice().to_vec())
    }
}

impl Parameter for Weight {
    fn value(&self) -> MappedRwLockReadGuard<'_, Matrix> {
        RwLockReadGuard::map(self.value.read_recursive(), |m| m)
    }

    fn requires_grad(&self) -> bool {
        true
    }

    fn propagate_grad(&self, grad: &Matrix) -> matrix::Result<()> {
        let mut acc = self.grad.lock();
        match acc.as_mut() {
            Some(acc) => acc.add_in_place(grad),
            None => {
                *acc = Some(grad.clone());
                Ok(())
            }
        }
    }
}

/// Identity that records the order in which its backward is called.
struct Recorder {
    id: usize,
    log: Arc<StdMutex<Vec<usize>>>,
}

impl Function for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, xs: &[&Matrix]) -> Result<Matrix> {
        Ok(xs[0].clone())
    }

    fn backward(
        &self,
        _xs: &[&Matrix],
        y: &Matrix,
        gy: &Matrix,
        requires_grad: &[bool],
    ) -> Result<Vec<Option<Matrix>>> {
        check_output_grad(self.name(), y, gy)?;
        self.log.lock().unwrap().push(self.id);
        Ok(vec![requires_grad[0].then(|| gy.clone())])
    }
}

#[test]
fn each_node_is_visited_once_in_reverse_creation_order() {
    init_logger();

    let log = Arc::new(StdMutex::new(Vec::new()));
    let mut g = Graph::new();
    let x = g.new_variable(Matrix::scalar(1.), true);

    let mut last = x;
    for id in 0..4 {
        let rec = Recorder {
            id,
            log: log.clone(),
        };
        last = g.apply(rec, &[last]).unwrap();
    }

    // a branch that doesn't reach the root is never visited
    let unrelated = Recorder {
        id: 99,
        log: log.clone(),
    };
    let _ = g.apply(unrelated, &[x]).unwrap();

    g.backward(last, None).unwrap();

    assert_eq!(*log.lock().unwrap(), [3, 2, 1, 0]);
    assert_eq!(g.grad(x).unwrap().as_slice(), [1.]);
}

#[test]
fn shared_operand_accumulates_both_contributions() {
    init_logger();

    let mut g = Graph::new();
    let x = g.new_variable(Matrix::scalar(3.), true);
    let y = g.prod(x, x).unwrap();

    g.backward(y, None).unwrap();

    assert_eq!(g.value(y).as_slice(), [9.]);
    assert_eq!(g.grad(x).unwrap().as_slice(), [6.]);
}

#[test]
fn wrapped_parameters_receive_gradients() {
    init_logger();

    let w = Weight::new(Matrix::from_slice(1, 2, &[2., -1.]).unwrap());
    let mut g = Graph::new();

    let wn = g.new_wrap(w.clone());
    let x = g.new_variable(Matrix::from_slice(2, 1, &[3., 4.]).unwrap(), false);
    let y = g.mul(wn, x).unwrap();
    let loss = g.square(y).unwrap();

    assert_eq!(g.value(loss).as_slice(), [4.]);

    g.backward(loss, None).unwrap();

    // dloss/dw = 2 * y * xT
    assert_eq!(w.grad().unwrap(), [12., 16.]);
    assert!(g.grad(wn).is_none());
    assert!(g.grad(x).is_none());
}

#[test]
fn same_parameter_twice_in_one_operation() {
    init_logger();

    let w = Weight::new(Matrix::scalar(5.));
    let mut g = Graph::new();

    let a = g.new_wrap(w.clone());
    let b = g.new_wrap(w.clone());
    let y = g.prod(a, b).unwrap();

    g.backward(y, None).unwrap();
    assert_eq!(w.grad().unwrap(), [10.]);
}

#[test]
fn wrapped_values_are_not_copied() {
    let w = Weight::new(Matrix::scalar(1.));
    let mut g = Graph::new();
    let n = g.new_wrap(w.clone());

    w.value.write()[(0, 0)] = 42.;
    assert_eq!(g.value(n).as_slice(), [42.]);
}

#[test]
fn chain_of_operations() {
    init_logger();

    // loss = mean((a - b)^2)
    let mut g = Graph::new();
    let a = g.new_variable(Matrix::from_slice(2, 2, &[1., 2., 3., 4.]).unwrap(), true);
    let b = g.new_variable(Matrix::ones(2, 2), false);

    let diff = g.sub(a, b).unwrap();
    let sq = g.square(diff).unwrap();
    let loss = g.reduce_mean(sq).unwrap();

    assert_eq!(g.value(loss).as_slice(), [(0. + 1. + 4. + 9.) / 4.]);

    g.backward(loss, None).unwrap();
    assert_eq!(g.grad(a).unwrap().as_slice(), [0., 0.5, 1., 1.5]);
    assert!(g.grad(b).is_none());
}

#[test]
fn explicit_seed_scales_gradients() {
    let mut g = Graph::new();
    let x = g.new_variable(Matrix::ones(1, 3), true);
    let t = g.transpose(x).unwrap();
    let r = g.reshape(t, 1, 3).unwrap();

    let seed = Matrix::from_slice(1, 3, &[1., 2., 3.]).unwrap();
    g.backward(r, Some(seed)).unwrap();

    assert_eq!(g.grad(x).unwrap().as_slice(), [1., 2., 3.]);
}

#[test]
fn shape_errors_surface_on_apply() {
    let mut g = Graph::new();
    let a = g.new_variable(Matrix::ones(2, 3), true);
    let b = g.new_variable(Matrix::ones(2, 3), true);

    assert!(g.mul(a, b).is_err());
    assert!(g.reshape(a, 4, 4).is_err());
    assert_eq!(g.len(), 2);
}

proptest! {
    #[test]
    fn only_the_roots_ancestors_are_visited_once_each(
        picks in prop::collection::vec(any::<prop::sample::Index>(), 1..24),
    ) {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let mut g = Graph::new();

        // parents[k] is the position of node k's operand, node 0 is the input
        let mut nodes = vec![g.new_variable(Matrix::scalar(1.), true)];
        let mut parents = vec![0];

        for (id, pick) in picks.iter().enumerate() {
            let parent = pick.index(nodes.len());
            let rec = Recorder {
                id,
                log: log.clone(),
            };
            nodes.push(g.apply(rec, &[nodes[parent]]).unwrap());
            parents.push(parent);
        }

        let root = nodes.len() - 1;
        g.backward(nodes[root], None).unwrap();

        let mut expected = Vec::new();
        let mut k = root;
        while k != 0 {
            expected.push(k - 1);
            k = parents[k];
        }

        prop_assert_eq!(&*log.lock().unwrap(), &expected);
        prop_assert_eq!(g.grad(nodes[0]).unwrap().as_slice(), &[1.][..]);
    }
}
