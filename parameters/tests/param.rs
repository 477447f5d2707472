use std::{sync::Arc, thread};

use autograd::Graph;
use matrix::{Float, Matrix};
use parameters::{Param, Payload};
use proptest::prelude::*;

#[test]
fn concurrent_gradients_are_not_lost() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 100;

    let param = Arc::new(Param::new(Matrix::zeros(4, 1)));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let param = Arc::clone(&param);
            thread::spawn(move || {
                let grad = Matrix::ones(4, 1);
                for _ in 0..ROUNDS {
                    param.propagate_grad(&grad).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let expected = (THREADS * ROUNDS) as Float;
    assert_eq!(param.grad().unwrap().as_slice(), [expected; 4]);
}

#[test]
fn params_can_be_wrapped_by_many_graphs() {
    let param = Arc::new(Param::new(Matrix::from_slice(1, 2, &[1., 2.]).unwrap()));

    let mut g1 = Graph::new();
    let mut g2 = Graph::new();

    let a = g1.new_wrap(param.clone());
    let b = g2.new_wrap(param.clone());

    let y1 = g1.reduce_sum(a).unwrap();
    let y2 = g2.reduce_sum(b).unwrap();

    g1.backward(y1, None).unwrap();
    g2.backward(y2, None).unwrap();

    assert_eq!(param.grad().unwrap().as_slice(), [2., 2.]);
}

#[test]
fn bytes_round_trip() {
    let param = Param::new(Matrix::from_slice(2, 2, &[1., -1., 0.5, 8.]).unwrap());
    param
        .set_payload(Payload::new(3, vec![Matrix::ones(2, 2)]))
        .unwrap();

    let decoded = Param::from_bytes(&param.to_bytes().unwrap()).unwrap();

    assert_eq!(*decoded.value(), *param.value());
    assert_eq!(decoded.payload(), param.payload());
    assert!(decoded.requires_grad());
    assert!(decoded.name().is_empty());
}

fn grads() -> impl Strategy<Value = Vec<Vec<Float>>> {
    prop::collection::vec(prop::collection::vec(-100i32..100, 3), 1..8)
        .prop_map(|gs| {
            gs.into_iter()
                .map(|g| g.into_iter().map(|x| x as Float / 4.).collect())
                .collect()
        })
}

proptest! {
    #[test]
    fn accumulation_order_does_not_matter(gs in grads()) {
        let forward = Param::new(Matrix::zeros(3, 1));
        let backward = Param::new(Matrix::zeros(3, 1));

        for g in &gs {
            forward.propagate_grad(&Matrix::from_slice(3, 1, g).unwrap()).unwrap();
        }
        for g in gs.iter().rev() {
            backward.propagate_grad(&Matrix::from_slice(3, 1, g).unwrap()).unwrap();
        }

        prop_assert_eq!(forward.grad(), backward.grad());
    }
}
