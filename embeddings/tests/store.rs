use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use autograd::Graph;
use embeddings::{Config, EmbErr, EmbeddingStore, Encoder, Registry};
use kvdb::{KeyValueDb, MemoryDb};
use matrix::Matrix;

const SIZE: usize = 3;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config() -> Config {
    Config {
        size: SIZE,
        use_zero_embedding: false,
        db_path: "unused".into(),
        read_only: false,
        force_new_db: false,
    }
}

fn vector(xs: [f32; SIZE]) -> Matrix {
    Matrix::vector(&xs)
}

/// Counts the lookups that reach the backing store.
#[derive(Default)]
struct CountingDb {
    inner: MemoryDb,
    gets: AtomicUsize,
}

impl KeyValueDb for CountingDb {
    fn put(&self, key: &[u8], value: &[u8]) -> kvdb::Result<()> {
        self.inner.put(key, value)
    }

    fn get(&self, key: &[u8]) -> kvdb::Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.inner.get(key)
    }

    fn keys(&self) -> kvdb::Result<Vec<Vec<u8>>> {
        self.inner.keys()
    }

    fn close(&self) -> kvdb::Result<()> {
        self.inner.close()
    }
}

#[test]
fn exact_then_lower_case_lookups() {
    init_logger();
    let store = EmbeddingStore::with_db(config(), Arc::new(MemoryDb::new()));
    store.set_embedding("paris", vector([1., 2., 3.])).unwrap();

    let exact = store.get_embedding("paris").unwrap().unwrap();
    let folded = store.get_embedding("Paris").unwrap().unwrap();

    assert!(Arc::ptr_eq(&exact, &folded));
    assert_eq!(exact.value().as_slice(), [1., 2., 3.]);
    assert_eq!(exact.name(), "paris");
    assert!(exact.requires_grad());
    assert!(store.get_embedding("Atlantis").unwrap().is_none());
}

#[test]
fn exact_match_wins_over_lower_case() {
    let store = EmbeddingStore::with_db(config(), Arc::new(MemoryDb::new()));
    store.set_embedding("apple", vector([1., 1., 1.])).unwrap();
    store.set_embedding("Apple", vector([2., 2., 2.])).unwrap();

    let found = store.get_embedding("Apple").unwrap().unwrap();
    assert_eq!(found.value().as_slice(), [2., 2., 2.]);
}

#[test]
fn read_only_mode() {
    init_logger();
    let db = Arc::new(MemoryDb::new());

    let writable = EmbeddingStore::with_db(config(), db.clone());
    writable.set_embedding("cat", vector([0., 1., 0.])).unwrap();

    let read_only = Config {
        read_only: true,
        ..config()
    };
    let store = EmbeddingStore::with_db(read_only, db);

    assert!(matches!(
        store.set_embedding("dog", vector([1., 1., 1.])),
        Err(EmbErr::ReadOnly)
    ));

    let cat = store.get_embedding("cat").unwrap().unwrap();
    assert!(!cat.requires_grad());

    cat.propagate_grad(&vector([1., 1., 1.])).unwrap();
    assert!(!cat.has_grad());
}

#[test]
fn trained_embeddings_are_written_back() {
    let db = Arc::new(MemoryDb::new());
    let store = EmbeddingStore::with_db(config(), db.clone());
    store.set_embedding("sun", vector([1., 1., 1.])).unwrap();

    let sun = store.get_embedding("sun").unwrap().unwrap();
    sun.apply_delta(&vector([0.5, 0., -1.])).unwrap();

    store.clear_used_embeddings();

    let sun = store.get_embedding("sun").unwrap().unwrap();
    assert_eq!(sun.value().as_slice(), [0.5, 1., 2.]);
}

#[test]
fn overwritten_embeddings_detach_stale_copies() {
    init_logger();

    let store = EmbeddingStore::with_db(config(), Arc::new(MemoryDb::new()));
    store.set_embedding("moon", vector([1., 1., 1.])).unwrap();

    let stale = store.get_embedding("moon").unwrap().unwrap();
    store.set_embedding("moon", vector([7., 8., 9.])).unwrap();

    assert!(stale.value().is_empty());
    assert!(stale.apply_delta(&vector([1., 1., 1.])).is_err());

    let fresh = store.get_embedding("moon").unwrap().unwrap();
    assert!(!Arc::ptr_eq(&stale, &fresh));
    assert_eq!(fresh.value().as_slice(), [7., 8., 9.]);
}

#[test]
fn clearing_keeps_the_backing_store() {
    init_logger();
    let store = EmbeddingStore::with_db(config(), Arc::new(MemoryDb::new()));
    store.set_embedding("a", vector([1., 2., 3.])).unwrap();
    store.set_embedding("b", vector([4., 5., 6.])).unwrap();

    let before = store.get_embedding("a").unwrap().unwrap().value().clone();
    assert_eq!(store.used_embeddings().len(), 1);

    store.clear_used_embeddings();

    assert!(store.used_embeddings().is_empty());
    assert_eq!(store.count().unwrap(), 2);

    let after = store.get_embedding("a").unwrap().unwrap();
    assert_eq!(*after.value(), before);
}

#[test]
fn closed_store_fails() {
    init_logger();
    let store = EmbeddingStore::with_db(config(), Arc::new(MemoryDb::new()));
    store.set_embedding("a", vector([1., 2., 3.])).unwrap();

    store.close().unwrap();
    store.close().unwrap();

    assert!(matches!(store.get_embedding("a"), Err(EmbErr::Closed)));
    assert!(matches!(store.count(), Err(EmbErr::Closed)));
    assert!(matches!(
        store.set_embedding("b", vector([1., 2., 3.])),
        Err(EmbErr::Closed)
    ));
}

#[test]
fn encoder_looks_each_word_up_once() {
    init_logger();
    let db = Arc::new(CountingDb::default());
    let store = EmbeddingStore::with_db(config(), db.clone());
    store.set_embedding("the", vector([1., 0., 0.])).unwrap();
    store.set_embedding("cat", vector([0., 1., 0.])).unwrap();

    let mut g = Graph::new();
    let nodes = Encoder::new(&store, &mut g)
        .encode(&["the", "the", "cat"])
        .unwrap();

    assert_eq!(db.gets.load(Ordering::Relaxed), 2);
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0], nodes[1]);
    assert_ne!(nodes[0], nodes[2]);
    assert_eq!(g.len(), 2);

    let cat = nodes[2].unwrap();
    assert_eq!(g.value(cat).as_slice(), [0., 1., 0.]);
}

#[test]
fn encoder_substitutes_missing_words() {
    let with_zero = Config {
        use_zero_embedding: true,
        ..config()
    };
    let store = EmbeddingStore::with_db(with_zero, Arc::new(MemoryDb::new()));
    store.set_embedding("known", vector([1., 1., 1.])).unwrap();

    let mut g = Graph::new();
    let nodes = Encoder::new(&store, &mut g)
        .encode(&["known", "unknown", "missing"])
        .unwrap();

    let zero = nodes[1].unwrap();
    assert_eq!(nodes[2], Some(zero));
    assert_eq!(g.value(zero).as_slice(), [0.; SIZE]);
    assert!(!g.requires_grad(zero));

    let store = EmbeddingStore::with_db(config(), Arc::new(MemoryDb::new()));
    let mut g = Graph::new();
    let nodes = Encoder::new(&store, &mut g).encode(&["unknown"]).unwrap();
    assert_eq!(nodes, [None]);
}

#[test]
fn gradients_reach_the_embeddings() {
    let store = EmbeddingStore::with_db(config(), Arc::new(MemoryDb::new()));
    store.set_embedding("x", vector([1., 2., 3.])).unwrap();

    let mut g = Graph::new();
    let nodes = Encoder::new(&store, &mut g).encode(&["x", "x"]).unwrap();
    let x = nodes[0].unwrap();

    let sq = g.square(x).unwrap();
    let loss = g.reduce_sum(sq).unwrap();
    g.backward(loss, None).unwrap();

    let x = store.get_embedding("x").unwrap().unwrap();
    assert_eq!(x.grad().unwrap().as_slice(), [2., 4., 6.]);
}

#[test]
fn file_backed_stores_persist() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        db_path: dir.path().join("vectors"),
        ..config()
    };

    let registry = Registry::new();
    let store = registry.open(config.clone()).unwrap();
    store.set_embedding("hello", vector([1., 2., 3.])).unwrap();
    registry.close().unwrap();

    assert!(matches!(store.count(), Err(EmbErr::Closed)));

    let reopened = EmbeddingStore::open(Config {
        read_only: true,
        ..config
    })
    .unwrap();
    assert_eq!(reopened.count().unwrap(), 1);

    let hello = reopened.get_embedding("hello").unwrap().unwrap();
    assert_eq!(hello.value().as_slice(), [1., 2., 3.]);
}

#[test]
fn registry_clears_every_store() {
    let registry = Registry::new();
    let a = Arc::new(EmbeddingStore::with_db(config(), Arc::new(MemoryDb::new())));
    let b = Arc::new(EmbeddingStore::with_db(config(), Arc::new(MemoryDb::new())));
    registry.register(a.clone());
    registry.register(b.clone());

    a.set_embedding("w", vector([1., 1., 1.])).unwrap();
    b.set_embedding("w", vector([2., 2., 2.])).unwrap();
    a.get_embedding("w").unwrap();
    b.get_embedding("w").unwrap();

    registry.clear_used_embeddings();

    assert_eq!(registry.len(), 2);
    assert!(a.used_embeddings().is_empty());
    assert!(b.used_embeddings().is_empty());
}
