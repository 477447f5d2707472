use std::{
    fmt::{self, Display},
    io::Cursor,
    mem,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use kvdb::KeyValueDb;
use log::error;
use matrix::Matrix;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};

use crate::{Result, serializer};

/// What a parameter is used for inside a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamsType {
    Weights,
    Biases,
    #[default]
    Undefined,
}

impl Display for ParamsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamsType::Weights => "weights",
            ParamsType::Biases => "biases",
            ParamsType::Undefined => "undefined",
        };

        write!(f, "{s}")
    }
}

/// Case insensitive, anything unknown is `Undefined`.
impl From<&str> for ParamsType {
    fn from(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "weights" => ParamsType::Weights,
            "biases" => ParamsType::Biases,
            _ => ParamsType::Undefined,
        }
    }
}

/// Auxiliary state kept by an optimizer next to a parameter.
///
/// The `label` identifies the optimizer that owns the data, `0` means none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub label: i64,
    pub data: Vec<Matrix>,
}

impl Payload {
    pub fn new(label: i64, data: Vec<Matrix>) -> Self {
        Self { label, data }
    }

    /// Gives every buffer back to the pool.
    pub fn release(self) {
        self.data.into_iter().for_each(Matrix::release);
    }
}

#[derive(Debug)]
struct Meta {
    name: String,
    kind: ParamsType,
}

#[derive(Debug)]
pub(crate) struct State {
    pub(crate) value: Matrix,
    pub(crate) grad: Option<Matrix>,
    pub(crate) payload: Option<Payload>,
}

/// A named, trainable value that accumulates gradients.
///
/// A `Param` is shared between graphs and threads behind an `Arc`. Every mutation takes the
/// parameter's lock exclusively, so concurrent `propagate_grad` calls never lose an update.
///
/// When a storage is attached, every change of the value or the payload is written through
/// to it under the parameter's name.
pub struct Param {
    meta: RwLock<Meta>,
    state: RwLock<State>,
    requires_grad: AtomicBool,
    storage: Option<Arc<dyn KeyValueDb>>,
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = self.meta.read();
        f.debug_struct("Param")
            .field("name", &meta.name)
            .field("kind", &meta.kind)
            .field("dims", &self.value().dims())
            .field("requires_grad", &self.requires_grad())
            .finish_non_exhaustive()
    }
}

impl Param {
    /// Creates a new unnamed `Param` that requires gradients.
    ///
    /// # Arguments
    /// * `value` - The initial value.
    ///
    /// # Returns
    /// A new `Param` instance.
    pub fn new(value: Matrix) -> Self {
        Self::with_parts(value, None)
    }

    pub(crate) fn with_parts(value: Matrix, payload: Option<Payload>) -> Self {
        Self {
            meta: RwLock::new(Meta {
                name: String::new(),
                kind: ParamsType::Undefined,
            }),
            state: RwLock::new(State {
                value,
                grad: None,
                payload,
            }),
            requires_grad: AtomicBool::new(true),
            storage: None,
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.meta.write().name = name.into();
        self
    }

    pub fn with_type(self, kind: ParamsType) -> Self {
        self.meta.write().kind = kind;
        self
    }

    pub fn with_requires_grad(self, requires_grad: bool) -> Self {
        self.set_requires_grad(requires_grad);
        self
    }

    /// Attaches a store every change is written through to, keyed by the parameter's name.
    pub fn with_storage(mut self, storage: Arc<dyn KeyValueDb>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Decodes a parameter previously encoded with `to_bytes`.
    ///
    /// # Returns
    /// The decoded `Param`, unnamed and requiring gradients, or a `Decode` error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let data = serializer::deserialize(&mut Cursor::new(bytes))?;
        Ok(data.into_param())
    }

    /// Encodes the value and the payload of this parameter.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        serializer::serialize(self, &mut buf)?;
        Ok(buf)
    }

    pub fn name(&self) -> String {
        self.meta.read().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.meta.write().name = name.into();
    }

    pub fn kind(&self) -> ParamsType {
        self.meta.read().kind
    }

    pub fn set_kind(&self, kind: ParamsType) {
        self.meta.write().kind = kind;
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad.load(Ordering::Acquire)
    }

    pub fn set_requires_grad(&self, requires_grad: bool) {
        self.requires_grad.store(requires_grad, Ordering::Release);
    }

    /// Borrows the current value, the parameter can't be mutated while the guard lives.
    pub fn value(&self) -> MappedRwLockReadGuard<'_, Matrix> {
        RwLockReadGuard::map(self.state.read_recursive(), |state| &state.value)
    }

    /// Returns a copy of the accumulated gradient, `None` if there's none.
    pub fn grad(&self) -> Option<Matrix> {
        self.state.read().grad.clone()
    }

    pub fn has_grad(&self) -> bool {
        self.state.read().grad.is_some()
    }

    /// Returns a copy of the optimizer payload, `None` if there's none.
    pub fn payload(&self) -> Option<Payload> {
        self.state.read().payload.clone()
    }

    /// Replaces the value, dropping the gradient and the payload.
    ///
    /// # Arguments
    /// * `value` - The new value, it may have different dimensions.
    ///
    /// # Returns
    /// A `Storage` error if the write-through fails, the value is replaced anyway.
    pub fn replace_value(&self, value: Matrix) -> Result<()> {
        let mut state = self.state.write();

        mem::replace(&mut state.value, value).release();
        if let Some(grad) = state.grad.take() {
            grad.release();
        }
        if let Some(payload) = state.payload.take() {
            payload.release();
        }

        self.write_through(&state)
    }

    /// Accumulates `grad` into this parameter's gradient.
    ///
    /// Does nothing unless the parameter requires gradients. The gradient buffer is taken from
    /// the pool the first time.
    ///
    /// # Returns
    /// A `ShapeMismatch` if `grad` doesn't have the dimensions of the value.
    pub fn propagate_grad(&self, grad: &Matrix) -> Result<()> {
        Ok(self.accumulate_grad(grad)?)
    }

    fn accumulate_grad(&self, grad: &Matrix) -> matrix::Result<()> {
        if !self.requires_grad() {
            return Ok(());
        }

        let mut state = self.state.write();
        let State { value, grad: acc, .. } = &mut *state;

        match acc {
            Some(acc) => acc.add_in_place(grad),
            None => {
                let mut fresh = Matrix::zeros(value.rows(), value.cols());
                fresh.add_in_place(grad)?;
                *acc = Some(fresh);
                Ok(())
            }
        }
    }

    /// Subtracts `delta` from the value.
    ///
    /// # Returns
    /// A `ShapeMismatch` if the dimensions differ or a `Storage` error if the write-through
    /// fails.
    pub fn apply_delta(&self, delta: &Matrix) -> Result<()> {
        let mut state = self.state.write();
        state.value.sub_in_place(delta)?;
        self.write_through(&state)
    }

    /// Releases the gradient buffer.
    pub fn zero_grad(&self) {
        if let Some(grad) = self.state.write().grad.take() {
            grad.release();
        }
    }

    pub fn set_payload(&self, payload: Payload) -> Result<()> {
        let mut state = self.state.write();
        if let Some(old) = state.payload.replace(payload) {
            old.release();
        }

        self.write_through(&state)
    }

    pub fn clear_payload(&self) -> Result<()> {
        let mut state = self.state.write();
        if let Some(old) = state.payload.take() {
            old.release();
        }

        self.write_through(&state)
    }

    /// Runs one optimization step under the parameter's lock.
    ///
    /// # Arguments
    /// * `f` - Computes the delta to subtract from the value given the gradient, it may
    ///   create or update the payload.
    ///
    /// # Returns
    /// Whether there was a gradient to optimize with, or an error from `f`, the subtraction
    /// or the write-through.
    pub fn optimize_with<F>(&self, f: F) -> Result<bool>
    where
        F: FnOnce(&Matrix, &mut Option<Payload>) -> Result<Matrix>,
    {
        self.step_with(f, false)
    }

    /// Same as `optimize_with` but also releases the gradient before giving the lock up.
    ///
    /// Gradients propagated concurrently either land before the step and are consumed by
    /// it, or after it and are kept for the next one. On error the gradient is kept.
    pub fn optimize_and_zero_grad_with<F>(&self, f: F) -> Result<bool>
    where
        F: FnOnce(&Matrix, &mut Option<Payload>) -> Result<Matrix>,
    {
        self.step_with(f, true)
    }

    fn step_with<F>(&self, f: F, zero_grad: bool) -> Result<bool>
    where
        F: FnOnce(&Matrix, &mut Option<Payload>) -> Result<Matrix>,
    {
        let mut state = self.state.write();
        let State {
            value,
            grad,
            payload,
        } = &mut *state;

        let Some(current) = grad.as_ref() else {
            return Ok(false);
        };

        let delta = f(current, payload)?;
        let res = value.sub_in_place(&delta);
        delta.release();
        res?;

        if zero_grad {
            grad.take().into_iter().for_each(Matrix::release);
        }

        self.write_through(&state)?;
        Ok(true)
    }

    /// Gives the value, gradient and payload buffers back to the pool.
    ///
    /// Nothing is written through. The parameter is left with an empty value and must not be
    /// used anymore.
    pub fn release(&self) {
        let mut state = self.state.write();

        mem::take(&mut state.value).release();
        if let Some(grad) = state.grad.take() {
            grad.release();
        }
        if let Some(payload) = state.payload.take() {
            payload.release();
        }
    }

    pub(crate) fn state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read_recursive()
    }

    fn write_through(&self, state: &State) -> Result<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };

        let mut buf = Vec::new();
        serializer::write_parts(&state.value, state.payload.as_ref(), &mut buf)?;

        let name = self.name();
        storage.put(name.as_bytes(), &buf).inspect_err(|e| {
            error!("failed to write parameter {name:?} through: {e}");
        })?;

        Ok(())
    }
}

impl autograd::Parameter for Param {
    fn value(&self) -> MappedRwLockReadGuard<'_, Matrix> {
        Param::value(self)
    }

    fn requires_grad(&self) -> bool {
        Param::requires_grad(self)
    }

    fn propagate_grad(&self, grad: &Matrix) -> matrix::Result<()> {
        self.accumulate_grad(grad)
    }
}
