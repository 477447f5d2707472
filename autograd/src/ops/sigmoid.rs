use matrix::Float;

/// A logistic curve scaled by `amp`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sigmoid {
    amp: Float,
}

impl Sigmoid {
    pub fn new(amp: Float) -> Self {
        Self { amp }
    }

    pub fn f(&self, z: Float) -> Float {
        self.amp * logistic(z)
    }

    /// The derivative `amp * s * (1 - s)`, finite over the whole real line.
    pub fn df(&self, z: Float) -> Float {
        let s = logistic(z);
        self.amp * s * (1. - s)
    }
}

/// Evaluates `1 / (1 + e^-z)` without ever exponentiating a positive number.
fn logistic(z: Float) -> Float {
    if z >= 0. {
        1. / (1. + (-z).exp())
    } else {
        let e = z.exp();
        e / (1. + e)
    }
}
