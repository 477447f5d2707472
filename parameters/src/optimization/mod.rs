mod adam;
mod decay;
mod gradient_descent;
mod gradient_descent_with_momentum;
mod optimizer;
mod trainer;

pub use adam::Adam;
pub use decay::ExponentialDecay;
pub use gradient_descent::GradientDescent;
pub use gradient_descent_with_momentum::GradientDescentWithMomentum;
pub use optimizer::{Optimizer, optimize, optimize_and_zero_grad};
pub use trainer::Trainer;
