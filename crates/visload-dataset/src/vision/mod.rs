mod cifar;
mod fashion_mnist;
mod item;

pub use cifar::*;
pub use fashion_mnist::*;
pub use item::*;
