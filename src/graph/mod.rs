pub mod dependency_dag;
pub mod flatten;

pub use dependency_dag::DependencyDag;
pub use flatten::{FlatTasks, flatten};
