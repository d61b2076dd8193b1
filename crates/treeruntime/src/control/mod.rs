//! Control actors: the structural nodes of the tree. Each owns its
//! children, derives a nested callable scope for them at `set_up`, and
//! tears them down in reverse order.

mod branch;
mod callable_actors;
mod sequence;
mod stop;
mod storage_value;
mod tee;
mod trigger;
mod while_loop;

pub use branch::Branch;
pub use callable_actors::CallableActors;
pub use sequence::Sequence;
pub use stop::Stop;
pub use storage_value::StorageValueSequence;
pub use tee::Tee;
pub use trigger::Trigger;
pub use while_loop::WhileLoop;
