//! Standard actor library
//!
//! Collection of built-in leaf actors for common operations

mod archive;
mod sink;
mod source;
mod standalone;
mod transform;

pub use archive::{AppendArchive, CloseArchive, NewArchive};
pub use sink::{CallableSink, Null, Recorder, RecorderHandle};
pub use source::{Start, StorageValueSource, StringConstants, VariableSource};
pub use standalone::SetVariable;
pub use transform::{Fail, IncVariable, InsertPosition, PassThrough, SetStorageValue, StringInsert};

use std::sync::Arc;
use treeruntime::ActorRegistry;

/// Register all standard actors with a registry
pub fn register_all(registry: &mut ActorRegistry) {
    registry.register(Arc::new(archive::AppendArchiveFactory));
    registry.register(Arc::new(archive::CloseArchiveFactory));
    registry.register(Arc::new(archive::NewArchiveFactory));
    registry.register(Arc::new(sink::CallableSinkFactory));
    registry.register(Arc::new(sink::NullFactory));
    registry.register(Arc::new(sink::RecorderFactory));
    registry.register(Arc::new(source::StartFactory));
    registry.register(Arc::new(source::StorageValueSourceFactory));
    registry.register(Arc::new(source::StringConstantsFactory));
    registry.register(Arc::new(source::VariableSourceFactory));
    registry.register(Arc::new(standalone::SetVariableFactory));
    registry.register(Arc::new(transform::FailFactory));
    registry.register(Arc::new(transform::IncVariableFactory));
    registry.register(Arc::new(transform::PassThroughFactory));
    registry.register(Arc::new(transform::SetStorageValueFactory));
    registry.register(Arc::new(transform::StringInsertFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_the_standard_library() {
        let mut registry = ActorRegistry::new();
        register_all(&mut registry);
        let types = registry.list_types();
        assert!(types.contains(&"source.start".to_string()));
        assert!(types.contains(&"sink.recorder".to_string()));
        assert_eq!(types.len(), 16);
    }
}
