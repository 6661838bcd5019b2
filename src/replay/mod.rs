pub mod describe;
pub mod engine;
pub mod view;

pub use engine::replay;
pub use view::{
    BindingKind, Frame, HeapBlock, HeapKind, PointerClass, ReplayView, Variable, VariableKind,
};
