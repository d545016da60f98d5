//! ARQ 世界实现
//!
//! 持有唯一的协议引擎；协议事件通过 [`with_engine`] 访问它。

use std::any::Any;

use super::engine::ProtocolEngine;
use crate::sim::World;

pub struct ArqWorld {
    pub engine: ProtocolEngine,
}

impl ArqWorld {
    pub fn new(engine: ProtocolEngine) -> Self {
        Self { engine }
    }
}

impl World for ArqWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) fn with_engine<F, R>(world: &mut dyn World, f: F) -> R
where
    F: FnOnce(&mut ProtocolEngine) -> R,
{
    let w = world
        .as_any_mut()
        .downcast_mut::<ArqWorld>()
        .expect("world must be ArqWorld");
    f(&mut w.engine)
}
