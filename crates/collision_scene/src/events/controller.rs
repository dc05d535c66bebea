//! Collision controllers and type-erased handlers
//!
//! A controller is any object that wants collision events. Handlers are
//! plain functions over the concrete controller type; [`erase`] wraps one
//! into a closure over `dyn CollisionController` that downcasts on call.

use std::any::Any;
use std::rc::Rc;

use crate::events::{CollisionEvent, HandlerKind};
use crate::foundation::collections::ControllerId;

/// Receiver of collision events
pub trait CollisionController: Any {
    /// Downcast to Any for type-specific access
    fn as_any(&self) -> &dyn Any;

    /// Downcast to Any for mutable type-specific access
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Type name used in diagnostics
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Handler callable on any controller; checks the controller type on call
pub type ErasedHandler = Rc<dyn Fn(&mut dyn CollisionController, &CollisionEvent)>;

/// Erase a typed handler
pub fn erase<C: CollisionController>(handler: fn(&mut C, &CollisionEvent)) -> ErasedHandler {
    Rc::new(move |controller: &mut dyn CollisionController, event: &CollisionEvent| {
        let name = controller.name();
        match controller.as_any_mut().downcast_mut::<C>() {
            Some(typed) => handler(typed, event),
            None => log::error!(
                "Handler for {} invoked on controller {}",
                std::any::type_name::<C>(),
                name
            ),
        }
    })
}

/// One bound handler, as delivered by the dispatcher
#[derive(Clone)]
pub struct HandlerRecord {
    /// Controller that registered the handler
    pub controller: ControllerId,
    /// Result kind the handler consumes
    pub kind: HandlerKind,
    /// Erased handler function
    pub handler: ErasedHandler,
}

impl std::fmt::Debug for HandlerRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRecord")
            .field("controller", &self.controller)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
