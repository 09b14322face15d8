//! The effect/event dispatch engine.

pub mod context;
pub mod descriptor;
pub mod dispatch;
pub mod kind;
pub mod relay;

pub use context::{EventContext, EventTarget, Holder};
pub use descriptor::{
    Callback, DescriptorBuilder, HandlerDescriptor, HandlerFn, HandlerTable, Outcome, Scope, Signature,
};
pub use dispatch::{
    catalog_event, default_relay, each_event, field_event, handler_order, priority_event, run_event,
    run_event_with, single_event, speed_order, FireOptions,
};
pub use kind::{EventKind, EventSignature, TargetShape, VetoRule};
pub use relay::{RelayKind, RelayKinds, RelayValue, Secondary};
