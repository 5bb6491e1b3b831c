/// Per-frame resources: wire layout, argument table, slot ring and admission

pub mod admission;
pub mod argument_table;
pub mod layout;
pub mod ring;

pub use admission::{AdmissionSemaphore, CompletionToken, SlotRelease};
pub use argument_table::{ArgumentSchema, ArgumentTable};
pub use layout::*;
pub use ring::{FrameSlot, FrameSlotRing, SlotState};
