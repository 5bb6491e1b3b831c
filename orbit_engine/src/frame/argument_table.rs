//! Indirect argument table
//!
//! One buffer of fixed-stride [`ArgumentEntry`] records, one per schema slot,
//! bound as a single vertex-stage binding in place of the buffers it
//! references. The table is built and flushed once; only the contents of the
//! referenced buffers may change afterwards.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::frame::layout::{ArgumentEntry, ARGUMENT_ENTRY_STRIDE};
use crate::graphics_device::{Buffer, BufferDesc, BufferHandle, BufferUsage, GraphicsDevice};
use crate::{engine_debug, engine_error};

/// Ordered list of named slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSchema {
    slots: Vec<String>,
}

impl ArgumentSchema {
    pub fn new(names: &[&str]) -> Self {
        Self {
            slots: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// `0 -> positions`, `1 -> colors`
    pub fn geometry() -> Self {
        Self::new(&["positions", "colors"])
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn name(&self, slot: u32) -> Option<&str> {
        self.slots.get(slot as usize).map(String::as_str)
    }

    pub fn slot_of(&self, name: &str) -> Option<u32> {
        self.slots.iter().position(|s| s == name).map(|i| i as u32)
    }

    /// Byte offset of `slot`'s entry inside the table
    pub fn entry_offset(slot: u32) -> u64 {
        slot as u64 * ARGUMENT_ENTRY_STRIDE
    }
}

/// Built argument table
pub struct ArgumentTable {
    buffer: Box<dyn Buffer>,
    schema: ArgumentSchema,
    /// Referenced buffers, indexed by schema slot
    resources: Vec<Arc<dyn Buffer>>,
    entries: Vec<ArgumentEntry>,
}

fn violation(message: String) -> Error {
    engine_error!("orbit::ArgumentTable", "{}", message);
    Error::SchemaViolation(message)
}

impl ArgumentTable {
    /// Encode `resources` (buffer, schema slot) into a new table
    ///
    /// Every schema slot must be bound exactly once.
    pub fn build<D: GraphicsDevice>(
        device: &mut D,
        schema: ArgumentSchema,
        resources: &[(Arc<dyn Buffer>, u32)],
    ) -> Result<Self> {
        if schema.is_empty() {
            return Err(violation("argument schema has no slots".to_string()));
        }

        let mut bound: Vec<Option<Arc<dyn Buffer>>> = vec![None; schema.len()];
        for (buffer, slot) in resources {
            let Some(entry) = bound.get_mut(*slot as usize) else {
                return Err(violation(format!(
                    "slot {} outside schema of {} slots", slot, schema.len()
                )));
            };
            if entry.is_some() {
                return Err(violation(format!(
                    "slot {} ({}) bound twice", slot, schema.slots[*slot as usize]
                )));
            }
            *entry = Some(Arc::clone(buffer));
        }

        let mut ordered = Vec::with_capacity(schema.len());
        for (slot, entry) in bound.into_iter().enumerate() {
            match entry {
                Some(buffer) => ordered.push(buffer),
                None => {
                    return Err(violation(format!(
                        "slot {} ({}) left unbound", slot, schema.slots[slot]
                    )));
                }
            }
        }

        let entries: Vec<ArgumentEntry> = ordered
            .iter()
            .map(|b| ArgumentEntry { gpu_address: b.handle().gpu_address, offset: 0 })
            .collect();

        let size = ARGUMENT_ENTRY_STRIDE * schema.len() as u64;
        let mut buffer = device.create_buffer(&BufferDesc::host_visible(
            "argument_table",
            size,
            BufferUsage::Argument,
        ))?;
        for (slot, entry) in entries.iter().enumerate() {
            buffer.write(ArgumentSchema::entry_offset(slot as u32), &entry.encode())?;
        }
        buffer.flush(0..size)?;

        engine_debug!("orbit::ArgumentTable",
            "Built table with {} entries ({} bytes)", entries.len(), size);

        Ok(Self { buffer, schema, resources: ordered, entries })
    }

    /// Handle bound as the single binding standing in for every resource
    pub fn handle(&self) -> BufferHandle {
        self.buffer.handle()
    }

    pub fn buffer(&self) -> &dyn Buffer {
        self.buffer.as_ref()
    }

    pub fn entry(&self, slot: u32) -> Option<ArgumentEntry> {
        self.entries.get(slot as usize).copied()
    }

    /// Encoded table bytes as written to the buffer
    pub fn encoded(&self) -> Vec<u8> {
        self.entries.iter().flat_map(|e| e.encode()).collect()
    }

    /// Referenced buffers in slot order
    pub fn resources(&self) -> &[Arc<dyn Buffer>] {
        &self.resources
    }

    pub fn resource(&self, slot: u32) -> Option<&Arc<dyn Buffer>> {
        self.resources.get(slot as usize)
    }

    pub fn schema(&self) -> &ArgumentSchema {
        &self.schema
    }
}

#[cfg(test)]
#[path = "argument_table_tests.rs"]
mod tests;
