//! Frame slot ring: N copies of the per-frame mutable buffers
//!
//! Each tick the orchestrator advances the ring exactly once, writes the
//! claimed slot, then flushes it. Flushing seals the slot: it is now
//! referenced by a submission and stays read-only until the ring comes back
//! around to it. The admission gate guarantees the GPU is done with a slot
//! before it is claimed again.

use std::ops::Range;
use crate::error::{Error, Result};
use crate::frame::layout::{CameraData, InstanceData, CAMERA_SIZE, INSTANCE_STRIDE};
use crate::graphics_device::{Buffer, BufferDesc, BufferHandle, BufferUsage, GraphicsDevice};
use crate::{engine_error, engine_trace, engine_warn};

/// Lifecycle of one ring slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Never claimed
    Free,
    /// Claimed for the current tick, host writes allowed
    Claimed,
    /// Flushed and handed to a submission
    Sealed,
}

/// One element of the ring
pub struct FrameSlot {
    index: usize,
    instances: Box<dyn Buffer>,
    camera: Box<dyn Buffer>,
    state: SlotState,
    instance_dirty: Option<Range<u64>>,
    camera_dirty: Option<Range<u64>>,
    claims: u64,
}

impl FrameSlot {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Number of times this slot has been claimed
    pub fn claims(&self) -> u64 {
        self.claims
    }

    pub fn instance_buffer(&self) -> &dyn Buffer {
        self.instances.as_ref()
    }

    pub fn camera_buffer(&self) -> &dyn Buffer {
        self.camera.as_ref()
    }

    pub fn instance_handle(&self) -> BufferHandle {
        self.instances.handle()
    }

    pub fn camera_handle(&self) -> BufferHandle {
        self.camera.handle()
    }

    fn reset(&mut self) {
        self.instance_dirty = None;
        self.camera_dirty = None;
    }
}

impl std::fmt::Debug for FrameSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSlot")
            .field("index", &self.index)
            .field("state", &self.state)
            .field("claims", &self.claims)
            .finish()
    }
}

fn extend(dirty: &mut Option<Range<u64>>, range: Range<u64>) {
    *dirty = Some(match dirty.take() {
        Some(d) => d.start.min(range.start)..d.end.max(range.end),
        None => range,
    });
}

/// Round-robin ring of frame slots
pub struct FrameSlotRing {
    slots: Vec<FrameSlot>,
    current: usize,
    instance_count: usize,
    // set by advance, cleared by rewind
    rewindable: bool,
}

impl FrameSlotRing {
    /// Allocate every slot up front
    ///
    /// Each slot gets an instance buffer of `instance_count * frames_in_flight`
    /// records and a camera buffer of `frames_in_flight` records. Only the
    /// first `instance_count` records and the first camera record are used
    /// per tick.
    pub fn new<D: GraphicsDevice>(
        device: &mut D,
        instance_count: usize,
        frames_in_flight: usize,
    ) -> Result<Self> {
        if frames_in_flight == 0 {
            return Err(Error::InitializationFailed("frame ring needs at least one slot".to_string()));
        }

        let instance_bytes = (instance_count as u64)
            .checked_mul(frames_in_flight as u64)
            .and_then(|records| records.checked_mul(INSTANCE_STRIDE))
            .ok_or_else(|| Error::InitializationFailed(format!(
                "{} instances over {} slots overflows the instance buffer size",
                instance_count, frames_in_flight
            )))?;
        let camera_bytes = CAMERA_SIZE
            .checked_mul(frames_in_flight as u64)
            .ok_or_else(|| Error::InitializationFailed(format!(
                "{} slots overflows the camera buffer size", frames_in_flight
            )))?;

        let mut slots = Vec::with_capacity(frames_in_flight);
        for index in 0..frames_in_flight {
            let instances = device.create_buffer(&BufferDesc::host_visible(
                format!("instances[{}]", index),
                instance_bytes,
                BufferUsage::Storage,
            ))?;
            let camera = device.create_buffer(&BufferDesc::host_visible(
                format!("camera[{}]", index),
                camera_bytes,
                BufferUsage::Uniform,
            ))?;
            slots.push(FrameSlot {
                index,
                instances,
                camera,
                state: SlotState::Free,
                instance_dirty: None,
                camera_dirty: None,
                claims: 0,
            });
        }

        engine_trace!("orbit::FrameSlotRing",
            "Allocated {} slots ({} instance bytes, {} camera bytes each)",
            frames_in_flight, instance_bytes, camera_bytes);

        Ok(Self {
            slots,
            // first advance lands on slot 0
            current: frames_in_flight - 1,
            instance_count,
            rewindable: false,
        })
    }

    /// Claim the next slot, `(previous + 1) mod N`
    pub fn advance(&mut self) -> usize {
        if self.slots[self.current].state == SlotState::Claimed {
            engine_warn!("orbit::FrameSlotRing",
                "Slot {} abandoned before flush", self.current);
            let abandoned = &mut self.slots[self.current];
            abandoned.reset();
            abandoned.state = SlotState::Free;
        }

        self.current = (self.current + 1) % self.slots.len();
        let slot = &mut self.slots[self.current];
        slot.reset();
        slot.state = SlotState::Claimed;
        slot.claims += 1;
        self.rewindable = true;
        self.current
    }

    /// Give back the claim made by the last [`advance`](Self::advance)
    ///
    /// Used when the tick never reached the queue. The slot returns to
    /// `Free` and the next advance claims it again. Only one claim can be
    /// given back; further calls are no-ops.
    pub fn rewind(&mut self) {
        if !self.rewindable {
            return;
        }
        self.rewindable = false;

        let slot = &mut self.slots[self.current];
        slot.reset();
        slot.state = SlotState::Free;
        slot.claims -= 1;
        engine_trace!("orbit::FrameSlotRing", "Slot {} claim given back", self.current);

        self.current = (self.current + self.slots.len() - 1) % self.slots.len();
    }

    pub fn current(&self) -> &FrameSlot {
        &self.slots[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn slot(&self, index: usize) -> Option<&FrameSlot> {
        self.slots.get(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    /// Write instance `index` of the claimed slot
    pub fn write_instance(&mut self, index: usize, data: &InstanceData) -> Result<()> {
        if index >= self.instance_count {
            engine_error!("orbit::FrameSlotRing",
                "Instance {} out of range (count {})", index, self.instance_count);
            return Err(Error::OutOfBounds {
                index: index as u64,
                len: self.instance_count as u64,
            });
        }
        let slot = self.claimed_mut()?;
        let offset = index as u64 * INSTANCE_STRIDE;
        slot.instances.write(offset, &data.encode())?;
        extend(&mut slot.instance_dirty, offset..offset + INSTANCE_STRIDE);
        Ok(())
    }

    /// Write the camera record of the claimed slot
    pub fn write_camera(&mut self, data: &CameraData) -> Result<()> {
        let slot = self.claimed_mut()?;
        slot.camera.write(0, &data.encode())?;
        extend(&mut slot.camera_dirty, 0..CAMERA_SIZE);
        Ok(())
    }

    /// Flush the ranges written this tick and seal the slot
    pub fn flush(&mut self) -> Result<()> {
        let slot = self.claimed_mut()?;
        if let Some(range) = slot.instance_dirty.take() {
            slot.instances.flush(range)?;
        }
        if let Some(range) = slot.camera_dirty.take() {
            slot.camera.flush(range)?;
        }
        slot.state = SlotState::Sealed;
        Ok(())
    }

    fn claimed_mut(&mut self) -> Result<&mut FrameSlot> {
        let slot = &mut self.slots[self.current];
        if slot.state != SlotState::Claimed {
            engine_error!("orbit::FrameSlotRing",
                "Slot {} is {:?}, not claimed", slot.index, slot.state);
            return Err(Error::SlotNotClaimed(slot.index));
        }
        Ok(slot)
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
