//! Bounded accumulator for streamed tool-call fragments.

use crate::error::LlmError;
use crate::event::Event;

#[derive(Debug, Default, Clone)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

/// Fixed-capacity slots keyed by the vendor's tool-call index.
///
/// Fragments accumulate until the vendor's terminating signal, then
/// [`flush`](Self::flush) turns every occupied slot into one
/// [`Event::ToolUse`] in index order. An index at or past the capacity is
/// a [`LlmError::Protocol`] error.
#[derive(Debug)]
pub struct ToolCallBuffer {
    slots: Vec<Option<PendingCall>>,
}

impl ToolCallBuffer {
    /// Creates a buffer with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Opens a call in the first free slot and returns the slot index.
    pub fn open(&mut self, id: &str, name: &str) -> Result<usize, LlmError> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| self.overflow())?;
        self.slots[slot] = Some(PendingCall {
            id: id.to_owned(),
            name: name.to_owned(),
            arguments: String::new(),
        });
        Ok(slot)
    }

    /// Opens a call with complete arguments in the first free slot.
    pub fn push_complete(&mut self, id: &str, name: &str, arguments: &str) -> Result<(), LlmError> {
        let slot = self.open(id, name)?;
        self.append(slot, arguments)
    }

    /// Appends an argument fragment to an opened slot.
    pub fn append(&mut self, slot: usize, fragment: &str) -> Result<(), LlmError> {
        match self.slots.get_mut(slot) {
            Some(Some(call)) => {
                call.arguments.push_str(fragment);
                Ok(())
            }
            Some(None) => Err(LlmError::Protocol(format!(
                "argument fragment for unopened tool call {slot}"
            ))),
            None => Err(LlmError::Protocol(format!(
                "tool call slot {slot} out of range"
            ))),
        }
    }

    /// Creates or extends the call at `index`.
    ///
    /// Non-empty `id` and `name` fill in fields still empty; fragments
    /// always concatenate.
    pub fn upsert(
        &mut self,
        index: usize,
        id: &str,
        name: &str,
        fragment: &str,
    ) -> Result<(), LlmError> {
        let capacity = self.capacity();
        let Some(slot) = self.slots.get_mut(index) else {
            return Err(LlmError::Protocol(format!(
                "tool call index {index} exceeds {capacity} slots"
            )));
        };
        let call = slot.get_or_insert_with(PendingCall::default);
        if call.id.is_empty() {
            id.clone_into(&mut call.id);
        }
        if call.name.is_empty() {
            name.clone_into(&mut call.name);
        }
        call.arguments.push_str(fragment);
        Ok(())
    }

    /// Drains every occupied slot as a [`Event::ToolUse`], in index order.
    pub fn flush(&mut self) -> Vec<Event> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.take().map(|call| Event::ToolUse {
                    id: call.id,
                    index: u32::try_from(index).unwrap_or(u32::MAX),
                    name: call.name,
                    arguments: call.arguments,
                })
            })
            .collect()
    }

    fn overflow(&self) -> LlmError {
        LlmError::Protocol(format!(
            "more than {} parallel tool calls in one turn",
            self.capacity()
        ))
    }
}
