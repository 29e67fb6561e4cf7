//! Byte-string stack used by the interpreter.

use crate::ScriptError;

pub(crate) const MAX_STACK_SIZE: usize = 1000;
pub(crate) const MAX_ELEMENT_SIZE: usize = 520;

/// Ordered sequence of byte strings with last-in-first-out access.
///
/// Underflow is a typed failure, never a panic. The consensus ceilings on
/// element size and stack depth are enforced on push so a runaway script
/// cannot grow without bound.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stack {
    items: Vec<Vec<u8>>,
}

impl Stack {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Builds a stack from pre-existing elements, bottom first. Used to
    /// seed execution of a witness script from the witness items.
    pub fn from_items(items: Vec<Vec<u8>>) -> Result<Self, ScriptError> {
        if items.len() > MAX_STACK_SIZE {
            return Err(ScriptError::StackOverflow);
        }
        for item in &items {
            if item.len() > MAX_ELEMENT_SIZE {
                return Err(ScriptError::PushSize);
            }
        }
        Ok(Self { items })
    }

    pub fn push(&mut self, data: Vec<u8>) -> Result<(), ScriptError> {
        if data.len() > MAX_ELEMENT_SIZE {
            return Err(ScriptError::PushSize);
        }
        if self.items.len() >= MAX_STACK_SIZE {
            return Err(ScriptError::StackOverflow);
        }
        self.items.push(data);
        Ok(())
    }

    /// Pushes the canonical boolean encodings: `[1]` for true, the empty
    /// element for false.
    pub fn push_bool(&mut self, value: bool) -> Result<(), ScriptError> {
        if value {
            self.push(vec![1])
        } else {
            self.push(Vec::new())
        }
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, ScriptError> {
        self.items.pop().ok_or(ScriptError::StackUnderflow)
    }

    pub fn peek(&self) -> Result<&[u8], ScriptError> {
        self.items
            .last()
            .map(Vec::as_slice)
            .ok_or(ScriptError::StackUnderflow)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn swap_top(&mut self) -> Result<(), ScriptError> {
        if self.items.len() < 2 {
            return Err(ScriptError::StackUnderflow);
        }
        let len = self.items.len();
        self.items.swap(len - 2, len - 1);
        Ok(())
    }
}

/// Bitcoin Core's `CastToBool`: all-zero elements are false, as is the
/// negative-zero encoding (an element whose last byte is 0x80 and whose
/// other bytes are zero).
pub(crate) fn cast_to_bool(data: &[u8]) -> bool {
    for (i, &byte) in data.iter().enumerate() {
        if byte != 0 {
            if i == data.len() - 1 && byte == 0x80 {
                return false;
            }
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_on_empty_is_underflow() {
        let mut stack = Stack::new();
        assert_eq!(stack.pop(), Err(ScriptError::StackUnderflow));
        assert_eq!(stack.peek(), Err(ScriptError::StackUnderflow));
    }

    #[test]
    fn push_pop_is_lifo() {
        let mut stack = Stack::new();
        stack.push(vec![1]).unwrap();
        stack.push(vec![2]).unwrap();
        assert_eq!(stack.peek().unwrap(), &[2]);
        assert_eq!(stack.pop().unwrap(), vec![2]);
        assert_eq!(stack.pop().unwrap(), vec![1]);
        assert!(stack.is_empty());
    }

    #[test]
    fn oversized_element_is_rejected() {
        let mut stack = Stack::new();
        let err = stack.push(vec![0; MAX_ELEMENT_SIZE + 1]).unwrap_err();
        assert_eq!(err, ScriptError::PushSize);
        assert!(Stack::from_items(vec![vec![0; MAX_ELEMENT_SIZE + 1]]).is_err());
    }

    #[test]
    fn depth_limit_is_enforced() {
        let mut stack = Stack::from_items(vec![Vec::new(); MAX_STACK_SIZE]).unwrap();
        assert_eq!(stack.push(Vec::new()), Err(ScriptError::StackOverflow));
    }

    #[test]
    fn zero_encodings_are_falsy() {
        assert!(!cast_to_bool(&[]));
        assert!(!cast_to_bool(&[0, 0]));
        assert!(!cast_to_bool(&[0, 0x80]));
        assert!(cast_to_bool(&[0x80, 0]));
        assert!(cast_to_bool(&[1]));
    }
}
