//! Lexical scopes for values and types

use std::collections::HashMap;

use super::types::Ty;

#[derive(Debug, Clone)]
pub struct Variable {
    pub ty: Ty,
    pub is_constant: bool,
    /// Used in redeclaration messages: "constant", "variable", "function", ...
    pub kind: &'static str,
}

/// A stack of activations; the first one holds the built-ins
#[derive(Debug)]
pub struct Scopes<T> {
    frames: Vec<HashMap<String, T>>,
}

impl<T> Scopes<T> {
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Whether `name` is declared in the innermost activation
    pub fn declared_in_current(&self, name: &str) -> bool {
        self.frames
            .last()
            .map(|frame| frame.contains_key(name))
            .unwrap_or(false)
    }

    /// Declare in the innermost activation, returning the previous entry there
    pub fn declare(&mut self, name: impl Into<String>, value: T) -> Option<T> {
        match self.frames.last_mut() {
            Some(frame) => frame.insert(name.into(), value),
            None => None,
        }
    }
}

impl<T> Default for Scopes<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowing_and_pop() {
        let mut scopes = Scopes::new();
        scopes.declare("x", 1);
        scopes.push();
        assert!(!scopes.declared_in_current("x"));
        scopes.declare("x", 2);
        assert_eq!(scopes.lookup("x"), Some(&2));
        scopes.pop();
        assert_eq!(scopes.lookup("x"), Some(&1));
    }

    #[test]
    fn test_base_frame_is_never_popped() {
        let mut scopes: Scopes<u8> = Scopes::new();
        scopes.declare("x", 1);
        scopes.pop();
        assert_eq!(scopes.lookup("x"), Some(&1));
        assert!(scopes.declared_in_current("x"));
    }
}
