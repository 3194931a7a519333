//! Lexical scopes for resolution.
//!
//! A [`ScopeStack`] holds one [`Frame`] per function being resolved: the
//! function itself, plus one per lambda nested inside it. Names resolve in
//! the innermost frame first. A lambda frame that misses a name asks the
//! enclosing frame and, on a hit, records a read-only capture.

use rustc_hash::FxHashMap;
use sable_core::{CompilationError, DataType, Span};

/// Identity of a variable within one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: VarId,
    pub name: String,
    pub ty: DataType,
    pub read_only: bool,
    /// Declaration sequence across the whole stack; captures keep the
    /// sequence of the variable they copy.
    pub declared: u32,
}

/// A variable a lambda copies from its enclosing function.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedVar {
    /// The capture inside the lambda.
    pub inner: Variable,
    /// The captured variable in the enclosing frame.
    pub outer: VarId,
}

#[derive(Debug)]
struct Frame {
    blocks: Vec<FxHashMap<String, Variable>>,
    /// `Some` for lambda frames.
    captures: Option<Vec<CapturedVar>>,
    next_id: u32,
    loop_depth: u32,
}

impl Frame {
    fn new(lambda: bool) -> Self {
        Self {
            blocks: vec![FxHashMap::default()],
            captures: lambda.then(Vec::new),
            next_id: 0,
            loop_depth: 0,
        }
    }

    fn find(&self, name: &str) -> Option<&Variable> {
        self.blocks.iter().rev().find_map(|block| block.get(name))
    }

    fn fresh(&mut self) -> VarId {
        let id = VarId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Owned by one resolution; never shared.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
    declarations: u32,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Frames and Blocks
    // ==========================================================================

    pub fn enter_function(&mut self) {
        self.frames.push(Frame::new(false));
    }

    pub fn enter_lambda(&mut self) {
        self.frames.push(Frame::new(true));
    }

    /// Leave the innermost frame, returning its captures in declaration
    /// order and the next free variable id.
    pub fn exit_frame(&mut self) -> (Vec<CapturedVar>, u32) {
        let (mut captures, next_id) = self
            .frames
            .pop()
            .map(|frame| (frame.captures.unwrap_or_default(), frame.next_id))
            .unwrap_or_default();
        captures.sort_by_key(|capture| capture.inner.declared);
        (captures, next_id)
    }

    pub fn push_block(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.blocks.push(FxHashMap::default());
        }
    }

    pub fn pop_block(&mut self) {
        if let Some(frame) = self.frames.last_mut()
            && frame.blocks.len() > 1
        {
            frame.blocks.pop();
        }
    }

    pub fn enter_loop(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.loop_depth += 1;
        }
    }

    pub fn exit_loop(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.loop_depth = frame.loop_depth.saturating_sub(1);
        }
    }

    /// Loops do not extend into lambda bodies.
    pub fn in_loop(&self) -> bool {
        self.frames.last().is_some_and(|frame| frame.loop_depth > 0)
    }

    pub fn in_lambda(&self) -> bool {
        self.frames.last().is_some_and(|frame| frame.captures.is_some())
    }

    // ==========================================================================
    // Variables
    // ==========================================================================

    /// Declare a variable in the innermost block.
    ///
    /// A name may not be redeclared while visible anywhere in the function.
    pub fn declare(
        &mut self,
        name: &str,
        ty: DataType,
        read_only: bool,
        span: Span,
    ) -> Result<Variable, CompilationError> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| CompilationError::InvalidOperation {
                message: "declaration outside of a function".to_string(),
                span,
            })?;
        if frame.find(name).is_some() {
            return Err(CompilationError::VariableRedeclaration {
                name: name.to_string(),
                span,
            });
        }
        let var = Variable {
            id: frame.fresh(),
            name: name.to_string(),
            ty,
            read_only,
            declared: self.declarations,
        };
        self.declarations += 1;
        if let Some(block) = frame.blocks.last_mut() {
            block.insert(name.to_string(), var.clone());
        }
        Ok(var)
    }

    /// A hidden variable no script name can reach.
    pub fn temporary(&mut self) -> Option<VarId> {
        self.frames.last_mut().map(Frame::fresh)
    }

    /// Resolve a name, capturing it into lambda frames on the way.
    pub fn lookup(&mut self, name: &str) -> Option<Variable> {
        let top = self.frames.len().checked_sub(1)?;
        self.lookup_in(top, name)
    }

    fn lookup_in(&mut self, index: usize, name: &str) -> Option<Variable> {
        if let Some(var) = self.frames[index].find(name) {
            return Some(var.clone());
        }
        if self.frames[index].captures.is_none() || index == 0 {
            return None;
        }
        let outer = self.lookup_in(index - 1, name)?;
        let frame = &mut self.frames[index];
        let inner = Variable {
            id: frame.fresh(),
            name: outer.name.clone(),
            ty: outer.ty,
            read_only: true,
            declared: outer.declared,
        };
        if let Some(block) = frame.blocks.first_mut() {
            block.insert(name.to_string(), inner.clone());
        }
        if let Some(captures) = frame.captures.as_mut() {
            captures.push(CapturedVar {
                inner: inner.clone(),
                outer: outer.id,
            });
        }
        Some(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(1, 1, 1)
    }

    #[test]
    fn inner_blocks_see_outer_names() {
        let mut scopes = ScopeStack::new();
        scopes.enter_function();
        let x = scopes.declare("x", DataType::INT, false, span()).unwrap();
        scopes.push_block();
        assert_eq!(scopes.lookup("x").map(|v| v.id), Some(x.id));
        scopes.pop_block();
    }

    #[test]
    fn names_leave_with_their_block() {
        let mut scopes = ScopeStack::new();
        scopes.enter_function();
        scopes.push_block();
        scopes.declare("y", DataType::INT, false, span()).unwrap();
        scopes.pop_block();
        assert!(scopes.lookup("y").is_none());
        assert!(scopes.declare("y", DataType::LONG, false, span()).is_ok());
    }

    #[test]
    fn redeclaration_in_nested_block_is_rejected() {
        let mut scopes = ScopeStack::new();
        scopes.enter_function();
        scopes.declare("x", DataType::INT, false, span()).unwrap();
        scopes.push_block();
        let err = scopes.declare("x", DataType::INT, false, span()).unwrap_err();
        assert!(matches!(err, CompilationError::VariableRedeclaration { .. }));
    }

    #[test]
    fn lambdas_capture_read_only_copies() {
        let mut scopes = ScopeStack::new();
        scopes.enter_function();
        let outer = scopes.declare("total", DataType::LONG, false, span()).unwrap();
        scopes.enter_lambda();
        let inner = scopes.lookup("total").unwrap();
        assert!(inner.read_only);
        assert_eq!(inner.ty, DataType::LONG);
        // A second lookup reuses the capture.
        assert_eq!(scopes.lookup("total").unwrap().id, inner.id);
        let (captures, _) = scopes.exit_frame();
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].outer, outer.id);
    }

    #[test]
    fn captures_follow_declaration_order() {
        let mut scopes = ScopeStack::new();
        scopes.enter_function();
        scopes.declare("a", DataType::INT, false, span()).unwrap();
        scopes.declare("b", DataType::INT, false, span()).unwrap();
        scopes.declare("c", DataType::INT, false, span()).unwrap();
        scopes.enter_lambda();
        scopes.enter_lambda();
        for name in ["c", "a", "b"] {
            scopes.lookup(name).unwrap();
        }
        let (inner, _) = scopes.exit_frame();
        let names: Vec<_> = inner.iter().map(|c| c.inner.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        // The middle lambda captured in use order too.
        let (middle, _) = scopes.exit_frame();
        let names: Vec<_> = middle.iter().map(|c| c.inner.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn functions_do_not_see_each_other() {
        let mut scopes = ScopeStack::new();
        scopes.enter_function();
        scopes.declare("x", DataType::INT, false, span()).unwrap();
        scopes.enter_function();
        assert!(scopes.lookup("x").is_none());
    }

    #[test]
    fn loops_stop_at_lambda_boundaries() {
        let mut scopes = ScopeStack::new();
        scopes.enter_function();
        scopes.enter_loop();
        assert!(scopes.in_loop());
        scopes.enter_lambda();
        assert!(!scopes.in_loop());
        assert!(scopes.in_lambda());
    }
}
