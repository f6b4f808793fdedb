//! Generator function lowering (ES5).
//!
//! Rewrites generator function bodies into explicit state machines driven by
//! the `__generator` runtime helper. The transform makes three passes over
//! each generator body:
//!
//! 1. The statement transducer walks the body, flattening every expression
//!    that contains a `yield` into a linear sequence of abstract operations
//!    (`Operation`), while a label manager and a block manager record resume
//!    points and structured-control regions (try/catch/finally, with, loops,
//!    switches, labeled statements).
//! 2. The builder replays the recorded operations, slicing them into
//!    `case` clauses of a `switch (state.label)` dispatch at every marked
//!    label, re-wrapping statements captured inside `with` blocks, and
//!    injecting `state.trys.push([...])` records for protected regions.
//! 3. A final resolution pass replaces label placeholders with the concrete
//!    clause numbers the builder assigned.
//!
//! Statements and expressions with no suspension point anywhere beneath them
//! are converted structurally and ride along inside a single operation.
//!
//! The runtime protocol (instruction tuples `[2]`, `[3, label]`, `[4, v]`,
//! `[5, iter]`, `[7]`, the `state.sent()` accessor and the `state.trys`
//! region table) is shared with the `__generator` helper in tslib.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::ir::IRNode;
use crate::ast::{AstArena, NodeFlags, NodeIndex, NodeKind};

/// Instruction codes understood by the `__generator` runtime helper.
pub mod instruction {
    pub const NEXT: u32 = 0;
    pub const THROW: u32 = 1;
    pub const RETURN: u32 = 2;
    pub const BREAK: u32 = 3;
    pub const YIELD: u32 = 4;
    pub const YIELD_STAR: u32 = 5;
    pub const CATCH: u32 = 6;
    pub const ENDFINALLY: u32 = 7;
}

/// A forward-referencable position in the operation stream.
///
/// Labels are defined eagerly and marked exactly once, possibly after
/// operations referring to them have already been emitted; the builder maps
/// each marked label to the number of the `case` clause that starts there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(pub(super) u32);

/// One abstract operation in the linearized body.
///
/// The variants correspond one-to-one to what the builder knows how to
/// write; everything that survived structural conversion hides inside
/// `Statement`.
#[derive(Debug)]
pub(super) enum Operation {
    /// No effect; used to pin labels and block boundaries.
    Nop,
    /// An already-converted statement, emitted verbatim.
    Statement(IRNode),
    /// `target = value;`
    Assign { target: IRNode, value: IRNode },
    /// Unconditional jump: `return [3 /*break*/, label];`
    Break(Label),
    /// `if (cond) return [3 /*break*/, label];`
    BreakWhenTrue { label: Label, condition: IRNode },
    /// `if (!(cond)) return [3 /*break*/, label];`
    BreakWhenFalse { label: Label, condition: IRNode },
    /// `return [4 /*yield*/, value];`
    Yield(Option<IRNode>),
    /// `return [5 /*yield**/, iterator];`
    YieldStar(IRNode),
    /// `return [2 /*return*/, value];`
    Return(Option<IRNode>),
    /// `throw value;`
    Throw(IRNode),
    /// `return [7 /*endfinally*/];`
    Endfinally,
}

/// Progress of an exception block through its structural events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum ExceptionBlockState {
    Try,
    Catch,
    Finally,
    Done,
}

/// A structured-control region open over a range of operations.
///
/// Loop, switch and labeled blocks with `break_label: None` are "script"
/// blocks: the construct survives natively in the output, so unlabeled
/// `break`/`continue` inside it need no rewriting.
#[derive(Debug)]
pub(super) enum CodeBlock {
    Exception {
        state: ExceptionBlockState,
        start_label: Label,
        catch_variable: Option<String>,
        catch_label: Option<Label>,
        finally_label: Option<Label>,
        end_label: Label,
    },
    With {
        expression: IRNode,
        start_label: Label,
        end_label: Label,
    },
    Loop {
        break_label: Option<Label>,
        continue_label: Option<Label>,
    },
    Switch {
        break_label: Option<Label>,
    },
    Labeled {
        label_text: String,
        break_label: Option<Label>,
    },
}

impl CodeBlock {
    fn supports_unlabeled_break(&self) -> bool {
        matches!(self, CodeBlock::Loop { .. } | CodeBlock::Switch { .. })
    }

    fn supports_unlabeled_continue(&self) -> bool {
        matches!(self, CodeBlock::Loop { .. })
    }
}

/// Whether a block event opens or closes its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BlockAction {
    Open,
    Close,
}

/// Block open/close event, correlated with an operation offset.
#[derive(Debug)]
pub(super) struct BlockEvent {
    pub(super) action: BlockAction,
    pub(super) offset: u32,
    pub(super) block: usize,
}

/// Per-function lowering state, swapped out when generator functions nest.
pub(super) struct SavedLowering {
    in_generator_body: bool,
    in_statement_containing_yield: bool,
    hoisted_variables: Vec<String>,
    hoisted_functions: Vec<IRNode>,
    generated_names: FxHashSet<String>,
    temp_count: u32,
    loop_count: u32,
    unique_counts: FxHashMap<String, u32>,
    label_offsets: Vec<Option<u32>>,
    label_referenced: Vec<bool>,
    blocks: Vec<CodeBlock>,
    block_events: Vec<BlockEvent>,
    block_stack: SmallVec<[usize; 8]>,
    operations: Vec<Operation>,
}

/// The generator lowering transform.
///
/// One instance handles a whole tree; per-function state is saved and
/// restored around nested generator functions so each body gets an
/// independent state machine.
pub struct GeneratorTransformer<'a> {
    pub(super) arena: &'a AstArena,

    /// Whether we are lexically inside a generator body being lowered
    /// (false inside nested non-generator functions).
    pub(super) in_generator_body: bool,
    /// Whether the statement currently being converted structurally contains
    /// a suspension point somewhere (drives "script" block creation).
    pub(super) in_statement_containing_yield: bool,

    /// `var` names hoisted to the top of the enclosing function.
    pub(super) hoisted_variables: Vec<String>,
    /// Function declarations hoisted out of the state machine.
    pub(super) hoisted_functions: Vec<IRNode>,
    /// Names manufactured by this transform (temps, uniques); these are
    /// never cached again and never substituted.
    pub(super) generated_names: FxHashSet<String>,
    pub(super) temp_count: u32,
    pub(super) loop_count: u32,
    pub(super) unique_counts: FxHashMap<String, u32>,

    /// Catch variable renames in scope, innermost last. A `None` replacement
    /// masks the name (used for shadowing parameters and nested catches).
    pub(super) renamed_catch_variables: Vec<(String, Option<String>)>,

    /// Operation offset each label was marked at; `None` until marked.
    pub(super) label_offsets: Vec<Option<u32>>,
    /// Whether anything references the label (inline breaks, trys records).
    pub(super) label_referenced: Vec<bool>,

    pub(super) blocks: Vec<CodeBlock>,
    pub(super) block_events: Vec<BlockEvent>,
    pub(super) block_stack: SmallVec<[usize; 8]>,

    pub(super) operations: Vec<Operation>,
}

/// Lower a single function node (declaration or expression). Generator
/// functions get a state machine body; plain functions are converted
/// structurally (their nested generators are still lowered).
pub fn lower_function(arena: &AstArena, node: NodeIndex) -> IRNode {
    GeneratorTransformer::new(arena).transform_function(node)
}

impl<'a> GeneratorTransformer<'a> {
    pub fn new(arena: &'a AstArena) -> Self {
        GeneratorTransformer {
            arena,
            in_generator_body: false,
            in_statement_containing_yield: false,
            hoisted_variables: Vec::new(),
            hoisted_functions: Vec::new(),
            generated_names: FxHashSet::default(),
            temp_count: 0,
            loop_count: 0,
            unique_counts: FxHashMap::default(),
            renamed_catch_variables: Vec::new(),
            label_offsets: Vec::new(),
            label_referenced: Vec::new(),
            blocks: Vec::new(),
            block_events: Vec::new(),
            block_stack: SmallVec::new(),
            operations: Vec::new(),
        }
    }

    /// Transform a `FunctionDecl` or `FunctionExpr` node.
    pub fn transform_function(&mut self, node: NodeIndex) -> IRNode {
        match self.arena.kind(node).clone() {
            NodeKind::FunctionExpr {
                name,
                parameters,
                body,
                is_generator,
            } => {
                let body = self.transform_function_body(body, &parameters, is_generator);
                IRNode::func_expr(name, parameters, body)
            }
            NodeKind::FunctionDecl {
                name,
                parameters,
                body,
                is_generator,
            } => {
                let body = self.transform_function_body(body, &parameters, is_generator);
                IRNode::func_decl(name, parameters, body)
            }
            _ => panic!("transform_function expects a function node"),
        }
    }

    fn transform_function_body(
        &mut self,
        body: NodeIndex,
        parameters: &[String],
        is_generator: bool,
    ) -> Vec<IRNode> {
        let masks = self.push_name_masks(parameters);
        let result = if is_generator {
            self.transform_generator_function_body(body)
        } else {
            let saved_in_generator_body = self.in_generator_body;
            let saved_in_statement = self.in_statement_containing_yield;
            self.in_generator_body = false;
            self.in_statement_containing_yield = false;
            let result = self.convert_statements_of(body);
            self.in_generator_body = saved_in_generator_body;
            self.in_statement_containing_yield = saved_in_statement;
            result
        };
        self.pop_name_masks(masks);
        result
    }

    /// Lower one generator body into `[hoisted vars, hoisted functions,
    /// return __generator(this, function (_a) { ... });]`.
    fn transform_generator_function_body(&mut self, body: NodeIndex) -> Vec<IRNode> {
        let saved = self.save_lowering();
        self.in_generator_body = true;

        let statements: Vec<NodeIndex> = match self.arena.kind(body) {
            NodeKind::Block { statements } => statements.clone(),
            _ => vec![body],
        };
        self.transform_and_emit_statements(&statements);

        let (dispatch, cases) = self.build_cases();

        tracing::debug!(
            operations = self.operations.len(),
            labels = self.label_offsets.len(),
            clauses = cases.len(),
            dispatch,
            "lowered generator body"
        );

        let mut result = Vec::new();
        if !self.hoisted_variables.is_empty() {
            result.push(IRNode::VarDeclList(
                self.hoisted_variables
                    .iter()
                    .map(|name| IRNode::var_decl(name.clone(), None))
                    .collect(),
            ));
        }
        result.append(&mut self.hoisted_functions);

        // The state parameter takes the next free temp name, after every
        // temp the body needed.
        let state_param = self.next_temp_name();
        result.push(IRNode::GeneratorBody {
            state_param,
            dispatch,
            cases,
        });

        self.restore_lowering(saved);
        result
    }

    pub(super) fn save_lowering(&mut self) -> SavedLowering {
        SavedLowering {
            in_generator_body: std::mem::replace(&mut self.in_generator_body, false),
            in_statement_containing_yield: std::mem::replace(
                &mut self.in_statement_containing_yield,
                false,
            ),
            hoisted_variables: std::mem::take(&mut self.hoisted_variables),
            hoisted_functions: std::mem::take(&mut self.hoisted_functions),
            generated_names: std::mem::take(&mut self.generated_names),
            temp_count: std::mem::replace(&mut self.temp_count, 0),
            loop_count: std::mem::replace(&mut self.loop_count, 0),
            unique_counts: std::mem::take(&mut self.unique_counts),
            label_offsets: std::mem::take(&mut self.label_offsets),
            label_referenced: std::mem::take(&mut self.label_referenced),
            blocks: std::mem::take(&mut self.blocks),
            block_events: std::mem::take(&mut self.block_events),
            block_stack: std::mem::take(&mut self.block_stack),
            operations: std::mem::take(&mut self.operations),
        }
    }

    pub(super) fn restore_lowering(&mut self, saved: SavedLowering) {
        self.in_generator_body = saved.in_generator_body;
        self.in_statement_containing_yield = saved.in_statement_containing_yield;
        self.hoisted_variables = saved.hoisted_variables;
        self.hoisted_functions = saved.hoisted_functions;
        self.generated_names = saved.generated_names;
        self.temp_count = saved.temp_count;
        self.loop_count = saved.loop_count;
        self.unique_counts = saved.unique_counts;
        self.label_offsets = saved.label_offsets;
        self.label_referenced = saved.label_referenced;
        self.blocks = saved.blocks;
        self.block_events = saved.block_events;
        self.block_stack = saved.block_stack;
        self.operations = saved.operations;
    }

    pub(super) fn contains_yield(&self, node: NodeIndex) -> bool {
        self.arena.contains_yield(node)
    }

    // =========================================================================
    // Temporaries and hoisting
    // =========================================================================

    fn make_temp_name(index: u32) -> String {
        if index < 26 {
            format!("_{}", (b'a' + index as u8) as char)
        } else {
            format!("_{}", index - 26)
        }
    }

    pub(super) fn next_temp_name(&mut self) -> String {
        loop {
            let name = Self::make_temp_name(self.temp_count);
            self.temp_count += 1;
            if !self.hoisted_variables.contains(&name) {
                self.generated_names.insert(name.clone());
                return name;
            }
        }
    }

    /// Hoist and return a fresh temp (`_a`, `_b`, ... then `_0`, `_1`, ...).
    pub(super) fn declare_local(&mut self) -> IRNode {
        let name = self.next_temp_name();
        self.hoisted_variables.push(name.clone());
        IRNode::Identifier(name)
    }

    /// Hoist and return a loop index temp (`_i`, `_j`, ...).
    pub(super) fn declare_loop_variable(&mut self) -> IRNode {
        while self.loop_count < 18 {
            let name = format!("_{}", (b'i' + self.loop_count as u8) as char);
            self.loop_count += 1;
            if !self.hoisted_variables.contains(&name) {
                self.generated_names.insert(name.clone());
                self.hoisted_variables.push(name.clone());
                return IRNode::Identifier(name);
            }
        }
        self.declare_local()
    }

    /// Hoist a fresh name derived from `base` (`e` becomes `e_1`, `e_2`, ...).
    pub(super) fn declare_unique(&mut self, base: &str) -> String {
        loop {
            let count = self.unique_counts.entry(base.to_string()).or_insert(0);
            *count += 1;
            let name = format!("{base}_{count}");
            if !self.hoisted_variables.contains(&name) {
                self.generated_names.insert(name.clone());
                self.hoisted_variables.push(name.clone());
                return name;
            }
        }
    }

    pub(super) fn hoist_variable_name(&mut self, name: &str) {
        if !self.hoisted_variables.iter().any(|v| v == name) {
            self.hoisted_variables.push(name.to_string());
        }
    }

    /// Evaluate `node` into a fresh temp now, unless it already is one.
    pub(super) fn cache_expression(&mut self, node: IRNode) -> IRNode {
        if let IRNode::Identifier(name) = &node
            && self.generated_names.contains(name)
        {
            return node;
        }
        let temp = self.declare_local();
        self.emit_assignment(temp.clone(), node);
        temp
    }

    // =========================================================================
    // Catch variable substitution
    // =========================================================================

    /// Replacement for an identifier in scope, if its catch binding was
    /// renamed and the name is not shadowed.
    pub(super) fn substitute_name(&self, name: &str) -> Option<String> {
        for (original, replacement) in self.renamed_catch_variables.iter().rev() {
            if original == name {
                return replacement.clone();
            }
        }
        None
    }

    /// Mask `names` against catch-variable substitution (parameter shadowing,
    /// nested catch bindings). Returns how many entries to pop.
    pub(super) fn push_name_masks(&mut self, names: &[String]) -> usize {
        for name in names {
            self.renamed_catch_variables.push((name.clone(), None));
        }
        names.len()
    }

    pub(super) fn pop_name_masks(&mut self, count: usize) {
        for _ in 0..count {
            self.renamed_catch_variables.pop();
        }
    }

    // =========================================================================
    // Labels
    // =========================================================================

    pub(super) fn define_label(&mut self) -> Label {
        let label = Label(self.label_offsets.len() as u32);
        self.label_offsets.push(None);
        self.label_referenced.push(false);
        label
    }

    pub(super) fn mark_label(&mut self, label: Label) {
        let slot = &mut self.label_offsets[label.0 as usize];
        assert!(slot.is_none(), "label {} marked twice", label.0);
        *slot = Some(self.operations.len() as u32);
    }

    /// IR placeholder for `label`, resolved after the machine is built.
    pub(super) fn create_label_ref(&mut self, label: Label) -> IRNode {
        self.label_referenced[label.0 as usize] = true;
        IRNode::GeneratorLabelRef(label.0)
    }

    /// `return [3 /*break*/, label];`
    pub(super) fn create_inline_break(&mut self, label: Label) -> IRNode {
        let label_ref = self.create_label_ref(label);
        IRNode::ret(Some(IRNode::generator_op(
            instruction::BREAK,
            Some(label_ref),
            Some("break"),
        )))
    }

    /// `return [2 /*return*/, expr];`
    pub(super) fn create_inline_return(&self, expression: Option<IRNode>) -> IRNode {
        IRNode::ret(Some(IRNode::generator_op(
            instruction::RETURN,
            expression,
            Some("return"),
        )))
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    fn begin_block(&mut self, block: CodeBlock) -> usize {
        let index = self.blocks.len();
        self.blocks.push(block);
        self.block_events.push(BlockEvent {
            action: BlockAction::Open,
            offset: self.operations.len() as u32,
            block: index,
        });
        self.block_stack.push(index);
        index
    }

    fn end_block(&mut self) -> usize {
        let index = self
            .block_stack
            .pop()
            .unwrap_or_else(|| panic!("endBlock without an open block"));
        self.block_events.push(BlockEvent {
            action: BlockAction::Close,
            offset: self.operations.len() as u32,
            block: index,
        });
        index
    }

    fn peek_block(&self) -> usize {
        *self
            .block_stack
            .last()
            .unwrap_or_else(|| panic!("peekBlock without an open block"))
    }

    /// Opens a protected region. The `Nop` pins the block entry so the
    /// `trys.push` record lands in the right clause.
    pub(super) fn begin_exception_block(&mut self) -> Label {
        let start_label = self.define_label();
        let end_label = self.define_label();
        self.mark_label(start_label);
        self.begin_block(CodeBlock::Exception {
            state: ExceptionBlockState::Try,
            start_label,
            catch_variable: None,
            catch_label: None,
            finally_label: None,
            end_label,
        });
        self.emit_nop();
        end_label
    }

    /// Enters the catch clause of the current exception block, renaming the
    /// catch binding so it can be hoisted to function scope.
    pub(super) fn begin_catch_block(&mut self, variable: Option<NodeIndex>) -> usize {
        let mut masks = 0;
        let name = match variable {
            Some(variable) => {
                let text = match self.arena.kind(variable) {
                    NodeKind::Ident(text) => text.clone(),
                    _ => panic!("catch binding must be an identifier"),
                };
                if self.arena.flags(variable).contains(NodeFlags::SYNTHESIZED) {
                    // Synthesized bindings are already unique within the file.
                    self.hoist_variable_name(&text);
                    text
                } else {
                    let renamed = self.declare_unique(&text);
                    self.renamed_catch_variables
                        .push((text, Some(renamed.clone())));
                    masks = 1;
                    renamed
                }
            }
            None => {
                let IRNode::Identifier(name) = self.declare_local() else {
                    unreachable!()
                };
                name
            }
        };

        let index = self.peek_block();
        let end_label = match &self.blocks[index] {
            CodeBlock::Exception { state, end_label, .. } => {
                assert!(
                    *state < ExceptionBlockState::Catch,
                    "catch clause out of order"
                );
                *end_label
            }
            _ => panic!("beginCatchBlock outside an exception block"),
        };
        self.emit_break(end_label);

        let catch_label = self.define_label();
        self.mark_label(catch_label);
        match &mut self.blocks[index] {
            CodeBlock::Exception {
                state,
                catch_variable,
                catch_label: slot,
                ..
            } => {
                *state = ExceptionBlockState::Catch;
                *catch_variable = Some(name.clone());
                *slot = Some(catch_label);
            }
            _ => unreachable!(),
        }

        self.emit_assignment(IRNode::Identifier(name), IRNode::GeneratorSent);
        self.emit_nop();
        masks
    }

    pub(super) fn begin_finally_block(&mut self) {
        let index = self.peek_block();
        let end_label = match &self.blocks[index] {
            CodeBlock::Exception { state, end_label, .. } => {
                assert!(
                    *state < ExceptionBlockState::Finally,
                    "finally clause out of order"
                );
                *end_label
            }
            _ => panic!("beginFinallyBlock outside an exception block"),
        };
        self.emit_break(end_label);

        let finally_label = self.define_label();
        self.mark_label(finally_label);
        match &mut self.blocks[index] {
            CodeBlock::Exception {
                state,
                finally_label: slot,
                ..
            } => {
                *state = ExceptionBlockState::Finally;
                *slot = Some(finally_label);
            }
            _ => unreachable!(),
        }
    }

    pub(super) fn end_exception_block(&mut self) {
        let index = self.end_block();
        let (state, end_label) = match &self.blocks[index] {
            CodeBlock::Exception { state, end_label, .. } => (*state, *end_label),
            _ => panic!("endExceptionBlock outside an exception block"),
        };
        if state < ExceptionBlockState::Finally {
            self.emit_break(end_label);
        } else {
            self.emit_endfinally();
        }
        self.mark_label(end_label);
        self.emit_nop();
        match &mut self.blocks[index] {
            CodeBlock::Exception { state, .. } => *state = ExceptionBlockState::Done,
            _ => unreachable!(),
        }
    }

    pub(super) fn begin_with_block(&mut self, expression: IRNode) {
        let start_label = self.define_label();
        let end_label = self.define_label();
        self.mark_label(start_label);
        self.begin_block(CodeBlock::With {
            expression,
            start_label,
            end_label,
        });
    }

    pub(super) fn end_with_block(&mut self) {
        let index = self.end_block();
        match &self.blocks[index] {
            CodeBlock::With { end_label, .. } => {
                let end_label = *end_label;
                self.mark_label(end_label);
            }
            _ => panic!("endWithBlock outside a with block"),
        }
    }

    pub(super) fn begin_loop_block(&mut self, continue_label: Label) -> Label {
        let break_label = self.define_label();
        self.begin_block(CodeBlock::Loop {
            break_label: Some(break_label),
            continue_label: Some(continue_label),
        });
        break_label
    }

    pub(super) fn begin_script_loop_block(&mut self) {
        self.begin_block(CodeBlock::Loop {
            break_label: None,
            continue_label: None,
        });
    }

    pub(super) fn end_loop_block(&mut self) {
        let index = self.end_block();
        match &self.blocks[index] {
            CodeBlock::Loop { break_label, .. } => {
                if let Some(break_label) = *break_label {
                    self.mark_label(break_label);
                }
            }
            _ => panic!("endLoopBlock outside a loop block"),
        }
    }

    pub(super) fn begin_switch_block(&mut self) -> Label {
        let break_label = self.define_label();
        self.begin_block(CodeBlock::Switch {
            break_label: Some(break_label),
        });
        break_label
    }

    pub(super) fn begin_script_switch_block(&mut self) {
        self.begin_block(CodeBlock::Switch { break_label: None });
    }

    pub(super) fn end_switch_block(&mut self) {
        let index = self.end_block();
        match &self.blocks[index] {
            CodeBlock::Switch { break_label } => {
                if let Some(break_label) = *break_label {
                    self.mark_label(break_label);
                }
            }
            _ => panic!("endSwitchBlock outside a switch block"),
        }
    }

    pub(super) fn begin_labeled_block(&mut self, label_text: String) {
        let break_label = self.define_label();
        self.begin_block(CodeBlock::Labeled {
            label_text,
            break_label: Some(break_label),
        });
    }

    pub(super) fn begin_script_labeled_block(&mut self, label_text: String) {
        self.begin_block(CodeBlock::Labeled {
            label_text,
            break_label: None,
        });
    }

    pub(super) fn end_labeled_block(&mut self) {
        let index = self.end_block();
        match &self.blocks[index] {
            CodeBlock::Labeled { break_label, .. } => {
                if let Some(break_label) = *break_label {
                    self.mark_label(break_label);
                }
            }
            _ => panic!("endLabeledBlock outside a labeled block"),
        }
    }

    // =========================================================================
    // Break / continue targets
    // =========================================================================

    /// Is `stack[start]` (walking outward) an unbroken run of labeled blocks
    /// one of which carries `label_text`? Labeled blocks wrap their statement
    /// directly, so only adjacent entries count.
    fn has_immediately_containing_labeled_block(&self, label_text: &str, start: usize) -> bool {
        for &index in self.block_stack[..start].iter().rev() {
            match &self.blocks[index] {
                CodeBlock::Labeled { label_text: text, .. } => {
                    if text == label_text {
                        return true;
                    }
                }
                _ => break,
            }
        }
        false
    }

    /// The label a `break` (optionally labeled) should jump to, or `None`
    /// when the target construct survives natively.
    pub(super) fn find_break_target(&self, label_text: Option<&str>) -> Option<Label> {
        if let Some(label_text) = label_text {
            for (i, &index) in self.block_stack.iter().enumerate().rev() {
                let block = &self.blocks[index];
                match block {
                    CodeBlock::Labeled {
                        label_text: text,
                        break_label,
                    } if text == label_text => return *break_label,
                    _ if block.supports_unlabeled_break()
                        && self.has_immediately_containing_labeled_block(label_text, i) =>
                    {
                        return match block {
                            CodeBlock::Loop { break_label, .. }
                            | CodeBlock::Switch { break_label } => *break_label,
                            _ => unreachable!(),
                        };
                    }
                    _ => {}
                }
            }
        } else {
            for &index in self.block_stack.iter().rev() {
                match &self.blocks[index] {
                    CodeBlock::Loop { break_label, .. } | CodeBlock::Switch { break_label } => {
                        return *break_label;
                    }
                    _ => {}
                }
            }
        }
        None
    }

    /// The label a `continue` (optionally labeled) should jump to, or `None`
    /// when the target loop survives natively.
    pub(super) fn find_continue_target(&self, label_text: Option<&str>) -> Option<Label> {
        if let Some(label_text) = label_text {
            for (i, &index) in self.block_stack.iter().enumerate().rev() {
                let block = &self.blocks[index];
                if block.supports_unlabeled_continue()
                    && self.has_immediately_containing_labeled_block(label_text, i)
                {
                    return match block {
                        CodeBlock::Loop { continue_label, .. } => *continue_label,
                        _ => unreachable!(),
                    };
                }
            }
        } else {
            for &index in self.block_stack.iter().rev() {
                if let CodeBlock::Loop { continue_label, .. } = &self.blocks[index] {
                    return *continue_label;
                }
            }
        }
        None
    }

    // =========================================================================
    // Operation emitters
    // =========================================================================

    fn emit(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub(super) fn emit_nop(&mut self) {
        self.emit(Operation::Nop);
    }

    pub(super) fn emit_statement(&mut self, statement: IRNode) {
        self.emit(Operation::Statement(statement));
    }

    /// A dropped statement (pure hoist) still pins block/label structure.
    pub(super) fn emit_statement_opt(&mut self, statement: Option<IRNode>) {
        match statement {
            Some(statement) => self.emit_statement(statement),
            None => self.emit_nop(),
        }
    }

    pub(super) fn emit_assignment(&mut self, target: IRNode, value: IRNode) {
        self.emit(Operation::Assign { target, value });
    }

    pub(super) fn emit_break(&mut self, label: Label) {
        self.emit(Operation::Break(label));
    }

    pub(super) fn emit_break_when_true(&mut self, label: Label, condition: IRNode) {
        self.emit(Operation::BreakWhenTrue { label, condition });
    }

    pub(super) fn emit_break_when_false(&mut self, label: Label, condition: IRNode) {
        self.emit(Operation::BreakWhenFalse { label, condition });
    }

    pub(super) fn emit_yield(&mut self, expression: Option<IRNode>) {
        self.emit(Operation::Yield(expression));
    }

    pub(super) fn emit_yield_star(&mut self, expression: IRNode) {
        self.emit(Operation::YieldStar(expression));
    }

    pub(super) fn emit_return(&mut self, expression: Option<IRNode>) {
        self.emit(Operation::Return(expression));
    }

    pub(super) fn emit_throw(&mut self, expression: IRNode) {
        self.emit(Operation::Throw(expression));
    }

    pub(super) fn emit_endfinally(&mut self) {
        self.emit(Operation::Endfinally);
    }
}
