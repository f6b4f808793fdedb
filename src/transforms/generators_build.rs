//! State machine construction for the generator transform.
//!
//! Replays the recorded operation stream, correlating it with the label
//! marks and block events the transducer left behind, and produces the
//! `case` clauses of the `switch (state.label)` dispatch. Statements
//! accumulate per clause; every marked label flushes the pending clause,
//! re-wrapping anything captured inside `with` blocks and prepending the
//! `state.trys.push` record when the clause enters a protected region.

use super::generators::{BlockAction, CodeBlock, GeneratorTransformer, Operation, instruction};
use super::ir::{IRGeneratorCase, IRNode};

/// Builder state, reset for every generator body.
pub(super) struct BuildState {
    /// Next block event to replay.
    block_event_index: usize,
    /// Number of the clause currently being assembled.
    label_number: u32,
    /// Label id to assigned clause number.
    label_numbers: Vec<Option<u32>>,
    last_was_abrupt: bool,
    last_was_completion: bool,
    clauses: Option<Vec<IRGeneratorCase>>,
    statements: Option<Vec<IRNode>>,
    exception_stack: Vec<Option<usize>>,
    current_exception: Option<usize>,
    with_stack: Vec<usize>,
}

impl GeneratorTransformer<'_> {
    /// Replay the recorded operations into dispatch clauses. Returns whether
    /// the body needs a `switch` dispatch at all; bodies with no resume
    /// point collapse into a single unlabeled clause.
    pub(super) fn build_cases(&mut self) -> (bool, Vec<IRGeneratorCase>) {
        let mut build = BuildState::new(self.label_offsets.len());
        let operations = std::mem::take(&mut self.operations);
        let operation_count = operations.len() as u32;

        for (index, operation) in operations.into_iter().enumerate() {
            self.write_operation(&mut build, index as u32, operation);
        }
        self.flush_final_label(&mut build, operation_count);

        let dispatch = build.clauses.is_some();
        let mut cases = match build.clauses.take() {
            Some(clauses) => clauses,
            None => vec![IRGeneratorCase {
                label: 0,
                statements: build.statements.take().unwrap_or_default(),
            }],
        };
        self.resolve_label_refs(&build, &mut cases);
        (dispatch, cases)
    }

    /// Replace every label placeholder with the clause number the builder
    /// assigned to it.
    fn resolve_label_refs(&self, build: &BuildState, cases: &mut [IRGeneratorCase]) {
        for case in cases {
            for statement in &mut case.statements {
                statement.walk_mut(&mut |node| {
                    if let IRNode::GeneratorLabelRef(label) = node {
                        let clause = build.label_numbers[*label as usize].unwrap_or_else(|| {
                            panic!("label {label} referenced but never marked")
                        });
                        *node = IRNode::NumericLiteral(clause.to_string());
                    }
                });
            }
        }
    }

    fn write_operation(&mut self, build: &mut BuildState, index: u32, operation: Operation) {
        self.try_enter_label(build, index);
        self.try_enter_or_leave_block(build, index);

        // Nothing after an abrupt exit is reachable within this clause.
        if build.last_was_abrupt {
            return;
        }
        build.last_was_abrupt = false;
        build.last_was_completion = false;

        match operation {
            Operation::Nop => {}
            Operation::Statement(statement) => build.write_statement(statement),
            Operation::Assign { target, value } => {
                build.write_statement(IRNode::expr_stmt(IRNode::assign(target, value)));
            }
            Operation::Break(label) => {
                build.last_was_abrupt = true;
                let jump = self.create_inline_break(label);
                build.write_statement(jump);
            }
            Operation::BreakWhenTrue { label, condition } => {
                let jump = self.create_inline_break(label);
                build.write_statement(IRNode::IfStatement {
                    condition: Box::new(condition),
                    then_branch: Box::new(jump),
                    else_branch: None,
                });
            }
            Operation::BreakWhenFalse { label, condition } => {
                let jump = self.create_inline_break(label);
                build.write_statement(IRNode::IfStatement {
                    condition: Box::new(IRNode::PrefixUnaryExpr {
                        operator: "!".to_string(),
                        operand: Box::new(condition.paren()),
                    }),
                    then_branch: Box::new(jump),
                    else_branch: None,
                });
            }
            Operation::Yield(expression) => {
                build.last_was_abrupt = true;
                build.write_statement(IRNode::ret(Some(IRNode::generator_op(
                    instruction::YIELD,
                    expression,
                    Some("yield"),
                ))));
            }
            Operation::YieldStar(expression) => {
                build.last_was_abrupt = true;
                build.write_statement(IRNode::ret(Some(IRNode::generator_op(
                    instruction::YIELD_STAR,
                    Some(expression),
                    Some("yield*"),
                ))));
            }
            Operation::Return(expression) => {
                build.last_was_abrupt = true;
                build.last_was_completion = true;
                build.write_statement(IRNode::ret(Some(IRNode::generator_op(
                    instruction::RETURN,
                    expression,
                    Some("return"),
                ))));
            }
            Operation::Throw(expression) => {
                build.last_was_abrupt = true;
                build.last_was_completion = true;
                build.write_statement(IRNode::ThrowStatement(Box::new(expression)));
            }
            Operation::Endfinally => {
                build.last_was_abrupt = true;
                build.write_statement(IRNode::ret(Some(IRNode::generator_op(
                    instruction::ENDFINALLY,
                    None,
                    Some("endfinally"),
                ))));
            }
        }
    }

    /// Flush the pending clause at each label marked on this offset and
    /// record the clause number the label resolves to.
    fn try_enter_label(&mut self, build: &mut BuildState, operation_index: u32) {
        for label in 0..self.label_offsets.len() {
            if self.label_offsets[label] == Some(operation_index) {
                self.flush_label(build);
                build.label_numbers[label] = Some(build.label_number);
            }
        }
    }

    fn flush_label(&mut self, build: &mut BuildState) {
        if build.statements.is_none() {
            return;
        }
        let mark_label_end = !build.last_was_abrupt;
        self.append_label(build, mark_label_end);
        build.last_was_abrupt = false;
        build.last_was_completion = false;
        build.label_number += 1;
    }

    /// Close out the pending statements as a clause: innermost-last `with`
    /// re-wrapping, `trys.push` injection on entry to a protected region,
    /// and the `state.label = n + 1` fallthrough marker when the previous
    /// operation can reach the next clause.
    fn append_label(&mut self, build: &mut BuildState, mark_label_end: bool) {
        let mut statements = build.statements.take();
        if let Some(statements) = &mut statements {
            for &with_index in build.with_stack.iter().rev() {
                let CodeBlock::With { expression, .. } = &self.blocks[with_index] else {
                    unreachable!()
                };
                let expression = expression.clone();
                let inner = std::mem::take(statements);
                statements.push(IRNode::WithStatement {
                    expression: Box::new(expression),
                    body: Box::new(IRNode::block(inner)),
                });
            }
            if let Some(exception_index) = build.current_exception.take() {
                let CodeBlock::Exception {
                    start_label,
                    catch_label,
                    finally_label,
                    end_label,
                    ..
                } = &self.blocks[exception_index]
                else {
                    unreachable!()
                };
                let (start, catch, finally, end) =
                    (*start_label, *catch_label, *finally_label, *end_label);
                let labels = vec![
                    self.create_label_ref(start),
                    match catch {
                        Some(label) => self.create_label_ref(label),
                        None => IRNode::OmittedExpression,
                    },
                    match finally {
                        Some(label) => self.create_label_ref(label),
                        None => IRNode::OmittedExpression,
                    },
                    self.create_label_ref(end),
                ];
                statements.insert(0, IRNode::GeneratorTrysPush { labels });
            }
            if mark_label_end {
                statements.push(IRNode::expr_stmt(IRNode::assign(
                    IRNode::GeneratorLabel,
                    IRNode::number((build.label_number + 1).to_string()),
                )));
            }
        }
        build.clauses.get_or_insert_with(Vec::new).push(IRGeneratorCase {
            label: build.label_number,
            statements: statements.unwrap_or_default(),
        });
    }

    /// Track which protected region and which `with` wrappers the clause
    /// being assembled sits inside.
    fn try_enter_or_leave_block(&mut self, build: &mut BuildState, operation_index: u32) {
        while build.block_event_index < self.block_events.len()
            && self.block_events[build.block_event_index].offset <= operation_index
        {
            let event = &self.block_events[build.block_event_index];
            let block_index = event.block;
            match (&self.blocks[block_index], event.action) {
                (CodeBlock::Exception { .. }, BlockAction::Open) => {
                    // The clause must exist even when the try body starts
                    // with a label, so the trys record has a home.
                    if build.statements.is_none() {
                        build.statements = Some(Vec::new());
                    }
                    build.exception_stack.push(build.current_exception);
                    build.current_exception = Some(block_index);
                }
                (CodeBlock::Exception { .. }, BlockAction::Close) => {
                    build.current_exception = build.exception_stack.pop().flatten();
                }
                (CodeBlock::With { .. }, BlockAction::Open) => {
                    build.with_stack.push(block_index);
                }
                (CodeBlock::With { .. }, BlockAction::Close) => {
                    build.with_stack.pop();
                }
                _ => {}
            }
            build.block_event_index += 1;
        }
    }

    /// The implicit completion at the end of the body: reachable either by
    /// falling off the last operation or through a label that something
    /// still jumps to.
    fn flush_final_label(&mut self, build: &mut BuildState, operation_count: u32) {
        if self.is_final_label_reachable(build, operation_count) {
            self.try_enter_label(build, operation_count);
            build.with_stack.clear();
            build.last_was_abrupt = true;
            build.last_was_completion = true;
            build.write_statement(IRNode::ret(Some(IRNode::generator_op(
                instruction::RETURN,
                None,
                Some("return"),
            ))));
        }
        if build.statements.is_some() && build.clauses.is_some() {
            self.append_label(build, false);
        }
    }

    fn is_final_label_reachable(&self, build: &BuildState, operation_count: u32) -> bool {
        if !build.last_was_completion {
            return true;
        }
        for (label, offset) in self.label_offsets.iter().enumerate() {
            if *offset == Some(operation_count) && self.label_referenced[label] {
                return true;
            }
        }
        false
    }
}

impl BuildState {
    pub(super) fn new(label_count: usize) -> Self {
        BuildState {
            block_event_index: 0,
            label_number: 0,
            label_numbers: vec![None; label_count],
            last_was_abrupt: false,
            last_was_completion: false,
            clauses: None,
            statements: None,
            exception_stack: Vec::new(),
            current_exception: None,
            with_stack: Vec::new(),
        }
    }

    fn write_statement(&mut self, statement: IRNode) {
        self.statements.get_or_insert_with(Vec::new).push(statement);
    }
}
