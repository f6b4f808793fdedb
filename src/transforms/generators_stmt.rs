//! Statement transduction for the generator transform.
//!
//! `transform_and_emit_statement` is the lowering path: statements whose
//! subtree suspends are decomposed into operations, labels and blocks.
//! `visit_stmt` is the native path: statements with no suspension beneath
//! them survive structurally, but still need rewriting inside a generator
//! body (hoisted `var`s, `return` as a protocol instruction, `break` out of
//! a lowered loop) and still open "script" blocks so jump targets resolve.

use super::generators::GeneratorTransformer;
use super::ir::{IRCatchClause, IRNode, IRSwitchCase};
use crate::ast::{NodeIndex, NodeKind};

impl GeneratorTransformer<'_> {
    pub(super) fn transform_and_emit_statements(&mut self, statements: &[NodeIndex]) {
        for &statement in statements {
            self.transform_and_emit_statement(statement);
        }
    }

    pub(super) fn transform_and_emit_statement(&mut self, node: NodeIndex) {
        let saved = self.in_statement_containing_yield;
        if !self.in_statement_containing_yield {
            self.in_statement_containing_yield = self.contains_yield(node);
        }
        self.transform_and_emit_statement_worker(node);
        self.in_statement_containing_yield = saved;
    }

    fn transform_and_emit_statement_worker(&mut self, node: NodeIndex) {
        match self.arena.kind(node) {
            NodeKind::Block { .. } => self.transform_and_emit_block(node),
            NodeKind::ExpressionStatement(_) => self.transform_and_emit_expression_statement(node),
            NodeKind::VariableStatement { .. } => self.transform_and_emit_variable_statement(node),
            NodeKind::If { .. } => self.transform_and_emit_if(node),
            NodeKind::Do { .. } => self.transform_and_emit_do(node),
            NodeKind::While { .. } => self.transform_and_emit_while(node),
            NodeKind::For { .. } => self.transform_and_emit_for(node),
            NodeKind::ForIn { .. } => self.transform_and_emit_for_in(node),
            NodeKind::Continue { .. } => self.transform_and_emit_continue(node),
            NodeKind::Break { .. } => self.transform_and_emit_break(node),
            NodeKind::Return { .. } => self.transform_and_emit_return(node),
            NodeKind::With { .. } => self.transform_and_emit_with(node),
            NodeKind::Switch { .. } => self.transform_and_emit_switch(node),
            NodeKind::Labeled { .. } => self.transform_and_emit_labeled(node),
            NodeKind::Throw { .. } => self.transform_and_emit_throw(node),
            NodeKind::Try { .. } => self.transform_and_emit_try(node),
            _ => {
                let statement = self.visit_stmt(node);
                self.emit_statement_opt(statement);
            }
        }
    }

    fn transform_and_emit_block(&mut self, node: NodeIndex) {
        let NodeKind::Block { statements } = self.arena.kind(node).clone() else {
            unreachable!()
        };
        if self.contains_yield(node) {
            // Blocks carry no scope of their own here; dissolve into the flow.
            self.transform_and_emit_statements(&statements);
        } else {
            let statement = self.visit_stmt(node);
            self.emit_statement_opt(statement);
        }
    }

    fn transform_and_emit_expression_statement(&mut self, node: NodeIndex) {
        let NodeKind::ExpressionStatement(expression) = *self.arena.kind(node) else {
            unreachable!()
        };
        let expression = self.visit_expr(expression);
        self.emit_statement(IRNode::expr_stmt(expression));
    }

    fn transform_and_emit_variable_statement(&mut self, node: NodeIndex) {
        let NodeKind::VariableStatement { declarations } = self.arena.kind(node).clone() else {
            unreachable!()
        };
        if self.contains_yield(node) {
            self.transform_and_emit_variable_declaration_list(&declarations);
        } else {
            let statement = self.visit_stmt(node);
            self.emit_statement_opt(statement);
        }
    }

    /// Hoist every declared name and write the initializers as assignment
    /// statements, batching runs of initializers between suspension points.
    fn transform_and_emit_variable_declaration_list(&mut self, declarations: &[NodeIndex]) {
        let mut initialized = Vec::new();
        for &declaration in declarations {
            let NodeKind::VariableDeclaration { name, initializer } = *self.arena.kind(declaration)
            else {
                panic!("variable statement entries must be declarations")
            };
            let name = self
                .arena
                .ident_text(name)
                .unwrap_or_else(|| panic!("declaration name must be an identifier"))
                .to_string();
            self.hoist_variable_name(&name);
            if let Some(initializer) = initializer {
                initialized.push((name, initializer));
            }
        }

        let mut written = 0;
        let mut pending: Vec<IRNode> = Vec::new();
        while written < initialized.len() {
            for (name, initializer) in &initialized[written..] {
                if self.contains_yield(*initializer) && !pending.is_empty() {
                    break;
                }
                let value = self.visit_expr(*initializer);
                pending.push(IRNode::assign(IRNode::id(name.clone()), value));
            }
            if !pending.is_empty() {
                written += pending.len();
                let batch = std::mem::take(&mut pending);
                self.emit_statement(IRNode::expr_stmt(IRNode::inline_expressions(batch)));
            }
        }
    }

    fn transform_and_emit_if(&mut self, node: NodeIndex) {
        let NodeKind::If {
            condition,
            then_statement,
            else_statement,
        } = *self.arena.kind(node)
        else {
            unreachable!()
        };
        let branches_yield = self.contains_yield(then_statement)
            || else_statement.is_some_and(|e| self.contains_yield(e));
        if self.contains_yield(node) && branches_yield {
            let end_label = self.define_label();
            let else_label = else_statement.map(|_| self.define_label());
            let condition = self.visit_expr(condition);
            self.emit_break_when_false(else_label.unwrap_or(end_label), condition);
            self.transform_and_emit_statement(then_statement);
            if let Some(else_statement) = else_statement {
                self.emit_break(end_label);
                if let Some(else_label) = else_label {
                    self.mark_label(else_label);
                }
                self.transform_and_emit_statement(else_statement);
            }
            self.mark_label(end_label);
        } else {
            let statement = self.visit_stmt(node);
            self.emit_statement_opt(statement);
        }
    }

    fn transform_and_emit_do(&mut self, node: NodeIndex) {
        let NodeKind::Do {
            statement,
            condition,
        } = *self.arena.kind(node)
        else {
            unreachable!()
        };
        if self.contains_yield(node) {
            let condition_label = self.define_label();
            let loop_label = self.define_label();
            self.begin_loop_block(condition_label);
            self.mark_label(loop_label);
            self.transform_and_emit_statement(statement);
            self.mark_label(condition_label);
            let condition = self.visit_expr(condition);
            self.emit_break_when_true(loop_label, condition);
            self.end_loop_block();
        } else {
            let statement = self.visit_stmt(node);
            self.emit_statement_opt(statement);
        }
    }

    fn transform_and_emit_while(&mut self, node: NodeIndex) {
        let NodeKind::While {
            condition,
            statement,
        } = *self.arena.kind(node)
        else {
            unreachable!()
        };
        if self.contains_yield(node) {
            let condition_label = self.define_label();
            let end_label = self.begin_loop_block(condition_label);
            self.mark_label(condition_label);
            let condition = self.visit_expr(condition);
            self.emit_break_when_false(end_label, condition);
            self.transform_and_emit_statement(statement);
            self.emit_break(condition_label);
            self.end_loop_block();
        } else {
            let statement = self.visit_stmt(node);
            self.emit_statement_opt(statement);
        }
    }

    fn transform_and_emit_for(&mut self, node: NodeIndex) {
        let NodeKind::For {
            initializer,
            condition,
            incrementor,
            statement,
        } = *self.arena.kind(node)
        else {
            unreachable!()
        };
        if self.contains_yield(node) {
            let condition_label = self.define_label();
            let increment_label = self.define_label();
            let end_label = self.begin_loop_block(increment_label);
            if let Some(initializer) = initializer {
                match self.arena.kind(initializer).clone() {
                    NodeKind::VariableStatement { declarations } => {
                        self.transform_and_emit_variable_declaration_list(&declarations);
                    }
                    _ => {
                        let expression = self.visit_expr(initializer);
                        self.emit_statement(IRNode::expr_stmt(expression));
                    }
                }
            }
            self.mark_label(condition_label);
            if let Some(condition) = condition {
                let condition = self.visit_expr(condition);
                self.emit_break_when_false(end_label, condition);
            }
            self.transform_and_emit_statement(statement);
            self.mark_label(increment_label);
            if let Some(incrementor) = incrementor {
                let incrementor = self.visit_expr(incrementor);
                self.emit_statement(IRNode::expr_stmt(incrementor));
            }
            self.emit_break(condition_label);
            self.end_loop_block();
        } else {
            let statement = self.visit_stmt(node);
            self.emit_statement_opt(statement);
        }
    }

    /// `for (var p in o)` with a suspension in the body: snapshot the keys
    /// into an array up front, then iterate by index so the position
    /// survives across resumes.
    fn transform_and_emit_for_in(&mut self, node: NodeIndex) {
        let NodeKind::ForIn {
            initializer,
            expression,
            statement,
        } = *self.arena.kind(node)
        else {
            unreachable!()
        };
        if self.contains_yield(node) {
            let keys_array = self.declare_local();
            let key = self.declare_local();
            let keys_index = self.declare_loop_variable();
            self.emit_assignment(keys_array.clone(), IRNode::array(vec![]));
            let object = self.visit_expr(expression);
            self.emit_statement(IRNode::ForInStatement {
                initializer: Box::new(key.clone()),
                expression: Box::new(object),
                body: Box::new(IRNode::expr_stmt(IRNode::call(
                    IRNode::prop(keys_array.clone(), "push"),
                    vec![key],
                ))),
            });
            self.emit_assignment(keys_index.clone(), IRNode::number("0"));

            let condition_label = self.define_label();
            let increment_label = self.define_label();
            let end_label = self.begin_loop_block(increment_label);
            self.mark_label(condition_label);
            self.emit_break_when_false(
                end_label,
                IRNode::binary(
                    keys_index.clone(),
                    "<",
                    IRNode::prop(keys_array.clone(), "length"),
                ),
            );

            let variable = match self.arena.kind(initializer).clone() {
                NodeKind::VariableStatement { declarations } => {
                    let mut first = None;
                    for &declaration in &declarations {
                        let NodeKind::VariableDeclaration { name, .. } =
                            *self.arena.kind(declaration)
                        else {
                            panic!("for-in initializer entries must be declarations")
                        };
                        let name = self
                            .arena
                            .ident_text(name)
                            .unwrap_or_else(|| panic!("declaration name must be an identifier"))
                            .to_string();
                        self.hoist_variable_name(&name);
                        first.get_or_insert(name);
                    }
                    IRNode::Identifier(
                        first.unwrap_or_else(|| panic!("for-in needs a declared variable")),
                    )
                }
                _ => self.visit_expr(initializer),
            };
            self.emit_assignment(variable, IRNode::elem(keys_array, keys_index.clone()));
            self.transform_and_emit_statement(statement);

            self.mark_label(increment_label);
            self.emit_statement(IRNode::expr_stmt(IRNode::PostfixUnaryExpr {
                operand: Box::new(keys_index),
                operator: "++".to_string(),
            }));
            self.emit_break(condition_label);
            self.end_loop_block();
        } else {
            let statement = self.visit_stmt(node);
            self.emit_statement_opt(statement);
        }
    }

    fn transform_and_emit_continue(&mut self, node: NodeIndex) {
        let NodeKind::Continue { label } = self.arena.kind(node).clone() else {
            unreachable!()
        };
        match self.find_continue_target(label.as_deref()) {
            Some(target) => self.emit_break(target),
            // The loop survives natively; so does the continue.
            None => self.emit_statement(IRNode::ContinueStatement(label)),
        }
    }

    fn transform_and_emit_break(&mut self, node: NodeIndex) {
        let NodeKind::Break { label } = self.arena.kind(node).clone() else {
            unreachable!()
        };
        match self.find_break_target(label.as_deref()) {
            Some(target) => self.emit_break(target),
            None => self.emit_statement(IRNode::BreakStatement(label)),
        }
    }

    fn transform_and_emit_return(&mut self, node: NodeIndex) {
        let NodeKind::Return { expression } = *self.arena.kind(node) else {
            unreachable!()
        };
        let expression = expression.map(|e| self.visit_expr(e));
        self.emit_return(expression);
    }

    fn transform_and_emit_with(&mut self, node: NodeIndex) {
        let NodeKind::With {
            expression,
            statement,
        } = *self.arena.kind(node)
        else {
            unreachable!()
        };
        if self.contains_yield(node) {
            let expression = self.visit_expr(expression);
            let expression = self.cache_expression(expression);
            self.begin_with_block(expression);
            self.transform_and_emit_statement(statement);
            self.end_with_block();
        } else {
            let statement = self.visit_stmt(node);
            self.emit_statement_opt(statement);
        }
    }

    fn transform_and_emit_switch(&mut self, node: NodeIndex) {
        let NodeKind::Switch {
            expression,
            clauses,
        } = self.arena.kind(node).clone()
        else {
            unreachable!()
        };
        if clauses.iter().any(|&c| self.contains_yield(c)) {
            // The discriminant is evaluated once; each run of clause tests up
            // to the next suspension becomes a native switch that jumps into
            // the state machine.
            let num_clauses = clauses.len();
            let end_label = self.begin_switch_block();
            let expression = self.visit_expr(expression);
            let expression = self.cache_expression(expression);

            let mut clause_labels = Vec::with_capacity(num_clauses);
            let mut default_clause_index = None;
            for (i, &clause) in clauses.iter().enumerate() {
                clause_labels.push(self.define_label());
                let NodeKind::CaseClause { test, .. } = self.arena.kind(clause) else {
                    panic!("switch members must be case clauses")
                };
                if test.is_none() && default_clause_index.is_none() {
                    default_clause_index = Some(i);
                }
            }

            let mut clauses_written = 0;
            let mut pending: Vec<IRSwitchCase> = Vec::new();
            while clauses_written < num_clauses {
                let mut default_clauses_skipped = 0;
                for i in clauses_written..num_clauses {
                    let clause = clauses[i];
                    let NodeKind::CaseClause { test, .. } = self.arena.kind(clause).clone() else {
                        unreachable!()
                    };
                    match test {
                        Some(test) => {
                            // Only a suspension in the case test itself forces
                            // a new group; suspending bodies are emitted after
                            // the jump table.
                            if self.contains_yield(test) && !pending.is_empty() {
                                break;
                            }
                            let test = self.visit_expr(test);
                            let jump = self.create_inline_break(clause_labels[i]);
                            pending.push(IRSwitchCase {
                                test: Some(test),
                                statements: vec![jump],
                            });
                        }
                        None => default_clauses_skipped += 1,
                    }
                }
                if !pending.is_empty() {
                    clauses_written += pending.len();
                    let cases = std::mem::take(&mut pending);
                    self.emit_statement(IRNode::SwitchStatement {
                        expression: Box::new(expression.clone()),
                        cases,
                    });
                }
                if default_clauses_skipped > 0 {
                    clauses_written += default_clauses_skipped;
                }
            }
            match default_clause_index {
                Some(i) => self.emit_break(clause_labels[i]),
                None => self.emit_break(end_label),
            }

            for (i, &clause) in clauses.iter().enumerate() {
                self.mark_label(clause_labels[i]);
                let NodeKind::CaseClause { statements, .. } = self.arena.kind(clause).clone()
                else {
                    unreachable!()
                };
                self.transform_and_emit_statements(&statements);
            }
            self.end_switch_block();
        } else {
            let statement = self.visit_stmt(node);
            self.emit_statement_opt(statement);
        }
    }

    fn transform_and_emit_labeled(&mut self, node: NodeIndex) {
        let NodeKind::Labeled { label, statement } = self.arena.kind(node).clone() else {
            unreachable!()
        };
        if self.contains_yield(node) {
            self.begin_labeled_block(label);
            self.transform_and_emit_statement(statement);
            self.end_labeled_block();
        } else {
            let statement = self.visit_stmt(node);
            self.emit_statement_opt(statement);
        }
    }

    fn transform_and_emit_throw(&mut self, node: NodeIndex) {
        let NodeKind::Throw { expression } = *self.arena.kind(node) else {
            unreachable!()
        };
        let expression = self.visit_expr(expression);
        self.emit_throw(expression);
    }

    fn transform_and_emit_try(&mut self, node: NodeIndex) {
        let NodeKind::Try {
            try_block,
            catch_clause,
            finally_block,
        } = *self.arena.kind(node)
        else {
            unreachable!()
        };
        if self.contains_yield(node) {
            self.begin_exception_block();
            self.transform_and_emit_statement(try_block);
            if let Some(catch_clause) = catch_clause {
                let NodeKind::CatchClause { variable, block } = *self.arena.kind(catch_clause)
                else {
                    panic!("try handler must be a catch clause")
                };
                let masks = self.begin_catch_block(variable);
                self.transform_and_emit_statement(block);
                self.pop_name_masks(masks);
            }
            if let Some(finally_block) = finally_block {
                self.begin_finally_block();
                self.transform_and_emit_statement(finally_block);
            }
            self.end_exception_block();
        } else {
            let statement = self.visit_stmt(node);
            self.emit_statement_opt(statement);
        }
    }

    // =========================================================================
    // Native-context statement visitor
    // =========================================================================

    /// Convert a whole statement list (non-generator function bodies).
    pub(super) fn convert_statements_of(&mut self, body: NodeIndex) -> Vec<IRNode> {
        match self.arena.kind(body).clone() {
            NodeKind::Block { statements } => statements
                .iter()
                .filter_map(|&s| self.visit_stmt(s))
                .collect(),
            _ => self.visit_stmt(body).into_iter().collect(),
        }
    }

    fn visit_stmt_embedded(&mut self, node: NodeIndex) -> IRNode {
        self.visit_stmt(node).unwrap_or(IRNode::EmptyStatement)
    }

    /// Convert a statement with no suspension beneath it. Returns `None`
    /// when the statement dissolves entirely (hoisted declarations).
    pub(super) fn visit_stmt(&mut self, node: NodeIndex) -> Option<IRNode> {
        match self.arena.kind(node).clone() {
            NodeKind::Block { statements } => Some(IRNode::block(
                statements
                    .iter()
                    .filter_map(|&s| self.visit_stmt(s))
                    .collect(),
            )),
            NodeKind::ExpressionStatement(expression) => {
                Some(IRNode::expr_stmt(self.visit_expr(expression)))
            }
            NodeKind::EmptyStatement => Some(IRNode::EmptyStatement),
            NodeKind::VariableStatement { declarations } => {
                self.visit_variable_statement(node, &declarations)
            }
            NodeKind::If {
                condition,
                then_statement,
                else_statement,
            } => {
                let condition = self.visit_expr(condition);
                let then_branch = self.visit_stmt_embedded(then_statement);
                let else_branch = else_statement.map(|e| Box::new(self.visit_stmt_embedded(e)));
                Some(IRNode::IfStatement {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch,
                })
            }
            NodeKind::Do {
                statement,
                condition,
            } => {
                let script = self.in_statement_containing_yield;
                if script {
                    self.begin_script_loop_block();
                }
                let body = self.visit_stmt_embedded(statement);
                let condition = self.visit_expr(condition);
                if script {
                    self.end_loop_block();
                }
                Some(IRNode::DoWhileStatement {
                    body: Box::new(body),
                    condition: Box::new(condition),
                })
            }
            NodeKind::While {
                condition,
                statement,
            } => {
                let script = self.in_statement_containing_yield;
                if script {
                    self.begin_script_loop_block();
                }
                let condition = self.visit_expr(condition);
                let body = self.visit_stmt_embedded(statement);
                if script {
                    self.end_loop_block();
                }
                Some(IRNode::WhileStatement {
                    condition: Box::new(condition),
                    body: Box::new(body),
                })
            }
            NodeKind::For { .. } => self.visit_for(node),
            NodeKind::ForIn { .. } => self.visit_for_in(node),
            NodeKind::Continue { label } => {
                if self.in_statement_containing_yield
                    && let Some(target) = self.find_continue_target(label.as_deref())
                {
                    return Some(self.create_inline_break(target));
                }
                Some(IRNode::ContinueStatement(label))
            }
            NodeKind::Break { label } => {
                if self.in_statement_containing_yield
                    && let Some(target) = self.find_break_target(label.as_deref())
                {
                    return Some(self.create_inline_break(target));
                }
                Some(IRNode::BreakStatement(label))
            }
            NodeKind::Return { expression } => {
                let expression = expression.map(|e| self.visit_expr(e));
                if self.in_generator_body {
                    Some(self.create_inline_return(expression))
                } else {
                    Some(IRNode::ReturnStatement(expression.map(Box::new)))
                }
            }
            NodeKind::With {
                expression,
                statement,
            } => {
                let expression = self.visit_expr(expression);
                let body = self.visit_stmt_embedded(statement);
                Some(IRNode::WithStatement {
                    expression: Box::new(expression),
                    body: Box::new(body),
                })
            }
            NodeKind::Switch {
                expression,
                clauses,
            } => {
                let script = self.in_statement_containing_yield;
                if script {
                    self.begin_script_switch_block();
                }
                let expression = self.visit_expr(expression);
                let cases = clauses
                    .iter()
                    .map(|&clause| {
                        let NodeKind::CaseClause { test, statements } =
                            self.arena.kind(clause).clone()
                        else {
                            panic!("switch members must be case clauses")
                        };
                        IRSwitchCase {
                            test: test.map(|t| self.visit_expr(t)),
                            statements: statements
                                .iter()
                                .filter_map(|&s| self.visit_stmt(s))
                                .collect(),
                        }
                    })
                    .collect();
                if script {
                    self.end_switch_block();
                }
                Some(IRNode::SwitchStatement {
                    expression: Box::new(expression),
                    cases,
                })
            }
            NodeKind::Labeled { label, statement } => {
                let script = self.in_statement_containing_yield;
                if script {
                    self.begin_script_labeled_block(label.clone());
                }
                let statement = self.visit_stmt_embedded(statement);
                if script {
                    self.end_labeled_block();
                }
                Some(IRNode::LabeledStatement {
                    label,
                    statement: Box::new(statement),
                })
            }
            NodeKind::Throw { expression } => Some(IRNode::ThrowStatement(Box::new(
                self.visit_expr(expression),
            ))),
            NodeKind::Try {
                try_block,
                catch_clause,
                finally_block,
            } => self.visit_try(try_block, catch_clause, finally_block),
            NodeKind::FunctionDecl { .. } => {
                let declaration = self.transform_function(node);
                if self.in_generator_body {
                    // Declarations hoist out of the state machine entirely.
                    self.hoisted_functions.push(declaration);
                    None
                } else {
                    Some(declaration)
                }
            }
            _ => panic!("not a statement: {:?}", self.arena.kind(node)),
        }
    }

    fn visit_variable_statement(
        &mut self,
        node: NodeIndex,
        declarations: &[NodeIndex],
    ) -> Option<IRNode> {
        if self.contains_yield(node) {
            self.transform_and_emit_variable_declaration_list(declarations);
            return None;
        }
        if !self.in_generator_body {
            return Some(self.convert_variable_declaration_list(declarations));
        }
        let mut assignments = Vec::new();
        for &declaration in declarations {
            let NodeKind::VariableDeclaration { name, initializer } = *self.arena.kind(declaration)
            else {
                panic!("variable statement entries must be declarations")
            };
            let name = self
                .arena
                .ident_text(name)
                .unwrap_or_else(|| panic!("declaration name must be an identifier"))
                .to_string();
            self.hoist_variable_name(&name);
            if let Some(initializer) = initializer {
                let value = self.visit_expr(initializer);
                assignments.push(IRNode::assign(IRNode::id(name), value));
            }
        }
        if assignments.is_empty() {
            None
        } else {
            Some(IRNode::expr_stmt(IRNode::inline_expressions(assignments)))
        }
    }

    fn convert_variable_declaration_list(&mut self, declarations: &[NodeIndex]) -> IRNode {
        IRNode::VarDeclList(
            declarations
                .iter()
                .map(|&declaration| {
                    let NodeKind::VariableDeclaration { name, initializer } =
                        *self.arena.kind(declaration)
                    else {
                        panic!("variable statement entries must be declarations")
                    };
                    let name = self
                        .arena
                        .ident_text(name)
                        .unwrap_or_else(|| panic!("declaration name must be an identifier"))
                        .to_string();
                    let initializer = initializer.map(|i| self.visit_expr(i));
                    IRNode::var_decl(name, initializer)
                })
                .collect(),
        )
    }

    fn visit_for(&mut self, node: NodeIndex) -> Option<IRNode> {
        let NodeKind::For {
            initializer,
            condition,
            incrementor,
            statement,
        } = *self.arena.kind(node)
        else {
            unreachable!()
        };
        let script = self.in_statement_containing_yield;
        if script {
            self.begin_script_loop_block();
        }
        let initializer = initializer.and_then(|initializer| {
            match self.arena.kind(initializer).clone() {
                NodeKind::VariableStatement { declarations } => {
                    if self.in_generator_body {
                        let rewritten = self.visit_variable_statement(initializer, &declarations);
                        rewritten.map(|statement| match statement {
                            IRNode::ExpressionStatement(expression) => *expression,
                            other => other,
                        })
                    } else {
                        Some(self.convert_variable_declaration_list(&declarations))
                    }
                }
                _ => Some(self.visit_expr(initializer)),
            }
        });
        let condition = condition.map(|c| self.visit_expr(c));
        let incrementor = incrementor.map(|i| self.visit_expr(i));
        let body = self.visit_stmt_embedded(statement);
        if script {
            self.end_loop_block();
        }
        Some(IRNode::ForStatement {
            initializer: initializer.map(Box::new),
            condition: condition.map(Box::new),
            incrementor: incrementor.map(Box::new),
            body: Box::new(body),
        })
    }

    fn visit_for_in(&mut self, node: NodeIndex) -> Option<IRNode> {
        let NodeKind::ForIn {
            initializer,
            expression,
            statement,
        } = *self.arena.kind(node)
        else {
            unreachable!()
        };
        let script = self.in_statement_containing_yield;
        if script {
            self.begin_script_loop_block();
        }
        let initializer = match self.arena.kind(initializer).clone() {
            NodeKind::VariableStatement { declarations } => {
                if self.in_generator_body {
                    let mut first = None;
                    for &declaration in &declarations {
                        let NodeKind::VariableDeclaration { name, .. } =
                            *self.arena.kind(declaration)
                        else {
                            panic!("for-in initializer entries must be declarations")
                        };
                        let name = self
                            .arena
                            .ident_text(name)
                            .unwrap_or_else(|| panic!("declaration name must be an identifier"))
                            .to_string();
                        self.hoist_variable_name(&name);
                        first.get_or_insert(name);
                    }
                    IRNode::Identifier(
                        first.unwrap_or_else(|| panic!("for-in needs a declared variable")),
                    )
                } else {
                    self.convert_variable_declaration_list(&declarations)
                }
            }
            _ => self.visit_expr(initializer),
        };
        let expression = self.visit_expr(expression);
        let body = self.visit_stmt_embedded(statement);
        if script {
            self.end_loop_block();
        }
        Some(IRNode::ForInStatement {
            initializer: Box::new(initializer),
            expression: Box::new(expression),
            body: Box::new(body),
        })
    }

    fn visit_try(
        &mut self,
        try_block: NodeIndex,
        catch_clause: Option<NodeIndex>,
        finally_block: Option<NodeIndex>,
    ) -> Option<IRNode> {
        let try_block = self.visit_stmt_embedded(try_block);
        let catch_clause = catch_clause.map(|clause| {
            let NodeKind::CatchClause { variable, block } = *self.arena.kind(clause) else {
                panic!("try handler must be a catch clause")
            };
            let param = variable.map(|v| {
                self.arena
                    .ident_text(v)
                    .unwrap_or_else(|| panic!("catch binding must be an identifier"))
                    .to_string()
            });
            // A surviving catch binding shadows any renamed outer one.
            let masks = match &param {
                Some(name) => self.push_name_masks(std::slice::from_ref(name)),
                None => 0,
            };
            let body = self.convert_statements_of(block);
            self.pop_name_masks(masks);
            IRCatchClause { param, body }
        });
        let finally_block = finally_block.map(|f| Box::new(self.visit_stmt_embedded(f)));
        Some(IRNode::TryStatement {
            try_block: Box::new(try_block),
            catch_clause,
            finally_block,
        })
    }
}
