//! Expression flattening for the generator transform.
//!
//! `visit_expr` is the entry point for any expression in a lowered position.
//! Subtrees with no `yield` beneath them convert structurally through
//! `convert_expr`; everything else is decomposed so that by the time a
//! `yield` is reached, every value the containing expression had already
//! evaluated lives in a hoisted temp. Whole-expression results come back as
//! IR that reads from those temps and from `state.sent()`.

use smallvec::SmallVec;

use super::generators::GeneratorTransformer;
use super::ir::{IRNode, IRProperty, IRPropertyKey};
use crate::ast::{BinaryOp, NodeIndex, NodeKind, PropName};

/// Spill buffer for expressions accumulated between suspension points.
type PendingExpressions = SmallVec<[IRNode; 4]>;

impl GeneratorTransformer<'_> {
    /// Visit an expression in a position whose statement is being lowered.
    pub(super) fn visit_expr(&mut self, node: NodeIndex) -> IRNode {
        if !self.contains_yield(node) {
            return self.convert_expr(node);
        }
        match self.arena.kind(node).clone() {
            NodeKind::Yield {
                expression,
                delegate,
            } => self.visit_yield(expression, delegate),
            NodeKind::Paren(inner) => self.visit_expr(inner).paren(),
            NodeKind::PrefixUnary { op, operand } => IRNode::PrefixUnaryExpr {
                operator: op.text().to_string(),
                operand: Box::new(self.visit_expr(operand)),
            },
            NodeKind::PostfixUnary { op, operand } => IRNode::PostfixUnaryExpr {
                operand: Box::new(self.visit_expr(operand)),
                operator: op.text().to_string(),
            },
            NodeKind::Binary { op, left, right } => self.visit_binary(op, left, right),
            NodeKind::CommaList { elements } => self.visit_comma_list(&elements),
            NodeKind::Conditional {
                condition,
                when_true,
                when_false,
            } => self.visit_conditional(condition, when_true, when_false),
            NodeKind::ArrayLit { elements } => self.visit_elements(&elements, None),
            NodeKind::ObjectLit { properties } => self.visit_object_literal(&properties),
            NodeKind::PropertyAccess { object, name } => {
                IRNode::prop(self.visit_expr(object), name)
            }
            NodeKind::ElementAccess { object, index } => self.visit_element_access(object, index),
            NodeKind::Call { callee, arguments } => self.visit_call(callee, &arguments),
            NodeKind::New { callee, arguments } => self.visit_new(callee, &arguments),
            other => panic!("cannot flatten yield out of {other:?}"),
        }
    }

    /// `yield x` / `yield* x`: emit the suspension, mark the resume point,
    /// and evaluate to the resumed value.
    fn visit_yield(&mut self, expression: Option<NodeIndex>, delegate: bool) -> IRNode {
        let resume_label = self.define_label();
        let expression = expression.map(|e| self.visit_expr(e));
        if delegate {
            let operand = match expression {
                Some(expression) => expression,
                None => panic!("yield* requires an operand"),
            };
            let iterator = IRNode::call(IRNode::id("__values"), vec![operand]);
            self.emit_yield_star(iterator);
        } else {
            self.emit_yield(expression);
        }
        self.mark_label(resume_label);
        IRNode::GeneratorSent
    }

    fn visit_binary(&mut self, op: BinaryOp, left: NodeIndex, right: NodeIndex) -> IRNode {
        if op.is_assignment() {
            return self.visit_assignment(op, left, right);
        }
        if op == BinaryOp::Comma {
            let mut pending = PendingExpressions::new();
            self.visit_comma_side(left, &mut pending);
            self.visit_comma_side(right, &mut pending);
            return IRNode::inline_expressions(pending.into_vec());
        }
        if self.contains_yield(right) {
            if op.is_logical() {
                return self.visit_logical(op, left, right);
            }
            // The left operand must be evaluated before the suspension on
            // the right.
            let left = self.visit_expr(left);
            let left = self.cache_expression(left);
            let right = self.visit_expr(right);
            return IRNode::binary(left, op.text(), right);
        }
        // The suspension is on the left; the right operand converts in place.
        let left = self.visit_expr(left);
        let right = self.visit_expr(right);
        match op {
            BinaryOp::AmpersandAmpersand => IRNode::logical_and(left, right),
            BinaryOp::BarBar => IRNode::logical_or(left, right),
            _ => IRNode::binary(left, op.text(), right),
        }
    }

    /// Assignments evaluate their target reference before the right side, so
    /// any suspension on the right forces the target's object (and index)
    /// into temps first.
    fn visit_assignment(&mut self, op: BinaryOp, left: NodeIndex, right: NodeIndex) -> IRNode {
        if !self.contains_yield(right) {
            let left = self.visit_expr(left);
            let right = self.visit_expr(right);
            return IRNode::binary(left, op.text(), right);
        }
        let target = match self.arena.kind(left).clone() {
            NodeKind::PropertyAccess { object, name } => {
                let object = self.visit_expr(object);
                let object = self.cache_expression(object);
                IRNode::prop(object, name)
            }
            NodeKind::ElementAccess { object, index } => {
                let object = self.visit_expr(object);
                let object = self.cache_expression(object);
                let index = self.visit_expr(index);
                let index = self.cache_expression(index);
                IRNode::elem(object, index)
            }
            _ => self.visit_expr(left),
        };
        if let Some(base) = op.compound_base() {
            // `a.b += yield` reads the old value before suspending.
            let old_value = self.cache_expression(target.clone());
            let right = self.visit_expr(right);
            IRNode::assign(target, IRNode::binary(old_value, base.text(), right))
        } else {
            let right = self.visit_expr(right);
            IRNode::assign(target, right)
        }
    }

    /// `a && (yield)` / `a || (yield)`: route both sides through a result
    /// temp with a conditional jump over the right side.
    fn visit_logical(&mut self, op: BinaryOp, left: NodeIndex, right: NodeIndex) -> IRNode {
        let result_label = self.define_label();
        let result_local = self.declare_local();
        let left = self.visit_expr(left);
        self.emit_assignment(result_local.clone(), left);
        if op == BinaryOp::AmpersandAmpersand {
            self.emit_break_when_false(result_label, result_local.clone());
        } else {
            self.emit_break_when_true(result_label, result_local.clone());
        }
        let right = self.visit_expr(right);
        self.emit_assignment(result_local.clone(), right);
        self.mark_label(result_label);
        result_local
    }

    /// One side of a comma expression: spill pending expressions into a
    /// statement before any element that suspends.
    fn visit_comma_side(&mut self, node: NodeIndex, pending: &mut PendingExpressions) {
        if let NodeKind::Binary {
            op: BinaryOp::Comma,
            left,
            right,
        } = self.arena.kind(node).clone()
        {
            self.visit_comma_side(left, pending);
            self.visit_comma_side(right, pending);
        } else {
            if self.contains_yield(node) && !pending.is_empty() {
                let spilled = std::mem::take(pending);
                self.emit_statement(IRNode::expr_stmt(IRNode::inline_expressions(
                    spilled.into_vec(),
                )));
            }
            pending.push(self.visit_expr(node));
        }
    }

    fn visit_comma_list(&mut self, elements: &[NodeIndex]) -> IRNode {
        let mut pending = PendingExpressions::new();
        for &element in elements {
            if self.contains_yield(element) && !pending.is_empty() {
                let spilled = std::mem::take(&mut pending);
                self.emit_statement(IRNode::expr_stmt(IRNode::inline_expressions(
                    spilled.into_vec(),
                )));
            }
            pending.push(self.visit_expr(element));
        }
        IRNode::inline_expressions(pending.into_vec())
    }

    fn visit_conditional(
        &mut self,
        condition: NodeIndex,
        when_true: NodeIndex,
        when_false: NodeIndex,
    ) -> IRNode {
        if !self.contains_yield(when_true) && !self.contains_yield(when_false) {
            // Only the condition suspends; the branches ride along.
            return IRNode::ConditionalExpr {
                condition: Box::new(self.visit_expr(condition)),
                when_true: Box::new(self.convert_expr(when_true)),
                when_false: Box::new(self.convert_expr(when_false)),
            };
        }
        let when_false_label = self.define_label();
        let result_label = self.define_label();
        let result_local = self.declare_local();
        let condition = self.visit_expr(condition);
        self.emit_break_when_false(when_false_label, condition);
        let when_true = self.visit_expr(when_true);
        self.emit_assignment(result_local.clone(), when_true);
        self.emit_break(result_label);
        self.mark_label(when_false_label);
        let when_false = self.visit_expr(when_false);
        self.emit_assignment(result_local.clone(), when_false);
        self.mark_label(result_label);
        result_local
    }

    /// Array-literal style element list with a suspension somewhere inside:
    /// accumulate already-evaluated prefixes in a temp and stitch the rest on
    /// with `.concat`. `leading` is an extra first element (`void 0` for the
    /// `new` rewrite) that must ride in the first evaluated chunk.
    pub(super) fn visit_elements(
        &mut self,
        elements: &[NodeIndex],
        mut leading: Option<IRNode>,
    ) -> IRNode {
        let num_initial = elements
            .iter()
            .take_while(|&&e| !self.contains_yield(e))
            .count();
        let mut temp: Option<IRNode> = None;

        if num_initial > 0 {
            let local = self.declare_local();
            let mut initial = Vec::new();
            if let Some(leading) = leading.take() {
                initial.push(leading);
            }
            for &element in &elements[..num_initial] {
                initial.push(self.visit_expr(element));
            }
            self.emit_assignment(local.clone(), IRNode::array(initial));
            temp = Some(local);
        }

        let mut expressions = PendingExpressions::new();
        for &element in &elements[num_initial..] {
            if self.contains_yield(element) && !expressions.is_empty() {
                let chunk = std::mem::take(&mut expressions);
                // A temp that already holds elements grows via concat; the
                // first spill starts the array.
                let (local, value) = match temp.take() {
                    Some(local) => {
                        let value = IRNode::call(
                            IRNode::prop(local.clone(), "concat"),
                            vec![IRNode::array(chunk.into_vec())],
                        );
                        (local, value)
                    }
                    None => {
                        let local = self.declare_local();
                        let mut all = Vec::new();
                        if let Some(leading) = leading.take() {
                            all.push(leading);
                        }
                        all.extend(chunk);
                        (local, IRNode::array(all))
                    }
                };
                self.emit_assignment(local.clone(), value);
                temp = Some(local);
            }
            expressions.push(self.visit_expr(element));
        }

        match temp {
            Some(local) => IRNode::call(
                IRNode::prop(local, "concat"),
                vec![IRNode::array(expressions.into_vec())],
            ),
            None => {
                let mut all = Vec::new();
                if let Some(leading) = leading {
                    all.push(leading);
                }
                all.extend(expressions);
                IRNode::array(all)
            }
        }
    }

    /// `{ a: 1, b: yield }`: evaluate into a temp, assigning each property
    /// past the first suspension individually, and yield the temp as the
    /// overall value.
    fn visit_object_literal(&mut self, properties: &[NodeIndex]) -> IRNode {
        let num_initial = properties
            .iter()
            .take_while(|&&p| !self.contains_yield(p))
            .count();
        let temp = self.declare_local();

        let mut initial = Vec::new();
        for &property in &properties[..num_initial] {
            initial.push(self.convert_property(property));
        }
        self.emit_assignment(temp.clone(), IRNode::object(initial));

        let mut expressions = PendingExpressions::new();
        for &property in &properties[num_initial..] {
            if self.contains_yield(property) && !expressions.is_empty() {
                let spilled = std::mem::take(&mut expressions);
                self.emit_statement(IRNode::expr_stmt(IRNode::inline_expressions(
                    spilled.into_vec(),
                )));
            }
            let NodeKind::PropertyAssignment { name, initializer } =
                self.arena.kind(property).clone()
            else {
                panic!("object literal member must be a property assignment")
            };
            let target = match name {
                PropName::Ident(text) => IRNode::prop(temp.clone(), text),
                PropName::StringLit(text) => IRNode::elem(temp.clone(), IRNode::string(text)),
                PropName::NumberLit(text) => IRNode::elem(temp.clone(), IRNode::number(text)),
                PropName::Computed(key) => {
                    let key = self.visit_expr(key);
                    IRNode::elem(temp.clone(), key)
                }
            };
            let value = self.visit_expr(initializer);
            expressions.push(IRNode::assign(target, value));
        }
        expressions.push(temp);
        IRNode::inline_expressions(expressions.into_vec())
    }

    fn visit_element_access(&mut self, object: NodeIndex, index: NodeIndex) -> IRNode {
        if self.contains_yield(index) {
            let object = self.visit_expr(object);
            let object = self.cache_expression(object);
            let index = self.visit_expr(index);
            return IRNode::elem(object, index);
        }
        let object = self.visit_expr(object);
        let index = self.visit_expr(index);
        IRNode::elem(object, index)
    }

    /// `a.b(1, yield 2)` becomes `_b = (_a = a).b; ... _b.apply(_a, [1, %sent%])`
    /// so the callee and receiver are pinned before the suspension.
    fn visit_call(&mut self, callee: NodeIndex, arguments: &[NodeIndex]) -> IRNode {
        if !arguments.iter().any(|&a| self.contains_yield(a)) {
            let callee = self.visit_expr(callee);
            let arguments = arguments.iter().map(|&a| self.visit_expr(a)).collect();
            return IRNode::call(callee, arguments);
        }
        let (target, this_arg) = self.create_call_binding(callee, true);
        let target = self.cache_expression(target);
        let arguments = self.visit_elements(arguments, None);
        IRNode::call(IRNode::prop(target, "apply"), vec![this_arg, arguments])
    }

    /// `new C(yield)` becomes `_a = C.bind; ... new (_a.apply(C, [void 0, %sent%]))()`.
    fn visit_new(&mut self, callee: NodeIndex, arguments: &[NodeIndex]) -> IRNode {
        if !arguments.iter().any(|&a| self.contains_yield(a)) {
            let callee = self.visit_expr(callee);
            let arguments = arguments.iter().map(|&a| self.visit_expr(a)).collect();
            return IRNode::new_expr(callee, arguments);
        }
        let (target, this_arg) = self.create_bind_binding(callee);
        let target = self.cache_expression(target);
        let arguments = self.visit_elements(arguments, Some(IRNode::void_0()));
        IRNode::new_expr(
            IRNode::call(IRNode::prop(target, "apply"), vec![this_arg, arguments]).paren(),
            vec![],
        )
    }

    /// Split a callee into an applyable target and its receiver.
    ///
    /// Receivers that are plain identifiers are only captured when
    /// `cache_identifiers` is set (calls pin everything; the `new` rewrite
    /// can reuse the identifier directly).
    fn create_call_binding(
        &mut self,
        callee: NodeIndex,
        cache_identifiers: bool,
    ) -> (IRNode, IRNode) {
        match self.arena.kind(callee).clone() {
            NodeKind::PropertyAccess { object, name } => {
                let object = self.visit_expr(object);
                if self.should_capture_receiver(&object, cache_identifiers) {
                    let this_arg = self.declare_local();
                    let target = IRNode::prop(
                        IRNode::assign(this_arg.clone(), object).paren(),
                        name,
                    );
                    (target, this_arg)
                } else {
                    let target = IRNode::prop(object.clone(), name);
                    (target, object)
                }
            }
            NodeKind::ElementAccess { object, index } => {
                let object = self.visit_expr(object);
                let index = self.visit_expr(index);
                if self.should_capture_receiver(&object, cache_identifiers) {
                    let this_arg = self.declare_local();
                    let target = IRNode::elem(
                        IRNode::assign(this_arg.clone(), object).paren(),
                        index,
                    );
                    (target, this_arg)
                } else {
                    let target = IRNode::elem(object.clone(), index);
                    (target, object)
                }
            }
            _ => (self.visit_expr(callee), IRNode::void_0()),
        }
    }

    /// Callee binding for the `new` rewrite: targets `callee.bind` without
    /// forcing identifier receivers into temps.
    fn create_bind_binding(&mut self, callee: NodeIndex) -> (IRNode, IRNode) {
        let object = self.visit_expr(callee);
        if self.should_capture_receiver(&object, false) {
            let this_arg = self.declare_local();
            let target = IRNode::prop(IRNode::assign(this_arg.clone(), object).paren(), "bind");
            (target, this_arg)
        } else {
            let target = IRNode::prop(object.clone(), "bind");
            (target, object)
        }
    }

    /// Whether a receiver expression must be evaluated into a temp to be
    /// used both as the apply target and as `this`.
    fn should_capture_receiver(&self, object: &IRNode, cache_identifiers: bool) -> bool {
        match object {
            IRNode::Identifier(name) => {
                cache_identifiers && !self.generated_names.contains(name)
            }
            IRNode::This
            | IRNode::NumericLiteral(_)
            | IRNode::StringLiteral(_)
            | IRNode::BooleanLiteral(_)
            | IRNode::NullLiteral
            | IRNode::Undefined
            | IRNode::GeneratorSent => false,
            _ => true,
        }
    }

    // =========================================================================
    // Structural conversion (no suspension beneath)
    // =========================================================================

    pub(super) fn convert_expr(&mut self, node: NodeIndex) -> IRNode {
        match self.arena.kind(node).clone() {
            NodeKind::Ident(name) => match self.substitute_name(&name) {
                Some(renamed) => IRNode::Identifier(renamed),
                None => IRNode::Identifier(name),
            },
            NodeKind::NumberLit(text) => IRNode::NumericLiteral(text),
            NodeKind::StringLit(text) => IRNode::StringLiteral(text),
            NodeKind::BoolLit(value) => IRNode::BooleanLiteral(value),
            NodeKind::NullLit => IRNode::NullLiteral,
            NodeKind::This => IRNode::This,
            NodeKind::OmittedExpr => IRNode::OmittedExpression,
            NodeKind::Paren(inner) => self.convert_expr(inner).paren(),
            NodeKind::PrefixUnary { op, operand } => IRNode::PrefixUnaryExpr {
                operator: op.text().to_string(),
                operand: Box::new(self.convert_expr(operand)),
            },
            NodeKind::PostfixUnary { op, operand } => IRNode::PostfixUnaryExpr {
                operand: Box::new(self.convert_expr(operand)),
                operator: op.text().to_string(),
            },
            NodeKind::Binary { op, left, right } => {
                let left = self.convert_expr(left);
                let right = self.convert_expr(right);
                match op {
                    BinaryOp::AmpersandAmpersand => IRNode::logical_and(left, right),
                    BinaryOp::BarBar => IRNode::logical_or(left, right),
                    BinaryOp::Comma => IRNode::CommaExpr(vec![left, right]),
                    _ => IRNode::binary(left, op.text(), right),
                }
            }
            NodeKind::CommaList { elements } => IRNode::CommaExpr(
                elements.iter().map(|&e| self.convert_expr(e)).collect(),
            ),
            NodeKind::Conditional {
                condition,
                when_true,
                when_false,
            } => IRNode::ConditionalExpr {
                condition: Box::new(self.convert_expr(condition)),
                when_true: Box::new(self.convert_expr(when_true)),
                when_false: Box::new(self.convert_expr(when_false)),
            },
            NodeKind::Call { callee, arguments } => {
                let callee = self.convert_expr(callee);
                let arguments = arguments.iter().map(|&a| self.convert_expr(a)).collect();
                IRNode::call(callee, arguments)
            }
            NodeKind::New { callee, arguments } => {
                let callee = self.convert_expr(callee);
                let arguments = arguments.iter().map(|&a| self.convert_expr(a)).collect();
                IRNode::new_expr(callee, arguments)
            }
            NodeKind::PropertyAccess { object, name } => {
                IRNode::prop(self.convert_expr(object), name)
            }
            NodeKind::ElementAccess { object, index } => {
                let object = self.convert_expr(object);
                let index = self.convert_expr(index);
                IRNode::elem(object, index)
            }
            NodeKind::ArrayLit { elements } => {
                IRNode::array(elements.iter().map(|&e| self.convert_expr(e)).collect())
            }
            NodeKind::ObjectLit { properties } => IRNode::object(
                properties
                    .iter()
                    .map(|&p| self.convert_property(p))
                    .collect(),
            ),
            NodeKind::FunctionExpr { .. } => self.transform_function(node),
            NodeKind::Yield { .. } => {
                panic!("yield survived outside a lowered statement position")
            }
            other => panic!("not an expression: {other:?}"),
        }
    }

    fn convert_property(&mut self, property: NodeIndex) -> IRProperty {
        let NodeKind::PropertyAssignment { name, initializer } =
            self.arena.kind(property).clone()
        else {
            panic!("object literal member must be a property assignment")
        };
        let key = match name {
            PropName::Ident(text) => IRPropertyKey::Identifier(text),
            PropName::StringLit(text) => IRPropertyKey::StringLiteral(text),
            PropName::NumberLit(text) => IRPropertyKey::NumericLiteral(text),
            PropName::Computed(key) => IRPropertyKey::Computed(Box::new(self.convert_expr(key))),
        };
        IRProperty {
            key,
            value: self.convert_expr(initializer),
        }
    }
}
