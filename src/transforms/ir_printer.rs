//! Printer that walks transform IR trees and emits JavaScript strings.
//!
//! The printer is a plain recursive walk with an indentation counter. Every
//! statement variant emits its own trailing `;`; containers (blocks, case
//! clauses, function bodies) are responsible for indentation and newlines
//! between statements.
//!
//! Generator bodies carry the name of their state parameter, and the printer
//! keeps a stack of those names so `GeneratorSent` / `GeneratorLabel` /
//! `GeneratorTrysPush` resolve to the innermost machine even when generator
//! functions nest.

use std::fmt::Write;

use super::ir::{IRCatchClause, IRGeneratorCase, IRNode, IRProperty, IRPropertyKey, IRSwitchCase};

pub struct IRPrinter {
    output: String,
    indent_level: usize,
    indent_str: &'static str,
    state_names: Vec<String>,
}

impl Default for IRPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl IRPrinter {
    pub fn new() -> Self {
        IRPrinter {
            output: String::new(),
            indent_level: 0,
            indent_str: "    ",
            state_names: Vec::new(),
        }
    }

    /// Emit a single IR node to a string.
    pub fn emit_to_string(node: &IRNode) -> String {
        let mut printer = IRPrinter::new();
        printer.emit_node(node);
        printer.output
    }

    /// Emit a sequence of statements to a string, one per line.
    pub fn emit_statements_to_string(statements: &[IRNode]) -> String {
        let mut printer = IRPrinter::new();
        printer.emit_statements(statements);
        printer.output
    }

    pub fn finish(self) -> String {
        self.output
    }

    /// Name of the innermost generator state parameter.
    fn state_name(&self) -> &str {
        self.state_names.last().map_or("_a", String::as_str)
    }

    pub fn emit_node(&mut self, node: &IRNode) {
        match node {
            IRNode::NumericLiteral(n) => self.write(n),
            IRNode::StringLiteral(s) => {
                self.write("\"");
                self.write_escaped(s);
                self.write("\"");
            }
            IRNode::BooleanLiteral(b) => self.write(if *b { "true" } else { "false" }),
            IRNode::NullLiteral => self.write("null"),
            IRNode::Undefined => self.write("void 0"),
            IRNode::OmittedExpression => {}
            IRNode::Identifier(name) => self.write(name),
            IRNode::This => self.write("this"),
            IRNode::BinaryExpr {
                left,
                operator,
                right,
            } => {
                self.emit_node(left);
                self.write(" ");
                self.write(operator);
                self.write(" ");
                self.emit_node(right);
            }
            IRNode::PrefixUnaryExpr { operator, operand } => {
                self.write(operator);
                self.emit_node(operand);
            }
            IRNode::PostfixUnaryExpr { operand, operator } => {
                self.emit_node(operand);
                self.write(operator);
            }
            IRNode::CallExpr { callee, arguments } => {
                self.emit_node(callee);
                self.write("(");
                self.emit_comma_separated(arguments);
                self.write(")");
            }
            IRNode::NewExpr { callee, arguments } => {
                self.write("new ");
                self.emit_node(callee);
                self.write("(");
                self.emit_comma_separated(arguments);
                self.write(")");
            }
            IRNode::PropertyAccess { object, property } => {
                self.emit_node(object);
                self.write(".");
                self.write(property);
            }
            IRNode::ElementAccess { object, index } => {
                self.emit_node(object);
                self.write("[");
                self.emit_node(index);
                self.write("]");
            }
            IRNode::ConditionalExpr {
                condition,
                when_true,
                when_false,
            } => {
                self.emit_node(condition);
                self.write(" ? ");
                self.emit_node(when_true);
                self.write(" : ");
                self.emit_node(when_false);
            }
            IRNode::Parenthesized(inner) => {
                self.write("(");
                self.emit_node(inner);
                self.write(")");
            }
            IRNode::CommaExpr(nodes) => {
                self.write("(");
                self.emit_comma_separated(nodes);
                self.write(")");
            }
            IRNode::ArrayLiteral(elements) => {
                self.write("[");
                self.emit_comma_separated(elements);
                self.write("]");
            }
            IRNode::ObjectLiteral(properties) => {
                if properties.is_empty() {
                    self.write("{}");
                } else {
                    self.write("{ ");
                    for (i, prop) in properties.iter().enumerate() {
                        if i > 0 {
                            self.write(", ");
                        }
                        self.emit_property(prop);
                    }
                    self.write(" }");
                }
            }
            IRNode::FunctionExpr {
                name,
                parameters,
                body,
            } => {
                self.write("function ");
                if let Some(name) = name {
                    self.write(name);
                }
                self.emit_parameters_and_body(parameters, body);
            }
            IRNode::LogicalOr { left, right } => {
                self.emit_node(left);
                self.write(" || ");
                self.emit_node(right);
            }
            IRNode::LogicalAnd { left, right } => {
                self.emit_node(left);
                self.write(" && ");
                self.emit_node(right);
            }
            IRNode::VarDecl { name, initializer } => {
                self.write("var ");
                self.write(name);
                if let Some(init) = initializer {
                    self.write(" = ");
                    self.emit_node(init);
                }
                self.write(";");
            }
            IRNode::VarDeclList(decls) => {
                self.write("var ");
                self.emit_var_decl_list(decls);
                self.write(";");
            }
            IRNode::ExpressionStatement(expr) => {
                self.emit_node(expr);
                self.write(";");
            }
            IRNode::ReturnStatement(expr) => {
                self.write("return");
                if let Some(expr) = expr {
                    self.write(" ");
                    self.emit_node(expr);
                }
                self.write(";");
            }
            IRNode::IfStatement {
                condition,
                then_branch,
                else_branch,
            } => {
                self.write("if (");
                self.emit_node(condition);
                self.write(") ");
                self.emit_node(then_branch);
                if let Some(else_branch) = else_branch {
                    self.write_line();
                    self.write_indent();
                    self.write("else ");
                    self.emit_node(else_branch);
                }
            }
            IRNode::Block(statements) => {
                self.write("{");
                self.write_line();
                self.increase_indent();
                self.emit_statements(statements);
                self.decrease_indent();
                self.write_indent();
                self.write("}");
            }
            IRNode::EmptyStatement => self.write(";"),
            IRNode::SwitchStatement { expression, cases } => {
                self.write("switch (");
                self.emit_node(expression);
                self.write(") {");
                self.write_line();
                self.increase_indent();
                for case in cases {
                    self.emit_switch_case(case);
                }
                self.decrease_indent();
                self.write_indent();
                self.write("}");
            }
            IRNode::ForStatement {
                initializer,
                condition,
                incrementor,
                body,
            } => {
                self.write("for (");
                if let Some(init) = initializer {
                    self.emit_for_initializer(init);
                }
                self.write(";");
                if let Some(condition) = condition {
                    self.write(" ");
                    self.emit_node(condition);
                }
                self.write(";");
                if let Some(incrementor) = incrementor {
                    self.write(" ");
                    self.emit_node(incrementor);
                }
                self.write(") ");
                self.emit_node(body);
            }
            IRNode::ForInStatement {
                initializer,
                expression,
                body,
            } => {
                self.write("for (");
                self.emit_for_initializer(initializer);
                self.write(" in ");
                self.emit_node(expression);
                self.write(") ");
                self.emit_node(body);
            }
            IRNode::WhileStatement { condition, body } => {
                self.write("while (");
                self.emit_node(condition);
                self.write(") ");
                self.emit_node(body);
            }
            IRNode::DoWhileStatement { body, condition } => {
                self.write("do ");
                self.emit_node(body);
                self.write(" while (");
                self.emit_node(condition);
                self.write(");");
            }
            IRNode::WithStatement { expression, body } => {
                self.write("with (");
                self.emit_node(expression);
                self.write(") ");
                self.emit_node(body);
            }
            IRNode::TryStatement {
                try_block,
                catch_clause,
                finally_block,
            } => {
                self.write("try ");
                self.emit_node(try_block);
                if let Some(catch_clause) = catch_clause {
                    self.emit_catch_clause(catch_clause);
                }
                if let Some(finally_block) = finally_block {
                    self.write_line();
                    self.write_indent();
                    self.write("finally ");
                    self.emit_node(finally_block);
                }
            }
            IRNode::ThrowStatement(expr) => {
                self.write("throw ");
                self.emit_node(expr);
                self.write(";");
            }
            IRNode::BreakStatement(label) => {
                self.write("break");
                if let Some(label) = label {
                    self.write(" ");
                    self.write(label);
                }
                self.write(";");
            }
            IRNode::ContinueStatement(label) => {
                self.write("continue");
                if let Some(label) = label {
                    self.write(" ");
                    self.write(label);
                }
                self.write(";");
            }
            IRNode::LabeledStatement { label, statement } => {
                self.write(label);
                self.write(": ");
                self.emit_node(statement);
            }
            IRNode::FunctionDecl {
                name,
                parameters,
                body,
            } => {
                self.write("function ");
                self.write(name);
                self.emit_parameters_and_body(parameters, body);
            }
            IRNode::GeneratorBody {
                state_param,
                dispatch,
                cases,
            } => self.emit_generator_body(state_param, *dispatch, cases),
            IRNode::GeneratorOp {
                opcode,
                value,
                comment,
            } => {
                self.write("[");
                let _ = write!(self.output, "{opcode}");
                if let Some(comment) = comment {
                    let _ = write!(self.output, " /*{comment}*/");
                }
                if let Some(value) = value {
                    self.write(", ");
                    self.emit_node(value);
                }
                self.write("]");
            }
            IRNode::GeneratorSent => {
                let state = self.state_name().to_string();
                self.write(&state);
                self.write(".sent()");
            }
            IRNode::GeneratorLabel => {
                let state = self.state_name().to_string();
                self.write(&state);
                self.write(".label");
            }
            IRNode::GeneratorLabelRef(label) => {
                unreachable!("label reference {label} survived state machine resolution")
            }
            IRNode::GeneratorTrysPush { labels } => {
                let state = self.state_name().to_string();
                self.write(&state);
                self.write(".trys.push([");
                self.emit_comma_separated(labels);
                self.write("]);");
            }
        }
    }

    fn emit_generator_body(&mut self, state_param: &str, dispatch: bool, cases: &[IRGeneratorCase]) {
        self.state_names.push(state_param.to_string());
        self.write("return __generator(this, function (");
        self.write(state_param);
        self.write(") {");
        if !dispatch {
            // Single resume point: no label dispatch needed.
            let statements: &[IRNode] = cases.first().map_or(&[], |c| c.statements.as_slice());
            if statements.len() <= 1 {
                if let Some(stmt) = statements.first() {
                    self.write(" ");
                    self.emit_node(stmt);
                    self.write(" ");
                } else {
                    self.write(" ");
                }
                self.write("});");
            } else {
                self.write_line();
                self.increase_indent();
                self.emit_statements(statements);
                self.decrease_indent();
                self.write_indent();
                self.write("});");
            }
        } else {
            self.write_line();
            self.increase_indent();
            self.write_indent();
            self.write("switch (");
            self.write(&self.state_name().to_string());
            self.write(".label) {");
            self.write_line();
            self.increase_indent();
            for case in cases {
                self.emit_generator_case(case);
            }
            self.decrease_indent();
            self.write_indent();
            self.write("}");
            self.write_line();
            self.decrease_indent();
            self.write_indent();
            self.write("});");
        }
        self.state_names.pop();
    }

    fn emit_generator_case(&mut self, case: &IRGeneratorCase) {
        self.write_indent();
        let _ = write!(self.output, "case {}:", case.label);
        if case.statements.len() == 1 {
            self.write(" ");
            self.emit_node(&case.statements[0]);
            self.write_line();
        } else {
            self.write_line();
            self.increase_indent();
            self.emit_statements(&case.statements);
            self.decrease_indent();
        }
    }

    fn emit_catch_clause(&mut self, clause: &IRCatchClause) {
        self.write_line();
        self.write_indent();
        match &clause.param {
            Some(param) => {
                self.write("catch (");
                self.write(param);
                self.write(") {");
            }
            None => self.write("catch {"),
        }
        self.write_line();
        self.increase_indent();
        self.emit_statements(&clause.body);
        self.decrease_indent();
        self.write_indent();
        self.write("}");
    }

    fn emit_parameters_and_body(&mut self, parameters: &[String], body: &[IRNode]) {
        self.write("(");
        for (i, param) in parameters.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(param);
        }
        self.write(") {");
        self.write_line();
        self.increase_indent();
        self.emit_statements(body);
        self.decrease_indent();
        self.write_indent();
        self.write("}");
    }

    /// `for`/`for-in` heads print declaration lists without the trailing `;`.
    fn emit_for_initializer(&mut self, initializer: &IRNode) {
        match initializer {
            IRNode::VarDeclList(decls) => {
                self.write("var ");
                self.emit_var_decl_list(decls);
            }
            IRNode::VarDecl { name, initializer } => {
                self.write("var ");
                self.write(name);
                if let Some(init) = initializer {
                    self.write(" = ");
                    self.emit_node(init);
                }
            }
            other => self.emit_node(other),
        }
    }

    fn emit_var_decl_list(&mut self, decls: &[IRNode]) {
        for (i, decl) in decls.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            match decl {
                IRNode::VarDecl { name, initializer } => {
                    self.write(name);
                    if let Some(init) = initializer {
                        self.write(" = ");
                        self.emit_node(init);
                    }
                }
                other => self.emit_node(other),
            }
        }
    }

    pub fn emit_statements(&mut self, statements: &[IRNode]) {
        for stmt in statements {
            self.write_indent();
            self.emit_node(stmt);
            self.write_line();
        }
    }

    fn emit_comma_separated(&mut self, nodes: &[IRNode]) {
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_node(node);
        }
    }

    fn emit_property(&mut self, prop: &IRProperty) {
        match &prop.key {
            IRPropertyKey::Identifier(name) => self.write(name),
            IRPropertyKey::StringLiteral(s) => {
                self.write("\"");
                self.write_escaped(s);
                self.write("\"");
            }
            IRPropertyKey::NumericLiteral(n) => self.write(n),
            IRPropertyKey::Computed(expr) => {
                self.write("[");
                self.emit_node(expr);
                self.write("]");
            }
        }
        self.write(": ");
        self.emit_node(&prop.value);
    }

    fn emit_switch_case(&mut self, case: &IRSwitchCase) {
        self.write_indent();
        if let Some(test) = &case.test {
            self.write("case ");
            self.emit_node(test);
            self.write(":");
        } else {
            self.write("default:");
        }
        self.write_line();

        self.increase_indent();
        self.emit_statements(&case.statements);
        self.decrease_indent();
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn write_escaped(&mut self, s: &str) {
        for c in s.chars() {
            match c {
                '"' => self.output.push_str("\\\""),
                '\\' => self.output.push_str("\\\\"),
                '\n' => self.output.push_str("\\n"),
                '\r' => self.output.push_str("\\r"),
                '\t' => self.output.push_str("\\t"),
                '\0' => self.output.push_str("\\0"),
                c if (c as u32) < 0x20 || c == '\x7F' => {
                    let _ = write!(self.output, "\\u{:04X}", c as u32);
                }
                _ => self.output.push(c),
            }
        }
    }

    fn write_line(&mut self) {
        self.output.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push_str(self.indent_str);
        }
    }

    const fn increase_indent(&mut self) {
        self.indent_level += 1;
    }

    const fn decrease_indent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }
}
