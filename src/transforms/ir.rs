//! Lowered IR for the generator transform.
//!
//! The transform produces a tree-structured IR instead of strings. IR nodes
//! represent the ES5 JavaScript constructs that the printer can emit.
//!
//! # Architecture
//!
//! The transform analyzes AST nodes and produces IR trees. The printer then
//! walks these IR trees and emits JavaScript strings.
//!
//! Benefits:
//! - Clean separation between transform logic and string emission
//! - IR is testable independently
//! - Printer can apply formatting consistently
//!
//! The generator-specific variants (`GeneratorBody`, `GeneratorOp`,
//! `GeneratorSent`, `GeneratorLabel`, `GeneratorLabelRef`,
//! `GeneratorTrysPush`) model the `__generator` runtime protocol directly so
//! the state machine builder does not have to spell out the tuples and the
//! `_a.label` / `_a.sent()` plumbing by hand.

/// Intermediate Representation node for transformed JavaScript
#[derive(Debug, Clone)]
pub enum IRNode {
    // =========================================================================
    // Literals
    // =========================================================================
    /// Numeric literal: `42`, `3.14`
    NumericLiteral(String),

    /// String literal: `"hello"`, `'world'`
    StringLiteral(String),

    /// Boolean literal: `true`, `false`
    BooleanLiteral(bool),

    /// Null literal: `null`
    NullLiteral,

    /// Undefined: `void 0`
    Undefined,

    /// Elided array element: `[1, , 3]`
    OmittedExpression,

    // =========================================================================
    // Identifiers
    // =========================================================================
    /// Identifier: `foo`, `_bar`
    Identifier(String),

    /// This keyword
    This,

    // =========================================================================
    // Expressions
    // =========================================================================
    /// Binary expression: `left op right`
    BinaryExpr {
        left: Box<IRNode>,
        operator: String,
        right: Box<IRNode>,
    },

    /// Unary prefix expression: `!x`, `-x`, `++x`
    PrefixUnaryExpr {
        operator: String,
        operand: Box<IRNode>,
    },

    /// Unary postfix expression: `x++`, `x--`
    PostfixUnaryExpr {
        operand: Box<IRNode>,
        operator: String,
    },

    /// Call expression: `callee(args)`
    CallExpr {
        callee: Box<IRNode>,
        arguments: Vec<IRNode>,
    },

    /// New expression: `new Callee(args)`
    NewExpr {
        callee: Box<IRNode>,
        arguments: Vec<IRNode>,
    },

    /// Property access: `object.property`
    PropertyAccess {
        object: Box<IRNode>,
        property: String,
    },

    /// Element access: `object[index]`
    ElementAccess {
        object: Box<IRNode>,
        index: Box<IRNode>,
    },

    /// Conditional expression: `cond ? then : else`
    ConditionalExpr {
        condition: Box<IRNode>,
        when_true: Box<IRNode>,
        when_false: Box<IRNode>,
    },

    /// Parenthesized expression: `(expr)`
    Parenthesized(Box<IRNode>),

    /// Comma expression: `(a, b, c)`
    CommaExpr(Vec<IRNode>),

    /// Array literal: `[a, b, c]`
    ArrayLiteral(Vec<IRNode>),

    /// Object literal: `{ key: value, ... }`
    ObjectLiteral(Vec<IRProperty>),

    /// Function expression: `function name(params) { body }`
    FunctionExpr {
        name: Option<String>,
        parameters: Vec<String>,
        body: Vec<IRNode>,
    },

    /// Logical OR: `left || right`
    LogicalOr {
        left: Box<IRNode>,
        right: Box<IRNode>,
    },

    /// Logical AND: `left && right`
    LogicalAnd {
        left: Box<IRNode>,
        right: Box<IRNode>,
    },

    // =========================================================================
    // Statements
    // =========================================================================
    /// Variable declaration: `var x = value;`
    VarDecl {
        name: String,
        initializer: Option<Box<IRNode>>,
    },

    /// Multiple variable declarations: `var a = 1, b = 2;`
    VarDeclList(Vec<IRNode>),

    /// Expression statement: `expr;`
    ExpressionStatement(Box<IRNode>),

    /// Return statement: `return expr;`
    ReturnStatement(Option<Box<IRNode>>),

    /// If statement: `if (cond) { then } else { else }`
    IfStatement {
        condition: Box<IRNode>,
        then_branch: Box<IRNode>,
        else_branch: Option<Box<IRNode>>,
    },

    /// Block statement: `{ statements }`
    Block(Vec<IRNode>),

    /// Empty statement: `;`
    EmptyStatement,

    /// Switch statement
    SwitchStatement {
        expression: Box<IRNode>,
        cases: Vec<IRSwitchCase>,
    },

    /// For statement: `for (init; cond; incr) { body }`
    ForStatement {
        initializer: Option<Box<IRNode>>,
        condition: Option<Box<IRNode>>,
        incrementor: Option<Box<IRNode>>,
        body: Box<IRNode>,
    },

    /// For-in statement: `for (key in expr) { body }`
    ForInStatement {
        initializer: Box<IRNode>,
        expression: Box<IRNode>,
        body: Box<IRNode>,
    },

    /// While statement: `while (cond) { body }`
    WhileStatement {
        condition: Box<IRNode>,
        body: Box<IRNode>,
    },

    /// Do-while statement: `do { body } while (cond)`
    DoWhileStatement {
        body: Box<IRNode>,
        condition: Box<IRNode>,
    },

    /// With statement: `with (expr) { body }`
    WithStatement {
        expression: Box<IRNode>,
        body: Box<IRNode>,
    },

    /// Try statement: `try { block } catch (e) { handler } finally { finalizer }`
    TryStatement {
        try_block: Box<IRNode>,
        catch_clause: Option<IRCatchClause>,
        finally_block: Option<Box<IRNode>>,
    },

    /// Throw statement: `throw expr;`
    ThrowStatement(Box<IRNode>),

    /// Break statement: `break;` or `break label;`
    BreakStatement(Option<String>),

    /// Continue statement: `continue;` or `continue label;`
    ContinueStatement(Option<String>),

    /// Labeled statement: `label: stmt`
    LabeledStatement {
        label: String,
        statement: Box<IRNode>,
    },

    // =========================================================================
    // Declarations
    // =========================================================================
    /// Function declaration: `function name(params) { body }`
    FunctionDecl {
        name: String,
        parameters: Vec<String>,
        body: Vec<IRNode>,
    },

    // =========================================================================
    // Generator State Machine Specific
    // =========================================================================
    /// `return __generator(this, function (_a) { ... });`
    ///
    /// With `dispatch` set, the inner body is a `switch (_a.label)` over
    /// `cases`; otherwise the single case's statements are emitted inline.
    GeneratorBody {
        /// Name of the state parameter (`_a` in most output).
        state_param: String,
        /// Whether the body dispatches on `state.label`.
        dispatch: bool,
        /// State machine cases, one per resume point.
        cases: Vec<IRGeneratorCase>,
    },

    /// Protocol instruction tuple: `[opcode, value]`, e.g. `[4 /*yield*/, x]`
    GeneratorOp {
        opcode: u32,
        value: Option<Box<IRNode>>,
        comment: Option<&'static str>,
    },

    /// `_a.sent()` - the value delivered at the previous resume point
    GeneratorSent,

    /// `_a.label` - the resume label property
    GeneratorLabel,

    /// Placeholder for a case label number that is not known until the state
    /// machine has been fully built. Resolved (replaced by a
    /// `NumericLiteral`) in a final pass over the built cases.
    GeneratorLabelRef(u32),

    /// `_a.trys.push([start, catch, finally, end]);` with elided entries
    /// printed as holes: `_a.trys.push([0, 2, , 3]);`
    GeneratorTrysPush { labels: Vec<IRNode> },
}

/// Property in an object literal
#[derive(Debug, Clone)]
pub struct IRProperty {
    pub key: IRPropertyKey,
    pub value: IRNode,
}

/// Object property key
#[derive(Debug, Clone)]
pub enum IRPropertyKey {
    Identifier(String),
    StringLiteral(String),
    NumericLiteral(String),
    /// Computed key: `[expr]: value`
    Computed(Box<IRNode>),
}

/// Switch case
#[derive(Debug, Clone)]
pub struct IRSwitchCase {
    pub test: Option<IRNode>, // None for default case
    pub statements: Vec<IRNode>,
}

/// Catch clause
#[derive(Debug, Clone)]
pub struct IRCatchClause {
    pub param: Option<String>,
    pub body: Vec<IRNode>,
}

/// Generator case: one clause of the `switch (_a.label)` dispatch
#[derive(Debug, Clone)]
pub struct IRGeneratorCase {
    pub label: u32,
    pub statements: Vec<IRNode>,
}

// =========================================================================
// Builder helpers for IR construction
// =========================================================================

impl IRNode {
    /// Create an identifier node
    pub fn id(name: impl Into<String>) -> Self {
        IRNode::Identifier(name.into())
    }

    /// Create a string literal
    pub fn string(s: impl Into<String>) -> Self {
        IRNode::StringLiteral(s.into())
    }

    /// Create a numeric literal
    pub fn number(n: impl Into<String>) -> Self {
        IRNode::NumericLiteral(n.into())
    }

    /// Create a call expression
    pub fn call(callee: IRNode, args: Vec<IRNode>) -> Self {
        IRNode::CallExpr {
            callee: Box::new(callee),
            arguments: args,
        }
    }

    /// Create a property access
    pub fn prop(object: IRNode, property: impl Into<String>) -> Self {
        IRNode::PropertyAccess {
            object: Box::new(object),
            property: property.into(),
        }
    }

    /// Create an element access
    pub fn elem(object: IRNode, index: IRNode) -> Self {
        IRNode::ElementAccess {
            object: Box::new(object),
            index: Box::new(index),
        }
    }

    /// Create a binary expression
    pub fn binary(left: IRNode, op: impl Into<String>, right: IRNode) -> Self {
        IRNode::BinaryExpr {
            left: Box::new(left),
            operator: op.into(),
            right: Box::new(right),
        }
    }

    /// Create an assignment expression
    pub fn assign(target: IRNode, value: IRNode) -> Self {
        IRNode::BinaryExpr {
            left: Box::new(target),
            operator: "=".to_string(),
            right: Box::new(value),
        }
    }

    /// Create a var declaration
    pub fn var_decl(name: impl Into<String>, init: Option<IRNode>) -> Self {
        IRNode::VarDecl {
            name: name.into(),
            initializer: init.map(Box::new),
        }
    }

    /// Create a return statement
    pub fn ret(expr: Option<IRNode>) -> Self {
        IRNode::ReturnStatement(expr.map(Box::new))
    }

    /// Create a function expression
    pub fn func_expr(name: Option<String>, params: Vec<String>, body: Vec<IRNode>) -> Self {
        IRNode::FunctionExpr {
            name,
            parameters: params,
            body,
        }
    }

    /// Create a function declaration
    pub fn func_decl(name: impl Into<String>, params: Vec<String>, body: Vec<IRNode>) -> Self {
        IRNode::FunctionDecl {
            name: name.into(),
            parameters: params,
            body,
        }
    }

    /// Create `this` reference
    pub fn this() -> Self {
        IRNode::This
    }

    /// Create `void 0`
    pub fn void_0() -> Self {
        IRNode::Undefined
    }

    /// Wrap in parentheses
    pub fn paren(self) -> Self {
        IRNode::Parenthesized(Box::new(self))
    }

    /// Create a block
    pub fn block(stmts: Vec<IRNode>) -> Self {
        IRNode::Block(stmts)
    }

    /// Create an expression statement
    pub fn expr_stmt(expr: IRNode) -> Self {
        IRNode::ExpressionStatement(Box::new(expr))
    }

    /// Create an object literal
    pub fn object(props: Vec<IRProperty>) -> Self {
        IRNode::ObjectLiteral(props)
    }

    /// Create an array literal
    pub fn array(elements: Vec<IRNode>) -> Self {
        IRNode::ArrayLiteral(elements)
    }

    /// Create a logical OR expression: `left || right`
    pub fn logical_or(left: IRNode, right: IRNode) -> Self {
        IRNode::LogicalOr {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a logical AND expression: `left && right`
    pub fn logical_and(left: IRNode, right: IRNode) -> Self {
        IRNode::LogicalAnd {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a new expression: `new Constructor(args)`
    pub fn new_expr(callee: IRNode, args: Vec<IRNode>) -> Self {
        IRNode::NewExpr {
            callee: Box::new(callee),
            arguments: args,
        }
    }

    /// Create a protocol instruction tuple
    pub fn generator_op(opcode: u32, value: Option<IRNode>, comment: Option<&'static str>) -> Self {
        IRNode::GeneratorOp {
            opcode,
            value: value.map(Box::new),
            comment,
        }
    }

    /// Fold expressions into a single expression: one element is returned
    /// as-is, several become a comma expression.
    pub fn inline_expressions(mut exprs: Vec<IRNode>) -> Self {
        if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            IRNode::CommaExpr(exprs)
        }
    }

    /// Pre-order mutable walk over this node and every descendant.
    ///
    /// The callback may replace the node wholesale; children of the
    /// replacement are then visited.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut IRNode)) {
        f(self);
        match self {
            IRNode::NumericLiteral(_)
            | IRNode::StringLiteral(_)
            | IRNode::BooleanLiteral(_)
            | IRNode::NullLiteral
            | IRNode::Undefined
            | IRNode::OmittedExpression
            | IRNode::Identifier(_)
            | IRNode::This
            | IRNode::EmptyStatement
            | IRNode::BreakStatement(_)
            | IRNode::ContinueStatement(_)
            | IRNode::GeneratorSent
            | IRNode::GeneratorLabel
            | IRNode::GeneratorLabelRef(_) => {}
            IRNode::BinaryExpr { left, right, .. }
            | IRNode::LogicalOr { left, right }
            | IRNode::LogicalAnd { left, right } => {
                left.walk_mut(f);
                right.walk_mut(f);
            }
            IRNode::PrefixUnaryExpr { operand, .. } | IRNode::PostfixUnaryExpr { operand, .. } => {
                operand.walk_mut(f)
            }
            IRNode::CallExpr { callee, arguments } | IRNode::NewExpr { callee, arguments } => {
                callee.walk_mut(f);
                for argument in arguments {
                    argument.walk_mut(f);
                }
            }
            IRNode::PropertyAccess { object, .. } => object.walk_mut(f),
            IRNode::ElementAccess { object, index } => {
                object.walk_mut(f);
                index.walk_mut(f);
            }
            IRNode::ConditionalExpr {
                condition,
                when_true,
                when_false,
            } => {
                condition.walk_mut(f);
                when_true.walk_mut(f);
                when_false.walk_mut(f);
            }
            IRNode::Parenthesized(inner)
            | IRNode::ExpressionStatement(inner)
            | IRNode::ThrowStatement(inner) => inner.walk_mut(f),
            IRNode::CommaExpr(nodes)
            | IRNode::ArrayLiteral(nodes)
            | IRNode::Block(nodes)
            | IRNode::VarDeclList(nodes) => {
                for node in nodes {
                    node.walk_mut(f);
                }
            }
            IRNode::ObjectLiteral(properties) => {
                for property in properties {
                    if let IRPropertyKey::Computed(key) = &mut property.key {
                        key.walk_mut(f);
                    }
                    property.value.walk_mut(f);
                }
            }
            IRNode::FunctionExpr { body, .. } | IRNode::FunctionDecl { body, .. } => {
                for statement in body {
                    statement.walk_mut(f);
                }
            }
            IRNode::VarDecl { initializer, .. } => {
                if let Some(initializer) = initializer {
                    initializer.walk_mut(f);
                }
            }
            IRNode::ReturnStatement(expr) => {
                if let Some(expr) = expr {
                    expr.walk_mut(f);
                }
            }
            IRNode::IfStatement {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.walk_mut(f);
                then_branch.walk_mut(f);
                if let Some(else_branch) = else_branch {
                    else_branch.walk_mut(f);
                }
            }
            IRNode::SwitchStatement { expression, cases } => {
                expression.walk_mut(f);
                for case in cases {
                    if let Some(test) = &mut case.test {
                        test.walk_mut(f);
                    }
                    for statement in &mut case.statements {
                        statement.walk_mut(f);
                    }
                }
            }
            IRNode::ForStatement {
                initializer,
                condition,
                incrementor,
                body,
            } => {
                if let Some(initializer) = initializer {
                    initializer.walk_mut(f);
                }
                if let Some(condition) = condition {
                    condition.walk_mut(f);
                }
                if let Some(incrementor) = incrementor {
                    incrementor.walk_mut(f);
                }
                body.walk_mut(f);
            }
            IRNode::ForInStatement {
                initializer,
                expression,
                body,
            } => {
                initializer.walk_mut(f);
                expression.walk_mut(f);
                body.walk_mut(f);
            }
            IRNode::WhileStatement { condition, body }
            | IRNode::DoWhileStatement { body, condition } => {
                condition.walk_mut(f);
                body.walk_mut(f);
            }
            IRNode::WithStatement { expression, body } => {
                expression.walk_mut(f);
                body.walk_mut(f);
            }
            IRNode::TryStatement {
                try_block,
                catch_clause,
                finally_block,
            } => {
                try_block.walk_mut(f);
                if let Some(catch_clause) = catch_clause {
                    for statement in &mut catch_clause.body {
                        statement.walk_mut(f);
                    }
                }
                if let Some(finally_block) = finally_block {
                    finally_block.walk_mut(f);
                }
            }
            IRNode::LabeledStatement { statement, .. } => statement.walk_mut(f),
            IRNode::GeneratorBody { cases, .. } => {
                for case in cases {
                    for statement in &mut case.statements {
                        statement.walk_mut(f);
                    }
                }
            }
            IRNode::GeneratorOp { value, .. } => {
                if let Some(value) = value {
                    value.walk_mut(f);
                }
            }
            IRNode::GeneratorTrysPush { labels } => {
                for label in labels {
                    label.walk_mut(f);
                }
            }
        }
    }
}
