//! Arena-based source AST for the generator lowering pass.
//!
//! The tree is the ES5-and-down statement/expression subset plus `yield` and
//! generator functions: everything later in the downlevel pipeline than this
//! pass has already run, so there are no destructuring patterns, arrow
//! functions, or template literals here. Nodes live in a flat `Vec` and refer
//! to each other by [`NodeIndex`], matching how the rest of the pipeline keeps
//! trees compact and `Copy`-indexable.

pub mod facts;
pub mod flags;

pub use flags::NodeFlags;

/// Index of a node in an [`AstArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(pub u32);

/// A single allocated node: its shape plus cached facts.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub flags: NodeFlags,
}

/// Binary operators, including assignment and sequence forms.
///
/// Keeping assignment and `,` in the same enum mirrors how the parser models
/// a single BinaryExpression production; the lowering pass dispatches on
/// [`is_assignment`](BinaryOp::is_assignment) / [`is_logical`](BinaryOp::is_logical)
/// to pick a flattening strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
    EqualsEquals,
    EqualsEqualsEquals,
    NotEquals,
    NotEqualsEquals,
    Ampersand,
    Bar,
    Caret,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    In,
    InstanceOf,
    AmpersandAmpersand,
    BarBar,
    Comma,
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    RemainderAssign,
}

impl BinaryOp {
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::AddAssign
                | BinaryOp::SubtractAssign
                | BinaryOp::MultiplyAssign
                | BinaryOp::DivideAssign
                | BinaryOp::RemainderAssign
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::AmpersandAmpersand | BinaryOp::BarBar)
    }

    /// For compound assignments, the underlying non-assigning operator.
    pub fn compound_base(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::AddAssign => Some(BinaryOp::Add),
            BinaryOp::SubtractAssign => Some(BinaryOp::Subtract),
            BinaryOp::MultiplyAssign => Some(BinaryOp::Multiply),
            BinaryOp::DivideAssign => Some(BinaryOp::Divide),
            BinaryOp::RemainderAssign => Some(BinaryOp::Remainder),
            _ => None,
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Remainder => "%",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanEquals => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanEquals => ">=",
            BinaryOp::EqualsEquals => "==",
            BinaryOp::EqualsEqualsEquals => "===",
            BinaryOp::NotEquals => "!=",
            BinaryOp::NotEqualsEquals => "!==",
            BinaryOp::Ampersand => "&",
            BinaryOp::Bar => "|",
            BinaryOp::Caret => "^",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::UnsignedRightShift => ">>>",
            BinaryOp::In => "in",
            BinaryOp::InstanceOf => "instanceof",
            BinaryOp::AmpersandAmpersand => "&&",
            BinaryOp::BarBar => "||",
            BinaryOp::Comma => ",",
            BinaryOp::Assign => "=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubtractAssign => "-=",
            BinaryOp::MultiplyAssign => "*=",
            BinaryOp::DivideAssign => "/=",
            BinaryOp::RemainderAssign => "%=",
        }
    }
}

/// Prefix and postfix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    Tilde,
    TypeOf,
    Void,
    Delete,
    PlusPlus,
    MinusMinus,
}

impl UnaryOp {
    pub fn text(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::Tilde => "~",
            UnaryOp::TypeOf => "typeof ",
            UnaryOp::Void => "void ",
            UnaryOp::Delete => "delete ",
            UnaryOp::PlusPlus => "++",
            UnaryOp::MinusMinus => "--",
        }
    }
}

/// Property name of an object literal member.
#[derive(Debug, Clone)]
pub enum PropName {
    Ident(String),
    StringLit(String),
    NumberLit(String),
    Computed(NodeIndex),
}

/// The shape of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    // Expressions
    Ident(String),
    NumberLit(String),
    StringLit(String),
    BoolLit(bool),
    NullLit,
    This,
    /// Elided array element (`[1, , 3]`).
    OmittedExpr,
    Paren(NodeIndex),
    PrefixUnary {
        op: UnaryOp,
        operand: NodeIndex,
    },
    PostfixUnary {
        op: UnaryOp,
        operand: NodeIndex,
    },
    Binary {
        op: BinaryOp,
        left: NodeIndex,
        right: NodeIndex,
    },
    Conditional {
        condition: NodeIndex,
        when_true: NodeIndex,
        when_false: NodeIndex,
    },
    Call {
        callee: NodeIndex,
        arguments: Vec<NodeIndex>,
    },
    New {
        callee: NodeIndex,
        arguments: Vec<NodeIndex>,
    },
    PropertyAccess {
        object: NodeIndex,
        name: String,
    },
    ElementAccess {
        object: NodeIndex,
        index: NodeIndex,
    },
    ArrayLit {
        elements: Vec<NodeIndex>,
    },
    ObjectLit {
        properties: Vec<NodeIndex>,
    },
    PropertyAssignment {
        name: PropName,
        initializer: NodeIndex,
    },
    /// `elements` flattens nested comma expressions produced by earlier passes.
    CommaList {
        elements: Vec<NodeIndex>,
    },
    Yield {
        expression: Option<NodeIndex>,
        delegate: bool,
    },
    FunctionExpr {
        name: Option<String>,
        parameters: Vec<String>,
        body: NodeIndex,
        is_generator: bool,
    },

    // Statements
    Block {
        statements: Vec<NodeIndex>,
    },
    VariableStatement {
        declarations: Vec<NodeIndex>,
    },
    VariableDeclaration {
        name: NodeIndex,
        initializer: Option<NodeIndex>,
    },
    ExpressionStatement(NodeIndex),
    EmptyStatement,
    If {
        condition: NodeIndex,
        then_statement: NodeIndex,
        else_statement: Option<NodeIndex>,
    },
    Do {
        statement: NodeIndex,
        condition: NodeIndex,
    },
    While {
        condition: NodeIndex,
        statement: NodeIndex,
    },
    For {
        /// Either a `VariableStatement` or an expression node.
        initializer: Option<NodeIndex>,
        condition: Option<NodeIndex>,
        incrementor: Option<NodeIndex>,
        statement: NodeIndex,
    },
    ForIn {
        /// Either a single-declaration `VariableStatement` or a reference.
        initializer: NodeIndex,
        expression: NodeIndex,
        statement: NodeIndex,
    },
    Continue {
        label: Option<String>,
    },
    Break {
        label: Option<String>,
    },
    Return {
        expression: Option<NodeIndex>,
    },
    With {
        expression: NodeIndex,
        statement: NodeIndex,
    },
    Switch {
        expression: NodeIndex,
        clauses: Vec<NodeIndex>,
    },
    /// `test: None` marks the `default` clause.
    CaseClause {
        test: Option<NodeIndex>,
        statements: Vec<NodeIndex>,
    },
    Labeled {
        label: String,
        statement: NodeIndex,
    },
    Throw {
        expression: NodeIndex,
    },
    Try {
        try_block: NodeIndex,
        catch_clause: Option<NodeIndex>,
        finally_block: Option<NodeIndex>,
    },
    CatchClause {
        /// `None` for ES2019-style binding-less catch.
        variable: Option<NodeIndex>,
        block: NodeIndex,
    },
    FunctionDecl {
        name: String,
        parameters: Vec<String>,
        body: NodeIndex,
        is_generator: bool,
    },
}

/// Flat node storage. All tree construction goes through the factory
/// methods so flags start out zeroed.
#[derive(Debug, Default)]
pub struct AstArena {
    nodes: Vec<Node>,
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: NodeKind) -> NodeIndex {
        let index = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            flags: NodeFlags::empty(),
        });
        index
    }

    pub fn get(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.0 as usize]
    }

    pub fn kind(&self, index: NodeIndex) -> &NodeKind {
        &self.nodes[index.0 as usize].kind
    }

    pub fn flags(&self, index: NodeIndex) -> NodeFlags {
        self.nodes[index.0 as usize].flags
    }

    pub fn add_flags(&mut self, index: NodeIndex, flags: NodeFlags) {
        self.nodes[index.0 as usize].flags |= flags;
    }

    pub fn contains_yield(&self, index: NodeIndex) -> bool {
        self.flags(index).contains(NodeFlags::CONTAINS_YIELD)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Identifier text, or `None` when the node is not an identifier.
    pub fn ident_text(&self, index: NodeIndex) -> Option<&str> {
        match self.kind(index) {
            NodeKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

// Factories. These keep test and front-end construction terse; every shape
// above is reachable through `add` regardless.
impl AstArena {
    pub fn ident(&mut self, name: &str) -> NodeIndex {
        self.add(NodeKind::Ident(name.to_string()))
    }

    pub fn synthesized_ident(&mut self, name: &str) -> NodeIndex {
        let index = self.ident(name);
        self.add_flags(index, NodeFlags::SYNTHESIZED);
        index
    }

    pub fn number(&mut self, text: &str) -> NodeIndex {
        self.add(NodeKind::NumberLit(text.to_string()))
    }

    pub fn string(&mut self, text: &str) -> NodeIndex {
        self.add(NodeKind::StringLit(text.to_string()))
    }

    pub fn bool_lit(&mut self, value: bool) -> NodeIndex {
        self.add(NodeKind::BoolLit(value))
    }

    pub fn null_lit(&mut self) -> NodeIndex {
        self.add(NodeKind::NullLit)
    }

    pub fn this(&mut self) -> NodeIndex {
        self.add(NodeKind::This)
    }

    pub fn paren(&mut self, expression: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Paren(expression))
    }

    pub fn binary(&mut self, op: BinaryOp, left: NodeIndex, right: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Binary { op, left, right })
    }

    pub fn assign(&mut self, left: NodeIndex, right: NodeIndex) -> NodeIndex {
        self.binary(BinaryOp::Assign, left, right)
    }

    pub fn prefix(&mut self, op: UnaryOp, operand: NodeIndex) -> NodeIndex {
        self.add(NodeKind::PrefixUnary { op, operand })
    }

    pub fn postfix(&mut self, op: UnaryOp, operand: NodeIndex) -> NodeIndex {
        self.add(NodeKind::PostfixUnary { op, operand })
    }

    pub fn conditional(
        &mut self,
        condition: NodeIndex,
        when_true: NodeIndex,
        when_false: NodeIndex,
    ) -> NodeIndex {
        self.add(NodeKind::Conditional {
            condition,
            when_true,
            when_false,
        })
    }

    pub fn call(&mut self, callee: NodeIndex, arguments: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::Call { callee, arguments })
    }

    pub fn new_expr(&mut self, callee: NodeIndex, arguments: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::New { callee, arguments })
    }

    pub fn prop(&mut self, object: NodeIndex, name: &str) -> NodeIndex {
        self.add(NodeKind::PropertyAccess {
            object,
            name: name.to_string(),
        })
    }

    pub fn elem(&mut self, object: NodeIndex, index: NodeIndex) -> NodeIndex {
        self.add(NodeKind::ElementAccess { object, index })
    }

    pub fn array(&mut self, elements: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::ArrayLit { elements })
    }

    pub fn object(&mut self, properties: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::ObjectLit { properties })
    }

    pub fn prop_assignment(&mut self, name: PropName, initializer: NodeIndex) -> NodeIndex {
        self.add(NodeKind::PropertyAssignment { name, initializer })
    }

    pub fn yield_expr(&mut self, expression: Option<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::Yield {
            expression,
            delegate: false,
        })
    }

    pub fn yield_star(&mut self, expression: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Yield {
            expression: Some(expression),
            delegate: true,
        })
    }

    pub fn function_expr(
        &mut self,
        name: Option<&str>,
        parameters: &[&str],
        body: NodeIndex,
        is_generator: bool,
    ) -> NodeIndex {
        self.add(NodeKind::FunctionExpr {
            name: name.map(str::to_string),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            body,
            is_generator,
        })
    }

    pub fn function_decl(
        &mut self,
        name: &str,
        parameters: &[&str],
        body: NodeIndex,
        is_generator: bool,
    ) -> NodeIndex {
        self.add(NodeKind::FunctionDecl {
            name: name.to_string(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            body,
            is_generator,
        })
    }

    pub fn block(&mut self, statements: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::Block { statements })
    }

    pub fn expr_stmt(&mut self, expression: NodeIndex) -> NodeIndex {
        self.add(NodeKind::ExpressionStatement(expression))
    }

    pub fn var_decl(&mut self, name: &str, initializer: Option<NodeIndex>) -> NodeIndex {
        let name = self.ident(name);
        self.add(NodeKind::VariableDeclaration { name, initializer })
    }

    /// `var a = x, b, c = y;` from `[("a", Some(x)), ("b", None), ("c", Some(y))]`.
    pub fn var_stmt(&mut self, declarations: &[(&str, Option<NodeIndex>)]) -> NodeIndex {
        let declarations = declarations
            .iter()
            .map(|(name, initializer)| self.var_decl(name, *initializer))
            .collect();
        self.add(NodeKind::VariableStatement { declarations })
    }

    pub fn ret(&mut self, expression: Option<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::Return { expression })
    }

    pub fn if_stmt(
        &mut self,
        condition: NodeIndex,
        then_statement: NodeIndex,
        else_statement: Option<NodeIndex>,
    ) -> NodeIndex {
        self.add(NodeKind::If {
            condition,
            then_statement,
            else_statement,
        })
    }

    pub fn while_stmt(&mut self, condition: NodeIndex, statement: NodeIndex) -> NodeIndex {
        self.add(NodeKind::While {
            condition,
            statement,
        })
    }

    pub fn do_stmt(&mut self, statement: NodeIndex, condition: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Do {
            statement,
            condition,
        })
    }

    pub fn labeled(&mut self, label: &str, statement: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Labeled {
            label: label.to_string(),
            statement,
        })
    }

    pub fn throw_stmt(&mut self, expression: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Throw { expression })
    }

    pub fn try_stmt(
        &mut self,
        try_block: NodeIndex,
        catch_clause: Option<NodeIndex>,
        finally_block: Option<NodeIndex>,
    ) -> NodeIndex {
        self.add(NodeKind::Try {
            try_block,
            catch_clause,
            finally_block,
        })
    }

    pub fn catch_clause(&mut self, variable: &str, block: NodeIndex) -> NodeIndex {
        let variable = self.ident(variable);
        self.add(NodeKind::CatchClause {
            variable: Some(variable),
            block,
        })
    }

    pub fn case_clause(&mut self, test: Option<NodeIndex>, statements: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::CaseClause { test, statements })
    }

    pub fn switch_stmt(&mut self, expression: NodeIndex, clauses: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::Switch { expression, clauses })
    }

    pub fn break_stmt(&mut self, label: Option<&str>) -> NodeIndex {
        self.add(NodeKind::Break {
            label: label.map(str::to_string),
        })
    }

    pub fn continue_stmt(&mut self, label: Option<&str>) -> NodeIndex {
        self.add(NodeKind::Continue {
            label: label.map(str::to_string),
        })
    }

    pub fn with_stmt(&mut self, expression: NodeIndex, statement: NodeIndex) -> NodeIndex {
        self.add(NodeKind::With {
            expression,
            statement,
        })
    }

    pub fn for_stmt(
        &mut self,
        initializer: Option<NodeIndex>,
        condition: Option<NodeIndex>,
        incrementor: Option<NodeIndex>,
        statement: NodeIndex,
    ) -> NodeIndex {
        self.add(NodeKind::For {
            initializer,
            condition,
            incrementor,
            statement,
        })
    }

    pub fn for_in_stmt(
        &mut self,
        initializer: NodeIndex,
        expression: NodeIndex,
        statement: NodeIndex,
    ) -> NodeIndex {
        self.add(NodeKind::ForIn {
            initializer,
            expression,
            statement,
        })
    }
}
