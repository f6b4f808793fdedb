//! Test harness: executes lowered generator bodies against the runtime
//! protocol the emitted code targets.
//!
//! `Driver` is a faithful port of the `__generator` helper's `step`
//! function. Instead of evaluating printed JavaScript it interprets the IR
//! directly, so the protocol nodes (`GeneratorSent`, `GeneratorLabel`,
//! `GeneratorTrysPush`, opcode tuples) stay symbolic and the tests observe
//! exactly what a conforming runtime would.

use std::cell::RefCell;
use std::rc::Rc;

use genlower::transforms::ir::{IRGeneratorCase, IRNode};

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Array(Rc<RefCell<Vec<Value>>>),
    /// Insertion-ordered so `for (k in o)` enumerates deterministically.
    Object(Rc<RefCell<Vec<(String, Value)>>>),
    Host(Rc<HostFn>),
    Iter(Rc<RefCell<IterState>>),
}

pub type HostFn = dyn Fn(Value, &[Value]) -> Result<Value, Thrown>;

/// Iterator state backing `__values`.
pub struct IterState {
    items: Vec<Value>,
    pos: usize,
}

/// A value thrown by evaluated code.
#[derive(Clone)]
pub struct Thrown(pub Value);

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Array(items) => write!(f, "{:?}", items.borrow()),
            Value::Object(_) => write!(f, "[object]"),
            Value::Host(_) => write!(f, "[function]"),
            Value::Iter(_) => write!(f, "[iterator]"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    pub fn num(n: f64) -> Value {
        Value::Num(n)
    }

    pub fn str(s: &str) -> Value {
        Value::Str(s.to_string())
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(entries: Vec<(&str, Value)>) -> Value {
        Value::Object(Rc::new(RefCell::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )))
    }

    fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    fn as_num(&self) -> f64 {
        match self {
            Value::Num(n) => *n,
            Value::Bool(true) => 1.0,
            Value::Bool(false) | Value::Null => 0.0,
            Value::Str(s) => s.parse().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    fn to_display(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Num(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Value::Str(s) => s.clone(),
            _ => "[object]".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

pub struct Env {
    vars: RefCell<Vec<(String, Value)>>,
    pub log: Rc<RefCell<Vec<String>>>,
}

impl Env {
    pub fn new() -> Env {
        let log = Rc::new(RefCell::new(Vec::new()));
        let env = Env {
            vars: RefCell::new(Vec::new()),
            log: Rc::clone(&log),
        };
        let sink = Rc::clone(&log);
        env.set(
            "log",
            Value::Host(Rc::new(move |_this, args: &[Value]| {
                let line = args
                    .iter()
                    .map(Value::to_display)
                    .collect::<Vec<_>>()
                    .join(" ");
                sink.borrow_mut().push(line);
                Ok(Value::Undefined)
            })),
        );
        let values = |_this: Value, args: &[Value]| -> Result<Value, Thrown> {
            let items = match args.first() {
                Some(Value::Array(items)) => items.borrow().clone(),
                Some(other) => {
                    return Err(Thrown(Value::Str(format!(
                        "{other:?} is not iterable"
                    ))));
                }
                None => Vec::new(),
            };
            Ok(Value::Iter(Rc::new(RefCell::new(IterState {
                items,
                pos: 0,
            }))))
        };
        env.set("__values", Value::Host(Rc::new(values)));
        env
    }

    pub fn set(&self, name: &str, value: Value) {
        let mut vars = self.vars.borrow_mut();
        for entry in vars.iter_mut() {
            if entry.0 == name {
                entry.1 = value;
                return;
            }
        }
        vars.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Value {
        self.vars
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Undefined)
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

// ---------------------------------------------------------------------------
// Dissecting lowered output
// ---------------------------------------------------------------------------

pub struct LoweredBody {
    pub hoisted: Vec<String>,
    pub state_param: String,
    pub dispatch: bool,
    pub cases: Vec<IRGeneratorCase>,
}

/// Pull the machine out of a lowered function node: hoisted `var` names,
/// hoisted declarations are ignored, and the trailing `__generator` body.
pub fn dissect(node: &IRNode) -> LoweredBody {
    let body = match node {
        IRNode::FunctionDecl { body, .. } | IRNode::FunctionExpr { body, .. } => body,
        other => panic!("expected a lowered function, got {other:?}"),
    };
    let mut hoisted = Vec::new();
    for statement in body {
        match statement {
            IRNode::VarDeclList(declarations) => {
                for declaration in declarations {
                    if let IRNode::VarDecl { name, .. } = declaration {
                        hoisted.push(name.clone());
                    }
                }
            }
            IRNode::GeneratorBody {
                state_param,
                dispatch,
                cases,
            } => {
                return LoweredBody {
                    hoisted,
                    state_param: state_param.clone(),
                    dispatch: *dispatch,
                    cases: cases.clone(),
                };
            }
            _ => {}
        }
    }
    panic!("lowered function has no generator body")
}

// ---------------------------------------------------------------------------
// Driver: the __generator step protocol
// ---------------------------------------------------------------------------

pub enum Resume {
    Next(Value),
    Throw(Value),
    Return(Value),
}

#[derive(Debug, PartialEq)]
pub enum Event {
    Yield(Value),
    Done(Value),
    Threw(Value),
}

type Op = (u32, Option<Value>);

pub struct Driver {
    body: LoweredBody,
    env: Env,
    label: f64,
    trys: Vec<[Option<f64>; 4]>,
    ops: Vec<Op>,
    sent: Op,
    delegate: Option<Rc<RefCell<IterState>>>,
    alive: bool,
}

enum Flow {
    Normal,
    Break(Option<String>),
    Continue(Option<String>),
    Op(Op),
}

impl Driver {
    pub fn new(lowered: &IRNode, env: Env) -> Driver {
        let body = dissect(lowered);
        for name in &body.hoisted {
            env.set(name, Value::Undefined);
        }
        Driver {
            body,
            env,
            label: 0.0,
            trys: Vec::new(),
            ops: Vec::new(),
            sent: (0, None),
            delegate: None,
            alive: true,
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn next(&mut self, value: Value) -> Event {
        self.resume(Resume::Next(value))
    }

    pub fn throw(&mut self, value: Value) -> Event {
        self.resume(Resume::Throw(value))
    }

    pub fn ret(&mut self, value: Value) -> Event {
        self.resume(Resume::Return(value))
    }

    pub fn resume(&mut self, resume: Resume) -> Event {
        let mut op: Op = match resume {
            Resume::Next(v) => (0, Some(v)),
            Resume::Throw(v) => (1, Some(v)),
            Resume::Return(v) => (2, Some(v)),
        };
        while self.alive {
            match self.step(op.clone()) {
                Ok(StepOutcome::Yielded(value)) => return Event::Yield(value),
                Ok(StepOutcome::Advance(next)) => op = next,
                Err(Thrown(value)) => {
                    op = (6, Some(value));
                    self.delegate = None;
                }
            }
        }
        let value = op.1.unwrap_or(Value::Undefined);
        if op.0 & 5 != 0 {
            Event::Threw(value)
        } else if op.0 != 0 {
            Event::Done(value)
        } else {
            Event::Done(Value::Undefined)
        }
    }

    fn step(&mut self, mut op: Op) -> Result<StepOutcome, Thrown> {
        loop {
            // Delegation: route the resume through the inner iterator first.
            if let Some(delegate) = self.delegate.clone() {
                if op.0 & 2 != 0 || op.0 == 1 {
                    // No return/throw method on the plain array iterator;
                    // the completion flows back into the outer machine.
                    self.delegate = None;
                } else {
                    let mut state = delegate.borrow_mut();
                    if state.pos < state.items.len() {
                        let value = state.items[state.pos].clone();
                        state.pos += 1;
                        return Ok(StepOutcome::Yielded(value));
                    }
                    drop(state);
                    self.delegate = None;
                    // The iterator finished; the machine resumes with its
                    // completion value.
                    op = (op.0 & 2, Some(Value::Undefined));
                }
            }
            match op.0 {
                0 | 1 => {
                    self.sent = op.clone();
                }
                4 => {
                    self.label += 1.0;
                    return Ok(StepOutcome::Yielded(op.1.unwrap_or(Value::Undefined)));
                }
                5 => {
                    self.label += 1.0;
                    let Some(Value::Iter(state)) = op.1 else {
                        return Err(Thrown(Value::str("yield* operand is not an iterator")));
                    };
                    self.delegate = Some(state);
                    op = (0, None);
                    continue;
                }
                7 => {
                    op = self
                        .ops
                        .pop()
                        .unwrap_or_else(|| panic!("endfinally with no pending completion"));
                    self.trys.pop();
                    continue;
                }
                _ => {
                    let region = self.trys.last().copied();
                    let Some(region) = region else {
                        if op.0 == 6 || op.0 == 2 {
                            self.alive = false;
                            return Ok(StepOutcome::Advance(op));
                        }
                        // An unprotected break just moves the label.
                        if op.0 == 3 {
                            self.label = op.1.as_ref().map(Value::as_num).unwrap_or(0.0);
                        }
                        self.sent = op.clone();
                        op = self.run_body()?;
                        continue;
                    };
                    let target = op.1.as_ref().map(Value::as_num);
                    if op.0 == 3
                        && region[0]
                            .zip(region[3])
                            .zip(target)
                            .is_some_and(|((start, end), t)| t > start && t < end)
                    {
                        // Break within the protected region.
                        self.label = target.unwrap_or(0.0);
                    } else if op.0 == 6
                        && region[1].is_some_and(|catch| self.label < catch)
                    {
                        self.label = region[1].unwrap_or(0.0);
                        self.sent = op.clone();
                    } else if region[2].is_some_and(|finally| self.label < finally) {
                        self.label = region[2].unwrap_or(0.0);
                        self.ops.push(op.clone());
                    } else {
                        if region[2].is_some() {
                            self.ops.pop();
                        }
                        self.trys.pop();
                        continue;
                    }
                    op = self.run_body()?;
                    continue;
                }
            }
            op = self.run_body()?;
        }
    }

    /// One call into the machine body: execute from the clause matching the
    /// current label, falling through unterminated clauses, until an opcode
    /// tuple is returned.
    fn run_body(&mut self) -> Result<Op, Thrown> {
        if !self.body.dispatch {
            let statements = self.body.cases[0].statements.clone();
            match self.exec_statements(&statements)? {
                Flow::Op(op) => return Ok(op),
                _ => panic!("machine body fell off the end"),
            }
        }
        let start = self
            .body
            .cases
            .iter()
            .position(|case| f64::from(case.label) == self.label)
            .unwrap_or_else(|| panic!("no clause for label {}", self.label));
        for index in start..self.body.cases.len() {
            let statements = self.body.cases[index].statements.clone();
            if let Flow::Op(op) = self.exec_statements(&statements)? {
                return Ok(op);
            }
        }
        panic!("machine body fell off the end")
    }

    // -----------------------------------------------------------------------
    // IR interpretation
    // -----------------------------------------------------------------------

    fn exec_statements(&mut self, statements: &[IRNode]) -> Result<Flow, Thrown> {
        for statement in statements {
            match self.exec_statement(statement)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_statement(&mut self, statement: &IRNode) -> Result<Flow, Thrown> {
        match statement {
            IRNode::ExpressionStatement(expression) => {
                self.eval(expression)?;
                Ok(Flow::Normal)
            }
            IRNode::EmptyStatement => Ok(Flow::Normal),
            IRNode::Block(statements) => self.exec_statements(statements),
            IRNode::ReturnStatement(expression) => {
                let Some(expression) = expression else {
                    panic!("bare return inside a machine clause")
                };
                let IRNode::GeneratorOp { opcode, value, .. } = expression.as_ref() else {
                    panic!("machine clause returned a non-protocol value")
                };
                let value = match value {
                    Some(value) => Some(self.eval(value)?),
                    None => None,
                };
                Ok(Flow::Op((*opcode, value)))
            }
            IRNode::IfStatement {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition)?.truthy() {
                    self.exec_statement(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_statement(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            IRNode::WhileStatement { condition, body } => {
                while self.eval(condition)?.truthy() {
                    match self.exec_statement(body)? {
                        Flow::Break(None) => break,
                        Flow::Continue(None) | Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }
            IRNode::DoWhileStatement { body, condition } => {
                loop {
                    match self.exec_statement(body)? {
                        Flow::Break(None) => break,
                        Flow::Continue(None) | Flow::Normal => {}
                        other => return Ok(other),
                    }
                    if !self.eval(condition)?.truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            IRNode::ForStatement {
                initializer,
                condition,
                incrementor,
                body,
            } => {
                if let Some(initializer) = initializer {
                    self.eval(initializer)?;
                }
                loop {
                    if let Some(condition) = condition
                        && !self.eval(condition)?.truthy()
                    {
                        break;
                    }
                    match self.exec_statement(body)? {
                        Flow::Break(None) => break,
                        Flow::Continue(None) | Flow::Normal => {}
                        other => return Ok(other),
                    }
                    if let Some(incrementor) = incrementor {
                        self.eval(incrementor)?;
                    }
                }
                Ok(Flow::Normal)
            }
            IRNode::ForInStatement {
                initializer,
                expression,
                body,
            } => {
                let keys: Vec<String> = match self.eval(expression)? {
                    Value::Object(entries) => {
                        entries.borrow().iter().map(|(k, _)| k.clone()).collect()
                    }
                    Value::Array(items) => {
                        (0..items.borrow().len()).map(|i| i.to_string()).collect()
                    }
                    _ => Vec::new(),
                };
                let IRNode::Identifier(name) = initializer.as_ref() else {
                    panic!("for-in target must be an identifier by this point")
                };
                for key in keys {
                    self.env.set(name, Value::Str(key));
                    match self.exec_statement(body)? {
                        Flow::Break(None) => break,
                        Flow::Continue(None) | Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }
            IRNode::SwitchStatement { expression, cases } => {
                let discriminant = self.eval(expression)?;
                let mut matched = None;
                for (index, case) in cases.iter().enumerate() {
                    if let Some(test) = &case.test
                        && self.eval(test)? == discriminant
                    {
                        matched = Some(index);
                        break;
                    }
                }
                if matched.is_none() {
                    matched = cases.iter().position(|case| case.test.is_none());
                }
                if let Some(start) = matched {
                    for case in &cases[start..] {
                        match self.exec_statements(&case.statements)? {
                            Flow::Break(None) => return Ok(Flow::Normal),
                            Flow::Normal => {}
                            other => return Ok(other),
                        }
                    }
                }
                Ok(Flow::Normal)
            }
            IRNode::BreakStatement(label) => Ok(Flow::Break(label.clone())),
            IRNode::ContinueStatement(label) => Ok(Flow::Continue(label.clone())),
            IRNode::LabeledStatement { label, statement } => {
                match self.exec_statement(statement)? {
                    Flow::Break(Some(l)) if l == *label => Ok(Flow::Normal),
                    Flow::Continue(Some(l)) if l == *label => Ok(Flow::Normal),
                    other => Ok(other),
                }
            }
            IRNode::ThrowStatement(expression) => {
                let value = self.eval(expression)?;
                Err(Thrown(value))
            }
            IRNode::TryStatement {
                try_block,
                catch_clause,
                finally_block,
            } => {
                let mut outcome = self.exec_statement(try_block);
                if let (Err(Thrown(error)), Some(clause)) = (&outcome, catch_clause) {
                    if let Some(param) = &clause.param {
                        self.env.set(param, error.clone());
                    }
                    outcome = self.exec_statements(&clause.body);
                }
                if let Some(finally_block) = finally_block {
                    match self.exec_statement(finally_block)? {
                        Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                outcome
            }
            IRNode::GeneratorTrysPush { labels } => {
                let mut entry = [None; 4];
                for (slot, label) in entry.iter_mut().zip(labels) {
                    *slot = match label {
                        IRNode::OmittedExpression => None,
                        other => Some(self.eval(other)?.as_num()),
                    };
                }
                self.trys.push(entry);
                Ok(Flow::Normal)
            }
            IRNode::VarDeclList(declarations) => {
                for declaration in declarations {
                    if let IRNode::VarDecl { name, initializer } = declaration {
                        let value = match initializer {
                            Some(initializer) => self.eval(initializer)?,
                            None => Value::Undefined,
                        };
                        self.env.set(name, value);
                    }
                }
                Ok(Flow::Normal)
            }
            other => panic!("statement not supported by the harness: {other:?}"),
        }
    }

    fn eval(&mut self, node: &IRNode) -> Result<Value, Thrown> {
        match node {
            IRNode::Identifier(name) => Ok(self.env.get(name)),
            IRNode::NumericLiteral(text) => Ok(Value::Num(
                text.parse().unwrap_or(f64::NAN),
            )),
            IRNode::StringLiteral(text) => Ok(Value::Str(text.clone())),
            IRNode::BooleanLiteral(value) => Ok(Value::Bool(*value)),
            IRNode::NullLiteral => Ok(Value::Null),
            IRNode::Undefined | IRNode::This => Ok(Value::Undefined),
            IRNode::Parenthesized(inner) => self.eval(inner),
            IRNode::GeneratorSent => {
                if self.sent.0 & 1 != 0 {
                    Err(Thrown(self.sent.1.clone().unwrap_or(Value::Undefined)))
                } else {
                    Ok(self.sent.1.clone().unwrap_or(Value::Undefined))
                }
            }
            IRNode::GeneratorLabel => Ok(Value::Num(self.label)),
            IRNode::CommaExpr(nodes) => {
                let mut last = Value::Undefined;
                for node in nodes {
                    last = self.eval(node)?;
                }
                Ok(last)
            }
            IRNode::ConditionalExpr {
                condition,
                when_true,
                when_false,
            } => {
                if self.eval(condition)?.truthy() {
                    self.eval(when_true)
                } else {
                    self.eval(when_false)
                }
            }
            IRNode::PrefixUnaryExpr { operator, operand } => {
                match operator.as_str() {
                    "!" => Ok(Value::Bool(!self.eval(operand)?.truthy())),
                    "-" => Ok(Value::Num(-self.eval(operand)?.as_num())),
                    "+" => Ok(Value::Num(self.eval(operand)?.as_num())),
                    "++" | "--" => self.step_numeric(operand, operator, true),
                    other => panic!("prefix operator not supported: {other}"),
                }
            }
            IRNode::PostfixUnaryExpr { operand, operator } => {
                self.step_numeric(operand, operator, false)
            }
            IRNode::BinaryExpr {
                left,
                operator,
                right,
            } => self.eval_binary(left, operator, right),
            IRNode::LogicalAnd { left, right } => {
                let left = self.eval(left)?;
                if left.truthy() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            IRNode::LogicalOr { left, right } => {
                let left = self.eval(left)?;
                if left.truthy() {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            IRNode::ArrayLiteral(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval(element)?);
                }
                Ok(Value::array(items))
            }
            IRNode::ObjectLiteral(properties) => {
                let mut entries = Vec::with_capacity(properties.len());
                for property in properties {
                    let key = match &property.key {
                        genlower::transforms::ir::IRPropertyKey::Identifier(name) => name.clone(),
                        genlower::transforms::ir::IRPropertyKey::StringLiteral(s) => s.clone(),
                        genlower::transforms::ir::IRPropertyKey::NumericLiteral(n) => n.clone(),
                        genlower::transforms::ir::IRPropertyKey::Computed(key) => {
                            self.eval(key)?.to_display()
                        }
                    };
                    entries.push((key, self.eval(&property.value)?));
                }
                Ok(Value::Object(Rc::new(RefCell::new(entries))))
            }
            IRNode::PropertyAccess { object, property } => {
                let object = self.eval(object)?;
                self.get_property(&object, property)
            }
            IRNode::ElementAccess { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                self.get_element(&object, &index)
            }
            IRNode::CallExpr { callee, arguments } => self.eval_call(callee, arguments),
            other => panic!("expression not supported by the harness: {other:?}"),
        }
    }

    fn eval_binary(
        &mut self,
        left: &IRNode,
        operator: &str,
        right: &IRNode,
    ) -> Result<Value, Thrown> {
        if operator == "=" {
            let value = self.eval(right)?;
            self.assign_to(left, value.clone())?;
            return Ok(value);
        }
        if let Some(base) = operator.strip_suffix('=')
            && !matches!(operator, "==" | "===" | "!=" | "!==" | "<=" | ">=")
        {
            let current = self.eval(left)?;
            let rhs = self.eval(right)?;
            let value = Self::apply_binary(base, &current, &rhs);
            self.assign_to(left, value.clone())?;
            return Ok(value);
        }
        let lhs = self.eval(left)?;
        let rhs = self.eval(right)?;
        Ok(Self::apply_binary(operator, &lhs, &rhs))
    }

    fn apply_binary(operator: &str, lhs: &Value, rhs: &Value) -> Value {
        match operator {
            "+" => match (lhs, rhs) {
                (Value::Str(_), _) | (_, Value::Str(_)) => {
                    Value::Str(format!("{}{}", lhs.to_display(), rhs.to_display()))
                }
                _ => Value::Num(lhs.as_num() + rhs.as_num()),
            },
            "-" => Value::Num(lhs.as_num() - rhs.as_num()),
            "*" => Value::Num(lhs.as_num() * rhs.as_num()),
            "/" => Value::Num(lhs.as_num() / rhs.as_num()),
            "%" => Value::Num(lhs.as_num() % rhs.as_num()),
            "<" => Value::Bool(lhs.as_num() < rhs.as_num()),
            "<=" => Value::Bool(lhs.as_num() <= rhs.as_num()),
            ">" => Value::Bool(lhs.as_num() > rhs.as_num()),
            ">=" => Value::Bool(lhs.as_num() >= rhs.as_num()),
            "==" | "===" => Value::Bool(lhs == rhs),
            "!=" | "!==" => Value::Bool(lhs != rhs),
            other => panic!("binary operator not supported: {other}"),
        }
    }

    fn step_numeric(
        &mut self,
        operand: &IRNode,
        operator: &str,
        prefix: bool,
    ) -> Result<Value, Thrown> {
        let old = self.eval(operand)?.as_num();
        let new = if operator == "++" { old + 1.0 } else { old - 1.0 };
        self.assign_to(operand, Value::Num(new))?;
        Ok(Value::Num(if prefix { new } else { old }))
    }

    fn assign_to(&mut self, target: &IRNode, value: Value) -> Result<(), Thrown> {
        match target {
            IRNode::Identifier(name) => {
                self.env.set(name, value);
                Ok(())
            }
            IRNode::GeneratorLabel => {
                self.label = value.as_num();
                Ok(())
            }
            IRNode::Parenthesized(inner) => self.assign_to(inner, value),
            IRNode::PropertyAccess { object, property } => {
                let object = self.eval(object)?;
                self.set_property(&object, property, value)
            }
            IRNode::ElementAccess { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                match (&object, &index) {
                    (Value::Array(items), Value::Num(n)) => {
                        let mut items = items.borrow_mut();
                        let at = *n as usize;
                        if at >= items.len() {
                            items.resize(at + 1, Value::Undefined);
                        }
                        items[at] = value;
                        Ok(())
                    }
                    (Value::Object(_), _) => {
                        self.set_property(&object, &index.to_display(), value)
                    }
                    _ => panic!("cannot assign into {object:?}"),
                }
            }
            other => panic!("assignment target not supported: {other:?}"),
        }
    }

    fn get_property(&self, object: &Value, name: &str) -> Result<Value, Thrown> {
        match object {
            Value::Array(items) => match name {
                "length" => Ok(Value::Num(items.borrow().len() as f64)),
                _ => Ok(Value::Undefined),
            },
            Value::Object(entries) => Ok(entries
                .borrow()
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or(Value::Undefined)),
            Value::Undefined | Value::Null => Err(Thrown(Value::Str(format!(
                "cannot read property {name} of {object:?}"
            )))),
            _ => Ok(Value::Undefined),
        }
    }

    fn set_property(&self, object: &Value, name: &str, value: Value) -> Result<(), Thrown> {
        match object {
            Value::Object(entries) => {
                let mut entries = entries.borrow_mut();
                for entry in entries.iter_mut() {
                    if entry.0 == name {
                        entry.1 = value;
                        return Ok(());
                    }
                }
                entries.push((name.to_string(), value));
                Ok(())
            }
            _ => Err(Thrown(Value::Str(format!(
                "cannot set property {name} of {object:?}"
            )))),
        }
    }

    fn get_element(&self, object: &Value, index: &Value) -> Result<Value, Thrown> {
        match (object, index) {
            (Value::Array(items), Value::Num(n)) => Ok(items
                .borrow()
                .get(*n as usize)
                .cloned()
                .unwrap_or(Value::Undefined)),
            (Value::Object(_), _) => self.get_property(object, &index.to_display()),
            _ => Ok(Value::Undefined),
        }
    }

    /// Calls, including the method shapes the lowering emits against temps:
    /// `arr.push(x)`, `arr.concat(xs)`, `f.apply(thisArg, args)`.
    fn eval_call(&mut self, callee: &IRNode, arguments: &[IRNode]) -> Result<Value, Thrown> {
        if let IRNode::PropertyAccess { object, property } = callee {
            match property.as_str() {
                "push" => {
                    let Value::Array(items) = self.eval(object)? else {
                        panic!("push on a non-array")
                    };
                    let mut length = 0.0;
                    for argument in arguments {
                        let value = self.eval(argument)?;
                        let mut items = items.borrow_mut();
                        items.push(value);
                        length = items.len() as f64;
                    }
                    return Ok(Value::Num(length));
                }
                "concat" => {
                    let Value::Array(items) = self.eval(object)? else {
                        panic!("concat on a non-array")
                    };
                    let mut result = items.borrow().clone();
                    for argument in arguments {
                        match self.eval(argument)? {
                            Value::Array(more) => result.extend(more.borrow().iter().cloned()),
                            other => result.push(other),
                        }
                    }
                    return Ok(Value::array(result));
                }
                "apply" => {
                    let function = self.eval(object)?;
                    let this_arg = match arguments.first() {
                        Some(argument) => self.eval(argument)?,
                        None => Value::Undefined,
                    };
                    let spread = match arguments.get(1) {
                        Some(argument) => match self.eval(argument)? {
                            Value::Array(items) => items.borrow().clone(),
                            other => vec![other],
                        },
                        None => Vec::new(),
                    };
                    return self.call_function(&function, this_arg, &spread);
                }
                _ => {}
            }
        }
        let function = self.eval(callee)?;
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.eval(argument)?);
        }
        self.call_function(&function, Value::Undefined, &values)
    }

    fn call_function(
        &mut self,
        function: &Value,
        this_arg: Value,
        arguments: &[Value],
    ) -> Result<Value, Thrown> {
        match function {
            Value::Host(host) => host(this_arg, arguments),
            other => Err(Thrown(Value::Str(format!("{other:?} is not a function")))),
        }
    }
}

enum StepOutcome {
    Yielded(Value),
    Advance(Op),
}

/// Collect every event produced by a resume script, starting with the
/// implicit first `next(undefined)`.
pub fn run_script(driver: &mut Driver, resumes: Vec<Resume>) -> Vec<Event> {
    let mut events = vec![driver.next(Value::Undefined)];
    for resume in resumes {
        if matches!(events.last(), Some(Event::Done(_) | Event::Threw(_))) {
            break;
        }
        events.push(driver.resume(resume));
    }
    events
}
