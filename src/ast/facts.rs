//! Suspension-point fact computation.
//!
//! Before lowering, every node must know whether its subtree (within the same
//! function body) contains a `yield` or `yield*`. The lowering pass branches
//! on this bit constantly to decide between structural conversion and
//! flattening, so it is computed once here rather than re-derived on the fly.

use super::{AstArena, NodeFlags, NodeIndex, NodeKind, PropName};

/// Annotates `root` and every descendant with [`NodeFlags::CONTAINS_YIELD`].
///
/// Function boundaries reset containment: a nested function expression whose
/// body yields does not make the enclosing statement suspend, but its own
/// body is still annotated so it can be lowered independently.
///
/// Returns whether `root` itself contains a suspension point.
pub fn mark_yield_containment(arena: &mut AstArena, root: NodeIndex) -> bool {
    let mut contains = false;
    // Clone the kind to sidestep holding a borrow across the recursion; node
    // kinds are shallow (indices and small strings).
    let kind = arena.kind(root).clone();
    match kind {
        NodeKind::Yield { expression, .. } => {
            contains = true;
            if let Some(expression) = expression {
                mark_yield_containment(arena, expression);
            }
        }
        NodeKind::FunctionExpr { body, .. } | NodeKind::FunctionDecl { body, .. } => {
            // Annotate the nested body for its own lowering, but do not let
            // its suspension points leak into the enclosing function.
            mark_yield_containment(arena, body);
        }
        _ => {
            for_each_child(&kind, |child| {
                contains |= mark_yield_containment(arena, child);
            });
        }
    }
    if contains {
        arena.add_flags(root, NodeFlags::CONTAINS_YIELD);
    }
    contains
}

fn for_each_child(kind: &NodeKind, mut f: impl FnMut(NodeIndex)) {
    match kind {
        NodeKind::Ident(_)
        | NodeKind::NumberLit(_)
        | NodeKind::StringLit(_)
        | NodeKind::BoolLit(_)
        | NodeKind::NullLit
        | NodeKind::This
        | NodeKind::OmittedExpr
        | NodeKind::EmptyStatement
        | NodeKind::Continue { .. }
        | NodeKind::Break { .. } => {}
        NodeKind::Paren(inner) | NodeKind::ExpressionStatement(inner) => f(*inner),
        NodeKind::PrefixUnary { operand, .. } | NodeKind::PostfixUnary { operand, .. } => {
            f(*operand)
        }
        NodeKind::Binary { left, right, .. } => {
            f(*left);
            f(*right);
        }
        NodeKind::Conditional {
            condition,
            when_true,
            when_false,
        } => {
            f(*condition);
            f(*when_true);
            f(*when_false);
        }
        NodeKind::Call { callee, arguments } | NodeKind::New { callee, arguments } => {
            f(*callee);
            for argument in arguments {
                f(*argument);
            }
        }
        NodeKind::PropertyAccess { object, .. } => f(*object),
        NodeKind::ElementAccess { object, index } => {
            f(*object);
            f(*index);
        }
        NodeKind::ArrayLit { elements } | NodeKind::CommaList { elements } => {
            for element in elements {
                f(*element);
            }
        }
        NodeKind::ObjectLit { properties } => {
            for property in properties {
                f(*property);
            }
        }
        NodeKind::PropertyAssignment { name, initializer } => {
            if let PropName::Computed(key) = name {
                f(*key);
            }
            f(*initializer);
        }
        NodeKind::Yield { expression, .. } => {
            if let Some(expression) = expression {
                f(*expression);
            }
        }
        NodeKind::FunctionExpr { body, .. } | NodeKind::FunctionDecl { body, .. } => f(*body),
        NodeKind::Block { statements } => {
            for statement in statements {
                f(*statement);
            }
        }
        NodeKind::VariableStatement { declarations } => {
            for declaration in declarations {
                f(*declaration);
            }
        }
        NodeKind::VariableDeclaration { name, initializer } => {
            f(*name);
            if let Some(initializer) = initializer {
                f(*initializer);
            }
        }
        NodeKind::If {
            condition,
            then_statement,
            else_statement,
        } => {
            f(*condition);
            f(*then_statement);
            if let Some(else_statement) = else_statement {
                f(*else_statement);
            }
        }
        NodeKind::Do {
            statement,
            condition,
        }
        | NodeKind::While {
            condition,
            statement,
        } => {
            f(*condition);
            f(*statement);
        }
        NodeKind::For {
            initializer,
            condition,
            incrementor,
            statement,
        } => {
            if let Some(initializer) = initializer {
                f(*initializer);
            }
            if let Some(condition) = condition {
                f(*condition);
            }
            if let Some(incrementor) = incrementor {
                f(*incrementor);
            }
            f(*statement);
        }
        NodeKind::ForIn {
            initializer,
            expression,
            statement,
        } => {
            f(*initializer);
            f(*expression);
            f(*statement);
        }
        NodeKind::Return { expression } => {
            if let Some(expression) = expression {
                f(*expression);
            }
        }
        NodeKind::With {
            expression,
            statement,
        } => {
            f(*expression);
            f(*statement);
        }
        NodeKind::Switch {
            expression,
            clauses,
        } => {
            f(*expression);
            for clause in clauses {
                f(*clause);
            }
        }
        NodeKind::CaseClause { test, statements } => {
            if let Some(test) = test {
                f(*test);
            }
            for statement in statements {
                f(*statement);
            }
        }
        NodeKind::Labeled { statement, .. } => f(*statement),
        NodeKind::Throw { expression } => f(*expression),
        NodeKind::Try {
            try_block,
            catch_clause,
            finally_block,
        } => {
            f(*try_block);
            if let Some(catch_clause) = catch_clause {
                f(*catch_clause);
            }
            if let Some(finally_block) = finally_block {
                f(*finally_block);
            }
        }
        NodeKind::CatchClause { variable, block } => {
            if let Some(variable) = variable {
                f(*variable);
            }
            f(*block);
        }
    }
}
