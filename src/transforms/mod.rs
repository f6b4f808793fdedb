//! JavaScript transforms.
//!
//! Transforms follow a two-phase approach:
//!
//! 1. **Transform Phase**: Analyze AST nodes and produce IR (Intermediate
//!    Representation) nodes that represent the lowered JavaScript constructs.
//!
//! 2. **Print Phase**: The printer walks IR trees and emits JavaScript
//!    strings.
//!
//! This separation allows:
//! - Clean separation between transform logic and string emission
//! - IR is testable independently
//! - Printer can apply formatting consistently
//! - Future optimizations (minification, pretty-print) only need to change
//!   the printer
//!
//! The generator transform is split across four modules: `generators` owns
//! the transformer state, labels, blocks and operation emitters;
//! `generators_expr` flattens expressions; `generators_stmt` transduces
//! statements; `generators_build` replays the operations into dispatch
//! clauses.

pub mod generators;
mod generators_build;
mod generators_expr;
mod generators_stmt;
pub mod ir;
pub mod ir_printer;

pub use generators::{GeneratorTransformer, lower_function};
