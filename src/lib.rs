//! ES5 generator function lowering.
//!
//! Rewrites generator function bodies (`function* () { ... yield ... }`)
//! into ES5 state machines driven by the `__generator` runtime helper from
//! tslib. The crate takes a post-parse, post-ES2015-downlevel AST (no
//! destructuring, arrows, or template literals remain), flattens every
//! expression containing a `yield` into resumable steps, and prints the
//! resulting `switch (state.label)` dispatch as JavaScript text.
//!
//! The pipeline:
//!
//! 1. [`ast`] holds the arena-based source tree; `ast::facts` marks yield
//!    containment bottom-up before the transform runs.
//! 2. [`transforms::generators`] lowers each generator body into abstract
//!    operations and builds the state machine clauses.
//! 3. [`transforms::ir`] / [`transforms::ir_printer`] model and print the
//!    lowered ES5 output.

pub mod ast;
pub mod tracing_config;
pub mod transforms;

pub use transforms::{GeneratorTransformer, lower_function};
