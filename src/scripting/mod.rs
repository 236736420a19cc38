//! Custom signal functions.
//!
//! Users can point the application at a script file whose functions derive
//! new x/y series from the loaded dataset. Scripts run inside an embedded
//! Rhai engine, an interpreter with hard resource limits, rather than as
//! native code, so a misbehaving function can fail loudly without taking
//! the application or its data with it.

pub mod engine;

pub use engine::ScriptEngine;
