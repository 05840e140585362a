//! The relmodel filter DSL.
//!
//! Caller input (`{"status": "active"}` or `{"where": [...], "order": ...}`)
//! is parsed once into a [`Query`], then consumed by one of two passes:
//!
//! - [`compile`] emits parameterized SQL for a [`Dialect`];
//! - [`eval`] runs the same tree against records already in memory.
//!
//! Both passes agree on every record set: whatever the compiled SQL selects
//! from a table, the evaluator selects from the same rows.

pub mod clause;
pub mod compile;
pub mod dialect;
pub mod eval;
pub mod filter;
pub mod typed;

pub use clause::{Direction, OrderSpec, Query, positive_count};
pub use compile::{CompiledSql, compile_filter, compile_order, compile_select, compile_tail};
pub use dialect::{Dialect, ParamAllocator};
pub use eval::{filter_records, matches_group, sort_records};
pub use filter::{Chain, Condition, FilterNode, Group, Leaf, Operand, parse_where};
pub use typed::TypedValue;
