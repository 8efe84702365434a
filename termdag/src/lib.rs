//! Solver-agnostic term DAG with hash-consing, post-order rewriting, a
//! logging wrapper keeping the DAG in step with an engine, and a portfolio
//! race over several engines.

pub mod engine;
pub mod error;
pub mod logging;
pub mod portfolio;
pub mod term;
pub mod utils;
pub mod walker;

pub use engine::{ArrayModel, CancelToken, Capabilities, Engine, SatResult};
pub use error::{Error, ErrorKind, Result};
pub use logging::LoggingSolver;
pub use portfolio::{race, racer, solve_query, EngineRacer, Racer};
pub use term::{
    ConstructorDecl, DatatypeDecl, Op, PrimOp, Selector, Sort, SortKind, Term, TermKind,
    TermTable, Value,
};
pub use walker::{
    transfer, IdentityVisitor, SubstitutionWalker, TermBuilder, TermMap, TermTranslator,
    TreeWalker, Visitor, WalkerStep,
};
