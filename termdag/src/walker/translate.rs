use super::{TreeWalker, Visitor, WalkerStep};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::logging::LoggingSolver;
use crate::term::{Sort, Term, TermKind};

/// Rebuilds terms of one session inside another. Symbols are matched by
/// name (and declared when missing), values and applications are rebuilt.
#[derive(Clone, Copy, Debug, Default)]
pub struct TermTranslator;

fn declare_sorts<E: Engine>(target: &mut LoggingSolver<E>, sort: &Sort) -> Result<()> {
    let mut stack = vec![sort];
    while let Some(s) = stack.pop() {
        match s {
            Sort::Uninterpreted { name, arity } if !target.has_sort(s) => {
                target.make_uninterpreted_sort(name, *arity)?;
            }
            Sort::Datatype(name) if !target.has_sort(s) => {
                return Err(Error::unsupported(format!(
                    "datatype {} must be declared before translating into {}",
                    name,
                    target.name()
                )));
            }
            Sort::Array(index, element) => {
                stack.push(index);
                stack.push(element);
            }
            Sort::Function { domain, range } => {
                stack.extend(domain.iter());
                stack.push(range);
            }
            _ => {}
        }
    }
    Ok(())
}

impl<E: Engine> Visitor<LoggingSolver<E>> for TermTranslator {
    fn visit_term(
        &mut self,
        target: &mut LoggingSolver<E>,
        term: &Term,
        children: &[Term],
    ) -> Result<WalkerStep> {
        let translated = match term.kind() {
            TermKind::Symbol(name) => match target.get_symbol(name) {
                Ok(existing) => {
                    existing.sort().expect_same_as(term.sort())?;
                    existing
                }
                Err(_) => {
                    declare_sorts(target, term.sort())?;
                    target.make_symbol(name, term.sort())?
                }
            },
            TermKind::Value(value) => target.make_value(value, term.sort())?,
            TermKind::ConstArray => target.make_const_array(&children[0], term.sort())?,
            TermKind::Apply => target.make_term(term.op(), children)?,
        };
        Ok(WalkerStep::Replace(translated))
    }
}

/// Moves `term` into `target`'s session.
pub fn transfer<E: Engine>(target: &mut LoggingSolver<E>, term: &Term) -> Result<Term> {
    TreeWalker::new(TermTranslator, true).visit(target, term)
}
