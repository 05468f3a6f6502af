use itertools::Itertools;
use scriptdbg_syntax::{
    ast::{ForEachLeft, Function, Program, Statement, StatementKind},
    visitor::{self, Visitor},
    Position,
};

/// Collects the positions the engine checks for breakpoints: statement
/// starts, loop-control expressions and the ends of function bodies.
#[derive(Debug, Default)]
pub struct BreakPointCollector {
    positions: Vec<Position>,
}
impl BreakPointCollector {
    /// Sorted and without duplicates.
    #[must_use]
    pub fn collect(program: &Program) -> Vec<Position> {
        let mut collector = Self::default();
        collector.visit_program(program);
        collector.positions.into_iter().sorted().dedup().collect()
    }
}
impl Visitor for BreakPointCollector {
    fn visit_statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::BlockStatement { .. } => {}
            StatementKind::DoWhileStatement { test, .. } => {
                self.positions.push(statement.start());
                self.positions.push(test.loc.start);
            }
            StatementKind::ForStatement { test, update, .. } => {
                self.positions.push(statement.start());
                self.positions
                    .extend(test.iter().chain(update).map(|it| it.loc.start));
            }
            _ => self.positions.push(statement.start()),
        }
        visitor::walk_statement(self, statement);
    }

    fn visit_for_each_left(&mut self, left: &ForEachLeft) {
        self.positions.push(left.loc().start);
        visitor::walk_for_each_left(self, left);
    }

    fn visit_function(&mut self, function: &Function) {
        self.positions.push(function.body.loc().end);
        visitor::walk_function(self, function);
    }
}
