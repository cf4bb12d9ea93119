//! Boolean formulae over named atoms, lowered onto [`varisat`].

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use itertools::Itertools;
use varisat::{ExtendFormula, Lit, Solver, Var};

/// A boolean formula over named atoms of type `A`.
///
/// Build these with the free functions in this module, then hand them to a [`SatEngine`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Formula<A> {
    Atom(A),
    Not(Box<Formula<A>>),
    And(Vec<Formula<A>>),
    Or(Vec<Formula<A>>),
    ExactlyOne(Vec<Formula<A>>),
    AtMostOne(Vec<Formula<A>>),
    Implies(Box<Formula<A>>, Box<Formula<A>>),
    Equiv(Box<Formula<A>>, Box<Formula<A>>),
}

/// A single named variable.
pub fn atom<A>(atom: A) -> Formula<A> {
    Formula::Atom(atom)
}

/// Negation.
pub fn not<A>(formula: Formula<A>) -> Formula<A> {
    Formula::Not(Box::new(formula))
}

/// Conjunction; true when empty.
pub fn and<A>(formulae: impl IntoIterator<Item = Formula<A>>) -> Formula<A> {
    Formula::And(formulae.into_iter().collect())
}

/// Disjunction; false when empty.
pub fn or<A>(formulae: impl IntoIterator<Item = Formula<A>>) -> Formula<A> {
    Formula::Or(formulae.into_iter().collect())
}

/// Exactly one operand holds; false when empty.
pub fn exactly_one<A>(formulae: impl IntoIterator<Item = Formula<A>>) -> Formula<A> {
    Formula::ExactlyOne(formulae.into_iter().collect())
}

/// No two operands hold at once; true when empty.
pub fn at_most_one<A>(formulae: impl IntoIterator<Item = Formula<A>>) -> Formula<A> {
    Formula::AtMostOne(formulae.into_iter().collect())
}

/// Material implication.
pub fn implies<A>(antecedent: Formula<A>, consequent: Formula<A>) -> Formula<A> {
    Formula::Implies(Box::new(antecedent), Box::new(consequent))
}

/// Both sides hold or neither does.
pub fn equiv<A>(lhs: Formula<A>, rhs: Formula<A>) -> Formula<A> {
    Formula::Equiv(Box::new(lhs), Box::new(rhs))
}

/// The set of atoms a satisfying assignment makes true.
#[derive(Clone, Debug)]
pub struct Model<A> {
    true_atoms: Vec<A>,
    lookup: HashSet<A>,
}

impl<A: Copy + Eq + Hash> Model<A> {
    fn new(true_atoms: Vec<A>) -> Self {
        let lookup = true_atoms.iter().copied().collect();
        Self { true_atoms, lookup }
    }

    /// Whether `atom` is true in this model.
    pub fn contains(&self, atom: &A) -> bool {
        self.lookup.contains(atom)
    }

    /// True atoms, in the order their variables were allocated.
    pub fn true_atoms(&self) -> &[A] {
        &self.true_atoms
    }
}

/// A SAT engine speaking in atoms rather than variables.
///
/// Atoms are assigned variables on first use. Composite formulae are lowered to clauses through Tseitin definitions,
/// each of which is a full equivalence, so a sub-formula may sit under any polarity.
/// The engine is incremental: constraints accumulate across [`Self::solve`] calls.
pub struct SatEngine<A> {
    solver: Solver<'static>,
    vars: HashMap<A, Var>,
    // indexed by variable; None for definitions
    atoms: Vec<Option<A>>,
    truth: Option<Lit>,
    clause_count: usize,
}

impl<A> Default for SatEngine<A>
where
    A: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> SatEngine<A>
where
    A: Copy + Eq + Hash,
{
    /// An engine with no constraints.
    pub fn new() -> Self {
        Self {
            solver: Solver::new(),
            vars: HashMap::new(),
            atoms: Vec::new(),
            truth: None,
            clause_count: 0,
        }
    }

    /// Variables allocated so far, atoms and definitions alike.
    pub fn var_count(&self) -> usize {
        self.atoms.len()
    }

    /// Clauses added so far.
    pub fn clause_count(&self) -> usize {
        self.clause_count
    }

    fn fresh_var(&mut self, atom: Option<A>) -> Var {
        let var = self.solver.new_var();
        debug_assert_eq!(var.index(), self.atoms.len());
        self.atoms.push(atom);
        var
    }

    fn add_clause(&mut self, clause: &[Lit]) {
        self.solver.add_clause(clause);
        self.clause_count += 1;
    }

    /// The variable standing for `atom`, allocating it if this is its first use.
    pub fn atom_var(&mut self, atom: A) -> Var {
        if let Some(var) = self.vars.get(&atom) {
            return *var;
        }

        let var = self.fresh_var(Some(atom));
        self.vars.insert(atom, var);
        var
    }

    fn constant(&mut self, value: bool) -> Lit {
        let truth = match self.truth {
            Some(truth) => truth,
            None => {
                let truth = self.fresh_var(None).positive();
                self.add_clause(&[truth]);
                self.truth = Some(truth);
                truth
            }
        };

        if value { truth } else { !truth }
    }

    // t <=> l_1 * l_2 * ... * l_n
    fn define_and(&mut self, lits: &[Lit]) -> Lit {
        match lits {
            [] => self.constant(true),
            [single] => *single,
            _ => {
                let t = self.fresh_var(None).positive();
                // t => l_i
                for lit in lits {
                    self.add_clause(&[!t, *lit]);
                }
                // l_1 * l_2 * ... => t = t + !l_1 + !l_2 + ...
                let mut clause = Vec::with_capacity(lits.len() + 1);
                clause.push(t);
                clause.extend(lits.iter().map(|lit| !*lit));
                self.add_clause(&clause);
                t
            }
        }
    }

    // l_1 + l_2 + ... = !(!l_1 * !l_2 * ...)
    fn define_or(&mut self, lits: &[Lit]) -> Lit {
        let negated = lits.iter().map(|lit| !*lit).collect_vec();
        !self.define_and(&negated)
    }

    // no pair is both true: the product of !(l_i * l_j) over all pairs
    fn define_at_most_one(&mut self, lits: &[Lit]) -> Lit {
        let pairs = lits.iter()
            .tuple_combinations()
            .map(|(a, b)| !self.define_and(&[*a, *b]))
            .collect_vec();
        self.define_and(&pairs)
    }

    /// A literal equivalent to `formula`.
    pub fn literal(&mut self, formula: &Formula<A>) -> Lit {
        match formula {
            Formula::Atom(atom) => self.atom_var(*atom).positive(),
            Formula::Not(inner) => !self.literal(inner),
            Formula::And(operands) => {
                let lits = operands.iter().map(|f| self.literal(f)).collect_vec();
                self.define_and(&lits)
            }
            Formula::Or(operands) => {
                let lits = operands.iter().map(|f| self.literal(f)).collect_vec();
                self.define_or(&lits)
            }
            Formula::AtMostOne(operands) => {
                let lits = operands.iter().map(|f| self.literal(f)).collect_vec();
                self.define_at_most_one(&lits)
            }
            Formula::ExactlyOne(operands) => {
                let lits = operands.iter().map(|f| self.literal(f)).collect_vec();
                let at_least_one = self.define_or(&lits);
                let at_most_one = self.define_at_most_one(&lits);
                self.define_and(&[at_least_one, at_most_one])
            }
            Formula::Implies(antecedent, consequent) => {
                let a = self.literal(antecedent);
                let b = self.literal(consequent);
                self.define_or(&[!a, b])
            }
            Formula::Equiv(lhs, rhs) => {
                let a = self.literal(lhs);
                let b = self.literal(rhs);
                let t = self.fresh_var(None).positive();
                // t <=> (a <=> b)
                self.add_clause(&[!t, !a, b]);
                self.add_clause(&[!t, a, !b]);
                self.add_clause(&[t, a, b]);
                self.add_clause(&[t, !a, !b]);
                t
            }
        }
    }

    /// Add `formula` as a hard constraint.
    pub fn require(&mut self, formula: Formula<A>) {
        match formula {
            Formula::And(operands) => operands.into_iter().for_each(|f| self.require(f)),
            Formula::Not(inner) => self.forbid(*inner),
            Formula::Or(operands) => {
                let mut clause = operands.iter().map(|f| self.literal(f)).collect_vec();
                if clause.is_empty() {
                    // the empty disjunction
                    clause.push(self.constant(false));
                }
                self.add_clause(&clause);
            }
            Formula::Implies(antecedent, consequent) => {
                let clause = [!self.literal(&antecedent), self.literal(&consequent)];
                self.add_clause(&clause);
            }
            other => {
                let lit = self.literal(&other);
                self.add_clause(&[lit]);
            }
        }
    }

    /// Add the negation of `formula` as a hard constraint.
    pub fn forbid(&mut self, formula: Formula<A>) {
        match formula {
            Formula::Or(operands) => operands.into_iter().for_each(|f| self.forbid(f)),
            Formula::Not(inner) => self.require(*inner),
            Formula::And(operands) => {
                let mut clause = operands.iter().map(|f| !self.literal(f)).collect_vec();
                if clause.is_empty() {
                    clause.push(self.constant(false));
                }
                self.add_clause(&clause);
            }
            other => {
                let lit = self.literal(&other);
                self.add_clause(&[!lit]);
            }
        }
    }

    /// Solve everything added so far.
    pub fn solve(&mut self) -> Option<Model<A>> {
        self.solve_assuming(&[])
    }

    /// Solve everything added so far, with `assumptions` holding for this call only.
    ///
    /// Blocks until the engine decides. Returns [`None`] when unsatisfiable; an engine failure is logged and treated the same way.
    pub fn solve_assuming(&mut self, assumptions: &[Lit]) -> Option<Model<A>> {
        self.solver.assume(assumptions);
        match self.solver.solve() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                log::warn!("SAT engine gave up: {:?}", err);
                return None;
            }
        }

        let model = self.solver.model()?;
        let true_atoms = model.into_iter()
            .filter(|lit| lit.is_positive())
            .filter_map(|lit| self.atoms.get(lit.var().index()).copied().flatten())
            .collect_vec();

        Some(Model::new(true_atoms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    enum Name {
        A,
        B,
        C,
    }

    #[test]
    fn exactly_one_picks_one() {
        let mut engine = SatEngine::new();
        engine.require(exactly_one([atom(Name::A), atom(Name::B), atom(Name::C)]));
        engine.forbid(atom(Name::A));
        engine.forbid(atom(Name::C));

        let model = engine.solve().unwrap();
        assert_eq!(model.true_atoms(), &[Name::B]);
    }

    #[test]
    fn equiv_under_negation() {
        let mut engine = SatEngine::new();
        // !(A <=> B), A
        engine.forbid(equiv(atom(Name::A), atom(Name::B)));
        engine.require(atom(Name::A));

        let model = engine.solve().unwrap();
        assert!(model.contains(&Name::A));
        assert!(!model.contains(&Name::B));
    }

    #[test]
    fn at_most_one_of_none_is_free() {
        let mut engine = SatEngine::<Name>::new();
        engine.require(at_most_one([]));
        engine.require(and([]));
        assert!(engine.solve().is_some());

        engine.require(or([]));
        assert!(engine.solve().is_none());
    }

    #[test]
    fn nested_formulae() {
        let mut engine = SatEngine::new();
        // (A * B) => C, A, B, !C is unsatisfiable
        engine.require(implies(and([atom(Name::A), atom(Name::B)]), atom(Name::C)));
        engine.require(atom(Name::A));
        engine.require(atom(Name::B));
        assert!(engine.solve().unwrap().contains(&Name::C));

        let not_c = !engine.literal(&atom(Name::C));
        assert!(engine.solve_assuming(&[not_c]).is_none());
        // assumptions do not stick
        assert!(engine.solve().is_some());
    }

    #[test]
    fn exactly_one_under_equivalence() {
        let mut engine = SatEngine::new();
        // C <=> exactly one of (A, B), with A and B both true forces !C
        engine.require(equiv(atom(Name::C), exactly_one([atom(Name::A), atom(Name::B)])));
        engine.require(atom(Name::A));
        engine.require(atom(Name::B));
        let model = engine.solve().unwrap();
        assert!(!model.contains(&Name::C));

        engine.require(not(atom(Name::C)));
        assert!(engine.solve().is_some());
    }

    #[test]
    fn model_lookup_matches_true_atoms() {
        let mut engine = SatEngine::new();
        engine.require(or([atom(Name::A), atom(Name::B)]));
        engine.forbid(atom(Name::B));
        engine.require(implies(atom(Name::A), not(atom(Name::C))));

        let model = engine.solve().unwrap();
        assert_eq!(model.true_atoms(), &[Name::A]);
        assert!(model.contains(&Name::A));
        assert!(!model.contains(&Name::B));
        assert!(!model.contains(&Name::C));
    }
}
