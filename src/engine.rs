//! Evaluation of parsed queries against a graph view.
//!
//! A query runs through fixed stages: the group pattern is matched as a
//! left-to-right nested-loop join (OPTIONAL as a left outer join, FILTERs
//! applied once their group is complete), the solutions are grouped and
//! aggregated when the query asks for it, then ordered, projected, made
//! distinct and finally cut by OFFSET and LIMIT.
//!
//! Expression errors are not query errors. An expression that cannot be
//! evaluated (a failed cast, a type mismatch, an unbound variable) has no
//! value, and a FILTER without a value rejects the row.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::construct::{Literal, OtherHasher, Resource, Term, TripleSource};
use crate::datatype::{Datatype, leading_number, parse_boolean};
use crate::error::Result;
use crate::graph::GraphView;
use crate::query::{
    Comparison, Expression, Function, GroupElement, GroupPattern, Operator, PathModifier, Query,
    TermPattern, TriplePattern, Verb, parse,
};

pub type Binding = HashMap<String, Term, OtherHasher>;

// ------------- Results -------------
/// The outcome of a query: named columns and one row per solution, where
/// `None` marks a variable the solution leaves unbound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<Term>>>,
    /// Whether the LIMIT was reached.
    pub limited: bool,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
    pub fn value(&self, row: usize, column: &str) -> Option<&Term> {
        let index = self.column(column)?;
        self.rows.get(row)?.get(index)?.as_ref()
    }
    /// All values of one column, in row order.
    pub fn values(&self, column: &str) -> Vec<Option<&Term>> {
        match self.column(column) {
            Some(index) => self.rows.iter().map(|row| row[index].as_ref()).collect(),
            None => Vec::new(),
        }
    }
    pub fn solutions(&self) -> impl Iterator<Item = Solution<'_>> {
        self.rows.iter().map(move |row| Solution { columns: &self.columns, row })
    }
}

/// One row of a [`ResultSet`], addressed by variable name.
#[derive(Debug, Clone, Copy)]
pub struct Solution<'r> {
    columns: &'r [String],
    row: &'r [Option<Term>],
}

impl<'r> Solution<'r> {
    pub fn get(&self, variable: &str) -> Option<&'r Term> {
        let index = self.columns.iter().position(|c| c == variable)?;
        self.row.get(index)?.as_ref()
    }
    pub fn is_bound(&self, variable: &str) -> bool {
        self.get(variable).is_some()
    }
}

// ------------- Engine -------------
/// A solution on its way to becoming a row. Grouped queries carry the
/// members of the group so that aggregates can be computed.
struct Candidate<'m> {
    binding: Binding,
    members: Option<&'m [Binding]>,
}

pub struct Engine<'g> {
    view: GraphView<'g>,
}

impl<'g> Engine<'g> {
    pub fn new(view: GraphView<'g>) -> Self {
        Self { view }
    }

    pub fn execute(&self, text: &str) -> Result<ResultSet> {
        let query = parse(text)?;
        Ok(self.evaluate(&query))
    }

    pub fn evaluate(&self, query: &Query) -> ResultSet {
        let solutions = self.group(&query.pattern, vec![Binding::default()]);
        let matched = solutions.len();

        let aggregated = query.is_aggregate();
        let (groups, solutions) = if aggregated {
            (aggregate(solutions, &query.group_by), Vec::new())
        } else {
            (Vec::new(), solutions)
        };
        let mut candidates: Vec<Candidate> = if aggregated {
            groups
                .iter()
                .filter(|(key, members)| {
                    query.having.iter().all(|condition| {
                        let holds = self.evaluate_expression(
                            condition,
                            key,
                            Some(members.as_slice()),
                        );
                        effective_boolean(holds) == Some(true)
                    })
                })
                .map(|(key, members)| Candidate {
                    binding: key.clone(),
                    members: Some(members.as_slice()),
                })
                .collect()
        } else {
            solutions
                .into_iter()
                .map(|binding| Candidate { binding, members: None })
                .collect()
        };

        // projected expressions are bound first so ORDER BY can refer to them
        let columns = match &query.projection {
            Some(items) => {
                for candidate in candidates.iter_mut() {
                    for item in items {
                        let Some(expression) = &item.expression else {
                            continue;
                        };
                        let value = self.evaluate_expression(
                            expression,
                            &candidate.binding,
                            candidate.members,
                        );
                        if let Some(value) = value {
                            candidate.binding.insert(item.variable.clone(), value);
                        }
                    }
                }
                items.iter().map(|item| item.variable.clone()).collect()
            }
            None => query.pattern_variables(),
        };

        if !query.order_by.is_empty() {
            let mut keyed: Vec<(Vec<Option<Term>>, Candidate)> = candidates
                .into_iter()
                .map(|candidate| {
                    let keys = query
                        .order_by
                        .iter()
                        .map(|condition| {
                            self.evaluate_expression(
                                &condition.expression,
                                &candidate.binding,
                                candidate.members,
                            )
                        })
                        .collect();
                    (keys, candidate)
                })
                .collect();
            keyed.sort_by(|(a, _), (b, _)| {
                for ((x, y), condition) in a.iter().zip(b.iter()).zip(&query.order_by) {
                    let ordering = order_terms(x.as_ref(), y.as_ref());
                    let ordering = if condition.descending { ordering.reverse() } else { ordering };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
            candidates = keyed.into_iter().map(|(_, candidate)| candidate).collect();
        }

        let mut rows: Vec<Vec<Option<Term>>> = candidates
            .iter()
            .map(|candidate| {
                columns
                    .iter()
                    .map(|column| candidate.binding.get(column).cloned())
                    .collect()
            })
            .collect();
        if query.distinct {
            let mut seen = HashSet::new();
            rows.retain(|row| seen.insert(row.clone()));
        }
        let mut rows: Vec<Vec<Option<Term>>> = rows.into_iter().skip(query.offset).collect();
        let mut limited = false;
        if let Some(limit) = query.limit {
            limited = rows.len() >= limit;
            rows.truncate(limit);
        }
        debug!(matched, rows = rows.len(), limited, "query evaluated");
        ResultSet { columns, rows, limited }
    }

    // ------------- Pattern matching -------------
    fn group(&self, group: &GroupPattern, seeds: Vec<Binding>) -> Vec<Binding> {
        let mut rows = seeds;
        let mut filters = Vec::new();
        for element in &group.elements {
            match element {
                GroupElement::Triple(pattern) => {
                    rows = rows
                        .into_iter()
                        .flat_map(|binding| self.extend(pattern, binding))
                        .collect();
                }
                GroupElement::Optional(inner) => {
                    rows = rows
                        .into_iter()
                        .flat_map(|binding| {
                            let extended = self.group(inner, vec![binding.clone()]);
                            if extended.is_empty() { vec![binding] } else { extended }
                        })
                        .collect();
                }
                GroupElement::Bind(expression, variable) => {
                    for binding in rows.iter_mut() {
                        if binding.contains_key(variable) {
                            continue;
                        }
                        if let Some(value) = self.evaluate_expression(expression, binding, None) {
                            binding.insert(variable.clone(), value);
                        }
                    }
                }
                GroupElement::Filter(expression) => filters.push(expression),
            }
        }
        rows.retain(|binding| {
            filters.iter().all(|filter| {
                effective_boolean(self.evaluate_expression(filter, binding, None)) == Some(true)
            })
        });
        rows
    }

    /// All extensions of the binding that satisfy the triple pattern.
    fn extend(&self, pattern: &TriplePattern, binding: Binding) -> Vec<Binding> {
        let subject = match resolve(&pattern.subject, &binding) {
            Resolved::Free(name) => Slot::Free(name),
            Resolved::Bound(Term::Resource(r)) => Slot::Bound(r),
            // a literal can never be a subject
            Resolved::Bound(Term::Literal(_)) => return Vec::new(),
        };
        let object = match resolve(&pattern.object, &binding) {
            Resolved::Free(name) => Slot::Free(name),
            Resolved::Bound(term) => Slot::Bound(term),
        };
        let (predicate, path) = match &pattern.verb {
            Verb::Resource(r) => (Slot::Bound(r.clone()), None),
            Verb::Path(r, modifier) => (Slot::Bound(r.clone()), Some(*modifier)),
            Verb::Variable(name) => match binding.get(name) {
                Some(Term::Resource(r)) => (Slot::Bound(r.clone()), None),
                Some(Term::Literal(_)) => return Vec::new(),
                None => (Slot::Free(name.clone()), None),
            },
        };
        let matches: Vec<(Resource, Resource, Term)> = match (path, &predicate) {
            (Some(modifier), Slot::Bound(p)) => self
                .path(subject.bound(), p, modifier, object.bound())
                .into_iter()
                .map(|(s, o)| (s, p.clone(), o))
                .collect(),
            _ => self
                .view
                .matching(subject.bound(), predicate.bound(), object.bound())
                .map(|t| (t.subject, t.predicate, t.object))
                .collect(),
        };
        matches
            .into_iter()
            .filter_map(|(s, p, o)| {
                let mut extended = binding.clone();
                if let Slot::Free(name) = &subject {
                    bind(&mut extended, name, Term::Resource(s))?;
                }
                if let Slot::Free(name) = &predicate {
                    bind(&mut extended, name, Term::Resource(p))?;
                }
                if let Slot::Free(name) = &object {
                    bind(&mut extended, name, o)?;
                }
                Some(extended)
            })
            .collect()
    }

    /// Pairs connected by a property path.
    fn path(
        &self,
        subject: Option<&Resource>,
        predicate: &Resource,
        modifier: PathModifier,
        object: Option<&Term>,
    ) -> Vec<(Resource, Term)> {
        match (subject, object) {
            (Some(s), _) => self
                .reach(&Term::Resource(s.clone()), predicate, modifier, true)
                .into_iter()
                .filter(|o| object.is_none_or(|wanted| wanted == o))
                .map(|o| (s.clone(), o))
                .collect(),
            (None, Some(o)) => self
                .reach(o, predicate, modifier, false)
                .into_iter()
                .filter_map(|s| match s {
                    Term::Resource(s) => Some((s, o.clone())),
                    Term::Literal(_) => None,
                })
                .collect(),
            (None, None) => {
                let mut starts: Vec<Resource> = Vec::new();
                let mut seen = HashSet::new();
                for triple in self.view.matching(None, Some(predicate), None) {
                    let mut candidates = vec![triple.subject];
                    if let Term::Resource(r) = triple.object {
                        candidates.push(r);
                    }
                    for candidate in candidates {
                        if seen.insert(candidate.clone()) {
                            starts.push(candidate);
                        }
                    }
                }
                starts
                    .into_iter()
                    .flat_map(|s| {
                        self.reach(&Term::Resource(s.clone()), predicate, modifier, true)
                            .into_iter()
                            .map(move |o| (s.clone(), o))
                    })
                    .collect()
            }
        }
    }

    /// Nodes reachable from `start` along the predicate, forwards or
    /// backwards, breadth first with a visited set.
    fn reach(
        &self,
        start: &Term,
        predicate: &Resource,
        modifier: PathModifier,
        forward: bool,
    ) -> Vec<Term> {
        let step = |node: &Term| -> Vec<Term> {
            if forward {
                match node {
                    Term::Resource(r) => self.view.objects(r, predicate),
                    Term::Literal(_) => Vec::new(),
                }
            } else {
                self.view
                    .subjects(predicate, node)
                    .into_iter()
                    .map(Term::Resource)
                    .collect()
            }
        };
        let mut reached = Vec::new();
        let mut visited: HashSet<Term> = HashSet::new();
        if modifier != PathModifier::OneOrMore {
            visited.insert(start.clone());
            reached.push(start.clone());
        }
        if modifier == PathModifier::ZeroOrOne {
            for next in step(start) {
                if visited.insert(next.clone()) {
                    reached.push(next);
                }
            }
            return reached;
        }
        let mut frontier = vec![start.clone()];
        while !frontier.is_empty() {
            let mut upcoming = Vec::new();
            for node in &frontier {
                for next in step(node) {
                    if visited.insert(next.clone()) {
                        reached.push(next.clone());
                        upcoming.push(next);
                    }
                }
            }
            frontier = upcoming;
        }
        reached
    }

    // ------------- Expressions -------------
    fn evaluate_expression(
        &self,
        expression: &Expression,
        binding: &Binding,
        members: Option<&[Binding]>,
    ) -> Option<Term> {
        let value = |e: &Expression| self.evaluate_expression(e, binding, members);
        match expression {
            Expression::Constant(term) => Some(term.clone()),
            Expression::Variable(name) => binding.get(name).cloned(),
            Expression::Or(a, b) => {
                let (a, b) = (effective_boolean(value(a)), effective_boolean(value(b)));
                match (a, b) {
                    (Some(true), _) | (_, Some(true)) => Some(boolean(true)),
                    (Some(false), Some(false)) => Some(boolean(false)),
                    _ => None,
                }
            }
            Expression::And(a, b) => {
                let (a, b) = (effective_boolean(value(a)), effective_boolean(value(b)));
                match (a, b) {
                    (Some(false), _) | (_, Some(false)) => Some(boolean(false)),
                    (Some(true), Some(true)) => Some(boolean(true)),
                    _ => None,
                }
            }
            Expression::Not(e) => effective_boolean(value(e)).map(|b| boolean(!b)),
            Expression::Negate(e) => {
                let literal = value(e)?.as_literal()?.clone();
                match literal.datatype() {
                    Datatype::Integer => {
                        let n = literal.lexical().parse::<i64>().ok()?;
                        Some(Term::Literal(Literal::integer(n.checked_neg()?)))
                    }
                    Datatype::Double => Some(Term::Literal(Literal::double(-literal.numeric_value()?))),
                    _ => None,
                }
            }
            Expression::Compare(comparison, a, b) => {
                let (a, b) = (value(a)?, value(b)?);
                compare(*comparison, &a, &b).map(boolean)
            }
            Expression::Arithmetic(operator, a, b) => {
                let (a, b) = (value(a)?, value(b)?);
                arithmetic(*operator, a.as_literal()?, b.as_literal()?).map(Term::Literal)
            }
            Expression::Cast(datatype, e) => cast(*datatype, &value(e)?).map(Term::Literal),
            Expression::Matches(e, regex) => {
                let text = value(e)?;
                Some(boolean(regex.is_match(text.as_literal()?.lexical())))
            }
            Expression::Call(function, arguments) => {
                self.call(*function, arguments, binding, members)
            }
            Expression::Exists(group) => {
                Some(boolean(!self.group(group, vec![binding.clone()]).is_empty()))
            }
            Expression::NotExists(group) => {
                Some(boolean(self.group(group, vec![binding.clone()]).is_empty()))
            }
            Expression::Count { distinct, argument } => {
                let members = members?;
                let count = match argument {
                    None if *distinct => {
                        let unique: HashSet<Vec<(&String, &Term)>> =
                            members.iter().map(canonical).collect();
                        unique.len()
                    }
                    None => members.len(),
                    Some(argument) => {
                        let values = members
                            .iter()
                            .filter_map(|member| self.evaluate_expression(argument, member, None));
                        if *distinct {
                            values.collect::<HashSet<Term>>().len()
                        } else {
                            values.count()
                        }
                    }
                };
                Some(Term::Literal(Literal::integer(count as i64)))
            }
        }
    }

    fn call(
        &self,
        function: Function,
        arguments: &[Expression],
        binding: &Binding,
        members: Option<&[Binding]>,
    ) -> Option<Term> {
        if let (Function::Bound, [Expression::Variable(name)]) = (function, arguments) {
            return Some(boolean(binding.contains_key(name)));
        }
        let values: Vec<Term> = arguments
            .iter()
            .map(|a| self.evaluate_expression(a, binding, members))
            .collect::<Option<Vec<Term>>>()?;
        let text = |index: usize| {
            values
                .get(index)
                .and_then(|t| t.as_literal())
                .map(|l| l.lexical())
        };
        let result = match function {
            Function::Bound => return None,
            Function::Str => Term::Literal(Literal::string(values.first()?.value())),
            Function::Lcase => Term::Literal(Literal::string(text(0)?.to_lowercase())),
            Function::Ucase => Term::Literal(Literal::string(text(0)?.to_uppercase())),
            Function::Strlen => Term::Literal(Literal::integer(text(0)?.chars().count() as i64)),
            Function::Contains => boolean(text(0)?.contains(text(1)?)),
            Function::StrStarts => boolean(text(0)?.starts_with(text(1)?)),
            Function::StrEnds => boolean(text(0)?.ends_with(text(1)?)),
            Function::IsIri => boolean(matches!(values.first()?, Term::Resource(Resource::Named(_)))),
            Function::IsBlank => boolean(matches!(values.first()?, Term::Resource(Resource::Blank(_)))),
            Function::IsLiteral => boolean(matches!(values.first()?, Term::Literal(_))),
            Function::Abs => {
                let literal = values.first()?.as_literal()?;
                match literal.datatype() {
                    Datatype::Integer => Term::Literal(Literal::integer(
                        literal.lexical().parse::<i64>().ok()?.checked_abs()?,
                    )),
                    Datatype::Double => Term::Literal(Literal::double(literal.numeric_value()?.abs())),
                    _ => return None,
                }
            }
            Function::SameTerm => boolean(values.first()? == values.get(1)?),
        };
        Some(result)
    }
}

// ------------- Helpers -------------
enum Resolved {
    Free(String),
    Bound(Term),
}

fn resolve(pattern: &TermPattern, binding: &Binding) -> Resolved {
    match pattern {
        TermPattern::Term(term) => Resolved::Bound(term.clone()),
        TermPattern::Variable(name) => match binding.get(name) {
            Some(term) => Resolved::Bound(term.clone()),
            None => Resolved::Free(name.clone()),
        },
    }
}

enum Slot<T> {
    Free(String),
    Bound(T),
}

impl<T> Slot<T> {
    fn bound(&self) -> Option<&T> {
        match self {
            Slot::Bound(value) => Some(value),
            Slot::Free(_) => None,
        }
    }
}

/// Binds a variable, failing when the same variable was already bound to
/// something else earlier in the same pattern.
fn bind(binding: &mut Binding, name: &str, value: Term) -> Option<()> {
    match binding.get(name) {
        Some(existing) if *existing != value => None,
        Some(_) => Some(()),
        None => {
            binding.insert(name.to_string(), value);
            Some(())
        }
    }
}

fn boolean(value: bool) -> Term {
    Term::Literal(Literal::boolean(value))
}

fn canonical(binding: &Binding) -> Vec<(&String, &Term)> {
    let mut entries: Vec<(&String, &Term)> = binding.iter().collect();
    entries.sort();
    entries
}

/// Groups solutions by the values of the grouping variables, in order of
/// first appearance. Without grouping variables everything forms a single
/// group, even when there are no solutions at all.
fn aggregate(solutions: Vec<Binding>, group_by: &[String]) -> Vec<(Binding, Vec<Binding>)> {
    if group_by.is_empty() {
        return vec![(Binding::default(), solutions)];
    }
    let mut index: HashMap<Vec<Option<Term>>, usize> = HashMap::new();
    let mut groups: Vec<(Binding, Vec<Binding>)> = Vec::new();
    for solution in solutions {
        let key: Vec<Option<Term>> = group_by.iter().map(|v| solution.get(v).cloned()).collect();
        let position = *index.entry(key).or_insert_with_key(|key| {
            let mut binding = Binding::default();
            for (name, value) in group_by.iter().zip(key) {
                if let Some(value) = value {
                    binding.insert(name.clone(), value.clone());
                }
            }
            groups.push((binding, Vec::new()));
            groups.len() - 1
        });
        groups[position].1.push(solution);
    }
    groups
}

/// The effective boolean value of a term, `None` when it has none.
pub fn effective_boolean(term: Option<Term>) -> Option<bool> {
    let literal = match term? {
        Term::Literal(literal) => literal,
        Term::Resource(_) => return None,
    };
    match literal.datatype() {
        Datatype::Boolean => literal.boolean_value(),
        Datatype::Integer | Datatype::Double => {
            literal.numeric_value().map(|n| n != 0.0 && !n.is_nan())
        }
        Datatype::String => Some(!literal.lexical().is_empty()),
    }
}

/// Orders two literals by value. Numbers compare numerically; a string
/// compared with a number is read by its leading numeric prefix, so
/// `"1.9.0"` sorts below `2.0` and `"unknown"` has no order against it.
pub fn compare_literals(a: &Literal, b: &Literal) -> Option<Ordering> {
    match (a.datatype(), b.datatype()) {
        (x, y) if x.is_numeric() && y.is_numeric() => {
            a.numeric_value()?.partial_cmp(&b.numeric_value()?)
        }
        (Datatype::String, y) if y.is_numeric() => {
            leading_number(a.lexical())?.partial_cmp(&b.numeric_value()?)
        }
        (x, Datatype::String) if x.is_numeric() => {
            a.numeric_value()?.partial_cmp(&leading_number(b.lexical())?)
        }
        (Datatype::String, Datatype::String) => Some(a.lexical().cmp(b.lexical())),
        (Datatype::Boolean, Datatype::Boolean) => {
            Some(a.boolean_value()?.cmp(&b.boolean_value()?))
        }
        _ => None,
    }
}

fn compare(comparison: Comparison, a: &Term, b: &Term) -> Option<bool> {
    let ordering = match (a, b) {
        (Term::Literal(x), Term::Literal(y)) => compare_literals(x, y),
        _ => None,
    };
    match comparison {
        Comparison::Equal | Comparison::NotEqual => {
            let equal = match ordering {
                Some(ordering) => ordering == Ordering::Equal,
                None => match (a, b) {
                    // literals without a common order are only equal when identical
                    (Term::Literal(_), Term::Literal(_)) if a != b => return None,
                    _ => a == b,
                },
            };
            Some(if comparison == Comparison::Equal { equal } else { !equal })
        }
        Comparison::Less => ordering.map(|o| o == Ordering::Less),
        Comparison::LessOrEqual => ordering.map(|o| o != Ordering::Greater),
        Comparison::Greater => ordering.map(|o| o == Ordering::Greater),
        Comparison::GreaterOrEqual => ordering.map(|o| o != Ordering::Less),
    }
}

fn arithmetic(operator: Operator, a: &Literal, b: &Literal) -> Option<Literal> {
    if a.datatype() == Datatype::Integer
        && b.datatype() == Datatype::Integer
        && operator != Operator::Divide
    {
        let (x, y) = (a.lexical().parse::<i64>().ok()?, b.lexical().parse::<i64>().ok()?);
        let result = match operator {
            Operator::Add => x.checked_add(y)?,
            Operator::Subtract => x.checked_sub(y)?,
            _ => x.checked_mul(y)?,
        };
        return Some(Literal::integer(result));
    }
    let (x, y) = (a.numeric_value()?, b.numeric_value()?);
    let result = match operator {
        Operator::Add => x + y,
        Operator::Subtract => x - y,
        Operator::Multiply => x * y,
        Operator::Divide if y == 0.0 => return None,
        Operator::Divide => x / y,
    };
    Some(Literal::double(result))
}

/// Casts the way the xsd constructor functions do. Strings become numbers by
/// their leading numeric prefix; anything that does not convert has no value.
fn cast(datatype: Datatype, term: &Term) -> Option<Literal> {
    match datatype {
        Datatype::String => Some(Literal::string(term.value())),
        Datatype::Double => Some(Literal::double(term.as_literal()?.as_double()?)),
        Datatype::Integer => {
            let value = term.as_literal()?.as_double()?;
            if !value.is_finite() {
                return None;
            }
            Some(Literal::integer(value.trunc() as i64))
        }
        Datatype::Boolean => {
            let literal = term.as_literal()?;
            match literal.datatype() {
                Datatype::Boolean => literal.boolean_value().map(Literal::boolean),
                Datatype::String => parse_boolean(literal.lexical()).map(Literal::boolean),
                _ => literal.numeric_value().map(|n| Literal::boolean(n != 0.0)),
            }
        }
    }
}

/// Sort order for ORDER BY: unbound first, then blank nodes, IRIs and
/// literals. Numeric literals sort by value ahead of all other literals,
/// which sort by lexical form and then datatype.
pub fn order_terms(a: Option<&Term>, b: Option<&Term>) -> Ordering {
    fn rank(term: Option<&Term>) -> u8 {
        match term {
            None => 0,
            Some(Term::Resource(Resource::Blank(_))) => 1,
            Some(Term::Resource(Resource::Named(_))) => 2,
            Some(Term::Literal(_)) => 3,
        }
    }
    match (a, b) {
        (Some(Term::Literal(x)), Some(Term::Literal(y))) => {
            let number = |l: &Literal| l.numeric_value().filter(|_| l.is_numeric());
            match (number(x), number(y)) {
                (Some(m), Some(n)) => m.total_cmp(&n),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => x
                    .lexical()
                    .cmp(y.lexical())
                    .then_with(|| x.datatype().cmp(&y.datatype())),
            }
        }
        (Some(Term::Resource(x)), Some(Term::Resource(y))) if rank(a) == rank(b) => {
            x.as_str().cmp(y.as_str())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}
