//! Parsing of query text into a [`Query`] tree.
//!
//! The grammar lives in `query.pest`. Parsing happens in two steps: pest
//! checks the syntax, then the pair tree is walked into the AST while prefixes
//! are expanded, literals are validated, functions are resolved and the
//! placement of aggregates is checked. Both steps report problems as
//! [`NetcladError::QuerySyntax`] carrying a line and column.

use std::collections::HashMap;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use regex::Regex;

use crate::construct::{Literal, OtherHasher, Resource, Term};
use crate::datatype::Datatype;
use crate::error::{NetcladError, Result};
use crate::vocabulary::{OWL, RDF, RDF_TYPE, RDFS, XSD};

#[derive(Parser)]
#[grammar = "query.pest"]
struct QueryParser;

// ------------- AST -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermPattern {
    Variable(String),
    Term(Term),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathModifier {
    ZeroOrMore,
    OneOrMore,
    ZeroOrOne,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Variable(String),
    Resource(Resource),
    Path(Resource, PathModifier),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: TermPattern,
    pub verb: Verb,
    pub object: TermPattern,
}

#[derive(Debug, Clone)]
pub enum GroupElement {
    Triple(TriplePattern),
    Optional(GroupPattern),
    Filter(Expression),
    Bind(Expression, String),
}

#[derive(Debug, Clone, Default)]
pub struct GroupPattern {
    pub elements: Vec<GroupElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Bound,
    Str,
    Lcase,
    Ucase,
    Strlen,
    Contains,
    StrStarts,
    StrEnds,
    IsIri,
    IsLiteral,
    IsBlank,
    Abs,
    SameTerm,
}

impl Function {
    fn resolve(name: &str) -> Option<(Function, usize)> {
        let resolved = match name.to_ascii_uppercase().as_str() {
            "BOUND" => (Function::Bound, 1),
            "STR" => (Function::Str, 1),
            "LCASE" => (Function::Lcase, 1),
            "UCASE" => (Function::Ucase, 1),
            "STRLEN" => (Function::Strlen, 1),
            "CONTAINS" => (Function::Contains, 2),
            "STRSTARTS" => (Function::StrStarts, 2),
            "STRENDS" => (Function::StrEnds, 2),
            "ISIRI" | "ISURI" => (Function::IsIri, 1),
            "ISLITERAL" => (Function::IsLiteral, 1),
            "ISBLANK" => (Function::IsBlank, 1),
            "ABS" => (Function::Abs, 1),
            "SAMETERM" => (Function::SameTerm, 2),
            _ => return None,
        };
        Some(resolved)
    }
}

#[derive(Debug, Clone)]
pub enum Expression {
    Constant(Term),
    Variable(String),
    Or(Box<Expression>, Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    Negate(Box<Expression>),
    Compare(Comparison, Box<Expression>, Box<Expression>),
    Arithmetic(Operator, Box<Expression>, Box<Expression>),
    Call(Function, Vec<Expression>),
    Cast(Datatype, Box<Expression>),
    Matches(Box<Expression>, Regex),
    Exists(GroupPattern),
    NotExists(GroupPattern),
    Count { distinct: bool, argument: Option<Box<Expression>> },
}

impl Expression {
    pub fn has_aggregate(&self) -> bool {
        match self {
            Expression::Count { .. } => true,
            Expression::Or(a, b)
            | Expression::And(a, b)
            | Expression::Compare(_, a, b)
            | Expression::Arithmetic(_, a, b) => a.has_aggregate() || b.has_aggregate(),
            Expression::Not(e) | Expression::Negate(e) | Expression::Cast(_, e) => {
                e.has_aggregate()
            }
            Expression::Matches(e, _) => e.has_aggregate(),
            Expression::Call(_, args) => args.iter().any(|a| a.has_aggregate()),
            Expression::Constant(_)
            | Expression::Variable(_)
            | Expression::Exists(_)
            | Expression::NotExists(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectionItem {
    pub variable: String,
    pub expression: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct OrderCondition {
    pub expression: Expression,
    pub descending: bool,
}

#[derive(Debug, Clone)]
pub struct Query {
    pub distinct: bool,
    /// `None` stands for `SELECT *`.
    pub projection: Option<Vec<ProjectionItem>>,
    pub pattern: GroupPattern,
    pub group_by: Vec<String>,
    pub having: Vec<Expression>,
    pub order_by: Vec<OrderCondition>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Query {
    /// Whether the solutions are grouped before projection.
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty()
            || !self.having.is_empty()
            || self.projection.iter().flatten().any(|item| {
                item.expression.as_ref().is_some_and(|e| e.has_aggregate())
            })
    }
    /// The variables bound by the pattern, in order of first appearance.
    pub fn pattern_variables(&self) -> Vec<String> {
        let mut variables = Vec::new();
        collect_variables(&self.pattern, &mut variables);
        variables
    }
}

fn collect_variables(group: &GroupPattern, variables: &mut Vec<String>) {
    let mut note = |name: &String| {
        if !is_hidden(name) && !variables.contains(name) {
            variables.push(name.clone());
        }
    };
    let mut nested = Vec::new();
    for element in &group.elements {
        match element {
            GroupElement::Triple(triple) => {
                if let TermPattern::Variable(v) = &triple.subject {
                    note(v);
                }
                if let Verb::Variable(v) = &triple.verb {
                    note(v);
                }
                if let TermPattern::Variable(v) = &triple.object {
                    note(v);
                }
            }
            GroupElement::Bind(_, v) => note(v),
            GroupElement::Optional(inner) => nested.push(inner),
            GroupElement::Filter(_) => (),
        }
    }
    for inner in nested {
        collect_variables(inner, variables);
    }
}

/// Blank nodes in patterns act as variables that are never projected.
pub fn is_hidden(variable: &str) -> bool {
    variable.starts_with("_:")
}

// ------------- Parsing -------------
/// Parses query text into a [`Query`].
pub fn parse(text: &str) -> Result<Query> {
    let mut pairs = QueryParser::parse(Rule::query, text).map_err(|e| {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos(position) => position,
            pest::error::LineColLocation::Span(start, _) => start,
        };
        NetcladError::syntax(e.variant.message().to_string(), (line, col))
    })?;
    let query = pairs
        .next()
        .ok_or_else(|| NetcladError::syntax("empty query", (1, 1)))?;
    Builder::new().query(query)
}

fn position(pair: &Pair<Rule>) -> (usize, usize) {
    pair.as_span().start_pos().line_col()
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_prefix
            | Rule::kw_select
            | Rule::kw_where
            | Rule::kw_as
            | Rule::kw_optional
            | Rule::kw_filter
            | Rule::kw_bind
            | Rule::kw_not
            | Rule::kw_exists
            | Rule::kw_count
            | Rule::kw_group
            | Rule::kw_by
            | Rule::kw_having
            | Rule::kw_order
            | Rule::kw_limit
            | Rule::kw_offset
            | Rule::EOI
    )
}

fn significant(pair: Pair<Rule>) -> impl Iterator<Item = Pair<Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

fn unexpected(pair: &Pair<Rule>) -> NetcladError {
    NetcladError::syntax(format!("unexpected '{}'", pair.as_str()), position(pair))
}

fn next_pair<'i>(
    pairs: &mut impl Iterator<Item = Pair<'i, Rule>>,
    parent: &Pair<'i, Rule>,
) -> Result<Pair<'i, Rule>> {
    pairs.next().ok_or_else(|| {
        NetcladError::syntax(format!("incomplete '{}'", parent.as_str()), position(parent))
    })
}

fn unescape(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}

struct Builder {
    prefixes: HashMap<String, String, OtherHasher>,
    aggregates_allowed: bool,
}

impl Builder {
    fn new() -> Self {
        let mut prefixes = HashMap::default();
        for (prefix, namespace) in [("rdf", RDF), ("rdfs", RDFS), ("owl", OWL), ("xsd", XSD)] {
            prefixes.insert(prefix.to_string(), namespace.to_string());
        }
        Self { prefixes, aggregates_allowed: false }
    }

    fn query(mut self, pair: Pair<Rule>) -> Result<Query> {
        let mut query = Query {
            distinct: false,
            projection: None,
            pattern: GroupPattern::default(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: 0,
        };
        let mut select = None;
        for part in significant(pair) {
            match part.as_rule() {
                Rule::prefix_decl => self.prefix(part)?,
                // checking the projection needs the GROUP BY clause, so it is built last
                Rule::select_clause => select = Some(part),
                Rule::group_pattern => query.pattern = self.group(part)?,
                Rule::solution_modifier => self.modifiers(part, &mut query)?,
                _ => return Err(unexpected(&part)),
            }
        }
        if let Some(select) = select {
            self.select(select, &mut query)?;
        }
        Ok(query)
    }

    fn prefix(&mut self, pair: Pair<Rule>) -> Result<()> {
        let mut parts = significant(pair.clone());
        let name = next_pair(&mut parts, &pair)?;
        let namespace = next_pair(&mut parts, &pair)?;
        let prefix = name.as_str().trim_end_matches(':').to_string();
        let iri = namespace.as_str();
        self.prefixes.insert(prefix, iri[1..iri.len() - 1].to_string());
        Ok(())
    }

    fn select(&mut self, pair: Pair<Rule>, query: &mut Query) -> Result<()> {
        let at = position(&pair);
        let mut items = Vec::new();
        let mut all = false;
        for part in significant(pair) {
            match part.as_rule() {
                Rule::distinct => query.distinct = true,
                Rule::star => all = true,
                Rule::projection_item => items.push(self.projection_item(part)?),
                _ => return Err(unexpected(&part)),
            }
        }
        if !all {
            query.projection = Some(items);
        }
        if query.is_aggregate() {
            let Some(items) = &query.projection else {
                return Err(NetcladError::syntax(
                    "SELECT * cannot be combined with grouping",
                    at,
                ));
            };
            for item in items {
                if item.expression.is_none() && !query.group_by.contains(&item.variable) {
                    return Err(NetcladError::syntax(
                        format!(
                            "?{} is projected but neither grouped nor aggregated",
                            item.variable
                        ),
                        at,
                    ));
                }
            }
        }
        Ok(())
    }

    fn projection_item(&mut self, pair: Pair<Rule>) -> Result<ProjectionItem> {
        let mut parts = significant(pair.clone());
        let first = next_pair(&mut parts, &pair)?;
        match first.as_rule() {
            Rule::var => Ok(ProjectionItem { variable: variable(&first), expression: None }),
            Rule::expression => {
                self.aggregates_allowed = true;
                let expression = self.expression(first);
                self.aggregates_allowed = false;
                let name = next_pair(&mut parts, &pair)?;
                Ok(ProjectionItem { variable: variable(&name), expression: Some(expression?) })
            }
            _ => Err(unexpected(&first)),
        }
    }

    fn group(&mut self, pair: Pair<Rule>) -> Result<GroupPattern> {
        let mut group = GroupPattern::default();
        for part in significant(pair) {
            match part.as_rule() {
                Rule::triples_same_subject => self.triples(part, &mut group)?,
                Rule::optional_pattern => {
                    let mut inner = significant(part.clone());
                    let pattern = next_pair(&mut inner, &part)?;
                    group.elements.push(GroupElement::Optional(self.group(pattern)?));
                }
                Rule::filter => {
                    let mut inner = significant(part.clone());
                    let constraint = next_pair(&mut inner, &part)?;
                    group.elements.push(GroupElement::Filter(self.expression(constraint)?));
                }
                Rule::bind => {
                    let mut inner = significant(part.clone());
                    let expression = self.expression(next_pair(&mut inner, &part)?)?;
                    let name = next_pair(&mut inner, &part)?;
                    group.elements.push(GroupElement::Bind(expression, variable(&name)));
                }
                _ => return Err(unexpected(&part)),
            }
        }
        Ok(group)
    }

    fn triples(&mut self, pair: Pair<Rule>, group: &mut GroupPattern) -> Result<()> {
        let mut parts = significant(pair.clone());
        let subject = self.term_pattern(next_pair(&mut parts, &pair)?)?;
        for verb_objects in parts {
            let mut inner = significant(verb_objects.clone());
            let verb = self.verb(next_pair(&mut inner, &verb_objects)?)?;
            for object in inner {
                group.elements.push(GroupElement::Triple(TriplePattern {
                    subject: subject.clone(),
                    verb: verb.clone(),
                    object: self.term_pattern(object)?,
                }));
            }
        }
        Ok(())
    }

    fn verb(&mut self, pair: Pair<Rule>) -> Result<Verb> {
        let mut parts = pair.clone().into_inner();
        let inner = next_pair(&mut parts, &pair)?;
        match inner.as_rule() {
            Rule::var => Ok(Verb::Variable(variable(&inner))),
            Rule::kw_a => Ok(Verb::Resource(Resource::named(RDF_TYPE))),
            Rule::path => {
                let mut path = inner.clone().into_inner();
                let predicate = self.iri(next_pair(&mut path, &inner)?)?;
                match path.next().map(|m| m.as_str().to_string()) {
                    None => Ok(Verb::Resource(predicate)),
                    Some(modifier) => {
                        let modifier = match modifier.as_str() {
                            "*" => PathModifier::ZeroOrMore,
                            "+" => PathModifier::OneOrMore,
                            _ => PathModifier::ZeroOrOne,
                        };
                        Ok(Verb::Path(predicate, modifier))
                    }
                }
            }
            _ => Err(unexpected(&inner)),
        }
    }

    /// Subjects and objects.
    fn term_pattern(&mut self, pair: Pair<Rule>) -> Result<TermPattern> {
        let mut parts = pair.clone().into_inner();
        let inner = next_pair(&mut parts, &pair)?;
        match inner.as_rule() {
            Rule::var => Ok(TermPattern::Variable(variable(&inner))),
            Rule::blank_node => Ok(TermPattern::Variable(inner.as_str().to_string())),
            Rule::iri => Ok(TermPattern::Term(Term::Resource(self.iri(inner)?))),
            Rule::literal => Ok(TermPattern::Term(Term::Literal(self.literal(inner)?))),
            _ => Err(unexpected(&inner)),
        }
    }

    fn iri(&self, pair: Pair<Rule>) -> Result<Resource> {
        let at = position(&pair);
        let inner = match pair.as_rule() {
            Rule::iri => {
                let mut parts = pair.clone().into_inner();
                next_pair(&mut parts, &pair)?
            }
            _ => pair,
        };
        let text = inner.as_str();
        match inner.as_rule() {
            Rule::iri_ref => Ok(Resource::named(&text[1..text.len() - 1])),
            Rule::prefixed_name => {
                let (prefix, local) = text.split_once(':').unwrap_or((text, ""));
                let namespace = self.prefixes.get(prefix).ok_or_else(|| {
                    NetcladError::syntax(format!("undeclared prefix '{}:'", prefix), at)
                })?;
                Ok(Resource::named(format!("{}{}", namespace, local)))
            }
            _ => Err(unexpected(&inner)),
        }
    }

    fn literal(&self, pair: Pair<Rule>) -> Result<Literal> {
        let at = position(&pair);
        let mut parts = pair.clone().into_inner();
        let inner = next_pair(&mut parts, &pair)?;
        match inner.as_rule() {
            Rule::typed_string => {
                let mut typed = inner.clone().into_inner();
                let string = next_pair(&mut typed, &inner)?;
                let mut quoted = string.clone().into_inner();
                let lexical = unescape(next_pair(&mut quoted, &string)?.as_str());
                match typed.next() {
                    None => Ok(Literal::string(lexical)),
                    Some(datatype) => {
                        let uri = self.iri(datatype)?;
                        let datatype = Datatype::from_uri(uri.as_str()).ok_or_else(|| {
                            NetcladError::syntax(format!("unsupported datatype {}", uri), at)
                        })?;
                        Literal::new(lexical, datatype)
                            .map_err(|e| NetcladError::syntax(e.to_string(), at))
                    }
                }
            }
            Rule::numeric => {
                let text = inner.as_str();
                let datatype = if text.contains(['.', 'e', 'E']) {
                    Datatype::Double
                } else {
                    Datatype::Integer
                };
                Literal::new(text.trim_start_matches('+'), datatype)
                    .map_err(|e| NetcladError::syntax(e.to_string(), at))
            }
            Rule::boolean => Ok(Literal::boolean(inner.as_str() == "true")),
            _ => Err(unexpected(&inner)),
        }
    }

    fn expression(&mut self, pair: Pair<Rule>) -> Result<Expression> {
        let at = position(&pair);
        match pair.as_rule() {
            Rule::expression | Rule::and_expression => {
                let mut parts = pair.clone().into_inner();
                let mut left = self.expression(next_pair(&mut parts, &pair)?)?;
                while let Some(op) = parts.next() {
                    let right = self.expression(next_pair(&mut parts, &pair)?)?;
                    left = match op.as_rule() {
                        Rule::or_op => Expression::Or(Box::new(left), Box::new(right)),
                        _ => Expression::And(Box::new(left), Box::new(right)),
                    };
                }
                Ok(left)
            }
            Rule::relational => {
                let mut parts = pair.clone().into_inner();
                let left = self.expression(next_pair(&mut parts, &pair)?)?;
                let Some(op) = parts.next() else {
                    return Ok(left);
                };
                let right = self.expression(next_pair(&mut parts, &pair)?)?;
                let comparison = match op.as_str() {
                    "=" => Comparison::Equal,
                    "!=" => Comparison::NotEqual,
                    "<" => Comparison::Less,
                    "<=" => Comparison::LessOrEqual,
                    ">" => Comparison::Greater,
                    _ => Comparison::GreaterOrEqual,
                };
                Ok(Expression::Compare(comparison, Box::new(left), Box::new(right)))
            }
            Rule::additive | Rule::multiplicative => {
                let mut parts = pair.clone().into_inner();
                let mut left = self.expression(next_pair(&mut parts, &pair)?)?;
                while let Some(op) = parts.next() {
                    let right = self.expression(next_pair(&mut parts, &pair)?)?;
                    let operator = match op.as_str() {
                        "+" => Operator::Add,
                        "-" => Operator::Subtract,
                        "*" => Operator::Multiply,
                        _ => Operator::Divide,
                    };
                    left = Expression::Arithmetic(operator, Box::new(left), Box::new(right));
                }
                Ok(left)
            }
            Rule::unary => {
                let mut parts = pair.clone().into_inner();
                let first = next_pair(&mut parts, &pair)?;
                if first.as_rule() != Rule::unary_op {
                    return self.expression(first);
                }
                let operand = self.expression(next_pair(&mut parts, &pair)?)?;
                Ok(match first.as_str() {
                    "!" => Expression::Not(Box::new(operand)),
                    "-" => Expression::Negate(Box::new(operand)),
                    _ => operand,
                })
            }
            Rule::bracketted => {
                let mut parts = pair.clone().into_inner();
                self.expression(next_pair(&mut parts, &pair)?)
            }
            Rule::var => Ok(Expression::Variable(variable(&pair))),
            Rule::literal => Ok(Expression::Constant(Term::Literal(self.literal(pair)?))),
            Rule::iri => Ok(Expression::Constant(Term::Resource(self.iri(pair)?))),
            Rule::not_exists | Rule::exists => {
                let negated = pair.as_rule() == Rule::not_exists;
                let mut parts = significant(pair.clone());
                let group = self.group(next_pair(&mut parts, &pair)?)?;
                Ok(if negated { Expression::NotExists(group) } else { Expression::Exists(group) })
            }
            Rule::aggregate => {
                if !self.aggregates_allowed {
                    return Err(NetcladError::syntax(
                        "COUNT is only allowed in SELECT, HAVING and ORDER BY",
                        at,
                    ));
                }
                let mut distinct = false;
                let mut argument = None;
                self.aggregates_allowed = false;
                for part in significant(pair) {
                    match part.as_rule() {
                        Rule::distinct => distinct = true,
                        Rule::star => (),
                        _ => argument = Some(Box::new(self.expression(part)?)),
                    }
                }
                self.aggregates_allowed = true;
                Ok(Expression::Count { distinct, argument })
            }
            Rule::function_call => {
                let mut parts = pair.clone().into_inner();
                let name = self.iri(next_pair(&mut parts, &pair)?)?;
                let mut arguments = self.arguments(next_pair(&mut parts, &pair)?)?;
                let datatype = Datatype::from_uri(name.as_str()).ok_or_else(|| {
                    NetcladError::syntax(format!("unknown function {}", name), at)
                })?;
                if arguments.len() != 1 {
                    return Err(NetcladError::syntax(
                        format!("{} takes exactly one argument", datatype),
                        at,
                    ));
                }
                Ok(Expression::Cast(datatype, Box::new(arguments.remove(0))))
            }
            Rule::builtin_call => {
                let mut parts = pair.clone().into_inner();
                let name = next_pair(&mut parts, &pair)?.as_str().to_string();
                let arguments = self.arguments(next_pair(&mut parts, &pair)?)?;
                self.builtin(&name, arguments, at)
            }
            _ => Err(unexpected(&pair)),
        }
    }

    fn arguments(&mut self, pair: Pair<Rule>) -> Result<Vec<Expression>> {
        pair.into_inner().map(|argument| self.expression(argument)).collect()
    }

    fn builtin(
        &self,
        name: &str,
        mut arguments: Vec<Expression>,
        at: (usize, usize),
    ) -> Result<Expression> {
        if name.eq_ignore_ascii_case("REGEX") {
            if !(2..=3).contains(&arguments.len()) {
                return Err(NetcladError::syntax("REGEX takes two or three arguments", at));
            }
            let flags = match arguments.get(2) {
                Some(Expression::Constant(Term::Literal(flags))) => flags.lexical().to_string(),
                Some(_) => {
                    return Err(NetcladError::syntax("REGEX flags must be a string", at));
                }
                None => String::new(),
            };
            let pattern = match &arguments[1] {
                Expression::Constant(Term::Literal(pattern)) => pattern.lexical().to_string(),
                _ => return Err(NetcladError::syntax("REGEX pattern must be a string", at)),
            };
            let source = if flags.is_empty() { pattern } else { format!("(?{}){}", flags, pattern) };
            let regex = Regex::new(&source)
                .map_err(|e| NetcladError::syntax(format!("invalid regular expression: {}", e), at))?;
            arguments.truncate(1);
            return Ok(Expression::Matches(Box::new(arguments.remove(0)), regex));
        }
        let (function, arity) = Function::resolve(name)
            .ok_or_else(|| NetcladError::syntax(format!("unknown function {}", name), at))?;
        if arguments.len() != arity {
            return Err(NetcladError::syntax(
                format!("{} takes {} argument(s)", name.to_ascii_uppercase(), arity),
                at,
            ));
        }
        if function == Function::Bound && !matches!(arguments[0], Expression::Variable(_)) {
            return Err(NetcladError::syntax("BOUND takes a variable", at));
        }
        Ok(Expression::Call(function, arguments))
    }

    fn modifiers(&mut self, pair: Pair<Rule>, query: &mut Query) -> Result<()> {
        for clause in pair.into_inner() {
            match clause.as_rule() {
                Rule::group_clause => {
                    query.group_by = significant(clause).map(|v| variable(&v)).collect();
                }
                Rule::having_clause => {
                    self.aggregates_allowed = true;
                    let having: Result<Vec<Expression>> =
                        significant(clause).map(|c| self.expression(c)).collect();
                    self.aggregates_allowed = false;
                    query.having = having?;
                }
                Rule::order_clause => {
                    self.aggregates_allowed = true;
                    let order: Result<Vec<OrderCondition>> =
                        significant(clause).map(|c| self.order_condition(c)).collect();
                    self.aggregates_allowed = false;
                    query.order_by = order?;
                }
                Rule::limit_clause => query.limit = Some(count(clause)?),
                Rule::offset_clause => query.offset = count(clause)?,
                _ => return Err(unexpected(&clause)),
            }
        }
        Ok(())
    }

    fn order_condition(&mut self, pair: Pair<Rule>) -> Result<OrderCondition> {
        let mut descending = false;
        let mut expression = None;
        for part in pair.clone().into_inner() {
            match part.as_rule() {
                Rule::asc => descending = false,
                Rule::desc => descending = true,
                _ => expression = Some(self.expression(part)?),
            }
        }
        let expression = expression.ok_or_else(|| unexpected(&pair))?;
        Ok(OrderCondition { expression, descending })
    }
}

fn variable(pair: &Pair<Rule>) -> String {
    pair.as_str()[1..].to_string()
}

fn count(clause: Pair<Rule>) -> Result<usize> {
    let at = position(&clause);
    let number = significant(clause)
        .next()
        .ok_or_else(|| NetcladError::syntax("missing number", at))?;
    number
        .as_str()
        .parse::<usize>()
        .map_err(|e| NetcladError::syntax(e.to_string(), position(&number)))
}
