use crate::value::format_number;
use std::fmt;

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    Text(String),
    /// `$name`, read from the context's variables at evaluation time.
    Variable(String),
}

impl Operand {
    pub fn parse(atom: &str) -> Self {
        if let Some(name) = atom.strip_prefix('$').filter(|n| !n.is_empty()) {
            return Operand::Variable(name.to_string());
        }
        match atom.parse::<f64>() {
            Ok(n) => Operand::Number(n),
            Err(_) => Operand::Text(atom.to_string()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Number(n) => write!(f, "{}", format_number(*n)),
            Operand::Text(s) => write!(f, "{}", s),
            Operand::Variable(name) => write!(f, "${}", name),
        }
    }
}

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    // Logical
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),

    // Comparison
    Equal(Operand, Operand),
    NotEqual(Operand, Operand),
    GreaterThan(Operand, Operand),
    GreaterThanOrEqual(Operand, Operand),
    SmallerThan(Operand, Operand),
    SmallerThanOrEqual(Operand, Operand),

    // Leaf nodes
    Literal(bool),
    /// `random(N%)`: true with N percent probability.
    Chance(f64),
    /// A host-specific check, delegated to the fallback evaluator.
    Predicate(String),
}

impl Condition {
    fn precedence(&self) -> u8 {
        match self {
            Condition::Or(..) => 1,
            Condition::And(..) => 2,
            Condition::Not(_) => 3,
            Condition::Equal(..)
            | Condition::NotEqual(..)
            | Condition::GreaterThan(..)
            | Condition::GreaterThanOrEqual(..)
            | Condition::SmallerThan(..)
            | Condition::SmallerThanOrEqual(..) => 4,
            Condition::Literal(_) | Condition::Chance(_) | Condition::Predicate(_) => 5,
        }
    }

    /// Host predicates referenced anywhere in the expression.
    pub fn predicates(&self) -> Vec<&str> {
        let mut found = Vec::new();
        self.collect_predicates(&mut found);
        found
    }

    fn collect_predicates<'a>(&'a self, found: &mut Vec<&'a str>) {
        match self {
            Condition::Predicate(p) => found.push(p),
            Condition::Not(c) => c.collect_predicates(found),
            Condition::And(l, r) | Condition::Or(l, r) => {
                l.collect_predicates(found);
                r.collect_predicates(found);
            }
            _ => {}
        }
    }

    fn fmt_child(&self, child: &Condition, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if child.precedence() < self.precedence() {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let comparison = |f: &mut fmt::Formatter<'_>, l: &Operand, op: &str, r: &Operand| {
            write!(f, "{} {} {}", l, op, r)
        };
        match self {
            Condition::Not(c) => {
                write!(f, "NOT ")?;
                self.fmt_child(c, f)
            }
            Condition::And(l, r) => {
                self.fmt_child(l, f)?;
                write!(f, " AND ")?;
                self.fmt_child(r, f)
            }
            Condition::Or(l, r) => {
                self.fmt_child(l, f)?;
                write!(f, " OR ")?;
                self.fmt_child(r, f)
            }
            Condition::Equal(l, r) => comparison(f, l, "==", r),
            Condition::NotEqual(l, r) => comparison(f, l, "!=", r),
            Condition::GreaterThan(l, r) => comparison(f, l, ">", r),
            Condition::GreaterThanOrEqual(l, r) => comparison(f, l, ">=", r),
            Condition::SmallerThan(l, r) => comparison(f, l, "<", r),
            Condition::SmallerThanOrEqual(l, r) => comparison(f, l, "<=", r),
            Condition::Literal(b) => write!(f, "{}", b),
            Condition::Chance(p) => write!(f, "random({}%)", format_number(*p)),
            Condition::Predicate(p) => write!(f, "{}", p),
        }
    }
}
