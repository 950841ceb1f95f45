use super::expression::{Condition, Operand};
use crate::error::ConditionError;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Compare(&'static str),
    Chance(f64),
    Atom(String),
}

fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '<' | '>' | '=' | '!' | '&' | '|')
}

fn tokenize(input: &str) -> Result<Vec<Token>, ConditionError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '&' | '|' => {
                chars.next();
                if chars.next_if_eq(&c).is_none() {
                    return Err(ConditionError::UnexpectedToken(c.to_string()));
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
            }
            '<' | '>' | '=' | '!' => {
                chars.next();
                let op = match (c, chars.next_if_eq(&'=').is_some()) {
                    ('<', true) => "<=",
                    ('>', true) => ">=",
                    ('=', true) => "==",
                    ('!', true) => "!=",
                    ('<', false) => "<",
                    ('>', false) => ">",
                    ('!', false) => {
                        tokens.push(Token::Not);
                        continue;
                    }
                    // A single '=' reads as equality.
                    _ => "==",
                };
                tokens.push(Token::Compare(op));
            }
            '\'' | '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == c => break,
                        Some(ch) => text.push(ch),
                        None => return Err(ConditionError::UnexpectedEnd),
                    }
                }
                tokens.push(Token::Atom(text));
            }
            _ => {
                let word = read_word(&mut chars);
                if word.eq_ignore_ascii_case("random") && chars.peek() == Some(&'(') {
                    tokens.push(Token::Chance(read_chance(&mut chars)?));
                    continue;
                }
                tokens.push(match word.to_ascii_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    _ => Token::Atom(word),
                });
            }
        }
    }
    Ok(tokens)
}

fn read_word(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut word = String::new();
    while let Some(c) = chars.next_if(|c| is_atom_char(*c)) {
        word.push(c);
    }
    word
}

/// Reads `(N%)` after `random`.
fn read_chance(chars: &mut Peekable<Chars<'_>>) -> Result<f64, ConditionError> {
    chars.next();
    let mut inner = String::new();
    loop {
        match chars.next() {
            Some(')') => break,
            Some(c) => inner.push(c),
            None => return Err(ConditionError::UnbalancedParentheses),
        }
    }
    let number = inner.trim().trim_end_matches('%').trim();
    number
        .parse()
        .map_err(|_| ConditionError::UnexpectedToken(format!("random({})", inner)))
}

/// Deepest `!` or parenthesis nesting a single expression may use.
pub const MAX_NESTING: usize = 64;

/// Most `AND`/`OR` operators a single expression may chain.
pub const MAX_OPERATORS: usize = 256;

/// Recursive descent over `OR < AND < NOT < comparison < term`.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: usize,
}

enum Term {
    Group(Condition),
    Chance(f64),
    Atom(String),
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn descend(&mut self) -> Result<(), ConditionError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ConditionError::TooDeep(MAX_NESTING));
        }
        Ok(())
    }

    fn count_operator(&mut self) -> Result<(), ConditionError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(ConditionError::TooManyOperators(MAX_OPERATORS));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Condition, ConditionError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            self.count_operator()?;
            let right = self.parse_and()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Condition, ConditionError> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            self.count_operator()?;
            let right = self.parse_not()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Condition, ConditionError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            self.descend()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(Condition::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Condition, ConditionError> {
        let left = self.parse_term()?;
        let Some(Token::Compare(op)) = self.peek().cloned() else {
            return Ok(term_to_condition(left));
        };
        self.advance();
        let right = self.parse_term()?;
        let (Term::Atom(l), Term::Atom(r)) = (left, right) else {
            return Err(ConditionError::UnexpectedToken(op.to_string()));
        };
        let (l, r) = (Operand::parse(&l), Operand::parse(&r));
        Ok(match op {
            "<=" => Condition::SmallerThanOrEqual(l, r),
            ">=" => Condition::GreaterThanOrEqual(l, r),
            "!=" => Condition::NotEqual(l, r),
            "<" => Condition::SmallerThan(l, r),
            ">" => Condition::GreaterThan(l, r),
            _ => Condition::Equal(l, r),
        })
    }

    fn parse_term(&mut self) -> Result<Term, ConditionError> {
        match self.advance() {
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::RParen) => Ok(Term::Group(inner)),
                    _ => Err(ConditionError::UnbalancedParentheses),
                }
            }
            Some(Token::Chance(p)) => Ok(Term::Chance(p)),
            Some(Token::Atom(atom)) => Ok(Term::Atom(atom)),
            Some(Token::RParen) => Err(ConditionError::UnbalancedParentheses),
            Some(other) => Err(ConditionError::UnexpectedToken(format!("{:?}", other))),
            None => Err(ConditionError::UnexpectedEnd),
        }
    }
}

fn term_to_condition(term: Term) -> Condition {
    match term {
        Term::Group(c) => c,
        Term::Chance(p) => Condition::Chance(p),
        Term::Atom(atom) => {
            if atom.eq_ignore_ascii_case("true") {
                Condition::Literal(true)
            } else if atom.eq_ignore_ascii_case("false") {
                Condition::Literal(false)
            } else if let Ok(n) = atom.parse::<f64>() {
                Condition::Literal(n != 0.0)
            } else {
                Condition::Predicate(atom)
            }
        }
    }
}

/// Parses a condition expression.
pub fn parse(input: &str) -> Result<Condition, ConditionError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ConditionError::UnexpectedEnd);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        operators: 0,
    };
    let condition = parser.parse_or()?;
    match parser.peek() {
        None => Ok(condition),
        Some(Token::RParen) => Err(ConditionError::UnbalancedParentheses),
        Some(other) => Err(ConditionError::UnexpectedToken(format!("{:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comparison() {
        let parsed = parse("{damage} >= 10").unwrap();
        assert_eq!(
            parsed,
            Condition::GreaterThanOrEqual(Operand::Text("{damage}".into()), Operand::Number(10.0))
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let parsed = parse("a OR b && c").unwrap();
        assert_eq!(parsed.to_string(), "a OR b AND c");
        assert!(matches!(parsed, Condition::Or(..)));
    }

    #[test]
    fn test_random_chance() {
        assert_eq!(parse("random(25%)").unwrap(), Condition::Chance(25.0));
        assert_eq!(parse("RANDOM( 40 )").unwrap(), Condition::Chance(40.0));
    }

    #[test]
    fn test_not_and_groups() {
        let parsed = parse("!(x == 1 || HAS_MARK:burn)").unwrap();
        assert_eq!(parsed.to_string(), "NOT (x == 1 OR HAS_MARK:burn)");
        assert_eq!(parsed.predicates(), vec!["HAS_MARK:burn"]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse(""), Err(ConditionError::UnexpectedEnd));
        assert_eq!(parse("(a"), Err(ConditionError::UnbalancedParentheses));
        assert_eq!(parse("a)"), Err(ConditionError::UnbalancedParentheses));
        assert!(parse("a & b").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let at_limit = format!("{}true{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(parse(&at_limit), Ok(Condition::Literal(true)));
        let too_deep = format!("{}true", "!".repeat(MAX_NESTING + 1));
        assert_eq!(parse(&too_deep), Err(ConditionError::TooDeep(MAX_NESTING)));
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("TRUE").unwrap(), Condition::Literal(true));
        assert_eq!(parse("0").unwrap(), Condition::Literal(false));
        assert_eq!(parse("'a b' == 'a b'").unwrap(), Condition::Equal(Operand::Text("a b".into()), Operand::Text("a b".into())));
    }
}
