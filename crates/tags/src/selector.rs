use crate::error::{Result, TagError};
use crate::tag::TagSet;
use std::fmt;

/// A compiled source selector: a boolean expression over tag conditions.
///
/// Grammar (precedence low to high): `or` < `and` < `not` < atom, where an
/// atom is `key = value`, `key != value` or a parenthesized expression.
/// Keywords are case-insensitive. Bare values may contain `*` wildcards;
/// quoted values match literally. A blank selector matches every tag set.
///
/// `key = value` is false when the key is absent; `key != value` is true when
/// the key is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    root: Node,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    All,
    Eq { key: String, pattern: Pattern },
    Ne { key: String, pattern: Pattern },
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Literal(String),
    Glob(String),
}

impl Pattern {
    fn from_value(value: String, quoted: bool) -> Pattern {
        if !quoted && value.contains('*') {
            Pattern::Glob(value)
        } else {
            Pattern::Literal(value)
        }
    }

    fn matches(&self, text: &str) -> bool {
        match self {
            Pattern::Literal(lit) => lit == text,
            Pattern::Glob(glob) => glob_match(glob, text),
        }
    }
}

impl Selector {
    /// Compiles a selector expression into a predicate over tag sets.
    pub fn parse(expr: &str) -> Result<Selector> {
        if expr.trim().is_empty() {
            return Ok(Selector { root: Node::All });
        }
        let tokens = tokenize(expr)?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.expr()?;
        if let Some((at, tok)) = parser.peek() {
            return Err(TagError::Selector {
                pos: at,
                message: format!("unexpected {tok}"),
            });
        }
        Ok(Selector { root })
    }

    /// The pure predicate: does `tags` satisfy this selector?
    #[must_use]
    pub fn matches(&self, tags: &TagSet) -> bool {
        eval(&self.root, tags)
    }
}

fn eval(node: &Node, tags: &TagSet) -> bool {
    match node {
        Node::All => true,
        Node::Eq { key, pattern } => tags.get(key).is_some_and(|v| pattern.matches(v)),
        Node::Ne { key, pattern } => !tags.get(key).is_some_and(|v| pattern.matches(v)),
        Node::Not(inner) => !eval(inner, tags),
        Node::And(lhs, rhs) => eval(lhs, tags) && eval(rhs, tags),
        Node::Or(lhs, rhs) => eval(lhs, tags) || eval(rhs, tags),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Word(String),
    Quoted(String),
    Eq,
    Ne,
    LParen,
    RParen,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Word(w) => write!(f, "\"{w}\""),
            Tok::Quoted(q) => write!(f, "quoted value \"{q}\""),
            Tok::Eq => f.write_str("\"=\""),
            Tok::Ne => f.write_str("\"!=\""),
            Tok::LParen => f.write_str("\"(\""),
            Tok::RParen => f.write_str("\")\""),
        }
    }
}

fn tokenize(expr: &str) -> Result<Vec<(usize, Tok)>> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();
    while let Some(&(at, c)) = chars.peek() {
        match c {
            _ if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push((at, Tok::LParen));
            }
            ')' => {
                chars.next();
                tokens.push((at, Tok::RParen));
            }
            '=' => {
                chars.next();
                tokens.push((at, Tok::Eq));
            }
            '!' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '=')) => {
                        chars.next();
                        tokens.push((at, Tok::Ne));
                    }
                    _ => {
                        return Err(TagError::Selector {
                            pos: at,
                            message: "expected \"=\" after \"!\"".to_string(),
                        })
                    }
                }
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\\')) => match chars.next() {
                            Some((_, escaped)) => value.push(escaped),
                            None => {
                                return Err(TagError::Selector {
                                    pos: at,
                                    message: "unterminated quoted value".to_string(),
                                })
                            }
                        },
                        Some((_, '"')) => break,
                        Some((_, inner)) => value.push(inner),
                        None => {
                            return Err(TagError::Selector {
                                pos: at,
                                message: "unterminated quoted value".to_string(),
                            })
                        }
                    }
                }
                tokens.push((at, Tok::Quoted(value)));
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_whitespace() || matches!(next, '(' | ')' | '=' | '!' | '"') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push((at, Tok::Word(word)));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Tok)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<(usize, &Tok)> {
        self.tokens.get(self.pos).map(|(at, tok)| (*at, tok))
    }

    fn next(&mut self) -> Option<(usize, Tok)> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if let Some((_, Tok::Word(word))) = self.peek() {
            if word.eq_ignore_ascii_case(keyword) {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    fn expr(&mut self) -> Result<Node> {
        let mut node = self.term()?;
        while self.eat_keyword("or") {
            let rhs = self.term()?;
            node = Node::Or(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn term(&mut self) -> Result<Node> {
        let mut node = self.factor()?;
        while self.eat_keyword("and") {
            let rhs = self.factor()?;
            node = Node::And(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn factor(&mut self) -> Result<Node> {
        if self.eat_keyword("not") {
            let inner = self.factor()?;
            return Ok(Node::Not(Box::new(inner)));
        }
        if let Some((at, Tok::LParen)) = self.peek() {
            self.pos += 1;
            let inner = self.expr()?;
            match self.next() {
                Some((_, Tok::RParen)) => return Ok(inner),
                _ => {
                    return Err(TagError::Selector {
                        pos: at,
                        message: "unclosed \"(\"".to_string(),
                    })
                }
            }
        }
        self.condition()
    }

    fn condition(&mut self) -> Result<Node> {
        let (key_at, key) = match self.next() {
            Some((at, Tok::Word(word))) => (at, word),
            Some((at, tok)) => {
                return Err(TagError::Selector {
                    pos: at,
                    message: format!("expected tag key, found {tok}"),
                })
            }
            None => {
                return Err(TagError::Selector {
                    pos: 0,
                    message: "expected tag key, found end of selector".to_string(),
                })
            }
        };

        let negated = match self.next() {
            Some((_, Tok::Eq)) => false,
            Some((_, Tok::Ne)) => true,
            _ => {
                return Err(TagError::Selector {
                    pos: key_at,
                    message: format!("expected \"=\" or \"!=\" after key \"{key}\""),
                })
            }
        };

        let pattern = match self.next() {
            Some((_, Tok::Word(value))) => Pattern::from_value(value, false),
            Some((_, Tok::Quoted(value))) => Pattern::from_value(value, true),
            _ => {
                return Err(TagError::Selector {
                    pos: key_at,
                    message: format!("expected value after key \"{key}\""),
                })
            }
        };

        Ok(if negated {
            Node::Ne { key, pattern }
        } else {
            Node::Eq { key, pattern }
        })
    }
}

/// Iterative `*`-wildcard match, linear in the text length.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while ti < txt.len() {
        if pi < pat.len() && pat[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if pi < pat.len() && pat[pi] == txt[ti] {
            pi += 1;
            ti += 1;
        } else if let Some(star_at) = star {
            pi = star_at + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    while pi < pat.len() && pat[pi] == '*' {
        pi += 1;
    }
    pi == pat.len()
}
