//! A small text template language for file names.
//!
//! This is the subset of Go template syntax that name templates use: actions
//! holding field paths, literals, function calls, pipes and parentheses, plus
//! comments and `{{-`/`-}}` whitespace trimming. There is no control flow and
//! no variables besides `$`, which is the same as the root `.`.

use super::funcs::FunctionRegistry;
use crate::manifest::{Number, Value};

/// Printed for actions that evaluate to nothing.
pub const MISSING_VALUE: &str = "<no value>";

const SPACE: [char; 4] = [' ', '\t', '\r', '\n'];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template:{line}: {message}")]
    Parse { line: usize, message: String },

    #[error("template: {0}")]
    Exec(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Action(Pipeline),
}

/// `cmd | cmd | ...`; each stage after the first gets the previous result as
/// its last argument.
#[derive(Debug, Clone, PartialEq)]
struct Pipeline {
    commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
struct Command {
    args: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Field(Vec<String>),
    Function(String),
    Literal(Value),
    Nested(Pipeline),
}

impl Template {
    /// Parse `src`. Function names are resolved against `funcs` here, so a
    /// typo fails before any document is read.
    pub fn parse(src: &str, funcs: &FunctionRegistry) -> Result<Self, TemplateError> {
        let mut lexer = Lexer { src, pos: 0 };
        let mut nodes = Vec::new();
        let mut trim_next = false;

        loop {
            let rest = lexer.rest();
            let end = rest.find("{{").unwrap_or(rest.len());
            let mut text = &rest[..end];
            lexer.pos += end;
            if trim_next {
                text = text.trim_start_matches(SPACE);
            }

            if end == rest.len() {
                if !text.is_empty() {
                    nodes.push(Node::Text(text.to_string()));
                }
                break;
            }

            lexer.pos += 2;
            let after = lexer.rest();
            if after.starts_with('-') && after[1..].starts_with(SPACE) {
                text = text.trim_end_matches(SPACE);
                lexer.pos += 1;
            }
            if !text.is_empty() {
                nodes.push(Node::Text(text.to_string()));
            }

            let line = lexer.line();
            lexer.skip_space();
            trim_next = if lexer.rest().starts_with("/*") {
                lexer.comment()?
            } else {
                let (tokens, trim) = lexer.action()?;
                let mut parser = Parser {
                    tokens: &tokens,
                    pos: 0,
                    funcs,
                    line,
                };
                let pipeline = parser.pipeline()?;
                if parser.pos != tokens.len() {
                    return Err(parser.error("unexpected \")\" in command"));
                }
                nodes.push(Node::Action(pipeline));
                trim
            };
        }

        Ok(Self { nodes })
    }

    /// Render the template with `dot` as the root value.
    pub fn execute(&self, funcs: &FunctionRegistry, dot: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(pipeline) => match eval_pipeline(pipeline, funcs, dot)? {
                    Value::Null => out.push_str(MISSING_VALUE),
                    value => write_value(&mut out, &value),
                },
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(Vec<String>),
    Ident(String),
    Literal(Value),
    Pipe,
    Open,
    Close,
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn line(&self) -> usize {
        self.src[..self.pos].matches('\n').count() + 1
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::Parse {
            line: self.line(),
            message: message.into(),
        }
    }

    /// Returns true if anything was skipped.
    fn skip_space(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|c| SPACE.contains(&c)) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn word(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    /// Consume `/* ... */}}`; returns whether the close trims.
    fn comment(&mut self) -> Result<bool, TemplateError> {
        let Some(end) = self.rest().find("*/") else {
            return Err(self.error("unclosed comment"));
        };
        self.pos += end + 2;
        let spaced = self.skip_space();
        self.close(spaced)
            .ok_or_else(|| self.error("comment ends before closing delimiter"))
    }

    fn close(&mut self, spaced: bool) -> Option<bool> {
        let rest = self.rest();
        if rest.starts_with("}}") {
            self.pos += 2;
            Some(false)
        } else if spaced && rest.starts_with("-}}") {
            self.pos += 3;
            Some(true)
        } else {
            None
        }
    }

    /// Tokenize up to and including the closing delimiter.
    fn action(&mut self) -> Result<(Vec<Token>, bool), TemplateError> {
        let mut tokens = Vec::new();
        loop {
            let spaced = self.skip_space();
            let Some(c) = self.peek() else {
                return Err(self.error("unclosed action"));
            };
            if let Some(trim) = self.close(spaced) {
                return Ok((tokens, trim));
            }

            let token = match c {
                '|' => {
                    self.bump();
                    Token::Pipe
                }
                '(' => {
                    self.bump();
                    Token::Open
                }
                ')' => {
                    self.bump();
                    Token::Close
                }
                '"' => Token::Literal(Value::String(self.quoted()?)),
                '`' => Token::Literal(Value::String(self.raw()?)),
                '.' | '$' => Token::Field(self.field()?),
                '-' | '+' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                    Token::Literal(Value::Number(self.number()?))
                }
                c if c.is_ascii_digit() => Token::Literal(Value::Number(self.number()?)),
                c if c.is_alphabetic() || c == '_' => match self.word() {
                    "true" => Token::Literal(Value::Bool(true)),
                    "false" => Token::Literal(Value::Bool(false)),
                    "nil" => Token::Literal(Value::Null),
                    name => Token::Ident(name.to_string()),
                },
                other => return Err(self.error(format!("unexpected {other:?} in action"))),
            };
            tokens.push(token);
        }
    }

    fn field(&mut self) -> Result<Vec<String>, TemplateError> {
        let mut path = Vec::new();
        if self.bump() == Some('$') {
            if self.peek() != Some('.') {
                return Ok(path);
            }
            self.bump();
        }
        loop {
            let name = self.word();
            if name.is_empty() {
                if path.is_empty() {
                    return Ok(path);
                }
                return Err(self.error("bad field path: trailing '.'"));
            }
            path.push(name.to_string());
            if self.peek() != Some('.') {
                return Ok(path);
            }
            self.bump();
        }
    }

    fn quoted(&mut self) -> Result<String, TemplateError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("unterminated quoted string")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c @ ('\\' | '"')) => out.push(c),
                    Some(c) => return Err(self.error(format!("unknown escape sequence \\{c}"))),
                    None => return Err(self.error("unterminated quoted string")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn raw(&mut self) -> Result<String, TemplateError> {
        self.bump();
        let Some(end) = self.rest().find('`') else {
            return Err(self.error("unterminated raw quoted string"));
        };
        let text = self.rest()[..end].to_string();
        self.pos += end + 1;
        Ok(text)
    }

    fn number(&mut self) -> Result<Number, TemplateError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '-' | '+')
                && matches!(self.src[..self.pos].chars().last(), Some('e' | 'E'));
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }

        let text = self.src[start..self.pos].replace('_', "");
        let (negative, digits) = match text.strip_prefix('-') {
            Some(d) => (true, d),
            None => (false, text.trim_start_matches('+')),
        };
        if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            if let Ok(i) = i64::from_str_radix(hex, 16) {
                return Ok(Number::Int(if negative { -i } else { i }));
            }
        } else if let Ok(i) = text.parse::<i64>() {
            return Ok(Number::Int(i));
        } else if let Ok(x) = text.parse::<f64>() {
            return Ok(Number::Float(x));
        }
        Err(self.error(format!("bad number syntax: {:?}", &self.src[start..self.pos])))
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    funcs: &'t FunctionRegistry,
    line: usize,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.tokens.get(self.pos) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn pipeline(&mut self) -> Result<Pipeline, TemplateError> {
        let mut commands = vec![self.command()?];
        while self.eat(&Token::Pipe) {
            let command = self.command()?;
            if !matches!(command.args.first(), Some(Operand::Function(_))) {
                return Err(self.error(format!(
                    "non executable command in pipeline stage {}",
                    commands.len() + 1
                )));
            }
            commands.push(command);
        }
        Ok(Pipeline { commands })
    }

    fn command(&mut self) -> Result<Command, TemplateError> {
        let tokens = self.tokens;
        let mut args = Vec::new();
        while let Some(token) = tokens.get(self.pos) {
            let operand = match token {
                Token::Pipe | Token::Close => break,
                Token::Open => {
                    self.pos += 1;
                    let nested = self.pipeline()?;
                    if !self.eat(&Token::Close) {
                        return Err(self.error("unclosed left paren"));
                    }
                    args.push(Operand::Nested(nested));
                    continue;
                }
                Token::Field(path) => Operand::Field(path.clone()),
                Token::Literal(value) => Operand::Literal(value.clone()),
                Token::Ident(name) => {
                    if !self.funcs.contains(name) {
                        return Err(self.error(format!("function {name:?} not defined")));
                    }
                    Operand::Function(name.clone())
                }
            };
            self.pos += 1;
            args.push(operand);
        }

        match args.first() {
            None => Err(self.error("missing value for command")),
            Some(Operand::Function(_)) => Ok(Command { args }),
            Some(_) if args.len() > 1 => Err(self.error("can't give argument to non-function")),
            Some(_) => Ok(Command { args }),
        }
    }
}

fn eval_pipeline(
    pipeline: &Pipeline,
    funcs: &FunctionRegistry,
    dot: &Value,
) -> Result<Value, TemplateError> {
    let mut piped: Option<Value> = None;
    for command in &pipeline.commands {
        piped = Some(eval_command(command, funcs, dot, piped)?);
    }
    Ok(piped.unwrap_or_default())
}

fn eval_command(
    command: &Command,
    funcs: &FunctionRegistry,
    dot: &Value,
    piped: Option<Value>,
) -> Result<Value, TemplateError> {
    match command.args.split_first() {
        Some((Operand::Function(name), rest)) => {
            let mut args = rest
                .iter()
                .map(|arg| eval_operand(arg, funcs, dot))
                .collect::<Result<Vec<_>, _>>()?;
            args.extend(piped);
            funcs.call(name, &args).map_err(TemplateError::Exec)
        }
        Some((operand, _)) => eval_operand(operand, funcs, dot),
        None => Ok(Value::Null),
    }
}

fn eval_operand(
    operand: &Operand,
    funcs: &FunctionRegistry,
    dot: &Value,
) -> Result<Value, TemplateError> {
    match operand {
        Operand::Field(path) => lookup(dot, path),
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Nested(pipeline) => eval_pipeline(pipeline, funcs, dot),
        Operand::Function(name) => funcs.call(name, &[]).map_err(TemplateError::Exec),
    }
}

/// Walk `path` from `dot`. Missing keys and nulls yield `Null`.
fn lookup(dot: &Value, path: &[String]) -> Result<Value, TemplateError> {
    let mut current = dot;
    for key in path {
        current = match current {
            Value::Map(map) => match map.get(key) {
                Some(value) => value,
                None => return Ok(Value::Null),
            },
            Value::Null => return Ok(Value::Null),
            other => {
                return Err(TemplateError::Exec(format!(
                    "can't evaluate field {key} in type {}",
                    other.type_name()
                )));
            }
        };
    }
    Ok(current.clone())
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("<nil>"),
        Value::Bool(b) => out.push_str(&b.to_string()),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => out.push_str(s),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Map(map) => {
            out.push_str("map[");
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(key);
                out.push(':');
                write_value(out, item);
            }
            out.push(']');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn funcs() -> FunctionRegistry {
        FunctionRegistry::with_env(|_| None).unwrap()
    }

    fn manifest() -> Value {
        let yaml: serde_yaml::Value = serde_yaml::from_str(
            "apiVersion: v1\nkind: Pod\nmetadata:\n  name: app-web\n  labels:\n    tier: front\nspec:\n  ports: [80, 443]\n",
        )
        .unwrap();
        Value::try_from(yaml).unwrap()
    }

    fn render(src: &str) -> Result<String, TemplateError> {
        let funcs = funcs();
        Template::parse(src, &funcs)?.execute(&funcs, &manifest())
    }

    #[test]
    fn fields_and_pipes() {
        assert_eq!(render("{{.kind | lower}}-{{.metadata.name}}.yaml").unwrap(), "pod-app-web.yaml");
        assert_eq!(
            render(r#"{{ .metadata.name | trimPrefix "app-" | upper }}"#).unwrap(),
            "WEB"
        );
        assert_eq!(render("{{ $.kind }}/{{ $ | index \"kind\" }}").unwrap(), "Pod/Pod");
    }

    #[test]
    fn nested_calls() {
        assert_eq!(
            render(r#"{{ upper (index "tier" .metadata.labels) }}"#).unwrap(),
            "FRONT"
        );
        assert_eq!(
            render(r#"{{ default "none" (indexOrEmpty "zone" .metadata.labels) }}"#).unwrap(),
            "none"
        );
    }

    #[test]
    fn missing_fields_print_placeholder() {
        assert_eq!(render("{{ .metadata.namespace }}").unwrap(), MISSING_VALUE);
        assert_eq!(render("{{ .nope.deeper }}").unwrap(), MISSING_VALUE);
    }

    #[test]
    fn field_on_scalar_is_an_error() {
        let err = render("{{ .kind.name }}").unwrap_err();
        assert_eq!(
            err,
            TemplateError::Exec("can't evaluate field name in type string".to_string())
        );
    }

    #[test]
    fn trim_markers_and_comments() {
        assert_eq!(render("a  {{- .kind -}}  \n b").unwrap(), "aPodb");
        assert_eq!(render("x{{/* note */}}y").unwrap(), "xy");
        assert_eq!(render("x  {{- /* note */ -}}  y").unwrap(), "xy");
        assert_eq!(render("{{-3}}").unwrap(), "-3");
    }

    #[test]
    fn literals() {
        assert_eq!(render(r#"{{ "a\tb" }}"#).unwrap(), "a\tb");
        assert_eq!(render("{{ `raw\\n` }}").unwrap(), "raw\\n");
        assert_eq!(render("{{ 42 }} {{ -1.5 }} {{ 0x1F }} {{ true }}").unwrap(), "42 -1.5 31 true");
    }

    #[test]
    fn collections_are_formatted() {
        assert_eq!(render("{{ .spec.ports }}").unwrap(), "[80 443]");
        assert_eq!(render("{{ .metadata.labels }}").unwrap(), "map[tier:front]");
    }

    #[test]
    fn parse_errors() {
        let funcs = funcs();
        let cases = [
            ("{{ nope . }}", "function \"nope\" not defined"),
            ("{{ .kind \"x\" }}", "can't give argument to non-function"),
            ("{{ \"x\" | .kind }}", "non executable command in pipeline stage 2"),
            ("{{ .kind ", "unclosed action"),
            ("{{ \"abc }}", "unterminated quoted string"),
            ("{{ (lower .kind }}", "unclosed left paren"),
            ("{{ }}", "missing value for command"),
            ("{{ lower .kind) }}", "unexpected \")\" in command"),
            ("{{/* open }}", "unclosed comment"),
        ];
        for (src, want) in cases {
            match Template::parse(src, &funcs) {
                Err(TemplateError::Parse { message, .. }) => {
                    assert!(message.contains(want), "{src}: {message}")
                }
                other => panic!("{src}: expected parse error, got {other:?}"),
            }
        }
    }

    #[test]
    fn parse_error_reports_line() {
        let err = Template::parse("a\nb\n{{ bogus }}", &funcs()).unwrap_err();
        assert!(matches!(err, TemplateError::Parse { line: 3, .. }), "{err:?}");
    }

    #[test]
    fn function_errors_surface_at_execution() {
        let err = render("{{ required .metadata.namespace }}").unwrap_err();
        assert!(matches!(err, TemplateError::Exec(ref m) if m.contains("required")), "{err}");
    }
}
