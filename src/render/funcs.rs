//! Functions callable from file name templates.
//!
//! A [`FunctionRegistry`] is built once per renderer and never mutated.
//! Functions take their explicit arguments first; a piped value arrives as
//! the last argument, so `{{ .metadata.name | trimPrefix "app-" }}` calls
//! `trimPrefix("app-", name)`.

use crate::manifest::{Number, Value};
use regex::Regex;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

type Builtin = fn(&FunctionRegistry, &[Value]) -> Result<Value, String>;
type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct FunctionRegistry {
    funcs: HashMap<&'static str, (usize, Builtin)>,
    non_alphanumeric: Regex,
    non_alphanumeric_dash: Regex,
    env: EnvLookup,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.funcs.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry").field("funcs", &names).finish()
    }
}

impl FunctionRegistry {
    /// Registry reading `env` values from the process environment.
    pub fn new() -> Result<Self, regex::Error> {
        Self::with_env(|key| std::env::var(key).ok())
    }

    /// Registry with a custom environment source.
    pub fn with_env(
        env: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Result<Self, regex::Error> {
        let table: [(&'static str, usize, Builtin); 24] = [
            ("lower", 1, lower),
            ("lowercase", 1, lower),
            ("upper", 1, upper),
            ("uppercase", 1, upper),
            ("title", 1, title),
            ("trim", 1, trim),
            ("trimPrefix", 2, trim_prefix),
            ("trimSuffix", 2, trim_suffix),
            ("replace", 3, replace),
            ("default", 2, default),
            ("required", 1, required),
            ("str", 1, str_fn),
            ("alphanumify", 1, alphanumify),
            ("alphanumdash", 1, alphanumdash),
            ("dottodash", 1, dot_to_dash),
            ("dottounder", 1, dot_to_under),
            ("env", 1, env_fn),
            ("sha1sum", 1, sha1sum),
            ("sha256sum", 1, sha256sum),
            ("index", 2, index),
            ("indexOrEmpty", 2, index_or_empty),
            ("printf", usize::MAX, printf),
            ("sprintf", usize::MAX, printf),
            ("pluralize", 2, pluralize),
        ];

        Ok(Self {
            funcs: table
                .into_iter()
                .map(|(name, arity, f)| (name, (arity, f)))
                .collect(),
            non_alphanumeric: Regex::new(r"[^a-zA-Z0-9]+")?,
            non_alphanumeric_dash: Regex::new(r"[^a-zA-Z0-9-]+")?,
            env: Box::new(env),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Call `name` with fully evaluated arguments.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, String> {
        let (arity, f) = self
            .funcs
            .get(name)
            .ok_or_else(|| format!("function {name:?} not defined"))?;
        if *arity != usize::MAX && *arity != args.len() {
            return Err(format!(
                "wrong number of args for {name}: want {arity} got {}",
                args.len()
            ));
        }
        f(self, args).map_err(|e| format!("error calling {name}: {e}"))
    }
}

/// Convert a scalar to a string. Null is empty; lists and maps are refused.
pub fn to_str(value: &Value) -> Result<String, String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!(
            "unexpected data type {} -- can't convert to string",
            other.type_name()
        )),
    }
}

/// Arguments that must literally be strings (prefixes, search terms, keys).
fn expect_string<'a>(value: &'a Value, what: &str) -> Result<&'a str, String> {
    value.as_str().ok_or_else(|| {
        format!(
            "wrong type for {what}; expected string; got {}",
            value.type_name()
        )
    })
}

fn map_str(args: &[Value], f: impl FnOnce(String) -> String) -> Result<Value, String> {
    let s = to_str(&args[args.len() - 1])?;
    Ok(Value::String(f(s)))
}

fn lower(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    map_str(args, |s| s.to_lowercase())
}

fn upper(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    map_str(args, |s| s.to_uppercase())
}

fn title(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    map_str(args, |s| title_case(&s))
}

/// Upper-case the first letter of each word, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            // '_', '.' and '\'' join words rather than separate them.
            word_start = !matches!(c, '_' | '.' | '\'');
        }
    }
    out
}

fn trim(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    map_str(args, |s| s.trim().to_string())
}

fn trim_prefix(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    let prefix = expect_string(&args[0], "prefix")?;
    map_str(args, |s| {
        s.strip_prefix(prefix).map(str::to_string).unwrap_or(s)
    })
}

fn trim_suffix(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    let suffix = expect_string(&args[0], "suffix")?;
    map_str(args, |s| {
        s.strip_suffix(suffix).map(str::to_string).unwrap_or(s)
    })
}

fn replace(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    let search = expect_string(&args[0], "search")?;
    let with = expect_string(&args[1], "replacement")?;
    map_str(args, |s| s.replace(search, with))
}

fn default(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    let value = to_str(&args[1])?;
    if !value.is_empty() {
        return Ok(Value::String(value));
    }
    Ok(Value::String(to_str(&args[0])?))
}

fn required(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    let value = &args[0];
    if value.is_null() {
        return Err("argument is marked as required, but it renders to empty".to_string());
    }
    if to_str(value)?.is_empty() {
        return Err(
            "argument is marked as required, but it renders to empty or it's an object or an unsupported type"
                .to_string(),
        );
    }
    Ok(value.clone())
}

fn str_fn(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    map_str(args, |s| s)
}

fn alphanumify(reg: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    map_str(args, |s| reg.non_alphanumeric.replace_all(&s, "").into_owned())
}

fn alphanumdash(reg: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    map_str(args, |s| {
        reg.non_alphanumeric_dash.replace_all(&s, "").into_owned()
    })
}

fn dot_to_dash(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    map_str(args, |s| s.replace('.', "-"))
}

fn dot_to_under(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    map_str(args, |s| s.replace('.', "_"))
}

fn env_fn(reg: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    let key = to_str(&args[0])?.to_uppercase();
    Ok(Value::String((reg.env)(&key).unwrap_or_default()))
}

/// Canonical form used for digests: the value re-serialized as YAML.
fn canonical_yaml(value: &Value) -> Result<String, String> {
    serde_yaml::to_string(value).map_err(|e| format!("unable to encode object to YAML: {e}"))
}

fn sha1sum(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    let yaml = canonical_yaml(&args[0])?;
    Ok(Value::String(format!("{:x}", Sha1::digest(yaml.as_bytes()))))
}

fn sha256sum(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    let yaml = canonical_yaml(&args[0])?;
    Ok(Value::String(format!("{:x}", Sha256::digest(yaml.as_bytes()))))
}

fn index(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    let key = expect_string(&args[0], "index")?;
    let map = match &args[1] {
        Value::Null => return Err("map is nil".to_string()),
        Value::Map(m) => m,
        other => {
            return Err(format!(
                "wrong type for value; expected map; got {}",
                other.type_name()
            ));
        }
    };
    if key.is_empty() {
        return Err("index is empty".to_string());
    }
    map.get(key)
        .cloned()
        .ok_or_else(|| format!("map does not contain index {key:?}"))
}

fn index_or_empty(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    let key = expect_string(&args[0], "index")?;
    let empty = || Value::String(String::new());
    match &args[1] {
        Value::Null => Ok(empty()),
        Value::Map(m) => Ok(m.get(key).cloned().unwrap_or_else(empty)),
        other => Err(format!(
            "wrong type for value; expected map; got {}",
            other.type_name()
        )),
    }
}

/// Append "s" to a word unless the count is exactly 1.
pub fn plural(word: &str, count: i64) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

fn pluralize(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    let word = to_str(&args[0])?;
    let count = match &args[1] {
        Value::Number(Number::Int(n)) => *n,
        other => {
            return Err(format!(
                "wrong type for count; expected int; got {}",
                other.type_name()
            ));
        }
    };
    Ok(Value::String(plural(&word, count)))
}

/// `printf` subset: `%s`, `%v` and `%d` take the next argument and accept
/// the `-`, `+` and `0` flags plus a width. `%%` is a literal percent sign.
fn printf(_: &FunctionRegistry, args: &[Value]) -> Result<Value, String> {
    let (format, rest) = args
        .split_first()
        .ok_or_else(|| "missing format string".to_string())?;
    let format = expect_string(format, "format")?;

    let mut out = String::new();
    let mut rest = rest.iter();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut directive = Directive::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => directive.left = true,
                '+' => directive.plus = true,
                '0' => directive.zero = true,
                _ => break,
            }
            chars.next();
        }
        while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
            directive.width = directive.width * 10 + digit as usize;
            chars.next();
        }

        match chars.next() {
            Some('%') => out.push('%'),
            Some(verb @ ('s' | 'v' | 'd')) => match rest.next() {
                Some(arg) => out.push_str(&directive.apply(arg)?),
                None => out.push_str(&format!("%!{verb}(MISSING)")),
            },
            Some(other) => return Err(format!("unsupported verb %{other}")),
            None => out.push_str("%!(NOVERB)"),
        }
    }
    Ok(Value::String(out))
}

/// Flags and width of one `%` directive.
#[derive(Debug, Default)]
struct Directive {
    left: bool,
    plus: bool,
    zero: bool,
    width: usize,
}

impl Directive {
    fn apply(&self, arg: &Value) -> Result<String, String> {
        let (sign, body) = match arg {
            Value::Number(Number::Int(n)) => {
                let sign = if *n < 0 {
                    "-"
                } else if self.plus {
                    "+"
                } else {
                    ""
                };
                (sign, n.unsigned_abs().to_string())
            }
            other => ("", to_str(other)?),
        };

        let pad = self.width.saturating_sub(sign.len() + body.chars().count());
        // Zeros go between the sign and the digits; `-` wins over `0`.
        Ok(if self.left {
            format!("{sign}{body}{}", " ".repeat(pad))
        } else if self.zero {
            format!("{sign}{}{body}", "0".repeat(pad))
        } else {
            format!("{}{sign}{body}", " ".repeat(pad))
        })
    }
}
