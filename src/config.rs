//! Hierarchical option tree.
//!
//! Every node owns one dashed name segment; an option is addressed by joining
//! the segments from the root, e.g. `--types-pos-bigrams` or
//! `--train.c2`. Trees are assembled with the builder methods on [`Config`]
//! and [`OpGroup`].

use std::{io::Write, str::FromStr};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Switch without argument; naming it sets it to `true`.
    Flag,
    /// Consumes the following argument.
    Value,
}

#[derive(Debug, Clone)]
pub struct Op {
    name: String,
    desc: String,
    kind: Kind,
    default: Option<String>,
    value: Option<String>,
    required: bool,
}

impl Op {
    pub fn flag(name: &str, desc: &str) -> Self {
        Self {
            name: name.to_string(),
            desc: desc.to_string(),
            kind: Kind::Flag,
            default: Some("false".to_string()),
            value: None,
            required: false,
        }
    }

    pub fn value(name: &str, desc: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            desc: desc.to_string(),
            kind: Kind::Value,
            default: Some(default.to_string()),
            value: None,
            required: false,
        }
    }

    /// A value option that must be given before [`Config::validate`] passes.
    pub fn required(name: &str, desc: &str) -> Self {
        Self {
            name: name.to_string(),
            desc: desc.to_string(),
            kind: Kind::Value,
            default: None,
            value: None,
            required: true,
        }
    }

    pub fn get(&self) -> Option<&str> {
        self.value.as_deref().or(self.default.as_deref())
    }

    fn set(&mut self, value: &str) {
        self.value = Some(value.to_string());
    }
}

#[derive(Debug, Clone)]
pub struct OpGroup {
    name: String,
    desc: String,
    children: Vec<Node>,
}

impl OpGroup {
    pub fn new(name: &str, desc: &str) -> Self {
        Self { name: name.to_string(), desc: desc.to_string(), children: Vec::new() }
    }

    pub fn op(mut self, op: Op) -> Self {
        self.children.push(Node::Op(op));
        self
    }

    pub fn group(mut self, group: OpGroup) -> Self {
        self.children.push(Node::Group(group));
        self
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Group(OpGroup),
    Op(Op),
}

impl Node {
    fn name(&self) -> &str {
        match self {
            Node::Group(g) => &g.name,
            Node::Op(o) => &o.name,
        }
    }

    /// Resolves `key` below this node. `orig_key` is the argument as typed,
    /// used in error messages.
    fn process(&mut self, orig_key: &str, key: &str) -> Result<Option<&mut Node>> {
        let name_len = self.name().len();
        if !key.starts_with(self.name()) {
            return Ok(None);
        }
        if let Node::Op(_) = self {
            return Ok((key.len() == name_len).then_some(self));
        }
        if key.len() == name_len {
            return Ok(Some(self));
        }
        if key.as_bytes()[name_len] != b'-' {
            return Err(Error::config("Invalid option specified", orig_key));
        }
        let sub_key = &key[name_len + 1..];
        if sub_key.is_empty() {
            return Err(Error::config("Invalid option specified", orig_key));
        }
        if let Node::Group(group) = self {
            for child in group.children.iter_mut() {
                if let Some(p) = child.process(orig_key, sub_key)? {
                    return Ok(Some(p));
                }
            }
        }
        Ok(None)
    }

    fn find(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Op(op) => (key == op.name).then_some(self),
            Node::Group(group) => {
                let rest = key.strip_prefix(group.name.as_str())?;
                if rest.is_empty() {
                    return Some(self);
                }
                let sub_key = rest.strip_prefix('-')?;
                group.children.iter().find_map(|c| c.find(sub_key))
            }
        }
    }

    fn set(&mut self, value: &str) -> Result<()> {
        match self {
            Node::Group(g) => Err(Error::config("Cannot set the value of an OpGroup", format!("{} = {value}", g.name))),
            Node::Op(o) => {
                o.set(value);
                Ok(())
            }
        }
    }

    fn validate(&self, prefix: &str) -> Result<()> {
        match self {
            Node::Op(o) if o.required && o.get().is_none() => {
                Err(Error::config("Missing required option", format!("--{prefix}{}", o.name)))
            }
            Node::Op(_) => Ok(()),
            Node::Group(g) => {
                let prefix = format!("{prefix}{}-", g.name);
                g.children.iter().try_for_each(|c| c.validate(&prefix))
            }
        }
    }

    fn help(&self, out: &mut dyn Write, prefix: &str, depth: usize) -> std::io::Result<()> {
        match self {
            Node::Op(o) => {
                let arg = if o.kind == Kind::Value { " <arg>" } else { "" };
                write!(out, "  --{prefix}{}{arg}: {}", o.name, o.desc)?;
                match &o.default {
                    Some(d) => writeln!(out, " (default: {d})"),
                    None => writeln!(out),
                }
            }
            Node::Group(g) => {
                if depth != 0 {
                    writeln!(out)?;
                }
                writeln!(out, "{prefix}{}: {}", g.name, g.desc)?;
                let me = format!("{prefix}{}-", g.name);
                for child in &g.children {
                    child.help(out, &me, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

/// The root of an option tree.
#[derive(Debug, Clone)]
pub struct Config {
    name: String,
    desc: String,
    version: String,
    children: Vec<Node>,
}

impl Config {
    pub fn new(name: &str, desc: &str, version: &str) -> Self {
        Self { name: name.to_string(), desc: desc.to_string(), version: version.to_string(), children: Vec::new() }
    }

    pub fn op(mut self, op: Op) -> Self {
        self.children.push(Node::Op(op));
        self
    }

    pub fn group(mut self, group: OpGroup) -> Self {
        self.children.push(Node::Group(group));
        self
    }

    fn normalize(key: &str) -> String {
        key.replace('.', "-")
    }

    fn process_key(&mut self, orig_key: &str, key: &str) -> Result<Option<&mut Node>> {
        for child in self.children.iter_mut() {
            if let Some(p) = child.process(orig_key, key)? {
                return Ok(Some(p));
            }
        }
        Ok(None)
    }

    /// Processes `--key [value]` arguments (without the program name).
    ///
    /// Returns `false` when `--help` or `--version` was handled and the caller
    /// should stop.
    pub fn process<S: AsRef<str>>(&mut self, args: &[S], out: &mut dyn Write) -> Result<bool> {
        for arg in args {
            match arg.as_ref() {
                "--help" => {
                    self.help(out).map_err(|e| Error::config(format!("unable to print help: {e}"), "--help"))?;
                    return Ok(false);
                }
                "--version" => {
                    writeln!(out, "{} {}", self.name, self.version)
                        .map_err(|e| Error::config(format!("unable to print version: {e}"), "--version"))?;
                    return Ok(false);
                }
                _ => {}
            }
        }

        let mut i = 0;
        while i < args.len() {
            let orig_key = args[i].as_ref();
            let key = orig_key
                .strip_prefix("--")
                .filter(|k| !k.is_empty())
                .ok_or_else(|| Error::config("Invalid option specified", orig_key))?;
            let key = Self::normalize(key);
            let node = self
                .process_key(orig_key, &key)?
                .ok_or_else(|| Error::config("Option not found", orig_key))?;
            match node {
                Node::Op(op) if op.kind == Kind::Value => {
                    let value = args
                        .get(i + 1)
                        .ok_or_else(|| Error::config("Option requires a value", orig_key))?;
                    op.set(value.as_ref());
                    i += 1;
                }
                Node::Op(op) => op.set("true"),
                node => node.set(orig_key)?,
            }
            i += 1;
        }
        self.validate()?;
        Ok(true)
    }

    /// Assigns `value` to the option at `path`.
    pub fn set(&mut self, path: &str, value: &str) -> Result<()> {
        let key = Self::normalize(path);
        let node = self
            .process_key(path, &key)?
            .ok_or_else(|| Error::config("Option not found", path))?;
        node.set(value)
    }

    pub fn validate(&self) -> Result<()> {
        self.children.iter().try_for_each(|c| c.validate(""))
    }

    pub fn help(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "{}: {}\n", self.name, self.desc)?;
        for child in &self.children {
            child.help(out, "", 1)?;
        }
        writeln!(out)
    }

    fn find(&self, path: &str) -> Option<&Node> {
        let key = Self::normalize(path);
        self.children.iter().find_map(|c| c.find(&key))
    }

    /// The current value (or default) of the option at `path`.
    pub fn get(&self, path: &str) -> Option<&str> {
        match self.find(path)? {
            Node::Op(o) => o.get(),
            Node::Group(_) => None,
        }
    }

    pub fn parse<T: FromStr>(&self, path: &str) -> Result<T> {
        let value = self.get(path).ok_or_else(|| Error::config("Option not found", path))?;
        value
            .parse()
            .map_err(|_| Error::config("Invalid value for option", format!("{path} = {value}")))
    }

    pub fn flag(&self, path: &str) -> Result<bool> {
        match self.get(path) {
            Some("true" | "1" | "yes" | "on") => Ok(true),
            Some("false" | "0" | "no" | "off") => Ok(false),
            Some(v) => Err(Error::config("Invalid boolean for option", format!("{path} = {v}"))),
            None => Err(Error::config("Option not found", path)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the top-level nodes, in registration order.
    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(Node::name)
    }
}
