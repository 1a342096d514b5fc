// template.rs -- Name-indexed render contexts and page rendering

use std::collections::HashMap;

/// What a context name resolves to: a plain string, an ordered sequence of
/// sub-contexts to iterate, or a function receiving a section argument and
/// the unrendered inner content.
pub enum Value {
    Text(String),
    Sub(Vec<Context>),
    Lambda(Box<dyn Fn(&str, &str) -> String + Send + Sync>),
}

#[derive(Default)]
pub struct Context {
    entries: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.entries
            .insert(key.to_string(), Value::Text(value.to_string()));
    }

    /// Presence marker enabling a conditional template section.
    pub fn set_flag(&mut self, key: &str) {
        self.set(key, "1");
    }

    pub fn set_sub(&mut self, key: &str, subs: Vec<Context>) {
        self.entries.insert(key.to_string(), Value::Sub(subs));
    }

    pub fn set_lambda<F>(&mut self, key: &str, f: F)
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.entries
            .insert(key.to_string(), Value::Lambda(Box::new(f)));
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }
}

fn lookup<'a>(stack: &[&'a Context], name: &str) -> Option<&'a Value> {
    stack.iter().rev().find_map(|ctx| ctx.get(name))
}

/// Render a template against a context stack. Inner contexts of section
/// iterations are pushed onto the stack, so lookups fall back outward.
///
/// Supported forms: `{{name}}` variables, `{{#name}}...{{/name}}` sections
/// (iterated for sub-context sequences, conditional on presence markers,
/// called for lambdas), and `{{#lambda arg}}...{{/lambda arg}}` sections
/// whose first word names a lambda taking the rest as argument. Lambda
/// output is itself rendered against the current stack.
pub fn render(template: &str, stack: &[&Context]) -> String {
    let mut out = String::new();
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];

        let close = match after.find("}}") {
            Some(close) => close,
            None => {
                out.push_str(&rest[open..]);
                return out;
            }
        };
        let tag = after[..close].trim();
        let after_tag = &after[close + 2..];

        if let Some(name) = tag.strip_prefix('#') {
            let name = name.trim();
            let end_marker = format!("{{{{/{}}}}}", name);
            let (inner, remainder) = match after_tag.find(&end_marker) {
                Some(end) => (
                    &after_tag[..end],
                    &after_tag[end + end_marker.len()..],
                ),
                None => ("", after_tag),
            };

            render_section(name, inner, stack, &mut out);
            rest = remainder;
        } else if tag.starts_with('/') {
            // Stray close tag without an open, drop it
            rest = after_tag;
        } else {
            if let Some(Value::Text(text)) = lookup(stack, tag) {
                out.push_str(text);
            }
            rest = after_tag;
        }
    }

    out.push_str(rest);
    out
}

fn render_section(name: &str, inner: &str, stack: &[&Context], out: &mut String) {
    // A name's first word may address a lambda taking the rest as argument
    let (value, arg) = match lookup(stack, name) {
        Some(value) => (Some(value), ""),
        None => match name.split_once(' ') {
            Some((head, tail)) => (lookup(stack, head), tail.trim()),
            None => (None, ""),
        },
    };

    match value {
        Some(Value::Text(text)) => {
            if !text.is_empty() {
                out.push_str(&render(inner, stack));
            }
        }
        Some(Value::Sub(subs)) => {
            for sub in subs {
                let mut inner_stack: Vec<&Context> = stack.to_vec();
                inner_stack.push(sub);
                out.push_str(&render(inner, &inner_stack));
            }
        }
        Some(Value::Lambda(f)) => {
            let produced = f(arg, inner);
            out.push_str(&render(&produced, stack));
        }
        None => {}
    }
}
