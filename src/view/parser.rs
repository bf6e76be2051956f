//! Parser for view fragments.
//!
//! Fragments are plain text with ERB-style tags calling the view helper:
//! - `<%= helper.getData("post", "title") %>` - HTML-escaped output
//! - `<%- helper.getFrameworkData("urlRoot") %>` - Raw/unescaped output
//! - `<% helper.printData("title") %>` - Print call (always escaped)
//! - `<% helper.import("partials/header.html") %>` - Nested fragment

/// Name the view helper is bound to inside fragments.
pub const HELPER_NAME: &str = "helper";

/// A view helper method callable from a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperMethod {
    GetData,
    GetFrameworkData,
    PrintData,
    PrintFrameworkData,
    Import,
}

impl HelperMethod {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "getData" => Some(HelperMethod::GetData),
            "getFrameworkData" => Some(HelperMethod::GetFrameworkData),
            "printData" => Some(HelperMethod::PrintData),
            "printFrameworkData" => Some(HelperMethod::PrintFrameworkData),
            "import" => Some(HelperMethod::Import),
            _ => None,
        }
    }

    /// Lookups produce a value; prints and imports write output themselves.
    pub fn returns_value(&self) -> bool {
        matches!(self, HelperMethod::GetData | HelperMethod::GetFrameworkData)
    }
}

/// A call on the helper with its string arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct HelperCall {
    pub method: HelperMethod,
    pub args: Vec<String>,
}

/// A node in a parsed fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentNode {
    /// Raw text content
    Literal(String),
    /// `<%= call %>` (escaped) or `<%- call %>` (raw)
    Output { call: HelperCall, escaped: bool },
    /// `<% call %>`
    Statement(HelperCall),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    OutputEscaped(String), // <%= ... %>
    OutputRaw(String),     // <%- ... %>
    Code(String),          // <% ... %>
}

/// Parse a fragment into nodes.
pub fn parse_fragment(source: &str) -> Result<Vec<FragmentNode>, String> {
    tokenize(source)?
        .into_iter()
        .map(|token| match token {
            Token::Literal(s) => Ok(FragmentNode::Literal(s)),
            Token::OutputEscaped(expr) => output_node(&expr, true),
            Token::OutputRaw(expr) => output_node(&expr, false),
            Token::Code(code) => {
                let call = parse_call(&code)?;
                if call.method.returns_value() {
                    return Err(format!("'{}' has no effect outside an output tag", code));
                }
                Ok(FragmentNode::Statement(call))
            }
        })
        .collect()
}

fn output_node(expr: &str, escaped: bool) -> Result<FragmentNode, String> {
    let call = parse_call(expr)?;
    if !call.method.returns_value() {
        return Err(format!("'{}' writes its own output, use <% %>", expr));
    }
    Ok(FragmentNode::Output { call, escaped })
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find("<%") {
        if start > 0 {
            tokens.push(Token::Literal(rest[..start].to_string()));
        }

        let tag = &rest[start + 2..];
        let (body, make): (&str, fn(String) -> Token) = match tag.as_bytes().first() {
            Some(b'=') => (&tag[1..], Token::OutputEscaped),
            Some(b'-') => (&tag[1..], Token::OutputRaw),
            _ => (tag, Token::Code),
        };

        let end = tag_end(body).ok_or_else(|| "Unclosed template tag".to_string())?;
        tokens.push(make(body[..end].trim().to_string()));
        rest = &body[end + 2..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Literal(rest.to_string()));
    }

    Ok(tokens)
}

/// Byte offset of the `%>` closing a tag. `%>` inside a quoted argument
/// does not count.
fn tag_end(body: &str) -> Option<usize> {
    let mut quote = None;
    let mut escaped = false;

    for (i, c) in body.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '%' && body[i + 1..].starts_with('>') => return Some(i),
            None => {}
        }
    }

    None
}

/// Parse `helper.method("a", 'b')`.
fn parse_call(expr: &str) -> Result<HelperCall, String> {
    let expr = expr.trim().trim_end_matches(';').trim_end();

    let rest = expr
        .strip_prefix(HELPER_NAME)
        .and_then(|r| r.strip_prefix('.'))
        .ok_or_else(|| format!("Expected a call on '{}', found '{}'", HELPER_NAME, expr))?;

    let open = rest
        .find('(')
        .ok_or_else(|| format!("Expected '(' in '{}'", expr))?;
    if !rest.ends_with(')') {
        return Err(format!("Expected ')' at the end of '{}'", expr));
    }

    let name = rest[..open].trim();
    let method = HelperMethod::from_name(name)
        .ok_or_else(|| format!("Unknown helper method '{}'", name))?;
    let args = parse_args(&rest[open + 1..rest.len() - 1])?;

    Ok(HelperCall { method, args })
}

/// Parse a comma-separated list of quoted string literals.
fn parse_args(args_str: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut chars = args_str.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let quote = match chars.next() {
            None => break,
            Some(q @ ('"' | '\'')) => q,
            Some(other) => return Err(format!("Expected a quoted string, found '{}'", other)),
        };

        let mut arg = String::new();
        loop {
            match chars.next() {
                Some('\\') => match chars.next() {
                    Some(escaped) => arg.push(escaped),
                    None => return Err("Unterminated string argument".to_string()),
                },
                Some(c) if c == quote => break,
                Some(c) => arg.push(c),
                None => return Err("Unterminated string argument".to_string()),
            }
        }
        args.push(arg);

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => {}
            Some(other) => return Err(format!("Expected ',' between arguments, found '{}'", other)),
        }
    }

    Ok(args)
}
