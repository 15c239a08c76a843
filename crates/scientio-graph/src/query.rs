//! Cypher query builder.
//!
//! Statements are assembled from small emitters rather than a parsed AST.
//! Every token is padded with spaces on append and [`QueryBuilder::get`]
//! collapses whitespace runs outside string literals, so fragments compose
//! without doubled or missing spaces at clause boundaries:
//!
//! ```
//! # use scientio_graph::QueryBuilder;
//! let mut builder = QueryBuilder::new();
//! builder.match_by_id(7, "n").add("RETURN n");
//! assert_eq!(builder.get(), "MATCH (n) WHERE ID(n)=7 RETURN n");
//! ```

/// Accumulates Cypher text.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: String,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing query text.
    pub fn from_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    /// The normalized statement: whitespace runs collapsed, ends trimmed.
    /// Text inside `'...'` literals is kept verbatim.
    pub fn get(&self) -> String {
        let mut out = String::with_capacity(self.query.len());
        let mut in_literal = false;
        let mut escaped = false;
        let mut pending_space = false;

        for c in self.query.chars() {
            if in_literal {
                out.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '\'' {
                    in_literal = false;
                }
                continue;
            }
            if c.is_whitespace() {
                pending_space = true;
                continue;
            }
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            if c == '\'' {
                in_literal = true;
            }
            out.push(c);
        }
        out
    }

    /// Concatenate raw chunks without padding.
    pub fn append<S: AsRef<str>>(&mut self, chunks: &[S]) -> &mut Self {
        for chunk in chunks {
            self.query.push_str(chunk.as_ref());
        }
        self
    }

    /// Append a single token.
    pub fn add(&mut self, token: &str) -> &mut Self {
        self.append(&[" ", token, " "])
    }

    /// Append names joined by `:`, as in a multi-label pattern.
    pub fn add_meta<S: AsRef<str>>(&mut self, names: &[S]) -> &mut Self {
        let joined = names
            .iter()
            .map(|n| n.as_ref())
            .collect::<Vec<_>>()
            .join(":");
        self.add(&joined)
    }

    /// Append a property map literal: `{k1: 'v1', k2: 'v2'}`.
    ///
    /// Values are not filtered; callers pass only the properties they mean
    /// to match or store.
    pub fn add_parameters<K, V>(&mut self, properties: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let params = properties
            .into_iter()
            .map(|(key, value)| format!("{}: {}", key.as_ref(), quote(value.as_ref())))
            .collect::<Vec<_>>();
        self.add(&format!("{{{}}}", params.join(", ")))
    }

    /// `MATCH (variable) WHERE ID(variable)=id`
    pub fn match_by_id(&mut self, id: i64, variable: &str) -> &mut Self {
        self.add(&format!("MATCH ({variable}) WHERE ID({variable})={id}"))
    }

    /// One `SET variable.key='value'` clause per property.
    pub fn set_values<K, V>(
        &mut self,
        properties: impl IntoIterator<Item = (K, V)>,
        variable: &str,
    ) -> &mut Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in properties {
            self.add(&format!(
                "SET {variable}.{}={}",
                key.as_ref(),
                quote(value.as_ref())
            ));
        }
        self
    }
}

/// Render ids as a Cypher list literal: `[10, 14]`.
pub fn id_list<'a>(ids: impl IntoIterator<Item = &'a i64>) -> String {
    let ids = ids.into_iter().map(i64::to_string).collect::<Vec<_>>();
    format!("[{}]", ids.join(", "))
}

/// Single-quote a string literal, escaping `\`, `'` and line breaks.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}
