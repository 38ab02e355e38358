//! Markup helpers that issue a token and format it for a page.

use crate::error::{CsrfError, Result};
use crate::store::TokenStore;
use formseal_session::SessionStorage;

/// Escaping for the contexts tokens get embedded in.
pub struct Encoder;

impl Encoder {
    /// Escape text for use inside a double- or single-quoted HTML attribute.
    pub fn html_attribute(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#x27;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                _ => out.push(c),
            }
        }
        out
    }

    /// Encode text as a JSON string literal that is also safe inside a
    /// `<script>` element.
    pub fn script_string(text: &str) -> Result<String> {
        let json = serde_json::to_string(text)?;
        let mut out = String::with_capacity(json.len());
        for c in json.chars() {
            match c {
                '<' => out.push_str("\\u003c"),
                '>' => out.push_str("\\u003e"),
                '&' => out.push_str("\\u0026"),
                '/' => out.push_str("\\/"),
                _ => out.push(c),
            }
        }
        Ok(out)
    }

    /// Whether `name` can be used as a JavaScript variable name as-is.
    pub fn is_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    }
}

impl<S: SessionStorage> TokenStore<S> {
    /// Issue a token for `context` and render it as a hidden form field named
    /// after [`StoreConfig::input_field_name`](crate::StoreConfig).
    pub fn html_input(&mut self, context: &str) -> Result<String> {
        let token = self.issue(context)?;
        Ok(format!(
            r#"<input type="hidden" name="{}" value="{}" />"#,
            Encoder::html_attribute(&self.config().input_field_name),
            Encoder::html_attribute(token.value())
        ))
    }

    /// Issue a token for `context` and render a script block assigning it to
    /// the variable `var_name`.
    pub fn js_script(&mut self, context: &str, var_name: &str) -> Result<String> {
        if !Encoder::is_identifier(var_name) {
            return Err(CsrfError::Config(format!(
                "{var_name:?} is not a valid script variable name"
            )));
        }

        let value = Encoder::script_string(self.issue(context)?.value())?;
        Ok(format!(
            r#"<script type="text/javascript">var {var_name} = {value};</script>"#
        ))
    }

    /// Issue a token for `context` and return it as a JSON string literal.
    pub fn js_string(&mut self, context: &str) -> Result<String> {
        Encoder::script_string(self.issue(context)?.value())
    }
}
