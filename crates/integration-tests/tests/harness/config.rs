//! Provider construction through the TOML configuration path

use std::fmt::Write as _;
use std::sync::Arc;

use confluence_config::Config;
use confluence_llm::{Provider, build_provider};

/// Builder for a single `[providers.<name>]` entry
pub struct ProviderBuilder {
    name: String,
    fields: Vec<(String, String)>,
}

impl ProviderBuilder {
    /// Entry of backend type `kind` pointed at `base_url`
    pub fn new(kind: &str, base_url: &str) -> Self {
        Self {
            name: kind.to_owned(),
            fields: vec![("type".to_owned(), kind.to_owned()), ("base_url".to_owned(), base_url.to_owned())],
        }
    }

    /// Register under a name other than the backend type
    pub fn named(mut self, name: &str) -> Self {
        name.clone_into(&mut self.name);
        self
    }

    pub fn api_key(self, key: &str) -> Self {
        self.field("api_key", key)
    }

    /// Any other string-valued setting
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.fields.push((key.to_owned(), value.to_owned()));
        self
    }

    pub fn toml(&self) -> String {
        let mut out = format!("[providers.{}]\n", self.name);
        for (key, value) in &self.fields {
            writeln!(out, "{key} = {value:?}").expect("writing to a String cannot fail");
        }
        out
    }

    pub fn config(&self) -> Config {
        Config::from_toml_str(&self.toml()).expect("test config is valid")
    }

    pub fn build(&self) -> Arc<dyn Provider> {
        let config = self.config();
        let (name, entry) = config.providers.first().expect("one provider is configured");
        build_provider(name, entry).expect("provider builds")
    }
}
