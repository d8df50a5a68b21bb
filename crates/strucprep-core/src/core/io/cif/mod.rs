pub mod lexer;
pub mod reader;

use lexer::Token;
use std::collections::HashMap;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CifError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Missing required item '{key}' in category '{category}'")]
    MissingField { category: String, key: String },
    #[error("Invalid number for item '{key}' (value: '{value}')")]
    InvalidNumber { key: String, value: String },
    #[error("Loop in category '{category}' has {values} values for {columns} columns")]
    RaggedLoop {
        category: String,
        columns: usize,
        values: usize,
    },
    #[error("Missing required category: {0}")]
    MissingCategory(String),
}

/// One row of a CIF category. Item names are stored lowercased and the
/// `.`/`?` placeholders are stored as the empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CifRow {
    category: String,
    items: HashMap<String, String>,
}

impl CifRow {
    fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            items: HashMap::new(),
        }
    }

    fn insert(&mut self, key: &str, value: &str) {
        self.items.insert(key.to_ascii_lowercase(), value.to_string());
    }

    /// Builds a row from raw item/value pairs, applying the same
    /// normalisation as the parser.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut row = Self::default();
        for (key, value) in pairs {
            let value = match *value {
                "." | "?" => "",
                other => other,
            };
            row.insert(key, value);
        }
        row
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// The item value, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.items
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn required(&self, key: &str) -> Result<&str, CifError> {
        match self.get(key) {
            "" => Err(CifError::MissingField {
                category: self.category.clone(),
                key: key.to_string(),
            }),
            value => Ok(value),
        }
    }

    pub fn opt_int(&self, key: &str) -> Result<Option<isize>, CifError> {
        let value = self.get(key);
        if value.is_empty() {
            return Ok(None);
        }
        value
            .parse()
            .map(Some)
            .map_err(|_| CifError::InvalidNumber {
                key: key.to_string(),
                value: value.to_string(),
            })
    }

    pub fn int(&self, key: &str) -> Result<isize, CifError> {
        self.opt_int(key)?.ok_or_else(|| CifError::MissingField {
            category: self.category.clone(),
            key: key.to_string(),
        })
    }

    pub fn opt_float(&self, key: &str) -> Result<Option<f64>, CifError> {
        let value = self.get(key);
        if value.is_empty() {
            return Ok(None);
        }
        value
            .parse()
            .map(Some)
            .map_err(|_| CifError::InvalidNumber {
                key: key.to_string(),
                value: value.to_string(),
            })
    }

    pub fn float(&self, key: &str) -> Result<f64, CifError> {
        self.opt_float(key)?.ok_or_else(|| CifError::MissingField {
            category: self.category.clone(),
            key: key.to_string(),
        })
    }
}

/// The categories of the first data block of a CIF file.
#[derive(Debug, Clone, Default)]
pub struct CifDocument {
    pub name: String,
    categories: HashMap<String, Vec<CifRow>>,
}

fn split_data_name(name: &str) -> (String, String) {
    match name.split_once('.') {
        Some((category, item)) => (category.to_ascii_lowercase(), item.to_ascii_lowercase()),
        None => (name.to_ascii_lowercase(), String::new()),
    }
}

impl CifDocument {
    pub fn parse(input: &str) -> Result<Self, CifError> {
        let tokens = lexer::tokenize(input);
        let mut doc = CifDocument::default();
        let mut seen_block = false;
        let mut i = 0;

        while i < tokens.len() {
            match &tokens[i] {
                Token::Eof => break,
                Token::DataBlock(name) => {
                    if seen_block {
                        break;
                    }
                    seen_block = true;
                    doc.name = name.to_string();
                    i += 1;
                }
                Token::Loop => {
                    i = doc.read_loop(&tokens, i + 1)?;
                }
                Token::DataName(name) => {
                    let (category, item) = split_data_name(name);
                    let (value, consumed) = match tokens.get(i + 1).and_then(Token::value) {
                        Some(value) => (value, 2),
                        None => ("", 1),
                    };
                    let rows = doc.categories.entry(category.clone()).or_default();
                    if rows.is_empty() {
                        rows.push(CifRow::new(&category));
                    }
                    rows[0].insert(&item, value);
                    i += consumed;
                }
                _ => i += 1,
            }
        }
        Ok(doc)
    }

    fn read_loop(&mut self, tokens: &[Token<'_>], start: usize) -> Result<usize, CifError> {
        let mut i = start;
        let mut category = String::new();
        let mut columns = Vec::new();
        while let Some(Token::DataName(name)) = tokens.get(i) {
            let (cat, item) = split_data_name(name);
            category = cat;
            columns.push(item);
            i += 1;
        }

        let mut values = Vec::new();
        while let Some(value) = tokens.get(i).and_then(Token::value) {
            values.push(value);
            i += 1;
        }

        if columns.is_empty() {
            return Ok(i);
        }
        if values.len() % columns.len() != 0 {
            return Err(CifError::RaggedLoop {
                category,
                columns: columns.len(),
                values: values.len(),
            });
        }

        let rows = self.categories.entry(category.clone()).or_default();
        for chunk in values.chunks(columns.len()) {
            let mut row = CifRow::new(&category);
            for (column, value) in columns.iter().zip(chunk) {
                row.insert(column, value);
            }
            rows.push(row);
        }
        Ok(i)
    }

    /// Rows of `name`; empty when the category is absent.
    pub fn category(&self, name: &str) -> &[CifRow] {
        self.categories
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.categories.contains_key(&name.to_ascii_lowercase())
    }
}
