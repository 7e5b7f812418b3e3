//! The protected payload: words of wisdom.
//!
//! The server core does not care how quotes are produced; it only needs a
//! fallible source. A static table is the reference implementation; a
//! remote catalog or database would implement the same trait.

use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuoteError {
    #[error("no quotes available")]
    Empty,
}

/// Supplies the payload handed out after a verified proof of work.
pub trait QuoteSource: Send + Sync {
    fn get_quote(&self) -> Result<String, QuoteError>;
}

/// Fixed in-memory quote book, uniform random pick.
pub struct StaticQuotes {
    quotes: Vec<String>,
}

impl StaticQuotes {
    pub fn new(quotes: Vec<String>) -> Self {
        Self { quotes }
    }
}

impl Default for StaticQuotes {
    fn default() -> Self {
        let quotes = [
            "And all saints who remember to keep and do these sayings, walking in \
             obedience to the commandments, shall receive health in their navel and \
             marrow to their bones; and shall find wisdom and great treasures of \
             knowledge, even hidden treasures.",
            "The fear of the Lord is the beginning of wisdom.",
            "Wisdom is the principal thing; therefore get wisdom: and with all thy \
             getting get understanding.",
            "A wise man will hear, and will increase learning; and a man of \
             understanding shall attain unto wise counsels.",
            "By wisdom a house is built, and through understanding it is established.",
        ];

        Self::new(quotes.iter().map(|q| (*q).to_string()).collect())
    }
}

impl QuoteSource for StaticQuotes {
    fn get_quote(&self) -> Result<String, QuoteError> {
        if self.quotes.is_empty() {
            return Err(QuoteError::Empty);
        }

        let idx = rand::thread_rng().gen_range(0..self.quotes.len());
        Ok(self.quotes[idx].clone())
    }
}
