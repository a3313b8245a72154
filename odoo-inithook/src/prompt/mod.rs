// Operator prompt seam
//
// The provisioner only needs three interactions: a confirmed secret, a line of
// free text, and an informational notice. Calls block until the operator answers.

pub mod terminal;

use anyhow::Result;

pub trait Prompter {
    /// Ask for a secret. Implementations re-prompt until the value is non-empty,
    /// free of `blacklist` characters, and confirmed.
    fn password(&mut self, title: &str, text: &str, blacklist: &[char]) -> Result<String>;

    /// Ask for one line of text (untrimmed).
    fn input(&mut self, title: &str, text: &str) -> Result<String>;

    fn notice(&mut self, text: &str);
}
