//! Textual representation of acceptance formulas and conditions. Formulas print as
//! `Inf(0) | (Fin(1) & Inf(2))`, and the same syntax together with named shapes such as
//! `Rabin 2` or `parity max odd 3` can be parsed back through [`std::str::FromStr`].

mod parser;
mod printer;
