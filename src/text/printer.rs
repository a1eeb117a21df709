use std::fmt::{Debug, Display};

use crate::{
    formula::{AcceptanceFormula, OpKind},
    Show,
};

impl AcceptanceFormula {
    /// Renders the formula in the textual syntax that [`AcceptanceFormula::from_str`]
    /// understands, e.g. `Inf(0) | (Fin(1) & Inf(2))`.
    ///
    /// [`AcceptanceFormula::from_str`]: std::str::FromStr::from_str
    pub fn to_text(&self) -> String {
        self.print_with(false, &mut |m| m.to_string())
    }

    /// Like [`AcceptanceFormula::to_text`], but escapes the conjunction as `&amp;`.
    pub fn to_html(&self) -> String {
        self.print_with(true, &mut |m| m.to_string())
    }

    /// Renders the formula, using `set_printer` to render every mark index.
    ///
    /// ```
    /// use automata_acceptance::AcceptanceFormula;
    /// let x = AcceptanceFormula::fin([0]) & AcceptanceFormula::inf([1]);
    /// assert_eq!(x.print_with(false, &mut |m| format!("s{m}")), "Fin(s0) & Inf(s1)");
    /// ```
    pub fn print_with(&self, html: bool, set_printer: &mut dyn FnMut(usize) -> String) -> String {
        let mut out = String::new();
        match self.top() {
            None => out.push('t'),
            Some(top) => {
                let mut printer = Printer {
                    formula: self,
                    html,
                    set_printer,
                    out: &mut out,
                };
                printer.print(top);
            }
        }
        out
    }
}

struct Printer<'a, F: ?Sized> {
    formula: &'a AcceptanceFormula,
    html: bool,
    set_printer: &'a mut F,
    out: &'a mut String,
}

impl<F: FnMut(usize) -> String + ?Sized> Printer<'_, F> {
    fn print(&mut self, pos: usize) {
        let top = pos + 1 == self.formula.len();
        match self.formula.op(pos) {
            Some(kind @ (OpKind::And | OpKind::Or)) => {
                let op = match kind {
                    OpKind::And if self.html => " &amp; ",
                    OpKind::And => " & ",
                    _ => " | ",
                };
                if !top {
                    self.out.push('(');
                }
                for (i, child) in self.formula.children(pos).enumerate() {
                    if i > 0 {
                        self.out.push_str(op);
                    }
                    self.print(child);
                }
                if !top {
                    self.out.push(')');
                }
            }
            Some(kind) => {
                let mark = self.formula.mark(pos);
                let (name, constant, negated, join) = match kind {
                    OpKind::Inf | OpKind::InfNeg => (
                        "Inf",
                        't',
                        kind == OpKind::InfNeg,
                        if self.html { "&amp;" } else { "&" },
                    ),
                    _ => ("Fin", 'f', kind == OpKind::FinNeg, "|"),
                };
                if mark.is_empty() {
                    self.out.push(constant);
                    return;
                }
                // a single mark needs no parentheses
                let bare = top || mark.count() == 1;
                if !bare {
                    self.out.push('(');
                }
                for (i, m) in mark.sets().enumerate() {
                    if i > 0 {
                        self.out.push_str(join);
                    }
                    let set = (self.set_printer)(m);
                    self.out.push_str(name);
                    self.out.push('(');
                    if negated {
                        self.out.push('!');
                    }
                    self.out.push_str(&set);
                    self.out.push(')');
                }
                if !bare {
                    self.out.push(')');
                }
            }
            None => {}
        }
    }
}

impl Display for AcceptanceFormula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl Debug for AcceptanceFormula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl Show for AcceptanceFormula {
    fn show(&self) -> String {
        self.to_text()
    }
}
