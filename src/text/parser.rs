use std::str::FromStr;

use tracing::{debug, trace};

use crate::{
    condition::AcceptanceCondition, error::SyntaxError, formula::AcceptanceFormula,
    mark::MarkSet,
};

/// Recursive descent parser for acceptance conditions. Besides formulas built from `t`, `f`,
/// `Inf(n)`, `Fin(n)`, `&`, `|` and parentheses it understands the named shapes `all`, `none`,
/// `Buchi`, `co-Buchi`, `generalized-Buchi r`, `generalized-co-Buchi r`, `Rabin r`,
/// `Streett r`, `generalized-Rabin n r1 .. rn`, `parity (min|max|rand) (odd|even|rand) r`
/// and `random r [p]`, where every `r` is a number or a range `a..b` (also `a:b`) from which
/// a value is drawn uniformly.
struct Parser<'a, 'r> {
    input: &'a str,
    pos: usize,
    #[cfg(feature = "random")]
    rng: &'r mut fastrand::Rng,
    #[cfg(not(feature = "random"))]
    rng: std::marker::PhantomData<&'r mut ()>,
}

type Parsed<T> = Result<T, SyntaxError>;

impl<'a, 'r> Parser<'a, 'r> {
    #[cfg(feature = "random")]
    fn new(input: &'a str, rng: &'r mut fastrand::Rng) -> Self {
        Self { input, pos: 0, rng }
    }

    #[cfg(not(feature = "random"))]
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            rng: std::marker::PhantomData,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn error<S: Into<String>>(&self, at: usize, reason: S) -> SyntaxError {
        SyntaxError::new(self.input, at, reason)
    }

    fn skip_space(&mut self) {
        self.pos = self.input.len() - self.rest().trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    /// Consumes `c` together with the whitespace following it.
    fn expect(&mut self, c: char) -> Parsed<()> {
        if !self.rest().starts_with(c) {
            return Err(self.error(self.pos, format!("was expecting '{c}'.")));
        }
        self.pos += c.len_utf8();
        self.skip_space();
        Ok(())
    }

    fn number(&mut self) -> Parsed<usize> {
        self.skip_space();
        let digits = self
            .rest()
            .bytes()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let n = self.rest()[..digits]
            .parse()
            .map_err(|_| self.error(self.pos, "invalid number."))?;
        self.pos += digits;
        Ok(n)
    }

    /// An optionally negative integer at the current position, with its length in bytes.
    fn signed(&self) -> Option<(i64, usize)> {
        let rest = self.rest();
        let sign = usize::from(rest.starts_with('-'));
        let digits = rest[sign..]
            .bytes()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let value = rest[..sign + digits].parse().ok()?;
        Some((value, sign + digits))
    }

    fn mark(&mut self) -> Parsed<MarkSet> {
        self.skip_space();
        let at = self.pos;
        self.expect('(')?;
        let n = self.number()?;
        if n >= MarkSet::CAPACITY {
            return Err(self.error(
                at,
                format!(
                    "mark {n} exceeds the capacity of {} acceptance sets.",
                    MarkSet::CAPACITY
                ),
            ));
        }
        self.skip_space();
        self.expect(')')?;
        Ok(MarkSet::from_indices([n]))
    }

    /// `acc ::= term ('|' term)*`
    fn acc(&mut self) -> Parsed<AcceptanceFormula> {
        let mut res = self.term()?;
        self.skip_space();
        while self.eat("|") {
            self.skip_space();
            // prepending keeps the input order when printing
            let next = self.term()?;
            res = next | res;
        }
        Ok(res)
    }

    /// `term ::= atom ('&' term)?`
    fn term(&mut self) -> Parsed<AcceptanceFormula> {
        let mut res = if self.eat("t") {
            AcceptanceFormula::t()
        } else if self.eat("f") {
            AcceptanceFormula::f()
        } else if self.eat("(") {
            self.skip_space();
            let inner = self.acc()?;
            self.skip_space();
            self.expect(')')?;
            inner
        } else if self.eat("Inf") {
            AcceptanceFormula::inf(self.mark()?)
        } else if self.eat("Fin") {
            AcceptanceFormula::fin(self.mark()?)
        } else {
            return Err(self.error(self.pos, "unexpected character."));
        };

        self.skip_space();
        while self.eat("&") {
            self.skip_space();
            let next = self.term()?;
            res = next & res;
        }
        Ok(res)
    }

    /// A single number or a range `a..b`, `a:b`, `..b` or `:b` from which a value is drawn.
    fn range(&mut self) -> Parsed<usize> {
        self.skip_space();
        let start = self.pos;
        let (min, len) = match self.signed() {
            Some(found) => found,
            None if self.rest().starts_with([':', '.']) => (1, 0),
            None => return Err(self.error(start, "invalid range.")),
        };
        self.pos += len;

        let max = if self.eat(":") || self.eat("..") {
            let (max, len) = self
                .signed()
                .ok_or_else(|| self.error(start, "invalid range (missing end?)"))?;
            self.pos += len;
            max
        } else if self.rest().starts_with('.') {
            return Err(self.error(start, "invalid range (missing end?)"));
        } else {
            min
        };

        if min < 0 || max < 0 {
            return Err(self.error(start, "values in range must be positive."));
        }
        let (low, high) = (min.min(max) as usize, min.max(max) as usize);
        if low == high {
            return Ok(low);
        }
        let value = self.draw(start, low, high)?;
        trace!("drew {value} from range {low}..{high}");
        Ok(value)
    }

    #[cfg(feature = "random")]
    fn draw(&mut self, _at: usize, low: usize, high: usize) -> Parsed<usize> {
        Ok(self.rng.usize(low..=high))
    }

    #[cfg(not(feature = "random"))]
    fn draw(&mut self, at: usize, low: usize, high: usize) -> Parsed<usize> {
        Err(self.error(
            at,
            format!("cannot pick a value from {low}..{high} without the random feature."),
        ))
    }

    #[cfg(feature = "random")]
    fn coin(&mut self, _at: usize) -> Parsed<bool> {
        Ok(self.rng.bool())
    }

    #[cfg(not(feature = "random"))]
    fn coin(&mut self, at: usize) -> Parsed<bool> {
        Err(self.error(at, "random choices need the random feature."))
    }

    /// Reads `yes` or `no`, while `rand` and `random` pick one of them at random.
    fn choice(&mut self, yes: &str, no: &str, expected: &str) -> Parsed<bool> {
        self.skip_space();
        let at = self.pos;
        if self.eat(yes) {
            Ok(true)
        } else if self.eat(no) {
            Ok(false)
        } else if self.eat("random") || self.eat("rand") {
            self.coin(at)
        } else {
            Err(self.error(at, expected))
        }
    }

    #[cfg(feature = "random")]
    fn probability(&mut self) -> Parsed<f64> {
        let at = self.pos;
        let len = self
            .rest()
            .bytes()
            .take_while(|b| b.is_ascii_digit() || b"+-.eE".contains(b))
            .count();
        let p: f64 = self.rest()[..len]
            .parse()
            .map_err(|_| self.error(at, "cannot convert to double."))?;
        if !(0.0..=1.0).contains(&p) {
            return Err(self.error(at, "value should be between 0 and 1."));
        }
        self.pos += len;
        Ok(p)
    }

    fn sets(&self, at: usize, n: usize) -> Parsed<usize> {
        if n > MarkSet::CAPACITY {
            return Err(self.error(
                at,
                format!(
                    "{n} acceptance sets exceed the capacity of {}.",
                    MarkSet::CAPACITY
                ),
            ));
        }
        Ok(n)
    }

    /// A range that is used as a number of acceptance sets, after multiplying with `factor`.
    fn set_range(&mut self, factor: usize) -> Parsed<usize> {
        self.skip_space();
        let at = self.pos;
        let n = self.range()?;
        self.sets(at, n.saturating_mul(factor)).map(|_| n)
    }

    #[cfg(feature = "random")]
    fn random(&mut self) -> Parsed<(AcceptanceFormula, Option<usize>)> {
        let n = self.set_range(1)?;
        self.skip_space();
        let at = self.pos;
        let reuse = if self.rest().is_empty() {
            0.0
        } else {
            self.probability()?
        };
        if reuse >= 1.0 {
            return Err(self.error(at, "probability for set reuse should be <1."));
        }
        Ok((AcceptanceFormula::random(n, reuse, self.rng), Some(n)))
    }

    #[cfg(not(feature = "random"))]
    fn random(&mut self) -> Parsed<(AcceptanceFormula, Option<usize>)> {
        Err(self.error(self.pos, "random acceptance needs the random feature."))
    }

    /// Parses the whole input, returning the formula and, for named shapes, the number of
    /// sets the shape ranges over.
    fn acceptance(&mut self) -> Parsed<(AcceptanceFormula, Option<usize>)> {
        use AcceptanceFormula as F;
        self.skip_space();
        let (formula, sets) = if self.eat("all") {
            (F::t(), Some(0))
        } else if self.eat("none") {
            (F::f(), Some(0))
        } else if self.eat("Buchi") {
            (F::buchi(), Some(1))
        } else if self.eat("co-Buchi") {
            (F::cobuchi(), Some(1))
        } else if self.eat("generalized-Buchi") {
            let n = self.set_range(1)?;
            (F::generalized_buchi(n), Some(n))
        } else if self.eat("generalized-co-Buchi") {
            let n = self.set_range(1)?;
            (F::generalized_co_buchi(n), Some(n))
        } else if self.eat("Rabin") {
            let n = self.set_range(2)?;
            (F::rabin(n), Some(2 * n))
        } else if self.eat("Streett") {
            let n = self.set_range(2)?;
            (F::streett(n), Some(2 * n))
        } else if self.eat("generalized-Rabin") {
            self.skip_space();
            let at = self.pos;
            let pairs = self.number()?;
            let mut counts = Vec::new();
            let mut total = 0usize;
            for _ in 0..pairs {
                let count = self.range()?;
                total = total.saturating_add(count).saturating_add(1);
                self.sets(at, total)?;
                counts.push(count);
            }
            (F::generalized_rabin(&counts), Some(total))
        } else if self.eat("parity") {
            let max = self.choice("max", "min", "expecting 'min', 'max', or 'rand'.")?;
            let odd = self.choice("odd", "even", "expecting 'odd', 'even', or 'rand'.")?;
            let n = self.set_range(1)?;
            (F::parity(max, odd, n), Some(n))
        } else if self.eat("random") {
            self.random()?
        } else {
            (self.acc()?, None)
        };

        self.skip_space();
        if !self.rest().is_empty() {
            return Err(self.error(self.pos, "unexpected character."));
        }
        Ok((formula, sets))
    }

    fn condition(mut self) -> Parsed<AcceptanceCondition> {
        let (formula, sets) = self.acceptance()?;
        let num_sets = sets.unwrap_or_else(|| formula.used_sets().max_set());
        debug!("parsed condition over {num_sets} sets from {:?}", self.input);
        Ok(AcceptanceCondition::with_formula(num_sets, formula))
    }
}

impl AcceptanceCondition {
    /// Parses a condition, see [`AcceptanceCondition::parse_with_rng`] for the syntax. Ranges
    /// are resolved with a freshly seeded generator.
    #[cfg(feature = "random")]
    pub fn parse(text: &str) -> Result<Self, SyntaxError> {
        Self::parse_with_rng(text, &mut fastrand::Rng::new())
    }

    /// Parses a condition, either a named shape like `Rabin 2` or `parity max odd 4`, or a
    /// formula like `Inf(0) | (Fin(1) & Inf(2))`. Shapes range over the sets they use, a
    /// formula ranges over all sets up to the largest one it mentions. Values are drawn from
    /// ranges like `Rabin 1..3` and `rand` choices are made with `rng`.
    ///
    /// ```
    /// use automata_acceptance::AcceptanceCondition;
    /// let mut rng = fastrand::Rng::with_seed(7);
    /// let cond = AcceptanceCondition::parse_with_rng("Streett 2..3", &mut rng).unwrap();
    /// assert!(cond.is_streett().is_some());
    /// ```
    #[cfg(feature = "random")]
    pub fn parse_with_rng(text: &str, rng: &mut fastrand::Rng) -> Result<Self, SyntaxError> {
        Parser::new(text, rng).condition()
    }

    /// Parses a condition, either a named shape like `Rabin 2` or `parity max odd 4`, or a
    /// formula like `Inf(0) | (Fin(1) & Inf(2))`. Without the `random` feature, ranges have to
    /// consist of a single value.
    #[cfg(not(feature = "random"))]
    pub fn parse(text: &str) -> Result<Self, SyntaxError> {
        Parser::new(text).condition()
    }
}

impl FromStr for AcceptanceCondition {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromStr for AcceptanceFormula {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AcceptanceCondition::parse(s).map(|cond| cond.formula().clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::{AcceptanceCondition as C, AcceptanceFormula as F, SyntaxError};

    fn parse(text: &str) -> Result<C, SyntaxError> {
        text.parse()
    }

    fn reason(text: &str) -> String {
        parse(text).unwrap_err().reason
    }

    #[test_log::test]
    fn formulas() {
        let x: F = "Fin(1) & Inf(0)".parse().unwrap();
        assert_eq!(x, F::fin([1]) & F::inf([0]));
        let y: F = "  Inf( 1 )|  t ".parse().unwrap();
        assert!(y.is_t());
        let z: F = "Inf(0)&Inf(2) | f".parse().unwrap();
        assert_eq!(z, F::inf([0, 2]));
        let c = parse("Inf(0) | (Fin(1) & Inf(2))").unwrap();
        assert_eq!(c.num_sets(), 3);
        assert!(c.uses_fin());
        assert_eq!(parse("t").unwrap(), C::all());
    }

    #[test]
    fn printing_round_trips() {
        let samples = [
            F::inf([0]) | (F::fin([1]) & F::inf([2])),
            F::generalized_rabin(&[1, 2]),
            F::rabin(2),
            F::streett(2),
            F::streett(1),
            F::parity(true, false, 3),
            F::parity(false, true, 4),
            F::generalized_buchi(0),
            F::f().complement(),
            F::f(),
        ];
        for x in samples {
            assert_eq!(x.to_text().parse::<F>(), Ok(x.clone()), "{x}");
        }
    }

    #[cfg(feature = "random")]
    #[test_log::test]
    fn random_formulas_round_trip() {
        let mut rng = fastrand::Rng::with_seed(31);
        for i in 0..200 {
            let x = F::random(1 + i % 7, 0.2, &mut rng);
            assert_eq!(x.to_text().parse::<F>(), Ok(x.clone()), "{x}");
        }
    }

    #[test]
    fn named_shapes() {
        assert_eq!(parse("all").unwrap(), C::all());
        assert_eq!(parse("none").unwrap(), C::none());
        assert_eq!(parse("Buchi").unwrap(), C::buchi());
        assert_eq!(parse(" co-Buchi ").unwrap(), C::cobuchi());
        assert_eq!(parse("generalized-Buchi 3").unwrap(), C::generalized_buchi(3));
        assert_eq!(
            parse("generalized-co-Buchi 2").unwrap(),
            C::generalized_co_buchi(2)
        );
        assert_eq!(parse("Rabin 2").unwrap(), C::rabin(2));
        assert_eq!(parse("Streett 1").unwrap(), C::streett(1));
        assert_eq!(
            parse("generalized-Rabin 2 1 2").unwrap(),
            C::generalized_rabin(&[1, 2])
        );
        assert_eq!(parse("parity min even 4").unwrap(), C::parity(false, false, 4));
        assert_eq!(parse("Rabin 3:3").unwrap(), C::rabin(3));
        assert_eq!(parse("generalized-Buchi 0").unwrap(), C::all());
        assert_eq!(parse("generalized-co-Buchi 0").unwrap(), C::none());
    }

    #[test]
    fn parsed_shapes_are_recognized() {
        assert_eq!(parse("Rabin 2").unwrap().is_rabin(), Some(2));
        assert_eq!(
            parse("parity max odd 5").unwrap().is_parity(),
            Some((true, true))
        );
        assert_eq!(
            parse("parity min odd 5").unwrap().is_parity(),
            Some((false, true))
        );
        assert_eq!(
            parse("parity max even 5").unwrap().is_parity(),
            Some((true, false))
        );
        let gb = parse("generalized-Buchi 5").unwrap();
        assert_eq!(gb.is_parity(), None);
        assert_eq!(gb.is_rabin(), None);
        assert!(gb.is_generalized_buchi());
    }

    #[test]
    fn syntax_errors() {
        let err = parse("Inf(0) &").unwrap_err();
        assert_eq!(err.position, 8);
        assert_eq!(err.to_string(), "at end of acceptance: unexpected character.");

        let err = parse("Inf(0) ) x").unwrap_err();
        assert_eq!(err.rest, ") x");
        assert_eq!(err.reason, "unexpected character.");

        assert_eq!(reason("Inf(x)"), "invalid number.");
        assert_eq!(reason("Inf 0"), "was expecting '('.");
        assert_eq!(reason("(Inf(0) | Fin(1)"), "was expecting ')'.");
        assert_eq!(reason("Inf(0) Fin(1)"), "unexpected character.");
        assert!(reason("Inf(40)").contains("capacity"));
        assert!(reason("Rabin 20").contains("capacity"));
        assert!(reason("generalized-Rabin 3 10 10 10").contains("capacity"));
        assert_eq!(reason("Rabin x"), "invalid range.");
        assert_eq!(reason("Rabin 2.."), "invalid range (missing end?)");
        assert_eq!(reason("Rabin -2"), "values in range must be positive.");
        assert_eq!(
            reason("parity large odd 2"),
            "expecting 'min', 'max', or 'rand'."
        );
        assert_eq!(reason("parity max 2"), "expecting 'odd', 'even', or 'rand'.");
        assert_eq!(reason("Buchi 2"), "unexpected character.");
    }

    #[cfg(feature = "random")]
    #[test]
    fn ranges_are_drawn_from_the_generator() {
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..20 {
            let cond = C::parse_with_rng("Rabin 1..3", &mut rng).unwrap();
            let pairs = cond.is_rabin().unwrap();
            assert!((1..=3).contains(&pairs));
            let cond = C::parse_with_rng("generalized-Buchi :4", &mut rng).unwrap();
            assert!((1..=4).contains(&cond.num_sets()));
            let cond = C::parse_with_rng("parity rand random 5..2", &mut rng).unwrap();
            assert!((2..=5).contains(&cond.num_sets()));
            assert!(cond.is_parity().is_some());
        }
        let a = C::parse_with_rng("Streett 1..10", &mut fastrand::Rng::with_seed(3));
        let b = C::parse_with_rng("Streett 1..10", &mut fastrand::Rng::with_seed(3));
        assert_eq!(a, b);
    }

    #[cfg(feature = "random")]
    #[test]
    fn random_shapes() {
        let mut rng = fastrand::Rng::with_seed(1);
        let cond = C::parse_with_rng("random 4", &mut rng).unwrap();
        assert_eq!(cond.num_sets(), 4);
        assert!(cond
            .formula()
            .used_sets()
            .subset(&crate::MarkSet::all(4)));
        let cond = C::parse_with_rng("random 3 0.5", &mut rng).unwrap();
        assert_eq!(cond.num_sets(), 3);
        assert_eq!(reason("random 3 1.5"), "value should be between 0 and 1.");
        assert_eq!(reason("random 3 1"), "probability for set reuse should be <1.");
        assert_eq!(reason("random 3 x"), "cannot convert to double.");
    }
}
