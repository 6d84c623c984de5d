//! Exact GF(2) linear algebra over generator state bits.
//!
//! Every constraint the symbolic solvers produce is an XOR of state bits
//! plus a constant: the xorshift128+ transition, MT19937's tempering and
//! twist, and "these output bits equal these observed bits" are all affine
//! over GF(2). That makes a row-reduced linear system a complete decision
//! procedure for the whole constraint language: `check` answers Sat/Unsat
//! exactly, and `solve` hands back a model.
//!
//! A [`Form`] is one affine form, stored as a span-trimmed bit mask over the
//! system's columns. A [`SymWord`] is a symbolic machine word: one form per
//! bit position, with the shift/mask/xor operations the generators are built
//! from. A [`System`] accumulates asserted forms in row echelon order, one
//! pivot per column, so insertion doubles as the satisfiability check.

/// Outcome of a consistency check. The engine is exact, so there is no
/// "unknown" third state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    Sat,
    Unsat,
}

/// An affine form over the system's columns: an XOR of some set of columns,
/// plus a constant bit.
///
/// The mask is stored as 64-bit blocks covering only the span that contains
/// set bits; `lo` is the index of the first stored block. Word-local forms
/// (most of what the MT float solver generates) stay one or two blocks wide
/// no matter how many columns the system has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    lo: usize,
    words: Vec<u64>,
    konst: bool,
}

impl Form {
    pub fn zero() -> Form {
        Form {
            lo: 0,
            words: Vec::new(),
            konst: false,
        }
    }

    pub fn constant(bit: bool) -> Form {
        Form {
            lo: 0,
            words: Vec::new(),
            konst: bit,
        }
    }

    /// The form consisting of a single column.
    pub fn var(col: usize) -> Form {
        Form {
            lo: col / 64,
            words: vec![1 << (col % 64)],
            konst: false,
        }
    }

    pub fn flip_konst(&mut self, bit: bool) {
        self.konst ^= bit;
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
        let lead = self.words.iter().take_while(|&&w| w == 0).count();
        if lead > 0 {
            self.words.drain(..lead);
            self.lo += lead;
        }
        if self.words.is_empty() {
            self.lo = 0;
        }
    }

    pub fn xor_in(&mut self, other: &Form) {
        self.konst ^= other.konst;
        if other.words.is_empty() {
            return;
        }
        if self.words.is_empty() {
            self.lo = other.lo;
            self.words = other.words.clone();
            return;
        }
        let lo = self.lo.min(other.lo);
        let hi = (self.lo + self.words.len()).max(other.lo + other.words.len());
        if lo < self.lo || hi > self.lo + self.words.len() {
            let mut words = vec![0u64; hi - lo];
            words[self.lo - lo..self.lo - lo + self.words.len()].copy_from_slice(&self.words);
            self.lo = lo;
            self.words = words;
        }
        for (i, &w) in other.words.iter().enumerate() {
            self.words[other.lo - self.lo + i] ^= w;
        }
        self.trim();
    }

    pub fn xor(&self, other: &Form) -> Form {
        let mut out = self.clone();
        out.xor_in(other);
        out
    }

    /// Index of the lowest column with a set coefficient, if any.
    fn lowest_set_col(&self) -> Option<usize> {
        let w = self.words.first()?;
        Some(self.lo * 64 + w.trailing_zeros() as usize)
    }

    /// Evaluate under a concrete assignment (one bit per column, packed in
    /// 64-bit blocks). Parity is additive over XOR, so a running XOR of the
    /// masked blocks carries the whole sum.
    pub fn eval(&self, assign: &[u64]) -> bool {
        let mut acc = 0u64;
        for (i, &w) in self.words.iter().enumerate() {
            acc ^= w & assign[self.lo + i];
        }
        (acc.count_ones() & 1 == 1) ^ self.konst
    }
}

/// A symbolic machine word: `bits[i]` is the affine form of bit `i` (LSB
/// first). Width is fixed at construction; all operations stay within it.
#[derive(Debug, Clone)]
pub struct SymWord {
    bits: Vec<Form>,
}

impl SymWord {
    /// A word of fresh variables occupying columns `base..base + width`.
    pub fn vars(base: usize, width: usize) -> SymWord {
        SymWord {
            bits: (0..width).map(|i| Form::var(base + i)).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.bits.len()
    }

    pub fn bit(&self, i: usize) -> &Form {
        &self.bits[i]
    }

    pub fn xor(&self, other: &SymWord) -> SymWord {
        SymWord {
            bits: self
                .bits
                .iter()
                .zip(&other.bits)
                .map(|(a, b)| a.xor(b))
                .collect(),
        }
    }

    /// Logical shift right: bit `i` of the result is bit `i + n` of the
    /// input; vacated high bits are zero.
    pub fn shr(&self, n: usize) -> SymWord {
        let w = self.width();
        SymWord {
            bits: (0..w)
                .map(|i| {
                    if i + n < w {
                        self.bits[i + n].clone()
                    } else {
                        Form::zero()
                    }
                })
                .collect(),
        }
    }

    /// Shift left within the word width; bits pushed past the top are
    /// dropped, which is exactly the wrapping shift the generators use.
    pub fn shl(&self, n: usize) -> SymWord {
        let w = self.width();
        SymWord {
            bits: (0..w)
                .map(|i| {
                    if i >= n {
                        self.bits[i - n].clone()
                    } else {
                        Form::zero()
                    }
                })
                .collect(),
        }
    }

    /// AND with a constant mask.
    pub fn and_mask(&self, mask: u64) -> SymWord {
        SymWord {
            bits: (0..self.width())
                .map(|i| {
                    if (mask >> i) & 1 == 1 {
                        self.bits[i].clone()
                    } else {
                        Form::zero()
                    }
                })
                .collect(),
        }
    }

    /// `(word & 1) * mask`: every set bit of `mask` receives a copy of bit 0.
    pub fn lsb_times(&self, mask: u64) -> SymWord {
        SymWord {
            bits: (0..self.width())
                .map(|i| {
                    if (mask >> i) & 1 == 1 {
                        self.bits[0].clone()
                    } else {
                        Form::zero()
                    }
                })
                .collect(),
        }
    }

    /// Concrete value under an assignment.
    pub fn eval(&self, assign: &[u64]) -> u64 {
        let mut out = 0u64;
        for (i, form) in self.bits.iter().enumerate() {
            if form.eval(assign) {
                out |= 1 << i;
            }
        }
        out
    }
}

/// An incremental GF(2) linear system in row echelon form.
///
/// Each inserted row is reduced against the existing pivots before being
/// stored, so its lowest set column becomes its pivot and all of its other
/// coefficients sit at higher columns. A row that reduces to `0 = 1` marks
/// the system unsatisfiable; the flag is sticky until the system is rebuilt.
#[derive(Debug)]
pub struct System {
    ncols: usize,
    pivots: Vec<Option<usize>>,
    rows: Vec<Form>,
    unsat: bool,
}

impl System {
    pub fn new(ncols: usize) -> System {
        System {
            ncols,
            pivots: vec![None; ncols],
            rows: Vec::new(),
            unsat: false,
        }
    }

    pub fn check(&self) -> CheckResult {
        if self.unsat {
            CheckResult::Unsat
        } else {
            CheckResult::Sat
        }
    }

    /// Number of independent constraints absorbed so far.
    pub fn rank(&self) -> usize {
        self.rows.len()
    }

    /// Assert that bits `lo..hi` of `word` equal the low `hi - lo` bits of
    /// `value`.
    pub fn assert_bits(&mut self, word: &SymWord, lo: usize, hi: usize, value: u64) {
        for i in lo..hi {
            let mut form = word.bit(i).clone();
            form.flip_konst((value >> (i - lo)) & 1 == 1);
            self.add_form(form);
        }
    }

    /// Insert one asserted form, reducing it to echelon position. Reduction
    /// scans set columns in ascending order; every pivot row's off-pivot
    /// coefficients are above its pivot, so a single pass suffices.
    pub fn add_form(&mut self, mut form: Form) {
        loop {
            let Some(col) = form.lowest_set_col() else {
                if form.konst {
                    self.unsat = true;
                }
                return;
            };
            match self.pivots[col] {
                Some(row) => form.xor_in(&self.rows[row]),
                None => {
                    self.pivots[col] = Some(self.rows.len());
                    self.rows.push(form);
                    return;
                }
            }
        }
    }

    /// A satisfying assignment, with every unconstrained column set to zero.
    /// Back-substitutes from the highest pivot down; when a pivot's value is
    /// computed, every higher column its row touches is already assigned.
    pub fn solve(&self) -> Option<Vec<u64>> {
        if self.unsat {
            return None;
        }
        let mut assign = vec![0u64; self.ncols.div_ceil(64)];
        for col in (0..self.ncols).rev() {
            let Some(row) = self.pivots[col] else { continue };
            // The pivot bit itself is still zero in `assign`, so the row
            // evaluates to exactly the XOR of the already-assigned columns.
            if self.rows[row].eval(&assign) {
                assign[col / 64] |= 1 << (col % 64);
            }
        }
        Some(assign)
    }
}
